//! Mapping of stream folders and quality selectors to storage object keys.
//!
//! A stream's catalog entry names a folder in the bucket, written however the
//! uploader happened to write it (a bare path, a full storage URL, with or
//! without the bucket name). [`ObjectKeyResolver::normalize_folder`] reduces it
//! to a clean relative path, [`ObjectKeyResolver::master_key`] locates the
//! master manifest, and [`ObjectKeyResolver::resolve`] maps whatever follows
//! `/stream/{id}/` onto a key under the master's directory.
//!
//! Every rejection surfaces as [`Error::InvalidObjectKey`], which carries no
//! path information.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use sg_core::{Error, Result};

/// Master manifest file name used when none is configured.
pub const DEFAULT_MASTER_FILENAME: &str = "master.m3u8";

const MANIFEST_EXT: &str = ".m3u8";

/// Path marker of object URLs issued by the storage service.
const STORAGE_OBJECT_MARKER: &str = "/storage/v1/object/";

/// Access-mode segments that precede the bucket in storage URLs.
const ACCESS_MARKERS: &[&str] = &["public/", "sign/"];

/// Characters left unescaped when a single path segment is placed in a URL.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

// ---------------------------------------------------------------------------
// Folder normalization
// ---------------------------------------------------------------------------

/// One step of folder normalization. Steps run in [`FOLDER_RULES`] order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StripRule {
    /// Surrounding whitespace.
    Whitespace,
    /// A `?query` or `#fragment` suffix.
    QuerySuffix,
    /// Windows separators become `/`.
    Backslashes,
    /// Everything through `/storage/v1/object/`, matched case-insensitively.
    StorageUrlPrefix,
    /// Leading `/`.
    LeadingSlashes,
    /// A leading `public/` or `sign/`.
    AccessMarker,
    /// A leading `{bucket}/`.
    BucketPrefix,
}

/// Normalization pipeline, in order.
pub const FOLDER_RULES: [StripRule; 7] = [
    StripRule::Whitespace,
    StripRule::QuerySuffix,
    StripRule::Backslashes,
    StripRule::StorageUrlPrefix,
    StripRule::LeadingSlashes,
    StripRule::AccessMarker,
    StripRule::BucketPrefix,
];

impl StripRule {
    /// Apply this rule to `input`.
    pub fn apply(self, input: &str, bucket: &str) -> String {
        match self {
            StripRule::Whitespace => input.trim().to_string(),
            StripRule::QuerySuffix => match input.find(&['?', '#'][..]) {
                Some(idx) => input[..idx].to_string(),
                None => input.to_string(),
            },
            StripRule::Backslashes => input.replace('\\', "/"),
            StripRule::StorageUrlPrefix => {
                // ASCII lowercasing keeps byte offsets aligned with `input`.
                match input.to_ascii_lowercase().find(STORAGE_OBJECT_MARKER) {
                    Some(idx) => input[idx + STORAGE_OBJECT_MARKER.len()..].to_string(),
                    None => input.to_string(),
                }
            }
            StripRule::LeadingSlashes => input.trim_start_matches('/').to_string(),
            StripRule::AccessMarker => ACCESS_MARKERS
                .iter()
                .find_map(|marker| input.strip_prefix(marker))
                .unwrap_or(input)
                .to_string(),
            StripRule::BucketPrefix => {
                if bucket.is_empty() {
                    return input.to_string();
                }
                input
                    .strip_prefix(bucket)
                    .and_then(|rest| rest.strip_prefix('/'))
                    .unwrap_or(input)
                    .to_string()
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

/// Resolves stream folders and quality selectors into object keys within one
/// bucket.
#[derive(Debug, Clone)]
pub struct ObjectKeyResolver {
    bucket: String,
    master_filename: String,
}

impl ObjectKeyResolver {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            master_filename: DEFAULT_MASTER_FILENAME.to_string(),
        }
    }

    /// Use a different master manifest file name.
    pub fn with_master_filename(mut self, name: impl Into<String>) -> Self {
        self.master_filename = name.into();
        self
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn master_filename(&self) -> &str {
        &self.master_filename
    }

    /// Reduce a raw folder reference to a clean relative path.
    pub fn normalize_folder(&self, raw: &str) -> Result<String> {
        let folder = FOLDER_RULES
            .iter()
            .fold(raw.to_string(), |acc, rule| rule.apply(&acc, &self.bucket));

        if folder.is_empty() || folder.contains("..") {
            return Err(Error::InvalidObjectKey);
        }

        let cleaned = clean_path(&folder);
        if cleaned == "." || cleaned.starts_with('/') {
            return Err(Error::InvalidObjectKey);
        }
        Ok(cleaned)
    }

    /// Object key of a stream's master manifest.
    ///
    /// A folder that already names a `.m3u8` file is used as-is, but only
    /// inside a directory: a stream's objects must never span the bucket root.
    pub fn master_key(&self, raw_folder: &str) -> Result<String> {
        let folder = self.normalize_folder(raw_folder)?;
        if ends_with_ignore_case(&folder, MANIFEST_EXT) {
            if base_dir(&folder).is_empty() {
                return Err(Error::InvalidObjectKey);
            }
            return Ok(folder);
        }
        Ok(clean_path(&format!("{folder}/{}", self.master_filename)))
    }

    /// Map a quality selector onto a key next to `master_key`.
    ///
    /// - empty (or only slashes): the master itself
    /// - a final component without an extension, or ending in `.m3u8`: that
    ///   variant's manifest (`low` becomes `low.m3u8`)
    /// - a trailing `/`: the master file name inside that subdirectory
    /// - anything else: that file, literally
    pub fn resolve(&self, master_key: &str, selector: &str) -> Result<String> {
        let base = base_dir(master_key);
        if base.is_empty() {
            return Err(Error::InvalidObjectKey);
        }

        let selector = selector.replace('\\', "/");
        let selector = selector.trim_start_matches('/');
        if selector.is_empty() {
            return Ok(master_key.to_string());
        }

        check_selector(selector)?;

        let (dir, name) = match selector.rfind('/') {
            Some(idx) => (&selector[..=idx], &selector[idx + 1..]),
            None => ("", selector),
        };

        let file = if name.is_empty() {
            self.master_filename.clone()
        } else if is_variant_name(name) {
            variant_manifest_name(name)
        } else {
            name.to_string()
        };

        let key = clean_path(&format!("{base}/{dir}{file}"));

        if key == ".." || key.starts_with("../") || key.starts_with('/') {
            return Err(Error::InvalidObjectKey);
        }
        if !key.starts_with(&format!("{base}/")) {
            return Err(Error::InvalidObjectKey);
        }
        Ok(key)
    }

    /// Normalize `raw_folder` and resolve `selector` against its master.
    pub fn resolve_for(&self, raw_folder: &str, selector: &str) -> Result<String> {
        let master = self.master_key(raw_folder)?;
        self.resolve(&master, selector)
    }
}

/// Reject selectors that could climb out of the stream directory, including
/// after one round of percent-decoding.
fn check_selector(selector: &str) -> Result<()> {
    if selector.contains("..") || selector.chars().any(char::is_control) {
        return Err(Error::InvalidObjectKey);
    }
    let decoded = percent_decode_str(selector).decode_utf8_lossy();
    if decoded.contains("..") || decoded.chars().any(char::is_control) {
        return Err(Error::InvalidObjectKey);
    }
    Ok(())
}

fn is_variant_name(name: &str) -> bool {
    !name.contains('.') || ends_with_ignore_case(name, MANIFEST_EXT)
}

/// Manifest file name for a variant reference.
///
/// `""` and `"/"` name the master; otherwise the extension of the final
/// component, if any, is replaced by `.m3u8`.
///
/// ```
/// use sg_hls::object_key::variant_manifest_name;
///
/// assert_eq!(variant_manifest_name("/"), "master.m3u8");
/// assert_eq!(variant_manifest_name("/variant"), "variant.m3u8");
/// assert_eq!(variant_manifest_name("/variant.ts"), "variant.m3u8");
/// ```
pub fn variant_manifest_name(raw: &str) -> String {
    let name = raw.trim_start_matches('/');
    if name.is_empty() {
        return DEFAULT_MASTER_FILENAME.to_string();
    }
    if ends_with_ignore_case(name, MANIFEST_EXT) {
        return name.to_string();
    }
    let component_start = name.rfind('/').map_or(0, |i| i + 1);
    let stem = match name.rfind('.') {
        Some(dot) if dot >= component_start => &name[..dot],
        _ => name,
    };
    format!("{stem}{MANIFEST_EXT}")
}

/// True when `key` names an HLS manifest.
pub fn is_manifest_key(key: &str) -> bool {
    ends_with_ignore_case(key, MANIFEST_EXT)
}

/// Check a public stream identifier before it is used anywhere.
///
/// Identifiers are opaque names, never paths.
pub fn validate_stream_id(stream_id: &str) -> Result<()> {
    if stream_id.trim().is_empty() {
        return Err(Error::Validation("stream id must not be empty".into()));
    }
    if stream_id.contains("..") {
        return Err(Error::InvalidObjectKey);
    }
    if stream_id.contains(&['/', '\\'][..]) || stream_id.chars().any(char::is_control) {
        return Err(Error::Validation("stream id contains invalid characters".into()));
    }
    Ok(())
}

/// Percent-encode one URL path segment.
pub fn encode_path_segment(segment: &str) -> String {
    utf8_percent_encode(segment, PATH_SEGMENT).to_string()
}

/// Directory part of a key, `""` for keys at the bucket root.
fn base_dir(key: &str) -> &str {
    key.rfind('/').map_or("", |idx| &key[..idx])
}

fn ends_with_ignore_case(s: &str, suffix: &str) -> bool {
    s.len() >= suffix.len()
        && s.is_char_boundary(s.len() - suffix.len())
        && s[s.len() - suffix.len()..].eq_ignore_ascii_case(suffix)
}

/// Lexically clean a slash-separated path: collapse repeated separators,
/// drop `.` segments, fold `..` into its parent, drop a trailing slash.
/// An empty relative result is `"."`.
pub fn clean_path(path: &str) -> String {
    let rooted = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => match parts.last() {
                Some(&last) if last != ".." => {
                    parts.pop();
                }
                _ if rooted => {}
                _ => parts.push(".."),
            },
            other => parts.push(other),
        }
    }

    let joined = parts.join("/");
    if rooted {
        format!("/{joined}")
    } else if joined.is_empty() {
        ".".to_string()
    } else {
        joined
    }
}
