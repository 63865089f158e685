//! HLS manifest rewriting.
//!
//! Every URI line of a master or media playlist gets the caller's auth query
//! appended, so the player's follow-up requests for variants and segments
//! carry a valid token. Directives, comments and blank lines are passed
//! through byte-for-byte, as are line endings (LF or CRLF) and a missing
//! newline on the last line.

use std::borrow::Cow;

use bytes::Bytes;

/// Longest line the tokenizer accepts before giving up on a manifest.
pub const MAX_LINE_BYTES: usize = 64 * 1024;

const MANIFEST_EXT: &str = ".m3u8";

/// Schemes of references that must never be prefixed.
const ABSOLUTE_SCHEMES: &[&str] = &["http://", "https://", "data:"];

/// How a line ended in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineTerminator {
    /// Last line of a manifest without a trailing newline.
    None,
    Lf,
    CrLf,
}

impl LineTerminator {
    pub fn as_bytes(self) -> &'static [u8] {
        match self {
            LineTerminator::None => b"",
            LineTerminator::Lf => b"\n",
            LineTerminator::CrLf => b"\r\n",
        }
    }
}

/// Classification of a manifest line by its significant text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Blank,
    /// `#EXT...` tags and `#` comments.
    Directive,
    /// A variant or segment reference.
    Uri,
}

/// One manifest line split into its parts. Concatenating the parts in order
/// reproduces the source line exactly.
///
/// Lines are bytes, not text: titles in `#EXTINF` are often Latin-1 and must
/// not stop the URI lines around them from being rewritten.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestLine<'a> {
    pub leading: &'a [u8],
    pub significant: Cow<'a, [u8]>,
    pub trailing: &'a [u8],
    pub terminator: LineTerminator,
}

impl<'a> ManifestLine<'a> {
    /// Split a line body (terminator already removed) around its trimmed text.
    pub fn parse(body: &'a [u8], terminator: LineTerminator) -> Self {
        let start_trimmed = body.trim_ascii_start();
        let leading = &body[..body.len() - start_trimmed.len()];
        let significant = start_trimmed.trim_ascii_end();
        let trailing = &start_trimmed[significant.len()..];
        Self {
            leading,
            significant: Cow::Borrowed(significant),
            trailing,
            terminator,
        }
    }

    pub fn kind(&self) -> LineKind {
        match self.significant.first() {
            None => LineKind::Blank,
            Some(b'#') => LineKind::Directive,
            Some(_) => LineKind::Uri,
        }
    }

    pub fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self.leading);
        out.extend_from_slice(&self.significant);
        out.extend_from_slice(self.trailing);
        out.extend_from_slice(self.terminator.as_bytes());
    }
}

/// Why a manifest could not be tokenized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanError {
    LineTooLong { line: usize },
}

/// Split a manifest into lines, recording each line's terminator.
pub fn tokenize(data: &[u8]) -> Result<Vec<ManifestLine<'_>>, ScanError> {
    let mut lines = Vec::new();

    for (idx, raw) in data.split_inclusive(|b| *b == b'\n').enumerate() {
        let (body, terminator) = if let Some(body) = raw.strip_suffix(b"\r\n") {
            (body, LineTerminator::CrLf)
        } else if let Some(body) = raw.strip_suffix(b"\n") {
            (body, LineTerminator::Lf)
        } else {
            (raw, LineTerminator::None)
        };

        if body.len() > MAX_LINE_BYTES {
            return Err(ScanError::LineTooLong { line: idx + 1 });
        }

        lines.push(ManifestLine::parse(body, terminator));
    }

    Ok(lines)
}

/// Reassemble tokenized lines into manifest bytes.
pub fn serialize(lines: &[ManifestLine<'_>]) -> Vec<u8> {
    let capacity = lines
        .iter()
        .map(|l| l.leading.len() + l.significant.len() + l.trailing.len() + 2)
        .sum();
    let mut out = Vec::with_capacity(capacity);
    for line in lines {
        line.write_to(&mut out);
    }
    out
}

/// Appends an auth query (and optionally a path prefix) to manifest URIs.
#[derive(Debug, Clone, Default)]
pub struct ManifestRewriter {
    query: String,
    prefix: Option<String>,
}

impl ManifestRewriter {
    /// `query` is appended verbatim, without a leading `?`.
    pub fn new(query: impl Into<String>) -> Self {
        let query: String = query.into();
        Self {
            query: query.trim_start_matches('?').to_string(),
            prefix: None,
        }
    }

    /// Prefix for bare same-directory `.m3u8` references, e.g. `"my-song/"`.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        let prefix: String = prefix.into();
        self.prefix = (!prefix.is_empty()).then_some(prefix);
        self
    }

    /// Rewrite a whole manifest.
    ///
    /// A manifest with an overlong line is returned unmodified.
    pub fn rewrite(&self, manifest: &Bytes) -> Bytes {
        if self.query.is_empty() && self.prefix.is_none() {
            return manifest.clone();
        }

        let mut lines = match tokenize(manifest) {
            Ok(lines) => lines,
            Err(e) => {
                tracing::warn!(error = ?e, "Serving manifest unmodified");
                return manifest.clone();
            }
        };

        for line in lines.iter_mut() {
            if line.kind() == LineKind::Uri {
                let rewritten = self.rewrite_reference_bytes(&line.significant);
                line.significant = Cow::Owned(rewritten);
            }
        }

        Bytes::from(serialize(&lines))
    }

    /// Rewrite one URI reference.
    pub fn rewrite_reference(&self, reference: &str) -> String {
        match String::from_utf8(self.rewrite_reference_bytes(reference.as_bytes())) {
            Ok(out) => out,
            Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
        }
    }

    fn rewrite_reference_bytes(&self, reference: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(
            reference.len() + self.query.len() + self.prefix.as_ref().map_or(0, String::len) + 1,
        );

        if let Some(prefix) = self.prefix.as_deref() {
            if should_prefix(reference, prefix.as_bytes()) {
                out.extend_from_slice(prefix.as_bytes());
            }
        }
        out.extend_from_slice(reference);

        if !self.query.is_empty() {
            if !matches!(reference.last(), Some(b'?' | b'&')) {
                out.push(if reference.contains(&b'?') { b'&' } else { b'?' });
            }
            out.extend_from_slice(self.query.as_bytes());
        }

        out
    }
}

/// Only bare, relative, same-directory manifest names get the prefix.
fn should_prefix(reference: &[u8], prefix: &[u8]) -> bool {
    let path = reference
        .split(|b| *b == b'?')
        .next()
        .unwrap_or(reference);

    ends_with_ignore_case(path, MANIFEST_EXT.as_bytes())
        && !path.starts_with(b"/")
        && !path.starts_with(prefix)
        && !path.contains(&b'/')
        && !ABSOLUTE_SCHEMES
            .iter()
            .any(|scheme| starts_with_ignore_case(path, scheme.as_bytes()))
}

fn ends_with_ignore_case(haystack: &[u8], suffix: &[u8]) -> bool {
    haystack.len() >= suffix.len()
        && haystack[haystack.len() - suffix.len()..].eq_ignore_ascii_case(suffix)
}

fn starts_with_ignore_case(haystack: &[u8], prefix: &[u8]) -> bool {
    haystack.len() >= prefix.len() && haystack[..prefix.len()].eq_ignore_ascii_case(prefix)
}
