mod cli;

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use sg_core::config::Config;
use sg_core::token::generate_secret;
use sg_core::TokenSigner;
use sg_db::pool::{get_conn, init_pool, DbPool};
use sg_db::queries::songs;
use sg_db::Song;
use sg_server::routes::token::ttl_minutes;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "streamgate=trace,sg_server=trace,sg_storage=debug,sg_hls=debug,sg_db=debug,tower_http=debug"
                .to_string()
        } else {
            "streamgate=info,sg_server=info,sg_storage=info,sg_db=info,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(env_filter))
        .init();

    match cli.command {
        Commands::Start { host, port } => {
            let mut config = load_config(cli.config.as_deref())?;
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }

            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(sg_server::start(config))?;
            Ok(())
        }
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::GenerateSecret => {
            println!("{}", generate_secret());
            Ok(())
        }
        Commands::Sign { stream_id, ttl } => {
            let config = load_config(cli.config.as_deref())?;
            println!("{}", signed_stream_url(&config, &stream_id, ttl)?);
            Ok(())
        }
        Commands::Register {
            id,
            name,
            bucket_folder,
            duration,
        } => {
            let pool = open_catalog(cli.config.as_deref())?;
            let song = register_song(&pool, &id, &name, &bucket_folder, duration)?;
            println!("Registered {} ({}) -> {}", song.id, song.name, song.bucket_folder);
            Ok(())
        }
        Commands::Songs => {
            let pool = open_catalog(cli.config.as_deref())?;
            let listing = song_listing(&pool)?;
            if listing.is_empty() {
                println!("Catalog is empty");
            }
            for line in listing {
                println!("{line}");
            }
            Ok(())
        }
        Commands::Remove { id } => {
            let pool = open_catalog(cli.config.as_deref())?;
            remove_song(&pool, &id)?;
            println!("Removed {id}");
            Ok(())
        }
        Commands::Version => {
            println!("streamgate {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

/// Config file (or defaults) with environment overrides applied.
fn load_config(path: Option<&Path>) -> Result<Config> {
    let mut config = Config::load_or_default(path).context("Failed to load configuration")?;
    config.apply_env_overrides();
    Ok(config)
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = load_config(path)?;
    match path {
        Some(p) => println!("Validating config: {}", p.display()),
        None => println!("No config file specified, using search path and defaults"),
    }

    config.validate()?;
    println!("✓ Configuration is valid");
    println!("  Server: {}:{}", config.server.host, config.server.port);
    println!("  Storage: {} (bucket {})", config.storage.url, config.storage.bucket);
    println!("  Catalog: {}", config.catalog.db_path.display());
    println!(
        "  Token TTL: {} min (max {})",
        config.auth.default_ttl_minutes, config.auth.max_ttl_minutes
    );
    for warning in config.warnings() {
        println!("  warning: {warning}");
    }
    Ok(())
}

fn open_catalog(config_path: Option<&Path>) -> Result<DbPool> {
    let config = load_config(config_path)?;
    Ok(init_pool(&config.catalog.db_path)?)
}

fn register_song(
    pool: &DbPool,
    id: &str,
    name: &str,
    bucket_folder: &str,
    duration: i64,
) -> Result<Song> {
    sg_hls::validate_stream_id(id)?;
    let conn = get_conn(pool)?;
    Ok(songs::upsert_song(&conn, id, name, duration, bucket_folder)?)
}

/// One tab-separated line per song, ordered by name.
fn song_listing(pool: &DbPool) -> Result<Vec<String>> {
    let conn = get_conn(pool)?;
    let listing = songs::list_songs(&conn)?
        .into_iter()
        .map(|song| {
            format!(
                "{}\t{}\t{}s\t{}",
                song.id, song.name, song.duration_seconds, song.bucket_folder
            )
        })
        .collect();
    Ok(listing)
}

fn remove_song(pool: &DbPool, id: &str) -> Result<()> {
    let conn = get_conn(pool)?;
    if !songs::delete_song(&conn, id)? {
        anyhow::bail!("No song with id {id}");
    }
    Ok(())
}

/// Stream URL for `stream_id`, signed with the configured secret.
fn signed_stream_url(config: &Config, stream_id: &str, ttl: Option<i64>) -> Result<String> {
    sg_hls::validate_stream_id(stream_id)?;
    let signer = TokenSigner::from_config(&config.auth)?;

    let requested = ttl.map(|m| m.to_string());
    let minutes = ttl_minutes(requested.as_deref(), &config.auth);
    let token = signer.generate(
        stream_id,
        Duration::from_secs(minutes.unsigned_abs().saturating_mul(60)),
    );

    Ok(format!(
        "/stream/{}?{}",
        sg_hls::encode_path_segment(stream_id),
        token.query()
    ))
}
