use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "streamgate")]
#[command(author, version, about = "Token-gated HLS audio streaming gateway")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the streaming gateway
    Start {
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides config and PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default search if not specified)
        config: Option<PathBuf>,
    },

    /// Generate a random signing secret
    GenerateSecret,

    /// Print a signed stream URL for a stream id
    Sign {
        /// Stream identifier
        stream_id: String,

        /// Token lifetime in minutes
        #[arg(long)]
        ttl: Option<i64>,
    },

    /// Add or update a song in the catalog
    Register {
        /// Public stream identifier
        id: String,

        /// Display name
        name: String,

        /// Folder (or storage URL) holding the song's HLS files
        bucket_folder: String,

        /// Duration in seconds
        #[arg(long, default_value = "0")]
        duration: i64,
    },

    /// List catalog entries
    Songs,

    /// Remove a song from the catalog
    Remove {
        /// Stream identifier
        id: String,
    },

    /// Display version information
    Version,
}
