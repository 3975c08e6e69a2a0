//! CLI definition using clap

use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Output format for results
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

#[derive(Parser)]
#[command(name = "placa-checker")]
#[command(version)]
#[command(about = "License plate capture validation against a remote recognition service")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Recognition service URL override
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Output format (json, table). Uses config value if not specified.
    #[arg(long, short = 'f', global = true)]
    pub format: Option<OutputFormat>,

    /// Verbose output
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Detect and validate the plate in a single image
    Detect {
        /// Path to image file
        image: PathBuf,

        /// Skip cache lookup (overrides config)
        #[arg(long)]
        no_cache: bool,

        /// Skip local registry enrichment
        #[arg(long)]
        no_registry: bool,
    },

    /// Detect and validate every image in a folder
    Batch {
        /// Path to folder containing images
        folder: PathBuf,

        /// Output file for the JSON report
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Skip cache lookup (overrides config)
        #[arg(long)]
        no_cache: bool,

        /// Number of parallel requests. 0 = auto (CPU count). Uses 4 if not specified.
        #[arg(long, short = 'j')]
        jobs: Option<usize>,
    },

    /// Query the local vehicle registry for a plate
    Lookup {
        /// Plate text to look up (e.g. "ABC-12-34")
        plate: String,
    },

    /// Manage the local vehicle registry
    Registry {
        /// List registered vehicles
        #[arg(long)]
        list: bool,

        /// Import vehicles from a CSV file (matricula,marca,modelo,color,año,propietario_id)
        #[arg(long)]
        import_vehicles: Option<PathBuf>,

        /// Import owners from a CSV file (id,nombre,contacto,telefono)
        #[arg(long)]
        import_owners: Option<PathBuf>,
    },

    /// Manage configuration
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,

        /// Set recognition service URL
        #[arg(long)]
        set_api_url: Option<String>,

        /// Set request timeout in seconds
        #[arg(long)]
        set_timeout: Option<u64>,

        /// Enable/disable response cache
        #[arg(long)]
        set_cache: Option<bool>,

        /// Set default output format
        #[arg(long)]
        set_output: Option<OutputFormat>,

        /// Set local vehicle registry file
        #[arg(long)]
        set_registry: Option<PathBuf>,

        /// Reset to defaults
        #[arg(long)]
        reset: bool,
    },

    /// Manage cache
    Cache {
        /// Clear all cached responses
        #[arg(long)]
        clear: bool,

        /// Show cache statistics
        #[arg(long)]
        stats: bool,
    },
}
