use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

/// "0.3.0" for releases, "0.3.0@abc1234 2024-01-15 14:30" for dev builds
fn get_version() -> &'static str {
    const VERSION: &str = env!("CARGO_PKG_VERSION");
    const GIT_HASH: &str = env!("DTLINK_GIT_HASH");
    const COMMIT_DATE: &str = env!("DTLINK_COMMIT_DATE");
    const IS_RELEASE: &str = env!("DTLINK_IS_RELEASE");

    static VERSION_STRING: OnceLock<String> = OnceLock::new();
    VERSION_STRING.get_or_init(|| {
        if IS_RELEASE == "true" || GIT_HASH.is_empty() {
            VERSION.to_string()
        } else {
            format!("{}@{} {}", VERSION, GIT_HASH, COMMIT_DATE)
        }
    })
}

#[derive(Parser, Debug)]
#[command(name = "dtlink", version = get_version())]
#[command(about = "Edit DataTemplates locally and share them through a link store", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Link store URL (overrides DTLINK_SERVER and the configured server-url)
    #[arg(long, global = true)]
    pub server: Option<String>,

    /// Never prompt; password requests and confirmations are declined
    #[arg(long, global = true)]
    pub no_input: bool,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch a remote DataTemplate into a working copy
    Pull {
        /// Remote id
        id: String,

        /// Working copy to write
        #[arg(short, long, default_value = "datatemplate.yml")]
        output: PathBuf,
    },

    /// Save a working copy to the link store
    Push {
        file: PathBuf,

        /// Create a new link even if the file is already linked
        #[arg(long)]
        new: bool,

        /// Overwrite a later remote revision without asking
        #[arg(long)]
        force: bool,
    },

    /// Set open and/or modify passwords on the linked copy
    Protect { file: PathBuf },

    /// List, add or remove data sets
    #[command(alias = "ds")]
    Dataset {
        #[command(subcommand)]
        action: DatasetAction,
    },

    /// Show the data of a data set as a table
    Preview {
        file: PathBuf,

        /// Data set to show (defaults to the first)
        #[arg(short, long)]
        dataset: Option<String>,
    },

    /// Print the payload the renderer would receive
    Render {
        file: PathBuf,

        #[arg(short, long)]
        dataset: Option<String>,
    },

    /// Print the shareable link for a working copy
    Link { file: PathBuf },

    /// Open a shared link (remote or inline) into a working copy
    Open {
        link: String,

        #[arg(short, long, default_value = "datatemplate.yml")]
        output: PathBuf,
    },

    /// Replace a working copy with a pasted DataTemplate (read from stdin or --from)
    Paste {
        output: PathBuf,

        /// Read the pasted text from this file instead of stdin
        #[arg(long)]
        from: Option<PathBuf>,
    },

    /// Print a working copy in portable form
    Export {
        file: PathBuf,

        /// Escape for display inside an HTML page
        #[arg(long, conflicts_with = "wire")]
        html: bool,

        /// Print the JSON payload sent to the store instead
        #[arg(long)]
        wire: bool,

        /// Copy to the clipboard instead of printing
        #[arg(short, long)]
        clipboard: bool,
    },

    /// Get or set configuration
    Config {
        /// Configuration key (e.g., server-url)
        key: Option<String>,

        /// Value to set (if omitted, prints current value)
        value: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum DatasetAction {
    /// List data sets in order
    #[command(alias = "ls")]
    List { file: PathBuf },

    /// Add an empty data set
    Add { file: PathBuf, name: String },

    /// Remove a data set (asks first if it holds anything)
    #[command(alias = "rm")]
    Remove { file: PathBuf, name: String },
}
