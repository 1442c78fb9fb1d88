use crate::config::{Overrides, Settings};
use crate::utils::error::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "equipment-dash")]
#[command(about = "Equipment sensor analytics: datasets, charts and PDF reports")]
#[command(version)]
pub struct CliConfig {
    /// TOML configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Backend base URL, e.g. http://localhost:8000/
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Where the login token and selected dataset are kept
    #[arg(long, global = true)]
    pub session_file: Option<PathBuf>,

    /// Directory for charts and reports
    #[arg(long, global = true)]
    pub output_dir: Option<PathBuf>,

    #[arg(long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Emit logs as JSON")]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Log in and store the token
    Login {
        username: String,
        /// Read from stdin when omitted
        #[arg(long)]
        password: Option<String>,
    },
    /// Create an account and log in
    Register {
        username: String,
        email: String,
        #[arg(long)]
        password: Option<String>,
    },
    /// Log out and forget the stored session
    Logout,
    /// Show the logged-in user
    Profile,
    /// List uploaded datasets
    Datasets,
    /// Show one dataset with its equipment
    Dataset { id: u64 },
    /// Select the dataset the other commands work on
    Select { id: u64 },
    /// Upload an equipment CSV
    Upload {
        file: PathBuf,
        /// Select the new dataset after uploading
        #[arg(long)]
        select: bool,
    },
    /// Delete a dataset (the selected one by default)
    Delete { id: Option<u64> },
    /// Print summary statistics of the selected dataset
    Show {
        /// Also show the detail card of the unit at this index
        #[arg(long)]
        equipment: Option<usize>,
    },
    /// Render the dashboard charts as SVG files
    Charts {
        #[arg(long)]
        out: Option<PathBuf>,
        #[arg(long)]
        equipment: Option<usize>,
    },
    /// Export the dashboard as equipment_report.pdf
    Export {
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Download the server-generated PDF for a dataset
    DownloadReport {
        id: u64,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Check that the backend is reachable
    Health,
}

impl CliConfig {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            base_url: self.base_url.clone(),
            session_file: self.session_file.clone(),
            output_dir: self.output_dir.clone(),
        }
    }

    pub fn settings(&self) -> Result<Settings> {
        Settings::load(self.config.as_deref(), &self.overrides())
    }
}
