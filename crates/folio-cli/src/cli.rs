use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "folio",
    about = "Folio — organize projects and their media, signed in or offline",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Directory holding projects, media, and session state
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Configuration file (defaults to <data-dir>/folio.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Sign in with the identity provider
    Login,
    /// Continue offline as a guest
    Guest,
    /// Leave the current session
    Logout,
    /// Show the current session
    Whoami,
    /// List projects, newest first
    List(ListArgs),
    /// Create a project
    Add(AddArgs),
    /// Delete projects
    Rm(RmArgs),
    /// Show or export a project's media
    Media(MediaArgs),
    /// Show the effective configuration
    Config(ConfigArgs),
}

#[derive(Args)]
pub struct ListArgs {
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,
}

#[derive(Args)]
pub struct AddArgs {
    #[arg(short, long)]
    pub title: String,
    #[arg(short, long, default_value = "")]
    pub desc: String,
    /// Media file to attach
    #[arg(short, long)]
    pub file: Option<PathBuf>,
    /// Media type of the attachment (guessed from the extension if omitted)
    #[arg(long = "type", requires = "file")]
    pub media_type: Option<String>,
}

#[derive(Args)]
pub struct RmArgs {
    #[arg(required = true)]
    pub ids: Vec<String>,
}

#[derive(Args)]
pub struct MediaArgs {
    pub id: String,
    /// Write the media bytes to this path
    #[arg(short, long)]
    pub out: Option<PathBuf>,
}

#[derive(Args)]
pub struct ConfigArgs {
    /// Write the effective configuration to <data-dir>/folio.toml
    #[arg(long)]
    pub init: bool,
}
