use crate::config::GateMode;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "breedlens-server")]
#[command(author, version, about = "BreedLens animal breed classification server")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the upload server
    Start(StartArgs),

    /// Run the classification pipeline once over a local image file
    CheckImage(CheckImageArgs),
}

#[derive(Args, Debug)]
pub struct StartArgs {
    /// Listen port
    #[arg(short, long, default_value = "3000")]
    pub port: u16,

    /// Listen address
    #[arg(short, long, default_value = "127.0.0.1")]
    pub address: String,

    /// Configuration file path
    #[arg(short, long, default_value = "breedlens.yaml")]
    pub config: String,

    /// Gate mode: off, watchlist, or face
    #[arg(short, long, value_parser = parse_gate_mode)]
    pub gate: Option<GateMode>,

    /// Primary classification model id
    #[arg(short, long)]
    pub model: Option<String>,

    /// Number of predictions to display
    #[arg(long)]
    pub top_n: Option<usize>,

    /// Prompt for a token when no other credential source yields one
    #[arg(long)]
    pub prompt_token: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Args, Debug)]
pub struct CheckImageArgs {
    /// Path to a jpg/jpeg/png image
    pub image: PathBuf,

    /// Configuration file path
    #[arg(short, long, default_value = "breedlens.yaml")]
    pub config: String,

    /// Gate mode: off, watchlist, or face
    #[arg(short, long, value_parser = parse_gate_mode)]
    pub gate: Option<GateMode>,

    /// Primary classification model id
    #[arg(short, long)]
    pub model: Option<String>,

    /// Number of predictions to display
    #[arg(long)]
    pub top_n: Option<usize>,

    /// Write the exported CSV table to this path
    #[arg(short, long)]
    pub export: Option<PathBuf>,

    /// Prompt for a token when no other credential source yields one
    #[arg(long)]
    pub prompt_token: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl StartArgs {
    /// Config overrides carried by these arguments
    pub fn overrides(&self) -> crate::config::Overrides {
        crate::config::Overrides {
            gate: self.gate,
            model: self.model.clone(),
            top_n: self.top_n,
        }
    }
}

impl CheckImageArgs {
    /// Config overrides carried by these arguments
    pub fn overrides(&self) -> crate::config::Overrides {
        crate::config::Overrides {
            gate: self.gate,
            model: self.model.clone(),
            top_n: self.top_n,
        }
    }
}

fn parse_gate_mode(s: &str) -> Result<GateMode, String> {
    s.parse()
}
