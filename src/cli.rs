use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "fleet")]
#[command(about = "Manage a local fleet of containerized MCP servers")]
pub struct Cli {
    /// Config file path (defaults to fleet.yaml, searched upward)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List managed containers (cleans up orphans first)
    List {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Start a container
    Start {
        /// Container id (full or abbreviated)
        id: String,
    },
    /// Stop a container (30s grace period)
    Stop { id: String },
    /// Restart a container (30s grace period)
    Restart { id: String },
    /// Remove a container and its configured server record
    Remove {
        id: String,

        /// Remove even if running
        #[arg(short, long)]
        force: bool,
    },
    /// Pull an image
    Pull { image: String },
    /// Show managed containers no configured server references
    Orphans {
        /// Stop and remove them
        #[arg(long)]
        cleanup: bool,
    },
    /// Renumber every configured server's host port starting at BASE
    ReallocatePorts { base: u16 },
    /// Recreate running containers with the configured memory/restart settings
    ApplySettings,
    /// List configured servers that need repair
    Dangling {
        #[arg(long)]
        json: bool,
    },
    /// Repair a dangling configured server
    Repair { server_id: String },
    /// Print runtime status changes until interrupted
    Monitor,
}
