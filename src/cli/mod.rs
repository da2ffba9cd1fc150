use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub mod commands;

#[derive(Parser)]
#[command(name = "field-dispatch")]
#[command(about = "Field agent dispatch and live tracking")]
#[command(long_about = "field-dispatch loads a shift manifest of field agents and high-risk cases, \
                       dispatches cases into agent itineraries, orders visits by distance, and streams \
                       live positions. Locations stay hidden until an agent's identity is verified.")]
pub struct Cli {
    /// Shift manifest to load (defaults to shift.manifest_path from configuration)
    #[arg(long, global = true, help = "Path to the shift manifest TOML file")]
    pub manifest: Option<PathBuf>,

    /// Print machine-readable JSON instead of the formatted report
    #[arg(long, global = true, help = "Emit JSON output")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show every agent as operators see it
    Status,
    /// List cases waiting for dispatch
    Pool,
    /// Dispatch a case to an agent
    Dispatch {
        /// Target agent
        #[arg(long, help = "Agent id, e.g. FA-101")]
        agent: Option<String>,
        /// Case to dispatch
        #[arg(long, help = "Case id from the portfolio")]
        case: String,
    },
    /// Reorder an agent's itinerary by distance
    Optimize {
        /// Agent whose itinerary is reordered
        #[arg(long, help = "Agent id, e.g. FA-101")]
        agent: Option<String>,
    },
    /// Run an identity verification with the simulated camera
    Verify {
        /// Agent to verify
        #[arg(long, help = "Agent id, e.g. FA-101")]
        agent: String,
    },
    /// Run the geo clock and print position frames
    Track {
        /// Number of frames to print before stopping
        #[arg(long, default_value = "5", help = "Stop after this many ticks (Ctrl-C stops early)")]
        ticks: u64,
        /// Tick interval override in milliseconds
        #[arg(long, help = "Override tracking.tick_interval_ms")]
        interval_ms: Option<u64>,
    },
}
