use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    about = "Control panel and rendering-surface stand-in for the showroom engine",
    version
)]
pub struct Args {
    /// Engine stream address to connect to
    #[arg(long, default_value = "127.0.0.1:47810")]
    pub connect: String,

    /// Path to the product catalog JSON backing the panel widgets
    #[arg(long, default_value = "assets/catalog.json")]
    pub catalog: PathBuf,

    /// Acknowledge load instructions immediately, standing in for the rendering surface
    #[arg(long)]
    pub auto_ack: bool,

    /// Report AR as supported when the engine probes
    #[arg(long)]
    pub ar_supported: bool,

    /// Panel event script (JSON array) replayed once connected
    #[arg(long)]
    pub event_script: Option<PathBuf>,

    /// Exit after receiving this many state updates (automation)
    #[arg(long)]
    pub exit_after_updates: Option<u64>,
}
