use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    about = "Headless state engine for the showroom product viewer",
    version
)]
pub struct Args {
    /// Path to the product catalog JSON
    #[arg(long, default_value = "assets/catalog.json")]
    pub catalog: PathBuf,

    /// Optional per-product default-variant override table (JSON)
    #[arg(long)]
    pub overrides: Option<PathBuf>,

    /// Preferences file holding the persisted theme (default: platform config dir)
    #[arg(long)]
    pub prefs: Option<PathBuf>,

    /// Base URL used when building share links and AR payloads
    #[arg(long, default_value = "https://showroom.example/viewer")]
    pub share_base: String,

    /// Startup deep link (full URL or query string) selecting product/variant
    #[arg(long)]
    pub startup_url: Option<String>,

    /// Bind address for the control/rendering stream (serve mode)
    #[arg(long)]
    pub stream_bind: Option<String>,

    /// Optional file announcing the bound stream address once listening
    #[arg(long)]
    pub stream_ready_file: Option<PathBuf>,

    /// Headless command script (JSON array) executed instead of serving
    #[arg(long)]
    pub script: Option<PathBuf>,

    /// Acknowledge every issued load immediately (no rendering surface attached)
    #[arg(long)]
    pub auto_ack: bool,

    /// Path to write per-command state snapshots as JSON (script mode)
    #[arg(long)]
    pub state_log_json: Option<PathBuf>,

    /// Seconds before an unanswered asset load is treated as failed
    #[arg(long, default_value_t = 30)]
    pub load_timeout_secs: u64,

    /// Asset root scanned to audit catalog references (inspect mode)
    #[arg(long)]
    pub asset_root: Option<PathBuf>,

    /// Path to write the asset audit as JSON (inspect mode)
    #[arg(long)]
    pub asset_audit_json: Option<PathBuf>,

    /// Path to write the grouped catalog summary as JSON (inspect mode)
    #[arg(long)]
    pub catalog_summary_json: Option<PathBuf>,

    /// Print per-command detail
    #[arg(long)]
    pub verbose: bool,
}

#[derive(Debug)]
pub enum Command {
    Run(RunArgs),
    Inspect(InspectArgs),
}

#[derive(Debug)]
pub struct RunArgs {
    pub catalog: PathBuf,
    pub overrides: Option<PathBuf>,
    pub prefs: Option<PathBuf>,
    pub share_base: String,
    pub startup_url: Option<String>,
    pub stream_bind: Option<String>,
    pub stream_ready_file: Option<PathBuf>,
    pub script: Option<PathBuf>,
    pub auto_ack: bool,
    pub state_log_json: Option<PathBuf>,
    pub load_timeout_secs: u64,
    pub verbose: bool,
}

#[derive(Debug)]
pub struct InspectArgs {
    pub catalog: PathBuf,
    pub overrides: Option<PathBuf>,
    pub asset_root: Option<PathBuf>,
    pub asset_audit_json: Option<PathBuf>,
    pub catalog_summary_json: Option<PathBuf>,
    pub verbose: bool,
}

pub fn parse() -> Result<Command> {
    let args = Args::parse();
    args.into_command()
}

impl Args {
    fn into_command(self) -> Result<Command> {
        let running = self.script.is_some() || self.stream_bind.is_some();

        if self.script.is_some() && self.stream_bind.is_some() {
            bail!("--script and --stream-bind cannot be combined");
        }
        if self.state_log_json.is_some() && self.script.is_none() {
            bail!("--state-log-json requires --script");
        }
        if self.auto_ack && !running {
            bail!("--auto-ack requires --script or --stream-bind");
        }
        if self.stream_ready_file.is_some() && self.stream_bind.is_none() {
            bail!("--stream-ready-file requires --stream-bind");
        }

        if running {
            if let Some(path) = self.asset_audit_json.as_ref() {
                eprintln!(
                    "[showroom_engine] warning: --asset-audit-json={} ignored outside inspect mode",
                    path.display()
                );
            }
            if let Some(path) = self.catalog_summary_json.as_ref() {
                eprintln!(
                    "[showroom_engine] warning: --catalog-summary-json={} ignored outside inspect mode",
                    path.display()
                );
            }
            Ok(Command::Run(RunArgs {
                catalog: self.catalog,
                overrides: self.overrides,
                prefs: self.prefs,
                share_base: self.share_base,
                startup_url: self.startup_url,
                stream_bind: self.stream_bind,
                stream_ready_file: self.stream_ready_file,
                script: self.script,
                auto_ack: self.auto_ack,
                state_log_json: self.state_log_json,
                load_timeout_secs: self.load_timeout_secs,
                verbose: self.verbose,
            }))
        } else {
            if let Some(url) = self.startup_url.as_ref() {
                eprintln!("[showroom_engine] warning: --startup-url={url} ignored in inspect mode");
            }
            Ok(Command::Inspect(InspectArgs {
                catalog: self.catalog,
                overrides: self.overrides,
                asset_root: self.asset_root,
                asset_audit_json: self.asset_audit_json,
                catalog_summary_json: self.catalog_summary_json,
                verbose: self.verbose,
            }))
        }
    }
}
