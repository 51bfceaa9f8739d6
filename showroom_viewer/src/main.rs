mod cli;
mod client;
mod panel;

use std::fs;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use showroom_catalog::Catalog;
use showroom_stream::{ArProbe, LoadOutcome, LoadResult, NoticeLevel, Theme};

use crate::client::{EngineLink, LinkEvent};
use crate::panel::{PanelEvent, ViewModel, control_for};

fn main() -> Result<()> {
    env_logger::init();
    let args = cli::Args::parse();

    let catalog = match Catalog::load_from_path(&args.catalog) {
        Ok(catalog) => Some(catalog),
        Err(err) => {
            log::error!("catalog unavailable: {err}");
            None
        }
    };

    let scripted: Vec<PanelEvent> = match args.event_script.as_ref() {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("reading event script {}", path.display()))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("parsing event script {}", path.display()))?
        }
        None => Vec::new(),
    };

    let link = EngineLink::connect(args.connect.clone());
    let mut pending = scripted.into_iter();
    let mut theme = Theme::Day;
    let mut updates_seen: u64 = 0;

    loop {
        let Some(event) = link.poll_event(Duration::from_millis(250)) else {
            continue;
        };
        match event {
            LinkEvent::Connecting { addr, attempt } => {
                log::debug!("connecting to {addr} (attempt {attempt})");
            }
            LinkEvent::Connected(hello) => {
                log::info!(
                    "connected to {} ({})",
                    hello.producer,
                    hello.build.as_deref().unwrap_or("unknown build")
                );
                let probe = ArProbe {
                    supported: args.ar_supported,
                    payload: None,
                };
                if let Err(err) = link.send_ar_probe(&probe) {
                    log::warn!("failed to report AR capability: {err}");
                }
                for panel_event in pending.by_ref() {
                    let request = control_for(&panel_event, theme);
                    if let Err(err) = link.send_control(&request) {
                        log::warn!("failed to send control request: {err}");
                        break;
                    }
                }
            }
            LinkEvent::Load(load) => {
                log::info!("engine requests asset '{}' (token {})", load.asset, load.token);
                if args.auto_ack {
                    let result = LoadResult {
                        token: load.token,
                        outcome: LoadOutcome::Ready,
                    };
                    if let Err(err) = link.send_load_result(&result) {
                        log::warn!("failed to acknowledge load: {err}");
                    }
                }
            }
            LinkEvent::State(update) => {
                if let Some(current) = update.theme {
                    theme = current;
                }
                let view = ViewModel::render(catalog.as_ref(), &update);
                print_view(&view);
                updates_seen += 1;
                if let Some(limit) = args.exit_after_updates {
                    if updates_seen >= limit {
                        break;
                    }
                }
            }
            LinkEvent::Notice(notice) => match notice.level {
                NoticeLevel::Info => log::info!("{}", notice.message),
                NoticeLevel::Warning => log::warn!("{}", notice.message),
                NoticeLevel::Error => log::error!("{}", notice.message),
            },
            LinkEvent::Disconnected { reason } => {
                log::info!("engine link dropped: {reason}");
            }
        }
    }

    Ok(())
}

/// Text rendition of the panel; a GUI shell would consume the same view
/// model instead of these prints.
fn print_view(view: &ViewModel) {
    if let Some(banner) = view.banner.as_deref() {
        println!("! {banner}");
        return;
    }
    if view.loading_visible {
        println!("~ loading");
    }
    if !view.detail_text.is_empty() {
        println!("{}", view.detail_text);
    }
    if let Some(dimensions) = view.dimensions_text.as_deref() {
        println!("  {dimensions}");
    }
    if let Some(materials) = view.materials_text.as_deref() {
        println!("  {materials}");
    }
    if !view.swatches.is_empty() {
        let row: Vec<String> = view
            .swatches
            .iter()
            .map(|swatch| {
                if swatch.active {
                    format!("[{}]", swatch.label)
                } else {
                    swatch.label.clone()
                }
            })
            .collect();
        println!("  swatches: {}", row.join(" "));
    }
    println!(
        "  filters: brightness {:.2} contrast {:.2} exposure {:.2} | theme {}",
        view.brightness,
        view.contrast,
        view.exposure,
        view.theme.as_str()
    );
    if let Some(url) = view.share_url.as_deref() {
        println!("  share: {url}");
    }
}
