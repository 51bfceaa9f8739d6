use std::{
    fs,
    time::{Duration, Instant},
};

use anyhow::{bail, Context, Result};
use serde_json::{json, Value};
use showroom_catalog::{Catalog, VariantOverrides};
use showroom_stream::{Notice, NoticeLevel};

use crate::cli::RunArgs;
use crate::controller::Controller;
use crate::journal::{CommandJournal, EngineCommand};
use crate::prefs::ThemePrefs;
use crate::share;
use crate::state::{pose_from_wire, state_update, StateSnapshot};
use crate::stream::{InboundEvent, StreamServer};
use crate::surface::{RecordingSurface, RemoteSurface, RenderSurface};

/// What a single processed command produced besides the state mutation.
struct Outcome {
    label: String,
    share_url: Option<String>,
    notice: Option<Notice>,
    events: Vec<String>,
}

impl Outcome {
    fn new(label: String) -> Self {
        Self {
            label,
            share_url: None,
            notice: None,
            events: Vec::new(),
        }
    }

    fn notice(&mut self, level: NoticeLevel, message: impl Into<String>) {
        self.notice = Some(Notice {
            level,
            message: message.into(),
            detail: Value::Null,
        });
    }
}

/// Engine session state shared by the script runner and the serve loop.
struct Session {
    controller: Option<Controller>,
    prefs: ThemePrefs,
    share_base: String,
    catalog_path: std::path::PathBuf,
}

impl Session {
    fn apply(&mut self, command: &EngineCommand, surface: &dyn RenderSurface) -> Outcome {
        let mut outcome = Outcome::new(command.label());

        let Some(controller) = self.controller.as_mut() else {
            outcome.notice(
                NoticeLevel::Error,
                "catalog unavailable; selection controls are disabled",
            );
            return outcome;
        };

        match command {
            EngineCommand::SelectProduct {
                product_id,
                variant_asset,
            } => {
                match controller.select_product_matching(
                    product_id,
                    variant_asset.as_deref(),
                    surface,
                ) {
                    Ok(()) => outcome.events.push(outcome.label.clone()),
                    Err(err) => outcome.notice(NoticeLevel::Error, err.to_string()),
                }
            }
            EngineCommand::SelectVariant { index } => {
                match controller.select_variant(*index as usize, surface) {
                    Ok(()) => outcome.events.push(outcome.label.clone()),
                    Err(err) => {
                        // Out-of-range indices signal a caller bug; the UI
                        // can never produce one.
                        log::error!("rejected variant selection: {err}");
                        outcome.notice(NoticeLevel::Error, err.to_string());
                    }
                }
            }
            EngineCommand::SetFilter { kind, value } => {
                controller.set_filter(*kind, *value, surface);
                outcome.events.push(outcome.label.clone());
            }
            EngineCommand::ResetView => {
                controller.reset_view(surface);
                outcome.events.push(outcome.label.clone());
            }
            EngineCommand::ResetFilters => {
                controller.reset_filters(surface);
                outcome.events.push(outcome.label.clone());
            }
            EngineCommand::SetTheme { theme } => {
                controller.set_theme(*theme);
                self.persist_theme(*theme, &mut outcome);
            }
            EngineCommand::ToggleTheme => {
                let theme = controller.state().theme.toggled();
                controller.set_theme(theme);
                self.persist_theme(theme, &mut outcome);
            }
            EngineCommand::Share => {
                let state = controller.state();
                match (state.product_id.as_deref(), state.current_asset()) {
                    (Some(product_id), asset) => {
                        let url = share::build_share_url(&self.share_base, product_id, asset);
                        outcome.events.push(format!("share.url {url}"));
                        outcome.share_url = Some(url);
                    }
                    (None, _) => {
                        outcome.notice(NoticeLevel::Warning, "nothing selected to share");
                    }
                }
            }
            EngineCommand::Ar => {
                if surface.activate_ar() {
                    outcome.events.push("ar.activate".to_string());
                } else if let Some(asset) = controller.state().current_asset() {
                    let payload = share::build_ar_payload(&self.share_base, asset);
                    outcome.events.push(format!("ar.payload {payload}"));
                    outcome.notice = Some(Notice {
                        level: NoticeLevel::Info,
                        message: "AR is unavailable here; QR payload ready".to_string(),
                        detail: json!({ "payload": payload }),
                    });
                } else {
                    outcome.notice(NoticeLevel::Warning, "no asset selected for AR");
                }
            }
            EngineCommand::ReportCameraPose { pose } => {
                controller.record_camera_pose(pose_from_wire(pose));
                outcome.events.push(outcome.label.clone());
            }
            EngineCommand::ReloadCatalog => match Catalog::load_from_path(&self.catalog_path) {
                Ok(catalog) => {
                    controller.replace_catalog(catalog, surface);
                    outcome.events.push(outcome.label.clone());
                }
                Err(err) => outcome.notice(NoticeLevel::Error, err.to_string()),
            },
            EngineCommand::AssetReady { token } => {
                match token.or_else(|| controller.pending_token()) {
                    Some(token) => {
                        if controller.asset_ready(token) {
                            outcome.events.push(format!("load.ready {token}"));
                        } else {
                            outcome.events.push(format!("load.stale {token}"));
                        }
                    }
                    None => {
                        outcome.notice(NoticeLevel::Warning, "ready signal with no load in flight");
                    }
                }
            }
            EngineCommand::AssetFailed { token, reason } => {
                match token.or_else(|| controller.pending_token()) {
                    Some(token) => match controller.asset_failed(token, reason) {
                        Some(err) => {
                            outcome.events.push(format!("load.failed {token}"));
                            outcome.notice(NoticeLevel::Error, err.to_string());
                        }
                        None => outcome.events.push(format!("load.stale {token}")),
                    },
                    None => {
                        outcome.notice(
                            NoticeLevel::Warning,
                            "failure signal with no load in flight",
                        );
                    }
                }
            }
        }

        outcome
    }

    fn persist_theme(&mut self, theme: showroom_stream::Theme, outcome: &mut Outcome) {
        self.prefs.set_theme(theme);
        outcome.events.push(format!("theme.set {}", theme.as_str()));
        if let Err(err) = self.prefs.save() {
            log::warn!("theme not persisted: {err}");
            outcome.notice(NoticeLevel::Warning, format!("theme not persisted: {err}"));
        }
    }

    fn snapshot(&self, step: usize, outcome: &Outcome) -> Option<StateSnapshot> {
        let controller = self.controller.as_ref()?;
        Some(StateSnapshot::capture(
            step,
            outcome.label.clone(),
            controller.state(),
            outcome.share_url.clone(),
            outcome.notice.as_ref().map(|notice| notice.message.clone()),
        ))
    }
}

pub fn execute(args: RunArgs) -> Result<()> {
    let prefs_path = args.prefs.clone().or_else(ThemePrefs::default_path);
    let prefs = ThemePrefs::load(prefs_path.as_deref()).unwrap_or_else(|err| {
        log::warn!("failed to load preferences: {err}; using defaults");
        ThemePrefs::default()
    });

    let overrides = match args.overrides.as_ref() {
        Some(path) => VariantOverrides::load_from_path(path)
            .with_context(|| format!("loading variant overrides {}", path.display()))?,
        None => VariantOverrides::default(),
    };

    let mut startup = Vec::new();
    if let Some(url) = args.startup_url.as_ref() {
        let params = share::parse_share_query(url);
        match params.product {
            Some(product_id) => startup.push(EngineCommand::SelectProduct {
                product_id,
                variant_asset: params.variant,
            }),
            None => {
                if params.variant.is_some() {
                    log::warn!("startup url names a variant without a product; ignored");
                }
            }
        }
    }

    match (args.script.clone(), args.stream_bind.clone()) {
        (Some(script), _) => run_script(args, script, prefs, overrides, startup),
        (None, Some(bind_addr)) => serve(args, bind_addr, prefs, overrides, startup),
        (None, None) => bail!("run mode requires --script or --stream-bind"),
    }
}

fn run_script(
    args: RunArgs,
    script_path: std::path::PathBuf,
    prefs: ThemePrefs,
    overrides: VariantOverrides,
    startup: Vec<EngineCommand>,
) -> Result<()> {
    let catalog = Catalog::load_from_path(&args.catalog)
        .with_context(|| format!("loading catalog {}", args.catalog.display()))?;
    let theme = prefs.theme();
    let mut session = Session {
        controller: Some(
            Controller::new(
                catalog,
                overrides,
                Duration::from_secs(args.load_timeout_secs),
            )
            .with_theme(theme),
        ),
        prefs,
        share_base: args.share_base,
        catalog_path: args.catalog.clone(),
    };

    let raw = fs::read_to_string(&script_path)
        .with_context(|| format!("reading command script {}", script_path.display()))?;
    let commands: Vec<EngineCommand> = serde_json::from_str(&raw)
        .with_context(|| format!("parsing command script {}", script_path.display()))?;

    let mut journal = CommandJournal::new(startup.into_iter().chain(commands));
    let surface = RecordingSurface::new();
    let mut snapshots: Vec<StateSnapshot> = Vec::new();

    while let Some(command) = journal.next() {
        let outcome = session.apply(&command, &surface);
        if args.verbose {
            println!("[showroom_engine] {}", outcome.label);
        }
        if let Some(snapshot) = session.snapshot(snapshots.len(), &outcome) {
            snapshots.push(snapshot);
        }

        if args.auto_ack {
            let pending = session
                .controller
                .as_ref()
                .and_then(Controller::pending_token);
            if let Some(token) = pending {
                let ack = EngineCommand::AssetReady { token: Some(token) };
                let outcome = session.apply(&ack, &surface);
                if let Some(snapshot) = session.snapshot(snapshots.len(), &outcome) {
                    snapshots.push(snapshot);
                }
            }
        }
    }

    if let Some(path) = args.state_log_json.as_ref() {
        let json =
            serde_json::to_string_pretty(&snapshots).context("serializing state log to JSON")?;
        fs::write(path, &json)
            .with_context(|| format!("writing state log to {}", path.display()))?;
        println!("Saved state log to {}", path.display());
    }

    let final_phase = session
        .controller
        .as_ref()
        .map(|controller| controller.state().phase.as_str())
        .unwrap_or("idle");
    println!(
        "Processed {} commands; final phase {final_phase}",
        journal.history().len()
    );
    Ok(())
}

fn serve(
    args: RunArgs,
    bind_addr: String,
    prefs: ThemePrefs,
    overrides: VariantOverrides,
    startup: Vec<EngineCommand>,
) -> Result<()> {
    let server = StreamServer::bind(&bind_addr, Some(env!("CARGO_PKG_VERSION").to_string()))?;
    if let Some(path) = args.stream_ready_file.as_ref() {
        fs::write(path, server.local_addr().to_string())
            .with_context(|| format!("writing stream ready file {}", path.display()))?;
    }
    log::info!("stream listening on {}", server.local_addr());

    let theme = prefs.theme();
    let controller = match Catalog::load_from_path(&args.catalog) {
        Ok(catalog) => Some(
            Controller::new(
                catalog,
                overrides,
                Duration::from_secs(args.load_timeout_secs),
            )
            .with_theme(theme),
        ),
        Err(err) => {
            // Degraded "no products" mode: the engine stays up and keeps
            // answering, selection is refused with a banner.
            log::error!("catalog unavailable: {err}");
            None
        }
    };
    let mut session = Session {
        controller,
        prefs,
        share_base: args.share_base,
        catalog_path: args.catalog.clone(),
    };

    let surface = RemoteSurface::new(&server);
    let publish = |session: &Session, outcome: &Outcome| {
        if let Some(controller) = session.controller.as_ref() {
            let update = state_update(
                controller.state(),
                outcome.events.clone(),
                outcome.share_url.clone(),
            );
            if let Err(err) = server.send_state_update(update) {
                log::warn!("failed to publish state update: {err}");
            }
        }
        if let Some(notice) = outcome.notice.as_ref() {
            if let Err(err) = server.send_notice(notice) {
                log::warn!("failed to publish notice: {err}");
            }
        }
    };

    for command in &startup {
        let outcome = session.apply(command, &surface);
        publish(&session, &outcome);
    }

    let mut last_heartbeat = Instant::now();
    loop {
        match server.poll_inbound(Duration::from_millis(250)) {
            Some(InboundEvent::Connected { addr }) => {
                log::info!("surface attached from {addr}");
                let outcome = match session.controller.as_ref() {
                    Some(_) => Outcome::new("surface.attach".to_string()),
                    None => {
                        let mut outcome = Outcome::new("surface.attach".to_string());
                        outcome.notice(
                            NoticeLevel::Error,
                            "catalog unavailable; selection controls are disabled",
                        );
                        outcome
                    }
                };
                publish(&session, &outcome);
            }
            Some(InboundEvent::Control(request)) => {
                let command = EngineCommand::from_control(request);
                let outcome = session.apply(&command, &surface);
                publish(&session, &outcome);
                if args.auto_ack {
                    let pending = session
                        .controller
                        .as_ref()
                        .and_then(Controller::pending_token);
                    if let Some(token) = pending {
                        let ack = EngineCommand::AssetReady { token: Some(token) };
                        let outcome = session.apply(&ack, &surface);
                        publish(&session, &outcome);
                    }
                }
            }
            Some(InboundEvent::LoadResult(result)) => {
                let command = match result.outcome {
                    showroom_stream::LoadOutcome::Ready => EngineCommand::AssetReady {
                        token: Some(result.token),
                    },
                    showroom_stream::LoadOutcome::Failed { reason } => EngineCommand::AssetFailed {
                        token: Some(result.token),
                        reason,
                    },
                };
                let outcome = session.apply(&command, &surface);
                publish(&session, &outcome);
            }
            Some(InboundEvent::ArProbe(probe)) => {
                log::debug!("surface reports AR supported={}", probe.supported);
                surface.note_ar_support(probe.supported);
            }
            Some(InboundEvent::Disconnected { reason }) => {
                log::info!("surface detached: {reason}");
            }
            None => {}
        }

        let timed_out = session
            .controller
            .as_mut()
            .and_then(|controller| controller.check_load_deadline(Instant::now()));
        if let Some(err) = timed_out {
            let mut outcome = Outcome::new("load.timeout".to_string());
            outcome.notice(NoticeLevel::Error, err.to_string());
            publish(&session, &outcome);
        }

        if last_heartbeat.elapsed() >= Duration::from_secs(2) {
            if let Err(err) = server.send_heartbeat() {
                log::debug!("heartbeat not sent: {err}");
            }
            last_heartbeat = Instant::now();
        }
    }
}
