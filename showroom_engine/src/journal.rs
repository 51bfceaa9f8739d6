use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use showroom_stream::{CameraPose, ControlRequest, FilterKind, Theme};

/// One unit of work for the engine loop. Control-surface requests and
/// rendering-surface completions funnel into the same queue so command
/// ordering stays deterministic under the single-threaded model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum EngineCommand {
    SelectProduct {
        product_id: String,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        variant_asset: Option<String>,
    },
    SelectVariant {
        index: u32,
    },
    SetFilter {
        kind: FilterKind,
        value: f32,
    },
    ResetView,
    ResetFilters,
    SetTheme {
        theme: Theme,
    },
    ToggleTheme,
    Share,
    Ar,
    ReportCameraPose {
        pose: CameraPose,
    },
    /// Re-read the catalog file; the selection resets to the first entry
    /// when the displayed product vanished from the new list.
    ReloadCatalog,
    /// Ready signal from the surface; `token` defaults to the latest
    /// issued load when omitted (script convenience).
    AssetReady {
        #[serde(skip_serializing_if = "Option::is_none", default)]
        token: Option<u64>,
    },
    AssetFailed {
        #[serde(skip_serializing_if = "Option::is_none", default)]
        token: Option<u64>,
        reason: String,
    },
}

impl EngineCommand {
    pub fn from_control(request: ControlRequest) -> Self {
        match request {
            ControlRequest::SelectProduct {
                product_id,
                variant_asset,
            } => EngineCommand::SelectProduct {
                product_id,
                variant_asset,
            },
            ControlRequest::SelectVariant { index } => EngineCommand::SelectVariant { index },
            ControlRequest::SetFilter { kind, value } => EngineCommand::SetFilter { kind, value },
            ControlRequest::ResetView => EngineCommand::ResetView,
            ControlRequest::ResetFilters => EngineCommand::ResetFilters,
            ControlRequest::SetTheme { theme } => EngineCommand::SetTheme { theme },
            ControlRequest::RequestShare => EngineCommand::Share,
            ControlRequest::RequestAr => EngineCommand::Ar,
            ControlRequest::ReportCameraPose { pose } => EngineCommand::ReportCameraPose { pose },
        }
    }

    /// Compact label used in logs and state snapshots.
    pub fn label(&self) -> String {
        match self {
            EngineCommand::SelectProduct {
                product_id,
                variant_asset: None,
            } => format!("product.select {product_id}"),
            EngineCommand::SelectProduct {
                product_id,
                variant_asset: Some(asset),
            } => format!("product.select {product_id} {asset}"),
            EngineCommand::SelectVariant { index } => format!("variant.select {index}"),
            EngineCommand::SetFilter { kind, value } => {
                let channel = match kind {
                    FilterKind::Brightness => "brightness",
                    FilterKind::Contrast => "contrast",
                    FilterKind::Exposure => "exposure",
                };
                format!("filter.{channel} {value:.2}")
            }
            EngineCommand::ResetView => "view.reset".to_string(),
            EngineCommand::ResetFilters => "filter.reset".to_string(),
            EngineCommand::SetTheme { theme } => format!("theme.set {}", theme.as_str()),
            EngineCommand::ToggleTheme => "theme.toggle".to_string(),
            EngineCommand::Share => "share.request".to_string(),
            EngineCommand::Ar => "ar.request".to_string(),
            EngineCommand::ReportCameraPose { .. } => "camera.report".to_string(),
            EngineCommand::ReloadCatalog => "catalog.reload".to_string(),
            EngineCommand::AssetReady { token: Some(token) } => format!("load.ready {token}"),
            EngineCommand::AssetReady { token: None } => "load.ready".to_string(),
            EngineCommand::AssetFailed {
                token: Some(token),
                reason,
            } => format!("load.failed {token} {reason}"),
            EngineCommand::AssetFailed {
                token: None,
                reason,
            } => format!("load.failed {reason}"),
        }
    }
}

/// Keeps engine commands in arrival order and remembers what already ran,
/// so a session can be dumped next to the state log for debugging.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CommandJournal {
    pending: VecDeque<EngineCommand>,
    history: Vec<EngineCommand>,
}

impl CommandJournal {
    pub fn new<C>(commands: C) -> Self
    where
        C: IntoIterator<Item = EngineCommand>,
    {
        CommandJournal {
            pending: commands.into_iter().collect(),
            history: Vec::new(),
        }
    }

    pub fn push(&mut self, command: EngineCommand) {
        self.pending.push_back(command);
    }

    pub fn next(&mut self) -> Option<EngineCommand> {
        let command = self.pending.pop_front()?;
        self.history.push(command.clone());
        Some(command)
    }

    #[allow(dead_code)]
    pub fn peek(&self) -> Option<&EngineCommand> {
        self.pending.front()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    #[allow(dead_code)]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn history(&self) -> &[EngineCommand] {
        &self.history
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn journal_preserves_arrival_order() {
        let mut journal = CommandJournal::new(vec![
            EngineCommand::SelectProduct {
                product_id: "sofa1".to_string(),
                variant_asset: None,
            },
            EngineCommand::AssetReady { token: None },
            EngineCommand::SelectVariant { index: 1 },
        ]);
        assert_eq!(journal.len(), 3);
        assert!(matches!(
            journal.peek(),
            Some(EngineCommand::SelectProduct { .. })
        ));

        let mut labels = Vec::new();
        while let Some(command) = journal.next() {
            labels.push(command.label());
        }
        assert!(journal.is_empty());
        assert_eq!(
            labels,
            vec!["product.select sofa1", "load.ready", "variant.select 1"]
        );
        assert_eq!(journal.history().len(), 3);
    }

    #[test]
    fn script_entries_parse_with_optional_fields() {
        let raw = r#"[
            {"op":"select_product","product_id":"sofa1"},
            {"op":"select_product","product_id":"sofa1","variant_asset":"sofa_cream.glb"},
            {"op":"asset_ready"},
            {"op":"asset_ready","token":3},
            {"op":"asset_failed","reason":"404"},
            {"op":"set_filter","kind":"exposure","value":0.5},
            {"op":"toggle_theme"},
            {"op":"reload_catalog"}
        ]"#;
        let commands: Vec<EngineCommand> = serde_json::from_str(raw).unwrap();
        assert_eq!(commands.len(), 8);
        assert_eq!(commands[3], EngineCommand::AssetReady { token: Some(3) });
        assert_eq!(commands[7], EngineCommand::ReloadCatalog);
    }

    #[test]
    fn control_requests_map_one_to_one() {
        let mapped = EngineCommand::from_control(ControlRequest::SelectVariant { index: 2 });
        assert_eq!(mapped, EngineCommand::SelectVariant { index: 2 });
        let mapped = EngineCommand::from_control(ControlRequest::RequestShare);
        assert_eq!(mapped, EngineCommand::Share);
    }
}
