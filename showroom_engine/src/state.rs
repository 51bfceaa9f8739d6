use serde::{Deserialize, Serialize};
use showroom_catalog::{CameraPose, Variant};
use showroom_stream::{self as stream, Filters, StateUpdate, Theme};

/// Lifecycle of the single viewer instance. `Loading` covers both the
/// first asset request and every subsequent product/variant change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Loading,
    Ready,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Loading => "loading",
            Phase::Ready => "ready",
        }
    }
}

/// Single source of truth for what the rendering surface should display.
/// Created once at startup and mutated only by the controller.
#[derive(Debug, Clone, Serialize)]
pub struct ViewerState {
    pub phase: Phase,
    pub product_id: Option<String>,
    pub variant_index: usize,
    pub variants: Vec<Variant>,
    pub camera_pose: CameraPose,
    pub filters: Filters,
    pub theme: Theme,
}

impl ViewerState {
    pub fn new(theme: Theme) -> Self {
        Self {
            phase: Phase::Idle,
            product_id: None,
            variant_index: 0,
            variants: Vec::new(),
            camera_pose: CameraPose::GLOBAL_DEFAULT,
            filters: Filters::default(),
            theme,
        }
    }

    pub fn current_variant(&self) -> Option<&Variant> {
        self.variants.get(self.variant_index)
    }

    pub fn current_asset(&self) -> Option<&str> {
        self.current_variant().and_then(Variant::usable_asset)
    }
}

pub fn pose_to_wire(pose: &CameraPose) -> stream::CameraPose {
    stream::CameraPose {
        theta_deg: pose.theta_deg,
        phi_deg: pose.phi_deg,
        radius_m: pose.radius_m,
        target: pose.target_array(),
        fov_deg: pose.fov_deg,
    }
}

pub fn pose_from_wire(pose: &stream::CameraPose) -> CameraPose {
    CameraPose {
        theta_deg: pose.theta_deg,
        phi_deg: pose.phi_deg,
        radius_m: pose.radius_m,
        target: CameraPose::GLOBAL_DEFAULT.target,
        fov_deg: pose.fov_deg,
    }
    .with_target_array(pose.target)
}

/// Wire snapshot published after every processed command. Sequence and
/// host time are stamped by the stream server.
pub fn state_update(
    state: &ViewerState,
    events: Vec<String>,
    share_url: Option<String>,
) -> StateUpdate {
    StateUpdate {
        seq: 0,
        host_time_ns: 0,
        phase: state.phase.as_str().to_string(),
        product_id: state.product_id.clone(),
        variant_index: state
            .product_id
            .is_some()
            .then(|| state.variant_index as u32),
        variant_asset: state.current_asset().map(str::to_string),
        camera: Some(pose_to_wire(&state.camera_pose)),
        filters: Some(state.filters),
        theme: Some(state.theme),
        share_url,
        events,
    }
}

/// Per-command record written to the state-log artifact in script mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub step: usize,
    pub command: String,
    pub phase: Phase,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub product_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub variant_index: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub variant_asset: Option<String>,
    pub camera: CameraPose,
    pub filters: Filters,
    pub theme: Theme,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub share_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub notice: Option<String>,
}

impl StateSnapshot {
    pub fn capture(
        step: usize,
        command: String,
        state: &ViewerState,
        share_url: Option<String>,
        notice: Option<String>,
    ) -> Self {
        Self {
            step,
            command,
            phase: state.phase,
            product_id: state.product_id.clone(),
            variant_index: state
                .product_id
                .is_some()
                .then(|| state.variant_index as u32),
            variant_asset: state.current_asset().map(str::to_string),
            camera: state.camera_pose,
            filters: state.filters,
            theme: state.theme,
            share_url,
            notice,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_state_is_idle_with_neutral_filters() {
        let state = ViewerState::new(Theme::Day);
        assert_eq!(state.phase, Phase::Idle);
        assert_eq!(state.current_asset(), None);
        assert_eq!(state.filters, Filters::default());
        assert_eq!(state.camera_pose, CameraPose::GLOBAL_DEFAULT);
    }

    #[test]
    fn wire_pose_round_trips() {
        let pose = CameraPose {
            theta_deg: 30.0,
            phi_deg: 60.0,
            radius_m: 3.0,
            fov_deg: 45.0,
            ..CameraPose::GLOBAL_DEFAULT
        }
        .with_target_array([0.1, 0.4, -0.2]);
        let wire = pose_to_wire(&pose);
        assert_eq!(pose_from_wire(&wire), pose);
    }

    #[test]
    fn update_omits_variant_fields_without_a_product() {
        let update = state_update(&ViewerState::new(Theme::Day), Vec::new(), None);
        assert_eq!(update.phase, "idle");
        assert_eq!(update.product_id, None);
        assert_eq!(update.variant_index, None);
        assert_eq!(update.variant_asset, None);
    }
}
