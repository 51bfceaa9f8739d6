use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use serde::Serialize;
use showroom_catalog::CameraPose;
use showroom_stream::{Filters, LoadAsset};

use crate::stream::StreamServer;

/// Instructions the engine issues to whatever hosts the 3D view. Load
/// completions come back separately as ready/failed signals carrying the
/// instruction token.
pub trait RenderSurface {
    fn load_asset(&self, token: u64, asset: &str);
    fn set_camera_pose(&self, pose: &CameraPose);
    fn set_filters(&self, filters: &Filters);
    fn activate_ar(&self) -> bool;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SurfaceEvent {
    LoadAsset { token: u64, asset: String },
    SetCameraPose { pose: CameraPose },
    SetFilters { filters: Filters },
    ActivateAr,
}

/// Headless stand-in that records every instruction; used by the script
/// runner and by controller tests.
#[derive(Clone, Default)]
pub struct RecordingSurface {
    events: Rc<RefCell<Vec<SurfaceEvent>>>,
    ar_supported: bool,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    #[allow(dead_code)]
    pub fn with_ar_support(supported: bool) -> Self {
        Self {
            events: Rc::new(RefCell::new(Vec::new())),
            ar_supported: supported,
        }
    }

    #[allow(dead_code)]
    pub fn events(&self) -> Vec<SurfaceEvent> {
        self.events.borrow().clone()
    }

    #[allow(dead_code)]
    pub fn last_load(&self) -> Option<(u64, String)> {
        self.events
            .borrow()
            .iter()
            .rev()
            .find_map(|event| match event {
                SurfaceEvent::LoadAsset { token, asset } => Some((*token, asset.clone())),
                _ => None,
            })
    }
}

impl RenderSurface for RecordingSurface {
    fn load_asset(&self, token: u64, asset: &str) {
        self.events.borrow_mut().push(SurfaceEvent::LoadAsset {
            token,
            asset: asset.to_string(),
        });
    }

    fn set_camera_pose(&self, pose: &CameraPose) {
        self.events
            .borrow_mut()
            .push(SurfaceEvent::SetCameraPose { pose: *pose });
    }

    fn set_filters(&self, filters: &Filters) {
        self.events
            .borrow_mut()
            .push(SurfaceEvent::SetFilters { filters: *filters });
    }

    fn activate_ar(&self) -> bool {
        self.events.borrow_mut().push(SurfaceEvent::ActivateAr);
        self.ar_supported
    }
}

/// Surface backed by the stream server: load instructions go out as
/// framed messages; pose and filter values ride the state update that
/// follows every command, so the dedicated setters are no-ops here.
pub struct RemoteSurface<'a> {
    server: &'a StreamServer,
    ar_supported: Cell<bool>,
}

impl<'a> RemoteSurface<'a> {
    pub fn new(server: &'a StreamServer) -> Self {
        Self {
            server,
            ar_supported: Cell::new(false),
        }
    }

    /// Remember the most recent AR capability probe from the surface.
    pub fn note_ar_support(&self, supported: bool) {
        self.ar_supported.set(supported);
    }
}

impl RenderSurface for RemoteSurface<'_> {
    fn load_asset(&self, token: u64, asset: &str) {
        let load = LoadAsset {
            token,
            asset: asset.to_string(),
        };
        if let Err(err) = self.server.send_load_asset(&load) {
            log::warn!("failed to send load instruction for '{asset}': {err}");
        }
    }

    fn set_camera_pose(&self, _pose: &CameraPose) {}

    fn set_filters(&self, _filters: &Filters) {}

    fn activate_ar(&self) -> bool {
        self.ar_supported.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_surface_tracks_instruction_order() {
        let surface = RecordingSurface::new();
        surface.set_filters(&Filters::default());
        surface.load_asset(1, "sofa_black.glb");
        surface.load_asset(2, "sofa_cream.glb");

        assert_eq!(surface.events().len(), 3);
        assert_eq!(surface.last_load(), Some((2, "sofa_cream.glb".to_string())));
    }

    #[test]
    fn recording_surface_reports_configured_ar_support() {
        let surface = RecordingSurface::with_ar_support(true);
        assert!(surface.activate_ar());
        assert_eq!(surface.events(), vec![SurfaceEvent::ActivateAr]);
    }
}
