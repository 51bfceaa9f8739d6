use std::time::{Duration, Instant};

use showroom_catalog::{CameraPose, Catalog, VariantOverrides};
use showroom_stream::{FilterKind, Filters, Theme};
use thiserror::Error;

use crate::resolver;
use crate::state::{Phase, ViewerState};
use crate::surface::RenderSurface;

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("product '{id}' is not in the loaded catalog")]
    ProductNotFound { id: String },
    #[error("variant index {index} out of range for {len} variants")]
    OutOfRange { index: usize, len: usize },
    #[error("asset '{asset}' failed to load: {reason}")]
    ModelLoad { asset: String, reason: String },
}

#[derive(Debug, Clone)]
struct InflightLoad {
    token: u64,
    asset: String,
    issued_at: Instant,
}

/// Owns the viewer state machine. Every mutation happens here; the UI
/// layer only reads the state and the rendering surface only receives
/// instructions.
///
/// Load instructions carry a monotonically increasing token. Completions
/// whose token is not the latest issued belong to a superseded selection
/// and are discarded.
pub struct Controller {
    catalog: Catalog,
    overrides: VariantOverrides,
    state: ViewerState,
    next_token: u64,
    inflight: Option<InflightLoad>,
    load_timeout: Duration,
}

impl Controller {
    pub fn new(catalog: Catalog, overrides: VariantOverrides, load_timeout: Duration) -> Self {
        Self {
            catalog,
            overrides,
            state: ViewerState::new(Theme::Day),
            next_token: 1,
            inflight: None,
            load_timeout,
        }
    }

    pub fn with_theme(mut self, theme: Theme) -> Self {
        self.state.theme = theme;
        self
    }

    pub fn state(&self) -> &ViewerState {
        &self.state
    }

    /// Token of the in-flight load, if any.
    pub fn pending_token(&self) -> Option<u64> {
        self.inflight.as_ref().map(|load| load.token)
    }

    pub fn select_product(
        &mut self,
        id: &str,
        surface: &dyn RenderSurface,
    ) -> Result<(), ControllerError> {
        self.select_product_matching(id, None, surface)
    }

    /// Select a product, preselecting the variant whose asset reference
    /// matches `prior_asset` (used when restoring a shared link).
    pub fn select_product_matching(
        &mut self,
        id: &str,
        prior_asset: Option<&str>,
        surface: &dyn RenderSurface,
    ) -> Result<(), ControllerError> {
        let (resolution, pose, product_id) = {
            let product = self
                .catalog
                .by_id(id)
                .ok_or_else(|| ControllerError::ProductNotFound { id: id.to_string() })?;
            (
                resolver::resolve(product, prior_asset, &self.overrides),
                product.default_pose(),
                product.id.clone(),
            )
        };

        self.state.product_id = Some(product_id);
        self.state.variants = resolution.variants;
        self.state.variant_index = resolution.default_index;
        self.state.camera_pose = pose;
        self.state.filters = Filters::default();
        surface.set_camera_pose(&pose);
        surface.set_filters(&self.state.filters);

        let asset = self
            .state
            .current_asset()
            .map(str::to_string)
            .unwrap_or_default();
        self.issue_load(asset, surface);
        Ok(())
    }

    /// Switch the displayed variant. Camera pose and filters are
    /// intentionally preserved; only an explicit reset touches them.
    pub fn select_variant(
        &mut self,
        index: usize,
        surface: &dyn RenderSurface,
    ) -> Result<(), ControllerError> {
        let len = self.state.variants.len();
        if index >= len {
            return Err(ControllerError::OutOfRange { index, len });
        }
        self.state.variant_index = index;
        let asset = self
            .state
            .current_asset()
            .map(str::to_string)
            .unwrap_or_default();
        self.issue_load(asset, surface);
        Ok(())
    }

    fn issue_load(&mut self, asset: String, surface: &dyn RenderSurface) {
        let token = self.next_token;
        self.next_token += 1;
        surface.load_asset(token, &asset);
        self.inflight = Some(InflightLoad {
            token,
            asset,
            issued_at: Instant::now(),
        });
        self.state.phase = Phase::Loading;
    }

    /// Apply a ready signal from the rendering surface. Returns whether
    /// the signal matched the in-flight load; stale completions are
    /// ignored without touching the state.
    pub fn asset_ready(&mut self, token: u64) -> bool {
        match self.inflight.take() {
            Some(load) if load.token == token => {
                self.state.phase = Phase::Ready;
                true
            }
            other => {
                self.inflight = other;
                log::debug!("discarding stale load completion (token {token})");
                false
            }
        }
    }

    /// Apply a failure signal. A current failure reverts the viewer to
    /// idle and reports which asset broke; a stale one is a no-op.
    pub fn asset_failed(&mut self, token: u64, reason: &str) -> Option<ControllerError> {
        match self.inflight.take() {
            Some(load) if load.token == token => {
                self.state.phase = Phase::Idle;
                Some(ControllerError::ModelLoad {
                    asset: load.asset,
                    reason: reason.to_string(),
                })
            }
            other => {
                self.inflight = other;
                log::debug!("discarding stale load failure (token {token})");
                None
            }
        }
    }

    /// Fail an in-flight load that has outlived the configured deadline.
    pub fn check_load_deadline(&mut self, now: Instant) -> Option<ControllerError> {
        let expired = matches!(
            self.inflight.as_ref(),
            Some(load) if now.duration_since(load.issued_at) >= self.load_timeout
        );
        if !expired {
            return None;
        }
        let load = self.inflight.take()?;
        self.state.phase = Phase::Idle;
        Some(ControllerError::ModelLoad {
            asset: load.asset,
            reason: format!("no ready signal within {}s", self.load_timeout.as_secs()),
        })
    }

    /// Restore the active product's default pose without reloading.
    pub fn reset_view(&mut self, surface: &dyn RenderSurface) {
        let pose = self
            .state
            .product_id
            .as_deref()
            .and_then(|id| self.catalog.by_id(id))
            .map(|product| product.default_pose())
            .unwrap_or(CameraPose::GLOBAL_DEFAULT);
        self.state.camera_pose = pose;
        surface.set_camera_pose(&pose);
    }

    /// The surface reports interactive camera drift; the state keeps
    /// tracking it so reset and share behave relative to reality.
    pub fn record_camera_pose(&mut self, pose: CameraPose) {
        self.state.camera_pose = pose;
    }

    /// Sliders are range-limited by the UI; the controller only clamps
    /// exposure, which is undefined below zero for the rendering surface.
    pub fn set_filter(&mut self, kind: FilterKind, value: f32, surface: &dyn RenderSurface) {
        match kind {
            FilterKind::Brightness => self.state.filters.brightness = value,
            FilterKind::Contrast => self.state.filters.contrast = value,
            FilterKind::Exposure => self.state.filters.exposure = value.max(0.0),
        }
        surface.set_filters(&self.state.filters);
    }

    pub fn reset_filters(&mut self, surface: &dyn RenderSurface) {
        self.state.filters = Filters::default();
        surface.set_filters(&self.state.filters);
    }

    pub fn set_theme(&mut self, theme: Theme) {
        self.state.theme = theme;
    }

    /// Swap in a freshly loaded catalog. When the selected product no
    /// longer exists the state resets to the catalog's first entry.
    pub fn replace_catalog(&mut self, catalog: Catalog, surface: &dyn RenderSurface) {
        let keep = self
            .state
            .product_id
            .as_deref()
            .map_or(false, |id| catalog.by_id(id).is_some());
        self.catalog = catalog;
        if !keep {
            let first_id = self.catalog.first().id.clone();
            if let Err(err) = self.select_product(&first_id, surface) {
                log::warn!("failed to reselect first catalog entry: {err}");
            }
        }
    }
}
