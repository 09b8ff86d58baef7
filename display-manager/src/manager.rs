//! Derived resolution state for every attached display.
//!
//! [`ResolutionManager`] turns the registry's display list into
//! [`DisplayResolutionInfo`] records (tier, profile, scaling against the design
//! canvas) and notifies listeners whenever that derived state changes.

use crate::config::Config;
use crate::errors::DisplayError;
use crate::events::{Emitter, Subscription};
use crate::registry::{DisplayRegistry, DisplaySnapshot};
use display_scaling::{
    is_ultra_wide_ratio, AspectRatioType, BackgroundQuality, DisplayDescriptor, DisplayId,
    Resolution, ResolutionCatalog, ResolutionProfile, ResolutionProfileTable, ScalingCalculator,
    ScalingConfiguration,
};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, info, warn};

/// Everything the renderer needs to know about one display.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayResolutionInfo {
    pub display: DisplayDescriptor,
    /// Catalog entry nearest to the native panel resolution.
    pub resolution: Resolution,
    pub profile: ResolutionProfile,
    /// Scaling from the design canvas to the logical display size.
    pub scaling: ScalingConfiguration,
    pub aspect_ratio_type: AspectRatioType,
    pub is_ultra_wide: bool,
    pub is_high_dpi: bool,
}

impl DisplayResolutionInfo {
    /// Derive the info for `display`.
    ///
    /// Tier classification uses the native panel size so a 4K panel at 200%
    /// is still 4K; scaling uses the logical size a full-screen window gets.
    pub fn compute(
        display: &DisplayDescriptor,
        calculator: &ScalingCalculator,
        high_dpi_threshold: f64,
    ) -> Self {
        let native = display.native_size();
        let resolution = ResolutionCatalog::find_best_match(native.width, native.height);
        let profile = *ResolutionProfileTable::profile(resolution.category);
        let scaling = calculator.calculate_scaling_for_display(display);
        let ratio = native.aspect_ratio();

        Self {
            display: display.clone(),
            resolution,
            profile,
            scaling,
            aspect_ratio_type: ResolutionCatalog::classify_aspect_ratio(ratio),
            is_ultra_wide: is_ultra_wide_ratio(ratio),
            is_high_dpi: display.dpi_config().is_high_dpi_at(high_dpi_threshold),
        }
    }

    pub fn id(&self) -> DisplayId {
        self.display.id
    }

    pub fn background_quality(&self) -> BackgroundQuality {
        self.profile.recommended_settings.background_quality
    }
}

/// Derived state across all displays.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionState {
    /// Registry revision this state was computed from.
    pub revision: u64,
    pub available_displays: Vec<DisplayResolutionInfo>,
    pub current_projection_display: Option<DisplayResolutionInfo>,
    pub primary_display: Option<DisplayResolutionInfo>,
}

impl ResolutionState {
    fn compute(snapshot: &DisplaySnapshot, calculator: &ScalingCalculator, threshold: f64) -> Self {
        let available_displays: Vec<DisplayResolutionInfo> = snapshot
            .displays
            .iter()
            .map(|display| DisplayResolutionInfo::compute(display, calculator, threshold))
            .collect();
        let find = |id: DisplayId| available_displays.iter().find(|info| info.id() == id).cloned();

        let current_projection_display = snapshot.projection.and_then(find);
        let primary_display = snapshot.primary_display().and_then(|d| find(d.id));

        Self {
            revision: snapshot.revision,
            available_displays,
            current_projection_display,
            primary_display,
        }
    }

    pub fn display(&self, id: DisplayId) -> Option<&DisplayResolutionInfo> {
        self.available_displays.iter().find(|info| info.id() == id)
    }

    /// The projection display, or the primary display when none is assigned.
    pub fn current_display(&self) -> Option<&DisplayResolutionInfo> {
        self.current_projection_display
            .as_ref()
            .or(self.primary_display.as_ref())
    }

    pub fn recommended_background_quality(&self) -> BackgroundQuality {
        self.current_display()
            .map(DisplayResolutionInfo::background_quality)
            .unwrap_or_default()
    }

    pub fn supports_high_quality(&self) -> bool {
        self.recommended_background_quality().is_high_quality()
    }

    pub fn is_ultra_wide(&self) -> bool {
        self.current_display().map_or(false, |info| info.is_ultra_wide)
    }

    pub fn is_high_dpi(&self) -> bool {
        self.current_display().map_or(false, |info| info.is_high_dpi)
    }
}

/// Where text is being rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextContext {
    /// Operator UI on the primary display, sized by tier and OS scale factor.
    Editor,
    /// Thumbnail of the projection output, sized by tier only.
    Preview,
    /// Full-screen projection output, sized by canvas scaling.
    Projection,
}

struct ManagerShared {
    registry: DisplayRegistry,
    calculator: ScalingCalculator,
    high_dpi_threshold: f64,
    state: RwLock<Option<ResolutionState>>,
    events: Emitter<ResolutionState>,
    init_lock: tokio::sync::Mutex<()>,
    initialized: AtomicBool,
    registry_subscription: Mutex<Option<Subscription>>,
}

impl ManagerShared {
    /// Recompute from the newest registry snapshot and publish the result.
    ///
    /// A result computed from an older revision than the stored state is
    /// discarded, so concurrent recomputations settle on the latest display list.
    fn recompute(&self) -> Result<ResolutionState, DisplayError> {
        let snapshot = self.registry.snapshot();
        let state = catch_unwind(AssertUnwindSafe(|| {
            ResolutionState::compute(&snapshot, &self.calculator, self.high_dpi_threshold)
        }))
        .map_err(DisplayError::from_panic)?;

        {
            let mut current = self.state.write();
            if let Some(existing) = current.as_ref() {
                if existing.revision > state.revision {
                    debug!(
                        "Discarding resolution state for revision {} (have {})",
                        state.revision, existing.revision
                    );
                    return Ok(existing.clone());
                }
            }
            *current = Some(state.clone());
        }

        debug!(
            "Resolution state updated: {} display(s), revision {}",
            state.available_displays.len(),
            state.revision
        );
        self.events.emit(&state);
        Ok(state)
    }
}

/// Shared handle to the resolution manager. Clones observe the same state.
#[derive(Clone)]
pub struct ResolutionManager {
    shared: Arc<ManagerShared>,
}

impl ResolutionManager {
    pub fn new(registry: DisplayRegistry, config: &Config) -> Self {
        Self {
            shared: Arc::new(ManagerShared {
                registry,
                calculator: config.calculator(),
                high_dpi_threshold: config.dpi.high_dpi_threshold,
                state: RwLock::new(None),
                events: Emitter::new("resolution-manager"),
                init_lock: tokio::sync::Mutex::new(()),
                initialized: AtomicBool::new(false),
                registry_subscription: Mutex::new(None),
            }),
        }
    }

    /// Start the registry, compute the initial state and follow display
    /// changes. Idempotent: a second call does not re-enumerate.
    ///
    /// # Errors
    ///
    /// `ComputationFailure` if the initial state cannot be derived; a later
    /// call retries.
    pub async fn initialize(&self) -> Result<(), DisplayError> {
        let _guard = self.shared.init_lock.lock().await;
        if self.is_initialized() {
            debug!("Resolution manager already initialized");
            return Ok(());
        }

        self.shared.registry.start().await;

        let weak: Weak<ManagerShared> = Arc::downgrade(&self.shared);
        let subscription = self.shared.registry.subscribe(move |_snapshot| {
            if let Some(shared) = weak.upgrade() {
                if let Err(e) = shared.recompute() {
                    warn!("Failed to update resolution state: {}", e);
                }
            }
        });
        *self.shared.registry_subscription.lock() = Some(subscription);

        let state = self.shared.recompute()?;
        self.shared.initialized.store(true, Ordering::Release);
        info!(
            "Resolution manager initialized with {} display(s)",
            state.available_displays.len()
        );
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.shared.initialized.load(Ordering::Acquire)
    }

    /// Assign the projection display. Returns false (state unchanged) if the
    /// display is unknown or the host rejects it.
    pub async fn set_projection_display(&self, id: DisplayId) -> bool {
        match self.shared.registry.set_projection_display(id).await {
            Ok(_) => match self.shared.recompute() {
                Ok(_) => true,
                Err(e) => {
                    warn!("Projection display {} set but state update failed: {}", id, e);
                    false
                }
            },
            Err(e) => {
                warn!("Cannot use display {} for projection: {}", id, e);
                false
            }
        }
    }

    /// Re-enumerate displays and recompute. Initializes on first use.
    ///
    /// # Errors
    ///
    /// `ComputationFailure` if the state cannot be derived.
    pub async fn refresh(&self) -> Result<(), DisplayError> {
        if !self.is_initialized() {
            return self.initialize().await;
        }
        self.shared.registry.refresh().await;
        self.shared.recompute()?;
        Ok(())
    }

    pub fn registry(&self) -> &DisplayRegistry {
        &self.shared.registry
    }

    pub fn calculator(&self) -> &ScalingCalculator {
        &self.shared.calculator
    }

    /// Latest derived state, or `None` before initialization.
    pub fn state(&self) -> Option<ResolutionState> {
        self.shared.state.read().clone()
    }

    pub fn display_info(&self, id: DisplayId) -> Option<DisplayResolutionInfo> {
        self.shared.state.read().as_ref()?.display(id).cloned()
    }

    pub fn current_display(&self) -> Option<DisplayResolutionInfo> {
        self.shared.state.read().as_ref()?.current_display().cloned()
    }

    pub fn current_scaling(&self) -> Option<ScalingConfiguration> {
        self.current_display().map(|info| info.scaling)
    }

    pub fn recommended_background_quality(&self) -> BackgroundQuality {
        self.shared
            .state
            .read()
            .as_ref()
            .map(ResolutionState::recommended_background_quality)
            .unwrap_or_default()
    }

    pub fn supports_high_quality(&self) -> bool {
        self.recommended_background_quality().is_high_quality()
    }

    pub fn is_current_display_ultra_wide(&self) -> bool {
        self.shared
            .state
            .read()
            .as_ref()
            .map_or(false, ResolutionState::is_ultra_wide)
    }

    pub fn is_current_display_high_dpi(&self) -> bool {
        self.shared
            .state
            .read()
            .as_ref()
            .map_or(false, ResolutionState::is_high_dpi)
    }

    /// Canvas-scaled text size on the current display.
    pub fn scale_text_size(&self, base_size: f64) -> Option<f64> {
        let scaling = self.current_scaling()?;
        Some(self.shared.calculator.scale_text_size(base_size, &scaling))
    }

    /// Profile-based text size on the current display, at its scale factor.
    pub fn optimal_text_size(&self, base_size: f64) -> Option<f64> {
        let info = self.current_display()?;
        Some(self.shared.calculator.calculate_optimal_text_size(
            base_size,
            &info.resolution,
            info.display.effective_scale_factor(),
        ))
    }

    /// Text size for a rendering context, or `None` when no display is known.
    pub fn text_size(&self, base_size: f64, context: TextContext) -> Option<f64> {
        let state = self.state()?;
        let calculator = &self.shared.calculator;
        match context {
            TextContext::Editor => {
                let primary = state.primary_display.as_ref()?;
                Some(calculator.calculate_optimal_text_size(
                    base_size,
                    &primary.resolution,
                    primary.display.effective_scale_factor(),
                ))
            }
            TextContext::Preview => {
                let current = state.current_display()?;
                Some(calculator.calculate_optimal_text_size(base_size, &current.resolution, 1.0))
            }
            TextContext::Projection => {
                let current = state.current_display()?;
                Some(calculator.scale_text_size(base_size, &current.scaling))
            }
        }
    }

    /// Listen for derived state changes.
    pub fn on_state_change<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&ResolutionState) + Send + Sync + 'static,
    {
        self.shared.events.subscribe(callback)
    }

    /// Receive derived state changes on a channel.
    pub fn state_channel(&self) -> (Subscription, flume::Receiver<ResolutionState>) {
        self.shared.events.channel()
    }
}
