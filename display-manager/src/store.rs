//! UI-facing display state container.
//!
//! [`DisplayStateStore`] flattens the manager and registry into one
//! [`StoreState`] value with loading and error tracking, so a view layer can
//! render from a single snapshot and re-render on each published change.

use crate::events::{Emitter, Subscription};
use crate::manager::{DisplayResolutionInfo, ResolutionManager, TextContext};
use crate::registry::DisplayRegistry;
use display_scaling::{BackgroundQuality, DisplayDescriptor, DisplayId};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, info, warn};

/// Lifecycle phase of the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorePhase {
    Uninitialized,
    Initializing,
    Ready,
    /// An operation is in flight.
    Loading,
    /// The last operation failed; the next success or display change recovers.
    Error,
}

impl fmt::Display for StorePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uninitialized => "uninitialized",
            Self::Initializing => "initializing",
            Self::Ready => "ready",
            Self::Loading => "loading",
            Self::Error => "error",
        };
        f.write_str(name)
    }
}

/// Everything a view needs to render display-dependent UI.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreState {
    pub phase: StorePhase,
    pub is_loading: bool,
    pub error: Option<String>,
    pub available_displays: Vec<DisplayResolutionInfo>,
    /// The projection display, or the primary display when none is assigned.
    pub current_resolution: Option<DisplayResolutionInfo>,
    pub primary_display: Option<DisplayResolutionInfo>,
    pub screens: Vec<DisplayDescriptor>,
    pub projection_screen: Option<DisplayDescriptor>,
    pub supports_high_quality: bool,
    pub is_ultra_wide: bool,
    pub is_high_dpi: bool,
    pub recommended_background_quality: BackgroundQuality,
}

impl Default for StoreState {
    fn default() -> Self {
        Self {
            phase: StorePhase::Uninitialized,
            is_loading: false,
            error: None,
            available_displays: Vec::new(),
            current_resolution: None,
            primary_display: None,
            screens: Vec::new(),
            projection_screen: None,
            supports_high_quality: false,
            is_ultra_wide: false,
            is_high_dpi: false,
            recommended_background_quality: BackgroundQuality::default(),
        }
    }
}

struct StoreShared {
    manager: ResolutionManager,
    registry: DisplayRegistry,
    state: RwLock<StoreState>,
    events: Emitter<StoreState>,
    init_lock: tokio::sync::Mutex<()>,
    initialized: AtomicBool,
    /// Operations between `begin` and `finish`; only changed under the state lock.
    in_flight: AtomicUsize,
    subscriptions: Mutex<Vec<Subscription>>,
}

impl StoreShared {
    /// Apply `update` under the lock, then notify with the resulting state.
    fn publish(&self, update: impl FnOnce(&mut StoreState)) -> StoreState {
        let state = {
            let mut state = self.state.write();
            update(&mut state);
            state.clone()
        };
        self.events.emit(&state);
        state
    }

    /// Rebuild every derived field from the manager and registry.
    fn derive_into(&self, state: &mut StoreState) {
        let resolution = self.manager.state().unwrap_or_default();

        state.current_resolution = resolution.current_display().cloned();
        state.supports_high_quality = resolution.supports_high_quality();
        state.is_ultra_wide = resolution.is_ultra_wide();
        state.is_high_dpi = resolution.is_high_dpi();
        state.recommended_background_quality = resolution.recommended_background_quality();
        state.available_displays = resolution.available_displays;
        state.primary_display = resolution.primary_display;
        state.screens = self.registry.displays();
        state.projection_screen = self.registry.projection_display();
    }

    fn on_display_change(&self) {
        self.publish(|state| {
            self.derive_into(state);
            if state.phase == StorePhase::Error {
                state.phase = StorePhase::Ready;
                state.error = None;
            }
        });
    }

    fn begin(&self) {
        self.publish(|state| {
            self.in_flight.fetch_add(1, Ordering::SeqCst);
            state.phase = StorePhase::Loading;
            state.is_loading = true;
        });
    }

    fn finish(&self, result: Result<(), String>) -> StoreState {
        self.publish(|state| {
            self.derive_into(state);
            let remaining = self
                .in_flight
                .load(Ordering::SeqCst)
                .saturating_sub(1);
            self.in_flight.store(remaining, Ordering::SeqCst);
            state.error = result.err();

            if remaining > 0 {
                state.phase = StorePhase::Loading;
                state.is_loading = true;
            } else {
                state.is_loading = false;
                state.phase = if state.error.is_some() {
                    StorePhase::Error
                } else {
                    StorePhase::Ready
                };
            }
        })
    }
}

/// Shared handle to the display state store.
#[derive(Clone)]
pub struct DisplayStateStore {
    shared: Arc<StoreShared>,
}

impl DisplayStateStore {
    pub fn new(manager: ResolutionManager) -> Self {
        let registry = manager.registry().clone();
        Self {
            shared: Arc::new(StoreShared {
                manager,
                registry,
                state: RwLock::new(StoreState::default()),
                events: Emitter::new("display-store"),
                init_lock: tokio::sync::Mutex::new(()),
                initialized: AtomicBool::new(false),
                in_flight: AtomicUsize::new(0),
                subscriptions: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Initialize the manager and registry together and start following
    /// changes. Idempotent; a failed attempt can be retried.
    pub async fn initialize(&self) {
        let _guard = self.shared.init_lock.lock().await;
        if self.shared.initialized.load(Ordering::Acquire) {
            debug!("Display store already initialized");
            return;
        }

        self.shared.publish(|state| {
            self.shared.in_flight.fetch_add(1, Ordering::SeqCst);
            state.phase = StorePhase::Initializing;
            state.is_loading = true;
            state.error = None;
        });

        let (result, ()) = futures::future::join(
            self.shared.manager.initialize(),
            self.shared.registry.start(),
        )
        .await;

        if let Err(e) = result {
            warn!("Display store initialization failed: {}", e);
            self.shared.finish(Err(e.to_string()));
            return;
        }

        let on_manager = {
            let weak: Weak<StoreShared> = Arc::downgrade(&self.shared);
            self.shared.manager.on_state_change(move |_| {
                if let Some(shared) = weak.upgrade() {
                    shared.on_display_change();
                }
            })
        };
        let on_registry = {
            let weak: Weak<StoreShared> = Arc::downgrade(&self.shared);
            self.shared.registry.subscribe(move |_| {
                if let Some(shared) = weak.upgrade() {
                    shared.on_display_change();
                }
            })
        };
        self.shared
            .subscriptions
            .lock()
            .extend([on_manager, on_registry]);

        self.shared.initialized.store(true, Ordering::Release);
        let state = self.shared.finish(Ok(()));
        info!(
            "Display store ready with {} display(s)",
            state.available_displays.len()
        );
    }

    pub fn is_initialized(&self) -> bool {
        self.shared.initialized.load(Ordering::Acquire)
    }

    /// Assign the projection display. On failure the store enters the error
    /// phase and the display list is unchanged.
    pub async fn set_projection_display(&self, id: DisplayId) -> bool {
        self.shared.begin();
        let assigned = self.shared.manager.set_projection_display(id).await;
        let result = if assigned {
            Ok(())
        } else {
            Err(format!("Display {} is not available for projection", id))
        };
        self.shared.finish(result);
        assigned
    }

    /// Re-enumerate displays. Initializes on first use.
    pub async fn refresh(&self) {
        if !self.is_initialized() {
            self.initialize().await;
            return;
        }

        self.shared.begin();
        let result = self.shared.manager.refresh().await;
        if let Err(e) = &result {
            warn!("Display refresh failed: {}", e);
        }
        self.shared.finish(result.map_err(|e| e.to_string()));
    }

    /// Text size for a rendering context.
    ///
    /// Returns `base_size` unchanged when no display is known or sizing fails.
    pub fn get_optimal_text_size(&self, base_size: f64, context: TextContext) -> f64 {
        let manager = &self.shared.manager;
        let sized = catch_unwind(AssertUnwindSafe(|| manager.text_size(base_size, context)))
            .ok()
            .flatten()
            .filter(|size| size.is_finite());

        match sized {
            Some(size) => size,
            None => {
                debug!("No text sizing available for {:?}; using base size", context);
                base_size
            }
        }
    }

    pub fn state(&self) -> StoreState {
        self.shared.state.read().clone()
    }

    pub fn phase(&self) -> StorePhase {
        self.shared.state.read().phase
    }

    pub fn manager(&self) -> &ResolutionManager {
        &self.shared.manager
    }

    /// Listen for store updates.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&StoreState) + Send + Sync + 'static,
    {
        self.shared.events.subscribe(callback)
    }

    /// Receive store updates on a channel.
    pub fn channel(&self) -> (Subscription, flume::Receiver<StoreState>) {
        self.shared.events.channel()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::host::{DisplayHost, NullDisplayHost, SimulatedDisplayHost};
    use display_common::Rect;
    use pretty_assertions::assert_eq;

    fn create_test_display(id: u64, x: i32, width: u32, height: u32) -> DisplayDescriptor {
        DisplayDescriptor::new(id, Rect::new(x, 0, width, height))
    }

    fn store_for(host: Arc<dyn DisplayHost>) -> DisplayStateStore {
        let registry = DisplayRegistry::new(host);
        DisplayStateStore::new(ResolutionManager::new(registry, &Config::default()))
    }

    fn studio_host() -> Arc<SimulatedDisplayHost> {
        Arc::new(SimulatedDisplayHost::new(vec![
            create_test_display(1, 0, 1920, 1080).primary(),
            create_test_display(2, 1920, 5120, 1440),
        ]))
    }

    #[test]
    fn test_default_state() {
        let state = StoreState::default();
        assert_eq!(state.phase, StorePhase::Uninitialized);
        assert!(!state.is_loading);
        assert_eq!(state.recommended_background_quality, BackgroundQuality::Medium);
        assert!(!state.supports_high_quality);
    }

    #[tokio::test]
    async fn test_initialize_reaches_ready() {
        let host = studio_host();
        let store = store_for(host.clone());
        let (_subscription, rx) = store.channel();

        store.initialize().await;
        store.initialize().await;

        let state = store.state();
        assert_eq!(state.phase, StorePhase::Ready);
        assert!(!state.is_loading);
        assert_eq!(state.available_displays.len(), 2);
        assert_eq!(state.screens.len(), 2);
        assert_eq!(state.current_resolution.as_ref().map(|i| i.id()), Some(DisplayId(1)));
        assert!(state.supports_high_quality);
        assert_eq!(host.enumeration_count(), 1);

        let phases: Vec<StorePhase> = rx.try_iter().map(|s| s.phase).collect();
        assert_eq!(phases.first(), Some(&StorePhase::Initializing));
        assert_eq!(phases.last(), Some(&StorePhase::Ready));
    }

    #[tokio::test]
    async fn test_projection_flags() {
        let store = store_for(studio_host());
        store.initialize().await;

        assert!(store.set_projection_display(DisplayId(2)).await);
        let state = store.state();
        assert_eq!(state.phase, StorePhase::Ready);
        assert_eq!(state.projection_screen.map(|d| d.id), Some(DisplayId(2)));
        assert!(state.is_ultra_wide);
        assert!(!state.is_high_dpi);
    }

    #[tokio::test]
    async fn test_overlapping_operations_stay_loading() {
        let host = Arc::new(
            SimulatedDisplayHost::new(vec![
                create_test_display(1, 0, 1920, 1080).primary(),
                create_test_display(2, 1920, 5120, 1440),
            ])
            .with_assign_latency(std::time::Duration::from_millis(100)),
        );
        let store = store_for(host);
        store.initialize().await;

        let first = {
            let store = store.clone();
            tokio::spawn(async move { store.set_projection_display(DisplayId(1)).await })
        };
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        let second = {
            let store = store.clone();
            tokio::spawn(async move { store.set_projection_display(DisplayId(2)).await })
        };

        // The first assignment has finished; the second is still pending.
        tokio::time::sleep(std::time::Duration::from_millis(70)).await;
        let state = store.state();
        assert_eq!(state.phase, StorePhase::Loading);
        assert!(state.is_loading);

        assert!(first.await.unwrap());
        assert!(second.await.unwrap());
        let state = store.state();
        assert_eq!(state.phase, StorePhase::Ready);
        assert!(!state.is_loading);
        assert_eq!(state.projection_screen.map(|d| d.id), Some(DisplayId(2)));
    }

    #[tokio::test]
    async fn test_failed_assignment_enters_error_then_recovers() {
        let store = store_for(studio_host());
        store.initialize().await;
        let screens = store.state().screens;

        assert!(!store.set_projection_display(DisplayId(99)).await);
        let state = store.state();
        assert_eq!(state.phase, StorePhase::Error);
        assert!(!state.is_loading);
        assert!(state.error.as_deref().unwrap_or_default().contains("99"));
        assert_eq!(state.screens, screens);

        assert!(store.set_projection_display(DisplayId(1)).await);
        let state = store.state();
        assert_eq!(state.phase, StorePhase::Ready);
        assert_eq!(state.error, None);
    }

    #[tokio::test]
    async fn test_unavailable_host_degrades() {
        let store = store_for(Arc::new(NullDisplayHost));
        store.initialize().await;

        let state = store.state();
        assert_eq!(state.phase, StorePhase::Ready);
        assert!(state.available_displays.is_empty());
        assert_eq!(state.recommended_background_quality, BackgroundQuality::Medium);
        assert_eq!(store.get_optimal_text_size(18.0, TextContext::Projection), 18.0);
        assert_eq!(store.get_optimal_text_size(18.0, TextContext::Editor), 18.0);
    }

    #[tokio::test]
    async fn test_text_size_before_initialize_is_unscaled() {
        let store = store_for(studio_host());
        assert_eq!(store.get_optimal_text_size(20.0, TextContext::Preview), 20.0);
    }

    #[tokio::test]
    async fn test_refresh_initializes_first() {
        let host = studio_host();
        let store = store_for(host.clone());

        store.refresh().await;
        assert!(store.is_initialized());
        assert_eq!(store.phase(), StorePhase::Ready);

        store.refresh().await;
        assert_eq!(host.enumeration_count(), 2);
        assert_eq!(store.phase(), StorePhase::Ready);
    }
}
