//! Host display bridge.
//!
//! The engine never talks to a windowing system directly. A [`DisplayHost`]
//! enumerates attached displays, owns the projection assignment and optionally
//! pushes display-list changes through a `tokio::sync::watch` channel, which
//! keeps only the newest list.

use crate::errors::DisplayError;
use async_trait::async_trait;
use display_scaling::{DisplayDescriptor, DisplayId};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::watch;
use tracing::debug;

/// Source of display information.
#[async_trait]
pub trait DisplayHost: Send + Sync {
    /// Short name used in log output.
    fn name(&self) -> &str;

    /// Enumerate the attached displays.
    async fn list_displays(&self) -> Result<Vec<DisplayDescriptor>, DisplayError>;

    /// The display currently used for projection, if any.
    async fn projection_display(&self) -> Result<Option<DisplayDescriptor>, DisplayError>;

    /// Ask the host to project on `id`.
    ///
    /// Returns the assigned display, or `None` if the host does not know `id`.
    async fn set_projection_display(
        &self,
        id: DisplayId,
    ) -> Result<Option<DisplayDescriptor>, DisplayError>;

    /// Subscribe to display-list changes. `None` if the host cannot notify.
    fn watch_displays(&self) -> Option<watch::Receiver<Vec<DisplayDescriptor>>>;
}

/// Host used when no bridge is wired up. Every call reports `HostUnavailable`.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullDisplayHost;

const NO_BRIDGE: &str = "no display host bridge is attached";

#[async_trait]
impl DisplayHost for NullDisplayHost {
    fn name(&self) -> &str {
        "null"
    }

    async fn list_displays(&self) -> Result<Vec<DisplayDescriptor>, DisplayError> {
        Err(DisplayError::HostUnavailable(NO_BRIDGE.to_string()))
    }

    async fn projection_display(&self) -> Result<Option<DisplayDescriptor>, DisplayError> {
        Err(DisplayError::HostUnavailable(NO_BRIDGE.to_string()))
    }

    async fn set_projection_display(
        &self,
        _id: DisplayId,
    ) -> Result<Option<DisplayDescriptor>, DisplayError> {
        Err(DisplayError::HostUnavailable(NO_BRIDGE.to_string()))
    }

    fn watch_displays(&self) -> Option<watch::Receiver<Vec<DisplayDescriptor>>> {
        None
    }
}

struct SimulatedState {
    displays: Vec<DisplayDescriptor>,
    projection: Option<DisplayId>,
    available: bool,
}

/// In-memory host for tests and the probe CLI.
///
/// Displays can be plugged and unplugged at runtime with
/// [`set_displays`](Self::set_displays); watchers see every change.
pub struct SimulatedDisplayHost {
    state: Mutex<SimulatedState>,
    notifier: watch::Sender<Vec<DisplayDescriptor>>,
    enumerations: AtomicUsize,
    notifications: bool,
    assign_latency: Option<Duration>,
    query_latency: Option<Duration>,
}

impl SimulatedDisplayHost {
    pub fn new(displays: Vec<DisplayDescriptor>) -> Self {
        let (notifier, _) = watch::channel(displays.clone());
        Self {
            state: Mutex::new(SimulatedState {
                displays,
                projection: None,
                available: true,
            }),
            notifier,
            enumerations: AtomicUsize::new(0),
            notifications: true,
            assign_latency: None,
            query_latency: None,
        }
    }

    /// Start with `id` as the projection display (ignored if `id` is unknown).
    pub fn with_projection(self, id: DisplayId) -> Self {
        {
            let mut state = self.state.lock();
            if state.displays.iter().any(|d| d.id == id) {
                state.projection = Some(id);
            }
        }
        self
    }

    /// Disable change notifications; consumers must poll with refresh.
    pub fn without_notifications(mut self) -> Self {
        self.notifications = false;
        self
    }

    /// Delay projection assignment, to exercise concurrent changes.
    pub fn with_assign_latency(mut self, latency: Duration) -> Self {
        self.assign_latency = Some(latency);
        self
    }

    /// Delay projection queries, so an enumeration can race a hot-plug.
    pub fn with_query_latency(mut self, latency: Duration) -> Self {
        self.query_latency = Some(latency);
        self
    }

    /// Replace the attached display list and notify watchers.
    pub fn set_displays(&self, displays: Vec<DisplayDescriptor>) {
        {
            let mut state = self.state.lock();
            if let Some(id) = state.projection {
                if !displays.iter().any(|d| d.id == id) {
                    debug!("simulated host: projection display {} unplugged", id);
                    state.projection = None;
                }
            }
            state.displays = displays.clone();
        }
        self.notifier.send_replace(displays);
    }

    /// Make every call fail with `HostUnavailable` while `false`.
    pub fn set_available(&self, available: bool) {
        self.state.lock().available = available;
    }

    /// How many times `list_displays` succeeded.
    pub fn enumeration_count(&self) -> usize {
        self.enumerations.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> Result<(), DisplayError> {
        if self.state.lock().available {
            Ok(())
        } else {
            Err(DisplayError::HostUnavailable(
                "simulated host is offline".to_string(),
            ))
        }
    }
}

#[async_trait]
impl DisplayHost for SimulatedDisplayHost {
    fn name(&self) -> &str {
        "simulated"
    }

    async fn list_displays(&self) -> Result<Vec<DisplayDescriptor>, DisplayError> {
        self.check_available()?;
        self.enumerations.fetch_add(1, Ordering::SeqCst);
        Ok(self.state.lock().displays.clone())
    }

    async fn projection_display(&self) -> Result<Option<DisplayDescriptor>, DisplayError> {
        self.check_available()?;
        if let Some(latency) = self.query_latency {
            tokio::time::sleep(latency).await;
        }
        let state = self.state.lock();
        Ok(state
            .projection
            .and_then(|id| state.displays.iter().find(|d| d.id == id))
            .cloned())
    }

    async fn set_projection_display(
        &self,
        id: DisplayId,
    ) -> Result<Option<DisplayDescriptor>, DisplayError> {
        self.check_available()?;
        if let Some(latency) = self.assign_latency {
            tokio::time::sleep(latency).await;
        }

        let mut state = self.state.lock();
        let assigned = state.displays.iter().find(|d| d.id == id).cloned();
        if assigned.is_some() {
            state.projection = Some(id);
        }
        Ok(assigned)
    }

    fn watch_displays(&self) -> Option<watch::Receiver<Vec<DisplayDescriptor>>> {
        if self.notifications {
            Some(self.notifier.subscribe())
        } else {
            None
        }
    }
}
