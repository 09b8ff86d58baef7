//! Live list of attached displays and the projection assignment.
//!
//! The registry mirrors what the [`DisplayHost`] reports. Host-driven changes
//! arrive through the host's watch channel, are applied in arrival order and
//! are re-broadcast to registry subscribers as [`DisplaySnapshot`]s. Explicit
//! [`refresh`](DisplayRegistry::refresh) and
//! [`set_projection_display`](DisplayRegistry::set_projection_display) calls
//! update the snapshot and return to the caller without broadcasting.

use crate::errors::DisplayError;
use crate::events::{Emitter, Subscription};
use crate::host::DisplayHost;
use display_scaling::{DisplayDescriptor, DisplayId};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Point-in-time copy of the registry contents.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplaySnapshot {
    /// Incremented on every change; newer snapshots have larger revisions.
    pub revision: u64,
    pub displays: Vec<DisplayDescriptor>,
    pub projection: Option<DisplayId>,
}

impl DisplaySnapshot {
    pub fn display(&self, id: DisplayId) -> Option<&DisplayDescriptor> {
        self.displays.iter().find(|d| d.id == id)
    }

    /// The display flagged primary, or the first one if none is flagged.
    pub fn primary_display(&self) -> Option<&DisplayDescriptor> {
        primary_of(&self.displays)
    }

    pub fn projection_display(&self) -> Option<&DisplayDescriptor> {
        self.projection.and_then(|id| self.display(id))
    }
}

fn primary_of(displays: &[DisplayDescriptor]) -> Option<&DisplayDescriptor> {
    displays
        .iter()
        .find(|d| d.is_primary)
        .or_else(|| displays.first())
}

/// Keep `current` if it is still attached, otherwise fall back to the primary
/// (or first) display. No assignment stays no assignment.
fn reconcile_projection(
    current: Option<DisplayId>,
    displays: &[DisplayDescriptor],
) -> Option<DisplayId> {
    let id = current?;
    if displays.iter().any(|d| d.id == id) {
        return Some(id);
    }

    let fallback = primary_of(displays).map(|d| d.id);
    match fallback {
        Some(fallback) => info!(
            "Projection display {} disconnected; falling back to display {}",
            id, fallback
        ),
        None => warn!(
            "Projection display {} disconnected and no displays remain",
            id
        ),
    }
    fallback
}

struct RegistryShared {
    host: Arc<dyn DisplayHost>,
    snapshot: RwLock<DisplaySnapshot>,
    events: Emitter<DisplaySnapshot>,
    start_lock: tokio::sync::Mutex<()>,
    started: AtomicBool,
    watcher: Mutex<Option<JoinHandle<()>>>,
}

impl RegistryShared {
    /// Install a new display list, reconciling the projection against it.
    fn install(
        &self,
        displays: Vec<DisplayDescriptor>,
        host_projection: Option<DisplayId>,
    ) -> DisplaySnapshot {
        let mut snapshot = self.snapshot.write();
        replace_snapshot(&mut snapshot, displays, host_projection);
        snapshot.clone()
    }

    /// Install an enumeration that started at revision `read_at`.
    ///
    /// If the snapshot changed while the host was being queried, the newer
    /// snapshot is kept and the enumerated list is dropped.
    fn install_enumerated(
        &self,
        displays: Vec<DisplayDescriptor>,
        host_projection: Option<DisplayId>,
        read_at: u64,
    ) -> DisplaySnapshot {
        let mut snapshot = self.snapshot.write();
        if snapshot.revision != read_at {
            debug!(
                "Dropping enumeration from revision {}; registry is at revision {}",
                read_at, snapshot.revision
            );
            return snapshot.clone();
        }
        replace_snapshot(&mut snapshot, displays, host_projection);
        snapshot.clone()
    }
}

fn replace_snapshot(
    snapshot: &mut DisplaySnapshot,
    displays: Vec<DisplayDescriptor>,
    host_projection: Option<DisplayId>,
) {
    let projection = reconcile_projection(host_projection.or(snapshot.projection), &displays);
    *snapshot = DisplaySnapshot {
        revision: snapshot.revision + 1,
        displays,
        projection,
    };
}

impl Drop for RegistryShared {
    fn drop(&mut self) {
        if let Some(handle) = self.watcher.get_mut().take() {
            handle.abort();
        }
    }
}

/// Shared handle to the display registry. Clones observe the same state.
#[derive(Clone)]
pub struct DisplayRegistry {
    shared: Arc<RegistryShared>,
}

impl DisplayRegistry {
    pub fn new(host: Arc<dyn DisplayHost>) -> Self {
        Self {
            shared: Arc::new(RegistryShared {
                host,
                snapshot: RwLock::new(DisplaySnapshot::default()),
                events: Emitter::new("display-registry"),
                start_lock: tokio::sync::Mutex::new(()),
                started: AtomicBool::new(false),
                watcher: Mutex::new(None),
            }),
        }
    }

    /// Name of the backing host.
    pub fn host_name(&self) -> &str {
        self.shared.host.name()
    }

    /// Enumerate displays and begin watching the host. Idempotent.
    ///
    /// A failing host is logged and leaves the registry empty; the registry
    /// still counts as started and a later [`refresh`](Self::refresh) retries.
    pub async fn start(&self) {
        let _guard = self.shared.start_lock.lock().await;
        if self.shared.started.load(Ordering::Acquire) {
            debug!("Display registry already started");
            return;
        }

        let snapshot = self.enumerate().await;
        info!(
            "Display registry started on {} host with {} display(s)",
            self.shared.host.name(),
            snapshot.displays.len()
        );

        match self.shared.host.watch_displays() {
            Some(rx) => {
                let handle = tokio::spawn(watch_host(Arc::downgrade(&self.shared), rx));
                *self.shared.watcher.lock() = Some(handle);
            }
            None => debug!(
                "{} host provides no change notifications; relying on refresh",
                self.shared.host.name()
            ),
        }

        self.shared.started.store(true, Ordering::Release);
    }

    pub fn is_started(&self) -> bool {
        self.shared.started.load(Ordering::Acquire)
    }

    /// Re-enumerate displays from the host.
    pub async fn refresh(&self) -> DisplaySnapshot {
        self.enumerate().await
    }

    async fn enumerate(&self) -> DisplaySnapshot {
        let host = &self.shared.host;
        let read_at = self.shared.snapshot.read().revision;
        let displays = match host.list_displays().await {
            Ok(displays) => displays,
            Err(e) => {
                warn!("Display enumeration failed, continuing with no displays: {}", e);
                Vec::new()
            }
        };
        let host_projection = match host.projection_display().await {
            Ok(projection) => projection.map(|d| d.id),
            Err(e) => {
                debug!("Host did not report a projection display: {}", e);
                None
            }
        };

        let snapshot = self
            .shared
            .install_enumerated(displays, host_projection, read_at);
        debug!(
            "Enumerated {} display(s), projection {:?} (revision {})",
            snapshot.displays.len(),
            snapshot.projection,
            snapshot.revision
        );
        snapshot
    }

    /// Assign the projection display.
    ///
    /// # Errors
    ///
    /// `DisplayNotFound` if `id` is not attached, the host refuses it, or it
    /// disappears before the assignment completes. Host failures propagate.
    pub async fn set_projection_display(
        &self,
        id: DisplayId,
    ) -> Result<DisplayDescriptor, DisplayError> {
        if self.display(id).is_none() {
            return Err(DisplayError::DisplayNotFound(id));
        }

        let assigned = self
            .shared
            .host
            .set_projection_display(id)
            .await?
            .ok_or(DisplayError::DisplayNotFound(id))?;

        let mut snapshot = self.shared.snapshot.write();
        let Some(display) = snapshot.display(assigned.id).cloned() else {
            warn!("Display {} disappeared while being assigned for projection", id);
            return Err(DisplayError::DisplayNotFound(id));
        };
        snapshot.projection = Some(display.id);
        snapshot.revision += 1;
        let assigned_display = &display;
        info!("Projection display set to {}", assigned_display);
        Ok(display)
    }

    pub fn snapshot(&self) -> DisplaySnapshot {
        self.shared.snapshot.read().clone()
    }

    pub fn displays(&self) -> Vec<DisplayDescriptor> {
        self.shared.snapshot.read().displays.clone()
    }

    pub fn display(&self, id: DisplayId) -> Option<DisplayDescriptor> {
        self.shared.snapshot.read().display(id).cloned()
    }

    pub fn primary_display(&self) -> Option<DisplayDescriptor> {
        self.shared.snapshot.read().primary_display().cloned()
    }

    pub fn projection_display(&self) -> Option<DisplayDescriptor> {
        self.shared.snapshot.read().projection_display().cloned()
    }

    /// Listen for host-driven display changes.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&DisplaySnapshot) + Send + Sync + 'static,
    {
        self.shared.events.subscribe(callback)
    }

    /// Receive host-driven display changes on a channel.
    pub fn channel(&self) -> (Subscription, flume::Receiver<DisplaySnapshot>) {
        self.shared.events.channel()
    }
}

async fn watch_host(
    shared: Weak<RegistryShared>,
    mut rx: watch::Receiver<Vec<DisplayDescriptor>>,
) {
    while rx.changed().await.is_ok() {
        let displays = rx.borrow_and_update().clone();
        let Some(shared) = shared.upgrade() else {
            break;
        };

        let snapshot = shared.install(displays, None);
        info!(
            "Display configuration changed: {} display(s) (revision {})",
            snapshot.displays.len(),
            snapshot.revision
        );
        shared.events.emit(&snapshot);
    }
    debug!("Display host watcher stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{NullDisplayHost, SimulatedDisplayHost};
    use display_common::Rect;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn create_test_display(id: u64, x: i32, width: u32, height: u32) -> DisplayDescriptor {
        DisplayDescriptor::new(id, Rect::new(x, 0, width, height))
    }

    fn two_displays() -> Vec<DisplayDescriptor> {
        vec![
            create_test_display(1, 0, 1920, 1080).primary(),
            create_test_display(2, 1920, 3840, 2160),
        ]
    }

    #[test]
    fn test_reconcile_keeps_attached_projection() {
        let displays = two_displays();
        assert_eq!(
            reconcile_projection(Some(DisplayId(2)), &displays),
            Some(DisplayId(2))
        );
        assert_eq!(reconcile_projection(None, &displays), None);
    }

    #[test]
    fn test_reconcile_fallback_order() {
        let displays = two_displays();
        assert_eq!(
            reconcile_projection(Some(DisplayId(9)), &displays),
            Some(DisplayId(1))
        );

        // Without a primary flag the first display wins.
        let displays = vec![
            create_test_display(5, 0, 1920, 1080),
            create_test_display(6, 1920, 1920, 1080),
        ];
        assert_eq!(
            reconcile_projection(Some(DisplayId(9)), &displays),
            Some(DisplayId(5))
        );

        assert_eq!(reconcile_projection(Some(DisplayId(9)), &[]), None);
    }

    #[tokio::test]
    async fn test_start_is_idempotent() {
        let host = Arc::new(SimulatedDisplayHost::new(two_displays()));
        let registry = DisplayRegistry::new(host.clone());

        registry.start().await;
        registry.start().await;

        assert!(registry.is_started());
        assert_eq!(host.enumeration_count(), 1);
        assert_eq!(registry.displays().len(), 2);
        assert_eq!(registry.primary_display().map(|d| d.id), Some(DisplayId(1)));
        assert!(registry.projection_display().is_none());
    }

    #[tokio::test]
    async fn test_start_adopts_host_projection() {
        let host = Arc::new(SimulatedDisplayHost::new(two_displays()).with_projection(DisplayId(2)));
        let registry = DisplayRegistry::new(host);

        registry.start().await;
        assert_eq!(registry.projection_display().map(|d| d.id), Some(DisplayId(2)));
    }

    #[tokio::test]
    async fn test_set_projection_display() {
        let registry = DisplayRegistry::new(Arc::new(SimulatedDisplayHost::new(two_displays())));
        registry.start().await;
        let before = registry.snapshot().revision;

        let display = registry.set_projection_display(DisplayId(2)).await.unwrap();
        assert_eq!(display.id, DisplayId(2));
        assert_eq!(registry.snapshot().projection, Some(DisplayId(2)));
        assert!(registry.snapshot().revision > before);
    }

    #[tokio::test]
    async fn test_set_unknown_projection_display() {
        let registry = DisplayRegistry::new(Arc::new(SimulatedDisplayHost::new(two_displays())));
        registry.start().await;
        let before = registry.snapshot();

        let err = registry.set_projection_display(DisplayId(42)).await.unwrap_err();
        assert_eq!(err, DisplayError::DisplayNotFound(DisplayId(42)));
        assert_eq!(registry.snapshot(), before);
    }

    #[tokio::test]
    async fn test_refresh_after_unplug_falls_back() {
        let host = Arc::new(SimulatedDisplayHost::new(two_displays()).without_notifications());
        let registry = DisplayRegistry::new(host.clone());
        registry.start().await;
        registry.set_projection_display(DisplayId(2)).await.unwrap();

        host.set_displays(vec![create_test_display(1, 0, 1920, 1080).primary()]);
        assert_eq!(registry.snapshot().projection, Some(DisplayId(2)));

        let snapshot = registry.refresh().await;
        assert_eq!(snapshot.projection, Some(DisplayId(1)));
    }

    #[tokio::test]
    async fn test_host_changes_are_broadcast() {
        let host = Arc::new(SimulatedDisplayHost::new(two_displays()));
        let registry = DisplayRegistry::new(host.clone());
        registry.start().await;
        let (_subscription, rx) = registry.channel();

        host.set_displays(vec![create_test_display(3, 0, 1280, 720)]);

        let snapshot = tokio::time::timeout(Duration::from_secs(5), rx.recv_async())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(snapshot.displays.len(), 1);
        assert_eq!(registry.displays()[0].id, DisplayId(3));
    }

    #[tokio::test]
    async fn test_slow_refresh_keeps_newer_host_list() {
        let host = Arc::new(
            SimulatedDisplayHost::new(two_displays()).with_query_latency(Duration::from_millis(100)),
        );
        let registry = DisplayRegistry::new(host.clone());
        registry.start().await;
        let (_subscription, rx) = registry.channel();

        let pending = {
            let registry = registry.clone();
            tokio::spawn(async move { registry.refresh().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        host.set_displays(vec![create_test_display(3, 0, 1280, 720)]);
        let plugged = tokio::time::timeout(Duration::from_secs(5), rx.recv_async())
            .await
            .unwrap()
            .unwrap();

        let refreshed = pending.await.unwrap();
        assert_eq!(refreshed, plugged);
        assert_eq!(registry.snapshot(), plugged);
        assert_eq!(registry.displays()[0].id, DisplayId(3));
    }

    #[tokio::test]
    async fn test_unavailable_host_leaves_registry_empty() {
        let registry = DisplayRegistry::new(Arc::new(NullDisplayHost));
        registry.start().await;

        assert!(registry.is_started());
        assert!(registry.displays().is_empty());
        assert!(registry.primary_display().is_none());
        assert!(matches!(
            registry.set_projection_display(DisplayId(1)).await,
            Err(DisplayError::DisplayNotFound(_))
        ));
    }
}
