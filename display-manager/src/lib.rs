//! Live multi-display state for a presentation engine.
//!
//! This crate tracks the displays attached to the host, which of them is
//! used for projection, and the resolution-aware scaling derived for each.
//!
//! # Architecture
//!
//! - [`DisplayHost`] - bridge to the platform (enumeration, projection, change notification)
//! - [`DisplayRegistry`] - live display list with hot-plug reconciliation
//! - [`ResolutionManager`] - per-display tier, profile and canvas scaling
//! - [`DisplayStateStore`] - flattened UI state with loading and error tracking
//! - [`DisplayContext`] - wires the above together
//!
//! # Example
//!
//! ```no_run
//! use display_common::Rect;
//! use display_manager::{DisplayContext, SimulatedDisplayHost, TextContext};
//! use display_scaling::DisplayDescriptor;
//!
//! # async fn example() -> Result<(), display_manager::DisplayError> {
//! let host = SimulatedDisplayHost::new(vec![
//!     DisplayDescriptor::new(1u64, Rect::new(0, 0, 1920, 1080)).primary(),
//! ]);
//! let context = DisplayContext::builder().host(host).build()?;
//! context.initialize().await;
//!
//! let size = context.store().get_optimal_text_size(24.0, TextContext::Projection);
//! println!("Projection text: {}px", size);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod errors;
pub mod events;
pub mod host;
pub mod manager;
pub mod registry;
pub mod store;

pub use config::{CanvasConfig, Config, ConfigBuilder, DpiSettings, TextConfig};
pub use errors::DisplayError;
pub use events::{Emitter, Subscription};
pub use host::{DisplayHost, NullDisplayHost, SimulatedDisplayHost};
pub use manager::{DisplayResolutionInfo, ResolutionManager, ResolutionState, TextContext};
pub use registry::{DisplayRegistry, DisplaySnapshot};
pub use store::{DisplayStateStore, StorePhase, StoreState};

use std::sync::Arc;
use tracing::info;

/// One registry, manager and store sharing a host.
#[derive(Clone)]
pub struct DisplayContext {
    config: Config,
    store: DisplayStateStore,
}

impl DisplayContext {
    pub fn builder() -> DisplayContextBuilder {
        DisplayContextBuilder::default()
    }

    /// Initialize everything. Idempotent.
    pub async fn initialize(&self) {
        self.store.initialize().await;
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &DisplayRegistry {
        self.store.manager().registry()
    }

    pub fn manager(&self) -> &ResolutionManager {
        self.store.manager()
    }

    pub fn store(&self) -> &DisplayStateStore {
        &self.store
    }
}

/// Builder for a [`DisplayContext`].
#[derive(Default)]
pub struct DisplayContextBuilder {
    host: Option<Arc<dyn DisplayHost>>,
    config: Config,
}

impl DisplayContextBuilder {
    #[must_use]
    pub fn host(mut self, host: impl DisplayHost + 'static) -> Self {
        self.host = Some(Arc::new(host));
        self
    }

    /// Use a host that the caller keeps a handle to.
    #[must_use]
    pub fn shared_host(mut self, host: Arc<dyn DisplayHost>) -> Self {
        self.host = Some(host);
        self
    }

    #[must_use]
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Build the context. Without a host, a [`NullDisplayHost`] is used.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> Result<DisplayContext, DisplayError> {
        self.config.validate()?;

        let host = self.host.unwrap_or_else(|| {
            info!("No display host attached; display features are disabled");
            Arc::new(NullDisplayHost)
        });
        let registry = DisplayRegistry::new(host);
        let manager = ResolutionManager::new(registry, &self.config);

        Ok(DisplayContext {
            config: self.config,
            store: DisplayStateStore::new(manager),
        })
    }
}
