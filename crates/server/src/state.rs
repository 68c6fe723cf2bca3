//! Application state shared across handlers.

use std::sync::Arc;

use neighbourly_core::{Clock, SystemClock};

use crate::config::AppConfig;
use crate::db::Store;
use crate::identity::OidcClient;
use crate::services::{ChatService, LifecycleService};

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`. Generic over the [`Store`] so the same
/// router serves `PostgreSQL` in production and memory in tests.
pub struct AppState<S> {
    inner: Arc<AppStateInner<S>>,
}

struct AppStateInner<S> {
    config: AppConfig,
    store: S,
    oidc: OidcClient,
    clock: Arc<dyn Clock>,
}

// Manual impl: `S` itself need not be `Clone` for the handle to be.
impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: Store> AppState<S> {
    /// Create application state using the wall clock.
    #[must_use]
    pub fn new(config: AppConfig, store: S) -> Self {
        Self::with_clock(config, store, Arc::new(SystemClock))
    }

    /// Create application state with an explicit time source.
    #[must_use]
    pub fn with_clock(config: AppConfig, store: S, clock: Arc<dyn Clock>) -> Self {
        let oidc = OidcClient::new(&config.oidc);
        Self::with_parts(config, store, oidc, clock)
    }

    /// Create application state from prebuilt parts.
    #[must_use]
    pub fn with_parts(config: AppConfig, store: S, oidc: OidcClient, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                oidc,
                clock,
            }),
        }
    }

    /// Get a reference to the server configuration.
    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    /// Get a reference to the store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.inner.store
    }

    /// Get a reference to the identity provider client.
    #[must_use]
    pub fn oidc(&self) -> &OidcClient {
        &self.inner.oidc
    }

    /// Get a reference to the time source.
    #[must_use]
    pub fn clock(&self) -> &dyn Clock {
        self.inner.clock.as_ref()
    }

    /// Lifecycle service bound to this state.
    #[must_use]
    pub fn lifecycle(&self) -> LifecycleService<'_, S> {
        LifecycleService::new(self.store(), self.clock(), self.config().claim_policy)
    }

    /// Chat service bound to this state.
    #[must_use]
    pub fn chat(&self) -> ChatService<'_, S> {
        ChatService::new(self.store(), self.clock())
    }
}
