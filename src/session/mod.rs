//! Client-side session manager
//!
//! Owns the bearer credential for one browser session. Lifecycle:
//! `new` -> `initialize` -> `dispose`. Initialization waits for the host
//! page, loads the identity SDK, publishes the first [`AuthState`] and then
//! follows identity changes reported by the SDK.
//!
//! Every cache write and the delivery of the matching state to subscribers
//! happen under one notification lock, so subscribers never observe a
//! credential that disagrees with the state they were handed.

mod page;
mod sdk;

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::SessionConfig;

pub use page::{PageLoad, PageLoadSignal};
pub use sdk::{IdentitySdk, SdkError, SdkLoader, SdkOptions, UserIdentity};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("Configuration error: {0}")]
    Configuration(&'static str),
    #[error("Host page never finished loading")]
    PageNeverLoaded,
    #[error("Failed to load identity SDK: {0}")]
    ScriptLoad(SdkError),
    #[error("Identity SDK error: {0}")]
    Sdk(SdkError),
    #[error("Token fetch timed out after {0:?}")]
    TokenTimeout(Duration),
}

/// Initialization phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Uninitialized,
    ScriptLoading,
    SdkLoaded,
    Ready,
    Disposed,
}

/// Snapshot broadcast to subscribers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthState {
    pub credential: Option<String>,
    pub user: Option<UserIdentity>,
}

impl AuthState {
    pub fn signed_out() -> Self {
        Self::default()
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Subscriber = Arc<dyn Fn(&AuthState) + Send + Sync>;

/// State shared with the SDK listener task.
struct Shared {
    epoch: AtomicU64,
    next_subscription: AtomicU64,
    notify: Mutex<()>,
    state: RwLock<AuthState>,
    subscribers: Mutex<Vec<(SubscriptionId, Subscriber)>>,
    token_timeout: Duration,
}

impl Shared {
    /// Invalidate in-flight credential fetches. Returns the new epoch.
    fn advance_epoch(&self) -> u64 {
        self.epoch.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn current_epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    /// Replace the cached state and notify subscribers in insertion order.
    ///
    /// With `Some(epoch)`, the update is dropped if the epoch moved on
    /// since the caller started its transition. Returns whether it applied.
    fn publish(&self, epoch: Option<u64>, next: AuthState) -> bool {
        let _guard = self.notify.lock();
        if let Some(epoch) = epoch {
            if epoch != self.current_epoch() {
                debug!(epoch, "Discarding stale auth state");
                return false;
            }
        }

        self.deliver(next);
        true
    }

    /// Invalidate in-flight fetches and publish `next` as one step.
    fn publish_transition(&self, next: AuthState) {
        let _guard = self.notify.lock();
        let epoch = self.advance_epoch();
        debug!(epoch, "Publishing auth state transition");
        self.deliver(next);
    }

    /// Caller must hold the notification lock.
    fn deliver(&self, next: AuthState) {
        *self.state.write() = next.clone();

        let subscribers: Vec<Subscriber> = self
            .subscribers
            .lock()
            .iter()
            .map(|(_, s)| Arc::clone(s))
            .collect();
        for subscriber in subscribers {
            subscriber(&next);
        }
    }

    async fn fetch_token(&self, sdk: &dyn IdentitySdk) -> Result<Option<String>, SessionError> {
        match tokio::time::timeout(self.token_timeout, sdk.get_token()).await {
            Ok(result) => result.map_err(SessionError::Sdk),
            Err(_) => Err(SessionError::TokenTimeout(self.token_timeout)),
        }
    }

    /// Fetch a credential for `user`, degrading to none on failure.
    async fn resolve(&self, sdk: &dyn IdentitySdk, user: Option<UserIdentity>) -> AuthState {
        if user.is_none() {
            return AuthState::signed_out();
        }
        let credential = match self.fetch_token(sdk).await {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "Credential fetch failed");
                None
            }
        };
        AuthState { credential, user }
    }
}

pub struct SessionManager {
    config: SessionConfig,
    initializing: AtomicBool,
    listener: Mutex<Option<JoinHandle<()>>>,
    loader: Arc<dyn SdkLoader>,
    page: PageLoad,
    phase: RwLock<Phase>,
    sdk: RwLock<Option<Arc<dyn IdentitySdk>>>,
    shared: Arc<Shared>,
}

impl SessionManager {
    pub fn new(config: SessionConfig, loader: Arc<dyn SdkLoader>, page: PageLoad) -> Self {
        let shared = Arc::new(Shared {
            epoch: AtomicU64::new(0),
            next_subscription: AtomicU64::new(0),
            notify: Mutex::new(()),
            state: RwLock::new(AuthState::signed_out()),
            subscribers: Mutex::new(Vec::new()),
            token_timeout: config.token_timeout,
        });

        Self {
            config,
            initializing: AtomicBool::new(false),
            listener: Mutex::new(None),
            loader,
            page,
            phase: RwLock::new(Phase::Uninitialized),
            sdk: RwLock::new(None),
            shared,
        }
    }

    pub fn phase(&self) -> Phase {
        *self.phase.read()
    }

    pub fn is_ready(&self) -> bool {
        self.phase() == Phase::Ready
    }

    /// Run the initialization protocol to completion.
    ///
    /// Never fails the caller: configuration, page and SDK failures are
    /// logged and leave the manager uninitialized and signed out. Calls made
    /// while another initialization is running, or after one succeeded, are
    /// no-ops.
    pub async fn initialize(&self) {
        if self
            .initializing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("Session manager already initializing");
            return;
        }

        match self.try_initialize().await {
            Ok(()) if self.is_ready() => {
                info!(
                    authenticated = self.shared.state.read().is_authenticated(),
                    "Session manager ready"
                );
            }
            Ok(()) => {}
            Err(e) => {
                error!(error = %e, "Session manager initialization failed");
                {
                    let mut phase = self.phase.write();
                    if *phase != Phase::Disposed {
                        *phase = Phase::Uninitialized;
                    }
                }
                self.initializing.store(false, Ordering::SeqCst);
            }
        }
    }

    async fn try_initialize(&self) -> Result<(), SessionError> {
        let mut page = self.page.clone();
        if !page.wait().await {
            return Err(SessionError::PageNeverLoaded);
        }

        let options = self.sdk_options()?;

        self.set_phase(Phase::ScriptLoading);
        let sdk = self
            .loader
            .load(&options)
            .await
            .map_err(SessionError::ScriptLoad)?;

        self.set_phase(Phase::SdkLoaded);
        sdk.load().await.map_err(SessionError::ScriptLoad)?;

        if self.phase() == Phase::Disposed {
            return Ok(());
        }

        let epoch = self.shared.advance_epoch();
        let initial = self.shared.resolve(sdk.as_ref(), sdk.user()).await;

        // `dispose` may have run during the fetch. The phase lock is held
        // until the listener handle is stored, so `dispose` either sees it
        // or makes this a no-op.
        {
            let mut phase = self.phase.write();
            if *phase == Phase::Disposed {
                debug!("Session manager disposed during initialization");
                return Ok(());
            }
            *self.sdk.write() = Some(Arc::clone(&sdk));
            debug!(from = ?*phase, to = ?Phase::Ready, "Session phase transition");
            *phase = Phase::Ready;

            let events = sdk.add_listener();
            let handle = tokio::spawn(follow_identity(Arc::clone(&self.shared), sdk, events));
            *self.listener.lock() = Some(handle);
        }

        // Dropped if `dispose` or an identity event advanced the epoch.
        self.shared.publish(Some(epoch), initial);
        Ok(())
    }

    fn sdk_options(&self) -> Result<SdkOptions, SessionError> {
        let publishable_key = self
            .config
            .publishable_key
            .clone()
            .ok_or(SessionError::Configuration("publishable key is not set"))?;
        let frontend_api = self
            .config
            .frontend_api
            .clone()
            .ok_or(SessionError::Configuration("frontend API endpoint is not set"))?;
        Ok(SdkOptions {
            frontend_api,
            publishable_key,
        })
    }

    fn set_phase(&self, next: Phase) {
        let mut phase = self.phase.write();
        if *phase != Phase::Disposed {
            debug!(from = ?*phase, to = ?next, "Session phase transition");
            *phase = next;
        }
    }

    /// The SDK handle, if the manager is ready.
    fn ready_sdk(&self) -> Option<Arc<dyn IdentitySdk>> {
        if !self.is_ready() {
            return None;
        }
        self.sdk.read().clone()
    }

    /// Register a callback for auth state changes. It is not invoked
    /// immediately; the first call comes with the next published state.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&AuthState) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.shared.next_subscription.fetch_add(1, Ordering::SeqCst));
        let subscriber: Subscriber = Arc::new(callback);
        self.shared.subscribers.lock().push((id, subscriber));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.shared.subscribers.lock();
        let before = subscribers.len();
        subscribers.retain(|(sid, _)| *sid != id);
        subscribers.len() != before
    }

    pub fn sign_in(&self) {
        match self.ready_sdk() {
            Some(sdk) => sdk.open_sign_in(),
            None => warn!(phase = ?self.phase(), "sign_in called before session manager is ready"),
        }
    }

    /// Sign out through the SDK, then clear the credential and notify.
    pub async fn sign_out(&self) -> Result<(), SessionError> {
        let Some(sdk) = self.ready_sdk() else {
            warn!(phase = ?self.phase(), "sign_out called before session manager is ready");
            return Ok(());
        };

        // A failed sign-out leaves the session untouched, including any
        // credential fetch the listener has in flight.
        sdk.sign_out().await.map_err(SessionError::Sdk)?;
        self.shared.publish_transition(AuthState::signed_out());
        Ok(())
    }

    /// The cached credential. Never suspends.
    pub fn current_token(&self) -> Option<String> {
        self.shared.state.read().credential.clone()
    }

    pub fn current_state(&self) -> AuthState {
        self.shared.state.read().clone()
    }

    /// Fetch a fresh credential if a session exists and update the cache.
    pub async fn refresh_token(&self) -> Option<String> {
        let sdk = self.ready_sdk()?;
        let user = sdk.user()?;

        let epoch = self.shared.current_epoch();
        let credential = match self.shared.fetch_token(sdk.as_ref()).await {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "Credential refresh failed");
                return self.current_token();
            }
        };

        let next = AuthState {
            credential: credential.clone(),
            user: Some(user),
        };
        if *self.shared.state.read() == next {
            return credential;
        }
        if self.shared.publish(Some(epoch), next) {
            credential
        } else {
            self.current_token()
        }
    }

    /// Stop following the SDK and drop every subscriber.
    ///
    /// Must not be called from inside a subscriber callback.
    pub fn dispose(&self) {
        *self.phase.write() = Phase::Disposed;
        if let Some(handle) = self.listener.lock().take() {
            handle.abort();
        }
        {
            let _guard = self.shared.notify.lock();
            self.shared.advance_epoch();
            self.shared.subscribers.lock().clear();
            *self.shared.state.write() = AuthState::signed_out();
        }
        *self.sdk.write() = None;
        debug!("Session manager disposed");
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        if let Some(handle) = self.listener.lock().take() {
            handle.abort();
        }
    }
}

/// Re-resolve the credential on every identity change reported by the SDK.
async fn follow_identity(
    shared: Arc<Shared>,
    sdk: Arc<dyn IdentitySdk>,
    mut events: tokio::sync::mpsc::UnboundedReceiver<Option<UserIdentity>>,
) {
    while let Some(user) = events.recv().await {
        let epoch = shared.advance_epoch();
        debug!(epoch, signed_in = user.is_some(), "Identity changed");
        let next = shared.resolve(sdk.as_ref(), user).await;
        shared.publish(Some(epoch), next);
    }
    debug!("Identity listener closed");
}
