use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use folio_types::{Namespace, Session};

use crate::error::{SessionError, SessionResult};
use crate::guest::GuestFlag;
use crate::provider::IdentityProvider;

/// Capacity of the transition channel. A subscriber that falls further behind
/// than this skips the oldest transitions.
const EVENT_CAPACITY: usize = 64;

/// Owns the current [`Session`] and publishes its transitions.
///
/// Transitions:
///
/// | from         | action        | to                 |
/// |--------------|---------------|--------------------|
/// | SignedOut    | `sign_in`     | Authenticated      |
/// | SignedOut    | `enter_guest` | Guest (flag set)   |
/// | Guest        | `sign_out`    | SignedOut (flag cleared) |
/// | Authenticated| `sign_out`    | SignedOut          |
///
/// Transitions are serialized. A failed transition leaves the session as it
/// was. Once [`follow_provider`](Self::follow_provider) is running, changes
/// the provider makes on its own are applied as well: a provider sign-out
/// ends an authenticated session, and a provider sign-in replaces whatever
/// session was active.
pub struct SessionManager {
    provider: Arc<dyn IdentityProvider>,
    guest_flag: Arc<dyn GuestFlag>,
    current: RwLock<Session>,
    transitions: Mutex<()>,
    events: broadcast::Sender<Session>,
    following: AtomicBool,
}

impl SessionManager {
    /// Create a manager in the `SignedOut` state. Call
    /// [`resolve`](Self::resolve) to restore a persisted session.
    pub fn new(provider: Arc<dyn IdentityProvider>, guest_flag: Arc<dyn GuestFlag>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            provider,
            guest_flag,
            current: RwLock::new(Session::SignedOut),
            transitions: Mutex::new(()),
            events,
            following: AtomicBool::new(false),
        }
    }

    /// The current session.
    pub fn current(&self) -> Session {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The active namespace, or `None` while signed out.
    pub fn namespace(&self) -> Option<Namespace> {
        self.current().namespace()
    }

    /// Subscribe to session changes.
    ///
    /// The subscription yields the current session first, then every later
    /// transition in order.
    pub fn subscribe(&self) -> SessionSubscription {
        // Holding the read lock keeps a publish from slipping between the
        // snapshot and the channel subscription.
        let current = self.current.read().unwrap_or_else(PoisonError::into_inner);
        SessionSubscription {
            initial: Some(current.clone()),
            events: self.events.subscribe(),
        }
    }

    /// Resolve the startup session.
    ///
    /// Order is fixed: a persisted provider session wins, then the durable
    /// guest flag, otherwise `SignedOut`. Failures reading either source are
    /// logged and resolution moves on to the next one.
    pub async fn resolve(&self) -> Session {
        let _guard = self.transitions.lock().await;

        let resolved = match self.provider.current_user().await {
            Ok(Some(profile)) => Session::Authenticated(profile),
            Ok(None) => self.resolve_guest().await,
            Err(e) => {
                warn!(error = %e, "identity provider unavailable during session resolution");
                self.resolve_guest().await
            }
        };
        self.publish(resolved.clone());
        resolved
    }

    async fn resolve_guest(&self) -> Session {
        match self.guest_flag.is_set().await {
            Ok(true) => Session::Guest,
            Ok(false) => Session::SignedOut,
            Err(e) => {
                warn!(error = %e, "cannot read guest flag; resolving as signed out");
                Session::SignedOut
            }
        }
    }

    /// Sign in through the identity provider.
    pub async fn sign_in(&self) -> SessionResult<Session> {
        let _guard = self.transitions.lock().await;
        self.require_signed_out("sign in")?;

        let profile = self.provider.sign_in().await?;
        let session = Session::Authenticated(profile);
        self.publish(session.clone());
        Ok(session)
    }

    /// Enter guest mode and persist the guest flag.
    pub async fn enter_guest(&self) -> SessionResult<Session> {
        let _guard = self.transitions.lock().await;
        self.require_signed_out("enter guest mode")?;

        self.guest_flag.set().await?;
        self.publish(Session::Guest);
        Ok(Session::Guest)
    }

    /// Leave the current session. Signing out while signed out is a no-op.
    pub async fn sign_out(&self) -> SessionResult<Session> {
        let _guard = self.transitions.lock().await;
        match self.current() {
            Session::SignedOut => return Ok(Session::SignedOut),
            Session::Guest => self.guest_flag.clear().await?,
            Session::Authenticated(_) => self.provider.sign_out().await?,
        }
        self.publish(Session::SignedOut);
        Ok(Session::SignedOut)
    }

    /// Start applying the provider's own state changes to this manager.
    ///
    /// Spawns a task on the current runtime. Calling it again while a task is
    /// running does nothing. The task ends when the manager is dropped or the
    /// provider closes its watch.
    pub async fn follow_provider(self: &Arc<Self>) -> SessionResult<()> {
        if self.following.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let mut watch = match self.provider.on_state_change().await {
            Ok(watch) => watch,
            Err(e) => {
                self.following.store(false, Ordering::SeqCst);
                return Err(e);
            }
        };

        let manager = Arc::downgrade(self);
        tokio::spawn(async move {
            while watch.next().await.is_some() {
                let Some(manager) = manager.upgrade() else {
                    break;
                };
                manager.reconcile_with_provider().await;
            }
            if let Some(manager) = manager.upgrade() {
                manager.following.store(false, Ordering::SeqCst);
            }
            debug!("stopped following identity provider");
        });
        Ok(())
    }

    /// Bring the session in line with the provider's current user.
    ///
    /// Watch events only signal that something changed; the provider is asked
    /// again under the transition lock so a stale event never undoes a later
    /// transition.
    async fn reconcile_with_provider(&self) {
        let _guard = self.transitions.lock().await;

        let user = match self.provider.current_user().await {
            Ok(user) => user,
            Err(e) => {
                warn!(error = %e, "identity provider unavailable; session unchanged");
                return;
            }
        };
        let next = match (user, self.current()) {
            (Some(profile), Session::Authenticated(active)) if active == profile => return,
            (Some(profile), Session::Guest) => {
                if let Err(e) = self.guest_flag.clear().await {
                    warn!(error = %e, "failed to clear guest flag");
                }
                Session::Authenticated(profile)
            }
            (Some(profile), _) => Session::Authenticated(profile),
            (None, Session::Authenticated(_)) => Session::SignedOut,
            (None, _) => return,
        };
        info!(to = next.label(), "identity provider changed the session");
        self.publish(next);
    }

    fn require_signed_out(&self, action: &'static str) -> SessionResult<()> {
        let current = self.current();
        if current.is_signed_out() {
            Ok(())
        } else {
            Err(SessionError::InvalidTransition {
                from: current.label(),
                action,
            })
        }
    }

    /// Store `next` and notify subscribers if it differs from the current
    /// session.
    fn publish(&self, next: Session) {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        if *current == next {
            return;
        }
        info!(from = current.label(), to = next.label(), "session transition");
        *current = next.clone();
        // No receivers is fine; nobody is listening yet.
        let _ = self.events.send(next);
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("current", &self.current().label())
            .field("subscribers", &self.events.receiver_count())
            .finish()
    }
}

/// Ordered stream of session states for one subscriber.
pub struct SessionSubscription {
    initial: Option<Session>,
    events: broadcast::Receiver<Session>,
}

impl SessionSubscription {
    /// Wait for the next session state. Returns `None` once the manager is
    /// dropped.
    pub async fn next(&mut self) -> Option<Session> {
        if let Some(initial) = self.initial.take() {
            return Some(initial);
        }
        loop {
            match self.events.recv().await {
                Ok(session) => return Some(session),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "session subscriber lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Take the next session state if one is already available.
    pub fn try_next(&mut self) -> Option<Session> {
        if let Some(initial) = self.initial.take() {
            return Some(initial);
        }
        loop {
            match self.events.try_recv() {
                Ok(session) => return Some(session),
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "session subscriber lagged");
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => return None,
            }
        }
    }
}
