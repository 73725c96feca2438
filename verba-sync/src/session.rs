//! Session tracking and change notification.
//!
//! The identity provider itself is external. [`SessionHub`] mirrors its
//! state (who is signed in) and fans session transitions out to
//! subscribers. Callbacks run synchronously on the notifying thread; one
//! callback panicking does not stop the others. That isolation needs the
//! default unwinding panic strategy.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock, Weak};
use tracing::{debug, warn};
use verba_types::UserId;

/// A session transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Interactive sign-in.
    SignedIn {
        user_id: UserId,
        access_token: Option<String>,
    },
    /// An existing session was found at startup.
    Restored {
        user_id: UserId,
        access_token: Option<String>,
    },
    SignedOut,
}

impl SessionEvent {
    pub fn user_id(&self) -> Option<&UserId> {
        match self {
            SessionEvent::SignedIn { user_id, .. } | SessionEvent::Restored { user_id, .. } => {
                Some(user_id)
            }
            SessionEvent::SignedOut => None,
        }
    }

    pub fn access_token(&self) -> Option<&str> {
        match self {
            SessionEvent::SignedIn { access_token, .. }
            | SessionEvent::Restored { access_token, .. } => access_token.as_deref(),
            SessionEvent::SignedOut => None,
        }
    }

    /// Whether this transition starts a session (and so warrants a full sync).
    pub fn establishes_session(&self) -> bool {
        !matches!(self, SessionEvent::SignedOut)
    }
}

/// Read access to the current identity.
pub trait SessionProvider: Send + Sync {
    /// The signed-in user, if any.
    fn current_user_id(&self) -> Option<UserId>;
}

type Callback = Arc<dyn Fn(&SessionEvent) + Send + Sync>;

#[derive(Default)]
struct HubInner {
    current: RwLock<Option<UserId>>,
    subscribers: Mutex<Vec<(u64, Callback)>>,
    next_id: AtomicU64,
}

impl HubInner {
    fn remove(&self, id: u64) {
        self.subscribers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .retain(|(sid, _)| *sid != id);
    }
}

/// Current session plus a registry of transition callbacks.
#[derive(Clone, Default)]
pub struct SessionHub {
    inner: Arc<HubInner>,
}

impl std::fmt::Debug for SessionHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHub")
            .field("current", &self.current_user_id())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

impl SessionHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a callback for every subsequent transition.
    ///
    /// The callback stays registered until the returned handle is
    /// unsubscribed or dropped.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe(&self, callback: impl Fn(&SessionEvent) + Send + Sync + 'static) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner
            .subscribers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((id, Arc::new(callback)));
        Subscription {
            id,
            hub: Arc::downgrade(&self.inner),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner
            .subscribers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    /// Records an interactive sign-in and notifies subscribers.
    pub fn sign_in(&self, user_id: UserId, access_token: Option<String>) -> usize {
        self.transition(SessionEvent::SignedIn {
            user_id,
            access_token,
        })
    }

    /// Records a session restored at startup and notifies subscribers.
    pub fn restore(&self, user_id: UserId, access_token: Option<String>) -> usize {
        self.transition(SessionEvent::Restored {
            user_id,
            access_token,
        })
    }

    pub fn sign_out(&self) -> usize {
        self.transition(SessionEvent::SignedOut)
    }

    /// Updates the current identity, then runs every callback.
    /// Returns how many callbacks panicked.
    pub fn transition(&self, event: SessionEvent) -> usize {
        *self.inner.current.write().unwrap_or_else(|e| e.into_inner()) = event.user_id().cloned();

        // Snapshot so callbacks may (un)subscribe without deadlocking.
        let callbacks: Vec<Callback> = self
            .inner
            .subscribers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(_, cb)| Arc::clone(cb))
            .collect();

        debug!("Session transition {:?} to {} subscribers", event, callbacks.len());

        let mut panicked = 0;
        for callback in callbacks {
            if catch_unwind(AssertUnwindSafe(|| callback(&event))).is_err() {
                warn!("Session subscriber panicked handling {:?}", event);
                panicked += 1;
            }
        }
        panicked
    }
}

impl SessionProvider for SessionHub {
    fn current_user_id(&self) -> Option<UserId> {
        self.inner
            .current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

/// Handle returned by [`SessionHub::subscribe`].
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    hub: Weak<HubInner>,
}

impl Subscription {
    /// Removes the callback. Dropping the handle does the same.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(hub) = self.hub.upgrade() {
            hub.remove(self.id);
        }
    }
}
