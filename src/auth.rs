//! Session auth state.
//!
//! The engine does not authenticate anyone; it only needs to know whether a
//! user is present, because presence drives the realtime session lifecycle.
//! [`SessionAuth`] holds the nullable current user behind a watch channel so
//! observers see every sign-in and sign-out in order.

use std::sync::Arc;

use tokio::sync::watch;

/// The signed-in user as the engine sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: String,
    pub name: String,
    pub email: String,
}

impl AuthUser {
    pub fn new(id: impl Into<String>, name: impl Into<String>, email: impl Into<String>) -> Self {
        AuthUser {
            id: id.into(),
            name: name.into(),
            email: email.into(),
        }
    }

    /// Short avatar label: first letter of each name word, uppercased,
    /// falling back to the first letter of the email.
    pub fn initials(&self) -> String {
        let from_name: String = self
            .name
            .split_whitespace()
            .filter_map(|word| word.chars().next())
            .flat_map(char::to_uppercase)
            .collect();
        if !from_name.is_empty() {
            return from_name;
        }
        self.email
            .chars()
            .next()
            .map(|c| c.to_uppercase().collect())
            .unwrap_or_default()
    }
}

/// Observable holder for the nullable current user.
///
/// Cheap to clone; clones share the same channel. `None` means signed out,
/// which is also the initial state.
#[derive(Clone)]
pub struct SessionAuth {
    tx: Arc<watch::Sender<Option<AuthUser>>>,
}

impl SessionAuth {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        SessionAuth { tx: Arc::new(tx) }
    }

    pub fn sign_in(&self, user: AuthUser) {
        info!("✓ Signed in: {} <{}>", user.name, user.email);
        self.tx.send_replace(Some(user));
    }

    pub fn sign_out(&self) {
        info!("✓ Signed out");
        self.tx.send_replace(None);
    }

    pub fn current_user(&self) -> Option<AuthUser> {
        self.tx.borrow().clone()
    }

    /// A receiver that observes every auth change from this point on.
    pub fn watch(&self) -> watch::Receiver<Option<AuthUser>> {
        self.tx.subscribe()
    }
}

impl Default for SessionAuth {
    fn default() -> Self {
        SessionAuth::new()
    }
}
