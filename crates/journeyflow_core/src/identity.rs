//! Identity provider contract and in-process session.
//!
//! # Responsibility
//! - Expose "current owner identifier, or none" to repositories.
//! - Hold the signed-in identity handed over by the platform auth layer.
//!
//! # Invariants
//! - Blank owner identifiers are treated as signed out.
//! - Token refresh and session expiry live in the platform auth layer.

use log::info;
use std::sync::RwLock;

/// Source of the signed-in owner identity.
pub trait IdentityProvider {
    /// Stable owner identifier, or `None` when nobody is signed in.
    fn current_owner_id(&self) -> Option<String>;

    /// Human-readable name for the signed-in owner, when known.
    fn display_name(&self) -> Option<String> {
        None
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct SignedIn {
    owner_id: String,
    display_name: Option<String>,
}

/// Mutable session shared by repositories of one app process.
#[derive(Debug, Default)]
pub struct Session {
    current: RwLock<Option<SignedIn>>,
}

impl Session {
    /// Creates a signed-out session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a session already signed in as `owner_id`.
    pub fn signed_in(owner_id: impl Into<String>, display_name: Option<String>) -> Self {
        let session = Self::new();
        session.sign_in(owner_id, display_name);
        session
    }

    /// Records the identity issued by the auth provider.
    ///
    /// A blank `owner_id` leaves the session signed out.
    pub fn sign_in(&self, owner_id: impl Into<String>, display_name: Option<String>) {
        let owner_id = owner_id.into().trim().to_string();
        let next = if owner_id.is_empty() {
            None
        } else {
            Some(SignedIn {
                owner_id,
                display_name: display_name
                    .map(|name| name.trim().to_string())
                    .filter(|name| !name.is_empty()),
            })
        };
        let signed_in = next.is_some();
        match self.current.write() {
            Ok(mut guard) => *guard = next,
            Err(poisoned) => *poisoned.into_inner() = next,
        }
        info!("event=session_sign_in module=identity status=ok signed_in={signed_in}");
    }

    /// Clears the signed-in identity.
    pub fn sign_out(&self) {
        match self.current.write() {
            Ok(mut guard) => *guard = None,
            Err(poisoned) => *poisoned.into_inner() = None,
        }
        info!("event=session_sign_out module=identity status=ok");
    }

    fn snapshot(&self) -> Option<SignedIn> {
        match self.current.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl IdentityProvider for Session {
    fn current_owner_id(&self) -> Option<String> {
        self.snapshot().map(|signed_in| signed_in.owner_id)
    }

    fn display_name(&self) -> Option<String> {
        self.snapshot().and_then(|signed_in| signed_in.display_name)
    }
}

/// Derives a display name from the local part of an email address.
///
/// Returns `None` for blank input or an empty local part.
pub fn username_from_email(email: &str) -> Option<String> {
    let local = email.trim().split('@').next().unwrap_or_default().trim();
    if local.is_empty() {
        None
    } else {
        Some(local.to_string())
    }
}
