//! Auth feature covering the session store, profile loading, auth actions and
//! route guards. It keeps authentication logic out of the presentation layer
//! and touches security boundaries: never log passwords or token material.
//!
//! Flow Overview: the store subscribes to auth changes, then checks the
//! current session. Any identity it learns about triggers a profile fetch;
//! actions only call the backend and let the subscription carry the new
//! identity back. Guards read store snapshots to decide what to render.

mod actions;
pub mod backend;
pub mod guards;
pub mod profile;
pub mod rest;
pub mod state;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use backend::{AuthBackend, AuthSubscription};
pub use guards::{Gate, OptionalAuth, Rendered, RequireAuth, Reveal, OPTIONAL_AUTH_GRACE};
pub use state::{SessionHandle, SessionState, SessionStore};
pub use types::{Identity, Profile, ProfileUpdate, Role, Session, SignUpDetails, UserId};
