//! # EcoCampus (campus sustainability client)
//!
//! `ecocampus` is a thin client over a hosted auth/data backend. Users report
//! waste sightings, browse recent reports and redeem accumulated points for
//! campus rewards.
//!
//! ## Session core
//!
//! The [`auth::state::SessionStore`] is the single source of truth for who is
//! signed in and what their profile looks like. It subscribes to backend
//! auth-change notifications, races an initial session check against them and
//! resolves both through a monotonic version tag so a stale resolution never
//! overwrites a newer one.
//!
//! - **Auth actions:** sign in, sign up, sign out and profile updates surface a
//!   [`notify::Notification`] and return the backend error to the caller.
//! - **Guards:** [`auth::guards::RequireAuth`] blocks on authentication (and an
//!   optional role, with `admin` as a wildcard); [`auth::guards::OptionalAuth`]
//!   only delays rendering, for at most three seconds.
//!
//! ## Backend
//!
//! [`auth::rest::RestBackend`] speaks the GoTrue-style auth endpoints and the
//! PostgREST-style row endpoints of the hosted backend. The session is persisted
//! to a file so the CLI stays signed in between runs; tokens never reach logs.

pub mod api;
pub mod auth;
pub mod cli;
pub mod notify;
pub mod reports;
pub mod rewards;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
    }

    #[test]
    fn test_app_user_agent_format() {
        assert!(APP_USER_AGENT.starts_with(env!("CARGO_PKG_NAME")));
        assert!(APP_USER_AGENT.contains(env!("CARGO_PKG_VERSION")));
    }
}
