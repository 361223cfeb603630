//! `storefront-auth` — session issuance, validation, and revocation.
//!
//! A session links an opaque token to a user with an expiry. The token is
//! carried in a cookie; the session row lives behind the [`SessionStore`]
//! trait so the backing store is pluggable (SQL in production, in-memory
//! for development and tests).

pub mod session;
pub mod store;
pub mod token;

pub use session::{AuthSession, SESSION_COOKIE, SESSION_TIMEOUT_SECS, SessionAuthenticator};
pub use store::{InMemorySessionStore, Session, SessionStore, SessionStoreError};
