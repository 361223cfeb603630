//! `storefront-infra` — database and collaborator plumbing.
//!
//! Resource models reach persistence only through the narrow [`Database`]
//! trait. Two implementations ship: [`MySqlDatabase`] over a sqlx pool for
//! production, and the scripted [`MemoryDatabase`] used by tests and the
//! zero-configuration development wiring.

pub mod database;
pub mod mailer;
pub mod memory;
pub mod mysql;
pub mod session_store;

pub use database::{Database, ExecResult, RowMap, SqlValue};
pub use mailer::{LogMailer, Mailer};
pub use memory::MemoryDatabase;
pub use mysql::MySqlDatabase;
pub use session_store::SqlSessionStore;
