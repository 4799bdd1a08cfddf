//! Learning management: SQLite store, fixture loader and the `/lms/api` router

pub mod api;
pub mod loader;
pub mod models;
pub mod schema;
pub mod store;

pub use loader::{FixtureLoader, LoadReport, TableReport};
pub use store::{DbStats, LmsStore};
