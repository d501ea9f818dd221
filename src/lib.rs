//! Statehouse - Discord-authenticated country backend
//!
//! Each Discord identity owns one persistent "country" document of
//! numeric policy fields, read and updated over JSON/HTTP behind a
//! cookie session.
//!
//! ## Services
//!
//! - **OAuth**: Discord authorization-code flow (`identify` scope)
//! - **Sessions**: server-side sessions storing only the identity key,
//!   with per-request rehydration of the country record
//! - **Store**: MongoDB repository for country documents

pub mod config;
pub mod db;
pub mod oauth;
pub mod routes;
pub mod server;
pub mod session;
pub mod types;

pub use config::Args;
pub use server::{run, AppState};
pub use types::{Result, StatehouseError};
