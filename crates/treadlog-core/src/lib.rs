//! treadlog-core library.
//!
//! Gear and run records, weekly history collation, and the maintainer that
//! keeps each gear item's cached total equal to the sum of its runs.
//!
//! # Conventions
//!
//! - **Errors**: `thiserror` enums ([`error::TrackError`],
//!   [`error::StoreError`]) at the library surface; `anyhow::Result` for
//!   database setup and config loading.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `debug!`, `trace!`).

pub mod calendar;
pub mod config;
pub mod db;
pub mod error;
pub mod history;
pub mod maintain;
pub mod model;
pub mod ordering;
pub mod store;
pub mod view;
pub mod watch;

pub use maintain::Maintainer;
