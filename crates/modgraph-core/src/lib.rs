//! modgraph-core library.
//!
//! Reads compiler-produced module dependency listings, builds import graphs
//! over modules or packages, finds import cycles, renders graphviz output,
//! and drives incremental builds from the same listings.
//!
//! # Conventions
//!
//! - **Errors**: `thiserror` enums per module, each mapping to an
//!   [`error::ErrorCode`].
//! - **Logging**: `tracing` macros (`info!`, `warn!`, `debug!`, `trace!`).

#![forbid(unsafe_code)]

pub mod build;
pub mod config;
pub mod deps;
pub mod error;
pub mod filter;
pub mod graph;
pub mod lock;
