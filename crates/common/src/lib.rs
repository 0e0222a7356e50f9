//! Common utilities and shared types for academy-rs.
//!
//! This crate provides foundational components used across all academy-rs crates:
//!
//! - **Configuration**: Application settings via [`Config`]
//! - **Error handling**: Unified error types via [`AppError`] and [`AppResult`]
//! - **ID Generation**: ULID-based unique identifiers via [`IdGenerator`]
//! - **Retry**: Bounded exponential backoff for side-effect writes via [`RetryPolicy`]
//! - **Metrics**: Lifecycle and dispatch counters via [`Metrics`]
//!
//! # Example
//!
//! ```no_run
//! use academy_common::{Config, IdGenerator, AppResult};
//!
//! fn example() -> AppResult<()> {
//!     let config = Config::load()?;
//!     let id_gen = IdGenerator::new();
//!     let id = id_gen.generate();
//!     println!("Generated ID: {} (dispatch mode {:?})", id, config.dispatch.mode);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod id;
pub mod metrics;
pub mod retry;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use id::IdGenerator;
pub use metrics::{Metrics, MetricsSnapshot, get_metrics};
pub use retry::{RetryFailure, RetryPolicy, Retryable};
