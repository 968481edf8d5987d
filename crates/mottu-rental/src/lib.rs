//! # Mottu Rental
//!
//! Motorcycle rental service: customer registration, fleet management and
//! the rental lifecycle engine that assigns vehicles and prices returns.
//!
//! - **Eligibility**: license category, minimum age and unique documents
//! - **Rental engine**: one active rental per customer, first available
//!   vehicle by id, tiered daily rates, early-return penalties and late fees
//! - **Storage**: Postgres via `sqlx`, or an in-memory store with the same
//!   transactional semantics
//! - **HTTP API**: axum routes under `/api/v1` behind an optional API key

pub mod api;
pub mod config;
pub mod domain;
pub mod error;
pub mod server;
pub mod storage;

pub use config::Config;
pub use error::{RentalError, Result};
pub use server::{AppState, Server};

/// Version of the mottu-rental crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
