//! Shared building blocks for the Mottu rental service crates

pub mod logging;
pub mod types;

pub use types::{Page, PageRequest, PageRequestError};
