//! API route handlers

pub mod customers;
pub mod health;
pub mod rentals;
pub mod vehicles;
