//! Business logic services.

pub mod orders;
