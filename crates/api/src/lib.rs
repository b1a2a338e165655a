//! Cartwright API - order-placement backend.
//!
//! # Architecture
//!
//! - Axum web framework serving a JSON API
//! - `PostgreSQL` (via sqlx) for the catalog and order ledger, with an
//!   in-memory backend for tests and local development
//! - The order workflow in [`services::orders`] is the core: everything
//!   else is glue between HTTP and that workflow
//!
//! The library target exists so the integration-tests crate can drive the
//! real router without spawning a process.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
