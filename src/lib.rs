//! # Alert Configuration Library
//!
//! Hierarchical alert configuration engine (schemas, store, resolver,
//! validator, override manager) and the HTTP service built around it.

pub mod alerts;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod repositories;
pub mod server;
pub mod telemetry;
pub use migration;
