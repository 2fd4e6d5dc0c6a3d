//! # Repository Layer
//!
//! Repository implementations that encapsulate SeaORM operations.

pub mod alert_configuration;

pub use alert_configuration::AlertConfigurationRepository;
