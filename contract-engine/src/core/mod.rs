//! Engine bootstrap and configuration

pub mod config;

pub use config::Config;
