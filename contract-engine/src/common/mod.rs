//! Shared infrastructure: logging setup

pub mod logger;
