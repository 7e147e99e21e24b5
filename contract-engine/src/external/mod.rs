//! External subsystem interfaces
//!
//! The engine treats clients, meters, subscriptions, field interventions
//! and notifications as black boxes behind async traits:
//! - [`traits`]: the five consumer contracts
//! - [`types`]: the payloads crossing those boundaries
//! - [`http`]: reqwest implementations with a bounded per-call timeout
//! - [`fakes`]: in-memory doubles with failure knobs, shared by unit and
//!   integration tests
//!
//! A timeout is treated identically to an explicit failure response.

pub mod fakes;
pub mod http;
pub mod traits;
pub mod types;

use shared::error::{AppError, ErrorCode};
use thiserror::Error;

pub use traits::{
    ClientRegistry, InterventionScheduler, MeterRegistry, NotificationDispatcher,
    SubscriptionRegistry,
};
pub use types::{ClientInfo, InterventionRequest, MeterInfo, ProvisionedMeter, SubscriptionInfo};

#[derive(Debug, Error)]
pub enum ExternalError {
    #[error("External subsystem unavailable: {0}")]
    Unavailable(String),
    #[error("External call timed out: {0}")]
    Timeout(String),
    #[error("External subsystem rejected the request: {0}")]
    Rejected(String),
}

pub type ExternalResult<T> = Result<T, ExternalError>;

impl From<ExternalError> for AppError {
    fn from(e: ExternalError) -> Self {
        match &e {
            ExternalError::Timeout(msg) => {
                AppError::with_message(ErrorCode::ExternalTimeout, msg.clone())
            }
            ExternalError::Unavailable(msg) | ExternalError::Rejected(msg) => {
                AppError::with_message(ErrorCode::ExternalServiceFailure, msg.clone())
            }
        }
    }
}
