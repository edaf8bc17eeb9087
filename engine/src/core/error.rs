use thiserror::Error;
use vcn_referral_common::referral::{ReferralError, UserKey};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Referral(#[from] ReferralError),

    #[error("User {0} not found")]
    UserNotFound(UserKey),

    #[error("Storage error: {0}")]
    Storage(#[from] sled::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Corrupted storage entry: {0}")]
    CorruptedEntry(String),
}
