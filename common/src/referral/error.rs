// Referral system error types

use thiserror::Error;

/// Errors that can occur in the referral system
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ReferralError {
    /// User is already registered
    #[error("User {0} is already registered")]
    AlreadyRegistered(String),

    /// User key is empty once normalized
    #[error("User key must not be empty")]
    EmptyUserKey,

    /// No user holds this referral code
    #[error("Unknown referral code {0}")]
    UnknownReferralCode(String),

    /// Attempted to set self as referrer
    #[error("Cannot set self as referrer")]
    SelfReferral,

    /// Referral code has the wrong shape
    #[error("Invalid referral code {0}: expected 6 uppercase alphanumeric characters")]
    InvalidReferralCode(String),

    /// Referral code already held by another user
    #[error("Referral code {0} is already taken")]
    ReferralCodeTaken(String),

    /// Could not find a free referral code
    #[error("No free referral code found after {attempts} attempts")]
    ReferralCodeExhausted { attempts: u32 },

    /// Reward rate is not a fraction between 0 and 1
    #[error("Invalid {name} {value}: must be between 0 and 1")]
    InvalidRate { name: &'static str, value: f64 },

    /// XP curve coefficient is negative or not finite
    #[error("Invalid {name} {value}: must be a finite non-negative number")]
    InvalidMultiplier { name: &'static str, value: f64 },

    /// No level threshold configured
    #[error("At least one level threshold is required")]
    NoLevelThresholds,

    /// Threshold range is malformed or breaks the contiguous level ordering
    #[error("Invalid level threshold #{index}: {reason}")]
    InvalidLevelThreshold { index: usize, reason: String },

    /// No rank configured
    #[error("At least one rank is required")]
    NoRanks,

    /// No rank with min level 1, some levels would have no rank
    #[error("Rank table must contain a floor rank with min level 1")]
    MissingFloorRank,

    /// Requested level is outside of 1..=100
    #[error("Level {level} is out of range, maximum is {max}")]
    LevelOutOfRange { level: u32, max: u32 },

    /// Page size exceeds maximum allowed
    #[error("Page size {requested} exceeds maximum {max}")]
    PageSizeTooLarge { max: u32, requested: u32 },
}

/// Result type for referral operations
pub type ReferralResult<T> = Result<T, ReferralError>;
