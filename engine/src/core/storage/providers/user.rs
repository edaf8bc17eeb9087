// User directory storage provider trait

use crate::core::error::EngineError;
use async_trait::async_trait;
use vcn_referral_common::referral::{Currency, Page, User, UserKey};

/// Storage provider for the user directory
#[async_trait]
pub trait UserProvider {
    /// Get a user by its normalized key
    async fn get_user(&self, key: &str) -> Result<Option<User>, EngineError>;

    /// Check if a user is registered
    async fn has_user(&self, key: &str) -> Result<bool, EngineError>;

    /// Register a new user
    ///
    /// # Errors
    /// * `AlreadyRegistered` - the key is already taken
    /// * `ReferralCodeTaken` - another user holds the same referral code
    /// * `UserNotFound` - the referrer is not registered
    ///
    /// When the user has a referrer, it is added to the referrer's direct
    /// referrals listing and the referrer's count is incremented in the same
    /// atomic step. On error nothing is written.
    async fn insert_user(&self, user: &User) -> Result<(), EngineError>;

    /// Resolve a referral code to the user holding it
    async fn get_user_by_referral_code(&self, code: &str) -> Result<Option<User>, EngineError>;

    /// Check if a referral code is already held by a user
    async fn has_referral_code(&self, code: &str) -> Result<bool, EngineError>;

    /// Atomically add one to the referral count of a user
    /// Returns the new count
    async fn increment_referral_count(&self, key: &str) -> Result<u32, EngineError>;

    /// Atomically add `delta` to the cumulative rewards of a user
    /// Returns the new total for that currency
    ///
    /// Must never be implemented as an unguarded read followed by a write:
    /// two concurrent payouts to the same user would lose one increment.
    async fn increment_rewards(
        &self,
        key: &str,
        currency: Currency,
        delta: f64,
    ) -> Result<f64, EngineError>;

    /// Get direct referrals (users who have this user as their referrer),
    /// ordered by user key
    async fn get_direct_referrals(
        &self,
        key: &str,
        offset: u32,
        limit: u32,
    ) -> Result<Page<UserKey>, EngineError>;

    /// Users ordered by referral count descending, ties broken by user key
    async fn get_users_by_referral_count(
        &self,
        offset: u32,
        limit: u32,
    ) -> Result<Page<User>, EngineError>;

    /// Number of registered users
    async fn count_users(&self) -> Result<u32, EngineError>;
}
