// Reward ledger storage provider trait

use crate::core::error::EngineError;
use async_trait::async_trait;
use vcn_referral_common::referral::{EventKey, Page, ReferralReward};

/// Storage provider for the append-only reward ledger
#[async_trait]
pub trait RewardLedgerProvider {
    /// Record that an event has been processed
    ///
    /// This is an atomic insert-if-absent: it returns `true` for the first
    /// caller and `false` for every later caller with the same key.
    async fn claim_event(&self, key: &EventKey) -> Result<bool, EngineError>;

    /// Forget a claimed event so it can be processed again
    ///
    /// Only valid while no ledger row was written for the event.
    async fn release_event(&self, key: &EventKey) -> Result<(), EngineError>;

    /// Check if an event was already processed
    async fn is_event_claimed(&self, key: &EventKey) -> Result<bool, EngineError>;

    /// Append a reward row, rows are never updated or deleted
    async fn append_reward(&self, reward: &ReferralReward) -> Result<(), EngineError>;

    /// Rewards received by a user, newest first
    async fn get_rewards_for_user(
        &self,
        key: &str,
        offset: u32,
        limit: u32,
    ) -> Result<Page<ReferralReward>, EngineError>;

    /// Total number of ledger rows
    async fn count_rewards(&self) -> Result<u64, EngineError>;
}
