// RewardLedgerProvider implementation for sled storage

use crate::core::{
    error::EngineError,
    storage::{sled::EMPTY, RewardLedgerProvider, SledStorage},
};
use ::sled::Transactional;
use async_trait::async_trait;
use log::trace;
use vcn_referral_common::{
    referral::{EventKey, Page, ReferralReward},
    time::get_current_time_in_seconds,
};

#[async_trait]
impl RewardLedgerProvider for SledStorage {
    async fn claim_event(&self, key: &EventKey) -> Result<bool, EngineError> {
        if log::log_enabled!(log::Level::Trace) {
            trace!("claiming event {}", key);
        }

        let claimed_at = get_current_time_in_seconds().to_be_bytes();
        let result = self.reward_events.compare_and_swap(
            key.to_storage_key(),
            None as Option<&[u8]>,
            Some(&claimed_at[..]),
        )?;
        Ok(result.is_ok())
    }

    async fn release_event(&self, key: &EventKey) -> Result<(), EngineError> {
        if log::log_enabled!(log::Level::Trace) {
            trace!("releasing event {}", key);
        }
        self.reward_events.remove(key.to_storage_key())?;
        Ok(())
    }

    async fn is_event_claimed(&self, key: &EventKey) -> Result<bool, EngineError> {
        Ok(self.reward_events.contains_key(key.to_storage_key())?)
    }

    async fn append_reward(&self, reward: &ReferralReward) -> Result<(), EngineError> {
        if log::log_enabled!(log::Level::Trace) {
            trace!(
                "appending tier {} reward of {} {} for {}",
                reward.tier,
                reward.amount,
                reward.currency,
                reward.user_id
            );
        }

        // Monotonic, so the per-user index keeps insertion order
        let id = self.db.generate_id()?;
        let value = Self::encode(reward)?;
        let user_key = Self::user_reward_key(&reward.user_id, id);

        (&self.rewards, &self.rewards_by_user)
            .transaction(|(rewards, rewards_by_user)| {
                rewards.insert(&id.to_be_bytes()[..], value.as_slice())?;
                rewards_by_user.insert(user_key.as_slice(), EMPTY)?;
                Ok(())
            })
            .map_err(Self::map_transaction_error)
    }

    async fn get_rewards_for_user(
        &self,
        key: &str,
        offset: u32,
        limit: u32,
    ) -> Result<Page<ReferralReward>, EngineError> {
        if log::log_enabled!(log::Level::Trace) {
            trace!(
                "getting rewards of user {} (offset: {}, limit: {})",
                key,
                offset,
                limit
            );
        }

        let prefix = Self::prefix_key(key);
        let mut total_count = 0u32;
        let mut rewards = Vec::new();

        // Newest first
        for entry in self.rewards_by_user.scan_prefix(&prefix).rev() {
            let (entry_key, _) = entry?;
            if total_count >= offset && (rewards.len() as u32) < limit {
                let id = &entry_key[prefix.len()..];
                let reward = Self::load_optional(&self.rewards, id)?.ok_or_else(|| {
                    EngineError::CorruptedEntry(format!("missing reward for {}", key))
                })?;
                rewards.push(reward);
            }
            total_count += 1;
        }

        Ok(Page::new(rewards, total_count, offset))
    }

    async fn count_rewards(&self) -> Result<u64, EngineError> {
        Ok(self.rewards.len() as u64)
    }
}
