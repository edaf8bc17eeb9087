// In-memory storage backend
//
// All collections live behind a single tokio RwLock. Every mutation,
// including counter increments, happens inside one write guard, so
// concurrent reward calls cannot lose updates.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::core::{
    error::EngineError,
    storage::{RewardLedgerProvider, SettingsProvider, Storage, UserProvider},
};
use async_trait::async_trait;
use log::trace;
use tokio::sync::RwLock;
use vcn_referral_common::referral::{
    Currency, EventKey, Page, ReferralConfig, ReferralError, ReferralReward, User, UserKey,
};

#[derive(Default)]
struct Collections {
    users: HashMap<UserKey, User>,
    // {referral_code} => {user_key}
    referral_codes: HashMap<String, UserKey>,
    // {referrer_key} => {direct referral keys}
    direct_referrals: HashMap<UserKey, BTreeSet<UserKey>>,
    rewards: Vec<ReferralReward>,
    // {user_key} => {indexes in rewards}
    rewards_by_user: HashMap<UserKey, Vec<usize>>,
    claimed_events: HashSet<EventKey>,
    config: Option<ReferralConfig>,
}

#[derive(Default)]
pub struct MemoryStorage {
    inner: RwLock<Collections>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {}

fn paginate<T: Clone>(items: &[T], offset: u32, limit: u32) -> Page<T> {
    let total_count = items.len() as u32;
    if offset >= total_count {
        return Page::empty(total_count, offset);
    }

    let page = items
        .iter()
        .skip(offset as usize)
        .take(limit as usize)
        .cloned()
        .collect();
    Page::new(page, total_count, offset)
}

#[async_trait]
impl UserProvider for MemoryStorage {
    async fn get_user(&self, key: &str) -> Result<Option<User>, EngineError> {
        if log::log_enabled!(log::Level::Trace) {
            trace!("getting user {}", key);
        }
        Ok(self.inner.read().await.users.get(key).cloned())
    }

    async fn has_user(&self, key: &str) -> Result<bool, EngineError> {
        Ok(self.inner.read().await.users.contains_key(key))
    }

    async fn insert_user(&self, user: &User) -> Result<(), EngineError> {
        if log::log_enabled!(log::Level::Trace) {
            trace!("inserting user {} with code {}", user.id, user.referral_code);
        }

        let mut inner = self.inner.write().await;
        if inner.users.contains_key(&user.id) {
            return Err(ReferralError::AlreadyRegistered(user.id.clone()).into());
        }
        if inner.referral_codes.contains_key(&user.referral_code) {
            return Err(ReferralError::ReferralCodeTaken(user.referral_code.clone()).into());
        }
        if let Some(referrer) = &user.referrer_id {
            if !inner.users.contains_key(referrer) {
                return Err(EngineError::UserNotFound(referrer.clone()));
            }
        }

        inner
            .referral_codes
            .insert(user.referral_code.clone(), user.id.clone());
        if let Some(referrer) = &user.referrer_id {
            inner
                .direct_referrals
                .entry(referrer.clone())
                .or_default()
                .insert(user.id.clone());
            if let Some(referrer) = inner.users.get_mut(referrer) {
                referrer.increment_referral_count();
            }
        }
        inner.users.insert(user.id.clone(), user.clone());

        Ok(())
    }

    async fn get_user_by_referral_code(&self, code: &str) -> Result<Option<User>, EngineError> {
        let inner = self.inner.read().await;
        Ok(inner
            .referral_codes
            .get(code)
            .and_then(|key| inner.users.get(key))
            .cloned())
    }

    async fn has_referral_code(&self, code: &str) -> Result<bool, EngineError> {
        Ok(self.inner.read().await.referral_codes.contains_key(code))
    }

    async fn increment_referral_count(&self, key: &str) -> Result<u32, EngineError> {
        if log::log_enabled!(log::Level::Trace) {
            trace!("incrementing referral count of {}", key);
        }

        let mut inner = self.inner.write().await;
        let user = inner
            .users
            .get_mut(key)
            .ok_or_else(|| EngineError::UserNotFound(key.to_owned()))?;
        user.increment_referral_count();
        Ok(user.referral_count)
    }

    async fn increment_rewards(
        &self,
        key: &str,
        currency: Currency,
        delta: f64,
    ) -> Result<f64, EngineError> {
        if log::log_enabled!(log::Level::Trace) {
            trace!("adding {} {} to rewards of {}", delta, currency, key);
        }

        let mut inner = self.inner.write().await;
        let user = inner
            .users
            .get_mut(key)
            .ok_or_else(|| EngineError::UserNotFound(key.to_owned()))?;
        user.add_rewards(currency, delta);
        Ok(user.total_rewards(currency))
    }

    async fn get_direct_referrals(
        &self,
        key: &str,
        offset: u32,
        limit: u32,
    ) -> Result<Page<UserKey>, EngineError> {
        let inner = self.inner.read().await;
        let referrals: Vec<UserKey> = inner
            .direct_referrals
            .get(key)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default();
        Ok(paginate(&referrals, offset, limit))
    }

    async fn get_users_by_referral_count(
        &self,
        offset: u32,
        limit: u32,
    ) -> Result<Page<User>, EngineError> {
        let inner = self.inner.read().await;
        // Ordered by (count desc, key asc)
        let ranking: BTreeMap<(u32, &UserKey), &User> = inner
            .users
            .values()
            .map(|user| ((u32::MAX - user.referral_count, &user.id), user))
            .collect();
        let users: Vec<User> = ranking.into_values().cloned().collect();
        Ok(paginate(&users, offset, limit))
    }

    async fn count_users(&self) -> Result<u32, EngineError> {
        Ok(self.inner.read().await.users.len() as u32)
    }
}

#[async_trait]
impl RewardLedgerProvider for MemoryStorage {
    async fn claim_event(&self, key: &EventKey) -> Result<bool, EngineError> {
        if log::log_enabled!(log::Level::Trace) {
            trace!("claiming event {}", key);
        }
        Ok(self.inner.write().await.claimed_events.insert(key.clone()))
    }

    async fn release_event(&self, key: &EventKey) -> Result<(), EngineError> {
        if log::log_enabled!(log::Level::Trace) {
            trace!("releasing event {}", key);
        }
        self.inner.write().await.claimed_events.remove(key);
        Ok(())
    }

    async fn is_event_claimed(&self, key: &EventKey) -> Result<bool, EngineError> {
        Ok(self.inner.read().await.claimed_events.contains(key))
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

        let mut inner = self.inner.write().await;
        let index = inner.rewards.len();
        inner.rewards.push(reward.clone());
        inner
            .rewards_by_user
            .entry(reward.user_id.clone())
            .or_default()
            .push(index);
        Ok(())
    }

    async fn get_rewards_for_user(
        &self,
        key: &str,
        offset: u32,
        limit: u32,
    ) -> Result<Page<ReferralReward>, EngineError> {
        let inner = self.inner.read().await;
        let rewards: Vec<ReferralReward> = inner
            .rewards_by_user
            .get(key)
            .map(|indexes| {
                indexes
                    .iter()
                    .rev()
                    .filter_map(|index| inner.rewards.get(*index))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(paginate(&rewards, offset, limit))
    }

    async fn count_rewards(&self) -> Result<u64, EngineError> {
        Ok(self.inner.read().await.rewards.len() as u64)
    }
}

#[async_trait]
impl SettingsProvider for MemoryStorage {
    async fn get_config(&self) -> Result<Option<ReferralConfig>, EngineError> {
        Ok(self.inner.read().await.config.clone())
    }

    async fn set_config(&self, config: &ReferralConfig) -> Result<(), EngineError> {
        self.inner.write().await.config = Some(config.clone());
        Ok(())
    }
}
