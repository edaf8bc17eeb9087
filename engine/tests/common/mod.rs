// Shared helpers for the engine integration tests

#![allow(dead_code)]

use std::sync::{
    atomic::{AtomicBool, AtomicU32, Ordering},
    Arc,
};

use async_trait::async_trait;
use vcn_referral_common::referral::{
    Currency, EventKey, Page, ReferralConfig, ReferralReward, User, UserKey,
};
use vcn_referral_engine::{
    config::EngineConfig,
    core::{
        directory::UserDirectory,
        error::EngineError,
        leaderboard::Leaderboard,
        rewards::{RewardEngine, RewardRequest},
        settings::ReferralSettings,
        storage::{
            MemoryStorage, RewardLedgerProvider, SettingsProvider, Storage, UserProvider,
        },
    },
};

pub const TIMESTAMP: u64 = 1_700_000_000;

/// Every service of the engine over one storage
pub struct TestEngine<S: Storage> {
    pub storage: Arc<S>,
    pub directory: UserDirectory<S>,
    pub rewards: RewardEngine<S>,
    pub leaderboard: Leaderboard<S>,
    pub settings: ReferralSettings<S>,
}

impl<S: Storage> TestEngine<S> {
    pub fn new(storage: S) -> Self {
        Self::with_config(storage, &EngineConfig::default())
    }

    pub fn with_config(storage: S, config: &EngineConfig) -> Self {
        let storage = Arc::new(storage);
        Self {
            directory: UserDirectory::new(Arc::clone(&storage), config),
            rewards: RewardEngine::new(Arc::clone(&storage)),
            leaderboard: Leaderboard::new(Arc::clone(&storage), config),
            settings: ReferralSettings::new(Arc::clone(&storage)),
            storage,
        }
    }

    /// Register `email`, referred by `referrer` if any
    pub async fn register(&self, email: &str, referrer: Option<&User>) -> User {
        self.directory
            .register_user(
                email,
                referrer.map(|r| r.referral_code.as_str()),
                TIMESTAMP,
            )
            .await
            .unwrap()
    }

    /// Register `count` users referred by `referrer`
    pub async fn register_referrals(&self, referrer: &User, prefix: &str, count: u32) {
        for i in 0..count {
            self.register(&format!("{}{}@example.com", prefix, i), Some(referrer))
                .await;
        }
    }

    /// alice <- bob <- carol
    pub async fn chain(&self) -> (User, User, User) {
        let alice = self.register("alice@example.com", None).await;
        let bob = self.register("bob@example.com", Some(&alice)).await;
        let carol = self.register("carol@example.com", Some(&bob)).await;
        (alice, bob, carol)
    }

    pub async fn user(&self, email: &str) -> User {
        self.directory.get_user(email).await.unwrap().unwrap()
    }
}

pub fn memory_engine() -> TestEngine<MemoryStorage> {
    TestEngine::new(MemoryStorage::new())
}

/// Flat multiplier of 1 at every level
pub fn flat_config(tier1_rate: f64, tier2_rate: f64) -> ReferralConfig {
    ReferralConfig {
        tier1_rate,
        tier2_rate,
        base_xp_multiplier: 1.0,
        xp_multiplier_per_level: 0.0,
        ..Default::default()
    }
}

pub fn usd_request(event: &str, user: &User, amount: f64, tx_hash: &str) -> RewardRequest {
    RewardRequest::new(event, user.id.as_str(), amount, Currency::Usd).with_tx_hash(tx_hash)
}

pub fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {}, got {}",
        expected,
        actual
    );
}

/// Memory storage with switchable faults
#[derive(Default)]
pub struct FaultyStorage {
    pub inner: MemoryStorage,
    /// Ledger rows for this beneficiary are refused
    pub fail_append_for: Option<UserKey>,
    /// Every ledger row is refused while set
    pub ledger_down: AtomicBool,
    /// Reads of this user return nothing, as if the record was gone
    pub hidden_user: Option<UserKey>,
    /// Number of upcoming user inserts to refuse
    pub failing_inserts: AtomicU32,
}

impl FaultyStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn unavailable() -> EngineError {
        EngineError::CorruptedEntry("storage unavailable".to_owned())
    }
}

#[async_trait]
impl UserProvider for FaultyStorage {
    async fn get_user(&self, key: &str) -> Result<Option<User>, EngineError> {
        if self.hidden_user.as_deref() == Some(key) {
            return Ok(None);
        }
        self.inner.get_user(key).await
    }

    async fn has_user(&self, key: &str) -> Result<bool, EngineError> {
        self.inner.has_user(key).await
    }

    async fn insert_user(&self, user: &User) -> Result<(), EngineError> {
        let refused = self
            .failing_inserts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if refused {
            return Err(Self::unavailable());
        }
        self.inner.insert_user(user).await
    }

    async fn get_user_by_referral_code(&self, code: &str) -> Result<Option<User>, EngineError> {
        self.inner.get_user_by_referral_code(code).await
    }

    async fn has_referral_code(&self, code: &str) -> Result<bool, EngineError> {
        self.inner.has_referral_code(code).await
    }

    async fn increment_referral_count(&self, key: &str) -> Result<u32, EngineError> {
        self.inner.increment_referral_count(key).await
    }

    async fn increment_rewards(
        &self,
        key: &str,
        currency: Currency,
        delta: f64,
    ) -> Result<f64, EngineError> {
        self.inner.increment_rewards(key, currency, delta).await
    }

    async fn get_direct_referrals(
        &self,
        key: &str,
        offset: u32,
        limit: u32,
    ) -> Result<Page<UserKey>, EngineError> {
        self.inner.get_direct_referrals(key, offset, limit).await
    }

    async fn get_users_by_referral_count(
        &self,
        offset: u32,
        limit: u32,
    ) -> Result<Page<User>, EngineError> {
        self.inner.get_users_by_referral_count(offset, limit).await
    }

    async fn count_users(&self) -> Result<u32, EngineError> {
        self.inner.count_users().await
    }
}

#[async_trait]
impl RewardLedgerProvider for FaultyStorage {
    async fn claim_event(&self, key: &EventKey) -> Result<bool, EngineError> {
        self.inner.claim_event(key).await
    }

    async fn release_event(&self, key: &EventKey) -> Result<(), EngineError> {
        self.inner.release_event(key).await
    }

    async fn is_event_claimed(&self, key: &EventKey) -> Result<bool, EngineError> {
        self.inner.is_event_claimed(key).await
    }

    async fn append_reward(&self, reward: &ReferralReward) -> Result<(), EngineError> {
        if self.ledger_down.load(Ordering::SeqCst)
            || self.fail_append_for.as_deref() == Some(reward.user_id.as_str())
        {
            return Err(Self::unavailable());
        }
        self.inner.append_reward(reward).await
    }

    async fn get_rewards_for_user(
        &self,
        key: &str,
        offset: u32,
        limit: u32,
    ) -> Result<Page<ReferralReward>, EngineError> {
        self.inner.get_rewards_for_user(key, offset, limit).await
    }

    async fn count_rewards(&self) -> Result<u64, EngineError> {
        self.inner.count_rewards().await
    }
}

#[async_trait]
impl SettingsProvider for FaultyStorage {
    async fn get_config(&self) -> Result<Option<ReferralConfig>, EngineError> {
        self.inner.get_config().await
    }

    async fn set_config(&self, config: &ReferralConfig) -> Result<(), EngineError> {
        self.inner.set_config(config).await
    }
}

impl Storage for FaultyStorage {}
