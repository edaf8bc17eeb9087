// User directory: registration and per-user referral views

use std::sync::Arc;

use log::{debug, info, trace};
use serde::{Deserialize, Serialize};
use vcn_referral_common::{
    config::MAX_ENTRIES_PER_PAGE,
    referral::{
        generate_referral_code, is_valid_referral_code, normalize_referral_code,
        normalize_user_key, LevelInfo, Page, ReferralConfig, ReferralError, ReferralReward, User,
        UserKey,
    },
    time::TimestampSeconds,
};

use crate::config::EngineConfig;

use super::{error::EngineError, storage::Storage};

/// Referral state of a user as shown on its dashboard
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReferralSummary {
    pub user_id: UserKey,
    pub referral_code: String,
    pub referrer_id: Option<UserKey>,
    pub grand_referrer_id: Option<UserKey>,
    pub referral_count: u32,
    #[serde(rename = "totalRewardsUSD")]
    pub total_rewards_usd: f64,
    #[serde(rename = "totalRewardsVCN")]
    pub total_rewards_vcn: f64,
    pub level: LevelInfo,
}

pub struct UserDirectory<S: Storage> {
    storage: Arc<S>,
    code_attempts: u32,
}

impl<S: Storage> UserDirectory<S> {
    pub fn new(storage: Arc<S>, config: &EngineConfig) -> Self {
        Self {
            storage,
            code_attempts: config.referral_code_attempts.max(1),
        }
    }

    /// Register a new user, optionally referred by the holder of `referral_code`.
    ///
    /// The grand referrer is snapshotted from the referrer at this point and
    /// is never re-derived. The referrer's referral count is incremented
    /// together with the insert, so a failed registration can simply be retried.
    pub async fn register_user(
        &self,
        email: &str,
        referral_code: Option<&str>,
        timestamp: TimestampSeconds,
    ) -> Result<User, EngineError> {
        let key = normalize_user_key(email);
        if key.is_empty() {
            return Err(ReferralError::EmptyUserKey.into());
        }

        if log::log_enabled!(log::Level::Trace) {
            trace!("register user {} with referral code {:?}", key, referral_code);
        }

        if self.storage.has_user(&key).await? {
            return Err(ReferralError::AlreadyRegistered(key).into());
        }

        let referrer = match referral_code.map(normalize_referral_code) {
            Some(code) if !code.is_empty() => Some(self.resolve_referrer(&key, &code).await?),
            _ => None,
        };

        // Stores the user and increments the referrer's count as one write
        let user = self.insert_with_fresh_code(key, referrer.as_ref(), timestamp).await?;

        info!(
            "Registered user {} with code {} (referrer: {:?}, grand referrer: {:?})",
            user.id, user.referral_code, user.referrer_id, user.grand_referrer_id
        );

        Ok(user)
    }

    async fn resolve_referrer(&self, key: &str, code: &str) -> Result<User, EngineError> {
        if !is_valid_referral_code(code) {
            return Err(ReferralError::InvalidReferralCode(code.to_owned()).into());
        }

        let referrer = self
            .storage
            .get_user_by_referral_code(code)
            .await?
            .ok_or_else(|| ReferralError::UnknownReferralCode(code.to_owned()))?;

        if referrer.id == key {
            return Err(ReferralError::SelfReferral.into());
        }

        Ok(referrer)
    }

    async fn insert_with_fresh_code(
        &self,
        key: UserKey,
        referrer: Option<&User>,
        timestamp: TimestampSeconds,
    ) -> Result<User, EngineError> {
        for attempt in 1..=self.code_attempts {
            let code = generate_referral_code(&mut rand::thread_rng());
            if self.storage.has_referral_code(&code).await? {
                debug!("Referral code {} already taken (attempt {})", code, attempt);
                continue;
            }

            let user = User::new(key.clone(), code, referrer, timestamp);
            match self.storage.insert_user(&user).await {
                Ok(()) => return Ok(user),
                // Lost a race against another registration drawing the same code
                Err(EngineError::Referral(ReferralError::ReferralCodeTaken(code))) => {
                    debug!("Referral code {} taken concurrently (attempt {})", code, attempt);
                }
                Err(e) => return Err(e),
            }
        }

        Err(ReferralError::ReferralCodeExhausted {
            attempts: self.code_attempts,
        }
        .into())
    }

    pub async fn get_user(&self, email: &str) -> Result<Option<User>, EngineError> {
        self.storage.get_user(&normalize_user_key(email)).await
    }

    async fn require_user(&self, email: &str) -> Result<User, EngineError> {
        let key = normalize_user_key(email);
        self.storage
            .get_user(&key)
            .await?
            .ok_or(EngineError::UserNotFound(key))
    }

    pub async fn referral_summary(
        &self,
        email: &str,
        config: &ReferralConfig,
    ) -> Result<ReferralSummary, EngineError> {
        let user = self.require_user(email).await?;
        let level = config.level_info(user.referral_count);

        Ok(ReferralSummary {
            user_id: user.id,
            referral_code: user.referral_code,
            referrer_id: user.referrer_id,
            grand_referrer_id: user.grand_referrer_id,
            referral_count: user.referral_count,
            total_rewards_usd: user.total_rewards_usd,
            total_rewards_vcn: user.total_rewards_vcn,
            level,
        })
    }

    /// Users directly referred by `email`, ordered by user key
    pub async fn direct_referrals(
        &self,
        email: &str,
        offset: u32,
        limit: u32,
    ) -> Result<Page<UserKey>, EngineError> {
        check_page_size(limit)?;
        let user = self.require_user(email).await?;
        self.storage.get_direct_referrals(&user.id, offset, limit).await
    }

    /// Rewards received by `email`, newest first
    pub async fn reward_history(
        &self,
        email: &str,
        offset: u32,
        limit: u32,
    ) -> Result<Page<ReferralReward>, EngineError> {
        check_page_size(limit)?;
        let user = self.require_user(email).await?;
        self.storage.get_rewards_for_user(&user.id, offset, limit).await
    }
}

fn check_page_size(limit: u32) -> Result<(), ReferralError> {
    if limit > MAX_ENTRIES_PER_PAGE {
        return Err(ReferralError::PageSizeTooLarge {
            max: MAX_ENTRIES_PER_PAGE,
            requested: limit,
        });
    }
    Ok(())
}
