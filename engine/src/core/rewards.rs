// Referral reward distribution
//
// A revenue event on a user pays its direct referrer (tier 1) and the grand
// referrer snapshotted at signup (tier 2). Each tier pays
// `amount * tierRate * multiplier(beneficiaryLevel)`.

use std::{str::FromStr, sync::Arc};

use log::{debug, info, trace, warn};
use metrics::counter;
use serde::{Deserialize, Serialize};
use strum::{Display, IntoStaticStr};
use vcn_referral_common::{
    referral::{
        normalize_user_key, Currency, EventKey, ReferralConfig, ReferralReward, RewardEvent,
        RewardStatus, RewardTier, User, UserKey,
    },
    time::{get_current_time_in_seconds, TimestampSeconds},
};

use super::{error::EngineError, storage::Storage};

/// A revenue event reported by a subscription, token sale or staking flow
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardRequest {
    /// Event type name, parsed against the known events
    pub event: String,
    /// User whose payment triggered the event
    pub user_id: String,
    pub amount: f64,
    pub currency: Currency,
    /// On-chain transfer backing the event, also used to reject replays
    #[serde(default)]
    pub tx_hash: Option<String>,
}

impl RewardRequest {
    pub fn new(
        event: impl Into<String>,
        user_id: impl Into<String>,
        amount: f64,
        currency: Currency,
    ) -> Self {
        Self {
            event: event.into(),
            user_id: user_id.into(),
            amount,
            currency,
            tx_hash: None,
        }
    }

    pub fn with_tx_hash(mut self, tx_hash: impl Into<String>) -> Self {
        self.tx_hash = Some(tx_hash.into());
        self
    }
}

/// Why a request produced no ledger rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum SkipReason {
    /// Event name is not a known event type
    UnknownEvent,
    /// Event is not part of the enabled events
    EventDisabled,
    /// Amount is negative or not a number
    InvalidAmount,
    /// Triggering user is not registered
    UserNotFound,
    /// Triggering user signed up without a referral code
    NoReferrer,
    /// Referrer references point to users that do not exist
    ReferrerNotFound,
    /// Every tier computed a zero payout
    ZeroPayout,
}

impl SkipReason {
    /// Integrity issues are worth investigating, the others are expected
    pub fn is_integrity_issue(self) -> bool {
        matches!(
            self,
            Self::UnknownEvent | Self::InvalidAmount | Self::UserNotFound | Self::ReferrerNotFound
        )
    }
}

/// A tier payout that could not be persisted
#[derive(Debug)]
pub struct TierFailure {
    pub tier: RewardTier,
    pub beneficiary: UserKey,
    /// Set when the ledger row was appended but the beneficiary totals were not updated
    pub row_written: bool,
    pub error: EngineError,
}

/// Rows written by one request, and the tiers that failed
#[derive(Debug, Default)]
pub struct DistributionReport {
    pub rewards: Vec<ReferralReward>,
    pub failures: Vec<TierFailure>,
}

impl DistributionReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn total_paid(&self) -> f64 {
        self.rewards.iter().map(|reward| reward.amount).sum()
    }

    pub fn reward_for_tier(&self, tier: RewardTier) -> Option<&ReferralReward> {
        self.rewards.iter().find(|reward| reward.tier == tier)
    }
}

#[derive(Debug)]
pub enum RewardOutcome {
    /// Nothing was written
    Skipped(SkipReason),
    /// The event was already processed, nothing was written
    Duplicate(EventKey),
    Distributed(DistributionReport),
}

impl RewardOutcome {
    /// Ledger rows written by this call
    pub fn rewards(&self) -> &[ReferralReward] {
        match self {
            Self::Distributed(report) => &report.rewards,
            _ => &[],
        }
    }

    pub fn skip_reason(&self) -> Option<SkipReason> {
        match self {
            Self::Skipped(reason) => Some(*reason),
            _ => None,
        }
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate(_))
    }
}

// A payout computed before anything is written
struct PlannedPayout {
    tier: RewardTier,
    beneficiary: User,
    rate: f64,
    amount: f64,
}

pub struct RewardEngine<S: Storage> {
    storage: Arc<S>,
}

impl<S: Storage> Clone for RewardEngine<S> {
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
        }
    }
}

impl<S: Storage> RewardEngine<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }

    /// Distribute the referral rewards of a revenue event.
    ///
    /// Reads happen first: triggering user, referrer, grand referrer. The
    /// event identity is claimed only when at least one tier has something
    /// to pay, then each tier appends its ledger row and increments the
    /// beneficiary totals independently of the other tier.
    ///
    /// Errors are returned only when a read, the event claim or its release fails.
    /// Per-tier write failures are reported in the `DistributionReport`.
    /// When every tier fails, the event claim is released so the call can be retried.
    pub async fn process_referral_rewards(
        &self,
        config: &ReferralConfig,
        request: &RewardRequest,
    ) -> Result<RewardOutcome, EngineError> {
        if log::log_enabled!(log::Level::Trace) {
            trace!(
                "process referral rewards: event={}, user={}, amount={} {}",
                request.event,
                request.user_id,
                request.amount,
                request.currency
            );
        }

        let Ok(event) = RewardEvent::from_str(request.event.trim()) else {
            warn!(
                "Unknown reward event '{}' reported for user {}",
                request.event, request.user_id
            );
            return Ok(Self::skip(SkipReason::UnknownEvent));
        };

        if !config.is_event_enabled(event) {
            info!("Event {} is disabled, no referral rewards for {}", event, request.user_id);
            return Ok(Self::skip(SkipReason::EventDisabled));
        }

        if !request.amount.is_finite() || request.amount < 0.0 {
            warn!(
                "Invalid amount {} for event {} of user {}",
                request.amount, event, request.user_id
            );
            return Ok(Self::skip(SkipReason::InvalidAmount));
        }

        let user_key = normalize_user_key(&request.user_id);
        let Some(user) = self.storage.get_user(&user_key).await? else {
            warn!("Event {} reported for unknown user {}", event, user_key);
            return Ok(Self::skip(SkipReason::UserNotFound));
        };

        let Some(referrer_id) = user.referrer_id.as_deref() else {
            info!("User {} has no referrer, nothing to pay for {}", user_key, event);
            return Ok(Self::skip(SkipReason::NoReferrer));
        };

        let mut beneficiaries = Vec::with_capacity(2);
        let mut missing = 0;
        let tiers = [
            (RewardTier::Tier1, Some(referrer_id)),
            (RewardTier::Tier2, user.grand_referrer_id.as_deref()),
        ];
        for (tier, key) in tiers {
            let Some(key) = key else {
                continue;
            };

            match self.storage.get_user(key).await? {
                Some(beneficiary) => beneficiaries.push((tier, beneficiary)),
                None => {
                    warn!(
                        "Tier {} referrer {} of user {} does not exist, skipping tier for event {}",
                        tier, key, user_key, event
                    );
                    missing += 1;
                }
            }
        }

        if beneficiaries.is_empty() {
            debug!("{} referrer reference(s) of {} are dangling", missing, user_key);
            return Ok(Self::skip(SkipReason::ReferrerNotFound));
        }

        let payouts = Self::plan_payouts(config, request.amount, beneficiaries);
        if payouts.is_empty() {
            info!(
                "Zero payout for event {} of {} (amount {})",
                event, user_key, request.amount
            );
            return Ok(Self::skip(SkipReason::ZeroPayout));
        }

        let claimed = match request.tx_hash.as_deref().map(str::trim).filter(|tx| !tx.is_empty()) {
            Some(tx_hash) => {
                let key = EventKey::new(user_key.clone(), event, tx_hash.to_owned());
                if !self.storage.claim_event(&key).await? {
                    warn!("Duplicate event {}, rewards were already distributed", key);
                    counter!("vcn_referral_duplicate_events").increment(1u64);
                    return Ok(RewardOutcome::Duplicate(key));
                }
                Some(key)
            }
            None => {
                warn!(
                    "Event {} of {} has no tx hash, it cannot be checked for replays",
                    event, user_key
                );
                None
            }
        };

        let timestamp = get_current_time_in_seconds();
        let mut report = DistributionReport::default();
        for payout in payouts {
            self.pay(&user_key, event, request, timestamp, payout, &mut report)
                .await;
        }

        // No row made it to the ledger: a retry of the same event must be able to pay.
        // Once a row is written the claim stays, a retry would pay that tier twice.
        if report.rewards.is_empty() {
            if let Some(key) = &claimed {
                warn!("No reward written for event {}, releasing it for a retry", key);
                self.storage.release_event(key).await?;
            }
        }

        if report.is_complete() {
            debug!(
                "Distributed {} reward(s) for event {} of {}",
                report.rewards.len(),
                event,
                user_key
            );
        } else {
            warn!(
                "{} tier payout(s) failed for event {} of {}",
                report.failures.len(),
                event,
                user_key
            );
        }

        Ok(RewardOutcome::Distributed(report))
    }

    fn skip(reason: SkipReason) -> RewardOutcome {
        let reason_label: &'static str = reason.into();
        counter!("vcn_referral_rewards_skipped", "reason" => reason_label).increment(1u64);
        RewardOutcome::Skipped(reason)
    }

    fn plan_payouts(
        config: &ReferralConfig,
        amount: f64,
        beneficiaries: Vec<(RewardTier, User)>,
    ) -> Vec<PlannedPayout> {
        beneficiaries
            .into_iter()
            .filter_map(|(tier, beneficiary)| {
                let level = config.level_for_referrals(beneficiary.referral_count);
                let rate = config.effective_rate(tier, level);
                let payout = amount * rate;
                if !payout.is_finite() || payout <= 0.0 {
                    debug!(
                        "Tier {} payout to {} is zero (rate {}, level {})",
                        tier, beneficiary.id, rate, level
                    );
                    return None;
                }

                Some(PlannedPayout {
                    tier,
                    beneficiary,
                    rate,
                    amount: payout,
                })
            })
            .collect()
    }

    async fn pay(
        &self,
        from_user: &UserKey,
        event: RewardEvent,
        request: &RewardRequest,
        timestamp: TimestampSeconds,
        payout: PlannedPayout,
        report: &mut DistributionReport,
    ) {
        let tier = payout.tier;
        let reward = ReferralReward {
            user_id: payout.beneficiary.id,
            from_user_id: from_user.clone(),
            amount: payout.amount,
            currency: request.currency,
            tier,
            event,
            percentage: payout.rate,
            status: RewardStatus::Pending,
            timestamp,
            tx_hash: request.tx_hash.clone(),
        };

        if let Err(e) = self.storage.append_reward(&reward).await {
            warn!(
                "Error while appending tier {} reward for {}: {}",
                tier, reward.user_id, e
            );
            counter!("vcn_referral_reward_failures", "tier" => tier.to_string()).increment(1u64);
            report.failures.push(TierFailure {
                tier,
                beneficiary: reward.user_id,
                row_written: false,
                error: e,
            });
            return;
        }

        match self
            .storage
            .increment_rewards(&reward.user_id, reward.currency, reward.amount)
            .await
        {
            Ok(total) => {
                if log::log_enabled!(log::Level::Trace) {
                    trace!(
                        "{} now has {} {} of rewards",
                        reward.user_id,
                        total,
                        reward.currency
                    );
                }
                counter!("vcn_referral_rewards_paid", "tier" => tier.to_string()).increment(1u64);
            }
            Err(e) => {
                warn!(
                    "Error while updating reward totals of {} for tier {}: {}",
                    reward.user_id, tier, e
                );
                counter!("vcn_referral_reward_failures", "tier" => tier.to_string()).increment(1u64);
                report.failures.push(TierFailure {
                    tier,
                    beneficiary: reward.user_id.clone(),
                    row_written: true,
                    error: e,
                });
            }
        }

        report.rewards.push(reward);
    }
}
