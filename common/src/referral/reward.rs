// Reward ledger entries

use super::UserKey;
use crate::time::TimestampSeconds;
use serde::{Deserialize, Serialize};
use std::fmt;
use strum::{Display, EnumIter, EnumString};

/// Currency a reward is paid in
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
pub enum Currency {
    #[serde(rename = "USD")]
    #[strum(serialize = "USD")]
    Usd,
    #[serde(rename = "VCN")]
    #[strum(serialize = "VCN")]
    Vcn,
}

/// Revenue producing events that may trigger referral rewards
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RewardEvent {
    // Subscription completed or renewed
    Subscription,
    // Token sale settled
    TokenSale,
    // Staking action
    Stake,
}

/// Settlement status of a reward.
/// Only `Pending` is ever written here, settlement happens outside the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RewardStatus {
    Pending,
    Settled,
}

/// Depth of the beneficiary relative to the user who triggered the event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum RewardTier {
    /// Direct referrer
    Tier1,
    /// Referrer of the direct referrer
    Tier2,
}

impl RewardTier {
    pub fn as_u8(self) -> u8 {
        match self {
            Self::Tier1 => 1,
            Self::Tier2 => 2,
        }
    }
}

impl From<RewardTier> for u8 {
    fn from(tier: RewardTier) -> Self {
        tier.as_u8()
    }
}

impl TryFrom<u8> for RewardTier {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Tier1),
            2 => Ok(Self::Tier2),
            _ => Err(format!("Invalid reward tier {}", value)),
        }
    }
}

impl fmt::Display for RewardTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

/// One payout to one beneficiary for one revenue event.
/// Immutable once appended to the ledger.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReferralReward {
    /// Beneficiary
    pub user_id: UserKey,

    /// Referred user whose event triggered the payout
    pub from_user_id: UserKey,

    /// Amount paid
    pub amount: f64,

    /// Currency of the amount
    pub currency: Currency,

    /// 1 = direct referrer, 2 = grand referrer
    pub tier: RewardTier,

    /// Event that triggered the payout
    pub event: RewardEvent,

    /// Effective rate applied (tier rate scaled by the level multiplier),
    /// kept for audit even if the config changes later
    pub percentage: f64,

    /// Settlement status
    pub status: RewardStatus,

    /// Unix timestamp in seconds
    pub timestamp: TimestampSeconds,

    /// Hash of the on-chain transfer backing the event, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
}

/// Identity of a revenue event, used to reject replays.
/// Two calls with the same key must produce a single set of ledger rows.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventKey {
    pub from_user_id: UserKey,
    pub event: RewardEvent,
    pub tx_hash: String,
}

impl EventKey {
    pub fn new(from_user_id: UserKey, event: RewardEvent, tx_hash: String) -> Self {
        Self {
            from_user_id,
            event,
            tx_hash,
        }
    }

    /// Bytes used as storage key: {from_user_id}\0{event}\0{tx_hash}
    pub fn to_storage_key(&self) -> Vec<u8> {
        let event = self.event.to_string();
        let mut key =
            Vec::with_capacity(self.from_user_id.len() + event.len() + self.tx_hash.len() + 2);
        key.extend_from_slice(self.from_user_id.as_bytes());
        key.push(0);
        key.extend_from_slice(event.as_bytes());
        key.push(0);
        key.extend_from_slice(self.tx_hash.as_bytes());
        key
    }
}

impl fmt::Display for EventKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.from_user_id, self.event, self.tx_hash)
    }
}
