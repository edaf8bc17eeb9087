// User directory records

use super::Currency;
use crate::time::TimestampSeconds;
use serde::{Deserialize, Serialize};

/// Users are keyed by their lower-cased email address
pub type UserKey = String;

/// Normalize an email address into a directory key.
/// Lookups must always go through this, the directory is case-insensitive.
pub fn normalize_user_key(email: &str) -> UserKey {
    email.trim().to_lowercase()
}

/// A user of the referral program
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Normalized email address
    pub id: UserKey,

    /// Tier-1 parent (None = signed up without a referral code)
    pub referrer_id: Option<UserKey>,

    /// Tier-2 parent, snapshotted from the referrer at signup.
    /// Never re-derived when the chain changes afterwards.
    pub grand_referrer_id: Option<UserKey>,

    /// Unique 6 character code other users sign up with
    pub referral_code: String,

    /// Number of users whose referrer is this user
    pub referral_count: u32,

    /// Cumulative USD rewards
    #[serde(rename = "totalRewardsUSD")]
    pub total_rewards_usd: f64,

    /// Cumulative VCN rewards
    #[serde(rename = "totalRewardsVCN")]
    pub total_rewards_vcn: f64,

    /// Unix timestamp in seconds of the registration
    pub created_at: TimestampSeconds,
}

impl User {
    /// Create a new user record.
    /// The grand referrer is taken from the referrer's own referrer.
    pub fn new(
        id: UserKey,
        referral_code: String,
        referrer: Option<&User>,
        created_at: TimestampSeconds,
    ) -> Self {
        Self {
            id,
            referrer_id: referrer.map(|r| r.id.clone()),
            grand_referrer_id: referrer.and_then(|r| r.referrer_id.clone()),
            referral_code,
            referral_count: 0,
            total_rewards_usd: 0.0,
            total_rewards_vcn: 0.0,
            created_at,
        }
    }

    /// Check if this user has a referrer
    pub fn has_referrer(&self) -> bool {
        self.referrer_id.is_some()
    }

    /// Cumulative rewards for a currency
    pub fn total_rewards(&self, currency: Currency) -> f64 {
        match currency {
            Currency::Usd => self.total_rewards_usd,
            Currency::Vcn => self.total_rewards_vcn,
        }
    }

    /// Add to the cumulative rewards of a currency
    pub fn add_rewards(&mut self, currency: Currency, delta: f64) {
        match currency {
            Currency::Usd => self.total_rewards_usd += delta,
            Currency::Vcn => self.total_rewards_vcn += delta,
        }
    }

    /// Increment direct referrals count
    pub fn increment_referral_count(&mut self) {
        self.referral_count = self.referral_count.saturating_add(1);
    }
}

/// One page of a paginated listing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    /// Entries of this page
    pub items: Vec<T>,

    /// Total count of entries across all pages
    pub total_count: u32,

    /// Current offset
    pub offset: u32,

    /// Whether there are more results
    pub has_more: bool,
}

impl<T> Page<T> {
    /// Create a new page
    pub fn new(items: Vec<T>, total_count: u32, offset: u32) -> Self {
        let items_len = items.len() as u32;
        let has_more = offset.saturating_add(items_len) < total_count;
        Self {
            items,
            total_count,
            offset,
            has_more,
        }
    }

    /// An empty page, used when the offset is past the end
    pub fn empty(total_count: u32, offset: u32) -> Self {
        Self::new(Vec::new(), total_count, offset)
    }

    /// Check if the page holds no entries
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
