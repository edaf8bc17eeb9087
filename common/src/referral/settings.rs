// Referral program settings, edited through the admin settings screen

use super::{ReferralError, ReferralResult, RewardEvent, RewardTier};
use crate::config::{
    DEFAULT_BASE_XP_MULTIPLIER, DEFAULT_TIER1_RATE, DEFAULT_TIER2_RATE,
    DEFAULT_XP_MULTIPLIER_PER_LEVEL, MIN_LEVEL,
};
use indexmap::IndexSet;
use log::warn;
use serde::{Deserialize, Deserializer, Serialize};
use std::str::FromStr;

/// Number of invites needed per level for a contiguous range of levels
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LevelThreshold {
    pub min_level: u32,
    pub max_level: u32,
    pub invites_per_level: u32,
}

impl LevelThreshold {
    pub fn new(min_level: u32, max_level: u32, invites_per_level: u32) -> Self {
        Self {
            min_level,
            max_level,
            invites_per_level,
        }
    }

    pub fn contains(&self, level: u32) -> bool {
        self.min_level <= level && level <= self.max_level
    }
}

/// Named badge unlocked from a minimum level
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Rank {
    pub name: String,

    #[serde(rename = "minLvl")]
    pub min_lvl: u32,

    /// CSS color used by the dashboard
    pub color: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl Rank {
    pub fn new(name: impl Into<String>, min_lvl: u32, color: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            min_lvl,
            color: color.into(),
            icon: None,
        }
    }
}

/// Global referral configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReferralConfig {
    /// Fraction of the event amount paid to the direct referrer
    pub tier1_rate: f64,

    /// Fraction of the event amount paid to the grand referrer
    pub tier2_rate: f64,

    /// Events eligible for rewards, anything else is skipped.
    /// Unknown names in a stored document are dropped on load.
    #[serde(deserialize_with = "deserialize_enabled_events")]
    pub enabled_events: IndexSet<RewardEvent>,

    /// Multiplier at level 1
    pub base_xp_multiplier: f64,

    /// Multiplier added for each level above 1
    pub xp_multiplier_per_level: f64,

    /// Ordered, contiguous level ranges
    pub level_thresholds: Vec<LevelThreshold>,

    /// Rank table, must include a floor rank at level 1
    pub ranks: Vec<Rank>,
}

impl Default for ReferralConfig {
    fn default() -> Self {
        Self {
            tier1_rate: DEFAULT_TIER1_RATE,
            tier2_rate: DEFAULT_TIER2_RATE,
            enabled_events: [
                RewardEvent::Subscription,
                RewardEvent::TokenSale,
                RewardEvent::Stake,
            ]
            .into_iter()
            .collect(),
            base_xp_multiplier: DEFAULT_BASE_XP_MULTIPLIER,
            xp_multiplier_per_level: DEFAULT_XP_MULTIPLIER_PER_LEVEL,
            level_thresholds: vec![
                LevelThreshold::new(1, 10, 1),
                LevelThreshold::new(11, 30, 2),
                LevelThreshold::new(31, 60, 3),
                LevelThreshold::new(61, 100, 5),
            ],
            ranks: vec![
                Rank::new("Bronze", 1, "#cd7f32"),
                Rank::new("Silver", 10, "#c0c0c0"),
                Rank::new("Gold", 30, "#ffd700"),
                Rank::new("Platinum", 50, "#e5e4e2"),
                Rank::new("Diamond", 75, "#b9f2ff"),
                Rank::new("Legend", 100, "#ff4500"),
            ],
        }
    }
}

impl ReferralConfig {
    /// Check if an event is eligible for rewards
    pub fn is_event_enabled(&self, event: RewardEvent) -> bool {
        self.enabled_events.contains(&event)
    }

    /// Base rate of a tier, before the level multiplier
    pub fn tier_rate(&self, tier: RewardTier) -> f64 {
        match tier {
            RewardTier::Tier1 => self.tier1_rate,
            RewardTier::Tier2 => self.tier2_rate,
        }
    }

    /// Validate the configuration before it is saved or simulated
    pub fn validate(&self) -> ReferralResult<()> {
        validate_rate("tier1Rate", self.tier1_rate)?;
        validate_rate("tier2Rate", self.tier2_rate)?;
        validate_multiplier("baseXpMultiplier", self.base_xp_multiplier)?;
        validate_multiplier("xpMultiplierPerLevel", self.xp_multiplier_per_level)?;

        if self.level_thresholds.is_empty() {
            return Err(ReferralError::NoLevelThresholds);
        }

        let mut expected_min = MIN_LEVEL;
        for (index, threshold) in self.level_thresholds.iter().enumerate() {
            if threshold.min_level > threshold.max_level {
                return Err(ReferralError::InvalidLevelThreshold {
                    index,
                    reason: format!(
                        "min level {} is above max level {}",
                        threshold.min_level, threshold.max_level
                    ),
                });
            }

            if threshold.min_level != expected_min {
                return Err(ReferralError::InvalidLevelThreshold {
                    index,
                    reason: format!(
                        "expected range to start at level {}, got {}",
                        expected_min, threshold.min_level
                    ),
                });
            }

            if threshold.invites_per_level == 0 {
                return Err(ReferralError::InvalidLevelThreshold {
                    index,
                    reason: "invites per level must be at least 1".to_owned(),
                });
            }

            expected_min = threshold.max_level.saturating_add(1);
        }

        if self.ranks.is_empty() {
            return Err(ReferralError::NoRanks);
        }

        if !self.ranks.iter().any(|rank| rank.min_lvl <= MIN_LEVEL) {
            return Err(ReferralError::MissingFloorRank);
        }

        Ok(())
    }
}

// Event names written by other services may not be known here,
// they must not make the whole document unreadable
fn deserialize_enabled_events<'de, D>(deserializer: D) -> Result<IndexSet<RewardEvent>, D::Error>
where
    D: Deserializer<'de>,
{
    let names = Vec::<String>::deserialize(deserializer)?;
    Ok(names
        .into_iter()
        .filter_map(|name| match RewardEvent::from_str(name.trim()) {
            Ok(event) => Some(event),
            Err(_) => {
                warn!("Ignoring unknown reward event '{}' in referral settings", name);
                None
            }
        })
        .collect())
}

fn validate_rate(name: &'static str, value: f64) -> ReferralResult<()> {
    if !value.is_finite() || !(0.0..=1.0).contains(&value) {
        return Err(ReferralError::InvalidRate { name, value });
    }
    Ok(())
}

fn validate_multiplier(name: &'static str, value: f64) -> ReferralResult<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(ReferralError::InvalidMultiplier { name, value });
    }
    Ok(())
}
