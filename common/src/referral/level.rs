// Level / rank calculator
//
// Reaching level L requires the sum, over levels 1..L-1, of the invites per
// level of the threshold range each of those levels falls in. The level of a
// user is the highest level whose requirement is covered by its referral count.

use super::{Rank, ReferralConfig, RewardTier};
use crate::config::{MAX_LEVEL, MIN_LEVEL};
use serde::{Deserialize, Serialize};

/// Level, rank and multiplier derived from a referral count
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LevelInfo {
    pub level: u32,

    /// None only when the rank table has no floor rank
    pub rank: Option<Rank>,

    /// Reward multiplier at this level
    pub multiplier: f64,

    /// Cumulative referrals required to reach this level
    pub cumulative_invites: u64,

    /// Referrals still missing to reach the next level (None at max level)
    pub invites_to_next: Option<u64>,
}

impl ReferralConfig {
    /// Invites required to go from `level` to `level + 1`.
    /// Levels past the last configured range use the last range.
    pub fn invites_for_level(&self, level: u32) -> u32 {
        self.level_thresholds
            .iter()
            .find(|threshold| threshold.contains(level))
            .or_else(|| {
                self.level_thresholds
                    .iter()
                    .rev()
                    .find(|threshold| threshold.min_level <= level)
            })
            .or_else(|| self.level_thresholds.first())
            .map(|threshold| threshold.invites_per_level)
            .unwrap_or(0)
    }

    /// Cumulative referrals required to have reached `level`
    pub fn cumulative_invites(&self, level: u32) -> u64 {
        let level = level.min(MAX_LEVEL);
        (MIN_LEVEL..level)
            .map(|l| self.invites_for_level(l) as u64)
            .sum()
    }

    /// Level reached with `referral_count` successful referrals, capped at 100
    pub fn level_for_referrals(&self, referral_count: u32) -> u32 {
        let count = referral_count as u64;
        let mut level = MIN_LEVEL;
        let mut cumulative = 0u64;

        while level < MAX_LEVEL {
            cumulative += self.invites_for_level(level) as u64;
            if cumulative > count {
                break;
            }
            level += 1;
        }

        level
    }

    /// Linear reward multiplier: base + (level - 1) * per_level
    pub fn multiplier(&self, level: u32) -> f64 {
        let steps = level.clamp(MIN_LEVEL, MAX_LEVEL) - MIN_LEVEL;
        self.base_xp_multiplier + steps as f64 * self.xp_multiplier_per_level
    }

    /// Tier rate scaled by the multiplier of the beneficiary level
    pub fn effective_rate(&self, tier: RewardTier, level: u32) -> f64 {
        self.tier_rate(tier) * self.multiplier(level)
    }

    /// Most senior rank unlocked at `level`.
    /// On equal min levels the first entry of the table wins.
    pub fn rank_for_level(&self, level: u32) -> Option<&Rank> {
        let mut best: Option<&Rank> = None;
        for rank in self.ranks.iter().filter(|rank| rank.min_lvl <= level) {
            match best {
                Some(current) if current.min_lvl >= rank.min_lvl => {}
                _ => best = Some(rank),
            }
        }
        best
    }

    /// Full level projection for a referral count
    pub fn level_info(&self, referral_count: u32) -> LevelInfo {
        let level = self.level_for_referrals(referral_count);
        let cumulative_invites = self.cumulative_invites(level);
        let invites_to_next = if level < MAX_LEVEL {
            let next = self.cumulative_invites(level + 1);
            Some(next.saturating_sub(referral_count as u64))
        } else {
            None
        };

        LevelInfo {
            level,
            rank: self.rank_for_level(level).cloned(),
            multiplier: self.multiplier(level),
            cumulative_invites,
            invites_to_next,
        }
    }
}
