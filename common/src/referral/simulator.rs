// Reward curve simulator
//
// Projects every level of a (possibly unsaved) configuration so the admin
// screen can preview invite thresholds and payout percentages. It goes through
// the same level/multiplier functions as the reward engine.

use super::{ReferralConfig, RewardTier};
use crate::config::{MAX_LEVEL, MIN_LEVEL};
use serde::{Deserialize, Serialize};

/// Projection of a single level
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SimulationRow {
    pub level: u32,

    /// Rank name at this level
    pub rank: Option<String>,

    /// Invites needed to go from this level to the next one (0 at max level)
    pub invites_to_next: u32,

    /// Invites needed to reach this level from zero
    pub cumulative: u64,

    pub multiplier: f64,

    /// Effective tier-1 rate, as a fraction
    pub tier1_rate: f64,

    /// Effective tier-2 rate, as a fraction
    pub tier2_rate: f64,

    /// Effective tier-1 rate formatted for display, e.g. "10.00%"
    pub tier1_percent: String,

    /// Effective tier-2 rate formatted for display
    pub tier2_percent: String,
}

/// First level at which a rank is unlocked
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RankMilestone {
    pub name: String,
    pub min_lvl: u32,
    pub cumulative: u64,
}

/// Projection of the full level range
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SimulationReport {
    pub rows: Vec<SimulationRow>,
    pub rank_milestones: Vec<RankMilestone>,
}

impl SimulationReport {
    /// Row of a given level
    pub fn row(&self, level: u32) -> Option<&SimulationRow> {
        level
            .checked_sub(MIN_LEVEL)
            .and_then(|index| self.rows.get(index as usize))
    }

    /// Invites needed to reach the max level
    pub fn total_invites_to_max(&self) -> u64 {
        self.rows.last().map(|row| row.cumulative).unwrap_or(0)
    }
}

/// Format a fraction as a percentage string with two decimals
pub fn format_percent(rate: f64) -> String {
    format!("{:.2}%", rate * 100.0)
}

/// Simulate levels 1..=100 for a configuration
pub fn simulate(config: &ReferralConfig) -> SimulationReport {
    let mut rows = Vec::with_capacity(MAX_LEVEL as usize);
    let mut cumulative = 0u64;

    for level in MIN_LEVEL..=MAX_LEVEL {
        let invites_to_next = if level < MAX_LEVEL {
            config.invites_for_level(level)
        } else {
            0
        };
        let tier1_rate = config.effective_rate(RewardTier::Tier1, level);
        let tier2_rate = config.effective_rate(RewardTier::Tier2, level);

        rows.push(SimulationRow {
            level,
            rank: config.rank_for_level(level).map(|rank| rank.name.clone()),
            invites_to_next,
            cumulative,
            multiplier: config.multiplier(level),
            tier1_rate,
            tier2_rate,
            tier1_percent: format_percent(tier1_rate),
            tier2_percent: format_percent(tier2_rate),
        });

        cumulative += invites_to_next as u64;
    }

    let mut rank_milestones: Vec<RankMilestone> = config
        .ranks
        .iter()
        .filter(|rank| rank.min_lvl <= MAX_LEVEL)
        .map(|rank| {
            let min_lvl = rank.min_lvl.max(MIN_LEVEL);
            RankMilestone {
                name: rank.name.clone(),
                min_lvl,
                cumulative: config.cumulative_invites(min_lvl),
            }
        })
        .collect();
    rank_milestones.sort_by_key(|milestone| milestone.min_lvl);

    SimulationReport {
        rows,
        rank_milestones,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::referral::{LevelThreshold, Rank};
    use proptest::prelude::*;

    #[test]
    fn test_simulation_covers_all_levels() {
        let report = simulate(&ReferralConfig::default());
        assert_eq!(report.rows.len(), 100);
        assert_eq!(report.rows[0].level, 1);
        assert_eq!(report.rows[0].cumulative, 0);
        assert_eq!(report.rows[99].level, 100);
        assert_eq!(report.rows[99].invites_to_next, 0);
    }

    #[test]
    fn test_simulation_matches_level_calculator() {
        let config = ReferralConfig::default();
        let report = simulate(&config);
        for row in &report.rows {
            assert_eq!(row.cumulative, config.cumulative_invites(row.level));
            assert_eq!(
                config.level_for_referrals(row.cumulative as u32),
                row.level,
                "reaching the cumulative count of level {} must land on it",
                row.level
            );
        }
    }

    #[test]
    fn test_percent_strings() {
        let mut config = ReferralConfig::default();
        config.tier1_rate = 0.10;
        config.tier2_rate = 0.05;
        config.base_xp_multiplier = 1.0;
        config.xp_multiplier_per_level = 0.01;
        let report = simulate(&config);
        let first = report.row(1).unwrap();
        assert_eq!(first.tier1_percent, "10.00%");
        assert_eq!(first.tier2_percent, "5.00%");
        let eleventh = report.row(11).unwrap();
        assert_eq!(eleventh.tier1_percent, "11.00%");
        assert_eq!(eleventh.tier2_percent, "5.50%");
        assert!(report.row(0).is_none());
        assert!(report.row(101).is_none());
    }

    #[test]
    fn test_rank_milestones() {
        let mut config = ReferralConfig::default();
        config.level_thresholds = vec![LevelThreshold::new(1, 100, 2)];
        config.ranks = vec![
            Rank::new("Gold", 30, "#ffd700"),
            Rank::new("Bronze", 1, "#cd7f32"),
            Rank::new("Mythic", 150, "#000000"),
        ];
        let report = simulate(&config);
        assert_eq!(report.rank_milestones.len(), 2);
        assert_eq!(report.rank_milestones[0].name, "Bronze");
        assert_eq!(report.rank_milestones[0].cumulative, 0);
        assert_eq!(report.rank_milestones[1].name, "Gold");
        assert_eq!(report.rank_milestones[1].cumulative, 58);
        assert_eq!(report.total_invites_to_max(), 198);
    }

    proptest! {
        #[test]
        fn test_cumulative_chain(
            first in 0u32..20u32,
            second in 0u32..20u32,
            split in 2u32..100u32,
        ) {
            let mut config = ReferralConfig::default();
            config.level_thresholds = vec![
                LevelThreshold::new(1, split - 1, first),
                LevelThreshold::new(split, 100, second),
            ];
            let report = simulate(&config);
            for level in 1..100u32 {
                let current = report.row(level).unwrap();
                let next = report.row(level + 1).unwrap();
                prop_assert_eq!(next.cumulative, current.cumulative + current.invites_to_next as u64);
            }
        }
    }
}
