// Leaderboard: users ordered by referral count, highest first.
// Equal counts are ordered by user key so pages are stable.

use std::sync::Arc;

use log::trace;
use serde::{Deserialize, Serialize};
use vcn_referral_common::referral::{ReferralConfig, UserKey};

use crate::config::EngineConfig;

use super::{error::EngineError, storage::Storage};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    /// 1-based position in the full ranking
    pub position: u32,
    pub user_id: UserKey,
    pub referral_code: String,
    pub referral_count: u32,
    pub level: u32,
    pub rank: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardPage {
    pub entries: Vec<LeaderboardEntry>,
    pub total_count: u32,
    pub offset: u32,
    pub has_more: bool,
}

pub struct Leaderboard<S: Storage> {
    storage: Arc<S>,
    max_page_size: u32,
}

impl<S: Storage> Leaderboard<S> {
    pub fn new(storage: Arc<S>, config: &EngineConfig) -> Self {
        Self {
            storage,
            max_page_size: config.max_leaderboard_page_size(),
        }
    }

    /// One page of the ranking, `limit` is clamped to the maximum page size
    pub async fn top_referrers(
        &self,
        config: &ReferralConfig,
        offset: u32,
        limit: u32,
    ) -> Result<LeaderboardPage, EngineError> {
        let limit = limit.min(self.max_page_size);
        if log::log_enabled!(log::Level::Trace) {
            trace!("top referrers (offset: {}, limit: {})", offset, limit);
        }

        if limit == 0 {
            let total_count = self.storage.count_users().await?;
            return Ok(LeaderboardPage {
                entries: Vec::new(),
                total_count,
                offset,
                has_more: offset < total_count,
            });
        }

        let page = self.storage.get_users_by_referral_count(offset, limit).await?;
        let entries = page
            .items
            .into_iter()
            .enumerate()
            .map(|(i, user)| {
                let level = config.level_for_referrals(user.referral_count);
                LeaderboardEntry {
                    position: offset.saturating_add(i as u32 + 1),
                    rank: config.rank_for_level(level).map(|rank| rank.name.clone()),
                    user_id: user.id,
                    referral_code: user.referral_code,
                    referral_count: user.referral_count,
                    level,
                }
            })
            .collect();

        Ok(LeaderboardPage {
            entries,
            total_count: page.total_count,
            offset: page.offset,
            has_more: page.has_more,
        })
    }
}
