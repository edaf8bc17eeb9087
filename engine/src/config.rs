//! Configuration for the referral engine.

use serde::{Deserialize, Serialize};
use vcn_referral_common::config::{
    DEFAULT_LEADERBOARD_PAGE_SIZE, DEFAULT_REFERRAL_CODE_ATTEMPTS, MAX_ENTRIES_PER_PAGE,
};

/// Default directory for the sled database.
pub const DEFAULT_DB_DIR: &str = "referral-db";

/// Default leaderboard page size.
const fn default_leaderboard_page_size() -> u32 {
    DEFAULT_LEADERBOARD_PAGE_SIZE
}

/// Default referral code attempts.
const fn default_referral_code_attempts() -> u32 {
    DEFAULT_REFERRAL_CODE_ATTEMPTS
}

fn default_db_dir() -> String {
    DEFAULT_DB_DIR.to_owned()
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, clap::ValueEnum, Serialize, Deserialize)]
#[clap(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    /// Everything is lost on restart, used by tests and previews
    Memory,
    /// Persistent sled database
    Sled,
}

impl Default for StorageBackend {
    fn default() -> Self {
        Self::Sled
    }
}

/// Configuration for the referral engine.
#[derive(Debug, Clone, clap::Args, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Storage backend for users, ledger and settings.
    #[clap(name = "storage-backend", long, value_enum, default_value_t = StorageBackend::default())]
    #[serde(default)]
    pub storage_backend: StorageBackend,

    /// Directory of the sled database.
    ///
    /// Ignored by the memory backend.
    #[clap(name = "db-dir", long, default_value_t = default_db_dir())]
    #[serde(default = "default_db_dir")]
    pub db_dir: String,

    /// Maximum number of users returned per leaderboard page.
    ///
    /// Larger requests are clamped to this value.
    #[clap(name = "leaderboard-page-size", long, default_value_t = default_leaderboard_page_size())]
    #[serde(default = "default_leaderboard_page_size")]
    pub leaderboard_page_size: u32,

    /// How many referral codes are drawn before giving up on a registration.
    #[clap(name = "referral-code-attempts", long, default_value_t = default_referral_code_attempts())]
    #[serde(default = "default_referral_code_attempts")]
    pub referral_code_attempts: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            storage_backend: StorageBackend::default(),
            db_dir: default_db_dir(),
            leaderboard_page_size: DEFAULT_LEADERBOARD_PAGE_SIZE,
            referral_code_attempts: DEFAULT_REFERRAL_CODE_ATTEMPTS,
        }
    }
}

impl EngineConfig {
    /// Leaderboard page size, never above the listing hard limit
    pub fn max_leaderboard_page_size(&self) -> u32 {
        self.leaderboard_page_size.min(MAX_ENTRIES_PER_PAGE)
    }
}
