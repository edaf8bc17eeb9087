mod providers;

use crate::core::{error::EngineError, storage::Storage};
use ::sled::{
    transaction::{ConflictableTransactionError, TransactionError},
    Config, Db, Tree,
};
use log::{debug, info};
use serde::{de::DeserializeOwned, Serialize};

// Trees
// {user_key} => {user}
const USERS: &[u8] = b"users";
// {referral_code} => {user_key}
const REFERRAL_CODES: &[u8] = b"referral_codes";
// {referrer_key}\0{user_key} => {}
const DIRECT_REFERRALS: &[u8] = b"direct_referrals";
// {u32::MAX - referral_count}{user_key} => {}
const REFERRAL_RANKING: &[u8] = b"referral_ranking";
// {reward_id} => {reward}
const REWARDS: &[u8] = b"rewards";
// {user_key}\0{reward_id} => {}
const REWARDS_BY_USER: &[u8] = b"rewards_by_user";
// {from_user_key}\0{event}\0{tx_hash} => {claimed_at}
const REWARD_EVENTS: &[u8] = b"reward_events";
// Referral program settings
const SETTINGS: &[u8] = b"settings";

// Keys
const REFERRAL_CONFIG: &[u8] = b"referral_config";

// Value stored for index entries
const EMPTY: &[u8] = &[];

const KEY_SEPARATOR: u8 = 0;

pub struct SledStorage {
    db: Db,
    users: Tree,
    referral_codes: Tree,
    direct_referrals: Tree,
    referral_ranking: Tree,
    rewards: Tree,
    rewards_by_user: Tree,
    reward_events: Tree,
    settings: Tree,
}

impl SledStorage {
    /// Open (or create) a database in `dir`
    pub fn new(dir: &str) -> Result<Self, EngineError> {
        info!("Opening referral database at {}", dir);
        let db = ::sled::open(dir)?;
        Self::from_db(db)
    }

    /// Database removed from disk once dropped
    pub fn temporary() -> Result<Self, EngineError> {
        let db = Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> Result<Self, EngineError> {
        let storage = Self {
            users: db.open_tree(USERS)?,
            referral_codes: db.open_tree(REFERRAL_CODES)?,
            direct_referrals: db.open_tree(DIRECT_REFERRALS)?,
            referral_ranking: db.open_tree(REFERRAL_RANKING)?,
            rewards: db.open_tree(REWARDS)?,
            rewards_by_user: db.open_tree(REWARDS_BY_USER)?,
            reward_events: db.open_tree(REWARD_EVENTS)?,
            settings: db.open_tree(SETTINGS)?,
            db,
        };
        debug!(
            "referral database ready: {} users, {} rewards",
            storage.users.len(),
            storage.rewards.len()
        );
        Ok(storage)
    }

    /// Flush all pending writes to disk
    pub async fn flush(&self) -> Result<(), EngineError> {
        self.db.flush_async().await?;
        Ok(())
    }

    fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, EngineError> {
        Ok(serde_json::to_vec(value)?)
    }

    fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, EngineError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    fn load_optional<T: DeserializeOwned>(tree: &Tree, key: &[u8]) -> Result<Option<T>, EngineError> {
        match tree.get(key)? {
            Some(bytes) => Ok(Some(Self::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    // {key}\0
    fn prefix_key(key: &str) -> Vec<u8> {
        let mut prefix = Vec::with_capacity(key.len() + 1);
        prefix.extend_from_slice(key.as_bytes());
        prefix.push(KEY_SEPARATOR);
        prefix
    }

    // {referrer}\0{user}
    fn direct_referral_key(referrer: &str, user: &str) -> Vec<u8> {
        let mut key = Self::prefix_key(referrer);
        key.extend_from_slice(user.as_bytes());
        key
    }

    // Big endian inverted count so that an ascending scan yields the
    // highest counts first, then user keys in ascending order
    fn ranking_key(referral_count: u32, user: &str) -> Vec<u8> {
        let mut key = Vec::with_capacity(4 + user.len());
        key.extend_from_slice(&(u32::MAX - referral_count).to_be_bytes());
        key.extend_from_slice(user.as_bytes());
        key
    }

    // {user}\0{reward_id}
    fn user_reward_key(user: &str, id: u64) -> Vec<u8> {
        let mut key = Self::prefix_key(user);
        key.extend_from_slice(&id.to_be_bytes());
        key
    }

    fn abort(err: EngineError) -> ConflictableTransactionError<EngineError> {
        ConflictableTransactionError::Abort(err)
    }

    fn map_transaction_error(err: TransactionError<EngineError>) -> EngineError {
        match err {
            TransactionError::Abort(err) => err,
            TransactionError::Storage(err) => err.into(),
        }
    }
}

impl Storage for SledStorage {}
