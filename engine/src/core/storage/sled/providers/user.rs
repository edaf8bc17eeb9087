// UserProvider implementation for sled storage
//
// Every mutation of a user record runs inside a sled transaction so that
// concurrent increments on the same user are serialized instead of
// overwriting each other.

use crate::core::{
    error::EngineError,
    storage::{sled::EMPTY, SledStorage, UserProvider},
};
use ::sled::{transaction::abort, Transactional};
use async_trait::async_trait;
use log::trace;
use vcn_referral_common::referral::{Currency, Page, ReferralError, User, UserKey};

#[async_trait]
impl UserProvider for SledStorage {
    async fn get_user(&self, key: &str) -> Result<Option<User>, EngineError> {
        if log::log_enabled!(log::Level::Trace) {
            trace!("getting user {}", key);
        }
        Self::load_optional(&self.users, key.as_bytes())
    }

    async fn has_user(&self, key: &str) -> Result<bool, EngineError> {
        Ok(self.users.contains_key(key.as_bytes())?)
    }

    async fn insert_user(&self, user: &User) -> Result<(), EngineError> {
        if log::log_enabled!(log::Level::Trace) {
            trace!("inserting user {} with code {}", user.id, user.referral_code);
        }

        let value = Self::encode(user)?;
        let direct_key = user
            .referrer_id
            .as_ref()
            .map(|referrer| Self::direct_referral_key(referrer, &user.id));
        let ranking_key = Self::ranking_key(user.referral_count, &user.id);

        (
            &self.users,
            &self.referral_codes,
            &self.direct_referrals,
            &self.referral_ranking,
        )
            .transaction(|(users, codes, directs, ranking)| {
                if users.get(user.id.as_bytes())?.is_some() {
                    return abort(EngineError::from(ReferralError::AlreadyRegistered(
                        user.id.clone(),
                    )));
                }
                if codes.get(user.referral_code.as_bytes())?.is_some() {
                    return abort(EngineError::from(ReferralError::ReferralCodeTaken(
                        user.referral_code.clone(),
                    )));
                }

                if let Some(referrer_id) = &user.referrer_id {
                    let mut referrer: User = match users.get(referrer_id.as_bytes())? {
                        Some(bytes) => Self::decode(&bytes).map_err(Self::abort)?,
                        None => return abort(EngineError::UserNotFound(referrer_id.clone())),
                    };

                    ranking.remove(Self::ranking_key(referrer.referral_count, &referrer.id))?;
                    referrer.increment_referral_count();
                    ranking.insert(Self::ranking_key(referrer.referral_count, &referrer.id), EMPTY)?;

                    let referrer_value = Self::encode(&referrer).map_err(Self::abort)?;
                    users.insert(referrer_id.as_bytes(), referrer_value)?;
                }

                users.insert(user.id.as_bytes(), value.as_slice())?;
                codes.insert(user.referral_code.as_bytes(), user.id.as_bytes())?;
                if let Some(direct_key) = &direct_key {
                    directs.insert(direct_key.as_slice(), EMPTY)?;
                }
                ranking.insert(ranking_key.as_slice(), EMPTY)?;
                Ok(())
            })
            .map_err(Self::map_transaction_error)
    }

    async fn get_user_by_referral_code(&self, code: &str) -> Result<Option<User>, EngineError> {
        match self.referral_codes.get(code.as_bytes())? {
            Some(key) => Self::load_optional(&self.users, &key),
            None => Ok(None),
        }
    }

    async fn has_referral_code(&self, code: &str) -> Result<bool, EngineError> {
        Ok(self.referral_codes.contains_key(code.as_bytes())?)
    }

    async fn increment_referral_count(&self, key: &str) -> Result<u32, EngineError> {
        if log::log_enabled!(log::Level::Trace) {
            trace!("incrementing referral count of {}", key);
        }

        (&self.users, &self.referral_ranking)
            .transaction(|(users, ranking)| {
                let mut user: User = match users.get(key.as_bytes())? {
                    Some(bytes) => Self::decode(&bytes).map_err(Self::abort)?,
                    None => return abort(EngineError::UserNotFound(key.to_owned())),
                };

                ranking.remove(Self::ranking_key(user.referral_count, &user.id))?;
                user.increment_referral_count();
                ranking.insert(Self::ranking_key(user.referral_count, &user.id), EMPTY)?;

                let value = Self::encode(&user).map_err(Self::abort)?;
                users.insert(key.as_bytes(), value)?;
                Ok(user.referral_count)
            })
            .map_err(Self::map_transaction_error)
    }

    async fn increment_rewards(
        &self,
        key: &str,
        currency: Currency,
        delta: f64,
    ) -> Result<f64, EngineError> {
        if log::log_enabled!(log::Level::Trace) {
            trace!("adding {} {} to rewards of {}", delta, currency, key);
        }

        self.users
            .transaction(|users| {
                let mut user: User = match users.get(key.as_bytes())? {
                    Some(bytes) => Self::decode(&bytes).map_err(Self::abort)?,
                    None => return abort(EngineError::UserNotFound(key.to_owned())),
                };

                user.add_rewards(currency, delta);

                let value = Self::encode(&user).map_err(Self::abort)?;
                users.insert(key.as_bytes(), value)?;
                Ok(user.total_rewards(currency))
            })
            .map_err(Self::map_transaction_error)
    }

    async fn get_direct_referrals(
        &self,
        key: &str,
        offset: u32,
        limit: u32,
    ) -> Result<Page<UserKey>, EngineError> {
        if log::log_enabled!(log::Level::Trace) {
            trace!(
                "getting direct referrals for user {} (offset: {}, limit: {})",
                key,
                offset,
                limit
            );
        }

        let prefix = Self::prefix_key(key);
        let mut total_count = 0u32;
        let mut referrals = Vec::new();

        for entry in self.direct_referrals.scan_prefix(&prefix) {
            let (entry_key, _) = entry?;
            if total_count >= offset && (referrals.len() as u32) < limit {
                let referral = String::from_utf8(entry_key[prefix.len()..].to_vec())
                    .map_err(|e| EngineError::CorruptedEntry(e.to_string()))?;
                referrals.push(referral);
            }
            total_count += 1;
        }

        Ok(Page::new(referrals, total_count, offset))
    }

    async fn get_users_by_referral_count(
        &self,
        offset: u32,
        limit: u32,
    ) -> Result<Page<User>, EngineError> {
        if log::log_enabled!(log::Level::Trace) {
            trace!(
                "getting users by referral count (offset: {}, limit: {})",
                offset,
                limit
            );
        }

        let total_count = self.users.len() as u32;
        let mut users = Vec::new();

        for entry in self
            .referral_ranking
            .iter()
            .skip(offset as usize)
            .take(limit as usize)
        {
            let (entry_key, _) = entry?;
            if entry_key.len() < 4 {
                return Err(EngineError::CorruptedEntry(format!(
                    "ranking key of {} bytes",
                    entry_key.len()
                )));
            }

            let user = Self::load_optional(&self.users, &entry_key[4..])?.ok_or_else(|| {
                EngineError::CorruptedEntry(format!(
                    "ranking entry without user: {}",
                    String::from_utf8_lossy(&entry_key[4..])
                ))
            })?;
            users.push(user);
        }

        Ok(Page::new(users, total_count, offset))
    }

    async fn count_users(&self) -> Result<u32, EngineError> {
        Ok(self.users.len() as u32)
    }
}
