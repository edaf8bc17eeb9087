// SettingsProvider implementation for sled storage

use crate::core::{
    error::EngineError,
    storage::{sled::REFERRAL_CONFIG, SettingsProvider, SledStorage},
};
use async_trait::async_trait;
use log::trace;
use vcn_referral_common::referral::ReferralConfig;

#[async_trait]
impl SettingsProvider for SledStorage {
    async fn get_config(&self) -> Result<Option<ReferralConfig>, EngineError> {
        if log::log_enabled!(log::Level::Trace) {
            trace!("get referral config");
        }

        Self::load_optional(&self.settings, REFERRAL_CONFIG)
    }

    async fn set_config(&self, config: &ReferralConfig) -> Result<(), EngineError> {
        if log::log_enabled!(log::Level::Trace) {
            trace!(
                "set referral config: tier1={}, tier2={}, events={}",
                config.tier1_rate,
                config.tier2_rate,
                config.enabled_events.len()
            );
        }

        self.settings.insert(REFERRAL_CONFIG, Self::encode(config)?)?;

        // Flush to ensure durability, settings are rarely written
        self.flush().await
    }
}
