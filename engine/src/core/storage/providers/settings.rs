// Referral settings storage provider trait

use crate::core::error::EngineError;
use async_trait::async_trait;
use vcn_referral_common::referral::ReferralConfig;

/// Storage provider for the referral program configuration
#[async_trait]
pub trait SettingsProvider {
    /// Get the saved configuration, None if it was never saved
    async fn get_config(&self) -> Result<Option<ReferralConfig>, EngineError>;

    /// Replace the saved configuration
    /// The configuration is expected to be validated by the caller.
    async fn set_config(&self, config: &ReferralConfig) -> Result<(), EngineError>;
}
