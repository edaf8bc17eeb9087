// Referral program settings, as edited from the admin screen

use std::sync::Arc;

use log::{debug, info};
use vcn_referral_common::{
    config::{MAX_LEVEL, MIN_LEVEL},
    referral::{simulate, ReferralConfig, ReferralError, SimulationReport, SimulationRow},
};

use super::{error::EngineError, storage::Storage};

pub struct ReferralSettings<S: Storage> {
    storage: Arc<S>,
}

impl<S: Storage> ReferralSettings<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }

    /// Saved configuration, or the default one if nothing was saved yet
    pub async fn load(&self) -> Result<ReferralConfig, EngineError> {
        match self.storage.get_config().await? {
            Some(config) => Ok(config),
            None => {
                debug!("No referral config saved, using defaults");
                Ok(ReferralConfig::default())
            }
        }
    }

    /// Validate and persist a configuration.
    /// Reward calls made afterwards must be given the new value.
    pub async fn save(&self, config: &ReferralConfig) -> Result<(), EngineError> {
        config.validate()?;
        self.storage.set_config(config).await?;
        info!(
            "Referral config saved: tier1 {}, tier2 {}, {} enabled event(s), {} level range(s), {} rank(s)",
            config.tier1_rate,
            config.tier2_rate,
            config.enabled_events.len(),
            config.level_thresholds.len(),
            config.ranks.len()
        );
        Ok(())
    }

    /// Simulate an unsaved configuration
    pub fn preview(&self, config: &ReferralConfig) -> Result<SimulationReport, EngineError> {
        config.validate()?;
        Ok(simulate(config))
    }

    /// Simulate a single level of an unsaved configuration
    pub fn preview_level(
        &self,
        config: &ReferralConfig,
        level: u32,
    ) -> Result<SimulationRow, EngineError> {
        if !(MIN_LEVEL..=MAX_LEVEL).contains(&level) {
            return Err(ReferralError::LevelOutOfRange {
                level,
                max: MAX_LEVEL,
            }
            .into());
        }

        let report = self.preview(config)?;
        report.row(level).cloned().ok_or_else(|| {
            ReferralError::LevelOutOfRange {
                level,
                max: MAX_LEVEL,
            }
            .into()
        })
    }
}
