//! CLI command handlers.

pub mod config;
pub mod get;
pub mod index_name;
pub mod metric_spec;
pub mod record;

pub use config::run_config_show;
pub use get::{GetCommandInput, run_get};
pub use index_name::run_index_name;
pub use record::{RecordCommandInput, run_record};

use crate::error::CliError;
use clap::Args;
use rally_metrics_app::MetricsStore;
use rally_metrics_config::ValidatedRallyConfig;
use rally_metrics_domain::{TrackName, TrackSetupName, TrialTimestamp};
use rally_metrics_infra::build_metrics_store_with;
use rally_metrics_ports::{ClientFactory, LoggerPort};
use std::sync::Arc;

/// Flags identifying one trial.
#[derive(Debug, Clone, Args)]
pub struct TrialArgs {
    /// Trial start (`20160131T000000Z`, RFC 3339, or `2016-01-31T00:00:00`).
    #[arg(long)]
    pub trial_timestamp: String,
    /// Track (benchmark workload) name.
    #[arg(long)]
    pub track: String,
    /// Track setup (configuration variant) name.
    #[arg(long)]
    pub track_setup: String,
}

/// Validated trial identity.
#[derive(Debug, Clone)]
pub struct Trial {
    pub timestamp: TrialTimestamp,
    pub track: TrackName,
    pub track_setup: TrackSetupName,
}

impl TrialArgs {
    /// Validate the raw flags.
    pub fn parse(&self) -> Result<Trial, CliError> {
        Ok(Trial {
            timestamp: TrialTimestamp::parse(&self.trial_timestamp)?,
            track: TrackName::parse(&self.track)?,
            track_setup: TrackSetupName::parse(&self.track_setup)?,
        })
    }
}

/// Collaborators a store-backed command needs.
pub struct StoreContext<'a> {
    pub config: &'a ValidatedRallyConfig,
    pub factory: &'a dyn ClientFactory,
    pub logger: Option<Arc<dyn LoggerPort>>,
}

impl StoreContext<'_> {
    /// Build a store and open `trial` on it.
    pub fn open(&self, trial: Trial, create: bool) -> Result<MetricsStore, CliError> {
        let mut store = build_metrics_store_with(self.config, self.factory, self.logger.clone())?;
        store.open(trial.timestamp, trial.track, trial.track_setup, create)?;
        Ok(store)
    }
}
