// SPDX-License-Identifier: GPL-3.0-or-later
use grabarr_config::AppConfig;

pub mod custom_formats;
pub mod cycle;
pub mod decision;
pub mod download_clients;
pub mod indexers;
pub mod matching;
pub mod processed;
pub mod profiles;
pub mod quality;
pub mod selection;
pub mod size;
pub mod titles;

pub use cycle::{run_cycle, CycleError, CycleSummary, SyncStatus};
pub use decision::{evaluate, evaluate_pair, Decision};
pub use download_clients::{DownloadClientError, GrabClient, QBittorrentClient};
pub use indexers::{HttpReleaseFetcher, IndexerError, ReleaseFetcher};
pub use matching::{match_releases, MatchedRelease};
pub use profiles::resolve_profile;
pub use selection::{select_across_indexers, select_best, SelectionOutcome};

use tracing::info;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    pub fn on_start(&self) {
        info!(target: "application", "application state initialized");
    }
}
