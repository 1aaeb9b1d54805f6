// SPDX-License-Identifier: GPL-3.0-or-later

//! The per-instance sync cycle: fetch, dedup, match, evaluate, rank, grab,
//! record.
//!
//! One call covers one managed kind of one instance, synchronously from the
//! engine's point of view; the only awaits are the collaborator edges. The
//! caller ensures a single cycle per instance runs at a time.

use crate::custom_formats;
use crate::decision::{self, Decision};
use crate::download_clients::GrabClient;
use crate::indexers::{IndexerError, ReleaseFetcher};
use crate::matching::{self, MatchedRelease};
use crate::processed;
use crate::profiles;
use crate::size;
use chrono::{DateTime, Duration, Utc};
use grabarr_config::SyncConfig;
use grabarr_domain::{CollectionEntry, MediaKind};
use grabarr_infrastructure::{ConfigStore, StoreError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum CycleError {
    #[error("feed fetch failed: {0}")]
    Fetch(#[from] IndexerError),
    #[error("config store failure: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleSummary {
    /// Releases evaluated this cycle (everything not suppressed by dedup).
    pub processed: usize,
    /// Successful grab submissions.
    pub grabbed: usize,
    /// Releases suppressed by the processed-identifier window.
    pub skipped: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncStatus {
    pub last_sync_time: DateTime<Utc>,
    pub next_sync_time: DateTime<Utc>,
}

pub fn sync_status_key(kind: MediaKind) -> String {
    format!("sync_status_{}", kind.as_str())
}

/// Run one full cycle for one instance and managed kind.
///
/// The sync status record is written even when the cycle body fails, so a
/// broken feed never wedges the instance's cadence bookkeeping.
pub async fn run_cycle<F, G>(
    store: &dyn ConfigStore,
    fetcher: &F,
    grabber: &G,
    instance_id: &str,
    kind: MediaKind,
    entries: &[CollectionEntry],
    sync: &SyncConfig,
) -> Result<CycleSummary, CycleError>
where
    F: ReleaseFetcher + ?Sized,
    G: GrabClient + ?Sized,
{
    let outcome = cycle_body(store, fetcher, grabber, instance_id, kind, entries).await;

    let status_written =
        write_sync_status(store, instance_id, kind, sync.interval_minutes).await;

    match outcome {
        Ok(summary) => {
            status_written?;
            info!(
                target: "cycle",
                instance_id,
                kind = %kind,
                processed = summary.processed,
                grabbed = summary.grabbed,
                skipped = summary.skipped,
                "cycle complete"
            );
            Ok(summary)
        }
        Err(error) => Err(error),
    }
}

async fn cycle_body<F, G>(
    store: &dyn ConfigStore,
    fetcher: &F,
    grabber: &G,
    instance_id: &str,
    kind: MediaKind,
    entries: &[CollectionEntry],
) -> Result<CycleSummary, CycleError>
where
    F: ReleaseFetcher + ?Sized,
    G: GrabClient + ?Sized,
{
    let now = Utc::now();
    let mut window = processed::load_window(store, instance_id, kind, now).await?;

    let releases = fetcher.fetch(kind).await?;
    let total_fetched = releases.len();

    let fresh: Vec<_> = releases
        .into_iter()
        .filter(|release| match release.guid.as_deref() {
            Some(guid) => !window.contains(guid),
            None => true,
        })
        .collect();
    let skipped = total_fetched - fresh.len();

    // one read per cycle for each config blob, then pure decisions
    let stored_profiles = profiles::load_profiles(store, instance_id).await?;
    let sizes = size::load_size_table(store, instance_id).await?;
    let formats_blob = store
        .get(instance_id, custom_formats::CUSTOM_FORMATS_KEY)
        .await?;
    let formats =
        custom_formats::compile_formats(&custom_formats::formats_from_blob(formats_blob.as_ref()));

    let matched = matching::match_releases(&fresh, entries);

    let mut approved: Vec<(MatchedRelease, Decision)> = Vec::new();
    for pair in matched {
        let profile = profiles::resolve_from(&stored_profiles, pair.entry.quality_profile.as_deref());
        let verdict =
            decision::evaluate_pair(&pair.release, &pair.entry, &profile, &sizes, &formats);
        debug!(
            target: "cycle",
            release = %pair.release.title,
            entry = %pair.entry.title,
            approved = verdict.approved,
            reason = %verdict.reason,
            score = verdict.score,
            "pair evaluated"
        );
        if verdict.approved {
            approved.push((pair, verdict));
        }
    }

    // highest score first; sort is stable so equal scores keep input order
    approved.sort_by_key(|(_, verdict)| std::cmp::Reverse(verdict.score));

    let mut grabbed_keys: HashSet<String> = HashSet::new();
    let mut grabbed = 0;
    for (pair, verdict) in &approved {
        let key = pair.entry.grab_key();
        if grabbed_keys.contains(&key) {
            debug!(
                target: "cycle",
                entry = %pair.entry.title,
                release = %pair.release.title,
                "entry already grabbed this cycle, skipping"
            );
            continue;
        }

        match grabber.submit(&pair.release, kind).await {
            Ok(()) => {
                info!(
                    target: "cycle",
                    release = %pair.release.title,
                    entry = %pair.entry.title,
                    score = verdict.score,
                    reason = %verdict.reason,
                    "release grabbed"
                );
                grabbed_keys.insert(key);
                grabbed += 1;
            }
            Err(error) => {
                // the entry stays a candidate for the next cycle
                warn!(
                    target: "cycle",
                    release = %pair.release.title,
                    entry = %pair.entry.title,
                    error = %error,
                    "grab submission failed"
                );
            }
        }
    }

    // every considered release is remembered, grabbed or not; releases
    // without an identifier have nothing to key on
    for release in &fresh {
        if let Some(guid) = release.guid.as_deref() {
            window.mark(guid, now);
        }
    }
    processed::save_window(store, instance_id, kind, &window).await?;

    Ok(CycleSummary {
        processed: fresh.len(),
        grabbed,
        skipped,
    })
}

async fn write_sync_status(
    store: &dyn ConfigStore,
    instance_id: &str,
    kind: MediaKind,
    interval_minutes: u32,
) -> Result<(), CycleError> {
    let now = Utc::now();
    let interval = i64::from(interval_minutes.clamp(15, 60));
    let status = SyncStatus {
        last_sync_time: now,
        next_sync_time: now + Duration::minutes(interval),
    };

    let value = serde_json::to_value(&status)
        .map_err(|error| StoreError::Backend(error.to_string()))?;
    store
        .save(instance_id, &sync_status_key(kind), &value)
        .await?;
    Ok(())
}
