// ── Batch read engine ──
//
// Plans one query per uid, splits the plan into batches of at most
// `max_uids_per_query`, and runs each batch with bounded concurrency.
// Results land in a `BTreeMap`, so the output never depends on which
// query finished first.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use coolant_api::TimeSeriesStore;
use futures_util::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use super::query;
use crate::config::{ReadConfig, ReadOverrides, ReadTarget};
use crate::error::CoreError;
use crate::model::{Facility, TimeSeries};
use crate::planner::{QueryTarget, Scope};

/// Series keyed by uid. Uids with no data have no entry.
pub type Readings = BTreeMap<String, TimeSeries>;

/// Split `items` into consecutive batches of at most `max` items.
pub fn split_batches<T>(items: &[T], max: usize) -> Vec<&[T]> {
    items.chunks(max.max(1)).collect()
}

#[derive(Debug)]
struct PlannedQuery {
    uid: String,
    text: String,
}

/// Reads telemetry from a store. Holds no per-read state, so any read can
/// simply be issued again.
pub struct DataReader<S> {
    store: Arc<S>,
    config: ReadConfig,
}

impl<S: TimeSeriesStore> DataReader<S> {
    pub fn new(store: Arc<S>, config: ReadConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &ReadConfig {
        &self.config
    }

    /// Read arbitrary uids with the configured defaults.
    pub async fn read<I, U>(&self, uids: I) -> Result<Readings, CoreError>
    where
        I: IntoIterator<Item = U>,
        U: Into<String>,
    {
        self.read_with(uids, &ReadOverrides::default()).await
    }

    /// Read arbitrary uids with request-level overrides on top of the
    /// defaults. Per-uid overrides still win.
    pub async fn read_with<I, U>(
        &self,
        uids: I,
        overrides: &ReadOverrides,
    ) -> Result<Readings, CoreError>
    where
        I: IntoIterator<Item = U>,
        U: Into<String>,
    {
        let targets = uids.into_iter().map(QueryTarget::bare).collect();
        self.read_targets(targets, overrides).await
    }

    pub async fn read_facility(
        &self,
        facility: &Facility,
        include_unavailable: bool,
    ) -> Result<Readings, CoreError> {
        let targets = facility.read_targets(Scope::Facility, include_unavailable);
        self.read_targets(targets, &ReadOverrides::default()).await
    }

    /// Read one room. An unknown or unavailable room reads as empty.
    pub async fn read_room(
        &self,
        facility: &Facility,
        room_uid: &str,
        include_unavailable: bool,
    ) -> Result<Readings, CoreError> {
        if facility.room(room_uid).is_none() {
            warn!(room = room_uid, "room not found");
            return Ok(Readings::new());
        }
        let targets = facility.read_targets(Scope::Room(room_uid), include_unavailable);
        self.read_targets(targets, &ReadOverrides::default()).await
    }

    /// Read one device. An unknown or unavailable device reads as empty.
    pub async fn read_device(
        &self,
        facility: &Facility,
        device_uid: &str,
        include_unavailable: bool,
    ) -> Result<Readings, CoreError> {
        if facility.device(device_uid).is_none() {
            warn!(device = device_uid, "device not found");
            return Ok(Readings::new());
        }
        let targets = facility.read_targets(Scope::Device(device_uid), include_unavailable);
        self.read_targets(targets, &ReadOverrides::default()).await
    }

    /// Run the named read profile. An unknown profile reads as empty.
    pub async fn read_profile(
        &self,
        facility: &Facility,
        name: &str,
    ) -> Result<Readings, CoreError> {
        let Some(profile) = self.config.profiles.get(name) else {
            warn!(profile = name, "read profile not found");
            return Ok(Readings::new());
        };
        let include = profile
            .include_unavailable
            .unwrap_or(self.config.include_unavailable);

        let targets = match &profile.target {
            ReadTarget::Facility => facility.read_targets(Scope::Facility, include),
            ReadTarget::Rooms(uids) => uids
                .iter()
                .filter(|uid| known(facility.room(uid).is_some(), "room", uid))
                .flat_map(|uid| facility.read_targets(Scope::Room(uid), include))
                .collect(),
            ReadTarget::Devices(uids) => uids
                .iter()
                .filter(|uid| known(facility.device(uid).is_some(), "device", uid))
                .flat_map(|uid| facility.read_targets(Scope::Device(uid), include))
                .collect(),
            ReadTarget::Uids(uids) => uids
                .iter()
                .map(|uid| {
                    facility
                        .attribute(uid)
                        .map_or_else(|| QueryTarget::bare(uid.as_str()), QueryTarget::from)
                })
                .collect(),
        };

        debug!(profile = name, targets = targets.len(), "running read profile");
        self.read_targets(targets, &profile.overrides).await
    }

    /// Read a planned set of targets.
    ///
    /// Failures on single uids are logged and leave the uid out. A terminal
    /// store failure (unreachable, rejected credentials) aborts the read.
    pub async fn read_targets(
        &self,
        targets: Vec<QueryTarget>,
        overrides: &ReadOverrides,
    ) -> Result<Readings, CoreError> {
        let planned = self.plan(targets, overrides);
        let mut readings = Readings::new();
        if planned.is_empty() {
            return Ok(readings);
        }

        let batches = split_batches(&planned, self.config.max_uids_per_query);
        info!(uids = planned.len(), batches = batches.len(), "reading telemetry");

        for (number, batch) in batches.iter().enumerate() {
            let mut results = stream::iter(batch.iter())
                .map(|q| self.query_one(q))
                .buffer_unordered(self.config.parallelism.max(1));

            while let Some((uid, result)) = results.next().await {
                match result {
                    Ok(Some(series)) => {
                        readings.insert(uid.to_owned(), series);
                    }
                    Ok(None) => debug!(uid, "no data in range"),
                    Err(e) if e.is_terminal() => return Err(e),
                    Err(e) => warn!(uid, error = %e, "read failed, skipping uid"),
                }
            }
            debug!(batch = number + 1, size = batch.len(), "batch done");
        }

        info!(uids = planned.len(), with_data = readings.len(), "read complete");
        Ok(readings)
    }

    fn plan(&self, targets: Vec<QueryTarget>, overrides: &ReadOverrides) -> Vec<PlannedQuery> {
        let base = overrides.apply(&self.config.default);
        let mut seen = HashSet::new();

        targets
            .into_iter()
            .filter(|t| {
                if t.uid.is_empty() {
                    warn!("skipping empty uid");
                    return false;
                }
                seen.insert(t.uid.clone())
            })
            .map(|t| {
                let uid_override = self.config.uid_overrides.get(&t.uid);
                let spec = uid_override.map_or_else(|| base.clone(), |o| o.apply(&base));
                let field_key = uid_override
                    .and_then(|o| o.field_key.as_deref())
                    .or(overrides.field_key.as_deref())
                    .or(t.field_key.as_deref())
                    .unwrap_or(&self.config.default_field_key);
                let text = query::build(&t.uid, field_key, &spec);
                PlannedQuery { uid: t.uid, text }
            })
            .collect()
    }

    async fn query_one<'q>(
        &self,
        query: &'q PlannedQuery,
    ) -> (&'q str, Result<Option<TimeSeries>, CoreError>) {
        let limit = self.config.timeout;
        let result = match tokio::time::timeout(limit, self.store.query(&query.text)).await {
            Ok(Ok(samples)) if samples.is_empty() => Ok(None),
            Ok(Ok(samples)) => Ok(Some(TimeSeries::from_samples(samples))),
            Ok(Err(e)) => Err(CoreError::from(e)),
            Err(_) => Err(CoreError::Timeout {
                timeout_secs: limit.as_secs(),
            }),
        };
        (&query.uid, result)
    }
}

fn known(found: bool, entity: &str, uid: &str) -> bool {
    if !found {
        warn!(entity, uid, "not found, skipping");
    }
    found
}
