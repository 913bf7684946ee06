// ── Batch write engine ──
//
// Two channels share one generic path: validate, build points, split into
// batches, write each batch in order with a fixed-interval retry. Only
// timeouts and transient store errors are retried. The whole path runs inside a `CriticalGuard` so shutdown can wait for it.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use coolant_api::{Point, TimeSeriesStore, WriteTarget};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::config::{ChannelConfig, WriteConfig};
use crate::error::CoreError;
use crate::model::Facility;
use crate::planner::Scope;
use crate::shutdown::ShutdownCoordinator;

/// What a prediction series forecasts. Decides the measurement name and
/// the `data_type` tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PredictionKind {
    Temperature,
    Energy,
    Pue,
    /// Any other forecast, named by its signal.
    Custom(String),
}

impl PredictionKind {
    /// Signal segment of the measurement name.
    pub fn signal(&self) -> &str {
        match self {
            Self::Temperature => "temp",
            Self::Energy => "energy",
            Self::Pue => "pue",
            Self::Custom(name) => name,
        }
    }

    pub fn data_type(&self) -> String {
        match self {
            Self::Temperature => "temperature_prediction".into(),
            Self::Energy => "energy_prediction".into(),
            Self::Pue => "pue_prediction".into(),
            Self::Custom(name) => format!("{name}_prediction"),
        }
    }
}

/// One setpoint or switch command for a controllable uid.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlCommand {
    pub control_uid: String,
    pub value: f64,
    pub timestamp: DateTime<Utc>,
}

impl ControlCommand {
    pub fn new(control_uid: impl Into<String>, value: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            control_uid: control_uid.into(),
            value,
            timestamp,
        }
    }
}

/// Outcome of a successful write call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WriteSummary {
    pub points: usize,
    pub batches: usize,
    /// Store calls made, retries included.
    pub attempts: u32,
    /// The channel is disabled and nothing was sent.
    pub skipped: bool,
}

impl WriteSummary {
    pub fn skipped() -> Self {
        Self {
            skipped: true,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Channel {
    Prediction,
    Control,
}

impl Channel {
    fn name(self) -> &'static str {
        match self {
            Self::Prediction => "prediction",
            Self::Control => "control",
        }
    }
}

/// Writes prediction series and control commands.
pub struct DataWriter<S> {
    prediction: Arc<S>,
    control: Arc<S>,
    config: WriteConfig,
    shutdown: ShutdownCoordinator,
}

impl<S: TimeSeriesStore> DataWriter<S> {
    /// Both channels on one store, guarded by the global coordinator.
    pub fn new(store: Arc<S>, config: WriteConfig) -> Self {
        Self::with_stores(Arc::clone(&store), store, config)
    }

    pub fn with_stores(prediction: Arc<S>, control: Arc<S>, config: WriteConfig) -> Self {
        Self {
            prediction,
            control,
            config,
            shutdown: ShutdownCoordinator::global().clone(),
        }
    }

    #[must_use]
    pub fn with_shutdown(mut self, shutdown: ShutdownCoordinator) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn config(&self) -> &WriteConfig {
        &self.config
    }

    /// Write one forecast series as `{series_id}_{signal}_pred_{horizon}`.
    pub async fn write_prediction(
        &self,
        series_id: &str,
        horizon: &str,
        points: &[(DateTime<Utc>, f64)],
        kind: &PredictionKind,
    ) -> Result<WriteSummary, CoreError> {
        require("series id", series_id)?;
        require("horizon", horizon)?;
        require("prediction signal", kind.signal())?;
        if points.is_empty() {
            return Err(CoreError::validation("prediction has no points"));
        }

        let measurement = format!("{series_id}_{}_pred_{horizon}", kind.signal());
        let data_type = kind.data_type();
        let points = points
            .iter()
            .map(|(ts, value)| {
                let timestamp_ns = nanos(ts)?;
                finite(*value, &measurement)?;
                Ok(Point::new(&measurement, timestamp_ns)
                    .tag("data_type", &data_type)
                    .field("value", *value))
            })
            .collect::<Result<Vec<_>, CoreError>>()?;

        self.write_batched(Channel::Prediction, &points).await
    }

    /// Write commands for one device, one point per command.
    pub async fn write_control_commands(
        &self,
        device_uid: &str,
        commands: &[ControlCommand],
    ) -> Result<WriteSummary, CoreError> {
        require("device uid", device_uid)?;
        if commands.is_empty() {
            return Err(CoreError::validation("no control commands"));
        }

        let points = commands
            .iter()
            .map(|cmd| {
                require("control uid", &cmd.control_uid)?;
                finite(cmd.value, &cmd.control_uid)?;
                Ok(Point::new(&cmd.control_uid, nanos(&cmd.timestamp)?)
                    .tag("device_uid", device_uid)
                    .tag("control_type", "optimization")
                    .field("value", cmd.value))
            })
            .collect::<Result<Vec<_>, CoreError>>()?;

        self.write_control_points(device_uid, points).await
    }

    /// Like [`DataWriter::write_control_commands`], but checked against the
    /// model: the device must exist and be available, and every command
    /// must target one of its control points.
    pub async fn write_device_commands(
        &self,
        facility: &Facility,
        device_uid: &str,
        commands: &[ControlCommand],
    ) -> Result<WriteSummary, CoreError> {
        let device = facility.device(device_uid).ok_or_else(|| CoreError::NotFound {
            entity_type: "device",
            identifier: device_uid.to_owned(),
        })?;
        if !device.is_available {
            return Err(CoreError::validation(format!(
                "device {device_uid} is unavailable"
            )));
        }

        let targets = facility.control_targets(Scope::Device(device_uid), true);
        if let Some(cmd) = commands
            .iter()
            .find(|c| !targets.contains_key(&c.control_uid))
        {
            return Err(CoreError::validation(format!(
                "{} is not a control point of device {device_uid}",
                cmd.control_uid
            )));
        }

        self.write_control_commands(device_uid, commands).await
    }

    async fn write_control_points(
        &self,
        device_uid: &str,
        points: Vec<Point>,
    ) -> Result<WriteSummary, CoreError> {
        let summary = self.write_batched(Channel::Control, &points).await?;
        if !summary.skipped {
            info!(device = device_uid, commands = summary.points, "control commands written");
        }
        Ok(summary)
    }

    fn channel(&self, channel: Channel) -> (&S, &ChannelConfig) {
        match channel {
            Channel::Prediction => (self.prediction.as_ref(), &self.config.prediction),
            Channel::Control => (self.control.as_ref(), &self.config.control),
        }
    }

    async fn write_batched(
        &self,
        channel: Channel,
        points: &[Point],
    ) -> Result<WriteSummary, CoreError> {
        let (store, config) = self.channel(channel);
        if !config.enabled {
            debug!(channel = channel.name(), points = points.len(), "channel disabled, skipping write");
            return Ok(WriteSummary::skipped());
        }

        let _guard = self.shutdown.enter();
        let target = WriteTarget::new(config.database.clone(), config.retention_policy.clone());
        let max_attempts = config.retry_times.max(1);
        let mut summary = WriteSummary {
            points: points.len(),
            ..WriteSummary::default()
        };

        for (number, batch) in points.chunks(config.batch_size.max(1)).enumerate() {
            let mut attempt = 0;
            loop {
                attempt += 1;
                summary.attempts += 1;
                match write_once(store, batch, &target, config).await {
                    Ok(()) => {
                        if attempt > 1 {
                            info!(channel = channel.name(), batch = number, attempt, "batch written after retry");
                        }
                        break;
                    }
                    Err(e) if e.is_retryable() && attempt < max_attempts => {
                        warn!(
                            channel = channel.name(),
                            batch = number,
                            attempt,
                            max_attempts,
                            error = %e,
                            "batch write failed, retrying"
                        );
                        tokio::time::sleep(config.retry_interval).await;
                    }
                    Err(e) => {
                        error!(
                            channel = channel.name(),
                            batch = number,
                            attempts = attempt,
                            error = %e,
                            "batch write failed, giving up"
                        );
                        return Err(CoreError::WriteFailed {
                            channel: channel.name(),
                            batch: number,
                            attempts: attempt,
                            message: e.to_string(),
                        });
                    }
                }
            }
            summary.batches += 1;
        }

        debug!(channel = channel.name(), ?summary, "write complete");
        Ok(summary)
    }
}

async fn write_once<S: TimeSeriesStore>(
    store: &S,
    batch: &[Point],
    target: &WriteTarget,
    config: &ChannelConfig,
) -> Result<(), CoreError> {
    match tokio::time::timeout(config.timeout, store.write(batch, target)).await {
        Ok(result) => result.map_err(CoreError::from),
        Err(_) => Err(CoreError::Timeout {
            timeout_secs: config.timeout.as_secs(),
        }),
    }
}

fn require(what: &str, value: &str) -> Result<(), CoreError> {
    if value.trim().is_empty() {
        return Err(CoreError::validation(format!("{what} is empty")));
    }
    Ok(())
}

fn finite(value: f64, uid: &str) -> Result<(), CoreError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(CoreError::validation(format!("{uid}: value {value} is not finite")))
    }
}

fn nanos(ts: &DateTime<Utc>) -> Result<i64, CoreError> {
    ts.timestamp_nanos_opt()
        .ok_or_else(|| CoreError::validation(format!("timestamp {ts} is out of range")))
}
