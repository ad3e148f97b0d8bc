use std::{cmp::Ordering, ops::Range};

use hifitime::{Epoch, Unit};
use itertools::Itertools;
use log::trace;
use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::band::FrequencyBand;

/// How the caller should react to a [RampError]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Abort the computation and report to the caller
    Fatal,
    /// Reject this observation only ("R") and carry on
    Degraded,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RampError {
    #[error("elapsed time must be non negative (got {0} s)")]
    NegativeElapsedTime(f64),

    #[error("ramp table has no data record")]
    EmptyTable,

    #[error("ramp table has no record for uplink from {station} to {spacecraft}")]
    NoParticipantRecords { station: String, spacecraft: String },

    #[error("end epoch {t_end} is out of ramp table range [{start}, +inf)")]
    EndEpochOutOfRange { t_end: Epoch, start: Epoch },

    #[error("start epoch {t_start} is out of ramp table range [{start}, +inf)")]
    StartEpochOutOfRange { t_start: Epoch, start: Epoch },
}

impl RampError {
    /// [Severity] of this error. Table level problems are fatal,
    /// out of range epochs only reject the current observation.
    pub fn severity(&self) -> Severity {
        match self {
            Self::EmptyTable | Self::NoParticipantRecords { .. } => Severity::Fatal,
            Self::NegativeElapsedTime(_)
            | Self::EndEpochOutOfRange { .. }
            | Self::StartEpochOutOfRange { .. } => Severity::Degraded,
        }
    }
}

/// Ramp record type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum RampType {
    Snap,
    #[default]
    Start,
    Linear,
    Quadratic,
    Medium,
    End,
}

/// One uplink frequency ramp, valid from `epoch` until the next record
/// of the same participants.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RampRecord {
    /// Ramp start [Epoch]
    pub epoch: Epoch,
    /// Transmitting ground station identifier
    pub station_id: String,
    /// Tracked spacecraft identifier
    pub spacecraft_id: String,
    /// Uplink [FrequencyBand]
    pub band: FrequencyBand,
    pub ramp_type: RampType,
    /// Frequency at `epoch` (Hz)
    pub frequency_hz: f64,
    /// Frequency rate (Hz/s)
    pub rate_hz_s: f64,
}

impl RampRecord {
    fn matches(&self, station_id: &str, spacecraft_id: &str) -> bool {
        self.station_id == station_id && self.spacecraft_id == spacecraft_id
    }
}

/// Table of uplink frequency ramps.
/// Records are grouped per participants and sorted in time.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RampTable {
    records: Vec<RampRecord>,
}

impl RampTable {
    /// Builds a new [RampTable] from unsorted records
    pub fn new(mut records: Vec<RampRecord>) -> Self {
        records.sort_by(|a, b| {
            (&a.station_id, &a.spacecraft_id)
                .cmp(&(&b.station_id, &b.spacecraft_id))
                .then(a.epoch.partial_cmp(&b.epoch).unwrap_or(Ordering::Equal))
        });
        Self { records }
    }

    pub fn records(&self) -> &[RampRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Index range of the records of this uplink
    fn span(&self, station_id: &str, spacecraft_id: &str) -> Result<Range<usize>, RampError> {
        if self.records.is_empty() {
            return Err(RampError::EmptyTable);
        }

        let mut positions = self
            .records
            .iter()
            .positions(|r| r.matches(station_id, spacecraft_id));

        let begin = positions.next().ok_or(RampError::NoParticipantRecords {
            station: station_id.to_string(),
            spacecraft: spacecraft_id.to_string(),
        })?;

        let end = positions.last().unwrap_or(begin) + 1;
        Ok(begin..end)
    }

    /// Ramped frequency (Hz) and band at `epoch`, if a ramp applies.
    pub fn frequency_at(
        &self,
        station_id: &str,
        spacecraft_id: &str,
        epoch: Epoch,
    ) -> Option<(f64, FrequencyBand)> {
        let span = self.span(station_id, spacecraft_id).ok()?;
        let record = self.records[span]
            .iter()
            .rev()
            .find(|r| r.epoch <= epoch)?;

        let dt = (epoch - record.epoch).to_seconds();
        Some((record.frequency_hz + record.rate_hz_s * dt, record.band))
    }

    /// Integrates `factor(f(t))` over `[t_end - delta_t_s, t_end]`,
    /// `f` being the piecewise linear ramped frequency of this uplink.
    /// The integration walks ramp intervals backwards from `t_end`.
    pub fn integrate<F: Fn(f64) -> f64>(
        &self,
        station_id: &str,
        spacecraft_id: &str,
        t_end: Epoch,
        delta_t_s: f64,
        factor: F,
    ) -> Result<f64, RampError> {
        if delta_t_s < 0.0 {
            return Err(RampError::NegativeElapsedTime(delta_t_s));
        }

        let records = &self.records[self.span(station_id, spacecraft_id)?];

        let start = records[0].epoch;

        if t_end < start {
            return Err(RampError::EndEpochOutOfRange { t_end, start });
        }

        let t_start = t_end - delta_t_s * Unit::Second;

        if t_start < start {
            return Err(RampError::StartEpochOutOfRange { t_start, start });
        }

        let end_interval = records
            .iter()
            .rposition(|r| r.epoch <= t_end)
            .unwrap_or_default();

        let base_factor = factor(records[end_interval].frequency_hz);

        let mut value = 0.0;
        let mut dt = delta_t_s;

        for i in (0..=end_interval).rev() {
            if dt <= 0.0 {
                break;
            }

            let mut interval_len = if i == end_interval {
                (t_end - records[i].epoch).to_seconds()
            } else {
                (records[i + 1].epoch - records[i].epoch).to_seconds()
            };

            let rate = records[i].rate_hz_s;
            let mut f0 = records[i].frequency_hz;

            if dt < interval_len {
                f0 += rate * (interval_len - dt);
                interval_len = dt;
            }

            let f1 = f0 + rate * interval_len;

            value += ((factor(f0) + factor(f1)) / 2.0 - base_factor) * interval_len;
            dt -= interval_len;

            trace!(
                "ramp interval #{} - f0={:.6} Hz f1={:.6} Hz len={:.9} s",
                i,
                f0,
                f1,
                interval_len
            );
        }

        Ok(value + base_factor * delta_t_s)
    }
}
