//! Two path (End / Start) Doppler measurements
use hifitime::Unit;
use nalgebra::{DMatrix, Vector3};

use crate::{
    adapter::{
        range::{bias_derivatives, iono_km, resolve_ramp, tropo_km, NoisePolicy},
        MeasurementInputs, ObservableTransform, RangeAdapter,
    },
    band::FrequencyBand,
    cfg::Error as ConfigError,
    constants::{SPEED_OF_LIGHT_KM_S, TAYLOR_TRUNCATION_TOLERANCE_KM},
    derivative::{range_partials, DerivativeTarget, EstimationParameter},
    error::Error,
    measurement::MeasurementRecord,
    observation::ObservationData,
    signal::{SignalPath, SignalRequest},
};

/// Doppler flavor
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DopplerFlavor {
    /// DSN total count phase Doppler (Hz)
    #[default]
    Dsn,
    /// Ground network range rate (km/s)
    GroundNetwork,
}

/// Change in magnitude of `path_vec` when moved by `delta`, expanded
/// to third order. Returns 0 when `delta` is below truncation tolerance.
pub fn path_magnitude_delta(path_vec: &Vector3<f64>, delta: &Vector3<f64>) -> f64 {
    let d = delta.norm();
    if d < TAYLOR_TRUNCATION_TOLERANCE_KM {
        return 0.0;
    }

    let r = path_vec.norm();
    let proj = (delta / d).dot(path_vec);
    let perp = r.powi(2) - proj.powi(2);

    let term1 = d * proj / r;
    let term2 = d.powi(2) * perp / (2.0 * r.powi(3));
    let term3 = -(d.powi(3) * proj * perp) / (2.0 * r.powi(5));

    term1 + term2 + term3
}

/// Differenced path length (km) from the per leg Taylor expansion,
/// corrections difference included.
fn taylor_difference(start: &SignalPath, end: &SignalPath, corrections_km: f64) -> f64 {
    start
        .iter()
        .zip(end.iter())
        .map(|(s, e)| path_magnitude_delta(&s.range_vec_km, &(e.range_vec_km - s.range_vec_km)))
        .sum::<f64>()
        + corrections_km
}

/// Turnaround ratio of a path. A ramped uplink uses the
/// standard ratio of its band for every transponder.
fn turnaround(path: &SignalPath, ramped_band: Option<FrequencyBand>) -> Result<f64, Error> {
    match ramped_band {
        None => Ok(path.turnaround_ratio()),
        Some(band) => {
            let ratio = band.turnaround_ratio()?;
            Ok(path
                .iter()
                .filter(|leg| leg.receiver.is_spacecraft())
                .filter(|leg| leg.receiver.turnaround_ratio.is_some())
                .fold(1.0, |acc, _| acc * ratio))
        },
    }
}

/// Two path Doppler: differences the End path (measurement epoch) and the
/// Start path (one count interval earlier). The Start path is computed by an
/// exclusively owned sub adapter, set up at initialization.
#[derive(Debug, Clone)]
pub struct Doppler {
    flavor: DopplerFlavor,
    start: Option<RangeAdapter>,
    end_record: Option<MeasurementRecord>,
    start_record: Option<MeasurementRecord>,
    end_multipliers: Vec<f64>,
    start_multipliers: Vec<f64>,
}

impl Default for Doppler {
    fn default() -> Self {
        Self::new(DopplerFlavor::default())
    }
}

impl Doppler {
    pub fn new(flavor: DopplerFlavor) -> Self {
        Self {
            flavor,
            start: None,
            end_record: None,
            start_record: None,
            end_multipliers: Vec::new(),
            start_multipliers: Vec::new(),
        }
    }

    pub fn flavor(&self) -> DopplerFlavor {
        self.flavor
    }

    /// Snapshot of the latest End path measurement (full path length, km)
    pub fn end_record(&self) -> Option<&MeasurementRecord> {
        self.end_record.as_ref()
    }

    /// Snapshot of the latest Start path measurement (full path length, km)
    pub fn start_record(&self) -> Option<&MeasurementRecord> {
        self.start_record.as_ref()
    }

    /// Full path length minus twice the ionospheric delay, per path.
    fn remove_iono(record: &mut MeasurementRecord) {
        for i in 0..record.value.len() {
            let iono = iono_km(record, i);
            record.value[i] -= 2.0 * iono;
        }
    }

    /// Corrections (km) of path `path`, ionospheric delay removed twice
    fn corrections_km(record: &MeasurementRecord, path: usize) -> f64 {
        record
            .signal_paths
            .get(path)
            .map(|p| p.corrections_km())
            .unwrap_or_default()
            - 2.0 * iono_km(record, path)
    }
}

impl ObservableTransform for Doppler {
    fn initialize(&mut self, base: &RangeAdapter) -> Result<(), Error> {
        self.start = Some(base.sub_adapter("S", true));
        Ok(())
    }

    fn compute_value(
        &mut self,
        base: &mut RangeAdapter,
        inputs: &MeasurementInputs,
    ) -> Result<MeasurementRecord, Error> {
        let start = self.start.as_mut().ok_or(ConfigError::MissingSubAdapter)?;

        let interval = match inputs.observation {
            Some(obs) if obs.doppler_count_interval > 0.0 => obs.doppler_count_interval,
            _ => base.config().doppler_count_interval,
        };

        // End path
        let request = base.request(inputs);
        let mut end = base.evaluate(&request)?;
        Self::remove_iono(&mut end);

        // Start path, anchored on the End path measurement epoch
        let anchor = match inputs.observation {
            Some(obs) => obs.with_epoch(end.epoch),
            None => ObservationData::at(end.epoch),
        };

        start.model_mut()?.set_count_interval(interval);

        let start_request = SignalRequest {
            observation: Some(&anchor),
            epoch_offset_s: -interval,
            ..start.request(inputs)
        };

        let mut start_record = start.evaluate(&start_request)?;
        Self::remove_iono(&mut start_record);

        if start_record.value.len() != end.value.len() {
            return Err(ConfigError::Topology(format!(
                "start and end signal paths differ ({} / {})",
                start_record.value.len(),
                end.value.len()
            ))
            .into());
        }

        let mut record = end.clone();

        if end.feasibility.is_blocked() {
            record.feasibility = end.feasibility.tagged("E");
        } else if start_record.feasibility.is_blocked() {
            record.feasibility = start_record.feasibility.tagged("S");
            record.feasibility_value = start_record.feasibility_value;
        }

        let uplink_hz = start_record.uplink_frequency_hz;
        let uplink_end_hz = end.uplink_frequency_hz;

        record.uplink_frequency_hz = uplink_hz;
        record.uplink_frequency_at_receive_hz = end.uplink_frequency_at_receive_hz;
        record.uplink_band = start_record.uplink_band;
        record.doppler_count_interval = interval;

        let ramped_band = inputs.ramp_table.map(|_| start_record.uplink_band);

        self.end_multipliers.clear();
        self.start_multipliers.clear();

        let iono_diff_km = iono_km(&end, 0) - iono_km(&start_record, 0);
        let tropo_diff_km = tropo_km(&end, 0) - tropo_km(&start_record, 0);

        for i in 0..record.value.len() {
            let diff_km = if base.config().use_taylor_series {
                let corrections_km =
                    Self::corrections_km(&end, i) - Self::corrections_km(&start_record, i);
                taylor_difference(
                    &start_record.signal_paths[i],
                    &end.signal_paths[i],
                    corrections_km,
                )
            } else {
                end.value[i] - start_record.value[i]
            };

            match self.flavor {
                DopplerFlavor::GroundNetwork => {
                    record.value[i] = diff_km / interval;
                    self.end_multipliers.push(1.0 / interval);
                    self.start_multipliers.push(1.0 / interval);
                },
                DopplerFlavor::Dsn => {
                    let turnaround = turnaround(&end.signal_paths[i], ramped_band)?;
                    let dtdt = diff_km / SPEED_OF_LIGHT_KM_S;
                    let dt_end = end.value[i] / SPEED_OF_LIGHT_KM_S;

                    self.end_multipliers
                        .push(turnaround * uplink_end_hz / (interval * SPEED_OF_LIGHT_KM_S));
                    self.start_multipliers
                        .push(turnaround * uplink_hz / (interval * SPEED_OF_LIGHT_KM_S));

                    match inputs.ramp_table {
                        Some(table) => {
                            let (station, spacecraft) = end.signal_paths[i]
                                .uplink_participants()
                                .ok_or(ConfigError::Topology(
                                    "ramped uplink requires a ground station to spacecraft leg"
                                        .to_string(),
                                ))?;

                            let t1 = end.epoch - dt_end * Unit::Second;

                            let integral = table.integrate(
                                &station.id,
                                &spacecraft.id,
                                t1,
                                interval - dtdt,
                                |f| f,
                            );

                            if let Some(integral) =
                                resolve_ramp(&mut record, i, base.name(), integral)?
                            {
                                record.value[i] = -turnaround * integral / interval;
                            }
                        },
                        None => {
                            record.value[i] = -turnaround * uplink_hz * (interval - dtdt) / interval;
                        },
                    }

                    if i == 0 {
                        let dtdt_iono = -iono_diff_km / SPEED_OF_LIGHT_KM_S;
                        let dtdt_tropo = tropo_diff_km / SPEED_OF_LIGHT_KM_S;
                        record.iono_correction = -turnaround * uplink_hz * (-dtdt_iono) / interval;
                        record.tropo_correction =
                            -turnaround * uplink_hz * (-dtdt_tropo) / interval;
                    }
                },
            }
        }

        if self.flavor == DopplerFlavor::GroundNetwork {
            record.iono_correction = -iono_diff_km / interval;
            record.tropo_correction = tropo_diff_km / interval;
        }

        base.apply_error_model(&mut record, NoisePolicy::Additive)?;

        self.end_record = Some(end);
        self.start_record = Some(start_record);

        Ok(record)
    }

    fn compute_derivative(
        &self,
        base: &RangeAdapter,
        record: &MeasurementRecord,
        target: &DerivativeTarget,
    ) -> Result<DMatrix<f64>, Error> {
        let rows = record.value.len();

        match &target.parameter {
            EstimationParameter::Bias(bias_type) => Ok(bias_derivatives(
                rows,
                *bias_type,
                record.measurement_type,
            )),
            parameter if parameter.is_state() => {
                let missing = || Error::MissingMeasurement(base.name().to_string());
                let end = self.end_record.as_ref().ok_or_else(missing)?;
                let start = self.start_record.as_ref().ok_or_else(missing)?;

                let (d_end, end_found) = range_partials(&end.signal_paths, target);
                let (d_start, start_found) = range_partials(&start.signal_paths, target);

                if !end_found && !start_found {
                    return Err(Error::NotAParticipant(target.object.clone()));
                }

                if d_start.nrows() != d_end.nrows() {
                    return Err(Error::DerivativeDimension {
                        expected: d_end.nrows(),
                        got: d_start.nrows(),
                    });
                }

                let mut partials = DMatrix::zeros(d_end.nrows(), d_end.ncols());
                for i in 0..d_end.nrows() {
                    let (m_end, m_start) = (self.end_multipliers[i], self.start_multipliers[i]);
                    let row = d_end.row(i) * m_end - d_start.row(i) * m_start;
                    partials.set_row(i, &row);
                }

                Ok(partials)
            },
            parameter => Ok(DMatrix::zeros(rows, parameter.size())),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn taylor_expansion() {
        let path = Vector3::new(20_000.0, 5_000.0, -1_000.0);
        let delta = Vector3::new(1.5, -0.2, 0.7);

        let exact = (path + delta).norm() - path.norm();
        let approx = path_magnitude_delta(&path, &delta);

        assert!((exact - approx).abs() < 1.0E-9, "{} vs {}", exact, approx);
    }

    #[test]
    fn null_delta() {
        let path = Vector3::new(7000.0, 0.0, 0.0);
        assert_eq!(path_magnitude_delta(&path, &Vector3::zeros()), 0.0);
    }
}
