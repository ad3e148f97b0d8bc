//! Base range computation shared by every measurement kind
use hifitime::{Epoch, Unit};
use log::{error, trace, warn};
use nalgebra::DMatrix;

use crate::{
    adapter::{MeasurementInputs, ObservableTransform},
    cfg::{AdapterConfig, MeasurementType},
    constants::{IONO_CORRECTION_MAX_KM, TROPO_CORRECTION_MAX_KM},
    derivative::{range_partials, DerivativeTarget, EstimationParameter},
    error::Error,
    measurement::{Feasibility, MediaQa, MeasurementRecord},
    noise::{diagonal_covariance, NoiseGenerator},
    ramp::{RampError, Severity},
    signal::{CorrectionId, LegStatus, SignalPath, SignalPathModel, SignalRequest},
};

/// How noise is drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NoisePolicy {
    /// Resampled until strictly positive (ranges)
    Positive,
    /// Additive, skipped for rejected measurements
    Additive,
}

/// Path length adapter: walks the legs of each signal path of its
/// [SignalPathModel] and accumulates geometric range, corrections and
/// hardware delays. This is the building block of every measurement
/// kind, and is used as is for the internal sub measurements of
/// composite (Doppler, relay) measurements.
#[derive(Debug, Clone)]
pub struct RangeAdapter {
    name: String,
    cfg: AdapterConfig,
    model: Option<Box<dyn SignalPathModel>>,
    noise: NoiseGenerator,
    record: Option<MeasurementRecord>,
}

impl RangeAdapter {
    /// Builds a new [RangeAdapter]. Attach a model with [Self::with_model].
    pub fn new(name: &str, cfg: AdapterConfig) -> Self {
        let noise = NoiseGenerator::new(cfg.noise_seed);
        Self {
            name: name.to_string(),
            cfg,
            model: None,
            noise,
            record: None,
        }
    }

    /// Copies and returns with a [SignalPathModel] attached
    pub fn with_model(&self, model: Box<dyn SignalPathModel>) -> Self {
        let mut s = self.clone();
        s.model = Some(model);
        s
    }

    pub fn set_model(&mut self, model: Box<dyn SignalPathModel>) {
        self.model = Some(model);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.cfg
    }

    pub fn config_mut(&mut self) -> &mut AdapterConfig {
        &mut self.cfg
    }

    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }

    pub fn model(&self) -> Result<&dyn SignalPathModel, Error> {
        self.model
            .as_deref()
            .ok_or_else(|| Error::MissingSignalPath(self.name.clone()))
    }

    pub fn model_mut(&mut self) -> Result<&mut Box<dyn SignalPathModel>, Error> {
        let name = &self.name;
        self.model
            .as_mut()
            .ok_or_else(|| Error::MissingSignalPath(name.clone()))
    }

    /// Latest computed [MeasurementRecord]
    pub fn measurement(&self) -> Option<&MeasurementRecord> {
        self.record.as_ref()
    }

    pub(crate) fn noise_mut(&mut self) -> &mut NoiseGenerator {
        &mut self.noise
    }

    /// Sub measurement adapter cloned from this one: same signal path model,
    /// full noiseless and unbiased path length.
    pub(crate) fn sub_adapter(&self, role: &str, media: bool) -> Self {
        let mut s = self.clone();
        s.name = format!("{}_{}", self.name, role);
        s.cfg = self.cfg.sub_measurement(media);
        s.record = None;
        s
    }

    /// [SignalRequest] for these inputs
    pub(crate) fn request<'a>(&self, inputs: &MeasurementInputs<'a>) -> SignalRequest<'a> {
        SignalRequest {
            with_light_time: inputs.with_light_time && self.cfg.with_light_time,
            with_media_correction: self.cfg.with_media_correction,
            observation: inputs.observation,
            ramp_table: inputs.ramp_table,
            for_simulation: inputs.for_simulation,
            epoch_offset_s: 0.0,
        }
    }

    /// Measurement [Epoch]: reception of the last leg (plus receiver delay)
    /// when time tagged at the receiver, transmission of the first leg
    /// (minus transmitter delay) otherwise.
    fn measurement_epoch(path: &SignalPath, at_receiver: bool) -> Result<Epoch, Error> {
        if at_receiver {
            let leg = path.last().ok_or(Error::NoSignalPath)?;
            Ok(leg.rx_epoch + leg.rx_delay_s * Unit::Second)
        } else {
            let leg = path.first().ok_or(Error::NoSignalPath)?;
            Ok(leg.tx_epoch - leg.tx_delay_s * Unit::Second)
        }
    }

    /// Solves the signal paths and returns their total length (km), one
    /// value per path, with feasibility, epoch, uplink and media QA set.
    /// No multiplier, noise or bias is applied.
    pub fn evaluate(&mut self, request: &SignalRequest) -> Result<MeasurementRecord, Error> {
        let measurement_type = self.cfg.measurement_type;
        let name = &self.name;

        let model = self
            .model
            .as_mut()
            .ok_or_else(|| Error::MissingSignalPath(name.clone()))?;

        if !model.calculate(request)? {
            return Err(Error::SignalSolver(format!(
                "\"{}\": no light time solution",
                name
            )));
        }

        let paths = model.signal_paths();

        if paths.is_empty() || paths.iter().any(|path| path.is_empty()) {
            return Err(Error::NoSignalPath);
        }

        let epoch = Self::measurement_epoch(&paths[0], model.time_tag_at_receiver())?;

        let mut record = MeasurementRecord::new(measurement_type, epoch, paths.len());

        for (i, path) in paths.iter().enumerate() {
            for (j, leg) in path.iter().enumerate() {
                let length_km = leg.path_length_km();
                record.value[i] += length_km;

                trace!(
                    "{} ({}) - path #{} leg #{} {}->{}: {:.6} km",
                    epoch,
                    name,
                    i,
                    j + 1,
                    leg.transmitter.name,
                    leg.receiver.name,
                    length_km
                );

                match &leg.status {
                    LegStatus::Nominal => {
                        if leg.station_participant && record.feasibility == Feasibility::Unknown {
                            record.feasibility = Feasibility::Nominal;
                            record.feasibility_value = leg.feasibility_value_deg;
                        }
                    },
                    LegStatus::Blocked(detail) => {
                        if matches!(
                            record.feasibility,
                            Feasibility::Unknown | Feasibility::Nominal
                        ) {
                            record.feasibility = Feasibility::Blocked {
                                leg: j + 1,
                                detail: detail.clone(),
                            };
                            record.feasibility_value = leg.feasibility_value_deg;
                        }
                    },
                    LegStatus::Unknown => {},
                }
            }
        }

        record.uplink_frequency_hz = model.uplink_frequency_mhz(0, request.ramp_table) * 1.0E6;
        record.uplink_frequency_at_receive_hz =
            model.uplink_frequency_at_receive_mhz(0, request.ramp_table) * 1.0E6;
        record.uplink_band = model.uplink_band(0, request.ramp_table);
        record.range_modulo = self.cfg.range_modulo;
        record.doppler_count_interval = self.cfg.doppler_count_interval;
        record.signal_paths = paths.to_vec();

        if request.with_media_correction {
            let qa = media_qa(&paths[0]);
            if !qa.is_ok() {
                warn!(
                    "{} ({}) - media corrections out of range: iono={:.6} km tropo={:.6} km",
                    epoch, name, qa.iono_km, qa.tropo_km
                );
            }
            record.media_qa = Some(qa);
        }

        let sigmas = vec![self.cfg.error_model.noise_sigma; record.value.len()];
        record.covariance = diagonal_covariance(&sigmas);

        self.record = Some(record.clone());
        Ok(record)
    }

    /// Computes the range: path length scaled by the multiplier, then
    /// noise (resampled until positive) and bias, unless range only.
    pub fn calculate_range(&mut self, request: &SignalRequest) -> Result<&MeasurementRecord, Error> {
        let mut record = self.evaluate(request)?;
        let multiplier = self.cfg.multiplier();

        record.value.iter_mut().for_each(|v| *v *= multiplier);
        record.iono_correction = multiplier * iono_km(&record, 0);
        record.tropo_correction = multiplier * tropo_km(&record, 0);

        self.apply_error_model(&mut record, NoisePolicy::Positive)?;
        Ok(self.record.insert(record))
    }

    /// Adds noise then bias, unless range only
    pub(crate) fn apply_error_model(
        &mut self,
        record: &mut MeasurementRecord,
        policy: NoisePolicy,
    ) -> Result<(), Error> {
        if self.cfg.range_only {
            return Ok(());
        }

        let sigma = self.cfg.error_model.noise_sigma;

        if self.cfg.add_noise {
            match policy {
                NoisePolicy::Positive => {
                    for value in record.value.iter_mut() {
                        *value = self.noise.positive_gaussian(*value, sigma)?;
                    }
                },
                NoisePolicy::Additive => {
                    if !record.feasibility.is_rejected() {
                        for value in record.value.iter_mut() {
                            *value = self.noise.gaussian(*value, sigma);
                        }
                    }
                },
            }
        }

        if self.cfg.add_bias {
            let bias = self.cfg.error_model.bias;
            record.value.iter_mut().for_each(|v| *v += bias);
        }

        Ok(())
    }

    /// Recomputes leg frequencies and media corrections of path `path`
    /// for a new uplink frequency (MHz). Returns the updated
    /// full path length (km), also stored in the latest record.
    pub fn recalculate_frequency_and_media(
        &mut self,
        path: usize,
        uplink_mhz: f64,
        request: &SignalRequest,
    ) -> Result<f64, Error> {
        let model = self.model_mut()?;
        model.recalculate_frequency_and_media(path, uplink_mhz, request.ramp_table)?;

        let updated = model
            .signal_paths()
            .get(path)
            .cloned()
            .ok_or(Error::NoSignalPath)?;

        let length_km = updated.path_length_km();

        if let Some(record) = self.record.as_mut() {
            if let Some(value) = record.value.get_mut(path) {
                *value = length_km;
            }
            if let Some(snapshot) = record.signal_paths.get_mut(path) {
                *snapshot = updated;
            }
        }

        Ok(length_km)
    }
}

/// Ionospheric path delay of path `path` of this record (km)
pub(crate) fn iono_km(record: &MeasurementRecord, path: usize) -> f64 {
    record
        .signal_paths
        .get(path)
        .map(|p| p.correction_km(&CorrectionId::Ionosphere))
        .unwrap_or_default()
}

/// Tropospheric path delay of path `path` of this record (km)
pub(crate) fn tropo_km(record: &MeasurementRecord, path: usize) -> f64 {
    record
        .signal_paths
        .get(path)
        .map(|p| p.correction_km(&CorrectionId::Troposphere))
        .unwrap_or_default()
}

/// Resolves a ramped frequency integration for path `path`.
/// Fatal failures are returned. Degraded failures reject the
/// measurement (value zeroed, reason "R") and return None.
pub(crate) fn resolve_ramp(
    record: &mut MeasurementRecord,
    path: usize,
    name: &str,
    integral: Result<f64, RampError>,
) -> Result<Option<f64>, Error> {
    match integral {
        Ok(value) => Ok(Some(value)),
        Err(e) => match e.severity() {
            Severity::Fatal => {
                error!("{} ({}) - {}", record.epoch, name, e);
                Err(e.into())
            },
            Severity::Degraded => {
                warn!("{} ({}) - rejected: {}", record.epoch, name, e);
                if let Some(value) = record.value.get_mut(path) {
                    *value = 0.0;
                }
                record.feasibility = Feasibility::Rejected;
                Ok(None)
            },
        },
    }
}

fn media_qa(path: &SignalPath) -> MediaQa {
    let iono_km = path.correction_km(&CorrectionId::Ionosphere);
    let tropo_km = path.correction_km(&CorrectionId::Troposphere);
    MediaQa {
        iono_km,
        tropo_km,
        iono_out_of_range: !(0.0..=IONO_CORRECTION_MAX_KM).contains(&iono_km),
        tropo_out_of_range: !(0.0..=TROPO_CORRECTION_MAX_KM).contains(&tropo_km),
    }
}

/// Range derivatives of a record, one row per path:
/// bias derivatives are unity for our own measurement type,
/// state derivatives are the path length partials scaled by `factor`
/// (spacecraft targets) and other parameters have no influence.
pub(crate) fn scaled_range_derivatives(
    record: &MeasurementRecord,
    target: &DerivativeTarget,
    factor: f64,
    station_factor: f64,
) -> Result<DMatrix<f64>, Error> {
    let rows = record.value.len();
    match &target.parameter {
        EstimationParameter::Bias(measurement_type) => Ok(bias_derivatives(
            rows,
            *measurement_type,
            record.measurement_type,
        )),
        parameter if parameter.is_state() => {
            let (partials, found) = range_partials(&record.signal_paths, target);
            if !found {
                return Err(Error::NotAParticipant(target.object.clone()));
            }
            let factor = if target.is_spacecraft() {
                factor
            } else {
                station_factor
            };
            Ok(partials * factor)
        },
        parameter => Ok(DMatrix::zeros(rows, parameter.size())),
    }
}

/// Bias derivatives: unity when the bias belongs to this measurement type
pub(crate) fn bias_derivatives(
    rows: usize,
    bias_type: MeasurementType,
    measurement_type: MeasurementType,
) -> DMatrix<f64> {
    let value = if bias_type == measurement_type {
        1.0
    } else {
        0.0
    };
    DMatrix::from_element(rows, 1, value)
}

/// Two way range ("Range"), in km.
#[derive(Debug, Clone, Default)]
pub struct RangeKm {}

impl ObservableTransform for RangeKm {
    fn compute_value(
        &mut self,
        base: &mut RangeAdapter,
        inputs: &MeasurementInputs,
    ) -> Result<MeasurementRecord, Error> {
        let request = base.request(inputs);
        Ok(base.calculate_range(&request)?.clone())
    }

    fn compute_derivative(
        &self,
        base: &RangeAdapter,
        record: &MeasurementRecord,
        target: &DerivativeTarget,
    ) -> Result<DMatrix<f64>, Error> {
        let multiplier = base.config().multiplier();
        scaled_range_derivatives(record, target, multiplier, 1.0)
    }
}
