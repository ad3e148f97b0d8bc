//! Tracking measurement adapters.
//!
//! A [TrackingAdapter] turns the signal paths solved by a
//! [SignalPathModel] into one observable ([MeasurementRecord])
//! and its partial derivatives. The shared path length computation
//! lives in [RangeAdapter]; each [MeasurementKind] composes it with
//! its own [ObservableTransform].
use log::{debug, error};
use nalgebra::DMatrix;

use crate::{
    cfg::{AdapterConfig, Error as ConfigError, MeasurementType},
    derivative::DerivativeTarget,
    error::Error,
    measurement::MeasurementRecord,
    observation::ObservationData,
    ramp::RampTable,
    signal::SignalPathModel,
};

mod doppler;
mod dsn_range;
mod range;
mod range_rate;
mod tdrs;
mod tdrs_range;
mod usn_range;

pub use doppler::{path_magnitude_delta, Doppler, DopplerFlavor};
pub use dsn_range::DsnRange;
pub use range::{RangeAdapter, RangeKm};
pub use range_rate::{PointRangeRate, RangeRate};
pub use tdrs::{pilot_frequency_mhz, RelayPath, TdrsDoppler};
pub use tdrs_range::TdrsRange;
pub use usn_range::UsnRange;

/// Inputs of one measurement computation
#[derive(Debug, Clone, Copy, Default)]
pub struct MeasurementInputs<'a> {
    /// Solve light time
    pub with_light_time: bool,
    /// Observation to compute the measurement for (estimation).
    /// None when simulating.
    pub observation: Option<&'a ObservationData>,
    /// Uplink ramp table
    pub ramp_table: Option<&'a RampTable>,
    /// Simulation run
    pub for_simulation: bool,
}

/// Observable specific computation, layered over the
/// path length computation of a [RangeAdapter].
pub trait ObservableTransform {
    /// Prepares the internal sub measurements, if any.
    fn initialize(&mut self, base: &RangeAdapter) -> Result<(), Error> {
        let _ = base;
        Ok(())
    }

    /// Computes the observable.
    fn compute_value(
        &mut self,
        base: &mut RangeAdapter,
        inputs: &MeasurementInputs,
    ) -> Result<MeasurementRecord, Error>;

    /// Partial derivatives of `record` with respect to `target`.
    /// One row per signal path, one column per scalar parameter.
    fn compute_derivative(
        &self,
        base: &RangeAdapter,
        record: &MeasurementRecord,
        target: &DerivativeTarget,
    ) -> Result<DMatrix<f64>, Error>;
}

/// Supported measurement kinds
#[derive(Debug, Clone)]
pub enum MeasurementKind {
    Range(RangeKm),
    DsnRange(DsnRange),
    UsnRange(UsnRange),
    TdrsRange(TdrsRange),
    Doppler(Doppler),
    TdrsDoppler(TdrsDoppler),
    RangeRate(RangeRate),
    PointRangeRate(PointRangeRate),
}

impl MeasurementKind {
    /// [MeasurementKind] computing this [MeasurementType]
    pub fn new(measurement_type: MeasurementType) -> Self {
        match measurement_type {
            MeasurementType::Range => Self::Range(RangeKm::default()),
            MeasurementType::DsnRange => Self::DsnRange(DsnRange::default()),
            MeasurementType::UsnRange => Self::UsnRange(UsnRange::default()),
            MeasurementType::TdrsRange => Self::TdrsRange(TdrsRange::default()),
            MeasurementType::DsnDoppler => Self::Doppler(Doppler::new(DopplerFlavor::Dsn)),
            MeasurementType::GnDoppler => {
                Self::Doppler(Doppler::new(DopplerFlavor::GroundNetwork))
            },
            MeasurementType::TdrsDoppler => Self::TdrsDoppler(TdrsDoppler::default()),
            MeasurementType::RangeRate => Self::RangeRate(RangeRate::default()),
            MeasurementType::PointRangeRate => Self::PointRangeRate(PointRangeRate::default()),
        }
    }

    fn transform(&self) -> &dyn ObservableTransform {
        match self {
            Self::Range(t) => t,
            Self::DsnRange(t) => t,
            Self::UsnRange(t) => t,
            Self::TdrsRange(t) => t,
            Self::Doppler(t) => t,
            Self::TdrsDoppler(t) => t,
            Self::RangeRate(t) => t,
            Self::PointRangeRate(t) => t,
        }
    }

    fn transform_mut(&mut self) -> &mut dyn ObservableTransform {
        match self {
            Self::Range(t) => t,
            Self::DsnRange(t) => t,
            Self::UsnRange(t) => t,
            Self::TdrsRange(t) => t,
            Self::Doppler(t) => t,
            Self::TdrsDoppler(t) => t,
            Self::RangeRate(t) => t,
            Self::PointRangeRate(t) => t,
        }
    }
}

/// Tracking measurement adapter: computes one [MeasurementType]
/// and its derivatives from the signal paths of its [SignalPathModel].
///
/// ```
/// use tracking_observables::prelude::*;
///
/// let cfg = AdapterConfig::new(MeasurementType::DsnRange);
/// let mut adapter = TrackingAdapter::new("GS1_SC1_DSN_SeqRange", cfg);
///
/// adapter.set_range_modulo(1.0E6)
///     .unwrap();
///
/// assert_eq!(adapter.range_modulo(), 1.0E6);
/// assert!(adapter.set_range_modulo(0.0).is_err());
/// ```
#[derive(Debug, Clone)]
pub struct TrackingAdapter {
    base: RangeAdapter,
    kind: MeasurementKind,
    measurement: Option<MeasurementRecord>,
    derivatives: DMatrix<f64>,
    initialized: bool,
}

impl TrackingAdapter {
    /// Builds a new [TrackingAdapter] for the [MeasurementType] of this [AdapterConfig].
    /// Attach a [SignalPathModel] with [Self::with_model] before computing.
    pub fn new(name: &str, cfg: AdapterConfig) -> Self {
        let kind = MeasurementKind::new(cfg.measurement_type);
        Self {
            base: RangeAdapter::new(name, cfg),
            kind,
            measurement: None,
            derivatives: DMatrix::zeros(0, 0),
            initialized: false,
        }
    }

    /// Copies and returns with a [SignalPathModel] attached
    pub fn with_model(&self, model: Box<dyn SignalPathModel>) -> Self {
        let mut s = self.clone();
        s.set_model(model);
        s
    }

    pub fn set_model(&mut self, model: Box<dyn SignalPathModel>) {
        self.base.set_model(model);
        self.initialized = false;
    }

    /// Attaches the relay pilot (short) path model of a relay Doppler adapter.
    pub fn set_short_path_model(&mut self, model: Box<dyn SignalPathModel>) -> Result<(), Error> {
        match &mut self.kind {
            MeasurementKind::TdrsDoppler(tdrs) => {
                tdrs.set_short_path_model(model);
                self.initialized = false;
                Ok(())
            },
            _ => Err(ConfigError::Topology(format!(
                "\"{}\" does not use a relay pilot path",
                self.base.name()
            ))
            .into()),
        }
    }

    pub fn name(&self) -> &str {
        self.base.name()
    }

    pub fn measurement_type(&self) -> MeasurementType {
        self.base.config().measurement_type
    }

    pub fn config(&self) -> &AdapterConfig {
        self.base.config()
    }

    pub fn kind(&self) -> &MeasurementKind {
        &self.kind
    }

    /// Latest computed [MeasurementRecord]
    pub fn measurement(&self) -> Option<&MeasurementRecord> {
        self.measurement.as_ref()
    }

    /// Latest computed derivatives
    pub fn derivatives(&self) -> &DMatrix<f64> {
        &self.derivatives
    }

    /// Validates the configuration and sets up the internal
    /// sub measurements. Invoked on first computation otherwise.
    pub fn initialize(&mut self) -> Result<(), Error> {
        self.base.config().validate()?;

        if !self.base.has_model() {
            return Err(Error::MissingSignalPath(self.base.name().to_string()));
        }

        self.kind.transform_mut().initialize(&self.base)?;
        self.initialized = true;
        Ok(())
    }

    /// Computes the measurement.
    /// - with_light_time: solve light time, when [AdapterConfig] allows it
    /// - observation: observation to compute for (estimation), None when simulating
    /// - ramp_table: uplink ramp table
    /// - for_simulation: simulation run
    pub fn calculate_measurement(
        &mut self,
        with_light_time: bool,
        observation: Option<&ObservationData>,
        ramp_table: Option<&RampTable>,
        for_simulation: bool,
    ) -> Result<&MeasurementRecord, Error> {
        if !self.initialized {
            self.initialize()?;
        }

        let inputs = MeasurementInputs {
            with_light_time,
            observation,
            ramp_table,
            for_simulation,
        };

        let record = match self.kind.transform_mut().compute_value(&mut self.base, &inputs) {
            Ok(record) => record,
            Err(e) => {
                error!("{} - measurement failed: {}", self.base.name(), e);
                return Err(e);
            },
        };

        debug!(
            "{} ({}) - {} value={:?} [{}]",
            record.epoch,
            self.base.name(),
            record.measurement_type,
            record.value,
            record.reason()
        );

        Ok(self.measurement.insert(record))
    }

    /// Computes the partial derivatives of the latest measurement
    /// with respect to `target`.
    pub fn calculate_measurement_derivatives(
        &mut self,
        target: &DerivativeTarget,
    ) -> Result<&DMatrix<f64>, Error> {
        if !self.base.has_model() {
            return Err(Error::MissingSignalPath(self.base.name().to_string()));
        }

        let record = self
            .measurement
            .as_ref()
            .ok_or_else(|| Error::MissingMeasurement(self.base.name().to_string()))?;

        let derivatives = self
            .kind
            .transform()
            .compute_derivative(&self.base, record, target)?;

        if derivatives.nrows() != record.value.len() {
            return Err(Error::DerivativeDimension {
                expected: record.value.len(),
                got: derivatives.nrows(),
            });
        }

        if derivatives.ncols() != target.parameter.size() {
            return Err(Error::DerivativeDimension {
                expected: target.parameter.size(),
                got: derivatives.ncols(),
            });
        }

        self.derivatives = derivatives;
        Ok(&self.derivatives)
    }

    pub fn set_range_modulo(&mut self, range_modulo: f64) -> Result<(), Error> {
        self.base.config_mut().set_range_modulo(range_modulo)?;
        Ok(())
    }

    pub fn range_modulo(&self) -> f64 {
        self.base.config().range_modulo
    }

    pub fn set_doppler_count_interval(&mut self, interval_s: f64) -> Result<(), Error> {
        self.base.config_mut().set_doppler_count_interval(interval_s)?;
        self.initialized = false;
        Ok(())
    }

    pub fn doppler_count_interval(&self) -> f64 {
        self.base.config().doppler_count_interval
    }

    pub fn set_real_parameter(&mut self, label: &str, value: f64) -> Result<(), Error> {
        self.base.config_mut().set_real_parameter(label, value)?;
        self.initialized = false;
        Ok(())
    }

    pub fn real_parameter(&self, label: &str) -> Result<f64, Error> {
        Ok(self.base.config().get_real_parameter(label)?)
    }

    pub fn set_integer_parameter(&mut self, label: &str, value: i32) -> Result<(), Error> {
        self.base.config_mut().set_integer_parameter(label, value)?;
        self.initialized = false;
        Ok(())
    }

    pub fn integer_parameter(&self, label: &str) -> Result<i32, Error> {
        Ok(self.base.config().get_integer_parameter(label)?)
    }

    pub fn set_boolean_parameter(&mut self, label: &str, value: bool) -> Result<(), Error> {
        self.base.config_mut().set_boolean_parameter(label, value)?;
        self.initialized = false;
        Ok(())
    }

    pub fn boolean_parameter(&self, label: &str) -> Result<bool, Error> {
        Ok(self.base.config().get_boolean_parameter(label)?)
    }

    pub fn set_string_parameter(&mut self, label: &str, value: &str) -> Result<(), Error> {
        let measurement_type = self.measurement_type();
        self.base.config_mut().set_string_parameter(label, value)?;

        if self.measurement_type() != measurement_type {
            self.kind = MeasurementKind::new(self.measurement_type());
            self.measurement = None;
        }

        self.initialized = false;
        Ok(())
    }

    pub fn string_parameter(&self, label: &str) -> Result<String, Error> {
        Ok(self.base.config().get_string_parameter(label)?)
    }

    pub fn string_array_parameter(&self, label: &str) -> Result<Vec<String>, Error> {
        Ok(self.base.config().get_string_array_parameter(label)?)
    }
}
