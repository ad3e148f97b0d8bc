use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

mod measurement_type;
mod parameter;
mod service;

pub use measurement_type::MeasurementType;
pub use parameter::Parameter;
pub use service::{ServiceAccess, TdrsConfig};

use crate::band::FrequencyBand;

/// Configuration Error
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("range modulo constant has a nonpositive value ({0})")]
    NonPositiveRangeModulo(f64),

    #[error("doppler count interval has a nonpositive value ({0})")]
    NonPositiveDopplerCountInterval(f64),

    #[error("noise sigma must be non negative ({0})")]
    NegativeNoiseSigma(f64),

    #[error("unknown error model \"{0}\"")]
    UnknownErrorModel(String),

    #[error("unknown measurement type \"{0}\"")]
    UnknownMeasurementType(String),

    #[error("unknown service access \"{0}\"")]
    UnknownServiceAccess(String),

    #[error("no pilot frequency for {service} service on {band} band (relay {tdrs_id})")]
    UnsupportedPilotFrequency {
        service: ServiceAccess,
        band: FrequencyBand,
        tdrs_id: String,
    },

    #[error("invalid relay data flag ({0})")]
    InvalidDataFlag(i32),

    #[error("relay service access list is empty")]
    EmptyServiceAccessList,

    #[error("unknown frequency band code {0}")]
    UnknownFrequencyBand(i32),

    #[error("unknown frequency band \"{0}\"")]
    UnknownFrequencyBandName(String),

    #[error("unknown parameter \"{0}\"")]
    UnknownParameter(String),

    #[error("parameter \"{0}\" does not accept this type")]
    ParameterType(String),

    #[error("invalid strand \"{strand}\": {reason}")]
    InvalidStrand { strand: String, reason: String },

    #[error("sub measurement was not set up")]
    MissingSubAdapter,

    #[error("signal path topology: {0}")]
    Topology(String),
}

/// Noise model
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum NoiseModel {
    /// Gaussian white noise of constant sigma
    #[default]
    RandomConstant,
}

impl std::fmt::Display for NoiseModel {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> Result<(), std::fmt::Error> {
        match self {
            Self::RandomConstant => write!(f, "RandomConstant"),
        }
    }
}

impl std::str::FromStr for NoiseModel {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // error model names are case sensitive
        match s {
            "RandomConstant" => Ok(Self::RandomConstant),
            _ => Err(Error::UnknownErrorModel(s.to_string())),
        }
    }
}

/// Measurement error model
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ErrorModel {
    /// [NoiseModel]
    #[cfg_attr(feature = "serde", serde(default))]
    pub noise_model: NoiseModel,
    /// Noise sigma, in measurement unit
    #[cfg_attr(feature = "serde", serde(default))]
    pub noise_sigma: f64,
    /// Constant bias, in measurement unit
    #[cfg_attr(feature = "serde", serde(default))]
    pub bias: f64,
}

impl ErrorModel {
    /// Copies and returns with new noise sigma
    pub fn with_noise_sigma(&self, noise_sigma: f64) -> Self {
        let mut s = *self;
        s.noise_sigma = noise_sigma;
        s
    }

    /// Copies and returns with new bias
    pub fn with_bias(&self, bias: f64) -> Self {
        let mut s = *self;
        s.bias = bias;
        s
    }
}

fn default_light_time() -> bool {
    true
}

fn default_media_correction() -> bool {
    false
}

fn default_range_modulo() -> f64 {
    1.0E18
}

fn default_doppler_count_interval() -> f64 {
    1.0
}

fn default_add_bias() -> bool {
    true
}

/// Tracking adapter configuration
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AdapterConfig {
    /// [MeasurementType] this adapter computes
    #[cfg_attr(feature = "serde", serde(default))]
    pub measurement_type: MeasurementType,
    /// Solve light time
    #[cfg_attr(feature = "serde", serde(default = "default_light_time"))]
    pub with_light_time: bool,
    /// Apply media corrections (iono, tropo)
    #[cfg_attr(feature = "serde", serde(default = "default_media_correction"))]
    pub with_media_correction: bool,
    /// Range modulo constant (RU)
    #[cfg_attr(feature = "serde", serde(default = "default_range_modulo"))]
    pub range_modulo: f64,
    /// Doppler count interval (s)
    #[cfg_attr(feature = "serde", serde(default = "default_doppler_count_interval"))]
    pub doppler_count_interval: f64,
    /// Path length multiplier. Defaults to the [MeasurementType] one.
    #[cfg_attr(feature = "serde", serde(default))]
    pub multiplier: Option<f64>,
    /// Add noise to computed measurements
    #[cfg_attr(feature = "serde", serde(default))]
    pub add_noise: bool,
    /// Add bias to computed measurements
    #[cfg_attr(feature = "serde", serde(default = "default_add_bias"))]
    pub add_bias: bool,
    /// Only compute the (unbiased, noiseless) range
    #[cfg_attr(feature = "serde", serde(default))]
    pub range_only: bool,
    /// [ErrorModel]
    #[cfg_attr(feature = "serde", serde(default))]
    pub error_model: ErrorModel,
    /// Difference Doppler paths with a Taylor series
    #[cfg_attr(feature = "serde", serde(default))]
    pub use_taylor_series: bool,
    /// Relay configuration
    #[cfg_attr(feature = "serde", serde(default))]
    pub tdrs: TdrsConfig,
    /// Noise generator seed. System entropy when missing.
    #[cfg_attr(feature = "serde", serde(default))]
    pub noise_seed: Option<u64>,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self::new(MeasurementType::default())
    }
}

impl AdapterConfig {
    /// Default [AdapterConfig] for this [MeasurementType]
    pub fn new(measurement_type: MeasurementType) -> Self {
        Self {
            measurement_type,
            with_light_time: default_light_time(),
            with_media_correction: default_media_correction(),
            range_modulo: default_range_modulo(),
            doppler_count_interval: default_doppler_count_interval(),
            multiplier: None,
            add_noise: false,
            add_bias: default_add_bias(),
            range_only: false,
            error_model: ErrorModel::default(),
            use_taylor_series: false,
            tdrs: TdrsConfig::default(),
            noise_seed: None,
        }
    }

    /// Verifies this [AdapterConfig]
    pub fn validate(&self) -> Result<(), Error> {
        if self.range_modulo <= 0.0 {
            return Err(Error::NonPositiveRangeModulo(self.range_modulo));
        }
        if self.doppler_count_interval <= 0.0 {
            return Err(Error::NonPositiveDopplerCountInterval(
                self.doppler_count_interval,
            ));
        }
        if self.error_model.noise_sigma < 0.0 {
            return Err(Error::NegativeNoiseSigma(self.error_model.noise_sigma));
        }
        Ok(())
    }

    /// Path length multiplier
    pub fn multiplier(&self) -> f64 {
        self.multiplier
            .unwrap_or(self.measurement_type.default_multiplier())
    }

    pub fn set_range_modulo(&mut self, range_modulo: f64) -> Result<(), Error> {
        if range_modulo <= 0.0 {
            return Err(Error::NonPositiveRangeModulo(range_modulo));
        }
        self.range_modulo = range_modulo;
        Ok(())
    }

    pub fn set_doppler_count_interval(&mut self, interval_s: f64) -> Result<(), Error> {
        if interval_s <= 0.0 {
            return Err(Error::NonPositiveDopplerCountInterval(interval_s));
        }
        self.doppler_count_interval = interval_s;
        Ok(())
    }

    pub fn set_noise_sigma(&mut self, noise_sigma: f64) -> Result<(), Error> {
        if noise_sigma < 0.0 {
            return Err(Error::NegativeNoiseSigma(noise_sigma));
        }
        self.error_model.noise_sigma = noise_sigma;
        Ok(())
    }

    /// Copies and returns with new [ErrorModel]
    pub fn with_error_model(&self, error_model: ErrorModel) -> Self {
        let mut s = self.clone();
        s.error_model = error_model;
        s
    }

    /// Copies and returns with noise generation and its seed
    pub fn with_noise(&self, seed: u64) -> Self {
        let mut s = self.clone();
        s.add_noise = true;
        s.noise_seed = Some(seed);
        s
    }

    /// Copies and returns with new [TdrsConfig]
    pub fn with_tdrs(&self, tdrs: TdrsConfig) -> Self {
        let mut s = self.clone();
        s.tdrs = tdrs;
        s
    }

    /// Copies and returns with light time solving enabled or disabled.
    /// Disabled, signal paths use instantaneous geometry.
    pub fn with_light_time(&self, enabled: bool) -> Self {
        let mut s = self.clone();
        s.with_light_time = enabled;
        s
    }

    /// Copies and returns with media corrections enabled or not
    pub fn with_media_correction(&self, enabled: bool) -> Self {
        let mut s = self.clone();
        s.with_media_correction = enabled;
        s
    }

    /// Copies and returns with Taylor series differencing enabled or not
    pub fn with_taylor_series(&self, enabled: bool) -> Self {
        let mut s = self.clone();
        s.use_taylor_series = enabled;
        s
    }

    /// Configuration of an internal sub measurement: full noiseless
    /// and unbiased path length, without media corrections when `media` is false.
    pub(crate) fn sub_measurement(&self, media: bool) -> Self {
        let mut s = self.clone();
        s.add_noise = false;
        s.add_bias = false;
        s.range_only = true;
        s.multiplier = Some(1.0);
        s.with_media_correction = media && self.with_media_correction;
        s
    }
}
