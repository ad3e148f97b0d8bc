//! Tracking configuration and adapter factory
use log::{debug, info};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    adapter::TrackingAdapter,
    cfg::{AdapterConfig, Error as ConfigError, ErrorModel, MeasurementType, TdrsConfig},
    error::Error,
    signal::SignalPathModel,
};

/// One tracking declaration: a participant strand and the
/// measurement types computed along it.
/// Parsed from `{GS1,SC1,GS1}Range` style declarations,
/// several types being comma separated.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TrackingConfig {
    /// Participants, in signal order
    pub strand: Vec<String>,
    /// [MeasurementType]s computed along this strand
    pub types: Vec<MeasurementType>,
}

impl std::fmt::Display for TrackingConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> Result<(), std::fmt::Error> {
        write!(f, "{{{}}}", self.strand.join(","))?;
        let types = self
            .types
            .iter()
            .map(|t| t.to_string())
            .collect::<Vec<_>>()
            .join(",");
        write!(f, "{}", types)
    }
}

impl std::str::FromStr for TrackingConfig {
    type Err = ConfigError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();

        let invalid = |reason: &str| ConfigError::InvalidStrand {
            strand: trimmed.to_string(),
            reason: reason.to_string(),
        };

        let body = trimmed
            .strip_prefix('{')
            .ok_or_else(|| invalid("missing opening brace"))?;

        let (participants, types) = body
            .split_once('}')
            .ok_or_else(|| invalid("missing closing brace"))?;

        let strand = participants
            .split(',')
            .map(|p| p.trim().to_string())
            .collect::<Vec<_>>();

        if strand.iter().any(|p| p.is_empty()) {
            return Err(invalid("empty participant"));
        }

        if strand.len() < 2 {
            return Err(invalid("at least two participants are required"));
        }

        let types = types
            .split(',')
            .filter(|t| !t.trim().is_empty())
            .map(|t| t.parse::<MeasurementType>())
            .collect::<Result<Vec<_>, _>>()?;

        if types.is_empty() {
            return Err(invalid("no measurement type"));
        }

        Ok(Self { strand, types })
    }
}

fn default_light_time() -> bool {
    true
}

fn default_range_modulo() -> f64 {
    1.0E18
}

fn default_doppler_count_interval() -> f64 {
    1.0
}

/// Set of tracking declarations sharing the same settings
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TrackingConfigurationSet {
    /// Name of this set, prefix of every adapter name
    pub name: String,
    /// Tracking declarations
    pub tracking: Vec<TrackingConfig>,
    /// Solve light time
    #[cfg_attr(feature = "serde", serde(default = "default_light_time"))]
    pub with_light_time: bool,
    /// Apply media corrections
    #[cfg_attr(feature = "serde", serde(default))]
    pub with_media_correction: bool,
    /// Range modulo constant (RU), for sequential range
    #[cfg_attr(feature = "serde", serde(default = "default_range_modulo"))]
    pub range_modulo: f64,
    /// Doppler count interval (s), for Doppler measurements
    #[cfg_attr(feature = "serde", serde(default = "default_doppler_count_interval"))]
    pub doppler_count_interval: f64,
    /// Relay settings
    #[cfg_attr(feature = "serde", serde(default))]
    pub tdrs: TdrsConfig,
    /// Light time corrections the signal path models should apply
    /// ("Relativity", "ETminusTAI", "Aberration")
    #[cfg_attr(feature = "serde", serde(default))]
    pub corrections: Vec<String>,
    /// [ErrorModel] per [MeasurementType]
    #[cfg_attr(feature = "serde", serde(default))]
    pub error_models: Vec<(MeasurementType, ErrorModel)>,
    /// Add noise to simulated measurements
    #[cfg_attr(feature = "serde", serde(default))]
    pub add_noise: bool,
    /// Noise seed. Each adapter derives its own from it.
    #[cfg_attr(feature = "serde", serde(default))]
    pub noise_seed: Option<u64>,
}

impl TrackingConfigurationSet {
    /// New empty [TrackingConfigurationSet]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            tracking: Vec::new(),
            with_light_time: default_light_time(),
            with_media_correction: false,
            range_modulo: default_range_modulo(),
            doppler_count_interval: default_doppler_count_interval(),
            tdrs: TdrsConfig::default(),
            corrections: Vec::new(),
            error_models: Vec::new(),
            add_noise: false,
            noise_seed: None,
        }
    }

    /// Copies and returns with one more tracking declaration
    pub fn with_tracking(&self, declaration: &str) -> Result<Self, ConfigError> {
        let mut s = self.clone();
        s.tracking.push(declaration.parse()?);
        Ok(s)
    }

    /// Copies and returns with an [ErrorModel] for this [MeasurementType]
    pub fn with_error_model(&self, measurement_type: MeasurementType, model: ErrorModel) -> Self {
        let mut s = self.clone();
        s.error_models.retain(|(t, _)| *t != measurement_type);
        s.error_models.push((measurement_type, model));
        s
    }

    /// [ErrorModel] of this [MeasurementType]
    pub fn error_model(&self, measurement_type: MeasurementType) -> ErrorModel {
        self.error_models
            .iter()
            .find(|(t, _)| *t == measurement_type)
            .map(|(_, model)| *model)
            .unwrap_or_default()
    }

    /// [AdapterConfig] of one adapter of this set
    fn adapter_config(&self, measurement_type: MeasurementType, index: u64) -> AdapterConfig {
        let mut cfg = AdapterConfig::new(measurement_type)
            .with_error_model(self.error_model(measurement_type))
            .with_media_correction(self.with_media_correction);

        if measurement_type.is_relay() {
            cfg.tdrs = self.tdrs.clone();
        }

        cfg.with_light_time = self.with_light_time;
        cfg.add_noise = self.add_noise;
        cfg.noise_seed = self.noise_seed.map(|seed| seed.wrapping_add(index));

        if measurement_type.is_doppler() {
            cfg.doppler_count_interval = self.doppler_count_interval;
        }

        if measurement_type == MeasurementType::DsnRange {
            cfg.range_modulo = self.range_modulo;
        }

        cfg
    }
}

/// Builds the [SignalPathModel] of a participant strand.
/// Implemented by the light time solver owner.
pub trait SignalPathProvider {
    fn model_for(
        &self,
        strand: &[String],
        set: &TrackingConfigurationSet,
    ) -> Result<Box<dyn SignalPathModel>, Error>;
}

/// Builds every [TrackingAdapter] of a [TrackingConfigurationSet]
#[derive(Debug, Default)]
pub struct AdapterFactory {}

impl AdapterFactory {
    /// Builds and initializes the adapters of this set: one per
    /// declared (strand, type) couple, named `{set}_{participants}_{type}`.
    pub fn build(
        set: &TrackingConfigurationSet,
        provider: &dyn SignalPathProvider,
    ) -> Result<Vec<TrackingAdapter>, Error> {
        let mut adapters = Vec::new();

        for declaration in set.tracking.iter() {
            for measurement_type in declaration.types.iter() {
                let name = format!(
                    "{}_{}_{}",
                    set.name,
                    declaration.strand.join("_"),
                    measurement_type
                );

                let cfg = set.adapter_config(*measurement_type, adapters.len() as u64);
                cfg.validate()?;

                let mut adapter = TrackingAdapter::new(&name, cfg);

                if *measurement_type == MeasurementType::TdrsDoppler {
                    let strand = &declaration.strand;
                    if strand.len() != 5 {
                        return Err(ConfigError::InvalidStrand {
                            strand: declaration.to_string(),
                            reason: format!(
                                "relay doppler requires 5 participants (got {})",
                                strand.len()
                            ),
                        }
                        .into());
                    }

                    let short = [strand[0].clone(), strand[3].clone(), strand[4].clone()];
                    adapter.set_short_path_model(provider.model_for(&short, set)?)?;
                }

                adapter.set_model(provider.model_for(&declaration.strand, set)?);
                adapter.initialize()?;

                debug!("{} - adapter ready ({})", name, declaration);
                adapters.push(adapter);
            }
        }

        info!("{} - {} tracking adapters", set.name, adapters.len());
        Ok(adapters)
    }
}
