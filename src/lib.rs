#![doc = include_str!("../README.md")]
#![cfg_attr(docrs, feature(doc_cfg))]

// private modules
mod adapter;
mod band;
mod constants;
mod derivative;
mod error;
mod factory;
mod measurement;
mod noise;
mod observation;
mod ramp;
mod signal;

// public modules
pub mod cfg;

#[cfg(test)]
mod tests;

// prelude
pub mod prelude {
    pub use crate::adapter::{
        path_magnitude_delta, pilot_frequency_mhz, Doppler, DopplerFlavor, DsnRange,
        MeasurementInputs, MeasurementKind, ObservableTransform, PointRangeRate, RangeAdapter,
        RangeKm, RangeRate, RelayPath, TdrsDoppler, TdrsRange, TrackingAdapter, UsnRange,
    };
    pub use crate::band::FrequencyBand;
    pub use crate::cfg::{
        AdapterConfig, ErrorModel, MeasurementType, NoiseModel, Parameter, ServiceAccess,
        TdrsConfig,
    };
    pub use crate::constants::*;
    pub use crate::derivative::{DerivativeTarget, EstimationParameter, ObjectKind};
    pub use crate::error::Error;
    pub use crate::factory::{
        AdapterFactory, SignalPathProvider, TrackingConfig, TrackingConfigurationSet,
    };
    pub use crate::measurement::{Feasibility, MeasurementRecord, MediaQa, TdrsMetadata};
    pub use crate::noise::NoiseGenerator;
    pub use crate::observation::ObservationData;
    pub use crate::ramp::{RampError, RampRecord, RampTable, RampType, Severity};
    pub use crate::signal::{
        Correction, CorrectionId, CorrectionKind, LegStatus, Node, NodeKind, SignalLegData,
        SignalPath, SignalPathModel, SignalRequest,
    };
    // re-export
    pub use hifitime::{Duration, Epoch, TimeScale, Unit};
    pub use nalgebra::{DMatrix, Matrix3, Matrix6, Vector3};
}

// pub export
pub use error::Error;
