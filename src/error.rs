use thiserror::Error;

use crate::{
    band::FrequencyBand,
    cfg::Error as ConfigError,
    ramp::RampError,
};

#[derive(Debug, PartialEq, Error)]
pub enum Error {
    /// Invalid or incomplete configuration. Always fatal.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Measurement or derivatives requested before a signal path model
    /// was attached to the adapter.
    #[error("no signal path model attached to \"{0}\"")]
    MissingSignalPath(String),

    /// Derivatives requested before any measurement was computed.
    #[error("derivatives requested for \"{0}\" before the measurement was computed")]
    MissingMeasurement(String),

    /// Ramped frequency integration failed in a way that
    /// cannot be recovered locally.
    #[error("ramped frequency integration: {0}")]
    Ramp(RampError),

    /// The signal path model did not produce any path.
    #[error("signal path model returned no signal path")]
    NoSignalPath,

    /// Frequency cannot be associated to a supported band.
    #[error("no frequency band for {frequency_hz} Hz")]
    UnknownFrequencyBand { frequency_hz: f64 },

    /// Ramped measurements only support S and X band turnaround.
    #[error("no transponder turnaround ratio for {0} band")]
    TurnaroundBand(FrequencyBand),

    /// Sub measurement derivatives do not line up.
    #[error("derivative dimension mismatch: expected {expected}, got {got}")]
    DerivativeDimension { expected: usize, got: usize },

    /// Derivatives with respect to station location are not supported
    /// by this measurement.
    #[error("derivatives w.r.t. station location are not supported")]
    StationDerivative,

    /// Derivative requested for an object that takes no part in the signal path.
    #[error("\"{0}\" is neither transmitter nor receiver of any signal leg")]
    NotAParticipant(String),

    /// No strictly positive noisy range could be drawn.
    #[error("no positive sample of N({mean}, {sigma}) after {draws} draws")]
    NonPositiveNoise { mean: f64, sigma: f64, draws: usize },

    /// Failure reported by the signal path model (light time solver).
    #[error("signal path solver: {0}")]
    SignalSolver(String),
}

impl From<RampError> for Error {
    fn from(e: RampError) -> Self {
        Self::Ramp(e)
    }
}
