use hifitime::Epoch;
use nalgebra::DMatrix;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    band::FrequencyBand,
    cfg::{MeasurementType, ServiceAccess},
    constants::DEFAULT_FEASIBILITY_VALUE_DEG,
    signal::SignalPath,
};

/// Measurement feasibility classification.
/// [std::fmt::Display] gives the tracking data reason code.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Feasibility {
    /// No participant classified the measurement (reason "")
    #[default]
    Unknown,
    /// Nominal, visible from a station (reason "N")
    Nominal,
    /// Signal blocked on leg `leg` (1-based). `detail` carries the
    /// solver description followed by sub path role tags.
    Blocked { leg: usize, detail: String },
    /// Rejected after a numerical failure (reason "R")
    Rejected,
}

impl std::fmt::Display for Feasibility {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> Result<(), std::fmt::Error> {
        match self {
            Self::Unknown => Ok(()),
            Self::Nominal => write!(f, "N"),
            Self::Blocked { leg, detail } => write!(f, "B{}{}", leg, detail),
            Self::Rejected => write!(f, "R"),
        }
    }
}

impl Feasibility {
    pub fn is_feasible(&self) -> bool {
        matches!(self, Self::Nominal)
    }

    pub fn is_blocked(&self) -> bool {
        matches!(self, Self::Blocked { .. })
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected)
    }

    /// Copies and returns with a role tag ("E", "S", "EL"..)
    /// appended to a blocked reason. Other reasons are unchanged.
    pub fn tagged(&self, tag: &str) -> Self {
        match self {
            Self::Blocked { leg, detail } => Self::Blocked {
                leg: *leg,
                detail: format!("{}{}", detail, tag),
            },
            other => other.clone(),
        }
    }
}

/// Relay (TDRS) metadata attached to relay measurements
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TdrsMetadata {
    pub service_access: ServiceAccess,
    /// Node 4 frequency (Hz)
    pub node4_frequency_hz: f64,
    pub node4_band: FrequencyBand,
    pub smar_id: i32,
    pub data_flag: i32,
}

/// Media correction quality assessment
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MediaQa {
    /// Raw ionospheric path delay (km)
    pub iono_km: f64,
    /// Raw tropospheric path delay (km)
    pub tropo_km: f64,
    /// Ionospheric delay outside its expected range
    pub iono_out_of_range: bool,
    /// Tropospheric delay outside its expected range
    pub tropo_out_of_range: bool,
}

impl MediaQa {
    pub fn is_ok(&self) -> bool {
        !self.iono_out_of_range && !self.tropo_out_of_range
    }
}

/// Computed measurement
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MeasurementRecord {
    pub measurement_type: MeasurementType,
    /// Measurement [Epoch]
    pub epoch: Epoch,
    /// One value per signal path
    pub value: Vec<f64>,
    pub feasibility: Feasibility,
    /// Feasibility value (elevation angle, deg)
    pub feasibility_value: f64,
    /// Uplink frequency at transmission (Hz)
    pub uplink_frequency_hz: f64,
    /// Uplink frequency at reception (Hz)
    pub uplink_frequency_at_receive_hz: f64,
    pub uplink_band: FrequencyBand,
    /// Range modulo constant (RU)
    pub range_modulo: f64,
    /// Doppler count interval (s)
    pub doppler_count_interval: f64,
    /// Relay metadata
    pub tdrs: Option<TdrsMetadata>,
    /// Measurement error covariance
    pub covariance: DMatrix<f64>,
    /// Ionospheric correction, in measurement unit
    pub iono_correction: f64,
    /// Tropospheric correction, in measurement unit
    pub tropo_correction: f64,
    pub media_qa: Option<MediaQa>,
    /// Snapshot of the signal paths this measurement was computed from
    pub signal_paths: Vec<SignalPath>,
}

impl Default for MeasurementRecord {
    fn default() -> Self {
        Self::new(MeasurementType::default(), Epoch::default(), 0)
    }
}

impl MeasurementRecord {
    /// New (infeasible, zero valued) [MeasurementRecord] for `paths` signal paths
    pub fn new(measurement_type: MeasurementType, epoch: Epoch, paths: usize) -> Self {
        Self {
            measurement_type,
            epoch,
            value: vec![0.0; paths],
            feasibility: Feasibility::Unknown,
            feasibility_value: DEFAULT_FEASIBILITY_VALUE_DEG,
            uplink_frequency_hz: 0.0,
            uplink_frequency_at_receive_hz: 0.0,
            uplink_band: FrequencyBand::Unspecified,
            range_modulo: 0.0,
            doppler_count_interval: 0.0,
            tdrs: None,
            covariance: DMatrix::identity(paths, paths),
            iono_correction: 0.0,
            tropo_correction: 0.0,
            media_qa: None,
            signal_paths: Vec::with_capacity(paths),
        }
    }

    pub fn is_feasible(&self) -> bool {
        self.feasibility.is_feasible()
    }

    /// Tracking data reason code
    pub fn reason(&self) -> String {
        self.feasibility.to_string()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn reason_codes() {
        assert_eq!(Feasibility::Unknown.to_string(), "");
        assert_eq!(Feasibility::Nominal.to_string(), "N");
        assert_eq!(Feasibility::Rejected.to_string(), "R");

        let blocked = Feasibility::Blocked {
            leg: 2,
            detail: "Earth".to_string(),
        };
        assert_eq!(blocked.to_string(), "B2Earth");
        assert_eq!(blocked.tagged("E").to_string(), "B2EarthE");
        assert_eq!(Feasibility::Nominal.tagged("E"), Feasibility::Nominal);
        assert!(!blocked.is_feasible());
        assert!(Feasibility::Nominal.is_feasible());
        assert!(!Feasibility::Unknown.is_feasible());
    }
}
