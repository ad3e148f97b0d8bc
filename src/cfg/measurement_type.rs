#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{cfg::Error, constants::TWO_WAY_RANGE_MULTIPLIER};

/// Tracking measurement type, as named in tracking configurations
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum MeasurementType {
    /// Two way range, in km ("Range")
    #[default]
    Range,
    /// DSN sequential range, in range units ("DSN_SeqRange")
    DsnRange,
    /// DSN total count phase Doppler, in Hz ("DSN_TCP")
    DsnDoppler,
    /// Ground network Doppler, as range rate in km/s ("RangeRate")
    GnDoppler,
    /// Space network (relay) range, in km ("SN_Range")
    TdrsRange,
    /// Space network (relay) Doppler, in Hz ("SN_Doppler")
    TdrsDoppler,
    /// Universal space network range, in km ("USN_Range")
    UsnRange,
    /// Differenced two way range rate, in km/s ("RangeRateKps")
    RangeRate,
    /// Instantaneous range rate, in km/s ("PointRangeRate")
    PointRangeRate,
}

impl std::fmt::Display for MeasurementType {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> Result<(), std::fmt::Error> {
        match self {
            Self::Range => write!(f, "Range"),
            Self::DsnRange => write!(f, "DSN_SeqRange"),
            Self::DsnDoppler => write!(f, "DSN_TCP"),
            Self::GnDoppler => write!(f, "RangeRate"),
            Self::TdrsRange => write!(f, "SN_Range"),
            Self::TdrsDoppler => write!(f, "SN_Doppler"),
            Self::UsnRange => write!(f, "USN_Range"),
            Self::RangeRate => write!(f, "RangeRateKps"),
            Self::PointRangeRate => write!(f, "PointRangeRate"),
        }
    }
}

impl std::str::FromStr for MeasurementType {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().to_lowercase();
        match trimmed.as_str() {
            "range" => Ok(Self::Range),
            "dsn_seqrange" => Ok(Self::DsnRange),
            "dsn_tcp" => Ok(Self::DsnDoppler),
            "rangerate" => Ok(Self::GnDoppler),
            "sn_range" => Ok(Self::TdrsRange),
            "sn_doppler" => Ok(Self::TdrsDoppler),
            "usn_range" => Ok(Self::UsnRange),
            "rangeratekps" => Ok(Self::RangeRate),
            "pointrangerate" => Ok(Self::PointRangeRate),
            _ => Err(Error::UnknownMeasurementType(s.to_string())),
        }
    }
}

impl MeasurementType {
    /// Scaling applied to the total signal path length.
    /// Two way ranges are reported as one way ranges.
    pub fn default_multiplier(&self) -> f64 {
        match self {
            Self::Range | Self::UsnRange | Self::TdrsRange => TWO_WAY_RANGE_MULTIPLIER,
            _ => 1.0,
        }
    }

    /// Doppler types integrate over a count interval
    pub fn is_doppler(&self) -> bool {
        matches!(
            self,
            Self::DsnDoppler | Self::GnDoppler | Self::TdrsDoppler | Self::RangeRate
        )
    }

    /// Relay types require relay (TDRS) configuration
    pub fn is_relay(&self) -> bool {
        matches!(self, Self::TdrsRange | Self::TdrsDoppler)
    }
}
