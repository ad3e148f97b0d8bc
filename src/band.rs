#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    cfg::Error as ConfigError,
    constants::{S_BAND_TURNAROUND_RATIO, X_BAND_TURNAROUND_RATIO},
    error::Error,
};

/// Uplink / relay frequency band, as coded in tracking data.
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Eq, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum FrequencyBand {
    /// Band not specified (code 0)
    #[default]
    Unspecified,
    /// S band (code 1)
    S,
    /// X band (code 2)
    X,
    /// K band (code 3)
    K,
}

impl std::fmt::Display for FrequencyBand {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> Result<(), std::fmt::Error> {
        match self {
            Self::Unspecified => write!(f, "Unspecified"),
            Self::S => write!(f, "S"),
            Self::X => write!(f, "X"),
            Self::K => write!(f, "K"),
        }
    }
}

impl std::str::FromStr for FrequencyBand {
    type Err = ConfigError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().to_lowercase();
        match trimmed.as_str() {
            "" | "unspecified" | "0" => Ok(Self::Unspecified),
            "s" | "1" => Ok(Self::S),
            "x" | "2" => Ok(Self::X),
            "k" | "3" => Ok(Self::K),
            _ => Err(ConfigError::UnknownFrequencyBandName(s.to_string())),
        }
    }
}

impl FrequencyBand {
    /// Builds a [FrequencyBand] from its tracking data code (0..=3)
    pub fn from_code(code: i32) -> Result<Self, ConfigError> {
        match code {
            0 => Ok(Self::Unspecified),
            1 => Ok(Self::S),
            2 => Ok(Self::X),
            3 => Ok(Self::K),
            code => Err(ConfigError::UnknownFrequencyBand(code)),
        }
    }

    /// Tracking data code of this [FrequencyBand]
    pub fn code(&self) -> i32 {
        match self {
            Self::Unspecified => 0,
            Self::S => 1,
            Self::X => 2,
            Self::K => 3,
        }
    }

    /// Identifies the DSN uplink band from a frequency in Hz.
    /// Only S (2-4 GHz) and X (7-8.4 GHz) are identified.
    pub fn from_frequency_hz(frequency_hz: f64) -> Option<Self> {
        if (2.0E9..=4.0E9).contains(&frequency_hz) {
            Some(Self::S)
        } else if (7.0E9..=8.4E9).contains(&frequency_hz) {
            Some(Self::X)
        } else {
            None
        }
    }

    /// Standard transponder turnaround ratio of this band,
    /// used when the uplink is ramped.
    pub fn turnaround_ratio(&self) -> Result<f64, Error> {
        match self {
            Self::S => Ok(S_BAND_TURNAROUND_RATIO),
            Self::X => Ok(X_BAND_TURNAROUND_RATIO),
            band => Err(Error::TurnaroundBand(*band)),
        }
    }

    /// Range unit conversion factor (RU.s⁻¹) of an uplink
    /// at `frequency_hz` in this band.
    pub fn range_unit_factor(&self, frequency_hz: f64) -> Result<f64, Error> {
        match self {
            Self::S => Ok(frequency_hz / 2.0),
            Self::X => Ok(frequency_hz * 221.0 / 1498.0),
            _ => Err(Error::UnknownFrequencyBand { frequency_hz }),
        }
    }
}

/// Range unit factor of an uplink at `frequency_hz`.
///
/// When `infer` is set (neither observation nor ramp table available),
/// the band is identified from the frequency itself and replaces an
/// [FrequencyBand::Unspecified] `band`. Otherwise `band` is used as is.
/// Returns the factor and the band that applies from now on.
pub(crate) fn range_unit_factor(
    frequency_hz: f64,
    band: FrequencyBand,
    infer: bool,
) -> Result<(f64, FrequencyBand), Error> {
    if infer {
        let detected = FrequencyBand::from_frequency_hz(frequency_hz)
            .ok_or(Error::UnknownFrequencyBand { frequency_hz })?;

        let factor = detected.range_unit_factor(frequency_hz)?;

        let band = if band == FrequencyBand::Unspecified {
            detected
        } else {
            band
        };

        Ok((factor, band))
    } else {
        Ok((band.range_unit_factor(frequency_hz)?, band))
    }
}
