#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{band::FrequencyBand, cfg::Error};

/// Relay (TDRS) service access
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ServiceAccess {
    /// Single access antenna #1
    SA1,
    /// Single access antenna #2
    SA2,
    /// Multiple access
    MA,
}

impl std::fmt::Display for ServiceAccess {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> Result<(), std::fmt::Error> {
        match self {
            Self::SA1 => write!(f, "SA1"),
            Self::SA2 => write!(f, "SA2"),
            Self::MA => write!(f, "MA"),
        }
    }
}

impl std::str::FromStr for ServiceAccess {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().to_lowercase();
        match trimmed.as_str() {
            "sa1" => Ok(Self::SA1),
            "sa2" => Ok(Self::SA2),
            "ma" => Ok(Self::MA),
            _ => Err(Error::UnknownServiceAccess(s.to_string())),
        }
    }
}

fn default_node4_frequency_mhz() -> f64 {
    2000.0
}

fn default_node4_band() -> FrequencyBand {
    FrequencyBand::S
}

/// Relay (TDRS) tracking configuration. Overridden by the
/// observation when one is available.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TdrsConfig {
    /// Service accesses to pick from when simulating
    #[cfg_attr(feature = "serde", serde(default))]
    pub service_access: Vec<ServiceAccess>,
    /// Node 4 (ground terminal) frequency (MHz)
    #[cfg_attr(feature = "serde", serde(default = "default_node4_frequency_mhz"))]
    pub node4_frequency_mhz: f64,
    /// Node 4 [FrequencyBand]
    #[cfg_attr(feature = "serde", serde(default = "default_node4_band"))]
    pub node4_band: FrequencyBand,
    /// SMAR identifier (multiple access)
    #[cfg_attr(feature = "serde", serde(default))]
    pub smar_id: i32,
    /// Data flag (multiple access)
    #[cfg_attr(feature = "serde", serde(default))]
    pub data_flag: i32,
}

impl Default for TdrsConfig {
    fn default() -> Self {
        Self {
            service_access: Vec::new(),
            node4_frequency_mhz: default_node4_frequency_mhz(),
            node4_band: default_node4_band(),
            smar_id: 0,
            data_flag: 0,
        }
    }
}

impl TdrsConfig {
    /// Copies and returns with one more [ServiceAccess]
    pub fn with_service_access(&self, service: ServiceAccess) -> Self {
        let mut s = self.clone();
        s.service_access.push(service);
        s
    }

    /// Copies and returns with node 4 frequency (MHz) and band
    pub fn with_node4(&self, frequency_mhz: f64, band: FrequencyBand) -> Self {
        let mut s = self.clone();
        s.node4_frequency_mhz = frequency_mhz;
        s.node4_band = band;
        s
    }

    /// Copies and returns with SMAR identifier and data flag
    pub fn with_smar(&self, smar_id: i32, data_flag: i32) -> Self {
        let mut s = self.clone();
        s.smar_id = smar_id;
        s.data_flag = data_flag;
        s
    }
}
