use hifitime::Epoch;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{band::FrequencyBand, cfg::ServiceAccess};

/// Tracking observation the computed measurement is associated to.
/// When present, its metadata overrides the adapter configuration
/// (count interval, range modulo, relay service..).
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ObservationData {
    /// Observation [Epoch]
    pub epoch: Epoch,
    /// Observed values, one per signal path
    pub value: Vec<f64>,
    /// Range modulo constant (RU)
    pub range_modulo: f64,
    /// Doppler count interval (s)
    pub doppler_count_interval: f64,
    /// Uplink [FrequencyBand]
    pub uplink_band: FrequencyBand,
    /// Uplink frequency (Hz)
    pub uplink_frequency_hz: f64,
    /// Relay service access, for relay tracking
    pub tdrs_service_access: Option<ServiceAccess>,
    /// Relay node 4 frequency (Hz)
    pub tdrs_node4_frequency_hz: f64,
    /// Relay node 4 [FrequencyBand]
    pub tdrs_node4_band: FrequencyBand,
    /// Relay SMAR identifier
    pub tdrs_smar_id: i32,
    /// Relay data flag
    pub tdrs_data_flag: i32,
}

impl ObservationData {
    /// Bare observation anchored at `epoch`
    pub fn at(epoch: Epoch) -> Self {
        Self {
            epoch,
            ..Default::default()
        }
    }

    /// Copies and returns with new [Epoch]
    pub fn with_epoch(&self, epoch: Epoch) -> Self {
        let mut s = self.clone();
        s.epoch = epoch;
        s
    }

    /// Copies and returns with new doppler count interval (s)
    pub fn with_doppler_count_interval(&self, interval_s: f64) -> Self {
        let mut s = self.clone();
        s.doppler_count_interval = interval_s;
        s
    }

    /// Copies and returns with new range modulo (RU)
    pub fn with_range_modulo(&self, range_modulo: f64) -> Self {
        let mut s = self.clone();
        s.range_modulo = range_modulo;
        s
    }

    /// Copies and returns with relay metadata
    pub fn with_relay(
        &self,
        service: ServiceAccess,
        node4_frequency_hz: f64,
        node4_band: FrequencyBand,
        smar_id: i32,
        data_flag: i32,
    ) -> Self {
        let mut s = self.clone();
        s.tdrs_service_access = Some(service);
        s.tdrs_node4_frequency_hz = node4_frequency_hz;
        s.tdrs_node4_band = node4_band;
        s.tdrs_smar_id = smar_id;
        s.tdrs_data_flag = data_flag;
        s
    }
}
