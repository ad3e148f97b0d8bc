//! Sequential range (range units)
use nalgebra::DMatrix;

use crate::{
    adapter::{
        range::{iono_km, resolve_ramp, scaled_range_derivatives, tropo_km, NoisePolicy},
        MeasurementInputs, ObservableTransform, RangeAdapter,
    },
    band::range_unit_factor,
    cfg::Error as ConfigError,
    constants::SPEED_OF_LIGHT_KM_S,
    derivative::DerivativeTarget,
    error::Error,
    measurement::MeasurementRecord,
};

/// DSN sequential range, in range units (RU).
///
/// Without ramp table the uplink is assumed constant and the
/// measurement is the range unit factor of the uplink times the light time.
/// Otherwise, the ramped frequency factor is integrated over the light time.
#[derive(Debug, Clone, Default)]
pub struct DsnRange {
    /// Range unit factor of the latest uplink (RU.s⁻¹)
    frequency_factor: f64,
}

impl DsnRange {
    /// Range unit factor (RU.s⁻¹) of the latest measurement
    pub fn frequency_factor(&self) -> f64 {
        self.frequency_factor
    }
}

impl ObservableTransform for DsnRange {
    fn compute_value(
        &mut self,
        base: &mut RangeAdapter,
        inputs: &MeasurementInputs,
    ) -> Result<MeasurementRecord, Error> {
        let request = base.request(inputs);
        let mut record = base.evaluate(&request)?;

        if let Some(observation) = inputs.observation {
            if observation.range_modulo > 0.0 {
                record.range_modulo = observation.range_modulo;
            }
        }

        let infer = inputs.observation.is_none() && inputs.ramp_table.is_none();

        let (factor, band) =
            range_unit_factor(record.uplink_frequency_hz, record.uplink_band, infer)?;

        self.frequency_factor = factor;
        record.uplink_band = band;

        for i in 0..record.value.len() {
            let travel_time_s = record.value[i] / SPEED_OF_LIGHT_KM_S;

            let table = match inputs.ramp_table {
                Some(table) => table,
                None => {
                    record.value[i] = factor * travel_time_s;
                    continue;
                },
            };

            let (station, spacecraft) = record.signal_paths[i]
                .uplink_participants()
                .ok_or(ConfigError::Topology(
                    "ramped uplink requires a ground station to spacecraft leg".to_string(),
                ))?;

            let integral = table.integrate(
                &station.id,
                &spacecraft.id,
                record.epoch,
                travel_time_s,
                |f| band.range_unit_factor(f).unwrap_or_default(),
            );

            if let Some(ru) = resolve_ramp(&mut record, i, base.name(), integral)? {
                record.value[i] = ru;
            }
        }

        record.iono_correction = factor * iono_km(&record, 0) / SPEED_OF_LIGHT_KM_S;
        record.tropo_correction = factor * tropo_km(&record, 0) / SPEED_OF_LIGHT_KM_S;

        base.apply_error_model(&mut record, NoisePolicy::Additive)?;
        Ok(record)
    }

    fn compute_derivative(
        &self,
        _: &RangeAdapter,
        record: &MeasurementRecord,
        target: &DerivativeTarget,
    ) -> Result<DMatrix<f64>, Error> {
        let factor = self.frequency_factor / SPEED_OF_LIGHT_KM_S;
        scaled_range_derivatives(record, target, factor, factor)
    }
}
