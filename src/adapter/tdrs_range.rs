//! Relay (TDRS) range
use nalgebra::DMatrix;

use crate::{
    adapter::{
        range::{iono_km, scaled_range_derivatives, tropo_km, NoisePolicy},
        MeasurementInputs, ObservableTransform, RangeAdapter,
    },
    derivative::DerivativeTarget,
    error::Error,
    measurement::MeasurementRecord,
};

/// Range through a relay satellite (km), ground -> relay -> spacecraft
/// -> relay -> ground, scaled by the configured multiplier.
/// Noise is additive here, rejected measurements are left untouched.
#[derive(Debug, Clone, Default)]
pub struct TdrsRange {}

impl ObservableTransform for TdrsRange {
    fn compute_value(
        &mut self,
        base: &mut RangeAdapter,
        inputs: &MeasurementInputs,
    ) -> Result<MeasurementRecord, Error> {
        let request = base.request(inputs);
        let mut record = base.evaluate(&request)?;

        let multiplier = base.config().multiplier();
        record.value.iter_mut().for_each(|v| *v *= multiplier);

        // raw path delays (km)
        record.iono_correction = iono_km(&record, 0);
        record.tropo_correction = tropo_km(&record, 0);

        base.apply_error_model(&mut record, NoisePolicy::Additive)?;
        Ok(record)
    }

    fn compute_derivative(
        &self,
        base: &RangeAdapter,
        record: &MeasurementRecord,
        target: &DerivativeTarget,
    ) -> Result<DMatrix<f64>, Error> {
        scaled_range_derivatives(record, target, base.config().multiplier(), 1.0)
    }
}
