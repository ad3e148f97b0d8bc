//! Universal space network range
use nalgebra::DMatrix;

use crate::{
    adapter::{
        range::{iono_km, scaled_range_derivatives, tropo_km, NoisePolicy},
        MeasurementInputs, ObservableTransform, RangeAdapter,
    },
    constants::TWO_WAY_RANGE_MULTIPLIER,
    derivative::DerivativeTarget,
    error::Error,
    measurement::MeasurementRecord,
};

/// USN two way range (km): half the round trip path length.
#[derive(Debug, Clone, Default)]
pub struct UsnRange {}

impl ObservableTransform for UsnRange {
    fn compute_value(
        &mut self,
        base: &mut RangeAdapter,
        inputs: &MeasurementInputs,
    ) -> Result<MeasurementRecord, Error> {
        let request = base.request(inputs);
        let mut record = base.evaluate(&request)?;

        record
            .value
            .iter_mut()
            .for_each(|v| *v *= TWO_WAY_RANGE_MULTIPLIER);

        record.iono_correction = TWO_WAY_RANGE_MULTIPLIER * iono_km(&record, 0);
        record.tropo_correction = TWO_WAY_RANGE_MULTIPLIER * tropo_km(&record, 0);

        base.apply_error_model(&mut record, NoisePolicy::Positive)?;
        Ok(record)
    }

    fn compute_derivative(
        &self,
        _: &RangeAdapter,
        record: &MeasurementRecord,
        target: &DerivativeTarget,
    ) -> Result<DMatrix<f64>, Error> {
        scaled_range_derivatives(
            record,
            target,
            TWO_WAY_RANGE_MULTIPLIER,
            TWO_WAY_RANGE_MULTIPLIER,
        )
    }
}
