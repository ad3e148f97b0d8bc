//! Range rate (km/s) measurements
use log::warn;
use nalgebra::DMatrix;

use crate::{
    adapter::{
        range::{bias_derivatives, NoisePolicy},
        MeasurementInputs, ObservableTransform, RangeAdapter,
    },
    cfg::Error as ConfigError,
    derivative::{point_range_rate_partials, range_partials, DerivativeTarget, EstimationParameter},
    error::Error,
    measurement::{Feasibility, MeasurementRecord},
    signal::SignalRequest,
};

/// Collapses an infeasible record to a single null rate
fn null_rate(record: &mut MeasurementRecord) {
    record.value = vec![0.0];
    record.covariance = DMatrix::identity(1, 1);
}

/// Range rate from two ranges computed one count interval apart:
/// `(range2 - range1) / 2 / interval`, ranges being summed over all paths.
#[derive(Debug, Clone, Default)]
pub struct RangeRate {
    first: Option<MeasurementRecord>,
    second: Option<MeasurementRecord>,
    interval: f64,
}

impl ObservableTransform for RangeRate {
    fn compute_value(
        &mut self,
        base: &mut RangeAdapter,
        inputs: &MeasurementInputs,
    ) -> Result<MeasurementRecord, Error> {
        let interval = base.config().doppler_count_interval;
        let request = base.request(inputs);

        let first = base.evaluate(&request)?;

        let offset_request = SignalRequest {
            epoch_offset_s: interval,
            ..request
        };

        let second = base.evaluate(&offset_request)?;

        let mut record = first.clone();

        if first.is_feasible() && second.is_feasible() {
            let range1 = first.value.iter().sum::<f64>() / 2.0;
            let range2 = second.value.iter().sum::<f64>() / 2.0;

            record.value = vec![(range2 - range1) / interval];
            record.covariance = DMatrix::from_element(
                1,
                1,
                first.covariance.get((0, 0)).copied().unwrap_or(1.0),
            );

            base.apply_error_model(&mut record, NoisePolicy::Additive)?;
        } else {
            if first.is_feasible() {
                record.feasibility = second.feasibility.clone();
                record.feasibility_value = second.feasibility_value;
            }
            null_rate(&mut record);
        }

        record.doppler_count_interval = interval;

        self.first = Some(first);
        self.second = Some(second);
        self.interval = interval;

        Ok(record)
    }

    fn compute_derivative(
        &self,
        base: &RangeAdapter,
        record: &MeasurementRecord,
        target: &DerivativeTarget,
    ) -> Result<DMatrix<f64>, Error> {
        match &target.parameter {
            EstimationParameter::Bias(bias_type) => {
                Ok(bias_derivatives(1, *bias_type, record.measurement_type))
            },
            parameter if parameter.is_state() => {
                let missing = || Error::MissingMeasurement(base.name().to_string());
                let first = self.first.as_ref().ok_or_else(missing)?;
                let second = self.second.as_ref().ok_or_else(missing)?;

                let (d1, found1) = range_partials(&first.signal_paths, target);
                let (d2, found2) = range_partials(&second.signal_paths, target);

                if !found1 && !found2 {
                    return Err(Error::NotAParticipant(target.object.clone()));
                }

                let rate = (d2.row_sum() - d1.row_sum()) / (2.0 * self.interval);
                Ok(DMatrix::from_row_slice(1, rate.len(), rate.as_slice()))
            },
            parameter => Ok(DMatrix::zeros(1, parameter.size())),
        }
    }
}

/// Instantaneous range rate: projection of each leg range rate vector
/// on its line of sight, averaged over the legs of the single signal path.
#[derive(Debug, Clone, Default)]
pub struct PointRangeRate {}

impl ObservableTransform for PointRangeRate {
    fn compute_value(
        &mut self,
        base: &mut RangeAdapter,
        inputs: &MeasurementInputs,
    ) -> Result<MeasurementRecord, Error> {
        let request = base.request(inputs);
        let mut record = base.evaluate(&request)?;

        if !record.is_feasible() {
            null_rate(&mut record);
            return Ok(record);
        }

        if record.signal_paths.len() != 1 {
            return Err(ConfigError::Topology(format!(
                "signal data is poorly sized for point range rate ({} paths)",
                record.signal_paths.len()
            ))
            .into());
        }

        let path = &record.signal_paths[0];

        if path.is_empty() || path.iter().any(|leg| leg.range_km() <= f64::EPSILON) {
            warn!(
                "{} ({}) - rejected: collocated signal leg",
                record.epoch,
                base.name()
            );
            record.feasibility = Feasibility::Rejected;
            null_rate(&mut record);
            return Ok(record);
        }

        let projected = path
            .iter()
            .map(|leg| leg.range_rate_vec_km_s.dot(&leg.range_vec_km) / leg.range_km())
            .sum::<f64>();

        let rate = projected / path.len() as f64;

        record.value = vec![rate];
        base.apply_error_model(&mut record, NoisePolicy::Additive)?;

        Ok(record)
    }

    fn compute_derivative(
        &self,
        _: &RangeAdapter,
        record: &MeasurementRecord,
        target: &DerivativeTarget,
    ) -> Result<DMatrix<f64>, Error> {
        if let EstimationParameter::Bias(bias_type) = &target.parameter {
            return Ok(bias_derivatives(1, *bias_type, record.measurement_type));
        }

        if record.feasibility.is_rejected() {
            return Ok(DMatrix::zeros(1, target.parameter.size()));
        }

        let path = record.signal_paths.first().ok_or(Error::NoSignalPath)?;
        point_range_rate_partials(path, target)
    }
}
