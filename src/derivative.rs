//! Measurement partial derivatives with respect to estimation parameters.
use nalgebra::{DMatrix, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    cfg::{Error as ConfigError, MeasurementType},
    error::Error,
    signal::SignalPath,
};

/// Estimated parameter
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum EstimationParameter {
    /// Position vector (3)
    Position,
    /// Velocity vector (3)
    Velocity,
    /// Cartesian state (6)
    CartesianState,
    /// Measurement bias of this [MeasurementType] (1)
    Bias(MeasurementType),
    /// Any other parameter, the measurements do not depend on it
    Other { name: String, size: usize },
}

impl std::fmt::Display for EstimationParameter {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> Result<(), std::fmt::Error> {
        match self {
            Self::Position => write!(f, "Position"),
            Self::Velocity => write!(f, "Velocity"),
            Self::CartesianState => write!(f, "CartesianX"),
            Self::Bias(_) => write!(f, "Bias"),
            Self::Other { name, .. } => write!(f, "{}", name),
        }
    }
}

impl EstimationParameter {
    /// Number of scalar parameters
    pub fn size(&self) -> usize {
        match self {
            Self::Position | Self::Velocity => 3,
            Self::CartesianState => 6,
            Self::Bias(_) => 1,
            Self::Other { size, .. } => *size,
        }
    }

    /// True for position/velocity parameters
    pub fn is_state(&self) -> bool {
        matches!(self, Self::Position | Self::Velocity | Self::CartesianState)
    }
}

/// Kind of object owning the estimated parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ObjectKind {
    Spacecraft,
    GroundStation,
    ErrorModel,
    Other,
}

/// Parameter the derivatives are requested for
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DerivativeTarget {
    /// Object name
    pub object: String,
    pub kind: ObjectKind,
    pub parameter: EstimationParameter,
}

impl DerivativeTarget {
    pub fn spacecraft(name: &str, parameter: EstimationParameter) -> Self {
        Self {
            object: name.to_string(),
            kind: ObjectKind::Spacecraft,
            parameter,
        }
    }

    pub fn station(name: &str, parameter: EstimationParameter) -> Self {
        Self {
            object: name.to_string(),
            kind: ObjectKind::GroundStation,
            parameter,
        }
    }

    /// Bias of the `measurement_type` error model
    pub fn bias(measurement_type: MeasurementType) -> Self {
        Self {
            object: measurement_type.to_string(),
            kind: ObjectKind::ErrorModel,
            parameter: EstimationParameter::Bias(measurement_type),
        }
    }

    pub fn is_spacecraft(&self) -> bool {
        self.kind == ObjectKind::Spacecraft
    }
}

/// Partials of each path length with respect to the `target` state.
/// One row per path. The receiving end of a leg contributes `+r̂ᵀ·Φ`,
/// the transmitting end `-r̂ᵀ·Φ`, Φ being the 3x3 blocks of its state
/// transition matrix rotated to the inertial frame.
/// The boolean reports whether the target takes part in any path.
pub(crate) fn range_partials(paths: &[SignalPath], target: &DerivativeTarget) -> (DMatrix<f64>, bool) {
    let size = target.parameter.size();
    let mut partials = DMatrix::<f64>::zeros(paths.len(), size);
    let mut found = false;

    if !target.parameter.is_state() {
        return (partials, false);
    }

    for (row, path) in paths.iter().enumerate() {
        for leg in path.iter() {
            let (sign, stm, rotation) = if leg.receiver.name == target.object {
                (1.0, &leg.rx_stm, &leg.rx_rotation)
            } else if leg.transmitter.name == target.object {
                (-1.0, &leg.tx_stm, &leg.tx_rotation)
            } else {
                continue;
            };

            found = true;

            let range = leg.range_vec_km.norm();
            if range == 0.0 {
                continue;
            }

            let unit = leg.range_vec_km / range;
            let a = rotation * stm.fixed_view::<3, 3>(0, 0);
            let b = rotation * stm.fixed_view::<3, 3>(0, 3);

            let d_pos = unit.transpose() * a * sign;
            let d_vel = unit.transpose() * b * sign;

            match target.parameter {
                EstimationParameter::Position => {
                    for i in 0..3 {
                        partials[(row, i)] += d_pos[i];
                    }
                },
                EstimationParameter::Velocity => {
                    for i in 0..3 {
                        partials[(row, i)] += d_vel[i];
                    }
                },
                _ => {
                    for i in 0..3 {
                        partials[(row, i)] += d_pos[i];
                        partials[(row, i + 3)] += d_vel[i];
                    }
                },
            }
        }
    }

    (partials, found)
}

/// Partials of the instantaneous (point) range rate, for a
/// transmitter -> spacecraft -> transmitter path. One row.
pub(crate) fn point_range_rate_partials(
    path: &SignalPath,
    target: &DerivativeTarget,
) -> Result<DMatrix<f64>, Error> {
    let size = target.parameter.size();
    let mut partials = DMatrix::<f64>::zeros(1, size);

    if let EstimationParameter::Bias(_) = target.parameter {
        partials[(0, 0)] = 1.0;
        return Ok(partials);
    }

    if !target.parameter.is_state() {
        return Ok(partials);
    }

    if path.len() != 2 {
        return Err(ConfigError::Topology(
            "range rate computations require signal path of the form T1 -> S1 -> T1"
                .to_string(),
        )
        .into());
    }

    if target.kind == ObjectKind::GroundStation {
        return Err(Error::StationDerivative);
    }

    let (up, down) = (&path.legs[0], &path.legs[1]);

    let position_partial = |r: &Vector3<f64>, v: &Vector3<f64>| -> Vector3<f64> {
        let range = r.norm();
        v / range - r * r.dot(v) / range.powi(3)
    };

    let d_pos = (position_partial(&up.range_vec_km, &up.range_rate_vec_km_s)
        - position_partial(&down.range_vec_km, &down.range_rate_vec_km_s))
        * 0.5;

    let d_vel = (up.range_vec_km / up.range_km() - down.range_vec_km / down.range_km()) * 0.5;

    for i in 0..3 {
        match target.parameter {
            EstimationParameter::Position => partials[(0, i)] = d_pos[i],
            EstimationParameter::Velocity => partials[(0, i)] = d_vel[i],
            _ => {
                partials[(0, i)] = d_pos[i];
                partials[(0, i + 3)] = d_vel[i];
            },
        }
    }

    Ok(partials)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::signal::{Node, SignalLegData};
    use hifitime::Epoch;
    use nalgebra::Matrix6;

    fn two_way_path(up: Vector3<f64>, down: Vector3<f64>) -> SignalPath {
        let t = Epoch::default();
        let gs = Node::station("GS", "34");
        let sc = Node::spacecraft("SC", "101");
        SignalPath::new(vec![
            SignalLegData::new(gs.clone(), sc.clone(), t, t, up),
            SignalLegData::new(sc, gs, t, t, down),
        ])
    }

    #[test]
    fn two_way_position_partials() {
        let path = two_way_path(Vector3::new(1000.0, 0.0, 0.0), Vector3::new(-1000.0, 0.0, 0.0));
        let target = DerivativeTarget::spacecraft("SC", EstimationParameter::Position);
        let (partials, found) = range_partials(&[path], &target);
        assert!(found);
        assert_eq!(partials.nrows(), 1);
        assert_eq!(partials.ncols(), 3);
        // +x̂ on the uplink (receiver), -(-x̂) on the downlink (transmitter)
        assert_eq!(partials[(0, 0)], 2.0);
        assert_eq!(partials[(0, 1)], 0.0);
    }

    #[test]
    fn velocity_partials_use_stm() {
        let mut stm = Matrix6::<f64>::identity();
        stm[(0, 3)] = 10.0;
        let mut path = two_way_path(Vector3::new(0.0, 0.0, 500.0), Vector3::new(0.0, 0.0, -500.0));
        path.legs[0].rx_stm = stm;
        let target = DerivativeTarget::spacecraft("SC", EstimationParameter::CartesianState);
        let (partials, _) = range_partials(&[path], &target);
        assert_eq!(partials.ncols(), 6);
        assert_eq!(partials[(0, 2)], 2.0);
        // only the uplink STM couples x velocity into range, along z: no effect
        assert_eq!(partials[(0, 3)], 0.0);
    }

    #[test]
    fn not_a_participant() {
        let path = two_way_path(Vector3::x(), -Vector3::x());
        let target = DerivativeTarget::spacecraft("other", EstimationParameter::Position);
        let (partials, found) = range_partials(&[path], &target);
        assert!(!found);
        assert_eq!(partials.sum(), 0.0);
    }

    #[test]
    fn point_range_rate() {
        let mut path = two_way_path(Vector3::new(1000.0, 0.0, 0.0), Vector3::new(-1000.0, 0.0, 0.0));
        path.legs[0].range_rate_vec_km_s = Vector3::new(1.0, 2.0, 0.0);
        path.legs[1].range_rate_vec_km_s = Vector3::new(-1.0, -2.0, 0.0);

        let target = DerivativeTarget::spacecraft("SC", EstimationParameter::CartesianState);
        let partials = point_range_rate_partials(&path, &target).unwrap();
        assert_eq!(partials.nrows(), 1);
        // position: 0.5 * [(v/r - r (r.v)/r³)up - (..)down] = (0, 2/1000, 0)
        assert!((partials[(0, 0)]).abs() < 1.0E-12);
        assert!((partials[(0, 1)] - 2.0E-3).abs() < 1.0E-12);
        // velocity: 0.5 * (x̂ - (-x̂))
        assert_eq!(partials[(0, 3)], 1.0);

        let station = DerivativeTarget::station("GS", EstimationParameter::Position);
        assert_eq!(
            point_range_rate_partials(&path, &station),
            Err(Error::StationDerivative)
        );

        let bias = DerivativeTarget::bias(MeasurementType::PointRangeRate);
        let partials = point_range_rate_partials(&path, &bias).unwrap();
        assert_eq!(partials[(0, 0)], 1.0);
    }
}
