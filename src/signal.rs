use hifitime::Epoch;
use nalgebra::{Matrix3, Matrix6, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    band::FrequencyBand, constants::SPEED_OF_LIGHT_KM_S, error::Error,
    observation::ObservationData, ramp::RampTable,
};

/// Kind of signal participant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum NodeKind {
    GroundStation,
    Spacecraft,
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> Result<(), std::fmt::Error> {
        match self {
            Self::GroundStation => write!(f, "ground station"),
            Self::Spacecraft => write!(f, "spacecraft"),
        }
    }
}

/// Signal participant (one end of a [SignalLegData])
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Node {
    /// Name, as referenced by strands and estimation parameters
    pub name: String,
    /// Tracking data identifier (station ID, spacecraft ID, "TDRS10"..)
    pub id: String,
    /// [NodeKind]
    pub kind: NodeKind,
    /// Transponder turnaround ratio, when this node carries a transponder
    pub turnaround_ratio: Option<f64>,
}

impl Node {
    /// New ground station [Node]
    pub fn station(name: &str, id: &str) -> Self {
        Self {
            name: name.to_string(),
            id: id.to_string(),
            kind: NodeKind::GroundStation,
            turnaround_ratio: None,
        }
    }

    /// New spacecraft [Node], without transponder
    pub fn spacecraft(name: &str, id: &str) -> Self {
        Self {
            name: name.to_string(),
            id: id.to_string(),
            kind: NodeKind::Spacecraft,
            turnaround_ratio: None,
        }
    }

    /// Copies and returns [Node] equipped with a transponder
    pub fn with_transponder(&self, turnaround_ratio: f64) -> Self {
        let mut s = self.clone();
        s.turnaround_ratio = Some(turnaround_ratio);
        s
    }

    pub fn is_spacecraft(&self) -> bool {
        self.kind == NodeKind::Spacecraft
    }

    /// Trailing digits of the [Node] identifier ("TDRS10" => "10")
    pub fn numeric_id(&self) -> &str {
        let trimmed = self.id.trim_end_matches(|c: char| c.is_ascii_digit());
        &self.id[trimmed.len()..]
    }
}

/// Signal correction identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CorrectionId {
    Ionosphere,
    Troposphere,
    Relativity,
    EtTai,
    Other(String),
}

/// How a correction applies to the measurement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CorrectionKind {
    /// Correction is a path length (km) added to the range
    Range,
    /// Correction applies elsewhere (time, frequency..)
    Other,
}

/// Correction computed by the signal path model for one leg
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Correction {
    pub id: CorrectionId,
    pub kind: CorrectionKind,
    /// Correction value. Km for [CorrectionKind::Range].
    pub value_km: f64,
    pub enabled: bool,
}

impl Correction {
    /// Enabled range [Correction]
    pub fn range(id: CorrectionId, value_km: f64) -> Self {
        Self {
            id,
            kind: CorrectionKind::Range,
            value_km,
            enabled: true,
        }
    }
}

/// Leg status, as determined by the signal path model
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum LegStatus {
    /// Not classified
    #[default]
    Unknown,
    /// Signal is visible
    Nominal,
    /// Signal is blocked. The detail describes the blockage
    /// (body, horizon..) and may be empty.
    Blocked(String),
}

impl LegStatus {
    /// Parses the solver reason code: leading 'N' is nominal,
    /// leading 'B' is blocked (remaining characters are kept as detail).
    pub fn from_reason(reason: &str) -> Self {
        if let Some(detail) = reason.strip_prefix('B') {
            Self::Blocked(detail.to_string())
        } else if reason.starts_with('N') {
            Self::Nominal
        } else {
            Self::Unknown
        }
    }
}

/// Geometry, timing and frequency of one hop (transmitter to receiver)
/// of a signal path, as solved by the light time solver.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SignalLegData {
    pub transmitter: Node,
    pub receiver: Node,
    /// Transmission [Epoch]
    pub tx_epoch: Epoch,
    /// Reception [Epoch]
    pub rx_epoch: Epoch,
    /// Transmitter hardware delay (s)
    pub tx_delay_s: f64,
    /// Receiver hardware delay (s)
    pub rx_delay_s: f64,
    /// Receiver minus transmitter position, inertial frame (km)
    pub range_vec_km: Vector3<f64>,
    /// Receiver minus transmitter position, topocentric frame (km)
    pub range_vec_topo_km: Vector3<f64>,
    /// Receiver minus transmitter velocity, inertial frame (km/s)
    pub range_rate_vec_km_s: Vector3<f64>,
    /// Frequency that arrived at the transmitter, before turnaround (MHz)
    pub arrive_freq_mhz: f64,
    /// Frequency transmitted on this leg (MHz)
    pub transmit_freq_mhz: f64,
    /// Frequency received at the receiver (MHz)
    pub receive_freq_mhz: f64,
    pub corrections: Vec<Correction>,
    pub status: LegStatus,
    /// Feasibility value (elevation angle, deg)
    pub feasibility_value_deg: f64,
    /// Whether a ground station takes part in this leg
    pub station_participant: bool,
    /// Transmitter state transition matrix, to the measurement epoch
    pub tx_stm: Matrix6<f64>,
    /// Receiver state transition matrix, to the measurement epoch
    pub rx_stm: Matrix6<f64>,
    /// Transmitter state frame to inertial frame rotation
    pub tx_rotation: Matrix3<f64>,
    /// Receiver state frame to inertial frame rotation
    pub rx_rotation: Matrix3<f64>,
}

impl SignalLegData {
    /// Builds a new leg between two [Node]s, with identity
    /// state transition matrices and no corrections.
    pub fn new(
        transmitter: Node,
        receiver: Node,
        tx_epoch: Epoch,
        rx_epoch: Epoch,
        range_vec_km: Vector3<f64>,
    ) -> Self {
        let station_participant = transmitter.kind == NodeKind::GroundStation
            || receiver.kind == NodeKind::GroundStation;
        Self {
            transmitter,
            receiver,
            tx_epoch,
            rx_epoch,
            tx_delay_s: 0.0,
            rx_delay_s: 0.0,
            range_vec_km,
            range_vec_topo_km: range_vec_km,
            range_rate_vec_km_s: Vector3::zeros(),
            arrive_freq_mhz: 0.0,
            transmit_freq_mhz: 0.0,
            receive_freq_mhz: 0.0,
            corrections: Vec::new(),
            status: LegStatus::Nominal,
            feasibility_value_deg: 90.0,
            station_participant,
            tx_stm: Matrix6::identity(),
            rx_stm: Matrix6::identity(),
            tx_rotation: Matrix3::identity(),
            rx_rotation: Matrix3::identity(),
        }
    }

    /// Copies and returns with hardware delays (s)
    pub fn with_delays(&self, tx_delay_s: f64, rx_delay_s: f64) -> Self {
        let mut s = self.clone();
        s.tx_delay_s = tx_delay_s;
        s.rx_delay_s = rx_delay_s;
        s
    }

    /// Copies and returns with leg frequencies (MHz)
    pub fn with_frequencies(&self, arrive_mhz: f64, transmit_mhz: f64, receive_mhz: f64) -> Self {
        let mut s = self.clone();
        s.arrive_freq_mhz = arrive_mhz;
        s.transmit_freq_mhz = transmit_mhz;
        s.receive_freq_mhz = receive_mhz;
        s
    }

    /// Copies and returns with relative velocity (km/s)
    pub fn with_range_rate(&self, range_rate_vec_km_s: Vector3<f64>) -> Self {
        let mut s = self.clone();
        s.range_rate_vec_km_s = range_rate_vec_km_s;
        s
    }

    /// Copies and returns with one more [Correction]
    pub fn with_correction(&self, correction: Correction) -> Self {
        let mut s = self.clone();
        s.corrections.push(correction);
        s
    }

    /// Copies and returns with new [LegStatus] and feasibility value
    pub fn with_status(&self, status: LegStatus, feasibility_value_deg: f64) -> Self {
        let mut s = self.clone();
        s.status = status;
        s.feasibility_value_deg = feasibility_value_deg;
        s
    }

    /// Copies and returns with state transition matrices
    pub fn with_stm(&self, tx_stm: Matrix6<f64>, rx_stm: Matrix6<f64>) -> Self {
        let mut s = self.clone();
        s.tx_stm = tx_stm;
        s.rx_stm = rx_stm;
        s
    }

    /// Geometric range (km)
    pub fn range_km(&self) -> f64 {
        self.range_vec_km.norm()
    }

    /// Geometric light time (s)
    pub fn light_time_s(&self) -> f64 {
        self.range_km() / SPEED_OF_LIGHT_KM_S
    }

    /// Sum of enabled range corrections (km)
    pub fn range_corrections_km(&self) -> f64 {
        self.corrections
            .iter()
            .filter(|c| c.enabled && c.kind == CorrectionKind::Range)
            .map(|c| c.value_km)
            .sum()
    }

    /// Sum of enabled corrections matching `id` (km)
    pub fn correction_km(&self, id: &CorrectionId) -> f64 {
        self.corrections
            .iter()
            .filter(|c| c.enabled && c.id == *id)
            .map(|c| c.value_km)
            .sum()
    }

    /// Hardware delays converted to path length (km)
    pub fn hardware_delay_km(&self) -> f64 {
        (self.tx_delay_s + self.rx_delay_s) * SPEED_OF_LIGHT_KM_S
    }

    /// Total contribution of this leg to the path length (km)
    pub fn path_length_km(&self) -> f64 {
        self.range_km() + self.range_corrections_km() + self.hardware_delay_km()
    }
}

/// Ordered chain of [SignalLegData], first leg leaves the first participant.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SignalPath {
    pub legs: Vec<SignalLegData>,
}

impl SignalPath {
    pub fn new(legs: Vec<SignalLegData>) -> Self {
        Self { legs }
    }

    pub fn len(&self) -> usize {
        self.legs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.legs.is_empty()
    }

    pub fn first(&self) -> Option<&SignalLegData> {
        self.legs.first()
    }

    pub fn last(&self) -> Option<&SignalLegData> {
        self.legs.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SignalLegData> {
        self.legs.iter()
    }

    /// Total path length including corrections and hardware delays (km)
    pub fn path_length_km(&self) -> f64 {
        self.legs.iter().map(|leg| leg.path_length_km()).sum()
    }

    /// Corrections and hardware delays only (km)
    pub fn corrections_km(&self) -> f64 {
        self.legs
            .iter()
            .map(|leg| leg.range_corrections_km() + leg.hardware_delay_km())
            .sum()
    }

    /// Sum of corrections matching `id` over all legs (km)
    pub fn correction_km(&self, id: &CorrectionId) -> f64 {
        self.legs.iter().map(|leg| leg.correction_km(id)).sum()
    }

    /// Product of the transponder turnaround ratios of every
    /// spacecraft receiving on this path.
    pub fn turnaround_ratio(&self) -> f64 {
        self.legs
            .iter()
            .filter(|leg| leg.receiver.is_spacecraft())
            .filter_map(|leg| leg.receiver.turnaround_ratio)
            .product()
    }

    /// Ground station and spacecraft taking part in the uplink
    /// (first leg), as (station, spacecraft).
    pub fn uplink_participants(&self) -> Option<(&Node, &Node)> {
        let leg = self.first()?;
        if leg.transmitter.kind == NodeKind::GroundStation {
            Some((&leg.transmitter, &leg.receiver))
        } else {
            Some((&leg.receiver, &leg.transmitter))
        }
    }

    /// Whether named participant transmits or receives on this path
    pub fn involves(&self, name: &str) -> bool {
        self.legs
            .iter()
            .any(|leg| leg.transmitter.name == name || leg.receiver.name == name)
    }
}

/// Request passed to the [SignalPathModel] on each evaluation.
#[derive(Debug, Clone, Copy, Default)]
pub struct SignalRequest<'a> {
    /// Solve light time (otherwise instantaneous geometry)
    pub with_light_time: bool,
    /// Compute media (iono, tropo) corrections
    pub with_media_correction: bool,
    /// Observation this computation is associated to.
    /// Its epoch anchors the measurement.
    pub observation: Option<&'a ObservationData>,
    /// Uplink ramp table
    pub ramp_table: Option<&'a RampTable>,
    /// Simulation (versus estimation) run
    pub for_simulation: bool,
    /// Offset applied to the anchor epoch (s): the paths are
    /// received (or transmitted) at anchor + offset.
    pub epoch_offset_s: f64,
}

/// Light time and geometry solver, producing the [SignalPath]s of one
/// tracking strand. Implemented outside this crate.
pub trait SignalPathModel: std::fmt::Debug {
    /// Solves all signal paths. Returns false when the solver
    /// could not produce a solution.
    fn calculate(&mut self, request: &SignalRequest) -> Result<bool, Error>;

    /// Signal paths solved by the latest [SignalPathModel::calculate].
    fn signal_paths(&self) -> &[SignalPath];

    /// Uplink frequency (MHz) at transmission time, on path `path`.
    fn uplink_frequency_mhz(&self, path: usize, ramp_table: Option<&RampTable>) -> f64;

    /// Uplink frequency (MHz) at reception time, on path `path`.
    fn uplink_frequency_at_receive_mhz(&self, path: usize, ramp_table: Option<&RampTable>) -> f64;

    /// Uplink [FrequencyBand] on path `path`.
    fn uplink_band(&self, path: usize, ramp_table: Option<&RampTable>) -> FrequencyBand;

    /// True when measurements are time tagged at the receiver
    /// (false: at the transmitter).
    fn time_tag_at_receiver(&self) -> bool;

    /// Doppler count interval (s) the solved paths are differenced over.
    /// Informative only: the epoch offset of each path is carried by
    /// [SignalRequest::epoch_offset_s] and must not be applied again.
    fn set_count_interval(&mut self, interval_s: f64);

    /// Recomputes leg frequencies and media corrections of path `path`
    /// for a new uplink frequency (MHz).
    fn recalculate_frequency_and_media(
        &mut self,
        path: usize,
        uplink_mhz: f64,
        ramp_table: Option<&RampTable>,
    ) -> Result<(), Error> {
        let _ = (path, uplink_mhz, ramp_table);
        Ok(())
    }

    /// Returns an owned copy of this model.
    fn box_clone(&self) -> Box<dyn SignalPathModel>;
}

impl Clone for Box<dyn SignalPathModel> {
    fn clone(&self) -> Self {
        self.box_clone()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn numeric_id() {
        let node = Node::spacecraft("TDRS-E", "TDRS10");
        assert_eq!(node.numeric_id(), "10");
        let node = Node::spacecraft("Sat", "Sat");
        assert_eq!(node.numeric_id(), "");
        let node = Node::spacecraft("Sat", "42");
        assert_eq!(node.numeric_id(), "42");
    }

    #[test]
    fn leg_status() {
        assert_eq!(LegStatus::from_reason("N"), LegStatus::Nominal);
        assert_eq!(
            LegStatus::from_reason("BEarth"),
            LegStatus::Blocked("Earth".to_string())
        );
        assert_eq!(LegStatus::from_reason(""), LegStatus::Unknown);
    }

    #[test]
    fn leg_path_length() {
        let t0 = Epoch::default();
        let leg = SignalLegData::new(
            Node::station("GS", "22"),
            Node::spacecraft("SC", "101"),
            t0,
            t0,
            Vector3::new(3000.0, 4000.0, 0.0),
        )
        .with_correction(Correction::range(CorrectionId::Ionosphere, 0.002))
        .with_correction(Correction {
            id: CorrectionId::Relativity,
            kind: CorrectionKind::Other,
            value_km: 10.0,
            enabled: true,
        })
        .with_correction(Correction {
            id: CorrectionId::Troposphere,
            kind: CorrectionKind::Range,
            value_km: 100.0,
            enabled: false,
        })
        .with_delays(1.0E-6, 0.0);

        assert_eq!(leg.range_km(), 5000.0);
        assert_eq!(leg.range_corrections_km(), 0.002);
        assert_eq!(leg.correction_km(&CorrectionId::Troposphere), 0.0);
        let expected = 5000.0 + 0.002 + 1.0E-6 * SPEED_OF_LIGHT_KM_S;
        assert!((leg.path_length_km() - expected).abs() < 1.0E-9);
        assert!(leg.station_participant);
    }

    #[test]
    fn path_turnaround() {
        let t0 = Epoch::default();
        let gs = Node::station("GS", "22");
        let sc = Node::spacecraft("SC", "101").with_transponder(240.0 / 221.0);
        let up = SignalLegData::new(gs.clone(), sc.clone(), t0, t0, Vector3::x());
        let down = SignalLegData::new(sc, gs, t0, t0, Vector3::x());
        let path = SignalPath::new(vec![up, down]);
        assert_eq!(path.turnaround_ratio(), 240.0 / 221.0);
        assert!(path.involves("SC"));
        assert!(!path.involves("other"));
        let (station, spacecraft) = path.uplink_participants().unwrap();
        assert_eq!(station.name, "GS");
        assert_eq!(spacecraft.name, "SC");
    }
}
