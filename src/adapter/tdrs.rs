//! Relay (TDRS) four path Doppler
use nalgebra::DMatrix;

use crate::{
    adapter::{
        range::{bias_derivatives, iono_km, tropo_km, NoisePolicy},
        MeasurementInputs, ObservableTransform, RangeAdapter,
    },
    band::FrequencyBand,
    cfg::{Error as ConfigError, ServiceAccess},
    constants::SPEED_OF_LIGHT_KM_S,
    derivative::{range_partials, DerivativeTarget, EstimationParameter},
    error::Error,
    measurement::{MeasurementRecord, TdrsMetadata},
    observation::ObservationData,
    signal::{SignalPathModel, SignalRequest},
};

/// Relay satellites whose MA pilot depends on the SMAR channel
const THIRD_GENERATION_RELAYS: [&str; 3] = ["8", "9", "10"];

#[derive(Debug, Clone, Copy, PartialEq)]
enum RelaySelector {
    Any,
    ThirdGeneration,
    Other,
}

impl RelaySelector {
    fn matches(&self, tdrs_id: &str) -> bool {
        let third_generation = THIRD_GENERATION_RELAYS.contains(&tdrs_id);
        match self {
            Self::Any => true,
            Self::ThirdGeneration => third_generation,
            Self::Other => !third_generation,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum PilotRule {
    /// Fixed pilot frequency (MHz)
    Fixed(f64),
    /// `base - trunc(2 * node4 + 0.5) / 2` (MHz)
    Node4Offset(f64),
}

#[derive(Debug, Clone, Copy)]
struct PilotEntry {
    service: ServiceAccess,
    band: FrequencyBand,
    relay: RelaySelector,
    smar_id: Option<i32>,
    data_flag: Option<i32>,
    rule: PilotRule,
}

const fn pilot(
    service: ServiceAccess,
    band: FrequencyBand,
    relay: RelaySelector,
    smar_id: Option<i32>,
    data_flag: Option<i32>,
    rule: PilotRule,
) -> PilotEntry {
    PilotEntry {
        service,
        band,
        relay,
        smar_id,
        data_flag,
        rule,
    }
}

const fn ma_smar(smar_id: i32, frequency_mhz: f64) -> PilotEntry {
    pilot(
        ServiceAccess::MA,
        FrequencyBand::S,
        RelaySelector::ThirdGeneration,
        Some(smar_id),
        None,
        PilotRule::Fixed(frequency_mhz),
    )
}

/// Pilot frequencies. First match wins.
const PILOT_FREQUENCIES: &[PilotEntry] = &[
    pilot(
        ServiceAccess::SA1,
        FrequencyBand::S,
        RelaySelector::Any,
        None,
        None,
        PilotRule::Node4Offset(13677.5),
    ),
    pilot(
        ServiceAccess::SA1,
        FrequencyBand::K,
        RelaySelector::Any,
        None,
        None,
        PilotRule::Fixed(-1475.0),
    ),
    pilot(
        ServiceAccess::SA2,
        FrequencyBand::S,
        RelaySelector::Any,
        None,
        None,
        PilotRule::Node4Offset(13697.5),
    ),
    pilot(
        ServiceAccess::SA2,
        FrequencyBand::K,
        RelaySelector::Any,
        None,
        None,
        PilotRule::Fixed(-1075.0),
    ),
    ma_smar(2, 13412.5),
    ma_smar(3, 13420.0),
    ma_smar(4, 13427.5),
    ma_smar(5, 13435.0),
    ma_smar(6, 13442.5),
    ma_smar(7, 13450.0),
    ma_smar(8, 13457.5),
    ma_smar(27, 13600.0),
    ma_smar(28, 13607.5),
    ma_smar(29, 13615.0),
    ma_smar(30, 13622.5),
    pilot(
        ServiceAccess::MA,
        FrequencyBand::S,
        RelaySelector::ThirdGeneration,
        None,
        None,
        PilotRule::Fixed(13405.0),
    ),
    pilot(
        ServiceAccess::MA,
        FrequencyBand::S,
        RelaySelector::Other,
        None,
        Some(0),
        PilotRule::Fixed(-2279.0),
    ),
    pilot(
        ServiceAccess::MA,
        FrequencyBand::S,
        RelaySelector::Other,
        None,
        Some(1),
        PilotRule::Fixed(-2287.5),
    ),
];

/// Pilot frequency (MHz) of the relay short path.
/// - service: [ServiceAccess]
/// - band: node 4 [FrequencyBand]
/// - tdrs_id: relay numeric identifier
/// - smar_id: SMAR channel (MA service)
/// - data_flag: data flag (MA service, earlier relays)
/// - node4_mhz: node 4 frequency (MHz)
pub fn pilot_frequency_mhz(
    service: ServiceAccess,
    band: FrequencyBand,
    tdrs_id: &str,
    smar_id: i32,
    data_flag: i32,
    node4_mhz: f64,
) -> Result<f64, ConfigError> {
    let entry = PILOT_FREQUENCIES.iter().find(|entry| {
        entry.service == service
            && entry.band == band
            && entry.relay.matches(tdrs_id)
            && entry.smar_id.map_or(true, |id| id == smar_id)
            && entry.data_flag.map_or(true, |flag| flag == data_flag)
    });

    match entry {
        Some(entry) => match entry.rule {
            PilotRule::Fixed(frequency_mhz) => Ok(frequency_mhz),
            PilotRule::Node4Offset(base_mhz) => {
                Ok(base_mhz - (2.0 * node4_mhz + 0.5).trunc() / 2.0)
            },
        },
        None => {
            if service == ServiceAccess::MA
                && band == FrequencyBand::S
                && RelaySelector::Other.matches(tdrs_id)
            {
                Err(ConfigError::InvalidDataFlag(data_flag))
            } else {
                Err(ConfigError::UnsupportedPilotFrequency {
                    service,
                    band,
                    tdrs_id: tdrs_id.to_string(),
                })
            }
        },
    }
}

/// Role of each path of the relay Doppler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayPath {
    EndLong,
    EndShort,
    StartLong,
    StartShort,
}

impl std::fmt::Display for RelayPath {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> Result<(), std::fmt::Error> {
        match self {
            Self::EndLong => write!(f, "EL"),
            Self::EndShort => write!(f, "ES"),
            Self::StartLong => write!(f, "SL"),
            Self::StartShort => write!(f, "SS"),
        }
    }
}

/// Snapshot of the four path measurements, in [RelayPath] order
#[derive(Debug, Clone)]
struct RelayRecords([(RelayPath, MeasurementRecord); 4]);

/// Relay parameters of one measurement
#[derive(Debug, Clone, Copy)]
struct RelayService {
    service: ServiceAccess,
    node4_mhz: f64,
    node4_band: FrequencyBand,
    smar_id: i32,
    data_flag: i32,
}

/// Relay Doppler (Hz): differenced Long (through the spacecraft) and
/// Short (pilot) paths at the measurement epoch (End) and one count
/// interval earlier (Start). This adapter computes End-Long, the three
/// other paths are computed by exclusively owned sub adapters.
#[derive(Debug, Clone, Default)]
pub struct TdrsDoppler {
    short_model: Option<Box<dyn SignalPathModel>>,
    end_short: Option<RangeAdapter>,
    start_long: Option<RangeAdapter>,
    start_short: Option<RangeAdapter>,
    records: Option<RelayRecords>,
    /// Per path multipliers, in [RelayPath] order (Hz/km)
    multipliers: Vec<[f64; 4]>,
}

impl TdrsDoppler {
    /// Copies and returns with the pilot (short) path model attached
    pub fn with_short_path_model(&self, model: Box<dyn SignalPathModel>) -> Self {
        let mut s = self.clone();
        s.set_short_path_model(model);
        s
    }

    pub fn set_short_path_model(&mut self, model: Box<dyn SignalPathModel>) {
        self.short_model = Some(model);
    }

    /// Latest path snapshot of this role
    pub fn path_record(&self, role: RelayPath) -> Option<&MeasurementRecord> {
        self.records
            .as_ref()?
            .0
            .iter()
            .find(|(r, _)| *r == role)
            .map(|(_, record)| record)
    }

    /// Relay parameters: from the observation when tracking data is
    /// processed, from the configuration otherwise (service picked at random).
    fn relay_service(
        base: &mut RangeAdapter,
        observation: Option<&ObservationData>,
    ) -> Result<RelayService, Error> {
        if let Some(obs) = observation {
            let service = obs
                .tdrs_service_access
                .ok_or(ConfigError::EmptyServiceAccessList)?;

            return Ok(RelayService {
                service,
                node4_mhz: obs.tdrs_node4_frequency_hz / 1.0E6,
                node4_band: obs.tdrs_node4_band,
                smar_id: obs.tdrs_smar_id,
                data_flag: obs.tdrs_data_flag,
            });
        }

        let tdrs = base.config().tdrs.clone();

        if tdrs.service_access.is_empty() {
            return Err(ConfigError::EmptyServiceAccessList.into());
        }

        let index = base.noise_mut().pick(tdrs.service_access.len());

        Ok(RelayService {
            service: tdrs.service_access[index],
            node4_mhz: tdrs.node4_frequency_mhz,
            node4_band: tdrs.node4_band,
            smar_id: tdrs.smar_id,
            data_flag: tdrs.data_flag,
        })
    }
}

impl ObservableTransform for TdrsDoppler {
    fn initialize(&mut self, base: &RangeAdapter) -> Result<(), Error> {
        let short_model = self
            .short_model
            .clone()
            .ok_or(ConfigError::MissingSubAdapter)?;

        self.end_short = Some(base.sub_adapter("ES", false).with_model(short_model.clone()));
        self.start_long = Some(base.sub_adapter("SL", false));
        self.start_short = Some(base.sub_adapter("SS", false).with_model(short_model));
        Ok(())
    }

    fn compute_value(
        &mut self,
        base: &mut RangeAdapter,
        inputs: &MeasurementInputs,
    ) -> Result<MeasurementRecord, Error> {
        let end_short = self.end_short.as_mut().ok_or(ConfigError::MissingSubAdapter)?;
        let start_long = self.start_long.as_mut().ok_or(ConfigError::MissingSubAdapter)?;
        let start_short = self.start_short.as_mut().ok_or(ConfigError::MissingSubAdapter)?;

        let interval = match inputs.observation {
            Some(obs) if obs.doppler_count_interval > 0.0 => obs.doppler_count_interval,
            _ => base.config().doppler_count_interval,
        };

        let relay = Self::relay_service(base, inputs.observation)?;

        // relay tracking is never ramped
        let request = SignalRequest {
            with_media_correction: false,
            ramp_table: None,
            ..base.request(inputs)
        };

        let end_long = base.evaluate(&request)?;
        let uplink_mhz = end_long.uplink_frequency_hz / 1.0E6;

        let anchor = match inputs.observation {
            Some(obs) => obs.with_epoch(end_long.epoch),
            None => ObservationData::at(end_long.epoch),
        };

        let end_request = SignalRequest {
            observation: Some(&anchor),
            ..request
        };

        let start_request = SignalRequest {
            epoch_offset_s: -interval,
            ..end_request
        };

        end_short.evaluate(&end_request)?;

        start_long.model_mut()?.set_count_interval(interval);
        start_short.model_mut()?.set_count_interval(interval);

        start_long.evaluate(&start_request)?;
        start_short.evaluate(&start_request)?;

        self.multipliers.clear();
        let mut relay_uplink_mhz = uplink_mhz;

        for (i, path) in end_long.signal_paths.iter().enumerate() {
            if path.len() != 4 {
                return Err(ConfigError::Topology(format!(
                    "relay doppler requires 4 legs per signal path (got {})",
                    path.len()
                ))
                .into());
            }

            let (leg2, leg3) = (&path.legs[1], &path.legs[2]);

            if leg2.arrive_freq_mhz <= 0.0
                || leg3.arrive_freq_mhz <= 0.0
                || leg3.receive_freq_mhz <= 0.0
            {
                return Err(Error::SignalSolver(format!(
                    "\"{}\": relay leg frequencies are not set",
                    base.name()
                )));
            }

            let tdrs_turnaround = leg2.transmit_freq_mhz / leg2.arrive_freq_mhz;
            let sat_turnaround = leg3.transmit_freq_mhz / leg3.arrive_freq_mhz;
            let tdrs_id = leg2.transmitter.numeric_id().to_string();

            relay_uplink_mhz = uplink_mhz / leg3.receive_freq_mhz * relay.node4_mhz;

            base.recalculate_frequency_and_media(i, relay_uplink_mhz, &request)?;
            end_short.recalculate_frequency_and_media(i, relay_uplink_mhz, &end_request)?;
            start_long.recalculate_frequency_and_media(i, relay_uplink_mhz, &start_request)?;
            start_short.recalculate_frequency_and_media(i, relay_uplink_mhz, &start_request)?;

            let pilot_mhz = pilot_frequency_mhz(
                relay.service,
                relay.node4_band,
                &tdrs_id,
                relay.smar_id,
                relay.data_flag,
                relay.node4_mhz,
            )?;

            let long = tdrs_turnaround * sat_turnaround * relay.node4_mhz * 1.0E6
                / (interval * SPEED_OF_LIGHT_KM_S);

            let short = pilot_mhz * 1.0E6 / (interval * SPEED_OF_LIGHT_KM_S);

            self.multipliers.push([-long, -short, long, short]);
        }

        let snapshot = |adapter: &RangeAdapter| {
            adapter
                .measurement()
                .cloned()
                .ok_or_else(|| Error::MissingMeasurement(adapter.name().to_string()))
        };

        let records = RelayRecords([
            (RelayPath::EndLong, snapshot(&*base)?),
            (RelayPath::EndShort, snapshot(&*end_short)?),
            (RelayPath::StartLong, snapshot(&*start_long)?),
            (RelayPath::StartShort, snapshot(&*start_short)?),
        ]);

        let mut record = records.0[0].1.clone();

        for (i, multipliers) in self.multipliers.iter().enumerate() {
            record.value[i] = records
                .0
                .iter()
                .zip(multipliers.iter())
                .map(|((_, rec), m)| m * rec.value.get(i).copied().unwrap_or_default())
                .sum();
        }

        if let Some(multipliers) = self.multipliers.first() {
            record.iono_correction = records
                .0
                .iter()
                .zip(multipliers.iter())
                .map(|((_, rec), m)| m * iono_km(rec, 0))
                .sum();

            record.tropo_correction = records
                .0
                .iter()
                .zip(multipliers.iter())
                .map(|((_, rec), m)| m * tropo_km(rec, 0))
                .sum();
        }

        if let Some((role, infeasible)) = records
            .0
            .iter()
            .find(|(_, rec)| rec.feasibility.is_blocked() || rec.feasibility.is_rejected())
        {
            record.feasibility = infeasible.feasibility.tagged(&role.to_string());
            record.feasibility_value = infeasible.feasibility_value;
        }

        record.uplink_frequency_hz = relay_uplink_mhz * 1.0E6;
        record.doppler_count_interval = interval;
        record.tdrs = Some(TdrsMetadata {
            service_access: relay.service,
            node4_frequency_hz: relay.node4_mhz * 1.0E6,
            node4_band: relay.node4_band,
            smar_id: relay.smar_id,
            data_flag: relay.data_flag,
        });

        base.apply_error_model(&mut record, NoisePolicy::Additive)?;

        self.records = Some(records);
        Ok(record)
    }

    fn compute_derivative(
        &self,
        base: &RangeAdapter,
        record: &MeasurementRecord,
        target: &DerivativeTarget,
    ) -> Result<DMatrix<f64>, Error> {
        let rows = record.value.len();

        match &target.parameter {
            EstimationParameter::Bias(bias_type) => Ok(bias_derivatives(
                rows,
                *bias_type,
                record.measurement_type,
            )),
            parameter if parameter.is_state() => {
                let records = self
                    .records
                    .as_ref()
                    .ok_or_else(|| Error::MissingMeasurement(base.name().to_string()))?;

                let mut partials = DMatrix::<f64>::zeros(rows, parameter.size());
                let mut found = false;

                for (k, (_, rec)) in records.0.iter().enumerate() {
                    let (d, participant) = range_partials(&rec.signal_paths, target);
                    found |= participant;

                    if d.nrows() != rows {
                        return Err(Error::DerivativeDimension {
                            expected: rows,
                            got: d.nrows(),
                        });
                    }

                    for (i, multipliers) in self.multipliers.iter().enumerate().take(rows) {
                        let row = d.row(i) * multipliers[k];
                        let sum = partials.row(i) + row;
                        partials.set_row(i, &sum);
                    }
                }

                if !found {
                    return Err(Error::NotAParticipant(target.object.clone()));
                }

                Ok(partials)
            },
            parameter => Ok(DMatrix::zeros(rows, parameter.size())),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(ServiceAccess::SA1, FrequencyBand::S, "7", 0, 0, 2287.5, 13677.5 - 2287.5)]
    #[case(ServiceAccess::SA1, FrequencyBand::K, "7", 0, 0, 2287.5, -1475.0)]
    #[case(ServiceAccess::SA2, FrequencyBand::S, "10", 0, 0, 2106.4, 13697.5 - 2106.5)]
    #[case(ServiceAccess::SA2, FrequencyBand::K, "3", 0, 0, 2287.5, -1075.0)]
    #[case(ServiceAccess::MA, FrequencyBand::S, "8", 2, 0, 2287.5, 13412.5)]
    #[case(ServiceAccess::MA, FrequencyBand::S, "9", 8, 0, 2287.5, 13457.5)]
    #[case(ServiceAccess::MA, FrequencyBand::S, "10", 30, 0, 2287.5, 13622.5)]
    #[case(ServiceAccess::MA, FrequencyBand::S, "10", 12, 0, 2287.5, 13405.0)]
    #[case(ServiceAccess::MA, FrequencyBand::S, "6", 2, 0, 2287.5, -2279.0)]
    #[case(ServiceAccess::MA, FrequencyBand::S, "6", 2, 1, 2287.5, -2287.5)]
    fn pilot_frequencies(
        #[case] service: ServiceAccess,
        #[case] band: FrequencyBand,
        #[case] tdrs_id: &str,
        #[case] smar_id: i32,
        #[case] data_flag: i32,
        #[case] node4_mhz: f64,
        #[case] expected: f64,
    ) {
        let pilot = pilot_frequency_mhz(service, band, tdrs_id, smar_id, data_flag, node4_mhz)
            .unwrap();
        assert_eq!(pilot, expected);
    }

    #[test]
    fn unsupported_pilots() {
        assert_eq!(
            pilot_frequency_mhz(ServiceAccess::MA, FrequencyBand::S, "6", 0, 2, 2287.5),
            Err(ConfigError::InvalidDataFlag(2)),
        );

        for (service, band) in [
            (ServiceAccess::SA1, FrequencyBand::X),
            (ServiceAccess::SA2, FrequencyBand::Unspecified),
            (ServiceAccess::MA, FrequencyBand::K),
        ] {
            assert_eq!(
                pilot_frequency_mhz(service, band, "8", 2, 0, 2287.5),
                Err(ConfigError::UnsupportedPilotFrequency {
                    service,
                    band,
                    tdrs_id: "8".to_string(),
                }),
            );
        }
    }
}
