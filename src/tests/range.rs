use crate::prelude::*;
use crate::tests::{
    chain, init_logger, spacecraft, station, t0, two_way, RecedingPath, ScriptedPath, SPACECRAFT,
};

use rstest::rstest;

fn range_adapter(cfg: AdapterConfig, model: ScriptedPath) -> TrackingAdapter {
    TrackingAdapter::new("sim_GS1_SC1_GS1_Range", cfg).with_model(model.boxed())
}

#[test]
fn two_way_range() {
    init_logger();

    let path = two_way(20_000.0, 20_000.0, t0(), &spacecraft());
    let model = ScriptedPath::new(vec![path]);
    let mut adapter = range_adapter(AdapterConfig::new(MeasurementType::Range), model);

    let record = adapter
        .calculate_measurement(true, None, None, true)
        .unwrap();

    assert_eq!(record.measurement_type, MeasurementType::Range);
    assert_eq!(record.value, vec![20_000.0]);
    assert_eq!(record.reason(), "N");
    assert_eq!(record.feasibility_value, 90.0);
    assert_eq!(record.epoch, t0());
    assert_eq!(record.uplink_frequency_hz, 2100.0E6);
    assert_eq!(record.uplink_band, FrequencyBand::S);
    assert_eq!(record.signal_paths.len(), 1);
    assert_eq!(record.covariance, DMatrix::identity(1, 1));

    assert!(adapter.measurement().is_some());
}

#[test]
fn time_tag_at_transmitter() {
    init_logger();

    let path = two_way(20_000.0, 20_000.0, t0(), &spacecraft());
    let t_tx = path.legs[0].tx_epoch;

    let model = ScriptedPath::new(vec![path]).time_tagged_at_transmitter();
    let mut adapter = range_adapter(AdapterConfig::new(MeasurementType::Range), model);

    let record = adapter
        .calculate_measurement(true, None, None, true)
        .unwrap();

    assert_eq!(record.epoch, t_tx);
}

#[rstest]
#[case(true, true, true)]
#[case(true, false, false)]
#[case(false, true, false)]
#[case(false, false, false)]
fn light_time_request(#[case] requested: bool, #[case] configured: bool, #[case] solved: bool) {
    init_logger();

    let model = RecedingPath::new(20_000.0, 0.0);
    let light_time = model.light_time.clone();

    let cfg = AdapterConfig::new(MeasurementType::Range).with_light_time(configured);

    let mut adapter =
        TrackingAdapter::new("sim_GS1_SC1_GS1_Range", cfg).with_model(model.boxed());

    assert_eq!(
        adapter.boolean_parameter("WithLightTime").unwrap(),
        configured
    );

    let record = adapter
        .calculate_measurement(requested, None, None, true)
        .unwrap();

    assert_eq!(record.value, vec![20_000.0]);
    assert_eq!(light_time.get(), solved);
}

#[test]
fn hardware_delays() {
    init_logger();

    let mut path = two_way(10_000.0, 10_000.0, t0(), &spacecraft());
    path.legs[0] = path.legs[0].with_delays(1.0E-6, 0.0);
    path.legs[1] = path.legs[1].with_delays(0.0, 2.0E-6);

    let model = ScriptedPath::new(vec![path]);
    let mut adapter = range_adapter(AdapterConfig::new(MeasurementType::Range), model);

    let record = adapter
        .calculate_measurement(true, None, None, true)
        .unwrap();

    let expected = 0.5 * (20_000.0 + 3.0E-6 * SPEED_OF_LIGHT_KM_S);
    assert!((record.value[0] - expected).abs() < 1.0E-9);
    assert_eq!(record.epoch, t0() + 2.0E-6 * Unit::Second);
}

#[rstest]
#[case(LegStatus::Nominal, LegStatus::Nominal, "N")]
#[case(LegStatus::Nominal, LegStatus::Blocked("Earth".to_string()), "B2Earth")]
#[case(LegStatus::Blocked("Moon".to_string()), LegStatus::Nominal, "B1Moon")]
#[case(
    LegStatus::Blocked("Moon".to_string()),
    LegStatus::Blocked("Earth".to_string()),
    "B1Moon"
)]
fn feasibility_reasons(#[case] up: LegStatus, #[case] down: LegStatus, #[case] reason: &str) {
    init_logger();

    let mut path = two_way(20_000.0, 20_000.0, t0(), &spacecraft());
    path.legs[0] = path.legs[0].with_status(up, 10.0);
    path.legs[1] = path.legs[1].with_status(down, -5.0);

    let model = ScriptedPath::new(vec![path]);
    let mut adapter = range_adapter(AdapterConfig::new(MeasurementType::Range), model);

    let record = adapter
        .calculate_measurement(true, None, None, true)
        .unwrap();

    assert_eq!(record.reason(), reason);
    assert_eq!(record.is_feasible(), reason == "N");
}

#[test]
fn no_station_participant() {
    init_logger();

    let relay = Node::spacecraft("RELAY", "7");
    let path = chain(&[relay.clone(), spacecraft(), relay], &[500.0, 500.0], t0());

    let model = ScriptedPath::new(vec![path]);
    let mut adapter = range_adapter(AdapterConfig::new(MeasurementType::Range), model);

    let record = adapter
        .calculate_measurement(true, None, None, true)
        .unwrap();

    assert_eq!(record.feasibility, Feasibility::Unknown);
    assert_eq!(record.reason(), "");
    assert!(!record.is_feasible());
}

#[test]
fn missing_signal_path() {
    init_logger();

    let mut adapter =
        TrackingAdapter::new("sim_GS1_SC1_GS1_Range", AdapterConfig::new(MeasurementType::Range));

    assert_eq!(
        adapter.calculate_measurement(true, None, None, true),
        Err(Error::MissingSignalPath("sim_GS1_SC1_GS1_Range".to_string())),
    );

    let target = DerivativeTarget::spacecraft(SPACECRAFT, EstimationParameter::Position);

    assert_eq!(
        adapter.calculate_measurement_derivatives(&target),
        Err(Error::MissingSignalPath("sim_GS1_SC1_GS1_Range".to_string())),
    );
}

#[test]
fn derivatives_before_measurement() {
    init_logger();

    let path = two_way(20_000.0, 20_000.0, t0(), &spacecraft());
    let model = ScriptedPath::new(vec![path]);
    let mut adapter = range_adapter(AdapterConfig::new(MeasurementType::Range), model);

    let target = DerivativeTarget::spacecraft(SPACECRAFT, EstimationParameter::Position);

    assert_eq!(
        adapter.calculate_measurement_derivatives(&target),
        Err(Error::MissingMeasurement("sim_GS1_SC1_GS1_Range".to_string())),
    );
}

#[test]
fn solver_failure() {
    init_logger();

    let path = two_way(20_000.0, 20_000.0, t0(), &spacecraft());
    let model = ScriptedPath::new(vec![path]).unsolvable();
    let mut adapter = range_adapter(AdapterConfig::new(MeasurementType::Range), model);

    assert!(matches!(
        adapter.calculate_measurement(true, None, None, true),
        Err(Error::SignalSolver(_))
    ));
    assert!(adapter.measurement().is_none());
}

#[test]
fn empty_signal_path() {
    init_logger();

    let model = ScriptedPath::new(vec![SignalPath::default()]);
    let mut adapter = range_adapter(AdapterConfig::new(MeasurementType::Range), model);

    assert_eq!(
        adapter.calculate_measurement(true, None, None, true),
        Err(Error::NoSignalPath)
    );
}

#[test]
fn bias_and_range_only() {
    init_logger();

    let path = two_way(20_000.0, 20_000.0, t0(), &spacecraft());
    let cfg = AdapterConfig::new(MeasurementType::Range)
        .with_error_model(ErrorModel::default().with_bias(0.25));

    let mut adapter = range_adapter(cfg, ScriptedPath::new(vec![path]));

    let record = adapter
        .calculate_measurement(true, None, None, true)
        .unwrap();

    assert_eq!(record.value, vec![20_000.25]);

    adapter.set_boolean_parameter("RangeOnly", true).unwrap();

    let record = adapter
        .calculate_measurement(true, None, None, true)
        .unwrap();

    assert_eq!(record.value, vec![20_000.0]);
}

#[test]
fn seeded_noise_is_reproducible() {
    init_logger();

    let path = two_way(20_000.0, 20_000.0, t0(), &spacecraft());
    let cfg = AdapterConfig::new(MeasurementType::Range)
        .with_error_model(ErrorModel::default().with_noise_sigma(0.5))
        .with_noise(1234);

    let mut adapter = range_adapter(cfg, ScriptedPath::new(vec![path]));
    let mut cloned = adapter.clone();

    for _ in 0..10 {
        let value = adapter
            .calculate_measurement(true, None, None, true)
            .unwrap()
            .value[0];

        let cloned_value = cloned
            .calculate_measurement(true, None, None, true)
            .unwrap()
            .value[0];

        assert_eq!(value, cloned_value);
    }

    let record = adapter.measurement().unwrap();
    assert_eq!(record.covariance[(0, 0)], 0.25);
}

#[test]
fn noisy_ranges_stay_positive() {
    init_logger();

    let path = two_way(3.0, 3.0, t0(), &spacecraft());
    let cfg = AdapterConfig::new(MeasurementType::Range)
        .with_error_model(ErrorModel::default().with_noise_sigma(0.9))
        .with_noise(7);

    let mut adapter = range_adapter(cfg, ScriptedPath::new(vec![path]));

    for _ in 0..10_000 {
        let record = adapter
            .calculate_measurement(true, None, None, true)
            .unwrap();
        assert!(record.value[0] > 0.0);
    }
}

#[test]
fn media_corrections() {
    init_logger();

    let mut path = two_way(20_000.0, 20_000.0, t0(), &spacecraft());
    path.legs[0] = path.legs[0]
        .with_correction(Correction::range(CorrectionId::Ionosphere, 0.05))
        .with_correction(Correction::range(CorrectionId::Troposphere, 0.01));

    let cfg = AdapterConfig::new(MeasurementType::Range).with_media_correction(true);
    let mut adapter = range_adapter(cfg, ScriptedPath::new(vec![path]));

    let record = adapter
        .calculate_measurement(true, None, None, true)
        .unwrap();

    assert!((record.value[0] - 0.5 * 40_000.06).abs() < 1.0E-9);
    assert!((record.iono_correction - 0.025).abs() < 1.0E-12);
    assert!((record.tropo_correction - 0.005).abs() < 1.0E-12);

    let qa = record.media_qa.unwrap();
    assert!(qa.iono_out_of_range);
    assert!(!qa.tropo_out_of_range);
    assert!(!qa.is_ok());
}

#[test]
fn range_derivatives() {
    init_logger();

    let path = two_way(20_000.0, 20_000.0, t0(), &spacecraft());
    let mut adapter = range_adapter(
        AdapterConfig::new(MeasurementType::Range),
        ScriptedPath::new(vec![path]),
    );

    adapter
        .calculate_measurement(true, None, None, true)
        .unwrap();

    let target = DerivativeTarget::spacecraft(SPACECRAFT, EstimationParameter::Position);
    let partials = adapter
        .calculate_measurement_derivatives(&target)
        .unwrap();

    assert_eq!(partials.shape(), (1, 3));
    assert_eq!(partials[(0, 0)], 1.0);
    assert_eq!(partials[(0, 1)], 0.0);
    assert_eq!(partials[(0, 2)], 0.0);

    let target = DerivativeTarget::bias(MeasurementType::Range);
    let partials = adapter
        .calculate_measurement_derivatives(&target)
        .unwrap();
    assert_eq!(partials.shape(), (1, 1));
    assert_eq!(partials[(0, 0)], 1.0);

    let target = DerivativeTarget::bias(MeasurementType::DsnRange);
    let partials = adapter
        .calculate_measurement_derivatives(&target)
        .unwrap();
    assert_eq!(partials[(0, 0)], 0.0);

    let target = DerivativeTarget {
        object: "SC1_SRP".to_string(),
        kind: ObjectKind::Other,
        parameter: EstimationParameter::Other {
            name: "Cr".to_string(),
            size: 2,
        },
    };
    let partials = adapter
        .calculate_measurement_derivatives(&target)
        .unwrap();
    assert_eq!(partials, &DMatrix::zeros(1, 2));

    let target = DerivativeTarget::spacecraft("SC2", EstimationParameter::Position);
    assert_eq!(
        adapter.calculate_measurement_derivatives(&target),
        Err(Error::NotAParticipant("SC2".to_string()))
    );
}

#[test]
fn usn_and_relay_ranges() {
    init_logger();

    let path = two_way(20_000.0, 20_000.0, t0(), &spacecraft());
    let model = ScriptedPath::new(vec![path]);

    // USN range ignores the configured multiplier
    let mut cfg = AdapterConfig::new(MeasurementType::UsnRange);
    cfg.multiplier = Some(1.0);

    let mut adapter = TrackingAdapter::new("sim_USN_Range", cfg).with_model(model.boxed());

    let record = adapter
        .calculate_measurement(true, None, None, true)
        .unwrap();
    assert_eq!(record.value, vec![20_000.0]);

    let mut cfg = AdapterConfig::new(MeasurementType::TdrsRange);
    cfg.multiplier = Some(1.0);

    let mut adapter = TrackingAdapter::new("sim_SN_Range", cfg).with_model(model.boxed());

    let record = adapter
        .calculate_measurement(true, None, None, true)
        .unwrap();
    assert_eq!(record.value, vec![40_000.0]);

    let target = DerivativeTarget::spacecraft(SPACECRAFT, EstimationParameter::Position);
    let partials = adapter
        .calculate_measurement_derivatives(&target)
        .unwrap();
    assert_eq!(partials[(0, 0)], 2.0);
}

#[test]
fn station_participant_derivatives() {
    init_logger();

    let path = two_way(20_000.0, 20_000.0, t0(), &spacecraft());
    let mut adapter = range_adapter(
        AdapterConfig::new(MeasurementType::Range),
        ScriptedPath::new(vec![path]),
    );

    adapter
        .calculate_measurement(true, None, None, true)
        .unwrap();

    let target = DerivativeTarget::station(&station().name, EstimationParameter::Velocity);
    let partials = adapter
        .calculate_measurement_derivatives(&target)
        .unwrap();

    // identity transition matrices: range does not depend on station velocity
    assert_eq!(partials, &DMatrix::zeros(1, 3));
}
