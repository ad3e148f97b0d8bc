use crate::prelude::*;
use crate::tests::{
    init_logger, spacecraft, t0, two_way, RecedingPath, ScriptedPath, SPACECRAFT, UPLINK_MHZ,
};

use rstest::rstest;

fn doppler_adapter(cfg: AdapterConfig, model: ScriptedPath) -> TrackingAdapter {
    let name = format!("sim_GS1_SC1_GS1_{}", cfg.measurement_type);
    TrackingAdapter::new(&name, cfg).with_model(model.boxed())
}

/// End path of 2x20000 km, Start path `shortening_km` shorter, `interval_s` earlier
fn receding_model(shortening_km: f64, interval_s: f64) -> ScriptedPath {
    let half = shortening_km / 2.0;
    ScriptedPath::new(vec![two_way(20_000.0, 20_000.0, t0(), &spacecraft())]).with_offset_paths(
        -interval_s,
        vec![two_way(
            20_000.0 - half,
            20_000.0 - half,
            t0() - interval_s * Unit::Second,
            &spacecraft(),
        )],
    )
}

#[test]
fn static_geometry() {
    init_logger();

    let model = ScriptedPath::new(vec![two_way(20_000.0, 20_000.0, t0(), &spacecraft())]);
    let mut adapter = doppler_adapter(AdapterConfig::new(MeasurementType::DsnDoppler), model);

    let record = adapter
        .calculate_measurement(true, None, None, true)
        .unwrap();

    assert_eq!(record.value, vec![-UPLINK_MHZ * 1.0E6]);
    assert_eq!(record.reason(), "N");
    assert_eq!(record.doppler_count_interval, 1.0);
    assert_eq!(record.uplink_frequency_hz, UPLINK_MHZ * 1.0E6);
}

#[test]
fn transponder_turnaround() {
    init_logger();

    let sc = spacecraft().with_transponder(S_BAND_TURNAROUND_RATIO);
    let model = ScriptedPath::new(vec![two_way(20_000.0, 20_000.0, t0(), &sc)]);
    let mut adapter = doppler_adapter(AdapterConfig::new(MeasurementType::DsnDoppler), model);

    let record = adapter
        .calculate_measurement(true, None, None, true)
        .unwrap();

    let expected = -S_BAND_TURNAROUND_RATIO * UPLINK_MHZ * 1.0E6;
    assert!((record.value[0] - expected).abs() < 1.0E-6);
}

#[test]
fn receding_spacecraft() {
    init_logger();

    let mut adapter = doppler_adapter(
        AdapterConfig::new(MeasurementType::DsnDoppler),
        receding_model(2.0, 10.0),
    );

    adapter.set_doppler_count_interval(10.0).unwrap();

    let record = adapter
        .calculate_measurement(true, None, None, true)
        .unwrap();

    let dtdt = 2.0 / SPEED_OF_LIGHT_KM_S;
    let expected = -UPLINK_MHZ * 1.0E6 * (10.0 - dtdt) / 10.0;

    assert!(
        (record.value[0] - expected).abs() < 1.0E-6,
        "{} vs {}",
        record.value[0],
        expected
    );
    assert_eq!(record.doppler_count_interval, 10.0);

    match adapter.kind() {
        MeasurementKind::Doppler(doppler) => {
            assert_eq!(doppler.flavor(), DopplerFlavor::Dsn);
            assert_eq!(doppler.end_record().unwrap().value, vec![40_000.0]);
            assert_eq!(doppler.start_record().unwrap().value, vec![39_998.0]);
        },
        kind => panic!("unexpected measurement kind {:?}", kind),
    }
}

#[rstest]
#[case(1.0)]
#[case(10.0)]
#[case(60.0)]
fn start_path_epoch(#[case] interval_s: f64) {
    init_logger();

    let model = RecedingPath::new(20_000.0, 0.1);
    let informed_interval = model.count_interval_s.clone();

    let mut adapter = TrackingAdapter::new(
        "sim_GS1_SC1_GS1_DSN_TCP",
        AdapterConfig::new(MeasurementType::DsnDoppler),
    )
    .with_model(model.boxed());

    adapter.set_doppler_count_interval(interval_s).unwrap();

    let record = adapter
        .calculate_measurement(true, None, None, true)
        .unwrap();

    let value = record.value[0];
    assert_eq!(record.epoch, t0());

    // the model is informed, the offset is applied once
    assert_eq!(informed_interval.get(), interval_s);

    match adapter.kind() {
        MeasurementKind::Doppler(doppler) => {
            let start = doppler.start_record().unwrap();
            assert_eq!(start.epoch, t0() - interval_s * Unit::Second);
            assert!((start.value[0] - model.round_trip_km(start.epoch)).abs() < 1.0E-9);

            let end = doppler.end_record().unwrap();
            assert!((end.value[0] - 40_000.0).abs() < 1.0E-9);
        },
        kind => panic!("unexpected measurement kind {:?}", kind),
    }

    let dtdt = 2.0 * 0.1 * interval_s / SPEED_OF_LIGHT_KM_S;
    let expected = -UPLINK_MHZ * 1.0E6 * (interval_s - dtdt) / interval_s;

    assert!(
        (value - expected).abs() < 1.0E-6,
        "{} vs {}",
        value,
        expected
    );
}

#[test]
fn observation_count_interval() {
    init_logger();

    let mut adapter = doppler_adapter(
        AdapterConfig::new(MeasurementType::DsnDoppler),
        receding_model(2.0, 60.0),
    );

    let observation = ObservationData::at(t0()).with_doppler_count_interval(60.0);

    let record = adapter
        .calculate_measurement(true, Some(&observation), None, false)
        .unwrap();

    assert_eq!(record.doppler_count_interval, 60.0);

    let dtdt = 2.0 / SPEED_OF_LIGHT_KM_S;
    let expected = -UPLINK_MHZ * 1.0E6 * (60.0 - dtdt) / 60.0;
    assert!((record.value[0] - expected).abs() < 1.0E-6);

    // configuration applies otherwise
    assert_eq!(adapter.doppler_count_interval(), 1.0);
}

#[test]
fn taylor_series_differencing() {
    init_logger();

    let cfg = AdapterConfig::new(MeasurementType::DsnDoppler);

    let mut plain = doppler_adapter(cfg.clone(), receding_model(2.0, 1.0));
    let mut taylor = doppler_adapter(cfg.with_taylor_series(true), receding_model(2.0, 1.0));

    let plain = plain
        .calculate_measurement(true, None, None, true)
        .unwrap()
        .value[0];

    let taylor = taylor
        .calculate_measurement(true, None, None, true)
        .unwrap()
        .value[0];

    assert!((plain - taylor).abs() < 1.0E-3, "{} vs {}", plain, taylor);
}

#[test]
fn ground_network_range_rate() {
    init_logger();

    let model = ScriptedPath::new(vec![two_way(20_000.0, 20_000.0, t0(), &spacecraft())])
        .with_offset_paths(
            -10.0,
            vec![two_way(19_999.0, 19_999.0, t0() - 10.0 * Unit::Second, &spacecraft())],
        );

    let mut cfg = AdapterConfig::new(MeasurementType::GnDoppler);
    cfg.doppler_count_interval = 10.0;

    let mut adapter = doppler_adapter(cfg, model);

    let record = adapter
        .calculate_measurement(true, None, None, true)
        .unwrap();

    assert!((record.value[0] - 0.2).abs() < 1.0E-12);

    let target = DerivativeTarget::spacecraft(SPACECRAFT, EstimationParameter::Position);
    let partials = adapter
        .calculate_measurement_derivatives(&target)
        .unwrap();

    // line of sight is unchanged over the count interval
    assert_eq!(partials, &DMatrix::zeros(1, 3));
}

#[test]
fn ionospheric_delay_removal() {
    init_logger();

    let mut end = two_way(20_000.0, 20_000.0, t0(), &spacecraft());
    end.legs[0] = end.legs[0].with_correction(Correction::range(CorrectionId::Ionosphere, 0.01));

    let model = ScriptedPath::new(vec![end]).with_offset_paths(
        -10.0,
        vec![two_way(19_999.0, 19_999.0, t0() - 10.0 * Unit::Second, &spacecraft())],
    );

    let mut cfg = AdapterConfig::new(MeasurementType::GnDoppler).with_media_correction(true);
    cfg.doppler_count_interval = 10.0;

    let mut adapter = doppler_adapter(cfg, model);

    let record = adapter
        .calculate_measurement(true, None, None, true)
        .unwrap();

    // the ionosphere delays group and advances phase by the same amount
    assert!((record.value[0] - 1.99 / 10.0).abs() < 1.0E-9);
    assert!((record.iono_correction + 0.001).abs() < 1.0E-12);
}

#[test]
fn blocked_paths() {
    init_logger();

    let mut start = two_way(19_999.0, 19_999.0, t0() - 1.0 * Unit::Second, &spacecraft());
    start.legs[1] = start.legs[1].with_status(LegStatus::Blocked("Earth".to_string()), -3.0);

    let model = ScriptedPath::new(vec![two_way(20_000.0, 20_000.0, t0(), &spacecraft())])
        .with_offset_paths(-1.0, vec![start.clone()]);

    let mut adapter = doppler_adapter(AdapterConfig::new(MeasurementType::DsnDoppler), model);

    let record = adapter
        .calculate_measurement(true, None, None, true)
        .unwrap();

    assert_eq!(record.reason(), "B2EarthS");
    assert_eq!(record.feasibility_value, -3.0);

    let mut end = two_way(20_000.0, 20_000.0, t0(), &spacecraft());
    end.legs[0] = end.legs[0].with_status(LegStatus::Blocked("Moon".to_string()), 1.0);

    let model = ScriptedPath::new(vec![end]).with_offset_paths(-1.0, vec![start]);
    let mut adapter = doppler_adapter(AdapterConfig::new(MeasurementType::DsnDoppler), model);

    let record = adapter
        .calculate_measurement(true, None, None, true)
        .unwrap();

    assert_eq!(record.reason(), "B1MoonE");
}

#[test]
fn ramped_doppler() {
    init_logger();

    let table = RampTable::new(vec![RampRecord {
        epoch: t0() - 1.0 * Unit::Day,
        station_id: "34".to_string(),
        spacecraft_id: "101".to_string(),
        band: FrequencyBand::S,
        ramp_type: RampType::Linear,
        frequency_hz: UPLINK_MHZ * 1.0E6,
        rate_hz_s: 0.0,
    }]);

    let mut adapter = doppler_adapter(
        AdapterConfig::new(MeasurementType::DsnDoppler),
        receding_model(2.0, 1.0),
    );

    let ramped = adapter
        .calculate_measurement(true, None, Some(&table), false)
        .unwrap()
        .value[0];

    let constant = adapter
        .calculate_measurement(true, None, None, false)
        .unwrap()
        .value[0];

    assert!(((ramped - constant) / constant).abs() < 1.0E-12);
}

#[test]
fn rejected_ramp_is_not_noisy() {
    init_logger();

    let table = RampTable::new(vec![RampRecord {
        epoch: t0() + 1.0 * Unit::Hour,
        station_id: "34".to_string(),
        spacecraft_id: "101".to_string(),
        band: FrequencyBand::S,
        ramp_type: RampType::Linear,
        frequency_hz: UPLINK_MHZ * 1.0E6,
        rate_hz_s: 0.0,
    }]);

    let cfg = AdapterConfig::new(MeasurementType::DsnDoppler)
        .with_error_model(ErrorModel::default().with_noise_sigma(5.0))
        .with_noise(42);

    let mut adapter = doppler_adapter(cfg, receding_model(2.0, 1.0));

    let record = adapter
        .calculate_measurement(true, None, Some(&table), false)
        .unwrap();

    assert_eq!(record.value, vec![0.0]);
    assert_eq!(record.reason(), "R");
}

#[test]
fn doppler_derivatives() {
    init_logger();

    let mut adapter = doppler_adapter(
        AdapterConfig::new(MeasurementType::DsnDoppler),
        receding_model(2.0, 1.0),
    );

    adapter
        .calculate_measurement(true, None, None, true)
        .unwrap();

    let target = DerivativeTarget::spacecraft(SPACECRAFT, EstimationParameter::Velocity);
    let partials = adapter
        .calculate_measurement_derivatives(&target)
        .unwrap();
    assert_eq!(partials.shape(), (1, 3));

    let target = DerivativeTarget::bias(MeasurementType::DsnDoppler);
    let partials = adapter
        .calculate_measurement_derivatives(&target)
        .unwrap();
    assert_eq!(partials[(0, 0)], 1.0);

    let target = DerivativeTarget::spacecraft("SC2", EstimationParameter::Position);
    assert_eq!(
        adapter.calculate_measurement_derivatives(&target),
        Err(Error::NotAParticipant("SC2".to_string()))
    );
}
