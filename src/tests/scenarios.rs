use log::info;
use rstest::*;

use crate::{
    prelude::{
        Comparator, DensityCombiner, DensityOpts, Pipeline, QualityFlag, Quantity, Sample,
        StationInputs, TimeSeries,
    },
    tests::{daily_series, day, init_logger, test_station},
    time::DateRange,
};

#[fixture]
fn density_opts() -> DensityOpts {
    DensityOpts::default()
        .with_smoothing_window(1.0)
        .without_outlier_rejection()
}

#[rstest]
fn steady_accumulation(density_opts: DensityOpts) {
    init_logger();

    let acc = daily_series("acc", Quantity::Accumulation, &[0.0, 0.10, 0.20]);
    let swe = daily_series("swe", Quantity::SWE, &[0.0, 20.0, 45.0]);

    let products = DensityCombiner::new("nmlb", &density_opts)
        .combine(&acc, &swe)
        .unwrap();

    let raw = products.raw.samples();
    assert_eq!(raw[0], Sample::gap(day(1)));
    assert_eq!(raw[1].value, Some(200.0));
    assert_eq!(raw[1].flag, QualityFlag::Valid);
    assert_eq!(raw[2].value, Some(225.0));
    assert_eq!(raw[2].flag, QualityFlag::Valid);

    assert_eq!(products.rejections.near_zero_denominator, 1);
    assert_eq!(products.raw.id, "nmlb_density_raw");
    assert_eq!(products.smoothed.id, "nmlb_density");
}

#[rstest]
#[case(0.001, 5.0)]
#[case(0.0, 5.0)]
#[case(0.0, 0.0)]
#[case(-0.05, 20.0)]
fn near_zero_accumulation(density_opts: DensityOpts, #[case] acc_m: f64, #[case] swe: f64) {
    init_logger();

    let acc = daily_series("acc", Quantity::Accumulation, &[acc_m]);
    let swe = daily_series("swe", Quantity::SWE, &[swe]);

    let products = DensityCombiner::new("nmlb", &density_opts)
        .combine(&acc, &swe)
        .unwrap();

    let s = products.raw.samples()[0];
    assert_eq!(s.flag, QualityFlag::Rejected);
    assert!(s.value.map(|v| v.is_finite()).unwrap_or(true));
    assert_eq!(products.smoothed.samples()[0].value, None);
}

#[rstest]
fn interpolated_inputs(density_opts: DensityOpts) {
    let acc = TimeSeries::from_samples(
        "acc",
        Quantity::Accumulation,
        vec![
            Sample::valid(day(1), 0.1),
            Sample::interpolated(day(2), 0.1),
            Sample::rejected(day(3), Some(0.1)),
        ],
    )
    .unwrap();
    let swe = daily_series("swe", Quantity::SWE, &[30.0, 30.0, 30.0]);

    let products = DensityCombiner::new("nmlb", &density_opts)
        .combine(&acc, &swe)
        .unwrap();

    let raw = products.raw.samples();
    assert_eq!(raw[0].flag, QualityFlag::Valid);
    assert_eq!(raw[1].flag, QualityFlag::Interpolated);
    assert_eq!(raw[2], Sample::gap(day(3)));
    assert_eq!(products.rejections.missing_input, 1);

    let strict = DensityOpts {
        accept_interpolated: false,
        ..density_opts
    };
    let products = DensityCombiner::new("nmlb", &strict).combine(&acc, &swe).unwrap();
    assert_eq!(products.raw.samples()[1], Sample::gap(day(2)));
}

#[test]
fn station_from_memory() {
    init_logger();

    let mut cfg = test_station("rh.csv", "bias.csv");
    cfg.density = cfg.density.with_reporting(30.0, 0.5);

    // reflector heights shrink as snow accumulates
    let heights = daily_series("rh", Quantity::HeightAnomaly, &[2.0, 1.9, 1.8, 1.7]);
    let bias = daily_series("bias", Quantity::BaselineBias, &[0.010, 0.030, 0.055, 0.080]);

    let stakes = daily_series("stakes", Quantity::Accumulation, &[0.0, 0.12, 0.18, 0.30]);

    let range = DateRange::new(day(1), day(4)).unwrap();
    let products = Pipeline::new(&cfg, range)
        .process(&StationInputs {
            heights,
            bias,
            references: vec![stakes],
        })
        .unwrap();

    let acc = products
        .accumulation
        .iter()
        .map(|s| s.value.unwrap())
        .collect::<Vec<_>>();
    for (value, expected) in acc.iter().zip([0.0, 0.1, 0.2, 0.3]) {
        assert!((value - expected).abs() < 1.0E-9);
    }

    let swe = products.swe.iter().map(|s| s.value.unwrap()).collect::<Vec<_>>();
    for (value, expected) in swe.iter().zip([0.0, 20.0, 45.0, 70.0]) {
        assert!((value - expected).abs() < 1.0E-9);
    }

    let density = products.density.raw.samples();
    assert_eq!(density[0].flag, QualityFlag::Rejected);
    assert!((density[1].value.unwrap() - 200.0).abs() < 1.0E-6);
    assert!((density[2].value.unwrap() - 225.0).abs() < 1.0E-6);
    assert!((density[3].value.unwrap() - 700.0 / 3.0).abs() < 1.0E-6);

    let stats = products
        .comparison
        .get("nmlb_accumulation", "stakes")
        .unwrap();
    info!("{:?}", stats);
    assert_eq!(stats.samples, 4);
    assert!(stats.bias.unwrap().abs() < 1.0E-9);
    assert!(stats.rmse.unwrap() > 0.0);

    assert_eq!(products.summary.zero_point_m, Some(0.010));
    assert_eq!(products.summary.density_raw.valid, 3);
    assert_eq!(products.summary.start, Some(day(1)));
    assert_eq!(products.summary.end, Some(day(4)));
}

#[test]
fn rmse_against_itself() {
    let swe = daily_series("swe", Quantity::SWE, &[0.0, 12.0, 30.0, 28.0, 55.0]);
    let range = DateRange::new(day(1), day(5)).unwrap();
    let cfg = test_station("rh.csv", "bias.csv");
    let grid =
        crate::prelude::TimeGrid::new(range.start, range.end, cfg.aligner.step()).unwrap();
    let aligner = crate::prelude::Aligner::new(grid, cfg.aligner.max_gap());
    let stats = Comparator::new(&aligner).compare(&swe, &swe.with_id("pillow"));
    assert_eq!(stats.rmse, Some(0.0));
    assert_eq!(stats.samples, 5);
}
