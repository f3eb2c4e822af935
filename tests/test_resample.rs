mod common;
use faceword_prep::resample::{final_length, resample, resample_epochs};
use faceword_prep::{Epochs, Event, PipelineConfig};
use ndarray::{Array2, Array3};
use std::f64::consts::PI;

fn tone(f: f64, sfreq: f64, n: usize) -> Array2<f64> {
    Array2::from_shape_fn((1, n), |(_, t)| (2.0 * PI * f * t as f64 / sfreq).sin())
}

fn run_tone_test(src: f64, dst: f64, n: usize, tol: f64) {
    let y = resample(&tone(8.0, src, n), src, dst).unwrap();
    assert_eq!(y.ncols(), final_length(n, src, dst), "[{src} → {dst}] length");
    // Ignore the edges, where padding leaks in.
    let edge = y.ncols() / 8;
    for k in edge..y.ncols() - edge {
        let expect = (2.0 * PI * 8.0 * k as f64 / dst).sin();
        let err = (y[[0, k]] - expect).abs();
        assert!(err < tol, "[{src} → {dst}] sample {k}: error {err:.2e} >= {tol:.0e}");
    }
}

#[test]
fn resample_500_to_250() {
    run_tone_test(500.0, 250.0, 351, 1e-2);
}

// For the next two the stripped padding rounds to a fraction of a sample,
// which shows up as a small constant time offset.

#[test]
fn resample_512_to_250() {
    run_tone_test(512.0, 250.0, 359, 8e-2);
}

#[test]
fn resample_200_to_250() {
    // Upsampling: the Nyquist bin is halved instead of doubled.
    run_tone_test(200.0, 250.0, 141, 8e-2);
}

#[test]
fn empty_collection_resamples_to_empty() {
    let data = Array3::<f64>::zeros((0, 4, 351));
    let out = resample_epochs(&data, 500.0, 250.0).unwrap();
    assert_eq!(out.dim(), (0, 4, 176));
}

#[test]
fn zero_rate_is_rejected() {
    assert!(resample(&tone(8.0, 500.0, 100), 0.0, 250.0).is_err());
}

#[test]
fn epochs_land_on_target_rate_for_any_native_rate() {
    let cfg = PipelineConfig::default();
    for sfreq in [250.0, 500.0, 512.0, 1000.0, 2048.0] {
        let raw = common::synthetic_recording(sfreq, 4.0, &[]);
        let events = [Event { sample: (2.0 * sfreq) as usize, code: 11 }];
        let mut ep = Epochs::new(&raw, &events, &cfg.conditions, &cfg).unwrap();
        let n_native = ep.n_times();
        ep.resample(cfg.target_sfreq).unwrap();

        assert_eq!(ep.sfreq, 250.0);
        assert_eq!(ep.n_times(), final_length(n_native, sfreq, 250.0), "at {sfreq} Hz");
        assert_eq!(ep.len(), 1);
        assert!((ep.tmin + 0.2).abs() < 1.0 / sfreq, "tmin {} at {sfreq} Hz", ep.tmin);
    }
}
