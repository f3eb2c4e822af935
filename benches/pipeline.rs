use std::hint::black_box;
use criterion::{criterion_group, criterion_main, Criterion};
use faceword_prep::filter::{apply_fir_zero_phase, design_bandpass};
use faceword_prep::fiff::write_epochs;
use faceword_prep::resample::resample_epochs;
use faceword_prep::{Channel, ConditionMap, Epochs, Event};
use ndarray::{Array2, Array3};

const SFREQ: f64 = 500.0;

/// 32 channels × 60 s of a 10 Hz tone.
fn recording() -> Array2<f64> {
    Array2::from_shape_fn((32, 30_000), |(c, t)| {
        1e-5 * (2.0 * std::f64::consts::PI * 10.0 * t as f64 / SFREQ + c as f64).sin()
    })
}

/// 200 epochs × 32 channels × 351 samples (−0.2 … 0.5 s at 500 Hz).
fn epochs_data() -> Array3<f64> {
    Array3::from_shape_fn((200, 32, 351), |(e, c, t)| ((e + c + t) % 17) as f64 * 1e-6)
}

fn bench_design(c: &mut Criterion) {
    c.bench_function("design_bandpass 0.1–40 Hz @ 500 Hz", |b| {
        b.iter(|| {
            let h = design_bandpass(black_box(0.1), black_box(40.0), SFREQ).unwrap();
            black_box(h.len())
        })
    });
}

fn bench_filter(c: &mut Criterion) {
    let h = design_bandpass(0.1, 40.0, SFREQ).unwrap();
    let data = recording();
    let picks: Vec<usize> = (0..data.nrows()).collect();
    c.bench_function("band-pass [32×30000] (16501 taps)", |b| {
        b.iter(|| {
            let mut x = data.clone();
            apply_fir_zero_phase(&mut x, black_box(&h), &picks).unwrap();
            black_box(x[[0, 0]])
        })
    });
}

fn bench_resample_epochs(c: &mut Criterion) {
    let data = epochs_data();
    c.bench_function("resample_epochs [200×32×351] 500 → 250 Hz", |b| {
        b.iter(|| {
            let y = resample_epochs(black_box(&data), SFREQ, 250.0).unwrap();
            black_box(y.dim())
        })
    });
}

fn bench_write_epochs(c: &mut Criterion) {
    let data = epochs_data();
    let n = data.dim().0;
    let epochs = Epochs {
        data,
        channels: (0..32).map(|i| Channel::eeg(format!("E{i}"))).collect(),
        bads: vec![],
        sfreq: SFREQ,
        tmin: -0.2,
        events: (0..n).map(|i| Event { sample: 1000 + 600 * i, code: 11 }).collect(),
        event_id: ConditionMap::from_pairs([("Word/wPos", 11)]),
        baseline: (-0.2, 0.0),
        reject_eeg: 100e-6,
        selection: (0..n).collect(),
        drop_log: vec![vec![]; n],
        highpass: 0.1,
        lowpass: 40.0,
        raw_sfreq: SFREQ,
    };
    c.bench_function("write_epochs [200×32×351] to memory", |b| {
        b.iter(|| {
            let bytes = write_epochs(Vec::new(), black_box(&epochs)).unwrap();
            black_box(bytes.len())
        })
    });
}

criterion_group!(benches, bench_design, bench_filter, bench_resample_epochs, bench_write_epochs);
criterion_main!(benches);
