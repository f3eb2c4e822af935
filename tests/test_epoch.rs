mod common;
use faceword_prep::epoch::{IGNORED, NO_DATA};
use faceword_prep::pipeline::extract_events;
use faceword_prep::{Channel, ConditionMap, Epochs, Event, PipelineConfig, RawRecording};
use ndarray::{s, Array2};

const SFREQ: f64 = 100.0;

/// Two EEG channels, flat zero, 10 s at 100 Hz.
fn flat_recording() -> RawRecording {
    let data = Array2::zeros((2, 1000));
    RawRecording::new(data, SFREQ, vec![Channel::eeg("Fz"), Channel::eeg("Cz")], vec![]).unwrap()
}

/// Set Cz to `amplitude` from just after the event to the end of its window.
/// The baseline (−0.2 … 0 s) stays exactly zero, so peak-to-peak equals
/// `|amplitude|` with no rounding.
fn step_after(raw: &mut RawRecording, event: usize, amplitude: f64) {
    raw.data.slice_mut(s![1, event + 1..=event + 50]).fill(amplitude);
}

fn word_events(samples: &[usize]) -> Vec<Event> {
    samples.iter().map(|&sample| Event { sample, code: 11 }).collect()
}

#[test]
fn threshold_boundary_is_exclusive() {
    let cfg = PipelineConfig::default();
    let mut raw = flat_recording();
    step_after(&mut raw, 100, 100e-6); // exactly at threshold → kept
    step_after(&mut raw, 300, 100.001e-6); // above → dropped
    step_after(&mut raw, 500, -100e-6); // exactly at threshold, downward → kept
    step_after(&mut raw, 700, -100.001e-6); // above, downward → dropped
    let events = word_events(&[100, 300, 500, 700]);

    let ep = Epochs::new(&raw, &events, &cfg.conditions, &cfg).unwrap();
    assert_eq!(ep.selection, [0, 2]);
    assert_eq!(ep.drop_log[1], ["Cz"]);
    assert_eq!(ep.drop_log[3], ["Cz"]);
    assert_eq!(ep.n_dropped(), 2);
}

#[test]
fn baseline_mean_is_zero_on_eeg() {
    let cfg = PipelineConfig::default();
    let raw = common::synthetic_recording(500.0, 4.0, &[]);
    let events = word_events(&[1000, 1500]);
    let ep = Epochs::new(&raw, &events, &cfg.conditions, &cfg).unwrap();

    let base: Vec<usize> = ep
        .times()
        .iter()
        .enumerate()
        .filter(|&(_, &t)| t <= 0.0)
        .map(|(i, _)| i)
        .collect();
    assert_eq!(base.len(), 101); // −0.2 … 0 s inclusive at 500 Hz
    for e in 0..ep.len() {
        for c in 0..ep.channels.len() {
            let mean = base.iter().map(|&t| ep.data[[e, c, t]]).sum::<f64>() / base.len() as f64;
            approx::assert_abs_diff_eq!(mean, 0.0, epsilon = 1e-18);
        }
    }
}

#[test]
fn labels_follow_restricted_map() {
    let cfg = PipelineConfig::default();
    let raw = common::synthetic_recording(
        250.0,
        8.0,
        &[(1.0, "S 11"), (2.0, "S 21"), (3.0, "S 11"), (4.0, "S  7"), (5.0, "S 12")],
    );
    let (events, event_id) = extract_events(&raw, &cfg);
    assert_eq!(
        event_id,
        ConditionMap::from_pairs([("Word/wPos", 11), ("Image/wPos", 21), ("Word/wNeg", 12)])
    );

    let ep = Epochs::new(&raw, &events, &event_id, &cfg).unwrap();
    assert_eq!(ep.labels(), ["Word/wPos", "Image/wPos", "Word/wPos", "Word/wNeg"]);
    assert_eq!(ep.drop_log[3], [IGNORED]);
    for label in ep.labels() {
        assert!(cfg.conditions.code_for(label).is_some(), "{label} not in the global map");
    }
}

#[test]
fn windows_past_either_end_are_dropped() {
    let cfg = PipelineConfig::default();
    let raw = flat_recording();
    // 19 samples before the start needs 20; 950 + 50 reaches sample 1000.
    let events = word_events(&[19, 20, 949, 950]);
    let ep = Epochs::new(&raw, &events, &cfg.conditions, &cfg).unwrap();
    assert_eq!(ep.selection, [1, 2]);
    assert_eq!(ep.drop_log[0], [NO_DATA]);
    assert_eq!(ep.drop_log[3], [NO_DATA]);
}

#[test]
fn invalid_windows_are_rejected() {
    let raw = flat_recording();
    let events = word_events(&[500]);
    let inverted = PipelineConfig { tmin: 0.5, tmax: -0.2, ..Default::default() };
    assert!(Epochs::new(&raw, &events, &inverted.conditions, &inverted).is_err());

    let outside = PipelineConfig { baseline: (-0.5, 0.0), ..Default::default() };
    assert!(Epochs::new(&raw, &events, &outside.conditions, &outside).is_err());
}
