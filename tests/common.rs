/// Shared helpers: synthetic recordings and BrainVision fixtures.
use std::f64::consts::PI;
use std::io::Write;
use std::path::{Path, PathBuf};

use faceword_prep::{Annotation, Channel, ChannelKind, RawRecording};
use ndarray::Array2;

/// Scalp channels of the synthetic cap (all in the 10-20 layout).
pub const EEG_NAMES: [&str; 15] = [
    "Fp1", "Fp2", "F3", "F4", "Fz", "C3", "C4", "Cz", "P3", "P4", "Pz", "T7", "T8", "O1", "O2",
];

/// Ocular channels, re-typed by the pipeline.
pub const EOG_NAMES: [&str; 2] = ["EOG1", "EOG2"];

#[allow(unused)]
pub fn all_names() -> Vec<&'static str> {
    EEG_NAMES.iter().chain(EOG_NAMES.iter()).copied().collect()
}

/// `[C, T]` volts: per channel a 10 Hz sine of 5 µV with its own phase,
/// plus a slow 0.05 Hz drift of 20 µV that the band-pass removes.
#[allow(unused)]
pub fn synthetic_data(n_chan: usize, n_times: usize, sfreq: f64) -> Array2<f64> {
    Array2::from_shape_fn((n_chan, n_times), |(c, t)| {
        let time = t as f64 / sfreq;
        let phase = c as f64 * PI / 7.0;
        5e-6 * (2.0 * PI * 10.0 * time + phase).sin() + 20e-6 * (2.0 * PI * 0.05 * time).sin()
    })
}

/// In-memory recording with [`EEG_NAMES`] + [`EOG_NAMES`] (typed EEG, as
/// the reader would) and stimulus markers at the given times in seconds.
#[allow(unused)]
pub fn synthetic_recording(sfreq: f64, seconds: f64, markers: &[(f64, &str)]) -> RawRecording {
    let names = all_names();
    let n_times = (seconds * sfreq).round() as usize;
    let data = synthetic_data(names.len(), n_times, sfreq);
    let channels = names
        .iter()
        .map(|&n| Channel { name: n.into(), kind: ChannelKind::Eeg, pos: None })
        .collect();
    let annotations = markers
        .iter()
        .map(|&(t, desc)| Annotation {
            onset: (t * sfreq).round() as usize,
            duration: 1,
            description: format!("Stimulus/{desc}"),
        })
        .collect();
    RawRecording::new(data, sfreq, channels, annotations).unwrap()
}

/// Write `FaceWord_<participant>.{vhdr,vmrk,eeg}` into `dir`.
///
/// Data are stored as multiplexed IEEE_FLOAT_32 in µV; `markers` are
/// `(0-based sample, type, description)`.
#[allow(unused)]
pub fn write_brainvision(
    dir: &Path,
    participant: &str,
    sfreq: f64,
    names: &[&str],
    data: &Array2<f64>,
    markers: &[(usize, &str, &str)],
) -> PathBuf {
    let stem = format!("FaceWord_{participant}");
    let vhdr_path = dir.join(format!("{stem}.vhdr"));

    let mut vhdr = String::from("Brain Vision Data Exchange Header File Version 1.0\n");
    vhdr.push_str("; Data created by the test suite\n\n[Common Infos]\nCodepage=UTF-8\n");
    vhdr.push_str(&format!("DataFile={stem}.eeg\nMarkerFile={stem}.vmrk\n"));
    vhdr.push_str("DataFormat=BINARY\nDataOrientation=MULTIPLEXED\n");
    vhdr.push_str(&format!("NumberOfChannels={}\n", names.len()));
    vhdr.push_str(&format!("SamplingInterval={}\n\n", 1e6 / sfreq));
    vhdr.push_str("[Binary Infos]\nBinaryFormat=IEEE_FLOAT_32\n\n[Channel Infos]\n");
    for (i, name) in names.iter().enumerate() {
        vhdr.push_str(&format!("Ch{}={name},,1,µV\n", i + 1));
    }
    std::fs::write(&vhdr_path, vhdr).unwrap();

    let mut vmrk = String::from("Brain Vision Data Exchange Marker File, Version 1.0\n\n");
    vmrk.push_str(&format!("[Common Infos]\nCodepage=UTF-8\nDataFile={stem}.eeg\n\n"));
    vmrk.push_str("[Marker Infos]\nMk1=New Segment,,1,1,0,20230301101500000000\n");
    for (i, (sample, kind, desc)) in markers.iter().enumerate() {
        vmrk.push_str(&format!("Mk{}={kind},{desc},{},1,0\n", i + 2, sample + 1));
    }
    std::fs::write(dir.join(format!("{stem}.vmrk")), vmrk).unwrap();

    let mut eeg = std::io::BufWriter::new(std::fs::File::create(dir.join(format!("{stem}.eeg"))).unwrap());
    for t in 0..data.ncols() {
        for c in 0..data.nrows() {
            eeg.write_all(&((data[[c, t]] * 1e6) as f32).to_le_bytes()).unwrap();
        }
    }
    eeg.flush().unwrap();
    vhdr_path
}

/// Full-cap fixture for `participant` with `S <n>` stimulus markers at the
/// given times in seconds.
#[allow(unused)]
pub fn write_fixture(
    dir: &Path,
    participant: &str,
    sfreq: f64,
    seconds: f64,
    stimuli: &[(f64, &str)],
) -> PathBuf {
    let names = all_names();
    let n_times = (seconds * sfreq).round() as usize;
    let data = synthetic_data(names.len(), n_times, sfreq);
    let markers: Vec<(usize, &str, &str)> = stimuli
        .iter()
        .map(|&(t, desc)| ((t * sfreq).round() as usize, "Stimulus", desc))
        .collect();
    write_brainvision(dir, participant, sfreq, &names, &data, &markers)
}

#[allow(unused)]
pub fn write_session(dir: &Path, text: &str) -> PathBuf {
    let path = dir.join("session_info.txt");
    std::fs::write(&path, text).unwrap();
    path
}
