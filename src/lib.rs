//! # faceword-prep: EEG epoch preprocessing for the FaceWord study
//!
//! Turns each participant's continuous BrainVision recording into cleaned,
//! event-locked, downsampled epochs saved as an MNE-compatible
//! `*-epo.fif` file.  The signal processing follows
//! [MNE-Python](https://mne.tools) step by step.
//!
//! ## Pipeline overview
//!
//! ```text
//! FaceWord_<p>.vhdr (+ .vmrk, .eeg)
//!   │
//!   ├─ brainvision::read_raw_brainvision()   preload, scale to volts
//!   ├─ EOG1/EOG2 → EOG                        channel types
//!   ├─ montage::Montage::standard_1020()      electrode positions
//!   ├─ reference::set_average_reference()     mean of good EEG removed
//!   ├─ interpolate::interpolate_bads()        spherical splines, Fp1/Fp2 excluded
//!   ├─ drop remaining bads
//!   ├─ filter (FIR band-pass)                 0.1 – 40 Hz, zero phase
//!   ├─ events::events_from_annotations()      marker codes
//!   ├─ epoch::Epochs::new()                   −0.2 … 0.5 s, baseline, 100 µV reject
//!   ├─ Epochs::resample()                     → 250 Hz
//!   └─ io::save_epochs()                      preprocessed/<p>-epo.fif
//! ```
//!
//! ## Quick start
//!
//! ```no_run
//! use faceword_prep::{run_batch, DataLayout, PipelineConfig, SessionInfo};
//! use std::path::Path;
//!
//! let session = SessionInfo::load(Path::new("data/session_info.txt")).unwrap();
//! let report = run_batch(&session, &PipelineConfig::default(), &DataLayout::new("data")).unwrap();
//! print!("{report}");
//! ```
//!
//! ## Running individual steps
//!
//! ```no_run
//! use faceword_prep::pipeline::{condition_channels, extract_events, filter_raw};
//! use faceword_prep::{read_raw_brainvision, Epochs, PipelineConfig};
//!
//! let cfg = PipelineConfig::default();
//! let mut raw = read_raw_brainvision("data/FaceWord_Group1.vhdr").unwrap();
//! condition_channels(&mut raw, "Group1", &["T7".to_string()], &cfg).unwrap();
//! filter_raw(&mut raw, &cfg).unwrap();
//! let (events, event_id) = extract_events(&raw, &cfg);
//! let mut epochs = Epochs::new(&raw, &events, &event_id, &cfg).unwrap();
//! epochs.resample(250.0).unwrap();
//! println!("{} epochs: {:?}", epochs.len(), epochs.labels());
//! ```

pub mod brainvision;
pub mod config;
pub mod epoch;
pub mod events;
pub mod fiff;
pub mod filter;
pub mod interpolate;
pub mod io;
pub mod logging;
pub mod montage;
pub mod pipeline;
pub mod raw;
pub mod reference;
pub mod resample;
pub mod session;

// ── Crate-root re-exports ─────────────────────────────────────────────────

pub use brainvision::read_raw_brainvision;
pub use config::{ConditionMap, DataLayout, PipelineConfig};
pub use epoch::Epochs;
pub use events::{events_from_annotations, Event};
pub use fiff::{read_epochs, write_epochs};
pub use filter::{apply_fir_zero_phase, design_bandpass, BandPass};
pub use interpolate::interpolate_bads;
pub use io::save_epochs;
pub use logging::init_file_logger;
pub use montage::Montage;
pub use pipeline::{
    preprocess_participant, preprocess_raw, run_batch, BatchReport, ParticipantOutcome,
    ParticipantSummary, Stage, StageFailure,
};
pub use raw::{Annotation, Channel, ChannelKind, RawRecording};
pub use reference::set_average_reference;
pub use resample::{resample, resample_epochs};
pub use session::{SessionError, SessionInfo};
