//! Per-participant preprocessing and the batch driver.
//!
//! One participant moves through
//!
//! ```text
//! Load → Condition → Filter → Epoch → Resample → Save
//! ```
//!
//! Each stage is a plain function over [`RawRecording`] / [`Epochs`] so it
//! can be run and tested on its own.  [`run_batch`] runs every configured
//! participant in turn; a failure is recorded with the [`Stage`] it happened
//! in and the batch moves on to the next participant.
use std::fmt;
use std::path::PathBuf;

use anyhow::{Context, Result};
use log::{error, info, warn};

use crate::brainvision::read_raw_brainvision;
use crate::config::{ConditionMap, DataLayout, PipelineConfig};
use crate::epoch::Epochs;
use crate::events::{events_from_annotations, Event};
use crate::filter::{apply_fir_zero_phase, BandPass};
use crate::interpolate::interpolate_bads;
use crate::io::save_epochs;
use crate::montage::Montage;
use crate::raw::{ChannelKind, RawRecording};
use crate::reference::set_average_reference;
use crate::session::SessionInfo;

// ── Stages ────────────────────────────────────────────────────────────────

/// Processing stage of one participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Reading the BrainVision recording.
    Load,
    /// Channel types, montage, reference, bad-channel handling.
    Condition,
    /// Band-pass filtering.
    Filter,
    /// Event extraction, epoching and rejection.
    Epoch,
    /// Resampling the epochs to the target rate.
    Resample,
    /// Writing the epochs file.
    Save,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Load => "load",
            Stage::Condition => "condition",
            Stage::Filter => "filter",
            Stage::Epoch => "epoch",
            Stage::Resample => "resample",
            Stage::Save => "save",
        };
        f.write_str(name)
    }
}

/// An error tagged with the stage that produced it.
#[derive(Debug)]
pub struct StageFailure {
    pub stage: Stage,
    pub error: anyhow::Error,
}

impl fmt::Display for StageFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} stage failed: {:#}", self.stage, self.error)
    }
}

trait AtStage<T> {
    fn at(self, stage: Stage) -> std::result::Result<T, StageFailure>;
}

impl<T> AtStage<T> for Result<T> {
    fn at(self, stage: Stage) -> std::result::Result<T, StageFailure> {
        self.map_err(|error| StageFailure { stage, error })
    }
}

/// Load the recording of `participant`.
pub fn load_raw(participant: &str, layout: &DataLayout) -> Result<RawRecording> {
    info!("Loading in raw data for participant {participant}");
    let path = layout.raw_path(participant);
    read_raw_brainvision(&path).with_context(|| format!("load {}", path.display()))
}

/// Channel conditioning: EOG types, montage, average reference, then
/// interpolation and removal of `bad_channels`.
pub fn condition_channels(
    raw: &mut RawRecording,
    participant: &str,
    bad_channels: &[String],
    cfg: &PipelineConfig,
) -> Result<()> {
    raw.set_channel_types(&cfg.eog_channels, ChannelKind::Eog)?;

    info!("Setting the montage for participant {participant}");
    Montage::standard_1020().apply(raw);

    info!("Setting the reference for participant {participant}");
    set_average_reference(raw);

    if bad_channels.is_empty() {
        info!("No bad channels for participant {participant}");
        return Ok(());
    }
    info!("Dropping the bad channels for participant {participant}. Bad channels: {bad_channels:?}");
    raw.set_bads(bad_channels)?;
    interpolate_bads(raw, &cfg.interpolation_exclude).context("interpolating bad channels")?;
    let remaining = raw.bads.clone();
    raw.drop_channels(&remaining)?;
    info!(
        "{} channels remain after dropping {:?}",
        raw.n_channels(),
        remaining
    );
    Ok(())
}

/// Zero-phase band-pass of the EEG channels from `cfg.l_freq` to `cfg.h_freq`.
pub fn filter_raw(raw: &mut RawRecording, cfg: &PipelineConfig) -> Result<()> {
    let band = BandPass::new(cfg.l_freq, cfg.h_freq, raw.sfreq)?;
    let h = band.design()?;
    info!(
        "Filtering raw data: {} - {} Hz band-pass, {} taps (hamming window, {:.2} / {:.2} Hz transitions)",
        band.l_freq,
        band.h_freq,
        h.len(),
        band.l_trans,
        band.h_trans
    );
    if h.len() > raw.n_times() {
        warn!(
            "filter_length ({}) is longer than the signal ({}), distortion is likely",
            h.len(),
            raw.n_times()
        );
    }
    let picks = raw.eeg_picks();
    apply_fir_zero_phase(&mut raw.data, &h, &picks)?;
    raw.highpass = band.l_freq;
    raw.lowpass = band.h_freq;
    Ok(())
}

/// Event table of `raw` and the conditions that actually occur in it.
pub fn extract_events(raw: &RawRecording, cfg: &PipelineConfig) -> (Vec<Event>, ConditionMap) {
    let events = events_from_annotations(&raw.annotations);
    let event_id = cfg.conditions.restrict_to(&events);
    let codes: Vec<String> = event_id.iter().map(|(l, c)| format!("{l}: {c}")).collect();
    info!("Used Annotations descriptions: [{}]", codes.join(", "));
    (events, event_id)
}

/// Epoch `raw` around `events` and resample to `cfg.target_sfreq`.
pub fn build_epochs(
    raw: &RawRecording,
    events: &[Event],
    event_id: &ConditionMap,
    cfg: &PipelineConfig,
) -> std::result::Result<Epochs, StageFailure> {
    let mut epochs = Epochs::new(raw, events, event_id, cfg).at(Stage::Epoch)?;
    if epochs.sfreq != cfg.target_sfreq {
        epochs.resample(cfg.target_sfreq).at(Stage::Resample)?;
    }
    Ok(epochs)
}

/// Everything after loading: condition, filter, epoch and resample.
pub fn preprocess_raw(
    mut raw: RawRecording,
    participant: &str,
    bad_channels: &[String],
    cfg: &PipelineConfig,
) -> std::result::Result<Epochs, StageFailure> {
    condition_channels(&mut raw, participant, bad_channels, cfg).at(Stage::Condition)?;

    info!("Filtering the data for participant {participant}");
    filter_raw(&mut raw, cfg).at(Stage::Filter)?;

    let (events, event_id) = extract_events(&raw, cfg);
    build_epochs(&raw, &events, &event_id, cfg)
}

// ── Outcomes ──────────────────────────────────────────────────────────────

/// What a successful participant run produced.
#[derive(Debug, Clone)]
pub struct ParticipantSummary {
    pub participant: String,
    pub n_epochs: usize,
    pub n_dropped: usize,
    pub n_channels: usize,
    pub sfreq: f64,
    /// Conditions present in the output, in table order.
    pub conditions: Vec<String>,
    pub output: PathBuf,
}

/// Result of one participant.
#[derive(Debug)]
pub enum ParticipantOutcome {
    Completed(ParticipantSummary),
    Failed {
        participant: String,
        failure: StageFailure,
    },
}

impl ParticipantOutcome {
    pub fn participant(&self) -> &str {
        match self {
            ParticipantOutcome::Completed(s) => &s.participant,
            ParticipantOutcome::Failed { participant, .. } => participant,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ParticipantOutcome::Completed(_))
    }
}

impl fmt::Display for ParticipantOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParticipantOutcome::Completed(s) => write!(
                f,
                "{}: {} epochs kept, {} dropped, {} channels @ {} Hz -> {}",
                s.participant,
                s.n_epochs,
                s.n_dropped,
                s.n_channels,
                s.sfreq,
                s.output.display()
            ),
            ParticipantOutcome::Failed { participant, failure } => {
                write!(f, "{participant}: FAILED, {failure}")
            }
        }
    }
}

/// Outcomes of a whole batch, in participant order.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<ParticipantOutcome>,
}

impl BatchReport {
    pub fn n_failed(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.is_success()).count()
    }

    pub fn is_success(&self) -> bool {
        self.n_failed() == 0
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} participant(s), {} failed",
            self.outcomes.len(),
            self.n_failed()
        )?;
        for o in &self.outcomes {
            writeln!(f, "  {o}")?;
        }
        Ok(())
    }
}

// ── Drivers ───────────────────────────────────────────────────────────────

/// Full run for one participant: load, preprocess, save.
pub fn preprocess_participant(
    participant: &str,
    session: &SessionInfo,
    cfg: &PipelineConfig,
    layout: &DataLayout,
) -> std::result::Result<ParticipantSummary, StageFailure> {
    info!("Preprocessing participant {participant}");
    let raw = load_raw(participant, layout).at(Stage::Load)?;
    let bads = session
        .bad_channels(participant)
        .map_err(anyhow::Error::from)
        .at(Stage::Condition)?;
    let epochs = preprocess_raw(raw, participant, bads, cfg)?;

    let output = layout.epochs_path(participant);
    save_epochs(&epochs, &output).at(Stage::Save)?;

    Ok(ParticipantSummary {
        participant: participant.to_string(),
        n_epochs: epochs.len(),
        n_dropped: epochs.n_dropped(),
        n_channels: epochs.channels.len(),
        sfreq: epochs.sfreq,
        conditions: epochs.event_id.iter().map(|(l, _)| l.to_string()).collect(),
        output,
    })
}

/// Process every participant of `cfg` in order.
///
/// Fails only when the output directory cannot be created; per-participant
/// failures are reported in the returned [`BatchReport`].
pub fn run_batch(
    session: &SessionInfo,
    cfg: &PipelineConfig,
    layout: &DataLayout,
) -> Result<BatchReport> {
    std::fs::create_dir_all(&layout.output_dir)
        .with_context(|| format!("create {}", layout.output_dir.display()))?;

    let mut report = BatchReport::default();
    for participant in &cfg.participants {
        let outcome = match preprocess_participant(participant, session, cfg, layout) {
            Ok(summary) => ParticipantOutcome::Completed(summary),
            Err(failure) => {
                error!("Participant {participant}: {failure}");
                ParticipantOutcome::Failed {
                    participant: participant.clone(),
                    failure,
                }
            }
        };
        info!("{outcome}");
        report.outcomes.push(outcome);
    }
    info!(
        "Batch finished: {} of {} participant(s) succeeded",
        report.outcomes.len() - report.n_failed(),
        report.outcomes.len()
    );
    Ok(report)
}
