//! Pipeline configuration.
//!
//! [`PipelineConfig`] holds every fixed parameter of the FaceWord
//! preprocessing run: the participant list, channel corrections, filter band,
//! epoch window, rejection threshold and the condition table.  Its
//! [`Default`] is the configuration the study data was prepared with; the
//! struct is passed explicitly into [`crate::run_batch`] instead of living in
//! globals.
//!
//! [`DataLayout`] resolves where inputs and outputs live on disk.
use std::path::{Path, PathBuf};

use crate::events::Event;

/// Configuration for the full epoch preprocessing pipeline.
///
/// All fields are `pub` so a variant can be built with struct-update syntax:
///
/// ```
/// use faceword_prep::PipelineConfig;
///
/// let cfg = PipelineConfig {
///     participants: vec!["Group1".into()],   // process a single participant
///     ..PipelineConfig::default()
/// };
/// assert_eq!(cfg.target_sfreq, 250.0);
/// ```
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Participants processed by [`crate::run_batch`], in order.
    ///
    /// Default: `Group1`, `Group5`, `Group6`.
    pub participants: Vec<String>,

    /// Auxiliary channels re-typed as electro-oculogram before anything else.
    ///
    /// Default: `EOG1`, `EOG2`.
    pub eog_channels: Vec<String>,

    /// Channels never used as interpolation sources (nor interpolated).
    ///
    /// Fp1 and Fp2 are poor quality for every participant.  When one of them
    /// is listed as bad it survives interpolation in `bads` and is dropped.
    pub interpolation_exclude: Vec<String>,

    /// Lower band-pass edge in Hz.  Default: `0.1`.
    pub l_freq: f64,

    /// Upper band-pass edge in Hz.  Default: `40.0`.
    pub h_freq: f64,

    /// Epoch start relative to the event, in seconds.  Default: `-0.2`.
    pub tmin: f64,

    /// Epoch end relative to the event, in seconds (inclusive).  Default: `0.5`.
    pub tmax: f64,

    /// Baseline interval `(start, end)` in seconds, both ends inclusive.
    ///
    /// Default: `(-0.2, 0.0)`.
    pub baseline: (f64, f64),

    /// Peak-to-peak rejection threshold for EEG channels, in volts.
    ///
    /// An epoch is dropped when any good EEG channel swings **more** than
    /// this amount; a swing exactly equal to it is kept.
    ///
    /// Default: `100e-6` (100 µV).
    pub reject_eeg: f64,

    /// Sampling rate of the saved epochs in Hz.  Default: `250.0`.
    pub target_sfreq: f64,

    /// Label → marker-code table used to select and name epochs.
    pub conditions: ConditionMap,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            participants: ["Group1", "Group5", "Group6"].map(String::from).to_vec(),
            eog_channels: ["EOG1", "EOG2"].map(String::from).to_vec(),
            interpolation_exclude: ["Fp1", "Fp2"].map(String::from).to_vec(),
            l_freq: 0.1,
            h_freq: 40.0,
            tmin: -0.2,
            tmax: 0.5,
            baseline: (-0.2, 0.0),
            reject_eeg: 100e-6,
            target_sfreq: 250.0,
            conditions: ConditionMap::default(),
        }
    }
}

// ── Condition map ─────────────────────────────────────────────────────────

/// The FaceWord marker table: `(label, code)` in presentation order.
const FACEWORD_CONDITIONS: [(&str, i32); 19] = [
    ("Word/wPos", 11),
    ("Wait/wPos", 31),
    ("Image/wPos", 21),
    ("Word/wNeg", 12),
    ("Wait/wNeg", 32),
    ("Image/wNeg", 22),
    ("Word/wNeu", 13),
    ("Wait/wNeu/iPos", 51),
    ("Image/wNeu/iPos", 41),
    ("Wait/wNeu/iNeg", 52),
    ("Image/wNeu/iNeg", 42),
    ("Correct/wPos", 101),
    ("Correct/wNeg", 102),
    ("Correct/wNeu/iPos", 111),
    ("Correct/wNeu/iNeg", 112),
    ("Incorrect/wPos", 202),
    ("Incorrect/wNeg", 201),
    ("Incorrect/wNeu/iPos", 212),
    ("Incorrect/Neu/iNeg", 211),
];

/// Ordered mapping from hierarchical condition label (`"Word/wPos"`) to
/// integer marker code.
///
/// The default value is the 19-entry FaceWord table.  Per participant the
/// table is narrowed with [`ConditionMap::restrict_to`] so that epoching
/// never asks for a code that does not occur in the recording.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionMap {
    entries: Vec<(String, i32)>,
}

impl Default for ConditionMap {
    fn default() -> Self {
        Self::from_pairs(FACEWORD_CONDITIONS.iter().map(|&(l, c)| (l, c)))
    }
}

impl ConditionMap {
    /// Build a map from `(label, code)` pairs, keeping their order.
    pub fn from_pairs<S: Into<String>>(pairs: impl IntoIterator<Item = (S, i32)>) -> Self {
        Self {
            entries: pairs.into_iter().map(|(l, c)| (l.into(), c)).collect(),
        }
    }

    /// Keep only the entries whose code occurs at least once in `events`.
    ///
    /// The result is always a subset of `self`, in the same order.
    ///
    /// ```
    /// use faceword_prep::{ConditionMap, Event};
    ///
    /// let events = vec![Event { sample: 10, code: 11 }, Event { sample: 90, code: 11 }];
    /// let used = ConditionMap::default().restrict_to(&events);
    /// assert_eq!(used.len(), 1);
    /// assert_eq!(used.code_for("Word/wPos"), Some(11));
    /// ```
    pub fn restrict_to(&self, events: &[Event]) -> ConditionMap {
        let entries = self
            .entries
            .iter()
            .filter(|(_, code)| events.iter().any(|e| e.code == *code))
            .cloned()
            .collect();
        ConditionMap { entries }
    }

    /// Label for `code`, or `None` when the code is not in the map.
    pub fn label_for(&self, code: i32) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, c)| *c == code)
            .map(|(l, _)| l.as_str())
    }

    /// Code for `label`, or `None` when the label is not in the map.
    pub fn code_for(&self, label: &str) -> Option<i32> {
        self.entries.iter().find(|(l, _)| l == label).map(|&(_, c)| c)
    }

    pub fn contains_code(&self, code: i32) -> bool {
        self.entries.iter().any(|(_, c)| *c == code)
    }

    /// Iterate `(label, code)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, i32)> {
        self.entries.iter().map(|(l, c)| (l.as_str(), *c))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `true` when every entry of `self` also appears, with the same code,
    /// in `other`.
    pub fn is_subset_of(&self, other: &ConditionMap) -> bool {
        self.iter().all(|(l, c)| other.code_for(l) == Some(c))
    }
}

// ── Data layout ───────────────────────────────────────────────────────────

/// Where the pipeline reads and writes files.
///
/// ```text
/// <data_root>/FaceWord_<participant>.vhdr        raw recording
/// <data_root>/preprocessed/<participant>-epo.fif epochs
/// ```
#[derive(Debug, Clone)]
pub struct DataLayout {
    pub data_root: PathBuf,
    pub output_dir: PathBuf,
}

impl DataLayout {
    /// Layout rooted at `data_root`, writing into `<data_root>/preprocessed`.
    pub fn new(data_root: impl AsRef<Path>) -> Self {
        let data_root = data_root.as_ref().to_path_buf();
        let output_dir = data_root.join("preprocessed");
        Self { data_root, output_dir }
    }

    /// BrainVision header of `participant`.
    pub fn raw_path(&self, participant: &str) -> PathBuf {
        self.data_root.join(format!("FaceWord_{participant}.vhdr"))
    }

    /// Epochs file of `participant`.
    pub fn epochs_path(&self, participant: &str) -> PathBuf {
        self.output_dir.join(format!("{participant}-epo.fif"))
    }
}
