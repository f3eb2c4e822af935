//! In-memory continuous recording.
//!
//! [`RawRecording`] is the Rust counterpart of a preloaded MNE `Raw`: the
//! full `[C, T]` signal in volts, the channel list with types and positions,
//! the annotation stream and the `bads` list.  It is owned by one
//! participant's pipeline and mutated in place by the conditioning and
//! filter stages.
use anyhow::{bail, Result};
use ndarray::{Array2, Axis};

/// Channel type, as far as this pipeline cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    /// Scalp EEG: referenced, filtered, interpolated, rejected on.
    Eeg,
    /// Electro-oculogram: carried along untouched.
    Eog,
    /// Anything else (non-voltage units, auxiliary inputs).
    Misc,
}

/// One channel of a recording.
#[derive(Debug, Clone, PartialEq)]
pub struct Channel {
    pub name: String,
    pub kind: ChannelKind,
    /// Electrode position in head coordinates (metres), once a montage is set.
    pub pos: Option<[f64; 3]>,
}

impl Channel {
    pub fn eeg(name: impl Into<String>) -> Self {
        Self { name: name.into(), kind: ChannelKind::Eeg, pos: None }
    }
}

/// A time-stamped marker from the recording's marker stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    /// 0-based sample index of the marker.
    pub onset: usize,
    /// Marker extent in samples (usually 1).
    pub duration: usize,
    /// `"<type>/<description>"`, e.g. `"Stimulus/S 11"`.
    pub description: String,
}

/// A fully loaded continuous recording.
#[derive(Debug, Clone)]
pub struct RawRecording {
    /// `[C, T]` samples in volts.
    pub data: Array2<f64>,
    /// Sampling rate in Hz.
    pub sfreq: f64,
    pub channels: Vec<Channel>,
    pub annotations: Vec<Annotation>,
    /// Channels flagged as unreliable.
    pub bads: Vec<String>,
    /// Effective high-pass edge in Hz (0 = none).
    pub highpass: f64,
    /// Effective low-pass edge in Hz (Nyquist = none).
    pub lowpass: f64,
}

impl RawRecording {
    /// Build a recording; `data` must have one row per channel.
    pub fn new(
        data: Array2<f64>,
        sfreq: f64,
        channels: Vec<Channel>,
        annotations: Vec<Annotation>,
    ) -> Result<Self> {
        if data.nrows() != channels.len() {
            bail!(
                "data has {} rows but {} channels were given",
                data.nrows(),
                channels.len()
            );
        }
        if !(sfreq > 0.0 && sfreq.is_finite()) {
            bail!("invalid sampling rate {sfreq}");
        }
        Ok(Self {
            data,
            sfreq,
            channels,
            annotations,
            bads: Vec::new(),
            highpass: 0.0,
            lowpass: sfreq / 2.0,
        })
    }

    #[inline]
    pub fn n_channels(&self) -> usize {
        self.channels.len()
    }

    #[inline]
    pub fn n_times(&self) -> usize {
        self.data.ncols()
    }

    pub fn ch_names(&self) -> Vec<&str> {
        self.channels.iter().map(|c| c.name.as_str()).collect()
    }

    /// Index of the channel called `name` (exact match).
    pub fn ch_index(&self, name: &str) -> Option<usize> {
        self.channels.iter().position(|c| c.name == name)
    }

    pub fn is_bad(&self, name: &str) -> bool {
        self.bads.iter().any(|b| b == name)
    }

    /// Indices of all EEG channels, bad or not.
    pub fn eeg_picks(&self) -> Vec<usize> {
        self.picks_where(|c| c.kind == ChannelKind::Eeg)
    }

    /// Indices of EEG channels not listed in `bads`.
    pub fn good_eeg_picks(&self) -> Vec<usize> {
        self.picks_where(|c| c.kind == ChannelKind::Eeg && !self.is_bad(&c.name))
    }

    fn picks_where(&self, pred: impl Fn(&Channel) -> bool) -> Vec<usize> {
        self.channels
            .iter()
            .enumerate()
            .filter(|(_, c)| pred(c))
            .map(|(i, _)| i)
            .collect()
    }

    /// Change the type of the named channels.  Unknown names are an error.
    pub fn set_channel_types(&mut self, names: &[String], kind: ChannelKind) -> Result<()> {
        for name in names {
            match self.ch_index(name) {
                Some(i) => self.channels[i].kind = kind,
                None => bail!("channel {name:?} not found (have {:?})", self.ch_names()),
            }
        }
        Ok(())
    }

    /// Replace the `bads` list.  Every name must be a channel of the recording.
    pub fn set_bads(&mut self, bads: &[String]) -> Result<()> {
        for name in bads {
            if self.ch_index(name).is_none() {
                bail!("bad channel {name:?} is not in the recording");
            }
        }
        self.bads = bads.to_vec();
        Ok(())
    }

    /// Physically remove the named channels (data rows, metadata, `bads`).
    pub fn drop_channels(&mut self, names: &[String]) -> Result<()> {
        let mut drop = Vec::with_capacity(names.len());
        for name in names {
            match self.ch_index(name) {
                Some(i) => drop.push(i),
                None => bail!("cannot drop {name:?}: no such channel"),
            }
        }
        let keep: Vec<usize> = (0..self.n_channels()).filter(|i| !drop.contains(i)).collect();
        self.data = self.data.select(Axis(0), &keep);
        self.channels = keep.iter().map(|&i| self.channels[i].clone()).collect();
        self.bads.retain(|b| !names.contains(b));
        Ok(())
    }
}
