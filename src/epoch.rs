//! Event-locked epoching with baseline correction and peak-to-peak rejection.
//!
//! For each event whose code is in the condition map, the window
//! `[sample + round(tmin·sfreq), sample + round(tmax·sfreq)]` (inclusive) is
//! cut from the continuous recording, baseline-corrected per EEG channel and
//! checked against the rejection threshold:
//!
//! ```text
//! epoch[c, :] -= mean(epoch[c, t])   for t with bmin ≤ time[t] ≤ bmax, c ∈ EEG
//! drop  ⇔  ∃ good EEG c : max(epoch[c, :]) − min(epoch[c, :]) > reject_eeg
//! ```
//!
//! Every input event gets a `drop_log` entry: empty when the epoch was kept,
//! otherwise the reasons it was not.
use anyhow::{bail, Result};
use log::{info, warn};
use ndarray::{s, Array2, Array3, ArrayView2, Axis};

use crate::config::{ConditionMap, PipelineConfig};
use crate::events::Event;
use crate::raw::{Channel, ChannelKind, RawRecording};
use crate::resample::resample_epochs;

/// Drop reason: the window reaches outside the recording.
pub const NO_DATA: &str = "NO_DATA";
/// Drop reason: the event's code is not in the condition map.
pub const IGNORED: &str = "IGNORED";
/// Drop reason: another event already occupies the same sample.
pub const DROP_DUPLICATE: &str = "DROP DUPLICATE";

/// A collection of equal-length epochs.
#[derive(Debug, Clone)]
pub struct Epochs {
    /// `[E, C, T]` in volts.
    pub data: Array3<f64>,
    pub channels: Vec<Channel>,
    pub bads: Vec<String>,
    pub sfreq: f64,
    /// Time of the first sample relative to the event, in seconds.
    pub tmin: f64,
    /// One event per retained epoch.
    pub events: Vec<Event>,
    /// Conditions the epochs were selected with.
    pub event_id: ConditionMap,
    pub baseline: (f64, f64),
    /// EEG peak-to-peak threshold in volts.
    pub reject_eeg: f64,
    /// Index into the input event list of each retained epoch.
    pub selection: Vec<usize>,
    /// One entry per input event; empty for kept epochs.
    pub drop_log: Vec<Vec<String>>,
    pub highpass: f64,
    pub lowpass: f64,
    /// Rate of the continuous recording the epochs were cut from; event
    /// samples count at this rate.
    pub raw_sfreq: f64,
}

impl Epochs {
    /// Cut epochs from `raw` around `events`.
    ///
    /// Only events whose code is in `event_id` become epochs.  An empty
    /// `event_id` gives an empty collection.
    pub fn new(
        raw: &RawRecording,
        events: &[Event],
        event_id: &ConditionMap,
        cfg: &PipelineConfig,
    ) -> Result<Self> {
        if !(cfg.tmin <= cfg.tmax) {
            bail!("tmin ({}) must not exceed tmax ({})", cfg.tmin, cfg.tmax);
        }
        let (bmin, bmax) = cfg.baseline;
        if bmin > bmax || bmin < cfg.tmin || bmax > cfg.tmax {
            bail!(
                "baseline ({bmin}, {bmax}) must lie within the epoch window ({}, {})",
                cfg.tmin,
                cfg.tmax
            );
        }
        let sfreq = raw.sfreq;
        let start = (cfg.tmin * sfreq).round() as i64;
        let stop = (cfg.tmax * sfreq).round() as i64;
        let n_t = (stop - start + 1) as usize;
        let times: Vec<f64> = (start..=stop).map(|i| i as f64 / sfreq).collect();
        let base: Vec<usize> = times
            .iter()
            .enumerate()
            .filter(|&(_, &t)| t >= bmin && t <= bmax)
            .map(|(i, _)| i)
            .collect();
        if base.is_empty() {
            bail!("baseline ({bmin}, {bmax}) contains no samples");
        }

        if event_id.is_empty() {
            warn!("No conditions to epoch on; the collection is empty");
        }
        let candidates = events.iter().filter(|e| event_id.contains_code(e.code)).count();
        info!("{candidates} matching events found");

        let eeg = raw.eeg_picks();
        let good_eeg = raw.good_eeg_picks();
        let mut drop_log = vec![Vec::new(); events.len()];
        let mut kept = Vec::new();
        let mut selection = Vec::new();
        let mut kept_events = Vec::new();
        let mut last_sample = None;

        for (i, ev) in events.iter().enumerate() {
            if !event_id.contains_code(ev.code) {
                drop_log[i].push(IGNORED.to_string());
                continue;
            }
            if last_sample == Some(ev.sample) {
                warn!("Duplicate event at sample {}; keeping the first", ev.sample);
                drop_log[i].push(DROP_DUPLICATE.to_string());
                continue;
            }
            last_sample = Some(ev.sample);

            let first = ev.sample as i64 + start;
            let last = ev.sample as i64 + stop;
            if first < 0 || last >= raw.n_times() as i64 {
                drop_log[i].push(NO_DATA.to_string());
                continue;
            }
            let mut epoch = raw
                .data
                .slice(s![.., first as usize..=last as usize])
                .to_owned();
            subtract_baseline(&mut epoch, &eeg, &base);

            let offenders = peak_to_peak_offenders(epoch.view(), &good_eeg, cfg.reject_eeg);
            if !offenders.is_empty() {
                let names: Vec<String> =
                    offenders.iter().map(|&c| raw.channels[c].name.clone()).collect();
                info!("    Rejecting  epoch based on EEG : {names:?}");
                drop_log[i] = names;
                continue;
            }
            kept.push(epoch);
            selection.push(i);
            kept_events.push(*ev);
        }

        let mut data = Array3::<f64>::zeros((kept.len(), raw.n_channels(), n_t));
        for (mut dst, src) in data.axis_iter_mut(Axis(0)).zip(&kept) {
            dst.assign(src);
        }
        let n_dropped = candidates - kept.len();
        info!("{n_dropped} bad epochs dropped");

        Ok(Self {
            data,
            channels: raw.channels.clone(),
            bads: raw.bads.clone(),
            sfreq,
            tmin: start as f64 / sfreq,
            events: kept_events,
            event_id: event_id.clone(),
            baseline: cfg.baseline,
            reject_eeg: cfg.reject_eeg,
            selection,
            drop_log,
            highpass: raw.highpass,
            lowpass: raw.lowpass,
            raw_sfreq: sfreq,
        })
    }

    /// Number of retained epochs.
    pub fn len(&self) -> usize {
        self.data.len_of(Axis(0))
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn n_times(&self) -> usize {
        self.data.len_of(Axis(2))
    }

    /// Sample times in seconds relative to the event.
    pub fn times(&self) -> Vec<f64> {
        (0..self.n_times()).map(|i| self.tmin + i as f64 / self.sfreq).collect()
    }

    pub fn ch_names(&self) -> Vec<&str> {
        self.channels.iter().map(|c| c.name.as_str()).collect()
    }

    /// Condition label of each retained epoch.
    pub fn labels(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|e| self.event_id.label_for(e.code))
            .collect()
    }

    /// Number of input events dropped for a reason other than [`IGNORED`].
    pub fn n_dropped(&self) -> usize {
        self.drop_log
            .iter()
            .filter(|r| !r.is_empty() && r.iter().all(|s| s != IGNORED))
            .count()
    }

    /// Resample every epoch to `sfreq` in place.  `tmin` is preserved.
    pub fn resample(&mut self, sfreq: f64) -> Result<()> {
        if self.n_times() == 0 {
            bail!("cannot resample epochs without samples");
        }
        let old = self.sfreq;
        self.data = resample_epochs(&self.data, old, sfreq)?;
        self.sfreq = sfreq;
        self.lowpass = self.lowpass.min(sfreq / 2.0);
        info!("Resampled {} epochs from {old} Hz to {sfreq} Hz", self.len());
        Ok(())
    }

    /// Indices of EEG channels.
    pub fn eeg_picks(&self) -> Vec<usize> {
        self.channels
            .iter()
            .enumerate()
            .filter(|(_, c)| c.kind == ChannelKind::Eeg)
            .map(|(i, _)| i)
            .collect()
    }
}

/// Subtract, per row in `rows`, the mean over the columns `base`.
fn subtract_baseline(epoch: &mut Array2<f64>, rows: &[usize], base: &[usize]) {
    let n = base.len() as f64;
    for &c in rows {
        let mut row = epoch.row_mut(c);
        let mean = base.iter().map(|&t| row[t]).sum::<f64>() / n;
        row.mapv_inplace(|v| v - mean);
    }
}

/// Rows in `rows` whose peak-to-peak amplitude is strictly above `threshold`.
fn peak_to_peak_offenders(epoch: ArrayView2<'_, f64>, rows: &[usize], threshold: f64) -> Vec<usize> {
    rows.iter()
        .copied()
        .filter(|&c| {
            let row = epoch.row(c);
            let (lo, hi) = row
                .iter()
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
            hi - lo > threshold
        })
        .collect()
}
