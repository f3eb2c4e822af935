//! Epochs files (`*-epo.fif`).
//!
//! Block layout written by [`write_epochs`], following MNE's `Epochs.save`:
//!
//! ```text
//! FILE_ID, DIR_POINTER(-1)
//! MEAS
//! ├─ MEAS_INFO            nchan, sfreq, filter edges, ch_info × C, bads
//! └─ PROCESSED_DATA
//!    └─ MNE_EPOCHS
//!       ├─ FIRST_SAMPLE / LAST_SAMPLE   window relative to the event
//!       ├─ MNE_EVENTS                   [sample, 0, code] × E, "label:code;…"
//!       ├─ BASELINE_MIN / BASELINE_MAX
//!       ├─ EPOCH                        float [E, C, T]
//!       ├─ SELECTION, DROP_LOG (JSON), REJECT_FLAT (JSON)
//!       └─ RAW_SFREQ
//! NOP(-1)
//! ```
//!
//! Samples are stored as single-precision floats, so a read-back is exact
//! only to `f32` precision.
use std::fs::File;
use std::io::{BufReader, Read, Seek, Write};
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use ndarray::Array3;
use serde::{Deserialize, Serialize};

use super::constants::*;
use super::info::{read_meas_info, ChannelInfo, MeasInfo};
use super::tag::*;
use super::tree::{read_tree, scan_directory, try_load_directory, Node};
use super::write::FifWriter;
use crate::config::ConditionMap;
use crate::epoch::Epochs;
use crate::events::Event;

/// Rejection thresholds as stored in `FIFF_MNE_EPOCHS_REJECT_FLAT`.
#[derive(Debug, Serialize, Deserialize)]
struct RejectParams {
    eeg: f64,
}

/// `label:code` pairs joined with `;`.
fn event_id_string(map: &ConditionMap) -> String {
    map.iter()
        .map(|(label, code)| format!("{label}:{code}"))
        .collect::<Vec<_>>()
        .join(";")
}

fn parse_event_id(s: &str) -> Result<ConditionMap> {
    let mut pairs = Vec::new();
    for item in s.split(';').filter(|i| !i.is_empty()) {
        let (label, code) = item
            .rsplit_once(':')
            .ok_or_else(|| anyhow!("malformed event_id entry {item:?}"))?;
        let code: i32 = code
            .trim()
            .parse()
            .with_context(|| format!("event code in {item:?}"))?;
        pairs.push((label.to_string(), code));
    }
    Ok(ConditionMap::from_pairs(pairs))
}

/// Serialise `epochs` to `out` and return the sink.
pub fn write_epochs<W: Write>(out: W, epochs: &Epochs) -> Result<W> {
    let (n_epochs, n_chan, n_times) = epochs.data.dim();
    let chs = epochs
        .channels
        .iter()
        .enumerate()
        .map(|(i, ch)| ChannelInfo::from_channel(i, ch))
        .collect();
    let info = MeasInfo {
        sfreq: epochs.sfreq,
        highpass: epochs.highpass,
        lowpass: epochs.lowpass,
        chs,
        bads: epochs.bads.clone(),
    };

    let first = (epochs.tmin * epochs.sfreq).round() as i32;
    let last = first + n_times as i32 - 1;
    let event_list: Vec<i32> = epochs
        .events
        .iter()
        .flat_map(|e| [e.sample as i32, 0, e.code])
        .collect();
    let selection: Vec<i32> = epochs.selection.iter().map(|&i| i as i32).collect();
    let drop_log = serde_json::to_string(&epochs.drop_log)?;
    let reject = serde_json::to_string(&RejectParams { eeg: epochs.reject_eeg })?;

    let mut w = FifWriter::new(out)?;
    w.start_block(FIFFB_MEAS)?;
    info.write(&mut w)?;
    w.start_block(FIFFB_PROCESSED_DATA)?;
    w.start_block(FIFFB_MNE_EPOCHS)?;

    w.write_int(FIFF_FIRST_SAMPLE, first)?;
    w.write_int(FIFF_LAST_SAMPLE, last)?;

    w.start_block(FIFFB_MNE_EVENTS)?;
    w.write_ints(FIFF_MNE_EVENT_LIST, &event_list)?;
    w.write_string(FIFF_DESCRIPTION, &event_id_string(&epochs.event_id))?;
    w.end_block(FIFFB_MNE_EVENTS)?;

    w.write_float(FIFF_MNE_BASELINE_MIN, epochs.baseline.0 as f32)?;
    w.write_float(FIFF_MNE_BASELINE_MAX, epochs.baseline.1 as f32)?;

    w.write_float_matrix(
        FIFF_EPOCH,
        &[n_epochs, n_chan, n_times],
        epochs.data.iter().copied(),
    )?;
    w.write_ints(FIFF_MNE_EPOCHS_SELECTION, &selection)?;
    w.write_string(FIFF_MNE_EPOCHS_DROP_LOG, &drop_log)?;
    w.write_string(FIFF_MNE_EPOCHS_REJECT_FLAT, &reject)?;
    w.write_float(FIFF_MNE_EPOCHS_RAW_SFREQ, epochs.raw_sfreq as f32)?;

    w.end_block(FIFFB_MNE_EPOCHS)?;
    w.end_block(FIFFB_PROCESSED_DATA)?;
    w.end_block(FIFFB_MEAS)?;
    w.finish()
}

/// Open and parse an epochs file.
pub fn read_epochs<P: AsRef<Path>>(path: P) -> Result<Epochs> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let mut reader = BufReader::new(file);
    read_epochs_from(&mut reader).with_context(|| format!("read epochs from {}", path.display()))
}

/// Parse an epochs file from any seekable source.
pub fn read_epochs_from<R: Read + Seek>(reader: &mut R) -> Result<Epochs> {
    let directory = match try_load_directory(reader)? {
        Some(dir) => dir,
        None => scan_directory(reader)?,
    };
    let tree = read_tree(reader, &directory)?;
    let info = read_meas_info(reader, &tree)?;
    let node = tree
        .find_block(FIFFB_MNE_EPOCHS)
        .ok_or_else(|| anyhow!("FIFFB_MNE_EPOCHS block not found"))?;

    let first = read_i32(reader, required(node, FIFF_FIRST_SAMPLE, "FIRST_SAMPLE")?)?;
    let last = read_i32(reader, required(node, FIFF_LAST_SAMPLE, "LAST_SAMPLE")?)?;
    if last < first {
        bail!("last sample {last} precedes first sample {first}");
    }

    let events_node = node
        .find_block(FIFFB_MNE_EVENTS)
        .ok_or_else(|| anyhow!("FIFFB_MNE_EVENTS block not found"))?;
    let flat = match events_node.find_tag(FIFF_MNE_EVENT_LIST) {
        Some(tag) => read_i32_array(reader, tag)?,
        None => Vec::new(),
    };
    if flat.len() % 3 != 0 {
        bail!("event list has {} values, not a multiple of 3", flat.len());
    }
    let events = flat
        .chunks_exact(3)
        .map(|e| {
            let sample = usize::try_from(e[0]).map_err(|_| anyhow!("negative event sample {}", e[0]))?;
            Ok(Event { sample, code: e[2] })
        })
        .collect::<Result<Vec<_>>>()?;
    let event_id = match events_node.find_tag(FIFF_DESCRIPTION) {
        Some(tag) => parse_event_id(&read_string(reader, tag)?)?,
        None => ConditionMap::from_pairs::<String>([]),
    };

    let bmin = read_f32(reader, required(node, FIFF_MNE_BASELINE_MIN, "BASELINE_MIN")?)? as f64;
    let bmax = read_f32(reader, required(node, FIFF_MNE_BASELINE_MAX, "BASELINE_MAX")?)? as f64;

    let (dims, values) = read_f32_matrix(reader, required(node, FIFF_EPOCH, "EPOCH")?)?;
    let &[n_epochs, n_chan, n_times] = dims.as_slice() else {
        bail!("epoch data has rank {}, expected 3", dims.len());
    };
    if n_chan != info.n_chan() {
        bail!("epoch data has {n_chan} channels, measurement info has {}", info.n_chan());
    }
    if n_times != (last - first + 1) as usize {
        bail!("epoch data has {n_times} samples, window spans {}", last - first + 1);
    }
    if n_epochs != events.len() {
        bail!("{n_epochs} epochs but {} events", events.len());
    }
    let data = Array3::from_shape_vec((n_epochs, n_chan, n_times), values)?.mapv(f64::from);

    let selection = match node.find_tag(FIFF_MNE_EPOCHS_SELECTION) {
        Some(tag) => read_i32_array(reader, tag)?
            .into_iter()
            .map(|i| usize::try_from(i).map_err(|_| anyhow!("negative selection index {i}")))
            .collect::<Result<Vec<_>>>()?,
        None => (0..n_epochs).collect(),
    };
    let drop_log: Vec<Vec<String>> = match node.find_tag(FIFF_MNE_EPOCHS_DROP_LOG) {
        Some(tag) => serde_json::from_str(&read_string(reader, tag)?).context("drop log")?,
        None => vec![Vec::new(); n_epochs],
    };
    let reject_eeg = match node.find_tag(FIFF_MNE_EPOCHS_REJECT_FLAT) {
        Some(tag) => {
            let r: RejectParams =
                serde_json::from_str(&read_string(reader, tag)?).context("reject parameters")?;
            r.eeg
        }
        None => f64::INFINITY,
    };
    let raw_sfreq = match node.find_tag(FIFF_MNE_EPOCHS_RAW_SFREQ) {
        Some(tag) => read_f32(reader, tag)? as f64,
        None => info.sfreq,
    };

    Ok(Epochs {
        data,
        channels: info.chs.iter().map(ChannelInfo::to_channel).collect(),
        bads: info.bads,
        sfreq: info.sfreq,
        tmin: first as f64 / info.sfreq,
        events,
        event_id,
        baseline: (bmin, bmax),
        reject_eeg,
        selection,
        drop_log,
        highpass: info.highpass,
        lowpass: info.lowpass,
        raw_sfreq,
    })
}

fn required<'a>(node: &'a Node, kind: i32, name: &str) -> Result<&'a TagHeader> {
    node.find_tag(kind)
        .ok_or_else(|| anyhow!("FIFF_{name} ({kind}) not found in epochs block"))
}
