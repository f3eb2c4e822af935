//! Measurement info (MNE's `Info` struct) for epochs files.
//!
//! Only the fields the pipeline produces are carried: sampling rate, filter
//! edges, channel structs and the bad-channel list.
use std::io::{Read, Seek, Write};

use anyhow::{anyhow, bail, Result};
use byteorder::{BigEndian, ByteOrder};

use super::constants::*;
use super::tag::*;
use super::tree::Node;
use super::write::FifWriter;
use crate::raw::{Channel, ChannelKind};

/// Bytes in one `FIFFT_CH_INFO_STRUCT` payload.
pub const CH_INFO_SIZE: usize = 96;
/// Longest channel name that fits the struct (NUL-terminated).
pub const MAX_CH_NAME_LEN: usize = 15;

// ── Channel info ─────────────────────────────────────────────────────────

/// Channel info, stored as a `FIFFT_CH_INFO_STRUCT` (30) tag.
///
/// On-disk layout (big-endian, 96 bytes total):
/// ```text
///  4  scanno       i32
///  4  logno        i32
///  4  kind         i32
///  4  range        f32
///  4  cal          f32
///  4  coil_type    i32
/// 48  loc          12 × f32
///  4  unit         i32
///  4  unit_mul     i32
/// 16  ch_name      16 × u8 (NUL-padded)
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelInfo {
    pub scan_no: i32,
    pub log_no: i32,
    pub kind: i32,
    pub range: f32,
    pub cal: f32,
    pub coil_type: i32,
    /// Position + orientation: `[x, y, z, …]` in metres; NaN when unknown.
    pub loc: [f32; 12],
    pub unit: i32,
    pub unit_mul: i32,
    pub name: String,
}

impl ChannelInfo {
    /// Struct for channel number `index` (0-based) of a recording.
    pub fn from_channel(index: usize, ch: &Channel) -> Self {
        let (kind, coil_type, unit) = match ch.kind {
            ChannelKind::Eeg => (FIFFV_EEG_CH, FIFFV_COIL_EEG, FIFF_UNIT_V),
            ChannelKind::Eog => (FIFFV_EOG_CH, FIFFV_COIL_NONE, FIFF_UNIT_V),
            ChannelKind::Misc => (FIFFV_MISC_CH, FIFFV_COIL_NONE, FIFF_UNIT_NONE),
        };
        let mut loc = [0f32; 12];
        match ch.pos {
            Some(p) => {
                for (dst, &v) in loc.iter_mut().zip(&p) {
                    *dst = v as f32;
                }
            }
            None => loc[..3].fill(f32::NAN),
        }
        Self {
            scan_no: index as i32 + 1,
            log_no: index as i32 + 1,
            kind,
            range: 1.0,
            cal: 1.0,
            coil_type,
            loc,
            unit,
            unit_mul: 0,
            name: ch.name.clone(),
        }
    }

    /// Back to a pipeline channel.  Unknown kinds become `Misc`.
    pub fn to_channel(&self) -> Channel {
        let kind = match self.kind {
            FIFFV_EEG_CH => ChannelKind::Eeg,
            FIFFV_EOG_CH => ChannelKind::Eog,
            _ => ChannelKind::Misc,
        };
        let p = &self.loc[..3];
        let pos = if p.iter().all(|v| v.is_finite()) && p.iter().any(|&v| v != 0.0) {
            Some([p[0] as f64, p[1] as f64, p[2] as f64])
        } else {
            None
        };
        Channel { name: self.name.clone(), kind, pos }
    }

    /// Parse from the 96-byte payload of a FIFFT_CH_INFO_STRUCT tag.
    pub fn from_bytes(raw: &[u8]) -> Result<Self> {
        if raw.len() < CH_INFO_SIZE {
            bail!("ch_info payload too short: {} bytes (need {CH_INFO_SIZE})", raw.len());
        }
        let mut loc = [0f32; 12];
        BigEndian::read_f32_into(&raw[24..72], &mut loc);
        let name_bytes = &raw[80..96];
        let end = name_bytes.iter().position(|&b| b == 0).unwrap_or(16);
        let name = match std::str::from_utf8(&name_bytes[..end]) {
            Ok(s) => s.to_string(),
            Err(_) => name_bytes[..end].iter().map(|&b| b as char).collect(),
        };
        Ok(Self {
            scan_no: BigEndian::read_i32(&raw[0..4]),
            log_no: BigEndian::read_i32(&raw[4..8]),
            kind: BigEndian::read_i32(&raw[8..12]),
            range: BigEndian::read_f32(&raw[12..16]),
            cal: BigEndian::read_f32(&raw[16..20]),
            coil_type: BigEndian::read_i32(&raw[20..24]),
            loc,
            unit: BigEndian::read_i32(&raw[72..76]),
            unit_mul: BigEndian::read_i32(&raw[76..80]),
            name,
        })
    }

    /// Serialise to the 96-byte struct.  Names longer than 15 bytes are an error.
    pub fn to_bytes(&self) -> Result<[u8; CH_INFO_SIZE]> {
        let name = self.name.as_bytes();
        if name.len() > MAX_CH_NAME_LEN {
            bail!(
                "channel name {:?} is longer than {MAX_CH_NAME_LEN} bytes",
                self.name
            );
        }
        let mut raw = [0u8; CH_INFO_SIZE];
        BigEndian::write_i32(&mut raw[0..4], self.scan_no);
        BigEndian::write_i32(&mut raw[4..8], self.log_no);
        BigEndian::write_i32(&mut raw[8..12], self.kind);
        BigEndian::write_f32(&mut raw[12..16], self.range);
        BigEndian::write_f32(&mut raw[16..20], self.cal);
        BigEndian::write_i32(&mut raw[20..24], self.coil_type);
        BigEndian::write_f32_into(&self.loc, &mut raw[24..72]);
        BigEndian::write_i32(&mut raw[72..76], self.unit);
        BigEndian::write_i32(&mut raw[76..80], self.unit_mul);
        raw[80..80 + name.len()].copy_from_slice(name);
        Ok(raw)
    }
}

// ── Measurement info ─────────────────────────────────────────────────────

/// Measurement metadata stored in `FIFFB_MEAS_INFO`.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasInfo {
    pub sfreq: f64,
    pub highpass: f64,
    pub lowpass: f64,
    pub chs: Vec<ChannelInfo>,
    pub bads: Vec<String>,
}

impl MeasInfo {
    pub fn n_chan(&self) -> usize {
        self.chs.len()
    }

    /// Channel names in order.
    pub fn ch_names(&self) -> Vec<&str> {
        self.chs.iter().map(|c| c.name.as_str()).collect()
    }

    /// Write the `FIFFB_MEAS_INFO` block.
    pub fn write<W: Write>(&self, w: &mut FifWriter<W>) -> Result<()> {
        w.start_block(FIFFB_MEAS_INFO)?;
        w.write_int(FIFF_NCHAN, self.chs.len() as i32)?;
        w.write_float(FIFF_SFREQ, self.sfreq as f32)?;
        w.write_float(FIFF_HIGHPASS, self.highpass as f32)?;
        w.write_float(FIFF_LOWPASS, self.lowpass as f32)?;
        for ch in &self.chs {
            w.write_ch_info(ch)?;
        }
        if !self.bads.is_empty() {
            w.start_block(FIFFB_MNE_BAD_CHANNELS)?;
            w.write_name_list(FIFF_MNE_CH_NAME_LIST, &self.bads)?;
            w.end_block(FIFFB_MNE_BAD_CHANNELS)?;
        }
        w.end_block(FIFFB_MEAS_INFO)
    }
}

/// Read `MeasInfo` from an open FIF file given the tree.
pub fn read_meas_info<R: Read + Seek>(reader: &mut R, tree: &Node) -> Result<MeasInfo> {
    let meas_node = tree
        .find_block(FIFFB_MEAS)
        .ok_or_else(|| anyhow!("FIFFB_MEAS block not found"))?;
    let info_node = meas_node
        .find_block(FIFFB_MEAS_INFO)
        .ok_or_else(|| anyhow!("FIFFB_MEAS_INFO block not found"))?;

    let mut n_chan = None::<usize>;
    let mut sfreq = None::<f64>;
    let mut highpass = 0.0;
    let mut lowpass = None::<f64>;
    let mut chs = Vec::<ChannelInfo>::new();

    for ent in &info_node.entries {
        match ent.kind {
            FIFF_NCHAN => n_chan = Some(read_i32(reader, ent)?.max(0) as usize),
            FIFF_SFREQ => sfreq = Some(read_f32(reader, ent)? as f64),
            FIFF_HIGHPASS => {
                let v = read_f32(reader, ent)?;
                if v.is_finite() {
                    highpass = v as f64;
                }
            }
            FIFF_LOWPASS => {
                let v = read_f32(reader, ent)?;
                if v.is_finite() {
                    lowpass = Some(v as f64);
                }
            }
            FIFF_CH_INFO => chs.push(ChannelInfo::from_bytes(&read_raw_bytes(reader, ent)?)?),
            _ => {}
        }
    }

    let bads = match info_node
        .find_block(FIFFB_MNE_BAD_CHANNELS)
        .and_then(|b| b.find_tag(FIFF_MNE_CH_NAME_LIST))
    {
        Some(tag) => read_string(reader, tag)?
            .split(':')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        None => Vec::new(),
    };

    let n_chan = n_chan.ok_or_else(|| anyhow!("FIFF_NCHAN not found"))?;
    let sfreq = sfreq.ok_or_else(|| anyhow!("FIFF_SFREQ not found"))?;
    if chs.len() != n_chan {
        bail!("expected {n_chan} ch_info structs, got {}", chs.len());
    }

    Ok(MeasInfo {
        sfreq,
        highpass,
        lowpass: lowpass.unwrap_or(sfreq / 2.0),
        chs,
        bads,
    })
}
