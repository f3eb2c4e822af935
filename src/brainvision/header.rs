//! `.vhdr` header parsing.
//!
//! The header is an INI-like text file:
//!
//! ```text
//! Brain Vision Data Exchange Header File Version 1.0
//! [Common Infos]
//! DataFile=FaceWord_Group1.eeg
//! MarkerFile=FaceWord_Group1.vmrk
//! DataFormat=BINARY
//! DataOrientation=MULTIPLEXED
//! NumberOfChannels=32
//! SamplingInterval=2000          ; µs → 500 Hz
//! [Binary Infos]
//! BinaryFormat=INT_16
//! [Channel Infos]
//! Ch1=Fp1,,0.1,µV                ; name, reference, resolution, unit
//! ```
use std::collections::HashMap;

use anyhow::{anyhow, bail, Context, Result};

/// Sample encoding of the binary data file (always little-endian).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryFormat {
    Int16,
    UInt16,
    Int32,
    Float32,
}

impl BinaryFormat {
    fn parse(s: &str) -> Result<Self> {
        Ok(match s.trim().to_ascii_uppercase().as_str() {
            "INT_16" => Self::Int16,
            "UINT_16" => Self::UInt16,
            "INT_32" => Self::Int32,
            "IEEE_FLOAT_32" => Self::Float32,
            other => bail!("unsupported BinaryFormat {other:?}"),
        })
    }

    /// Bytes per sample.
    pub fn width(self) -> usize {
        match self {
            Self::Int16 | Self::UInt16 => 2,
            Self::Int32 | Self::Float32 => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    /// `[T, C]` on disk: all channels of sample 0, then sample 1, ….
    Multiplexed,
    /// `[C, T]` on disk: all samples of channel 0, then channel 1, ….
    Vectorized,
}

/// One `ChN=` entry.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelEntry {
    pub name: String,
    pub reference: String,
    pub resolution: f64,
    pub unit: String,
}

impl ChannelEntry {
    /// Factor converting the unit to volts, or `None` for non-voltage units.
    pub fn volts_per_unit(&self) -> Option<f64> {
        match self.unit.trim() {
            "V" => Some(1.0),
            "mV" => Some(1e-3),
            // µ as MICRO SIGN, GREEK SMALL LETTER MU, or the ASCII stand-in
            "µV" | "μV" | "uV" => Some(1e-6),
            "nV" => Some(1e-9),
            _ => None,
        }
    }
}

/// Parsed `.vhdr` contents.
#[derive(Debug, Clone)]
pub struct VhdrHeader {
    pub data_file: String,
    pub marker_file: Option<String>,
    pub orientation: Orientation,
    pub binary_format: BinaryFormat,
    /// Sampling interval in microseconds.
    pub sampling_interval_us: f64,
    pub channels: Vec<ChannelEntry>,
}

impl VhdrHeader {
    pub fn sfreq(&self) -> f64 {
        1e6 / self.sampling_interval_us
    }

    /// Parse header text (already decoded).
    pub fn parse(text: &str) -> Result<Self> {
        let mut lines = text.lines();
        let first = lines.next().unwrap_or_default();
        let first = first.trim_start_matches('\u{feff}');
        if !(first.starts_with("Brain Vision") || first.starts_with("BrainVision")) {
            bail!("not a BrainVision header (first line {first:?})");
        }

        let sections = parse_sections(lines);
        let common = sections
            .get("Common Infos")
            .ok_or_else(|| anyhow!("missing [Common Infos] section"))?;
        let get = |key: &str| common.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str());

        let data_format = get("DataFormat").unwrap_or("BINARY");
        if !data_format.eq_ignore_ascii_case("BINARY") {
            bail!("unsupported DataFormat {data_format:?} (only BINARY)");
        }
        let orientation = match get("DataOrientation").unwrap_or("MULTIPLEXED") {
            o if o.eq_ignore_ascii_case("MULTIPLEXED") => Orientation::Multiplexed,
            o if o.eq_ignore_ascii_case("VECTORIZED") => Orientation::Vectorized,
            other => bail!("unsupported DataOrientation {other:?}"),
        };
        let data_file = get("DataFile")
            .ok_or_else(|| anyhow!("missing DataFile"))?
            .to_string();
        let marker_file = get("MarkerFile").map(str::to_string);
        let n_chan: usize = get("NumberOfChannels")
            .ok_or_else(|| anyhow!("missing NumberOfChannels"))?
            .parse()
            .context("NumberOfChannels")?;
        let sampling_interval_us: f64 = get("SamplingInterval")
            .ok_or_else(|| anyhow!("missing SamplingInterval"))?
            .parse()
            .context("SamplingInterval")?;
        if !(sampling_interval_us > 0.0) {
            bail!("SamplingInterval must be positive, got {sampling_interval_us}");
        }

        let binary_format = sections
            .get("Binary Infos")
            .and_then(|s| s.iter().find(|(k, _)| k == "BinaryFormat"))
            .map(|(_, v)| BinaryFormat::parse(v))
            .transpose()?
            .unwrap_or(BinaryFormat::Int16);

        let ch_section = sections
            .get("Channel Infos")
            .ok_or_else(|| anyhow!("missing [Channel Infos] section"))?;
        let mut channels = Vec::with_capacity(n_chan);
        for i in 1..=n_chan {
            let key = format!("Ch{i}");
            let (_, entry) = ch_section
                .iter()
                .find(|(k, _)| *k == key)
                .ok_or_else(|| anyhow!("missing channel entry {key}"))?;
            channels.push(parse_channel(entry).with_context(|| format!("channel entry {key}"))?);
        }

        Ok(Self {
            data_file,
            marker_file,
            orientation,
            binary_format,
            sampling_interval_us,
            channels,
        })
    }
}

/// Split INI text into `section → [(key, value)]`, skipping `;` comments.
pub(crate) fn parse_sections<'a>(
    lines: impl Iterator<Item = &'a str>,
) -> HashMap<String, Vec<(String, String)>> {
    let mut sections: HashMap<String, Vec<(String, String)>> = HashMap::new();
    let mut current = String::new();
    for line in lines {
        let line = line.trim();
        if line.is_empty() || line.starts_with(';') {
            continue;
        }
        if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            current = name.trim().to_string();
            continue;
        }
        if let Some((k, v)) = line.split_once('=') {
            sections
                .entry(current.clone())
                .or_default()
                .push((k.trim().to_string(), v.trim().to_string()));
        }
    }
    sections
}

fn parse_channel(entry: &str) -> Result<ChannelEntry> {
    let fields: Vec<&str> = entry.split(',').collect();
    // "\1" stands for a literal comma inside a field.
    let field = |i: usize| fields.get(i).map(|f| f.replace("\\1", ",")).unwrap_or_default();
    let name = field(0);
    if name.is_empty() {
        bail!("empty channel name");
    }
    let resolution = match field(2).trim() {
        "" => 1.0,
        r => r.parse::<f64>().with_context(|| format!("resolution {r:?}"))?,
    };
    let unit = match field(3).trim() {
        "" => "µV".to_string(),
        u => u.to_string(),
    };
    Ok(ChannelEntry { name, reference: field(1), resolution, unit })
}
