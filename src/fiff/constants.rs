//! FIFF format constants.
//!
//! Names mirror [`mne/_fiff/constants.py`][mne-src] so that the Rust code can
//! be cross-referenced with MNE line-by-line.  Only the codes needed to write
//! and read back an epochs file are listed.
//!
//! The FIFF format is a self-describing binary file format used by Elekta /
//! Neuromag MEG and EEG systems and adopted by MNE-Python as its primary I/O
//! format.  Every piece of data in a FIF file is wrapped in a **tag**, a
//! 16-byte header (`kind`, `type`, `size`, `next`) followed by a payload.
//! Tags are grouped into **blocks** by `FIFF_BLOCK_START` / `FIFF_BLOCK_END`
//! sentinel tags, forming a tree.
//!
//! [mne-src]: https://github.com/mne-tools/mne-python/blob/main/mne/_fiff/constants.py

// ── Block kinds ───────────────────────────────────────────────────────────

/// Measurement block: top-level container for one recording.
pub const FIFFB_MEAS:             i32 = 100;
/// Measurement-info block: channel metadata, sfreq, filter edges.
pub const FIFFB_MEAS_INFO:        i32 = 101;
/// Processed data block.
pub const FIFFB_PROCESSED_DATA:   i32 = 103;
/// Bad-channel list block (inside `FIFFB_MEAS_INFO`).
pub const FIFFB_MNE_BAD_CHANNELS: i32 = 359;
/// Event list block (inside `FIFFB_MNE_EPOCHS`).
pub const FIFFB_MNE_EVENTS:       i32 = 361;
/// MNE epochs block.
pub const FIFFB_MNE_EPOCHS:       i32 = 373;

// ── Tag kinds: structural ─────────────────────────────────────────────────

/// Unique file identifier (first tag in every FIF file).
pub const FIFF_FILE_ID:         i32 = 100;
/// Pointer to the embedded tag directory (second tag, payload = byte offset).
pub const FIFF_DIR_POINTER:     i32 = 101;
/// Opens a new block; payload = block kind (i32).
pub const FIFF_BLOCK_START:     i32 = 104;
/// Closes the most recently opened block.
pub const FIFF_BLOCK_END:       i32 = 105;
/// Empty tag; the last one in a file has `next = -1`.
pub const FIFF_NOP:             i32 = 108;

// ── Tag kinds: measurement info ──────────────────────────────────────────

/// Number of channels (i32).
pub const FIFF_NCHAN:           i32 = 200;
/// Sampling frequency in Hz (f32).
pub const FIFF_SFREQ:           i32 = 201;
/// Channel info struct (one per channel; see [`super::info::ChannelInfo`]).
pub const FIFF_CH_INFO:         i32 = 203;
/// Free-text comment / description (string).
pub const FIFF_COMMENT:         i32 = 206;
/// First sample of the epoch window relative to the event (i32).
pub const FIFF_FIRST_SAMPLE:    i32 = 208;
/// Last sample of the epoch window relative to the event (i32).
pub const FIFF_LAST_SAMPLE:     i32 = 209;
/// Lowpass edge in Hz (f32).
pub const FIFF_LOWPASS:         i32 = 219;
/// Highpass edge in Hz (f32).
pub const FIFF_HIGHPASS:        i32 = 223;
/// Recording description, alias for `FIFF_COMMENT`.
pub const FIFF_DESCRIPTION:     i32 = FIFF_COMMENT;

// ── Tag kinds: epochs ─────────────────────────────────────────────────────

/// `[E, C, T]` epoch data (float matrix).
pub const FIFF_EPOCH:                  i32 = 302;
/// Colon-separated channel names (bad-channel list).
pub const FIFF_MNE_CH_NAME_LIST:       i32 = 3507;
/// Flattened `[n, 3]` event array: sample, previous value, code.
pub const FIFF_MNE_EVENT_LIST:         i32 = 3601;
/// Baseline interval start in seconds (f32).
pub const FIFF_MNE_BASELINE_MIN:       i32 = 3620;
/// Baseline interval end in seconds (f32).
pub const FIFF_MNE_BASELINE_MAX:       i32 = 3621;
/// Indices of the retained events (i32 array).
pub const FIFF_MNE_EPOCHS_SELECTION:   i32 = 3800;
/// JSON drop log, one list of reasons per event.
pub const FIFF_MNE_EPOCHS_DROP_LOG:    i32 = 3801;
/// JSON rejection thresholds.
pub const FIFF_MNE_EPOCHS_REJECT_FLAT: i32 = 3802;
/// Sampling rate of the recording the epochs were cut from (f32).
pub const FIFF_MNE_EPOCHS_RAW_SFREQ:   i32 = 3803;

// ── Tag payload types (the `type` field of a tag header) ──────────────────

/// Void / no payload.
pub const FIFFT_VOID:              u32 = 0;
/// Big-endian signed 32-bit integer.
pub const FIFFT_INT:               u32 = 3;
/// Big-endian IEEE 754 single-precision float (4 bytes).
pub const FIFFT_FLOAT:             u32 = 4;
/// String payload, **not** NUL-terminated.
pub const FIFFT_STRING:            u32 = 10;
/// 96-byte channel info struct (see [`super::info::ChannelInfo`]).
pub const FIFFT_CH_INFO_STRUCT:    u32 = 30;
/// File-ID struct.
pub const FIFFT_ID_STRUCT:         u32 = 31;
/// Tag-directory entry struct (16 bytes per entry).
pub const FIFFT_DIR_ENTRY_STRUCT:  u32 = 32;
/// Matrix modifier: OR this with an element type to indicate a matrix payload.
pub const FIFFT_MATRIX:            u32 = 0x4000_0000;

/// File format version written into the file id (`1 << 16 | 4`).
pub const FIFFC_VERSION: i32 = 0x0001_0004;

// ── `next` field sentinels in a tag header ────────────────────────────────

/// The next tag follows immediately: `next_pos = pos + 16 + size`.
pub const FIFFV_NEXT_SEQ:  i32 = 0;
/// There is no next tag (end of sequence / block).
pub const FIFFV_NEXT_NONE: i32 = -1;

// ── Channel kind codes (`ChannelInfo::kind`) ──────────────────────────────

/// EEG scalp-potential channel.
pub const FIFFV_EEG_CH:     i32 = 2;
/// Electro-oculogram channel.
pub const FIFFV_EOG_CH:     i32 = 202;
/// Miscellaneous auxiliary channel.
pub const FIFFV_MISC_CH:    i32 = 502;

// ── Coil types and units ──────────────────────────────────────────────────

/// No coil (non-EEG channels).
pub const FIFFV_COIL_NONE:  i32 = 0;
/// EEG electrode.
pub const FIFFV_COIL_EEG:   i32 = 1;
/// Volts.
pub const FIFF_UNIT_V:      i32 = 107;
/// Dimensionless.
pub const FIFF_UNIT_NONE:   i32 = -1;
