//! FIFF tag I/O.
//!
//! A tag is the smallest structural unit of a FIF file.
//! On-disk layout (always big-endian):
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │  kind : i32  │  type : u32  │  size : i32  │ next : i32 │  ← 16 bytes
//! ├──────────────────────────────────────────────────────┤
//! │  <size bytes of payload data>                        │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! `next == 0` means the next tag follows immediately (pos + 16 + size).
//! `next  > 0` means seek to byte offset `next`.
//! `next == -1` means there is no next tag (end of sequence).
use std::io::{Read, Seek, SeekFrom};

use anyhow::{bail, Context, Result};
use byteorder::{BigEndian, ByteOrder, ReadBytesExt};

use super::constants::*;

// ── Tag header ────────────────────────────────────────────────────────────

/// Lightweight tag header; no payload loaded yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagHeader {
    pub kind: i32,
    pub ftype: u32, // "type" is a Rust keyword
    pub size: i32,
    pub next: i32,
    pub pos: u64, // byte offset of the header in the file
}

impl TagHeader {
    /// Byte position of the first payload byte.
    #[inline]
    pub fn data_pos(&self) -> u64 {
        self.pos + 16
    }

    /// Position of the NEXT tag header (or `None` if this is the last tag).
    pub fn next_pos(&self) -> Option<u64> {
        if self.next == FIFFV_NEXT_SEQ {
            Some(self.pos + 16 + self.size.max(0) as u64)
        } else if self.next > 0 {
            Some(self.next as u64)
        } else {
            None // FIFFV_NEXT_NONE (-1) or any other negative
        }
    }
}

/// Read only the 16-byte tag header at the given file position.
pub fn read_tag_header<R: Read + Seek>(reader: &mut R, pos: u64) -> Result<TagHeader> {
    reader
        .seek(SeekFrom::Start(pos))
        .with_context(|| format!("seek to tag header @ {pos:#x}"))?;
    let mut buf = [0u8; 16];
    reader
        .read_exact(&mut buf)
        .with_context(|| format!("read tag header @ {pos:#x}"))?;
    Ok(TagHeader {
        kind: BigEndian::read_i32(&buf[0..4]),
        ftype: BigEndian::read_u32(&buf[4..8]),
        size: BigEndian::read_i32(&buf[8..12]),
        next: BigEndian::read_i32(&buf[12..16]),
        pos,
    })
}

// ── Payload readers (stateless, seek to `tag.data_pos()` first) ───────────

/// Read a single big-endian i32 payload.
pub fn read_i32<R: Read + Seek>(reader: &mut R, tag: &TagHeader) -> Result<i32> {
    seek_data(reader, tag)?;
    Ok(reader.read_i32::<BigEndian>()?)
}

/// Read a single big-endian f32 payload.
pub fn read_f32<R: Read + Seek>(reader: &mut R, tag: &TagHeader) -> Result<f32> {
    seek_data(reader, tag)?;
    Ok(reader.read_f32::<BigEndian>()?)
}

/// Read a string payload.
///
/// MNE writes UTF-8; older files are Latin-1, which is decoded byte-by-byte
/// when the payload is not valid UTF-8.
pub fn read_string<R: Read + Seek>(reader: &mut R, tag: &TagHeader) -> Result<String> {
    let buf = read_raw_bytes(reader, tag)?;
    Ok(match String::from_utf8(buf) {
        Ok(s) => s,
        Err(e) => e.into_bytes().iter().map(|&b| b as char).collect(),
    })
}

/// Read a big-endian i32 array (zero or more ints).
pub fn read_i32_array<R: Read + Seek>(reader: &mut R, tag: &TagHeader) -> Result<Vec<i32>> {
    seek_data(reader, tag)?;
    let mut out = vec![0i32; tag.size.max(0) as usize / 4];
    reader.read_i32_into::<BigEndian>(&mut out)?;
    Ok(out)
}

/// Read the entire payload as raw bytes (useful for ch_info struct parsing).
pub fn read_raw_bytes<R: Read + Seek>(reader: &mut R, tag: &TagHeader) -> Result<Vec<u8>> {
    seek_data(reader, tag)?;
    let mut buf = vec![0u8; tag.size.max(0) as usize];
    reader.read_exact(&mut buf)?;
    Ok(buf)
}

/// Read a `FIFFT_MATRIX | FIFFT_FLOAT` payload.
///
/// Layout: `data (C order) | dims reversed (i32 × ndim) | ndim (i32)`.
/// Returns the dimensions in C order and the flat data.
pub fn read_f32_matrix<R: Read + Seek>(
    reader: &mut R,
    tag: &TagHeader,
) -> Result<(Vec<usize>, Vec<f32>)> {
    if tag.ftype != (FIFFT_MATRIX | FIFFT_FLOAT) {
        bail!("expected a float matrix, got type {:#x}", tag.ftype);
    }
    let raw = read_raw_bytes(reader, tag)?;
    if raw.len() < 4 {
        bail!("matrix payload too short ({} bytes)", raw.len());
    }
    let ndim = BigEndian::read_i32(&raw[raw.len() - 4..]);
    if !(1..=8).contains(&ndim) {
        bail!("implausible matrix rank {ndim}");
    }
    let ndim = ndim as usize;
    let dims_start = raw
        .len()
        .checked_sub(4 * (ndim + 1))
        .context("matrix payload too short for its dimensions")?;
    let mut dims = Vec::with_capacity(ndim);
    for k in 0..ndim {
        let d = BigEndian::read_i32(&raw[dims_start + 4 * k..dims_start + 4 * k + 4]);
        if d < 0 {
            bail!("negative matrix dimension {d}");
        }
        dims.push(d as usize);
    }
    dims.reverse();
    let n: usize = dims.iter().product();
    if dims_start != 4 * n {
        bail!("matrix {dims:?} needs {} data bytes, payload has {dims_start}", 4 * n);
    }
    let mut data = vec![0f32; n];
    BigEndian::read_f32_into(&raw[..dims_start], &mut data);
    Ok((dims, data))
}

// ── Directory tag (FIFFT_DIR_ENTRY_STRUCT) ────────────────────────────────

/// Read a directory of tag headers embedded in a `FIFF_DIR_POINTER` tag.
/// Each entry is a 16-byte structure identical to a tag header, but the
/// `next` field stores the real file position of that tag.
pub fn read_directory<R: Read + Seek>(reader: &mut R, tag: &TagHeader) -> Result<Vec<TagHeader>> {
    if tag.ftype != FIFFT_DIR_ENTRY_STRUCT {
        bail!("expected FIFFT_DIR_ENTRY_STRUCT, got {}", tag.ftype);
    }
    let raw = read_raw_bytes(reader, tag)?;
    Ok(raw
        .chunks_exact(16)
        .map(|b| TagHeader {
            kind: BigEndian::read_i32(&b[0..4]),
            ftype: BigEndian::read_u32(&b[4..8]),
            size: BigEndian::read_i32(&b[8..12]),
            next: FIFFV_NEXT_NONE,
            pos: BigEndian::read_u32(&b[12..16]) as u64,
        })
        .collect())
}

// ── Helpers ───────────────────────────────────────────────────────────────

#[inline]
fn seek_data<R: Read + Seek>(reader: &mut R, tag: &TagHeader) -> Result<()> {
    reader
        .seek(SeekFrom::Start(tag.data_pos()))
        .with_context(|| format!("seek to tag data @ {:#x}", tag.data_pos()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn make_tag_bytes(kind: i32, ftype: u32, size: i32, next: i32) -> Vec<u8> {
        let mut b = vec![0u8; 16];
        b[0..4].copy_from_slice(&kind.to_be_bytes());
        b[4..8].copy_from_slice(&ftype.to_be_bytes());
        b[8..12].copy_from_slice(&size.to_be_bytes());
        b[12..16].copy_from_slice(&next.to_be_bytes());
        b
    }

    #[test]
    fn round_trip_i32_tag() {
        let mut buf = make_tag_bytes(FIFF_NCHAN, FIFFT_INT, 4, FIFFV_NEXT_SEQ);
        buf.extend_from_slice(&42_i32.to_be_bytes());

        let mut cursor = Cursor::new(buf);
        let tag = read_tag_header(&mut cursor, 0).unwrap();
        assert_eq!(tag.kind, FIFF_NCHAN);
        assert_eq!(tag.ftype, FIFFT_INT);
        assert_eq!(tag.size, 4);
        assert_eq!(read_i32(&mut cursor, &tag).unwrap(), 42);
    }

    #[test]
    fn next_pos_variants() {
        let seq = TagHeader { kind: 1, ftype: 3, size: 8, next: 0, pos: 100 };
        assert_eq!(seq.next_pos(), Some(124)); // 100 + 16 + 8
        let jump = TagHeader { next: 5000, ..seq };
        assert_eq!(jump.next_pos(), Some(5000));
        let last = TagHeader { next: -1, ..seq };
        assert_eq!(last.next_pos(), None);
    }

    #[test]
    fn string_falls_back_to_latin1() {
        let text = [b'F', b'p', 0xB5]; // "Fpµ" in Latin-1
        let mut buf = make_tag_bytes(FIFF_COMMENT, FIFFT_STRING, 3, -1);
        buf.extend_from_slice(&text);
        let mut cursor = Cursor::new(buf);
        let tag = read_tag_header(&mut cursor, 0).unwrap();
        assert_eq!(read_string(&mut cursor, &tag).unwrap(), "Fpµ");
    }

    #[test]
    fn float_matrix_layout() {
        // 2 × 3 matrix, C order.
        let values = [1.0_f32, 2.0, 3.0, 4.0, 5.0, 6.0];
        let mut payload = Vec::new();
        for v in values {
            payload.extend_from_slice(&v.to_be_bytes());
        }
        for d in [3_i32, 2, 2] {
            payload.extend_from_slice(&d.to_be_bytes());
        }
        let mut buf = make_tag_bytes(FIFF_EPOCH, FIFFT_MATRIX | FIFFT_FLOAT, payload.len() as i32, -1);
        buf.extend_from_slice(&payload);
        let mut cursor = Cursor::new(buf);
        let tag = read_tag_header(&mut cursor, 0).unwrap();
        let (dims, data) = read_f32_matrix(&mut cursor, &tag).unwrap();
        assert_eq!(dims, [2, 3]);
        assert_eq!(data, values);
    }

    #[test]
    fn truncated_matrix_is_an_error() {
        let mut payload = Vec::new();
        payload.extend_from_slice(&1.0_f32.to_be_bytes());
        for d in [3_i32, 2, 2] {
            payload.extend_from_slice(&d.to_be_bytes());
        }
        let mut buf = make_tag_bytes(FIFF_EPOCH, FIFFT_MATRIX | FIFFT_FLOAT, payload.len() as i32, -1);
        buf.extend_from_slice(&payload);
        let mut cursor = Cursor::new(buf);
        let tag = read_tag_header(&mut cursor, 0).unwrap();
        assert!(read_f32_matrix(&mut cursor, &tag).is_err());
    }
}
