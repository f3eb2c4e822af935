//! Sequential FIFF tag writer, the counterpart of [`super::tag`].
//!
//! Mirrors `mne/_fiff/write.py`: every tag is written with `next = 0`
//! (sequential) and the file is closed by a `FIFF_NOP` tag with `next = -1`,
//! so a reader can walk the whole file with [`super::tree::scan_directory`].
use std::io::Write;

use anyhow::{bail, Result};
use byteorder::{BigEndian, WriteBytesExt};

use super::constants::*;
use super::info::ChannelInfo;

/// Writes FIFF tags to any byte sink.
pub struct FifWriter<W: Write> {
    out: W,
    open_blocks: Vec<i32>,
}

impl<W: Write> FifWriter<W> {
    /// Start a file: file id, then a disabled directory pointer.
    pub fn new(out: W) -> Result<Self> {
        let mut w = Self { out, open_blocks: Vec::new() };
        w.write_id(FIFF_FILE_ID)?;
        w.write_int(FIFF_DIR_POINTER, -1)?;
        Ok(w)
    }

    fn header(&mut self, kind: i32, ftype: u32, size: usize, next: i32) -> Result<()> {
        let Ok(size) = i32::try_from(size) else {
            bail!("tag {kind} payload of {size} bytes exceeds the FIFF limit");
        };
        self.out.write_i32::<BigEndian>(kind)?;
        self.out.write_u32::<BigEndian>(ftype)?;
        self.out.write_i32::<BigEndian>(size)?;
        self.out.write_i32::<BigEndian>(next)?;
        Ok(())
    }

    /// File id struct: version, machine id, creation time (s, µs).
    pub fn write_id(&mut self, kind: i32) -> Result<()> {
        let now = chrono::Utc::now();
        self.header(kind, FIFFT_ID_STRUCT, 20, FIFFV_NEXT_SEQ)?;
        self.out.write_i32::<BigEndian>(FIFFC_VERSION)?;
        self.out.write_i32::<BigEndian>(0)?;
        self.out.write_i32::<BigEndian>(0)?;
        self.out.write_i32::<BigEndian>(now.timestamp() as i32)?;
        self.out.write_i32::<BigEndian>(now.timestamp_subsec_micros() as i32)?;
        Ok(())
    }

    pub fn write_int(&mut self, kind: i32, value: i32) -> Result<()> {
        self.write_ints(kind, &[value])
    }

    pub fn write_ints(&mut self, kind: i32, values: &[i32]) -> Result<()> {
        self.header(kind, FIFFT_INT, 4 * values.len(), FIFFV_NEXT_SEQ)?;
        for &v in values {
            self.out.write_i32::<BigEndian>(v)?;
        }
        Ok(())
    }

    pub fn write_float(&mut self, kind: i32, value: f32) -> Result<()> {
        self.header(kind, FIFFT_FLOAT, 4, FIFFV_NEXT_SEQ)?;
        self.out.write_f32::<BigEndian>(value)?;
        Ok(())
    }

    /// UTF-8 string, not NUL-terminated.
    pub fn write_string(&mut self, kind: i32, value: &str) -> Result<()> {
        self.header(kind, FIFFT_STRING, value.len(), FIFFV_NEXT_SEQ)?;
        self.out.write_all(value.as_bytes())?;
        Ok(())
    }

    /// Names joined with `:` (MNE's `write_name_list`).
    pub fn write_name_list(&mut self, kind: i32, names: &[String]) -> Result<()> {
        self.write_string(kind, &names.join(":"))
    }

    pub fn write_ch_info(&mut self, ch: &ChannelInfo) -> Result<()> {
        let bytes = ch.to_bytes()?;
        self.header(FIFF_CH_INFO, FIFFT_CH_INFO_STRUCT, bytes.len(), FIFFV_NEXT_SEQ)?;
        self.out.write_all(&bytes)?;
        Ok(())
    }

    /// Float matrix with C-order `dims`: data, reversed dims, rank.
    pub fn write_float_matrix<I>(&mut self, kind: i32, dims: &[usize], data: I) -> Result<()>
    where
        I: IntoIterator<Item = f64>,
    {
        let n: usize = dims.iter().product();
        let size = 4 * n + 4 * (dims.len() + 1);
        self.header(kind, FIFFT_MATRIX | FIFFT_FLOAT, size, FIFFV_NEXT_SEQ)?;
        let mut written = 0usize;
        for v in data {
            self.out.write_f32::<BigEndian>(v as f32)?;
            written += 1;
        }
        if written != n {
            bail!("matrix {dims:?} expects {n} values, got {written}");
        }
        for &d in dims.iter().rev() {
            let Ok(d) = i32::try_from(d) else {
                bail!("matrix dimension {d} exceeds the FIFF limit");
            };
            self.out.write_i32::<BigEndian>(d)?;
        }
        self.out.write_i32::<BigEndian>(dims.len() as i32)?;
        Ok(())
    }

    pub fn start_block(&mut self, kind: i32) -> Result<()> {
        self.write_int(FIFF_BLOCK_START, kind)?;
        self.open_blocks.push(kind);
        Ok(())
    }

    pub fn end_block(&mut self, kind: i32) -> Result<()> {
        match self.open_blocks.pop() {
            Some(open) if open == kind => self.write_int(FIFF_BLOCK_END, kind),
            Some(open) => bail!("closing block {kind} while block {open} is open"),
            None => bail!("closing block {kind} with no open block"),
        }
    }

    /// Write the terminating `FIFF_NOP` and return the sink.
    pub fn finish(mut self) -> Result<W> {
        if let Some(open) = self.open_blocks.last() {
            bail!("block {open} left open");
        }
        self.header(FIFF_NOP, FIFFT_VOID, 0, FIFFV_NEXT_NONE)?;
        self.out.flush()?;
        Ok(self.out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fiff::tag::{read_f32, read_string};
    use crate::fiff::tree::{read_tree, scan_directory, try_load_directory};
    use std::io::Cursor;

    #[test]
    fn written_file_scans_back() {
        let mut w = FifWriter::new(Vec::new()).unwrap();
        w.start_block(FIFFB_MEAS).unwrap();
        w.write_float(FIFF_SFREQ, 250.0).unwrap();
        w.write_string(FIFF_DESCRIPTION, "Word/wPos:11").unwrap();
        w.end_block(FIFFB_MEAS).unwrap();
        let bytes = w.finish().unwrap();

        let mut f = Cursor::new(bytes);
        assert!(try_load_directory(&mut f).unwrap().is_none());
        let dir = scan_directory(&mut f).unwrap();
        assert_eq!(dir.last().unwrap().kind, FIFF_NOP);
        let root = read_tree(&mut f, &dir).unwrap();
        let meas = root.find_block(FIFFB_MEAS).unwrap();
        assert_eq!(read_f32(&mut f, meas.find_tag(FIFF_SFREQ).unwrap()).unwrap(), 250.0);
        assert_eq!(
            read_string(&mut f, meas.find_tag(FIFF_DESCRIPTION).unwrap()).unwrap(),
            "Word/wPos:11"
        );
    }

    #[test]
    fn mismatched_blocks_are_rejected() {
        let mut w = FifWriter::new(Vec::new()).unwrap();
        w.start_block(FIFFB_MEAS).unwrap();
        assert!(w.end_block(FIFFB_MEAS_INFO).is_err());

        let mut w = FifWriter::new(Vec::new()).unwrap();
        w.start_block(FIFFB_MEAS).unwrap();
        assert!(w.finish().is_err());
    }

    #[test]
    fn matrix_value_count_is_checked() {
        let mut w = FifWriter::new(Vec::new()).unwrap();
        assert!(w.write_float_matrix(FIFF_EPOCH, &[2, 2], [1.0, 2.0, 3.0]).is_err());
    }
}
