//! FIF directory tree construction.
//!
//! Mirrors `mne/_fiff/tree.py` but uses owned Rust types throughout.
//!
//! The tree is built by scanning all tag headers sequentially and grouping
//! them into blocks delimited by `FIFF_BLOCK_START` / `FIFF_BLOCK_END` tags.
use std::io::{Read, Seek};

use anyhow::{bail, Result};

use super::constants::*;
use super::tag::{read_directory, read_i32, read_tag_header, TagHeader};

// ── Node ─────────────────────────────────────────────────────────────────

/// One node in the FIF tree, analogous to MNE's `dict` node.
#[derive(Debug, Default, Clone)]
pub struct Node {
    /// Block kind (e.g. `FIFFB_MEAS`, `FIFFB_MNE_EPOCHS`, …).
    /// 0 = root.
    pub block: i32,
    /// All non-structural tag headers in this node (not including BLOCK_START/END).
    pub entries: Vec<TagHeader>,
    pub children: Vec<Node>,
}

impl Node {
    /// Depth-first search for the first node with the given block kind.
    pub fn find_block(&self, kind: i32) -> Option<&Node> {
        if self.block == kind {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find_block(kind))
    }

    /// Find the first tag header with the given kind in this node's entries.
    /// Does NOT recurse into children.
    pub fn find_tag(&self, kind: i32) -> Option<&TagHeader> {
        self.entries.iter().find(|e| e.kind == kind)
    }
}

// ── Tree builder ─────────────────────────────────────────────────────────

/// Walk a flat directory and build the tree, resolving block kinds from the file.
///
/// Matches `mne._fiff.tree.make_dir_tree()`.  Unbalanced `BLOCK_END` tags
/// are an error; blocks left open at the end are attached to their parents.
pub fn read_tree<R: Read + Seek>(reader: &mut R, directory: &[TagHeader]) -> Result<Node> {
    let mut stack: Vec<Node> = vec![Node::default()];

    for tag in directory {
        match tag.kind {
            FIFF_BLOCK_START => {
                let block = read_i32(reader, tag)?;
                stack.push(Node { block, ..Node::default() });
            }
            FIFF_BLOCK_END => {
                if stack.len() < 2 {
                    bail!("unmatched FIFF_BLOCK_END @ {:#x}", tag.pos);
                }
                if let Some(finished) = stack.pop() {
                    if let Some(parent) = stack.last_mut() {
                        parent.children.push(finished);
                    }
                }
            }
            _ => {
                if let Some(node) = stack.last_mut() {
                    node.entries.push(*tag);
                }
            }
        }
    }

    while stack.len() > 1 {
        if let Some(orphan) = stack.pop() {
            if let Some(parent) = stack.last_mut() {
                parent.children.push(orphan);
            }
        }
    }
    Ok(stack.pop().unwrap_or_default())
}

// ── Directory scanner ─────────────────────────────────────────────────────

/// Read every tag header by following the `next` pointer chain.
/// This is MNE's "slow path", used when there is no pre-built directory.
pub fn scan_directory<R: Read + Seek>(reader: &mut R) -> Result<Vec<TagHeader>> {
    let mut directory = Vec::new();
    let mut pos: Option<u64> = Some(0);
    while let Some(p) = pos {
        let tag = read_tag_header(reader, p)?;
        pos = tag.next_pos();
        directory.push(tag);
    }
    Ok(directory)
}

// ── Fast directory from embedded dir tag ─────────────────────────────────

/// Try to load the pre-built tag directory.
///
/// MNE checks `FIFF_DIR_POINTER` (tag kind 101) right after the file id; if
/// its payload is > 0 it points to a `FIFFT_DIR_ENTRY_STRUCT` tag containing
/// all headers.  Returns `None` if missing or disabled (`-1`).
pub fn try_load_directory<R: Read + Seek>(reader: &mut R) -> Result<Option<Vec<TagHeader>>> {
    let id_tag = read_tag_header(reader, 0)?;
    if id_tag.kind != FIFF_FILE_ID {
        bail!("not a FIF file (first tag kind {})", id_tag.kind);
    }
    let Some(next) = id_tag.next_pos() else {
        return Ok(None);
    };
    let dir_ptr_tag = read_tag_header(reader, next)?;
    if dir_ptr_tag.kind != FIFF_DIR_POINTER {
        return Ok(None);
    }
    let dirpos = read_i32(reader, &dir_ptr_tag)?;
    if dirpos <= 0 {
        return Ok(None);
    }
    let dir_tag = read_tag_header(reader, dirpos as u64)?;
    if dir_tag.ftype != FIFFT_DIR_ENTRY_STRUCT {
        return Ok(None);
    }
    Ok(Some(read_directory(reader, &dir_tag)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Sequential file from `(kind, i32 payload)` pairs; the last tag ends the chain.
    fn file_of(tags: &[(i32, i32)]) -> Cursor<Vec<u8>> {
        let mut out = Vec::new();
        for (i, &(kind, value)) in tags.iter().enumerate() {
            let next = if i + 1 == tags.len() { FIFFV_NEXT_NONE } else { FIFFV_NEXT_SEQ };
            for word in [kind, FIFFT_INT as i32, 4, next, value] {
                out.extend_from_slice(&word.to_be_bytes());
            }
        }
        Cursor::new(out)
    }

    #[test]
    fn nested_blocks_with_resolved_kinds() {
        let mut f = file_of(&[
            (FIFF_FILE_ID, 0),
            (FIFF_BLOCK_START, FIFFB_MEAS),
            (FIFF_BLOCK_START, FIFFB_MEAS_INFO),
            (FIFF_NCHAN, 3),
            (FIFF_BLOCK_END, FIFFB_MEAS_INFO),
            (FIFF_SFREQ, 0),
            (FIFF_BLOCK_END, FIFFB_MEAS),
            (FIFF_NOP, 0),
        ]);
        let dir = scan_directory(&mut f).unwrap();
        assert_eq!(dir.len(), 8);
        let root = read_tree(&mut f, &dir).unwrap();
        let meas = root.find_block(FIFFB_MEAS).unwrap();
        assert!(meas.find_tag(FIFF_SFREQ).is_some());
        assert!(meas.find_tag(FIFF_NCHAN).is_none());
        let info = meas.find_block(FIFFB_MEAS_INFO).unwrap();
        assert_eq!(read_i32(&mut f, info.find_tag(FIFF_NCHAN).unwrap()).unwrap(), 3);
    }

    #[test]
    fn unmatched_block_end_is_an_error() {
        let mut f = file_of(&[(FIFF_FILE_ID, 0), (FIFF_BLOCK_END, FIFFB_MEAS)]);
        let dir = scan_directory(&mut f).unwrap();
        assert!(read_tree(&mut f, &dir).is_err());
    }

    #[test]
    fn disabled_dir_pointer_means_scan() {
        let mut f = file_of(&[(FIFF_FILE_ID, 0), (FIFF_DIR_POINTER, -1), (FIFF_NOP, 0)]);
        assert!(try_load_directory(&mut f).unwrap().is_none());
    }

    #[test]
    fn foreign_file_is_rejected() {
        let mut f = file_of(&[(FIFF_NCHAN, 1)]);
        assert!(try_load_directory(&mut f).is_err());
    }
}
