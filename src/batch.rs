use std::ops::Range;

use crate::index::ChapterEntry;

/// A contiguous run of chapters destined for one output archive. Offsets are
/// 0-based and relative to the sliced chapter list, not the full index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    pub start_offset: usize,
    pub end_offset: usize,
    pub entries: Vec<ChapterEntry>,
}

/// Sign and ordering checks that need no knowledge of the index length. These run
/// before any network traffic so a bad range never produces partial output.
pub fn validate_request(chunk_size: usize, start_idx: i64, end_idx: i64) -> anyhow::Result<()> {
    if chunk_size == 0 {
        anyhow::bail!("chunk size must be at least 1");
    }

    if start_idx != 0 && end_idx != 0 {
        if start_idx < 0 || end_idx < 0 {
            anyhow::bail!("start index and end index must be positive");
        }
        if start_idx >= end_idx {
            anyhow::bail!("start index must be smaller than end index");
        }
    } else if start_idx != 0 && start_idx < 0 {
        anyhow::bail!("start index must be positive");
    }

    Ok(())
}

/// Bounds checks and slicing once the index length is known. Assumes the signs and
/// ordering have already passed [`validate_request`]. An `end_idx` without a
/// `start_idx` is silently ignored.
pub fn select_range(len: usize, start_idx: i64, end_idx: i64) -> anyhow::Result<Range<usize>> {
    if start_idx != 0 && end_idx != 0 {
        let (start, end) = (start_idx as usize, end_idx as usize);
        if start > len.saturating_sub(1) || end > len {
            anyhow::bail!("indexes are larger than the chapter list length ({len})");
        }
        Ok(start..end)
    } else if start_idx != 0 {
        let start = start_idx as usize;
        if start > len.saturating_sub(1) {
            anyhow::bail!("indexes are larger than the chapter list length ({len})");
        }
        Ok(start..len)
    } else {
        Ok(0..len)
    }
}

/// Splits the (already sliced) chapter list into contiguous batches of at most
/// `chunk_size` entries. Together the batches cover the list exactly, in order,
/// with only the final batch allowed to run short.
pub fn into_batches(entries: &[ChapterEntry], chunk_size: usize) -> Vec<Batch> {
    entries
        .chunks(chunk_size)
        .enumerate()
        .map(|(i, chunk)| {
            let start_offset = i * chunk_size;
            Batch {
                start_offset,
                end_offset: start_offset + chunk.len(),
                entries: chunk.to_vec(),
            }
        })
        .collect()
}
