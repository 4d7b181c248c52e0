// src/blocks/mod.rs

//! Unicode block classification and the block dispatch tables.
//!
//! The directory is quantized to rows of 16 codepoints. Each entry holds the
//! block's first row, its length in rows, and a code byte `index << 2 | kind`.
//! For dense and sparse blocks `index` selects the per-block metadata; sparse
//! blocks are numbered first so the sparse-only arrays share that index. For
//! soft blocks it selects an entry of `soft_names`.

use std::collections::{BTreeMap, HashMap};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::emit::c_identifier;
use crate::error::CompileError;
use crate::glyph::CodepointEntry;

/// Largest block sub-range that may be stored sparse.
pub const MAX_SPARSE_RANGE: u32 = 256;
/// Largest directory index (6 bits).
pub const MAX_BLOCK_INDEX: usize = 63;

/// One Unicode block as listed in the block reference table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockInfo {
    pub name: String,
    pub start: u32,
    /// Last codepoint, inclusive.
    pub end: u32,
    /// Assigned codepoints, informational only.
    #[serde(default)]
    pub assigned: u32,
}

impl BlockInfo {
    pub fn codename(&self) -> String {
        codename(&self.name)
    }

    pub fn len(&self) -> u32 {
        self.end + 1 - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }

    pub fn contains(&self, codepoint: u32) -> bool {
        (self.start..=self.end).contains(&codepoint)
    }
}

/// Normalised block name: lowercase with spaces, dashes and underscores removed.
pub fn codename(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, ' ' | '-' | '_'))
        .flat_map(char::to_lowercase)
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    Missing = 0,
    Soft = 1,
    Dense = 2,
    Sparse = 3,
}

impl BlockKind {
    pub fn from_code(code: u8) -> BlockKind {
        match code & 0b11 {
            1 => BlockKind::Soft,
            2 => BlockKind::Dense,
            3 => BlockKind::Sparse,
            _ => BlockKind::Missing,
        }
    }
}

/// Sparse storage pays off when fewer than two thirds of the range is mapped.
pub fn is_sparse(mapped: usize, range: usize) -> bool {
    range <= MAX_SPARSE_RANGE as usize && 3 * mapped < 2 * range
}

pub fn classify(mapped: usize, range: usize, soft: bool) -> BlockKind {
    if soft {
        BlockKind::Soft
    } else if mapped == 0 {
        BlockKind::Missing
    } else if is_sparse(mapped, range) {
        BlockKind::Sparse
    } else {
        BlockKind::Dense
    }
}

/// Binary search for `value` in an ascending slice.
pub fn search_sorted<T: Ord + Copy>(list: &[T], value: T) -> Option<usize> {
    let (mut lo, mut hi) = (0usize, list.len());
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        match list[mid].cmp(&value) {
            std::cmp::Ordering::Equal => return Some(mid),
            std::cmp::Ordering::Less => lo = mid + 1,
            std::cmp::Ordering::Greater => hi = mid,
        }
    }
    None
}

/// Binary search for the range `[starts[i], starts[i] + lengths[i])` holding
/// `value`. Ranges must be sorted and disjoint.
pub fn search_ranges<L: Copy + Into<u32>>(starts: &[u16], lengths: &[L], value: u32) -> Option<usize> {
    let i = starts.partition_point(|&s| s as u32 <= value);
    let i = i.checked_sub(1)?;
    let length: u32 = (*lengths.get(i)?).into();
    (value < starts[i] as u32 + length).then_some(i)
}

/// Input to [`BlockTables::build`]: one block and its mapped codepoints.
#[derive(Debug, Clone)]
pub struct BlockPlan {
    pub info: BlockInfo,
    pub soft: bool,
    /// Mapped entries keyed by offset from the block start.
    pub entries: BTreeMap<u32, CodepointEntry>,
}

/// Classification outcome of one block, for reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockSummary {
    pub name: String,
    pub kind: BlockKind,
    pub start: u32,
    pub end: u32,
    pub mapped: usize,
    pub first_offset: Option<u32>,
    pub last_offset: Option<u32>,
    /// Unmapped slots stored inside a dense range.
    pub voids: usize,
    /// Bytes of metadata and codes spent on this block.
    pub bytes: usize,
}

/// The emitted block dispatch tables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockTables {
    // --- Directory, sorted by start row ---
    pub dir_start: Vec<u16>,
    pub dir_rows: Vec<u8>,
    pub dir_code: Vec<u8>,

    // --- Per included block (sparse first, then dense) ---
    pub bstart_indices: Vec<u16>,
    pub first_offsets: Vec<u16>,
    pub last_offsets: Vec<u16>,

    // --- Sparse blocks only ---
    pub sparse_offsets: Vec<u16>,
    pub sparse_nmapped: Vec<u16>,
    /// Mapped offsets relative to the block's first offset.
    pub sparse_indices: Vec<u8>,

    pub codepoint_map: Vec<CodepointEntry>,
    pub soft_names: Vec<String>,
}

/// Result of a directory lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockLookup {
    Unsupported,
    /// Delegate to the external handler for `soft_names[index]`.
    Soft { index: usize, offset: u32 },
    Mapped(CodepointEntry),
}

fn check_u16(table: &'static str, value: usize) -> Result<u16, CompileError> {
    u16::try_from(value).map_err(|_| CompileError::TableOverflow {
        table,
        bits: 16,
        value,
    })
}

impl BlockTables {
    /// Classifies every block and lays out the tables.
    pub fn build(plans: &[BlockPlan]) -> Result<(BlockTables, Vec<BlockSummary>), CompileError> {
        let mut ordered: Vec<&BlockPlan> = plans.iter().collect();
        ordered.sort_by_key(|p| p.info.start);

        for plan in &ordered {
            let info = &plan.info;
            if info.start % 16 != 0 || (info.end + 1) % 16 != 0 || info.is_empty() {
                return Err(CompileError::MisalignedBlock {
                    name: info.name.clone(),
                    start: info.start,
                    end: info.end,
                });
            }
            let rows = info.len() / 16;
            if rows > u8::MAX as u32 {
                return Err(CompileError::BlockTooLong {
                    name: info.name.clone(),
                    rows,
                });
            }
            if info.end > (u16::MAX as u32) << 4 | 0xF {
                return Err(CompileError::TableOverflow {
                    table: "block_directory",
                    bits: 16,
                    value: info.end as usize,
                });
            }
        }
        for pair in ordered.windows(2) {
            if pair[1].info.start <= pair[0].info.end {
                return Err(CompileError::OverlappingBlocks(
                    pair[0].info.name.clone(),
                    pair[1].info.name.clone(),
                ));
            }
        }

        let mut summaries = Vec::with_capacity(ordered.len());
        let mut kinds = Vec::with_capacity(ordered.len());
        for plan in &ordered {
            let (first, last) = match (plan.entries.keys().next(), plan.entries.keys().next_back()) {
                (Some(&f), Some(&l)) => (Some(f), Some(l)),
                _ => (None, None),
            };
            let range = match (first, last) {
                (Some(f), Some(l)) => (l - f + 1) as usize,
                _ => 0,
            };
            let kind = classify(plan.entries.len(), range, plan.soft);
            if plan.soft && !plan.entries.is_empty() {
                warn!(
                    "Block {} is soft; its {} mapped codepoints are ignored",
                    plan.info.name,
                    plan.entries.len()
                );
            }
            let voids = if kind == BlockKind::Dense {
                range - plan.entries.len()
            } else {
                0
            };
            debug!(
                "Block {} [{:#06X}, {:#06X}]: {:?}, {} mapped over {} codepoints",
                plan.info.name,
                plan.info.start,
                plan.info.end,
                kind,
                plan.entries.len(),
                range
            );
            kinds.push(kind);
            summaries.push(BlockSummary {
                name: plan.info.name.clone(),
                kind,
                start: plan.info.start,
                end: plan.info.end,
                mapped: plan.entries.len(),
                first_offset: first,
                last_offset: last,
                voids,
                bytes: 0,
            });
        }

        let mut tables = BlockTables::default();
        let mut index_of: Vec<Option<usize>> = vec![None; ordered.len()];

        // Sparse metadata first so the sparse-only arrays line up.
        for pass in [BlockKind::Sparse, BlockKind::Dense] {
            for (i, plan) in ordered.iter().enumerate() {
                if kinds[i] != pass {
                    continue;
                }
                let index = tables.first_offsets.len();
                let before = tables.byte_size();
                tables.push_mapped(plan, pass)?;
                summaries[i].bytes = tables.byte_size() - before;
                index_of[i] = Some(index);
            }
        }

        let mut soft_ids: HashMap<String, &String> = HashMap::new();
        for (i, plan) in ordered.iter().enumerate() {
            let index = match kinds[i] {
                BlockKind::Missing => continue,
                BlockKind::Soft => {
                    let name = plan.info.codename();
                    let id = c_identifier(&name);
                    if let Some(other) = soft_ids.get(&id) {
                        return Err(CompileError::DuplicateSoftBlock(
                            (*other).clone(),
                            plan.info.name.clone(),
                            id,
                        ));
                    }
                    soft_ids.insert(id, &plan.info.name);
                    tables.soft_names.push(name);
                    tables.soft_names.len() - 1
                }
                BlockKind::Dense | BlockKind::Sparse => match index_of[i] {
                    Some(index) => index,
                    None => continue,
                },
            };
            if index > MAX_BLOCK_INDEX {
                let kind = if kinds[i] == BlockKind::Soft { "soft" } else { "mapped" };
                return Err(CompileError::BlockIndexOverflow { kind, index });
            }
            tables.dir_start.push((plan.info.start >> 4) as u16);
            tables.dir_rows.push((plan.info.len() / 16) as u8);
            tables.dir_code.push((index as u8) << 2 | kinds[i] as u8);
        }

        info!(
            "Block tables: {} directory entries, {} sparse, {} dense, {} soft, {} codes",
            tables.dir_start.len(),
            tables.sparse_nmapped.len(),
            tables.first_offsets.len() - tables.sparse_nmapped.len(),
            tables.soft_names.len(),
            tables.codepoint_map.len()
        );
        Ok((tables, summaries))
    }

    fn push_mapped(&mut self, plan: &BlockPlan, kind: BlockKind) -> Result<(), CompileError> {
        let (Some(&first), Some(&last)) = (plan.entries.keys().next(), plan.entries.keys().next_back()) else {
            return Ok(());
        };
        self.bstart_indices.push(check_u16("bstart_indices", self.codepoint_map.len())?);
        self.first_offsets.push(check_u16("first_offsets", first as usize)?);
        self.last_offsets.push(check_u16("last_offsets", last as usize)?);

        match kind {
            BlockKind::Sparse => {
                let length = last - first + 1;
                if length > MAX_SPARSE_RANGE {
                    return Err(CompileError::SparseBlockTooLong {
                        name: plan.info.name.clone(),
                        length,
                    });
                }
                self.sparse_offsets.push(check_u16("sparse_offsets", self.sparse_indices.len())?);
                self.sparse_nmapped.push(check_u16("sparse_nmapped", plan.entries.len())?);
                for (&offset, &entry) in &plan.entries {
                    self.sparse_indices.push((offset - first) as u8);
                    self.codepoint_map.push(entry);
                }
            }
            _ => {
                for offset in first..=last {
                    let entry = plan.entries.get(&offset).copied().unwrap_or_default();
                    self.codepoint_map.push(entry);
                }
            }
        }
        Ok(())
    }

    /// Total emitted size in bytes.
    pub fn byte_size(&self) -> usize {
        self.dir_start.len() * 2
            + self.dir_rows.len()
            + self.dir_code.len()
            + (self.bstart_indices.len() + self.first_offsets.len() + self.last_offsets.len()) * 2
            + (self.sparse_offsets.len() + self.sparse_nmapped.len()) * 2
            + self.sparse_indices.len()
            + self.codepoint_map.len() * 2
    }

    /// Resolves a codepoint to its table entry.
    pub fn lookup(&self, codepoint: u32) -> BlockLookup {
        let Some(d) = search_ranges(&self.dir_start, &self.dir_rows, codepoint >> 4) else {
            return BlockLookup::Unsupported;
        };
        let code = self.dir_code[d];
        let index = (code >> 2) as usize;
        let offset = codepoint - ((self.dir_start[d] as u32) << 4);

        match BlockKind::from_code(code) {
            BlockKind::Missing => BlockLookup::Unsupported,
            BlockKind::Soft => BlockLookup::Soft { index, offset },
            kind => self
                .lookup_mapped(index, offset, kind)
                .map_or(BlockLookup::Unsupported, BlockLookup::Mapped),
        }
    }

    fn lookup_mapped(&self, index: usize, offset: u32, kind: BlockKind) -> Option<CodepointEntry> {
        let first = *self.first_offsets.get(index)? as u32;
        let last = *self.last_offsets.get(index)? as u32;
        if offset < first || offset > last {
            return None;
        }
        let base = *self.bstart_indices.get(index)? as usize;
        let position = if kind == BlockKind::Sparse {
            let start = *self.sparse_offsets.get(index)? as usize;
            let n = *self.sparse_nmapped.get(index)? as usize;
            let indices = self.sparse_indices.get(start..start + n)?;
            search_sorted(indices, (offset - first) as u8)?
        } else {
            (offset - first) as usize
        };
        let entry = *self.codepoint_map.get(base + position)?;
        (!entry.is_unmapped()).then_some(entry)
    }
}
