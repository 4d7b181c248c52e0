// src/transform/mod.rs

//! Transform slot allocation.
//!
//! A transform is stored in the high `16 - char_bits` bits of a codepoint cell
//! as a slot number. Slots are handed out in three runs:
//!
//! 1. diacritic shortcuts, densely from slot 1 in input order,
//! 2. custom pixel transforms,
//! 3. extended code pages, one per extra block of `2^char_bits` glyph indices.
//!
//! Only transforms some decomposition actually uses receive a slot.

use std::collections::{BTreeSet, HashSet};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::config::{CellGeometry, CodeLayout};
use crate::emit::c_identifier;
use crate::error::CompileError;

pub mod ops;

pub use ops::PixelOp;

/// What a named transform does to the base glyph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransformKind {
    /// Stamp the combining mark at `mark` (offset into the combining block).
    Diacritic { mark: u8 },
    /// Run a sequence of pixel operations.
    Custom { ops: Vec<PixelOp> },
}

/// One transform as authored in the font source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformDef {
    pub key: String,
    #[serde(default)]
    pub name: String,
    #[serde(flatten)]
    pub kind: TransformKind,
}

/// Decode-time behaviour of an allocated slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TransformAction {
    Diacritic { mark: u8 },
    Custom { ops: Vec<PixelOp> },
    /// Adds `page << char_bits` to the glyph index and drops the transform.
    ExtendedPage { page: u16 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocatedTransform {
    pub slot: u16,
    pub key: String,
    pub name: String,
    pub action: TransformAction,
}

/// All allocated slots. `entries[i]` holds slot `i + 1`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformTable {
    pub entries: Vec<AllocatedTransform>,
    pub diacritic_count: u16,
    pub custom_count: u16,
    pub extended_pages: u16,
}

/// Number of extended code pages needed to address `glyph_count` real glyphs.
pub fn extended_pages_needed(glyph_count: usize, layout: &CodeLayout) -> usize {
    let capacity = layout.glyph_capacity();
    if glyph_count <= capacity {
        return 0;
    }
    let excess = glyph_count - capacity;
    excess.div_ceil(layout.glyph_modulus() as usize)
}

/// Checks the operands of every custom transform against the cell.
pub fn check_ops(defs: &[TransformDef], cell: &CellGeometry) -> Result<(), CompileError> {
    for def in defs {
        if let TransformKind::Custom { ops } = &def.kind {
            for op in ops {
                op.check(cell).map_err(|reason| CompileError::InvalidPixelOp {
                    key: def.key.clone(),
                    reason,
                })?;
            }
        }
    }
    Ok(())
}

impl TransformTable {
    /// Allocates slots for the transforms named in `used`, plus enough
    /// extended pages for `glyph_count` glyphs.
    ///
    /// Returns the table and the keys that were defined but never used.
    pub fn allocate(
        defs: &[TransformDef],
        used: &BTreeSet<String>,
        glyph_count: usize,
        layout: &CodeLayout,
    ) -> Result<(TransformTable, Vec<String>), CompileError> {
        let mut seen = HashSet::new();
        for def in defs {
            if !seen.insert(c_identifier(&def.key)) {
                return Err(CompileError::DuplicateTransformKey(def.key.clone()));
            }
        }

        let unused: Vec<String> = defs
            .iter()
            .filter(|d| !used.contains(&d.key))
            .map(|d| d.key.clone())
            .collect();

        let diacritics = defs
            .iter()
            .filter(|d| used.contains(&d.key))
            .filter(|d| matches!(d.kind, TransformKind::Diacritic { .. }));
        let customs = defs
            .iter()
            .filter(|d| used.contains(&d.key))
            .filter(|d| matches!(d.kind, TransformKind::Custom { .. }));
        let ordered: Vec<&TransformDef> = diacritics.chain(customs).collect();

        let pages = extended_pages_needed(glyph_count, layout);
        let needed = ordered.len() + pages;
        let available = layout.slot_capacity() as usize - 1;
        if needed > available {
            return Err(CompileError::TransformSpaceExhausted { needed, available });
        }

        let mut table = TransformTable::default();
        for def in ordered {
            let slot = table.entries.len() as u16 + 1;
            let action = match &def.kind {
                TransformKind::Diacritic { mark } => {
                    table.diacritic_count += 1;
                    TransformAction::Diacritic { mark: *mark }
                }
                TransformKind::Custom { ops } => {
                    table.custom_count += 1;
                    TransformAction::Custom { ops: ops.clone() }
                }
            };
            debug!("Transform {} -> slot {}", def.key, slot);
            table.entries.push(AllocatedTransform {
                slot,
                key: def.key.clone(),
                name: def.name.clone(),
                action,
            });
        }
        for page in 1..=pages as u16 {
            let slot = table.entries.len() as u16 + 1;
            table.entries.push(AllocatedTransform {
                slot,
                key: format!("EXTENDED_PAGE_{}", page),
                name: format!("extended code page {}", page),
                action: TransformAction::ExtendedPage { page },
            });
        }
        table.extended_pages = pages as u16;

        info!(
            "Allocated {} transform slots ({} diacritic, {} custom, {} extended pages)",
            table.entries.len(),
            table.diacritic_count,
            table.custom_count,
            table.extended_pages
        );
        Ok((table, unused))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn slot_of(&self, key: &str) -> Option<u16> {
        self.entries.iter().find(|e| e.key == key).map(|e| e.slot)
    }

    /// Slot that selects extended page `page` (1-based).
    pub fn extended_page_slot(&self, page: u16) -> Option<u16> {
        if page == 0 || page > self.extended_pages {
            return None;
        }
        Some(self.diacritic_count + self.custom_count + page)
    }

    /// Action for `slot`. Diacritic slots are a direct index; the rest are
    /// looked up the same way since slots are dense.
    pub fn action(&self, slot: u16) -> Option<&TransformAction> {
        let index = (slot as usize).checked_sub(1)?;
        self.entries.get(index).map(|e| &e.action)
    }

    /// True when `slot` falls in the leading run of diacritic shortcuts.
    pub fn is_diacritic_slot(&self, slot: u16) -> bool {
        slot >= 1 && slot <= self.diacritic_count
    }
}
