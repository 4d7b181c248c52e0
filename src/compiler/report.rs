// src/compiler/report.rs

//! Side-channel diagnostics produced next to the compiled tables.

use std::collections::BTreeMap;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::blocks::{BlockKind, BlockSummary};

/// Emitted sizes, in bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSizes {
    pub blocks: usize,
    pub group_metadata: usize,
    pub glyph_bitmaps: usize,
    pub diacritics: usize,
    pub replacement: usize,
}

impl TableSizes {
    pub fn total(&self) -> usize {
        self.blocks + self.group_metadata + self.glyph_bitmaps + self.diacritics + self.replacement
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileReport {
    /// Atlas glyphs no mapped codepoint needs; dropped from the tables.
    pub unused_glyphs: Vec<char>,
    /// Transforms defined but never used by a mapped codepoint.
    pub unused_transforms: Vec<String>,
    /// Decompositions whose transform key is unknown: (composed, key).
    pub dropped_decompositions: Vec<(char, String)>,
    /// Decompositions whose base has no glyph: (composed, base).
    pub missing_bases: Vec<(char, char)>,
    /// Codepoints inside mapped blocks that resolve to nothing, per block.
    pub unmapped: BTreeMap<String, Vec<char>>,
    /// Soft blocks with no handler in the default registry.
    pub soft_without_handler: Vec<String>,
    pub blocks: Vec<BlockSummary>,
    pub glyphs: usize,
    pub transform_glyphs: usize,
    pub groups: usize,
    pub transforms: usize,
    pub extended_pages: usize,
    pub sizes: TableSizes,
}

impl CompileReport {
    /// Unmapped slots stored inside dense ranges, over all blocks.
    pub fn dense_voids(&self) -> usize {
        self.blocks.iter().map(|b| b.voids).sum()
    }

    pub fn count(&self, kind: BlockKind) -> usize {
        self.blocks.iter().filter(|b| b.kind == kind).count()
    }

    /// Writes the report through the `log` facade.
    pub fn log_summary(&self) {
        info!(
            "{} glyphs ({} used with transforms) in {} groups, {} transforms, {} extended pages",
            self.glyphs, self.transform_glyphs, self.groups, self.transforms, self.extended_pages
        );
        info!(
            "Blocks: {} dense, {} sparse, {} soft, {} missing; {} dense voids",
            self.count(BlockKind::Dense),
            self.count(BlockKind::Sparse),
            self.count(BlockKind::Soft),
            self.count(BlockKind::Missing),
            self.dense_voids()
        );
        info!(
            "Table sizes: blocks {} B, groups {} B, bitmaps {} B, diacritics {} B, replacement {} B, total {} B",
            self.sizes.blocks,
            self.sizes.group_metadata,
            self.sizes.glyph_bitmaps,
            self.sizes.diacritics,
            self.sizes.replacement,
            self.sizes.total()
        );
        if !self.unused_glyphs.is_empty() {
            let glyphs: String = self.unused_glyphs.iter().collect();
            warn!("{} unused glyphs dropped: {}", self.unused_glyphs.len(), glyphs);
        }
        if !self.unused_transforms.is_empty() {
            warn!("Unused transforms: {}", self.unused_transforms.join(", "));
        }
        for (composed, key) in &self.dropped_decompositions {
            warn!("Dropped {:?}: unknown transform {}", composed, key);
        }
        for (composed, base) in &self.missing_bases {
            warn!("Dropped {:?}: base {:?} has no glyph", composed, base);
        }
        for (block, missing) in &self.unmapped {
            let sample: String = missing.iter().take(32).collect();
            info!("{}: {} unmapped, e.g. {}", block, missing.len(), sample);
        }
    }
}
