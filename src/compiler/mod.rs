// src/compiler/mod.rs

//! The font compiler.
//!
//! `compile` runs the build as a fixed sequence of phases over immutable
//! intermediate tables:
//!
//! 1. parse the atlas and resolve alias groups against it,
//! 2. canonicalise glyphs and decompositions,
//! 3. collect the mapped codepoints of every mapped block,
//! 4. allocate transform slots (including extended code pages),
//! 5. group and pack the used glyphs,
//! 6. compile the combining marks,
//! 7. encode each mapped codepoint and lay out the block tables.
//!
//! Indices are assigned once and never renumbered. Diagnostics that do not
//! abort the build are collected in a [`CompileReport`].

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use anyhow::Context;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::alias::AliasMap;
use crate::bitpack::PackedCell;
use crate::blocks::{BlockPlan, BlockTables};
use crate::config::{CellGeometry, CodeLayout, Config, SeedSpec};
use crate::decoder::SoftRegistry;
use crate::diacritic::DiacriticTable;
use crate::error::CompileError;
use crate::glyph::{CharBitmap, CodepointEntry, COMBINING_SENTINEL};
use crate::grouping::{plan_groups, GlyphInput, GlyphTable, GroupPlan};
use crate::source::{Decomposition, FontSource};
use crate::transform::{check_ops, TransformTable};

pub mod report;

pub use report::{CompileReport, TableSizes};

/// Bytes per emitted glyph group record.
pub const GROUP_RECORD_BYTES: usize = 12;

/// The complete compiled table set, as consumed by the decoder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledFont {
    pub cell: CellGeometry,
    pub codes: CodeLayout,
    pub blocks: BlockTables,
    pub glyphs: GlyphTable,
    pub diacritics: DiacriticTable,
    pub transforms: TransformTable,
    pub replacement: PackedCell,
}

impl CompiledFont {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading compiled font {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing compiled font {}", path.display()))
    }

    pub fn to_json(&self) -> anyhow::Result<String> {
        serde_json::to_string_pretty(self).context("serialising compiled font")
    }

    pub fn sizes(&self) -> TableSizes {
        TableSizes {
            blocks: self.blocks.byte_size(),
            group_metadata: self.glyphs.groups.len() * GROUP_RECORD_BYTES,
            glyph_bitmaps: self.glyphs.data.len(),
            diacritics: self.diacritics.bitmaps.len() + self.diacritics.descriptors.len() * 2,
            replacement: self.replacement.data.len(),
        }
    }
}

/// What a canonical codepoint is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source<'a> {
    Glyph(char),
    /// Base glyph (or the combining sentinel) plus a transform key.
    Composed { base: char, transform: &'a str },
}

/// Compiles a font source into the runtime table set.
pub fn compile(source: &FontSource, config: &Config) -> Result<(CompiledFont, CompileReport), CompileError> {
    config.validate()?;
    let cell = config.cell;
    let layout = config.codes;
    let sentinel = config.atlas.combining_sentinel;
    let mut report = CompileReport::default();

    // --- Glyphs and aliases ---
    let atlas = source.atlas_glyphs(config)?;
    let raw: BTreeSet<char> = atlas.iter().map(|g| g.codepoint).collect();
    let aliases = AliasMap::resolve(&source.aliases, &raw)?;
    info!(
        "Atlas: {} glyphs, {} alias groups covering {} codepoints",
        atlas.len(),
        aliases.classes().len(),
        aliases.alias_count()
    );

    let mut glyphs: BTreeMap<char, CharBitmap> = BTreeMap::new();
    for glyph in &atlas {
        let canonical = aliases.canonical(glyph.codepoint);
        if glyphs.insert(canonical, glyph.bitmap).is_some() {
            return Err(CompileError::DuplicateGlyph(glyph.codepoint, canonical));
        }
    }

    let replacement_char = aliases.canonical(config.atlas.replacement);
    let replacement_bitmap = glyphs
        .remove(&replacement_char)
        .ok_or(CompileError::MissingReplacementGlyph(config.atlas.replacement))?;
    let replacement = PackedCell::pack(&replacement_bitmap, config.packing.replacement);

    // --- Decompositions ---
    check_ops(&source.transforms, &cell)?;
    let known: BTreeSet<&str> = source.transforms.iter().map(|t| t.key.as_str()).collect();
    let decompositions = canonical_decompositions(
        &source.decompositions,
        &aliases,
        &glyphs,
        &known,
        sentinel,
        &mut report,
    )?;

    // --- Mapped codepoints ---
    let soft: BTreeSet<&str> = config.blocks.soft.iter().map(String::as_str).collect();
    let mapped: BTreeSet<&str> = config.blocks.mapped.iter().map(String::as_str).collect();
    let present: BTreeSet<String> = source.blocks.iter().map(|b| b.codename()).collect();
    for name in mapped.iter().chain(soft.iter()) {
        if !present.contains(*name) {
            warn!("Configured block {} is not in the block list", name);
        }
    }

    let mut block_sources: Vec<(usize, BTreeMap<u32, Source>)> = Vec::new();
    let mut soft_blocks: Vec<usize> = Vec::new();
    let handlers = SoftRegistry::default();
    for (i, block) in source.blocks.iter().enumerate() {
        let name = block.codename();
        let is_soft = soft.contains(name.as_str());
        if is_soft {
            if mapped.contains(name.as_str()) {
                warn!("Block {} is listed as both soft and mapped; treating it as soft", block.name);
            }
            if !handlers.contains(&name) {
                warn!("Soft block {} has no bundled handler; it will draw as the replacement glyph", block.name);
                report.soft_without_handler.push(block.name.clone());
            }
            soft_blocks.push(i);
            continue;
        }
        if !mapped.contains(name.as_str()) {
            continue;
        }

        let mut sources = BTreeMap::new();
        let mut unmapped = Vec::new();
        for cp in block.start..=block.end {
            let Some(c) = char::from_u32(cp) else {
                continue;
            };
            let canonical = aliases.canonical(c);
            let resolved = if canonical == replacement_char {
                None
            } else if glyphs.contains_key(&canonical) {
                Some(Source::Glyph(canonical))
            } else {
                decompositions.get(&canonical).map(|d| Source::Composed {
                    base: d.base,
                    transform: d.transform.as_str(),
                })
            };
            match resolved {
                Some(s) => {
                    sources.insert(cp - block.start, s);
                }
                None => unmapped.push(c),
            }
        }
        debug!("Block {}: {} mapped, {} unmapped", block.name, sources.len(), unmapped.len());
        if !unmapped.is_empty() {
            report.unmapped.insert(block.name.clone(), unmapped);
        }
        block_sources.push((i, sources));
    }

    // --- Used glyphs and transforms ---
    let mut used_glyphs: BTreeSet<char> = BTreeSet::new();
    let mut with_transforms: BTreeSet<char> = BTreeSet::new();
    let mut used_transforms: BTreeSet<String> = BTreeSet::new();
    for (_, sources) in &block_sources {
        for s in sources.values() {
            match *s {
                Source::Glyph(c) => {
                    used_glyphs.insert(c);
                }
                Source::Composed { base, transform } => {
                    used_transforms.insert(transform.to_string());
                    if base != sentinel {
                        used_glyphs.insert(base);
                        with_transforms.insert(base);
                    }
                }
            }
        }
    }
    for &required in &config.blocks.required_glyphs {
        let canonical = aliases.canonical(required);
        if !glyphs.contains_key(&canonical) {
            return Err(CompileError::MissingRequiredGlyph(required));
        }
        used_glyphs.insert(canonical);
    }
    report.unused_glyphs = glyphs
        .keys()
        .copied()
        .filter(|c| !used_glyphs.contains(c))
        .collect();

    let inputs: Vec<GlyphInput> = glyphs
        .iter()
        .filter(|(c, _)| used_glyphs.contains(c))
        .map(|(&codepoint, &bitmap)| GlyphInput { codepoint, bitmap })
        .collect();

    let (transforms, unused_transforms) =
        TransformTable::allocate(&source.transforms, &used_transforms, inputs.len(), &layout)?;
    report.unused_transforms = unused_transforms;

    // --- Groups ---
    let seeds: Vec<SeedSpec> = config
        .grouping
        .seeds
        .iter()
        .map(|s| SeedSpec {
            glyph: aliases.canonical(s.glyph),
            require_left_margin: s.require_left_margin,
        })
        .collect();
    let plan = plan_groups(&inputs, &with_transforms, &seeds, &cell, &layout)?;

    // --- Marks ---
    let diacritics = DiacriticTable::compile(&source.diacritics, &cell)?;
    for def in &source.transforms {
        if let crate::transform::TransformKind::Diacritic { mark } = def.kind {
            if used_transforms.contains(&def.key) && diacritics.info(mark).is_none() {
                warn!("Transform {} stamps undefined mark {:#04X}", def.key, mark);
            }
        }
    }

    // --- Codes and block tables ---
    let mut plans: Vec<BlockPlan> = Vec::with_capacity(block_sources.len() + soft_blocks.len());
    for (i, sources) in &block_sources {
        let mut entries = BTreeMap::new();
        for (&offset, s) in sources {
            entries.insert(offset, encode(*s, &plan, &transforms, &layout, sentinel)?);
        }
        plans.push(BlockPlan {
            info: source.blocks[*i].clone(),
            soft: false,
            entries,
        });
    }
    for &i in &soft_blocks {
        plans.push(BlockPlan {
            info: source.blocks[i].clone(),
            soft: true,
            entries: BTreeMap::new(),
        });
    }
    let (blocks, summaries) = BlockTables::build(&plans)?;

    for required in &config.blocks.required {
        let filled = summaries
            .iter()
            .any(|s| crate::blocks::codename(&s.name) == *required && s.mapped > 0);
        if !filled {
            return Err(CompileError::EmptyRequiredBlock(required.clone()));
        }
    }

    let font = CompiledFont {
        cell,
        codes: layout,
        blocks,
        glyphs: plan.table,
        diacritics,
        transforms,
        replacement,
    };
    report.blocks = summaries;
    report.glyphs = inputs.len();
    report.transform_glyphs = plan.transform_glyphs;
    report.groups = font.glyphs.groups.len();
    report.transforms = font.transforms.len();
    report.extended_pages = font.transforms.extended_pages as usize;
    report.sizes = font.sizes();
    info!(
        "Compiled {} glyphs into {} bytes of tables",
        report.glyphs,
        report.sizes.total()
    );
    Ok((font, report))
}

/// Canonicalises every decomposition and keys it by its canonical composed
/// codepoint. Unknown transforms and missing bases are reported and dropped.
fn canonical_decompositions(
    decompositions: &[Decomposition],
    aliases: &AliasMap,
    glyphs: &BTreeMap<char, CharBitmap>,
    known: &BTreeSet<&str>,
    sentinel: char,
    report: &mut CompileReport,
) -> Result<BTreeMap<char, Decomposition>, CompileError> {
    let mut out: BTreeMap<char, Decomposition> = BTreeMap::new();
    for d in decompositions {
        if !known.contains(d.transform.as_str()) {
            report.dropped_decompositions.push((d.composed, d.transform.clone()));
            continue;
        }
        let composed = aliases.canonical(d.composed);
        if glyphs.contains_key(&composed) {
            return Err(CompileError::ConflictingDefinition(d.composed));
        }
        let base = if d.base == sentinel {
            sentinel
        } else {
            aliases.canonical(d.base)
        };
        if base != sentinel && !glyphs.contains_key(&base) {
            report.missing_bases.push((d.composed, d.base));
            continue;
        }
        if let Some(first) = out.get(&composed) {
            warn!(
                "{:?} decomposed twice ({:?}+{} and {:?}+{}); keeping the first",
                d.composed, first.base, first.transform, base, d.transform
            );
            continue;
        }
        out.insert(
            composed,
            Decomposition {
                composed,
                base,
                transform: d.transform.clone(),
            },
        );
    }
    Ok(out)
}

/// Builds the 16-bit cell for one mapped codepoint.
fn encode(
    source: Source,
    plan: &GroupPlan,
    transforms: &TransformTable,
    layout: &CodeLayout,
    sentinel: char,
) -> Result<CodepointEntry, CompileError> {
    let overflow = |value: usize| CompileError::TableOverflow {
        table: "codepoint_map",
        bits: 16,
        value,
    };
    match source {
        Source::Glyph(c) => {
            let index = *plan.indices.get(&c).ok_or(overflow(0))?;
            let page = (index as u32 >> layout.char_bits) as u16;
            if page == 0 {
                return Ok(CodepointEntry::new(index, 0, layout));
            }
            let slot = transforms
                .extended_page_slot(page)
                .ok_or(overflow(index as usize))?;
            Ok(CodepointEntry::new(index, slot, layout))
        }
        Source::Composed { base, transform } => {
            let index = if base == sentinel {
                COMBINING_SENTINEL
            } else {
                *plan.indices.get(&base).ok_or(overflow(0))?
            };
            let slot = transforms
                .slot_of(transform)
                .ok_or_else(|| CompileError::InvalidConfig(format!("transform {} has no slot", transform)))?;
            Ok(CodepointEntry::new(index, slot, layout))
        }
    }
}
