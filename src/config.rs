// src/config.rs

//! Configuration structures for the font compiler and runtime decoder.
//!
//! Every section derives `Serialize`/`Deserialize` with `#[serde(default)]`, so a
//! JSON config file only needs to name the settings it changes. The defaults
//! describe the 6x12 cell raster with 9-bit glyph indices that the tables are
//! laid out for.

use std::path::Path;

use anyhow::Context;
use log::{info, warn};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::bitpack::PackOptions;
use crate::error::CompileError;
use crate::glyph::MAX_CELL_HEIGHT;

/// Environment variable naming the JSON config file read by [`CONFIG`].
pub const CONFIG_ENV_VAR: &str = "CELLFONT_CONFIG";

/// Process-wide configuration, loaded once from `$CELLFONT_CONFIG` if set.
pub static CONFIG: Lazy<Config> = Lazy::new(|| match std::env::var(CONFIG_ENV_VAR) {
    Ok(path) => match Config::load(&path) {
        Ok(config) => {
            info!("Loaded config from {}", path);
            config
        }
        Err(e) => {
            warn!("Failed to load config from {}: {:#}. Using defaults.", path, e);
            Config::default()
        }
    },
    Err(_) => Config::default(),
});

// --- Top-Level Configuration Structure ---

/// Root configuration: cell geometry, code layout and the compile-time policy
/// lists (seeds, mapped and soft blocks).
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub cell: CellGeometry,
    pub codes: CodeLayout,
    pub atlas: AtlasConfig,
    pub grouping: GroupingConfig,
    pub blocks: BlockConfig,
    pub packing: PackingConfig,
}

impl Config {
    /// Reads and validates a JSON config file.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let config: Config = serde_json::from_str(&text)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects geometry and code layouts the decoder cannot represent.
    pub fn validate(&self) -> Result<(), CompileError> {
        let cell = &self.cell;
        if cell.width == 0 || cell.width > 8 {
            return Err(CompileError::InvalidConfig(format!(
                "cell width {} must be in 1..=8",
                cell.width
            )));
        }
        if cell.height < 4 || cell.height > MAX_CELL_HEIGHT {
            return Err(CompileError::InvalidConfig(format!(
                "cell height {} must be in 4..={}",
                cell.height, MAX_CELL_HEIGHT
            )));
        }
        if !(cell.baseline < cell.midline
            && cell.midline < cell.topline
            && cell.topline < cell.height)
        {
            return Err(CompileError::InvalidConfig(format!(
                "expected baseline < midline < topline < height, got {} {} {} {}",
                cell.baseline, cell.midline, cell.topline, cell.height
            )));
        }
        if !(2..=10).contains(&self.codes.char_bits) {
            return Err(CompileError::InvalidConfig(format!(
                "char_bits {} must be in 2..=10",
                self.codes.char_bits
            )));
        }
        Ok(())
    }
}

// --- Cell Geometry ---

/// Fixed character-cell raster. Rows are numbered from the bottom of the
/// cell; `baseline`, `midline` and `topline` are row numbers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CellGeometry {
    pub width: usize,
    pub height: usize,
    /// Row on which most letters rest.
    pub baseline: usize,
    /// Row splitting x-height marks from the upper half.
    pub midline: usize,
    /// Cap height.
    pub topline: usize,
}

impl Default for CellGeometry {
    fn default() -> Self {
        CellGeometry {
            width: 6,
            height: 12,
            baseline: 2,
            midline: 5,
            topline: 8,
        }
    }
}

impl CellGeometry {
    /// Mask covering every column of a row.
    pub fn row_mask(&self) -> u8 {
        ((1u16 << self.width) - 1) as u8
    }
}

// --- Code Layout ---

/// Split of the 16-bit codepoint cell into a glyph index and a transform slot.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CodeLayout {
    /// Low bits of the cell holding the glyph index.
    pub char_bits: u32,
}

impl Default for CodeLayout {
    fn default() -> Self {
        CodeLayout { char_bits: 9 }
    }
}

impl CodeLayout {
    pub fn with_char_bits(char_bits: u32) -> Self {
        CodeLayout { char_bits }
    }

    pub fn transform_bits(&self) -> u32 {
        16 - self.char_bits
    }

    /// Number of glyph indices addressable without an extended page.
    pub fn glyph_modulus(&self) -> u32 {
        1 << self.char_bits
    }

    pub fn glyph_mask(&self) -> u16 {
        (self.glyph_modulus() - 1) as u16
    }

    /// Slots available to transforms, including slot 0 which means "none".
    pub fn slot_capacity(&self) -> u32 {
        1 << self.transform_bits()
    }

    /// Glyph indices available to real glyphs (0 and 1 are reserved).
    pub fn glyph_capacity(&self) -> usize {
        self.glyph_modulus() as usize - 2
    }

    /// Numeric transform code stored in the cell for `slot`.
    pub fn code_for_slot(&self, slot: u16) -> u16 {
        ((slot as u32) << self.char_bits) as u16
    }
}

// --- Atlas ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AtlasConfig {
    /// Glyph slots per atlas row.
    pub columns: usize,
    /// Glyph drawn for unsupported codepoints; must be present in the atlas.
    pub replacement: char,
    /// Decomposition base meaning "apply to whatever was drawn last".
    pub combining_sentinel: char,
}

impl Default for AtlasConfig {
    fn default() -> Self {
        AtlasConfig {
            columns: 32,
            replacement: '\u{FFFD}',
            combining_sentinel: '\u{25CC}',
        }
    }
}

// --- Grouping ---

/// One hand-picked glyph whose ink box defines a packing group.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SeedSpec {
    pub glyph: char,
    /// Only glyphs with at least one blank column on the left may join.
    #[serde(default)]
    pub require_left_margin: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GroupingConfig {
    /// Seeds in priority order. Seeds missing from the atlas are skipped.
    pub seeds: Vec<SeedSpec>,
}

impl Default for GroupingConfig {
    fn default() -> Self {
        let seeds = "⁵₃×agAQfj½"
            .chars()
            .map(|glyph| SeedSpec {
                glyph,
                require_left_margin: true,
            })
            .chain("ェぅԱբխॾラ".chars().map(|glyph| SeedSpec {
                glyph,
                require_left_margin: false,
            }))
            .collect();
        GroupingConfig { seeds }
    }
}

// --- Blocks ---

/// Block policy. Names are block code names (lowercase, no spaces or dashes);
/// see [`crate::blocks::codename`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BlockConfig {
    /// Blocks encoded as glyph + transform tables.
    pub mapped: Vec<String>,
    /// Blocks rendered by external handlers.
    pub soft: Vec<String>,
    /// Mapped blocks that must end up with at least one mapped codepoint.
    pub required: Vec<String>,
    /// Glyphs kept in the tables even when no mapped codepoint uses them.
    pub required_glyphs: Vec<char>,
}

impl Default for BlockConfig {
    fn default() -> Self {
        let mapped = [
            "basiclatin",
            "latin1supplement",
            "latinextendeda",
            "latinextendedb",
            "ipaextensions",
            "spacingmodifierletters",
            "greekandcoptic",
            "cyrillic",
            "cyrillicsupplement",
            "armenian",
            "georgian",
            "latinextendedadditional",
            "greekextended",
            "generalpunctuation",
            "superscriptsandsubscripts",
            "currencysymbols",
            "letterlikesymbols",
            "numberforms",
            "arrows",
            "mathematicaloperators",
            "miscellaneoustechnical",
            "miscellaneoussymbols",
            "dingbats",
        ];
        let soft = [
            "blockelements",
            "boxdrawing",
            "braillepatterns",
            "combiningdiacriticalmarks",
            "symbolsforlegacycomputing",
        ];
        BlockConfig {
            mapped: mapped.iter().map(|s| s.to_string()).collect(),
            soft: soft.iter().map(|s| s.to_string()).collect(),
            required: vec!["basiclatin".to_string()],
            required_glyphs: Vec::new(),
        }
    }
}

// --- Packing ---

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PackingConfig {
    /// Options used for full-cell packed data such as the replacement glyph.
    pub replacement: PackOptions,
}

impl Default for PackingConfig {
    fn default() -> Self {
        PackingConfig {
            replacement: PackOptions::default(),
        }
    }
}
