// tests/support/font_builder.rs

//! Builds small font sources in code for the integration tests.

use cellfont::blocks::BlockInfo;
use cellfont::config::Config;
use cellfont::diacritic::DiacriticSource;
use cellfont::source::{Decomposition, FontSource};
use cellfont::transform::{TransformDef, TransformKind};

pub const REPLACEMENT: char = '\u{FFFD}';
const COLUMNS: usize = 16;

/// Top-down text rows for a 6x12 cell with ink on rows `low..=high`
/// (bottom-up), each row holding `bits`.
pub fn rows(bits: u8, low: usize, high: usize) -> Vec<String> {
    (0..12)
        .rev()
        .map(|r| {
            (0..6)
                .map(|c| if (low..=high).contains(&r) && bits >> c & 1 == 1 { '#' } else { '.' })
                .collect()
        })
        .collect()
}

/// A plausible shape for a Latin letter.
pub fn letter_rows(c: char) -> Vec<String> {
    let bits = (((c as u32 * 5) % 15 + 1) as u8) << 1;
    match c {
        ' ' => rows(0, 0, 0),
        REPLACEMENT => rows(0b111111, 0, 11),
        'g' | 'j' | 'p' | 'q' | 'y' => rows(bits, 0, 5),
        c if c.is_ascii_lowercase() => rows(bits, 2, 5),
        _ => rows(bits, 2, 8),
    }
}

pub struct FontBuilder {
    glyphs: Vec<(char, Vec<String>)>,
    source: FontSource,
    config: Config,
}

impl FontBuilder {
    /// Latin letters and digits in Basic Latin, Latin-1 and the combining
    /// marks block soft, plus the replacement glyph.
    pub fn latin() -> Self {
        let mut config = Config::default();
        config.atlas.columns = COLUMNS;
        config.blocks.mapped = vec!["basiclatin".into(), "latin1supplement".into()];
        config.blocks.soft = vec!["combiningdiacriticalmarks".into(), "braillepatterns".into()];
        let mut builder = FontBuilder {
            glyphs: Vec::new(),
            source: FontSource::default(),
            config,
        };
        builder
            .block("Basic Latin", 0x0000, 0x007F)
            .block("Latin-1 Supplement", 0x0080, 0x00FF)
            .block("Combining Diacritical Marks", 0x0300, 0x036F)
            .block("Braille Patterns", 0x2800, 0x28FF);
        for c in " 0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz".chars() {
            builder.glyph(c, letter_rows(c));
        }
        builder.glyph(REPLACEMENT, letter_rows(REPLACEMENT));
        builder
            .mark(0x00, "COMBINING GRAVE ACCENT", &["..#...", "...#.."])
            .mark(0x01, "COMBINING ACUTE ACCENT", &["...#..", "..#..."])
            .mark(0x08, "COMBINING DIAERESIS", &[".#.#.."])
            .mark(0x27, "COMBINING CEDILLA", &["..#...", ".##..."])
            .diacritic("GRAVE", 0x00)
            .diacritic("ACUTE", 0x01)
            .diacritic("DIAERESIS", 0x08)
            .diacritic("CEDILLA", 0x27)
            .decompose('\u{00C1}', 'A', "ACUTE")
            .decompose('\u{00E1}', 'a', "ACUTE")
            .decompose('\u{00E0}', 'a', "GRAVE")
            .decompose('\u{00E4}', 'a', "DIAERESIS")
            .decompose('\u{00C7}', 'C', "CEDILLA")
            .decompose('\u{00E7}', 'c', "CEDILLA");
        builder
    }

    pub fn block(&mut self, name: &str, start: u32, end: u32) -> &mut Self {
        self.source.blocks.push(BlockInfo {
            name: name.to_string(),
            start,
            end,
            assigned: 0,
        });
        self
    }

    pub fn glyph(&mut self, c: char, rows: Vec<String>) -> &mut Self {
        self.glyphs.push((c, rows));
        self
    }

    pub fn alias(&mut self, group: &str) -> &mut Self {
        self.source.aliases.push(group.to_string());
        self
    }

    pub fn mark(&mut self, offset: u8, name: &str, rows: &[&str]) -> &mut Self {
        self.source.diacritics.push(DiacriticSource {
            offset,
            name: name.to_string(),
            rows: rows.iter().map(|r| r.to_string()).collect(),
            padding: 1,
            location: None,
            alias_of: None,
        });
        self
    }

    pub fn diacritic(&mut self, key: &str, mark: u8) -> &mut Self {
        self.transform(key, TransformKind::Diacritic { mark })
    }

    pub fn transform(&mut self, key: &str, kind: TransformKind) -> &mut Self {
        self.source.transforms.push(TransformDef {
            key: key.to_string(),
            name: key.to_lowercase(),
            kind,
        });
        self
    }

    pub fn decompose(&mut self, composed: char, base: char, transform: &str) -> &mut Self {
        self.source.decompositions.push(Decomposition {
            composed,
            base,
            transform: transform.to_string(),
        });
        self
    }

    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    pub fn build(&self) -> (FontSource, Config) {
        let mut source = self.source.clone();
        let chars: Vec<char> = self.glyphs.iter().map(|(c, _)| *c).collect();
        source.atlas = chars.chunks(COLUMNS).map(|row| row.iter().collect()).collect();
        source.bitmaps = self.glyphs.iter().map(|(_, rows)| rows.clone()).collect();
        (source, self.config.clone())
    }
}
