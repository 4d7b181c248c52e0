// src/alias/mod.rs

//! Alias resolution: codepoints declared graphically identical share one
//! canonical representative, and therefore one glyph.

use std::collections::{BTreeMap, BTreeSet};

use log::debug;

use crate::error::CompileError;

/// Map from codepoint to the canonical member of its alias class.
///
/// Codepoints that are not in any alias class map to themselves.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasMap {
    canonical: BTreeMap<char, char>,
    classes: Vec<BTreeSet<char>>,
}

impl AliasMap {
    /// Builds the map from raw alias groups (each string is one group).
    ///
    /// Fails if a group contains more than one distinct base glyph, or if a
    /// codepoint appears in two groups. The canonical member of each class is
    /// its lowest codepoint.
    pub fn resolve<S: AsRef<str>>(
        groups: &[S],
        base_glyphs: &BTreeSet<char>,
    ) -> Result<AliasMap, CompileError> {
        let mut owner: BTreeMap<char, usize> = BTreeMap::new();
        let mut map = AliasMap::default();

        for (index, group) in groups.iter().enumerate() {
            let group = group.as_ref();
            let members: BTreeSet<char> = group.chars().filter(|c| !c.is_whitespace()).collect();
            if members.len() < 2 {
                continue;
            }

            let distinct: Vec<char> = members.intersection(base_glyphs).copied().collect();
            if distinct.len() > 1 {
                return Err(CompileError::AliasedDistinctGlyphs {
                    group: group.to_string(),
                    glyphs: distinct,
                });
            }

            for &c in &members {
                if let Some(&previous) = owner.get(&c) {
                    return Err(CompileError::DuplicateAlias {
                        codepoint: c,
                        first: groups[previous].as_ref().to_string(),
                        second: group.to_string(),
                    });
                }
                owner.insert(c, index);
            }

            // Non-empty: checked above.
            let Some(&rep) = members.iter().next() else {
                continue;
            };
            for &c in &members {
                map.canonical.insert(c, rep);
            }
            debug!("Alias class {:?} -> {:?}", group, rep);
            map.classes.push(members);
        }
        Ok(map)
    }

    /// Canonical representative of `c`. Idempotent.
    pub fn canonical(&self, c: char) -> char {
        self.canonical.get(&c).copied().unwrap_or(c)
    }

    /// Every member of `c`'s class, including `c` itself.
    pub fn class_of(&self, c: char) -> BTreeSet<char> {
        let rep = self.canonical(c);
        self.classes
            .iter()
            .find(|class| class.contains(&rep))
            .cloned()
            .unwrap_or_else(|| BTreeSet::from([c]))
    }

    pub fn classes(&self) -> &[BTreeSet<char>] {
        &self.classes
    }

    /// Number of codepoints that map to a different canonical codepoint.
    pub fn alias_count(&self) -> usize {
        self.canonical.iter().filter(|(k, v)| k != v).count()
    }
}

#[cfg(test)]
mod tests;
