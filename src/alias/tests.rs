// src/alias/tests.rs

use super::*;
use crate::error::CompileError;
use test_log::test;

fn base(s: &str) -> BTreeSet<char> {
    s.chars().collect()
}

#[test]
fn test_canonical_is_lowest_member() {
    let map = AliasMap::resolve(&["AΑА", "oοо"], &base("Ao")).unwrap();
    assert_eq!(map.canonical('Α'), 'A'); // Greek capital alpha
    assert_eq!(map.canonical('А'), 'A'); // Cyrillic capital a
    assert_eq!(map.canonical('о'), 'o');
    assert_eq!(map.canonical('x'), 'x');
    assert_eq!(map.alias_count(), 4);
}

#[test]
fn test_canonical_is_idempotent() {
    let map = AliasMap::resolve(&["KΚК", "-‐‑"], &base("K-")).unwrap();
    for c in "KΚК-‐‑zé".chars() {
        let once = map.canonical(c);
        assert_eq!(map.canonical(once), once, "{:?}", c);
    }
}

#[test]
fn test_aliasing_two_base_glyphs_is_rejected() {
    let err = AliasMap::resolve(&["Il1"], &base("Il")).unwrap_err();
    assert!(matches!(
        err,
        CompileError::AliasedDistinctGlyphs { ref glyphs, .. } if glyphs == &vec!['I', 'l']
    ));
}

#[test]
fn test_codepoint_in_two_groups_is_rejected() {
    let err = AliasMap::resolve(&["AΑ", "ΑА"], &base("A")).unwrap_err();
    assert_eq!(
        err,
        CompileError::DuplicateAlias {
            codepoint: 'Α',
            first: "AΑ".to_string(),
            second: "ΑА".to_string(),
        }
    );
}

#[test]
fn test_singleton_and_whitespace_groups_ignored() {
    let map = AliasMap::resolve(&["x", "  ", "y z"], &base("")).unwrap();
    assert_eq!(map.canonical('z'), 'y');
    assert_eq!(map.classes().len(), 1);
    assert_eq!(map.class_of('z'), base("yz"));
    assert_eq!(map.class_of('q'), base("q"));
}
