// src/lib.rs

//! Bitmap font compiler and runtime decoder for fixed character cells.
//!
//! The compiler turns a pre-parsed font description ([`source::FontSource`])
//! into compact lookup tables ([`compiler::CompiledFont`]); the decoder turns
//! a codepoint back into a cell bitmap using only those tables.

pub mod alias;
pub mod bitpack;
pub mod blocks;
pub mod compiler;
pub mod config;
pub mod decoder;
pub mod diacritic;
pub mod emit;
pub mod error;
pub mod glyph;
pub mod grouping;
pub mod source;
pub mod transform;

pub use compiler::{compile, CompileReport, CompiledFont};
pub use config::{Config, CONFIG};
pub use decoder::{Decoder, GlyphRenderer, Lookup, Placement};
pub use error::CompileError;
pub use source::FontSource;
