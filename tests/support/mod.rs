// tests/support/mod.rs

pub mod font_builder;
