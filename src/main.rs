// src/main.rs

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use log::info;

use cellfont::{compile, CompiledFont, Config, Decoder, FontSource, GlyphRenderer, Placement, CONFIG};

#[derive(Debug, Parser)]
#[clap(name = "cellfont", version, about = "Compile and inspect fixed-cell bitmap fonts")]
struct CliArgs {
    #[clap(subcommand)]
    command: CliCommand,
}

#[derive(Debug, Subcommand)]
enum CliCommand {
    /// Compile a font source into lookup tables.
    Compile(CompileArgs),
    /// Decode codepoints with compiled tables and print their bitmaps.
    Render(RenderArgs),
}

#[derive(Debug, Args)]
struct CompileArgs {
    /// Pre-parsed font source (JSON).
    source: PathBuf,
    /// Config file; defaults to $CELLFONT_CONFIG, then built-in defaults.
    #[clap(long)]
    config: Option<PathBuf>,
    /// Write the compiled tables as JSON.
    #[clap(long)]
    json: Option<PathBuf>,
    /// Write the compiled tables as a C header.
    #[clap(long)]
    header: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct RenderArgs {
    /// Compiled tables (JSON) as written by `compile --json`.
    compiled: PathBuf,
    /// Codepoints as U+XXXX, 0xXXXX or literal characters.
    #[clap(required = true)]
    codepoints: Vec<String>,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_micros()
        .init();

    match CliArgs::parse().command {
        CliCommand::Compile(args) => run_compile(args),
        CliCommand::Render(args) => run_render(args),
    }
}

fn run_compile(args: CompileArgs) -> anyhow::Result<()> {
    let config = match &args.config {
        Some(path) => Config::load(path)?,
        None => (*CONFIG).clone(),
    };
    let source = FontSource::load(&args.source)?;
    let (font, report) = compile(&source, &config)
        .with_context(|| format!("compiling {}", args.source.display()))?;
    report.log_summary();

    if let Some(path) = &args.json {
        std::fs::write(path, font.to_json()?).with_context(|| format!("writing {}", path.display()))?;
        info!("Wrote {}", path.display());
    }
    if let Some(path) = &args.header {
        std::fs::write(path, cellfont::emit::c_header(&font))
            .with_context(|| format!("writing {}", path.display()))?;
        info!("Wrote {}", path.display());
    }
    if args.json.is_none() && args.header.is_none() {
        info!("No output requested; pass --json or --header to write the tables");
    }
    Ok(())
}

fn run_render(args: RenderArgs) -> anyhow::Result<()> {
    let font = CompiledFont::load(&args.compiled)?;
    let mut renderer = GlyphRenderer::new(Decoder::new(font));
    for text in &args.codepoints {
        for codepoint in parse_codepoints(text)? {
            let rendered = renderer.render(codepoint);
            let note = match rendered.placement {
                Placement::NewCell => "",
                Placement::OverPrevious => " (over previous)",
                Placement::Replacement => " (replacement)",
            };
            println!("U+{:04X}{}", codepoint, note);
            println!("{}", rendered.bitmap);
        }
    }
    Ok(())
}

/// `U+XXXX` and `0xXXXX` name one codepoint; anything else is taken as
/// literal characters.
fn parse_codepoints(text: &str) -> anyhow::Result<Vec<u32>> {
    let hex = text
        .strip_prefix("U+")
        .or_else(|| text.strip_prefix("u+"))
        .or_else(|| text.strip_prefix("0x"))
        .or_else(|| text.strip_prefix("0X"));
    match hex {
        Some(digits) => {
            let value = u32::from_str_radix(digits, 16).with_context(|| format!("invalid codepoint {:?}", text))?;
            if value > 0x10FFFF {
                bail!("codepoint {:?} is out of range", text);
            }
            Ok(vec![value])
        }
        None => Ok(text.chars().map(|c| c as u32).collect()),
    }
}
