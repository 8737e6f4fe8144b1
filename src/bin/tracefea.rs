use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
    process::exit,
};

use clap::Parser;
use glyphtools::{
    kerndata::{KernData, KernMatch},
    layout::{load_rules, Lookup, Tracer},
    Font, GlyphToolsError,
};
use smol_str::SmolStr;

/// Trace which rules of a feature-file lookup match a glyph sequence
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to input fea file
    #[arg(value_name = "input-fea-file")]
    infile: PathBuf,

    /// Comma-separated glyph sequence to trace
    #[arg(value_name = "glyphname(s)")]
    glyphs: String,

    /// Font whose glyph names are used when parsing
    #[arg(short, long)]
    font: Option<PathBuf>,

    /// Name of lookup to trace
    #[arg(short, long, default_value = "mainkern")]
    lookup: String,

    /// Raw kern data file to look up the expected value in
    #[arg(short, long)]
    kern: Option<PathBuf>,

    /// Trace every ordered pair of the given glyphs
    #[arg(long)]
    allpairs: bool,

    #[command(flatten)]
    verbosity: clap_verbosity_flag::Verbosity,
}

fn report_kern_value(path: &Path, glyphs: &[SmolStr]) -> Result<(), GlyphToolsError> {
    let reader = BufReader::new(File::open(path)?);
    let matches = KernData::new()?.search(reader, glyphs)?;
    for found in &matches {
        println!("{}", found);
    }
    if !matches.iter().any(|m| matches!(m, KernMatch::Value { .. })) {
        println!("No matching kern value found in kerndata");
    }
    Ok(())
}

fn run(
    args: &Args,
    tracer: &Tracer,
    lookup: &Lookup,
    glyphs: &[SmolStr],
) -> Result<(), GlyphToolsError> {
    if let Some(kern) = &args.kern {
        report_kern_value(kern, glyphs)?;
    }
    if args.allpairs {
        for first in glyphs {
            for second in glyphs {
                let pair = [first.clone(), second.clone()];
                let reports = tracer.trace(lookup, &pair, 0)?;
                if !reports.is_empty() {
                    println!("\ntracing pair {},{}--------------------", first, second);
                    for report in reports {
                        println!("{}", report);
                    }
                }
            }
        }
    } else {
        for report in tracer.trace(lookup, glyphs, 0)? {
            println!("{}", report);
        }
    }
    Ok(())
}

fn main() {
    let args = Args::parse();
    env_logger::Builder::new()
        .filter_level(args.verbosity.into())
        .init();

    let font = match args.font.as_ref().map(Font::load).transpose() {
        Ok(font) => font,
        Err(e) => {
            log::error!("Cannot load font: {}", e);
            exit(1);
        }
    };
    let rules = match load_rules(&args.infile, font.as_ref()) {
        Ok(rules) => rules,
        Err(e) => {
            log::error!("Cannot read {}: {}", args.infile.display(), e);
            exit(1);
        }
    };
    let lookup = match rules.lookup(&args.lookup) {
        Ok(lookup) => lookup,
        Err(e) => {
            println!("{} in file \"{}\"", e, args.infile.display());
            exit(1);
        }
    };

    let glyphs: Vec<SmolStr> = args.glyphs.split(',').map(SmolStr::from).collect();
    let tracer = Tracer::new(&rules);
    if let Err(e) = run(&args, &tracer, lookup, &glyphs) {
        log::error!("{}", e);
        exit(1);
    }
}
