use std::{fs::File, path::PathBuf, process::exit};

use clap::{Parser, ValueEnum};
use glyphtools::{
    filters::{FontFilter, ShakeComponents},
    Font,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "UPPER")]
enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Error => log::LevelFilter::Error,
        }
    }
}

/// Remove component-only glyphs that no other glyph uses
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input font file(s); glob patterns are expanded
    #[arg(required = true)]
    infonts: Vec<String>,

    /// Output folder
    #[arg(short, long, default_value = "shakenfonts/", conflicts_with = "outfont")]
    outdir: PathBuf,

    /// Output font file, when shaking a single font
    #[arg(long)]
    outfont: Option<PathBuf>,

    /// Regular expression recognising the names of component-only glyphs
    #[arg(short, long, default_value = "^_")]
    compregex: String,

    /// Don't print the glyph report
    #[arg(short, long)]
    quiet: bool,

    /// Logging level
    #[arg(short = 'L', long, value_enum, ignore_case = true, default_value_t = LogLevel::Warn)]
    loglevel: LogLevel,

    /// Log to file instead of stderr
    #[arg(long)]
    logfile: Option<PathBuf>,
}

fn init_logging(args: &Args) {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(args.loglevel.into());
    if let Some(logfile) = &args.logfile {
        match File::create(logfile) {
            Ok(file) => {
                builder.target(env_logger::Target::Pipe(Box::new(file)));
            }
            Err(e) => eprintln!("Cannot open log file {}: {}", logfile.display(), e),
        }
    }
    builder.init();
}

fn resolve_inputs(patterns: &[String]) -> Vec<PathBuf> {
    let mut inputs = vec![];
    for pattern in patterns {
        let matched: Vec<PathBuf> = match glob::glob(pattern) {
            Ok(paths) => paths
                .filter_map(|entry| match entry {
                    Ok(path) => Some(path),
                    Err(e) => {
                        log::warn!("Cannot read {}: {}", e.path().display(), e);
                        None
                    }
                })
                .collect(),
            Err(e) => {
                log::warn!("Invalid file pattern \"{}\": {}", pattern, e);
                vec![]
            }
        };
        if matched.is_empty() {
            log::warn!(
                "commandline parameter \"{}\" did not match any existing filenames",
                pattern
            );
        }
        inputs.extend(matched);
    }
    inputs
}

fn main() {
    let args = Args::parse();
    init_logging(&args);

    let shaker = match ShakeComponents::from_str(&args.compregex) {
        Ok(shaker) => shaker,
        Err(e) => {
            log::error!("{}", e);
            exit(1);
        }
    };

    let inputs = resolve_inputs(&args.infonts);
    if inputs.is_empty() {
        log::error!("No input fonts found");
        exit(1);
    }
    if args.outfont.is_some() && inputs.len() != 1 {
        log::error!(
            "--outfont needs exactly one input font, but {} were found",
            inputs.len()
        );
        exit(1);
    }
    if args.outfont.is_none() {
        if let Err(e) = std::fs::create_dir_all(&args.outdir) {
            log::error!("Cannot create {}: {}", args.outdir.display(), e);
            exit(1);
        }
    }

    for input in inputs {
        let output = match &args.outfont {
            Some(outfont) => outfont.clone(),
            None => match input.file_name() {
                Some(name) => args.outdir.join(name),
                None => {
                    log::warn!("{} has no file name; skipped", input.display());
                    continue;
                }
            },
        };
        let mut font = match Font::load(&input) {
            Ok(font) => font,
            Err(e) => {
                log::warn!(
                    "Couldn't open {} as a TTF font; parameter skipped: {}",
                    input.display(),
                    e
                );
                continue;
            }
        };
        println!("\nProcessing {} --> {}", input.display(), output.display());
        let report = match shaker.shake_and_apply(&mut font) {
            Ok(report) => report,
            Err(e) => {
                log::warn!("Cannot shake {}: {}", input.display(), e);
                continue;
            }
        };
        if let Err(e) = font.save(&output) {
            log::warn!("Cannot write {}: {}", output.display(), e);
            continue;
        }
        if !args.quiet {
            println!("{}", report);
        }
    }
}
