use std::{
    io::{self, Write},
    path::{Path, PathBuf},
    process,
};

use anyhow::Context;
use clap::Parser;
use contents_top::{rank_file, report, Attribution, DEFAULT_TOP};

/// Ranks packages of a Contents file that is already on disk (plain or .gz).
#[derive(Parser, Debug)]
#[clap(version)]
struct Args {
    /// Path to a Contents-<arch> or Contents-<arch>.gz file
    path: PathBuf,

    /// Label used in the banner, defaults to the file name
    #[clap(long)]
    arch: Option<String>,

    #[clap(long, default_value_t = DEFAULT_TOP)]
    top: usize,

    #[clap(long, default_value = "first-listed")]
    attribution: Attribution,

    #[clap(long)]
    json: bool,
}

fn main() {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();

    if let Err(err) = run(args) {
        eprintln!("error: {:?}", err);
        process::exit(1);
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    let arch = args.arch.clone().unwrap_or_else(|| arch_label(&args.path));

    let ranking = rank_file(&args.path, args.attribution, args.top)
        .with_context(|| format!("could not rank {}", args.path.display()))?;

    let stdout = io::stdout();
    let mut out = stdout.lock();

    if args.json {
        serde_json::to_writer_pretty(&mut out, &report::to_json(&arch, &ranking))?;
        writeln!(out)?;
    } else {
        report::write_header(&mut out, args.top, &arch)?;
        report::write_ranking(&mut out, &ranking)?;
    }

    Ok(())
}

fn arch_label(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    let name = name.strip_suffix(".gz").unwrap_or(&name);
    name.strip_prefix("Contents-").unwrap_or(name).to_string()
}
