use std::{
    io::{self, Write},
    path::PathBuf,
    process,
    time::Duration,
};

use anyhow::Context;
use clap::Parser;
use contents_top::{
    fetch::{self, DEFAULT_MIRROR},
    report, tally, Attribution, Fetcher, Mirror, DEFAULT_TOP,
};
use log::debug;

/// Downloads a Debian Contents index and lists the packages owning the most files.
#[derive(Parser, Debug)]
#[clap(version)]
struct Args {
    /// Architecture to inspect, e.g. amd64 or arm64
    arch: String,

    /// Mirror base URL
    #[clap(long, env = "CONTENTS_MIRROR", default_value = DEFAULT_MIRROR)]
    mirror: String,

    /// Distribution suite
    #[clap(long, env = "CONTENTS_SUITE", default_value = "stable")]
    suite: String,

    /// Archive component
    #[clap(long, env = "CONTENTS_COMPONENT", default_value = "main")]
    component: String,

    /// Directory the Contents file is written to
    #[clap(long, env = "CONTENTS_OUTPUT_DIR", default_value = ".")]
    output_dir: PathBuf,

    /// Number of packages to list
    #[clap(long, default_value_t = DEFAULT_TOP)]
    top: usize,

    /// How a line is credited to its packages: first-listed or each
    #[clap(long, default_value = "first-listed")]
    attribution: Attribution,

    /// Request timeout in seconds
    #[clap(long)]
    timeout: Option<u64>,

    /// Print the ranking as JSON
    #[clap(long)]
    json: bool,

    /// Hide the download progress bar
    #[clap(long, short)]
    quiet: bool,
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();

    if let Err(err) = run(args).await {
        eprintln!("error: {:?}", err);
        process::exit(1);
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    debug!("{:?}", args);

    let client = fetch::build_client(args.timeout.map(Duration::from_secs))?;
    let mirror = Mirror {
        base: args.mirror,
        suite: args.suite,
        component: args.component,
    };

    let contents = Fetcher::new(client, mirror, &args.output_dir)
        .with_progress(!args.quiet)
        .fetch(&args.arch)
        .await
        .with_context(|| format!("could not fetch the Contents index for {}", args.arch))?;

    let stdout = io::stdout();
    let mut out = stdout.lock();

    if args.json {
        let ranking = tally::tally_file(&contents, args.attribution)?.top(args.top)?;
        serde_json::to_writer_pretty(&mut out, &report::to_json(&args.arch, &ranking))?;
        writeln!(out)?;
    } else {
        report::write_header(&mut out, args.top, &args.arch)?;
        out.flush()?;
        let ranking = tally::tally_file(&contents, args.attribution)?.top(args.top)?;
        report::write_ranking(&mut out, &ranking)?;
    }

    Ok(())
}
