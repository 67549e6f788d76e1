use anyhow::Context;
use clap::Parser;

use sc3::{AllocOptions, ArrayOptions, ReportOptions, Sc3Options, run_main};

#[derive(Parser, Debug)]
#[command(
    name = "sc3",
    about = "sc3: set up an array, read an element, explain any failure",
    version
)]
pub struct Cli {
    #[command(flatten)]
    alloc: AllocOptions,

    #[command(flatten)]
    array: ArrayOptions,

    #[command(flatten)]
    report: ReportOptions,

    /// Output file path (writes to file instead of stdout)
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    output: Option<String>,
}

pub fn run(args: Cli) -> anyhow::Result<bool> {
    // Initialize tracing subscriber for logging
    if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_writer(std::io::stderr)
            .init();
    }

    let opts = Sc3Options {
        alloc: args.alloc,
        array: args.array,
        report: args.report,
        output: args.output,
    };

    let outcome = run_main(&opts)?;
    if let Some(ref path) = opts.output {
        std::fs::write(path, format!("{}\n", outcome.text))
            .with_context(|| format!("writing {path}"))?;
        tracing::info!(path, "output written");
    } else if outcome.failed {
        eprintln!("{}", outcome.text);
    } else {
        println!("{}", outcome.text);
    }
    Ok(!outcome.failed)
}

pub fn main() -> anyhow::Result<()> {
    let args = Cli::parse();
    if !run(args)? {
        std::process::exit(1);
    }
    Ok(())
}
