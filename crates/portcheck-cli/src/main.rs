use clap::Parser as ClapParser;
use miette::{IntoDiagnostic, Result, bail};
use portcheck::{OrFifoDut, TestbenchError, TestbenchOptions, run_testbench};
use std::path::PathBuf;

#[derive(ClapParser)]
#[command(
    name = "portcheck",
    about = "Run the write/read port testbench against the OR design model"
)]
struct Cli {
    /// Seed of the random stimulus (random when omitted)
    #[arg(long)]
    seed: Option<u64>,

    /// Number of randomized OR operations
    #[arg(long)]
    operations: Option<usize>,

    /// TOML file with testbench options
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory for coverage.xml (overrides RESULT_PATH)
    #[arg(long)]
    result_path: Option<PathBuf>,

    /// Dump a VCD waveform to this file
    #[arg(long)]
    vcd: Option<PathBuf>,

    /// Print the run summary as JSON to stdout
    #[arg(long)]
    json: bool,

    /// Log driver activity (same as LEVEL=DEBUG)
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) -> Result<()> {
    use chrono::{DateTime, Utc};

    let mut dispatch = fern::Dispatch::new()
        .format(|out, message, record| {
            let now: DateTime<Utc> = Utc::now();
            out.finish(format_args!(
                "[{} {} {}] {}",
                now.format("%Y-%m-%dT%H:%M:%S%.fZ"),
                record.level(),
                record.target(),
                message
            ))
        })
        .chain(std::io::stderr());

    let level = std::env::var("LEVEL").unwrap_or_default();

    if verbose || level == "DEBUG" {
        dispatch = dispatch.level(log::LevelFilter::Debug);
    } else {
        dispatch = dispatch.level(log::LevelFilter::Info);
    }

    dispatch.apply().into_diagnostic()
}

fn options(cli: &Cli) -> Result<TestbenchOptions> {
    let mut options = match &cli.config {
        Some(path) => TestbenchOptions::load(path).into_diagnostic()?,
        None => TestbenchOptions::default(),
    };
    options.apply_env();

    // Without a seed from the command line or a config file, draw one.
    match cli.seed {
        Some(seed) => options.seed = seed,
        None if cli.config.is_none() => options.seed = rand::random(),
        None => {}
    }
    if let Some(operations) = cli.operations {
        options.operations = operations;
    }
    if let Some(dir) = &cli.result_path {
        options.result_path = dir.clone();
    }
    if let Some(vcd) = &cli.vcd {
        options.vcd = Some(vcd.clone());
    }
    options.validate().into_diagnostic()?;
    Ok(options)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    let options = options(&cli)?;
    log::info!("seed {}", options.seed);

    let report = match run_testbench(OrFifoDut::default(), &options) {
        Ok(report) => report,
        Err(err @ TestbenchError::Verdict(_)) => {
            bail!("test failed (seed {}): {err}", options.seed)
        }
        Err(err) => return Err(err).into_diagnostic(),
    };

    if cli.json {
        let json = serde_json::to_string_pretty(&report).into_diagnostic()?;
        println!("{json}");
    } else {
        eprintln!(
            "Done: {} passed, coverage {:.2}% written to {}",
            report.scoreboard.passes,
            report.coverage.percentage(),
            report.coverage_path.display()
        );
    }

    Ok(())
}
