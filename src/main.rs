use anyhow::{Context, Result};
use clap::Parser;
use slowest_tally::{
    cancel::CancelToken,
    cli::Cli,
    config::SessionConfig,
    error::SessionError,
    executor::CommandExecutor,
    parser,
    report::ReportEmitter,
    session::{Session, SessionParams},
    text_output,
};
use tracing_subscriber::EnvFilter;

/// Exit status when no run could be measured
const EXIT_ALL_RUNS_FAILED: i32 = 2;

/// Initialize tracing subscriber; RUST_LOG wins over the flags
fn init_tracing(debug: bool, verbose: bool) {
    let level = if debug {
        tracing::Level::TRACE
    } else if verbose {
        tracing::Level::INFO
    } else {
        tracing::Level::WARN
    };
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(args: &Cli) -> Result<SessionConfig> {
    let base = match &args.config {
        Some(path) => SessionConfig::from_file(path)?,
        None => SessionConfig::default(),
    };
    let config = args.apply(base);
    config.validate()?;
    Ok(config)
}

/// Feed every section of a captured log into the session as one run each
fn replay_log(session: &mut Session, args: &Cli) -> Result<()> {
    if let Some(path) = &args.from_log {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read log {}", path.display()))?;
        let runs = parser::split_runs(&raw);
        tracing::info!(runs = runs.len(), log = %path.display(), "replaying captured log");
        for report in runs {
            session.record_report(report);
        }
    }
    Ok(())
}

fn run(args: Cli) -> Result<()> {
    let config = load_config(&args)?;

    let cancel = CancelToken::new();
    cancel
        .install_signal_handlers()
        .context("Failed to install signal handlers")?;

    let params = SessionParams {
        runs: config.runs,
        slowest: config.slowest,
        top_k: config.top_k,
    };
    let mut session = Session::new(params, cancel.clone());

    if args.from_log.is_some() {
        replay_log(&mut session, &args)?;
    } else {
        let mut executor = CommandExecutor::new(config.command.clone(), config.timeout(), cancel);
        session.run_with(&mut executor);
    }

    let report = session.finish()?;
    let emitter = ReportEmitter::new(&config.output_dir);
    emitter.emit_session(&report)?;

    if !args.quiet {
        print!("{}", text_output::console_report(&report.analysis));
        let counts = report.run_counts();
        println!(
            "\n{} of {} runs succeeded; reports written to {}",
            counts.succeeded,
            counts.attempted,
            emitter.output_dir().display()
        );
    }
    Ok(())
}

fn main() {
    let args = Cli::parse();
    init_tracing(args.debug, args.verbose);

    if let Err(err) = run(args) {
        eprintln!("Error: {err:#}");
        let code = match err.downcast_ref::<SessionError>() {
            Some(SessionError::AllRunsFailed { failures, .. }) => {
                for failure in failures {
                    eprintln!("  {failure}");
                }
                EXIT_ALL_RUNS_FAILED
            }
            _ => 1,
        };
        std::process::exit(code);
    }
}
