//! trice - assign and reconcile trice IDs in C source trees

use clap::Parser;
use eyre::Result;
use owo_colors::OwoColorize;
use trice::cli::Cli;
use trice::output::render_outcome;
use trice_core::WalkSources;

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_tracing(cli.verbose);

    let (policy, config) = cli.command.into_config()?;
    tracing::debug!(%policy, ?config, "configuration");

    eprintln!(
        "{} Running {} on {}{}",
        "->".blue().bold(),
        policy.as_str().bold(),
        config
            .roots()
            .iter()
            .map(|root| root.display().to_string())
            .collect::<Vec<_>>()
            .join(", "),
        if config.dry_run { " (dry run)" } else { "" }
    );

    let mut sources = WalkSources::new(config.roots()).exclude(config.exclude.clone());
    let outcome = trice_core::run(policy, &config, &mut sources)?;

    eprint!("{}", render_outcome(&outcome, &config));
    Ok(())
}

fn setup_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("trice=debug,trice_core=debug,info")
        } else {
            EnvFilter::new("warn")
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}
