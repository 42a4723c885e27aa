//! CLI entry point for the holistic planner.

use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use log::info;

use sentinel_core::{select_plan, OpportunityContext, PlannerConfiguration};
use sentinel_monitor::{InvalidationMonitor, MonitorConfig};
use sentinel_persistence::InMemoryStore;
use sentinel_planner::audit::{self, AuditLog};
use sentinel_planner::config::CliConfig;
use sentinel_planner::fixture::Fixture;
use sentinel_planner::planner_config;
use sentinel_planner::report;
use sentinel_planner::Error;

#[derive(Parser)]
#[command(name = "sentinel-planner")]
#[command(about = "Holistic portfolio planner: runs the full pipeline against a JSON fixture")]
#[command(version)]
struct Cli {
    /// Path to config.toml
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load the fixture, run the full pipeline once, print and audit the plan
    Plan,

    /// Run the invalidation monitor for a fixed number of poll cycles
    Watch {
        /// Number of check-and-invalidate cycles to run
        #[arg(long, default_value_t = 3)]
        cycles: u32,
    },
}

fn load_context(config: &CliConfig) -> Result<(OpportunityContext, PlannerConfiguration), Error> {
    let fixture = Fixture::load(&config.fixture.path)?;
    let ctx = fixture.into_context_builder()?.build()?;
    let planner_config = planner_config::load(config.planner_config_path.as_deref())?;
    Ok((ctx, planner_config))
}

fn run_plan(config: &CliConfig) -> Result<(), Error> {
    let mut audit_log = AuditLog::open(&config.audit_path())?;
    audit::log_run_started(&mut audit_log, &config.fixture.path.display().to_string())?;

    let (ctx, planner_config) = load_context(config)?;
    audit::log_context_summary(
        &mut audit_log,
        ctx.securities().len(),
        ctx.enriched_positions.len(),
        ctx.total_portfolio_value_eur.as_eur(),
        ctx.available_cash_eur.as_eur(),
    )?;

    let result = select_plan(&ctx, &planner_config);
    info!(
        "selected a {}-step plan (hash {}, {} rejected opportunities)",
        result.plan.steps.len(),
        result.portfolio_hash,
        result.rejected_opportunities.len()
    );
    audit::log_calculator_output(
        &mut audit_log,
        result.rejected_opportunities.len() + result.plan.steps.len(),
        result.pre_filtered_securities.len(),
    )?;

    report::print_plan(&result);

    audit::log_plan(&mut audit_log, &result.plan, &result.portfolio_hash.to_string())?;
    audit::log_rejections(
        &mut audit_log,
        &result.rejected_opportunities,
        &result.rejected_sequences,
    )?;
    audit::log_run_completed(&mut audit_log, &result)?;

    Ok(())
}

fn run_watch(config: &CliConfig, cycles: u32) -> Result<(), Error> {
    let (ctx, planner_config) = load_context(config)?;
    let result = select_plan(&ctx, &planner_config);
    let hash = result.portfolio_hash.clone();

    let store = Arc::new(InMemoryStore::new());
    let monitor = Arc::new(InvalidationMonitor::new(
        MonitorConfig::default(),
        move || hash.clone(),
        store.clone(),
        store.clone(),
        store,
    ));

    info!("watching fixture {:?} for {cycles} cycle(s)", config.fixture.path);
    for cycle in 1..=cycles {
        let outcome = monitor.check_once();
        println!("cycle {cycle}: {outcome:?}");
    }

    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    let cli = Cli::parse();

    let config = match CliConfig::load(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading config: {e}");
            process::exit(1);
        }
    };

    let result = match cli.command {
        Command::Plan => run_plan(&config),
        Command::Watch { cycles } => run_watch(&config, cycles),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
