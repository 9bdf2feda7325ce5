//! TripWeaver - trip planning client
//!
//! CLI entry point: runs searches against the planning service and exports
//! finished itineraries.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{CommandFactory, FromArgMatches};
use colored::Colorize;
use eyre::{Context, Result};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use tripweaver::cli::{Cli, Command, OutputFormat, PlanArgs, generate_after_help, get_log_path};
use tripweaver::config::Config;
use tripweaver::domain::{SavedPlan, TripPlan, TripRequest};
use tripweaver::report::{format_duration, format_price, format_stops, write_report};
use tripweaver::session::{SessionController, SessionState};
use tripweaver::transport::create_transport;

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Note: Can't log params here since logging isn't initialized yet
    let log_path = get_log_path();
    if let Some(log_dir) = log_path.parent() {
        fs::create_dir_all(log_dir).context("Failed to create log directory")?;
    }

    // Determine log level with priority: CLI --log-level > config file > default (INFO)
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    let log_file = fs::File::create(&log_path).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cmd = Cli::command().after_help(generate_after_help());
    let cli = Cli::from_arg_matches(&cmd.get_matches())?;

    // Load log level from config file early (before full config load)
    let config_log_level = Config::load_log_level(cli.config.as_ref());

    // Setup logging with priority: CLI > config > INFO default
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    info!(
        base_url = %config.service.base_url,
        streaming = config.transport.streaming,
        "TripWeaver loaded config"
    );

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Command::Plan(args) => {
            debug!("main: matched Plan command");
            cmd_plan(&config, args).await
        }
        Command::Export { input, output } => {
            debug!(?input, ?output, "main: matched Export command");
            cmd_export(&config, &input, output.as_ref())
        }
        Command::Health => {
            debug!("main: matched Health command");
            cmd_health(&config).await
        }
    }
}

fn build_request(args: &PlanArgs) -> TripRequest {
    let mut request = TripRequest::new(&args.origin, &args.destination, args.start, args.end)
        .with_adults(args.adults)
        .with_budget(args.budget)
        .with_trip_type(&args.trip_type);
    for interest in &args.interests {
        request = request.with_interest(interest);
    }
    for (key, value) in &args.constraints {
        request = request.with_constraint(key, value);
    }
    request
}

/// Print progress milestones not printed yet
fn print_progress(state: &SessionState, printed: &mut usize) {
    let logs = state.logs();
    for log in logs.iter().skip(*printed) {
        println!("  {} {}", "✓".green(), log);
    }
    *printed = (*printed).max(logs.len());
}

/// Run one search and report the outcome
async fn cmd_plan(config: &Config, args: PlanArgs) -> Result<()> {
    debug!(?args, "cmd_plan: called");
    let request = build_request(&args);
    if let Err(e) = request.validate() {
        eprintln!("{} {}", "Invalid request:".red(), e);
        std::process::exit(2);
    }

    let transport = create_transport(config).context("Failed to create transport")?;
    let controller = Arc::new(SessionController::new(transport));
    let mut updates = controller.subscribe();

    println!(
        "Planning {} -> {} ({} to {})",
        request.origin.bold(),
        request.destination.bold(),
        request.start_date,
        request.end_date
    );

    let search = controller.start_search(request);
    tokio::pin!(search);

    let mut printed = 0;
    let final_state = loop {
        tokio::select! {
            biased;
            update = updates.recv() => match update {
                Ok(state) => print_progress(&state, &mut printed),
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "cmd_plan: progress display lagged"),
                Err(RecvError::Closed) => debug!("cmd_plan: update channel closed"),
            },
            state = &mut search => break state,
            _ = tokio::signal::ctrl_c() => {
                info!("cmd_plan: interrupted, clearing results");
                controller.clear_results();
            }
        }
    };
    print_progress(&final_state, &mut printed);

    match final_state.as_ref() {
        SessionState::Succeeded {
            plan,
            service_logs,
            request,
            ..
        } => {
            debug!(service_logs = service_logs.len(), "cmd_plan: search succeeded");
            let saved = SavedPlan {
                plan: plan.as_ref().clone(),
                request: Some(request.as_ref().clone()),
            };

            match args.format {
                OutputFormat::Text => print_plan(plan, &config.report.default_currency),
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&saved)?),
            }

            if let Some(path) = &args.save {
                let json = serde_json::to_string_pretty(&saved)?;
                fs::write(path, json).context(format!("Failed to save plan to {}", path.display()))?;
                println!("{} Plan saved to {}", "✓".green(), path.display());
            }

            if let Some(target) = &args.export {
                let path = write_report(plan, Some(request.as_ref()), &config.report.options(), target)
                    .context("Failed to export itinerary")?;
                println!("{} Itinerary written to {}", "✓".green(), path.display());
            }
            Ok(())
        }
        SessionState::Failed { message, .. } => {
            debug!(%message, "cmd_plan: search failed");
            eprintln!("{} {}", "✗ Planning failed:".red(), message);
            std::process::exit(1);
        }
        SessionState::Idle => {
            println!("{}", "Search cancelled".yellow());
            Ok(())
        }
        SessionState::Searching { .. } => {
            // A resolved search is never still searching
            warn!("cmd_plan: search resolved while still searching");
            Ok(())
        }
    }
}

fn print_plan(plan: &TripPlan, currency: &str) {
    if plan.is_empty() {
        println!("\n{}", "The service returned an empty plan".yellow());
        return;
    }

    if !plan.flights.is_empty() {
        println!("\n{}", "Flights".bold().cyan());
        for flight in &plan.flights {
            let mut line = format!("  {}", flight.summary);
            if let Some(stops) = flight.stops {
                line.push_str(&format!(" ({})", format_stops(stops)));
            }
            if let Some(price) = flight.est_price {
                line.push_str(&format!(" - {}", format_price(price, flight.currency.as_deref(), currency)));
            }
            println!("{}", line);
        }
    }

    if !plan.stays.is_empty() {
        println!("\n{}", "Accommodation".bold().cyan());
        for stay in &plan.stays {
            let mut line = format!("  {}", stay.name);
            if !stay.area.is_empty() {
                line.push_str(&format!(", {}", stay.area));
            }
            if let Some(price) = stay.est_price_per_night {
                line.push_str(&format!(
                    " - {} / night",
                    format_price(price, stay.currency.as_deref(), currency)
                ));
            }
            println!("{}", line);
        }
    }

    if !plan.activities.is_empty() {
        println!("\n{}", "Itinerary".bold().cyan());
        for (i, day) in plan.activities.iter().enumerate() {
            println!("  {} {}", format!("Day {}", i + 1).bold(), day.date);
            for (slot, activity) in day.scheduled() {
                let duration = activity
                    .duration_hours
                    .map(|h| format!(" ({})", format_duration(h)))
                    .unwrap_or_default();
                println!("    {:<10} {}{}", slot.label(), activity.title, duration);
            }
        }
    }
}

/// Render a saved plan to PDF
fn cmd_export(config: &Config, input: &Path, output: Option<&PathBuf>) -> Result<()> {
    debug!(?input, ?output, "cmd_export: called");
    let content = fs::read_to_string(input).context(format!("Failed to read {}", input.display()))?;
    let saved: SavedPlan =
        serde_json::from_str(&content).context(format!("Failed to parse plan JSON in {}", input.display()))?;

    let target = output.unwrap_or(&config.report.output_dir);
    let path = write_report(&saved.plan, saved.request.as_ref(), &config.report.options(), target)
        .context("Failed to export itinerary")?;

    println!("{} Itinerary written to {}", "✓".green(), path.display());
    Ok(())
}

/// Probe the planning service
async fn cmd_health(config: &Config) -> Result<()> {
    debug!("cmd_health: called");
    let transport = create_transport(config).context("Failed to create transport")?;

    match transport.health().await {
        Ok(true) => {
            println!("{} Planning service reachable at {}", "✓".green(), config.service.base_url);
            Ok(())
        }
        Ok(false) => {
            eprintln!("{} Planning service at {} is unhealthy", "✗".red(), config.service.base_url);
            std::process::exit(1);
        }
        Err(e) => {
            debug!(error = %e, "cmd_health: probe failed");
            eprintln!("{} Cannot reach {}: {}", "✗".red(), config.service.base_url, e);
            std::process::exit(1);
        }
    }
}
