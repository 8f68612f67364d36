// Passing decision report entry point.
//
// Startup sequence:
// 1. Initialize tracing (log to file, stdout carries the report)
// 2. Load config
// 3. Load dynamic events and player minutes
// 4. Calibrate thresholds and evaluate every eligible possession
// 5. Build the player table for the configured third, apply the page filter
// 6. Print league summary and ranking, optionally write JSON

use std::path::Path;

use pass_decision::config;
use pass_decision::data::{minutes, possessions};
use pass_decision::evaluation::{self, Evaluation};
use pass_decision::report;

use anyhow::Context;
use tracing::info;

fn main() -> anyhow::Result<()> {
    // 1. Initialize tracing
    init_tracing()?;
    info!("Passing decision evaluation starting up");

    // 2. Load config
    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded: third={}, good_completion={}, good_threat={:?}",
        config.report.third, config.thresholds.good_completion, config.thresholds.good_threat
    );

    // 3. Load data
    let events = possessions::load_possessions(Path::new(&config.data_paths.events))
        .context("failed to load dynamic events")?;
    let minutes = minutes::load_minutes(Path::new(&config.data_paths.players))
        .context("failed to load player minutes")?;
    info!(
        "Loaded {} possessions and {} player minute records",
        events.len(),
        minutes.len()
    );

    // 4. Evaluate
    let evaluation =
        Evaluation::run(&events, &config.thresholds).context("failed to evaluate possessions")?;

    // 5. Player table
    let table = evaluation.player_table(config.report.third, &minutes);
    let filtered = evaluation::page_filter(&table, &config.report.filter);
    info!(
        "Player table: {} players, {} after filtering",
        table.len(),
        filtered.len()
    );

    // 6. Report
    let summary = evaluation::get_metrics(filtered.iter().copied());
    let ranked = evaluation::rank_by_decision_efficiency(filtered.iter().copied());

    let thresholds = evaluation.thresholds();
    println!(
        "Third: {}  |  good option: xpass >= {:.2}, xthreat >= {:.4}\n",
        config.report.third, thresholds.good_completion, thresholds.good_threat
    );
    println!("{}", report::format_summary(&summary));
    println!("{}", report::format_ranking(&ranked, config.report.top));

    if let Some(output) = &config.report.json_output {
        let json = report::JsonReport::new(
            config.report.third.to_string(),
            *thresholds,
            &summary,
            ranked.iter().map(|r| r.player).collect(),
        );
        report::write_json(Path::new(output), &json)?;
        info!("Report written to {}", output);
        println!("Report written to {output}");
    }

    info!("Passing decision evaluation finished");
    Ok(())
}

/// Initialize tracing to log to a file.
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("pass-decision.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("pass_decision=info,warn")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
