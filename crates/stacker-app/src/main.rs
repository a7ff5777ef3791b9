// Lineup optimizer entry point.
//
// Startup sequence:
// 1. Load config (copying defaults on first run)
// 2. Initialize tracing (log to file; stdout carries the results)
// 3. Optimize every configured contest concurrently
// 4. Print one JSON document per contest

use stacker_app::batch;
use stacker_app::config::{self, LoggingConfig};

use anyhow::Context;
use std::io::Write;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load config
    let base_dir = std::env::current_dir().context("failed to resolve working directory")?;
    let config = config::load_config().context("failed to load configuration")?;

    // 2. Initialize tracing
    init_tracing(&config.optimizer.logging)?;
    info!(
        "Stacker starting: {} contests, iteration budget {}",
        config.contests.len(),
        config.optimizer.limits.iteration_budget
    );

    // 3. Optimize
    let outcomes = batch::run_all(&config, &base_dir).await;

    // 4. Render
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for outcome in &outcomes {
        serde_json::to_writer(&mut out, outcome).context("failed to serialize result")?;
        writeln!(out).context("failed to write result")?;
    }

    let failed = outcomes.iter().filter(|o| o.is_failure()).count();
    info!(
        "Stacker finished: {} succeeded, {} failed",
        outcomes.len() - failed,
        failed
    );
    if failed > 0 {
        anyhow::bail!("{failed} of {} contests failed", outcomes.len());
    }
    Ok(())
}

/// Initialize tracing to log to a file (stdout is reserved for JSON output).
fn init_tracing(logging: &LoggingConfig) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_path = std::env::current_dir()?.join(&logging.file);
    if let Some(dir) = log_path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let log_file = std::fs::File::create(&log_path)
        .with_context(|| format!("failed to create log file {}", log_path.display()))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.filter)),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
