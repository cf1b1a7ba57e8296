use anyhow::Result;
use tracing::info;

fn main() -> Result<()> {
    // Structured JSON logs on stderr; stdout carries the report. Level via RUST_LOG.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("engagelytics=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .json()
        .init();

    let cfg = engagelytics_core::config::Config::from_env().map_err(|e| anyhow::anyhow!(e))?;
    info!(
        sessions = %cfg.sessions_path,
        engagements = %cfg.engagements_path,
        output_dir = %cfg.output_dir,
        "Starting conversion analysis"
    );

    let summary = engagelytics_cli::pipeline::run(&cfg)?;

    info!(
        sessions = summary.sessions_read,
        retained = summary.retained_rows,
        conversions = summary.conversions,
        predicted_probability = summary.predicted_probability,
        "Analysis complete"
    );
    Ok(())
}
