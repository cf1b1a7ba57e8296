//! End-to-end run: read, stage, transform, export, fit, predict, plot.

use anyhow::{anyhow, Context, Result};
use tracing::info;

use engagelytics_core::backend::ConversionBackend;
use engagelytics_core::config::Config;
use engagelytics_core::model::{add_constant, fit_logit, LogitFit, ProbabilityCurve};
use engagelytics_duckdb::DuckDbBackend;

use crate::report::{self, ModelSummary};
use crate::{export, ingest, plot};

pub const PREDICTOR_NAMES: [&str; 2] = ["const", "pageviews_cum_sum"];

#[derive(Debug)]
pub struct RunSummary {
    pub sessions_read: usize,
    pub engagements_read: usize,
    pub engaged_users: usize,
    pub retained_rows: usize,
    pub conversions: usize,
    pub fit: LogitFit,
    pub curve: ProbabilityCurve,
    pub predicted_probability: f64,
}

/// Run the analysis against a fresh in-memory DuckDB.
pub fn run(cfg: &Config) -> Result<RunSummary> {
    let mut backend = DuckDbBackend::open_in_memory(&cfg.duckdb_memory_limit)?;
    run_with(cfg, &mut backend)
}

/// Run the analysis against any backend. The backend is expected to be empty.
pub fn run_with<B: ConversionBackend>(cfg: &Config, backend: &mut B) -> Result<RunSummary> {
    let sessions = ingest::read_sessions(&cfg.sessions_path)?;
    let engagements = ingest::read_engagements(&cfg.engagements_path)?;
    println!("{}", report::preview_sessions(&sessions)?);
    println!("{}", report::preview_engagements(&engagements)?);

    backend.load_sessions(&sessions)?;
    backend.load_engagements(&engagements)?;

    let engaged_users = backend.first_engagements()?.len();
    info!(
        engagements = engagements.len(),
        users = engaged_users,
        "Reduced engagements to first engagement per user"
    );

    let labeled = backend.labeled_sessions()?;
    let conversions = labeled.iter().filter(|r| r.is_conversion).count();
    info!(
        sessions = sessions.len(),
        retained = labeled.len(),
        dropped = sessions.len().saturating_sub(labeled.len()),
        conversions,
        "Labeled pre-engagement sessions"
    );

    std::fs::create_dir_all(&cfg.output_dir)
        .with_context(|| format!("creating output directory {}", cfg.output_dir))?;
    export::write_transformed(&cfg.transformed_csv_path(), &labeled)?;

    let x: Vec<f64> = labeled.iter().map(|r| r.pageviews_cum_sum as f64).collect();
    let y: Vec<bool> = labeled.iter().map(|r| r.is_conversion).collect();
    let fit = fit_logit(&add_constant(&x), &y, &PREDICTOR_NAMES)
        .context("fitting logistic regression of conversion on cumulative pageviews")?;
    info!(
        iterations = fit.iterations,
        converged = fit.converged,
        log_likelihood = fit.log_likelihood,
        pseudo_r_squared = fit.pseudo_r_squared,
        "Fitted logistic regression"
    );
    println!("{fit}");

    let curve = fit.probability_curve(cfg.curve_len)?;
    let predicted_probability = curve.at(cfg.prediction_pageviews).ok_or_else(|| {
        anyhow!(
            "prediction point {} lies outside the {}-point curve",
            cfg.prediction_pageviews,
            cfg.curve_len
        )
    })?;
    println!();
    println!(
        "{}",
        report::prediction_line(cfg.prediction_pageviews, predicted_probability)
    );

    report::write_model_summary(
        &cfg.model_summary_path(),
        &ModelSummary {
            fit: &fit,
            prediction_pageviews: cfg.prediction_pageviews,
            predicted_probability,
            curve: &curve,
        },
    )?;
    plot::write_plot(&cfg.plot_path(), &labeled, &fit)?;

    Ok(RunSummary {
        sessions_read: sessions.len(),
        engagements_read: engagements.len(),
        engaged_users,
        retained_rows: labeled.len(),
        conversions,
        fit,
        curve,
        predicted_probability,
    })
}
