//! Static SVG rendering of the fitted logistic curve over the labeled data.

use std::fmt::{self, Write as _};
use std::path::Path;

use anyhow::{bail, Context, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

use engagelytics_core::model::{sigmoid, LogitFit};
use engagelytics_core::record::LabeledSession;

const WIDTH: f64 = 800.0;
const HEIGHT: f64 = 600.0;
const MARGIN_LEFT: f64 = 80.0;
const MARGIN_RIGHT: f64 = 56.0;
const MARGIN_TOP: f64 = 60.0;
const MARGIN_BOTTOM: f64 = 70.0;

const PANEL_FILL: &str = "#EAEAF2";
const POINT_FILL: &str = "#4C72B0";
const CURVE_STROKE: &str = "#4C72B0";

/// Vertical jitter applied to the 0/1 labels so overlapping points stay visible.
const Y_JITTER: f64 = 0.01;
const JITTER_SEED: u64 = 0x5EED;
const CURVE_SAMPLES: usize = 200;

const Y_MIN: f64 = -0.05;
const Y_MAX: f64 = 1.05;

struct Frame {
    x_max: f64,
}

impl Frame {
    fn px(&self, x: f64) -> f64 {
        MARGIN_LEFT + x / self.x_max * (WIDTH - MARGIN_LEFT - MARGIN_RIGHT)
    }

    fn py(&self, y: f64) -> f64 {
        HEIGHT - MARGIN_BOTTOM - (y - Y_MIN) / (Y_MAX - Y_MIN) * (HEIGHT - MARGIN_TOP - MARGIN_BOTTOM)
    }
}

/// Round `range / target` up to 1, 2, or 5 times a power of ten.
fn nice_step(range: f64, target: usize) -> f64 {
    let raw = range / target as f64;
    let magnitude = 10_f64.powf(raw.log10().floor());
    let residual = raw / magnitude;
    let nice = if residual > 5.0 {
        10.0
    } else if residual > 2.0 {
        5.0
    } else if residual > 1.0 {
        2.0
    } else {
        1.0
    };
    nice * magnitude
}

pub fn render_svg(rows: &[LabeledSession], fit: &LogitFit) -> Result<String> {
    let params = fit.params();
    if params.len() != 2 {
        bail!(
            "plot needs a [const, x] model, got {} coefficients",
            params.len()
        );
    }
    let (intercept, slope) = (params[0], params[1]);

    let data_max = rows
        .iter()
        .map(|r| r.pageviews_cum_sum as f64)
        .fold(0.0_f64, f64::max);
    let step = nice_step(data_max.max(1.0), 6);
    let frame = Frame {
        x_max: ((data_max.max(1.0) / step).ceil() * step).max(step),
    };

    let mut svg = String::new();
    write_panel(&mut svg)?;
    write_grid(&mut svg, &frame, step)?;
    write_points(&mut svg, &frame, rows)?;
    write_curve(&mut svg, &frame, intercept, slope)?;
    write_labels(&mut svg)?;
    svg.push_str("</svg>\n");
    Ok(svg)
}

fn write_panel(svg: &mut String) -> fmt::Result {
    writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{WIDTH}" height="{HEIGHT}" viewBox="0 0 {WIDTH} {HEIGHT}" font-family="sans-serif">"#
    )?;
    writeln!(svg, r#"<rect width="100%" height="100%" fill="white"/>"#)?;
    writeln!(
        svg,
        r#"<rect x="{MARGIN_LEFT}" y="{MARGIN_TOP}" width="{}" height="{}" fill="{PANEL_FILL}"/>"#,
        WIDTH - MARGIN_LEFT - MARGIN_RIGHT,
        HEIGHT - MARGIN_TOP - MARGIN_BOTTOM
    )
}

/// Grid lines and tick labels on both axes.
fn write_grid(svg: &mut String, frame: &Frame, step: f64) -> fmt::Result {
    let mut tick = 0.0;
    while tick <= frame.x_max + step * 1e-9 {
        let x = frame.px(tick);
        writeln!(
            svg,
            r#"<line x1="{x:.2}" y1="{MARGIN_TOP}" x2="{x:.2}" y2="{:.2}" stroke="white" stroke-width="1.2"/>"#,
            HEIGHT - MARGIN_BOTTOM
        )?;
        writeln!(
            svg,
            r#"<text x="{x:.2}" y="{:.2}" font-size="14" text-anchor="middle">{}</text>"#,
            HEIGHT - MARGIN_BOTTOM + 20.0,
            format_tick(tick)
        )?;
        tick += step;
    }
    for i in 0..=5 {
        let value = f64::from(i) * 0.2;
        let y = frame.py(value);
        writeln!(
            svg,
            r#"<line x1="{MARGIN_LEFT}" y1="{y:.2}" x2="{:.2}" y2="{y:.2}" stroke="white" stroke-width="1.2"/>"#,
            WIDTH - MARGIN_RIGHT
        )?;
        writeln!(
            svg,
            r#"<text x="{:.2}" y="{:.2}" font-size="14" text-anchor="end">{value:.1}</text>"#,
            MARGIN_LEFT - 8.0,
            y + 5.0
        )?;
    }
    Ok(())
}

fn write_points(svg: &mut String, frame: &Frame, rows: &[LabeledSession]) -> fmt::Result {
    let mut rng = StdRng::seed_from_u64(JITTER_SEED);
    writeln!(svg, r#"<g fill="{POINT_FILL}" fill-opacity="0.8">"#)?;
    for row in rows {
        let label = if row.is_conversion { 1.0 } else { 0.0 };
        let jittered = label + rng.gen_range(-Y_JITTER..=Y_JITTER);
        writeln!(
            svg,
            r#"<circle cx="{:.2}" cy="{:.2}" r="4.5"/>"#,
            frame.px(row.pageviews_cum_sum as f64),
            frame.py(jittered)
        )?;
    }
    writeln!(svg, "</g>")
}

fn write_curve(svg: &mut String, frame: &Frame, intercept: f64, slope: f64) -> fmt::Result {
    let points: Vec<String> = (0..=CURVE_SAMPLES)
        .map(|i| {
            let x = frame.x_max * i as f64 / CURVE_SAMPLES as f64;
            let p = sigmoid(intercept + slope * x);
            format!("{:.2},{:.2}", frame.px(x), frame.py(p))
        })
        .collect();
    writeln!(
        svg,
        r#"<polyline fill="none" stroke="{CURVE_STROKE}" stroke-width="2.5" points="{}"/>"#,
        points.join(" ")
    )
}

fn write_labels(svg: &mut String) -> fmt::Result {
    writeln!(
        svg,
        r#"<text x="{:.2}" y="{:.2}" font-size="20" text-anchor="middle">Logistic Regression Curve</text>"#,
        WIDTH / 2.0,
        MARGIN_TOP - 20.0
    )?;
    writeln!(
        svg,
        r#"<text x="{:.2}" y="{:.2}" font-size="16" text-anchor="middle">Cumulative sum of pageviews</text>"#,
        (MARGIN_LEFT + WIDTH - MARGIN_RIGHT) / 2.0,
        HEIGHT - 20.0
    )?;
    let y_mid = (MARGIN_TOP + HEIGHT - MARGIN_BOTTOM) / 2.0;
    writeln!(
        svg,
        r#"<text x="24" y="{y_mid:.2}" font-size="16" text-anchor="middle" transform="rotate(-90 24 {y_mid:.2})">Conversion probability</text>"#
    )
}

fn format_tick(value: f64) -> String {
    if value.fract().abs() < 1e-9 {
        format!("{value:.0}")
    } else {
        format!("{value:.1}")
    }
}

pub fn write_plot(path: &Path, rows: &[LabeledSession], fit: &LogitFit) -> Result<()> {
    let svg = render_svg(rows, fit)?;
    std::fs::write(path, svg).with_context(|| format!("writing {}", path.display()))?;
    info!(path = %path.display(), points = rows.len(), "Rendered logistic curve");
    Ok(())
}
