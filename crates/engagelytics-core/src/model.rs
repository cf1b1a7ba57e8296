//! Binary logistic regression fitted by Newton-Raphson.
//!
//! The fitter works on an explicit design matrix (use [`add_constant`] to
//! prepend the intercept column) and reports the same statistics a
//! conventional regression summary shows: standard errors from the inverse
//! observed information, Wald z statistics, two-sided p-values, and
//! McFadden's pseudo R².

use std::fmt;

use ndarray::{Array1, Array2, Axis};
use serde::Serialize;
use statrs::function::erf::erfc;
use tracing::{debug, warn};

use crate::error::CoreError;

pub const MAX_ITERATIONS: usize = 35;

/// Convergence threshold on the largest absolute coefficient step.
pub const TOLERANCE: f64 = 1e-8;

/// Fitted probabilities this close to every label mean the data are separable.
const SEPARATION_TOLERANCE: f64 = 1e-8;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Coefficient {
    pub name: String,
    pub estimate: f64,
    pub std_error: f64,
    pub z: f64,
    pub p_value: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LogitFit {
    pub coefficients: Vec<Coefficient>,
    pub n_obs: usize,
    pub log_likelihood: f64,
    pub null_log_likelihood: f64,
    pub pseudo_r_squared: f64,
    pub iterations: usize,
    pub converged: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CurvePoint {
    pub pageviews: f64,
    pub probability: f64,
}

/// Predicted conversion probability at page-view counts `0..len`.
#[derive(Debug, Clone, Serialize)]
pub struct ProbabilityCurve {
    pub points: Vec<CurvePoint>,
}

impl ProbabilityCurve {
    /// Probability at the `index`-th point, i.e. at `index` cumulative page views.
    pub fn at(&self, index: usize) -> Option<f64> {
        self.points.get(index).map(|p| p.probability)
    }
}

/// Prepend an intercept column of ones to a single predictor.
pub fn add_constant(x: &[f64]) -> Array2<f64> {
    let mut design = Array2::ones((x.len(), 2));
    for (i, v) in x.iter().enumerate() {
        design[[i, 1]] = *v;
    }
    design
}

pub fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// Fit `P(y = 1) = sigmoid(design · beta)`.
///
/// `names` labels the design columns in the summary; missing names fall
/// back to `x{index}`.
pub fn fit_logit(
    design: &Array2<f64>,
    response: &[bool],
    names: &[&str],
) -> Result<LogitFit, CoreError> {
    fit_logit_with_limit(design, response, names, MAX_ITERATIONS)
}

/// [`fit_logit`] with an explicit cap on Newton steps.
///
/// Hitting the cap is not an error unless the final estimate classifies
/// every row correctly, which means the likelihood has no maximum.
pub fn fit_logit_with_limit(
    design: &Array2<f64>,
    response: &[bool],
    names: &[&str],
    max_iterations: usize,
) -> Result<LogitFit, CoreError> {
    let n = design.nrows();
    if n == 0 {
        return Err(CoreError::EmptyDataset);
    }
    if response.len() != n {
        return Err(CoreError::DimensionMismatch {
            rows: n,
            response: response.len(),
        });
    }
    let positives = response.iter().filter(|&&b| b).count();
    if positives == 0 {
        return Err(CoreError::DegenerateResponse(false));
    }
    if positives == n {
        return Err(CoreError::DegenerateResponse(true));
    }

    let y: Array1<f64> = response.iter().map(|&b| if b { 1.0 } else { 0.0 }).collect();
    let k = design.ncols();
    let mut beta = Array1::<f64>::zeros(k);
    let mut converged = false;
    let mut iterations = 0;

    for iteration in 1..=max_iterations {
        iterations = iteration;
        let p = predict_with(design, &beta);
        if fits_labels_exactly(&p, &y) {
            return Err(CoreError::PerfectSeparation);
        }

        let gradient = design.t().dot(&(&y - &p));
        let hessian = information_matrix(design, &p);
        let step = invert(&hessian)?.dot(&gradient);
        beta += &step;

        if beta.iter().any(|b| !b.is_finite()) {
            return Err(CoreError::PerfectSeparation);
        }

        let max_step = step.iter().fold(0.0_f64, |acc, s| acc.max(s.abs()));
        debug!(iteration, max_step, "newton step");
        if max_step < TOLERANCE {
            converged = true;
            break;
        }
    }

    let p = predict_with(design, &beta);
    if !converged {
        let classifies_all = p.iter().zip(y.iter()).all(|(p, y)| (*p > 0.5) == (*y > 0.5));
        if classifies_all {
            return Err(CoreError::PerfectSeparation);
        }
        warn!(
            iterations,
            "logistic regression did not converge; estimates may be unreliable"
        );
    }

    let covariance = invert(&information_matrix(design, &p))?;
    let log_likelihood = log_likelihood(&y, &p);
    let mean = positives as f64 / n as f64;
    let null_log_likelihood = n as f64 * (mean * mean.ln() + (1.0 - mean) * (1.0 - mean).ln());

    let coefficients = (0..k)
        .map(|j| {
            let estimate = beta[j];
            let std_error = covariance[[j, j]].max(0.0).sqrt();
            let z = estimate / std_error;
            Coefficient {
                name: names
                    .get(j)
                    .map_or_else(|| format!("x{j}"), |name| name.to_string()),
                estimate,
                std_error,
                z,
                p_value: two_sided_p_value(z),
            }
        })
        .collect();

    Ok(LogitFit {
        coefficients,
        n_obs: n,
        log_likelihood,
        null_log_likelihood,
        pseudo_r_squared: 1.0 - log_likelihood / null_log_likelihood,
        iterations,
        converged,
    })
}

impl LogitFit {
    pub fn params(&self) -> Array1<f64> {
        self.coefficients.iter().map(|c| c.estimate).collect()
    }

    pub fn predict(&self, design: &Array2<f64>) -> Result<Array1<f64>, CoreError> {
        if design.ncols() != self.coefficients.len() {
            return Err(CoreError::DimensionMismatch {
                rows: design.ncols(),
                response: self.coefficients.len(),
            });
        }
        Ok(predict_with(design, &self.params()))
    }

    /// Probability for a single predictor value. Only meaningful for a
    /// `[const, x]` model.
    pub fn probability_at(&self, x: f64) -> Result<f64, CoreError> {
        let p = self.predict(&add_constant(&[x]))?;
        Ok(p[0])
    }

    /// Evaluate a `[const, x]` model at `x = 0, 1, .., len - 1`.
    pub fn probability_curve(&self, len: usize) -> Result<ProbabilityCurve, CoreError> {
        let xs: Vec<f64> = (0..len).map(|x| x as f64).collect();
        let probabilities = self.predict(&add_constant(&xs))?;
        Ok(ProbabilityCurve {
            points: xs
                .into_iter()
                .zip(probabilities.iter())
                .map(|(pageviews, &probability)| CurvePoint {
                    pageviews,
                    probability,
                })
                .collect(),
        })
    }
}

impl fmt::Display for LogitFit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(78);
        let thin = "-".repeat(78);
        writeln!(f, "{rule}")?;
        writeln!(f, "{:^78}", "Logit Regression Results")?;
        writeln!(f, "{rule}")?;
        writeln!(
            f,
            "No. Observations: {:>10}        Log-Likelihood:   {:>14.4}",
            self.n_obs, self.log_likelihood
        )?;
        writeln!(
            f,
            "Iterations:       {:>10}        LL-Null:          {:>14.4}",
            self.iterations, self.null_log_likelihood
        )?;
        writeln!(
            f,
            "Converged:        {:>10}        Pseudo R-squ.:    {:>14.4}",
            self.converged, self.pseudo_r_squared
        )?;
        writeln!(f, "{rule}")?;
        writeln!(
            f,
            "{:<22}{:>14}{:>14}{:>14}{:>14}",
            "", "coef", "std err", "z", "P>|z|"
        )?;
        writeln!(f, "{thin}")?;
        for c in &self.coefficients {
            writeln!(
                f,
                "{:<22}{:>14.4}{:>14.4}{:>14.3}{:>14.3}",
                c.name, c.estimate, c.std_error, c.z, c.p_value
            )?;
        }
        write!(f, "{rule}")
    }
}

fn predict_with(design: &Array2<f64>, beta: &Array1<f64>) -> Array1<f64> {
    design.dot(beta).mapv(sigmoid)
}

fn fits_labels_exactly(p: &Array1<f64>, y: &Array1<f64>) -> bool {
    p.iter()
        .zip(y.iter())
        .all(|(p, y)| (p - y).abs() < SEPARATION_TOLERANCE)
}

/// Observed information `Xᵀ W X` with `W = diag(p (1 - p))`.
fn information_matrix(design: &Array2<f64>, p: &Array1<f64>) -> Array2<f64> {
    let weights = p.mapv(|p| p * (1.0 - p));
    let weighted = design * &weights.view().insert_axis(Axis(1));
    design.t().dot(&weighted)
}

fn log_likelihood(y: &Array1<f64>, p: &Array1<f64>) -> f64 {
    y.iter()
        .zip(p.iter())
        .map(|(y, p)| {
            y * p.max(f64::MIN_POSITIVE).ln() + (1.0 - y) * (1.0 - p).max(f64::MIN_POSITIVE).ln()
        })
        .sum()
}

/// Gauss-Jordan inverse with partial pivoting.
fn invert(matrix: &Array2<f64>) -> Result<Array2<f64>, CoreError> {
    let k = matrix.nrows();
    let scale = matrix.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
    if scale == 0.0 || !scale.is_finite() {
        return Err(CoreError::SingularMatrix);
    }

    let mut a = matrix.clone();
    let mut inv = Array2::<f64>::eye(k);
    for col in 0..k {
        let pivot_row = (col..k)
            .max_by(|&i, &j| a[[i, col]].abs().total_cmp(&a[[j, col]].abs()))
            .unwrap_or(col);
        let pivot = a[[pivot_row, col]];
        if pivot.abs() <= scale * 1e-12 {
            return Err(CoreError::SingularMatrix);
        }
        if pivot_row != col {
            for j in 0..k {
                a.swap([col, j], [pivot_row, j]);
                inv.swap([col, j], [pivot_row, j]);
            }
        }
        for j in 0..k {
            a[[col, j]] /= pivot;
            inv[[col, j]] /= pivot;
        }
        for row in 0..k {
            if row == col {
                continue;
            }
            let factor = a[[row, col]];
            if factor == 0.0 {
                continue;
            }
            for j in 0..k {
                let da = factor * a[[col, j]];
                let di = factor * inv[[col, j]];
                a[[row, j]] -= da;
                inv[[row, j]] -= di;
            }
        }
    }
    Ok(inv)
}

/// `P(|Z| > |z|)` for a standard normal `Z`.
pub fn two_sided_p_value(z: f64) -> f64 {
    erfc(z.abs() / std::f64::consts::SQRT_2)
}
