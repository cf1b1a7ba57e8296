#[derive(Debug, Clone)]
pub struct Config {
    pub sessions_path: String,
    pub engagements_path: String,
    pub output_dir: String,
    pub duckdb_memory_limit: String,
    /// Cumulative page-view count the headline prediction is reported at.
    pub prediction_pageviews: usize,
    /// Number of points (0, 1, .., n-1) on the predicted probability curve.
    pub curve_len: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup. `from_env` delegates here.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let cfg = Self {
            sessions_path: lookup("ENGAGELYTICS_SESSIONS_PATH")
                .unwrap_or_else(|| "sessions.csv".to_string()),
            engagements_path: lookup("ENGAGELYTICS_ENGAGEMENTS_PATH")
                .unwrap_or_else(|| "engagements2.csv".to_string()),
            output_dir: lookup("ENGAGELYTICS_OUTPUT_DIR").unwrap_or_else(|| "output".to_string()),
            duckdb_memory_limit: lookup("ENGAGELYTICS_DUCKDB_MEMORY")
                .unwrap_or_else(|| "512MB".to_string()),
            prediction_pageviews: 25,
            curve_len: 50,
        };

        if cfg.sessions_path.trim().is_empty() {
            return Err("ENGAGELYTICS_SESSIONS_PATH must not be empty".to_string());
        }
        if cfg.engagements_path.trim().is_empty() {
            return Err("ENGAGELYTICS_ENGAGEMENTS_PATH must not be empty".to_string());
        }
        if !is_valid_memory_limit(&cfg.duckdb_memory_limit) {
            return Err(format!(
                "invalid ENGAGELYTICS_DUCKDB_MEMORY: {}",
                cfg.duckdb_memory_limit
            ));
        }
        Ok(cfg)
    }

    pub fn transformed_csv_path(&self) -> std::path::PathBuf {
        std::path::Path::new(&self.output_dir).join("df_transformed.csv")
    }

    pub fn model_summary_path(&self) -> std::path::PathBuf {
        std::path::Path::new(&self.output_dir).join("model_summary.json")
    }

    pub fn plot_path(&self) -> std::path::PathBuf {
        std::path::Path::new(&self.output_dir).join("logistic_curve.svg")
    }
}

/// DuckDB size strings such as `512MB` or `2GB`. The value is interpolated
/// into a `SET` statement, so only digits followed by a unit are accepted.
fn is_valid_memory_limit(raw: &str) -> bool {
    let digits = raw.chars().take_while(char::is_ascii_digit).count();
    if digits == 0 {
        return false;
    }
    matches!(
        raw[digits..].to_ascii_uppercase().as_str(),
        "KB" | "MB" | "GB" | "TB" | "KIB" | "MIB" | "GIB" | "TIB"
    )
}
