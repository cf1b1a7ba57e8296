use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("{file}: missing column `{column}`")]
    MissingColumn { file: String, column: String },

    #[error("{file}: row {row}: invalid timestamp `{value}`")]
    InvalidTimestamp {
        file: String,
        row: usize,
        value: String,
    },

    #[error("{file}: row {row}: invalid integer `{value}` in column `{column}`")]
    InvalidInteger {
        file: String,
        row: usize,
        column: String,
        value: String,
    },

    #[error("cannot fit a model on an empty dataset")]
    EmptyDataset,

    #[error("design matrix has {rows} rows but the response has {response} values")]
    DimensionMismatch { rows: usize, response: usize },

    /// Every observation carries the same label, so the likelihood has no maximum.
    #[error("response has a single class (every conversion flag is {0})")]
    DegenerateResponse(bool),

    #[error("perfect separation detected; the maximum likelihood estimate does not exist")]
    PerfectSeparation,

    #[error("singular Hessian; predictors are collinear")]
    SingularMatrix,
}
