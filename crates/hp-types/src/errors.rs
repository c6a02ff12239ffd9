use thiserror::Error;

/// Main error type for the HParamSweep system
#[derive(Error, Debug)]
pub enum HpError {
    #[error("Data error: {0}")]
    Data(#[from] DataError),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Search error: {0}")]
    Search(#[from] SearchError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Encoding error: {0}")]
    Encoding(#[from] bincode::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl HpError {
    /// Whether a trial that failed with this error may be retried with a
    /// fresh hyperparameter draw.
    ///
    /// Bad draws, numerical trouble and transient download failures are
    /// retryable. Anything that would fail identically on every draw is not.
    pub fn is_retryable(&self) -> bool {
        match self {
            HpError::Model(e) => e.is_retryable(),
            HpError::Data(e) => e.is_retryable(),
            HpError::Io(_) => true,
            _ => false,
        }
    }
}

/// Dataset retrieval and preparation errors
#[derive(Error, Debug)]
pub enum DataError {
    #[error("Dataset not found: {id}")]
    DatasetNotFound { id: u32 },

    #[error("Dataset {id} download failed: {message}")]
    Download { id: u32, message: String },

    #[error("Invalid data format: {message}")]
    InvalidFormat { message: String },

    #[error("Data parsing error at line {line}: {message}")]
    ParseError { line: usize, message: String },

    #[error("Label column {label} not found in dataset {dataset}")]
    LabelNotFound { dataset: String, label: String },

    #[error("Label column {label} in dataset {dataset} is not nominal")]
    LabelNotNominal { dataset: String, label: String },

    #[error("Feature column {column} in dataset {dataset} is not numeric")]
    UnsupportedFeature { dataset: String, column: String },

    #[error("Column {column} in dataset {dataset} has {count} missing values")]
    MissingValues {
        dataset: String,
        column: String,
        count: usize,
    },

    #[error("Insufficient data: {message}")]
    InsufficientData { message: String },

    #[error("Dataset cache error: {message}")]
    Cache { message: String },
}

impl DataError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, DataError::Download { .. })
    }
}

/// Classifier fitting and scoring errors
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Invalid hyperparameter {name}: {message}")]
    InvalidHyperparameter { name: String, message: String },

    #[error("Solver {solver} does not support penalty {penalty}")]
    IncompatibleSolver { solver: String, penalty: String },

    #[error("Shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },

    #[error("Invalid training input: {message}")]
    InvalidInput { message: String },

    #[error("Model has not been fitted")]
    NotFitted,

    #[error("Numerical failure: {message}")]
    NumericalFailure { message: String },

    #[error("Only one class present in y_true; ROC AUC is undefined")]
    SingleClass,
}

impl ModelError {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ModelError::InvalidHyperparameter { .. }
                | ModelError::IncompatibleSolver { .. }
                | ModelError::NumericalFailure { .. }
        )
    }
}

/// Search orchestration errors
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Unknown hyperparameter family: {name}")]
    UnknownFamily { name: String },

    #[error("Parameter {parameter} in family {family} has no candidate values")]
    EmptyCandidates { family: String, parameter: String },

    #[error("Family {family} recorded no trials")]
    NoTrials { family: String },

    #[error("Trial {trial} of family {family} failed {attempts} times in a row, last error: {last_error}")]
    RetriesExhausted {
        family: String,
        trial: usize,
        attempts: usize,
        last_error: String,
    },
}

/// Result type alias for HParamSweep operations
pub type HpResult<T> = Result<T, HpError>;

/// Macro for creating internal errors
#[macro_export]
macro_rules! internal_error {
    ($($arg:tt)*) => {
        $crate::HpError::Internal(format!($($arg)*))
    };
}

/// Macro for creating configuration errors
#[macro_export]
macro_rules! config_error {
    ($($arg:tt)*) => {
        $crate::HpError::Config(format!($($arg)*))
    };
}
