use std::path::{Path, PathBuf};

use thiserror::Error;

// ---------------------------------------------------------------------------
// Error taxonomy
// ---------------------------------------------------------------------------

/// Every failure of a run is one of these; none of them is recoverable.
#[derive(Debug, Error)]
pub enum ChartError {
    /// A required file, row, column or variant is absent.
    #[error("missing input: {0}")]
    MissingInput(String),

    /// A cell that should hold a percentage does not.
    #[error("malformed data in {location}: {detail}")]
    MalformedData { location: String, detail: String },

    /// Reading an input or writing the output image failed.
    #[error("I/O error on {}: {detail}", path.display())]
    FatalIo { path: PathBuf, detail: String },

    /// The startup check found the environment unusable.
    #[error("precondition failed: {0}")]
    Precondition(String),
}

impl ChartError {
    pub fn missing(what: impl Into<String>) -> Self {
        ChartError::MissingInput(what.into())
    }

    pub fn malformed(location: impl Into<String>, detail: impl Into<String>) -> Self {
        ChartError::MalformedData {
            location: location.into(),
            detail: detail.into(),
        }
    }

    pub fn io(path: &Path, detail: impl ToString) -> Self {
        ChartError::FatalIo {
            path: path.to_path_buf(),
            detail: detail.to_string(),
        }
    }

    /// Process exit status for this kind of failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            ChartError::MissingInput(_) => 2,
            ChartError::MalformedData { .. } => 3,
            ChartError::FatalIo { .. } => 4,
            ChartError::Precondition(_) => 5,
        }
    }
}

pub type ChartResult<T> = std::result::Result<T, ChartError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_are_distinct_and_nonzero() {
        let codes = [
            ChartError::missing("x").exit_code(),
            ChartError::malformed("a", "b").exit_code(),
            ChartError::io(Path::new("out.png"), "denied").exit_code(),
            ChartError::Precondition("no font".into()).exit_code(),
        ];
        for (i, a) in codes.iter().enumerate() {
            assert_ne!(*a, 0);
            for b in &codes[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn messages_name_the_location() {
        let err = ChartError::malformed("early_late_var16.csv, DE MiniSeq, early", "'abc' is not a number");
        let msg = err.to_string();
        assert!(msg.contains("early_late_var16.csv"));
        assert!(msg.contains("'abc'"));
    }
}
