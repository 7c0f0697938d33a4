use thiserror::Error;

/// Reasons a source table cannot be turned into a [`RentalDataset`].
///
/// [`RentalDataset`]: super::model::RentalDataset
#[derive(Debug, Error, PartialEq)]
pub enum DataError {
    #[error("unsupported file extension: .{0}")]
    UnsupportedExtension(String),

    #[error("missing column '{0}'")]
    MissingColumn(String),

    #[error("column '{column}' has type {found}, expected {expected}")]
    UnexpectedType {
        column: String,
        found: String,
        expected: &'static str,
    },

    #[error("row {row}: column '{column}' is null")]
    NullValue { row: usize, column: String },

    #[error("row {row}: '{value}' is not a valid value for column '{column}'")]
    InvalidCategory {
        row: usize,
        column: String,
        value: String,
    },
}
