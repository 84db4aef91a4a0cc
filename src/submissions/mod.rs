//! Result submissions: validation gate and downstream processing

pub mod processor;
pub mod validator;

pub use processor::{document_groups, FileResultProcessor, ProcessError, ResultProcessor};
pub use validator::{
    validate_batch, validate_single, SingleFileForm, ValidSingleSubmission, ValidationError,
};
