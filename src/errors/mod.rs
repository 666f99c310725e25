//! Error classification and structured error responses

pub mod api_error;
pub mod classifier;
pub mod codes;
pub mod response;

pub use api_error::{ApiError, PendingError};
pub use classifier::{classify, log_classification, ClassifiedError, RequestContext};
pub use codes::ErrorKind;
pub use response::{ApiResponse, ErrorBody, ErrorEnvelope, Pagination};
