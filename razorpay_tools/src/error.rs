use thiserror::Error;

#[derive(Debug, Error)]
pub enum RazorpayApiError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("The request could not be completed: {0}")]
    RequestFailed(String),
    #[error("The request timed out")]
    Timeout,
    #[error("Could not deserialize JSON: {0}")]
    JsonError(String),
    #[error("Query failed. Error {status}. {message}")]
    QueryError { status: u16, message: String },
}

impl RazorpayApiError {
    /// True if the gateway answered, but refused the request.
    pub fn is_rejection(&self) -> bool {
        matches!(self, RazorpayApiError::QueryError { status, .. } if *status < 500)
    }
}

impl From<reqwest::Error> for RazorpayApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            RazorpayApiError::Timeout
        } else if e.is_decode() {
            RazorpayApiError::JsonError(e.to_string())
        } else {
            RazorpayApiError::RequestFailed(e.to_string())
        }
    }
}
