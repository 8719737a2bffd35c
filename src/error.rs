// Error taxonomy for the booking widget

use thiserror::Error;

// Failures raised by the API client itself
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    // Transport failure (DNS, timeout, reset) or a body that is not JSON
    #[error("Network error: {0}")]
    NetworkError(String),
}

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Initialization error: {0}")]
    InitError(String),
}

// Local form gate, never reaches the network layer
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please enter your name")]
    MissingName,

    #[error("Please enter your email address")]
    MissingEmail,

    #[error("Please enter a valid email address")]
    InvalidEmail,
}

/// Classified outcome of a failed availability load or booking submission.
///
/// The `Display` text is diagnostic and goes to the log; users only ever see
/// the message returned by [`BookingError::user_message`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BookingError {
    #[error(transparent)]
    Network(#[from] ApiError),

    // Well-formed response that explicitly signals failure
    #[error("Backend rejected request: {}", .0.as_deref().unwrap_or("<no message>"))]
    Backend(Option<String>),

    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),
}

impl BookingError {
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            BookingError::Backend(Some(message)) => message.clone(),
            BookingError::Validation(err) => err.to_string(),
            BookingError::Network(_) | BookingError::Backend(None) => fallback.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_detail_is_not_user_facing() {
        let err = BookingError::from(ApiError::NetworkError(
            "error sending request: connection reset".to_string(),
        ));
        assert_eq!(err.user_message("Booking failed"), "Booking failed");
        assert!(err.to_string().contains("connection reset"));
    }

    #[test]
    fn test_backend_message_is_forwarded() {
        let err = BookingError::Backend(Some("slot taken".to_string()));
        assert_eq!(err.user_message("Booking failed"), "slot taken");

        let err = BookingError::Backend(None);
        assert_eq!(err.user_message("Booking failed"), "Booking failed");
    }
}
