use serde::{Deserialize, Serialize};

/// JSON envelope returned by every HTTP endpoint.
///
/// Successful calls carry `data`; failures carry `error` and, when there is
/// something more specific to say, `message`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            data: Some(data),
            error: None,
            message: None,
        }
    }

    pub fn error(error: impl Into<String>) -> Self {
        Self {
            data: None,
            error: Some(error.into()),
            message: None,
        }
    }

    pub fn error_with_message(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            data: None,
            error: Some(error.into()),
            message: Some(message.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}
