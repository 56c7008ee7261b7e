use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// The uniform body returned by the webhook endpoint. The gateway only looks at the status code, but the message
/// makes ngrok sessions and log captures readable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: message.to_string() }
    }
}
