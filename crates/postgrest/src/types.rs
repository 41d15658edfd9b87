//! Wire types returned by PostgREST.

use serde::Deserialize;

/// Error body PostgREST returns for a rejected request.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorResponse {
    #[serde(default)]
    pub code: Option<String>,
    pub message: String,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub hint: Option<String>,
}

impl ApiErrorResponse {
    /// `code: message (details)`, omitting what the server left out.
    pub fn describe(&self) -> String {
        let mut text = match &self.code {
            Some(code) => format!("{}: {}", code, self.message),
            None => self.message.clone(),
        };
        if let Some(details) = self.details.as_deref().filter(|d| !d.is_empty()) {
            text.push_str(&format!(" ({})", details));
        }
        if let Some(hint) = self.hint.as_deref().filter(|h| !h.is_empty()) {
            text.push_str(&format!(" hint: {}", hint));
        }
        text
    }
}
