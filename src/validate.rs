//! Input validation for chat requests.
//!
//! [`validate_request`] turns a raw request body into the query string to
//! answer, or a [`ValidationError`] describing why the request was rejected.
//! Checks run in a fixed order and stop at the first failure, so expensive
//! work (embedding, model calls) never starts for a rejected request.

use serde_json::Value;
use thiserror::Error;

use crate::config::ValidationConfig;
use crate::models::ChatMessage;

/// Message returned when the input matches a prompt-injection pattern.
pub const SUSPICIOUS_INPUT_MESSAGE: &str = "Your question appears to be asking about system internals. Please ask about Brooklyn College Computer Science Club instead.";

/// Why a request was rejected. The `Display` text is safe to show clients.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Invalid request format")]
    InvalidFormat,
    #[error("Invalid message format")]
    InvalidMessageFormat,
    #[error("Content must be a string")]
    InvalidContentType,
    #[error("Input exceeds maximum length of {max} characters")]
    InputTooLong { max: usize },
    #[error("Input cannot be empty")]
    EmptyInput,
    #[error("{}", SUSPICIOUS_INPUT_MESSAGE)]
    SuspiciousInput,
}

impl ValidationError {
    /// Machine-readable error kind.
    pub fn code(&self) -> &'static str {
        match self {
            ValidationError::InvalidFormat => "invalid_format",
            ValidationError::InvalidMessageFormat => "invalid_message_format",
            ValidationError::InvalidContentType => "invalid_content_type",
            ValidationError::InputTooLong { .. } => "input_too_long",
            ValidationError::EmptyInput => "empty_input",
            ValidationError::SuspiciousInput => "suspicious_input",
        }
    }
}

/// Validation limits, built once from [`ValidationConfig`].
///
/// Deny-list patterns are lowercased up front so matching is a plain
/// substring search against the lowercased input.
#[derive(Debug, Clone)]
pub struct ValidationPolicy {
    max_input_chars: usize,
    suspicious_patterns: Vec<String>,
}

impl ValidationPolicy {
    pub fn new(max_input_chars: usize, patterns: &[String]) -> Self {
        Self {
            max_input_chars,
            suspicious_patterns: patterns
                .iter()
                .map(|p| p.to_lowercase())
                .filter(|p| !p.is_empty())
                .collect(),
        }
    }

    pub fn from_config(config: &ValidationConfig) -> Self {
        Self::new(config.max_input_chars, &config.suspicious_patterns)
    }

    pub fn max_input_chars(&self) -> usize {
        self.max_input_chars
    }

    fn is_suspicious(&self, content: &str) -> bool {
        let lowered = content.to_lowercase();
        self.suspicious_patterns
            .iter()
            .any(|pattern| lowered.contains(pattern.as_str()))
    }
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self::from_config(&ValidationConfig::default())
    }
}

/// Validate a chat request body and extract the last message's content.
///
/// Only the last message is consulted. The returned string is the content
/// exactly as sent (not trimmed).
pub fn validate_request(body: &Value, policy: &ValidationPolicy) -> Result<String, ValidationError> {
    let messages = match body.as_array() {
        Some(messages) if !messages.is_empty() => messages,
        _ => return Err(ValidationError::InvalidFormat),
    };

    let last = messages.last().ok_or(ValidationError::InvalidFormat)?;
    if !last.is_object() {
        return Err(ValidationError::InvalidMessageFormat);
    }
    let message: ChatMessage = serde_json::from_value(last.clone())
        .map_err(|_| ValidationError::InvalidMessageFormat)?;

    let content = match message.content {
        Value::String(content) => content,
        _ => return Err(ValidationError::InvalidContentType),
    };

    if content.chars().count() > policy.max_input_chars {
        return Err(ValidationError::InputTooLong {
            max: policy.max_input_chars,
        });
    }

    if content.trim().is_empty() {
        return Err(ValidationError::EmptyInput);
    }

    if policy.is_suspicious(&content) {
        return Err(ValidationError::SuspiciousInput);
    }

    Ok(content)
}
