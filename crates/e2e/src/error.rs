//! Error types for E2E testing

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error("Backend request failed: {0}")]
    Backend(String),

    #[error("Backend returned {status} for {endpoint}: {body}")]
    BackendStatus {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("{url} not reachable after {attempts} attempts")]
    Unreachable { url: String, attempts: usize },

    #[error("Page load failed at step {step}: {reason}")]
    PageLoad { step: String, reason: String },

    #[error("Playwright not found. Install with: npm i -D @playwright/test && npx playwright install")]
    PlaywrightNotFound,

    #[error("Playwright error: {0}")]
    Playwright(String),

    #[error("Step failed: {step} - {reason}")]
    StepFailed { step: String, reason: String },

    #[error("Assertion failed: {0}")]
    AssertionFailed(String),

    #[error("Timeout waiting for: {0}")]
    Timeout(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Runner worker failed: {0}")]
    Worker(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// How a failed scenario is reported.
///
/// Infrastructure failures mean the scenario never got a fair run (backend
/// reset failed, page unreachable, browser tooling missing). They are kept
/// apart from assertion failures, which point at the product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Infrastructure,
    Assertion,
    Timeout,
}

impl E2eError {
    pub fn kind(&self) -> FailureKind {
        match self {
            E2eError::StepFailed { .. } | E2eError::AssertionFailed(_) => FailureKind::Assertion,
            E2eError::Timeout(_) => FailureKind::Timeout,
            _ => FailureKind::Infrastructure,
        }
    }
}

pub type E2eResult<T> = Result<T, E2eError>;
