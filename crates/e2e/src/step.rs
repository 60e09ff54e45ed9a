//! Declarative scenario steps

use serde::{Deserialize, Serialize};

use crate::locator::Locator;

/// Text to look for inside an element
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum TextPattern {
    Literal(String),
    /// JavaScript regular expression source
    Regex(String),
}

/// A single step in a scenario.
///
/// Every wait is a condition poll bounded by the configured expectation
/// timeout. There is no fixed-delay step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    /// Navigate to a path relative to the frontend base URL
    Goto { path: String },

    Reload,

    Click { locator: Locator },

    Fill { locator: Locator, value: String },

    /// Click the first match until nothing matches, at most `max` times.
    /// Each click waits for the match count to drop before the next one.
    ClickUntilGone { locator: Locator, max: usize },

    ExpectVisible { locator: Locator },

    ExpectHidden { locator: Locator },

    ExpectCount { locator: Locator, count: usize },

    ExpectContainsText { locator: Locator, pattern: TextPattern },

    /// Record the inner text of every match under `label`
    Collect { label: String, locator: Locator },

    Log { message: String },
}

impl Step {
    pub fn goto(path: &str) -> Self {
        Step::Goto { path: path.to_string() }
    }

    pub fn click(locator: Locator) -> Self {
        Step::Click { locator }
    }

    pub fn fill(locator: Locator, value: &str) -> Self {
        Step::Fill {
            locator,
            value: value.to_string(),
        }
    }

    pub fn expect_visible(locator: Locator) -> Self {
        Step::ExpectVisible { locator }
    }

    pub fn expect_hidden(locator: Locator) -> Self {
        Step::ExpectHidden { locator }
    }

    pub fn collect(label: &str, locator: Locator) -> Self {
        Step::Collect {
            label: label.to_string(),
            locator,
        }
    }

    /// Whether a failure here means the page itself could not be loaded
    pub fn is_navigation(&self) -> bool {
        matches!(self, Step::Goto { .. } | Step::Reload)
    }

    /// Short name for logs and results
    pub fn name(&self) -> String {
        match self {
            Step::Goto { path } => format!("goto:{}", path),
            Step::Reload => "reload".to_string(),
            Step::Click { locator } => format!("click:{}", locator),
            Step::Fill { locator, .. } => format!("fill:{}", locator),
            Step::ClickUntilGone { locator, .. } => format!("click-all:{}", locator),
            Step::ExpectVisible { locator } => format!("expect-visible:{}", locator),
            Step::ExpectHidden { locator } => format!("expect-hidden:{}", locator),
            Step::ExpectCount { locator, count } => format!("expect-count:{}={}", locator, count),
            Step::ExpectContainsText { locator, .. } => format!("expect-text:{}", locator),
            Step::Collect { label, .. } => format!("collect:{}", label),
            Step::Log { message } => {
                format!("log:{}", message.chars().take(30).collect::<String>())
            }
        }
    }
}
