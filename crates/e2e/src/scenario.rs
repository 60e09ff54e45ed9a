//! Scenarios and the checks run on what they collect

use std::collections::BTreeMap;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::backend::User;
use crate::error::{E2eError, E2eResult};
use crate::step::Step;

/// One isolated user-facing flow.
///
/// The runner resets and seeds the backend and navigates to `/` before
/// `steps` run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub description: String,
    pub tags: Vec<String>,

    /// Users seeded after the standard seed user
    pub extra_users: Vec<User>,

    pub steps: Vec<Step>,

    /// Evaluated on collected values after the script finishes
    pub checks: Vec<Check>,
}

impl Scenario {
    pub fn builder(name: &str) -> ScenarioBuilder {
        ScenarioBuilder {
            scenario: Scenario {
                name: name.to_string(),
                description: String::new(),
                tags: Vec::new(),
                extra_users: Vec::new(),
                steps: Vec::new(),
                checks: Vec::new(),
            },
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

pub struct ScenarioBuilder {
    scenario: Scenario,
}

impl ScenarioBuilder {
    pub fn description(mut self, description: &str) -> Self {
        self.scenario.description = description.to_string();
        self
    }

    pub fn tag(mut self, tag: &str) -> Self {
        self.scenario.tags.push(tag.to_string());
        self
    }

    pub fn extra_user(mut self, user: User) -> Self {
        self.scenario.extra_users.push(user);
        self
    }

    pub fn step(mut self, step: Step) -> Self {
        self.scenario.steps.push(step);
        self
    }

    pub fn steps(mut self, steps: impl IntoIterator<Item = Step>) -> Self {
        self.scenario.steps.extend(steps);
        self
    }

    pub fn check(mut self, check: Check) -> Self {
        self.scenario.checks.push(check);
        self
    }

    pub fn build(self) -> Scenario {
        self.scenario
    }
}

/// Assertion over values a `Collect` step recorded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "check", rename_all = "snake_case")]
pub enum Check {
    /// Each text yields an integer through the first capture group of
    /// `pattern`; the integers must never increase.
    NonIncreasing { label: String, pattern: String },
}

impl Check {
    pub fn label(&self) -> &str {
        match self {
            Check::NonIncreasing { label, .. } => label,
        }
    }

    pub fn evaluate(&self, collected: &BTreeMap<String, Vec<String>>) -> E2eResult<()> {
        let values = collected.get(self.label()).ok_or_else(|| {
            E2eError::AssertionFailed(format!("nothing collected under '{}'", self.label()))
        })?;

        match self {
            Check::NonIncreasing { label, pattern } => {
                let re = Regex::new(pattern)
                    .map_err(|e| E2eError::Config(format!("bad pattern {}: {}", pattern, e)))?;
                let numbers = extract_numbers(&re, values)?;

                if let Some(pos) = numbers.windows(2).position(|w| w[0] < w[1]) {
                    return Err(E2eError::AssertionFailed(format!(
                        "'{}' not in non-increasing order at position {}: {:?}",
                        label,
                        pos + 1,
                        numbers
                    )));
                }
                Ok(())
            }
        }
    }
}

fn extract_numbers(re: &Regex, values: &[String]) -> E2eResult<Vec<i64>> {
    values
        .iter()
        .map(|text| {
            re.captures(text)
                .and_then(|caps| caps.get(1).and_then(|m| m.as_str().parse().ok()))
                .ok_or_else(|| {
                    E2eError::AssertionFailed(format!("no number matching {} in {:?}", re, text))
                })
        })
        .collect()
}
