//! Main test runner: reset/seed fixture, Playwright run, checks, report

use std::collections::{BTreeMap, VecDeque};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::backend::{wait_until_reachable, BackendClient, CleanBackend};
use crate::blog::blog_suite;
use crate::config::{HarnessConfig, Target};
use crate::error::{E2eError, E2eResult, FailureKind};
use crate::playwright::{PlaywrightConfig, PlaywrightHandle, ScriptOutcome};
use crate::scenario::Scenario;
use crate::step::Step;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Passed,
    Failed { kind: FailureKind, message: String },
}

/// Result of running a single scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    pub name: String,
    pub outcome: Outcome,
    pub frontend_url: String,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub steps: Vec<String>,
    pub collected: BTreeMap<String, Vec<String>>,

    /// Page text when the failing step gave up
    pub last_state: Option<String>,

    pub screenshot_path: Option<PathBuf>,
}

impl TestResult {
    pub fn success(&self) -> bool {
        self.outcome == Outcome::Passed
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match &self.outcome {
            Outcome::Passed => None,
            Outcome::Failed { kind, .. } => Some(*kind),
        }
    }
}

/// Result of running all tests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSuiteResult {
    pub total: usize,
    pub passed: usize,

    /// Assertion failures: the product misbehaved
    pub failed: usize,

    /// Infrastructure failures: the scenario never got a fair run
    pub broken: usize,

    pub timed_out: usize,
    pub duration_ms: u64,
    pub seed: u64,
    pub results: Vec<TestResult>,
}

impl TestSuiteResult {
    pub fn from_results(results: Vec<TestResult>, seed: u64, duration_ms: u64) -> Self {
        let count = |kind: FailureKind| results.iter().filter(|r| r.failure_kind() == Some(kind)).count();
        Self {
            total: results.len(),
            passed: results.iter().filter(|r| r.success()).count(),
            failed: count(FailureKind::Assertion),
            broken: count(FailureKind::Infrastructure),
            timed_out: count(FailureKind::Timeout),
            duration_ms,
            seed,
            results,
        }
    }

    pub fn all_passed(&self) -> bool {
        self.passed == self.total
    }
}

/// Main E2E test runner
#[derive(Clone)]
pub struct TestRunner {
    config: Arc<HarnessConfig>,
    seed: u64,
}

impl TestRunner {
    /// Create a test runner with custom configuration
    pub fn with_config(config: HarnessConfig) -> Self {
        let seed = config.seed.unwrap_or_else(rand::random);
        info!("Test data seed: {} (set BLOG_E2E_SEED to reproduce)", seed);
        Self {
            config: Arc::new(config),
            seed,
        }
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// The blog scenarios for this run's seed
    pub fn scenarios(&self) -> E2eResult<Vec<Scenario>> {
        blog_suite(&self.config, self.seed)
    }

    /// Wait until every frontend and backend answers
    pub async fn check_targets(&self) -> E2eResult<()> {
        let timeout = Duration::from_millis(self.config.reachability_timeout_ms);
        for target in self.config.targets() {
            wait_until_reachable(&target.backend_url, timeout).await?;
            wait_until_reachable(&target.frontend_url, timeout).await?;
        }
        Ok(())
    }

    /// Run every scenario
    pub async fn run_all(&self) -> E2eResult<TestSuiteResult> {
        self.run_scenarios(self.scenarios()?).await
    }

    /// Run scenarios carrying a tag
    pub async fn run_tagged(&self, tag: &str) -> E2eResult<TestSuiteResult> {
        let filtered = self.scenarios()?.into_iter().filter(|s| s.has_tag(tag)).collect();
        self.run_scenarios(filtered).await
    }

    /// Run one scenario by name
    pub async fn run_named(&self, name: &str) -> E2eResult<TestSuiteResult> {
        let scenario = self
            .scenarios()?
            .into_iter()
            .find(|s| s.name == name)
            .ok_or_else(|| E2eError::Config(format!("Scenario not found: {}", name)))?;
        self.run_scenarios(vec![scenario]).await
    }

    /// Run scenarios with one worker per target.
    ///
    /// A worker owns its backend for the whole run, so no two scenarios ever
    /// reset or read the same backend at once.
    pub async fn run_scenarios(&self, scenarios: Vec<Scenario>) -> E2eResult<TestSuiteResult> {
        let start = Instant::now();
        let targets = self.config.targets();

        info!(
            "Running {} scenario(s) on {} target(s)...",
            scenarios.len(),
            targets.len()
        );

        let queue: Arc<Mutex<VecDeque<(usize, Scenario)>>> =
            Arc::new(Mutex::new(scenarios.into_iter().enumerate().collect()));

        let mut workers = JoinSet::new();
        for target in targets {
            let runner = self.clone();
            let queue = Arc::clone(&queue);
            workers.spawn(async move {
                let mut done = Vec::new();
                loop {
                    let next = queue.lock().pop_front();
                    let Some((index, scenario)) = next else { break };
                    done.push((index, runner.run_scenario(&scenario, &target).await));
                }
                done
            });
        }

        let mut indexed = Vec::new();
        while let Some(joined) = workers.join_next().await {
            indexed.extend(joined.map_err(|e| E2eError::Worker(e.to_string()))?);
        }
        indexed.sort_by_key(|(index, _)| *index);

        let results: Vec<TestResult> = indexed.into_iter().map(|(_, result)| result).collect();
        let suite = TestSuiteResult::from_results(results, self.seed, start.elapsed().as_millis() as u64);

        info!("");
        info!(
            "Test Results: {} passed, {} failed, {} broken, {} timed out ({} ms, seed {})",
            suite.passed, suite.failed, suite.broken, suite.timed_out, suite.duration_ms, suite.seed
        );

        Ok(suite)
    }

    /// Run a single scenario against one target.
    ///
    /// Never returns an error: every failure ends up in the result, tagged
    /// with its kind.
    pub async fn run_scenario(&self, scenario: &Scenario, target: &Target) -> TestResult {
        let started_at = Utc::now();
        let start = Instant::now();
        debug!("Running scenario: {}", scenario.name);

        let mut steps = vec![Step::goto("/")];
        steps.extend(scenario.steps.iter().cloned());

        let mut result = TestResult {
            name: scenario.name.clone(),
            outcome: Outcome::Passed,
            frontend_url: target.frontend_url.clone(),
            started_at,
            duration_ms: 0,
            steps: steps.iter().map(Step::name).collect(),
            collected: BTreeMap::new(),
            last_state: None,
            screenshot_path: None,
        };

        let failure = match self.acquire(scenario, target).await {
            Ok(fixture) => {
                let failure = match self.drive(&scenario.name, &steps, target).await {
                    Ok(outcome) => self.judge(scenario, outcome, &mut result),
                    Err(e) => Some(e),
                };

                // Whatever happened above, leave the backend clean
                if let Err(e) = fixture.release().await {
                    warn!("Reset after '{}' failed: {}", scenario.name, e);
                }
                failure
            }
            Err(e) => Some(e),
        };

        result.duration_ms = start.elapsed().as_millis() as u64;

        match failure {
            None => {
                info!("✓ {} ({} ms)", result.name, result.duration_ms);
            }
            Some(e) => {
                let kind = e.kind();
                error!("✗ {} [{:?}] - {}", result.name, kind, e);
                if let Some(state) = &result.last_state {
                    debug!("Last observed page text:\n{}", state);
                }
                result.outcome = Outcome::Failed {
                    kind,
                    message: e.to_string(),
                };
            }
        }

        result
    }

    async fn acquire(&self, scenario: &Scenario, target: &Target) -> E2eResult<CleanBackend> {
        let client = BackendClient::new(&target.backend_url)?;
        CleanBackend::acquire(&client, &self.config.seed_user, &scenario.extra_users).await
    }

    async fn drive(&self, name: &str, steps: &[Step], target: &Target) -> E2eResult<ScriptOutcome> {
        wait_until_reachable(
            &target.frontend_url,
            Duration::from_millis(self.config.reachability_timeout_ms),
        )
        .await?;

        let playwright =
            PlaywrightHandle::new(PlaywrightConfig::from_harness(&self.config, &target.frontend_url))?;
        playwright.run(name, steps).await
    }

    /// Record what the script observed and decide pass or fail
    fn judge(
        &self,
        scenario: &Scenario,
        outcome: ScriptOutcome,
        result: &mut TestResult,
    ) -> Option<E2eError> {
        result.collected = outcome.collected;
        result.last_state = outcome.last_state;
        result.screenshot_path = outcome.screenshot_path;

        if outcome.failure.is_some() {
            return outcome.failure;
        }
        scenario
            .checks
            .iter()
            .find_map(|check| check.evaluate(&result.collected).err())
    }

    /// Write test results to JSON file
    pub fn write_results(&self, results: &TestSuiteResult) -> E2eResult<PathBuf> {
        std::fs::create_dir_all(&self.config.output_dir)?;

        let path = self.config.output_dir.join("test-results.json");
        let json = serde_json::to_string_pretty(results)?;
        std::fs::write(&path, json)?;

        info!("Results written to: {}", path.display());
        Ok(path)
    }
}
