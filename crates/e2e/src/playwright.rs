//! Playwright browser automation
//!
//! A scenario is compiled into one CommonJS script and run with `node`, so
//! every scenario gets its own browser and context. The script reports back
//! over stdout as JSON lines (see [`ScriptEvent`]).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;
use serde::Deserialize;
use tokio::process::Command as TokioCommand;
use tracing::{debug, info, warn};

use crate::config::{Browser, HarnessConfig, Viewport};
use crate::error::{E2eError, E2eResult};
use crate::locator::js_str;
use crate::step::{Step, TextPattern};

/// Page text kept from the moment of failure
pub const LAST_STATE_LIMIT: usize = 2000;

/// Configuration for Playwright
#[derive(Debug, Clone)]
pub struct PlaywrightConfig {
    pub base_url: String,
    pub screenshot_dir: PathBuf,
    pub node_project_dir: PathBuf,
    pub viewport: Viewport,
    pub browser: Browser,
    pub headless: bool,
    pub expect_timeout_ms: u64,
    pub scenario_timeout: Duration,
}

impl PlaywrightConfig {
    pub fn from_harness(config: &HarnessConfig, frontend_url: &str) -> Self {
        Self {
            base_url: frontend_url.to_string(),
            screenshot_dir: config.output_dir.join("screenshots"),
            node_project_dir: config.node_project_dir.clone(),
            viewport: config.viewport,
            browser: config.browser,
            headless: config.headless,
            expect_timeout_ms: config.expect_timeout_ms,
            scenario_timeout: Duration::from_millis(config.scenario_timeout_ms),
        }
    }
}

impl Default for PlaywrightConfig {
    fn default() -> Self {
        Self::from_harness(&HarnessConfig::default(), "http://localhost:5173")
    }
}

/// Events printed by the generated script
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ScriptEvent {
    Collect { label: String, values: Vec<String> },
    Log { message: String },
    Done,
    Failed {
        step: i64,
        error: String,
        #[serde(default)]
        last_state: Option<String>,
    },
}

/// What a scenario script run produced
#[derive(Debug, Default)]
pub struct ScriptOutcome {
    /// Values recorded by `Collect` steps, by label
    pub collected: BTreeMap<String, Vec<String>>,

    /// Set when a step failed
    pub failure: Option<E2eError>,

    /// Page text at the moment of failure
    pub last_state: Option<String>,

    pub screenshot_path: Option<PathBuf>,
}

/// Playwright browser handle
pub struct PlaywrightHandle {
    config: PlaywrightConfig,
}

impl PlaywrightHandle {
    /// Create a new Playwright handle
    pub fn new(config: PlaywrightConfig) -> E2eResult<Self> {
        Self::check_playwright_installed(&config.node_project_dir)?;
        std::fs::create_dir_all(&config.screenshot_dir)?;
        Ok(Self::from_config(config))
    }

    pub(crate) fn from_config(config: PlaywrightConfig) -> Self {
        Self { config }
    }

    /// Check that node can resolve `@playwright/test` from the project dir
    fn check_playwright_installed(project_dir: &Path) -> E2eResult<()> {
        let status = Command::new("node")
            .args(["-e", "require.resolve('@playwright/test')"])
            .current_dir(project_dir)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match status {
            Ok(status) if status.success() => Ok(()),
            _ => Err(E2eError::PlaywrightNotFound),
        }
    }

    fn screenshot_path(&self, scenario: &str) -> PathBuf {
        let file: String = scenario
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.config.screenshot_dir.join(format!("{}.png", file))
    }

    /// Build the Playwright script for a scenario
    pub fn build_script(&self, scenario: &str, steps: &[Step]) -> String {
        let mut script = String::new();

        // Header
        script.push_str(&format!(
            r#"const {{ chromium, firefox, webkit, expect }} = require('@playwright/test');

const emit = (event) => console.log(JSON.stringify(event));
const check = expect.configure({{ timeout: {timeout} }});

(async () => {{
  const browser = await {browser}.launch({{ headless: {headless} }});
  const context = await browser.newContext({{
    baseURL: {base_url},
    viewport: {{ width: {width}, height: {height} }}
  }});
  context.setDefaultTimeout({timeout});
  const page = await context.newPage();
  page.on('dialog', (dialog) => dialog.accept());
  let current = -1;

  try {{
"#,
            timeout = self.config.expect_timeout_ms,
            browser = self.config.browser.as_str(),
            headless = self.config.headless,
            base_url = js_str(&self.config.base_url),
            width = self.config.viewport.width,
            height = self.config.viewport.height,
        ));

        for (i, step) in steps.iter().enumerate() {
            script.push_str(&format!("\n    // Step {}: {}\n", i + 1, step.name().replace('\n', " ")));
            script.push_str(&format!("    current = {};\n", i));
            script.push_str(&step_to_js(step));
            script.push('\n');
        }

        // Footer
        script.push_str(&format!(
            r#"
    emit({{ event: 'done' }});
  }} catch (error) {{
    let lastState = null;
    try {{
      lastState = (await page.locator('body').innerText({{ timeout: 1000 }})).slice(0, {limit});
    }} catch (_) {{}}
    try {{
      await page.screenshot({{ path: {screenshot}, fullPage: true }});
    }} catch (_) {{}}
    emit({{
      event: 'failed',
      step: current,
      error: String((error && error.message) || error),
      last_state: lastState
    }});
    process.exitCode = 1;
  }} finally {{
    await context.close();
    await browser.close();
  }}
}})();
"#,
            limit = LAST_STATE_LIMIT,
            screenshot = js_str(&self.screenshot_path(scenario).to_string_lossy()),
        ));

        script
    }

    /// Run a scenario's steps in a fresh browser context
    pub async fn run(&self, scenario: &str, steps: &[Step]) -> E2eResult<ScriptOutcome> {
        let script = self.build_script(scenario, steps);

        // Inside the node project so `require` finds @playwright/test
        let temp_dir = tempfile::Builder::new()
            .prefix(".blog-e2e-")
            .tempdir_in(&self.config.node_project_dir)?;
        let script_path = temp_dir.path().join("scenario.cjs");
        std::fs::write(&script_path, &script)?;

        debug!("Running Playwright script: {}", script_path.display());

        let mut cmd = TokioCommand::new("node");
        cmd.arg(&script_path)
            .current_dir(&self.config.node_project_dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.config.scenario_timeout, cmd.output()).await {
            Ok(output) => output?,
            Err(_) => {
                return Err(E2eError::Timeout(format!(
                    "scenario '{}' exceeded {} ms",
                    scenario,
                    self.config.scenario_timeout.as_millis()
                )))
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let mut outcome = settle(&stdout, &stderr, &output.status.to_string(), steps)?;

        if outcome.failure.is_some() {
            let path = self.screenshot_path(scenario);
            if path.exists() {
                outcome.screenshot_path = Some(path);
            }
        }

        Ok(outcome)
    }
}

/// Convert a step to JavaScript code
fn step_to_js(step: &Step) -> String {
    match step {
        Step::Goto { path } => format!("    await page.goto({});", js_str(path)),
        Step::Reload => "    await page.reload();".to_string(),
        Step::Click { locator } => format!("    await {}.click();", locator.to_js()),
        Step::Fill { locator, value } => {
            format!("    await {}.fill({});", locator.to_js(), js_str(value))
        }
        Step::ClickUntilGone { locator, max } => format!(
            r#"    {{
      const target = {};
      for (let i = 0; i < {}; i++) {{
        const remaining = await target.count();
        if (remaining === 0) break;
        await target.first().click();
        await check(target).toHaveCount(remaining - 1);
      }}
      await check(target).toHaveCount(0);
    }}"#,
            locator.to_js(),
            max
        ),
        Step::ExpectVisible { locator } => {
            format!("    await check({}).toBeVisible();", locator.to_js())
        }
        Step::ExpectHidden { locator } => {
            format!("    await check({}).toBeHidden();", locator.to_js())
        }
        Step::ExpectCount { locator, count } => {
            format!("    await check({}).toHaveCount({});", locator.to_js(), count)
        }
        Step::ExpectContainsText { locator, pattern } => {
            let expected = match pattern {
                TextPattern::Literal(text) => js_str(text),
                TextPattern::Regex(source) => format!("new RegExp({})", js_str(source)),
            };
            format!("    await check({}).toContainText({});", locator.to_js(), expected)
        }
        Step::Collect { label, locator } => format!(
            "    emit({{ event: 'collect', label: {}, values: await {}.allInnerTexts() }});",
            js_str(label),
            locator.to_js()
        ),
        Step::Log { message } => {
            format!("    emit({{ event: 'log', message: {} }});", js_str(message))
        }
    }
}

/// Parse the JSON-line events from script stdout, skipping anything else
pub fn parse_events(stdout: &str) -> Vec<ScriptEvent> {
    stdout
        .lines()
        .map(str::trim)
        .filter_map(|line| {
            if !line.starts_with('{') {
                if !line.is_empty() {
                    debug!("[node] {}", line);
                }
                return None;
            }
            match serde_json::from_str(line) {
                Ok(event) => Some(event),
                Err(e) => {
                    debug!("Ignoring unparseable script line ({}): {}", e, line);
                    None
                }
            }
        })
        .collect()
}

/// Turn the output of a finished script into an outcome.
///
/// A script that never reported a result died outside its own error
/// handling, so node's output goes into the error.
fn settle(stdout: &str, stderr: &str, status: &str, steps: &[Step]) -> E2eResult<ScriptOutcome> {
    let events = parse_events(stdout);
    let reported = events
        .iter()
        .any(|e| matches!(e, ScriptEvent::Done | ScriptEvent::Failed { .. }));

    if !reported {
        warn!("Playwright script ended without reporting a result ({})", status);
        return Err(E2eError::Playwright(format!(
            "script ended without reporting a result ({})\nstdout: {}\nstderr: {}",
            status,
            stdout.trim(),
            stderr.trim()
        )));
    }
    if !stderr.trim().is_empty() {
        debug!("[node stderr] {}", stderr.trim());
    }
    Ok(interpret_events(events, steps))
}

/// Fold script events into an outcome, classifying any failure by the step
/// it happened at.
fn interpret_events(events: Vec<ScriptEvent>, steps: &[Step]) -> ScriptOutcome {
    let mut outcome = ScriptOutcome::default();

    for event in events {
        match event {
            ScriptEvent::Collect { label, values } => {
                outcome.collected.insert(label, values);
            }
            ScriptEvent::Log { message } => info!("[TEST LOG] {}", message),
            ScriptEvent::Done => {}
            ScriptEvent::Failed { step, error, last_state } => {
                let step = usize::try_from(step).ok().and_then(|i| steps.get(i));
                let step_name = step.map(Step::name).unwrap_or_else(|| "setup".to_string());

                outcome.failure = Some(match step {
                    Some(s) if !s.is_navigation() => E2eError::StepFailed {
                        step: step_name,
                        reason: error,
                    },
                    // Browser launch or page load never got the scenario going
                    _ => E2eError::PageLoad {
                        step: step_name,
                        reason: error,
                    },
                });
                outcome.last_state = last_state;
            }
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;
    use crate::locator::Locator;

    fn handle() -> PlaywrightHandle {
        PlaywrightHandle::from_config(PlaywrightConfig::default())
    }

    #[test]
    fn test_script_structure() {
        let steps = vec![
            Step::goto("/"),
            Step::click(Locator::button("login")),
            Step::fill(Locator::test_id("username"), "berkan"),
        ];
        let script = handle().build_script("login flow", &steps);

        assert!(script.contains("require('@playwright/test')"));
        assert!(script.contains("chromium.launch({ headless: true })"));
        assert!(script.contains(r#"baseURL: "http://localhost:5173""#));
        assert!(script.contains("current = 2;"));
        assert!(script.contains(r#"await page.getByTestId("username").fill("berkan");"#));
        assert!(script.contains("login_flow.png"));
        assert!(!script.contains("waitForTimeout"));
    }

    #[test]
    fn test_fill_value_is_not_trimmed() {
        let js = step_to_js(&Step::fill(Locator::test_id("blog-url"), "https://x.test \n"));
        assert_eq!(js, r#"    await page.getByTestId("blog-url").fill("https://x.test \n");"#);
    }

    #[test]
    fn test_regex_text_pattern() {
        let js = step_to_js(&Step::ExpectContainsText {
            locator: Locator::test_id("blog"),
            pattern: TextPattern::Regex(r"\blikes 2\b".to_string()),
        });
        assert_eq!(
            js,
            r#"    await check(page.getByTestId("blog")).toContainText(new RegExp("\\blikes 2\\b"));"#
        );
    }

    #[test]
    fn test_parse_events_skips_noise() {
        let stdout = r#"
[browser] something
{"event":"collect","label":"likes","values":["likes 3","likes 1"]}
{"event":"log","message":"hello"}
{not json
{"event":"done"}
"#;
        let events = parse_events(stdout);
        assert_eq!(events.len(), 3);
        assert_eq!(
            events[0],
            ScriptEvent::Collect {
                label: "likes".to_string(),
                values: vec!["likes 3".to_string(), "likes 1".to_string()],
            }
        );
        assert_eq!(events[2], ScriptEvent::Done);
    }

    #[test]
    fn test_failure_on_expectation_is_assertion() {
        let steps = vec![Step::goto("/"), Step::expect_visible(Locator::text("berkan logged in"))];
        let events = parse_events(
            r#"{"event":"failed","step":1,"error":"Timed out 5000ms","last_state":"Blogs\nlogin"}"#,
        );
        let outcome = interpret_events(events, &steps);
        let failure = outcome.failure.unwrap();
        assert_eq!(failure.kind(), FailureKind::Assertion);
        assert!(failure.to_string().contains("berkan logged in"));
        assert_eq!(outcome.last_state.as_deref(), Some("Blogs\nlogin"));
    }

    #[test]
    fn test_failure_on_goto_is_infrastructure() {
        let steps = vec![Step::goto("/")];
        let events = parse_events(
            r#"{"event":"failed","step":0,"error":"net::ERR_CONNECTION_REFUSED","last_state":null}"#,
        );
        let outcome = interpret_events(events, &steps);
        assert_eq!(outcome.failure.unwrap().kind(), FailureKind::Infrastructure);
    }

    #[test]
    fn test_failure_before_first_step_is_infrastructure() {
        let events = parse_events(r#"{"event":"failed","step":-1,"error":"launch failed"}"#);
        let outcome = interpret_events(events, &[Step::goto("/")]);
        assert!(matches!(outcome.failure, Some(E2eError::PageLoad { .. })));
    }

    #[test]
    fn test_missing_result_keeps_node_output() {
        let err = settle(
            "",
            "Error: Cannot find module '@playwright/test'\nRequire stack:",
            "exit status: 1",
            &[Step::goto("/")],
        )
        .unwrap_err();

        assert_eq!(err.kind(), FailureKind::Infrastructure);
        let message = err.to_string();
        assert!(message.contains("exit status: 1"), "{}", message);
        assert!(message.contains("Cannot find module"), "{}", message);
    }

    #[test]
    fn test_reported_failure_with_nonzero_exit() {
        let outcome = settle(
            r#"{"event":"failed","step":0,"error":"net::ERR_CONNECTION_REFUSED"}"#,
            "",
            "exit status: 1",
            &[Step::goto("/")],
        )
        .unwrap();
        assert_eq!(outcome.failure.unwrap().kind(), FailureKind::Infrastructure);
    }

    #[test]
    fn test_click_until_gone_waits_for_each_click() {
        let js = step_to_js(&Step::ClickUntilGone {
            locator: Locator::test_id("blog").within(Locator::button("view")),
            max: 3,
        });
        assert!(js.contains("i < 3"));
        assert!(js.contains("await check(target).toHaveCount(remaining - 1);"));
        assert!(js.contains("await check(target).toHaveCount(0);"));
        assert!(!js.contains("waitForTimeout"));
    }

    fn node_available() -> bool {
        Command::new("node")
            .arg("--version")
            .stdout(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    #[tokio::test]
    async fn test_unresolvable_playwright_reports_stderr() {
        if !node_available() {
            eprintln!("Skipping: node not installed");
            return;
        }
        let project = tempfile::tempdir().unwrap();
        let handle = PlaywrightHandle::from_config(PlaywrightConfig {
            node_project_dir: project.path().to_path_buf(),
            screenshot_dir: project.path().join("screenshots"),
            ..Default::default()
        });

        let steps = vec![Step::goto("/"), Step::expect_visible(Locator::text("Blogs"))];
        let err = handle.run("no_playwright", &steps).await.unwrap_err();

        assert_eq!(err.kind(), FailureKind::Infrastructure);
        assert!(err.to_string().contains("Cannot find module"), "{}", err);
    }
}
