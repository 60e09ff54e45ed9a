//! Harness configuration: TOML file, then environment, then CLI flags

use std::path::{Path, PathBuf};
use std::str::FromStr;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::backend::User;
use crate::error::{E2eError, E2eResult};

pub const ENV_FRONTEND_URL: &str = "BLOG_E2E_FRONTEND_URL";
pub const ENV_BACKEND_URL: &str = "BLOG_E2E_BACKEND_URL";
pub const ENV_SEED: &str = "BLOG_E2E_SEED";
pub const ENV_HEADLESS: &str = "BLOG_E2E_HEADLESS";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Browser {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl Browser {
    pub fn as_str(&self) -> &'static str {
        match self {
            Browser::Chromium => "chromium",
            Browser::Firefox => "firefox",
            Browser::Webkit => "webkit",
        }
    }
}

impl FromStr for Browser {
    type Err = E2eError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "chromium" | "chrome" => Ok(Browser::Chromium),
            "firefox" => Ok(Browser::Firefox),
            "webkit" => Ok(Browser::Webkit),
            other => Err(E2eError::Config(format!("unknown browser: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Viewport { width: 1280, height: 720 }
    }
}

/// One frontend/backend pair. Each runner worker owns exactly one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub frontend_url: String,
    pub backend_url: String,
}

/// Stable controls the application exposes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiSelectors {
    pub login_button: String,
    pub logout_button: String,
    pub username_test_id: String,
    pub password_test_id: String,
    pub new_blog_button: String,
    pub title_test_id: String,
    pub author_test_id: String,
    pub url_test_id: String,
    pub create_button: String,
    pub blog_test_id: String,
    pub view_button: String,
    pub like_button: String,
    pub remove_button: String,
}

impl Default for UiSelectors {
    fn default() -> Self {
        Self {
            login_button: "login".to_string(),
            logout_button: "logout".to_string(),
            username_test_id: "username".to_string(),
            password_test_id: "password".to_string(),
            new_blog_button: "add new blog".to_string(),
            title_test_id: "blog-title".to_string(),
            author_test_id: "blog-author".to_string(),
            url_test_id: "blog-url".to_string(),
            create_button: "Add Blog".to_string(),
            blog_test_id: "blog".to_string(),
            view_button: "view".to_string(),
            like_button: "like".to_string(),
            remove_button: "remove".to_string(),
        }
    }
}

/// Text the application renders, as templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiTexts {
    pub heading: String,
    /// `{year}` is replaced with the current year
    pub footer: String,
    /// `{title}` and `{author}`
    pub blog_added: String,
    /// `{name}`
    pub logged_in: String,
    pub login_error: String,
    /// `{n}`
    pub likes: String,
}

impl Default for UiTexts {
    fn default() -> Self {
        Self {
            heading: "Blogs".to_string(),
            footer: "Blog app, Berkan Sözer {year}".to_string(),
            blog_added: "a new blog {title} by {author} added".to_string(),
            logged_in: "{name} logged in".to_string(),
            login_error: "invalid username or password".to_string(),
            likes: "likes {n}".to_string(),
        }
    }
}

impl UiTexts {
    pub fn footer_for(&self, year: i32) -> String {
        self.footer.replace("{year}", &year.to_string())
    }

    pub fn blog_added_for(&self, title: &str, author: &str) -> String {
        self.blog_added.replace("{title}", title).replace("{author}", author)
    }

    pub fn logged_in_for(&self, name: &str) -> String {
        self.logged_in.replace("{name}", name)
    }

    pub fn likes_for(&self, n: u32) -> String {
        self.likes.replace("{n}", &n.to_string())
    }

    /// Regex with one capture group for the like count
    pub fn likes_pattern(&self) -> String {
        let mut parts = self.likes.splitn(2, "{n}");
        let before = regex::escape(parts.next().unwrap_or_default());
        let after = regex::escape(parts.next().unwrap_or_default());
        format!("{}(\\d+){}", before, after)
    }
}

/// Full harness configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    pub frontend_url: String,
    pub backend_url: String,

    /// Extra frontend/backend pairs. When non-empty these replace the pair
    /// above and the runner starts one worker per target.
    pub targets: Vec<Target>,

    pub seed_user: User,

    pub browser: Browser,
    pub headless: bool,
    pub viewport: Viewport,

    /// Ceiling for every condition wait inside a scenario
    pub expect_timeout_ms: u64,

    /// Ceiling for a whole scenario, browser launch included
    pub scenario_timeout_ms: u64,

    pub reachability_timeout_ms: u64,

    /// RNG seed for generated test data. Drawn at random and logged when unset.
    pub seed: Option<u64>,

    pub output_dir: PathBuf,

    /// Directory whose node_modules provides `@playwright/test`
    pub node_project_dir: PathBuf,

    pub selectors: UiSelectors,
    pub texts: UiTexts,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            frontend_url: "http://localhost:5173".to_string(),
            backend_url: "http://localhost:3003".to_string(),
            targets: Vec::new(),
            seed_user: User::new("Berkan Sözer", "berkan", "123456"),
            browser: Browser::Chromium,
            headless: true,
            viewport: Viewport::default(),
            expect_timeout_ms: 5000,
            scenario_timeout_ms: 60_000,
            reachability_timeout_ms: 30_000,
            seed: None,
            output_dir: PathBuf::from("test-results"),
            node_project_dir: PathBuf::from("."),
            selectors: UiSelectors::default(),
            texts: UiTexts::default(),
        }
    }
}

impl HarnessConfig {
    /// Parse from a TOML string
    pub fn from_toml(content: &str) -> E2eResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load from an optional file and apply environment overrides
    pub fn load(path: Option<&Path>) -> E2eResult<Self> {
        let mut config = match path {
            Some(path) => {
                debug!("Loading harness config from {}", path.display());
                Self::from_toml(&std::fs::read_to_string(path)?)?
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from an environment lookup
    pub fn apply_env<F>(&mut self, lookup: F) -> E2eResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_FRONTEND_URL) {
            self.frontend_url = url;
        }
        if let Some(url) = lookup(ENV_BACKEND_URL) {
            self.backend_url = url;
        }
        if let Some(seed) = lookup(ENV_SEED) {
            let seed = seed
                .trim()
                .parse()
                .map_err(|_| E2eError::Config(format!("{} is not a u64: {}", ENV_SEED, seed)))?;
            self.seed = Some(seed);
        }
        if let Some(headless) = lookup(ENV_HEADLESS) {
            self.headless = !matches!(headless.trim(), "0" | "false" | "no");
        }
        Ok(())
    }

    pub fn validate(&self) -> E2eResult<()> {
        for target in self.targets() {
            for url in [&target.frontend_url, &target.backend_url] {
                if !(url.starts_with("http://") || url.starts_with("https://")) {
                    return Err(E2eError::Config(format!("not an http(s) URL: {}", url)));
                }
            }
        }
        if self.expect_timeout_ms == 0 || self.scenario_timeout_ms == 0 {
            return Err(E2eError::Config("timeouts must be non-zero".to_string()));
        }
        if self.expect_timeout_ms >= self.scenario_timeout_ms {
            return Err(E2eError::Config(
                "expect_timeout_ms must be below scenario_timeout_ms".to_string(),
            ));
        }
        // The ordering check reads counts back through this placeholder
        if self.texts.likes.matches("{n}").count() != 1 {
            return Err(E2eError::Config(format!(
                "texts.likes must contain {{n}} exactly once: {:?}",
                self.texts.likes
            )));
        }
        Ok(())
    }

    /// Frontend/backend pairs the runner spreads scenarios over
    pub fn targets(&self) -> Vec<Target> {
        if self.targets.is_empty() {
            vec![Target {
                frontend_url: self.frontend_url.clone(),
                backend_url: self.backend_url.clone(),
            }]
        } else {
            self.targets.clone()
        }
    }
}
