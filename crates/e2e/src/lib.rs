//! Blog app E2E suite
//!
//! Rust owns the suite and Playwright drives the browser:
//! - Resets the backend and seeds a known user before every scenario
//! - Compiles each scenario into one Playwright script (fresh browser context)
//! - Waits on conditions only, never on fixed delays
//! - Checks collected page state in Rust and reports failures by kind
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    E2E Test Runner (Rust)                   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  TestRunner (one worker per frontend/backend target)        │
//! │    ├── CleanBackend::acquire()  reset + seed                │
//! │    ├── PlaywrightHandle::run()  goto / + scenario steps     │
//! │    ├── Check::evaluate()        collected values            │
//! │    └── CleanBackend::release()  reset, whatever happened    │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Scenario                                                   │
//! │    ├── name, tags, extra_users                              │
//! │    ├── steps: [Step]                                        │
//! │    │     ├── click / fill { locator }                       │
//! │    │     ├── expect_visible / hidden / count / text         │
//! │    │     └── collect { label, locator }                     │
//! │    └── checks: [Check]                                      │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod backend;
pub mod blog;
pub mod config;
pub mod error;
pub mod helpers;
pub mod locator;
pub mod playwright;
pub mod runner;
pub mod scenario;
pub mod step;

pub use config::HarnessConfig;
pub use error::{E2eError, E2eResult, FailureKind};
pub use runner::{TestRunner, TestSuiteResult};
pub use scenario::{Check, Scenario};
pub use step::Step;
