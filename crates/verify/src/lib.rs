//! Chat UI Verification Runner
//!
//! Drives the chat web UI through one scripted scenario against canned
//! backend responses:
//! - Renders the scenario into a Playwright script and runs it with node
//! - Intercepts every backend endpoint the UI touches with literal fixtures
//! - Streams browser console and network activity back as structured events
//! - Captures a full-page screenshot as evidence, on success or failure
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 Verification Runner (Rust)                  │
//! ├─────────────────────────────────────────────────────────────┤
//! │  VerificationRunner                                         │
//! │    ├── preflight()           node + playwright, dirs, probe │
//! │    ├── load_scenario()       built-in chat or YAML file     │
//! │    ├── build_script()        Scenario -> Playwright JS      │
//! │    ├── run_script()          node stdout -> ScriptEvent     │
//! │    └── run_verification()    -> VerificationResult          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Scenario                                                   │
//! │    ├── routes: [Route { pattern, response }]                │
//! │    └── steps: [Step]                                        │
//! │          ├── navigate { url }                               │
//! │          ├── wait { text, policy: soft | hard, then }       │
//! │          └── click { text }                                 │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod artifact;
pub mod error;
pub mod events;
pub mod fixtures;
pub mod playwright;
pub mod routes;
pub mod runner;
pub mod scenario;

pub use error::{VerifyError, VerifyResult};
pub use runner::{RunnerConfig, VerificationResult, VerificationRunner};
pub use scenario::{Scenario, ScenarioStep, WaitPolicy};
