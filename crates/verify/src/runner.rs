//! Verification runner: preflight, one scenario run, outcome interpretation

use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::artifact::{ArtifactPaths, ScreenshotArtifact};
use crate::error::{VerifyError, VerifyResult};
use crate::events::ScriptEvent;
use crate::playwright::{PlaywrightConfig, PlaywrightHandle, ScriptRun};
use crate::scenario::{Scenario, DEFAULT_SOFT_TIMEOUT_MS};

/// Result of one verification run
#[derive(Debug, Clone)]
pub struct VerificationResult {
    pub name: String,
    pub success: bool,
    pub duration_ms: u64,
    pub error: Option<String>,
    /// Success screenshot when passed, failure screenshot otherwise
    pub screenshot: Option<ScreenshotArtifact>,
    pub steps_started: usize,
    pub soft_timeouts: usize,
    pub requests_finished: usize,
    pub requests_failed: usize,
    /// Browser teardowns the script reported; anything but 1 is a leak or a
    /// double close
    pub sessions_closed: usize,
}

impl VerificationResult {
    pub fn session_released_once(&self) -> bool {
        self.sessions_closed == 1
    }
}

/// Runs the chat scenario once
pub struct VerificationRunner {
    playwright: PlaywrightHandle,
    artifacts: ArtifactPaths,
    soft_timeout_ms: u64,
    scenario_file: Option<PathBuf>,
    skip_preflight: bool,
}

impl VerificationRunner {
    /// Create a new runner with default configuration
    pub fn new() -> Self {
        Self::with_config(RunnerConfig::default())
    }

    pub fn with_config(config: RunnerConfig) -> Self {
        Self {
            playwright: PlaywrightHandle::new(config.playwright),
            artifacts: config.artifacts,
            soft_timeout_ms: config.soft_timeout_ms,
            scenario_file: config.scenario_file,
            skip_preflight: config.skip_preflight,
        }
    }

    /// The configured scenario file, or the built-in chat scenario
    pub fn load_scenario(&self) -> VerifyResult<Scenario> {
        match &self.scenario_file {
            Some(path) => {
                debug!("Loading scenario from {}", path.display());
                Scenario::from_file(path)
            }
            None => Scenario::chat(self.soft_timeout_ms),
        }
    }

    /// Make sure the run can start: Playwright resolves, artifact
    /// directories exist. The target app is probed but never required.
    pub async fn preflight(&self) -> VerifyResult<()> {
        self.playwright.check_installed().await?;
        self.artifacts.prepare()?;
        self.probe_app().await;
        Ok(())
    }

    async fn probe_app(&self) {
        let url = self.playwright.config().base_url.clone();
        let client = match reqwest::Client::builder().timeout(Duration::from_secs(2)).build() {
            Ok(client) => client,
            Err(e) => {
                warn!("Could not build probe client: {}", e);
                return;
            }
        };

        match client.get(&url).send().await {
            Ok(resp) if resp.status().is_success() => debug!("Application reachable at {}", url),
            Ok(resp) => warn!("Application at {} answered {}", url, resp.status()),
            Err(e) => warn!("Application at {} not reachable: {}", url, e),
        }
    }

    /// Run the scenario once and turn what the script reported into a result.
    ///
    /// A failing scenario is not an error: it yields a result with
    /// `success == false`. Errors mean the scenario could not be run.
    pub async fn run_verification(&self) -> VerifyResult<VerificationResult> {
        let start = Instant::now();
        let scenario = self.load_scenario()?;

        if self.skip_preflight {
            self.artifacts.prepare()?;
        } else {
            self.preflight().await?;
        }

        info!("Running scenario '{}' ({} steps)", scenario.name, scenario.steps.len());

        let script = self.playwright.build_script(&scenario, &self.artifacts);
        let run = self.playwright.run_script(&script, &scenario.routes).await?;

        let result = interpret(&scenario.name, run, start.elapsed())?;

        match &result.error {
            None => info!("Verification script ran successfully."),
            Some(e) => error!("Verification script failed: {}", e),
        }
        if let Some(shot) = &result.screenshot {
            shot.log();
        }

        Ok(result)
    }
}

impl Default for VerificationRunner {
    fn default() -> Self {
        Self::new()
    }
}

fn interpret(name: &str, run: ScriptRun, elapsed: Duration) -> VerifyResult<VerificationResult> {
    let log = &run.log;

    if log.closed != 1 {
        warn!("Browser session released {} times, expected once", log.closed);
    }
    if log.soft_timeouts > 0 {
        debug!("{} soft wait(s) timed out", log.soft_timeouts);
    }

    let (error, screenshot) = match log.outcome() {
        Some(ScriptEvent::Passed { screenshot }) => match ScreenshotArtifact::inspect(screenshot) {
            Ok(artifact) => (None, Some(artifact)),
            Err(e) => (Some(e.to_string()), None),
        },
        Some(ScriptEvent::Failed { error, screenshot }) => {
            let artifact = match ScreenshotArtifact::inspect(screenshot) {
                Ok(artifact) => Some(artifact),
                Err(e) => {
                    warn!("No failure screenshot: {}", e);
                    None
                }
            };
            (Some(error.clone()), artifact)
        }
        _ => {
            let tail: Vec<&str> = run.stderr.lines().rev().take(5).collect();
            let mut detail = run.status.to_string();
            if !tail.is_empty() {
                detail.push_str(": ");
                detail.push_str(&tail.into_iter().rev().collect::<Vec<_>>().join(" | "));
            }
            return Err(VerifyError::NoOutcome(detail));
        }
    };

    Ok(VerificationResult {
        name: name.to_string(),
        success: error.is_none(),
        duration_ms: elapsed.as_millis() as u64,
        error,
        screenshot,
        steps_started: log.steps_started(),
        soft_timeouts: log.soft_timeouts,
        requests_finished: log.requests_finished,
        requests_failed: log.requests_failed,
        sessions_closed: log.closed,
    })
}

/// Configuration for the verification runner
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub playwright: PlaywrightConfig,
    pub artifacts: ArtifactPaths,
    pub soft_timeout_ms: u64,
    pub scenario_file: Option<PathBuf>,
    pub skip_preflight: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            playwright: PlaywrightConfig::default(),
            artifacts: ArtifactPaths::default(),
            soft_timeout_ms: DEFAULT_SOFT_TIMEOUT_MS,
            scenario_file: None,
            skip_preflight: false,
        }
    }
}
