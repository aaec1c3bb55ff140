//! Declarative verification scenario

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{VerifyError, VerifyResult};
use crate::fixtures::FixtureSet;
use crate::routes::RouteTable;

/// Default bound for the best-effort UI discovery waits
pub const DEFAULT_SOFT_TIMEOUT_MS: u64 = 10_000;

/// A complete scenario: interceptors plus the steps run against the page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Unique name for this scenario
    pub name: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Viewport size for the browser
    #[serde(default = "default_viewport")]
    pub viewport: Viewport,

    /// Interceptors installed before the first navigation
    #[serde(default)]
    pub routes: RouteTable,

    /// Steps to execute in order
    pub steps: Vec<ScenarioStep>,
}

fn default_viewport() -> Viewport {
    Viewport { width: 1280, height: 720 }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// A single step in a scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ScenarioStep {
    /// Navigate to a URL (relative to base)
    Navigate { url: String },

    /// Wait for visible text.
    ///
    /// `then` runs only once the text has appeared; a soft timeout skips it.
    Wait {
        text: String,
        policy: WaitPolicy,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        then: Vec<ScenarioStep>,
    },

    /// Click the element containing `text`
    Click { text: String },
}

/// How a timed-out wait is treated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WaitPolicy {
    /// Log `notice` and carry on
    Soft { timeout_ms: u64, notice: String },

    /// Fail the run; `None` keeps Playwright's assertion timeout
    Hard {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout_ms: Option<u64>,
    },
}

impl WaitPolicy {
    pub fn soft(timeout_ms: u64, notice: impl Into<String>) -> Self {
        WaitPolicy::Soft {
            timeout_ms,
            notice: notice.into(),
        }
    }

    pub fn hard() -> Self {
        WaitPolicy::Hard { timeout_ms: None }
    }

    pub fn is_soft(&self) -> bool {
        matches!(self, WaitPolicy::Soft { .. })
    }
}

impl ScenarioStep {
    /// Short label used in step events and logs
    pub fn label(&self) -> String {
        match self {
            ScenarioStep::Navigate { url } => format!("navigate:{}", url),
            ScenarioStep::Wait { text, policy, .. } => {
                let kind = if policy.is_soft() { "soft" } else { "hard" };
                format!("wait[{}]:{}", kind, text)
            }
            ScenarioStep::Click { text } => format!("click:{}", text),
        }
    }
}

impl Scenario {
    /// Log in, open the mocked conversation and check both messages render.
    pub fn chat(soft_timeout_ms: u64) -> VerifyResult<Self> {
        let fixtures = FixtureSet::chat();
        let views = fixtures.validate()?;

        let identity = views.identity_text().to_string();
        let title = views.conversation_title().to_string();

        let mut steps = vec![
            ScenarioStep::Navigate { url: "/".to_string() },
            ScenarioStep::Wait {
                policy: WaitPolicy::soft(
                    soft_timeout_ms,
                    format!("Waiting for '{}' timed out. Checking if redirected to login.", identity),
                ),
                text: identity,
                then: vec![],
            },
            ScenarioStep::Wait {
                policy: WaitPolicy::soft(soft_timeout_ms, format!("Failed to find '{}'.", title)),
                text: title.clone(),
                then: vec![ScenarioStep::Click { text: title }],
            },
        ];

        steps.extend(views.message_bodies().map(|body| ScenarioStep::Wait {
            text: body.to_string(),
            policy: WaitPolicy::hard(),
            then: vec![],
        }));

        let scenario = Self {
            name: "chat-interface".to_string(),
            description: "Open the mocked conversation and check both messages render".to_string(),
            viewport: default_viewport(),
            routes: RouteTable::chat(&fixtures)?,
            steps,
        };
        scenario.validate()?;
        Ok(scenario)
    }

    /// Parse a scenario from YAML string
    pub fn from_yaml(yaml: &str) -> VerifyResult<Self> {
        let scenario: Self = serde_yaml::from_str(yaml)?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Parse a scenario from a YAML file
    pub fn from_file(path: &Path) -> VerifyResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn to_yaml(&self) -> VerifyResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Structural checks: something is loaded before the page is inspected,
    /// and soft waits have a usable bound.
    pub fn validate(&self) -> VerifyResult<()> {
        match self.steps.first() {
            None => {
                return Err(VerifyError::ScenarioParse(format!(
                    "scenario '{}' has no steps",
                    self.name
                )))
            }
            Some(ScenarioStep::Navigate { .. }) => {}
            Some(other) => {
                return Err(VerifyError::ScenarioParse(format!(
                    "scenario '{}' must start with navigate, found {}",
                    self.name,
                    other.label()
                )))
            }
        }

        check_waits(&self.name, &self.steps)
    }
}

fn check_waits(name: &str, steps: &[ScenarioStep]) -> VerifyResult<()> {
    for step in steps {
        if let ScenarioStep::Wait { policy, then, .. } = step {
            if let WaitPolicy::Soft { timeout_ms: 0, .. } = policy {
                return Err(VerifyError::ScenarioParse(format!(
                    "scenario '{}': {} has a zero timeout",
                    name,
                    step.label()
                )));
            }
            check_waits(name, then)?;
        }
    }
    Ok(())
}
