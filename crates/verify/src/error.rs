//! Error types for the verification runner

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VerifyError {
    #[error("Playwright not found. Install with: npm install playwright && npx playwright install chromium")]
    PlaywrightNotFound,

    #[error("Failed to launch script runner '{program}': {source}")]
    ScriptSpawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Script exited without reporting an outcome (status: {0})")]
    NoOutcome(String),

    #[error("Fixture inconsistency: {0}")]
    FixtureInconsistent(String),

    #[error("Scenario parse error: {0}")]
    ScenarioParse(String),

    #[error("Invalid URL pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("Screenshot not produced: {}", .0.display())]
    ArtifactMissing(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

pub type VerifyResult<T> = Result<T, VerifyError>;
