//! verify-chat entry point
//!
//! Run with: cargo run --package chat-verify -- --base-url http://localhost:5173

use std::path::PathBuf;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use chat_verify::artifact::ArtifactPaths;
use chat_verify::playwright::{Browser, PlaywrightConfig};
use chat_verify::scenario::{Viewport, DEFAULT_SOFT_TIMEOUT_MS};
use chat_verify::{RunnerConfig, VerificationRunner, VerifyResult};

#[derive(Parser, Debug)]
#[command(name = "verify-chat")]
#[command(about = "End-to-end verification of the chat UI against mocked endpoints")]
struct Args {
    /// Root URL of the application under test
    #[arg(long, env = "CHAT_VERIFY_BASE_URL", default_value = "http://localhost:5173")]
    base_url: String,

    /// Screenshot written when the scenario passes
    #[arg(long, env = "CHAT_VERIFY_SUCCESS_SCREENSHOT", default_value = "verification/chat_interface.png")]
    success_screenshot: PathBuf,

    /// Screenshot written when the scenario fails
    #[arg(long, env = "CHAT_VERIFY_FAILURE_SCREENSHOT", default_value = "verification/error.png")]
    failure_screenshot: PathBuf,

    /// Bound for the best-effort identity and conversation waits
    #[arg(long, env = "CHAT_VERIFY_SOFT_TIMEOUT_MS", default_value_t = DEFAULT_SOFT_TIMEOUT_MS)]
    soft_timeout_ms: u64,

    /// Browser to use
    #[arg(long, env = "CHAT_VERIFY_BROWSER", value_enum, default_value = "chromium")]
    browser: Browser,

    /// Run in headless mode
    #[arg(long, env = "CHAT_VERIFY_HEADLESS", default_value_t = true, action = clap::ArgAction::Set)]
    headless: bool,

    /// Viewport width (overrides the scenario)
    #[arg(long, env = "CHAT_VERIFY_VIEWPORT_WIDTH", requires = "viewport_height")]
    viewport_width: Option<u32>,

    /// Viewport height (overrides the scenario)
    #[arg(long, env = "CHAT_VERIFY_VIEWPORT_HEIGHT", requires = "viewport_width")]
    viewport_height: Option<u32>,

    /// Node binary used to run the generated script
    #[arg(long, env = "CHAT_VERIFY_NODE", default_value = "node")]
    node: PathBuf,

    /// Load the scenario from a YAML file instead of the built-in one
    #[arg(long, env = "CHAT_VERIFY_SCENARIO")]
    scenario: Option<PathBuf>,

    /// Print the scenario as YAML and exit
    #[arg(long)]
    dump_scenario: bool,

    /// Keep the generated Playwright script at this path
    #[arg(long, env = "CHAT_VERIFY_KEEP_SCRIPT")]
    keep_script: Option<PathBuf>,

    /// Skip the node/Playwright check and the application probe
    #[arg(long, env = "CHAT_VERIFY_SKIP_PREFLIGHT")]
    skip_preflight: bool,
}

impl Args {
    fn into_config(self) -> RunnerConfig {
        let viewport = match (self.viewport_width, self.viewport_height) {
            (Some(width), Some(height)) => Some(Viewport { width, height }),
            _ => None,
        };

        RunnerConfig {
            playwright: PlaywrightConfig {
                base_url: self.base_url,
                browser: self.browser,
                headless: self.headless,
                viewport,
                node_binary: self.node,
                keep_script: self.keep_script,
            },
            artifacts: ArtifactPaths {
                success: self.success_screenshot,
                failure: self.failure_screenshot,
            },
            soft_timeout_ms: self.soft_timeout_ms,
            scenario_file: self.scenario,
            skip_preflight: self.skip_preflight,
        }
    }
}

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: failed to create tokio runtime: {}", e);
            std::process::exit(2);
        }
    };

    match rt.block_on(async_main(args)) {
        Ok(true) => std::process::exit(0),
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    }
}

async fn async_main(args: Args) -> VerifyResult<bool> {
    let dump = args.dump_scenario;
    let runner = VerificationRunner::with_config(args.into_config());

    if dump {
        print!("{}", runner.load_scenario()?.to_yaml()?);
        return Ok(true);
    }

    let result = runner.run_verification().await?;
    Ok(result.success)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_fixed_paths() {
        let config = Args::parse_from(["verify-chat"]).into_config();

        assert_eq!(config.artifacts, ArtifactPaths::default());
        assert_eq!(config.soft_timeout_ms, 10_000);
        assert_eq!(config.playwright.base_url, "http://localhost:5173");
        assert_eq!(config.playwright.browser, Browser::Chromium);
        assert!(config.playwright.headless);
        assert!(config.playwright.viewport.is_none());
    }

    #[test]
    fn test_viewport_override() {
        let config = Args::parse_from([
            "verify-chat",
            "--viewport-width",
            "1920",
            "--viewport-height",
            "1080",
            "--browser",
            "webkit",
            "--headless",
            "false",
        ])
        .into_config();

        assert_eq!(config.playwright.viewport, Some(Viewport { width: 1920, height: 1080 }));
        assert_eq!(config.playwright.browser, Browser::Webkit);
        assert!(!config.playwright.headless);
    }
}
