//! Playwright browser automation
//!
//! A scenario is rendered into a standalone Node script which drives the
//! browser and reports back over stdout, one JSON event per line.

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use serde_json::json;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::artifact::ArtifactPaths;
use crate::error::{VerifyError, VerifyResult};
use crate::events::EventLog;
use crate::routes::RouteTable;
use crate::scenario::{Scenario, ScenarioStep, Viewport, WaitPolicy};

/// Playwright browser handle
pub struct PlaywrightHandle {
    config: PlaywrightConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, clap::ValueEnum)]
pub enum Browser {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl Browser {
    fn as_str(&self) -> &'static str {
        match self {
            Browser::Chromium => "chromium",
            Browser::Firefox => "firefox",
            Browser::Webkit => "webkit",
        }
    }
}

/// What came back from one script execution
#[derive(Debug)]
pub struct ScriptRun {
    pub log: EventLog,
    pub status: ExitStatus,
    pub stderr: String,
}

impl PlaywrightHandle {
    pub fn new(config: PlaywrightConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PlaywrightConfig {
        &self.config
    }

    /// Check that `node` runs and can resolve the `playwright` package
    pub async fn check_installed(&self) -> VerifyResult<()> {
        let status = Command::new(&self.config.node_binary)
            .args(["-e", "require.resolve('playwright', { paths: [process.cwd()] })"])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        match status {
            Ok(status) if status.success() => Ok(()),
            _ => Err(VerifyError::PlaywrightNotFound),
        }
    }

    /// Build the Playwright script for a scenario
    pub fn build_script(&self, scenario: &Scenario, artifacts: &ArtifactPaths) -> String {
        let viewport = self.config.viewport.as_ref().unwrap_or(&scenario.viewport);
        let mut script = String::new();

        // Header
        script.push_str(&format!(
            r#"// Scenario: {name}
const load = (name) => require(require.resolve(name, {{ paths: [process.cwd(), __dirname] }}));
const {{ chromium, firefox, webkit }} = load('playwright');
let expect = null;
try {{
  ({{ expect }} = load('@playwright/test'));
}} catch (_) {{}}

const emit = (event) => {{
  try {{
    process.stdout.write(JSON.stringify(event) + '\n');
  }} catch (_) {{}}
}};

async function expectVisible(page, text, timeout) {{
  const locator = page.getByText(text);
  if (expect) {{
    await expect(locator).toBeVisible(timeout ? {{ timeout }} : undefined);
  }} else {{
    await locator.waitFor({{ state: 'visible', timeout: timeout || 5000 }});
  }}
}}

(async () => {{
  const browser = await {browser}.launch({{ headless: {headless} }});
  const baseUrl = {base_url};
  let page = null;

  try {{
    const context = await browser.newContext({{
      viewport: {{ width: {width}, height: {height} }}
    }});
    page = await context.newPage();

    page.on('console', (msg) => {{
      try {{
        emit({{ event: 'console', text: msg.text() }});
      }} catch (_) {{}}
    }});
    page.on('requestfailed', (request) => {{
      try {{
        const failure = request.failure();
        emit({{ event: 'request_failed', url: request.url(), failure: failure ? failure.errorText : 'unknown' }});
      }} catch (_) {{}}
    }});
    page.on('requestfinished', async (request) => {{
      try {{
        const response = await request.response();
        emit({{ event: 'request_finished', url: request.url(), status: response ? response.status() : null }});
      }} catch (_) {{}}
    }});
"#,
            name = comment(&scenario.name),
            browser = self.config.browser.as_str(),
            headless = self.config.headless,
            base_url = js(self.config.base_url.trim_end_matches('/')),
            width = viewport.width,
            height = viewport.height,
        ));

        // Interceptors, all before the first navigation
        script.push('\n');
        script.push_str(&render_routes(&scenario.routes));

        // Steps
        let mut index = 0;
        for step in &scenario.steps {
            script.push_str(&render_step(step, &mut index, 2));
        }

        // Footer
        script.push_str(&format!(
            r#"
    await page.screenshot({{ path: {success}, fullPage: true }});
    emit({{ event: 'passed', screenshot: {success} }});
  }} catch (error) {{
    const message = error && error.message ? error.message : String(error);
    try {{
      if (page) {{
        await page.screenshot({{ path: {failure}, fullPage: true }});
      }}
    }} catch (_) {{}}
    emit({{ event: 'failed', error: message, screenshot: {failure} }});
  }} finally {{
    await browser.close();
    emit({{ event: 'closed' }});
  }}
}})().catch((error) => {{
  console.error(error && error.stack ? error.stack : String(error));
  process.exitCode = 1;
}});
"#,
            success = js(&artifacts.success.to_string_lossy()),
            failure = js(&artifacts.failure.to_string_lossy()),
        ));

        script
    }

    /// Execute a rendered script with node, streaming its events into a log
    pub async fn run_script(&self, script: &str, routes: &RouteTable) -> VerifyResult<ScriptRun> {
        // Hold the temp dir until the child has exited
        let temp_dir = tempfile::tempdir()?;
        let script_path = match &self.config.keep_script {
            Some(path) => path.clone(),
            None => temp_dir.path().join("verify.js"),
        };
        std::fs::write(&script_path, script)?;

        debug!("Running Playwright script: {}", script_path.display());

        let program = self.config.node_binary.to_string_lossy().to_string();
        let mut child = Command::new(&self.config.node_binary)
            .arg(&script_path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| VerifyError::ScriptSpawn { program, source })?;

        let stderr_task = child.stderr.take().map(|stderr| {
            tokio::spawn(async move {
                let mut collected = String::new();
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!("[script stderr] {}", line);
                    collected.push_str(&line);
                    collected.push('\n');
                }
                collected
            })
        });

        // Drain to EOF whatever arrives so node reaches its `finally` and
        // closes the browser before it exits
        let mut log = EventLog::new();
        if let Some(stdout) = child.stdout.take() {
            let mut segments = BufReader::new(stdout).split(b'\n');
            loop {
                match segments.next_segment().await {
                    Ok(Some(bytes)) => {
                        let line = String::from_utf8_lossy(&bytes);
                        log.observe(line.trim_end_matches('\r'), routes);
                    }
                    Ok(None) => break,
                    Err(e) => {
                        warn!("Stopped reading script output: {}", e);
                        break;
                    }
                }
            }
        }

        let status = child.wait().await?;
        let stderr = match stderr_task {
            Some(task) => task.await.unwrap_or_default(),
            None => String::new(),
        };

        if self.config.keep_script.is_some() {
            info!("Script kept at {}", script_path.display());
        }

        Ok(ScriptRun { log, status, stderr })
    }
}

/// JavaScript string literal for `s`
///
/// JSON leaves U+2028 and U+2029 raw, which pre-ES2019 engines reject inside
/// string literals.
fn js(s: &str) -> String {
    serde_json::Value::String(s.to_string())
        .to_string()
        .replace('\u{2028}', "\\u2028")
        .replace('\u{2029}', "\\u2029")
}

/// `s` made safe for a `//` comment: every JavaScript line terminator ends one
fn comment(s: &str) -> String {
    s.replace(['\n', '\r', '\u{2028}', '\u{2029}'], " ")
}

fn render_routes(routes: &RouteTable) -> String {
    let mut out = String::new();
    for route in routes.iter() {
        let mut fulfill = json!({ "status": route.response.status });
        if let Some(content_type) = &route.response.content_type {
            fulfill["contentType"] = json!(content_type);
        }
        if let Some(body) = &route.response.body {
            fulfill["body"] = json!(body);
        }
        out.push_str(&format!(
            "    // {}\n    await page.route({}, (route) => route.fulfill({}));\n",
            comment(&route.name),
            js(route.pattern.as_str()),
            fulfill
        ));
    }
    out
}

fn render_step(step: &ScenarioStep, index: &mut usize, depth: usize) -> String {
    let pad = "  ".repeat(depth);
    let mut out = format!(
        "\n{pad}// Step {n}: {label}\n{pad}emit({{ event: 'step', index: {i}, name: {name} }});\n",
        pad = pad,
        n = *index + 1,
        label = comment(&step.label()),
        i = *index,
        name = js(&step.label()),
    );
    *index += 1;

    match step {
        ScenarioStep::Navigate { url } => {
            out.push_str(&format!("{}await page.goto(baseUrl + {});\n", pad, js(url)));
        }
        ScenarioStep::Click { text } => {
            out.push_str(&format!("{}await page.getByText({}).click();\n", pad, js(text)));
        }
        ScenarioStep::Wait { text, policy, then } => match policy {
            // Everything the wait guards shares its fate
            WaitPolicy::Soft { timeout_ms, notice } => {
                let selector = js(&format!("text={}", text));
                out.push_str(&format!("{}try {{\n", pad));
                out.push_str(&format!(
                    "{}  await page.waitForSelector({}, {{ timeout: {} }});\n",
                    pad, selector, timeout_ms
                ));
                for guarded in then {
                    out.push_str(&render_step(guarded, index, depth + 1));
                }
                out.push_str(&format!(
                    "{pad}}} catch (_) {{\n{pad}  emit({{ event: 'soft_timeout', selector: {selector}, notice: {notice} }});\n{pad}}}\n",
                    pad = pad,
                    selector = selector,
                    notice = js(notice),
                ));
            }
            WaitPolicy::Hard { timeout_ms } => {
                let timeout = timeout_ms.map(|t| t.to_string()).unwrap_or_else(|| "undefined".to_string());
                out.push_str(&format!("{}await expectVisible(page, {}, {});\n", pad, js(text), timeout));
                for guarded in then {
                    out.push_str(&render_step(guarded, index, depth));
                }
            }
        },
    }

    out
}

/// Configuration for Playwright
#[derive(Debug, Clone)]
pub struct PlaywrightConfig {
    pub base_url: String,
    pub browser: Browser,
    pub headless: bool,
    /// Overrides the scenario's viewport when set
    pub viewport: Option<Viewport>,
    pub node_binary: PathBuf,
    /// Write the rendered script here instead of a temp file
    pub keep_script: Option<PathBuf>,
}

impl PlaywrightConfig {
    pub fn with_node(mut self, node: &Path) -> Self {
        self.node_binary = node.to_path_buf();
        self
    }
}

impl Default for PlaywrightConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5173".to_string(),
            browser: Browser::Chromium,
            headless: true,
            viewport: None,
            node_binary: PathBuf::from("node"),
            keep_script: None,
        }
    }
}
