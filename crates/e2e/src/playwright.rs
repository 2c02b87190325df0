//! Playwright browser automation
//!
//! Each [`PlaywrightPage`] owns one Node.js process running a small bridge
//! script. The bridge keeps a browser page open and answers one JSON
//! request per stdin line with one JSON response per stdout line.

use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command as TokioCommand};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::driver::{Column, PageDriver, Row};
use crate::error::{E2eError, E2eResult};
use crate::overlay::OverlayGuard;
use crate::runner::SessionFactory;
use crate::session::{Session, Timeouts};

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

/// Configuration for Playwright
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaywrightConfig {
    pub browser: Browser,
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,
    /// Extra `node_modules` directory holding the `playwright` package
    pub node_modules: Option<PathBuf>,
}

impl Default for PlaywrightConfig {
    fn default() -> Self {
        Self {
            browser: Browser::Chromium,
            headless: true,
            viewport_width: 1280,
            viewport_height: 720,
            node_modules: None,
        }
    }
}

/// Check if Playwright is installed
pub fn check_playwright_installed() -> E2eResult<()> {
    let output = Command::new("npx")
        .args(["playwright", "--version"])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();

    match output {
        Ok(status) if status.success() => Ok(()),
        _ => Err(E2eError::PlaywrightNotFound),
    }
}

const BRIDGE_SCRIPT: &str = r#"
const playwright = require('playwright');
const readline = require('readline');

const opts = JSON.parse(process.argv[2]);

(async () => {
  const browser = await playwright[opts.browser].launch({ headless: opts.headless });
  const context = await browser.newContext({
    viewport: { width: opts.viewport_width, height: opts.viewport_height }
  });
  const page = await context.newPage();
  page.on('dialog', (dialog) => dialog.accept().catch(() => {}));
  page.setDefaultTimeout(opts.action_timeout_ms);
  page.setDefaultNavigationTimeout(opts.navigation_timeout_ms);

  const ops = {
    goto: async (r) => { await page.goto(r.url, { waitUntil: 'domcontentloaded' }); return null; },
    url: async () => page.url(),
    count: async (r) => page.locator(r.selector).count(),
    visible: async (r) => page.locator(r.selector).first().isVisible(),
    fill: async (r) => { await page.locator(r.selector).first().fill(r.value); return null; },
    click: async (r) => { await page.locator(r.selector).first().click(); return null; },
    text: async (r) => (await page.locator(r.selector).first().innerText()).trim(),
    value: async (r) => page.locator(r.selector).first().inputValue(),
    remove: async (r) => page.locator(r.selector).evaluateAll(els => { els.forEach(e => e.remove()); return els.length; }),
    query_all: async (r) => page.locator(r.selector).evaluateAll((rows, columns) => rows.map(row => {
      const out = {};
      for (const c of columns) {
        const el = c.selector ? row.querySelector(c.selector) : row;
        if (!el) continue;
        const v = c.attribute ? el.getAttribute(c.attribute) : el.innerText;
        if (v !== null && v !== undefined) out[c.name] = v.trim();
      }
      return out;
    }), r.columns),
    close: async () => { await browser.close(); return null; },
  };

  const rl = readline.createInterface({ input: process.stdin });
  console.log(JSON.stringify({ id: 0, ok: true, value: 'ready' }));
  for await (const line of rl) {
    let req;
    try { req = JSON.parse(line); } catch (e) { continue; }
    try {
      const value = await ops[req.op](req);
      console.log(JSON.stringify({ id: req.id, ok: true, value: value === undefined ? null : value }));
    } catch (e) {
      console.log(JSON.stringify({ id: req.id, ok: false, error: String(e && e.message || e) }));
    }
    if (req.op === 'close') process.exit(0);
  }
  await browser.close();
})().catch(e => {
  console.log(JSON.stringify({ id: 0, ok: false, error: String(e && e.message || e) }));
  process.exit(1);
});
"#;

#[derive(Debug, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum Request<'a> {
    Goto { url: &'a str },
    Url,
    Count { selector: &'a str },
    Visible { selector: &'a str },
    Fill { selector: &'a str, value: &'a str },
    Click { selector: &'a str },
    Text { selector: &'a str },
    Value { selector: &'a str },
    Remove { selector: &'a str },
    QueryAll { selector: &'a str, columns: &'a [Column] },
    Close,
}

impl Request<'_> {
    fn selector(&self) -> &str {
        match self {
            Request::Count { selector }
            | Request::Visible { selector }
            | Request::Fill { selector, .. }
            | Request::Click { selector }
            | Request::Text { selector }
            | Request::Value { selector }
            | Request::Remove { selector }
            | Request::QueryAll { selector, .. } => selector,
            Request::Goto { url } => url,
            Request::Url | Request::Close => "",
        }
    }
}

#[derive(Debug, Serialize)]
struct Envelope<'a> {
    id: u64,
    #[serde(flatten)]
    request: &'a Request<'a>,
}

#[derive(Debug, Deserialize)]
struct Response {
    id: u64,
    ok: bool,
    #[serde(default)]
    value: serde_json::Value,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct LaunchOptions {
    browser: &'static str,
    headless: bool,
    viewport_width: u32,
    viewport_height: u32,
    action_timeout_ms: u64,
    navigation_timeout_ms: u64,
}

struct BridgeIo {
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
    next_id: u64,
}

/// A browser page behind a Node.js bridge process
pub struct PlaywrightPage {
    io: Mutex<BridgeIo>,
    child: Mutex<Child>,
    pid: Option<u32>,
    reply_timeout: Duration,
    _script_dir: tempfile::TempDir,
}

impl PlaywrightPage {
    /// Spawn the bridge and wait for the browser to be ready
    pub async fn launch(config: &PlaywrightConfig, timeouts: &Timeouts) -> E2eResult<Self> {
        let script_dir = tempfile::tempdir()?;
        let script_path = script_dir.path().join("bridge.js");
        std::fs::write(&script_path, BRIDGE_SCRIPT)?;

        let options = serde_json::to_string(&LaunchOptions {
            browser: config.browser.as_str(),
            headless: config.headless,
            viewport_width: config.viewport_width,
            viewport_height: config.viewport_height,
            action_timeout_ms: timeouts.landmark.as_millis() as u64,
            navigation_timeout_ms: timeouts.navigation.as_millis() as u64,
        })?;

        debug!("Launching Playwright bridge: {}", script_path.display());
        let mut child = TokioCommand::new("node")
            .arg(&script_path)
            .arg(options)
            .env("NODE_PATH", node_path(config))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| E2eError::Bridge(format!("Failed to spawn node: {}", e)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| E2eError::Bridge("bridge stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| E2eError::Bridge("bridge stdout unavailable".to_string()))?;
        let pid = child.id();

        let page = Self {
            io: Mutex::new(BridgeIo {
                stdin,
                stdout: BufReader::new(stdout).lines(),
                next_id: 1,
            }),
            child: Mutex::new(child),
            pid,
            reply_timeout: timeouts.navigation + timeouts.landmark,
            _script_dir: script_dir,
        };

        let ready = tokio::time::timeout(timeouts.navigation, async {
            let mut io = page.io.lock().await;
            read_response(&mut io.stdout, 0).await
        })
        .await
        .map_err(|_| E2eError::Bridge("browser did not start in time".to_string()))??;
        if !ready.ok {
            return Err(E2eError::Bridge(ready.error.unwrap_or_else(|| "launch failed".to_string())));
        }

        info!("Playwright {} ready (pid: {:?})", config.browser.as_str(), pid);
        Ok(page)
    }

    async fn call(&self, request: Request<'_>) -> E2eResult<serde_json::Value> {
        let mut io = self.io.lock().await;
        let id = io.next_id;
        io.next_id += 1;

        let mut line = serde_json::to_string(&Envelope { id, request: &request })?;
        line.push('\n');
        io.stdin.write_all(line.as_bytes()).await?;
        io.stdin.flush().await?;

        let response = tokio::time::timeout(self.reply_timeout, read_response(&mut io.stdout, id))
            .await
            .map_err(|_| E2eError::Bridge(format!("no reply to request {} within {:?}", id, self.reply_timeout)))??;

        if response.ok {
            Ok(response.value)
        } else {
            Err(E2eError::driver(
                request.selector(),
                response.error.unwrap_or_else(|| "unknown error".to_string()),
            ))
        }
    }

    async fn call_as<T: serde::de::DeserializeOwned>(&self, request: Request<'_>) -> E2eResult<T> {
        let value = self.call(request).await?;
        Ok(serde_json::from_value(value)?)
    }
}

async fn read_response(stdout: &mut Lines<BufReader<ChildStdout>>, id: u64) -> E2eResult<Response> {
    loop {
        let line = stdout
            .next_line()
            .await?
            .ok_or_else(|| E2eError::Bridge("bridge exited".to_string()))?;
        match serde_json::from_str::<Response>(&line) {
            Ok(response) if response.id == id => return Ok(response),
            Ok(response) => debug!("Dropping stale bridge reply {}", response.id),
            Err(_) => debug!("[bridge] {}", line),
        }
    }
}

/// `NODE_PATH` for the bridge: the configured directory, the working
/// directory's `node_modules`, then the global npm root
fn node_path(config: &PlaywrightConfig) -> String {
    let mut paths: Vec<String> = Vec::new();
    if let Some(dir) = &config.node_modules {
        paths.push(dir.display().to_string());
    }
    if let Ok(cwd) = std::env::current_dir() {
        paths.push(cwd.join("node_modules").display().to_string());
    }
    if let Ok(output) = Command::new("npm").args(["root", "-g"]).output() {
        if output.status.success() {
            let root = String::from_utf8_lossy(&output.stdout).trim().to_string();
            if !root.is_empty() {
                paths.push(root);
            }
        }
    }
    if let Ok(existing) = std::env::var("NODE_PATH") {
        paths.push(existing);
    }
    paths.join(":")
}

#[async_trait]
impl PageDriver for PlaywrightPage {
    async fn goto(&self, url: &str) -> E2eResult<()> {
        self.call(Request::Goto { url }).await.map(|_| ())
    }

    async fn current_url(&self) -> E2eResult<String> {
        self.call_as(Request::Url).await
    }

    async fn count(&self, selector: &str) -> E2eResult<usize> {
        self.call_as(Request::Count { selector }).await
    }

    async fn is_visible(&self, selector: &str) -> E2eResult<bool> {
        self.call_as(Request::Visible { selector }).await
    }

    async fn fill(&self, selector: &str, value: &str) -> E2eResult<()> {
        self.call(Request::Fill { selector, value }).await.map(|_| ())
    }

    async fn click(&self, selector: &str) -> E2eResult<()> {
        self.call(Request::Click { selector }).await.map(|_| ())
    }

    async fn text(&self, selector: &str) -> E2eResult<String> {
        self.call_as(Request::Text { selector }).await
    }

    async fn input_value(&self, selector: &str) -> E2eResult<String> {
        self.call_as(Request::Value { selector }).await
    }

    async fn remove(&self, selector: &str) -> E2eResult<usize> {
        self.call_as(Request::Remove { selector }).await
    }

    async fn query_all(&self, row_selector: &str, columns: &[Column]) -> E2eResult<Vec<Row>> {
        self.call_as(Request::QueryAll {
            selector: row_selector,
            columns,
        })
        .await
    }

    async fn close(&self) -> E2eResult<()> {
        if let Err(e) = self.call(Request::Close).await {
            debug!("Bridge close request failed: {}", e);
        }

        let mut child = self.child.lock().await;
        if let Ok(Ok(status)) = tokio::time::timeout(Duration::from_secs(2), child.wait()).await {
            debug!("Bridge exited with {}", status);
            return Ok(());
        }

        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            if let Some(pid) = self.pid {
                warn!("Bridge {} did not exit, sending SIGTERM", pid);
                if kill(Pid::from_raw(pid as i32), Signal::SIGTERM).is_ok()
                    && tokio::time::timeout(Duration::from_millis(500), child.wait()).await.is_ok()
                {
                    return Ok(());
                }
            }
        }

        child.kill().await?;
        Ok(())
    }
}

/// Opens one bridged browser per scenario
pub struct PlaywrightSessions {
    config: PlaywrightConfig,
    base_url: String,
    timeouts: Timeouts,
    guard: OverlayGuard,
}

impl PlaywrightSessions {
    pub fn new(config: PlaywrightConfig, base_url: impl Into<String>, timeouts: Timeouts, guard: OverlayGuard) -> Self {
        Self {
            config,
            base_url: base_url.into(),
            timeouts,
            guard,
        }
    }
}

#[async_trait]
impl SessionFactory for PlaywrightSessions {
    async fn create(&self, label: &str) -> E2eResult<Session> {
        let page = PlaywrightPage::launch(&self.config, &self.timeouts).await?;
        Ok(Session::new(Arc::new(page), self.base_url.clone())
            .with_timeouts(self.timeouts)
            .with_guard(self.guard.clone())
            .with_label(label))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_wire_format() {
        let request = Request::Fill {
            selector: "#email",
            value: "a@b.c",
        };
        let line = serde_json::to_value(Envelope { id: 7, request: &request }).unwrap();
        assert_eq!(
            line,
            serde_json::json!({"id": 7, "op": "fill", "selector": "#email", "value": "a@b.c"})
        );
    }

    #[test]
    fn test_query_all_carries_columns() {
        const COLUMNS: [Column; 2] = [Column::text("name", "h4 a"), Column::attr("id", None, "id")];
        let request = Request::QueryAll {
            selector: "tr",
            columns: &COLUMNS,
        };
        let line = serde_json::to_value(Envelope { id: 1, request: &request }).unwrap();
        assert_eq!(line["op"], "query_all");
        assert_eq!(line["columns"][0]["selector"], "h4 a");
        assert_eq!(line["columns"][1]["selector"], serde_json::Value::Null);
        assert_eq!(line["columns"][1]["attribute"], "id");
    }

    #[test]
    fn test_error_response_parses() {
        let response: Response = serde_json::from_str(r#"{"id":3,"ok":false,"error":"Timeout 10000ms exceeded"}"#).unwrap();
        assert!(!response.ok);
        assert_eq!(response.value, serde_json::Value::Null);
        assert_eq!(response.error.as_deref(), Some("Timeout 10000ms exceeded"));
    }

    #[test]
    fn test_browser_config_from_toml() {
        let config: PlaywrightConfig = toml::from_str("browser = \"firefox\"\nheadless = false\n").unwrap();
        assert_eq!(config.browser, Browser::Firefox);
        assert!(!config.headless);
        assert_eq!(config.viewport_width, 1280);
    }
}
