//! Playwright browser automation
//!
//! A scenario talks to the browser through the [`Page`] trait. The
//! [`PlaywrightPage`] implementation keeps one Node.js process alive per
//! scenario and exchanges JSON lines with it over stdin/stdout.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tracing::{debug, info, warn};

use crate::error::{E2eError, E2eResult};

/// Queryable live document
///
/// Selectors are Playwright selectors. Methods taking `nth` act on the
/// zero-based nth match.
#[async_trait]
pub trait Page: Send {
    async fn goto(&mut self, url: &str) -> E2eResult<()>;

    async fn title(&mut self) -> E2eResult<String>;

    /// Number of elements currently matching `selector`
    async fn count(&mut self, selector: &str) -> E2eResult<usize>;

    /// Trimmed inner text of every match, in document order
    async fn inner_texts(&mut self, selector: &str) -> E2eResult<Vec<String>>;

    /// Attribute `name` of every match, in document order
    async fn attributes(&mut self, selector: &str, name: &str) -> E2eResult<Vec<Option<String>>>;

    async fn attribute(&mut self, selector: &str, nth: usize, name: &str) -> E2eResult<Option<String>> {
        Ok(self
            .attributes(selector, name)
            .await?
            .into_iter()
            .nth(nth)
            .flatten())
    }

    async fn click(&mut self, selector: &str, nth: usize) -> E2eResult<()>;

    async fn fill(&mut self, selector: &str, nth: usize, value: &str) -> E2eResult<()>;

    async fn press(&mut self, selector: &str, nth: usize, key: &str) -> E2eResult<()>;

    async fn set_checked(&mut self, selector: &str, nth: usize, checked: bool) -> E2eResult<()>;

    async fn wait_for_selector(&mut self, selector: &str, timeout: Duration) -> E2eResult<()>;

    /// Click the nth match and wait for the resulting navigation to load
    async fn click_and_wait_for_navigation(&mut self, selector: &str, nth: usize) -> E2eResult<()>;

    /// Console errors captured since the last call
    async fn console_errors(&mut self) -> E2eResult<Vec<String>> {
        Ok(Vec::new())
    }

    async fn close(&mut self) -> E2eResult<()>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
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

    /// Parse a browser name, accepting `chrome` and `safari` aliases
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "chrome" | "chromium" => Some(Browser::Chromium),
            "firefox" => Some(Browser::Firefox),
            "webkit" | "safari" => Some(Browser::Webkit),
            _ => None,
        }
    }
}

/// Configuration for Playwright
#[derive(Debug, Clone)]
pub struct PlaywrightConfig {
    pub browser: Browser,
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,
    /// Default timeout for Playwright actions
    pub action_timeout: Duration,
    /// Directory containing the `playwright` package
    pub node_modules: PathBuf,
    /// How long `close` waits for the driver to exit
    pub shutdown_timeout: Duration,
}

impl Default for PlaywrightConfig {
    fn default() -> Self {
        Self {
            browser: Browser::Chromium,
            headless: true,
            viewport_width: 1280,
            viewport_height: 720,
            action_timeout: Duration::from_secs(30),
            node_modules: PathBuf::from("node_modules"),
            shutdown_timeout: Duration::from_secs(5),
        }
    }
}

const DRIVER_SCRIPT: &str = r#"
const readline = require('readline');
const pw = require('playwright');

const engine = process.env.GRIDWATCH_BROWSER || 'chromium';
const headless = process.env.GRIDWATCH_HEADLESS !== '0';
const timeout = parseInt(process.env.GRIDWATCH_TIMEOUT_MS || '30000', 10);
const width = parseInt(process.env.GRIDWATCH_VIEWPORT_WIDTH || '1280', 10);
const height = parseInt(process.env.GRIDWATCH_VIEWPORT_HEIGHT || '720', 10);

const reply = (msg) => process.stdout.write(JSON.stringify(msg) + '\n');

(async () => {
  const browser = await pw[engine].launch({ headless });
  const context = await browser.newContext({ viewport: { width, height } });
  const page = await context.newPage();
  page.setDefaultTimeout(timeout);

  const consoleErrors = [];
  page.on('console', (msg) => {
    if (msg.type() === 'error') consoleErrors.push(msg.text());
  });

  const nth = (c) => page.locator(c.selector).nth(c.nth || 0);

  const handlers = {
    goto: async (c) => { await page.goto(c.url, { waitUntil: 'load' }); return null; },
    title: async () => page.title(),
    count: async (c) => page.locator(c.selector).count(),
    texts: async (c) => (await page.locator(c.selector).allInnerTexts()).map((t) => t.trim()),
    attributes: async (c) => page.locator(c.selector)
      .evaluateAll((els, name) => els.map((el) => el.getAttribute(name)), c.name),
    click: async (c) => {
      await nth(c).scrollIntoViewIfNeeded();
      await nth(c).click();
      return null;
    },
    fill: async (c) => { await nth(c).fill(c.value, { force: true }); return null; },
    press: async (c) => { await nth(c).press(c.key); return null; },
    set_checked: async (c) => { await nth(c).setChecked(!!c.checked); return null; },
    wait_for_selector: async (c) => {
      await page.waitForSelector(c.selector, { timeout: c.timeout_ms });
      return null;
    },
    click_and_navigate: async (c) => {
      await Promise.all([page.waitForNavigation({ waitUntil: 'load' }), nth(c).click()]);
      return null;
    },
    console_errors: async () => consoleErrors.splice(0),
    close: async () => { await browser.close(); return null; },
  };

  reply({ id: 0, ok: true, value: 'ready' });

  const rl = readline.createInterface({ input: process.stdin });
  for await (const line of rl) {
    if (!line.trim()) continue;
    let cmd;
    try {
      cmd = JSON.parse(line);
    } catch (e) {
      console.error('unparseable command: ' + line);
      continue;
    }
    try {
      const handler = handlers[cmd.op];
      if (!handler) throw new Error('unknown op ' + cmd.op);
      const value = await handler(cmd);
      reply({ id: cmd.id, ok: true, value: value === undefined ? null : value });
    } catch (e) {
      reply({ id: cmd.id, ok: false, error: String((e && e.message) || e) });
    }
    if (cmd.op === 'close') process.exit(0);
  }
  await browser.close();
})().catch((e) => {
  console.error((e && e.stack) || String(e));
  process.exit(1);
});
"#;

#[derive(Debug, Deserialize)]
struct DriverReply {
    id: u64,
    ok: bool,
    #[serde(default)]
    value: Value,
    #[serde(default)]
    error: Option<String>,
}

/// Page backed by a long-lived Playwright driver process
pub struct PlaywrightPage {
    child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
    next_id: u64,
    shutdown_timeout: Duration,
    closed: bool,
    // Holds the driver script for the lifetime of the process
    _script_dir: TempDir,
}

impl PlaywrightPage {
    /// Launch a browser and open a fresh page
    pub async fn launch(config: &PlaywrightConfig) -> E2eResult<Self> {
        let node_path = std::env::current_dir()?.join(&config.node_modules);
        Self::check_playwright_installed(&node_path).await?;

        let script_dir = tempfile::tempdir()?;
        let script_path = script_dir.path().join("driver.js");
        std::fs::write(&script_path, DRIVER_SCRIPT)?;

        info!(
            "Launching {} ({})",
            config.browser.as_str(),
            if config.headless { "headless" } else { "headed" }
        );

        let child = Command::new("node")
            .arg(&script_path)
            .env("NODE_PATH", &node_path)
            .env("GRIDWATCH_BROWSER", config.browser.as_str())
            .env("GRIDWATCH_HEADLESS", if config.headless { "1" } else { "0" })
            .env("GRIDWATCH_TIMEOUT_MS", config.action_timeout.as_millis().to_string())
            .env("GRIDWATCH_VIEWPORT_WIDTH", config.viewport_width.to_string())
            .env("GRIDWATCH_VIEWPORT_HEIGHT", config.viewport_height.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| E2eError::Driver(format!("Failed to spawn node: {}", e)))?;

        let mut page = Self::attach(child, config.shutdown_timeout, script_dir)?;

        // The driver announces itself with id 0 once the page is open
        page.read_reply(0).await?;
        Ok(page)
    }

    /// Wrap a spawned driver process, taking over its standard streams
    fn attach(mut child: Child, shutdown_timeout: Duration, script_dir: TempDir) -> E2eResult<Self> {
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| E2eError::Driver("driver stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| E2eError::Driver("driver stdout unavailable".to_string()))?;

        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!("[driver] {}", line);
                }
            });
        }

        Ok(Self {
            child,
            stdin,
            stdout: BufReader::new(stdout).lines(),
            next_id: 1,
            shutdown_timeout,
            closed: false,
            _script_dir: script_dir,
        })
    }

    /// Check that node can resolve the playwright package
    async fn check_playwright_installed(node_path: &std::path::Path) -> E2eResult<()> {
        let status = Command::new("node")
            .args(["-e", "require.resolve('playwright')"])
            .env("NODE_PATH", node_path)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        match status {
            Ok(status) if status.success() => Ok(()),
            _ => Err(E2eError::PlaywrightNotFound),
        }
    }

    async fn request(&mut self, mut command: Value) -> E2eResult<Value> {
        if self.closed {
            return Err(E2eError::Driver("page is closed".to_string()));
        }

        let id = self.next_id;
        self.next_id += 1;
        command["id"] = json!(id);

        let op = command["op"].as_str().unwrap_or_default().to_string();
        let selector = command["selector"].as_str().unwrap_or_default().to_string();

        let mut line = serde_json::to_string(&command)?;
        line.push('\n');
        self.stdin.write_all(line.as_bytes()).await?;
        self.stdin.flush().await?;

        let reply = self.read_reply(id).await?;
        if reply.ok {
            Ok(reply.value)
        } else {
            Err(E2eError::Command {
                op,
                selector,
                reason: reply.error.unwrap_or_else(|| "unknown error".to_string()),
            })
        }
    }

    async fn read_reply(&mut self, id: u64) -> E2eResult<DriverReply> {
        loop {
            let line = self
                .stdout
                .next_line()
                .await?
                .ok_or_else(|| E2eError::Driver("driver exited unexpectedly".to_string()))?;

            match serde_json::from_str::<DriverReply>(&line) {
                Ok(reply) if reply.id == id => return Ok(reply),
                Ok(reply) => warn!("Discarding stale driver reply {}", reply.id),
                Err(_) => debug!("[driver stdout] {}", line),
            }
        }
    }

    async fn unit(&mut self, command: Value) -> E2eResult<()> {
        self.request(command).await.map(|_| ())
    }
}

fn reply_string(op: &str, value: Value) -> E2eResult<String> {
    match value {
        Value::String(s) => Ok(s),
        other => Err(E2eError::Driver(format!(
            "'{}' replied {} where a string was expected",
            op, other
        ))),
    }
}

fn reply_count(op: &str, value: Value) -> E2eResult<usize> {
    value
        .as_u64()
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| {
            E2eError::Driver(format!(
                "'{}' replied {} where a count was expected",
                op, value
            ))
        })
}

#[async_trait]
impl Page for PlaywrightPage {
    async fn goto(&mut self, url: &str) -> E2eResult<()> {
        debug!("goto {}", url);
        self.unit(json!({ "op": "goto", "url": url })).await
    }

    async fn title(&mut self) -> E2eResult<String> {
        let value = self.request(json!({ "op": "title" })).await?;
        reply_string("title", value)
    }

    async fn count(&mut self, selector: &str) -> E2eResult<usize> {
        let value = self.request(json!({ "op": "count", "selector": selector })).await?;
        reply_count("count", value)
    }

    async fn inner_texts(&mut self, selector: &str) -> E2eResult<Vec<String>> {
        let value = self.request(json!({ "op": "texts", "selector": selector })).await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn attributes(&mut self, selector: &str, name: &str) -> E2eResult<Vec<Option<String>>> {
        let value = self
            .request(json!({ "op": "attributes", "selector": selector, "name": name }))
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn click(&mut self, selector: &str, nth: usize) -> E2eResult<()> {
        self.unit(json!({ "op": "click", "selector": selector, "nth": nth })).await
    }

    async fn fill(&mut self, selector: &str, nth: usize, value: &str) -> E2eResult<()> {
        self.unit(json!({ "op": "fill", "selector": selector, "nth": nth, "value": value }))
            .await
    }

    async fn press(&mut self, selector: &str, nth: usize, key: &str) -> E2eResult<()> {
        self.unit(json!({ "op": "press", "selector": selector, "nth": nth, "key": key }))
            .await
    }

    async fn set_checked(&mut self, selector: &str, nth: usize, checked: bool) -> E2eResult<()> {
        self.unit(json!({ "op": "set_checked", "selector": selector, "nth": nth, "checked": checked }))
            .await
    }

    async fn wait_for_selector(&mut self, selector: &str, timeout: Duration) -> E2eResult<()> {
        self.unit(json!({
            "op": "wait_for_selector",
            "selector": selector,
            "timeout_ms": timeout.as_millis() as u64,
        }))
        .await
    }

    async fn click_and_wait_for_navigation(&mut self, selector: &str, nth: usize) -> E2eResult<()> {
        self.unit(json!({ "op": "click_and_navigate", "selector": selector, "nth": nth }))
            .await
    }

    async fn console_errors(&mut self) -> E2eResult<Vec<String>> {
        let value = self.request(json!({ "op": "console_errors" })).await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn close(&mut self) -> E2eResult<()> {
        if self.closed {
            return Ok(());
        }

        let acknowledged =
            tokio::time::timeout(self.shutdown_timeout, self.unit(json!({ "op": "close" }))).await;
        self.closed = true;

        let result = match acknowledged {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    "Driver did not acknowledge close within {:?}, killing it",
                    self.shutdown_timeout
                );
                let _ = self.child.kill().await;
                return Err(E2eError::Driver(format!(
                    "close not acknowledged within {} ms",
                    self.shutdown_timeout.as_millis()
                )));
            }
        };

        match tokio::time::timeout(self.shutdown_timeout, self.child.wait()).await {
            Ok(_) => {}
            Err(_) => {
                warn!("Driver did not exit within {:?}, killing it", self.shutdown_timeout);
                let _ = self.child.kill().await;
            }
        }

        result
    }
}
