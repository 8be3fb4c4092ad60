//! W3C WebDriver browser client
//!
//! Each browser context is its own WebDriver session, so contexts share no
//! cookies or storage. The browser tracks open sessions and deletes any
//! still open when it is closed.

use crate::error::BrowserError;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use carehero_domain::{Browser, BrowserContext, BrowserLauncher, CapabilityError};
use reqwest::Method;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default WebDriver endpoint (chromedriver / geckodriver / selenium)
pub const DEFAULT_ENDPOINT: &str = "http://localhost:4444";

/// Default browser name requested from the endpoint
pub const DEFAULT_BROWSER: &str = "chrome";

/// Client-side bound on any single WebDriver command
const COMMAND_TIMEOUT_SECS: u64 = 90;

/// Session capabilities for a headless browser
pub fn capabilities(browser_name: &str, headless: bool) -> Value {
    let mut always_match = json!({ "browserName": browser_name });
    match browser_name {
        "chrome" | "chromium" => {
            let mut args = vec!["--disable-gpu", "--no-sandbox", "--window-size=1280,1024"];
            if headless {
                args.push("--headless=new");
            }
            always_match["goog:chromeOptions"] = json!({ "args": args });
        }
        "firefox" => {
            let args: Vec<&str> = if headless { vec!["-headless"] } else { Vec::new() };
            always_match["moz:firefoxOptions"] = json!({ "args": args });
        }
        _ => {}
    }
    json!({ "capabilities": { "alwaysMatch": always_match } })
}

/// Split a WebDriver response into its `value` or a protocol error
fn response_value(success: bool, mut payload: Value) -> Result<Value, BrowserError> {
    let value = payload
        .get_mut("value")
        .map(Value::take)
        .unwrap_or(Value::Null);

    if success {
        return Ok(value);
    }

    let error = value
        .get("error")
        .and_then(Value::as_str)
        .unwrap_or("unknown error")
        .to_string();
    let message = value
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    Err(BrowserError::WebDriver { error, message })
}

struct Endpoint {
    base_url: String,
    client: reqwest::Client,
}

impl Endpoint {
    async fn command(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value, BrowserError> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.client.request(method, &url);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await?;
        let success = response.status().is_success();
        let payload: Value = response.json().await?;
        response_value(success, payload)
    }
}

/// Launches WebDriver-backed browsers
pub struct WebDriverLauncher {
    endpoint: Arc<Endpoint>,
    browser_name: String,
    headless: bool,
}

impl WebDriverLauncher {
    /// Create a launcher for a WebDriver endpoint
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(COMMAND_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            endpoint: Arc::new(Endpoint {
                base_url: base_url.into().trim_end_matches('/').to_string(),
                client,
            }),
            browser_name: DEFAULT_BROWSER.to_string(),
            headless: true,
        }
    }

    /// Request a different browser
    pub fn with_browser(mut self, browser_name: impl Into<String>) -> Self {
        self.browser_name = browser_name.into();
        self
    }

    /// Show the browser window
    pub fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }
}

#[async_trait]
impl BrowserLauncher for WebDriverLauncher {
    async fn launch(&self) -> Result<Arc<dyn Browser>, CapabilityError> {
        let status = self
            .endpoint
            .command(Method::GET, "/status", None)
            .await?;
        if status.get("ready").and_then(Value::as_bool) == Some(false) {
            return Err(CapabilityError::unavailable(format!(
                "WebDriver endpoint {} is not ready",
                self.endpoint.base_url
            )));
        }

        info!(endpoint = %self.endpoint.base_url, browser = %self.browser_name, "WebDriver browser ready");
        Ok(Arc::new(WebDriverBrowser {
            endpoint: Arc::clone(&self.endpoint),
            capabilities: capabilities(&self.browser_name, self.headless),
            sessions: Arc::new(Mutex::new(HashSet::new())),
            closed: AtomicBool::new(false),
        }))
    }
}

type SessionSet = Arc<Mutex<HashSet<String>>>;

fn lock(sessions: &SessionSet) -> MutexGuard<'_, HashSet<String>> {
    sessions.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A browser whose contexts are WebDriver sessions
pub struct WebDriverBrowser {
    endpoint: Arc<Endpoint>,
    capabilities: Value,
    sessions: SessionSet,
    closed: AtomicBool,
}

#[async_trait]
impl Browser for WebDriverBrowser {
    async fn new_context(&self) -> Result<Box<dyn BrowserContext>, CapabilityError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(BrowserError::Closed.into());
        }

        let value = self
            .endpoint
            .command(Method::POST, "/session", Some(self.capabilities.clone()))
            .await?;
        let session_id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| BrowserError::InvalidResponse("missing sessionId".to_string()))?
            .to_string();

        debug!(%session_id, "WebDriver session created");
        lock(&self.sessions).insert(session_id.clone());

        Ok(Box::new(WebDriverContext {
            endpoint: Arc::clone(&self.endpoint),
            sessions: Arc::clone(&self.sessions),
            session_id: Some(session_id),
        }))
    }

    async fn close(&self) -> Result<(), CapabilityError> {
        self.closed.store(true, Ordering::SeqCst);
        let remaining: Vec<String> = lock(&self.sessions).drain().collect();
        for session_id in remaining {
            let path = format!("/session/{}", session_id);
            if let Err(e) = self.endpoint.command(Method::DELETE, &path, None).await {
                warn!(%session_id, error = %e, "Failed to delete WebDriver session");
            }
        }
        info!("WebDriver browser closed");
        Ok(())
    }
}

/// One WebDriver session
pub struct WebDriverContext {
    endpoint: Arc<Endpoint>,
    sessions: SessionSet,
    session_id: Option<String>,
}

impl WebDriverContext {
    fn path(&self, suffix: &str) -> Result<String, BrowserError> {
        let session_id = self.session_id.as_deref().ok_or(BrowserError::Closed)?;
        Ok(format!("/session/{}{}", session_id, suffix))
    }
}

#[async_trait]
impl BrowserContext for WebDriverContext {
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<(), CapabilityError> {
        let timeouts = json!({ "pageLoad": timeout.as_millis() as u64 });
        self.endpoint
            .command(Method::POST, &self.path("/timeouts")?, Some(timeouts))
            .await?;
        self.endpoint
            .command(Method::POST, &self.path("/url")?, Some(json!({ "url": url })))
            .await?;
        Ok(())
    }

    async fn evaluate(&mut self, script: &str) -> Result<Value, CapabilityError> {
        let body = json!({ "script": script, "args": [] });
        Ok(self
            .endpoint
            .command(Method::POST, &self.path("/execute/sync")?, Some(body))
            .await?)
    }

    async fn current_url(&mut self) -> Result<String, CapabilityError> {
        let value = self
            .endpoint
            .command(Method::GET, &self.path("/url")?, None)
            .await?;
        match value {
            Value::String(url) => Ok(url),
            other => Err(BrowserError::InvalidResponse(format!("url was {}", other)).into()),
        }
    }

    async fn screenshot(&mut self) -> Result<Vec<u8>, CapabilityError> {
        let value = self
            .endpoint
            .command(Method::GET, &self.path("/screenshot")?, None)
            .await?;
        let encoded = value
            .as_str()
            .ok_or_else(|| BrowserError::InvalidResponse("screenshot was not a string".to_string()))?;
        STANDARD
            .decode(encoded)
            .map_err(|e| BrowserError::InvalidResponse(format!("screenshot decode: {}", e)).into())
    }

    async fn close(&mut self) -> Result<(), CapabilityError> {
        let Some(session_id) = self.session_id.take() else {
            return Ok(());
        };
        lock(&self.sessions).remove(&session_id);
        let path = format!("/session/{}", session_id);
        self.endpoint.command(Method::DELETE, &path, None).await?;
        debug!(%session_id, "WebDriver session deleted");
        Ok(())
    }
}
