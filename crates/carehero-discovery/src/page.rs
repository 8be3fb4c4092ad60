//! Page capture and navigation helpers
//!
//! Scripts are WebDriver-style function bodies: they are run with
//! `BrowserContext::evaluate` and `return` a JSON-serializable value.

use carehero_domain::{BrowserContext, CapabilityError};
use serde::Deserialize;
use std::time::Duration;
use tokio::time::timeout;
use tracing::debug;

/// Returns the href of the first link that looks like a booking entry point
pub const FIND_BOOKING_LINK_SCRIPT: &str = r#"
const keywords = ['appointment', 'book', 'schedule', 'visit'];
for (const link of document.querySelectorAll('a[href]')) {
  const text = (link.textContent || '').toLowerCase();
  const href = (link.getAttribute('href') || '').toLowerCase();
  if (keywords.some(k => text.includes(k) || href.includes(k))) {
    return link.href;
  }
}
return null;
"#;

/// Returns `{url, text, interactive: [{tag, text}]}` for the loaded page
pub const CAPTURE_PAGE_SCRIPT: &str = r#"
const interactive = Array.from(
  document.querySelectorAll('button, a, [role="button"], input[type="button"], input[type="submit"]')
).map(el => ({
  tag: el.tagName.toLowerCase(),
  text: (el.innerText || el.value || el.textContent || '').trim()
})).filter(el => el.text.length > 0 && el.text.length < 200);
return {
  url: window.location.href,
  text: document.body ? document.body.innerText : '',
  interactive: interactive
};
"#;

/// A clickable element's visible text
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct InteractiveElement {
    /// Lower-case tag name
    #[serde(default)]
    pub tag: String,
    /// Visible text
    #[serde(default)]
    pub text: String,
}

/// Everything the extraction stages need from a rendered page
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PageContent {
    /// Final URL after redirects and click-through
    #[serde(default)]
    pub url: String,
    /// Visible body text
    #[serde(default)]
    pub text: String,
    /// Buttons, links and role=button elements
    #[serde(default)]
    pub interactive: Vec<InteractiveElement>,
}

impl PageContent {
    /// Capture the current page of `ctx`
    pub async fn capture(ctx: &mut dyn BrowserContext) -> Result<Self, CapabilityError> {
        let value = ctx.evaluate(CAPTURE_PAGE_SCRIPT).await?;
        serde_json::from_value(value)
            .map_err(|e| CapabilityError::invalid_response(format!("page capture: {}", e)))
    }
}

/// Load `url`, enforcing `limit` even if the context ignores it
pub async fn navigate(
    ctx: &mut dyn BrowserContext,
    url: &str,
    limit: Duration,
) -> Result<(), CapabilityError> {
    match timeout(limit, ctx.navigate(url, limit)).await {
        Ok(result) => result,
        Err(_) => Err(CapabilityError::timeout(format!(
            "navigation to {} exceeded {}s",
            url,
            limit.as_secs()
        ))),
    }
}

/// Best-effort click-through to a booking sub-page
///
/// Returns true when a different page was loaded. Failures are logged and
/// leave the context on whatever page it reached.
pub async fn follow_booking_link(ctx: &mut dyn BrowserContext, limit: Duration) -> bool {
    let href = match ctx.evaluate(FIND_BOOKING_LINK_SCRIPT).await {
        Ok(serde_json::Value::String(href)) => href,
        Ok(_) => return false,
        Err(e) => {
            debug!(error = %e, "Booking link lookup failed");
            return false;
        }
    };

    if !(href.starts_with("http://") || href.starts_with("https://")) {
        return false;
    }
    if let Ok(current) = ctx.current_url().await {
        if current.trim_end_matches('/') == href.trim_end_matches('/') {
            return false;
        }
    }

    match navigate(ctx, &href, limit).await {
        Ok(()) => {
            debug!(%href, "Followed booking link");
            true
        }
        Err(e) => {
            debug!(%href, error = %e, "Booking link navigation failed");
            false
        }
    }
}
