//! Construction of the external capabilities from CLI configuration.

use crate::config::Config;
use carehero_discovery::{ExaClient, SearchError, WebDriverLauncher};
use carehero_domain::{BrowserLauncher, TextGenerator};
use carehero_llm::OllamaProvider;
use carehero_orchestrator::DiscoveryServices;
use std::sync::Arc;

/// Ollama text generation.
pub fn text_generator(config: &Config) -> Arc<dyn TextGenerator> {
    Arc::new(
        OllamaProvider::new(&config.llm.endpoint, &config.llm.model)
            .with_max_retries(config.llm.max_retries),
    )
}

/// WebDriver browser automation.
pub fn browser_launcher(config: &Config) -> Arc<dyn BrowserLauncher> {
    Arc::new(
        WebDriverLauncher::new(&config.browser.webdriver_url)
            .with_browser(&config.browser.browser)
            .with_headless(config.browser.headless),
    )
}

/// Exa search plus WebDriver.
///
/// Fails when the API key variable is not set.
pub fn discovery_services(config: &Config) -> Result<DiscoveryServices, SearchError> {
    let exa = Arc::new(ExaClient::from_env(&config.search.api_key_env)?);
    Ok(DiscoveryServices {
        search: exa.clone(),
        qa: exa,
        launcher: browser_launcher(config),
    })
}
