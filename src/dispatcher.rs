//! Action Dispatcher - Intent → capability calls → ActionContext
//!
//! Owns the browser session and the OS capability. Every browser-affecting
//! action re-reads the resulting page and reports it; failures come back as
//! "could not be completed" contexts instead of errors.

use crate::action_context;
use crate::browser::{read_digest, BrowserSession, Locator, ScrollDirection, TabClose, WebElement};
use crate::config::{AssistantConfig, DEFAULT_SEARCH_URL};
use crate::error::{DriverError, OsError};
use crate::headline_filter;
use crate::lexicon::DEFAULT_NEWS_SOURCES;
use crate::os::{CommandOutput, InputEvent, OsCapability};
use crate::page_extractor::{self, NewsCandidates};
use crate::types::*;
use std::path::PathBuf;
use std::time::Duration;

/// Dispatcher knobs taken from the assistant configuration
#[derive(Debug, Clone)]
pub struct DispatchSettings {
    pub search_url: String,
    pub page_settle: Duration,
    pub command_timeout: Duration,
    pub screenshot_dir: PathBuf,
    pub news_sites_per_summary: usize,
}

impl From<&AssistantConfig> for DispatchSettings {
    fn from(config: &AssistantConfig) -> Self {
        Self {
            search_url: config.search_url.clone(),
            page_settle: config.page_settle(),
            command_timeout: config.command_timeout(),
            screenshot_dir: config.screenshot_dir.clone(),
            news_sites_per_summary: config.news_sites_per_summary.max(1),
        }
    }
}

/// Search URL for `query` from a `{query}` template
pub fn search_url(template: &str, query: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(query.as_bytes()).collect();
    template.replace("{query}", &encoded)
}

pub struct Dispatcher {
    browser: BrowserSession,
    os: Box<dyn OsCapability>,
    settings: DispatchSettings,
}

impl Dispatcher {
    pub fn new(browser: BrowserSession, os: Box<dyn OsCapability>, settings: DispatchSettings) -> Self {
        Self {
            browser,
            os,
            settings,
        }
    }

    pub fn browser_open(&self) -> bool {
        self.browser.is_open()
    }

    /// Run the action behind `intent`. Chat intents have no action.
    pub async fn dispatch(&mut self, intent: &Intent) -> Option<ActionContext> {
        log::info!("dispatching {:?} ({:.2})", intent.kind(), intent.confidence);

        let context = match &intent.action {
            IntentAction::Chat => return None,
            IntentAction::OpenSite { name, url } => self
                .open(name, url)
                .await
                .unwrap_or_else(|e| action_context::failed(&format!("open {}", name), &e.to_string())),
            IntentAction::OpenUrl { url } => self
                .open(url, url)
                .await
                .unwrap_or_else(|e| action_context::failed(&format!("open {}", url), &e.to_string())),
            IntentAction::Search { query } => self
                .search(query)
                .await
                .unwrap_or_else(|e| action_context::failed(&format!("search for '{}'", query), &e.to_string())),
            IntentAction::NewsSummary { sites } => self.news_summary(sites).await,
            IntentAction::Screenshot => match self.os.screenshot(&self.settings.screenshot_dir).await {
                Ok(path) => action_context::screenshot_saved(&path),
                Err(e) => action_context::failed("take a screenshot", &e.to_string()),
            },
            IntentAction::CloseBrowser => match self.browser.quit().await {
                Ok(was_open) => action_context::browser_closed(was_open),
                Err(e) => action_context::failed("close the browser", &e.to_string()),
            },
            IntentAction::CloseTab => self.close_tab().await,
            IntentAction::ExecuteProgram { name, command } => match self.os.launch(command).await {
                Ok(()) => action_context::program_launched(name, command),
                Err(e) => action_context::failed(&format!("launch {}", name), &e.to_string()),
            },
        };

        log::info!("dispatch of {:?} finished", intent.kind());
        Some(context)
    }

    async fn settle(&self) {
        if !self.settings.page_settle.is_zero() {
            tokio::time::sleep(self.settings.page_settle).await;
        }
    }

    /// Navigate, launching the browser first if needed
    async fn navigate(&mut self, url: &str) -> Result<(), DriverError> {
        self.browser.driver().await?.navigate(url).await?;
        self.settle().await;
        Ok(())
    }

    async fn open(&mut self, label: &str, url: &str) -> Result<ActionContext, DriverError> {
        self.navigate(url).await?;
        let digest = self.browser.digest().await?;
        Ok(action_context::opened_page(label, &digest))
    }

    /// Results page for `query`, falling back to DuckDuckGo when the
    /// configured engine answers with a bot check
    async fn search_page(&mut self, query: &str) -> Result<PageDigest, DriverError> {
        self.navigate(&search_url(&self.settings.search_url, query)).await?;

        if let Some(reason) = self.challenge().await {
            if self.settings.search_url == DEFAULT_SEARCH_URL {
                return Err(DriverError::Other(reason.to_string()));
            }
            log::warn!("search page blocked ({}), retrying on duckduckgo", reason);
            self.navigate(&search_url(DEFAULT_SEARCH_URL, query)).await?;
        }

        self.browser.digest().await
    }

    async fn search(&mut self, query: &str) -> Result<ActionContext, DriverError> {
        let digest = self.search_page(query).await?;
        Ok(action_context::searched(query, &digest))
    }

    /// Human-verification marker on the current page, if any
    async fn challenge(&mut self) -> Option<&'static str> {
        let driver = self.browser.active().ok()?;
        let url = driver.current_url().await.unwrap_or_default();
        let source = driver.page_source().await.unwrap_or_default();
        crate::browser::detect_human_challenge(&url, &source)
    }

    /// Headline candidates from one page
    async fn news_page(&mut self, url: &str) -> Result<NewsCandidates, DriverError> {
        self.navigate(url).await?;
        let html = self.browser.active()?.page_source().await?;
        Ok(page_extractor::news_candidates(&html))
    }

    /// Filtered headlines gathered across `sites`; errors only when every site failed
    async fn gather_headlines(&mut self, sites: &[String]) -> Result<(Vec<String>, Vec<String>), DriverError> {
        let mut primary = Vec::new();
        let mut secondary = Vec::new();
        let mut visited = Vec::new();
        let mut last_error = None;

        for site in sites {
            match self.news_page(site).await {
                Ok(candidates) => {
                    primary.extend(candidates.primary);
                    secondary.extend(candidates.secondary);
                    visited.push(site.clone());
                }
                Err(e) => {
                    log::warn!("could not read news from {}: {}", site, e);
                    last_error = Some(e);
                }
            }
        }

        match (visited.is_empty(), last_error) {
            (true, Some(e)) => Err(e),
            _ => Ok((headline_filter::collect_headlines(&primary, &secondary), visited)),
        }
    }

    async fn news_summary(&mut self, sites: &[String]) -> ActionContext {
        let take = self.settings.news_sites_per_summary.min(sites.len());
        match self.gather_headlines(&sites[..take]).await {
            Ok((headlines, visited)) => action_context::news_summary(&headlines, &visited),
            Err(e) => action_context::failed("read the news", &e.to_string()),
        }
    }

    async fn close_tab(&mut self) -> ActionContext {
        if !self.browser.is_open() {
            return action_context::no_browser_open();
        }

        match self.browser.close_tab().await {
            Ok(TabClose::LastTab) => action_context::tab_closed(None),
            // Re-read the page now in front so its clickables are current
            Ok(TabClose::Remaining) => match self.browser.digest().await {
                Ok(digest) => action_context::tab_closed(Some(&digest)),
                Err(e) => {
                    log::warn!("could not read the remaining tab: {}", e);
                    let mut digest = PageDigest::default();
                    if let Ok(driver) = self.browser.active() {
                        digest.title = driver.title().await.unwrap_or_default();
                        digest.url = driver.current_url().await.unwrap_or_default();
                    }
                    action_context::tab_closed(Some(&digest))
                }
            },
            Err(e) => action_context::failed("close the tab", &e.to_string()),
        }
    }

    // Slash-command and conversational actions. These return typed results;
    // the caller decides how to phrase them.

    /// Open `url` and return the page title
    pub async fn open_url(&mut self, url: &str) -> Result<String, DriverError> {
        self.navigate(url).await?;
        self.browser.active()?.title().await
    }

    /// Search and return the results page digest
    pub async fn search_digest(&mut self, query: &str) -> Result<PageDigest, DriverError> {
        self.search_page(query).await
    }

    /// Open `url` and read it in analyze mode
    pub async fn analyze(&mut self, url: &str) -> Result<PageAnalysis, DriverError> {
        self.navigate(url).await?;
        let driver = self.browser.active()?;
        let html = driver.page_source().await?;
        let current = driver.current_url().await?;
        let title = driver.title().await.unwrap_or_default();
        Ok(page_extractor::analyze_page(&html, &current, &title))
    }

    /// Filtered headlines from the first default news source
    pub async fn news(&mut self) -> Result<Vec<String>, DriverError> {
        let sources = [DEFAULT_NEWS_SOURCES[0].to_string()];
        self.gather_headlines(&sources).await.map(|(headlines, _)| headlines)
    }

    /// Click the first visible button, then link, whose text contains
    /// `target`, and return the resulting page. Needs an open browser.
    pub async fn click(&mut self, target: &str) -> Result<PageDigest, DriverError> {
        let wanted = target.trim().to_lowercase();
        let driver = self.browser.active()?;

        let mut found: Option<WebElement> = None;
        for tag in ["button", "a"] {
            found = driver
                .find_elements(&Locator::tag(tag))
                .await?
                .into_iter()
                .find(|e| e.visible && e.text.to_lowercase().contains(&wanted));
            if found.is_some() {
                break;
            }
        }

        let element = found.ok_or_else(|| DriverError::ElementNotFound(target.to_string()))?;
        log::info!("clicking <{}> '{}'", element.tag, element.text);
        driver.click(&element).await?;
        self.settle().await;

        let driver = self.browser.active()?;
        read_digest(&**driver).await
    }

    pub async fn scroll(&mut self, direction: ScrollDirection) -> Result<(), DriverError> {
        self.browser.active()?.scroll(direction).await
    }

    /// Visible clickable elements of the current page, rendered as a list
    pub async fn elements(&mut self) -> Result<String, DriverError> {
        let digest = self.browser.digest().await?;
        Ok(action_context::render_clickables(&digest.clickable_elements))
    }

    /// Context for a click requested in conversation
    pub async fn click_in_conversation(&mut self, target: &str) -> ActionContext {
        match self.click(target).await {
            Ok(digest) => action_context::clicked(target, &digest),
            Err(e) => action_context::failed(&format!("click '{}'", target), &e.to_string()),
        }
    }

    /// Context for an analysis requested in conversation
    pub async fn analyze_in_conversation(&mut self, url: &str) -> ActionContext {
        match self.analyze(url).await {
            Ok(analysis) => action_context::analyzed(&analysis),
            Err(e) => action_context::failed(&format!("analyze {}", url), &e.to_string()),
        }
    }

    /// Digest of the open page, None when no browser is open or it cannot be read
    pub async fn current_page_context(&mut self) -> Option<ActionContext> {
        if !self.browser.is_open() {
            return None;
        }
        match self.browser.digest().await {
            Ok(digest) => Some(action_context::current_page(&digest)),
            Err(e) => {
                log::warn!("could not read the current page: {}", e);
                None
            }
        }
    }

    /// Clickable elements of the open page as chat context
    pub async fn elements_in_conversation(&mut self) -> Option<ActionContext> {
        if !self.browser.is_open() {
            return None;
        }
        match self.browser.digest().await {
            Ok(digest) => Some(action_context::page_elements(&digest)),
            Err(e) => Some(action_context::failed("read the page elements", &e.to_string())),
        }
    }

    /// Synthesize keyboard or mouse input on the desktop
    pub async fn input(&self, event: &InputEvent) -> Result<(), OsError> {
        log::info!("synthesizing input {:?}", event);
        self.os.synthesize_input(event).await
    }

    /// Run a shell command to completion under the command timeout
    pub async fn run(&self, command: &str) -> Result<CommandOutput, OsError> {
        self.os.run(command, self.settings.command_timeout).await
    }

    /// Quit the browser if it is open
    pub async fn shutdown(&mut self) {
        if let Err(e) = self.browser.quit().await {
            log::warn!("browser did not quit cleanly: {}", e);
        }
    }
}
