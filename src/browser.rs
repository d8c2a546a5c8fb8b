//! Browser capability surface
//!
//! `BrowserDriver` is what the dispatcher drives; `BrowserSession` owns at
//! most one driver and launches it lazily on the first browser-requiring
//! action. `HttpBrowser` is the built-in driver: it fetches pages over HTTP
//! and answers DOM queries from the parsed HTML, without a script engine.

use crate::config::AssistantConfig;
use crate::error::DriverError;
use crate::page_extractor::{self, absolute_href};
use crate::types::PageDigest;
use async_trait::async_trait;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

/// How to find elements on the current page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    Tag(String),
    Css(String),
    /// Anchor whose visible text matches, case-insensitively
    LinkText(String),
}

impl Locator {
    pub fn tag(tag: &str) -> Self {
        Locator::Tag(tag.to_string())
    }
}

/// Snapshot of an element returned by `find_elements`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebElement {
    /// Position among the elements the locator matched
    pub index: usize,
    pub tag: String,
    pub text: String,
    pub href: Option<String>,
    pub visible: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrollDirection {
    Down,
    Up,
    Top,
    Bottom,
}

impl ScrollDirection {
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_lowercase().as_str() {
            "down" | "baixo" | "" => Some(ScrollDirection::Down),
            "up" | "cima" => Some(ScrollDirection::Up),
            "top" | "topo" | "início" | "inicio" => Some(ScrollDirection::Top),
            "bottom" | "fim" | "final" => Some(ScrollDirection::Bottom),
            _ => None,
        }
    }

    pub fn script(self) -> &'static str {
        match self {
            ScrollDirection::Down => "window.scrollBy(0, 500);",
            ScrollDirection::Up => "window.scrollBy(0, -500);",
            ScrollDirection::Top => "window.scrollTo(0, 0);",
            ScrollDirection::Bottom => "window.scrollTo(0, document.body.scrollHeight);",
        }
    }
}

/// What is left after closing a tab
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabClose {
    /// Another tab is now in front
    Remaining,
    /// That was the last tab; the driver has shut down
    LastTab,
}

#[async_trait]
pub trait BrowserDriver: Send + Sync {
    async fn navigate(&mut self, url: &str) -> Result<(), DriverError>;

    async fn current_url(&self) -> Result<String, DriverError>;

    async fn title(&self) -> Result<String, DriverError>;

    async fn page_source(&self) -> Result<String, DriverError>;

    async fn find_elements(&self, locator: &Locator) -> Result<Vec<WebElement>, DriverError>;

    async fn click(&mut self, element: &WebElement) -> Result<(), DriverError>;

    async fn execute_script(&mut self, script: &str) -> Result<serde_json::Value, DriverError>;

    async fn scroll(&mut self, direction: ScrollDirection) -> Result<(), DriverError> {
        self.execute_script(direction.script()).await.map(|_| ())
    }

    async fn screenshot(&self, path: &Path) -> Result<(), DriverError>;

    async fn close_tab(&mut self) -> Result<TabClose, DriverError>;

    async fn quit(&mut self) -> Result<(), DriverError>;
}

/// Starts a driver when the session first needs one
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn BrowserDriver>, DriverError>;
}

/// Single owner of the (optional) browser driver
pub struct BrowserSession {
    launcher: Box<dyn BrowserLauncher>,
    driver: Option<Box<dyn BrowserDriver>>,
}

impl BrowserSession {
    pub fn new(launcher: Box<dyn BrowserLauncher>) -> Self {
        Self {
            launcher,
            driver: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.driver.is_some()
    }

    /// The driver, launching it first if needed
    pub async fn driver(&mut self) -> Result<&mut Box<dyn BrowserDriver>, DriverError> {
        if self.driver.is_none() {
            log::info!("launching browser driver");
            let driver = self.launcher.launch().await?;
            self.driver = Some(driver);
        }
        self.driver.as_mut().ok_or(DriverError::NotInitialized)
    }

    /// The driver if one is already running
    pub fn active(&mut self) -> Result<&mut Box<dyn BrowserDriver>, DriverError> {
        self.driver.as_mut().ok_or(DriverError::NotInitialized)
    }

    /// Digest of the current page; needs an open browser
    pub async fn digest(&mut self) -> Result<PageDigest, DriverError> {
        let driver = self.active()?;
        read_digest(&**driver).await
    }

    /// Close the front tab. Closing the last one ends the session.
    pub async fn close_tab(&mut self) -> Result<TabClose, DriverError> {
        let closed = self.active()?.close_tab().await?;
        if closed == TabClose::LastTab {
            log::info!("last tab closed, browser session ended");
            self.driver = None;
        }
        Ok(closed)
    }

    /// Quit the browser. Returns false if none was open.
    pub async fn quit(&mut self) -> Result<bool, DriverError> {
        match self.driver.take() {
            Some(mut driver) => {
                log::info!("quitting browser driver");
                driver.quit().await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// Digest via the page source, or via body text for drivers without one
pub async fn read_digest(driver: &dyn BrowserDriver) -> Result<PageDigest, DriverError> {
    let url = driver.current_url().await?;
    let title = driver.title().await.unwrap_or_default();

    match driver.page_source().await {
        Ok(html) => Ok(page_extractor::extract_digest(&html, &url, &title)),
        Err(DriverError::Unsupported(_)) => {
            let body = driver
                .find_elements(&Locator::tag("body"))
                .await?
                .into_iter()
                .next()
                .map(|b| b.text)
                .unwrap_or_default();
            Ok(page_extractor::plain_text_digest(&url, &title, &body))
        }
        Err(e) => Err(e),
    }
}

/// Bot-check pages served instead of real results
pub fn detect_human_challenge(url: &str, content: &str) -> Option<&'static str> {
    let url_lc = url.to_ascii_lowercase();
    let content_lc = content.to_ascii_lowercase();

    if url_lc.contains("/sorry/") || content_lc.contains("/sorry/") {
        return Some("challenge redirect (/sorry/) detected");
    }
    if content_lc.contains("recaptcha") || content_lc.contains("g-recaptcha") {
        return Some("reCAPTCHA challenge marker detected");
    }
    if content_lc.contains("i'm not a robot") || content_lc.contains("i am not a robot") {
        return Some("robot-verification checkbox detected");
    }
    if content_lc.contains("verify you are human") || content_lc.contains("human verification") {
        return Some("human-verification challenge detected");
    }
    if content_lc.contains("anomaly") && url_lc.contains("duckduckgo") {
        return Some("duckduckgo anomaly/bot-check detected");
    }

    None
}

struct Tab {
    url: String,
    html: String,
}

/// Fetch-and-parse driver over reqwest
pub struct HttpBrowser {
    client: reqwest::Client,
    tabs: Vec<Tab>,
}

impl HttpBrowser {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, DriverError> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| DriverError::Launch(e.to_string()))?;

        Ok(Self {
            client,
            tabs: Vec::new(),
        })
    }

    fn front(&self) -> Result<&Tab, DriverError> {
        self.tabs.last().ok_or(DriverError::NotInitialized)
    }

    /// Load `url` into the front tab, opening one if there is none
    async fn load(&mut self, url: &str) -> Result<(), DriverError> {
        let navigation_error = |e: reqwest::Error| DriverError::Navigation {
            url: url.to_string(),
            reason: e.to_string(),
        };

        let response = self.client.get(url).send().await.map_err(navigation_error)?;
        let final_url = response.url().to_string();
        let status = response.status();
        let html = response.text().await.map_err(navigation_error)?;
        log::debug!("GET {} -> {} ({} bytes)", final_url, status, html.len());

        let tab = Tab {
            url: final_url,
            html,
        };
        match self.tabs.last_mut() {
            Some(front) => *front = tab,
            None => self.tabs.push(tab),
        }
        Ok(())
    }
}

#[async_trait]
impl BrowserDriver for HttpBrowser {
    async fn navigate(&mut self, url: &str) -> Result<(), DriverError> {
        self.load(url).await
    }

    async fn current_url(&self) -> Result<String, DriverError> {
        Ok(self.front()?.url.clone())
    }

    async fn title(&self) -> Result<String, DriverError> {
        let tab = self.front()?;
        Ok(find_in_html(&tab.html, &tab.url, &Locator::tag("title"))?
            .into_iter()
            .next()
            .map(|t| t.text)
            .unwrap_or_default())
    }

    async fn page_source(&self) -> Result<String, DriverError> {
        Ok(self.front()?.html.clone())
    }

    async fn find_elements(&self, locator: &Locator) -> Result<Vec<WebElement>, DriverError> {
        let tab = self.front()?;
        find_in_html(&tab.html, &tab.url, locator)
    }

    async fn click(&mut self, element: &WebElement) -> Result<(), DriverError> {
        match &element.href {
            Some(href) => {
                let target = href.clone();
                self.load(&target).await
            }
            None => Err(DriverError::Unsupported("clicking elements without a link")),
        }
    }

    async fn execute_script(&mut self, _script: &str) -> Result<serde_json::Value, DriverError> {
        Err(DriverError::Unsupported("script execution"))
    }

    async fn screenshot(&self, _path: &Path) -> Result<(), DriverError> {
        Err(DriverError::Unsupported("page screenshots"))
    }

    async fn close_tab(&mut self) -> Result<TabClose, DriverError> {
        self.tabs.pop().ok_or(DriverError::NotInitialized)?;
        if self.tabs.is_empty() {
            Ok(TabClose::LastTab)
        } else {
            Ok(TabClose::Remaining)
        }
    }

    async fn quit(&mut self) -> Result<(), DriverError> {
        self.tabs.clear();
        Ok(())
    }
}

/// Answer a locator query from raw HTML
pub fn find_in_html(html: &str, base_url: &str, locator: &Locator) -> Result<Vec<WebElement>, DriverError> {
    let css = match locator {
        Locator::Tag(tag) => tag.as_str(),
        Locator::Css(css) => css.as_str(),
        Locator::LinkText(_) => "a",
    };
    let selector = Selector::parse(css)
        .map_err(|e| DriverError::Other(format!("invalid selector '{}': {:?}", css, e)))?;

    let document = Html::parse_document(html);
    let base = Url::parse(base_url).ok();

    let wanted = match locator {
        Locator::LinkText(text) => Some(text.trim().to_lowercase()),
        _ => None,
    };

    let elements = document
        .select(&selector)
        .map(|elem| {
            let href = elem
                .value()
                .attr("href")
                .map(|h| absolute_href(base.as_ref(), h.trim()));
            WebElement {
                index: 0,
                tag: elem.value().name().to_string(),
                text: page_extractor::element_text(elem),
                href,
                visible: !page_extractor::is_hidden(elem),
            }
        })
        .filter(|e| match &wanted {
            Some(text) => e.text.to_lowercase() == *text,
            None => true,
        })
        .enumerate()
        .map(|(index, e)| WebElement { index, ..e })
        .collect();

    Ok(elements)
}

/// Launches `HttpBrowser` drivers
pub struct HttpLauncher {
    user_agent: String,
    timeout: Duration,
}

impl HttpLauncher {
    pub fn new(config: &AssistantConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            timeout: config.page_load_timeout(),
        }
    }
}

#[async_trait]
impl BrowserLauncher for HttpLauncher {
    async fn launch(&self) -> Result<Box<dyn BrowserDriver>, DriverError> {
        Ok(Box::new(HttpBrowser::new(&self.user_agent, self.timeout)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><head><title>Shop</title></head>
        <body>
          <a href="/cart">Ver carrinho</a>
          <a href="https://other.example/help">Ajuda</a>
          <button>Comprar agora</button>
          <div style="display:none"><a href="/hidden">Oculto</a></div>
        </body></html>"#;

    #[test]
    fn test_find_by_tag() {
        let links = find_in_html(PAGE, "https://shop.example/", &Locator::tag("a")).unwrap();

        assert_eq!(links.len(), 3);
        assert_eq!(links[0].href.as_deref(), Some("https://shop.example/cart"));
        assert_eq!(links[1].index, 1);
        assert!(!links[2].visible);
    }

    #[test]
    fn test_find_by_link_text() {
        let found = find_in_html(
            PAGE,
            "https://shop.example/",
            &Locator::LinkText("ajuda".to_string()),
        )
        .unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].text, "Ajuda");
        assert_eq!(found[0].index, 0);
    }

    #[test]
    fn test_invalid_selector() {
        let err = find_in_html(PAGE, "", &Locator::Css("a[".to_string())).unwrap_err();
        assert!(matches!(err, DriverError::Other(_)));
    }

    #[test]
    fn test_scroll_direction_parse() {
        assert_eq!(ScrollDirection::parse("down"), Some(ScrollDirection::Down));
        assert_eq!(ScrollDirection::parse("Top"), Some(ScrollDirection::Top));
        assert_eq!(ScrollDirection::parse(""), Some(ScrollDirection::Down));
        assert_eq!(ScrollDirection::parse("sideways"), None);
        assert!(ScrollDirection::Bottom.script().contains("scrollHeight"));
    }

    #[test]
    fn test_human_challenge() {
        assert!(detect_human_challenge("https://www.google.com/sorry/index", "").is_some());
        assert!(detect_human_challenge("https://x.example", "<div class=g-recaptcha>").is_some());
        assert!(detect_human_challenge("https://x.example", "<p>results</p>").is_none());
    }

    #[tokio::test]
    async fn test_session_starts_closed() {
        let config = AssistantConfig::default();
        let mut session = BrowserSession::new(Box::new(HttpLauncher::new(&config)));

        assert!(!session.is_open());
        assert!(matches!(session.digest().await, Err(DriverError::NotInitialized)));
        assert!(!session.quit().await.unwrap());
    }

    #[tokio::test]
    async fn test_http_browser_without_tabs() {
        let mut browser = HttpBrowser::new("test", Duration::from_secs(1)).unwrap();

        assert!(matches!(browser.current_url().await, Err(DriverError::NotInitialized)));
        assert!(matches!(
            browser.scroll(ScrollDirection::Down).await,
            Err(DriverError::Unsupported(_))
        ));
        assert!(matches!(browser.close_tab().await, Err(DriverError::NotInitialized)));
    }
}
