//! Deskpilot - a desktop assistant that acts before it talks
//!
//! Free-form requests are classified into a small set of actions (open a
//! site, search, summarize the news, screenshot, close, launch a program),
//! carried out through browser and OS capabilities, and the observed result
//! is handed to a local language model as conversational context.
//!
//! # Architecture
//!
//! - **Intent Parser**: utterance → Intent, a fixed-order cascade of detectors
//! - **Page Extractor**: raw HTML → bounded PageDigest / PageAnalysis
//! - **Headline Filter**: quality gate for news aggregator headlines
//! - **Dispatcher**: Intent → browser/OS calls → ActionContext
//! - **LLM Connector**: Ollama chat with a rolling conversation
//! - **Session**: single worker that owns all of the above
//!
//! # Usage
//!
//! ```rust,no_run
//! use deskpilot::{spawn_session, Assistant, AssistantConfig};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let assistant = Assistant::with_defaults(AssistantConfig::default())?;
//! let (session, mut replies) = spawn_session(assistant)?;
//!
//! let request = session.submit("abre o youtube")?;
//! request.wait().await;
//! while let Ok(reply) = replies.try_recv() {
//!     println!("[{}] {}", reply.sender, reply.text);
//! }
//! # Ok(())
//! # }
//! ```

pub mod types;
pub mod config;
pub mod error;
pub mod lexicon;
pub mod query_extractor;
pub mod intent_parser;
pub mod page_extractor;
pub mod headline_filter;
pub mod action_context;
pub mod browser;
pub mod os;
pub mod dispatcher;
pub mod llm_connector;
pub mod commands;
pub mod session;

pub use types::*;
pub use config::AssistantConfig;
pub use session::{spawn_session, CancelFlag, RequestHandle, SessionClient, SessionStatus};

use browser::{BrowserLauncher, BrowserSession, HttpLauncher};
use commands::SlashCommand;
use dispatcher::{DispatchSettings, Dispatcher};
use error::{ChatError, DriverError};
use intent_parser::{with_scheme, IntentParser};
use lexicon::Lexicon;
use llm_connector::{ChatClient, Conversation, OllamaClient};
use os::{InputEvent, OsCapability, SystemOs};

use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

/// Command output shown to the user is cut at this many characters
const MAX_COMMAND_OUTPUT: usize = 2000;

/// Main engine: classify, act, then talk
pub struct Assistant {
    config: AssistantConfig,
    parser: IntentParser,
    dispatcher: Dispatcher,
    chat: Box<dyn ChatClient>,
    conversation: Conversation,
    llm_online: bool,
}

impl Assistant {
    pub fn new(
        config: AssistantConfig,
        launcher: Box<dyn BrowserLauncher>,
        os: Box<dyn OsCapability>,
        chat: Box<dyn ChatClient>,
    ) -> Self {
        let lexicon = Arc::new(Lexicon::with_overrides(&config.sites, &config.programs));
        let dispatcher = Dispatcher::new(
            BrowserSession::new(launcher),
            os,
            DispatchSettings::from(&config),
        );

        Self {
            parser: IntentParser::new(lexicon),
            dispatcher,
            chat,
            conversation: Conversation::new(config.history_limit),
            llm_online: false,
            config,
        }
    }

    /// Built-in HTTP browser, the real OS and an Ollama client
    pub fn with_defaults(config: AssistantConfig) -> Result<Self, ChatError> {
        let chat = OllamaClient::new(&config)?;
        let launcher = HttpLauncher::new(&config);
        Ok(Self::new(config, Box::new(launcher), Box::new(SystemOs), Box::new(chat)))
    }

    pub fn config(&self) -> &AssistantConfig {
        &self.config
    }

    pub fn classify(&self, input: &str) -> Intent {
        self.parser.classify(input)
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn browser_open(&self) -> bool {
        self.dispatcher.browser_open()
    }

    /// Last known reachability of the chat endpoint
    pub fn llm_online(&self) -> bool {
        self.llm_online
    }

    pub async fn probe(&mut self) -> bool {
        self.llm_online = self.chat.probe().await;
        self.llm_online
    }

    pub async fn shutdown(&mut self) {
        self.dispatcher.shutdown().await;
    }

    /// Handle one line of user input, emitting replies on `out`.
    ///
    /// `cancel` is checked before starting and again between the action and
    /// the language-model call.
    pub async fn handle(&mut self, input: &str, cancel: &CancelFlag, out: &UnboundedSender<Reply>) -> Outcome {
        let input = input.trim();
        if cancel.is_cancelled() {
            return Outcome::Cancelled;
        }
        if input.is_empty() {
            return Outcome::Completed;
        }

        if let Some(command) = SlashCommand::parse(input) {
            if let Some(reply) = self.run_command(command).await {
                let _ = out.send(reply);
            }
            return Outcome::Completed;
        }

        let intent = self.parser.classify(input);
        let context = if !intent.is_chat() && intent.confidence >= self.config.min_action_confidence {
            if let Some(explanation) = self.parser.explain(&intent) {
                let _ = out.send(Reply::system(format!("⚡ {}...", explanation)));
            }
            self.dispatcher.dispatch(&intent).await
        } else {
            self.conversational_context(input).await
        };

        if cancel.is_cancelled() {
            log::info!("request cancelled before the chat call");
            return Outcome::Cancelled;
        }

        let reply = match self
            .conversation
            .send(self.chat.as_ref(), input, context.as_ref())
            .await
        {
            Ok(text) => {
                self.llm_online = true;
                Reply::assistant(text)
            }
            Err(e) => {
                if matches!(e, ChatError::Connection(_)) {
                    self.llm_online = false;
                }
                Reply::error(e.user_message())
            }
        };
        let _ = out.send(reply);
        Outcome::Completed
    }

    /// Web action implied by a free-form utterance that classified as chat
    async fn conversational_context(&mut self, input: &str) -> Option<ActionContext> {
        if self.dispatcher.browser_open() {
            if self.parser.asks_for_elements(input) {
                return self.dispatcher.elements_in_conversation().await;
            }
            if let Some(target) = self.parser.click_target(input) {
                return Some(self.dispatcher.click_in_conversation(&target).await);
            }
        }
        if let Some(url) = self.parser.analyze_target(input) {
            return Some(self.dispatcher.analyze_in_conversation(&url).await);
        }
        self.dispatcher.current_page_context().await
    }

    async fn run_command(&mut self, command: SlashCommand) -> Option<Reply> {
        log::debug!("slash command {:?}", command);

        let reply = match command {
            SlashCommand::Browser(url) => {
                let url = with_scheme(&url);
                match self.dispatcher.open_url(&url).await {
                    Ok(title) => Reply::system(format!("✓ Opened {} ({})", url, title)),
                    Err(e) => Reply::error(format!("✗ Could not open {}: {}", url, e)),
                }
            }
            SlashCommand::Search(query) => match self.dispatcher.search_digest(&query).await {
                Ok(digest) => Reply::system(action_context::search_results(&query, &digest)),
                Err(e) => Reply::error(format!("✗ Search for '{}' failed: {}", query, e)),
            },
            SlashCommand::News => match self.dispatcher.news().await {
                Ok(headlines) => Reply::system(action_context::headline_list(&headlines)),
                Err(e) => Reply::error(format!("✗ Could not read the news: {}", e)),
            },
            SlashCommand::Analyze(url) => {
                let url = with_scheme(&url);
                match self.dispatcher.analyze(&url).await {
                    Ok(analysis) => Reply::system(format!(
                        "📄 Analysis of {}\n\n{}",
                        analysis.title,
                        action_context::analysis_report(&analysis)
                    )),
                    Err(e) => Reply::error(format!("✗ Could not analyze {}: {}", url, e)),
                }
            }
            SlashCommand::Click(target) => self.click(&target).await,
            SlashCommand::Scroll(direction) => {
                if !self.dispatcher.browser_open() {
                    return Some(Reply::error("✗ Open a page first with /browser <url>"));
                }
                match self.dispatcher.scroll(direction).await {
                    Ok(()) => Reply::system(format!("✓ Scrolled {}", format!("{:?}", direction).to_lowercase())),
                    Err(e) => Reply::error(format!("✗ Could not scroll: {}", e)),
                }
            }
            SlashCommand::Elements => {
                if !self.dispatcher.browser_open() {
                    return Some(Reply::error("✗ Open a page first with /browser <url>"));
                }
                match self.dispatcher.elements().await {
                    Ok(list) if list.is_empty() => Reply::system("No clickable elements found."),
                    Ok(list) => Reply::system(list.trim_end()),
                    Err(e) => Reply::error(format!("✗ Could not read the page: {}", e)),
                }
            }
            SlashCommand::Run(command) => match self.dispatcher.run(&command).await {
                Ok(output) => {
                    let mut text = format!("$ {}\n", command);
                    text.push_str(&page_extractor::truncate(output.stdout.trim_end(), MAX_COMMAND_OUTPUT));
                    if !output.stderr.trim().is_empty() {
                        text.push('\n');
                        text.push_str(&page_extractor::truncate(output.stderr.trim_end(), MAX_COMMAND_OUTPUT));
                    }
                    if output.success() {
                        Reply::system(text.trim_end())
                    } else {
                        let code = output.code.map_or("signal".to_string(), |c| c.to_string());
                        Reply::error(format!("{}\n(exit: {})", text.trim_end(), code))
                    }
                }
                Err(e) => Reply::error(format!("✗ {}", e)),
            },
            SlashCommand::Type(text) => {
                let count = text.chars().count();
                self.input(InputEvent::Type { text }, format!("✓ Typed {} character(s)", count))
                    .await
            }
            SlashCommand::Key(key) => {
                let done = format!("✓ Pressed {}", key);
                self.input(InputEvent::Key { key }, done).await
            }
            SlashCommand::ClickAt { x, y } => {
                self.input(InputEvent::Click { x, y }, format!("✓ Clicked at ({}, {})", x, y))
                    .await
            }
            SlashCommand::Clear => return None,
            SlashCommand::Reset => {
                self.conversation.reset();
                Reply::system("✓ Conversation reset")
            }
            SlashCommand::Help => Reply::system(commands::HELP),
            SlashCommand::Status => {
                let online = self.probe().await;
                Reply::system(format!(
                    "LLM: {} ({})\nBrowser: {}\nHistory: {} messages",
                    if online { "connected" } else { "disconnected" },
                    self.chat.model_info(),
                    if self.browser_open() { "open" } else { "closed" },
                    self.conversation.history().len()
                ))
            }
            SlashCommand::Usage(usage) => Reply::error(format!("Usage: {}", usage)),
            SlashCommand::Unknown(name) => {
                Reply::error(format!("Unknown command: /{}. Type /help for the list.", name))
            }
        };
        Some(reply)
    }

    async fn input(&self, event: InputEvent, done: String) -> Reply {
        match self.dispatcher.input(&event).await {
            Ok(()) => Reply::system(done),
            Err(e) => Reply::error(format!("✗ Input failed: {}", e)),
        }
    }

    async fn click(&mut self, target: &str) -> Reply {
        if !self.dispatcher.browser_open() {
            return Reply::error("✗ Open a page first with /browser <url>");
        }

        match self.dispatcher.click(target).await {
            Ok(digest) => Reply::system(format!("✓ Clicked '{}', now on {}", target, digest.title)),
            Err(DriverError::ElementNotFound(_)) => {
                let elements = self.dispatcher.elements().await.unwrap_or_default();
                Reply::error(format!("✗ Not found: '{}'\n\n{}", target, elements).trim_end())
            }
            Err(e) => Reply::error(format!("✗ Could not click '{}': {}", target, e)),
        }
    }
}

/// Builder for AssistantConfig
pub struct AssistantConfigBuilder {
    config: AssistantConfig,
}

impl AssistantConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: AssistantConfig::default(),
        }
    }

    pub fn ollama_url(mut self, url: &str) -> Self {
        self.config.ollama_url = url.to_string();
        self
    }

    pub fn model(mut self, model: &str) -> Self {
        self.config.model = model.to_string();
        self
    }

    pub fn chat_timeout_secs(mut self, secs: u64) -> Self {
        self.config.chat_timeout_secs = secs;
        self
    }

    pub fn probe_timeout_secs(mut self, secs: u64) -> Self {
        self.config.probe_timeout_secs = secs;
        self
    }

    pub fn page_settle_ms(mut self, ms: u64) -> Self {
        self.config.page_settle_ms = ms;
        self
    }

    pub fn screenshot_dir(mut self, dir: PathBuf) -> Self {
        self.config.screenshot_dir = dir;
        self
    }

    pub fn min_action_confidence(mut self, threshold: f32) -> Self {
        self.config.min_action_confidence = threshold;
        self
    }

    pub fn history_limit(mut self, limit: usize) -> Self {
        self.config.history_limit = limit;
        self
    }

    pub fn search_url(mut self, template: &str) -> Self {
        self.config.search_url = template.to_string();
        self
    }

    pub fn site(mut self, name: &str, url: &str) -> Self {
        self.config.sites.insert(name.to_string(), url.to_string());
        self
    }

    pub fn program(mut self, alias: &str, command: &str) -> Self {
        self.config.programs.insert(alias.to_string(), command.to_string());
        self
    }

    pub fn build(self) -> AssistantConfig {
        self.config
    }
}

impl Default for AssistantConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
