//! Deskpilot: Core Data Structures
//!
//! Intents produced by the classifier, page digests produced by the
//! extractor, and the reply triples handed to whatever renders the chat.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a queued user request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Closed set of actions the classifier can detect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IntentKind {
    OpenSite,
    OpenUrl,
    Search,
    NewsSummary,
    Screenshot,
    CloseBrowser,
    CloseTab,
    ExecuteProgram,
    Chat,
}

/// Action plus its kind-specific parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IntentAction {
    /// Open a site from the lexicon
    OpenSite { name: String, url: String },

    /// Open a URL written directly in the utterance
    OpenUrl { url: String },

    /// Web search
    Search { query: String },

    /// Headlines from a list of news sources, visited in order
    NewsSummary { sites: Vec<String> },

    Screenshot,
    CloseBrowser,
    CloseTab,

    /// Launch a program from the lexicon
    ExecuteProgram { name: String, command: String },

    /// Free-form conversation, left to the language model
    Chat,
}

impl IntentAction {
    pub fn kind(&self) -> IntentKind {
        match self {
            IntentAction::OpenSite { .. } => IntentKind::OpenSite,
            IntentAction::OpenUrl { .. } => IntentKind::OpenUrl,
            IntentAction::Search { .. } => IntentKind::Search,
            IntentAction::NewsSummary { .. } => IntentKind::NewsSummary,
            IntentAction::Screenshot => IntentKind::Screenshot,
            IntentAction::CloseBrowser => IntentKind::CloseBrowser,
            IntentAction::CloseTab => IntentKind::CloseTab,
            IntentAction::ExecuteProgram { .. } => IntentKind::ExecuteProgram,
            IntentAction::Chat => IntentKind::Chat,
        }
    }
}

/// Classified user utterance. Created per utterance, consumed by the dispatcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    pub action: IntentAction,
    pub confidence: f32, // 0.0 - 1.0, heuristic priority
}

impl Intent {
    pub fn new(action: IntentAction, confidence: f32) -> Self {
        Self { action, confidence }
    }

    /// Fallback when no detector matches
    pub fn chat() -> Self {
        Self::new(IntentAction::Chat, 0.3)
    }

    pub fn kind(&self) -> IntentKind {
        self.action.kind()
    }

    pub fn is_chat(&self) -> bool {
        matches!(self.action, IntentAction::Chat)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMeta {
    pub description: Option<String>,
    pub keywords: Option<String>,
    pub author: Option<String>,
    pub published: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Headline {
    pub level: u8,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub text: String,
    pub href: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub alt: String,
    pub src: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClickableKind {
    Button,
    Link,
}

impl fmt::Display for ClickableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClickableKind::Button => write!(f, "button"),
            ClickableKind::Link => write!(f, "link"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClickableElement {
    pub kind: ClickableKind,
    pub text: String,
    pub visible: bool,
}

/// Bounded structured summary of a rendered page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageDigest {
    pub url: String,
    pub title: String,
    pub meta: PageMeta,
    pub headlines: Vec<Headline>,
    pub paragraphs: Vec<String>,
    pub links: Vec<Link>,
    pub images: Vec<Image>,
    pub clickable_elements: Vec<ClickableElement>,
    pub text: String,
}

impl PageDigest {
    /// Visible clickable elements, in document order
    pub fn visible_clickables(&self) -> impl Iterator<Item = &ClickableElement> {
        self.clickable_elements.iter().filter(|e| e.visible)
    }
}

/// Result of the deep single-page analysis mode
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageAnalysis {
    pub url: String,
    pub title: String,
    pub meta: PageMeta,
    pub summary: String,
    pub main_content: Vec<String>,
    pub key_points: Vec<String>,
}

/// What was just done, phrased for the language model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionContext(String);

impl ActionContext {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for ActionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How a reply should be rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyCategory {
    User,
    Assistant,
    System,
    Error,
}

/// `(sender, text, category)` triple consumed by the display layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    pub sender: String,
    pub text: String,
    pub category: ReplyCategory,
}

impl Reply {
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            sender: "Assistant".to_string(),
            text: text.into(),
            category: ReplyCategory::Assistant,
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self {
            sender: "System".to_string(),
            text: text.into(),
            category: ReplyCategory::System,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            sender: "System".to_string(),
            text: text.into(),
            category: ReplyCategory::Error,
        }
    }
}

/// How a queued request ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Completed,
    Cancelled,
}
