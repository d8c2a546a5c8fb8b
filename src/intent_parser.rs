//! Intent Parser - utterance → Intent
//!
//! A fixed-order cascade of detectors. The first detector that matches wins,
//! even when a later one would have been more confident; anything unmatched
//! becomes a low-confidence `Chat` intent for the language model.

use crate::lexicon::{Lexicon, TriggerGroup};
use crate::query_extractor::{self, ClickTargetExtractor, SEARCH_STOPWORDS};
use crate::types::*;
use regex::Regex;
use std::sync::Arc;

/// Rule-based intent classifier
pub struct IntentParser {
    lexicon: Arc<Lexicon>,
    patterns: UtterancePatterns,
    click: ClickTargetExtractor,
}

/// Regex patterns for direct references in utterances
struct UtterancePatterns {
    url: Regex,
}

impl Default for UtterancePatterns {
    fn default() -> Self {
        Self {
            url: Regex::new(
                r"https?://[^\s]+|www\.[^\s]+|[a-zA-Z0-9-]+\.(?:com|org|net|br|gov|edu|io|dev|app)[^\s]*",
            )
            .expect("url pattern"),
        }
    }
}

impl IntentParser {
    /// Create new intent parser
    pub fn new(lexicon: Arc<Lexicon>) -> Self {
        Self {
            lexicon,
            patterns: UtterancePatterns::default(),
            click: ClickTargetExtractor::new(),
        }
    }

    pub fn lexicon(&self) -> &Lexicon {
        &self.lexicon
    }

    /// Classify an utterance. Never fails; unmatched input yields `Intent::chat()`.
    pub fn classify(&self, input: &str) -> Intent {
        let msg = input.trim().to_lowercase();

        let intent = self
            .detect_open_site(&msg)
            .or_else(|| self.detect_search(&msg))
            .or_else(|| self.detect_news(&msg))
            .or_else(|| self.detect_screenshot(&msg))
            .or_else(|| self.detect_close(&msg))
            .or_else(|| self.detect_execute(&msg))
            .unwrap_or_else(Intent::chat);

        log::debug!(
            "classified {:?} as {:?} ({:.2})",
            msg,
            intent.kind(),
            intent.confidence
        );
        intent
    }

    /// Known site by name, else a URL written out with an open verb
    fn detect_open_site(&self, msg: &str) -> Option<Intent> {
        let has_open = self.lexicon.has_trigger(TriggerGroup::Open, msg);

        if let Some(site) = self.lexicon.find_site(msg) {
            let confidence = if has_open { 0.9 } else { 0.7 };
            return Some(Intent::new(
                IntentAction::OpenSite {
                    name: site.name.clone(),
                    url: site.target.clone(),
                },
                confidence,
            ));
        }

        if !has_open {
            return None;
        }

        let found = self.patterns.url.find(msg)?;
        Some(Intent::new(
            IntentAction::OpenUrl {
                url: with_scheme(found.as_str()),
            },
            0.95,
        ))
    }

    fn detect_search(&self, msg: &str) -> Option<Intent> {
        if !self.lexicon.has_trigger(TriggerGroup::Search, msg) {
            return None;
        }

        let query = query_extractor::extract_query(
            msg,
            self.lexicon.triggers(TriggerGroup::Search),
            SEARCH_STOPWORDS,
        );
        if !query_extractor::is_actionable(&query) {
            return None;
        }

        Some(Intent::new(IntentAction::Search { query }, 0.95))
    }

    fn detect_news(&self, msg: &str) -> Option<Intent> {
        if !self.lexicon.has_trigger(TriggerGroup::News, msg) {
            return None;
        }

        Some(Intent::new(
            IntentAction::NewsSummary {
                sites: self.lexicon.news_sources(msg),
            },
            0.9,
        ))
    }

    fn detect_screenshot(&self, msg: &str) -> Option<Intent> {
        if !self.lexicon.has_trigger(TriggerGroup::Screenshot, msg) {
            return None;
        }

        Some(Intent::new(IntentAction::Screenshot, 0.95))
    }

    fn detect_close(&self, msg: &str) -> Option<Intent> {
        if !self.lexicon.has_trigger(TriggerGroup::Close, msg) {
            return None;
        }

        let intent = if self.lexicon.has_trigger(TriggerGroup::BrowserTarget, msg) {
            Intent::new(IntentAction::CloseBrowser, 0.95)
        } else if self.lexicon.has_trigger(TriggerGroup::TabTarget, msg) {
            Intent::new(IntentAction::CloseTab, 0.9)
        } else {
            Intent::new(IntentAction::CloseTab, 0.7)
        };
        Some(intent)
    }

    fn detect_execute(&self, msg: &str) -> Option<Intent> {
        let program = self.lexicon.find_program(msg)?;
        let confidence = if self.lexicon.has_trigger(TriggerGroup::Execute, msg) {
            0.95
        } else {
            0.8
        };

        Some(Intent::new(
            IntentAction::ExecuteProgram {
                name: program.name.clone(),
                command: program.target.clone(),
            },
            confidence,
        ))
    }

    /// Click target in a free-form utterance ("clique em Entrar")
    pub fn click_target(&self, input: &str) -> Option<String> {
        self.click
            .extract(input, self.lexicon.triggers(TriggerGroup::Click))
    }

    /// Whether the utterance asks what can be clicked on the open page
    pub fn asks_for_elements(&self, input: &str) -> bool {
        self.lexicon
            .has_trigger(TriggerGroup::Elements, &input.trim().to_lowercase())
    }

    /// URL to analyze when the utterance asks for a page analysis
    pub fn analyze_target(&self, input: &str) -> Option<String> {
        let msg = input.trim().to_lowercase();
        if !self.lexicon.has_trigger(TriggerGroup::Analyze, &msg) {
            return None;
        }
        self.patterns.url.find(&msg).map(|m| with_scheme(m.as_str()))
    }

    /// One-line description of what is about to happen, for the user
    pub fn explain(&self, intent: &Intent) -> Option<String> {
        let text = match &intent.action {
            IntentAction::OpenSite { name, .. } => format!("Opening {}", title_case(name)),
            IntentAction::OpenUrl { url } => format!("Opening {}", url),
            IntentAction::Search { query } => format!("Searching for '{}'", query),
            IntentAction::NewsSummary { .. } => "Collecting the latest headlines".to_string(),
            IntentAction::Screenshot => "Taking a screenshot".to_string(),
            IntentAction::CloseBrowser => "Closing the browser".to_string(),
            IntentAction::CloseTab => "Closing the current tab".to_string(),
            IntentAction::ExecuteProgram { name, .. } => format!("Launching {}", name),
            IntentAction::Chat => return None,
        };
        Some(text)
    }
}

/// Prefix `https://` unless the reference already has a scheme
pub fn with_scheme(reference: &str) -> String {
    let has_scheme = reference.split_once("://").is_some_and(|(scheme, _)| {
        !scheme.is_empty()
            && scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
    });
    if has_scheme {
        reference.to_string()
    } else {
        format!("https://{}", reference)
    }
}

fn title_case(name: &str) -> String {
    name.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> IntentParser {
        IntentParser::new(Arc::new(Lexicon::default()))
    }

    #[test]
    fn test_open_site_with_trigger() {
        let intent = parser().classify("abre o google");

        assert_eq!(
            intent.action,
            IntentAction::OpenSite {
                name: "google".to_string(),
                url: "https://www.google.com".to_string(),
            }
        );
        assert_eq!(intent.confidence, 0.9);
    }

    #[test]
    fn test_open_site_without_trigger() {
        let intent = parser().classify("youtube");

        assert_eq!(intent.kind(), IntentKind::OpenSite);
        assert_eq!(intent.confidence, 0.7);
    }

    #[test]
    fn test_open_site_longest_name() {
        let intent = parser().classify("Acesse o Google Drive");

        match intent.action {
            IntentAction::OpenSite { name, url } => {
                assert_eq!(name, "google drive");
                assert_eq!(url, "https://drive.google.com");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_open_url() {
        let intent = parser().classify("abra example.org/docs");

        assert_eq!(
            intent.action,
            IntentAction::OpenUrl {
                url: "https://example.org/docs".to_string()
            }
        );
        assert_eq!(intent.confidence, 0.95);

        let intent = parser().classify("acessa https://docs.rs/tokio");
        assert_eq!(
            intent.action,
            IntentAction::OpenUrl {
                url: "https://docs.rs/tokio".to_string()
            }
        );
    }

    #[test]
    fn test_host_starting_with_http_gets_scheme() {
        let intent = parser().classify("abra httpbin.org/get");
        assert_eq!(
            intent.action,
            IntentAction::OpenUrl {
                url: "https://httpbin.org/get".to_string()
            }
        );

        assert_eq!(with_scheme("https-everywhere.org"), "https://https-everywhere.org");
        assert_eq!(with_scheme("http://example.org"), "http://example.org");
        assert_eq!(with_scheme("file:///tmp/page.html"), "file:///tmp/page.html");
    }

    #[test]
    fn test_url_needs_open_trigger() {
        let intent = parser().classify("example.org");
        assert!(intent.is_chat());
    }

    #[test]
    fn test_search() {
        let intent = parser().classify("pesquise python");

        assert_eq!(
            intent.action,
            IntentAction::Search {
                query: "python".to_string()
            }
        );
        assert_eq!(intent.confidence, 0.95);
    }

    #[test]
    fn test_search_strips_stopwords() {
        let intent = parser().classify("procure sobre a história do brasil");

        assert_eq!(
            intent.action,
            IntentAction::Search {
                query: "história do brasil".to_string()
            }
        );
    }

    #[test]
    fn test_empty_search_falls_through() {
        let intent = parser().classify("pesquisa");
        assert!(intent.is_chat());
    }

    #[test]
    fn test_open_site_beats_search() {
        let intent = parser().classify("pesquise no youtube");
        assert_eq!(intent.kind(), IntentKind::OpenSite);
    }

    #[test]
    fn test_news() {
        let intent = parser().classify("quais as manchetes de hoje");

        match intent.action {
            IntentAction::NewsSummary { sites } => {
                assert_eq!(sites.len(), 3);
                assert_eq!(sites[0], "https://news.google.com");
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(intent.confidence, 0.9);
    }

    #[test]
    fn test_screenshot() {
        let intent = parser().classify("tira um print da tela");
        assert_eq!(intent.action, IntentAction::Screenshot);
        assert_eq!(intent.confidence, 0.95);
    }

    #[test]
    fn test_close_browser() {
        let intent = parser().classify("fecha o chrome");
        assert_eq!(intent.action, IntentAction::CloseBrowser);
        assert_eq!(intent.confidence, 0.95);
    }

    #[test]
    fn test_close_tab() {
        let intent = parser().classify("fecha essa aba");
        assert_eq!(intent.action, IntentAction::CloseTab);
        assert_eq!(intent.confidence, 0.9);

        let intent = parser().classify("pode fechar");
        assert_eq!(intent.action, IntentAction::CloseTab);
        assert_eq!(intent.confidence, 0.7);
    }

    #[test]
    fn test_execute_program() {
        let intent = parser().classify("abra a calculadora");

        assert_eq!(
            intent.action,
            IntentAction::ExecuteProgram {
                name: "calculadora".to_string(),
                command: "calc".to_string(),
            }
        );
        assert_eq!(intent.confidence, 0.95);

        let intent = parser().classify("quero o bloco de notas");
        assert_eq!(intent.kind(), IntentKind::ExecuteProgram);
        assert_eq!(intent.confidence, 0.8);
    }

    #[test]
    fn test_chat_fallback() {
        let intent = parser().classify("me conta uma piada");
        assert!(intent.is_chat());
        assert_eq!(intent.confidence, 0.3);
    }

    #[test]
    fn test_click_and_analyze_targets() {
        let parser = parser();

        assert_eq!(parser.click_target("clique em Login"), Some("login".to_string()));
        assert_eq!(
            parser.analyze_target("analise www.rust-lang.org"),
            Some("https://www.rust-lang.org".to_string())
        );
        assert_eq!(parser.analyze_target("analise isso"), None);
    }

    #[test]
    fn test_asks_for_elements() {
        let parser = parser();
        assert!(parser.asks_for_elements("O que posso clicar aqui?"));
        assert!(parser.asks_for_elements("mostra as opções"));
        assert!(!parser.asks_for_elements("me conta uma piada"));
    }

    #[test]
    fn test_explain() {
        let parser = parser();

        let intent = parser.classify("abre o youtube");
        assert_eq!(parser.explain(&intent), Some("Opening Youtube".to_string()));

        let intent = parser.classify("pesquise rust");
        assert_eq!(parser.explain(&intent), Some("Searching for 'rust'".to_string()));

        assert_eq!(parser.explain(&Intent::chat()), None);
    }

    #[test]
    fn test_classification_is_deterministic() {
        let parser = parser();
        let inputs = ["abre o google", "pesquise python", "fecha o chrome", "me conta uma piada"];

        for input in inputs {
            assert_eq!(parser.classify(input), parser.classify(input));
        }
    }
}
