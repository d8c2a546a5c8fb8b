//! Query/Target Extractor
//!
//! Strips command verbs and filler words from an utterance, leaving the
//! payload: a search query or the text of an element to click.

use regex::Regex;
use std::cmp::Reverse;

/// Prepositions and articles dropped from search queries
pub const SEARCH_STOPWORDS: &[&str] = &[
    "e", "pela", "pelo", "por", "sobre", "a", "o", "os", "as", "um", "uma", "pra", "para", "mim",
    "me", "no", "na", "nos", "nas",
];

/// Smaller set for click targets, where articles and element nouns are noise
pub const CLICK_STOPWORDS: &[&str] = &[
    "o", "a", "os", "as", "em", "no", "na", "botão", "botao", "link", "the", "on", "button",
];

/// Payloads shorter than this are not actionable
pub const MIN_PAYLOAD_CHARS: usize = 2;

/// Remove every trigger occurrence (longest phrase first), then stopwords, then trim.
pub fn extract_query<S: AsRef<str>>(utterance: &str, triggers: &[S], stopwords: &[&str]) -> String {
    let mut phrases: Vec<&str> = triggers
        .iter()
        .map(AsRef::as_ref)
        .filter(|t| !t.is_empty())
        .collect();
    phrases.sort_by_key(|t| Reverse(t.chars().count()));

    let mut text = utterance.to_string();
    for phrase in phrases {
        text = text.replace(phrase, "");
    }

    strip_stopwords(&text, stopwords)
}

/// Drop stopword tokens that have whitespace on both sides.
///
/// A token at the very start or end of `text` only counts as bounded when
/// `text` itself begins or ends with whitespace there. Output is trimmed with
/// internal whitespace collapsed.
pub fn strip_stopwords(text: &str, stopwords: &[&str]) -> String {
    let leading = text.starts_with(char::is_whitespace);
    let trailing = text.ends_with(char::is_whitespace);
    let tokens: Vec<&str> = text.split_whitespace().collect();
    let last = tokens.len().saturating_sub(1);

    tokens
        .iter()
        .enumerate()
        .filter(|(i, token)| {
            let bounded = (*i > 0 || leading) && (*i < last || trailing);
            !(bounded && stopwords.contains(*token))
        })
        .map(|(_, token)| *token)
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn is_actionable(payload: &str) -> bool {
    payload.chars().count() >= MIN_PAYLOAD_CHARS
}

/// Finds the element text in "click on X" style requests
pub struct ClickTargetExtractor {
    patterns: Vec<Regex>,
}

impl Default for ClickTargetExtractor {
    fn default() -> Self {
        Self {
            patterns: vec![
                Regex::new(r#"(?i)(?:clique|clica|click)\s+(?:em|no|na|on)\s+["']?([^"']+)["']?"#)
                    .expect("click pattern"),
                Regex::new(r#"(?i)aperte\s+(?:o|a)?\s*(?:botão|botao|link)?\s+["']?([^"']+)["']?"#)
                    .expect("press-button pattern"),
                Regex::new(r#"(?i)(?:pressione|press)\s+["']?([^"']+)["']?"#)
                    .expect("press pattern"),
            ],
        }
    }
}

impl ClickTargetExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Target text for a click request, or None when the utterance has none.
    ///
    /// `triggers` are the click verbs, used when no pattern matches.
    pub fn extract<S: AsRef<str>>(&self, utterance: &str, triggers: &[S]) -> Option<String> {
        let lowered = utterance.to_lowercase();

        for pattern in &self.patterns {
            if let Some(caps) = pattern.captures(&lowered) {
                if let Some(m) = caps.get(1) {
                    // The capture followed whitespace, so its first token is bounded too
                    let target = strip_stopwords(&format!(" {}", m.as_str()), CLICK_STOPWORDS);
                    if is_actionable(&target) {
                        return Some(target);
                    }
                }
            }
        }

        let has_trigger = triggers.iter().any(|t| lowered.contains(t.as_ref()));
        if !has_trigger {
            return None;
        }

        let target = extract_query(&lowered, triggers, CLICK_STOPWORDS);
        if is_actionable(&target) {
            Some(target)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEARCH: &[&str] = &["pesquise", "pesquisa", "pesquisar", "busca", "buscar"];
    const CLICK: &[&str] = &["clique", "clica", "aperte", "pressione", "selecione", "click"];

    #[test]
    fn test_extract_simple_query() {
        assert_eq!(extract_query("pesquise python", SEARCH, SEARCH_STOPWORDS), "python");
    }

    #[test]
    fn test_every_trigger_occurrence_removed() {
        let query = extract_query("pesquise rust pesquise tokio", SEARCH, SEARCH_STOPWORDS);
        assert_eq!(query, "rust tokio");
    }

    #[test]
    fn test_longer_trigger_removed_first() {
        // "pesquisa" must not leave a stray "r" from "pesquisar"
        let query = extract_query("pesquisar receitas", SEARCH, SEARCH_STOPWORDS);
        assert_eq!(query, "receitas");
    }

    #[test]
    fn test_stopwords_between_whitespace_only() {
        let query = extract_query("pesquise sobre a linguagem rust", SEARCH, SEARCH_STOPWORDS);
        assert_eq!(query, "linguagem rust");

        // "nas" inside "nascimento" survives
        let query = extract_query("busca data de nascimento", SEARCH, SEARCH_STOPWORDS);
        assert_eq!(query, "data de nascimento");
    }

    #[test]
    fn test_unbounded_edge_tokens_kept() {
        assert_eq!(strip_stopwords("a casa", SEARCH_STOPWORDS), "a casa");
        assert_eq!(strip_stopwords(" a casa", SEARCH_STOPWORDS), "casa");
        assert_eq!(strip_stopwords("casa a", SEARCH_STOPWORDS), "casa a");
        assert_eq!(strip_stopwords("x o a y", SEARCH_STOPWORDS), "x y");
    }

    #[test]
    fn test_empty_payload() {
        let query = extract_query("pesquise", SEARCH, SEARCH_STOPWORDS);
        assert!(query.is_empty());
        assert!(!is_actionable(&query));
        assert!(!is_actionable("x"));
        assert!(is_actionable("go"));
    }

    #[test]
    fn test_click_patterns() {
        let extractor = ClickTargetExtractor::new();

        assert_eq!(
            extractor.extract("clique em 'Entrar'", CLICK),
            Some("entrar".to_string())
        );
        assert_eq!(
            extractor.extract("clica no botão pesquisar", CLICK),
            Some("pesquisar".to_string())
        );
        assert_eq!(
            extractor.extract("aperte o botão enviar", CLICK),
            Some("enviar".to_string())
        );
        assert_eq!(
            extractor.extract("pressione continuar", CLICK),
            Some("continuar".to_string())
        );
    }

    #[test]
    fn test_click_trigger_fallback() {
        let extractor = ClickTargetExtractor::new();

        assert_eq!(
            extractor.extract("selecione produtos", CLICK),
            Some("produtos".to_string())
        );
    }

    #[test]
    fn test_no_click_target() {
        let extractor = ClickTargetExtractor::new();

        assert_eq!(extractor.extract("me conta uma piada", CLICK), None);
        assert_eq!(extractor.extract("clique", CLICK), None);
    }
}
