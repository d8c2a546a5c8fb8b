//! Headline Filter
//!
//! Quality gate for headline candidates scraped from news aggregators,
//! where heading and link text is mostly navigation noise.

use crate::lexicon::contains_word;
use std::collections::HashSet;

/// Shortest accepted headline, in characters
pub const MIN_CHARS: usize = 20;

/// Headlines must be strictly shorter than this
pub const MAX_CHARS: usize = 200;

pub const MAX_HEADLINES: usize = 15;

/// Below this many primary survivors the secondary strategy runs
pub const SECONDARY_THRESHOLD: usize = 5;

/// Generic navigation and category labels
const DENYLIST: &[&str] = &[
    "principais notícias",
    "principais noticias",
    "opções para você",
    "opcoes para voce",
    "ciência e tecnologia",
    "ciencia e tecnologia",
    "mais",
    "ver",
    "seguir",
    "para você",
    "para voce",
    "esportes",
    "entretenimento",
    "brasil",
    "mundo",
    "negócios",
    "negocios",
    "saúde",
    "saude",
    "menu",
    "navegação",
    "navegacao",
    "categorias",
    "top stories",
    "recommended",
    "suggestions",
    "ver mais",
];

const REJECTED_PREFIXES: &[&str] = &["•", "...", "…", "-", "→", "›"];

const REJECTED_SUFFIXES: &[&str] = &["...", "…", "mais", "ver mais"];

/// Length, denylist and leading-glyph rules.
///
/// Denylist phrases match as whole words only, so "ver" rejects "Ver todas"
/// but not "Governo" or "verão".
fn passes_basic(text: &str) -> bool {
    let len = text.chars().count();
    if !(MIN_CHARS..MAX_CHARS).contains(&len) {
        return false;
    }

    let lowered = text.to_lowercase();
    if DENYLIST.iter().any(|phrase| contains_word(&lowered, phrase)) {
        return false;
    }

    !REJECTED_PREFIXES.iter().any(|p| text.starts_with(p))
}

/// All rules for primary candidates
fn passes_strict(text: &str) -> bool {
    if !passes_basic(text) {
        return false;
    }

    let lowered = text.to_lowercase();
    if REJECTED_SUFFIXES.iter().any(|s| lowered.ends_with(s)) {
        return false;
    }

    // Real titles carry at least one capital
    if !text.chars().any(char::is_uppercase) {
        return false;
    }

    text.split_whitespace().count() >= 3
}

/// Filter primary candidates: every rule, case-insensitive de-duplication, capped.
pub fn filter_headlines<I, S>(candidates: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    dedup_capped(
        candidates
            .into_iter()
            .map(|c| c.as_ref().trim().to_string())
            .filter(|c| passes_strict(c)),
    )
}

/// Primary candidates first; secondary (h3/h4 text) joins only when the
/// primary pass keeps fewer than five, under the relaxed rules.
pub fn collect_headlines<S: AsRef<str>>(primary: &[S], secondary: &[S]) -> Vec<String> {
    let mut survivors: Vec<String> = primary
        .iter()
        .map(|c| c.as_ref().trim().to_string())
        .filter(|c| passes_strict(c))
        .collect();

    if survivors.len() < SECONDARY_THRESHOLD {
        log::debug!(
            "only {} primary headlines, scanning {} secondary candidates",
            survivors.len(),
            secondary.len()
        );
        survivors.extend(
            secondary
                .iter()
                .map(|c| c.as_ref().trim().to_string())
                .filter(|c| passes_basic(c)),
        );
    }

    dedup_capped(survivors)
}

fn dedup_capped(items: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.to_lowercase()))
        .take(MAX_HEADLINES)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sized(len: usize) -> String {
        // "Big storm hits " is 15 chars; pad with lowercase letters
        let mut text = "Big storm hits ".to_string();
        while text.chars().count() < len {
            text.push('x');
        }
        text
    }

    #[test]
    fn test_length_bounds() {
        assert_eq!(filter_headlines([sized(199)]).len(), 1);
        assert!(filter_headlines([sized(200)]).is_empty());
        assert_eq!(filter_headlines([sized(20)]).len(), 1);
        assert!(filter_headlines([sized(19)]).is_empty());
    }

    #[test]
    fn test_denylist() {
        let kept = filter_headlines([
            "Principais notícias do dia de hoje",
            "Top stories you should read now",
            "Governo anuncia novo pacote fiscal",
        ]);

        assert_eq!(kept, vec!["Governo anuncia novo pacote fiscal"]);
    }

    #[test]
    fn test_denylist_matches_whole_words() {
        let kept = filter_headlines([
            "Governo prevê verão quente em Brasília este ano",
            "Ver todas as matérias de hoje aqui",
            "Mundo: cúpula do clima termina sem acordo",
        ]);

        assert_eq!(kept, vec!["Governo prevê verão quente em Brasília este ano"]);
    }

    #[test]
    fn test_prefix_and_suffix_glyphs() {
        let kept = filter_headlines([
            "• Governo anuncia novo pacote fiscal",
            "→ Governo anuncia novo pacote fiscal",
            "Governo anuncia novo pacote fiscal...",
            "Governo anuncia novo pacote fiscal e",
        ]);

        assert_eq!(kept, vec!["Governo anuncia novo pacote fiscal e"]);
    }

    #[test]
    fn test_uppercase_and_word_count() {
        let kept = filter_headlines([
            "governo anuncia novo pacote fiscal",
            "Supercalifragilisticexpialidocious",
            "Two words-only-title-with-hyphens",
            "Governo anuncia novo pacote fiscal",
        ]);

        assert_eq!(kept, vec!["Governo anuncia novo pacote fiscal"]);
    }

    #[test]
    fn test_case_insensitive_dedup_keeps_first() {
        let kept = filter_headlines([
            "Chuva forte atinge São Paulo hoje",
            "Outra manchete importante do dia",
            "CHUVA FORTE ATINGE SÃO PAULO HOJE",
        ]);

        assert_eq!(
            kept,
            vec![
                "Chuva forte atinge São Paulo hoje",
                "Outra manchete importante do dia",
            ]
        );
    }

    #[test]
    fn test_cap() {
        let candidates: Vec<String> = (0..40)
            .map(|i| format!("Headline number {} about the economy", i))
            .collect();

        assert_eq!(filter_headlines(&candidates).len(), MAX_HEADLINES);
    }

    #[test]
    fn test_collected_headlines_are_capped() {
        let primary: Vec<String> = (0..3)
            .map(|i| format!("Primary story number {} about the economy", i))
            .collect();
        let secondary: Vec<String> = (0..30)
            .map(|i| format!("Secondary story number {} about the weather", i))
            .collect();

        let headlines = collect_headlines(&primary, &secondary);
        assert_eq!(headlines.len(), MAX_HEADLINES);
        assert_eq!(headlines[0], "Primary story number 0 about the economy");
    }

    #[test]
    fn test_secondary_only_when_primary_is_thin() {
        let primary = vec!["Governo anuncia novo pacote fiscal".to_string()];
        let secondary = vec![
            "eleições municipais terão segundo turno".to_string(),
            "Governo anuncia novo pacote fiscal".to_string(),
        ];

        let kept = collect_headlines(&primary, &secondary);
        assert_eq!(
            kept,
            vec![
                "Governo anuncia novo pacote fiscal",
                "eleições municipais terão segundo turno",
            ]
        );

        let primary: Vec<String> = (0..5)
            .map(|i| format!("Headline number {} about the economy", i))
            .collect();
        let kept = collect_headlines(&primary, &secondary);
        assert_eq!(kept.len(), 5);
    }
}
