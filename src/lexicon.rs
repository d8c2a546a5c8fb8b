//! Lexicon Store - sites, programs and trigger phrases
//!
//! Read-only after construction. Site and program names are matched
//! longest-first as whole words; trigger phrases are plain substrings.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

const SITES: &[(&str, &str)] = &[
    ("google", "https://www.google.com"),
    ("youtube", "https://www.youtube.com"),
    ("facebook", "https://www.facebook.com"),
    ("twitter", "https://www.twitter.com"),
    ("x", "https://www.x.com"),
    ("instagram", "https://www.instagram.com"),
    ("linkedin", "https://www.linkedin.com"),
    ("github", "https://www.github.com"),
    ("gmail", "https://mail.google.com"),
    ("whatsapp", "https://web.whatsapp.com"),
    ("reddit", "https://www.reddit.com"),
    ("amazon", "https://www.amazon.com.br"),
    ("mercado livre", "https://www.mercadolivre.com.br"),
    ("netflix", "https://www.netflix.com"),
    ("wikipedia", "https://www.wikipedia.org"),
    ("stackoverflow", "https://stackoverflow.com"),
    ("stack overflow", "https://stackoverflow.com"),
    ("news", "https://news.google.com"),
    ("notícias", "https://news.google.com"),
    ("noticias", "https://news.google.com"),
    ("g1", "https://g1.globo.com"),
    ("uol", "https://www.uol.com.br"),
    ("folha", "https://www.folha.uol.com.br"),
    ("estadão", "https://www.estadao.com.br"),
    ("estadao", "https://www.estadao.com.br"),
    ("bbc", "https://www.bbc.com/portuguese"),
    ("cnn", "https://www.cnnbrasil.com.br"),
    ("yahoo", "https://www.yahoo.com"),
    ("bing", "https://www.bing.com"),
    ("chatgpt", "https://chat.openai.com"),
    ("claude", "https://claude.ai"),
    ("gemini", "https://gemini.google.com"),
    ("google drive", "https://drive.google.com"),
    ("google maps", "https://maps.google.com"),
];

const PROGRAMS: &[(&str, &str)] = &[
    ("calculadora", "calc"),
    ("calc", "calc"),
    ("bloco de notas", "notepad"),
    ("notepad", "notepad"),
    ("paint", "mspaint"),
    ("explorador", "explorer"),
    ("explorer", "explorer"),
    ("chrome", "chrome"),
    ("firefox", "firefox"),
    ("edge", "msedge"),
    ("word", "winword"),
    ("excel", "excel"),
    ("powerpoint", "powerpnt"),
    ("outlook", "outlook"),
    ("cmd", "cmd"),
    ("terminal", "cmd"),
    ("powershell", "powershell"),
];

/// Sites whose mention steers a news summary toward them
const NEWS_AFFILIATED: &[&str] = &["g1", "uol", "folha", "cnn", "bbc"];

pub const DEFAULT_NEWS_SOURCES: &[&str] = &[
    "https://news.google.com",
    "https://g1.globo.com",
    "https://www.bbc.com/portuguese",
];

/// Named groups of trigger phrases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TriggerGroup {
    Open,
    Search,
    News,
    Screenshot,
    Close,
    Execute,
    /// Close target naming the whole browser
    BrowserTarget,
    /// Close target naming a tab or page
    TabTarget,
    Click,
    Analyze,
    /// Asking what can be clicked on the open page
    Elements,
}

impl TriggerGroup {
    fn phrases(self) -> &'static [&'static str] {
        match self {
            TriggerGroup::Open => &[
                "abra", "abre", "abrir", "vai no", "vai na", "vai para", "acessa", "acessar",
                "acesse", "entra no", "entra na",
            ],
            TriggerGroup::Search => &[
                "pesquise", "pesquisa", "pesquisar", "busque", "busca", "buscar", "procure",
                "procura", "procurar", "google", "googla",
            ],
            TriggerGroup::News => &[
                "resumo", "notícias", "noticias", "manchetes", "headlines", "últimas notícias",
                "ultimas noticias", "novidades",
            ],
            TriggerGroup::Screenshot => &[
                "screenshot", "captura", "print", "printar", "foto da tela", "tira um print",
                "tira uma foto",
            ],
            TriggerGroup::Close => &[
                "feche", "fechar", "fecha", "encerra", "encerrar", "sai do", "sai da",
            ],
            TriggerGroup::Execute => &[
                "execute", "executar", "executa", "rode", "rodar", "roda", "inicia", "iniciar",
                "abre", "abra", "abrir",
            ],
            TriggerGroup::BrowserTarget => &["navegador", "chrome", "firefox", "edge", "browser"],
            TriggerGroup::TabTarget => &["aba", "página", "pagina", "site", "tab"],
            TriggerGroup::Click => &[
                "clique", "clica", "aperte", "pressione", "selecione", "escolha", "click",
            ],
            TriggerGroup::Analyze => &[
                "analise", "análise", "analisa", "resuma", "me fale sobre", "o que tem",
                "qual o conteúdo", "qual o conteudo", "confira",
            ],
            TriggerGroup::Elements => &[
                "elementos", "botões", "botoes", "links", "o que posso clicar", "opções",
                "opcoes",
            ],
        }
    }

    pub const ALL: [TriggerGroup; 11] = [
        TriggerGroup::Open,
        TriggerGroup::Search,
        TriggerGroup::News,
        TriggerGroup::Screenshot,
        TriggerGroup::Close,
        TriggerGroup::Execute,
        TriggerGroup::BrowserTarget,
        TriggerGroup::TabTarget,
        TriggerGroup::Click,
        TriggerGroup::Analyze,
        TriggerGroup::Elements,
    ];
}

/// A name and what it resolves to (URL for sites, launch token for programs)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub name: String,
    pub target: String,
}

/// Static mappings consulted by the classifier
#[derive(Debug, Clone)]
pub struct Lexicon {
    sites: Vec<Entry>,
    programs: Vec<Entry>,
    triggers: HashMap<TriggerGroup, Vec<String>>,
}

impl Default for Lexicon {
    fn default() -> Self {
        Self::with_overrides(&BTreeMap::new(), &BTreeMap::new())
    }
}

impl Lexicon {
    /// Built-in lexicon with extra entries merged over it
    pub fn with_overrides(
        sites: &BTreeMap<String, String>,
        programs: &BTreeMap<String, String>,
    ) -> Self {
        let triggers = TriggerGroup::ALL
            .iter()
            .map(|&group| {
                let phrases = group.phrases().iter().map(|p| p.to_string()).collect();
                (group, phrases)
            })
            .collect();

        Self {
            sites: merge_entries(SITES, sites),
            programs: merge_entries(PROGRAMS, programs),
            triggers,
        }
    }

    /// Sites, longest name first
    pub fn sites(&self) -> &[Entry] {
        &self.sites
    }

    /// Programs, longest alias first
    pub fn programs(&self) -> &[Entry] {
        &self.programs
    }

    pub fn triggers(&self, group: TriggerGroup) -> &[String] {
        self.triggers.get(&group).map(Vec::as_slice).unwrap_or(&[])
    }

    /// True if any phrase of the group occurs in `text`
    pub fn has_trigger(&self, group: TriggerGroup, text: &str) -> bool {
        self.triggers(group).iter().any(|p| text.contains(p.as_str()))
    }

    pub fn find_site(&self, text: &str) -> Option<&Entry> {
        self.sites.iter().find(|e| contains_word(text, &e.name))
    }

    pub fn find_program(&self, text: &str) -> Option<&Entry> {
        self.programs.iter().find(|e| contains_word(text, &e.name))
    }

    pub fn site_url(&self, name: &str) -> Option<&str> {
        let name = name.to_lowercase();
        self.sites
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.target.as_str())
    }

    /// Default news sources, with any news-affiliated site named in `text`
    /// moved or added to the front
    pub fn news_sources(&self, text: &str) -> Vec<String> {
        let mut sources: Vec<String> = DEFAULT_NEWS_SOURCES.iter().map(|s| s.to_string()).collect();

        for entry in &self.sites {
            if !is_news_affiliated(&entry.name) || !contains_word(text, &entry.name) {
                continue;
            }
            sources.retain(|s| s != &entry.target);
            sources.insert(0, entry.target.clone());
        }

        sources
    }
}

fn is_news_affiliated(name: &str) -> bool {
    name.contains("notícia") || name.contains("news") || NEWS_AFFILIATED.contains(&name)
}

fn merge_entries(builtin: &[(&str, &str)], extra: &BTreeMap<String, String>) -> Vec<Entry> {
    let mut merged: BTreeMap<String, String> = builtin
        .iter()
        .map(|(name, target)| (name.to_string(), target.to_string()))
        .collect();

    for (name, target) in extra {
        let name = name.trim().to_lowercase();
        if name.is_empty() {
            continue;
        }
        merged.insert(name, target.trim().to_string());
    }

    let mut entries: Vec<Entry> = merged
        .into_iter()
        .map(|(name, target)| Entry { name, target })
        .collect();

    // Longest first; BTreeMap order breaks ties
    entries.sort_by(|a, b| b.name.chars().count().cmp(&a.name.chars().count()));
    entries
}

/// `needle` occurs in `haystack` with no alphanumeric character on either side
pub fn contains_word(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }

    haystack.match_indices(needle).any(|(start, _)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + needle.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}
