//! Page Extractor - rendered HTML → PageDigest
//!
//! Non-content nodes are detached from the parsed tree once, before any
//! field is read, so boilerplate never reaches a digest. Every list keeps
//! document order and stops at its cap.

use crate::types::*;
use scraper::{ElementRef, Html, Selector};
use unicode_segmentation::UnicodeSegmentation;
use url::Url;

pub const MAX_HEADLINES: usize = 20;
pub const MAX_PARAGRAPHS: usize = 10;
pub const MAX_LINKS: usize = 20;
pub const MAX_IMAGES: usize = 10;
pub const MAX_BUTTON_CANDIDATES: usize = 20;
pub const MAX_LINK_CANDIDATES: usize = 30;
pub const MAX_TEXT_CHARS: usize = 3000;
pub const MAX_PLAIN_TEXT_CHARS: usize = 2000;

pub const MAX_MAIN_PARAGRAPHS: usize = 15;
pub const MAX_KEY_POINTS: usize = 10;
pub const SUMMARY_CHARS: usize = 300;

pub const MAX_NEWS_LINKS: usize = 50;
pub const MAX_NEWS_HEADINGS: usize = 30;

const NOISE_TAGS: &[&str] = &["script", "style", "nav", "footer", "header"];
const ANALYSIS_NOISE_TAGS: &[&str] = &["script", "style", "nav", "footer", "header", "aside", "iframe"];

/// Build the digest for a page. `title` falls back to the document's `<title>`.
pub fn extract_digest(html: &str, url: &str, title: &str) -> PageDigest {
    let mut document = Html::parse_document(html);

    // Clickables come from the live page, navigation bars included
    let clickable_elements = find_clickables(&document);

    let title = resolve_title(&document, title);
    prune(&mut document, NOISE_TAGS);

    PageDigest {
        url: url.to_string(),
        title,
        meta: page_meta(&document),
        headlines: headlines(&document),
        paragraphs: paragraphs(document.root_element(), 50, MAX_PARAGRAPHS),
        links: links(&document, url),
        images: images(&document),
        clickable_elements,
        text: truncate(&compact_ws(&document_text(document.root_element())), MAX_TEXT_CHARS),
    }
}

/// Digest for drivers that can only report body text
pub fn plain_text_digest(url: &str, title: &str, body_text: &str) -> PageDigest {
    PageDigest {
        url: url.to_string(),
        title: title.to_string(),
        text: truncate(&compact_ws(body_text), MAX_PLAIN_TEXT_CHARS),
        ..Default::default()
    }
}

/// Deep single-page analysis focused on the main content region
pub fn analyze_page(html: &str, url: &str, title: &str) -> PageAnalysis {
    let mut document = Html::parse_document(html);
    let title = resolve_title(&document, title);
    prune(&mut document, ANALYSIS_NOISE_TAGS);

    let meta = page_meta(&document);
    let region = main_region(&document);

    let mut main_content = region
        .map(|r| paragraphs(r, 50, MAX_MAIN_PARAGRAPHS))
        .unwrap_or_default();
    if main_content.is_empty() {
        main_content = paragraphs(document.root_element(), 50, MAX_MAIN_PARAGRAPHS);
    }

    let key_points = region.map(list_points).unwrap_or_default();

    let summary = match (&meta.description, main_content.first()) {
        (Some(description), _) => description.clone(),
        (None, Some(first)) => format!("{}...", truncate(first, SUMMARY_CHARS)),
        (None, None) => String::new(),
    };

    PageAnalysis {
        url: url.to_string(),
        title,
        meta,
        summary,
        main_content,
        key_points,
    }
}

/// Raw headline candidates from a news aggregator page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewsCandidates {
    /// Link text inside article containers
    pub primary: Vec<String>,
    /// h3/h4 text anywhere on the page
    pub secondary: Vec<String>,
}

pub fn news_candidates(html: &str) -> NewsCandidates {
    let document = Html::parse_document(html);
    let root = document.root_element();

    let primary = select_all(root, "article a")
        .into_iter()
        .take(MAX_NEWS_LINKS)
        .map(element_text)
        .filter(|t| !t.is_empty())
        .collect();

    let mut secondary = Vec::new();
    for tag in ["h3", "h4"] {
        secondary.extend(
            select_all(root, tag)
                .into_iter()
                .take(MAX_NEWS_HEADINGS)
                .map(element_text)
                .filter(|t| !t.is_empty()),
        );
    }

    NewsCandidates { primary, secondary }
}

/// Truncate to `max` user-perceived characters
pub fn truncate(text: &str, max: usize) -> String {
    text.graphemes(true).take(max).collect()
}

/// Whole-page text; block boundaries rarely carry whitespace, so nodes are spaced
fn document_text(elem: ElementRef<'_>) -> String {
    elem.text().collect::<Vec<_>>().join(" ")
}

pub(crate) fn compact_ws(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Visible text of one element. Inline markup splits text nodes mid-word,
/// so they are joined as-is.
pub(crate) fn element_text(elem: ElementRef<'_>) -> String {
    compact_ws(&elem.text().collect::<String>())
}

fn select_all<'a>(scope: ElementRef<'a>, css: &str) -> Vec<ElementRef<'a>> {
    let Ok(sel) = Selector::parse(css) else {
        return Vec::new();
    };
    scope.select(&sel).collect()
}

/// Detach every element matching one of `tags`
fn prune(document: &mut Html, tags: &[&str]) {
    let Ok(sel) = Selector::parse(&tags.join(", ")) else {
        return;
    };
    let ids: Vec<_> = document.select(&sel).map(|e| e.id()).collect();
    for id in ids {
        if let Some(mut node) = document.tree.get_mut(id) {
            node.detach();
        }
    }
}

fn resolve_title(document: &Html, title: &str) -> String {
    let title = title.trim();
    if !title.is_empty() {
        return title.to_string();
    }
    select_all(document.root_element(), "title")
        .into_iter()
        .next()
        .map(element_text)
        .unwrap_or_default()
}

fn meta_content(document: &Html, css: &str) -> Option<String> {
    select_all(document.root_element(), css)
        .into_iter()
        .find_map(|m| m.value().attr("content"))
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
}

fn page_meta(document: &Html) -> PageMeta {
    PageMeta {
        description: meta_content(document, r#"meta[name="description"]"#),
        keywords: meta_content(document, r#"meta[name="keywords"]"#),
        author: meta_content(document, r#"meta[name="author"]"#),
        published: meta_content(document, r#"meta[property="article:published_time"]"#),
    }
}

/// h1 first, then h2, ..., each level in document order
fn headlines(document: &Html) -> Vec<Headline> {
    let root = document.root_element();
    let mut out = Vec::new();

    for level in 1..=6u8 {
        for heading in select_all(root, &format!("h{}", level)) {
            let text = element_text(heading);
            if text.chars().count() > 10 {
                out.push(Headline { level, text });
            }
        }
    }

    out.truncate(MAX_HEADLINES);
    out
}

fn paragraphs(scope: ElementRef<'_>, min_chars: usize, cap: usize) -> Vec<String> {
    select_all(scope, "p")
        .into_iter()
        .map(element_text)
        .filter(|t| t.chars().count() > min_chars)
        .take(cap)
        .collect()
}

fn links(document: &Html, base: &str) -> Vec<Link> {
    let base = Url::parse(base).ok();

    select_all(document.root_element(), "a[href]")
        .into_iter()
        .filter_map(|a| {
            let text = element_text(a);
            let len = text.chars().count();
            if len <= 5 || len >= 100 {
                return None;
            }
            let href = a.value().attr("href")?.trim();
            Some(Link {
                text,
                href: absolute_href(base.as_ref(), href),
            })
        })
        .take(MAX_LINKS)
        .collect()
}

pub(crate) fn absolute_href(base: Option<&Url>, href: &str) -> String {
    base.and_then(|b| b.join(href).ok())
        .map(|u| u.to_string())
        .unwrap_or_else(|| href.to_string())
}

fn images(document: &Html) -> Vec<Image> {
    select_all(document.root_element(), "img")
        .into_iter()
        .filter_map(|img| {
            let alt = img.value().attr("alt").unwrap_or("").trim().to_string();
            let src = img.value().attr("src").unwrap_or("").trim().to_string();
            if alt.is_empty() && src.is_empty() {
                None
            } else {
                Some(Image { alt, src })
            }
        })
        .take(MAX_IMAGES)
        .collect()
}

fn find_clickables(document: &Html) -> Vec<ClickableElement> {
    let root = document.root_element();
    let mut out = Vec::new();

    for button in select_all(root, "button").into_iter().take(MAX_BUTTON_CANDIDATES) {
        let text = element_text(button);
        if !text.is_empty() {
            out.push(ClickableElement {
                kind: ClickableKind::Button,
                text,
                visible: !is_hidden(button),
            });
        }
    }

    for link in select_all(root, "a").into_iter().take(MAX_LINK_CANDIDATES) {
        let text = element_text(link);
        if text.chars().count() > 3 {
            out.push(ClickableElement {
                kind: ClickableKind::Link,
                text,
                visible: !is_hidden(link),
            });
        }
    }

    out
}

/// Hidden by markup on the element or any ancestor
pub(crate) fn is_hidden(elem: ElementRef<'_>) -> bool {
    std::iter::once(elem)
        .chain(elem.ancestors().filter_map(ElementRef::wrap))
        .any(|e| {
            let value = e.value();
            if value.attr("hidden").is_some() || value.attr("aria-hidden") == Some("true") {
                return true;
            }
            let style: String = value
                .attr("style")
                .unwrap_or("")
                .chars()
                .filter(|c| !c.is_whitespace())
                .collect::<String>()
                .to_lowercase();
            style.contains("display:none") || style.contains("visibility:hidden")
        })
}

/// article, then main, then the first div whose class mentions "content"
fn main_region(document: &Html) -> Option<ElementRef<'_>> {
    let root = document.root_element();

    select_all(root, "article")
        .into_iter()
        .next()
        .or_else(|| select_all(root, "main").into_iter().next())
        .or_else(|| {
            select_all(root, "div[class]").into_iter().find(|div| {
                div.value()
                    .attr("class")
                    .is_some_and(|c| c.to_lowercase().contains("content"))
            })
        })
}

fn list_points(region: ElementRef<'_>) -> Vec<String> {
    select_all(region, "ul li, ol li")
        .into_iter()
        .map(element_text)
        .filter(|t| t.chars().count() > 10)
        .take(MAX_KEY_POINTS)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ARTICLE: &str = r#"
        <html>
          <head>
            <title>Rust Weekly</title>
            <meta name="description" content="News from the Rust ecosystem">
            <meta name="author" content="Ferris">
            <script>var tracking = "script text should never leak";</script>
            <style>.hidden { display: none }</style>
          </head>
          <body>
            <header><h1>Site header that is long enough</h1></header>
            <nav><a href="/nav">Navigation link text</a></nav>
            <h2>Second level heading text</h2>
            <h1>Main headline of the page</h1>
            <h3>Short</h3>
            <p>This paragraph is comfortably longer than fifty characters in total.</p>
            <p>Too short.</p>
            <a href="/posts/1">Read the first post</a>
            <a href="https://other.example/x">Link</a>
            <img src="/logo.png" alt="Logo">
            <img>
            <button>Subscribe</button>
            <button style="display: none">Hidden button</button>
            <div hidden><a href="/secret">Secret link text</a></div>
            <footer><p>Footer paragraph that is also definitely longer than fifty chars.</p></footer>
          </body>
        </html>"#;

    fn digest() -> PageDigest {
        extract_digest(ARTICLE, "https://blog.example/index.html", "")
    }

    #[test]
    fn test_title_fallback() {
        assert_eq!(digest().title, "Rust Weekly");
        assert_eq!(
            extract_digest(ARTICLE, "https://blog.example/", "Driver Title").title,
            "Driver Title"
        );
    }

    #[test]
    fn test_meta() {
        let meta = digest().meta;
        assert_eq!(meta.description.as_deref(), Some("News from the Rust ecosystem"));
        assert_eq!(meta.author.as_deref(), Some("Ferris"));
        assert_eq!(meta.keywords, None);
    }

    #[test]
    fn test_headlines_by_level_then_document_order() {
        let headlines = digest().headlines;

        assert_eq!(
            headlines,
            vec![
                Headline {
                    level: 1,
                    text: "Main headline of the page".to_string()
                },
                Headline {
                    level: 2,
                    text: "Second level heading text".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_noise_never_leaks() {
        let digest = digest();

        assert!(!digest.text.contains("script text"));
        assert!(!digest.text.contains("Site header"));
        assert!(!digest.text.contains("Footer paragraph"));
        assert!(digest.links.iter().all(|l| l.text != "Navigation link text"));
        assert_eq!(digest.paragraphs.len(), 1);
    }

    #[test]
    fn test_links_resolved_and_bounded() {
        let links = digest().links;

        // "Link" is too short, the hidden div still counts as content
        assert_eq!(
            links,
            vec![
                Link {
                    text: "Read the first post".to_string(),
                    href: "https://blog.example/posts/1".to_string(),
                },
                Link {
                    text: "Secret link text".to_string(),
                    href: "https://blog.example/secret".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_images() {
        let images = digest().images;
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].alt, "Logo");
    }

    #[test]
    fn test_clickables_and_visibility() {
        let digest = digest();
        let visible: Vec<&str> = digest.visible_clickables().map(|c| c.text.as_str()).collect();

        assert!(visible.contains(&"Subscribe"));
        assert!(visible.contains(&"Navigation link text"));
        assert!(!visible.contains(&"Hidden button"));
        assert!(!visible.contains(&"Secret link text"));
        assert!(digest
            .clickable_elements
            .iter()
            .any(|c| c.text == "Hidden button" && !c.visible));
    }

    #[test]
    fn test_paragraph_boundary() {
        let exactly_50 = "a".repeat(50);
        let exactly_51 = "b".repeat(51);
        let html = format!("<p>{}</p><p>{}</p>", exactly_50, exactly_51);

        let digest = extract_digest(&html, "", "");
        assert_eq!(digest.paragraphs, vec![exactly_51]);
    }

    #[test]
    fn test_inline_markup_does_not_add_characters() {
        let split_50 = format!("<p>{}<b>{}</b></p>", "a".repeat(25), "b".repeat(25));
        let split_51 = format!("<p>{}<em>{}</em></p>", "c".repeat(25), "d".repeat(26));
        let html = format!(
            "{}{}<h2>Gov<em>erno</em> anuncia pacote</h2>",
            split_50, split_51
        );

        let digest = extract_digest(&html, "", "");
        assert_eq!(digest.paragraphs, vec![format!("{}{}", "c".repeat(25), "d".repeat(26))]);
        assert_eq!(digest.headlines[0].text, "Governo anuncia pacote");
    }

    #[test]
    fn test_inline_text_keeps_source_spacing() {
        let html = "<h1>Rust <b>1.80</b>\n   released today</h1>";
        let digest = extract_digest(html, "", "");
        assert_eq!(digest.headlines[0].text, "Rust 1.80 released today");
    }

    #[test]
    fn test_caps() {
        let mut html = String::from("<body>");
        for i in 0..40 {
            html.push_str(&format!("<h2>Heading number {:02} here</h2>", i));
            html.push_str(&format!("<p>{} {}</p>", i, "paragraph text ".repeat(5)));
            html.push_str(&format!("<a href='/p/{}'>Article link {}</a>", i, i));
            html.push_str(&format!("<img src='/i/{}.png'>", i));
        }
        html.push_str(&"word ".repeat(2000));
        html.push_str("</body>");

        let digest = extract_digest(&html, "https://x.example/", "");
        assert_eq!(digest.headlines.len(), MAX_HEADLINES);
        assert_eq!(digest.paragraphs.len(), MAX_PARAGRAPHS);
        assert_eq!(digest.links.len(), MAX_LINKS);
        assert_eq!(digest.images.len(), MAX_IMAGES);
        assert_eq!(digest.text.chars().count(), MAX_TEXT_CHARS);

        // Document order preserved
        assert_eq!(digest.headlines[0].text, "Heading number 00 here");
        assert_eq!(digest.links[1].href, "https://x.example/p/1");
    }

    #[test]
    fn test_clickable_candidate_caps() {
        let mut html = String::from("<body>");
        for i in 0..30 {
            html.push_str(&format!("<button>Button {}</button>", i));
        }
        for i in 0..40 {
            html.push_str(&format!("<a href='/l/{}'>Link number {}</a>", i, i));
        }
        html.push_str("</body>");

        let clickables = extract_digest(&html, "https://x.example/", "").clickable_elements;
        let buttons = clickables.iter().filter(|c| c.kind == ClickableKind::Button).count();
        let links = clickables.iter().filter(|c| c.kind == ClickableKind::Link).count();

        assert_eq!(buttons, MAX_BUTTON_CANDIDATES);
        assert_eq!(links, MAX_LINK_CANDIDATES);
        assert_eq!(clickables[0].text, "Button 0");
    }

    #[test]
    fn test_analyze_caps() {
        let mut html = String::from("<body><article><ul>");
        for i in 0..20 {
            html.push_str(&format!("<li>Key point number {}</li>", i));
        }
        html.push_str("</ul>");
        for i in 0..25 {
            html.push_str(&format!("<p>{} {}</p>", i, "main content sentence ".repeat(4)));
        }
        html.push_str("</article></body>");

        let analysis = analyze_page(&html, "https://x.example/", "X");
        assert_eq!(analysis.main_content.len(), MAX_MAIN_PARAGRAPHS);
        assert_eq!(analysis.key_points.len(), MAX_KEY_POINTS);
        assert_eq!(analysis.key_points[0], "Key point number 0");
    }

    #[test]
    fn test_news_candidate_caps() {
        let mut html = String::new();
        for i in 0..60 {
            html.push_str(&format!("<article><a href='/n/{}'>Story {}</a></article>", i, i));
        }
        for i in 0..40 {
            html.push_str(&format!("<h3>Section h3 {}</h3><h4>Section h4 {}</h4>", i, i));
        }

        let candidates = news_candidates(&html);
        assert_eq!(candidates.primary.len(), MAX_NEWS_LINKS);
        assert_eq!(candidates.secondary.len(), 2 * MAX_NEWS_HEADINGS);
    }

    #[test]
    fn test_extraction_is_idempotent() {
        assert_eq!(digest(), digest());
    }

    #[test]
    fn test_malformed_html_degrades() {
        let digest = extract_digest("<div><p>unclosed", "https://x.example/", "");
        assert!(digest.headlines.is_empty());
        assert!(digest.paragraphs.is_empty());
        assert_eq!(digest.text, "unclosed");
    }

    #[test]
    fn test_plain_text_fallback() {
        let body = "word ".repeat(1000);
        let digest = plain_text_digest("https://x.example/", "X", &body);

        assert_eq!(digest.text.chars().count(), MAX_PLAIN_TEXT_CHARS);
        assert!(digest.headlines.is_empty());
        assert!(digest.clickable_elements.is_empty());
    }

    #[test]
    fn test_analyze_prefers_article() {
        let html = r#"
            <body>
              <aside><p>Sidebar content that is longer than fifty characters for sure.</p></aside>
              <div class="page-content"><p>Div paragraph that is longer than fifty characters for sure.</p></div>
              <article>
                <p>Article paragraph that is longer than fifty characters for sure.</p>
                <ul><li>First key point</li><li>short</li></ul>
              </article>
            </body>"#;

        let analysis = analyze_page(html, "https://x.example/a", "A");
        assert_eq!(
            analysis.main_content,
            vec!["Article paragraph that is longer than fifty characters for sure."]
        );
        assert_eq!(analysis.key_points, vec!["First key point"]);
        assert!(analysis.summary.starts_with("Article paragraph"));
        assert!(analysis.summary.ends_with("..."));
    }

    #[test]
    fn test_analyze_content_div_and_meta_summary() {
        let html = r#"
            <head><meta name="description" content="Short summary"></head>
            <body>
              <div class="sidebar"><p>Not the main content but long enough to be a paragraph.</p></div>
              <div class="Main-Content"><p>Main content paragraph, longer than fifty characters.</p></div>
            </body>"#;

        let analysis = analyze_page(html, "https://x.example/b", "B");
        assert_eq!(analysis.summary, "Short summary");
        assert_eq!(
            analysis.main_content,
            vec!["Main content paragraph, longer than fifty characters."]
        );
    }

    #[test]
    fn test_analyze_falls_back_to_whole_document() {
        let html = r#"<body><article><p>tiny</p></article>
            <p>Loose paragraph outside any region, longer than fifty chars.</p></body>"#;

        let analysis = analyze_page(html, "", "");
        assert_eq!(analysis.main_content.len(), 1);
        assert!(analysis.main_content[0].starts_with("Loose paragraph"));
    }

    #[test]
    fn test_news_candidates() {
        let html = r#"
            <article><a href="/1">Governo anuncia novo pacote fiscal</a></article>
            <article><a href="/2"></a></article>
            <h3>Eleições terão segundo turno em outubro</h3>
            <h4>Outro título de seção qualquer</h4>"#;

        let candidates = news_candidates(html);
        assert_eq!(candidates.primary, vec!["Governo anuncia novo pacote fiscal"]);
        assert_eq!(candidates.secondary.len(), 2);
    }

    #[test]
    fn test_truncate_graphemes() {
        assert_eq!(truncate("ação", 2), "aç");
        assert_eq!(truncate("abc", 10), "abc");
    }
}
