//! Rendering of structured results into prompt text.
//!
//! Everything here is pure: the dispatcher builds digests, these functions
//! turn them into the `ActionContext` the language model reads (always
//! phrased as already done) or into direct replies for slash commands.

use crate::page_extractor::truncate;
use crate::types::*;
use std::fmt::Write;
use std::path::Path;

pub const OPENED_HEADLINES: usize = 8;
pub const SEARCH_HEADLINES: usize = 10;
pub const SEARCH_PARAGRAPHS: usize = 5;
pub const PAGE_HEADLINES: usize = 10;
pub const PAGE_PARAGRAPHS: usize = 5;
pub const SNIPPET_CHARS: usize = 200;
pub const MAX_LISTED_ELEMENTS: usize = 15;
/// Search results shorter than this are usually UI labels
const MIN_RESULT_HEADLINE_CHARS: usize = 20;

const DONE: &str = "ACTION ALREADY PERFORMED:";
const NOT_DONE: &str = "ACTION COULD NOT BE COMPLETED:";

/// Visible clickable elements as a numbered list, empty when there are none
pub fn render_clickables(elements: &[ClickableElement]) -> String {
    let mut out = String::new();
    for (i, element) in elements
        .iter()
        .filter(|e| e.visible)
        .take(MAX_LISTED_ELEMENTS)
        .enumerate()
    {
        if i == 0 {
            out.push_str("Clickable elements on the page:\n");
        }
        let _ = writeln!(out, "{}. [{}] {}", i + 1, element.kind, element.text);
    }
    out
}

fn page_header(out: &mut String, digest: &PageDigest) {
    let _ = writeln!(out, "Page title: {}", digest.title);
    let _ = writeln!(out, "URL: {}", digest.url);
}

fn headline_block(out: &mut String, heading: &str, headlines: &[&str]) {
    if headlines.is_empty() {
        return;
    }
    let _ = writeln!(out, "\n{}:", heading);
    for headline in headlines {
        let _ = writeln!(out, "- {}", headline);
    }
}

fn elements_block(out: &mut String, digest: &PageDigest) {
    let elements = render_clickables(&digest.clickable_elements);
    if !elements.is_empty() {
        out.push('\n');
        out.push_str(&elements);
    }
}

/// A site or URL was opened
pub fn opened_page(label: &str, digest: &PageDigest) -> ActionContext {
    let mut out = format!("{} You opened {} in the browser.\n", DONE, label);
    page_header(&mut out, digest);

    let headlines: Vec<&str> = digest
        .headlines
        .iter()
        .take(OPENED_HEADLINES)
        .map(|h| h.text.as_str())
        .collect();
    headline_block(&mut out, "Main headlines", &headlines);

    if let Some(first) = digest.paragraphs.first() {
        let _ = writeln!(out, "\nFirst paragraph: {}", truncate(first, SNIPPET_CHARS));
    }
    if headlines.is_empty() && digest.paragraphs.is_empty() && !digest.text.is_empty() {
        let _ = writeln!(out, "\nPage text: {}", truncate(&digest.text, SNIPPET_CHARS * 2));
    }

    elements_block(&mut out, digest);
    out.push_str("\nDescribe what is on the page. The site is already open.");
    ActionContext::new(out)
}

/// Result titles on a search page: headings first, then link text
fn result_titles(digest: &PageDigest) -> Vec<&str> {
    digest
        .headlines
        .iter()
        .map(|h| h.text.as_str())
        .chain(digest.links.iter().map(|l| l.text.as_str()))
        .filter(|t| t.chars().count() > MIN_RESULT_HEADLINE_CHARS)
        .take(SEARCH_HEADLINES)
        .collect()
}

pub fn searched(query: &str, digest: &PageDigest) -> ActionContext {
    let mut out = format!("{} You searched the web for '{}'.\n", DONE, query);
    page_header(&mut out, digest);

    let results = result_titles(digest);
    headline_block(&mut out, "Results found", &results);

    let snippets: Vec<String> = digest
        .paragraphs
        .iter()
        .take(SEARCH_PARAGRAPHS)
        .map(|p| truncate(p, SNIPPET_CHARS))
        .collect();
    if !snippets.is_empty() {
        out.push_str("\nSnippets:\n");
        for snippet in &snippets {
            let _ = writeln!(out, "- {}", snippet);
        }
    }

    elements_block(&mut out, digest);
    out.push_str("\nSummarize the results for the user. The search is already done.");
    ActionContext::new(out)
}

pub fn news_summary(headlines: &[String], sources: &[String]) -> ActionContext {
    let mut out = format!(
        "{} You visited {} news source(s): {}.\n",
        DONE,
        sources.len(),
        sources.join(", ")
    );

    if headlines.is_empty() {
        out.push_str("No headlines could be read from those pages.\n");
    } else {
        out.push_str("\nLatest headlines:\n");
        for (i, headline) in headlines.iter().enumerate() {
            let _ = writeln!(out, "{}. {}", i + 1, headline);
        }
    }

    out.push_str("\nGive the user a short summary of the news above.");
    ActionContext::new(out)
}

pub fn screenshot_saved(path: &Path) -> ActionContext {
    ActionContext::new(format!(
        "{} You took a screenshot of the whole screen and saved it to {}.",
        DONE,
        path.display()
    ))
}

pub fn browser_closed(was_open: bool) -> ActionContext {
    if was_open {
        ActionContext::new(format!("{} You closed the browser.", DONE))
    } else {
        ActionContext::new(format!(
            "{} The browser was already closed, nothing to do.",
            DONE
        ))
    }
}

/// `now_showing` is the tab left in front, None when the last tab closed the browser
/// A tab was closed; `now_showing` is the page left in front, if any
pub fn tab_closed(now_showing: Option<&PageDigest>) -> ActionContext {
    match now_showing {
        Some(digest) => {
            let mut out = format!(
                "{} You closed the current tab. Now showing: {} ({}).\n",
                DONE, digest.title, digest.url
            );
            let headlines: Vec<&str> = digest
                .headlines
                .iter()
                .take(OPENED_HEADLINES)
                .map(|h| h.text.as_str())
                .collect();
            headline_block(&mut out, "Headlines", &headlines);
            elements_block(&mut out, digest);
            ActionContext::new(out.trim_end())
        }
        None => ActionContext::new(format!(
            "{} You closed the last tab, so the browser is now closed.",
            DONE
        )),
    }
}

/// What can be clicked on the open page
pub fn page_elements(digest: &PageDigest) -> ActionContext {
    let mut out = String::from("CURRENT BROWSER PAGE (already open):\n");
    page_header(&mut out, digest);

    let elements = render_clickables(&digest.clickable_elements);
    if elements.is_empty() {
        out.push_str("\nThere are no visible clickable elements on this page.");
    } else {
        out.push('\n');
        out.push_str(&elements);
        out.push_str("\nList these for the user; they can ask to click any of them.");
    }
    ActionContext::new(out)
}

pub fn no_browser_open() -> ActionContext {
    ActionContext::new(format!(
        "{} There was no browser open, so there was nothing to close.",
        DONE
    ))
}

pub fn program_launched(name: &str, command: &str) -> ActionContext {
    ActionContext::new(format!(
        "{} You launched {} (command: {}).",
        DONE, name, command
    ))
}

pub fn clicked(target: &str, digest: &PageDigest) -> ActionContext {
    let mut out = format!("{} You clicked '{}'.\n", DONE, target);
    page_header(&mut out, digest);

    let headlines: Vec<&str> = digest
        .headlines
        .iter()
        .take(5)
        .map(|h| h.text.as_str())
        .collect();
    headline_block(&mut out, "Headlines now visible", &headlines);
    ActionContext::new(out)
}

pub fn analyzed(analysis: &PageAnalysis) -> ActionContext {
    let mut out = format!("{} You opened and read {}.\n", DONE, analysis.url);
    out.push_str(&analysis_report(analysis));
    ActionContext::new(out)
}

/// The page the user is looking at, attached to free-form conversation
pub fn current_page(digest: &PageDigest) -> ActionContext {
    let mut out = String::from("CURRENT BROWSER PAGE (already open):\n");
    page_header(&mut out, digest);

    let headlines: Vec<&str> = digest
        .headlines
        .iter()
        .take(PAGE_HEADLINES)
        .map(|h| h.text.as_str())
        .collect();
    headline_block(&mut out, "Headlines", &headlines);

    let paragraphs: Vec<&str> = digest
        .paragraphs
        .iter()
        .take(PAGE_PARAGRAPHS)
        .map(String::as_str)
        .collect();
    headline_block(&mut out, "Content", &paragraphs);

    elements_block(&mut out, digest);
    ActionContext::new(out)
}

pub fn failed(action: &str, reason: &str) -> ActionContext {
    ActionContext::new(format!(
        "{} You tried to {} but it failed: {}. Tell the user it could not be done.",
        NOT_DONE, action, reason
    ))
}

/// Human-readable analysis, used both for the model and `/analyze`
pub fn analysis_report(analysis: &PageAnalysis) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Title: {}", analysis.title);
    let _ = writeln!(out, "URL: {}", analysis.url);

    if let Some(author) = &analysis.meta.author {
        let _ = writeln!(out, "Author: {}", author);
    }
    if let Some(published) = &analysis.meta.published {
        let _ = writeln!(out, "Published: {}", published);
    }
    if !analysis.summary.is_empty() {
        let _ = writeln!(out, "\nSummary: {}", analysis.summary);
    }

    if !analysis.key_points.is_empty() {
        out.push_str("\nKey points:\n");
        for point in &analysis.key_points {
            let _ = writeln!(out, "- {}", point);
        }
    }

    if !analysis.main_content.is_empty() {
        out.push_str("\nMain content:\n");
        for paragraph in analysis.main_content.iter().take(PAGE_PARAGRAPHS) {
            let _ = writeln!(out, "{}\n", truncate(paragraph, SNIPPET_CHARS * 2));
        }
    }

    out.trim_end().to_string()
}

/// Numbered result list for `/search`
pub fn search_results(query: &str, digest: &PageDigest) -> String {
    let results = result_titles(digest);
    if results.is_empty() {
        return format!("🔍 No results found for '{}'.", query);
    }

    let mut out = format!("🔍 Results for '{}':\n", query);
    for (i, result) in results.iter().enumerate() {
        let _ = writeln!(out, "{}. {}", i + 1, result);
    }
    out.trim_end().to_string()
}

/// Numbered headline list for `/news`
pub fn headline_list(headlines: &[String]) -> String {
    if headlines.is_empty() {
        return "No headlines found.".to_string();
    }

    let mut out = String::from("📰 Latest headlines:\n");
    for (i, headline) in headlines.iter().enumerate() {
        let _ = writeln!(out, "{}. {}", i + 1, headline);
    }
    out.trim_end().to_string()
}
