//! Example: classifying requests and digesting a page, no network needed
//!
//! Demonstrates the intent cascade and the page extractor on their own.

use deskpilot::intent_parser::IntentParser;
use deskpilot::lexicon::Lexicon;
use deskpilot::{action_context, page_extractor};
use std::sync::Arc;

const PAGE: &str = r#"
<html><head><title>Rust Blog</title>
<meta name="description" content="Updates from the Rust team."></head>
<body>
  <nav><a href="/menu">Menu</a></nav>
  <article>
    <h1>Announcing a new Rust release today</h1>
    <p>The Rust team is happy to announce a new version of Rust, the language
    empowering everyone to build reliable and efficient software.</p>
    <ul><li>Faster incremental builds across large workspaces</li></ul>
    <a href="/install">Install or update Rust</a>
    <button>Subscribe to the newsletter</button>
  </article>
</body></html>"#;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Simple Intent Classification Example ===\n");

    let parser = IntentParser::new(Arc::new(Lexicon::default()));

    let requests = vec![
        "abre o youtube",
        "pesquise receita de bolo de cenoura",
        "quais as manchetes de hoje",
        "tira um print da tela",
        "fecha o chrome",
        "abre a calculadora",
        "me conta uma piada",
    ];

    for request in requests {
        let intent = parser.classify(request);

        println!("Input: \"{}\"", request);
        println!("  Kind: {:?}", intent.kind());
        println!("  Confidence: {:.2}", intent.confidence);
        if let Some(explanation) = parser.explain(&intent) {
            println!("  Action: {}", explanation);
        }
        println!();
    }

    println!("=== Page Digest ===\n");

    let digest = page_extractor::extract_digest(PAGE, "https://blog.rust-lang.org/", "");
    println!("{}\n", action_context::opened_page("the Rust blog", &digest));

    let analysis = page_extractor::analyze_page(PAGE, "https://blog.rust-lang.org/", "");
    println!("{}", action_context::analysis_report(&analysis));

    Ok(())
}
