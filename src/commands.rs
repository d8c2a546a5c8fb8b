//! Slash commands
//!
//! Input starting with `/` is a command and never reaches the classifier.

use crate::browser::ScrollDirection;

pub const HELP: &str = "Commands:
  /browser <url>      open a URL
  /search <query>     search the web
  /news               latest Google News headlines
  /analyze <url>      read a page in depth
  /click <text>       click a button or link on the open page
  /scroll <direction> up, down, top or bottom
  /elements           list clickable elements on the open page
  /run <command>      run a shell command and show its output
  /type <text>        type text into the focused window
  /key <name>         press a key (enter, tab, esc, a, ...)
  /clickat <x> <y>    click at a screen position
  /clear              clear the chat
  /reset              start a new conversation
  /status             connection and browser status
  /help               this message

Anything else is free text: ask for a site, a search, the news, a screenshot,
a program, or just chat.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlashCommand {
    Browser(String),
    Search(String),
    News,
    Analyze(String),
    Click(String),
    Scroll(ScrollDirection),
    Elements,
    Run(String),
    /// Desktop keyboard and mouse input
    Type(String),
    Key(String),
    ClickAt { x: i32, y: i32 },
    /// Clear the display; handled by the UI
    Clear,
    /// Forget the conversation history
    Reset,
    Help,
    Status,
    /// Known command used wrongly; carries the usage line
    Usage(&'static str),
    Unknown(String),
}

impl SlashCommand {
    /// Parse `input`; None when it is not a slash command
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        let rest = input.strip_prefix('/')?;

        let (name, arg) = match rest.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (rest, ""),
        };

        let required = |arg: &str, usage: &'static str, make: fn(String) -> SlashCommand| {
            if arg.is_empty() {
                SlashCommand::Usage(usage)
            } else {
                make(arg.to_string())
            }
        };

        let command = match name.to_lowercase().as_str() {
            "browser" => required(arg, "/browser <url>", SlashCommand::Browser),
            "search" => required(arg, "/search <query>", SlashCommand::Search),
            "analyze" => required(arg, "/analyze <url>", SlashCommand::Analyze),
            "click" => required(arg, "/click <text>", SlashCommand::Click),
            "run" => required(arg, "/run <command>", SlashCommand::Run),
            "type" => required(arg, "/type <text>", SlashCommand::Type),
            "key" => required(arg, "/key <name>", SlashCommand::Key),
            "clickat" => parse_position(arg)
                .map(|(x, y)| SlashCommand::ClickAt { x, y })
                .unwrap_or(SlashCommand::Usage("/clickat <x> <y>")),
            "scroll" => match ScrollDirection::parse(arg) {
                Some(direction) => SlashCommand::Scroll(direction),
                None => SlashCommand::Usage("/scroll <up|down|top|bottom>"),
            },
            "news" => SlashCommand::News,
            "elements" => SlashCommand::Elements,
            "clear" => SlashCommand::Clear,
            "reset" => SlashCommand::Reset,
            "help" => SlashCommand::Help,
            "status" => SlashCommand::Status,
            _ => SlashCommand::Unknown(name.to_string()),
        };
        Some(command)
    }
}

fn parse_position(arg: &str) -> Option<(i32, i32)> {
    let mut parts = arg.split_whitespace();
    let x = parts.next()?.parse().ok()?;
    let y = parts.next()?.parse().ok()?;
    match parts.next() {
        Some(_) => None,
        None => Some((x, y)),
    }
}
