//! Keyword auto-responder.
//!
//! Rules are tried in a fixed priority order and the first match wins.

use chrono::{DateTime, Utc};

/// Sender name reserved for automated replies.
pub const BOT_NAME: &str = "Bot 🤖";

const GREETING_WORDS: &[&str] = &["hi", "hello", "hey", "hiya", "howdy", "greetings"];
const STATUS_PHRASES: &[&str] = &["how are you", "how r u", "how's it going", "whats up", "what's up"];
const FAREWELL_WORDS: &[&str] = &["bye", "goodbye", "cya", "farewell"];
const FAREWELL_PHRASES: &[&str] = &["see you"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    Greeting,
    Status,
    Farewell,
    Time,
    Help,
}

impl Rule {
    /// Rules in evaluation order.
    pub const ALL: [Rule; 5] = [Rule::Greeting, Rule::Status, Rule::Farewell, Rule::Time, Rule::Help];

    fn matches(self, words: &[&str]) -> bool {
        match self {
            Rule::Greeting => contains_any_word(words, GREETING_WORDS),
            Rule::Status => contains_any_phrase(words, STATUS_PHRASES),
            Rule::Farewell => {
                contains_any_word(words, FAREWELL_WORDS) || contains_any_phrase(words, FAREWELL_PHRASES)
            }
            Rule::Time => contains_any_word(words, &["time"]),
            Rule::Help => contains_any_word(words, &["help"]),
        }
    }

    fn reply(self, sender: &str, now: DateTime<Utc>) -> String {
        match self {
            Rule::Greeting => format!("Hi {sender}! 👋 How can I help you today?"),
            Rule::Status => "I'm doing great, thanks for asking! 😊".to_string(),
            Rule::Farewell => "Goodbye! Have a great day 🌞".to_string(),
            Rule::Time => format!("The current time is {} ⏰", now.format("%H:%M")),
            Rule::Help => {
                "I can greet you, tell you the time, or just chat. Try saying \"hi\" 🙂".to_string()
            }
        }
    }
}

/// First rule matching `text`, if any.
pub fn match_rule(text: &str) -> Option<Rule> {
    let lowered = text.to_lowercase();
    let words = tokenize(&lowered);
    Rule::ALL.into_iter().find(|rule| rule.matches(&words))
}

/// Reply to a message from `sender`, or `None` when nothing matches.
pub fn respond(text: &str, sender: &str, now: DateTime<Utc>) -> Option<String> {
    match_rule(text).map(|rule| rule.reply(sender, now))
}

fn tokenize(text: &str) -> Vec<&str> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect()
}

fn contains_any_word(words: &[&str], candidates: &[&str]) -> bool {
    words.iter().any(|w| candidates.contains(w))
}

fn contains_any_phrase(words: &[&str], phrases: &[&str]) -> bool {
    phrases.iter().any(|phrase| {
        let needle = tokenize(phrase);
        !needle.is_empty() && words.windows(needle.len()).any(|window| window == needle.as_slice())
    })
}
