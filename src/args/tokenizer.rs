//! Tokenizer for command parameters.
//!
//! Splits the text after the command name into ordered tokens and pulls the
//! declared flags (`--verbose`) and options (`--limit=5`, `--limit 5`) out of
//! the stream:
//! - Whitespace-separated words
//! - Quoted strings with configurable quote pairs (`"a b"`, `“a b”`, `「a b」`)
//! - Escaped closing quotes inside quotes: `"say \"hi\""` → `say "hi"`
//! - Flag and option prefixes (`--`, `-`, `—`) and separators (`=`, `:`)

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

/// An opening/closing quote pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotePair {
    /// Character that opens a quoted token.
    pub open: char,
    /// Character that closes it.
    pub close: char,
}

impl QuotePair {
    /// Creates a quote pair.
    pub const fn new(open: char, close: char) -> Self {
        Self { open, close }
    }
}

/// Default quotes: double quotes, typographic quotes and CJK corner brackets.
pub const DEFAULT_QUOTES: [QuotePair; 3] = [
    QuotePair::new('"', '"'),
    QuotePair::new('“', '”'),
    QuotePair::new('「', '」'),
];

/// Which flags and options a command accepts, and how they are written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlagStrategy {
    /// Accepted key-only flags.
    pub flags: Vec<String>,
    /// Accepted key-value options.
    pub options: Vec<String>,
    /// Prefixes introducing a flag or option.
    pub prefixes: Vec<String>,
    /// Separators between an option key and its value.
    pub separators: Vec<String>,
}

impl Default for FlagStrategy {
    fn default() -> Self {
        Self {
            flags: Vec::new(),
            options: Vec::new(),
            prefixes: vec!["--".to_string(), "-".to_string(), "—".to_string()],
            separators: vec!["=".to_string(), ":".to_string()],
        }
    }
}

impl FlagStrategy {
    /// Adds accepted flags.
    pub fn with_flags<I, S>(mut self, flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.flags.extend(flags.into_iter().map(Into::into));
        self
    }

    /// Adds accepted options.
    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.extend(options.into_iter().map(Into::into));
        self
    }

    /// Strips the longest matching prefix from `word`.
    fn strip_prefix<'a>(&self, word: &'a str) -> Option<&'a str> {
        self.prefixes
            .iter()
            .filter(|p| !p.is_empty() && word.starts_with(p.as_str()))
            .max_by_key(|p| p.len())
            .map(|p| &word[p.len()..])
            .filter(|rest| !rest.is_empty())
    }

    /// Splits `key<sep>value` at the earliest separator.
    fn split_option<'a>(&self, body: &'a str) -> Option<(&'a str, &'a str)> {
        self.separators
            .iter()
            .filter(|s| !s.is_empty())
            .filter_map(|s| body.find(s.as_str()).map(|pos| (pos, s.len())))
            .min_by_key(|(pos, _)| *pos)
            .map(|(pos, len)| (&body[..pos], &body[pos + len..]))
    }

    fn classify(&self, token: &Token) -> Classified {
        if token.quoted {
            return Classified::Ordinary;
        }
        let Some(body) = self.strip_prefix(&token.value) else {
            return Classified::Ordinary;
        };
        if let Some((key, value)) = self.split_option(body) {
            if self.options.iter().any(|o| o == key) {
                return Classified::Option {
                    key: key.to_string(),
                    value: Some(value.to_string()),
                };
            }
            return Classified::Ordinary;
        }
        if self.flags.iter().any(|f| f == body) {
            return Classified::Flag(body.to_string());
        }
        if self.options.iter().any(|o| o == body) {
            return Classified::Option {
                key: body.to_string(),
                value: None,
            };
        }
        Classified::Ordinary
    }
}

enum Classified {
    Ordinary,
    Flag(String),
    Option { key: String, value: Option<String> },
}

/// A token produced by the tokenizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// The token text with quotes removed.
    pub value: String,
    /// The token as written, quotes included.
    pub raw: String,
    /// Whitespace that followed the token in the input.
    pub trailing: String,
    /// Whether the token was quoted.
    pub quoted: bool,
}

/// Tokenized parameters: ordinary tokens plus extracted flags and options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Parameters {
    /// Ordinary tokens in input order.
    pub ordered: Vec<Token>,
    /// Flags seen anywhere in the input.
    pub flags: HashSet<String>,
    /// Option values by key, in input order.
    pub options: HashMap<String, Vec<String>>,
}

/// Tokenizer configuration for one command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenizerConfig {
    /// Accepted quote pairs; empty disables quoting.
    pub quotes: Vec<QuotePair>,
    /// Flag and option strategy.
    pub strategy: FlagStrategy,
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self {
            quotes: DEFAULT_QUOTES.to_vec(),
            strategy: FlagStrategy::default(),
        }
    }
}

/// Tokenizes `input` and extracts flags and options in one pass.
pub fn lex(input: &str, config: &TokenizerConfig) -> Parameters {
    parse(tokenize(input, &config.quotes), &config.strategy)
}

/// Splits `input` into tokens, honouring the given quote pairs.
pub fn tokenize(input: &str, quotes: &[QuotePair]) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    // Skip leading whitespace
    while chars.peek().is_some_and(|c| c.is_whitespace()) {
        chars.next();
    }

    while let Some(&c) = chars.peek() {
        let mut token = match quotes.iter().find(|q| q.open == c) {
            Some(quote) => {
                chars.next();
                let (value, closed) = collect_quoted(&mut chars, quote.close);
                let mut raw = String::new();
                raw.push(quote.open);
                raw.push_str(&value);
                if closed {
                    raw.push(quote.close);
                }
                Token {
                    value,
                    raw,
                    trailing: String::new(),
                    quoted: true,
                }
            }
            None => {
                let word = collect_word(&mut chars);
                Token {
                    raw: word.clone(),
                    value: word,
                    trailing: String::new(),
                    quoted: false,
                }
            }
        };

        while let Some(&ws) = chars.peek() {
            if !ws.is_whitespace() {
                break;
            }
            chars.next();
            token.trailing.push(ws);
        }
        tokens.push(token);
    }

    tokens
}

/// Separates flags and options from ordinary tokens.
///
/// Options written without a separator take the next ordinary token as value.
/// An ordinary token directly followed by an extracted one gets that token's
/// whitespace, or a single space, as its own trailing text.
pub fn parse(tokens: Vec<Token>, strategy: &FlagStrategy) -> Parameters {
    let mut params = Parameters::default();
    let mut pending_option: Option<String> = None;

    for token in tokens {
        match strategy.classify(&token) {
            Classified::Flag(name) => {
                pending_option = None;
                params.flags.insert(name);
                mark_gap(&mut params.ordered, &token);
            }
            Classified::Option { key, value } => {
                let values = params.options.entry(key.clone()).or_default();
                match value {
                    Some(value) => {
                        values.push(value);
                        pending_option = None;
                    }
                    None => pending_option = Some(key),
                }
                mark_gap(&mut params.ordered, &token);
            }
            Classified::Ordinary => match pending_option.take() {
                Some(key) => {
                    mark_gap(&mut params.ordered, &token);
                    params.options.entry(key).or_default().push(token.value);
                }
                None => params.ordered.push(token),
            },
        }
    }

    params
}

fn mark_gap(ordered: &mut [Token], extracted: &Token) {
    let Some(last) = ordered.last_mut() else {
        return;
    };
    if !last.trailing.is_empty() {
        return;
    }
    last.trailing = if extracted.trailing.is_empty() {
        " ".to_string()
    } else {
        extracted.trailing.clone()
    };
}

/// Collects characters until whitespace or end of input.
fn collect_word(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut word = String::new();
    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            break;
        }
        chars.next();
        word.push(c);
    }
    word
}

/// Collects characters up to the closing quote.
///
/// Returns the collected text and whether the closing quote was found; an
/// unterminated quote runs to the end of the input.
fn collect_quoted(
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    close: char,
) -> (String, bool) {
    let mut result = String::new();
    let mut escaped = false;

    for c in chars.by_ref() {
        if escaped {
            if c != close && c != '\\' {
                // Unknown escape, keep as-is
                result.push('\\');
            }
            result.push(c);
            escaped = false;
            continue;
        }

        if c == '\\' {
            escaped = true;
            continue;
        }

        if c == close {
            return (result, true);
        }

        result.push(c);
    }

    if escaped {
        result.push('\\');
    }
    (result, false)
}
