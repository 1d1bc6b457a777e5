//! Free-text search terms.
//!
//! A search string is split on whitespace into tokens. Quoted (`"..."`,
//! `'...'`) and bracketed (`[...]`) spans stay whole when they open a token.
//! Each token then becomes one of:
//!
//! * `"abc"` / `'abc'`: a cell equal to `abc`
//! * `[a, b]`: some cell contains `a` or `b`
//! * `!x`: the negation of `x`
//! * `^abc` / `abc$`: a cell starting / ending with `abc`
//! * `abc`: a cell containing `abc`
//!
//! Tokens made only of operator characters (`>=`, `==`, `&`, ...) carry no
//! searchable text and are dropped; quote them to search for them.
//!
//! Nothing here fails. Unbalanced quotes and brackets are read as literal text.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Anchor {
    #[default]
    None,
    Prefix,
    Suffix,
}

/// One text condition, tested case-insensitively against stringified cells.
/// `exact` and a non-`None` anchor never occur together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermPredicate {
    pub text: String,
    pub negate: bool,
    pub exact: bool,
    pub anchor: Anchor,
}

impl TermPredicate {
    pub fn contains(text: &str) -> Self {
        Self { text: text.to_string(), negate: false, exact: false, anchor: Anchor::None }
    }
    pub fn exact(text: &str) -> Self {
        Self { exact: true, ..Self::contains(text) }
    }
    pub fn anchored(text: &str, anchor: Anchor) -> Self {
        Self { anchor, ..Self::contains(text) }
    }
    pub fn negated(self) -> Self {
        Self { negate: true, ..self }
    }
}

/// All `terms` must hold, and when `or_terms` is present at least one of its
/// strings must appear in some cell.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TermGroup {
    pub terms: Vec<TermPredicate>,
    pub or_terms: Option<Vec<String>>,
}

impl TermGroup {
    /// A group without conditions matches every row.
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty() && self.or_terms.is_none()
    }
}

enum Term {
    Predicate(TermPredicate),
    AnyOf(Vec<String>),
    NoneOf(Vec<String>),
}

pub fn parse_terms(raw: &str) -> TermGroup {
    let mut group = TermGroup::default();
    for token in tokenize(raw, char::is_whitespace) {
        match parse_token(&token) {
            Some(Term::Predicate(predicate)) => group.terms.push(predicate),
            Some(Term::AnyOf(items)) => group.or_terms.get_or_insert_with(Vec::new).extend(items),
            // "none of a, b" is "not a and not b"
            Some(Term::NoneOf(items)) => group
                .terms
                .extend(items.iter().map(|item| TermPredicate::contains(item).negated())),
            None => {}
        }
    }
    tracing::trace!(?group, "parsed search terms");
    group
}

/// True when a token opens a bracket list that is never closed.
pub fn has_unterminated_bracket(raw: &str) -> bool {
    scan(raw, char::is_whitespace).unterminated_bracket
}

fn parse_token(token: &str) -> Option<Term> {
    // a bare '*' is the wildcard marker, which the caller strips beforehand
    if token.is_empty() || token == "*" || is_operator(token) {
        return None;
    }
    if let Some(rest) = token.strip_prefix('!') {
        return match parse_token(rest)? {
            Term::Predicate(predicate) => Some(Term::Predicate(predicate.negated())),
            Term::AnyOf(items) | Term::NoneOf(items) => Some(Term::NoneOf(items)),
        };
    }
    if let Some(inner) = unquote(token) {
        return (!inner.is_empty()).then(|| Term::Predicate(TermPredicate::exact(inner)));
    }
    if let Some(inner) = token.strip_prefix('[').and_then(|t| t.strip_suffix(']')) {
        let items: Vec<String> = inner
            .split(',')
            .map(str::trim)
            .map(|item| unquote(item).unwrap_or(item))
            .filter(|item| !item.is_empty())
            .map(String::from)
            .collect();
        return (!items.is_empty()).then_some(Term::AnyOf(items));
    }
    if let Some(text) = token.strip_prefix('^').filter(|t| !t.is_empty()) {
        return Some(Term::Predicate(TermPredicate::anchored(text, Anchor::Prefix)));
    }
    if let Some(text) = token.strip_suffix('$').filter(|t| !t.is_empty()) {
        return Some(Term::Predicate(TermPredicate::anchored(text, Anchor::Suffix)));
    }
    Some(Term::Predicate(TermPredicate::contains(token)))
}

fn is_operator(token: &str) -> bool {
    token.chars().all(|c| matches!(c, '<' | '>' | '=' | '&' | '|' | '~'))
}

/// Strips one matching pair of `"` or `'`.
pub(crate) fn unquote(token: &str) -> Option<&str> {
    ['"', '\''].into_iter().find_map(|quote| {
        (token.len() >= 2 && token.starts_with(quote) && token.ends_with(quote))
            .then(|| &token[1..token.len() - 1])
    })
}

fn closing_delimiter(open: char) -> Option<char> {
    match open {
        '"' => Some('"'),
        '\'' => Some('\''),
        '[' => Some(']'),
        _ => None,
    }
}

/// Splits on `is_separator`, keeping a quoted or bracketed span whole when it
/// opens a token (optionally behind `!`). A span without its closing
/// delimiter is ordinary text.
pub(crate) fn tokenize(raw: &str, is_separator: impl Fn(char) -> bool) -> Vec<String> {
    scan(raw, is_separator).tokens
}

struct Scan {
    tokens: Vec<String>,
    // a token-opening '[' had no ']' after it
    unterminated_bracket: bool,
}

fn scan(raw: &str, is_separator: impl Fn(char) -> bool) -> Scan {
    let mut tokens = Vec::new();
    let mut unterminated_bracket = false;
    let mut current = String::new();
    let mut cursor = 0;
    while let Some(ch) = raw[cursor..].chars().next() {
        let rest = &raw[cursor..];
        if current.chars().all(|c| c == '!') {
            if let Some(close) = closing_delimiter(ch) {
                let open_len = ch.len_utf8();
                if let Some(end) = rest[open_len..].find(close) {
                    let span = open_len + end + close.len_utf8();
                    current.push_str(&rest[..span]);
                    cursor += span;
                    continue;
                }
                unterminated_bracket |= ch == '[';
            }
        }
        if is_separator(ch) {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
        } else {
            current.push(ch);
        }
        cursor += ch.len_utf8();
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    Scan { tokens, unterminated_bracket }
}
