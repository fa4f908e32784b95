//! Selector cascade used by the HTML-backed tree. Resolves declared values only; there is
//! no inheritance, no `var()` and no media query evaluation.

use std::collections::BTreeMap;

use cssparser::{Parser as CssParser, ParserInput};
use scraper::{ElementRef, Selector};
use selectors::parser::{ParseRelative, SelectorList};
use tracing::debug;

/// Winning declared value per property name.
pub type Declarations = BTreeMap<String, String>;

struct Rule {
    selector: Selector,
    declarations: Vec<(String, String)>,
    specificity: u32,
    order: usize,
}

pub struct StyleSheet {
    /// Ascending cascade priority, so later rules override earlier ones.
    rules: Vec<Rule>,
}

impl StyleSheet {
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn from_sources<S: AsRef<str>>(sources: &[S]) -> Self {
        let mut rules = Vec::new();
        for css in sources {
            let css = strip_comments(css.as_ref());
            for (selectors, body) in split_rules(&css) {
                let declarations = parse_declarations(body);
                if declarations.is_empty() {
                    continue;
                }
                for alternative in split_selector_list(selectors) {
                    let Ok(selector) = Selector::parse(alternative) else {
                        debug!(selector = %alternative, "skipped unsupported selector");
                        continue;
                    };
                    rules.push(Rule {
                        specificity: specificity(alternative),
                        selector,
                        declarations: declarations.clone(),
                        order: rules.len(),
                    });
                }
            }
        }
        rules.sort_by_key(|rule| (rule.specificity, rule.order));
        Self { rules }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Winning declared value per property for `el`, inline declarations applied last.
    pub fn compute_for(&self, el: &ElementRef, inline: Option<&str>) -> Declarations {
        let mut winners = Declarations::new();
        for rule in self.rules.iter().filter(|rule| rule.selector.matches(el)) {
            for (name, value) in &rule.declarations {
                winners.insert(name.clone(), value.clone());
            }
        }
        if let Some(inline) = inline {
            winners.extend(parse_declarations(inline));
        }
        winners
    }
}

/// Packed `(ids, classes, types)` as computed by the `selectors` crate, so `:not()`,
/// `:is()` and `:where()` count their arguments. Unparseable selectors score zero.
fn specificity(selector: &str) -> u32 {
    let mut input = ParserInput::new(selector);
    let mut parser = CssParser::new(&mut input);
    SelectorList::parse(&scraper::selector::Parser, &mut parser, ParseRelative::No)
        .map(|list| list.0.iter().map(|s| s.specificity()).max().unwrap_or(0))
        .unwrap_or(0)
}

/// `(selectors, body)` pairs of the style rules in comment-free `css`. Block at-rules are
/// skipped whole; statement at-rules end at their `;`.
fn split_rules(css: &str) -> Vec<(&str, &str)> {
    let mut out = Vec::new();
    let mut rest = css;
    while let Some(open) = rest.find('{') {
        let prelude = rest[..open].rsplit(';').next().unwrap_or_default().trim();
        let Some(len) = block_len(&rest[open..]) else {
            break;
        };
        let body = &rest[open + 1..open + len - 1];
        rest = &rest[open + len..];
        if !prelude.starts_with('@') {
            out.push((prelude, body));
        }
    }
    out
}

fn strip_comments(css: &str) -> String {
    let mut out = String::with_capacity(css.len());
    let mut rest = css;
    while let Some(start) = rest.find("/*") {
        out.push_str(&rest[..start]);
        match rest[start + 2..].find("*/") {
            Some(end) => rest = &rest[start + 2 + end + 2..],
            None => return out,
        }
    }
    out.push_str(rest);
    out
}

/// Byte length of the balanced block starting at `block[0] == '{'`.
fn block_len(block: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (i, ch) in block.char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }
    None
}

fn parse_declarations(source: &str) -> Vec<(String, String)> {
    split_top_level(source, ';')
        .into_iter()
        .filter_map(|decl| {
            let (name, value) = decl.split_once(':')?;
            let name = name.trim().to_ascii_lowercase();
            let value = value.trim();
            let value = value
                .strip_suffix("!important")
                .map_or(value, str::trim_end);
            (!name.is_empty() && !value.is_empty()).then(|| (name, value.to_string()))
        })
        .collect()
}

fn split_selector_list(selectors: &str) -> Vec<&str> {
    split_top_level(selectors, ',')
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Splits on `separator` outside parentheses and quotes.
pub(crate) fn split_top_level(source: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    let mut start = 0usize;
    for (i, ch) in source.char_indices() {
        match quote {
            Some(q) if ch == q => quote = None,
            Some(_) => {}
            None => match ch {
                '"' | '\'' => quote = Some(ch),
                '(' => depth += 1,
                ')' => depth -= 1,
                c if c == separator && depth == 0 => {
                    parts.push(&source[start..i]);
                    start = i + ch.len_utf8();
                }
                _ => {}
            },
        }
    }
    parts.push(&source[start..]);
    parts
}
