//! Line-oriented declaration extractor shared by the languages without a
//! grammar-aware scanner.
//!
//! A line yields an element only when every token before the declaration
//! keyword is a known modifier and the token after it is a plain
//! identifier. Anything less certain is dropped: a missed element is
//! preferable to a wrong one.

use crate::cli::Language;

use super::element::{CodeElement, ElementKind, Visibility};

/// Per-language vocabulary for [`extract`].
pub struct HeuristicRules {
    pub language: Language,
    /// Checked in order, so multi-word keywords must come before their
    /// single-word suffixes (`enum class` before `class`).
    pub keywords: &'static [(&'static str, ElementKind)],
    pub modifiers: &'static [&'static str],
    pub default_visibility: Visibility,
    /// A visibility-qualified function keyword declares a method.
    pub qualified_functions_are_methods: bool,
    /// Recognize `name = function (...)` and `name = (...) =>` forms.
    pub function_literals: bool,
    pub hash_comments: bool,
}

#[derive(Debug, Default)]
struct Modifiers {
    visibility: Option<Visibility>,
    is_static: bool,
    is_abstract: bool,
}

impl Modifiers {
    fn apply(&mut self, token: &str) {
        if let Some(visibility) = Visibility::from_keyword(token) {
            self.visibility = Some(visibility);
        }
        match token {
            "static" => self.is_static = true,
            "abstract" => self.is_abstract = true,
            _ => {}
        }
    }
}

pub fn extract(rules: &HeuristicRules, source: &str, file_path: &str) -> Vec<CodeElement> {
    let mut elements = Vec::new();
    let mut in_block_comment = false;

    for (index, raw) in source.lines().enumerate() {
        let line = raw.trim();
        if in_block_comment {
            if line.contains("*/") {
                in_block_comment = false;
            }
            continue;
        }
        if line.starts_with("/*") {
            in_block_comment = !line.contains("*/");
            continue;
        }
        if line.is_empty()
            || line.starts_with("//")
            || line.starts_with('*')
            || (rules.hash_comments && line.starts_with('#'))
        {
            continue;
        }

        let tokens: Vec<&str> = line.split_whitespace().collect();
        let element = keyword_declaration(rules, &tokens, file_path, index + 1).or_else(|| {
            if rules.function_literals {
                function_literal(rules, &tokens, line, file_path, index + 1)
            } else {
                None
            }
        });
        elements.extend(element);
    }

    elements
}

fn keyword_declaration(
    rules: &HeuristicRules,
    tokens: &[&str],
    file_path: &str,
    line: usize,
) -> Option<CodeElement> {
    let mut modifiers = Modifiers::default();
    let mut position = 0;

    while position < tokens.len() {
        if let Some((words, kind)) = match_keyword(rules, &tokens[position..]) {
            let name = declared_name(tokens.get(position + words)?)?;
            let kind = if kind == ElementKind::Function
                && rules.qualified_functions_are_methods
                && modifiers.visibility.is_some()
            {
                ElementKind::Method
            } else {
                kind
            };

            let mut element = CodeElement::new(name, kind, rules.language, file_path, line)?
                .with_visibility(modifiers.visibility.unwrap_or(rules.default_visibility));
            element.is_static = modifiers.is_static;
            element.is_abstract = modifiers.is_abstract;
            if kind.is_type() {
                inheritance(&tokens[position + words + 1..], &mut element);
            }
            return Some(element);
        }

        let token = tokens[position];
        if !rules.modifiers.contains(&token) {
            return None;
        }
        modifiers.apply(token);
        position += 1;
    }

    None
}

fn match_keyword(rules: &HeuristicRules, tokens: &[&str]) -> Option<(usize, ElementKind)> {
    rules.keywords.iter().find_map(|(keyword, kind)| {
        let words: Vec<&str> = keyword.split(' ').collect();
        let matched = words.len() <= tokens.len()
            && words.iter().zip(tokens).all(|(word, token)| word == token);
        matched.then_some((words.len(), *kind))
    })
}

/// `const name = function (...)`, `name = async (...) =>`, `name = x =>`.
fn function_literal(
    rules: &HeuristicRules,
    tokens: &[&str],
    line: &str,
    file_path: &str,
    line_number: usize,
) -> Option<CodeElement> {
    const BINDINGS: &[&str] = &["const", "let", "var"];

    let mut modifiers = Modifiers::default();
    let mut position = 0;
    while position < tokens.len()
        && (BINDINGS.contains(&tokens[position]) || rules.modifiers.contains(&tokens[position]))
    {
        modifiers.apply(tokens[position]);
        position += 1;
    }

    let name_token = *tokens.get(position)?;
    let mut equals = position + 1;
    // A type annotation may sit between the name and `=`.
    if name_token.ends_with(':') && tokens.get(equals) != Some(&"=") {
        equals += 1;
    }
    if tokens.get(equals) != Some(&"=") {
        return None;
    }

    let rhs = *tokens.get(equals + 1)?;
    let is_function = rhs == "function" || rhs.starts_with("function(") || rhs.starts_with("function*");
    let is_arrow = line.contains("=>")
        && (rhs.starts_with('(')
            || rhs == "async"
            || (is_identifier(rhs) && tokens.get(equals + 2) == Some(&"=>")));
    if !is_function && !is_arrow {
        return None;
    }

    let name = declared_name(name_token)?;
    let mut element = CodeElement::new(
        name,
        ElementKind::Function,
        rules.language,
        file_path,
        line_number,
    )?
    .with_visibility(modifiers.visibility.unwrap_or(rules.default_visibility));
    element.is_static = modifiers.is_static;
    Some(element)
}

/// `extends Base implements A, B` after a type name.
fn inheritance(tokens: &[&str], element: &mut CodeElement) {
    let mut implementing = false;
    let mut iter = tokens.iter();
    while let Some(token) = iter.next() {
        match *token {
            "extends" if !implementing => {
                if let Some(parent) = iter.next().and_then(|t| declared_name(t)) {
                    element.parent = Some(parent.to_string());
                }
            }
            "implements" => implementing = true,
            t if t.starts_with('{') => break,
            t if implementing => {
                for part in t.split(',') {
                    if let Some(name) = declared_name(part) {
                        element.interfaces.push(name.to_string());
                    }
                }
                if t.ends_with('{') {
                    break;
                }
            }
            _ => {}
        }
    }
}

/// The identifier at the start of `token`, cut at the first delimiter.
/// Returns `None` unless the remainder is a plain identifier.
fn declared_name(token: &str) -> Option<&str> {
    let end = token
        .find(|c: char| matches!(c, '{' | '(' | ':' | '<' | ';' | ',' | '='))
        .unwrap_or(token.len());
    let candidate = &token[..end];
    is_identifier(candidate).then_some(candidate)
}

fn is_identifier(candidate: &str) -> bool {
    let mut chars = candidate.chars();
    match chars.next() {
        Some(first) if first.is_alphabetic() || first == '_' || first == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}
