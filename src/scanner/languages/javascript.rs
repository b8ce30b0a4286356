use crate::cli::Language;
use crate::error::ParserError;
use crate::scanner::element::{CodeElement, ElementKind, Visibility};
use crate::scanner::heuristic::{self, HeuristicRules};

use super::LanguageScanner;

const JAVASCRIPT_RULES: HeuristicRules = HeuristicRules {
    language: Language::Javascript,
    keywords: &[
        ("class", ElementKind::Class),
        ("function", ElementKind::Function),
        ("function*", ElementKind::Function),
    ],
    modifiers: &["export", "default", "async"],
    default_visibility: Visibility::Unspecified,
    qualified_functions_are_methods: false,
    function_literals: true,
    hash_comments: false,
};

const TYPESCRIPT_RULES: HeuristicRules = HeuristicRules {
    language: Language::Typescript,
    keywords: &[
        ("const enum", ElementKind::Enum),
        ("class", ElementKind::Class),
        ("interface", ElementKind::Interface),
        ("enum", ElementKind::Enum),
        ("function", ElementKind::Function),
        ("function*", ElementKind::Function),
    ],
    modifiers: &[
        "export", "default", "async", "declare", "abstract", "public", "private", "protected",
        "static", "readonly",
    ],
    default_visibility: Visibility::Unspecified,
    qualified_functions_are_methods: false,
    function_literals: true,
    hash_comments: false,
};

pub struct JavaScriptScanner;

impl LanguageScanner for JavaScriptScanner {
    fn language(&self) -> Language {
        Language::Javascript
    }

    fn scan(&self, source: &str, file_path: &str) -> Result<Vec<CodeElement>, ParserError> {
        Ok(heuristic::extract(&JAVASCRIPT_RULES, source, file_path))
    }
}

pub struct TypeScriptScanner;

impl LanguageScanner for TypeScriptScanner {
    fn language(&self) -> Language {
        Language::Typescript
    }

    fn scan(&self, source: &str, file_path: &str) -> Result<Vec<CodeElement>, ParserError> {
        Ok(heuristic::extract(&TYPESCRIPT_RULES, source, file_path))
    }
}
