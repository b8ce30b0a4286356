use crate::cli::Language;
use crate::error::ParserError;
use crate::scanner::element::{CodeElement, ElementKind, Visibility};
use crate::scanner::heuristic::{self, HeuristicRules};

use super::LanguageScanner;

const RULES: HeuristicRules = HeuristicRules {
    language: Language::Php,
    keywords: &[
        ("class", ElementKind::Class),
        ("interface", ElementKind::Interface),
        ("trait", ElementKind::Trait),
        ("enum", ElementKind::Enum),
        ("function", ElementKind::Function),
    ],
    modifiers: &[
        "public", "private", "protected", "static", "abstract", "final", "readonly",
    ],
    default_visibility: Visibility::Unspecified,
    qualified_functions_are_methods: true,
    function_literals: false,
    hash_comments: true,
};

pub struct PhpScanner;

impl LanguageScanner for PhpScanner {
    fn language(&self) -> Language {
        Language::Php
    }

    fn scan(&self, source: &str, file_path: &str) -> Result<Vec<CodeElement>, ParserError> {
        Ok(heuristic::extract(&RULES, source, file_path))
    }
}
