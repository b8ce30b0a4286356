use crate::cli::Language;
use crate::error::ParserError;
use crate::scanner::element::{CodeElement, ElementKind, Visibility};
use crate::scanner::heuristic::{self, HeuristicRules};

use super::LanguageScanner;

const RULES: HeuristicRules = HeuristicRules {
    language: Language::Kotlin,
    keywords: &[
        ("enum class", ElementKind::Enum),
        ("fun interface", ElementKind::Interface),
        ("class", ElementKind::Class),
        ("interface", ElementKind::Interface),
        ("object", ElementKind::Class),
        ("fun", ElementKind::Function),
    ],
    modifiers: &[
        "public", "private", "protected", "internal", "open", "abstract", "sealed", "data",
        "final", "inner", "inline", "value", "annotation", "override", "suspend", "operator",
        "infix", "tailrec", "external", "expect", "actual",
    ],
    default_visibility: Visibility::Public,
    qualified_functions_are_methods: false,
    function_literals: false,
    hash_comments: false,
};

pub struct KotlinScanner;

impl LanguageScanner for KotlinScanner {
    fn language(&self) -> Language {
        Language::Kotlin
    }

    fn scan(&self, source: &str, file_path: &str) -> Result<Vec<CodeElement>, ParserError> {
        Ok(heuristic::extract(&RULES, source, file_path))
    }
}
