use serde::{Deserialize, Serialize};

use crate::cli::Language;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ElementKind {
    Class,
    Interface,
    Enum,
    Trait,
    Method,
    Function,
    Field,
}

impl ElementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ElementKind::Class => "CLASS",
            ElementKind::Interface => "INTERFACE",
            ElementKind::Enum => "ENUM",
            ElementKind::Trait => "TRAIT",
            ElementKind::Method => "METHOD",
            ElementKind::Function => "FUNCTION",
            ElementKind::Field => "FIELD",
        }
    }

    pub fn is_type(&self) -> bool {
        matches!(
            self,
            ElementKind::Class | ElementKind::Interface | ElementKind::Enum | ElementKind::Trait
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Protected,
    Private,
    /// Java's default access.
    Package,
    /// Kotlin module visibility.
    Internal,
    #[default]
    Unspecified,
}

impl Visibility {
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "public" => Some(Visibility::Public),
            "protected" => Some(Visibility::Protected),
            "private" => Some(Visibility::Private),
            "internal" => Some(Visibility::Internal),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Protected => "protected",
            Visibility::Private => "private",
            Visibility::Package => "package",
            Visibility::Internal => "internal",
            Visibility::Unspecified => "unspecified",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
}

/// One declared program construct.
///
/// Scanners create elements through [`CodeElement::new`], which refuses
/// blank names. The fields stay public for callers that relabel or filter
/// results, so a struct literal is not checked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeElement {
    pub name: String,
    pub kind: ElementKind,
    pub language: Language,
    pub file_path: String,
    pub visibility: Visibility,
    pub is_static: bool,
    pub is_abstract: bool,
    /// Superclass for types, enclosing type name is in `owner`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub interfaces: Vec<String>,
    /// Method return type, or the declared type of a field.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_type: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    /// 1-based line of the declaration.
    pub line: usize,
}

impl CodeElement {
    pub fn new(
        name: &str,
        kind: ElementKind,
        language: Language,
        file_path: &str,
        line: usize,
    ) -> Option<Self> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        Some(Self {
            name: name.to_string(),
            kind,
            language,
            file_path: file_path.to_string(),
            visibility: Visibility::Unspecified,
            is_static: false,
            is_abstract: false,
            parent: None,
            interfaces: Vec::new(),
            return_type: None,
            parameters: Vec::new(),
            annotations: Vec::new(),
            owner: None,
            line,
        })
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn with_owner(mut self, owner: Option<&str>) -> Self {
        self.owner = owner.map(str::to_string);
        self
    }
}
