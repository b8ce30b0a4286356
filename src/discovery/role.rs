use serde::{Deserialize, Serialize};

/// Coarse architectural role guessed from a file's relative path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileRole {
    Controller,
    Service,
    Repository,
    Model,
    Config,
    Other,
}

/// Checked in order; the first role with a matching marker wins.
const ROLE_MARKERS: &[(FileRole, &[&str])] = &[
    (FileRole::Controller, &["controller"]),
    (FileRole::Service, &["service"]),
    (FileRole::Repository, &["repository", "dao"]),
    (FileRole::Model, &["model", "entity"]),
    (FileRole::Config, &["config"]),
];

impl FileRole {
    pub fn classify(relative_path: &str) -> Self {
        let lower = relative_path.to_lowercase();
        ROLE_MARKERS
            .iter()
            .find(|(_, markers)| markers.iter().any(|marker| lower.contains(marker)))
            .map(|(role, _)| *role)
            .unwrap_or(FileRole::Other)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FileRole::Controller => "CONTROLLER",
            FileRole::Service => "SERVICE",
            FileRole::Repository => "REPOSITORY",
            FileRole::Model => "MODEL",
            FileRole::Config => "CONFIG",
            FileRole::Other => "OTHER",
        }
    }
}
