use thiserror::Error;

#[derive(Error, Debug)]
pub enum StealthError {
    #[error("Invalid tempo: {0} bpm (must be positive and finite)")]
    InvalidBpm(f64),

    #[error("Invalid judgment window: {0}")]
    InvalidJudgmentWindow(String),

    #[error("Guard '{guard}' has an empty patrol route")]
    EmptyPatrolRoute { guard: String },

    #[error("Invalid guard config '{guard}': {reason}")]
    InvalidGuard { guard: String, reason: String },

    #[error("Malformed ability pattern '{ability}': {reason}")]
    MalformedAbility { ability: String, reason: String },

    #[error("Invalid [{section}] config: {reason}")]
    InvalidSection {
        section: &'static str,
        reason: String,
    },

    #[error("{owner} is missing required collaborator: {collaborator}")]
    MissingCollaborator {
        owner: String,
        collaborator: &'static str,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl StealthError {
    /// Configuration errors reject the offending entity at load time
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            StealthError::InvalidBpm(_)
                | StealthError::InvalidJudgmentWindow(_)
                | StealthError::EmptyPatrolRoute { .. }
                | StealthError::InvalidGuard { .. }
                | StealthError::MalformedAbility { .. }
                | StealthError::InvalidSection { .. }
                | StealthError::Toml(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, StealthError>;
