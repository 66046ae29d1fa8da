use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelishError {
    #[error("not initialized: run 'relish init'")]
    NotInitialized,

    /// Evaluation was requested for a manual the store does not hold.
    #[error("invalid input: manual not found: {0}")]
    MissingManual(String),

    #[error("manual already exists: {0}")]
    ManualExists(String),

    #[error("content item not found: {0}")]
    ItemNotFound(String),

    #[error("onboarding progress not found for manual: {0}")]
    ProgressNotFound(String),

    #[error("onboarding progress already started for manual: {0}")]
    ProgressExists(String),

    #[error("stale progress for '{id}': snapshot version {expected}, stored version {found}")]
    StaleProgress { id: String, expected: u64, found: u64 },

    #[error("no requirement entry for layer '{layer}' of {manual_type} manuals")]
    UnknownLayer { manual_type: String, layer: String },

    #[error("invalid requirement '{id}': {reason}")]
    InvalidRequirement { id: String, reason: String },

    #[error("invalid layer: {0}")]
    InvalidLayer(String),

    #[error("invalid phase: {0}")]
    InvalidPhase(String),

    #[error("invalid manual type: {0}")]
    InvalidManualType(String),

    #[error("invalid content kind: {0}")]
    InvalidContentKind(String),

    #[error("invalid respondent: {0}")]
    InvalidRespondent(String),

    #[error("invalid focus domain: {0}")]
    InvalidDomain(String),

    #[error("{manual_type} manuals do not carry '{kind}' content")]
    KindNotCarried { manual_type: String, kind: String },

    #[error("invalid phase layout: {0}")]
    InvalidPhaseLayout(String),

    #[error("milestone not found: {0}")]
    MilestoneNotFound(String),

    #[error("launch not ready: {completed} of {required} phases complete")]
    LaunchNotReady { completed: usize, required: usize },

    #[error("graduation not ready: {completed} of {required} layers complete")]
    GraduationNotReady { completed: usize, required: usize },

    #[error("invalid onboarding config: {0}")]
    InvalidOnboarding(String),

    #[error("invalid id '{0}': must be lowercase alphanumeric with hyphens")]
    InvalidId(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, RelishError>;
