use thiserror::Error;

#[derive(Debug, Error)]
pub enum ActivityError {
    #[error("validation: {0}")]
    Validation(String),

    #[error("not found: {entity} {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("audit store must be created out of band: {reason}")]
    SetupRequired { reason: String, script: String },

    #[error("no authenticated actor")]
    MissingActor,

    #[error("config: {0}")]
    Config(String),

    #[error("database: {0}")]
    Database(#[from] sqlx::Error),

    #[error("serialization: {0}")]
    Serialization(#[from] serde_json::Error),
}
