use thiserror::Error;

#[derive(Error, Debug)]
pub enum MongoFsError {
    #[error("Grammar error: {0}")]
    Grammar(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("MongoDB error: {0}")]
    Mongo(#[from] mongodb::error::Error),

    #[error("BSON encoding error: {0}")]
    BsonEncode(#[from] bson::ser::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Fixture error: {0}")]
    Fixture(String),
}

pub type Result<T> = std::result::Result<T, MongoFsError>;
