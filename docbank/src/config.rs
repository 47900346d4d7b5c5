use std::{env, fmt, str::FromStr, time::Duration};

use docbank_core::{
    collection::Namespace,
    error::{DocumentStoreError, DocumentStoreResult},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    MongoDb,
    Memory,
}

impl FromStr for BackendKind {
    type Err = DocumentStoreError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "mongodb" | "mongo" => Ok(BackendKind::MongoDb),
            "memory" => Ok(BackendKind::Memory),
            other => Err(DocumentStoreError::Configuration(format!(
                "unknown backend {other:?}, expected \"mongodb\" or \"memory\""
            ))),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::MongoDb => write!(f, "mongodb"),
            BackendKind::Memory => write!(f, "memory"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub backend: BackendKind,
    pub uri: String,
    pub database: String,
    pub collection: String,
    pub app_name: String,
    /// How long the MongoDB driver waits for a usable server before failing an operation.
    pub server_selection_timeout: Option<Duration>,
}

impl AppConfig {
    /// Loads `.env` if present, then reads `DOCBANK_*` variables from the environment.
    pub fn from_env() -> DocumentStoreResult<Self> {
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> DocumentStoreResult<Self> {
        let non_empty = |key: &str, default: &str| -> DocumentStoreResult<String> {
            match lookup(key) {
                None => Ok(default.to_string()),
                Some(value) if value.trim().is_empty() => Err(DocumentStoreError::Configuration(format!(
                    "{key} is set but empty"
                ))),
                Some(value) => Ok(value.trim().to_string()),
            }
        };

        Ok(AppConfig {
            backend: lookup("DOCBANK_BACKEND")
                .map(|value| value.parse::<BackendKind>())
                .transpose()?
                .unwrap_or(BackendKind::MongoDb),
            uri: non_empty("DOCBANK_URI", "mongodb://localhost:27017")?,
            database: non_empty("DOCBANK_DATABASE", "bank")?,
            collection: non_empty("DOCBANK_COLLECTION", "accounts")?,
            app_name: non_empty("DOCBANK_APP_NAME", "docbank")?,
            server_selection_timeout: lookup("DOCBANK_SERVER_SELECTION_TIMEOUT_MS")
                .map(|value| {
                    value
                        .trim()
                        .parse::<u64>()
                        .map(Duration::from_millis)
                        .map_err(|e| {
                            DocumentStoreError::Configuration(format!(
                                "DOCBANK_SERVER_SELECTION_TIMEOUT_MS must be a number of milliseconds: {e}"
                            ))
                        })
                })
                .transpose()?,
        })
    }

    pub fn namespace(&self) -> Namespace {
        Namespace::new(self.database.as_str(), self.collection.as_str())
    }
}
