use thiserror::Error;

#[derive(Debug, Error)]
pub enum VigiaguaError {
    #[error("Failed to load {origin}: {reason}")]
    Load { origin: String, reason: String },

    #[error("Missing column '{column}' in {origin}")]
    MissingColumn { origin: String, column: String },

    #[error("Invalid record at line {line}: {reason}")]
    InvalidRecord { line: u64, reason: String },

    #[error("Invalid input: {field} — {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Geometry error: {0}")]
    Geometry(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for VigiaguaError {
    fn from(e: serde_json::Error) -> Self {
        VigiaguaError::SerializationError(e.to_string())
    }
}

impl From<geojson::Error> for VigiaguaError {
    fn from(e: geojson::Error) -> Self {
        VigiaguaError::Geometry(e.to_string())
    }
}

impl From<zip::result::ZipError> for VigiaguaError {
    fn from(e: zip::result::ZipError) -> Self {
        VigiaguaError::Load {
            origin: "zip archive".to_string(),
            reason: e.to_string(),
        }
    }
}
