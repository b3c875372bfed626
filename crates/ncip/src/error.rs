#[derive(thiserror::Error, Debug, serde::Deserialize, serde::Serialize)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown backend: {0} (expected aleph or koha)")]
    UnknownBackend(String),

    #[error("Missing {backend} settings: {variable} is not set")]
    MissingBackendSettings { backend: String, variable: String },

    #[error("Invalid currency minor unit {minor_unit} for {code} (at most {max})")]
    InvalidMinorUnit { code: String, minor_unit: u32, max: u32 },
}

/// Failure that escapes a service operation
///
/// Everything else a backend can do wrong is reported as a problem on the
/// response.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub enum ServiceError {
    #[error("{service} is not supported by the {backend} connector")]
    UnsupportedOperation { service: String, backend: String },
}
