//! Line-delimited JSON dispatcher
//!
//! Each input line is one initiation message; each output line is the
//! matching response. Problems travel inside `result`. Only malformed input
//! and unsupported operations produce an `error`.

use crate::backend::Connector;
use crate::prelude::{eprintln, *};
use ncip_core::assemble::AssemblyConfig;
use ncip_core::ncip::{LookupRequestInitiationData, LookupUserInitiationData};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

pub const PARSE_ERROR: i32 = -32700;
pub const UNKNOWN_SERVICE: i32 = -32601;
pub const INVALID_DATA: i32 = -32602;
pub const UNSUPPORTED_OPERATION: i32 = -32001;

#[derive(Debug, Deserialize)]
struct DispatchRequest {
    id: Option<serde_json::Value>,
    service: String,
    #[serde(default)]
    data: serde_json::Value,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct DispatchResponse {
    pub id: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<DispatchError>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct DispatchError {
    pub code: i32,
    pub message: String,
}

impl DispatchError {
    fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

fn parse_data<T: serde::de::DeserializeOwned>(
    data: serde_json::Value,
) -> std::result::Result<T, DispatchError> {
    serde_json::from_value(data)
        .map_err(|e| DispatchError::new(INVALID_DATA, f!("Invalid initiation data: {e}")))
}

fn to_result<T: Serialize>(response: &T) -> std::result::Result<serde_json::Value, DispatchError> {
    serde_json::to_value(response)
        .map_err(|e| DispatchError::new(INVALID_DATA, f!("Failed to encode response: {e}")))
}

async fn dispatch(
    service: &str,
    data: serde_json::Value,
    connector: &Connector,
    config: &AssemblyConfig,
) -> std::result::Result<serde_json::Value, DispatchError> {
    match service {
        "LookupUser" => {
            let init: LookupUserInitiationData = parse_data(data)?;
            let response = connector
                .lookup_user(&init, config)
                .await
                .map_err(|e| DispatchError::new(UNSUPPORTED_OPERATION, e.to_string()))?;
            to_result(&response)
        }
        "LookupRequest" => {
            let init: LookupRequestInitiationData = parse_data(data)?;
            let response = connector
                .lookup_request(&init, config)
                .await
                .map_err(|e| DispatchError::new(UNSUPPORTED_OPERATION, e.to_string()))?;
            to_result(&response)
        }
        other => Err(DispatchError::new(
            UNKNOWN_SERVICE,
            f!("Unknown service: {other}"),
        )),
    }
}

pub async fn handle_request(
    request_str: &str,
    connector: &Connector,
    config: &AssemblyConfig,
) -> DispatchResponse {
    let request: DispatchRequest = match serde_json::from_str(request_str) {
        Ok(req) => req,
        Err(e) => {
            return DispatchResponse {
                id: None,
                result: None,
                error: Some(DispatchError::new(PARSE_ERROR, f!("Parse error: {e}"))),
            };
        }
    };

    match dispatch(&request.service, request.data, connector, config).await {
        Ok(value) => DispatchResponse {
            id: request.id,
            result: Some(value),
            error: None,
        },
        Err(error) => {
            log::warn!("{} failed: {}", request.service, error.message);
            DispatchResponse {
                id: request.id,
                result: None,
                error: Some(error),
            }
        }
    }
}

pub async fn run(global: crate::Global) -> Result<()> {
    let config = global.load_config()?;
    let connector = Connector::from_config(&config)?;
    let assembly = config.assembly_config();

    if global.verbose {
        eprintln!(
            "Starting NCIP dispatcher on stdio with the {} connector...",
            connector.name()
        );
        eprintln!();
    }

    let stdin = tokio::io::stdin();
    let mut stdout = tokio::io::stdout();
    let mut reader = BufReader::new(stdin);
    let mut line = String::new();

    loop {
        line.clear();
        let bytes_read = reader.read_line(&mut line).await?;

        if bytes_read == 0 {
            break; // EOF
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if global.verbose {
            eprintln!("Received: {trimmed}");
        }

        let response = handle_request(trimmed, &connector, &assembly).await;
        let response_json = serde_json::to_string(&response)?;

        if global.verbose {
            eprintln!("Sending: {response_json}");
        }

        stdout.write_all(response_json.as_bytes()).await?;
        stdout.write_all(b"\n").await?;
        stdout.flush().await?;
    }

    Ok(())
}
