use jpics_application::ApiError;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
struct Envelope {
    stat: String,
    #[serde(default)]
    result: Value,
    #[serde(default)]
    err: Value,
    #[serde(default)]
    message: String,
}

/// Unwraps a `{"stat": "ok", "result": ...}` response. Any other `stat`
/// becomes a server error carrying the reported code and message.
pub fn parse_envelope<T: DeserializeOwned>(body: &str) -> Result<T, ApiError> {
    let envelope: Envelope =
        serde_json::from_str(body).map_err(|error| ApiError::Parse(error.to_string()))?;

    if envelope.stat != "ok" {
        return Err(ApiError::Server {
            code: error_code(&envelope.err),
            message: envelope.message,
        });
    }

    serde_json::from_value(envelope.result).map_err(|error| ApiError::Parse(error.to_string()))
}

fn error_code(err: &Value) -> i64 {
    match err {
        Value::Number(number) => number.as_i64().unwrap_or_default(),
        Value::String(text) => text.parse().unwrap_or_default(),
        _ => 0,
    }
}
