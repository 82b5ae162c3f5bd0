// Response envelope shared by both services.
//
// Every response body is `{ code, data, message }`; list endpoints put a
// `{ items, total }` page inside `data`.

use serde::{Deserialize, Serialize};

/// Envelope `code` the services use for success.
pub const SUCCESS_CODE: i32 = 0;

/// The `{ code, data, message }` wrapper present on every API response.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiResponse<T> {
    pub code: i32,
    pub data: T,
    #[serde(default)]
    pub message: String,
}

/// Envelope without a typed payload, used to read `code`/`message` from
/// error bodies whose `data` may be missing or of any shape.
#[derive(Debug, Deserialize)]
pub(crate) struct BareEnvelope {
    pub code: i32,
    #[serde(default)]
    pub message: Option<String>,
}

/// One page of a list endpoint.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct QueryResult<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    #[serde(default)]
    pub total: u64,
}

impl<T> Default for QueryResult<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            total: 0,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn null_data_deserializes_as_unit() {
        let env: ApiResponse<()> =
            serde_json::from_str(r#"{"code":0,"data":null,"message":"ok"}"#).unwrap();
        assert_eq!(env.code, SUCCESS_CODE);
    }

    #[test]
    fn query_result_tolerates_missing_items() {
        let page: QueryResult<String> = serde_json::from_str(r#"{"total":0}"#).unwrap();
        assert!(page.items.is_empty());
    }

    #[test]
    fn bare_envelope_reads_error_message() {
        let env: BareEnvelope =
            serde_json::from_str(r#"{"code":40001,"message":"bad captcha"}"#).unwrap();
        assert_eq!(env.code, 40001);
        assert_eq!(env.message.as_deref(), Some("bad captcha"));
    }
}
