// Thin wrappers over Kronos REST resources

mod cost_centers;
mod employees;

pub use cost_centers::CostCenters;
pub use employees::Employees;

use serde_json::Value;
use std::collections::BTreeMap;

use crate::error::{KronosError, Result};
use crate::http_client::HttpResponse;

/// Query parameters, kept sorted so URLs are stable
pub type Query = BTreeMap<String, String>;

/// Decode a resource response, turning non-2xx into [`KronosError::Api`]
fn into_json(response: HttpResponse) -> Result<Value> {
    if !response.is_success() {
        let status = response.status.as_u16();
        let message = response.text();
        tracing::error!(status, response_body = %message, "Kronos API request failed");
        return Err(KronosError::Api { status, message });
    }
    if response.body.is_empty() {
        return Ok(Value::Null);
    }
    response.json()
}

fn with_query(path: &str, query: &Query) -> Result<String> {
    if query.is_empty() {
        return Ok(path.to_string());
    }
    let encoded = serde_urlencoded::to_string(query)
        .map_err(|e| KronosError::Serialization(format!("unable to encode query: {}", e)))?;
    Ok(format!("{}?{}", path, encoded))
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_with_query() {
        let mut query = Query::new();
        assert_eq!(with_query("/x", &query).unwrap(), "/x");

        query.insert("tree_index".to_string(), "1".to_string());
        query.insert("company:id".to_string(), "42".to_string());
        assert_eq!(
            with_query("/x", &query).unwrap(),
            "/x?company%3Aid=42&tree_index=1"
        );
    }

    #[test]
    fn test_into_json() {
        let ok = HttpResponse::new(StatusCode::OK, r#"{"a":1}"#);
        assert_eq!(into_json(ok).unwrap()["a"], 1);

        let empty = HttpResponse::new(StatusCode::NO_CONTENT, "");
        assert_eq!(into_json(empty).unwrap(), Value::Null);

        let failed = HttpResponse::new(StatusCode::NOT_FOUND, "no such employee");
        match into_json(failed) {
            Err(KronosError::Api { status, message }) => {
                assert_eq!(status, 404);
                assert_eq!(message, "no such employee");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
