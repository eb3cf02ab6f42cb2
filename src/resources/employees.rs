use chrono::NaiveDate;
use serde_json::Value;

use super::{into_json, with_query, Query};
use crate::client::KronosClient;
use crate::error::{KronosError, Result};

const EMPLOYEES_PATH: &str = "/ta/rest/v2/companies/{cid}/employees";
const TODO_PATH: &str = "/ta/rest/v1/employee/todo";

/// The changed-employees feed only looks back this far
pub const MAX_CHANGED_LOOKBACK_DAYS: i64 = 31;

/// Company employees
pub struct Employees<'a> {
    client: &'a KronosClient,
}

impl<'a> Employees<'a> {
    pub fn new(client: &'a KronosClient) -> Self {
        Self { client }
    }

    pub async fn get_all(&self) -> Result<Value> {
        into_json(self.client.get(EMPLOYEES_PATH).await?)
    }

    /// Look up by account id, or by external id using the `|external_id` form
    pub async fn get_by_id(&self, employee_id: &str) -> Result<Value> {
        if employee_id.is_empty() {
            return Err(KronosError::Validation(
                "employee must be referenced by account id or |external_id".to_string(),
            ));
        }
        let path = format!("{}/{}", EMPLOYEES_PATH, employee_id);
        into_json(self.client.get(&path).await?)
    }

    pub async fn create(&self, data: Value) -> Result<Value> {
        if !data.as_object().is_some_and(|fields| !fields.is_empty()) {
            return Err(KronosError::Validation(
                "employee data is required".to_string(),
            ));
        }
        into_json(self.client.raw_post(EMPLOYEES_PATH, data).await?)
    }

    /// The authenticated user's own employee record
    pub async fn me(&self) -> Result<Value> {
        let path = format!("{}/me", EMPLOYEES_PATH);
        into_json(self.client.get(&path).await?)
    }

    /// Employees changed since `since`, which must lie within 31 days of today
    pub async fn changed(&self, since: NaiveDate) -> Result<Value> {
        let today = self.client.now().date();
        if (today - since).num_days().abs() > MAX_CHANGED_LOOKBACK_DAYS {
            return Err(KronosError::Validation(format!(
                "date cannot be more than {} days away from today",
                MAX_CHANGED_LOOKBACK_DAYS
            )));
        }

        let mut query = Query::new();
        query.insert("since".to_string(), since.format("%Y-%m-%d").to_string());
        let path = with_query(&format!("{}/changed", EMPLOYEES_PATH), &query)?;
        into_json(self.client.get(&path).await?)
    }

    /// To-do items (v1 API). Scoped to the configured company and, unless
    /// `all` is set, to the configured user.
    pub async fn todo(&self, mut query: Query, all: bool) -> Result<Value> {
        let provider = self.client.provider()?;
        query
            .entry("company:id".to_string())
            .or_insert_with(|| provider.company_id().to_string());
        if !all {
            query
                .entry("employee:username".to_string())
                .or_insert_with(|| provider.username().to_string());
        }

        let path = with_query(TODO_PATH, &query)?;
        into_json(self.client.get(&path).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::testing::ScriptedTransport;
    use crate::auth::{test_provider, FixedClock, MemoryTokenStore, Token, TokenStore};
    use chrono::NaiveDateTime;
    use reqwest::StatusCode;
    use serde_json::json;
    use std::sync::Arc;

    fn client(responses: Vec<(StatusCode, Value)>) -> (KronosClient, Arc<ScriptedTransport>) {
        let store = MemoryTokenStore::new();
        store
            .save(
                "jdoe",
                &Token::from_payload(&json!({
                    "token": "good",
                    "issued_at": "2024-03-01 09:30:00"
                }))
                .unwrap(),
            )
            .unwrap();
        let transport = Arc::new(ScriptedTransport::new(responses));
        let clock = Arc::new(FixedClock::new(
            NaiveDateTime::parse_from_str("2024-03-01 10:00:00", "%Y-%m-%d %H:%M:%S").unwrap(),
        ));
        let client = KronosClient::new(Arc::new(store), transport.clone(), clock)
            .with_provider(test_provider("https://secure.saashr.com"))
            .with_subject("jdoe");
        (client, transport)
    }

    #[tokio::test]
    async fn test_me_and_by_id() {
        let (client, transport) = client(vec![
            (StatusCode::OK, json!({ "id": 1 })),
            (StatusCode::OK, json!({ "id": 2 })),
        ]);
        let employees = Employees::new(&client);

        assert_eq!(employees.me().await.unwrap()["id"], 1);
        assert_eq!(employees.get_by_id("|EXT-2").await.unwrap()["id"], 2);
        assert_eq!(
            transport.urls(),
            vec![
                "https://secure.saashr.com/ta/rest/v2/companies/33560858/employees/me",
                "https://secure.saashr.com/ta/rest/v2/companies/33560858/employees/|EXT-2",
            ]
        );
    }

    #[tokio::test]
    async fn test_invalid_input_sends_nothing() {
        let (client, transport) = client(vec![]);
        let employees = Employees::new(&client);

        assert!(matches!(
            employees.get_by_id("").await,
            Err(KronosError::Validation(_))
        ));
        assert!(matches!(
            employees.create(json!({})).await,
            Err(KronosError::Validation(_))
        ));
        assert!(matches!(
            employees.create(json!("not an object")).await,
            Err(KronosError::Validation(_))
        ));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_changed_lookback_limit() {
        let (client, transport) = client(vec![(StatusCode::OK, json!([]))]);
        let employees = Employees::new(&client);

        let too_old = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        assert!(matches!(
            employees.changed(too_old).await,
            Err(KronosError::Validation(_))
        ));

        let far_future = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        assert!(matches!(
            employees.changed(far_future).await,
            Err(KronosError::Validation(_))
        ));

        let recent = NaiveDate::from_ymd_opt(2024, 2, 15).unwrap();
        employees.changed(recent).await.unwrap();
        assert_eq!(
            transport.urls(),
            vec!["https://secure.saashr.com/ta/rest/v2/companies/33560858/employees/changed?since=2024-02-15"]
        );
    }

    #[tokio::test]
    async fn test_todo_scoping() {
        let (client, transport) = client(vec![
            (StatusCode::OK, json!([])),
            (StatusCode::OK, json!([])),
        ]);
        let employees = Employees::new(&client);

        employees.todo(Query::new(), false).await.unwrap();
        employees.todo(Query::new(), true).await.unwrap();

        let urls = transport.urls();
        assert_eq!(
            urls[0],
            "https://secure.saashr.com/ta/rest/v1/employee/todo?company%3Aid=33560858&employee%3Ausername=jdoe"
        );
        assert_eq!(
            urls[1],
            "https://secure.saashr.com/ta/rest/v1/employee/todo?company%3Aid=33560858"
        );
    }

    #[tokio::test]
    async fn test_api_error_surfaces() {
        let (client, _) = client(vec![(StatusCode::FORBIDDEN, json!({ "errors": ["nope"] }))]);

        let err = Employees::new(&client).get_all().await.unwrap_err();
        assert!(matches!(err, KronosError::Api { status: 403, .. }));
    }
}
