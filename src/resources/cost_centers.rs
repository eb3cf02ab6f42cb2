use serde_json::Value;

use super::{into_json, with_query, Query};
use crate::client::KronosClient;
use crate::error::Result;

const COST_CENTERS_PATH: &str = "/ta/rest/v2/companies/{cid}/config/cost-centers";

/// Company cost-center configuration
pub struct CostCenters<'a> {
    client: &'a KronosClient,
}

impl<'a> CostCenters<'a> {
    pub fn new(client: &'a KronosClient) -> Self {
        Self { client }
    }

    /// List cost centers; `tree_index` defaults to 1
    pub async fn get_all(&self, mut query: Query) -> Result<Value> {
        query
            .entry("tree_index".to_string())
            .or_insert_with(|| "1".to_string());
        let path = with_query(COST_CENTERS_PATH, &query)?;
        into_json(self.client.get(&path).await?)
    }

    pub async fn get_by_id(&self, cost_center_id: &str) -> Result<Value> {
        let path = format!("{}/{}", COST_CENTERS_PATH, cost_center_id);
        into_json(self.client.get(&path).await?)
    }

    pub async fn update(&self, cost_center_id: &str, data: Value) -> Result<Value> {
        let path = format!("{}/{}", COST_CENTERS_PATH, cost_center_id);
        into_json(self.client.put(&path, data).await?)
    }

    /// Bulk upload
    pub async fn upload(&self, data: Value) -> Result<Value> {
        let path = format!("{}/collection", COST_CENTERS_PATH);
        into_json(self.client.raw_post(&path, data).await?)
    }
}
