//! HTTP planner client
//!
//! Posts `{command, user_id}` to `{url}/api/plan` and expects a
//! [`PlanOutcome`] back.

use super::{PlanOutcome, Planner};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct HttpPlanner {
    url: String,
    client: reqwest::Client,
}

impl HttpPlanner {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Planner for HttpPlanner {
    async fn process_command(&self, text: &str, user_id: Option<u64>) -> Result<PlanOutcome> {
        let response = self
            .client
            .post(format!("{}/api/plan", self.url))
            .json(&serde_json::json!({
                "command": text,
                "user_id": user_id,
            }))
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .context("planner unreachable")?;

        let status = response.status();
        let body_text = response.text().await?;

        if !status.is_success() {
            warn!("❌ Planner API Error ({}): {}", status, body_text);
            return Err(anyhow::anyhow!("planner returned {}", status));
        }

        debug!("🧭 Planner raw body: {}", body_text);
        serde_json::from_str(&body_text).context("invalid planner response")
    }

    fn name(&self) -> &str {
        "http"
    }
}
