//! Planner Module
//!
//! Contract with the external planner that turns a command into a plan and a
//! spoken response.

use crate::config::Config;
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

pub mod http;
pub mod keyword;

pub use http::HttpPlanner;
pub use keyword::{match_intent, DemoIntent, KeywordPlanner};

/// What the planner made of a command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanOutcome {
    pub success: bool,
    #[serde(default)]
    pub response: String,
    #[serde(default = "empty_plan")]
    pub plan: Value,
}

fn empty_plan() -> Value {
    Value::Object(Default::default())
}

impl PlanOutcome {
    pub fn success(response: impl Into<String>, plan: Value) -> Self {
        Self {
            success: true,
            response: response.into(),
            plan,
        }
    }

    pub fn unplanned() -> Self {
        Self {
            success: false,
            response: String::new(),
            plan: empty_plan(),
        }
    }

    /// Device action named by the plan, if any
    pub fn action(&self) -> Option<&str> {
        self.plan.get("action").and_then(Value::as_str)
    }
}

/// Trait for planners
#[async_trait]
pub trait Planner: Send + Sync {
    async fn process_command(&self, text: &str, user_id: Option<u64>) -> Result<PlanOutcome>;

    fn name(&self) -> &str;
}

/// Factory to create the configured planner
pub fn create_planner(config: &Config) -> Arc<dyn Planner> {
    info!("🛠️ Creating planner: {}", config.planner_backend);
    match config.planner_backend.as_str() {
        "http" => Arc::new(HttpPlanner::new(&config.planner_url)),
        "keyword" => Arc::new(KeywordPlanner),
        other => {
            warn!("  - Unknown planner '{}', falling back to keyword", other);
            Arc::new(KeywordPlanner)
        }
    }
}
