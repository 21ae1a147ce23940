//! Mock planner and AI router for Testing
//!
//! Both record what they were asked so tests can verify the pipeline.

use anyhow::Result;
use async_trait::async_trait;
use lala::planner::{PlanOutcome, Planner};
use lala::router::{AiReply, AiRequest, AiRouter};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

pub const ROUTER_TEXT: &str = "Respuesta del modelo";

/// Planner returning a fixed outcome
pub struct MockPlanner {
    outcome: PlanOutcome,
    fail: bool,
    pub commands: Mutex<Vec<(String, Option<u64>)>>,
}

impl MockPlanner {
    pub fn returning(outcome: PlanOutcome) -> Self {
        Self {
            outcome,
            fail: false,
            commands: Mutex::new(Vec::new()),
        }
    }

    /// Planner that never finds a plan
    pub fn unplanned() -> Self {
        Self::returning(PlanOutcome::unplanned())
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::unplanned()
        }
    }

    pub fn commands(&self) -> Vec<(String, Option<u64>)> {
        self.commands.lock().unwrap().clone()
    }
}

#[async_trait]
impl Planner for MockPlanner {
    async fn process_command(&self, text: &str, user_id: Option<u64>) -> Result<PlanOutcome> {
        self.commands
            .lock()
            .unwrap()
            .push((text.to_string(), user_id));
        if self.fail {
            return Err(anyhow::anyhow!("Mock planner unavailable"));
        }
        Ok(self.outcome.clone())
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Router with a switchable online state
pub struct MockRouter {
    online: bool,
    offline: AtomicBool,
    pub requests: Mutex<Vec<AiRequest>>,
}

impl MockRouter {
    pub fn new(online: bool) -> Self {
        Self {
            online,
            offline: AtomicBool::new(false),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<AiRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl AiRouter for MockRouter {
    async fn generate(&self, request: &AiRequest) -> Result<AiReply> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(AiReply {
            text: ROUTER_TEXT.to_string(),
            model: "mock-model".to_string(),
        })
    }

    async fn is_online(&self) -> bool {
        self.online
    }

    fn set_offline_mode(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn offline_mode(&self) -> bool {
        self.offline.load(Ordering::SeqCst)
    }

    fn available_services(&self) -> Vec<String> {
        vec!["anthropic".to_string()]
    }
}
