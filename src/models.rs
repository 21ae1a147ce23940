//! On-device model budget
//!
//! Picks at most one model per kind from the catalog, best first, while the
//! running total stays within the size budget.

use serde::Serialize;
use tracing::{debug, info};

pub const DEFAULT_BUDGET_MB: u32 = 350;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    Asr,
    Tts,
    Nlp,
    Planner,
}

/// Selection priority
const KIND_ORDER: [ModelKind; 4] = [
    ModelKind::Asr,
    ModelKind::Tts,
    ModelKind::Nlp,
    ModelKind::Planner,
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelEntry {
    pub name: &'static str,
    pub kind: ModelKind,
    pub size_mb: u32,
}

const fn entry(name: &'static str, kind: ModelKind, size_mb: u32) -> ModelEntry {
    ModelEntry {
        name,
        kind,
        size_mb,
    }
}

/// Known models, best quality first within each kind
pub const CATALOG: [ModelEntry; 9] = [
    entry("vosk-model-es-0.42", ModelKind::Asr, 1400),
    entry("vosk-model-small-es-0.42", ModelKind::Asr, 39),
    entry("tts-vits-es", ModelKind::Tts, 110),
    entry("tts-glow-es-lite", ModelKind::Tts, 25),
    entry("paraphrase-multilingual-minilm", ModelKind::Nlp, 118),
    entry("minilm-l6-es-int8", ModelKind::Nlp, 23),
    entry("phi-3-mini-q4", ModelKind::Planner, 2300),
    entry("tinyllama-planner-q4", ModelKind::Planner, 640),
    entry("planner-rules-es", ModelKind::Planner, 2),
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelsConfig {
    pub total_size_mb: u32,
    pub max_size_mb: u32,
    pub models: Vec<ModelEntry>,
}

impl ModelsConfig {
    pub fn model(&self, kind: ModelKind) -> Option<&ModelEntry> {
        self.models.iter().find(|m| m.kind == kind)
    }
}

/// Best model set that fits in `max_size_mb`
pub fn optimal_models_config(max_size_mb: u32) -> ModelsConfig {
    let mut total = 0;
    let mut models = Vec::new();

    for kind in KIND_ORDER {
        let pick = CATALOG
            .iter()
            .filter(|m| m.kind == kind)
            .find(|m| total + m.size_mb <= max_size_mb);

        match pick {
            Some(model) => {
                debug!("Selected {} ({}MB)", model.name, model.size_mb);
                total += model.size_mb;
                models.push(model.clone());
            }
            None => debug!("No {:?} model fits the remaining budget", kind),
        }
    }

    info!(
        "📦 Model configuration: {}MB of {}MB ({} models)",
        total,
        max_size_mb,
        models.len()
    );

    ModelsConfig {
        total_size_mb: total,
        max_size_mb,
        models,
    }
}
