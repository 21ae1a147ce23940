//! On-device keyword planner
//!
//! Matches a small table of Spanish keywords. The same table answers demo
//! mode requests in the host API.

use super::{PlanOutcome, Planner};
use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

/// A canned answer for a recognised keyword
#[derive(Debug, Clone, PartialEq)]
pub struct DemoIntent {
    pub response: String,
    pub plan: Option<Value>,
}

impl DemoIntent {
    fn new(response: &str, plan: Option<Value>) -> Self {
        Self {
            response: response.to_string(),
            plan,
        }
    }
}

/// Look `text` up in the keyword table (first match wins)
pub fn match_intent(text: &str) -> Option<DemoIntent> {
    let lower = text.to_lowercase();
    let has = |needle: &str| lower.contains(needle);

    if has("hola") {
        return Some(DemoIntent::new(
            "¡Hola! Soy Lala, tu asistente virtual. ¿En qué puedo ayudarte hoy?",
            None,
        ));
    }

    if has("qué puedes hacer") || has("funciones") {
        return Some(DemoIntent::new(
            "Puedo ayudarte con muchas cosas: responder preguntas, configurar alarmas, \
             enviar mensajes, controlar aplicaciones, obtener información del clima y \
             noticias, y mucho más. Estoy diseñada para funcionar incluso sin internet.",
            None,
        ));
    }

    if has("clima") {
        return Some(DemoIntent::new(
            "En Madrid el clima está parcialmente nublado con una temperatura de 22°C. \
             La humedad es del 65% y hay viento de 10 km/h.",
            Some(json!({"action": "get_weather", "location": "Madrid"})),
        ));
    }

    if has("alarma") {
        return Some(DemoIntent::new(
            "He configurado una alarma para las 8:00 de la mañana.",
            Some(json!({"action": "set_alarm", "time": "8:00 AM"})),
        ));
    }

    if has("mensaje") {
        return Some(DemoIntent::new(
            "He enviado tu mensaje a Juan por WhatsApp.",
            Some(json!({
                "action": "send_message",
                "app": "whatsapp",
                "contact": "Juan",
                "message": "Llegaré tarde"
            })),
        ));
    }

    if has("abre") || has("abrir") {
        let app_name = ["mapas", "youtube", "cámara"]
            .into_iter()
            .find(|app| has(app))
            .unwrap_or("mapas");
        return Some(DemoIntent {
            response: format!("Abriendo la aplicación de {}.", app_name),
            plan: Some(json!({"action": "open_app", "app_name": app_name})),
        });
    }

    None
}

/// Planner backed by the keyword table
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordPlanner;

#[async_trait]
impl Planner for KeywordPlanner {
    async fn process_command(&self, text: &str, user_id: Option<u64>) -> Result<PlanOutcome> {
        debug!("Keyword planning for user {:?}: '{}'", user_id, text);
        Ok(match match_intent(text) {
            Some(intent) => PlanOutcome::success(
                intent.response,
                intent.plan.unwrap_or_else(|| json!({})),
            ),
            None => PlanOutcome::unplanned(),
        })
    }

    fn name(&self) -> &str {
        "keyword"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alarm_plan() {
        let intent = match_intent("pon una ALARMA para las 8").unwrap();
        assert_eq!(intent.plan.unwrap()["time"], "8:00 AM");
    }

    #[test]
    fn test_open_app_picks_named_app() {
        let intent = match_intent("abre youtube").unwrap();
        assert_eq!(intent.response, "Abriendo la aplicación de youtube.");
        assert_eq!(
            match_intent("abrir algo").unwrap().plan.unwrap()["app_name"],
            "mapas"
        );
    }

    #[test]
    fn test_greeting_wins_over_later_keywords() {
        let intent = match_intent("hola, pon una alarma").unwrap();
        assert!(intent.plan.is_none());
    }

    #[tokio::test]
    async fn test_unknown_command_is_unplanned() {
        let outcome = KeywordPlanner
            .process_command("cuéntame un chiste", Some(7))
            .await
            .unwrap();
        assert!(!outcome.success);
    }

    #[tokio::test]
    async fn test_known_command_is_planned() {
        let outcome = KeywordPlanner
            .process_command("manda un mensaje", None)
            .await
            .unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.action(), Some("send_message"));
    }
}
