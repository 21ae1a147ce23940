use lala::assistant::{
    AssistantOptions, CommandResult, DEFAULT_WAKE_WORD, ERROR_RESPONSE, NO_VOICE_RESPONSE,
};
use lala::bridge::{BridgeAction, DeviceBridge, DEFAULT_ACTION_HISTORY};
use lala::planner::PlanOutcome;
use lala::router::{AiRouter, ModelPreference, LALA_SYSTEM_PROMPT};
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

mod common;
use common::mock_asr::MockRecognizer;
use common::mock_services::{MockPlanner, MockRouter, ROUTER_TEXT};
use common::{fast_options, Harness};

async fn wait_until(deadline: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

#[tokio::test]
async fn test_text_command_returns_router_reply_and_records_command() {
    let h = Harness::new(
        MockRecognizer::new(&[]),
        MockPlanner::unplanned(),
        MockRouter::new(true),
        AssistantOptions {
            user_id: Some(42),
            ..AssistantOptions::default()
        },
    );

    let result = h.assistant.process_text_command("¿qué hora es?", true).await;

    assert!(result.success);
    assert_eq!(result.response, ROUTER_TEXT);
    assert_eq!(result.model.as_deref(), Some("mock-model"));
    assert_eq!(result.online, Some(true));
    assert_eq!(h.assistant.last_command().as_deref(), Some("¿qué hora es?"));
    assert!(!h.assistant.is_processing());

    assert_eq!(h.planner.commands(), vec![("¿qué hora es?".to_string(), Some(42))]);
    let request = &h.router.requests()[0];
    assert_eq!(request.prompt, "Responde al usuario que dice: '¿qué hora es?'");
    assert_eq!(request.system_prompt, LALA_SYSTEM_PROMPT);
    assert_eq!(request.model_preference, ModelPreference::Auto);
    assert_eq!(request.max_tokens, 200);

    assert!(h.tts.was_spoken(ROUTER_TEXT));
}

#[tokio::test]
async fn test_planned_response_wins_and_action_runs() {
    let h = Harness::new(
        MockRecognizer::new(&[]),
        MockPlanner::returning(PlanOutcome::success(
            "Abriendo la aplicación de mapas.",
            json!({"action": "open_app", "app_name": "mapas"}),
        )),
        MockRouter::new(false),
        AssistantOptions::default(),
    );

    let result = h.assistant.process_text_command("abre mapas", false).await;

    assert!(result.success);
    assert_eq!(result.response, "Abriendo la aplicación de mapas.");
    assert_eq!(result.online, Some(false));
    assert_eq!(result.plan.unwrap()["app_name"], "mapas");
    assert_eq!(
        h.router.requests()[0].model_preference,
        ModelPreference::Offline
    );
    assert!(h.tts.get_spoken().is_empty());
    assert!(h.bridge.actions().iter().any(|a| matches!(
        a,
        BridgeAction::Intent { package: Some(p), .. } if p == "com.google.android.apps.maps"
    )));
}

#[tokio::test]
async fn test_offline_preference_forces_offline_routing() {
    let h = Harness::new(
        MockRecognizer::new(&[]),
        MockPlanner::unplanned(),
        MockRouter::new(true),
        AssistantOptions {
            prefer_offline: true,
            ..AssistantOptions::default()
        },
    );
    assert!(h.router.offline_mode());

    let result = h.assistant.process_text_command("hola", false).await;
    assert_eq!(result.online, Some(false));
    assert_eq!(
        h.router.requests()[0].model_preference,
        ModelPreference::Offline
    );
}

#[tokio::test]
async fn test_planner_failure_yields_error_result() {
    let h = Harness::new(
        MockRecognizer::new(&[]),
        MockPlanner::failing(),
        MockRouter::new(true),
        AssistantOptions::default(),
    );

    let result = h.assistant.process_text_command("hola", true).await;

    assert!(!result.success);
    assert_eq!(result.response, ERROR_RESPONSE);
    assert!(result.error.unwrap().contains("Mock planner unavailable"));
    assert!(!h.assistant.is_processing());
    assert_eq!(h.assistant.last_command().as_deref(), Some("hola"));
    assert_eq!(h.assistant.last_response(), None);
}

#[tokio::test]
async fn test_speech_failure_does_not_fail_command() {
    let h = Harness::new(
        MockRecognizer::new(&[]),
        MockPlanner::unplanned(),
        MockRouter::new(false),
        AssistantOptions::default(),
    );
    h.tts.fail();

    let result = h.assistant.process_text_command("hola", true).await;
    assert!(result.success);
}

#[tokio::test]
async fn test_voice_command_strips_wake_word() {
    let h = Harness::new(
        MockRecognizer::new(&["Oye LALA pon una alarma"]),
        MockPlanner::unplanned(),
        MockRouter::new(false),
        AssistantOptions::default(),
    );

    let result = h.assistant.process_voice_command(5).await.unwrap();

    assert!(result.success);
    assert_eq!(result.recognized_text.as_deref(), Some("Oye LALA pon una alarma"));
    assert_eq!(h.planner.commands()[0].0, "pon una alarma");
    assert!(h.bridge.actions().contains(&BridgeAction::Vibrate { duration_ms: 100 }));
}

#[tokio::test]
async fn test_voice_command_without_wake_word_is_processed_whole() {
    let h = Harness::new(
        MockRecognizer::new(&["abre la cámara"]),
        MockPlanner::unplanned(),
        MockRouter::new(false),
        AssistantOptions::default(),
    );

    h.assistant.process_voice_command(5).await.unwrap();
    assert_eq!(h.planner.commands()[0].0, "abre la cámara");
}

#[tokio::test]
async fn test_silence_is_not_processed() {
    let h = Harness::new(
        MockRecognizer::new(&[]),
        MockPlanner::unplanned(),
        MockRouter::new(false),
        AssistantOptions::default(),
    );

    let result = h.assistant.process_voice_command(5).await.unwrap();
    assert!(!result.success);
    assert_eq!(result.response, NO_VOICE_RESPONSE);
    assert_eq!(result.recognized_text.as_deref(), Some(""));
    assert!(h.planner.commands().is_empty());
}

#[tokio::test]
async fn test_recognition_failure_is_an_error() {
    let h = Harness::new(
        MockRecognizer::failing(),
        MockPlanner::unplanned(),
        MockRouter::new(false),
        AssistantOptions::default(),
    );

    assert!(h.assistant.process_voice_command(5).await.is_err());
}

#[tokio::test]
async fn test_wake_word_validation_keeps_previous() {
    let h = Harness::new(
        MockRecognizer::new(&[]),
        MockPlanner::unplanned(),
        MockRouter::new(false),
        AssistantOptions::default(),
    );

    assert!(!h.assistant.set_wake_word("a"));
    assert_eq!(h.assistant.wake_word(), "Lala");
    assert!(h.assistant.set_wake_word("Ok"));
    assert_eq!(h.assistant.wake_word(), "Ok");
}

#[tokio::test]
async fn test_background_listener_fires_callback_and_stops() {
    let h = Harness::new(
        MockRecognizer::repeating("Lala hola"),
        MockPlanner::unplanned(),
        MockRouter::new(false),
        fast_options(),
    );

    let seen: Arc<Mutex<Vec<CommandResult>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    assert!(
        h.assistant
            .start_background_listening(Some(Arc::new(move |result: &CommandResult| {
                sink.lock().unwrap().push(result.clone());
            })))
            .await
    );
    assert!(h.assistant.is_listening_in_background());
    assert!(h.assistant.device().device_status().background_service);

    assert!(wait_until(Duration::from_secs(3), || seen.lock().unwrap().len() >= 2).await);

    let start = Instant::now();
    assert!(h.assistant.stop_background_listening().await);
    assert!(start.elapsed() < Duration::from_millis(300) + Duration::from_millis(200));
    assert!(!h.assistant.is_listening_in_background());
    assert!(!h.assistant.device().device_status().background_service);

    let results = seen.lock().unwrap().clone();
    assert!(results.iter().all(|r| r.success));
    assert_eq!(results[0].recognized_text.as_deref(), Some("Lala hola"));

    // No further callbacks once stopped
    let count = results.len();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(seen.lock().unwrap().len(), count);
}

#[tokio::test]
async fn test_background_silence_does_not_call_back() {
    let h = Harness::new(
        MockRecognizer::new(&[]),
        MockPlanner::unplanned(),
        MockRouter::new(false),
        fast_options(),
    );

    let calls = Arc::new(Mutex::new(0));
    let counter = calls.clone();
    h.assistant
        .start_background_listening(Some(Arc::new(move |_: &CommandResult| {
            *counter.lock().unwrap() += 1;
        })))
        .await;

    assert!(wait_until(Duration::from_secs(3), || h.recognizer.call_count() >= 3).await);
    h.assistant.stop_background_listening().await;
    assert_eq!(*calls.lock().unwrap(), 0);
}

#[tokio::test]
async fn test_background_stop_is_bounded_by_join_timeout() {
    let h = Harness::new(
        MockRecognizer::slow(Duration::from_millis(1500)),
        MockPlanner::unplanned(),
        MockRouter::new(false),
        fast_options(),
    );

    h.assistant.start_background_listening(None).await;
    assert!(wait_until(Duration::from_secs(2), || h.recognizer.call_count() >= 1).await);

    let start = Instant::now();
    h.assistant.stop_background_listening().await;
    let elapsed = start.elapsed();

    assert!(elapsed >= Duration::from_millis(250), "stop returned before the join timeout: {:?}", elapsed);
    assert!(elapsed < Duration::from_millis(1000), "stop took {:?}", elapsed);
    assert!(!h.assistant.is_listening_in_background());
}

#[tokio::test]
async fn test_background_errors_back_off_and_continue() {
    let h = Harness::new(
        MockRecognizer::failing(),
        MockPlanner::unplanned(),
        MockRouter::new(false),
        fast_options(),
    );

    h.assistant.start_background_listening(None).await;
    assert!(wait_until(Duration::from_secs(3), || h.recognizer.call_count() >= 2).await);
    assert!(h.assistant.is_listening_in_background());
    h.assistant.stop_background_listening().await;
}

#[tokio::test]
async fn test_restarting_listener_replaces_previous() {
    let h = Harness::new(
        MockRecognizer::new(&[]),
        MockPlanner::unplanned(),
        MockRouter::new(false),
        fast_options(),
    );

    h.assistant.start_background_listening(None).await;
    h.assistant.start_background_listening(None).await;
    assert!(h.assistant.is_listening_in_background());

    let service_starts = h
        .bridge
        .actions()
        .iter()
        .filter(|a| matches!(a, BridgeAction::ServiceStart { .. }))
        .count();
    assert_eq!(service_starts, 2);

    h.assistant.stop().await;
    assert!(!h.assistant.is_listening_in_background());
    assert!(!h.assistant.is_active());
}

#[tokio::test]
async fn test_whitespace_recognition_is_processed() {
    let h = Harness::new(
        MockRecognizer::new(&["   "]),
        MockPlanner::unplanned(),
        MockRouter::new(false),
        AssistantOptions::default(),
    );

    let result = h.assistant.process_voice_command(5).await.unwrap();
    assert!(result.success);
    assert_eq!(result.recognized_text.as_deref(), Some("   "));
    assert_eq!(h.planner.commands().len(), 1);
}

#[tokio::test]
async fn test_short_configured_wake_word_uses_default() {
    let h = Harness::new(
        MockRecognizer::new(&["Lala abre youtube"]),
        MockPlanner::unplanned(),
        MockRouter::new(false),
        AssistantOptions {
            wake_word: "X".to_string(),
            ..AssistantOptions::default()
        },
    );

    assert_eq!(h.assistant.wake_word(), DEFAULT_WAKE_WORD);
    h.assistant.process_voice_command(5).await.unwrap();
    assert_eq!(h.planner.commands()[0].0, "abre youtube");
}

#[tokio::test]
async fn test_action_log_stays_bounded_over_many_commands() {
    let h = Harness::new(
        MockRecognizer::repeating("Lala hola"),
        MockPlanner::unplanned(),
        MockRouter::new(false),
        AssistantOptions::default(),
    );

    for _ in 0..400 {
        h.assistant.process_voice_command(5).await.unwrap();
    }

    let actions = h.bridge.actions();
    assert_eq!(actions.len(), DEFAULT_ACTION_HISTORY);
    // Newest entries are kept
    assert!(matches!(actions.last(), Some(BridgeAction::Toast { .. })));
}
