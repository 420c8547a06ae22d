mod common;

use common::ScriptedModel;
use jarvis_relay::constants::*;
use jarvis_relay::dispatch::ChatEngine;
use jarvis_relay::hardening::RetryPolicy;
use jarvis_relay::registry::{tool_fn, ToolDefinition, ToolRegistry};
use jarvis_relay::session::{ConversationSession, Role, SessionStore, Turn};
use jarvis_relay::tool_schema::{FieldType, InputSchema};
use jarvis_relay::tools;
use jarvis_relay::types::*;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const CALC_CALL: &str = r#"{"tool":"calculator","parameters":{"expression":"100 / 12"}}"#;

fn request(prompt: &str) -> ChatRequest {
    ChatRequest {
        prompt: prompt.to_string(),
        persona: None,
    }
}

fn base_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    tools::calculator::register(&mut registry).unwrap();
    tools::persona::register(&mut registry).unwrap();
    registry
}

fn engine(model: Arc<ScriptedModel>, registry: ToolRegistry) -> ChatEngine {
    ChatEngine::new(model, Arc::new(registry)).with_retry(RetryPolicy::new(
        2,
        Duration::from_millis(10),
        Duration::from_millis(100),
        2.0,
    ))
}

#[tokio::test]
async fn test_calculator_round_trip() {
    let model = Arc::new(ScriptedModel::answers(&[
        CALC_CALL,
        "100 divided by 12 is approximately 8.33.",
    ]));
    let engine = engine(model.clone(), base_registry());
    let mut slot = None;

    let resp = engine
        .process_chat(&mut slot, request("what is 100 divided by 12?"))
        .await
        .unwrap();

    assert_eq!(resp.response, "100 divided by 12 is approximately 8.33.");
    assert_eq!(resp.tool_used.as_deref(), Some("calculator"));
    assert!(resp.persona_update.is_none());
    assert_eq!(model.calls(), 2);

    let second = model.prompt(1);
    assert!(second.contains(&format!("Model: {}", CALC_CALL)));
    assert!(second.contains("Tool Result:\n{\"success\":true,\"data\":\"The result of \\\"100 / 12\\\" is"));
    assert!(second.contains("original request: \"what is 100 divided by 12?\""));
    assert!(second.ends_with("Model:"));

    let session = slot.unwrap();
    let roles: Vec<Role> = session.history.iter().map(|t| t.role).collect();
    assert_eq!(
        roles,
        vec![Role::User, Role::Model, Role::User, Role::Model, Role::User, Role::Model]
    );
    assert_eq!(session.history[2], Turn::user("what is 100 divided by 12?"));
    assert_eq!(session.history[3], Turn::model(CALC_CALL));
    assert!(session.history[4].text.starts_with("Tool Result:"));
    assert_eq!(
        session.history[5],
        Turn::model("100 divided by 12 is approximately 8.33.")
    );
}

#[tokio::test]
async fn test_prompt_carries_persona_catalog_and_history() {
    let model = Arc::new(ScriptedModel::answers(&["Arr, hello!"]));
    let engine = engine(model.clone(), base_registry());
    let mut slot = None;

    engine
        .process_chat(
            &mut slot,
            ChatRequest {
                prompt: "hello".into(),
                persona: Some("You are a pirate.".into()),
            },
        )
        .await
        .unwrap();

    let prompt = model.prompt(0);
    assert!(prompt.starts_with("You are a pirate."));
    assert!(prompt.contains("AVAILABLE TOOLS:\n1. **'calculator'**"));
    assert!(prompt.contains(
        "User: Initialize with your persona.\nModel: Ahoy there, matey! Captain's ready for adventure!\nUser: hello\nModel:"
    ));
}

#[tokio::test]
async fn test_tool_failure_is_fed_back_not_raised() {
    let mut registry = base_registry();
    registry
        .register(
            ToolDefinition::new(
                "fs_read",
                "Reads a file.",
                InputSchema::new().required("path", FieldType::String),
            ),
            tool_fn(|_| async move { Err::<Value, _>("file not found".to_string()) }),
        )
        .unwrap();

    let model = Arc::new(ScriptedModel::answers(&[
        r#"{"tool":"fs_read","parameters":{"path":"missing.txt"}}"#,
        "I couldn't find that file.",
    ]));
    let engine = engine(model.clone(), registry);
    let mut slot = None;

    let resp = engine
        .process_chat(&mut slot, request("read missing.txt"))
        .await
        .unwrap();

    assert_eq!(resp.response, "I couldn't find that file.");
    assert_eq!(resp.tool_used.as_deref(), Some("fs_read"));
    assert!(model
        .prompt(1)
        .contains("Tool Result:\n{\"success\":false,\"error\":\"file not found\"}"));
}

#[tokio::test]
async fn test_unknown_tool_and_bad_params_are_tool_results() {
    let model = Arc::new(ScriptedModel::answers(&[
        r#"{"tool":"teleport","parameters":{}}"#,
        r#"{"tool":"calculator","parameters":{"expr":"1+1"}}"#,
        "Sorry, I can't do that.",
    ]));
    let engine = engine(model.clone(), base_registry());
    let mut slot = None;

    let resp = engine.process_chat(&mut slot, request("go")).await.unwrap();

    assert_eq!(resp.response, "Sorry, I can't do that.");
    assert_eq!(resp.tool_used.as_deref(), Some("calculator"));
    assert!(model.prompt(1).contains("\"error\":\"Tool 'teleport' not found\""));
    assert!(model
        .prompt(2)
        .contains("\"error\":\"Invalid input: expression: Required\""));
}

#[tokio::test]
async fn test_prose_wrapped_call_is_final_answer() {
    let text = "Sure!\n```json\n{\"tool\": \"calculator\", \"parameters\": {\"expression\": \"1+1\"}}\n```";
    let model = Arc::new(ScriptedModel::answers(&[text]));
    let engine = engine(model.clone(), base_registry());
    let mut slot = None;

    let resp = engine.process_chat(&mut slot, request("1+1?")).await.unwrap();

    assert_eq!(resp.response, text);
    assert!(resp.tool_used.is_none());
    assert_eq!(model.calls(), 1);
}

#[tokio::test]
async fn test_turn_budget_returns_fallback() {
    let invocations = Arc::new(AtomicUsize::new(0));
    let counter = invocations.clone();
    let mut registry = ToolRegistry::new();
    registry
        .register(
            ToolDefinition::new("spin", "Does nothing.", InputSchema::new()),
            tool_fn(move |_| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(json!("spun"))
                }
            }),
        )
        .unwrap();

    let model = Arc::new(ScriptedModel::always(Ok(r#"{"tool":"spin","parameters":{}}"#)));
    let engine = engine(model.clone(), registry).with_max_turns(3);
    let mut slot = None;

    let resp = engine.process_chat(&mut slot, request("loop")).await.unwrap();

    assert_eq!(resp.response, LOOP_FALLBACK_MESSAGE);
    assert_eq!(resp.tool_used.as_deref(), Some("spin"));
    assert_eq!(model.calls(), 3);
    assert_eq!(invocations.load(Ordering::SeqCst), 3);

    let history = &slot.unwrap().history;
    assert_eq!(history.len(), SEED_TURNS + 1 + 3 * 2 + 1);
    assert_eq!(history.last().unwrap(), &Turn::model(LOOP_FALLBACK_MESSAGE));
}

#[tokio::test]
async fn test_default_budget_is_ten_model_calls() {
    let model = Arc::new(ScriptedModel::always(Ok(CALC_CALL)));
    let engine = engine(model.clone(), base_registry());
    let mut slot = None;

    let resp = engine.process_chat(&mut slot, request("loop")).await.unwrap();

    assert_eq!(resp.response, LOOP_FALLBACK_MESSAGE);
    assert_eq!(model.calls(), DEFAULT_MAX_TURNS as usize);
}

#[tokio::test]
async fn test_answer_on_last_allowed_turn_wins() {
    let model = Arc::new(ScriptedModel::answers(&[CALC_CALL, "It is about 8.33."]));
    let engine = engine(model.clone(), base_registry()).with_max_turns(2);
    let mut slot = None;

    let resp = engine.process_chat(&mut slot, request("100/12?")).await.unwrap();

    assert_eq!(resp.response, "It is about 8.33.");
    assert_eq!(model.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_transient_model_failures_are_retried() {
    let model = Arc::new(ScriptedModel::new(vec![
        Err("503 overloaded"),
        Err("503 overloaded"),
        Ok("Recovered."),
    ]));
    let engine = engine(model.clone(), base_registry());
    let mut slot = None;

    let resp = engine.process_chat(&mut slot, request("hi")).await.unwrap();

    assert_eq!(resp.response, "Recovered.");
    assert_eq!(model.calls(), 3);
    let health = engine.health();
    assert_eq!(health.failed_calls.load(Ordering::Relaxed), 2);
    assert_eq!(health.consecutive_failures.load(Ordering::Relaxed), 0);
}

#[tokio::test(start_paused = true)]
async fn test_transport_exhaustion_leaves_history_untouched() {
    let mut existing = ConversationSession::seeded(None);
    existing.append_turn(Role::User, "earlier");
    existing.append_turn(Role::Model, "reply");
    let before = existing.clone();
    let mut slot = Some(existing);

    // First call asks for a tool, every later call fails.
    let model = Arc::new(ScriptedModel::new(vec![Ok(CALC_CALL)]));
    let engine = engine(model.clone(), base_registry());

    let err = engine
        .process_chat(&mut slot, request("what is 100/12?"))
        .await
        .unwrap_err();

    match err.inner {
        JarvisError::ModelTransport { attempts, .. } => assert_eq!(attempts, 3),
        other => panic!("expected ModelTransport, got {:?}", other),
    }
    assert_eq!(model.calls(), 1 + 3);
    assert_eq!(slot.unwrap(), before);
}

#[tokio::test]
async fn test_update_persona_reseeds_session() {
    let model = Arc::new(ScriptedModel::answers(&[
        r#"{"tool":"update_persona","parameters":{"new_prompt":"You are a detective."}}"#,
        "The game is afoot.",
    ]));
    let engine = engine(model.clone(), base_registry());
    let mut slot = Some(ConversationSession::seeded(None));
    slot.as_mut().unwrap().append_turn(Role::User, "old");

    let resp = engine
        .process_chat(&mut slot, request("be a detective"))
        .await
        .unwrap();

    assert_eq!(resp.response, PERSONA_UPDATED_MESSAGE);
    assert_eq!(resp.tool_used.as_deref(), Some(UPDATE_PERSONA_TOOL));
    assert_eq!(resp.persona_update.as_deref(), Some("You are a detective."));
    assert_eq!(model.calls(), 1);

    let session = slot.as_ref().unwrap();
    assert_eq!(session.persona.as_deref(), Some("You are a detective."));
    assert_eq!(session.history.len(), SEED_TURNS);

    // Next turn is prompted with the new persona.
    engine.process_chat(&mut slot, request("who are you?")).await.unwrap();
    assert!(model.prompt(1).starts_with("You are a detective."));
}

#[tokio::test]
async fn test_persona_change_discards_history() {
    let model = Arc::new(ScriptedModel::answers(&["Arr!", "Elementary."]));
    let engine = engine(model.clone(), base_registry());
    let mut slot = None;

    let pirate = ChatRequest {
        prompt: "hello".into(),
        persona: Some("You are a pirate.".into()),
    };
    engine.process_chat(&mut slot, pirate).await.unwrap();
    assert_eq!(slot.as_ref().unwrap().history.len(), SEED_TURNS + 2);

    let detective = ChatRequest {
        prompt: "hello again".into(),
        persona: Some("You are a detective.".into()),
    };
    engine.process_chat(&mut slot, detective).await.unwrap();

    let session = slot.unwrap();
    assert_eq!(session.history.len(), SEED_TURNS + 2);
    assert_eq!(session.history[2], Turn::user("hello again"));
    assert!(!model.prompt(1).contains("Arr!"));
}

#[tokio::test]
async fn test_same_session_requests_are_serialized() {
    let model = Arc::new(ScriptedModel::always(Ok("ok")));
    let engine = Arc::new(engine(model.clone(), base_registry()));
    let store = Arc::new(SessionStore::new());
    let id = SessionId::from("shared");

    let mut tasks = Vec::new();
    for i in 0..4 {
        let engine = engine.clone();
        let store = store.clone();
        let id = id.clone();
        tasks.push(tokio::spawn(async move {
            let handle = store.handle(&id).await;
            let mut slot = handle.lock().await;
            engine
                .process_chat(&mut *slot, request(&format!("message {}", i)))
                .await
                .unwrap();
        }));
    }
    for t in tasks {
        t.await.unwrap();
    }

    let handle = store.handle(&id).await;
    let slot = handle.lock().await;
    let history = &slot.as_ref().unwrap().history;
    assert_eq!(history.len(), SEED_TURNS + 4 * 2);
    for pair in history[SEED_TURNS..].chunks(2) {
        assert_eq!(pair[0].role, Role::User);
        assert_eq!(pair[1], Turn::model("ok"));
    }
}

#[tokio::test]
async fn test_blank_answer_is_returned_but_not_stored() {
    let model = Arc::new(ScriptedModel::answers(&["   "]));
    let engine = engine(model.clone(), base_registry());
    let mut slot = None;

    let resp = engine.process_chat(&mut slot, request("say nothing")).await.unwrap();

    assert_eq!(resp.response, "");
    assert!(resp.tool_used.is_none());
    let history = slot.unwrap().history;
    assert_eq!(history.len(), SEED_TURNS + 1);
    assert_eq!(history.last(), Some(&Turn::user("say nothing")));
}

#[tokio::test]
async fn test_blank_persona_keeps_session_and_prompt() {
    let model = Arc::new(ScriptedModel::always(Ok("ok")));
    let engine = engine(model.clone(), base_registry());
    let mut slot = None;

    engine.process_chat(&mut slot, request("first")).await.unwrap();
    engine
        .process_chat(
            &mut slot,
            ChatRequest {
                prompt: "second".into(),
                persona: Some("".into()),
            },
        )
        .await
        .unwrap();

    assert!(model.prompt(1).starts_with(DEFAULT_PERSONA));
    let session = slot.unwrap();
    assert_eq!(session.persona.as_deref(), Some(DEFAULT_PERSONA));
    assert_eq!(session.history.len(), SEED_TURNS + 4);
}
