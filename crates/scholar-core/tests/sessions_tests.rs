//! Session manager tests: aggregation, collision detection, routing

mod common;

use std::collections::HashMap;
use std::sync::Arc;

use common::{StubHandler, StubServerTransport};
use scholar_core::config::McpServerConfig;
use scholar_core::error::Error;
use scholar_core::sessions::SessionManager;
use scholar_core::transcript::ToolCallRequest;
use serde_json::json;

async fn manager_with(name: &str, handler: Arc<StubHandler>) -> SessionManager {
    let mut sessions = SessionManager::new();
    sessions
        .connect_with_transport(name, Box::new(StubServerTransport::new(handler)))
        .await
        .expect("stub server should connect");
    sessions
}

#[tokio::test]
async fn discovery_caches_declarations() {
    let sessions = manager_with("research", Arc::new(StubHandler::new(&["search_papers"]))).await;

    assert_eq!(sessions.tool_count(), 1);
    assert_eq!(sessions.prompts().len(), 1);
    assert_eq!(sessions.resources().len(), 1);
    assert_eq!(sessions.server_names(), vec!["research"]);

    let definitions = sessions.tool_definitions();
    assert_eq!(definitions[0].name, "search_papers");
    assert_eq!(definitions[0].parameters["required"][0], "topic");
}

#[tokio::test]
async fn duplicate_tool_name_across_servers_is_a_collision() {
    let mut sessions = manager_with("alpha", Arc::new(StubHandler::new(&["search_papers"]))).await;

    let result = sessions
        .connect_with_transport(
            "beta",
            Box::new(StubServerTransport::new(Arc::new(StubHandler::new(&[
                "search_papers",
            ])))),
        )
        .await;

    match result {
        Err(Error::CapabilityCollision {
            name,
            first,
            second,
        }) => {
            assert_eq!(name, "search_papers");
            assert_eq!(first, "alpha");
            assert_eq!(second, "beta");
        }
        other => panic!("expected collision, got {:?}", other),
    }
}

#[tokio::test]
async fn unreachable_server_leaves_existing_connections_intact() {
    let handler = Arc::new(StubHandler::new(&["search_papers"]));
    let mut sessions = manager_with("research", handler.clone()).await;

    let result = sessions
        .connect(
            "ghost",
            &McpServerConfig::new("/nonexistent/scholar-test-binary"),
        )
        .await;
    assert!(matches!(result, Err(Error::Connection { .. })));

    // The established session still dispatches
    assert_eq!(sessions.server_names(), vec!["research"]);
    let result = sessions
        .dispatch(&ToolCallRequest {
            call_id: "c1".to_string(),
            name: "search_papers".to_string(),
            arguments: json!({ "topic": "llm agents" }),
        })
        .await
        .unwrap();
    assert!(!result.is_error);
    assert_eq!(handler.call_count(), 1);
}

#[tokio::test]
async fn connect_all_tolerates_unreachable_servers() {
    let mut configs = HashMap::new();
    configs.insert(
        "ghost".to_string(),
        McpServerConfig::new("/nonexistent/scholar-test-binary"),
    );
    configs.insert(
        "disabled".to_string(),
        McpServerConfig::new("/also/nonexistent").with_enabled(false),
    );

    let mut sessions = SessionManager::new();
    sessions.connect_all(&configs).await.unwrap();

    assert!(sessions.server_names().is_empty());
    assert_eq!(sessions.tool_count(), 0);
}

#[tokio::test]
async fn dispatch_on_unknown_tool_never_reaches_a_server() {
    let handler = Arc::new(StubHandler::new(&["search_papers"]));
    let sessions = manager_with("research", handler.clone()).await;

    let result = sessions
        .dispatch(&ToolCallRequest {
            call_id: "c1".to_string(),
            name: "delete_everything".to_string(),
            arguments: json!({}),
        })
        .await;

    assert!(matches!(result, Err(Error::UnknownTool(name)) if name == "delete_everything"));
    assert_eq!(handler.call_count(), 0);
}

#[tokio::test]
async fn resources_route_by_exact_uri_and_namespace_fallback() {
    let sessions = manager_with("research", Arc::new(StubHandler::new(&["search_papers"]))).await;

    // Declared at connect time
    let folders = sessions.read_resource("papers://folders").await.unwrap();
    assert!(folders.contains("Available Topics"));

    // Not declared, but the namespace owner takes it
    let topic = sessions.read_resource("papers://robotics").await.unwrap();
    assert!(topic.contains("robotics"));

    // Nobody owns this namespace
    let missing = sessions.read_resource("web://example").await;
    assert!(matches!(missing, Err(Error::UnknownResource(_))));
}

#[tokio::test]
async fn prompts_render_and_unknown_names_fail() {
    let sessions = manager_with("research", Arc::new(StubHandler::new(&["search_papers"]))).await;

    let mut args = HashMap::new();
    args.insert("topic".to_string(), "robotics".to_string());
    let text = sessions
        .render_prompt("generate_search_prompt", args)
        .await
        .unwrap();
    assert!(text.contains("robotics"));

    let missing = sessions
        .render_prompt("no_such_prompt", HashMap::new())
        .await;
    assert!(matches!(missing, Err(Error::UnknownPrompt(_))));

    // Declared prompt, unbound required argument: the server rejects it
    let unbound = sessions
        .render_prompt("generate_search_prompt", HashMap::new())
        .await;
    match unbound {
        Err(Error::Dispatch(message)) => {
            assert!(message.contains("Missing required argument"));
        }
        other => panic!("expected dispatch failure, got {:?}", other),
    }
}

#[tokio::test]
async fn shutdown_clears_the_namespace() {
    let mut sessions =
        manager_with("research", Arc::new(StubHandler::new(&["search_papers"]))).await;

    sessions.shutdown().await;

    assert!(sessions.server_names().is_empty());
    assert_eq!(sessions.tool_count(), 0);
    assert!(sessions.prompts().is_empty());
}
