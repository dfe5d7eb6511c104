use std::future::ready;
use std::sync::{Arc, Mutex};

use serde_json::Value;
use solstice_model::{ChatMessage, ToolCall};
use solstice_test_model::TestModelProvider;
use tokio_util::sync::CancellationToken;

use crate::tool::{Outcome, Registry, Tool, ToolResult};
use crate::tool_loop::{LoopError, ToolLoopBuilder};

static EMPTY_SCHEMA: &Value = &Value::Null;

/// A tool that records every invocation it receives.
struct RecordingTool {
    name: &'static str,
    log: Arc<Mutex<Vec<Value>>>,
}

impl RecordingTool {
    fn new(name: &'static str) -> (Self, Arc<Mutex<Vec<Value>>>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                name,
                log: Arc::clone(&log),
            },
            log,
        )
    }
}

impl Tool for RecordingTool {
    type Input = Value;

    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        "records invocations"
    }

    fn parameter_schema(&self) -> &Value {
        EMPTY_SCHEMA
    }

    fn execute(
        &self,
        input: Self::Input,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        self.log.lock().unwrap().push(input);
        ready(Ok(Outcome::silent("ok")))
    }
}

struct FailingTool;

impl Tool for FailingTool {
    type Input = Value;

    fn name(&self) -> &str {
        "broken"
    }

    fn description(&self) -> &str {
        "always fails"
    }

    fn parameter_schema(&self) -> &Value {
        EMPTY_SCHEMA
    }

    fn execute(
        &self,
        _input: Self::Input,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        ready(Err(crate::tool::Error::execution_error()
            .with_reason("disk on fire")))
    }
}

fn user_turn(text: &str) -> Vec<ChatMessage> {
    vec![ChatMessage::User(text.to_owned())]
}

#[tokio::test]
async fn test_happy_path_tagged() {
    let provider = TestModelProvider::default();
    provider.push_text_reply(
        r#"<append_file>{"path":"/tmp/test.txt","content":"hello"}</append_file>"#,
    );
    provider.push_text_reply("done");

    let (tool, log) = RecordingTool::new("append_file");
    let mut registry = Registry::default();
    registry.add_tool(tool);

    let run = ToolLoopBuilder::with_model_provider(provider.clone())
        .with_registry(Arc::new(registry))
        .with_max_iterations(4)
        .build()
        .run(user_turn("test"))
        .await
        .unwrap();

    assert_eq!(run.content, "done");
    assert_eq!(run.iterations, 2);

    let log = log.lock().unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0]["path"], "/tmp/test.txt");

    // The second exchange must carry the call record and its result,
    // in order: ..., assistant (stripped, empty), tool result.
    let requests = provider.requests();
    assert_eq!(requests.len(), 2);
    let messages = &requests[1].messages;
    let n = messages.len();
    assert_eq!(messages[n - 2], ChatMessage::Assistant(String::new()));
    let ChatMessage::Tool(result) = &messages[n - 1] else {
        panic!("expected a tool result message");
    };
    assert_eq!(result.id, "call_tag_1");
    assert_eq!(result.content, "ok");
}

#[tokio::test]
async fn test_happy_path_envelope() {
    let provider = TestModelProvider::default();
    provider.push_text_reply(concat!(
        "Let me write that file.\n",
        r#"{"tool_calls":[{"id":"call_1","type":"function","function":{"name":"append_file","arguments":"{\"path\":\"/tmp/a\"}"}}]}"#,
    ));
    provider.push_text_reply("All set.");

    let (tool, log) = RecordingTool::new("append_file");
    let mut registry = Registry::default();
    registry.add_tool(tool);

    let run = ToolLoopBuilder::with_model_provider(provider.clone())
        .with_registry(Arc::new(registry))
        .build()
        .run(user_turn("write it"))
        .await
        .unwrap();

    assert_eq!(run.content, "All set.");
    assert_eq!(run.iterations, 2);
    assert_eq!(log.lock().unwrap()[0]["path"], "/tmp/a");

    let messages = &provider.requests()[1].messages;
    let n = messages.len();
    assert_eq!(
        messages[n - 2],
        ChatMessage::Assistant("Let me write that file.".to_owned())
    );
    let ChatMessage::Tool(result) = &messages[n - 1] else {
        panic!("expected a tool result message");
    };
    assert_eq!(result.id, "call_1");
}

#[tokio::test]
async fn test_iteration_exhaustion() {
    let provider = TestModelProvider::default();
    for _ in 0..3 {
        provider.push_text_reply(r#"<noop>{}</noop>"#);
    }

    let (tool, log) = RecordingTool::new("noop");
    let mut registry = Registry::default();
    registry.add_tool(tool);

    let err = ToolLoopBuilder::with_model_provider(provider)
        .with_registry(Arc::new(registry))
        .with_max_iterations(3)
        .build()
        .run(user_turn("loop forever"))
        .await
        .unwrap_err();

    assert!(matches!(err, LoopError::Exhausted { iterations: 3 }));
    assert_eq!(log.lock().unwrap().len(), 3);
}

#[tokio::test]
async fn test_unknown_tool_is_recovered() {
    let provider = TestModelProvider::default();
    provider.push_text_reply(r#"<missing>{"x":1}</missing>"#);
    provider.push_text_reply("done");

    let (tool, log) = RecordingTool::new("noop");
    let mut registry = Registry::default();
    registry.add_tool(tool);

    let run = ToolLoopBuilder::with_model_provider(provider.clone())
        .with_registry(Arc::new(registry))
        .build()
        .run(user_turn("test"))
        .await
        .unwrap();

    assert_eq!(run.content, "done");
    assert!(log.lock().unwrap().is_empty());

    let messages = &provider.requests()[1].messages;
    let ChatMessage::Tool(result) = messages.last().unwrap() else {
        panic!("expected a tool result message");
    };
    assert!(result.content.contains("'missing' is not available"));
}

#[tokio::test]
async fn test_unparseable_arguments_are_recovered() {
    let provider = TestModelProvider::default();
    provider.push_text_reply(
        r#"{"tool_calls":[{"id":"c1","type":"function","function":{"name":"noop","arguments":"{broken"}}]}"#,
    );
    provider.push_text_reply("done");

    let (tool, log) = RecordingTool::new("noop");
    let mut registry = Registry::default();
    registry.add_tool(tool);

    let run = ToolLoopBuilder::with_model_provider(provider.clone())
        .with_registry(Arc::new(registry))
        .build()
        .run(user_turn("test"))
        .await
        .unwrap();

    assert_eq!(run.content, "done");
    assert!(log.lock().unwrap().is_empty());

    let messages = &provider.requests()[1].messages;
    let ChatMessage::Tool(result) = messages.last().unwrap() else {
        panic!("expected a tool result message");
    };
    assert!(result.content.contains("not a valid JSON object"));
}

#[tokio::test]
async fn test_tool_failure_is_recovered() {
    let provider = TestModelProvider::default();
    provider.push_text_reply(r#"<broken>{}</broken>"#);
    provider.push_text_reply("done");

    let mut registry = Registry::default();
    registry.add_tool(FailingTool);

    let run = ToolLoopBuilder::with_model_provider(provider.clone())
        .with_registry(Arc::new(registry))
        .build()
        .run(user_turn("test"))
        .await
        .unwrap();

    assert_eq!(run.content, "done");
    let messages = &provider.requests()[1].messages;
    let ChatMessage::Tool(result) = messages.last().unwrap() else {
        panic!("expected a tool result message");
    };
    assert!(result.content.contains("disk on fire"));
}

#[tokio::test]
async fn test_backend_error_is_fatal() {
    let err = ToolLoopBuilder::with_model_provider(TestModelProvider::default())
        .build()
        .run(user_turn("anyone there?"))
        .await
        .unwrap_err();
    assert!(matches!(err, LoopError::Backend(_)));
}

#[tokio::test]
async fn test_cancellation_before_first_exchange() {
    let provider = TestModelProvider::default();
    provider.push_text_reply("never sent");

    let token = CancellationToken::new();
    token.cancel();

    let err = ToolLoopBuilder::with_model_provider(provider.clone())
        .with_cancellation(token)
        .build()
        .run(user_turn("test"))
        .await
        .unwrap_err();

    assert!(matches!(err, LoopError::Cancelled));
    assert!(provider.requests().is_empty());
}

#[tokio::test]
async fn test_zero_max_iterations_is_a_config_error() {
    let err = ToolLoopBuilder::with_model_provider(TestModelProvider::default())
        .with_max_iterations(0)
        .build()
        .run(user_turn("test"))
        .await
        .unwrap_err();
    assert!(matches!(err, LoopError::Config(_)));
}

#[tokio::test]
async fn test_native_tool_calls_bypass_extraction() {
    let provider = TestModelProvider::default();
    provider.push_native_tool_reply(
        "",
        vec![ToolCall::from_raw_arguments("native_1", "noop", "{}")],
    );
    provider.push_text_reply("done");

    let (tool, log) = RecordingTool::new("noop");
    let mut registry = Registry::default();
    registry.add_tool(tool);

    let run = ToolLoopBuilder::with_model_provider(provider.clone())
        .with_registry(Arc::new(registry))
        .build()
        .run(user_turn("test"))
        .await
        .unwrap();

    assert_eq!(run.content, "done");
    assert_eq!(log.lock().unwrap().len(), 1);

    let messages = &provider.requests()[1].messages;
    let ChatMessage::Tool(result) = messages.last().unwrap() else {
        panic!("expected a tool result message");
    };
    assert_eq!(result.id, "native_1");
}

#[tokio::test]
async fn test_multiple_calls_run_in_resolver_order() {
    let provider = TestModelProvider::default();
    provider.push_text_reply(r#"<noop>{"n":1}</noop> <noop>{"n":2}</noop>"#);
    provider.push_text_reply("done");

    let (tool, log) = RecordingTool::new("noop");
    let mut registry = Registry::default();
    registry.add_tool(tool);

    ToolLoopBuilder::with_model_provider(provider.clone())
        .with_registry(Arc::new(registry))
        .build()
        .run(user_turn("test"))
        .await
        .unwrap();

    let log = log.lock().unwrap();
    assert_eq!(log.len(), 2);
    assert_eq!(log[0]["n"], 1);
    assert_eq!(log[1]["n"], 2);

    let messages = &provider.requests()[1].messages;
    let n = messages.len();
    let ChatMessage::Tool(first) = &messages[n - 2] else {
        panic!("expected a tool result message");
    };
    let ChatMessage::Tool(second) = &messages[n - 1] else {
        panic!("expected a tool result message");
    };
    assert_eq!(first.id, "call_tag_1");
    assert_eq!(second.id, "call_tag_2");
}

#[tokio::test]
async fn test_tool_instructions_are_seeded() {
    let provider = TestModelProvider::default();
    provider.push_text_reply("hello");

    let (tool, _log) = RecordingTool::new("noop");
    let mut registry = Registry::default();
    registry.add_tool(tool);

    ToolLoopBuilder::with_model_provider(provider.clone())
        .with_registry(Arc::new(registry))
        .build()
        .run(user_turn("hi"))
        .await
        .unwrap();

    let messages = &provider.requests()[0].messages;
    let ChatMessage::System(instructions) = &messages[0] else {
        panic!("expected seeded system instructions");
    };
    assert!(instructions.contains("## Available Tools"));
    assert!(instructions.contains("#### noop"));
}

#[tokio::test]
async fn test_no_instructions_without_tools() {
    let provider = TestModelProvider::default();
    provider.push_text_reply("hello");

    ToolLoopBuilder::with_model_provider(provider.clone())
        .build()
        .run(user_turn("hi"))
        .await
        .unwrap();

    let messages = &provider.requests()[0].messages;
    assert_eq!(messages, &user_turn("hi"));
}
