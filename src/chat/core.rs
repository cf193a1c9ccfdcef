//! The core abstraction around interacting with an LLM in a chat
//! completion style using an OpenAI compatible API.
use anyhow::{Error, Result};
use serde_json::{Value, json};
use tokio::sync::mpsc;

use super::models::{ChatMessage, MessageRole, ToolInvocation, Transcript};
use crate::openai::{
    BoxedToolCall, CompletionOutcome, FunctionCall, Message, Role, completion, completion_stream,
};

/// Drives a chat turn against the completions API: records tool
/// calls as invocations on the transcript, executes the matching
/// tools, and hands the results back to the model until it responds
/// with plain text.
///
/// Use `Chat::builder()` to construct a valid `Chat`.
pub struct Chat {
    api_hostname: String,
    api_key: String,
    model: String,
    system_message: Option<String>,
    streaming: bool,
    tx: Option<mpsc::UnboundedSender<String>>,
    tools: Option<Vec<BoxedToolCall>>,
    transcript: Transcript,
}

impl Chat {
    pub fn builder(api_hostname: &str, api_key: &str, model: &str) -> ChatBuilder {
        ChatBuilder::new(api_hostname, api_key, model)
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn transcript_mut(&mut self) -> &mut Transcript {
        &mut self.transcript
    }

    /// Runs the next turn in the chat. Appends the user message and
    /// every generated assistant message (including tool invocation
    /// records) to the transcript, returning the new messages.
    pub async fn next_msg(&mut self, text: &str) -> Result<Vec<ChatMessage>, Error> {
        self.transcript.push(ChatMessage::new(MessageRole::User, text));

        let mut history = self.wire_history();
        let mut new_messages = Vec::new();

        loop {
            let outcome = if self.streaming {
                // ChatBuilder enforces that `streaming` and `tx` are
                // always set together
                let tx = self.tx.clone().unwrap();
                completion_stream(
                    tx,
                    &history,
                    &self.tools,
                    &self.api_hostname,
                    &self.api_key,
                    &self.model,
                )
                .await?
            } else {
                completion(
                    &history,
                    &self.tools,
                    &self.api_hostname,
                    &self.api_key,
                    &self.model,
                )
                .await?
            };

            match outcome {
                CompletionOutcome::ToolCalls(calls) => {
                    let msg = self.handle_tool_calls(&calls, &mut history).await?;
                    new_messages.push(msg.clone());
                    self.transcript.push(msg);
                }
                CompletionOutcome::Content(content) => {
                    let msg = ChatMessage::new(MessageRole::Assistant, &content);
                    new_messages.push(msg.clone());
                    self.transcript.push(msg);
                    break;
                }
            }
        }

        Ok(new_messages)
    }

    /// Run a batch of tool calls, producing an assistant message that
    /// carries one resolved invocation per call. The wire history is
    /// extended with the request and response messages the API
    /// expects before the next completion.
    async fn handle_tool_calls(
        &self,
        calls: &[FunctionCall],
        history: &mut Vec<Message>,
    ) -> Result<ChatMessage, Error> {
        let mut msg = ChatMessage::new(MessageRole::Assistant, "");

        history.push(Message::new_tool_call_request(calls.to_vec()));

        for call in calls {
            let name = &call.function.name;
            let args = &call.function.arguments;
            tracing::debug!("Tool call: {} args: {}", name, args);

            let mut invocation = ToolInvocation::pending(&call.id, name, args);

            let result = match self.find_tool(name) {
                Some(tool) => {
                    let raw = tool.call(args).await?;
                    // Tool output is opaque; structured payloads pass
                    // through as JSON, anything else as a string
                    serde_json::from_str::<Value>(&raw).unwrap_or(Value::String(raw))
                }
                None => {
                    // An unknown tool name is not an error: resolve
                    // with a degraded payload and let the model carry
                    // on without it
                    tracing::debug!("Ignoring unknown tool: {}", name);
                    json!({"error": format!("Unknown tool: {}", name)})
                }
            };

            history.push(Message::new_tool_call_response(
                &result.to_string(),
                &call.id,
            ));

            invocation.resolve(result);
            self.send_invocation_event(&invocation);
            msg.invocations.push(invocation);
        }

        Ok(msg)
    }

    fn find_tool(&self, name: &str) -> Option<&BoxedToolCall> {
        self.tools
            .as_ref()
            .and_then(|tools| tools.iter().find(|t| t.function_name() == name))
    }

    /// Forward a resolved invocation over the streaming channel so a
    /// client can project it without re-fetching the transcript.
    fn send_invocation_event(&self, invocation: &ToolInvocation) {
        if let Some(tx) = &self.tx {
            let event = json!({
                "type": "tool-invocation",
                "invocation": invocation,
            });
            let _ = tx.send(event.to_string());
        }
    }

    /// Flatten the transcript into the wire format the completions
    /// API expects, replaying tool invocations as request/response
    /// message pairs.
    fn wire_history(&self) -> Vec<Message> {
        let mut history = Vec::new();

        if let Some(system_message) = &self.system_message {
            history.push(Message::new(Role::System, system_message));
        }

        for msg in self.transcript.iter() {
            match msg.role {
                MessageRole::User => {
                    history.push(Message::new(Role::User, &msg.text));
                }
                MessageRole::Assistant => {
                    if !msg.invocations.is_empty() {
                        let calls = msg
                            .invocations
                            .iter()
                            .map(|inv| FunctionCall {
                                id: inv.id.clone(),
                                r#type: String::from("function"),
                                function: crate::openai::FunctionCallFn {
                                    name: inv.tool_name.clone(),
                                    arguments: inv.args.clone(),
                                },
                            })
                            .collect();
                        history.push(Message::new_tool_call_request(calls));
                        for inv in msg.invocations.iter() {
                            let content = inv
                                .result()
                                .map(|v| v.to_string())
                                .unwrap_or_else(|| String::from("null"));
                            history.push(Message::new_tool_call_response(&content, &inv.id));
                        }
                    }
                    if !msg.text.is_empty() {
                        history.push(Message::new(Role::Assistant, &msg.text));
                    }
                }
            }
        }

        history
    }
}

#[derive(Default)]
pub struct ChatBuilder {
    api_hostname: String,
    api_key: String,
    model: String,
    system_message: Option<String>,
    streaming: bool,
    tx: Option<mpsc::UnboundedSender<String>>,
    tools: Option<Vec<BoxedToolCall>>,
    transcript: Transcript,
}

impl ChatBuilder {
    pub fn new(api_hostname: &str, api_key: &str, model: &str) -> Self {
        Self {
            api_hostname: api_hostname.to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            system_message: None,
            streaming: false,
            tx: None,
            tools: None,
            transcript: Transcript::new(),
        }
    }

    pub fn build(self) -> Chat {
        Chat {
            api_hostname: self.api_hostname,
            api_key: self.api_key,
            model: self.model,
            system_message: self.system_message,
            streaming: self.streaming,
            tx: self.tx,
            tools: self.tools,
            transcript: self.transcript,
        }
    }

    pub fn system_message(mut self, message: &str) -> Self {
        self.system_message = Some(message.to_string());
        self
    }

    pub fn transcript(mut self, transcript: Transcript) -> Self {
        self.transcript = transcript;
        self
    }

    pub fn streaming(mut self, transmitter: mpsc::UnboundedSender<String>) -> Self {
        // Set the streaming flag and the transmitter together
        self.streaming = true;
        self.tx = Some(transmitter);
        self
    }

    pub fn tools(mut self, tools: Vec<BoxedToolCall>) -> Self {
        self.tools = Some(tools);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::models::InvocationState;
    use crate::openai::ToolCall;
    use async_trait::async_trait;

    #[derive(serde::Serialize)]
    struct MockWeatherTool;

    #[async_trait]
    impl ToolCall for MockWeatherTool {
        async fn call(&self, _args: &str) -> Result<String, Error> {
            Ok(r#"{"weather":"Sunny","temperature":75,"location":"Paris"}"#.to_string())
        }
        fn function_name(&self) -> String {
            "displayWeather".to_string()
        }
    }

    #[test]
    fn test_builder_defaults() {
        let builder = ChatBuilder::new("https://api.example.com", "test-key", "gpt-4");

        assert_eq!(builder.api_hostname, "https://api.example.com");
        assert_eq!(builder.api_key, "test-key");
        assert_eq!(builder.model, "gpt-4");
        assert!(builder.system_message.is_none());
        assert!(builder.tools.is_none());
        assert!(!builder.streaming);
        assert!(builder.tx.is_none());
        assert!(builder.transcript.is_empty());
    }

    #[test]
    fn test_builder_chaining() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut transcript = Transcript::new();
        transcript.push(ChatMessage::new(MessageRole::User, "Hello"));

        let chat = ChatBuilder::new("https://api.example.com", "test-key", "gpt-4")
            .system_message("You are a helpful assistant.")
            .transcript(transcript)
            .streaming(tx)
            .tools(vec![Box::new(MockWeatherTool) as BoxedToolCall])
            .build();

        assert_eq!(chat.system_message.as_deref(), Some("You are a helpful assistant."));
        assert_eq!(chat.transcript.messages().len(), 1);
        assert!(chat.streaming);
        assert!(chat.tx.is_some());
        assert!(chat.tools.is_some());
    }

    #[test]
    fn test_wire_history_replays_invocations() {
        let mut transcript = Transcript::new();
        transcript.push(ChatMessage::new(MessageRole::User, "Weather in Paris?"));
        let mut reply = ChatMessage::new(MessageRole::Assistant, "");
        let mut inv =
            ToolInvocation::pending("call_1", "displayWeather", r#"{"location":"Paris"}"#);
        inv.resolve(serde_json::json!({"weather": "Sunny"}));
        reply.invocations.push(inv);
        transcript.push(reply);
        transcript.push(ChatMessage::new(MessageRole::Assistant, "It is sunny."));

        let chat = ChatBuilder::new("https://api.example.com", "test-key", "gpt-4")
            .system_message("Be brief.")
            .transcript(transcript)
            .build();

        let history = chat.wire_history();
        // System, user, tool call request, tool call response, assistant
        assert_eq!(history.len(), 5);
        assert_eq!(history[0].role, Role::System);
        assert_eq!(history[1].role, Role::User);
        assert!(history[2].tool_calls.is_some());
        assert_eq!(history[3].tool_call_id.as_deref(), Some("call_1"));
        assert_eq!(history[4].content.as_deref(), Some("It is sunny."));
    }

    #[tokio::test]
    async fn test_chat_basic_response() {
        let mut server = mockito::Server::new_async().await;

        let response_body = r#"{
            "id": "chatcmpl-123",
            "object": "chat.completion",
            "created": 1694268190,
            "model": "gpt-4",
            "choices": [{
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": "Hello! How can I help you today?"
                },
                "finish_reason": "stop"
            }]
        }"#;

        let _mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(response_body)
            .create();

        let url = server.url();
        let mut chat = ChatBuilder::new(&url, "test-key", "gpt-4").build();

        let messages = chat.next_msg("Hi").await.unwrap();

        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, MessageRole::Assistant);
        assert_eq!(messages[0].text, "Hello! How can I help you today?");
        // Transcript now holds the user message and the reply
        assert_eq!(chat.transcript().messages().len(), 2);
    }

    #[tokio::test]
    async fn test_chat_records_tool_invocations() {
        let mut server = mockito::Server::new_async().await;

        let tool_call_response = r#"{
            "id": "chatcmpl-123",
            "object": "chat.completion",
            "created": 1694268190,
            "model": "gpt-4",
            "choices": [{
                "index": 0,
                "message": {
                    "role": "assistant",
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {
                            "name": "displayWeather",
                            "arguments": "{\"location\":\"Paris\"}"
                        }
                    }]
                },
                "finish_reason": "tool_calls"
            }]
        }"#;

        let final_response = r#"{
            "id": "chatcmpl-124",
            "object": "chat.completion",
            "created": 1694268191,
            "model": "gpt-4",
            "choices": [{
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": "It's sunny in Paris."
                },
                "finish_reason": "stop"
            }]
        }"#;

        let mock1 = server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(tool_call_response)
            .create();

        let mock2 = server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(final_response)
            .create();

        let url = server.url();
        let mut chat = ChatBuilder::new(&url, "test-key", "gpt-4")
            .tools(vec![Box::new(MockWeatherTool) as BoxedToolCall])
            .build();

        let messages = chat.next_msg("Weather in Paris?").await.unwrap();

        mock1.assert();
        mock2.assert();

        // One message carrying the invocation, then the final text
        assert_eq!(messages.len(), 2);
        let invocations = &messages[0].invocations;
        assert_eq!(invocations.len(), 1);
        assert_eq!(invocations[0].id, "call_1");
        assert_eq!(invocations[0].tool_name, "displayWeather");
        assert_eq!(
            invocations[0].state,
            InvocationState::Result(
                serde_json::json!({"weather": "Sunny", "temperature": 75, "location": "Paris"})
            )
        );
        assert_eq!(messages[1].text, "It's sunny in Paris.");
    }

    #[tokio::test]
    async fn test_chat_unknown_tool_degrades() {
        let mut server = mockito::Server::new_async().await;

        let tool_call_response = r#"{
            "id": "chatcmpl-123",
            "object": "chat.completion",
            "created": 1694268190,
            "model": "gpt-4",
            "choices": [{
                "index": 0,
                "message": {
                    "role": "assistant",
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {
                            "name": "unknownTool",
                            "arguments": "{}"
                        }
                    }]
                },
                "finish_reason": "tool_calls"
            }]
        }"#;

        let final_response = r#"{
            "id": "chatcmpl-124",
            "object": "chat.completion",
            "created": 1694268191,
            "model": "gpt-4",
            "choices": [{
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": "Sorry, I can't do that."
                },
                "finish_reason": "stop"
            }]
        }"#;

        let _mock1 = server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(tool_call_response)
            .create();

        let _mock2 = server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(final_response)
            .create();

        let url = server.url();
        let mut chat = ChatBuilder::new(&url, "test-key", "gpt-4")
            .tools(vec![Box::new(MockWeatherTool) as BoxedToolCall])
            .build();

        // The unknown tool must not error out the turn
        let messages = chat.next_msg("Do something weird").await.unwrap();

        assert_eq!(messages.len(), 2);
        let invocation = &messages[0].invocations[0];
        assert_eq!(invocation.tool_name, "unknownTool");
        assert!(invocation.is_resolved());
        assert!(
            invocation.result().unwrap()["error"]
                .as_str()
                .unwrap()
                .contains("Unknown tool")
        );
    }

    #[tokio::test]
    async fn test_chat_stream_emits_invocation_events() {
        let mut server = mockito::Server::new_async().await;

        let sse_tool_call = "data: {\"choices\":[{\"index\":0,\"delta\":{\"tool_calls\":[{\"id\":\"call_1\",\"index\":0,\"function\":{\"name\":\"displayWeather\",\"arguments\":\"{\\\"location\\\":\\\"Paris\\\"}\"},\"type\":\"function\"}]},\"finish_reason\":null}]}\n\ndata: [DONE]\n\n";
        let sse_final = "data: {\"choices\":[{\"index\":0,\"delta\":{\"content\":\"It's sunny.\"},\"finish_reason\":null}]}\n\ndata: [DONE]\n\n";

        let _mock1 = server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_header("content-type", "text/event-stream")
            .with_body(sse_tool_call)
            .create();

        let _mock2 = server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_header("content-type", "text/event-stream")
            .with_body(sse_final)
            .create();

        let url = server.url();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut chat = ChatBuilder::new(&url, "test-key", "gpt-4")
            .streaming(tx)
            .tools(vec![Box::new(MockWeatherTool) as BoxedToolCall])
            .build();

        let messages = chat.next_msg("Weather in Paris?").await.unwrap();
        assert_eq!(messages.len(), 2);

        // The channel sees the raw chunks plus a tool-invocation event
        let mut saw_invocation_event = false;
        while let Ok(chunk) = rx.try_recv() {
            if let Ok(value) = serde_json::from_str::<serde_json::Value>(&chunk) {
                if value["type"] == "tool-invocation" {
                    assert_eq!(value["invocation"]["id"], "call_1");
                    assert_eq!(value["invocation"]["state"], "result");
                    saw_invocation_event = true;
                }
            }
        }
        assert!(saw_invocation_event);
    }
}
