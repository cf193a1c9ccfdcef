//! Client for OpenAI compatible chat completion APIs with streaming
//! and tool calling support.
use std::{collections::HashMap, time::Duration};

use anyhow::{Error, Result, anyhow, bail};
use async_trait::async_trait;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::sync::mpsc;

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub enum Role {
    #[serde(rename = "system")]
    System,
    #[serde(rename = "assistant")]
    Assistant,
    #[serde(rename = "user")]
    User,
    #[serde(rename = "tool")]
    Tool,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct FunctionCallFn {
    pub arguments: String,
    pub name: String,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct FunctionCall {
    pub function: FunctionCallFn,
    pub id: String,
    pub r#type: String,
}

/// A message in the wire format the completions endpoint expects.
#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct Message {
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<FunctionCall>>,
}

impl Message {
    pub fn new(role: Role, content: &str) -> Self {
        Message {
            role,
            content: Some(content.to_string()),
            tool_call_id: None,
            tool_calls: None,
        }
    }

    pub fn new_tool_call_request(tool_calls: Vec<FunctionCall>) -> Self {
        Message {
            role: Role::Assistant,
            content: None,
            tool_call_id: None,
            tool_calls: Some(tool_calls),
        }
    }

    pub fn new_tool_call_response(content: &str, tool_call_id: &str) -> Self {
        Message {
            role: Role::Tool,
            content: Some(content.to_string()),
            tool_call_id: Some(tool_call_id.to_string()),
            tool_calls: None,
        }
    }
}

#[derive(Serialize)]
pub struct Property {
    pub r#type: String,
    pub description: String,
}

#[derive(Serialize)]
pub struct Parameters<Props: Serialize> {
    pub r#type: String,
    pub properties: Props,
    pub required: Vec<String>,
    #[serde(rename = "additionalProperties")]
    pub additional_properties: bool,
}

#[derive(Serialize)]
pub struct Function<Props: Serialize> {
    pub name: String,
    pub description: String,
    pub parameters: Parameters<Props>,
    pub strict: bool,
}

#[derive(Serialize)]
pub enum ToolType {
    #[serde(rename = "function")]
    Function,
}

// Trait objects passed to the completions API need to serialize into
// the tool schema, but `serde::Serialize` is not object safe. Using
// `erased_serde` here keeps the trait object safe while still letting
// `serde_json` serialize a collection of boxed tools.
#[async_trait]
pub trait ToolCall: erased_serde::Serialize {
    async fn call(&self, args: &str) -> Result<String, Error>;
    fn function_name(&self) -> String;
}
erased_serde::serialize_trait_object!(ToolCall);

pub type BoxedToolCall = Box<dyn ToolCall + Send + Sync + 'static>;

/// The next step in a chat once the model has responded: either plain
/// assistant text or a batch of tool calls that need to be run before
/// the chat can proceed.
#[derive(Debug, PartialEq)]
pub enum CompletionOutcome {
    Content(String),
    ToolCalls(Vec<FunctionCall>),
}

fn completions_url(api_hostname: &str) -> String {
    format!(
        "{}/v1/chat/completions",
        api_hostname.trim_end_matches("/")
    )
}

/// Request the next completion for `messages` without streaming.
pub async fn completion(
    messages: &[Message],
    tools: &Option<Vec<BoxedToolCall>>,
    api_hostname: &str,
    api_key: &str,
    model: &str,
) -> Result<CompletionOutcome, Error> {
    let mut payload = json!({
        "model": model,
        "messages": messages,
    });
    if let Some(tools) = tools {
        payload["tools"] = json!(tools);
    }

    let resp: Value = reqwest::Client::new()
        .post(completions_url(api_hostname))
        .bearer_auth(api_key)
        .header("Content-Type", "application/json")
        .timeout(Duration::from_secs(60 * 10))
        .json(&payload)
        .send()
        .await?
        .json()
        .await?;

    let message = &resp["choices"][0]["message"];

    if let Some(tool_calls) = message["tool_calls"].as_array() {
        if !tool_calls.is_empty() {
            let calls = tool_calls
                .iter()
                .map(|call| serde_json::from_value::<FunctionCall>(call.clone()))
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| anyhow!("Malformed tool call in response: {}", e))?;
            return Ok(CompletionOutcome::ToolCalls(calls));
        }
    }

    if let Some(content) = message["content"].as_str() {
        return Ok(CompletionOutcome::Content(content.to_string()));
    }

    bail!("No message received. Resp:\n\n{}", resp)
}

#[derive(Debug, Clone, Deserialize)]
struct FunctionInitDelta {
    name: String,
    arguments: String,
}

#[derive(Debug, Clone, Deserialize)]
struct FunctionArgsDelta {
    arguments: String,
}

// Streaming tool calls arrive as two slightly different delta shapes:
// an initial chunk carrying the call id and function name, then
// argument fragments keyed by index.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ToolCallChunk {
    Init {
        id: String,
        index: usize,
        function: FunctionInitDelta,
        r#type: String,
    },
    ArgsDelta {
        index: usize,
        function: FunctionArgsDelta,
    },
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Delta {
    Content { content: String },
    ToolCall { tool_calls: Vec<ToolCallChunk> },
    Stop {},
}

#[derive(Debug, Deserialize)]
struct CompletionChunkChoice {
    delta: Delta,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CompletionChunk {
    choices: Vec<CompletionChunkChoice>,
}

/// Request the next completion for `messages`, forwarding each raw
/// SSE data payload over `tx` as it arrives. Returns the assembled
/// outcome once the stream ends.
pub async fn completion_stream(
    tx: mpsc::UnboundedSender<String>,
    messages: &[Message],
    tools: &Option<Vec<BoxedToolCall>>,
    api_hostname: &str,
    api_key: &str,
    model: &str,
) -> Result<CompletionOutcome, Error> {
    let mut payload = json!({
        "model": model,
        "messages": messages,
        "stream": true,
    });
    if let Some(tools) = tools {
        payload["tools"] = json!(tools);
    }

    let response = reqwest::Client::new()
        .post(completions_url(api_hostname))
        .bearer_auth(api_key)
        .header("Content-Type", "application/json")
        .timeout(Duration::from_secs(60 * 5))
        .json(&payload)
        .send()
        .await?;

    let mut stream = response.bytes_stream();

    let mut content_buf = String::new();
    // Keyed by index so argument fragments land on the right call
    let mut tool_calls: HashMap<usize, FunctionCall> = HashMap::new();
    let mut buffer = String::new();

    'outer: while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        buffer.push_str(std::str::from_utf8(&chunk)?);

        // SSE events can be fragmented across HTTP/2 frames so only
        // process complete events from the buffer
        while let Some(event_end) = buffer.find("\n\n") {
            let event_data = buffer[..event_end].trim().to_string();
            buffer = buffer[event_end + 2..].to_string();

            if event_data.is_empty() || !event_data.starts_with("data: ") {
                continue;
            }

            let data = event_data[6..].trim();
            if data.is_empty() {
                continue;
            }

            // Forward the raw chunk to the receiver. A send failure
            // means the receiver hung up but the response should
            // still be assembled to completion.
            let _ = tx.send(data.to_string());

            if data == "[DONE]" {
                break 'outer;
            }

            let chunk = serde_json::from_str::<CompletionChunk>(data).inspect_err(|e| {
                tracing::error!("Parsing completion chunk failed for {}\nError: {}", data, e)
            })?;
            let choice = chunk
                .choices
                .first()
                .ok_or(anyhow!("Missing choices field"))?;

            match &choice.delta {
                Delta::Content { content } => {
                    content_buf += content;
                    if choice.finish_reason.is_some() {
                        break 'outer;
                    }
                }
                Delta::ToolCall {
                    tool_calls: deltas,
                } => {
                    for delta in deltas.iter() {
                        match delta {
                            ToolCallChunk::Init {
                                id,
                                index,
                                function,
                                r#type,
                            } => {
                                tool_calls.insert(
                                    *index,
                                    FunctionCall {
                                        id: id.clone(),
                                        r#type: r#type.clone(),
                                        function: FunctionCallFn {
                                            name: function.name.clone(),
                                            arguments: function.arguments.clone(),
                                        },
                                    },
                                );
                            }
                            ToolCallChunk::ArgsDelta { index, function } => {
                                tool_calls.entry(*index).and_modify(|call| {
                                    call.function.arguments += &function.arguments;
                                });
                            }
                        }
                    }
                    if choice.finish_reason.is_some() {
                        break 'outer;
                    }
                }
                Delta::Stop {} => {
                    break 'outer;
                }
            }
        }
    }

    if !tool_calls.is_empty() {
        let mut calls: Vec<(usize, FunctionCall)> = tool_calls.into_iter().collect();
        calls.sort_by_key(|(index, _)| *index);
        let calls = calls.into_iter().map(|(_, call)| call).collect();
        return Ok(CompletionOutcome::ToolCalls(calls));
    }

    Ok(CompletionOutcome::Content(content_buf))
}
