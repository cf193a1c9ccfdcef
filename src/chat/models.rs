//! The core models for a chat transcript that carries tool
//! invocations alongside message text.
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq)]
pub enum MessageRole {
    #[serde(rename = "user")]
    User,
    #[serde(rename = "assistant")]
    Assistant,
}

/// Lifecycle of a tool invocation. Transitions `Pending` to
/// `Result` exactly once and never reverses.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(tag = "state", content = "result", rename_all = "camelCase")]
pub enum InvocationState {
    Pending,
    Result(Value),
}

/// A single tool call made by the model, identified by the call id
/// assigned by the completions API.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ToolInvocation {
    pub id: String,
    pub tool_name: String,
    /// Raw JSON arguments the model supplied, kept so the transcript
    /// can be resubmitted to the completions API on later turns.
    #[serde(default)]
    pub args: String,
    #[serde(flatten)]
    pub state: InvocationState,
}

impl ToolInvocation {
    pub fn pending(id: &str, tool_name: &str, args: &str) -> Self {
        Self {
            id: id.to_string(),
            tool_name: tool_name.to_string(),
            args: args.to_string(),
            state: InvocationState::Pending,
        }
    }

    /// Record the result for a pending invocation. Resolving an
    /// already resolved invocation is a no-op.
    pub fn resolve(&mut self, result: Value) {
        if self.state == InvocationState::Pending {
            self.state = InvocationState::Result(result);
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self.state, InvocationState::Result(_))
    }

    pub fn result(&self) -> Option<&Value> {
        match &self.state {
            InvocationState::Result(value) => Some(value),
            InvocationState::Pending => None,
        }
    }
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct ChatMessage {
    pub id: String,
    pub role: MessageRole,
    pub text: String,
    pub invocations: Vec<ToolInvocation>,
}

impl ChatMessage {
    pub fn new(role: MessageRole, text: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            text: text.to_string(),
            invocations: Vec::new(),
        }
    }
}

/// An append-only ordered sequence of chat messages. The only
/// mutation besides appending is deleting individual invocations.
#[derive(Clone, Default, Serialize, Deserialize, Debug, PartialEq)]
pub struct Transcript(Vec<ChatMessage>);

impl Transcript {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn new_with_messages(messages: Vec<ChatMessage>) -> Self {
        Self(messages)
    }

    pub fn push(&mut self, msg: ChatMessage) {
        self.0.push(msg)
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ChatMessage> {
        self.0.iter()
    }

    /// All invocations that have reached a result, in document order.
    pub fn resolved_invocations(&self) -> impl Iterator<Item = &ToolInvocation> {
        self.0
            .iter()
            .flat_map(|msg| msg.invocations.iter())
            .filter(|inv| inv.is_resolved())
    }

    pub fn find_invocation(&self, id: &str) -> Option<&ToolInvocation> {
        self.0
            .iter()
            .flat_map(|msg| msg.invocations.iter())
            .find(|inv| inv.id == id)
    }

    /// Strip an invocation from its owning message. Unknown ids are a
    /// no-op so deletion stays idempotent.
    pub fn remove_invocation(&mut self, id: &str) {
        for msg in self.0.iter_mut() {
            msg.invocations.retain(|inv| inv.id != id);
        }
    }
}
