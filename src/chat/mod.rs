pub mod core;
pub mod models;

pub use self::core::{Chat, ChatBuilder};
pub use models::{ChatMessage, InvocationState, MessageRole, ToolInvocation, Transcript};
