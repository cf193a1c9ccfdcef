use anyhow::{Error, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::openai::{Function, Parameters, Property, ToolCall, ToolType};

#[derive(Serialize)]
pub struct CreateNoteProps {
    pub content: Property,
}

#[derive(Deserialize)]
pub struct CreateNoteArgs {
    pub content: String,
}

/// Demo note creation. Notes live only as card payloads; nothing is
/// written anywhere.
#[derive(Serialize)]
pub struct CreateNoteTool {
    pub r#type: ToolType,
    pub function: Function<CreateNoteProps>,
}

#[async_trait]
impl ToolCall for CreateNoteTool {
    async fn call(&self, args: &str) -> Result<String, Error> {
        let args: CreateNoteArgs = serde_json::from_str(args)?;

        let result = json!({
            "content": args.content,
            "createdAt": Utc::now().to_rfc3339(),
        });

        Ok(result.to_string())
    }

    fn function_name(&self) -> String {
        self.function.name.clone()
    }
}

impl CreateNoteTool {
    pub fn new() -> Self {
        let function = Function {
            name: String::from("createNote"),
            description: String::from("Create a note with AI-generated content"),
            parameters: Parameters {
                r#type: String::from("object"),
                properties: CreateNoteProps {
                    content: Property {
                        r#type: String::from("string"),
                        description: String::from(
                            "The AI-generated content to display in the note",
                        ),
                    },
                },
                required: vec![String::from("content")],
                additional_properties: false,
            },
            strict: true,
        };
        Self {
            r#type: ToolType::Function,
            function,
        }
    }
}

impl Default for CreateNoteTool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;
    use serde_json::Value;

    #[tokio::test]
    async fn it_creates_a_note_with_timestamp() {
        let tool = CreateNoteTool::new();
        let result = tool.call(r#"{"content":"Buy milk"}"#).await.unwrap();

        let payload: Value = serde_json::from_str(&result).unwrap();
        assert_eq!(payload["content"], "Buy milk");

        let created_at = payload["createdAt"].as_str().unwrap();
        assert!(DateTime::parse_from_rfc3339(created_at).is_ok());
    }

    #[tokio::test]
    async fn it_rejects_malformed_args() {
        let tool = CreateNoteTool::new();
        let result = tool.call(r#"{"text":"Buy milk"}"#).await;
        assert!(result.is_err());
    }

    #[test]
    fn test_function_name() {
        let tool = CreateNoteTool::default();
        assert_eq!(tool.function_name(), "createNote");
    }
}
