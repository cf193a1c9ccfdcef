use anyhow::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::openai::{Function, Parameters, Property, ToolCall, ToolType};

#[derive(Serialize)]
pub struct DisplayWeatherProps {
    pub location: Property,
}

#[derive(Deserialize)]
pub struct DisplayWeatherArgs {
    pub location: String,
}

/// Demo weather lookup. The forecast is canned; only the location
/// flows through from the model's arguments.
#[derive(Serialize)]
pub struct DisplayWeatherTool {
    pub r#type: ToolType,
    pub function: Function<DisplayWeatherProps>,
}

#[async_trait]
impl ToolCall for DisplayWeatherTool {
    async fn call(&self, args: &str) -> Result<String, Error> {
        let args: DisplayWeatherArgs = serde_json::from_str(args)?;

        let result = json!({
            "weather": "Sunny",
            "temperature": 75,
            "location": args.location,
        });

        Ok(result.to_string())
    }

    fn function_name(&self) -> String {
        self.function.name.clone()
    }
}

impl DisplayWeatherTool {
    pub fn new() -> Self {
        let function = Function {
            name: String::from("displayWeather"),
            description: String::from("Display the weather for a location"),
            parameters: Parameters {
                r#type: String::from("object"),
                properties: DisplayWeatherProps {
                    location: Property {
                        r#type: String::from("string"),
                        description: String::from("The location to get the weather for"),
                    },
                },
                required: vec![String::from("location")],
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

impl Default for DisplayWeatherTool {
    fn default() -> Self {
        Self::new()
    }
}
