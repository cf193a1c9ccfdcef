pub mod notes;
pub use notes::CreateNoteTool;

pub mod weather;
pub use weather::DisplayWeatherTool;

use crate::openai::BoxedToolCall;

/// The default tool set offered to the model.
pub fn default_tools() -> Vec<BoxedToolCall> {
    vec![
        Box::new(DisplayWeatherTool::new()),
        Box::new(CreateNoteTool::new()),
    ]
}
