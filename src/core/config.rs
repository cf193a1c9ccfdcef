use std::env;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub openai_api_hostname: String,
    pub openai_api_key: String,
    pub openai_model: String,
    pub system_message: String,
    pub web_ui_path: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        let openai_api_hostname = env::var("CARDBOARD_LLM_HOST")
            .unwrap_or_else(|_| "https://api.openai.com".to_string());
        let openai_api_key =
            env::var("OPENAI_API_KEY").unwrap_or_else(|_| "thiswontworkforopenai".to_string());
        let openai_model =
            env::var("CARDBOARD_LLM_MODEL").unwrap_or_else(|_| "gpt-4.1-mini".to_string());
        let system_message = env::var("CARDBOARD_SYSTEM_MESSAGE").unwrap_or_else(|_| {
            "You are a helpful assistant. Use the displayWeather and createNote \
             tools to place cards on the user's workspace when asked."
                .to_string()
        });
        let web_ui_path =
            env::var("CARDBOARD_WEB_UI_PATH").unwrap_or_else(|_| "./web-ui".to_string());

        Self {
            openai_api_hostname,
            openai_api_key,
            openai_model,
            system_message,
            web_ui_path,
        }
    }
}
