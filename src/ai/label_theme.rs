use std::time::Duration;

use async_openai::Client;
use async_openai::config::Config;
use async_openai::types::evals::InputTextContent;
use async_openai::types::responses::{
    CreateResponse, InputContent, InputItem, InputMessage, InputParam, InputRole, Item,
    MessageItem, OutputItem, OutputMessageContent, RefusalContent, ResponseFormatJsonSchema,
    ResponseTextParam, TextResponseFormatConfiguration, Truncation,
};
use futures::FutureExt;
use futures::future::BoxFuture;
use schemars::schema_for;
use tracing::{debug, error};

use super::parse_model_json;
use super::prompt::PromptTemplate;
use crate::AppResult;
use crate::classify::theme::ThemeLabel;
use crate::classify::traits::Labeler;
use crate::error::AppError;
use crate::feedback::ThemeCategory;

static LABEL_THEME_PROMPT: PromptTemplate =
    PromptTemplate::new(std::include_str!("prompts/label_theme_prompt.md"));

/// Labeler backed by an OpenAI-compatible Responses endpoint.
pub struct OAILabeler<'a, C: Config> {
    client: &'a Client<C>,
    model: String,
    timeout: Option<Duration>,
}

impl<'a, C: Config> OAILabeler<'a, C> {
    pub fn new(client: &'a Client<C>, model: String) -> Self {
        Self {
            client,
            model,
            timeout: None,
        }
    }

    /// Give up on a single labeling call after `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    fn response_format() -> ResponseFormatJsonSchema {
        ResponseFormatJsonSchema {
            description: Some("Theme label for a group of customer feedback".to_string()),
            schema: Some(schema_for!(ThemeLabel).as_value().to_owned()),
            name: "theme_label".to_string(),
            strict: None,
        }
    }

    #[tracing::instrument(
        name = "Generating a label for a feedback theme",
        level = "debug",
        skip(self, examples)
    )]
    async fn request_label(
        &self,
        examples: &[String],
        category: ThemeCategory,
    ) -> AppResult<ThemeLabel> {
        let count = examples.len().to_string();
        let category_name = category.to_string();
        let system_prompt =
            LABEL_THEME_PROMPT.render(&[("count", &count), ("category", &category_name)]);

        let input_items: Vec<InputItem> = vec![
            InputItem::Item(Item::Message(MessageItem::Input(InputMessage {
                content: vec![InputContent::InputText(InputTextContent {
                    text: serde_json::to_string_pretty(examples)?,
                })],
                role: InputRole::User,
                status: None,
            }))),
            InputItem::Item(Item::Message(MessageItem::Input(InputMessage {
                content: vec![InputContent::InputText(InputTextContent {
                    text: system_prompt.clone(),
                })],
                role: InputRole::System,
                status: None,
            }))),
        ];

        let request = CreateResponse {
            model: Some(self.model.clone()),
            input: InputParam::Items(input_items),
            background: Some(false),
            instructions: Some(system_prompt),
            store: Some(false),
            stream: Some(false),
            temperature: Some(0.1),
            text: Some(ResponseTextParam {
                format: TextResponseFormatConfiguration::JsonSchema(Self::response_format()),
                verbosity: None,
            }),
            top_p: Some(0.1),
            truncation: Some(Truncation::Disabled),
            ..Default::default()
        };

        let response = self.client.responses().create(request).await?;
        debug!("AI Response: {:?}", response);

        let mut response_content = String::new();
        for out in &response.output {
            if let OutputItem::Message(msg) = out {
                for content in &msg.content {
                    match content {
                        OutputMessageContent::OutputText(text) => {
                            response_content.push_str(&text.text)
                        }
                        OutputMessageContent::Refusal(RefusalContent { refusal }) => {
                            error!("AI refused prompt: {}", refusal);
                        }
                    }
                }
            }
        }
        if response_content.trim().is_empty() {
            return Err(AppError::Labeling("model returned no text".to_string()));
        }

        parse_model_json::<ThemeLabel>("theme label", &response_content)?.validate()
    }
}

impl<'a, C: Config> Labeler for OAILabeler<'a, C> {
    fn label<'l>(
        &'l self,
        examples: &'l [String],
        category: ThemeCategory,
    ) -> BoxFuture<'l, AppResult<ThemeLabel>> {
        async move {
            match self.timeout {
                Some(limit) => {
                    tokio::time::timeout(limit, self.request_label(examples, category)).await?
                }
                None => self.request_label(examples, category).await,
            }
        }
        .boxed()
    }
}
