//! Image generation tool

use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde_json::{json, Value};

use crate::types::{CapabilityKind, LlmConfig, Tool, ToolDefinition, ToolResponse};

use super::error::{ToolError, ToolResult};

pub const IMAGE_GENERATION_TOOL_NAME: &str = "run_image_generation";
pub const IMAGE_GENERATION_TOOL_DESCRIPTION: &str = "Generate an image from a prompt.";
pub const IMAGE_GENERATION_RESPONSE_ID: &str = "image_generation_response";

const OPENAI_API_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_AZURE_API_VERSION: &str = "2024-02-01";

/// Requested image shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageShape {
    Square,
    Portrait,
    Landscape,
}

impl ImageShape {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "square" => Some(ImageShape::Square),
            "portrait" => Some(ImageShape::Portrait),
            "landscape" => Some(ImageShape::Landscape),
            _ => None,
        }
    }

    pub fn size(&self) -> &'static str {
        match self {
            ImageShape::Square => "1024x1024",
            ImageShape::Portrait => "1024x1792",
            ImageShape::Landscape => "1792x1024",
        }
    }
}

/// Generates images with resolved provider credentials
pub struct ImageGenerationTool {
    api_key: String,
    api_base: Option<String>,
    api_version: Option<String>,
    model: String,
    additional_headers: BTreeMap<String, String>,
    client: reqwest::Client,
}

impl ImageGenerationTool {
    /// Build from resolved credentials; the key must be present
    pub fn new(
        credentials: LlmConfig,
        additional_headers: BTreeMap<String, String>,
        client: reqwest::Client,
    ) -> ToolResult<Self> {
        let api_key = credentials
            .usable_api_key()
            .map(str::to_string)
            .ok_or_else(|| ToolError::configuration("Image generation tool requires an API key"))?;

        Ok(Self {
            api_key,
            api_base: credentials.api_base,
            api_version: credentials.api_version,
            model: credentials.model_name,
            additional_headers,
            client,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn azure_deployment(&self) -> Option<&str> {
        self.model.strip_prefix("azure/")
    }

    fn headers(&self) -> ToolResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        for (key, value) in &self.additional_headers {
            let name = HeaderName::from_bytes(key.as_bytes())
                .map_err(|e| ToolError::configuration(format!("Invalid header name {}: {}", key, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| ToolError::configuration(format!("Invalid header value for {}: {}", key, e)))?;
            headers.insert(name, value);
        }

        let auth = if self.azure_deployment().is_some() {
            (HeaderName::from_static("api-key"), self.api_key.clone())
        } else {
            (AUTHORIZATION, format!("Bearer {}", self.api_key))
        };
        let value = HeaderValue::from_str(&auth.1)
            .map_err(|_| ToolError::configuration("API key contains invalid header characters"))?;
        headers.insert(auth.0, value);
        Ok(headers)
    }

    /// Build the HTTP request for a prompt without sending it
    pub fn build_request(&self, prompt: &str, shape: ImageShape) -> ToolResult<reqwest::Request> {
        let (url, body) = match self.azure_deployment() {
            Some(deployment) => {
                let base = self.api_base.as_deref().ok_or_else(|| {
                    ToolError::configuration("Azure image generation requires an API base")
                })?;
                let version = self.api_version.as_deref().unwrap_or(DEFAULT_AZURE_API_VERSION);
                (
                    format!(
                        "{}/openai/deployments/{}/images/generations?api-version={}",
                        base.trim_end_matches('/'),
                        deployment,
                        version
                    ),
                    json!({ "prompt": prompt, "n": 1, "size": shape.size() }),
                )
            }
            None => {
                let base = self.api_base.as_deref().unwrap_or(OPENAI_API_BASE);
                (
                    format!("{}/images/generations", base.trim_end_matches('/')),
                    json!({ "model": self.model, "prompt": prompt, "n": 1, "size": shape.size() }),
                )
            }
        };

        Ok(self
            .client
            .post(url)
            .headers(self.headers()?)
            .json(&body)
            .build()?)
    }
}

#[async_trait]
impl Tool for ImageGenerationTool {
    fn name(&self) -> &str {
        IMAGE_GENERATION_TOOL_NAME
    }

    fn description(&self) -> &str {
        IMAGE_GENERATION_TOOL_DESCRIPTION
    }

    fn kind(&self) -> CapabilityKind {
        CapabilityKind::ImageGeneration
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            IMAGE_GENERATION_TOOL_NAME,
            IMAGE_GENERATION_TOOL_DESCRIPTION,
            json!({
                "type": "object",
                "properties": {
                    "prompt": {
                        "type": "string",
                        "description": "Prompt used to generate the image"
                    },
                    "shape": {
                        "type": "string",
                        "description": "Optional image shape",
                        "enum": ["square", "portrait", "landscape"]
                    }
                },
                "required": ["prompt"]
            }),
        )
    }

    async fn run(&self, args: Value) -> ToolResult<Vec<ToolResponse>> {
        let prompt = args
            .get("prompt")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::invalid_arguments(IMAGE_GENERATION_TOOL_NAME, "missing string field `prompt`"))?;
        let shape = match args.get("shape").and_then(Value::as_str) {
            Some(raw) => ImageShape::parse(raw).ok_or_else(|| {
                ToolError::invalid_arguments(IMAGE_GENERATION_TOOL_NAME, format!("unknown shape `{}`", raw))
            })?,
            None => ImageShape::Square,
        };

        let request = self.build_request(prompt, shape)?;
        let response = self.client.execute(request).await?.error_for_status()?;
        let body: Value = response.json().await?;
        let urls: Vec<Value> = body["data"]
            .as_array()
            .map(|items| items.iter().filter_map(|i| i.get("url").cloned()).collect())
            .unwrap_or_default();

        Ok(vec![ToolResponse::new(
            IMAGE_GENERATION_RESPONSE_ID,
            json!({ "prompt": prompt, "urls": urls }),
        )])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn openai_credentials() -> LlmConfig {
        LlmConfig::new("openai", "dall-e-3", 128_000).with_api_key("sk-img")
    }

    #[test]
    fn test_requires_key() {
        let config = LlmConfig::new("openai", "dall-e-3", 128_000);
        assert!(matches!(
            ImageGenerationTool::new(config, BTreeMap::new(), reqwest::Client::new()),
            Err(ToolError::Configuration(_))
        ));
    }

    #[test]
    fn test_openai_request() {
        let mut extra = BTreeMap::new();
        extra.insert("X-Trace".to_string(), "abc".to_string());
        let tool = ImageGenerationTool::new(openai_credentials(), extra, reqwest::Client::new()).unwrap();

        let request = tool.build_request("a red fox", ImageShape::Landscape).unwrap();
        assert_eq!(request.url().as_str(), "https://api.openai.com/v1/images/generations");
        assert_eq!(request.headers()[AUTHORIZATION], "Bearer sk-img");
        assert_eq!(request.headers()["x-trace"], "abc");
        let body: Value = serde_json::from_slice(request.body().unwrap().as_bytes().unwrap()).unwrap();
        assert_eq!(body["model"], "dall-e-3");
        assert_eq!(body["size"], "1792x1024");
    }

    #[test]
    fn test_azure_request() {
        let credentials = LlmConfig::new("azure", "azure/dalle3", 64_000)
            .with_api_key("az-key")
            .with_api_base("https://img.azure.example/")
            .with_api_version("2024-05-01");
        let tool = ImageGenerationTool::new(credentials, BTreeMap::new(), reqwest::Client::new()).unwrap();

        let request = tool.build_request("a lighthouse", ImageShape::Square).unwrap();
        assert_eq!(
            request.url().as_str(),
            "https://img.azure.example/openai/deployments/dalle3/images/generations?api-version=2024-05-01"
        );
        assert_eq!(request.headers()["api-key"], "az-key");
        assert!(request.headers().get(AUTHORIZATION).is_none());
    }

    #[test]
    fn test_shape_parse() {
        assert_eq!(ImageShape::parse("portrait"), Some(ImageShape::Portrait));
        assert_eq!(ImageShape::parse("round"), None);
    }
}
