//! Custom tools built from OpenAPI 3 documents
//!
//! Each operation in a declaration's schema becomes one callable tool. The
//! tool closes over the server URL, the merged header set and the chat
//! correlation ids substituted into the schema, so later calls need no
//! further lookups.

use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::config::CustomToolConfig;
use crate::logging::SharedLogger;
use crate::log_warn;
use crate::types::{CapabilityKind, HeaderItem, Tool, ToolDefinition, ToolResponse};

use super::error::{ToolError, ToolResult};

/// Replaced with the chat session id before the schema is parsed
pub const CHAT_SESSION_ID_PLACEHOLDER: &str = "CHAT_SESSION_ID";
/// Replaced with the message id before the schema is parsed
pub const MESSAGE_ID_PLACEHOLDER: &str = "MESSAGE_ID";
pub const CUSTOM_TOOL_RESPONSE_ID: &str = "custom_tool_response";
/// Argument name carrying the JSON request body
pub const REQUEST_BODY: &str = "requestBody";

const HTTP_METHODS: [&str; 8] = ["get", "put", "post", "delete", "options", "head", "patch", "trace"];
const PATH_ITEM_FIELDS: [&str; 5] = ["summary", "description", "parameters", "servers", "$ref"];

/// Per-call values substituted into a schema
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DynamicSchemaInfo {
    pub chat_session_id: Option<Uuid>,
    pub message_id: Option<i64>,
}

impl From<&CustomToolConfig> for DynamicSchemaInfo {
    fn from(config: &CustomToolConfig) -> Self {
        Self {
            chat_session_id: config.chat_session_id,
            message_id: config.message_id,
        }
    }
}

/// Substitute correlation placeholders in the schema text
pub fn substitute_placeholders(schema: &Value, info: &DynamicSchemaInfo) -> ToolResult<Value> {
    let mut text = serde_json::to_string(schema)?;
    if let Some(session) = info.chat_session_id {
        text = text.replace(CHAT_SESSION_ID_PLACEHOLDER, &session.to_string());
    }
    if let Some(message) = info.message_id {
        text = text.replace(MESSAGE_ID_PLACEHOLDER, &message.to_string());
    }
    Ok(serde_json::from_str(&text)?)
}

/// Where a parameter goes on the request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterLocation {
    Path,
    Query,
}

/// A path or query parameter of one operation
#[derive(Debug, Clone, PartialEq)]
pub struct OperationParameter {
    pub name: String,
    pub location: ParameterLocation,
    pub required: bool,
    pub description: Option<String>,
    pub schema: Value,
}

/// One operation of an OpenAPI document
#[derive(Debug, Clone)]
pub struct Operation {
    pub operation_id: String,
    pub description: String,
    pub method: Method,
    pub path: String,
    pub parameters: Vec<OperationParameter>,
    pub request_body: Option<Value>,
    pub request_body_required: bool,
}

impl Operation {
    /// JSON schema of the arguments object shown to the model
    pub fn parameters_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();

        if let Some(body) = &self.request_body {
            properties.insert(REQUEST_BODY.to_string(), body.clone());
            if self.request_body_required {
                required.push(Value::String(REQUEST_BODY.to_string()));
            }
        }
        for param in &self.parameters {
            let mut schema = param.schema.clone();
            if let (Some(description), Some(obj)) = (&param.description, schema.as_object_mut()) {
                obj.entry("description")
                    .or_insert_with(|| Value::String(description.clone()));
            }
            properties.insert(param.name.clone(), schema);
            if param.required {
                required.push(Value::String(param.name.clone()));
            }
        }

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

fn require_str<'a>(value: &'a Value, pointer: &str) -> ToolResult<&'a str> {
    value
        .pointer(pointer)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ToolError::schema(format!("missing {}", pointer)))
}

/// Check the top-level shape of an OpenAPI document
pub fn validate_openapi_schema(schema: &Value) -> ToolResult<()> {
    if !schema.is_object() {
        return Err(ToolError::schema("document must be a JSON object"));
    }
    require_str(schema, "/info/title")?;
    require_str(schema, "/info/version")?;

    let version = require_str(schema, "/openapi")?;
    if !version.starts_with("3.") {
        return Err(ToolError::schema(format!("unsupported OpenAPI version {}", version)));
    }

    match schema.get("paths").and_then(Value::as_object) {
        Some(paths) if !paths.is_empty() => {}
        _ => return Err(ToolError::schema("no paths defined")),
    }
    server_url(schema)?;
    Ok(())
}

/// Base URL of the first server entry
pub fn server_url(schema: &Value) -> ToolResult<String> {
    require_str(schema, "/servers/0/url")
        .map(|url| url.trim_end_matches('/').to_string())
        .map_err(|_| ToolError::schema("servers[0].url is required"))
}

fn parse_parameters(raw: Option<&Value>, out: &mut Vec<OperationParameter>) -> ToolResult<()> {
    let Some(raw) = raw else {
        return Ok(());
    };
    let list = raw
        .as_array()
        .ok_or_else(|| ToolError::schema("parameters must be a list"))?;

    for param in list {
        let name = require_str(param, "/name")?;
        let location = match param.get("in").and_then(Value::as_str) {
            Some("path") => ParameterLocation::Path,
            Some("query") => ParameterLocation::Query,
            // header and cookie parameters are not exposed to the model
            _ => continue,
        };
        let parsed = OperationParameter {
            name: name.to_string(),
            location,
            required: location == ParameterLocation::Path
                || param.get("required").and_then(Value::as_bool).unwrap_or(false),
            description: param
                .get("description")
                .and_then(Value::as_str)
                .map(str::to_string),
            schema: param
                .get("schema")
                .cloned()
                .unwrap_or_else(|| json!({"type": "string"})),
        };
        // operation level parameters override path level ones
        out.retain(|p| !(p.name == parsed.name && p.location == parsed.location));
        out.push(parsed);
    }
    Ok(())
}

/// Every operation in a validated document, in path then method order
pub fn openapi_operations(schema: &Value) -> ToolResult<Vec<Operation>> {
    let paths = schema
        .get("paths")
        .and_then(Value::as_object)
        .ok_or_else(|| ToolError::schema("no paths defined"))?;

    let mut operations = Vec::new();
    for (path, item) in paths {
        let item = item
            .as_object()
            .ok_or_else(|| ToolError::schema(format!("path {} must be an object", path)))?;

        let mut shared = Vec::new();
        parse_parameters(item.get("parameters"), &mut shared)?;

        for (key, op) in item {
            if PATH_ITEM_FIELDS.contains(&key.as_str()) {
                continue;
            }
            if !HTTP_METHODS.contains(&key.as_str()) {
                return Err(ToolError::schema(format!(
                    "unsupported method {} on path {}",
                    key, path
                )));
            }
            let method = Method::from_bytes(key.to_ascii_uppercase().as_bytes())
                .map_err(|_| ToolError::schema(format!("unsupported method {}", key)))?;

            let operation_id = require_str(op, "/operationId")
                .map_err(|_| ToolError::schema(format!("{} {} has no operationId", key, path)))?;
            let description = op
                .get("summary")
                .or_else(|| op.get("description"))
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .ok_or_else(|| {
                    ToolError::schema(format!("{} needs a summary or description", operation_id))
                })?;

            let mut parameters = shared.clone();
            parse_parameters(op.get("parameters"), &mut parameters)?;

            let request_body = op
                .pointer("/requestBody/content/application~1json/schema")
                .cloned();
            let request_body_required = op
                .pointer("/requestBody/required")
                .and_then(Value::as_bool)
                .unwrap_or(false);

            operations.push(Operation {
                operation_id: operation_id.to_string(),
                description: description.to_string(),
                method,
                path: path.clone(),
                parameters,
                request_body,
                request_body_required,
            });
        }
    }
    Ok(operations)
}

/// Combine declaration and caller headers, applying OAuth passthrough
///
/// Caller headers win over declaration headers with the same name. A token
/// replaces any configured `Authorization` header.
pub fn merge_headers(
    declaration: &[HeaderItem],
    additional: &BTreeMap<String, String>,
    oauth_token: Option<&str>,
    logger: &SharedLogger,
) -> Vec<HeaderItem> {
    let mut merged: Vec<HeaderItem> = Vec::new();
    for item in declaration {
        upsert_header(&mut merged, item.clone());
    }
    for (key, value) in additional {
        upsert_header(&mut merged, HeaderItem::new(key.clone(), value.clone()));
    }

    if let Some(token) = oauth_token {
        if merged.iter().any(|h| h.key.eq_ignore_ascii_case("authorization")) {
            log_warn!(
                logger,
                "Authorization header configured on a passthrough tool; the user's OAuth token takes precedence"
            );
        }
        upsert_header(&mut merged, HeaderItem::new("Authorization", format!("Bearer {}", token)));
    }
    merged
}

fn upsert_header(headers: &mut Vec<HeaderItem>, item: HeaderItem) {
    headers.retain(|h| !h.key.eq_ignore_ascii_case(&item.key));
    headers.push(item);
}

/// A tool backed by one OpenAPI operation
pub struct CustomTool {
    operation: Operation,
    base_url: String,
    headers: Vec<HeaderItem>,
    client: reqwest::Client,
}

impl CustomTool {
    pub fn new(
        operation: Operation,
        base_url: impl Into<String>,
        headers: Vec<HeaderItem>,
        client: reqwest::Client,
    ) -> Self {
        Self {
            operation,
            base_url: base_url.into(),
            headers,
            client,
        }
    }

    pub fn operation(&self) -> &Operation {
        &self.operation
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|h| h.key.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }

    fn argument_error(&self, message: impl Into<String>) -> ToolError {
        ToolError::invalid_arguments(&self.operation.operation_id, message)
    }

    /// Build the HTTP request for a set of model arguments without sending it
    ///
    /// Path values are percent-encoded as single segments and cannot leave
    /// the operation's path.
    pub fn build_request(&self, args: &Value) -> ToolResult<reqwest::Request> {
        let mut path_values = Vec::new();
        let mut query = Vec::new();

        for param in &self.operation.parameters {
            let value = match args.get(&param.name) {
                Some(Value::Null) | None if param.required => {
                    return Err(self.argument_error(format!("missing parameter `{}`", param.name)))
                }
                Some(Value::Null) | None => continue,
                Some(value) => param_string(value),
            };
            match param.location {
                ParameterLocation::Path => path_values.push((format!("{{{}}}", param.name), value)),
                ParameterLocation::Query => query.push((param.name.clone(), value)),
            }
        }

        let url = self.operation_url(&path_values)?;
        let mut builder = self.client.request(self.operation.method.clone(), url);
        if !query.is_empty() {
            builder = builder.query(&query);
        }
        for header in &self.headers {
            builder = builder.header(header.key.as_str(), header.value.as_str());
        }
        match args.get(REQUEST_BODY) {
            Some(body) if !body.is_null() => builder = builder.json(body),
            _ if self.operation.request_body_required => {
                return Err(self.argument_error(format!("missing `{}`", REQUEST_BODY)))
            }
            _ => {}
        }
        Ok(builder.build()?)
    }

    fn operation_url(&self, path_values: &[(String, String)]) -> ToolResult<reqwest::Url> {
        let mut url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| ToolError::schema(format!("invalid server url {}: {}", self.base_url, e)))?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| ToolError::schema(format!("server url {} cannot carry a path", self.base_url)))?;
            segments.pop_if_empty();
            for template in self.operation.path.split('/').filter(|s| !s.is_empty()) {
                let mut segment = template.to_string();
                for (placeholder, value) in path_values {
                    segment = segment.replace(placeholder.as_str(), value);
                }
                segments.push(&segment);
            }
        }
        Ok(url)
    }
}

fn param_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[async_trait]
impl Tool for CustomTool {
    fn name(&self) -> &str {
        &self.operation.operation_id
    }

    fn description(&self) -> &str {
        &self.operation.description
    }

    fn kind(&self) -> CapabilityKind {
        CapabilityKind::Custom
    }

    fn effective_headers(&self) -> &[HeaderItem] {
        &self.headers
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            self.operation.operation_id.clone(),
            self.operation.description.clone(),
            self.operation.parameters_schema(),
        )
    }

    async fn run(&self, args: Value) -> ToolResult<Vec<ToolResponse>> {
        let request = self.build_request(&args)?;
        let response = self.client.execute(request).await?.error_for_status()?;

        let is_json = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.contains("application/json"))
            .unwrap_or(false);
        let result = if is_json {
            response.json::<Value>().await?
        } else {
            Value::String(response.text().await?)
        };

        Ok(vec![ToolResponse::new(
            CUSTOM_TOOL_RESPONSE_ID,
            json!({ "tool_name": self.operation.operation_id, "tool_result": result }),
        )])
    }
}

/// Expand a schema into one tool per operation
pub fn build_custom_tools(
    schema: &Value,
    dynamic: &DynamicSchemaInfo,
    headers: Vec<HeaderItem>,
    client: &reqwest::Client,
) -> ToolResult<Vec<CustomTool>> {
    let schema = substitute_placeholders(schema, dynamic)?;
    validate_openapi_schema(&schema)?;
    let base_url = server_url(&schema)?;

    Ok(openapi_operations(&schema)?
        .into_iter()
        .map(|op| CustomTool::new(op, base_url.clone(), headers.clone(), client.clone()))
        .collect())
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::logging::{LogLevel, MemoryLogger, NoOpLogger};

    pub(crate) fn weather_schema() -> Value {
        json!({
            "openapi": "3.0.0",
            "info": {"title": "Weather", "version": "1.0.0"},
            "servers": [{"url": "https://weather.example/api/"}],
            "paths": {
                "/forecast/{city}": {
                    "get": {
                        "operationId": "get_forecast",
                        "summary": "Get the forecast for a city",
                        "parameters": [
                            {"name": "city", "in": "path", "schema": {"type": "string"}},
                            {"name": "days", "in": "query", "schema": {"type": "integer"}},
                            {"name": "X-Trace", "in": "header", "schema": {"type": "string"}}
                        ]
                    }
                },
                "/notes": {
                    "post": {
                        "operationId": "create_note",
                        "description": "Create a note for session CHAT_SESSION_ID",
                        "requestBody": {
                            "required": true,
                            "content": {
                                "application/json": {
                                    "schema": {
                                        "type": "object",
                                        "properties": {"text": {"type": "string"}}
                                    }
                                }
                            }
                        }
                    }
                }
            }
        })
    }

    fn quiet() -> SharedLogger {
        Arc::new(NoOpLogger)
    }

    #[test]
    fn test_one_tool_per_operation() {
        let tools = build_custom_tools(
            &weather_schema(),
            &DynamicSchemaInfo::default(),
            Vec::new(),
            &reqwest::Client::new(),
        )
        .unwrap();

        let names: Vec<&str> = tools.iter().map(|t| t.name()).collect();
        assert_eq!(names, vec!["get_forecast", "create_note"]);
        assert!(tools.iter().all(|t| t.kind() == CapabilityKind::Custom));
    }

    #[test]
    fn test_parameters_schema() {
        let ops = openapi_operations(&weather_schema()).unwrap();
        let forecast = ops[0].parameters_schema();
        assert_eq!(forecast["properties"]["city"]["type"], "string");
        assert_eq!(forecast["properties"]["days"]["type"], "integer");
        assert!(forecast["properties"].get("X-Trace").is_none());
        assert_eq!(forecast["required"], json!(["city"]));

        let note = ops[1].parameters_schema();
        assert_eq!(note["properties"][REQUEST_BODY]["type"], "object");
        assert_eq!(note["required"], json!([REQUEST_BODY]));
    }

    #[test]
    fn test_placeholders_substituted() {
        let session = Uuid::new_v4();
        let info = DynamicSchemaInfo {
            chat_session_id: Some(session),
            message_id: Some(42),
        };
        let mut schema = weather_schema();
        schema["servers"][0]["url"] = json!("https://notes.example/MESSAGE_ID");

        let tools = build_custom_tools(&schema, &info, Vec::new(), &reqwest::Client::new()).unwrap();
        assert_eq!(
            tools[1].description(),
            format!("Create a note for session {}", session)
        );
        let request = tools[1].build_request(&json!({"requestBody": {"text": "hi"}})).unwrap();
        assert_eq!(request.url().as_str(), "https://notes.example/42/notes");
    }

    #[test]
    fn test_placeholders_left_without_values() {
        let out = substitute_placeholders(&json!({"a": "CHAT_SESSION_ID"}), &DynamicSchemaInfo::default()).unwrap();
        assert_eq!(out["a"], "CHAT_SESSION_ID");
    }

    #[test]
    fn test_validation_failures() {
        let cases: Vec<(&str, Box<dyn Fn(&mut Value)>)> = vec![
            ("title", Box::new(|s: &mut Value| {
                s["info"].as_object_mut().unwrap().remove("title");
            })),
            ("version", Box::new(|s: &mut Value| s["openapi"] = json!("2.0"))),
            ("paths", Box::new(|s: &mut Value| s["paths"] = json!({}))),
            ("servers", Box::new(|s: &mut Value| s["servers"] = json!([]))),
            ("operationId", Box::new(|s: &mut Value| {
                s["paths"]["/notes"]["post"].as_object_mut().unwrap().remove("operationId");
            })),
            ("method", Box::new(|s: &mut Value| s["paths"]["/notes"]["fetch"] = json!({}))),
        ];

        for (label, mutate) in cases {
            let mut schema = weather_schema();
            mutate(&mut schema);
            let result = build_custom_tools(
                &schema,
                &DynamicSchemaInfo::default(),
                Vec::new(),
                &reqwest::Client::new(),
            );
            assert!(matches!(result, Err(ToolError::Schema(_))), "case {}", label);
        }
    }

    #[test]
    fn test_build_request() {
        let headers = vec![HeaderItem::new("X-Api-Key", "k1")];
        let tools = build_custom_tools(
            &weather_schema(),
            &DynamicSchemaInfo::default(),
            headers,
            &reqwest::Client::new(),
        )
        .unwrap();

        let request = tools[0]
            .build_request(&json!({"city": "Oslo", "days": 3}))
            .unwrap();
        assert_eq!(request.method(), Method::GET);
        assert_eq!(
            request.url().as_str(),
            "https://weather.example/api/forecast/Oslo?days=3"
        );
        assert_eq!(request.headers()["x-api-key"], "k1");

        let missing = tools[0].build_request(&json!({"days": 3}));
        assert!(matches!(missing, Err(ToolError::InvalidArguments { .. })));

        let body_missing = tools[1].build_request(&json!({}));
        assert!(matches!(body_missing, Err(ToolError::InvalidArguments { .. })));
    }

    #[test]
    fn test_path_values_stay_in_one_segment() {
        let tools = build_custom_tools(
            &weather_schema(),
            &DynamicSchemaInfo::default(),
            Vec::new(),
            &reqwest::Client::new(),
        )
        .unwrap();

        let request = tools[0]
            .build_request(&json!({"city": "../admin?x=1#", "days": 3}))
            .unwrap();
        let url = request.url();
        assert!(url.path().starts_with("/api/forecast/"), "{}", url);
        assert_eq!(url.path_segments().unwrap().count(), 3);
        assert_eq!(url.query(), Some("days=3"));
        assert!(url.fragment().is_none());

        let spaced = tools[0]
            .build_request(&json!({"city": "New York", "days": 1}))
            .unwrap();
        assert_eq!(
            spaced.url().as_str(),
            "https://weather.example/api/forecast/New%20York?days=1"
        );
    }

    #[test]
    fn test_merge_headers_passthrough_overrides() {
        let memory = Arc::new(MemoryLogger::new());
        let logger: SharedLogger = memory.clone();
        let declaration = vec![
            HeaderItem::new("authorization", "Basic abc"),
            HeaderItem::new("X-Team", "core"),
        ];
        let mut additional = BTreeMap::new();
        additional.insert("X-Team".to_string(), "search".to_string());

        let merged = merge_headers(&declaration, &additional, Some("tok-1"), &logger);
        let auth: Vec<&HeaderItem> = merged
            .iter()
            .filter(|h| h.key.eq_ignore_ascii_case("authorization"))
            .collect();
        assert_eq!(auth.len(), 1);
        assert_eq!(auth[0].value, "Bearer tok-1");
        assert!(merged.iter().any(|h| h.key == "X-Team" && h.value == "search"));
        assert!(memory.contains(LogLevel::Warn, "OAuth token takes precedence"));
    }

    #[test]
    fn test_merge_headers_without_token() {
        let declaration = vec![HeaderItem::new("X-Team", "core")];
        let merged = merge_headers(&declaration, &BTreeMap::new(), None, &quiet());
        assert_eq!(merged, declaration);
    }
}
