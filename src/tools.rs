//! The agent-facing tool surface.
//!
//! Tools are how agents reach the directory: discovery via `GET /tools/list`,
//! invocation via `POST /tools/{name}`. Every tool call names a configured
//! agent, and the agent's config entry pins the account and the lists the
//! call may touch; there is no way to ask for another tenant's data through
//! this layer.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │              ToolRegistry                │
//! │  ┌─────────┐ ┌──────────┐ ┌──────────┐  │
//! │  │Built-in │ │ Built-in │ │  Custom  │  │
//! │  │ search  │ │tool_docs │ │  (Rust)  │  │
//! │  │  lists  │ │          │ │  Tools   │  │
//! │  └─────────┘ └──────────┘ └──────────┘  │
//! └──────────────┬───────────────────────────┘
//!                ▼
//!          run_server() → HTTP tool API
//! ```
//!
//! # Usage
//!
//! ```rust
//! use rolodex::tools::ToolRegistry;
//!
//! let mut tools = ToolRegistry::with_builtins();
//! // tools.register(Box::new(MyTool::new()));
//! ```

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use crate::config::{AgentConfig, Config};
use crate::db;
use crate::models::{ListRef, SearchHit};
use crate::schema::SchemaRegistry;
use crate::search::{accessible_lists, search_records, FieldFilter, SearchMode, SearchQuery};
use crate::tooldocs::{generate_tool_docs, ToolDocs};

// ═══════════════════════════════════════════════════════════════════════
// Tool Trait
// ═══════════════════════════════════════════════════════════════════════

/// A tool that agents can discover and call.
///
/// Implement this trait to expose a custom capability next to the built-in
/// ones. Tools are registered at server startup and exposed via
/// `GET /tools/list` for discovery and `POST /tools/{name}` for invocation.
///
/// # Lifecycle
///
/// 1. The tool is registered via [`ToolRegistry::register`].
/// 2. [`name`](Tool::name), [`description`](Tool::description), and
///    [`parameters_schema`](Tool::parameters_schema) are read at startup for
///    the tool list.
/// 3. [`execute`](Tool::execute) runs on each invocation, after the
///    parameters passed schema validation.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Returns the tool's name.
    ///
    /// Used as the route path (`POST /tools/{name}`) and in
    /// `GET /tools/list` responses. Should be a lowercase identifier with
    /// underscores (e.g., `"tool_docs"`).
    fn name(&self) -> &str;

    /// Returns a one-line description for agent discovery.
    fn description(&self) -> &str;

    /// Whether this tool is a built-in (true for search/tool_docs/lists).
    ///
    /// Built-in tools are marked with `"builtin": true` in the
    /// `GET /tools/list` response. Defaults to `false`.
    fn is_builtin(&self) -> bool {
        false
    }

    /// Returns the OpenAI function-calling JSON Schema for parameters.
    ///
    /// Must be a valid JSON Schema object with `type: "object"`,
    /// `properties`, and optionally `required`. Every tool in this crate
    /// requires an `agent` parameter; that is where tenancy comes from.
    fn parameters_schema(&self) -> Value;

    /// Execute the tool with validated parameters.
    ///
    /// # Arguments
    ///
    /// * `params` — JSON parameters (always a JSON object).
    /// * `ctx` — bridge to the directory store.
    ///
    /// # Returns
    ///
    /// A JSON value that will be wrapped in `{ "result": ... }` in the HTTP
    /// response.
    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value>;
}

// ═══════════════════════════════════════════════════════════════════════
// ToolContext
// ═══════════════════════════════════════════════════════════════════════

/// Context bridge for tool execution.
///
/// Gives tools scoped access to the directory during execution. Created by
/// the server for each tool invocation. All methods resolve the agent from
/// config first and then delegate to the same core functions the CLI uses,
/// so a tool can do exactly what the agent's grant allows and nothing more.
pub struct ToolContext {
    config: Arc<Config>,
}

impl ToolContext {
    /// Create a new tool context from the application config.
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn agent(&self, name: &str) -> Result<&AgentConfig> {
        match self.config.agents.get(name) {
            Some(agent) => Ok(agent),
            None => bail!("unknown agent: '{}'", name),
        }
    }

    /// Search the lists an agent may see.
    ///
    /// `requested` optionally narrows the agent's granted lists; names
    /// outside the grant are dropped silently, and `None` means the full
    /// grant. Equivalent to `POST /tools/search` or `rdx search`.
    pub async fn search(
        &self,
        agent: &str,
        requested: Option<&[String]>,
        query: &SearchQuery,
    ) -> Result<Vec<SearchHit>> {
        let agent_cfg = self.agent(agent)?;
        let names: Vec<String> = match requested {
            Some(requested) => requested
                .iter()
                .filter(|name| agent_cfg.lists.contains(name))
                .cloned()
                .collect(),
            None => agent_cfg.lists.clone(),
        };

        let pool = db::connect(&self.config).await?;
        let lists = accessible_lists(&pool, &agent_cfg.account, &names).await?;
        let list_ids: Vec<String> = lists.iter().map(|l| l.id.clone()).collect();
        let hits = search_records(&pool, &list_ids, query).await?;
        pool.close().await;
        Ok(hits)
    }

    /// Generate the tool documentation for an agent.
    ///
    /// Equivalent to `POST /tools/tool_docs` or `rdx tool-docs`.
    pub async fn tool_docs(&self, agent: &str) -> Result<ToolDocs> {
        let pool = db::connect(&self.config).await?;
        let schemas = SchemaRegistry::new(&self.config.schemas.dir);
        let docs = generate_tool_docs(&pool, &schemas, &self.config, agent).await?;
        pool.close().await;
        Ok(docs)
    }

    /// Resolve the lists an agent may see.
    ///
    /// Equivalent to `POST /tools/lists`.
    pub async fn lists(&self, agent: &str) -> Result<Vec<ListRef>> {
        let agent_cfg = self.agent(agent)?;
        let pool = db::connect(&self.config).await?;
        let lists = accessible_lists(&pool, &agent_cfg.account, &agent_cfg.lists).await?;
        pool.close().await;
        Ok(lists)
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Built-in Tool Implementations
// ═══════════════════════════════════════════════════════════════════════

/// Built-in search tool. Delegates to [`ToolContext::search`].
pub struct SearchTool;

#[async_trait]
impl Tool for SearchTool {
    fn name(&self) -> &str {
        "search"
    }

    fn description(&self) -> &str {
        "Search directory records in the agent's lists"
    }

    fn is_builtin(&self) -> bool {
        true
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "agent": { "type": "string", "description": "Configured agent name; fixes the account scope" },
                "query": { "type": "string", "description": "Name query" },
                "mode": { "type": "string", "enum": ["exact", "substring", "fts"], "default": "substring" },
                "lists": { "type": "array", "description": "Narrow to these list names; must be a subset of the agent's lists" },
                "tags": { "type": "array", "description": "Require every one of these tags" },
                "filters": { "type": "object", "description": "Entry-data field equality, e.g. {\"specialty\": \"Cardiology\"}" },
                "limit": { "type": "integer", "description": "Max results, at least 1 (defaults to search.default_limit)" }
            },
            "required": ["agent"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        let agent = params["agent"].as_str().unwrap_or("");
        if agent.trim().is_empty() {
            bail!("agent must not be empty");
        }

        let mode: SearchMode = match params.get("mode").and_then(|m| m.as_str()) {
            Some(mode) => mode.parse()?,
            None => SearchMode::default(),
        };
        let limit = params["limit"]
            .as_i64()
            .unwrap_or(ctx.config().search.default_limit);
        if limit < 1 {
            bail!("limit must be at least 1, got {}", limit);
        }

        let requested: Option<Vec<String>> = params.get("lists").and_then(|l| l.as_array()).map(
            |names| {
                names
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            },
        );
        let tags: Vec<String> = params
            .get("tags")
            .and_then(|t| t.as_array())
            .map(|tags| {
                tags.iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();
        let field_filters: Vec<FieldFilter> = params
            .get("filters")
            .and_then(|f| f.as_object())
            .map(|filters| {
                filters
                    .iter()
                    .map(|(field, value)| FieldFilter::eq(field.clone(), value.clone()))
                    .collect()
            })
            .unwrap_or_default();

        let query = SearchQuery {
            name_query: params
                .get("query")
                .and_then(|q| q.as_str())
                .map(str::to_string),
            tags,
            field_filters,
            mode,
            limit,
        };

        let hits = ctx.search(agent, requested.as_deref(), &query).await?;
        Ok(serde_json::json!({ "results": hits }))
    }
}

/// Built-in tool-docs tool. Delegates to [`ToolContext::tool_docs`].
pub struct ToolDocsTool;

#[async_trait]
impl Tool for ToolDocsTool {
    fn name(&self) -> &str {
        "tool_docs"
    }

    fn description(&self) -> &str {
        "Describe the searchable lists, tags, and fields available to the agent"
    }

    fn is_builtin(&self) -> bool {
        true
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "agent": { "type": "string", "description": "Configured agent name" }
            },
            "required": ["agent"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        let agent = params["agent"].as_str().unwrap_or("");
        if agent.trim().is_empty() {
            bail!("agent must not be empty");
        }

        let docs = ctx.tool_docs(agent).await?;
        let rendered = docs.render();
        let mut value = serde_json::to_value(&docs)?;
        if let Some(obj) = value.as_object_mut() {
            obj.insert("rendered".to_string(), Value::String(rendered));
        }
        Ok(value)
    }
}

/// Built-in lists tool. Delegates to [`ToolContext::lists`].
pub struct ListsTool;

#[async_trait]
impl Tool for ListsTool {
    fn name(&self) -> &str {
        "lists"
    }

    fn description(&self) -> &str {
        "List the directory lists visible to the agent"
    }

    fn is_builtin(&self) -> bool {
        true
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "agent": { "type": "string", "description": "Configured agent name" }
            },
            "required": ["agent"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        let agent = params["agent"].as_str().unwrap_or("");
        if agent.trim().is_empty() {
            bail!("agent must not be empty");
        }

        let lists = ctx.lists(agent).await?;
        Ok(serde_json::json!({ "lists": lists }))
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Registry
// ═══════════════════════════════════════════════════════════════════════

/// Registry for tools (built-in and custom Rust).
///
/// Use [`ToolRegistry::with_builtins`] to create a registry pre-loaded with
/// the core `search`, `tool_docs`, and `lists` tools, then optionally call
/// [`register`](ToolRegistry::register) to add custom ones.
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
}

impl ToolRegistry {
    /// Create an empty tool registry.
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    /// Create a tool registry pre-loaded with the built-in tools.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(SearchTool));
        registry.register(Box::new(ToolDocsTool));
        registry.register(Box::new(ListsTool));
        registry
    }

    /// Register a tool.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        self.tools.push(tool);
    }

    /// Get all registered tools.
    pub fn tools(&self) -> &[Box<dyn Tool>] {
        &self.tools
    }

    /// Consume the registry, yielding its tools for merging into another.
    pub fn into_tools(self) -> Vec<Box<dyn Tool>> {
        self.tools
    }

    /// Find a tool by name.
    pub fn find(&self, name: &str) -> Option<&dyn Tool> {
        self.tools
            .iter()
            .find(|t| t.name() == name)
            .map(|t| t.as_ref())
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Return the count of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Parameter validation
// ═══════════════════════════════════════════════════════════════════════

/// Serializable tool info for the `/tools/list` endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ToolInfo {
    /// Tool name.
    pub name: String,
    /// Tool description.
    pub description: String,
    /// Whether this is a built-in tool.
    pub builtin: bool,
    /// OpenAI function-calling JSON Schema.
    pub parameters: Value,
}

/// Validate parameters against a tool's JSON Schema.
///
/// Checks required fields, type compatibility, and enum constraints, and
/// injects declared defaults for missing optional fields. Returns the
/// validated (possibly enriched) parameters.
pub fn validate_params(schema: &Value, params: &Value) -> Result<Value> {
    let given = params.as_object().cloned().unwrap_or_default();

    let properties = schema
        .get("properties")
        .and_then(|p| p.as_object())
        .cloned()
        .unwrap_or_default();
    let required: Vec<&str> = schema
        .get("required")
        .and_then(|r| r.as_array())
        .map(|arr| arr.iter().filter_map(|v| v.as_str()).collect())
        .unwrap_or_default();

    for field in &required {
        if !given.contains_key(*field) {
            bail!("missing required parameter: {}", field);
        }
    }

    let mut validated = given.clone();
    for (name, prop_schema) in &properties {
        let value = match given.get(name) {
            Some(value) => value,
            None => {
                if let Some(default) = prop_schema.get("default") {
                    validated.insert(name.clone(), default.clone());
                }
                continue;
            }
        };

        if let Some(expected) = prop_schema.get("type").and_then(|t| t.as_str()) {
            let type_ok = match expected {
                "string" => value.is_string(),
                "integer" => value.is_i64() || value.is_u64(),
                "number" => value.is_number(),
                "boolean" => value.is_boolean(),
                "array" => value.is_array(),
                "object" => value.is_object(),
                _ => true,
            };
            if !type_ok {
                bail!(
                    "parameter '{}' must be of type '{}', got {}",
                    name,
                    expected,
                    json_type_name(value)
                );
            }
        }

        if let Some(enum_values) = prop_schema.get("enum").and_then(|e| e.as_array()) {
            if !enum_values.contains(value) {
                let allowed: Vec<String> = enum_values.iter().map(|v| v.to_string()).collect();
                bail!(
                    "parameter '{}' must be one of [{}], got {}",
                    name,
                    allowed.join(", "),
                    value
                );
            }
        }
    }

    Ok(Value::Object(validated))
}

/// Return a human-readable name for a JSON value's type.
fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builtins_are_registered() {
        let registry = ToolRegistry::with_builtins();
        assert_eq!(registry.len(), 3);
        for name in ["search", "tool_docs", "lists"] {
            let tool = registry.find(name).unwrap();
            assert!(tool.is_builtin());
        }
        assert!(registry.find("missing").is_none());
    }

    #[test]
    fn every_builtin_requires_an_agent() {
        let registry = ToolRegistry::with_builtins();
        for tool in registry.tools() {
            let schema = tool.parameters_schema();
            let required = schema["required"].as_array().unwrap();
            assert!(
                required.contains(&json!("agent")),
                "tool '{}' must require agent",
                tool.name()
            );
        }
    }

    #[test]
    fn validate_rejects_missing_required() {
        let schema = SearchTool.parameters_schema();
        let err = validate_params(&schema, &json!({})).unwrap_err();
        assert!(err.to_string().contains("missing required parameter: agent"));
    }

    #[test]
    fn validate_rejects_wrong_type() {
        let schema = SearchTool.parameters_schema();
        let err = validate_params(&schema, &json!({"agent": "a", "limit": "ten"})).unwrap_err();
        assert!(err.to_string().contains("must be of type 'integer'"));
    }

    #[test]
    fn validate_rejects_unknown_enum_value() {
        let schema = SearchTool.parameters_schema();
        let err = validate_params(&schema, &json!({"agent": "a", "mode": "fuzzy"})).unwrap_err();
        assert!(err.to_string().contains("must be one of"));
    }

    #[test]
    fn validate_injects_defaults() {
        let schema = SearchTool.parameters_schema();
        let validated = validate_params(&schema, &json!({"agent": "a"})).unwrap();
        assert_eq!(validated["mode"], json!("substring"));
        // No default declared for limit; config stays authoritative.
        assert!(validated.get("limit").is_none());
    }

    #[tokio::test]
    async fn search_tool_rejects_nonpositive_limit() {
        let config: Config = toml::from_str("[db]\npath = \"/tmp/unused.db\"\n").unwrap();
        let ctx = ToolContext::new(Arc::new(config));
        for bad in [0, -5] {
            let err = SearchTool
                .execute(json!({"agent": "front-desk", "limit": bad}), &ctx)
                .await
                .unwrap_err();
            assert!(
                err.to_string().contains("limit must be at least 1"),
                "got: {}",
                err
            );
        }
    }

    #[test]
    fn validate_passes_well_formed_params() {
        let schema = SearchTool.parameters_schema();
        let params = json!({
            "agent": "front-desk",
            "query": "chen",
            "mode": "fts",
            "tags": ["board-certified"],
            "filters": {"specialty": "Cardiology"},
            "limit": 5
        });
        let validated = validate_params(&schema, &params).unwrap();
        assert_eq!(validated["query"], json!("chen"));
        assert_eq!(validated["filters"]["specialty"], json!("Cardiology"));
    }
}
