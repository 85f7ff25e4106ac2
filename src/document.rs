//! OpenAPI document model.
//!
//! These types are the single in-memory representation shared by the builder, the merger,
//! the cache and the static site generator. Serialization follows the declared field order,
//! which is what makes the JSON and YAML output canonical. Every map is an [`IndexMap`] so
//! that insertion order (route discovery order) survives a round trip.

use indexmap::IndexMap;
use serde::de::{self, IgnoredAny, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;

/// A security requirement: scheme name -> required scopes
pub type SecurityRequirement = IndexMap<String, Vec<String>>;

/// Root OpenAPI document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// OpenAPI version (e.g. "3.0.3")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub openapi: Option<String>,
    /// API info
    #[serde(default)]
    pub info: Info,
    /// Servers, in declared order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub servers: Vec<Server>,
    /// Normalized path template -> PathItem, in discovery order
    #[serde(default)]
    pub paths: IndexMap<String, PathItem>,
    /// Reusable components
    #[serde(default, skip_serializing_if = "Components::is_empty")]
    pub components: Components,
    /// Document-wide security requirements
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub security: Vec<SecurityRequirement>,
    /// Tags, unique by name
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
}

/// OpenAPI Info object
///
/// Title and version are optional here so that imported documents missing them can be
/// represented and reported by validation instead of failing to parse.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Info {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact: Option<Contact>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license: Option<License>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct License {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Server {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// HTTP methods that may key a PathItem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Options,
    Head,
}

impl Method {
    /// Parse a method token case-insensitively
    pub fn parse(token: &str) -> Option<Method> {
        match token.trim().to_ascii_lowercase().as_str() {
            "get" => Some(Method::Get),
            "post" => Some(Method::Post),
            "put" => Some(Method::Put),
            "patch" => Some(Method::Patch),
            "delete" => Some(Method::Delete),
            "options" => Some(Method::Options),
            "head" => Some(Method::Head),
            _ => None,
        }
    }

    /// Lowercase token as used for PathItem keys
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "get",
            Method::Post => "post",
            Method::Put => "put",
            Method::Patch => "patch",
            Method::Delete => "delete",
            Method::Options => "options",
            Method::Head => "head",
        }
    }

    /// Whether requests with this method conventionally carry a body
    pub fn has_body(&self) -> bool {
        matches!(self, Method::Post | Method::Put | Method::Patch)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str().to_ascii_uppercase())
    }
}

/// OpenAPI PathItem object - all operations for a single path
///
/// Deserialization is hand-written: method keys become operations, the handful of
/// path-level fields we model are kept, and anything else (`servers`, `$ref`, `x-*`)
/// is skipped rather than rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PathItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Parameters shared by every operation on this path
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,
    #[serde(flatten)]
    pub operations: IndexMap<Method, Operation>,
}

impl PathItem {
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

impl<'de> Deserialize<'de> for PathItem {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct PathItemVisitor;

        impl<'de> Visitor<'de> for PathItemVisitor {
            type Value = PathItem;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an OpenAPI path item mapping")
            }

            fn visit_map<A>(self, mut map: A) -> Result<PathItem, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut item = PathItem::default();
                while let Some(key) = map.next_key::<String>()? {
                    match key.as_str() {
                        "summary" => item.summary = map.next_value()?,
                        "description" => item.description = map.next_value()?,
                        "parameters" => item.parameters = map.next_value()?,
                        other => match Method::parse(other) {
                            Some(method) if other == method.as_str() => {
                                let operation = map.next_value()?;
                                item.operations.insert(method, operation);
                            }
                            _ => {
                                map.next_value::<IgnoredAny>()?;
                            }
                        },
                    }
                }
                Ok(item)
            }

            fn visit_unit<E>(self) -> Result<PathItem, E>
            where
                E: de::Error,
            {
                Ok(PathItem::default())
            }
        }

        deserializer.deserialize_any(PathItemVisitor)
    }
}

/// OpenAPI Operation object
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "operationId", skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,
    #[serde(rename = "requestBody", skip_serializing_if = "Option::is_none")]
    pub request_body: Option<RequestBody>,
    /// Status code -> response
    #[serde(default)]
    pub responses: IndexMap<String, Response>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security: Option<Vec<SecurityRequirement>>,
}

/// Where a parameter is read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    Path,
    Query,
    Header,
    Cookie,
}

/// OpenAPI Parameter object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "in")]
    pub location: ParameterLocation,
    #[serde(default)]
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<Schema>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Parameter {
    /// A required string path parameter
    pub fn path(name: &str) -> Self {
        Self {
            name: name.to_string(),
            location: ParameterLocation::Path,
            required: true,
            schema: Some(Schema::of_type("string")),
            description: Some(format!("The {} parameter", name)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub content: IndexMap<String, MediaType>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Response {
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub content: IndexMap<String, MediaType>,
}

impl Response {
    /// A response carrying a single JSON body
    pub fn json(description: &str, schema: Schema) -> Self {
        let mut content = IndexMap::new();
        content.insert(
            "application/json".to_string(),
            MediaType {
                schema: Some(schema),
            },
        );
        Self {
            description: description.to_string(),
            content,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaType {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<Schema>,
}

/// OpenAPI Schema definition
///
/// The commonly used keywords are typed; every other keyword (`allOf`, `nullable`,
/// `additionalProperties`, ...) is kept verbatim in `extra` so imports are not lossy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    #[serde(rename = "$ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<IndexMap<String, Schema>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Schema>>,
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<serde_json::Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<serde_json::Value>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Schema {
    pub fn of_type(schema_type: &str) -> Self {
        Self {
            schema_type: Some(schema_type.to_string()),
            ..Self::default()
        }
    }

    /// An object schema with an explicit (possibly empty) property set
    pub fn object(properties: IndexMap<String, Schema>) -> Self {
        Self {
            schema_type: Some("object".to_string()),
            properties: Some(properties),
            ..Self::default()
        }
    }
}

/// Reusable components, each a mapping name -> definition
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Components {
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub schemas: IndexMap<String, Schema>,
    #[serde(
        rename = "securitySchemes",
        default,
        skip_serializing_if = "IndexMap::is_empty"
    )]
    pub security_schemes: IndexMap<String, SecurityScheme>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub responses: IndexMap<String, Response>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub parameters: IndexMap<String, Parameter>,
}

impl Components {
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
            && self.security_schemes.is_empty()
            && self.responses.is_empty()
            && self.parameters.is_empty()
    }
}

/// OpenAPI Security Scheme object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityScheme {
    #[serde(rename = "type")]
    pub scheme_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "in", skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheme: Option<String>,
    #[serde(rename = "bearerFormat", skip_serializing_if = "Option::is_none")]
    pub bearer_format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flows: Option<serde_json::Value>,
    #[serde(rename = "openIdConnectUrl", skip_serializing_if = "Option::is_none")]
    pub open_id_connect_url: Option<String>,
}

impl SecurityScheme {
    /// HTTP bearer authentication with a JWT bearer format
    pub fn bearer() -> Self {
        Self {
            scheme_type: "http".to_string(),
            description: None,
            name: None,
            location: None,
            scheme: Some("bearer".to_string()),
            bearer_format: Some("JWT".to_string()),
            flows: None,
            open_id_connect_url: None,
        }
    }

    /// API key passed in a header
    pub fn api_key_header(header: &str) -> Self {
        Self {
            scheme_type: "apiKey".to_string(),
            description: None,
            name: Some(header.to_string()),
            location: Some("header".to_string()),
            scheme: None,
            bearer_format: None,
            flows: None,
            open_id_connect_url: None,
        }
    }
}

/// Counts shown on the documentation landing page
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DocumentStats {
    pub path_count: usize,
    pub operation_count: usize,
    pub tag_count: usize,
    pub schema_count: usize,
}

impl Document {
    /// Iterate every operation as (path, method, operation)
    pub fn operations(&self) -> impl Iterator<Item = (&str, Method, &Operation)> {
        self.paths.iter().flat_map(|(path, item)| {
            item.operations
                .iter()
                .map(move |(method, op)| (path.as_str(), *method, op))
        })
    }

    pub fn stats(&self) -> DocumentStats {
        let mut tags = HashSet::new();
        for (_, _, op) in self.operations() {
            tags.extend(op.tags.iter().map(String::as_str));
        }

        DocumentStats {
            path_count: self.paths.len(),
            operation_count: self.paths.values().map(|item| item.operations.len()).sum(),
            tag_count: tags.len(),
            schema_count: self.components.schemas.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn operation_with_tags(tags: &[&str]) -> Operation {
        Operation {
            tags: tags.iter().map(|t| t.to_string()).collect(),
            ..Operation::default()
        }
    }

    #[test]
    fn test_method_parse_is_case_insensitive() {
        assert_eq!(Method::parse("GET"), Some(Method::Get));
        assert_eq!(Method::parse("Patch"), Some(Method::Patch));
        assert_eq!(Method::parse("ANY"), None);
        assert_eq!(Method::parse("TRACE"), None);
        assert_eq!(Method::Delete.to_string(), "DELETE");
    }

    #[test]
    fn test_path_item_deserialize_skips_unknown_keys() {
        let json = r#"{
            "summary": "Users",
            "servers": [{"url": "http://x"}],
            "x-internal": true,
            "trace": {"responses": {"200": {"description": "ok"}}},
            "parameters": [{"name": "id", "in": "path", "required": true}],
            "get": {"responses": {"200": {"description": "ok"}}},
            "post": {"responses": {"201": {"description": "created"}}}
        }"#;

        let item: PathItem = serde_json::from_str(json).unwrap();

        assert_eq!(item.summary.as_deref(), Some("Users"));
        assert_eq!(item.parameters.len(), 1);
        assert_eq!(item.operations.len(), 2);
        assert!(item.operations.contains_key(&Method::Get));
        assert!(item.operations.contains_key(&Method::Post));
    }

    #[test]
    fn test_path_item_serializes_methods_as_keys() {
        let mut item = PathItem::default();
        item.operations.insert(Method::Get, Operation::default());

        let value = serde_json::to_value(&item).unwrap();

        assert!(value.get("get").is_some());
        assert!(value.get("parameters").is_none());
    }

    #[test]
    fn test_schema_keeps_unmodelled_keywords() {
        let json = r#"{"type": "object", "nullable": true, "additionalProperties": false}"#;
        let schema: Schema = serde_json::from_str(json).unwrap();

        assert_eq!(schema.schema_type.as_deref(), Some("object"));
        assert_eq!(schema.extra.len(), 2);

        let back = serde_json::to_value(&schema).unwrap();
        assert_eq!(back["nullable"], true);
    }

    #[test]
    fn test_empty_properties_survive_serialization() {
        let schema = Schema::object(IndexMap::new());
        let json = serde_json::to_string(&schema).unwrap();
        assert_eq!(json, r#"{"type":"object","properties":{}}"#);
    }

    #[test]
    fn test_stats_counts_unique_tags_and_operations() {
        let mut doc = Document::default();
        let mut users = PathItem::default();
        users.operations.insert(Method::Get, operation_with_tags(&["Users"]));
        users.operations.insert(Method::Post, operation_with_tags(&["Users"]));
        let mut orders = PathItem::default();
        orders.operations.insert(Method::Get, operation_with_tags(&["Orders", "Users"]));
        doc.paths.insert("/users".to_string(), users);
        doc.paths.insert("/orders".to_string(), orders);
        doc.components
            .schemas
            .insert("User".to_string(), Schema::of_type("object"));

        let stats = doc.stats();

        assert_eq!(
            stats,
            DocumentStats {
                path_count: 2,
                operation_count: 3,
                tag_count: 2,
                schema_count: 1,
            }
        );
    }

    #[test]
    fn test_missing_info_fields_parse_as_none() {
        let doc: Document =
            serde_json::from_str(r#"{"openapi":"3.0.3","info":{"title":"X"}}"#).unwrap();
        assert_eq!(doc.info.title.as_deref(), Some("X"));
        assert!(doc.info.version.is_none());
        assert!(doc.paths.is_empty());
    }
}
