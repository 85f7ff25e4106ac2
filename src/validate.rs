//! Structural validation of OpenAPI documents.
//!
//! Validation never fails by itself: it returns every violation it finds, in a stable
//! order, and the caller decides whether that is fatal.

use crate::document::{Document, Parameter, ParameterLocation};
use crate::naming::template_parameters;
use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::LazyLock;

static VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^3\.\d+\.\d+$").expect("valid version regex"));

/// One structural problem, located by a dotted path into the document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub location: String,
    pub message: String,
}

impl Violation {
    pub fn new(location: &str, message: &str) -> Self {
        Self {
            location: location.to_string(),
            message: message.to_string(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.location, self.message)
    }
}

/// Check a document and return all violations found
pub fn validate(doc: &Document) -> Vec<Violation> {
    let mut violations = Vec::new();

    match doc.openapi.as_deref() {
        None => violations.push(Violation::new("openapi", "missing required field")),
        Some(version) if !VERSION_RE.is_match(version) => violations.push(Violation::new(
            "openapi",
            &format!("unsupported version `{}`, expected 3.x.y", version),
        )),
        Some(_) => {}
    }

    if is_blank(&doc.info.title) {
        violations.push(Violation::new("info.title", "missing required field"));
    }
    if is_blank(&doc.info.version) {
        violations.push(Violation::new("info.version", "missing required field"));
    }

    for (path, item) in &doc.paths {
        if !path.starts_with('/') {
            violations.push(Violation::new(
                &format!("paths.{}", path),
                "path must start with '/'",
            ));
        }

        let template: BTreeSet<String> = template_parameters(path).into_iter().collect();
        let shared = path_parameter_counts(&item.parameters);

        for (method, op) in &item.operations {
            let location = format!("paths.{}.{}", path, method.as_str());

            if op.responses.is_empty() {
                violations.push(Violation::new(&location, "operation has no responses"));
            }

            // Operation-level parameters override path-level ones of the same name.
            let mut effective = path_parameter_counts(&op.parameters);
            for (name, count) in &shared {
                effective.entry(*name).or_insert(*count);
            }

            for (name, count) in &effective {
                if *count > 1 {
                    violations.push(Violation::new(
                        &location,
                        &format!("path parameter `{}` is declared {} times", name, count),
                    ));
                }
            }

            let declared: BTreeSet<String> =
                effective.keys().map(|name| name.to_string()).collect();

            if declared != template {
                violations.push(Violation::new(
                    &location,
                    &format!(
                        "path parameters {:?} do not match template variables {:?}",
                        declared, template
                    ),
                ));
            }
        }
    }

    let mut seen: HashMap<&str, String> = HashMap::new();
    for (path, method, op) in doc.operations() {
        if let Some(id) = op.operation_id.as_deref() {
            let location = format!("paths.{}.{}", path, method.as_str());
            if let Some(first) = seen.get(id) {
                violations.push(Violation::new(
                    &location,
                    &format!("duplicate operationId `{}` (first used at {})", id, first),
                ));
            } else {
                seen.insert(id, location);
            }
        }
    }

    violations
}

fn path_parameter_counts(parameters: &[Parameter]) -> BTreeMap<&str, usize> {
    let mut counts = BTreeMap::new();
    for param in parameters {
        if param.location == ParameterLocation::Path {
            *counts.entry(param.name.as_str()).or_insert(0) += 1;
        }
    }
    counts
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Info, Method, Operation, Parameter, PathItem, Response};
    use indexmap::IndexMap;

    fn ok_operation(id: &str, params: &[&str]) -> Operation {
        let mut responses = IndexMap::new();
        responses.insert(
            "200".to_string(),
            Response {
                description: "ok".to_string(),
                content: IndexMap::new(),
            },
        );
        Operation {
            operation_id: Some(id.to_string()),
            parameters: params.iter().map(|p| Parameter::path(p)).collect(),
            responses,
            ..Operation::default()
        }
    }

    fn valid_document() -> Document {
        let mut item = PathItem::default();
        item.operations
            .insert(Method::Get, ok_operation("get_users_id", &["id"]));

        let mut doc = Document {
            openapi: Some("3.0.3".to_string()),
            info: Info {
                title: Some("API".to_string()),
                version: Some("1.0.0".to_string()),
                ..Info::default()
            },
            ..Document::default()
        };
        doc.paths.insert("/users/{id}".to_string(), item);
        doc
    }

    #[test]
    fn test_valid_document_has_no_violations() {
        assert!(validate(&valid_document()).is_empty());
    }

    #[test]
    fn test_missing_version_is_single_violation() {
        let mut doc = valid_document();
        doc.info.version = None;

        let violations = validate(&doc);

        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].location, "info.version");
    }

    #[test]
    fn test_unsupported_openapi_version() {
        let mut doc = valid_document();
        doc.openapi = Some("2.0".to_string());

        let violations = validate(&doc);

        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].location, "openapi");
        assert!(violations[0].message.contains("2.0"));
    }

    #[test]
    fn test_undeclared_path_parameter() {
        let mut doc = valid_document();
        let op = doc.paths["/users/{id}"]
            .operations
            .get_mut(&Method::Get)
            .unwrap();
        op.parameters.clear();

        let violations = validate(&doc);

        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].location, "paths./users/{id}.get");
    }

    #[test]
    fn test_path_level_parameters_count() {
        let mut doc = valid_document();
        let item = doc.paths.get_mut("/users/{id}").unwrap();
        item.parameters.push(Parameter::path("id"));
        item.operations.get_mut(&Method::Get).unwrap().parameters.clear();

        assert!(validate(&doc).is_empty());
    }

    #[test]
    fn test_duplicate_path_parameter() {
        let mut doc = valid_document();
        doc.paths
            .get_mut("/users/{id}")
            .unwrap()
            .operations
            .get_mut(&Method::Get)
            .unwrap()
            .parameters
            .push(Parameter::path("id"));

        let violations = validate(&doc);

        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].location, "paths./users/{id}.get");
        assert!(violations[0].message.contains("`id` is declared 2 times"));
    }

    #[test]
    fn test_operation_parameter_overrides_path_level() {
        let mut doc = valid_document();
        let item = doc.paths.get_mut("/users/{id}").unwrap();
        item.parameters.push(Parameter::path("id"));

        assert!(validate(&doc).is_empty());
    }

    #[test]
    fn test_duplicate_operation_ids_and_missing_responses() {
        let mut doc = valid_document();
        let mut item = PathItem::default();
        item.operations
            .insert(Method::Get, ok_operation("get_users_id", &[]));
        let mut no_responses = ok_operation("list_orders", &[]);
        no_responses.responses.clear();
        item.operations.insert(Method::Post, no_responses);
        doc.paths.insert("orders".to_string(), item);

        let violations = validate(&doc);
        let locations: Vec<_> = violations.iter().map(|v| v.location.as_str()).collect();

        assert_eq!(
            locations,
            vec!["paths.orders", "paths.orders.post", "paths.orders.get"]
        );
        assert!(violations[2].message.contains("duplicate operationId"));
    }
}
