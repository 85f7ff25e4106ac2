//! Deterministic merge of two OpenAPI documents.
//!
//! The incoming document wins wherever both sides define the same key. Merging works on
//! copies; neither input is modified.

use crate::document::{Components, Document, Info, PathItem};
use indexmap::IndexMap;
use log::debug;
use std::hash::Hash;

/// Merge `incoming` into a copy of `base`.
///
/// * paths: operations are merged per method, incoming replacing base; path-level
///   fields present in incoming replace base's
/// * components: per component type, incoming definitions replace base's by name
/// * info: incoming fields that are set replace base's
/// * openapi, servers, security, tags: replaced when incoming carries any
///
/// Keys only present in `base` keep their position; new keys are appended in incoming
/// order.
pub fn merge(base: &Document, incoming: &Document) -> Document {
    debug!(
        "Merging document with {} paths into document with {} paths",
        incoming.paths.len(),
        base.paths.len()
    );
    let mut merged = base.clone();

    if incoming.openapi.is_some() {
        merged.openapi = incoming.openapi.clone();
    }
    merge_info(&mut merged.info, &incoming.info);

    if !incoming.servers.is_empty() {
        merged.servers = incoming.servers.clone();
    }

    for (path, item) in &incoming.paths {
        match merged.paths.get_mut(path) {
            Some(existing) => merge_path_item(existing, item),
            None => {
                merged.paths.insert(path.clone(), item.clone());
            }
        }
    }

    merge_components(&mut merged.components, &incoming.components);

    if !incoming.security.is_empty() {
        merged.security = incoming.security.clone();
    }
    if !incoming.tags.is_empty() {
        merged.tags = incoming.tags.clone();
    }

    merged
}

fn merge_info(base: &mut Info, incoming: &Info) {
    if incoming.title.is_some() {
        base.title = incoming.title.clone();
    }
    if incoming.description.is_some() {
        base.description = incoming.description.clone();
    }
    if incoming.version.is_some() {
        base.version = incoming.version.clone();
    }
    if incoming.contact.is_some() {
        base.contact = incoming.contact.clone();
    }
    if incoming.license.is_some() {
        base.license = incoming.license.clone();
    }
}

fn merge_path_item(base: &mut PathItem, incoming: &PathItem) {
    if incoming.summary.is_some() {
        base.summary = incoming.summary.clone();
    }
    if incoming.description.is_some() {
        base.description = incoming.description.clone();
    }
    if !incoming.parameters.is_empty() {
        base.parameters = incoming.parameters.clone();
    }
    overlay(&mut base.operations, &incoming.operations);
}

fn merge_components(base: &mut Components, incoming: &Components) {
    overlay(&mut base.schemas, &incoming.schemas);
    overlay(&mut base.security_schemes, &incoming.security_schemes);
    overlay(&mut base.responses, &incoming.responses);
    overlay(&mut base.parameters, &incoming.parameters);
}

fn overlay<K, V>(base: &mut IndexMap<K, V>, incoming: &IndexMap<K, V>)
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    for (key, value) in incoming {
        base.insert(key.clone(), value.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Method, Operation, Schema, Server, Tag};
    use pretty_assertions::assert_eq;

    fn op(summary: &str) -> Operation {
        Operation {
            summary: Some(summary.to_string()),
            ..Operation::default()
        }
    }

    fn doc_with(paths: &[(&str, Method, &str)]) -> Document {
        let mut doc = Document {
            openapi: Some("3.0.3".to_string()),
            info: Info {
                title: Some("API".to_string()),
                version: Some("1.0.0".to_string()),
                ..Info::default()
            },
            ..Document::default()
        };
        for (path, method, summary) in paths {
            doc.paths
                .entry(path.to_string())
                .or_default()
                .operations
                .insert(*method, op(summary));
        }
        doc
    }

    #[test]
    fn test_merge_with_empty_is_identity() {
        let base = doc_with(&[("/users", Method::Get, "list")]);

        assert_eq!(merge(&base, &Document::default()), base);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let doc = doc_with(&[("/users", Method::Get, "list"), ("/orders", Method::Post, "create")]);

        assert_eq!(merge(&doc, &doc), doc);
    }

    #[test]
    fn test_incoming_method_replaces_base_method() {
        let base = doc_with(&[("/users", Method::Get, "old"), ("/users", Method::Post, "create")]);
        let incoming = doc_with(&[("/users", Method::Get, "new")]);

        let merged = merge(&base, &incoming);
        let item = &merged.paths["/users"];

        assert_eq!(item.operations[&Method::Get].summary.as_deref(), Some("new"));
        assert_eq!(item.operations[&Method::Post].summary.as_deref(), Some("create"));
    }

    #[test]
    fn test_disjoint_merge_is_order_independent() {
        let a = doc_with(&[("/a", Method::Get, "a")]);
        let b = doc_with(&[("/b", Method::Get, "b")]);

        let ab = merge(&a, &b);
        let ba = merge(&b, &a);

        assert_eq!(ab.paths.len(), 2);
        assert_eq!(ab.paths, ba.paths);
        // Base keys come first
        assert_eq!(ab.paths.keys().next().unwrap(), "/a");
    }

    #[test]
    fn test_inputs_are_not_modified() {
        let base = doc_with(&[("/users", Method::Get, "old")]);
        let incoming = doc_with(&[("/users", Method::Get, "new"), ("/x", Method::Get, "x")]);
        let (base_before, incoming_before) = (base.clone(), incoming.clone());

        let _ = merge(&base, &incoming);

        assert_eq!(base, base_before);
        assert_eq!(incoming, incoming_before);
    }

    #[test]
    fn test_components_and_info() {
        let mut base = doc_with(&[]);
        base.components
            .schemas
            .insert("User".to_string(), Schema::of_type("object"));
        base.components
            .schemas
            .insert("Order".to_string(), Schema::of_type("object"));
        base.info.description = Some("base description".to_string());

        let mut incoming = Document::default();
        incoming
            .components
            .schemas
            .insert("User".to_string(), Schema::of_type("string"));
        incoming.info.version = Some("2.0.0".to_string());

        let merged = merge(&base, &incoming);

        assert_eq!(merged.components.schemas.len(), 2);
        assert_eq!(
            merged.components.schemas["User"].schema_type.as_deref(),
            Some("string")
        );
        assert_eq!(merged.info.version.as_deref(), Some("2.0.0"));
        assert_eq!(merged.info.title.as_deref(), Some("API"));
        assert_eq!(merged.info.description.as_deref(), Some("base description"));
    }

    #[test]
    fn test_lists_replaced_only_when_present() {
        let mut base = doc_with(&[]);
        base.servers = vec![Server {
            url: "http://base".to_string(),
            description: None,
        }];
        base.tags = vec![Tag {
            name: "Base".to_string(),
            description: None,
        }];
        let mut incoming = Document::default();
        incoming.servers = vec![Server {
            url: "http://incoming".to_string(),
            description: None,
        }];

        let merged = merge(&base, &incoming);

        assert_eq!(merged.servers[0].url, "http://incoming");
        assert_eq!(merged.tags[0].name, "Base");
    }
}
