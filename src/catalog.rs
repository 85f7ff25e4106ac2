//! Route catalog adapter.
//!
//! The core never sees a live framework route object. An adapter produces immutable
//! [`RouteDescriptor`] values once, and the builder consumes them through the
//! [`RouteCatalog`] trait as a lazy sequence.
//!
//! # Example
//!
//! ```
//! use openapi_from_routes::catalog::{RouteCatalog, RouteDescriptor};
//!
//! let routes = vec![
//!     RouteDescriptor::new("api/users", &["GET", "HEAD"], "UserController@index"),
//!     RouteDescriptor::new("api/users/{id}", &["GET"], "UserController@show")
//!         .with_middleware(&["auth:api"]),
//! ];
//! assert_eq!(routes.routes().count(), 2);
//! ```

use crate::error::{Error, Result};
use crate::serializer::Format;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Trait for anything that can enumerate application routes.
pub trait RouteCatalog {
    /// Returns the route descriptors in discovery order.
    fn routes(&self) -> Box<dyn Iterator<Item = RouteDescriptor> + '_>;
}

/// One registered route, as reported by the hosting application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteDescriptor {
    /// Route pattern as registered (e.g. "api/users/{id}" or "/users/:id")
    #[serde(alias = "uri", alias = "path")]
    pub pattern: String,
    /// HTTP method tokens, any case
    #[serde(default)]
    pub methods: Vec<String>,
    /// Handler name (e.g. "UserController@show" or "handlers::users::show")
    #[serde(default, alias = "handler", alias = "action")]
    pub handler_name: String,
    /// Middleware tags attached to the route (e.g. "auth:api", "throttle:60,1")
    #[serde(default, alias = "middleware")]
    pub middleware_tags: Vec<String>,
}

impl RouteDescriptor {
    /// Create a new RouteDescriptor without middleware
    pub fn new(pattern: &str, methods: &[&str], handler_name: &str) -> Self {
        Self {
            pattern: pattern.to_string(),
            methods: methods.iter().map(|m| m.to_string()).collect(),
            handler_name: handler_name.to_string(),
            middleware_tags: Vec::new(),
        }
    }

    pub fn with_middleware(mut self, tags: &[&str]) -> Self {
        self.middleware_tags = tags.iter().map(|t| t.to_string()).collect();
        self
    }
}

impl RouteCatalog for Vec<RouteDescriptor> {
    fn routes(&self) -> Box<dyn Iterator<Item = RouteDescriptor> + '_> {
        Box::new(self.iter().cloned())
    }
}

impl RouteCatalog for [RouteDescriptor] {
    fn routes(&self) -> Box<dyn Iterator<Item = RouteDescriptor> + '_> {
        Box::new(self.iter().cloned())
    }
}

/// A routes file is either a bare list or an object with a `routes` list
#[derive(Deserialize)]
#[serde(untagged)]
enum CatalogFile {
    List(Vec<RouteDescriptor>),
    Wrapped { routes: Vec<RouteDescriptor> },
}

/// Load route descriptors exported by the hosting application (JSON or YAML).
pub fn load_catalog(path: &Path) -> Result<Vec<RouteDescriptor>> {
    debug!("Loading route catalog from {}", path.display());
    let content = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    let format = Format::from_path(path);

    let file: CatalogFile = match format {
        Format::Yaml => serde_yaml::from_str(&content).map_err(|e| Error::Parse {
            format,
            message: e.to_string(),
        })?,
        Format::Json => serde_json::from_str(&content).map_err(|e| Error::Parse {
            format,
            message: e.to_string(),
        })?,
    };

    let routes = match file {
        CatalogFile::List(routes) => routes,
        CatalogFile::Wrapped { routes } => routes,
    };
    debug!("Loaded {} route descriptors", routes.len());
    Ok(routes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_json_list_with_aliases() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("routes.json");
        fs::write(
            &path,
            r#"[
                {"uri": "api/users", "methods": ["GET", "HEAD"], "action": "UserController@index"},
                {"pattern": "api/users/{id}", "methods": ["GET"], "handlerName": "show", "middlewareTags": ["auth:api"]}
            ]"#,
        )
        .unwrap();

        let routes = load_catalog(&path).unwrap();

        assert_eq!(routes.len(), 2);
        assert_eq!(routes[0].pattern, "api/users");
        assert_eq!(routes[0].handler_name, "UserController@index");
        assert_eq!(routes[1].middleware_tags, vec!["auth:api".to_string()]);
    }

    #[test]
    fn test_load_wrapped_yaml() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("routes.yaml");
        fs::write(
            &path,
            "routes:\n  - pattern: api/orders\n    methods: [POST]\n    middleware: [auth]\n",
        )
        .unwrap();

        let routes = load_catalog(&path).unwrap();

        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].methods, vec!["POST".to_string()]);
        assert_eq!(routes[0].middleware_tags, vec!["auth".to_string()]);
        assert_eq!(routes[0].handler_name, "");
    }

    #[test]
    fn test_load_malformed_catalog() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("routes.json");
        fs::write(&path, "[{\"pattern\": ").unwrap();

        let err = load_catalog(&path).unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }

    #[test]
    fn test_vec_catalog_preserves_order() {
        let routes = vec![
            RouteDescriptor::new("b", &["GET"], ""),
            RouteDescriptor::new("a", &["GET"], ""),
        ];
        let patterns: Vec<_> = routes.routes().map(|r| r.pattern).collect();
        assert_eq!(patterns, vec!["b".to_string(), "a".to_string()]);
    }
}
