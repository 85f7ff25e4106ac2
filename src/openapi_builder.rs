//! Turns a route catalog into an OpenAPI document.
//!
//! Per-route synthesis is pure and runs in parallel; the results are then folded into
//! the document sequentially in catalog order, which keeps the output deterministic.

use crate::cancel::CancelFlag;
use crate::catalog::RouteCatalog;
use crate::catalog::RouteDescriptor;
use crate::document::{
    Document, Info, MediaType, Method, Operation, Parameter, PathItem, RequestBody, Response,
    Schema, SecurityRequirement, SecurityScheme, Server, Tag,
};
use crate::error::{Error, Result};
use crate::filter::RouteFilter;
use crate::naming;
use crate::validate::validate;
use indexmap::IndexMap;
use log::{debug, info, warn};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Scheme used for a bare `auth` tag and for guards with no configured mapping
pub const DEFAULT_SECURITY_SCHEME: &str = "bearerAuth";

/// Everything one build depends on.
///
/// Two builds with equal options over the same catalog produce equal documents, which is
/// what lets the cache key be derived from this value alone.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuildOptions {
    /// Only routes whose pattern starts with this prefix are documented
    pub path_prefix: String,
    pub include_patterns: Vec<String>,
    pub exclude_patterns: Vec<String>,
    /// Value of the document's `openapi` field
    pub spec_version: String,
    pub info: Info,
    pub servers: Vec<Server>,
    /// Security scheme definitions copied into `components.securitySchemes`
    pub security_schemes: IndexMap<String, SecurityScheme>,
    /// Guard name -> security scheme identifier
    pub guard_schemes: IndexMap<String, String>,
    /// Fail the build on any validation violation instead of logging it
    pub validate: bool,
}

/// Per-route synthesis result, before merging into the document
struct RouteOperations {
    path: String,
    operations: Vec<(Method, Operation)>,
    schemes: Vec<String>,
}

/// Route counts reported by `status`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RouteStats {
    pub total_routes: usize,
    pub documented_routes: usize,
    /// Method token -> number of documented routes declaring it
    pub methods: BTreeMap<String, usize>,
    /// Middleware tag -> number of documented routes carrying it
    pub middleware: BTreeMap<String, usize>,
}

/// OpenAPI document builder
pub struct OpenApiBuilder {
    options: BuildOptions,
    cancel: Option<CancelFlag>,
}

impl OpenApiBuilder {
    pub fn new(options: BuildOptions) -> Self {
        debug!("Initializing OpenApiBuilder");
        Self {
            options,
            cancel: None,
        }
    }

    /// Observe a cancellation flag between routes
    pub fn with_cancellation(mut self, cancel: CancelFlag) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn options(&self) -> &BuildOptions {
        &self.options
    }

    /// Build a document from every in-scope route of the catalog.
    ///
    /// # Errors
    ///
    /// * [`Error::Configuration`] for an empty prefix or a malformed glob
    /// * [`Error::InvalidRoute`] when a template repeats a parameter name
    /// * [`Error::Validation`] when the result is invalid and `options.validate` is set
    /// * [`Error::Cancelled`] when the cancellation flag is raised mid-build
    pub fn build(&self, catalog: &dyn RouteCatalog) -> Result<Document> {
        let filter = self.filter()?;

        let routes: Vec<RouteDescriptor> = catalog
            .routes()
            .filter(|route| filter.matches(&route.pattern))
            .collect();
        info!("Documenting {} routes", routes.len());

        let synthesized = routes
            .par_iter()
            .map(|route| {
                self.check_cancelled()?;
                self.synthesize(route)
            })
            .collect::<Result<Vec<_>>>()?;
        self.check_cancelled()?;

        let document = self.assemble(synthesized);

        let violations = validate(&document);
        if !violations.is_empty() {
            if self.options.validate {
                return Err(Error::Validation(violations));
            }
            for violation in &violations {
                warn!("Generated document: {}", violation);
            }
        }

        debug!(
            "Built document with {} paths and {} tags",
            document.paths.len(),
            document.tags.len()
        );
        Ok(document)
    }

    /// Count routes in the catalog without building a document
    pub fn route_stats(&self, catalog: &dyn RouteCatalog) -> Result<RouteStats> {
        let filter = self.filter()?;
        let mut stats = RouteStats::default();

        for route in catalog.routes() {
            stats.total_routes += 1;
            if !filter.matches(&route.pattern) {
                continue;
            }
            stats.documented_routes += 1;
            for method in &route.methods {
                *stats.methods.entry(method.to_ascii_uppercase()).or_default() += 1;
            }
            for tag in &route.middleware_tags {
                *stats.middleware.entry(tag.clone()).or_default() += 1;
            }
        }

        Ok(stats)
    }

    fn filter(&self) -> Result<RouteFilter> {
        RouteFilter::new(
            &self.options.path_prefix,
            &self.options.include_patterns,
            &self.options.exclude_patterns,
        )
    }

    fn check_cancelled(&self) -> Result<()> {
        match &self.cancel {
            Some(flag) if flag.is_cancelled() => Err(Error::Cancelled {
                stage: "route synthesis".to_string(),
            }),
            _ => Ok(()),
        }
    }

    /// Synthesize the operations of a single route
    fn synthesize(&self, route: &RouteDescriptor) -> Result<RouteOperations> {
        let path = naming::normalize_path(&route.pattern);
        let params = naming::template_parameters(&path);

        let mut seen = HashSet::new();
        if let Some(duplicate) = params.iter().find(|p| !seen.insert(p.as_str())) {
            return Err(Error::InvalidRoute {
                pattern: route.pattern.clone(),
                message: format!("parameter `{}` appears more than once", duplicate),
            });
        }

        let scheme = self.security_scheme(&route.middleware_tags);

        let mut methods: Vec<Method> = Vec::new();
        for token in &route.methods {
            match Method::parse(token) {
                Some(Method::Head | Method::Options) => {}
                Some(method) => methods.push(method),
                None => warn!("Skipping unsupported method `{}` on {}", token, path),
            }
        }
        methods.sort();
        methods.dedup();

        let operations = methods
            .into_iter()
            .map(|method| {
                let operation = self.operation(route, method, &path, &params, scheme.as_deref());
                (method, operation)
            })
            .collect();

        Ok(RouteOperations {
            path,
            operations,
            schemes: scheme.into_iter().collect(),
        })
    }

    fn operation(
        &self,
        route: &RouteDescriptor,
        method: Method,
        path: &str,
        params: &[String],
        scheme: Option<&str>,
    ) -> Operation {
        let security = scheme.map(|scheme| {
            let mut requirement = SecurityRequirement::new();
            requirement.insert(scheme.to_string(), Vec::new());
            vec![requirement]
        });

        Operation {
            summary: Some(naming::summary(
                method,
                &route.handler_name,
                path,
                &self.options.path_prefix,
            )),
            description: Some(format!("Endpoint for {} {}", method, path)),
            operation_id: Some(naming::operation_id(method, path)),
            tags: vec![naming::tag_for_path(path)],
            parameters: params.iter().map(|p| Parameter::path(p)).collect(),
            request_body: method.has_body().then(default_request_body),
            responses: default_responses(scheme.is_some()),
            security,
        }
    }

    /// Security scheme for a route's middleware tags, if it requires authentication
    fn security_scheme(&self, middleware_tags: &[String]) -> Option<String> {
        middleware_tags.iter().find_map(|tag| {
            if tag == "auth" {
                return Some(DEFAULT_SECURITY_SCHEME.to_string());
            }
            let guards = tag.strip_prefix("auth:")?;
            let guard = guards.split(',').next().unwrap_or("").trim();
            Some(
                self.options
                    .guard_schemes
                    .get(guard)
                    .cloned()
                    .unwrap_or_else(|| DEFAULT_SECURITY_SCHEME.to_string()),
            )
        })
    }

    /// Fold synthesized routes into a document, in catalog order
    fn assemble(&self, synthesized: Vec<RouteOperations>) -> Document {
        let mut paths: IndexMap<String, PathItem> = IndexMap::new();
        let mut operation_ids: HashMap<String, (String, Method)> = HashMap::new();
        let mut referenced_schemes: Vec<String> = Vec::new();

        for RouteOperations {
            path,
            operations,
            schemes,
        } in synthesized
        {
            if operations.is_empty() {
                debug!("Dropping {}: no documentable methods", path);
                continue;
            }
            referenced_schemes.extend(schemes);

            for (method, operation) in operations {
                if let Some(id) = operation.operation_id.clone() {
                    let owner = (path.clone(), method);
                    if let Some(previous) = operation_ids.insert(id.clone(), owner.clone()) {
                        if previous != owner {
                            warn!(
                                "operationId `{}` of {} {} collides with {} {}; keeping the later one",
                                id, previous.1, previous.0, method, path
                            );
                            if let Some(earlier) = paths
                                .get_mut(&previous.0)
                                .and_then(|item| item.operations.get_mut(&previous.1))
                            {
                                earlier.operation_id = None;
                            }
                        }
                    }
                }
                paths
                    .entry(path.clone())
                    .or_default()
                    .operations
                    .insert(method, operation);
            }
        }

        let mut tags: Vec<Tag> = Vec::new();
        for item in paths.values() {
            for operation in item.operations.values() {
                for name in &operation.tags {
                    if !tags.iter().any(|t| &t.name == name) {
                        tags.push(Tag {
                            name: name.clone(),
                            description: Some(format!("Operations related to {}", name)),
                        });
                    }
                }
            }
        }

        let mut document = Document {
            openapi: Some(self.options.spec_version.clone()),
            info: self.options.info.clone(),
            servers: self.options.servers.clone(),
            paths,
            tags,
            ..Document::default()
        };

        document.components.security_schemes = self.options.security_schemes.clone();
        for scheme in referenced_schemes {
            if !document.components.security_schemes.contains_key(&scheme) {
                debug!("Adding bearer definition for referenced scheme {}", scheme);
                document
                    .components
                    .security_schemes
                    .insert(scheme, SecurityScheme::bearer());
            }
        }

        document
    }
}

fn default_request_body() -> RequestBody {
    let mut content = IndexMap::new();
    for media_type in ["application/json", "application/x-www-form-urlencoded"] {
        content.insert(
            media_type.to_string(),
            MediaType {
                schema: Some(Schema::object(IndexMap::new())),
            },
        );
    }
    RequestBody {
        description: Some("Request body".to_string()),
        required: true,
        content,
    }
}

fn default_responses(authenticated: bool) -> IndexMap<String, Response> {
    let mut responses = IndexMap::new();
    responses.insert(
        "200".to_string(),
        Response::json("Successful response", Schema::object(IndexMap::new())),
    );

    if authenticated {
        responses.insert(
            "401".to_string(),
            Response::json("Unauthorized", message_schema(false)),
        );
    }

    responses.insert(
        "422".to_string(),
        Response::json("Validation error", message_schema(true)),
    );
    responses
}

fn message_schema(with_errors: bool) -> Schema {
    let mut message = Schema::of_type("string");
    if !with_errors {
        message.example = Some(serde_json::Value::from("Unauthenticated."));
    }

    let mut properties = IndexMap::new();
    properties.insert("message".to_string(), message);
    if with_errors {
        properties.insert("errors".to_string(), Schema::of_type("object"));
    }
    Schema::object(properties)
}
