//! OpenAPI from routes - OpenAPI documentation and static docs sites from a route catalog.
//!
//! This library turns the routes an application registers into an OpenAPI 3 document,
//! merges and imports existing specifications, caches built documents, and renders the
//! result as a static documentation site with pluggable themes.
//!
//! # Architecture
//!
//! The library is organized into several modules that work together:
//!
//! 1. [`catalog`] - Route descriptors and the [`catalog::RouteCatalog`] source trait
//! 2. [`filter`] - Prefix and glob filtering of route patterns
//! 3. [`naming`] - Path normalization, operation ids, tags and summaries
//! 4. [`openapi_builder`] - Builds the [`document::Document`] from a catalog
//! 5. [`validate`] - Structural validation of a document
//! 6. [`merge`] - Overlays one document onto another
//! 7. [`serializer`] - JSON/YAML export and import
//! 8. [`cache`] - Cached builds with single-flight
//! 9. [`theme`] and [`site`] - Theme rendering and static site generation
//!
//! # Example Usage
//!
//! ```no_run
//! use openapi_from_routes::{
//!     catalog::RouteDescriptor,
//!     config::Config,
//!     openapi_builder::OpenApiBuilder,
//!     serializer::serialize_yaml,
//! };
//!
//! let routes = vec![
//!     RouteDescriptor::new("api/users", &["GET", "POST"], "UserController@index"),
//!     RouteDescriptor::new("api/users/{id}", &["GET"], "UserController@show")
//!         .with_middleware(&["auth:api"]),
//! ];
//!
//! let builder = OpenApiBuilder::new(Config::default().build_options());
//! let document = builder.build(&routes).unwrap();
//!
//! let yaml = serialize_yaml(&document).unwrap();
//! println!("{}", yaml);
//! ```
//!
//! # Command-Line Interface
//!
//! For command-line usage, see the [`cli`] module which provides a complete CLI application.

pub mod cache;
pub mod cancel;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod document;
pub mod error;
pub mod filter;
pub mod merge;
pub mod naming;
pub mod openapi_builder;
pub mod serializer;
pub mod site;
pub mod theme;
pub mod validate;
