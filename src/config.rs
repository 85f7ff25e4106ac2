//! Explicit configuration passed into the builder and the static site generator.
//!
//! A [`Config`] is loaded once (from YAML or JSON) and then turned into the narrower
//! [`BuildOptions`] and [`StaticConfig`] values the core consumes. Core modules never
//! look configuration up on their own.

use crate::document::{Contact, Info, License, SecurityScheme, Server};
use crate::error::{Error, Result};
use crate::openapi_builder::BuildOptions;
use crate::serializer::Format;
use indexmap::IndexMap;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level configuration file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub title: String,
    pub description: String,
    pub version: String,
    pub contact: Option<Contact>,
    pub license: Option<License>,
    pub openapi: OpenApiConfig,
    pub scan_routes: ScanConfig,
    /// Guard name (the part after `auth:`) -> security scheme identifier
    pub guards: IndexMap<String, String>,
    /// Theme id -> display name
    pub available_themes: IndexMap<String, String>,
    /// Directory for generated, imported and backup specification files
    pub storage_path: PathBuf,
    pub cache: CacheConfig,
    #[serde(rename = "static")]
    pub static_site: StaticConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenApiConfig {
    pub version: String,
    pub servers: Vec<Server>,
    /// Security scheme definitions, keyed by scheme identifier
    pub security: IndexMap<String, SecurityScheme>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub prefix: String,
    pub exclude: Vec<String>,
    pub include: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    /// Time to live in seconds
    pub ttl: u64,
    pub key_prefix: String,
    /// Cache directory; defaults to `{storage_path}/cache`
    pub directory: Option<PathBuf>,
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl)
    }
}

/// Static site generation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticConfig {
    pub output_path: PathBuf,
    pub base_url: String,
    pub themes: Vec<String>,
    pub minify_html: bool,
    pub include_assets: bool,
    pub generate_sitemap: bool,
}

impl Default for Config {
    fn default() -> Self {
        let mut guards = IndexMap::new();
        guards.insert("api".to_string(), "bearerAuth".to_string());
        guards.insert("sanctum".to_string(), "sanctumAuth".to_string());
        guards.insert("jwt".to_string(), "jwtAuth".to_string());

        let mut available_themes = IndexMap::new();
        for (id, name) in [
            ("swagger", "Swagger UI"),
            ("redoc", "ReDoc"),
            ("rapidoc", "RapiDoc"),
            ("custom", "Custom Theme"),
        ] {
            available_themes.insert(id.to_string(), name.to_string());
        }

        Self {
            title: "API Documentation".to_string(),
            description: "Generated API Documentation".to_string(),
            version: "1.0.0".to_string(),
            contact: None,
            license: None,
            openapi: OpenApiConfig::default(),
            scan_routes: ScanConfig::default(),
            guards,
            available_themes,
            storage_path: PathBuf::from("storage/api-docs"),
            cache: CacheConfig::default(),
            static_site: StaticConfig::default(),
        }
    }
}

impl Default for OpenApiConfig {
    fn default() -> Self {
        let mut security = IndexMap::new();
        security.insert("bearerAuth".to_string(), SecurityScheme::bearer());
        security.insert(
            "apiKey".to_string(),
            SecurityScheme::api_key_header("X-API-Key"),
        );

        Self {
            version: "3.0.3".to_string(),
            servers: vec![Server {
                url: "http://localhost".to_string(),
                description: Some("Development Server".to_string()),
            }],
            security,
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            prefix: "api".to_string(),
            exclude: vec![
                "telescope*".to_string(),
                "horizon*".to_string(),
                "nova-api*".to_string(),
            ],
            include: Vec::new(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            ttl: 3600,
            key_prefix: "api-docs:".to_string(),
            directory: None,
        }
    }
}

impl Default for StaticConfig {
    fn default() -> Self {
        Self {
            output_path: PathBuf::from("public/api-docs-static"),
            base_url: "/api-docs-static".to_string(),
            themes: vec![
                "swagger".to_string(),
                "redoc".to_string(),
                "rapidoc".to_string(),
                "custom".to_string(),
            ],
            minify_html: false,
            include_assets: true,
            generate_sitemap: true,
        }
    }
}

impl Config {
    /// Load a configuration file; YAML for `.yml`/`.yaml`, JSON otherwise
    pub fn load(path: &Path) -> Result<Config> {
        debug!("Loading configuration from {}", path.display());
        let content = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let format = Format::from_path(path);
        let config = match format {
            Format::Yaml => serde_yaml::from_str(&content).map_err(|e| Error::Parse {
                format,
                message: e.to_string(),
            })?,
            Format::Json => serde_json::from_str(&content).map_err(|e| Error::Parse {
                format,
                message: e.to_string(),
            })?,
        };
        Ok(config)
    }

    /// Options for one specification build
    pub fn build_options(&self) -> BuildOptions {
        BuildOptions {
            path_prefix: self.scan_routes.prefix.clone(),
            include_patterns: self.scan_routes.include.clone(),
            exclude_patterns: self.scan_routes.exclude.clone(),
            spec_version: self.openapi.version.clone(),
            info: Info {
                title: Some(self.title.clone()),
                description: Some(self.description.clone()),
                version: Some(self.version.clone()),
                contact: self.contact.clone(),
                license: self.license.clone(),
            },
            servers: self.openapi.servers.clone(),
            security_schemes: self.openapi.security.clone(),
            guard_schemes: self.guards.clone(),
            validate: false,
        }
    }

    pub fn static_config(&self) -> StaticConfig {
        self.static_site.clone()
    }

    pub fn cache_directory(&self) -> PathBuf {
        self.cache
            .directory
            .clone()
            .unwrap_or_else(|| self.storage_path.join("cache"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();

        assert_eq!(config.openapi.version, "3.0.3");
        assert_eq!(config.scan_routes.prefix, "api");
        assert_eq!(config.guards["api"], "bearerAuth");
        assert!(config.openapi.security.contains_key("bearerAuth"));
        assert!(!config.cache.enabled);
        assert_eq!(config.cache.ttl(), Duration::from_secs(3600));
        assert!(config.static_site.generate_sitemap);
    }

    #[test]
    fn test_load_partial_yaml_keeps_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("api-docs.yaml");
        fs::write(
            &path,
            "title: Shop API\nscan_routes:\n  prefix: v2\nstatic:\n  themes: [redoc]\n",
        )
        .unwrap();

        let config = Config::load(&path).unwrap();

        assert_eq!(config.title, "Shop API");
        assert_eq!(config.scan_routes.prefix, "v2");
        // Fields absent from the nested section fall back to their defaults
        assert_eq!(config.scan_routes.exclude.len(), 3);
        assert_eq!(config.static_site.themes, vec!["redoc".to_string()]);
        assert!(config.static_site.include_assets);
        assert_eq!(config.version, "1.0.0");
    }

    #[test]
    fn test_load_json() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("api-docs.json");
        fs::write(&path, r#"{"cache": {"enabled": true, "ttl": 60}}"#).unwrap();

        let config = Config::load(&path).unwrap();

        assert!(config.cache.enabled);
        assert_eq!(config.cache.ttl, 60);
        assert_eq!(config.cache.key_prefix, "api-docs:");
    }

    #[test]
    fn test_load_malformed_file_is_parse_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("broken.json");
        fs::write(&path, "{ not json").unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, Error::Parse { format: Format::Json, .. }));
    }

    #[test]
    fn test_build_options_carry_info() {
        let options = Config::default().build_options();

        assert_eq!(options.path_prefix, "api");
        assert_eq!(options.info.title.as_deref(), Some("API Documentation"));
        assert_eq!(options.info.version.as_deref(), Some("1.0.0"));
        assert!(!options.validate);
    }

    #[test]
    fn test_cache_directory_defaults_under_storage() {
        let config = Config::default();
        assert_eq!(
            config.cache_directory(),
            PathBuf::from("storage/api-docs/cache")
        );
    }
}
