//! Documentation themes.
//!
//! A theme turns a specification URL into one HTML page. The generator only knows the
//! [`ThemeRenderer`] trait; the built-in themes are minijinja templates, and callers can
//! register their own renderers (closures work too) under any id.

use indexmap::IndexMap;
use log::warn;
use minijinja::Environment;
use serde::Serialize;

/// Values available to a theme while rendering
#[derive(Debug, Clone, Serialize)]
pub struct ThemeContext<'a> {
    pub theme: &'a str,
    pub title: &'a str,
    /// URL of the JSON specification the page should load
    pub spec_url: &'a str,
    /// Site base URL, without a trailing slash
    pub base_url: &'a str,
    /// Whether the shared css/js/img assets are published next to the page
    pub assets: bool,
}

/// Renders one documentation page
pub trait ThemeRenderer: Send + Sync {
    fn render(&self, context: &ThemeContext<'_>) -> anyhow::Result<String>;
}

impl<F> ThemeRenderer for F
where
    F: Fn(&ThemeContext<'_>) -> anyhow::Result<String> + Send + Sync,
{
    fn render(&self, context: &ThemeContext<'_>) -> anyhow::Result<String> {
        self(context)
    }
}

/// A theme backed by a minijinja template.
///
/// The template name ends in `.html`, so values are HTML-escaped unless piped through
/// `tojson` (used for values embedded in scripts).
pub struct TemplateTheme {
    name: String,
    source: String,
}

impl TemplateTheme {
    pub fn new(name: &str, source: &str) -> Self {
        Self {
            name: format!("{}.html", name),
            source: source.to_string(),
        }
    }
}

impl ThemeRenderer for TemplateTheme {
    fn render(&self, context: &ThemeContext<'_>) -> anyhow::Result<String> {
        let mut env = Environment::new();
        env.add_template(&self.name, &self.source)?;
        let template = env.get_template(&self.name)?;
        Ok(template.render(context)?)
    }
}

const SWAGGER_TEMPLATE: &str = include_str!("../templates/themes/swagger.html");
const REDOC_TEMPLATE: &str = include_str!("../templates/themes/redoc.html");
const RAPIDOC_TEMPLATE: &str = include_str!("../templates/themes/rapidoc.html");
const CUSTOM_TEMPLATE: &str = include_str!("../templates/themes/custom.html");

fn builtin_template(id: &str) -> Option<&'static str> {
    match id {
        "swagger" => Some(SWAGGER_TEMPLATE),
        "redoc" => Some(REDOC_TEMPLATE),
        "rapidoc" => Some(RAPIDOC_TEMPLATE),
        "custom" => Some(CUSTOM_TEMPLATE),
        _ => None,
    }
}

struct RegisteredTheme {
    display_name: String,
    renderer: Box<dyn ThemeRenderer>,
}

/// Theme id -> renderer, in registration order
#[derive(Default)]
pub struct ThemeRegistry {
    themes: IndexMap<String, RegisteredTheme>,
}

impl ThemeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in templates for the given `id -> display name` list.
    ///
    /// Ids without a built-in template are skipped; register a renderer for them
    /// explicitly.
    pub fn with_builtin_themes(available: &IndexMap<String, String>) -> Self {
        let mut registry = Self::new();
        for (id, display_name) in available {
            match builtin_template(id) {
                Some(source) => {
                    registry.register(id, display_name, Box::new(TemplateTheme::new(id, source)))
                }
                None => warn!("No built-in template for theme `{}`", id),
            }
        }
        registry
    }

    /// Add or replace a theme
    pub fn register(&mut self, id: &str, display_name: &str, renderer: Box<dyn ThemeRenderer>) {
        self.themes.insert(
            id.to_string(),
            RegisteredTheme {
                display_name: display_name.to_string(),
                renderer,
            },
        );
    }

    pub fn get(&self, id: &str) -> Option<&dyn ThemeRenderer> {
        self.themes.get(id).map(|t| t.renderer.as_ref())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.themes.contains_key(id)
    }

    pub fn display_name(&self, id: &str) -> Option<&str> {
        self.themes.get(id).map(|t| t.display_name.as_str())
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.themes.keys().map(String::as_str)
    }
}
