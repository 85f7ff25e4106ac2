//! Static documentation site generation.
//!
//! The generator runs a fixed pipeline of stages over one document: prepare the output
//! root, write the specification files, render one page per theme, the index page,
//! the shared assets and the sitemap. The first failing stage aborts the run;
//! files already written stay on disk.
//!
//! ```text
//! {output}/
//! +-- openapi.json
//! +-- openapi.yaml
//! +-- {theme}.html       # one per selected theme
//! +-- index.html
//! +-- assets/            # when assets are enabled
//! |   +-- css/api-docs.css
//! |   +-- js/api-docs.js
//! |   +-- img/favicon.ico
//! +-- sitemap.xml        # when the sitemap is enabled
//! ```

pub mod assets;
pub mod minify;
pub mod sitemap;

use crate::cancel::CancelFlag;
use crate::config::StaticConfig;
use crate::document::Document;
use crate::error::{Error, Result};
use crate::serializer::{serialize_json, serialize_yaml};
use crate::theme::{ThemeContext, ThemeRegistry};
use log::{debug, info};
use minijinja::Environment;
use serde_json::json;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

const INDEX_TEMPLATE: &str = include_str!("../../templates/index.html");
const DEFAULT_TITLE: &str = "API Documentation";

/// Pipeline stage, reported on failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    OutputRoot,
    SpecFiles,
    Theme,
    IndexPage,
    Assets,
    Sitemap,
    Summary,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::OutputRoot => "output directory",
            Stage::SpecFiles => "specification files",
            Stage::Theme => "theme rendering",
            Stage::IndexPage => "index page",
            Stage::Assets => "assets",
            Stage::Sitemap => "sitemap",
            Stage::Summary => "summary",
        };
        f.write_str(name)
    }
}

/// What a successful run produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationResult {
    pub output_root: PathBuf,
    /// Every file written, in write order
    pub files: Vec<PathBuf>,
    /// Sum of the sizes of `files` on disk
    pub total_bytes: u64,
}

/// Collects written files under the output root
struct SiteWriter {
    root: PathBuf,
    files: Vec<PathBuf>,
    minify: bool,
}

impl SiteWriter {
    fn write(&mut self, relative: &str, content: &[u8], stage: Stage) -> Result<()> {
        let path = self.root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| generation(stage, None, &path, e))?;
        }
        fs::write(&path, content).map_err(|e| generation(stage, None, &path, e))?;
        debug!("Wrote {} ({} bytes)", path.display(), content.len());
        self.files.push(path);
        Ok(())
    }

    /// Write an HTML page, minified when configured
    fn write_page(&mut self, relative: &str, html: &str, stage: Stage) -> Result<()> {
        if self.minify {
            self.write(relative, minify::minify_html(html).as_bytes(), stage)
        } else {
            self.write(relative, html.as_bytes(), stage)
        }
    }
}

fn generation(stage: Stage, theme: Option<&str>, path: &Path, err: std::io::Error) -> Error {
    Error::Generation {
        stage,
        theme: theme.map(str::to_string),
        message: format!("{}: {}", path.display(), err),
    }
}

fn total_size(files: &[PathBuf]) -> Result<u64> {
    let mut total = 0;
    for file in files {
        let metadata = fs::metadata(file).map_err(|e| generation(Stage::Summary, None, file, e))?;
        total += metadata.len();
    }
    Ok(total)
}

/// Renders a document into a static documentation site
pub struct SiteGenerator<'a> {
    config: StaticConfig,
    themes: &'a ThemeRegistry,
    cancel: Option<CancelFlag>,
}

impl<'a> SiteGenerator<'a> {
    pub fn new(config: StaticConfig, themes: &'a ThemeRegistry) -> Self {
        Self {
            config,
            themes,
            cancel: None,
        }
    }

    /// Observe a cancellation flag between stages
    pub fn with_cancellation(mut self, cancel: CancelFlag) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Theme ids to render: configured order, blanks and duplicates dropped.
    ///
    /// # Errors
    ///
    /// [`Error::Configuration`] when no theme remains or one is not registered.
    pub fn selected_themes(&self) -> Result<Vec<String>> {
        let mut selected: Vec<String> = Vec::new();
        for id in &self.config.themes {
            let id = id.trim();
            if !id.is_empty() && !selected.iter().any(|s| s == id) {
                selected.push(id.to_string());
            }
        }

        if selected.is_empty() {
            return Err(Error::configuration("themes", "at least one theme is required"));
        }
        if let Some(unknown) = selected.iter().find(|id| !self.themes.contains(id)) {
            return Err(Error::configuration(
                "themes",
                format!("unknown theme `{}`", unknown),
            ));
        }
        Ok(selected)
    }

    /// Run the full pipeline.
    ///
    /// # Errors
    ///
    /// * [`Error::Configuration`] before anything is written, for bad settings
    /// * [`Error::Generation`] naming the failed stage (and theme, when rendering)
    /// * [`Error::Cancelled`] when the flag is raised between stages
    pub fn generate(&self, doc: &Document) -> Result<GenerationResult> {
        if self.config.output_path.as_os_str().is_empty() {
            return Err(Error::configuration("output_path", "output path must not be empty"));
        }
        let themes = self.selected_themes()?;
        let base_url = self.config.base_url.trim().trim_end_matches('/');
        let spec_url = format!("{}/openapi.json", base_url);
        let title = doc.info.title.as_deref().unwrap_or(DEFAULT_TITLE);

        info!(
            "Generating static documentation into {} ({} themes)",
            self.config.output_path.display(),
            themes.len()
        );

        self.check_cancelled(Stage::OutputRoot)?;
        let root = self.config.output_path.clone();
        fs::create_dir_all(&root).map_err(|e| generation(Stage::OutputRoot, None, &root, e))?;
        let mut writer = SiteWriter {
            root,
            files: Vec::new(),
            minify: self.config.minify_html,
        };

        self.check_cancelled(Stage::SpecFiles)?;
        let json = serialize_json(doc, self.config.minify_html).map_err(|e| Error::Generation {
            stage: Stage::SpecFiles,
            theme: None,
            message: e.to_string(),
        })?;
        let yaml = serialize_yaml(doc).map_err(|e| Error::Generation {
            stage: Stage::SpecFiles,
            theme: None,
            message: e.to_string(),
        })?;
        writer.write("openapi.json", json.as_bytes(), Stage::SpecFiles)?;
        writer.write("openapi.yaml", yaml.as_bytes(), Stage::SpecFiles)?;

        for theme in &themes {
            self.check_cancelled(Stage::Theme)?;
            let context = ThemeContext {
                theme,
                title,
                spec_url: &spec_url,
                base_url,
                assets: self.config.include_assets,
            };
            let html = self
                .themes
                .get(theme)
                .ok_or_else(|| Error::configuration("themes", format!("unknown theme `{}`", theme)))?
                .render(&context)
                .map_err(|e| Error::Generation {
                    stage: Stage::Theme,
                    theme: Some(theme.clone()),
                    message: format!("{:#}", e),
                })?;
            writer
                .write_page(&format!("{}.html", theme), &html, Stage::Theme)
                .map_err(|e| with_theme(e, theme))?;
        }

        self.check_cancelled(Stage::IndexPage)?;
        let index = self
            .render_index(doc, title, base_url, &themes)
            .map_err(|e| Error::Generation {
                stage: Stage::IndexPage,
                theme: None,
                message: format!("{:#}", e),
            })?;
        writer.write_page("index.html", &index, Stage::IndexPage)?;

        if self.config.include_assets {
            self.check_cancelled(Stage::Assets)?;
            for (relative, content) in assets::assets() {
                writer.write(relative, content, Stage::Assets)?;
            }
        }

        if self.config.generate_sitemap {
            self.check_cancelled(Stage::Sitemap)?;
            let xml = sitemap::render_sitemap(base_url, &themes);
            writer.write("sitemap.xml", xml.as_bytes(), Stage::Sitemap)?;
        }

        let total_bytes = total_size(&writer.files)?;

        info!(
            "Generated {} files ({} bytes) in {}",
            writer.files.len(),
            total_bytes,
            writer.root.display()
        );
        Ok(GenerationResult {
            output_root: writer.root,
            files: writer.files,
            total_bytes,
        })
    }

    fn render_index(
        &self,
        doc: &Document,
        title: &str,
        base_url: &str,
        themes: &[String],
    ) -> anyhow::Result<String> {
        let links: Vec<_> = themes
            .iter()
            .map(|id| {
                json!({
                    "id": id,
                    "name": self.themes.display_name(id).unwrap_or(id),
                    "url": format!("{}/{}.html", base_url, id),
                })
            })
            .collect();

        let contact = doc.info.contact.as_ref().and_then(|c| {
            c.name.clone().or_else(|| c.email.clone()).or_else(|| c.url.clone())
        });
        let license = doc.info.license.as_ref();

        let context = json!({
            "title": title,
            "description": doc.info.description,
            "version": doc.info.version,
            "openapi": doc.openapi,
            "server": doc.servers.first().map(|s| s.url.as_str()),
            "security": doc.components.security_schemes.keys().collect::<Vec<_>>(),
            "contact": contact,
            "license": license.and_then(|l| l.name.as_deref()),
            "license_url": license.and_then(|l| l.url.as_deref()),
            "stats": doc.stats(),
            "themes": links,
            "base_url": base_url,
            "assets": self.config.include_assets,
        });

        let mut env = Environment::new();
        env.add_template("index.html", INDEX_TEMPLATE)?;
        Ok(env.get_template("index.html")?.render(context)?)
    }

    fn check_cancelled(&self, stage: Stage) -> Result<()> {
        match &self.cancel {
            Some(flag) if flag.is_cancelled() => Err(Error::Cancelled {
                stage: stage.to_string(),
            }),
            _ => Ok(()),
        }
    }
}

fn with_theme(err: Error, theme: &str) -> Error {
    match err {
        Error::Generation { stage, message, .. } => Error::Generation {
            stage,
            theme: Some(theme.to_string()),
            message,
        },
        other => other,
    }
}
