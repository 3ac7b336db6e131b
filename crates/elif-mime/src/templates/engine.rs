use crate::{
    config::TemplateConfig,
    error::EmailError,
    templates::{TemplateAttachments, TemplateContext, TemplateEngine},
    Attachment,
};
use std::{
    collections::HashMap,
    fs,
    path::{Component, Path, PathBuf},
    sync::RwLock,
};
use tera::{Context, Tera, Value};
use tracing::{debug, trace};
use uuid::Uuid;

/// Template engine backed by Tera.
///
/// When an assets directory is set, templates can pull files from it into
/// the message being rendered:
///
/// ```text
/// <img src="{{ email_image(path="images/logo.png") }}">
/// {{ email_attach(path="terms.pdf", name="Terms.pdf") }}
/// ```
pub struct TeraEngine {
    tera: RwLock<Tera>,
    assets_dir: Option<PathBuf>,
}

impl TeraEngine {
    /// Create engine and load every template under the configured directory
    pub fn new(config: &TemplateConfig) -> Result<Self, EmailError> {
        let mut tera = Tera::default();
        if !config.autoescape {
            tera.autoescape_on(Vec::new());
        }

        let assets_dir = config.assets_dir.as_deref().unwrap_or(&config.templates_dir);
        let engine = Self {
            tera: RwLock::new(tera),
            assets_dir: Some(PathBuf::from(assets_dir)),
        };

        let templates_dir = Path::new(&config.templates_dir);
        if templates_dir.is_dir() {
            engine.load_directory(templates_dir, &config.template_extensions)?;
        } else {
            debug!("Templates directory does not exist: {}", config.templates_dir);
        }

        Ok(engine)
    }

    /// Create an engine with no templates and default settings
    pub fn empty() -> Self {
        Self {
            tera: RwLock::new(Tera::default()),
            assets_dir: None,
        }
    }

    /// Let templates embed and attach files found under `dir`
    pub fn with_assets_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.assets_dir = Some(dir.into());
        self
    }

    /// Load templates from directory, named by their path relative to it
    fn load_directory(&self, root: &Path, extensions: &[String]) -> Result<(), EmailError> {
        let mut files: Vec<(String, PathBuf)> = Vec::new();
        collect_template_files(root, root, extensions, &mut files)?;

        let mut tera = self.tera.write().map_err(|_| {
            EmailError::configuration("Failed to acquire write lock on templates")
        })?;

        debug!("Loading {} template(s) from {}", files.len(), root.display());
        // Added in one batch so that `extends` resolves regardless of file order
        tera.add_template_files(files.into_iter().map(|(name, path)| (path, Some(name))))?;

        Ok(())
    }

    /// Register a template from source
    pub fn add_raw_template(&self, name: &str, source: &str) -> Result<(), EmailError> {
        let mut tera = self.tera.write().map_err(|_| {
            EmailError::configuration("Failed to acquire write lock on templates")
        })?;

        tera.add_raw_template(name, source)?;
        Ok(())
    }

    /// Check whether a template is registered
    pub fn has_template(&self, name: &str) -> bool {
        self.tera
            .read()
            .map(|tera| tera.get_template_names().any(|n| n == name))
            .unwrap_or(false)
    }

    /// List registered template names
    pub fn template_names(&self) -> Result<Vec<String>, EmailError> {
        let tera = self.tera.read().map_err(|_| {
            EmailError::configuration("Failed to acquire read lock on templates")
        })?;

        let mut names: Vec<String> = tera.get_template_names().map(str::to_string).collect();
        names.sort();
        Ok(names)
    }
}

impl TemplateEngine for TeraEngine {
    fn render(&self, template: &str, context: &TemplateContext) -> Result<String, EmailError> {
        let tera = self.tera.read().map_err(|_| {
            EmailError::configuration("Failed to acquire read lock on templates")
        })?;

        Ok(tera.render(template, &tera_context(context))?)
    }

    fn render_with_attachments(
        &self,
        template: &str,
        context: &TemplateContext,
        attachments: &TemplateAttachments,
    ) -> Result<String, EmailError> {
        let Some(assets_dir) = &self.assets_dir else {
            return self.render(template, context);
        };

        // Functions capture this pass's attachments, so they go on a private copy
        let mut tera = self
            .tera
            .read()
            .map_err(|_| EmailError::configuration("Failed to acquire read lock on templates"))?
            .clone();
        register_asset_functions(&mut tera, assets_dir, attachments);

        Ok(tera.render(template, &tera_context(context))?)
    }
}

fn tera_context(context: &TemplateContext) -> Context {
    let mut tera_context = Context::new();
    for (key, value) in context {
        tera_context.insert(key.as_str(), value);
    }
    tera_context
}

/// `email_image(path)` embeds an inline image and returns its `cid:` URL,
/// `email_attach(path, name?)` attaches a file and renders nothing.
fn register_asset_functions(
    tera: &mut Tera,
    assets_dir: &Path,
    attachments: &TemplateAttachments,
) {
    let dir = assets_dir.to_path_buf();
    let pending = attachments.clone();
    tera.register_function(
        "email_image",
        move |args: &HashMap<String, Value>| -> tera::Result<Value> {
            let path = path_arg(args, "email_image")?;
            if let Some(cid) = pending.image_content_id(path) {
                return Ok(Value::String(format!("cid:{}", cid)));
            }

            let content = read_asset(&dir, path)?;
            let cid = format!("{}@elif", Uuid::new_v4().simple());
            trace!("Embedding {} as {}", path, cid);
            pending.embed(path, Attachment::inline(file_name(path), content, cid.clone()));
            Ok(Value::String(format!("cid:{}", cid)))
        },
    );

    let dir = assets_dir.to_path_buf();
    let pending = attachments.clone();
    tera.register_function(
        "email_attach",
        move |args: &HashMap<String, Value>| -> tera::Result<Value> {
            let path = path_arg(args, "email_attach")?;
            let name = match args.get("name").and_then(Value::as_str) {
                Some(name) => name.to_string(),
                None => file_name(path),
            };

            let content = read_asset(&dir, path)?;
            trace!("Attaching {} as {}", path, name);
            pending.attach(Attachment::new(name, content));
            Ok(Value::String(String::new()))
        },
    );
}

fn path_arg<'a>(args: &'a HashMap<String, Value>, function: &str) -> tera::Result<&'a str> {
    args.get("path").and_then(Value::as_str).ok_or_else(|| {
        tera::Error::msg(format!("Function `{}` expects a string `path` argument", function))
    })
}

fn read_asset(dir: &Path, path: &str) -> tera::Result<Vec<u8>> {
    let relative = Path::new(path);
    let inside = relative
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    if !inside {
        return Err(tera::Error::msg(format!(
            "Asset path `{}` must be relative to the assets directory",
            path
        )));
    }

    fs::read(dir.join(relative))
        .map_err(|e| tera::Error::msg(format!("Failed to read asset `{}`: {}", path, e)))
}

fn file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(path)
        .to_string()
}

fn collect_template_files(
    root: &Path,
    dir: &Path,
    extensions: &[String],
    files: &mut Vec<(String, PathBuf)>,
) -> Result<(), EmailError> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();

        if path.is_dir() {
            collect_template_files(root, &path, extensions, files)?;
            continue;
        }

        let file_name = path.file_name().and_then(|s| s.to_str()).unwrap_or_default();
        if !extensions.iter().any(|ext| file_name.ends_with(ext.as_str())) {
            continue;
        }

        let name = path
            .strip_prefix(root)
            .ok()
            .and_then(|relative| relative.to_str())
            .ok_or_else(|| {
                EmailError::configuration(format!("Invalid template filename: {:?}", path))
            })?
            .replace('\\', "/");

        files.push((name, path));
    }

    Ok(())
}
