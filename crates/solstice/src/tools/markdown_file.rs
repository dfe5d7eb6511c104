use std::fs;
use std::path::{Component, Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use schemars::{JsonSchema, schema_for};
use serde::Deserialize;
use serde_json::Value;
use solstice_bus::{MessageBus, OutboundMessage};
use solstice_core::tool::{
    Error as ToolError, Outcome, Tool, ToolResult,
};
use tokio::task::spawn_blocking;

#[derive(Deserialize, JsonSchema)]
pub struct MarkdownFileParameters {
    #[schemars(
        description = "Path to the markdown file, defaults to reports/summary-<timestamp>.md."
    )]
    path: Option<String>,
    #[schemars(description = "Markdown content to write.")]
    content: String,
    #[schemars(
        description = "Whether to send the file to the current chat after writing, default to true."
    )]
    send: Option<bool>,
    #[schemars(description = "Optional caption when sending the file.")]
    caption: Option<String>,
}

#[derive(Clone)]
struct Route {
    channel: String,
    chat_id: String,
}

/// A tool for writing markdown files and delivering them over the bus.
pub struct MarkdownFileTool {
    workspace: PathBuf,
    restrict: bool,
    bus: Option<MessageBus>,
    route: Option<Route>,
    parameter_schema: Value,
}

impl MarkdownFileTool {
    /// Creates a new markdown file tool rooted at the given workspace.
    pub fn new<P: Into<PathBuf>>(workspace: P) -> Self {
        MarkdownFileTool {
            workspace: workspace.into(),
            restrict: false,
            bus: None,
            route: None,
            parameter_schema: schema_for!(MarkdownFileParameters).to_value(),
        }
    }

    /// Rejects paths that resolve outside the workspace.
    #[inline]
    pub fn restricted(mut self) -> Self {
        self.restrict = true;
        self
    }

    /// Attaches the bus used to deliver written files.
    #[inline]
    pub fn with_bus(mut self, bus: MessageBus) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Sets the channel and chat that delivered files are routed to.
    #[inline]
    pub fn with_route<C, I>(mut self, channel: C, chat_id: I) -> Self
    where
        C: Into<String>,
        I: Into<String>,
    {
        self.route = Some(Route {
            channel: channel.into(),
            chat_id: chat_id.into(),
        });
        self
    }
}

impl Tool for MarkdownFileTool {
    type Input = MarkdownFileParameters;

    fn name(&self) -> &str {
        "markdown_file"
    }

    fn description(&self) -> &str {
        "Create a markdown (.md) file and optionally send it to the \
         current chat"
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        input: MarkdownFileParameters,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let workspace = self.workspace.clone();
        let restrict = self.restrict;
        let bus = self.bus.clone();
        let route = self.route.clone();
        async move {
            let path = match input.path.filter(|path| !path.is_empty()) {
                Some(path) => path,
                None => default_path(),
            };
            let path = ensure_md_suffix(path);
            let resolved = resolve_path(&path, &workspace, restrict)?;

            let content = input.content;
            let target = resolved.clone();
            spawn_blocking(move || write_file(&target, &content))
                .await
                .map_err(|_| {
                    ToolError::execution_error()
                        .with_reason("failed to write markdown file")
                })??;

            if !input.send.unwrap_or(true) {
                return Ok(Outcome::silent(format!(
                    "Markdown file created: {}",
                    resolved.display()
                )));
            }

            let Some(bus) = bus else {
                return Err(ToolError::execution_error().with_reason(
                    "message bus is not configured for sending files",
                ));
            };
            let Some(route) = route else {
                return Err(ToolError::execution_error().with_reason(
                    "no active channel/chat context to send file",
                ));
            };
            let caption = match input.caption.filter(|c| !c.is_empty()) {
                Some(caption) => caption,
                None => "Here is your markdown file.".to_owned(),
            };
            let file_name = resolved
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            bus.publish_outbound(OutboundMessage {
                channel: route.channel,
                chat_id: route.chat_id,
                content: caption,
                file_path: resolved.display().to_string(),
                file_name,
            });

            Ok(Outcome::silent(format!(
                "Markdown file created and sent: {}",
                resolved.display()
            )))
        }
    }
}

fn default_path() -> String {
    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0);
    format!("reports/summary-{ts}.md")
}

fn ensure_md_suffix(path: String) -> String {
    if path.to_lowercase().ends_with(".md") {
        path
    } else {
        path + ".md"
    }
}

fn resolve_path(
    path: &str,
    workspace: &Path,
    restrict: bool,
) -> Result<PathBuf, ToolError> {
    let workspace = absolutize(workspace)?;
    let raw = Path::new(path);
    let joined = if raw.is_absolute() {
        raw.to_path_buf()
    } else {
        workspace.join(raw)
    };
    let normalized = normalize(&joined);
    if restrict && !normalized.starts_with(&workspace) {
        return Err(ToolError::execution_error()
            .with_reason(format!("path escapes the workspace: {path}")));
    }
    Ok(normalized)
}

/// Anchors a relative workspace root at the current directory.
///
/// A relative root would normalize to a prefix like the empty path,
/// which every path starts with, so confinement is only meaningful
/// against an absolute root.
fn absolutize(workspace: &Path) -> Result<PathBuf, ToolError> {
    if workspace.is_absolute() {
        return Ok(normalize(workspace));
    }
    let cwd = std::env::current_dir().map_err(|err| {
        ToolError::execution_error()
            .with_reason(format!("failed to resolve the workspace: {err}"))
    })?;
    Ok(normalize(&cwd.join(workspace)))
}

/// Lexical normalization; the target may not exist yet, so this never
/// touches the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}

fn write_file(path: &Path, content: &str) -> Result<(), ToolError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|err| {
            ToolError::execution_error()
                .with_reason(format!("failed to create directory: {err}"))
        })?;
    }
    fs::write(path, content).map_err(|err| {
        ToolError::execution_error()
            .with_reason(format!("failed to write markdown file: {err}"))
    })
}
