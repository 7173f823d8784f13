//! Static file serving below a root directory.

use crate::context::Context;
use crate::handler::Handler;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tracing::error;

/// Wildcard parameter holding the requested file
pub const FILE_PARAM: &str = "file";

/// Handler serving files under `root`, keyed by the `*file` wildcard
pub fn serve_dir(root: impl Into<PathBuf>) -> Handler {
    let root: PathBuf = root.into();
    Handler::context(move |ctx| serve_file(&root, ctx))
}

fn serve_file(root: &Path, ctx: &mut Context) {
    let Some(relative) = ctx.param(FILE_PARAM).and_then(sanitize) else {
        ctx.not_found();
        return;
    };
    let path = root.join(relative);
    if !path.is_file() {
        ctx.not_found();
        return;
    }

    match std::fs::read(&path) {
        Ok(bytes) => {
            ctx.set_header("Content-Type", content_type(&path));
            ctx.write(&bytes);
        }
        Err(err) if err.kind() == ErrorKind::NotFound => {
            ctx.not_found();
        }
        Err(err) => {
            error!(path = %path.display(), error = %err, "Failed to read static file");
            ctx.emit_error(500);
        }
    }
}

/// Only plain relative components are accepted
fn sanitize(requested: &str) -> Option<PathBuf> {
    let path = Path::new(requested);
    let mut clean = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }
    if clean.as_os_str().is_empty() {
        None
    } else {
        Some(clean)
    }
}

fn content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("html" | "htm") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js" | "mjs") => "application/javascript",
        Some("json") => "application/json",
        Some("txt") => "text/plain; charset=utf-8",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("ico") => "image/x-icon",
        Some("wasm") => "application/wasm",
        Some("pdf") => "application/pdf",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_rejects_traversal() {
        assert_eq!(sanitize("css/site.css"), Some(PathBuf::from("css/site.css")));
        assert_eq!(sanitize("./a.txt"), Some(PathBuf::from("a.txt")));
        assert!(sanitize("../secret").is_none());
        assert!(sanitize("a/../../b").is_none());
        assert!(sanitize("/etc/passwd").is_none());
        assert!(sanitize("").is_none());
    }

    #[test]
    fn test_content_type() {
        assert_eq!(content_type(Path::new("index.HTML")), "text/html; charset=utf-8");
        assert_eq!(content_type(Path::new("app.js")), "application/javascript");
        assert_eq!(content_type(Path::new("blob")), "application/octet-stream");
    }
}
