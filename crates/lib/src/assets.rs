//! Static server for the embedded UI bundle.
//!
//! Serves the prebuilt page set from `ui/` over a loopback HTTP listener.
//! Any unresolved path falls back to the root document, so client-side
//! routes and reloads land on the app instead of a 404.

use crate::config::{self, Config};
use anyhow::{Context, Result};
use axum::{
    http::{header, StatusCode, Uri},
    response::{IntoResponse, Response},
    Router,
};
use include_dir::{include_dir, Dir};

static UI_BUNDLE: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/ui");

const INDEX_PATH: &str = "index.html";

/// Content type for a bundle path, derived from the file extension. Unknown
/// extensions are served as the root document's type.
fn content_type_for(path: &str) -> &'static str {
    match path.rsplit('.').next().unwrap_or_default() {
        "html" => "text/html",
        "js" => "text/javascript",
        "css" => "text/css",
        "json" => "application/json",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        _ => "text/html",
    }
}

async fn serve_path(uri: Uri) -> Response {
    let requested = uri.path().trim_start_matches('/');
    let file = if requested.is_empty() {
        UI_BUNDLE.get_file(INDEX_PATH)
    } else {
        UI_BUNDLE
            .get_file(requested)
            .or_else(|| UI_BUNDLE.get_file(INDEX_PATH))
    };
    match file {
        Some(f) => {
            let ctype = content_type_for(&f.path().to_string_lossy());
            ([(header::CONTENT_TYPE, ctype)], f.contents()).into_response()
        }
        None => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "ui bundle is missing index.html",
        )
            .into_response(),
    }
}

/// Run the asset server on the configured bind:port until the task is
/// dropped. Refuses non-loopback binds; the bundle is local window chrome,
/// not a network service.
pub async fn run_asset_server(config: &Config) -> Result<()> {
    let bind = config.ui.bind.trim();
    if !config::is_loopback_bind(bind) {
        anyhow::bail!("refusing to bind asset server to {} (loopback only)", bind);
    }

    let app = Router::new().fallback(serve_path);

    let bind_addr = format!("{}:{}", bind, config.ui.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding to {}", bind_addr))?;
    log::info!("asset server listening on http://{}", bind_addr);

    axum::serve(listener, app)
        .await
        .context("asset server exited")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_types_by_extension() {
        assert_eq!(content_type_for("index.html"), "text/html");
        assert_eq!(content_type_for("app.js"), "text/javascript");
        assert_eq!(content_type_for("style.css"), "text/css");
        assert_eq!(content_type_for("manifest.json"), "application/json");
        assert_eq!(content_type_for("icon.png"), "image/png");
        assert_eq!(content_type_for("photo.jpg"), "image/jpeg");
        assert_eq!(content_type_for("photo.jpeg"), "image/jpeg");
        assert_eq!(content_type_for("no-extension"), "text/html");
    }

    #[test]
    fn bundle_contains_root_document() {
        assert!(UI_BUNDLE.get_file(INDEX_PATH).is_some());
    }
}
