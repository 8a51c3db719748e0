//! Template anchor expansion
//!
//! A page marks an insertion slot for point `P` with
//! `<x-extension id="P"></x-extension>`. Rendering fills every slot with one
//! `<x-component path="/...">` per markup fragment plugins contribute to `P`.

use annex_core::{ExtensionHost, MARKUP_FILTERS, WebuiExtension};
use regex::{Captures, Regex};

use crate::ServerError;

const ANCHOR_PATTERN: &str = r"<x-extension\b([^>]*)>";
const ID_PATTERN: &str = r#"\bid\s*=\s*["']([^"']*)["']"#;

/// Expand every extension anchor in `template`
pub fn render_anchors(template: &str, host: &ExtensionHost) -> Result<String, ServerError> {
    let anchor = Regex::new(ANCHOR_PATTERN).map_err(|e| ServerError::Template(e.to_string()))?;
    let id = Regex::new(ID_PATTERN).map_err(|e| ServerError::Template(e.to_string()))?;

    let rendered = anchor.replace_all(template, |caps: &Captures<'_>| {
        let open_tag = &caps[0];
        let Some(point) = id.captures(&caps[1]).map(|c| c[1].to_string()) else {
            tracing::debug!(tag = %open_tag, "Extension anchor without id");
            return open_tag.to_string();
        };

        let components: String = host
            .webui_extensions(&point, MARKUP_FILTERS)
            .iter()
            .map(component_tag)
            .collect();
        format!("{open_tag}{components}")
    });

    Ok(rendered.into_owned())
}

/// `<x-component>` tag for one fragment, path made absolute
fn component_tag(extension: &WebuiExtension) -> String {
    format!(
        r#"<x-component path="{}"></x-component>"#,
        escape_attr(&normalize_path(&extension.path))
    )
}

/// Ensure a leading `/`
pub fn normalize_path(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}

fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
}
