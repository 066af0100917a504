//! Document connectors: report generation and local file output.

use std::path::Path;

use futures_util::future::BoxFuture;
use serde_json::{Map, Value};

use stepflow_core::connector::{Connector, ConnectorError};
use stepflow_core::context::ExecutionContext;

use super::{optional_str, require_str};

/// Connector for `doc.generate_summary`. Side-effect free: formats the text
/// as a markdown or HTML report and returns it. Also serves as the
/// sanitizer's rewrite target for unknown step types.
pub struct GenerateSummaryConnector;

/// Render the report in the requested format. Unknown formats fall back to
/// markdown.
fn render_report(text: &str, format: &str) -> String {
    match format {
        "html" => format!("<html><body><h1>Report</h1><p>{text}</p></body></html>"),
        _ => format!("# Report\n\n{text}"),
    }
}

impl Connector for GenerateSummaryConnector {
    fn name(&self) -> &str {
        "doc"
    }

    fn run<'a>(
        &'a self,
        params: &'a Map<String, Value>,
        _ctx: &'a ExecutionContext,
    ) -> BoxFuture<'a, Result<Value, ConnectorError>> {
        Box::pin(async move {
            let text = require_str(params, "text")?;
            let format = optional_str(params, "format", "markdown");
            Ok(Value::String(render_report(text, format)))
        })
    }
}

/// Connector for `doc.save_to_file`.
pub struct SaveToFileConnector;

impl Connector for SaveToFileConnector {
    fn name(&self) -> &str {
        "doc"
    }

    fn run<'a>(
        &'a self,
        params: &'a Map<String, Value>,
        _ctx: &'a ExecutionContext,
    ) -> BoxFuture<'a, Result<Value, ConnectorError>> {
        Box::pin(async move {
            let filename = require_str(params, "filename")?;
            let content = require_str(params, "content")?;

            if let Some(parent) = Path::new(filename).parent() {
                if !parent.as_os_str().is_empty() {
                    tokio::fs::create_dir_all(parent).await?;
                }
            }
            tokio::fs::write(filename, content).await?;

            tracing::info!(filename, bytes = content.len(), "content written");
            Ok(Value::String(format!("Saved to {filename}")))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_markdown() {
        assert_eq!(
            render_report("All systems green.", "markdown"),
            "# Report\n\nAll systems green."
        );
    }

    #[test]
    fn test_render_html() {
        let html = render_report("All systems green.", "html");
        assert!(html.starts_with("<html>"));
        assert!(html.contains("All systems green."));
    }

    #[test]
    fn test_unknown_format_falls_back_to_markdown() {
        assert!(render_report("x", "docx").starts_with("# Report"));
    }

    #[tokio::test]
    async fn test_save_to_file_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports/output.md");
        let params = json!({
            "filename": path.to_str().unwrap(),
            "content": "# Report\n\ndone"
        })
        .as_object()
        .unwrap()
        .clone();
        let ctx = ExecutionContext::new(Map::new());

        let out = SaveToFileConnector.run(&params, &ctx).await.unwrap();
        assert!(out.as_str().unwrap().starts_with("Saved to "));
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "# Report\n\ndone"
        );
    }
}
