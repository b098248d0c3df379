//! Plain-text rendering of accumulated diagnostics.

use crate::diagnostic::Diagnostic;

/// Renders diagnostics as one plain-text line each.
///
/// Produces output like:
/// ```text
/// warning: unable to process deferred symbols (my-processor)
/// info: dirty: src/A.kt (content changed)
/// ```
///
/// Called once per build, at the terminal round, with the full accumulated
/// diagnostic list.
pub struct TextRenderer;

impl TextRenderer {
    /// Renders a single diagnostic into a formatted line (no trailing newline).
    pub fn render(diag: &Diagnostic) -> String {
        match &diag.path {
            Some(path) => format!("{}: {} [{}]", diag.severity, diag.message, path.display()),
            None => format!("{}: {}", diag.severity, diag.message),
        }
    }

    /// Renders all diagnostics, one per line.
    pub fn render_all(diags: &[Diagnostic]) -> String {
        let mut out = String::new();
        for diag in diags {
            out.push_str(&Self::render(diag));
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::severity::Severity;

    #[test]
    fn render_without_path() {
        let d = Diagnostic::error("processor failed");
        assert_eq!(TextRenderer::render(&d), "error: processor failed");
    }

    #[test]
    fn render_with_path() {
        let d = Diagnostic::info("dirty").with_path("src/A.kt");
        assert_eq!(TextRenderer::render(&d), "info: dirty [src/A.kt]");
    }

    #[test]
    fn render_all_lines() {
        let diags = vec![Diagnostic::warning("one"), Diagnostic::error("two")];
        let out = TextRenderer::render_all(&diags);
        assert_eq!(out, "warning: one\nerror: two\n");
        assert!(diags[1].severity == Severity::Error);
    }

    #[test]
    fn render_all_empty() {
        assert_eq!(TextRenderer::render_all(&[]), "");
    }
}
