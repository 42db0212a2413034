//! Diagnostic rendering (§4.6, §6.4).
//!
//! A trait with default-provided composite methods built on top of a
//! handful of required leaf methods, so a future renderer (colorized
//! terminal output, LSP `Diagnostic` JSON) only has to supply the leaves.

use crate::diagnostic::Diagnostic;

pub trait Renderer {
    /// Renders every diagnostic, one block per diagnostic, joined by
    /// blank lines.
    fn render_all(&self, diagnostics: &[Diagnostic]) -> String {
        diagnostics.iter().map(|d| self.render_one(d)).collect::<Vec<_>>().join("\n\n")
    }

    /// Renders a single diagnostic: the header line, then one indented
    /// fact line per currently-known fact (§6.4 "for proof-check
    /// failures, a multi-line block follows").
    fn render_one(&self, d: &Diagnostic) -> String {
        let mut out = self.header(d);
        for fact in &d.facts {
            out.push('\n');
            out.push_str(&self.fact_line(fact));
        }
        out
    }

    /// `<filename>:<line>: <message>` (§6.4).
    fn header(&self, d: &Diagnostic) -> String;

    /// One indented line per known fact.
    fn fact_line(&self, fact: &str) -> String;
}

/// The plain-text wire format of §6.4 — the only renderer in-tree, and
/// the one `toposafe-driver`'s tests assert against.
pub struct PlainTextRenderer;

impl Renderer for PlainTextRenderer {
    fn header(&self, d: &Diagnostic) -> String {
        format!("{}:{}: {}", d.file, d.line, d.message)
    }

    fn fact_line(&self, fact: &str) -> String {
        format!("    {fact}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::{DiagnosticKind, Severity};
    use toposafe_base::Span;

    fn diag(line: usize, message: &str, facts: Vec<&str>) -> Diagnostic {
        Diagnostic {
            file: "test.dsl".to_string(),
            span: Span::new(0, 0),
            line,
            severity: Severity::Error,
            kind: DiagnosticKind::Bounds,
            message: message.to_string(),
            facts: facts.into_iter().map(str::to_string).collect(),
        }
    }

    #[test]
    fn header_only_when_no_facts() {
        let d = diag(3, "cannot prove 'x < 10'", vec![]);
        assert_eq!(PlainTextRenderer.render_one(&d), "test.dsl:3: cannot prove 'x < 10'");
    }

    #[test]
    fn facts_are_indented_beneath_the_header() {
        let d = diag(5, "cannot prove 'x < 10'", vec!["x == 3", "y != 0"]);
        assert_eq!(
            PlainTextRenderer.render_one(&d),
            "test.dsl:5: cannot prove 'x < 10'\n    x == 3\n    y != 0"
        );
    }

    #[test]
    fn render_all_joins_with_blank_line() {
        let a = diag(1, "first", vec![]);
        let b = diag(2, "second", vec![]);
        assert_eq!(
            PlainTextRenderer.render_all(&[a, b]),
            "test.dsl:1: first\n\ntest.dsl:2: second"
        );
    }
}
