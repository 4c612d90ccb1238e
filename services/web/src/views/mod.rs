//! Server-rendered HTML.
//!
//! Pages are plain strings built with `format!`. Every piece of user input
//! passes through [`escape_text`] or [`escape_attr`] before it is written.

pub mod errors;
pub mod sensors;
pub mod sites;

use std::fmt::Write;

use crate::paths;

/// Navigation sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Sites,
}

/// A rendered page before it goes into the layout.
#[derive(Debug, Clone)]
pub struct Page {
    pub title: String,
    pub section: Section,
    pub body: String,
    /// Extra `<script src>` tags.
    pub scripts: Vec<&'static str>,
}

impl Page {
    pub fn new(title: impl Into<String>, body: String) -> Self {
        Self {
            title: title.into(),
            section: Section::Sites,
            body,
            scripts: Vec::new(),
        }
    }

    pub fn with_script(mut self, src: &'static str) -> Self {
        self.scripts.push(src);
        self
    }
}

/// Wraps a page in the shared layout.
pub fn layout(page: &Page, notice: Option<&str>) -> String {
    let title = escape_text(&page.title);
    let nav_class = if page.section == Section::Sites {
        r#" class="active""#
    } else {
        ""
    };

    let mut html = String::with_capacity(page.body.len() + 512);
    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("<meta charset=\"utf-8\">\n");
    let _ = writeln!(html, "<title>{title}</title>");
    for src in &page.scripts {
        let _ = writeln!(html, "<script src=\"{}\" defer></script>", escape_attr(src));
    }
    html.push_str("</head>\n<body>\n");
    let _ = writeln!(
        html,
        "<nav id=\"navigation\"><a href=\"{}\"{nav_class}>Sites</a></nav>",
        paths::sites()
    );
    if let Some(notice) = notice {
        let _ = writeln!(
            html,
            "<div id=\"notice\" class=\"notice\">{}</div>",
            escape_text(notice)
        );
    }
    let _ = writeln!(html, "<h1>{title}</h1>");
    html.push_str(&page.body);
    html.push_str("\n</body>\n</html>\n");
    html
}

/// Escapes text content.
pub fn escape_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// Escapes a double-quoted attribute value.
pub fn escape_attr(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_has_title_heading_and_active_nav() {
        let html = layout(&Page::new("Monitoring", "<p>hi</p>".to_string()), None);
        assert!(html.contains("<title>Monitoring</title>"));
        assert!(html.contains("<h1>Monitoring</h1>"));
        assert!(html.contains(r#"<a href="/sites" class="active">Sites</a>"#));
        assert!(!html.contains("id=\"notice\""));
    }

    #[test]
    fn test_layout_escapes_notice() {
        let html = layout(
            &Page::new("x", String::new()),
            Some("\"<b>\" has been created."),
        );
        assert!(html.contains(
            "<div id=\"notice\" class=\"notice\">\"&lt;b&gt;\" has been created.</div>"
        ));
    }

    #[test]
    fn test_escape_attr_quotes() {
        assert_eq!(escape_attr(r#"a"b'c&"#), "a&quot;b&#39;c&amp;");
        assert_eq!(escape_text(r#"a"b"#), r#"a"b"#);
    }
}
