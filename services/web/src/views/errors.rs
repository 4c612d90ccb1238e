use super::{escape_text, Page};

/// Body of an error page.
pub fn error_page(title: &str, message: &str, code: &str, request_id: &str) -> Page {
    let body = format!(
        "<p class=\"error\">{}</p>\n<p class=\"error-code\">Error code: <code>{}</code></p>\n<p class=\"request-id\">Request id: <code>{}</code></p>\n<p><a href=\"/sites\">Back to sites</a></p>",
        escape_text(message),
        escape_text(code),
        escape_text(request_id),
    );
    Page::new(title, body)
}
