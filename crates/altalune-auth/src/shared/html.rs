//! Minimal HTML Rendering
//!
//! The authorization server renders three small pages (login, consent,
//! error) without a template engine. Every interpolated value goes
//! through [`escape`].

use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};

/// Escape a value for interpolation into HTML text or attributes.
pub fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
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

/// Wrap body markup in the shared page shell.
pub fn page(title: &str, body: &str) -> Html<String> {
    Html(format!(
        "<!DOCTYPE html>\n\
         <html lang=\"en\">\n\
         <head>\n\
         <meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>{}</title>\n\
         <style>\n\
         body {{ font-family: system-ui, sans-serif; max-width: 28rem; margin: 4rem auto; padding: 0 1rem; color: #1a1a2e; }}\n\
         h1 {{ font-size: 1.4rem; }}\n\
         a.provider, button {{ display: block; width: 100%; margin: .5rem 0; padding: .6rem; text-align: center; border: 1px solid #ccc; border-radius: 6px; background: #fff; text-decoration: none; color: inherit; font-size: 1rem; cursor: pointer; }}\n\
         input {{ width: 100%; padding: .5rem; margin: .3rem 0 .8rem; border: 1px solid #ccc; border-radius: 6px; box-sizing: border-box; }}\n\
         .error {{ color: #b00020; }}\n\
         ul.scopes {{ padding-left: 1.2rem; }}\n\
         </style>\n\
         </head>\n\
         <body>\n{}\n</body>\n\
         </html>\n",
        escape(title),
        body
    ))
}

/// Render a terminal error page. Used when no safe redirect target exists.
pub fn error_page(status: StatusCode, title: &str, message: &str) -> Response {
    let body = format!(
        "<h1>{}</h1>\n<p class=\"error\">{}</p>",
        escape(title),
        escape(message)
    );
    (status, page(title, &body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape() {
        assert_eq!(
            escape("<script>alert('x')</script>"),
            "&lt;script&gt;alert(&#39;x&#39;)&lt;/script&gt;"
        );
        assert_eq!(escape("a&b\"c"), "a&amp;b&quot;c");
        assert_eq!(escape("plain"), "plain");
    }

    #[test]
    fn test_error_page_status() {
        let response = error_page(StatusCode::BAD_REQUEST, "Invalid request", "Missing client_id");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
