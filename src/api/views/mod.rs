//! Server-rendered pages for the browser-facing routes.
//!
//! Plain `format!` templates; every interpolated value goes through [`html_escape`].

mod config_js;
mod pages;

pub use config_js::render_config_js;
pub use pages::{render_finish_page, render_register_page, render_welcome_page, WelcomePage};

const STYLES: &str = r#"
body {
    font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, sans-serif;
    max-width: 480px;
    margin: 3rem auto;
    padding: 0 1rem;
    color: #1d1d21;
}
label { display: block; margin-top: 0.75rem; font-size: 0.9rem; }
input { width: 100%; padding: 0.5rem; margin-top: 0.25rem; box-sizing: border-box; }
button { margin-top: 1.25rem; padding: 0.6rem 1.2rem; }
dt { font-weight: 600; margin-top: 0.5rem; }
"#;

fn layout(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title}</title>
<style>{STYLES}</style>
</head>
<body>
{body}
</body>
</html>"#,
        title = html_escape(title),
    )
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
