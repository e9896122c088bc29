//! The rendering step: a template name plus a JSON context becomes an HTML page.
//!
//! Pages are emitted as a document shell that names the template and embeds
//! the context for the front end to render. The template and context also
//! travel with the response as a [`RenderedTemplate`] extension.

use crate::server::ServerError;
use axum::response::{Html, IntoResponse, Response};
use serde::Serialize;
use serde_json::Value;

#[derive(Clone, PartialEq, Debug)]
pub struct Template {
    name: &'static str,
    context: Value,
}

/// Attached to every rendered response.
#[derive(Clone, PartialEq, Debug)]
pub struct RenderedTemplate {
    pub name: &'static str,
    pub context: Value,
}

impl Template {
    pub fn new(name: &'static str, context: &impl Serialize) -> Result<Self, ServerError> {
        let context = serde_json::to_value(context)?;
        Ok(Self::from_value(name, context))
    }

    #[must_use]
    pub fn from_value(name: &'static str, context: Value) -> Self {
        Self { name, context }
    }

    #[must_use]
    pub fn render(&self) -> String {
        let name = escape_html(self.name);
        // `</script>` inside a string must not end the script element.
        let context = self.context.to_string().replace('<', "\\u003c");

        format!(
            "<!DOCTYPE html>\n\
            <html lang=\"en\">\n\
            <head><meta charset=\"utf-8\"><title>{name}</title></head>\n\
            <body data-template=\"{name}\">\n\
            <script type=\"application/json\" id=\"context\">{context}</script>\n\
            </body>\n\
            </html>\n"
        )
    }
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            c => escaped.push(c),
        }
    }
    escaped
}

impl IntoResponse for Template {
    fn into_response(self) -> Response {
        let body = self.render();
        let mut response = Html(body).into_response();
        response.extensions_mut().insert(RenderedTemplate {
            name: self.name,
            context: self.context,
        });
        response
    }
}

#[cfg(test)]
mod tests {
    use crate::server::template::{RenderedTemplate, Template};
    use axum::response::IntoResponse;
    use serde_json::json;

    #[test]
    fn context_cannot_close_the_script() {
        let template = Template::from_value("posts/index.html", json!({ "text": "</script><b>" }));
        let html = template.render();

        assert!(!html.contains("</script><b>"));
        assert!(html.contains(r"</script>"));
        assert!(html.contains("data-template=\"posts/index.html\""));
    }

    #[test]
    fn responses_carry_the_template() {
        let response = Template::from_value("core/404.html", json!({ "viewer": null })).into_response();

        let content_type = response.headers()["content-type"].to_str().unwrap();
        assert_eq!(content_type, "text/html; charset=utf-8");

        let rendered = response.extensions().get::<RenderedTemplate>().unwrap();
        assert_eq!(rendered.name, "core/404.html");
        assert_eq!(rendered.context, json!({ "viewer": null }));
    }
}
