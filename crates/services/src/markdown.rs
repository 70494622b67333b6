use std::collections::HashSet;

/// Renders authored Markdown to sanitized HTML.
#[must_use]
pub fn render_markdown(input: &str) -> String {
    let mut options = pulldown_cmark::Options::empty();
    options.insert(pulldown_cmark::Options::ENABLE_STRIKETHROUGH);
    options.insert(pulldown_cmark::Options::ENABLE_TABLES);

    let parser = pulldown_cmark::Parser::new_ext(input, options);
    let mut html = String::new();
    pulldown_cmark::html::push_html(&mut html, parser);
    sanitize_html(&html)
}

fn sanitize_html(html: &str) -> String {
    let tags: HashSet<&str> = [
        "p", "a", "br", "em", "strong", "del", "code", "pre", "blockquote", "ul", "ol", "li",
        "h1", "h2", "h3", "h4", "table", "thead", "tbody", "tr", "th", "td", "sup", "sub", "hr",
    ]
    .into_iter()
    .collect();

    ammonia::Builder::new().tags(tags).clean(html).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_emphasis_and_lists() {
        let html = render_markdown("**Key idea:**\n\n- one\n- two");
        assert!(html.contains("<strong>Key idea:</strong>"));
        assert!(html.contains("<li>one</li>"));
    }

    #[test]
    fn strips_scripts_and_unsafe_hrefs() {
        let html = render_markdown("<script>alert(1)</script>\n\n[x](javascript:alert(1))");
        assert!(!html.contains("<script"));
        assert!(!html.contains("javascript"));
        assert!(html.contains(">x</a>"));
    }

    #[test]
    fn keeps_web_links() {
        let html = render_markdown("See [number lines](https://example.com/lines).");
        assert!(html.contains(r#"href="https://example.com/lines""#));
        assert!(html.contains(">number lines</a>"));
    }
}
