//! Cleanup for provider markup

use html2text::render::text_renderer::TrivialDecorator;

/// Wide enough that snippets are never wrapped
const RENDER_WIDTH: usize = 4096;

/// Render HTML to plain text and collapse whitespace
pub(crate) fn clean_html(raw: &str) -> String {
    let text =
        html2text::from_read_with_decorator(raw.as_bytes(), RENDER_WIDTH, TrivialDecorator::new());
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_html() {
        assert_eq!(
            clean_html("The <span class=\"searchmatch\">Rust</span>   language &amp; its\n tools"),
            "The Rust language & its tools"
        );
    }

    #[test]
    fn test_entities_decoded() {
        assert_eq!(clean_html("it&#39;s &#x27;fine&#x27; &lt;T&gt;"), "it's 'fine' <T>");
        assert_eq!(clean_html("&quot;quoted&quot;"), "\"quoted\"");
    }

    #[test]
    fn test_plain_text_untouched() {
        assert_eq!(clean_html("No markup here"), "No markup here");
        assert_eq!(clean_html("   "), "");
    }
}
