//! HTML minification via `minify_html`.
//!
//! Comments are removed and whitespace collapsed. Closing tags and the
//! `html`/`head` opening tags are kept so later passes can find them.

use minify_html::Cfg;

fn config() -> Cfg {
    let mut cfg = Cfg::new();
    cfg.keep_closing_tags = true;
    cfg.keep_html_and_head_opening_tags = true;
    cfg.keep_comments = false;
    cfg.minify_css = true;
    cfg.minify_js = true;
    cfg.remove_bangs = true;
    cfg.remove_processing_instructions = true;
    cfg
}

/// Minify an HTML document.
pub fn minify_html(source: &str) -> Vec<u8> {
    minify_html::minify(source.as_bytes(), &config())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minify(source: &str) -> String {
        String::from_utf8(minify_html(source)).unwrap()
    }

    #[test]
    fn test_comment_removed() {
        assert_eq!(minify("<p>Note<!-- internal secret --></p>"), "<p>Note</p>");
    }

    #[test]
    fn test_whitespace_collapsed() {
        assert_eq!(minify("<p>a  b</p>"), "<p>a b</p>");
        assert_eq!(minify("<p>héllo  wörld</p>\n"), "<p>héllo wörld</p>");
    }

    #[test]
    fn test_preformatted_content_untouched() {
        let out = minify("<div>See<pre>  a   b</pre></div>");
        assert!(out.contains("<pre>  a   b</pre>"), "{out}");
    }

    #[test]
    fn test_document_structure_kept() {
        let src = "<!DOCTYPE html>\n<html>\n  <head>\n    <title> Hi </title>\n  </head>\n  <body>\n    <!-- note -->\n    <p>Hello   <b>world</b> !</p>\n  </body>\n</html>\n";
        let out = minify(src);
        assert!(out.contains("<html>") && out.contains("<head>"), "{out}");
        assert!(out.contains("</body>"), "{out}");
        assert!(out.contains("Hello <b>world</b> !"), "{out}");
        assert!(!out.contains("note"));
        assert!(out.len() < src.len());
    }

    #[test]
    fn test_inline_spacing_kept() {
        let out = minify("<p><a href=\"/\">one</a>\n  <a href=\"/two\">two</a></p>");
        assert!(out.contains("one</a> <a"), "{out}");
    }
}
