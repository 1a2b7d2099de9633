/// HTML pages for `/p/:id`

const PAGE_STYLE: &str = "body { font-family: 'Courier New', monospace; max-width: 800px; \
margin: 0 auto; padding: 20px; background-color: #f5f5f5; } \
.container { background-color: white; padding: 30px; border-radius: 8px; \
box-shadow: 0 2px 4px rgba(0,0,0,0.1); } \
.content { white-space: pre-wrap; word-wrap: break-word; background-color: #f9f9f9; \
padding: 20px; border-radius: 4px; border: 1px solid #ddd; } \
.header { margin-bottom: 20px; color: #333; }";

const MESSAGE_STYLE: &str = "body { font-family: Arial, sans-serif; text-align: center; \
padding: 50px; } h1 { color: #e74c3c; }";

/// Escape text for use in HTML element content and attribute values
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            _ => out.push(c),
        }
    }
    out
}

/// Page showing one paste; content is escaped and newlines become `<br>`
pub fn paste_page(id: &str, content: &str) -> String {
    let id = escape_html(id);
    let body = escape_html(content).replace('\n', "<br>");
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>Paste - {id}</title>\n\
<style>{style}</style>\n</head>\n<body>\n<div class=\"container\">\n\
<div class=\"header\"><h1>Paste #{id}</h1></div>\n\
<div class=\"content\">{body}</div>\n</div>\n</body>\n</html>\n",
        id = id,
        style = PAGE_STYLE,
        body = body,
    )
}

/// The single page for unknown, expired and used-up pastes
pub fn not_found_page() -> String {
    message_page(
        "Paste Not Found",
        "404 - Paste Not Found",
        "The paste you're looking for doesn't exist or is no longer available.",
    )
}

pub fn error_page() -> String {
    message_page(
        "Error",
        "500 - Internal Server Error",
        "An error occurred while loading the paste.",
    )
}

fn message_page(title: &str, heading: &str, message: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n\
<style>{}</style>\n</head>\n<body>\n<h1>{}</h1>\n<p>{}</p>\n</body>\n</html>\n",
        title,
        MESSAGE_STYLE,
        heading,
        escape_html(message),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<script>alert("x & 'y'")</script>"#),
            "&lt;script&gt;alert(&quot;x &amp; &#039;y&#039;&quot;)&lt;/script&gt;"
        );
    }

    #[test]
    fn test_paste_page_escapes_and_breaks_lines() {
        let page = paste_page("00aa", "a<b>\nsecond");
        assert!(page.contains("a&lt;b&gt;<br>second"));
        assert!(page.contains("Paste #00aa"));
        assert!(!page.contains("<b>"));
    }

    #[test]
    fn test_not_found_page() {
        let page = not_found_page();
        assert!(page.contains("404 - Paste Not Found"));
        assert!(page.contains("doesn&#039;t exist"));
    }
}
