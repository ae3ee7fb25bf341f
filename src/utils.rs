// src/utils.rs
//! Text helpers shared by the form handlers, the card renderer and the mail
//! templates.

use url::Url;

/// Remove anything between `<` and `>`.
pub fn strip_tags(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_tag = false;
    for c in input.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}

/// Single-line form field: tags stripped, control whitespace flattened,
/// runs of whitespace collapsed and the result trimmed.
pub fn sanitize_text_field(input: &str) -> String {
    strip_tags(input)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Multi-line form field: like [`sanitize_text_field`] but line breaks survive.
pub fn sanitize_textarea_field(input: &str) -> String {
    strip_tags(input)
        .replace("\r\n", "\n")
        .lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Lowercase key made only of `[a-z0-9_-]`.
pub fn sanitize_key(input: &str) -> String {
    input
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect()
}

pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
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

/// Escaped text with line breaks turned into `<br>`.
pub fn escape_html_multiline(input: &str) -> String {
    escape_html(input).replace("\r\n", "\n").replace('\n', "<br>\n")
}

/// Address accepted by the mail transport, with a dotted domain.
pub fn is_valid_email(email: &str) -> bool {
    email
        .trim()
        .parse::<lettre::Address>()
        .map(|address| address.domain().contains('.'))
        .unwrap_or(false)
}

/// Absolute `http`/`https` URL with a host.
pub fn is_valid_url(url: &str) -> bool {
    Url::parse(url.trim())
        .map(|parsed| matches!(parsed.scheme(), "http" | "https") && parsed.host().is_some())
        .unwrap_or(false)
}

/// Normalize an uploaded file stem for the file system.
pub fn normalize_file_stem(name: &str) -> String {
    let normalized = name
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            ' ' | '_' | '.' => '-',
            c if c.is_ascii_alphanumeric() => c,
            _ => '-',
        })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-");

    if normalized.is_empty() {
        "file".to_string()
    } else {
        normalized
    }
}

/// Get file extension in lowercase
pub fn get_file_extension(filename: &str) -> Option<String> {
    std::path::Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
}

/// `"temps-partiel"` -> `"Temps partiel"`
pub fn humanize_first(slug: &str) -> String {
    let text = slug.trim().replace('-', " ");
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `"ile-de-france"` -> `"Ile De France"`
pub fn humanize_words(slug: &str) -> String {
    slug.trim()
        .replace('-', " ")
        .split(' ')
        .map(humanize_first)
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn truncate_chars(input: &str, max: usize) -> String {
    input.chars().take(max).collect()
}

pub fn format_bytes(size: u64) -> String {
    let units = ["B", "KB", "MB", "GB"];
    let mut value = size as f64;
    let mut unit = 0;
    while value > 1024.0 && unit < units.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let rounded = (value * 100.0).round() / 100.0;
    format!("{} {}", rounded, units[unit])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_text_field() {
        assert_eq!(sanitize_text_field("  <b>Marie</b>\n\tDupont  "), "Marie Dupont");
        assert_eq!(sanitize_text_field("<script>x</script>ok"), "xok");
    }

    #[test]
    fn test_sanitize_textarea_keeps_lines() {
        assert_eq!(
            sanitize_textarea_field("line  one\r\n<i>line</i> two\n"),
            "line one\nline two"
        );
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<a href="x">O'Neil & co</a>"#),
            "&lt;a href=&quot;x&quot;&gt;O&#039;Neil &amp; co&lt;/a&gt;"
        );
    }

    #[test]
    fn test_is_valid_email() {
        assert!(is_valid_email("marie.dupont@example.fr"));
        assert!(is_valid_email("a+b@sub.example.com"));
        assert!(!is_valid_email("marie@"));
        assert!(!is_valid_email("marie@example"));
        assert!(!is_valid_email("ma rie@example.com"));
        assert!(!is_valid_email("a@b@example.com"));
        assert!(is_valid_email(" marie@example.fr "));
    }

    #[test]
    fn test_email_check_agrees_with_mail_transport() {
        for address in ["marie.dupont@example.fr", "a+b@sub.example.com", "x@localhost.test"] {
            assert!(is_valid_email(address));
            assert!(address.parse::<lettre::message::Mailbox>().is_ok());
        }
    }

    #[test]
    fn test_is_valid_url() {
        assert!(is_valid_url("https://www.linkedin.com/in/marie"));
        assert!(is_valid_url("http://localhost:8000/x"));
        assert!(!is_valid_url("linkedin.com/in/marie"));
        assert!(!is_valid_url("https:// bad"));
        assert!(!is_valid_url("ftp://files.example.com/cv.pdf"));
        assert!(!is_valid_url("javascript:alert(1)"));
        assert!(is_valid_url("https://exämple.fr/in/marie"));
        assert!(is_valid_url("https://user@www.linkedin.com/in/marie?trk=x#top"));
    }

    #[test]
    fn test_normalize_file_stem() {
        assert_eq!(normalize_file_stem("Mon CV (2024)"), "mon-cv-2024");
        assert_eq!(normalize_file_stem("___"), "file");
    }

    #[test]
    fn test_get_file_extension() {
        assert_eq!(get_file_extension("test.pdf"), Some("pdf".to_string()));
        assert_eq!(get_file_extension("document.DOCX"), Some("docx".to_string()));
        assert_eq!(get_file_extension("noext"), None);
    }

    #[test]
    fn test_humanize() {
        assert_eq!(humanize_first("temps-partiel"), "Temps partiel");
        assert_eq!(humanize_words("ile-de-france"), "Ile De France");
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(5 * 1024 * 1024), "5 MB");
        assert_eq!(format_bytes(2 * 1024 * 1024), "2 MB");
        assert_eq!(format_bytes(512), "512 B");
    }
}
