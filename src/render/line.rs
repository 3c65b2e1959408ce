use super::glyph::glyph_for_name;

/// Compose one issue as a single markdown line (no trailing newline)
///
/// A `url` turns the message into a link and suppresses the component key.
/// The rule link is always appended as a trailing reference glyph.
pub fn format_line(
    severity: &str,
    message: &str,
    rule_link: &str,
    url: Option<&str>,
    component_key: Option<&str>,
) -> String {
    let mut line = String::new();
    line.push_str(glyph_for_name(severity));
    line.push(' ');
    match url {
        Some(url) => line.push_str(&format!("[{}]({})", message, url)),
        None => {
            line.push_str(message);
            if let Some(component_key) = component_key {
                line.push_str(&format!(" ({})", component_key));
            }
        }
    }
    line.push_str(&format!(" [:blue_book:]({})", rule_link));
    line
}
