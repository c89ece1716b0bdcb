//! Types shared by HTTP requests and replies.

/// Control byte per RFC 2616: 0..31 and DEL.
pub(crate) fn is_ctl_byte(byte: u8) -> bool {
    byte <= 31 || byte == 127
}

/// Body flavor of an HTTP message. Selects both the `Content-Type` header
/// emitted by the serializers and the body transform applied before send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContentType {
    #[default]
    Html,
    Json,
    Xml,
    Text,
    Sbin,
}

impl ContentType {
    /// The MIME name written to the `Content-Type` header.
    #[must_use]
    pub fn mime(self) -> &'static str {
        match self {
            Self::Html => "text/html",
            Self::Json => "application/json",
            Self::Xml => "application/xml",
            Self::Text => "text/plain",
            Self::Sbin => "application/octet-stream",
        }
    }
}

/// Escape a body for embedding in JSON: `\b \n \f \r \t` become two-char
/// escape sequences; everything else passes through.
pub(crate) fn escape_json_body(content: &mut Vec<u8>) {
    if content.is_empty() {
        return;
    }
    let source = std::mem::take(content);
    for byte in source {
        match byte {
            0x08 => content.extend_from_slice(b"\\b"),
            b'\n' => content.extend_from_slice(b"\\n"),
            0x0C => content.extend_from_slice(b"\\f"),
            b'\r' => content.extend_from_slice(b"\\r"),
            b'\t' => content.extend_from_slice(b"\\t"),
            other => content.push(other),
        }
    }
}

/// Strip control bytes from a body, keeping TAB, CR and LF.
pub(crate) fn filter_text_body(content: &mut Vec<u8>) {
    content.retain(|&b| !is_ctl_byte(b) || b == b'\t' || b == b'\r' || b == b'\n');
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_escape_covers_the_five_escapes() {
        let mut body = b"a\x08b\nc\x0cd\re\tf".to_vec();
        escape_json_body(&mut body);
        assert_eq!(body, b"a\\bb\\nc\\fd\\re\\tf");
    }

    #[test]
    fn text_filter_drops_ctl_but_keeps_whitespace() {
        let mut body = b"a\x01b\tc\r\nd\x7f".to_vec();
        filter_text_body(&mut body);
        assert_eq!(body, b"ab\tc\r\nd");
    }

    #[test]
    fn mime_names() {
        assert_eq!(ContentType::Json.mime(), "application/json");
        assert_eq!(ContentType::Sbin.mime(), "application/octet-stream");
    }
}
