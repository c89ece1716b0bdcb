//! File-extension to MIME-type mapping.

struct Mapping {
    ext: &'static str,
    mime_type: &'static str,
    is_text: bool,
}

static MAPPINGS: &[Mapping] = &[
    Mapping { ext: ".htm", mime_type: "text/html", is_text: true },
    Mapping { ext: ".html", mime_type: "text/html", is_text: true },
    Mapping { ext: ".css", mime_type: "text/css", is_text: true },
    Mapping { ext: ".js", mime_type: "text/javascript", is_text: true },
    Mapping { ext: ".php", mime_type: "text/php", is_text: true },
    Mapping { ext: ".png", mime_type: "image/png", is_text: false },
    Mapping { ext: ".jpg", mime_type: "image/jpeg", is_text: false },
    Mapping { ext: ".jpeg", mime_type: "image/jpeg", is_text: false },
    Mapping { ext: ".gif", mime_type: "image/gif", is_text: false },
    Mapping { ext: ".tif", mime_type: "image/tiff", is_text: false },
    Mapping { ext: ".ico", mime_type: "image/vnd.microsoft.icon", is_text: false },
    Mapping { ext: ".jpe", mime_type: "image/jpeg", is_text: false },
    Mapping { ext: ".jfif", mime_type: "image/jpeg", is_text: false },
    Mapping { ext: ".txt", mime_type: "text/plain", is_text: true },
    Mapping { ext: ".md", mime_type: "text/markdown", is_text: true },
    Mapping { ext: ".markdown", mime_type: "text/markdown", is_text: true },
    Mapping { ext: ".cmd", mime_type: "text/cmd", is_text: true },
    Mapping { ext: ".appcache", mime_type: "text/cache-manifest", is_text: true },
    Mapping { ext: ".svg", mime_type: "image/svg+xml", is_text: true },
    Mapping { ext: ".svgz", mime_type: "image/svg+xml", is_text: true },
    Mapping { ext: ".ttf", mime_type: "application/x-font-ttf", is_text: false },
    Mapping { ext: ".otf", mime_type: "application/x-font-opentype", is_text: false },
    Mapping { ext: ".woff", mime_type: "application/x-font-woff", is_text: false },
    Mapping { ext: ".woff2", mime_type: "application/x-font-woff2", is_text: false },
    Mapping { ext: ".eot", mime_type: "application/vnd.ms-fontobject", is_text: false },
    Mapping { ext: ".sfnt", mime_type: "application/font-sfnt", is_text: false },
    Mapping { ext: ".xml", mime_type: "application/xml", is_text: true },
    Mapping { ext: ".json", mime_type: "application/json", is_text: true },
    Mapping { ext: ".pdf", mime_type: "application/pdf", is_text: false },
    Mapping { ext: ".zip", mime_type: "application/zip", is_text: false },
    Mapping { ext: ".gz", mime_type: "application/gzip", is_text: false },
    Mapping { ext: ".tgz", mime_type: "application/gzip", is_text: false },
    Mapping { ext: ".torrent", mime_type: "application/x-bittorrent", is_text: false },
    Mapping { ext: ".bin", mime_type: "application/octet-stream", is_text: false },
    Mapping { ext: ".exe", mime_type: "application/octet-stream", is_text: false },
];

/// MIME type for a file extension (with leading dot), case-insensitive.
/// Unknown extensions map to `text/plain`.
#[must_use]
pub fn ext_to_type(ext: &str) -> &'static str {
    MAPPINGS
        .iter()
        .find(|m| m.ext.eq_ignore_ascii_case(ext))
        .map_or("text/plain", |m| m.mime_type)
}

/// Whether a MIME type from this table is textual. Unknown types are not.
#[must_use]
pub fn is_text(mime_type: &str) -> bool {
    MAPPINGS
        .iter()
        .find(|m| m.mime_type.eq_ignore_ascii_case(mime_type))
        .is_some_and(|m| m.is_text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_extensions() {
        assert_eq!(ext_to_type(".html"), "text/html");
        assert_eq!(ext_to_type(".JSON"), "application/json");
        assert_eq!(ext_to_type(".woff2"), "application/x-font-woff2");
    }

    #[test]
    fn unknown_extension_is_plain_text() {
        assert_eq!(ext_to_type(".unknown"), "text/plain");
        assert!(!is_text("application/x-made-up"));
    }

    #[test]
    fn text_flag() {
        assert!(is_text("text/html"));
        assert!(is_text("image/svg+xml"));
        assert!(!is_text("image/png"));
    }
}
