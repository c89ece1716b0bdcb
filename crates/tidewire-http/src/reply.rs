//! HTTP reply message, status table and stock error pages.

use crate::headers::Headers;
use crate::message::{escape_json_body, filter_text_body, ContentType};
use crate::util::http_date_now;

/// Default `Server` header value.
pub const DEFAULT_SERVER_NAME: &str = concat!("tidewire/", env!("CARGO_PKG_VERSION"));

/// Default `Allow` header value for 405/501 replies.
pub const DEFAULT_ALLOWED_METHODS: &str = "OPTIONS, GET";

/// The fixed set of reply statuses this stack produces and recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    SwitchingProtocols,
    Ok,
    Created,
    Accepted,
    NonAuthoritative,
    NoContent,
    MultipleChoices,
    MovedPermanently,
    MovedTemporarily,
    NotModified,
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    NotAllowed,
    InternalServerError,
    NotImplemented,
    BadGateway,
    ServiceUnavailable,
    GatewayTimeout,
}

impl Status {
    #[must_use]
    pub fn code(self) -> u16 {
        match self {
            Self::SwitchingProtocols => 101,
            Self::Ok => 200,
            Self::Created => 201,
            Self::Accepted => 202,
            Self::NonAuthoritative => 203,
            Self::NoContent => 204,
            Self::MultipleChoices => 300,
            Self::MovedPermanently => 301,
            Self::MovedTemporarily => 302,
            Self::NotModified => 304,
            Self::BadRequest => 400,
            Self::Unauthorized => 401,
            Self::Forbidden => 403,
            Self::NotFound => 404,
            Self::NotAllowed => 405,
            Self::InternalServerError => 500,
            Self::NotImplemented => 501,
            Self::BadGateway => 502,
            Self::ServiceUnavailable => 503,
            Self::GatewayTimeout => 504,
        }
    }

    /// Status by numeric code. Codes outside the fixed set yield `None`;
    /// the reply parser maps those to [`Status::InternalServerError`]
    /// while preserving the original text.
    #[must_use]
    pub fn from_code(code: u16) -> Option<Self> {
        Some(match code {
            101 => Self::SwitchingProtocols,
            200 => Self::Ok,
            201 => Self::Created,
            202 => Self::Accepted,
            203 => Self::NonAuthoritative,
            204 => Self::NoContent,
            300 => Self::MultipleChoices,
            301 => Self::MovedPermanently,
            302 => Self::MovedTemporarily,
            304 => Self::NotModified,
            400 => Self::BadRequest,
            401 => Self::Unauthorized,
            403 => Self::Forbidden,
            404 => Self::NotFound,
            405 => Self::NotAllowed,
            500 => Self::InternalServerError,
            501 => Self::NotImplemented,
            502 => Self::BadGateway,
            503 => Self::ServiceUnavailable,
            504 => Self::GatewayTimeout,
            _ => return None,
        })
    }

    #[must_use]
    pub fn reason(self) -> &'static str {
        match self {
            Self::SwitchingProtocols => "Switching Protocols",
            Self::Ok => "OK",
            Self::Created => "Created",
            Self::Accepted => "Accepted",
            Self::NonAuthoritative => "Non-Authoritative Information",
            Self::NoContent => "No Content",
            Self::MultipleChoices => "Multiple Choices",
            Self::MovedPermanently => "Moved Permanently",
            Self::MovedTemporarily => "Moved Temporarily",
            Self::NotModified => "Not Modified",
            Self::BadRequest => "Bad Request",
            Self::Unauthorized => "Unauthorized",
            Self::Forbidden => "Forbidden",
            Self::NotFound => "Not Found",
            Self::NotAllowed => "Method Not Allowed",
            Self::InternalServerError => "Internal Server Error",
            Self::NotImplemented => "Not Implemented",
            Self::BadGateway => "Bad Gateway",
            Self::ServiceUnavailable => "Service Unavailable",
            Self::GatewayTimeout => "Gateway Timeout",
        }
    }

    /// The complete status line, CRLF included.
    fn write_status_line(self, buffer: &mut Vec<u8>) {
        buffer.extend_from_slice(b"HTTP/1.1 ");
        buffer.extend_from_slice(self.code().to_string().as_bytes());
        buffer.push(b' ');
        buffer.extend_from_slice(self.reason().as_bytes());
        buffer.extend_from_slice(b"\r\n");
    }

    /// Canned HTML error page for this status.
    fn stock_html(self, server_name: &str) -> String {
        let code = self.code();
        let reason = self.reason();
        format!(
            "<html>\r\n\
             <head><title>{reason}</title></head>\r\n\
             <body>\r\n\
             <center><h1>{code} {reason}</h1></center>\r\n\
             <hr><center>{server_name}</center>\r\n\
             </body>\r\n\
             </html>\r\n"
        )
    }

    /// Canned JSON error body for this status.
    fn stock_json(self) -> String {
        format!(
            "{{\"error\":{{\"code\":{},\"message\":\"{}\"}}}}",
            self.code(),
            self.reason()
        )
    }
}

/// An HTTP/1.1 reply, either being assembled for send or being filled in
/// by the incremental reply parser.
#[derive(Debug, Clone)]
pub struct Reply {
    pub v_major: u32,
    pub v_minor: u32,
    pub status: Status,
    /// The numeric status exactly as it appeared on the wire.
    pub status_string: String,
    /// The reason phrase exactly as it appeared on the wire (ASCII only).
    pub status_text: String,
    pub content_type: ContentType,
    pub server_name: String,
    pub allowed_methods: String,
    pub close_connection: bool,
    pub headers: Headers,
    pub content_length: usize,
    pub content: Vec<u8>,
    /// Path of a cached file backing the content, when the application
    /// serves from a document cache.
    pub cache_file: String,
}

impl Default for Reply {
    fn default() -> Self {
        Self {
            v_major: 1,
            v_minor: 1,
            status: Status::InternalServerError,
            status_string: String::new(),
            status_text: String::new(),
            content_type: ContentType::Html,
            server_name: DEFAULT_SERVER_NAME.into(),
            allowed_methods: DEFAULT_ALLOWED_METHODS.into(),
            close_connection: true,
            headers: Headers::new(),
            content_length: 0,
            content: Vec::new(),
            cache_file: String::new(),
        }
    }
}

impl Reply {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset status, headers and content. Server name and allowed methods
    /// survive a clear.
    pub fn clear(&mut self) {
        self.status = Status::InternalServerError;
        self.status_string.clear();
        self.status_text.clear();
        self.content_type = ContentType::Html;
        self.close_connection = true;
        self.headers.clear();
        self.content.clear();
        self.content_length = 0;
    }

    pub fn add_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.add_pair(name, value);
    }

    /// Apply the JSON body escape in place.
    pub fn to_json(&mut self) {
        escape_json_body(&mut self.content);
    }

    /// Apply the plain-text control filter in place.
    pub fn to_text(&mut self) {
        filter_text_body(&mut self.content);
    }

    /// Normalize the accumulated `status_string` digits into [`Status`].
    /// Unknown codes become `InternalServerError`; the wire text is kept.
    pub fn string_to_status(&mut self) {
        if let Some(status) = self
            .status_string
            .parse::<u16>()
            .ok()
            .and_then(Status::from_code)
        {
            self.status = status;
        }
    }

    /// Serialize the status line, headers and content into an output
    /// buffer.
    pub fn to_buffer(&self, buffer: &mut Vec<u8>) {
        self.status.write_status_line(buffer);

        for header in &self.headers {
            buffer.extend_from_slice(header.name.as_bytes());
            buffer.extend_from_slice(b": ");
            buffer.extend_from_slice(header.value.as_bytes());
            buffer.extend_from_slice(b"\r\n");
        }

        buffer.extend_from_slice(b"\r\n");
        buffer.extend_from_slice(&self.content);
    }

    /// Populate the standard reply headers for `status`.
    ///
    /// Adds `Server` and `Date`, then status-specific headers (`Allow` for
    /// 405/501, `WWW-Authenticate` for 401), then for a non-empty body
    /// `Accept-Ranges`, `Content-Type` (explicit argument, or derived from
    /// [`ContentType`] with the matching body transform) and
    /// `Content-Length`. Ends with `Connection: close|keep-alive`.
    pub fn get_reply(&mut self, status: Status, content_type: Option<&str>) {
        self.status = status;

        self.add_header("Server", self.server_name.clone());
        self.add_header("Date", http_date_now());

        match status {
            Status::NotAllowed | Status::NotImplemented => {
                self.add_header("Allow", self.allowed_methods.clone());
            }
            Status::Unauthorized => {
                self.add_header(
                    "WWW-Authenticate",
                    "Basic realm=\"Access to the staging site\", charset=\"UTF-8\"",
                );
            }
            _ => {}
        }

        if !self.content.is_empty() {
            self.add_header("Accept-Ranges", "bytes");

            let mime = match content_type {
                Some(explicit) => explicit.to_string(),
                None => {
                    match self.content_type {
                        ContentType::Json => self.to_json(),
                        ContentType::Xml | ContentType::Text => self.to_text(),
                        ContentType::Html | ContentType::Sbin => {}
                    }
                    self.content_type.mime().to_string()
                }
            };

            self.add_header("Content-Type", mime);
            self.content_length = self.content.len();
            self.add_header("Content-Length", self.content_length.to_string());
        }

        if self.close_connection {
            self.add_header("Connection", "close");
        } else {
            self.add_header("Connection", "keep-alive");
        }
    }

    /// Fill the content with the stock page for `status` (JSON flavor when
    /// the reply content type is JSON, HTML otherwise), then populate the
    /// standard headers via [`Reply::get_reply`].
    pub fn get_stock_reply(&mut self, status: Status) {
        let body = match self.content_type {
            ContentType::Json => status.stock_json(),
            _ => status.stock_html(&self.server_name),
        };
        self.content = body.into_bytes();
        self.get_reply(status, None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_round_trip() {
        for status in [
            Status::SwitchingProtocols,
            Status::Ok,
            Status::NoContent,
            Status::NotModified,
            Status::NotFound,
            Status::GatewayTimeout,
        ] {
            assert_eq!(Status::from_code(status.code()), Some(status));
        }
        assert_eq!(Status::from_code(418), None);
    }

    #[test]
    fn unknown_code_normalizes_to_internal_error() {
        let mut reply = Reply::new();
        reply.status = Status::Ok;
        reply.status_string = "599".into();
        reply.status_text = "Whatever".into();
        reply.string_to_status();
        assert_eq!(reply.status, Status::InternalServerError);
        assert_eq!(reply.status_text, "Whatever");
    }

    #[test]
    fn stock_json_404() {
        let mut reply = Reply::new();
        reply.content_type = ContentType::Json;
        reply.get_stock_reply(Status::NotFound);

        assert_eq!(
            reply.content,
            b"{\"error\":{\"code\":404,\"message\":\"Not Found\"}}"
        );
        assert_eq!(reply.headers.value_of("content-type"), "application/json");
        assert_eq!(
            reply.headers.value_of("content-length"),
            reply.content.len().to_string()
        );
        assert_eq!(reply.headers.value_of("connection"), "close");
    }

    #[test]
    fn stock_html_mentions_code_and_server() {
        let mut reply = Reply::new();
        reply.server_name = "unit-test".into();
        reply.get_stock_reply(Status::BadRequest);

        let body = String::from_utf8(reply.content.clone()).unwrap();
        assert!(body.contains("<h1>400 Bad Request</h1>"));
        assert!(body.contains("<center>unit-test</center>"));
    }

    #[test]
    fn get_reply_status_specific_headers() {
        let mut reply = Reply::new();
        reply.get_reply(Status::NotAllowed, None);
        assert_eq!(reply.headers.value_of("allow"), DEFAULT_ALLOWED_METHODS);

        let mut reply = Reply::new();
        reply.get_reply(Status::Unauthorized, None);
        assert!(reply
            .headers
            .value_of("www-authenticate")
            .starts_with("Basic realm="));
    }

    #[test]
    fn serializes_status_line_headers_and_body() {
        let mut reply = Reply::new();
        reply.status = Status::Ok;
        reply.add_header("Content-Length", "2");
        reply.content = b"hi".to_vec();

        let mut buffer = Vec::new();
        reply.to_buffer(&mut buffer);
        assert_eq!(buffer, b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nhi");
    }
}
