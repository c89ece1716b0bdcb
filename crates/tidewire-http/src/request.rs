//! HTTP request message.

use crate::headers::Headers;
use crate::message::{escape_json_body, filter_text_body, ContentType};
use crate::util::base64_encode;

/// An HTTP/1.1 request, either being assembled for send or being filled
/// in by the incremental parser.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: String,
    pub uri: String,
    /// Raw `key=value` query parameters, in wire order, percent-decoded.
    pub params: Vec<String>,
    pub v_major: u32,
    pub v_minor: u32,
    pub headers: Headers,
    pub content_length: usize,
    pub content_type: ContentType,
    pub content: Vec<u8>,
    /// Raw `key=value` pairs of an urlencoded body, in wire order.
    pub form_data: Vec<String>,
    pub host: String,
    pub port: u16,
    pub user_agent: String,
    pub close_connection: bool,
}

impl Default for Request {
    fn default() -> Self {
        Self {
            // Empty so the parser can append method and URI bytes into a
            // fresh message; `clear` resets to the GET / defaults.
            method: String::new(),
            uri: String::new(),
            params: Vec::new(),
            v_major: 1,
            v_minor: 1,
            headers: Headers::new(),
            content_length: 0,
            content_type: ContentType::Html,
            content: Vec::new(),
            form_data: Vec::new(),
            host: String::new(),
            port: 0,
            user_agent: String::new(),
            close_connection: false,
        }
    }
}

impl Request {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset the message to `GET / HTTP/1.1` with no params, headers or
    /// content. Host, port and user agent survive a clear so a persistent
    /// connection can reuse them.
    pub fn clear(&mut self) {
        self.method = "GET".into();
        self.uri = "/".into();
        self.v_major = 1;
        self.v_minor = 1;
        self.params.clear();
        self.headers.clear();
        self.content.clear();
        self.form_data.clear();
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

    /// Serialize the request line, query params, headers and content into
    /// an output buffer.
    pub fn to_buffer(&self, buffer: &mut Vec<u8>) {
        buffer.extend_from_slice(self.method.as_bytes());
        buffer.push(b' ');
        buffer.extend_from_slice(self.uri.as_bytes());
        for (i, param) in self.params.iter().enumerate() {
            buffer.push(if i == 0 { b'?' } else { b'&' });
            buffer.extend_from_slice(param.as_bytes());
        }
        buffer.extend_from_slice(b" HTTP/1.1\r\n");

        for header in &self.headers {
            buffer.extend_from_slice(header.name.as_bytes());
            buffer.extend_from_slice(b": ");
            buffer.extend_from_slice(header.value.as_bytes());
            buffer.extend_from_slice(b"\r\n");
        }

        buffer.extend_from_slice(b"\r\n");
        buffer.extend_from_slice(&self.content);
    }

    /// Populate the standard request headers for `method uri`.
    ///
    /// Adds `Host` (with `:port` when the port is set), `User-Agent`, and
    /// for a non-empty body `Accept-Ranges`, `Content-Type` (explicit
    /// `content_type` argument, or derived from [`ContentType`] with the
    /// matching body transform applied) and `Content-Length`. Ends with
    /// `Connection: close|keep-alive` per `close_connection`.
    pub fn prepare(&mut self, method: &str, uri: &str, content_type: Option<&str>) {
        self.method = method.into();
        self.uri = uri.into();

        if !self.host.is_empty() {
            let host = if self.port > 0 {
                format!("{}:{}", self.host, self.port)
            } else {
                self.host.clone()
            };
            self.add_header("Host", host);
        }

        self.add_header("User-Agent", self.user_agent.clone());

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
            self.add_header("Content-Length", self.content.len().to_string());
        }

        if self.close_connection {
            self.add_header("Connection", "close");
        } else {
            self.add_header("Connection", "keep-alive");
        }
    }

    /// Add an `Authorization` header: `<scheme> base64(login:password)`.
    pub fn authorization(&mut self, scheme: &str, login: &str, password: &str) {
        let passphrase = format!("{login}:{password}");
        self.add_header(
            "Authorization",
            format!("{scheme} {}", base64_encode(passphrase.as_bytes())),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_request_line_params_and_headers() {
        let mut request = Request::new();
        request.method = "POST".into();
        request.uri = "/submit".into();
        request.params.push("a=1".into());
        request.params.push("b=two".into());
        request.add_header("Host", "example.com");
        request.content = b"body".to_vec();

        let mut buffer = Vec::new();
        request.to_buffer(&mut buffer);

        assert_eq!(
            buffer,
            b"POST /submit?a=1&b=two HTTP/1.1\r\nHost: example.com\r\n\r\nbody"
        );
    }

    #[test]
    fn prepare_adds_standard_headers() {
        let mut request = Request::new();
        request.host = "api.example.com".into();
        request.port = 8443;
        request.user_agent = "tidewire/0.3".into();
        request.content = b"{\"k\":1}".to_vec();
        request.content_type = ContentType::Json;
        request.close_connection = true;

        request.prepare("POST", "/v1/items", None);

        assert_eq!(request.headers.value_of("host"), "api.example.com:8443");
        assert_eq!(request.headers.value_of("user-agent"), "tidewire/0.3");
        assert_eq!(request.headers.value_of("accept-ranges"), "bytes");
        assert_eq!(request.headers.value_of("content-type"), "application/json");
        assert_eq!(request.headers.value_of("content-length"), "7");
        assert_eq!(request.headers.value_of("connection"), "close");
    }

    #[test]
    fn prepare_without_body_skips_content_headers() {
        let mut request = Request::new();
        request.host = "example.com".into();
        request.prepare("GET", "/", None);

        assert_eq!(request.headers.value_of("host"), "example.com");
        assert_eq!(request.headers.value_of("content-length"), "");
        assert_eq!(request.headers.value_of("connection"), "keep-alive");
    }

    #[test]
    fn authorization_header_is_base64() {
        let mut request = Request::new();
        request.authorization("Basic", "user", "pass");
        assert_eq!(
            request.headers.value_of("authorization"),
            "Basic dXNlcjpwYXNz"
        );
    }
}
