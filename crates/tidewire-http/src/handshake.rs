//! WebSocket upgrade handshake (RFC 6455 §4).

use crate::request::Request;
use crate::util::{base64_encode, sha1};

/// Handshake GUID (RFC 6455 §4.2.2).
const WS_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// Upgrade-validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeError {
    /// The request method is not GET.
    NotGet,
    /// A required upgrade header is missing or malformed.
    MissingHeader(&'static str),
    /// `Sec-WebSocket-Version` is not 13.
    UnsupportedVersion(String),
}

impl std::fmt::Display for HandshakeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotGet => write!(f, "WebSocket upgrade requires GET"),
            Self::MissingHeader(name) => {
                write!(f, "missing or malformed {name} header")
            }
            Self::UnsupportedVersion(version) => {
                write!(f, "unsupported WebSocket version: {version} (expected 13)")
            }
        }
    }
}

impl std::error::Error for HandshakeError {}

/// Compute the `Sec-WebSocket-Accept` value from the client's
/// `Sec-WebSocket-Key`.
#[must_use]
pub fn accept_key(client_key: &str) -> String {
    let mut input = String::with_capacity(client_key.len() + WS_GUID.len());
    input.push_str(client_key.trim());
    input.push_str(WS_GUID);
    base64_encode(&sha1(input.as_bytes()))
}

/// Validate a parsed request as a WebSocket upgrade (RFC 6455 §4.2.1).
///
/// Checks the method, the `Upgrade`/`Connection` tokens and the presence
/// of `Sec-WebSocket-Key` and `Sec-WebSocket-Version: 13`. Returns the
/// client key on success.
///
/// # Errors
///
/// Returns the first failed check.
pub fn validate_upgrade(request: &Request) -> Result<String, HandshakeError> {
    if !request.method.eq_ignore_ascii_case("GET") {
        return Err(HandshakeError::NotGet);
    }

    let upgrade = request.headers.value_of("upgrade");
    if !upgrade
        .split(',')
        .any(|v| v.trim().eq_ignore_ascii_case("websocket"))
    {
        return Err(HandshakeError::MissingHeader("Upgrade"));
    }

    let connection = request.headers.value_of("connection");
    if !connection
        .split(',')
        .any(|v| v.trim().eq_ignore_ascii_case("upgrade"))
    {
        return Err(HandshakeError::MissingHeader("Connection"));
    }

    let key = request.headers.value_of("sec-websocket-key").trim();
    if key.is_empty() {
        return Err(HandshakeError::MissingHeader("Sec-WebSocket-Key"));
    }

    let version = request.headers.value_of("sec-websocket-version").trim();
    if version != "13" {
        return Err(HandshakeError::UnsupportedVersion(version.to_string()));
    }

    Ok(key.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upgrade_request() -> Request {
        let mut request = Request::new();
        request.method = "GET".into();
        request.uri = "/socket".into();
        request.headers.add_pair("Host", "example.com");
        request.headers.add_pair("Upgrade", "websocket");
        request.headers.add_pair("Connection", "Upgrade");
        request
            .headers
            .add_pair("Sec-WebSocket-Key", "dGhlIHNhbXBsZSBub25jZQ==");
        request.headers.add_pair("Sec-WebSocket-Version", "13");
        request
    }

    #[test]
    fn accept_key_rfc_example() {
        // RFC 6455 §1.3 worked example.
        assert_eq!(
            accept_key("dGhlIHNhbXBsZSBub25jZQ=="),
            "s3pPLMBiTxaQ9kYGzzhZRbK+xOo="
        );
    }

    #[test]
    fn valid_upgrade_returns_key() {
        let request = upgrade_request();
        assert_eq!(
            validate_upgrade(&request).unwrap(),
            "dGhlIHNhbXBsZSBub25jZQ=="
        );
    }

    #[test]
    fn non_get_is_rejected() {
        let mut request = upgrade_request();
        request.method = "POST".into();
        assert_eq!(validate_upgrade(&request), Err(HandshakeError::NotGet));
    }

    #[test]
    fn wrong_version_is_rejected() {
        let mut request = upgrade_request();
        let idx = request.headers.index_of_name("sec-websocket-version").unwrap();
        request.headers.delete(idx);
        request.headers.add_pair("Sec-WebSocket-Version", "8");
        assert_eq!(
            validate_upgrade(&request),
            Err(HandshakeError::UnsupportedVersion("8".into()))
        );
    }
}
