//! Incremental HTTP request and reply parsers.
//!
//! Both parsers are byte-at-a-time state machines: `consume` is a pure
//! step over (state, byte, message) and `parse` loops it over whatever is
//! currently buffered. The caller keeps the context between refills, so a
//! message split across arbitrarily many reads parses identically to one
//! delivered in a single buffer.
//!
//! Verdicts never allocate and never abort: a malformed byte yields
//! [`Verdict::Error`] and leaves the connection to decide what to send.

use crate::headers::Header;
use crate::reply::Reply;
use crate::request::Request;

/// Outcome of a parse step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// More input is required.
    More,
    /// A complete message has been parsed.
    Done,
    /// The input violates the grammar.
    Error,
}

/// HTTP character (7-bit).
#[must_use]
pub fn is_char(byte: u8) -> bool {
    byte <= 127
}

/// HTTP control character.
#[must_use]
pub fn is_ctl(byte: u8) -> bool {
    byte <= 31 || byte == 127
}

/// ASCII digit.
#[must_use]
pub fn is_digit(byte: u8) -> bool {
    byte.is_ascii_digit()
}

/// RFC 2616 separator ("tspecial") character.
#[must_use]
pub fn is_tspecial(byte: u8) -> bool {
    matches!(
        byte,
        b'(' | b')'
            | b'<'
            | b'>'
            | b'@'
            | b','
            | b';'
            | b':'
            | b'\\'
            | b'"'
            | b'/'
            | b'['
            | b']'
            | b'?'
            | b'='
            | b'{'
            | b'}'
            | b' '
            | b'\t'
    )
}

/// Token byte: CHAR minus CTL minus tspecial.
fn is_token(byte: u8) -> bool {
    is_char(byte) && !is_ctl(byte) && !is_tspecial(byte)
}

/// Two-character percent-escape accumulator shared by both contexts.
#[derive(Debug, Clone, Copy, Default)]
struct HexPair {
    digits: [u8; 2],
    len: usize,
}

impl HexPair {
    fn reset(&mut self) {
        self.len = 0;
        self.digits = [0; 2];
    }

    /// Feed one escape character; yields the decoded byte after two.
    /// `Err` means a non-hex character was seen.
    fn push(&mut self, byte: u8) -> Result<Option<u8>, ()> {
        if !byte.is_ascii_hexdigit() {
            return Err(());
        }
        self.digits[self.len] = byte;
        self.len += 1;
        if self.len < 2 {
            return Ok(None);
        }
        let hi = (self.digits[0] as char).to_digit(16).ok_or(())?;
        let lo = (self.digits[1] as char).to_digit(16).ok_or(())?;
        Ok(Some((hi * 16 + lo) as u8))
    }
}

/// Parse the leading decimal digits of a `Content-Length` value; anything
/// after them is ignored, no digits at all yields zero.
fn leading_decimal(value: &str) -> usize {
    let trimmed = value.trim_start();
    let end = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    trimmed[..end].parse().unwrap_or(0)
}

// ============================================================================
// Request parser
// ============================================================================

/// Request parser states. Values are stable across buffer refills; the
/// connection stores the state at which to resume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestState {
    #[default]
    MethodStart,
    Method,
    UriStart,
    Uri,
    UriParamStart,
    UriParam,
    UriParamMime,
    HttpVersionH,
    HttpVersionT1,
    HttpVersionT2,
    HttpVersionP,
    HttpVersionSlash,
    HttpVersionMajorStart,
    HttpVersionMajor,
    HttpVersionMinorStart,
    HttpVersionMinor,
    ExpectingNewline1,
    HeaderLineStart,
    HeaderLws,
    HeaderName,
    SpaceBeforeHeaderValue,
    HeaderValue,
    HeaderValueOptionsStart,
    HeaderValueOptions,
    ExpectingNewline2,
    ExpectingNewline3,
    Content,
    FormDataStart,
    FormData,
    FormMime,
}

/// Resumable request-parser context.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub state: RequestState,
    /// Provisional content length: bytes left in the slice after the
    /// header terminator. Overridden by a `Content-Length` header.
    content_length: usize,
    hex: HexPair,
}

impl RequestContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Context resuming at a given state; `ParseFormData` re-enters the
    /// header machine this way for each multipart segment.
    #[must_use]
    pub fn with_state(state: RequestState) -> Self {
        Self {
            state,
            ..Self::default()
        }
    }
}

/// Parser for incoming HTTP requests.
pub struct RequestParser;

impl RequestParser {
    /// Handle one byte of input. `remaining` is the number of bytes that
    /// follow this one in the current slice; it feeds the provisional
    /// content length computed at end of headers.
    #[allow(clippy::too_many_lines)]
    pub fn consume(
        request: &mut Request,
        ctx: &mut RequestContext,
        input: u8,
        remaining: usize,
    ) -> Verdict {
        match ctx.state {
            RequestState::MethodStart => {
                if !is_token(input) {
                    return Verdict::Error;
                }
                ctx.state = RequestState::Method;
                request.method.push(char::from(input));
                Verdict::More
            }
            RequestState::Method => {
                if input == b' ' {
                    ctx.state = RequestState::Uri;
                    return Verdict::More;
                }
                if !is_token(input) {
                    return Verdict::Error;
                }
                request.method.push(char::from(input));
                Verdict::More
            }
            RequestState::UriStart => {
                if is_ctl(input) {
                    return Verdict::Error;
                }
                ctx.state = RequestState::Uri;
                request.uri.push(char::from(input));
                Verdict::More
            }
            RequestState::Uri => match input {
                b' ' => {
                    ctx.state = RequestState::HttpVersionH;
                    Verdict::More
                }
                b'?' => {
                    ctx.state = RequestState::UriParamStart;
                    Verdict::More
                }
                _ if is_ctl(input) => Verdict::Error,
                _ => {
                    request.uri.push(char::from(input));
                    Verdict::More
                }
            },
            RequestState::UriParamStart => match input {
                b' ' => {
                    ctx.state = RequestState::HttpVersionH;
                    Verdict::More
                }
                _ if is_ctl(input) => Verdict::Error,
                _ => {
                    ctx.state = RequestState::UriParam;
                    request.params.push(String::from(char::from(input)));
                    Verdict::More
                }
            },
            RequestState::UriParam => match input {
                b' ' => {
                    ctx.state = RequestState::HttpVersionH;
                    Verdict::More
                }
                b'&' => {
                    ctx.state = RequestState::UriParamStart;
                    Verdict::More
                }
                b'%' => {
                    ctx.hex.reset();
                    ctx.state = RequestState::UriParamMime;
                    Verdict::More
                }
                b'+' => {
                    if let Some(param) = request.params.last_mut() {
                        param.push(' ');
                    }
                    Verdict::More
                }
                _ if is_ctl(input) => Verdict::Error,
                _ => {
                    if let Some(param) = request.params.last_mut() {
                        param.push(char::from(input));
                    }
                    Verdict::More
                }
            },
            RequestState::UriParamMime => match ctx.hex.push(input) {
                Ok(None) => Verdict::More,
                Ok(Some(decoded)) => {
                    if let Some(param) = request.params.last_mut() {
                        param.push(char::from(decoded));
                    }
                    ctx.state = RequestState::UriParam;
                    Verdict::More
                }
                Err(()) => Verdict::Error,
            },
            RequestState::HttpVersionH => {
                Self::expect(ctx, input, b'H', RequestState::HttpVersionT1)
            }
            RequestState::HttpVersionT1 => {
                Self::expect(ctx, input, b'T', RequestState::HttpVersionT2)
            }
            RequestState::HttpVersionT2 => {
                Self::expect(ctx, input, b'T', RequestState::HttpVersionP)
            }
            RequestState::HttpVersionP => {
                Self::expect(ctx, input, b'P', RequestState::HttpVersionSlash)
            }
            RequestState::HttpVersionSlash => {
                if input != b'/' {
                    return Verdict::Error;
                }
                request.v_major = 0;
                request.v_minor = 0;
                ctx.state = RequestState::HttpVersionMajorStart;
                Verdict::More
            }
            RequestState::HttpVersionMajorStart => {
                if !is_digit(input) {
                    return Verdict::Error;
                }
                request.v_major = request.v_major * 10 + u32::from(input - b'0');
                ctx.state = RequestState::HttpVersionMajor;
                Verdict::More
            }
            RequestState::HttpVersionMajor => {
                if input == b'.' {
                    ctx.state = RequestState::HttpVersionMinorStart;
                    return Verdict::More;
                }
                if !is_digit(input) {
                    return Verdict::Error;
                }
                request.v_major = request.v_major * 10 + u32::from(input - b'0');
                Verdict::More
            }
            RequestState::HttpVersionMinorStart => {
                if !is_digit(input) {
                    return Verdict::Error;
                }
                request.v_minor = request.v_minor * 10 + u32::from(input - b'0');
                ctx.state = RequestState::HttpVersionMinor;
                Verdict::More
            }
            RequestState::HttpVersionMinor => {
                if input == b'\r' {
                    ctx.state = RequestState::ExpectingNewline1;
                    return Verdict::More;
                }
                if !is_digit(input) {
                    return Verdict::Error;
                }
                request.v_minor = request.v_minor * 10 + u32::from(input - b'0');
                Verdict::More
            }
            RequestState::ExpectingNewline1 => {
                Self::expect(ctx, input, b'\n', RequestState::HeaderLineStart)
            }
            RequestState::HeaderLineStart => {
                if input == b'\r' {
                    ctx.state = RequestState::ExpectingNewline3;
                    return Verdict::More;
                }
                if !request.headers.is_empty() && (input == b' ' || input == b'\t') {
                    ctx.state = RequestState::HeaderLws;
                    return Verdict::More;
                }
                if !is_token(input) {
                    return Verdict::Error;
                }
                let mut header = Header::default();
                header.name.push(char::from(input));
                request.headers.add(header);
                ctx.state = RequestState::HeaderName;
                Verdict::More
            }
            RequestState::HeaderLws => {
                if input == b'\r' {
                    ctx.state = RequestState::ExpectingNewline2;
                    return Verdict::More;
                }
                if input == b' ' || input == b'\t' {
                    return Verdict::More;
                }
                if is_ctl(input) {
                    return Verdict::Error;
                }
                ctx.state = RequestState::HeaderValue;
                if let Some(header) = request.headers.last_mut() {
                    header.value.push(char::from(input));
                }
                Verdict::More
            }
            RequestState::HeaderName => {
                if input == b':' {
                    ctx.state = RequestState::SpaceBeforeHeaderValue;
                    return Verdict::More;
                }
                if !is_token(input) {
                    return Verdict::Error;
                }
                if let Some(header) = request.headers.last_mut() {
                    header.name.push(char::from(input));
                }
                Verdict::More
            }
            RequestState::SpaceBeforeHeaderValue => {
                Self::expect(ctx, input, b' ', RequestState::HeaderValue)
            }
            RequestState::HeaderValue => {
                if input == b'\r' {
                    ctx.state = RequestState::ExpectingNewline2;
                    return Verdict::More;
                }
                if input == b';' {
                    ctx.state = RequestState::HeaderValueOptionsStart;
                    return Verdict::More;
                }
                if is_ctl(input) {
                    return Verdict::Error;
                }
                if let Some(header) = request.headers.last_mut() {
                    header.value.push(char::from(input));
                }
                Verdict::More
            }
            RequestState::HeaderValueOptionsStart => {
                if input == b' ' || input == b'\t' {
                    return Verdict::More;
                }
                if is_ctl(input) {
                    return Verdict::Error;
                }
                ctx.state = RequestState::HeaderValueOptions;
                if let Some(header) = request.headers.last_mut() {
                    header.options.push(String::from(char::from(input)));
                }
                Verdict::More
            }
            RequestState::HeaderValueOptions => {
                if input == b'\r' {
                    ctx.state = RequestState::ExpectingNewline2;
                    return Verdict::More;
                }
                if input == b';' {
                    ctx.state = RequestState::HeaderValueOptionsStart;
                    return Verdict::More;
                }
                if is_ctl(input) {
                    return Verdict::Error;
                }
                if let Some(option) = request
                    .headers
                    .last_mut()
                    .and_then(|h| h.options.last_mut())
                {
                    option.push(char::from(input));
                }
                Verdict::More
            }
            RequestState::ExpectingNewline2 => {
                Self::expect(ctx, input, b'\n', RequestState::HeaderLineStart)
            }
            RequestState::ExpectingNewline3 => {
                if input != b'\n' {
                    return Verdict::Error;
                }
                ctx.content_length = remaining;

                if !request.headers.is_empty() {
                    let declared = request.headers.value_of("content-length");
                    if declared.is_empty() {
                        request.content_length = ctx.content_length;
                    } else {
                        request.content_length = leading_decimal(declared);
                    }

                    if request.headers.value_of("content-type")
                        == "application/x-www-form-urlencoded"
                    {
                        ctx.state = RequestState::FormDataStart;
                        return Verdict::More;
                    }
                } else {
                    request.content_length = ctx.content_length;
                }

                if request.content_length > 0 {
                    ctx.state = RequestState::Content;
                    return Verdict::More;
                }
                Verdict::Done
            }
            RequestState::Content => {
                request.content.push(input);
                if request.content.len() < request.content_length {
                    Verdict::More
                } else {
                    Verdict::Done
                }
            }
            RequestState::FormDataStart => {
                request.content.push(input);
                if is_ctl(input) {
                    return Verdict::Error;
                }
                ctx.state = RequestState::FormData;
                request.form_data.push(String::from(char::from(input)));
                Verdict::More
            }
            RequestState::FormData => {
                request.content.push(input);
                match input {
                    b'\n' => Verdict::Done,
                    b'\r' => Verdict::More,
                    b'&' => {
                        ctx.state = RequestState::FormDataStart;
                        Verdict::More
                    }
                    b'+' => {
                        if let Some(pair) = request.form_data.last_mut() {
                            pair.push(' ');
                        }
                        Verdict::More
                    }
                    b'%' => {
                        ctx.hex.reset();
                        ctx.state = RequestState::FormMime;
                        Verdict::More
                    }
                    _ if is_ctl(input) => Verdict::Error,
                    _ => {
                        if let Some(pair) = request.form_data.last_mut() {
                            pair.push(char::from(input));
                        }
                        if request.content.len() < request.content_length {
                            Verdict::More
                        } else {
                            Verdict::Done
                        }
                    }
                }
            }
            RequestState::FormMime => {
                request.content.push(input);
                match ctx.hex.push(input) {
                    Ok(None) => Verdict::More,
                    Ok(Some(decoded)) => {
                        if let Some(pair) = request.form_data.last_mut() {
                            pair.push(char::from(decoded));
                        }
                        ctx.state = RequestState::FormData;
                        Verdict::More
                    }
                    Err(()) => Verdict::Error,
                }
            }
        }
    }

    /// Run [`RequestParser::consume`] over a slice. Returns the terminal
    /// verdict and the number of bytes consumed; [`Verdict::More`] means
    /// the whole slice was consumed and the context is ready to resume.
    pub fn parse(
        request: &mut Request,
        ctx: &mut RequestContext,
        input: &[u8],
    ) -> (Verdict, usize) {
        for (index, &byte) in input.iter().enumerate() {
            let remaining = input.len() - index - 1;
            let verdict = Self::consume(request, ctx, byte, remaining);
            if verdict != Verdict::More {
                return (verdict, index + 1);
            }
        }
        (Verdict::More, input.len())
    }

    fn expect(ctx: &mut RequestContext, input: u8, wanted: u8, next: RequestState) -> Verdict {
        if input == wanted {
            ctx.state = next;
            Verdict::More
        } else {
            Verdict::Error
        }
    }
}

// ============================================================================
// Reply parser
// ============================================================================

/// Reply parser states; the mirror of [`RequestState`] starting at the
/// HTTP version and carrying the status line instead of a request line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplyState {
    #[default]
    HttpVersionH,
    HttpVersionT1,
    HttpVersionT2,
    HttpVersionP,
    HttpVersionSlash,
    HttpVersionMajorStart,
    HttpVersionMajor,
    HttpVersionMinorStart,
    HttpVersionMinor,
    HttpStatusStart,
    HttpStatus,
    HttpStatusTextStart,
    /// Reason-phrase bytes are accepted only while `is_char` holds, so a
    /// server emitting UTF-8 in its status line is rejected here. The
    /// restriction is deliberate; widen consciously or not at all.
    HttpStatusText,
    ExpectingNewline1,
    HeaderLineStart,
    HeaderLws,
    HeaderName,
    SpaceBeforeHeaderValue,
    HeaderValue,
    HeaderValueOptionsStart,
    HeaderValueOptions,
    ExpectingNewline2,
    ExpectingNewline3,
    Content,
}

/// Resumable reply-parser context. The reply grammar has no percent
/// escapes, so unlike [`RequestContext`] there is no hex accumulator.
#[derive(Debug, Clone, Default)]
pub struct ReplyContext {
    pub state: ReplyState,
    content_length: usize,
}

impl ReplyContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// Parser for incoming HTTP replies.
pub struct ReplyParser;

impl ReplyParser {
    /// Handle one byte of input; see [`RequestParser::consume`].
    #[allow(clippy::too_many_lines)]
    pub fn consume(reply: &mut Reply, ctx: &mut ReplyContext, input: u8, remaining: usize) -> Verdict {
        match ctx.state {
            ReplyState::HttpVersionH => Self::expect(ctx, input, b'H', ReplyState::HttpVersionT1),
            ReplyState::HttpVersionT1 => Self::expect(ctx, input, b'T', ReplyState::HttpVersionT2),
            ReplyState::HttpVersionT2 => Self::expect(ctx, input, b'T', ReplyState::HttpVersionP),
            ReplyState::HttpVersionP => Self::expect(ctx, input, b'P', ReplyState::HttpVersionSlash),
            ReplyState::HttpVersionSlash => {
                if input != b'/' {
                    return Verdict::Error;
                }
                reply.v_major = 0;
                reply.v_minor = 0;
                ctx.state = ReplyState::HttpVersionMajorStart;
                Verdict::More
            }
            ReplyState::HttpVersionMajorStart => {
                if !is_digit(input) {
                    return Verdict::Error;
                }
                reply.v_major = reply.v_major * 10 + u32::from(input - b'0');
                ctx.state = ReplyState::HttpVersionMajor;
                Verdict::More
            }
            ReplyState::HttpVersionMajor => {
                if input == b'.' {
                    ctx.state = ReplyState::HttpVersionMinorStart;
                    return Verdict::More;
                }
                if !is_digit(input) {
                    return Verdict::Error;
                }
                reply.v_major = reply.v_major * 10 + u32::from(input - b'0');
                Verdict::More
            }
            ReplyState::HttpVersionMinorStart => {
                if !is_digit(input) {
                    return Verdict::Error;
                }
                reply.v_minor = reply.v_minor * 10 + u32::from(input - b'0');
                ctx.state = ReplyState::HttpVersionMinor;
                Verdict::More
            }
            ReplyState::HttpVersionMinor => {
                if input == b' ' {
                    ctx.state = ReplyState::HttpStatusStart;
                    return Verdict::More;
                }
                if !is_digit(input) {
                    return Verdict::Error;
                }
                reply.v_minor = reply.v_minor * 10 + u32::from(input - b'0');
                Verdict::More
            }
            ReplyState::HttpStatusStart => {
                if !is_digit(input) {
                    return Verdict::Error;
                }
                reply.status_string.push(char::from(input));
                ctx.state = ReplyState::HttpStatus;
                Verdict::More
            }
            ReplyState::HttpStatus => {
                if input == b' ' {
                    reply.string_to_status();
                    ctx.state = ReplyState::HttpStatusTextStart;
                    return Verdict::More;
                }
                if !is_digit(input) {
                    return Verdict::Error;
                }
                reply.status_string.push(char::from(input));
                Verdict::More
            }
            ReplyState::HttpStatusTextStart => {
                if !is_char(input) {
                    return Verdict::Error;
                }
                reply.status_text.push(char::from(input));
                ctx.state = ReplyState::HttpStatusText;
                Verdict::More
            }
            ReplyState::HttpStatusText => {
                if input == b'\r' {
                    ctx.state = ReplyState::ExpectingNewline1;
                    return Verdict::More;
                }
                if !is_char(input) {
                    return Verdict::Error;
                }
                reply.status_text.push(char::from(input));
                Verdict::More
            }
            ReplyState::ExpectingNewline1 => {
                Self::expect(ctx, input, b'\n', ReplyState::HeaderLineStart)
            }
            ReplyState::HeaderLineStart => {
                if input == b'\r' {
                    ctx.state = ReplyState::ExpectingNewline3;
                    return Verdict::More;
                }
                if !reply.headers.is_empty() && (input == b' ' || input == b'\t') {
                    ctx.state = ReplyState::HeaderLws;
                    return Verdict::More;
                }
                if !is_token(input) {
                    return Verdict::Error;
                }
                let mut header = Header::default();
                header.name.push(char::from(input));
                reply.headers.add(header);
                ctx.state = ReplyState::HeaderName;
                Verdict::More
            }
            ReplyState::HeaderLws => {
                if input == b'\r' {
                    ctx.state = ReplyState::ExpectingNewline2;
                    return Verdict::More;
                }
                if input == b' ' || input == b'\t' {
                    return Verdict::More;
                }
                if is_ctl(input) {
                    return Verdict::Error;
                }
                ctx.state = ReplyState::HeaderValue;
                if let Some(header) = reply.headers.last_mut() {
                    header.value.push(char::from(input));
                }
                Verdict::More
            }
            ReplyState::HeaderName => {
                if input == b':' {
                    ctx.state = ReplyState::SpaceBeforeHeaderValue;
                    return Verdict::More;
                }
                if !is_token(input) {
                    return Verdict::Error;
                }
                if let Some(header) = reply.headers.last_mut() {
                    header.name.push(char::from(input));
                }
                Verdict::More
            }
            ReplyState::SpaceBeforeHeaderValue => {
                Self::expect(ctx, input, b' ', ReplyState::HeaderValue)
            }
            ReplyState::HeaderValue => {
                if input == b'\r' {
                    ctx.state = ReplyState::ExpectingNewline2;
                    return Verdict::More;
                }
                if is_ctl(input) {
                    return Verdict::Error;
                }
                // Unlike the request side, the reply keeps option bytes in
                // the value as well, so the raw value stays reconstructable.
                if let Some(header) = reply.headers.last_mut() {
                    header.value.push(char::from(input));
                }
                if input == b';' {
                    ctx.state = ReplyState::HeaderValueOptionsStart;
                }
                Verdict::More
            }
            ReplyState::HeaderValueOptionsStart => {
                if input == b' ' || input == b'\t' {
                    if let Some(header) = reply.headers.last_mut() {
                        header.value.push(char::from(input));
                    }
                    return Verdict::More;
                }
                if is_ctl(input) {
                    return Verdict::Error;
                }
                ctx.state = ReplyState::HeaderValueOptions;
                if let Some(header) = reply.headers.last_mut() {
                    header.value.push(char::from(input));
                    header.options.push(String::from(char::from(input)));
                }
                Verdict::More
            }
            ReplyState::HeaderValueOptions => {
                if input == b'\r' {
                    ctx.state = ReplyState::ExpectingNewline2;
                    return Verdict::More;
                }
                if input == b';' {
                    ctx.state = ReplyState::HeaderValueOptionsStart;
                    if let Some(header) = reply.headers.last_mut() {
                        header.value.push(char::from(input));
                    }
                    return Verdict::More;
                }
                if is_ctl(input) {
                    return Verdict::Error;
                }
                if let Some(header) = reply.headers.last_mut() {
                    header.value.push(char::from(input));
                    if let Some(option) = header.options.last_mut() {
                        option.push(char::from(input));
                    }
                }
                Verdict::More
            }
            ReplyState::ExpectingNewline2 => {
                Self::expect(ctx, input, b'\n', ReplyState::HeaderLineStart)
            }
            ReplyState::ExpectingNewline3 => {
                if input != b'\n' {
                    return Verdict::Error;
                }
                ctx.content_length = remaining;

                if reply.headers.is_empty() {
                    reply.content_length = ctx.content_length;
                } else {
                    let declared = reply.headers.value_of("content-length");
                    if declared.is_empty() {
                        reply.content_length = ctx.content_length;
                    } else {
                        reply.content_length = leading_decimal(declared);
                    }
                }

                if reply.content_length > 0 {
                    ctx.state = ReplyState::Content;
                    return Verdict::More;
                }
                Verdict::Done
            }
            ReplyState::Content => {
                reply.content.push(input);
                if reply.content.len() < reply.content_length {
                    Verdict::More
                } else {
                    Verdict::Done
                }
            }
        }
    }

    /// Run [`ReplyParser::consume`] over a slice; see
    /// [`RequestParser::parse`].
    pub fn parse(reply: &mut Reply, ctx: &mut ReplyContext, input: &[u8]) -> (Verdict, usize) {
        for (index, &byte) in input.iter().enumerate() {
            let remaining = input.len() - index - 1;
            let verdict = Self::consume(reply, ctx, byte, remaining);
            if verdict != Verdict::More {
                return (verdict, index + 1);
            }
        }
        (Verdict::More, input.len())
    }

    fn expect(ctx: &mut ReplyContext, input: u8, wanted: u8, next: ReplyState) -> Verdict {
        if input == wanted {
            ctx.state = next;
            Verdict::More
        } else {
            Verdict::Error
        }
    }
}
