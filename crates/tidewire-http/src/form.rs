//! Form decoding: URL unescaping and `multipart/form-data` bodies.
//!
//! The request parser handles `application/x-www-form-urlencoded` inline;
//! multipart bodies are buffered whole and post-processed here with
//! [`parse_form_data`], which re-enters the header parser for each part.

use crate::headers::Headers;
use crate::parser::{RequestContext, RequestParser, RequestState, Verdict};
use crate::request::Request;

/// URL-decoding failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlDecodeError {
    /// A `%` escape ended before two characters were available.
    TruncatedEscape,
    /// A `%` escape contained a non-hex character.
    InvalidEscape,
}

impl std::fmt::Display for UrlDecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TruncatedEscape => write!(f, "truncated percent escape"),
            Self::InvalidEscape => write!(f, "invalid percent escape"),
        }
    }
}

impl std::error::Error for UrlDecodeError {}

/// Decode `+` to space and `%HH` to the byte with hex value `HH`; all
/// other characters pass through.
///
/// # Errors
///
/// Fails on a `%` followed by fewer than two characters or by non-hex
/// characters.
pub fn url_decode(input: &str) -> Result<String, UrlDecodeError> {
    let bytes = input.as_bytes();
    let mut out = String::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'%' => {
                if i + 3 > bytes.len() {
                    return Err(UrlDecodeError::TruncatedEscape);
                }
                let hi = (bytes[i + 1] as char)
                    .to_digit(16)
                    .ok_or(UrlDecodeError::InvalidEscape)?;
                let lo = (bytes[i + 2] as char)
                    .to_digit(16)
                    .ok_or(UrlDecodeError::InvalidEscape)?;
                out.push(char::from((hi * 16 + lo) as u8));
                i += 3;
            }
            b'+' => {
                out.push(' ');
                i += 1;
            }
            other => {
                out.push(char::from(other));
                i += 1;
            }
        }
    }

    Ok(out)
}

/// One decoded part of a `multipart/form-data` body.
#[derive(Debug, Clone, Default)]
pub struct FormDataItem {
    /// The `name` option of the part's content-disposition.
    pub name: String,
    /// The `filename` option, empty for plain fields.
    pub file: String,
    /// The part body.
    pub data: Vec<u8>,
    /// The part's own headers.
    pub headers: Headers,
}

/// Ordered sequence of [`FormDataItem`] with case-insensitive name lookup.
#[derive(Debug, Clone, Default)]
pub struct FormData {
    list: Vec<FormDataItem>,
}

impl FormData {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.list.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    #[must_use]
    pub fn index_of_name(&self, name: &str) -> Option<usize> {
        self.list
            .iter()
            .position(|item| item.name.eq_ignore_ascii_case(name))
    }

    /// Body of the first part with this name, or `b""` when absent.
    #[must_use]
    pub fn data_of(&self, name: &str) -> &[u8] {
        self.index_of_name(name)
            .map_or(b"", |i| self.list[i].data.as_slice())
    }

    #[must_use]
    pub fn at(&self, index: usize) -> Option<&FormDataItem> {
        self.list.get(index)
    }

    pub fn add(&mut self, item: FormDataItem) -> usize {
        self.list.push(item);
        self.list.len() - 1
    }

    pub fn clear(&mut self) {
        self.list.clear();
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FormDataItem> {
        self.list.iter()
    }
}

impl<'a> IntoIterator for &'a FormData {
    type Item = &'a FormDataItem;
    type IntoIter = std::slice::Iter<'a, FormDataItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.list.iter()
    }
}

fn find_subslice(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if needle.is_empty() || from >= haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| p + from)
}

/// Post-process a fully buffered `multipart/form-data` request body.
///
/// Splits the content on `\r\n--<boundary>` and runs the header parser
/// over each part starting at the header-line state. Parts whose body is
/// a single line are also mirrored into the request's flat `form_data`
/// pair list. Returns an empty collection when the request is not
/// multipart or carries no usable boundary.
pub fn parse_form_data(request: &mut Request) -> FormData {
    let mut form_data = FormData::new();

    if request.content.is_empty() {
        return form_data;
    }

    let boundary = {
        let Some(content_type) = request.headers.get("content-type") else {
            return form_data;
        };
        if content_type.value != "multipart/form-data" {
            return form_data;
        }
        match content_type.option("boundary") {
            Some(b) if !b.is_empty() => format!("\r\n--{b}"),
            _ => return form_data,
        }
    };

    let delimiter = boundary.as_bytes();
    let content = request.content.clone();

    let mut segments: Vec<&[u8]> = Vec::new();
    // The opening delimiter lacks the leading CRLF but has a trailing one,
    // so it occupies exactly `delimiter.len()` bytes.
    let mut begin = delimiter.len();
    while let Some(end) = find_subslice(&content, delimiter, begin) {
        segments.push(&content[begin..end]);
        begin = end + delimiter.len() + 2;
    }

    for segment in segments {
        let mut part = Request::new();
        let mut ctx = RequestContext::with_state(RequestState::HeaderLineStart);
        let (verdict, _) = RequestParser::parse(&mut part, &mut ctx, segment);
        if verdict != Verdict::Done {
            continue;
        }

        let mut item = FormDataItem::default();
        if let Some(disposition) = part.headers.get("content-disposition") {
            item.name = disposition.option("name").unwrap_or_default().to_string();
            item.file = disposition
                .option("filename")
                .unwrap_or_default()
                .to_string();
        }
        item.data = part.content;
        item.headers = part.headers;

        if !item.data.contains(&b'\n') {
            request.form_data.push(format!(
                "{}={}",
                item.name,
                String::from_utf8_lossy(&item.data)
            ));
        }

        form_data.add(item);
    }

    form_data
}
