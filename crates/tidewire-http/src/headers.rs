//! Ordered header store.
//!
//! Headers keep their on-the-wire order and original name casing; lookups
//! are case-insensitive per RFC 7230 §3.2 and return the first match.
//! Each header additionally carries the `;`-separated options the parser
//! split off its value (e.g. the `boundary` of a multipart content-type).

/// A single header: name, value and the parsed value options.
#[derive(Debug, Clone, Default)]
pub struct Header {
    pub name: String,
    pub value: String,
    pub options: Vec<String>,
}

impl Header {
    /// Create a header from a name/value pair with no options.
    pub fn pair(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            options: Vec::new(),
        }
    }

    /// Look up an option of the form `key=value` by key, case-insensitive.
    ///
    /// Returns the part after `=`, with surrounding double quotes stripped.
    /// An option without `=` matches by its full text and yields `""`.
    #[must_use]
    pub fn option(&self, key: &str) -> Option<&str> {
        for opt in &self.options {
            match opt.split_once('=') {
                Some((k, v)) if k.trim().eq_ignore_ascii_case(key) => {
                    return Some(v.trim().trim_matches('"'));
                }
                None if opt.trim().eq_ignore_ascii_case(key) => return Some(""),
                _ => {}
            }
        }
        None
    }
}

impl PartialEq for Header {
    fn eq(&self, other: &Self) -> bool {
        self.name.eq_ignore_ascii_case(&other.name)
    }
}

/// Ordered sequence of [`Header`] with by-name lookup.
#[derive(Debug, Clone, Default)]
pub struct Headers {
    list: Vec<Header>,
}

impl Headers {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.list.clear();
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.list.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    /// Index of the first header whose name matches case-insensitively.
    #[must_use]
    pub fn index_of_name(&self, name: &str) -> Option<usize> {
        self.list
            .iter()
            .position(|h| h.name.eq_ignore_ascii_case(name))
    }

    /// First header value for `name`, or `""` when absent.
    #[must_use]
    pub fn value_of(&self, name: &str) -> &str {
        self.index_of_name(name)
            .map_or("", |i| self.list[i].value.as_str())
    }

    /// First header for `name`, if present.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Header> {
        self.index_of_name(name).map(|i| &self.list[i])
    }

    #[must_use]
    pub fn at(&self, index: usize) -> Option<&Header> {
        self.list.get(index)
    }

    pub fn insert(&mut self, index: usize, header: Header) {
        self.list.insert(index, header);
    }

    pub fn add(&mut self, header: Header) -> usize {
        self.list.push(header);
        self.list.len() - 1
    }

    pub fn add_pair(&mut self, name: impl Into<String>, value: impl Into<String>) -> usize {
        self.add(Header::pair(name, value))
    }

    pub fn delete(&mut self, index: usize) {
        self.list.remove(index);
    }

    /// The most recently added header. The parsers append bytes here while
    /// a header line is being consumed.
    pub fn last_mut(&mut self) -> Option<&mut Header> {
        self.list.last_mut()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Header> {
        self.list.iter()
    }

    pub fn assign(&mut self, other: &Headers) {
        self.list.clear();
        self.list.extend(other.list.iter().cloned());
    }
}

impl<'a> IntoIterator for &'a Headers {
    type Item = &'a Header;
    type IntoIter = std::slice::Iter<'a, Header>;

    fn into_iter(self) -> Self::IntoIter {
        self.list.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_case_insensitive() {
        let mut headers = Headers::new();
        headers.add_pair("Content-Type", "text/html");
        headers.add_pair("Host", "example.com");

        assert_eq!(headers.value_of("content-type"), "text/html");
        assert_eq!(headers.value_of("HOST"), "example.com");
        assert_eq!(headers.value_of("missing"), "");
    }

    #[test]
    fn first_match_wins_and_order_is_kept() {
        let mut headers = Headers::new();
        headers.add_pair("X-Tag", "one");
        headers.add_pair("x-tag", "two");

        assert_eq!(headers.value_of("x-tag"), "one");
        assert_eq!(headers.at(1).unwrap().value, "two");

        headers.insert(0, Header::pair("x-tag", "zero"));
        assert_eq!(headers.value_of("x-tag"), "zero");
        headers.delete(0);
        assert_eq!(headers.value_of("x-tag"), "one");
    }

    #[test]
    fn names_preserve_wire_case() {
        let mut headers = Headers::new();
        headers.add_pair("Sec-WebSocket-Key", "abc");
        assert_eq!(headers.at(0).unwrap().name, "Sec-WebSocket-Key");
    }

    #[test]
    fn option_lookup() {
        let mut header = Header::pair("Content-Type", "multipart/form-data");
        header.options.push("boundary=----xyz".into());
        header.options.push("charset=\"utf-8\"".into());

        assert_eq!(header.option("boundary"), Some("----xyz"));
        assert_eq!(header.option("CHARSET"), Some("utf-8"));
        assert_eq!(header.option("nope"), None);
    }
}
