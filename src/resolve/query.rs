/// Decoded query string of a request, in order of appearance.
///
/// Values are taken verbatim; every value this crate reads (hex payloads, gravity names, flags) is
/// plain ASCII.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    /// Parse `a=1&b&c=` (with or without a leading `?`).
    pub fn parse(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let pairs = query
            .split('&')
            .filter(|p| !p.is_empty())
            .map(|pair| match pair.split_once('=') {
                Some((k, v)) => (k.to_string(), v.to_string()),
                None => (pair.to_string(), String::new()),
            })
            .collect();
        Self { pairs }
    }

    /// Split `url` into its path and parsed query.
    pub fn split_url(url: &str) -> (&str, Self) {
        match url.split_once('?') {
            Some((path, query)) => (path, Self::parse(query)),
            None => (url, Self::default()),
        }
    }

    /// Add a pair.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.pairs.push((key.into(), value.into()));
        self
    }

    /// First value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Boolean flag: present means on, unless its value is `false` or `0`.
    pub fn flag(&self, key: &str) -> bool {
        match self.get(key) {
            Some(v) => !matches!(v.to_ascii_lowercase().as_str(), "false" | "0"),
            None => false,
        }
    }

    /// Hex label payload: the `t` value, or else the first key that carries no value.
    pub fn payload_hex(&self) -> Option<&str> {
        self.get("t").or_else(|| {
            self.pairs
                .iter()
                .find(|(_, v)| v.is_empty())
                .map(|(k, _)| k.as_str())
        })
    }

    /// Whether no pairs were given.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}
