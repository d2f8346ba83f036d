//! Query-string construction.
//!
//! Only values the caller actually supplied end up in the URL; `None` is
//! skipped rather than sent as a default.

use url::form_urlencoded;

/// Ordered list of query parameters.
#[derive(Debug, Default, Clone)]
pub struct Query {
    pairs: Vec<(&'static str, String)>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a required parameter.
    #[must_use]
    pub fn with(mut self, key: &'static str, value: impl ToString) -> Self {
        self.pairs.push((key, value.to_string()));
        self
    }

    /// Append `key` only when `value` is present.
    #[must_use]
    pub fn opt<T: ToString>(mut self, key: &'static str, value: Option<T>) -> Self {
        if let Some(v) = value {
            self.pairs.push((key, v.to_string()));
        }
        self
    }

    /// Append a comma-joined list when it is present and non-empty.
    #[must_use]
    pub fn list(mut self, key: &'static str, values: Option<&[String]>) -> Self {
        if let Some(values) = values.filter(|v| !v.is_empty()) {
            self.pairs.push((key, values.join(",")));
        }
        self
    }

    /// Append the pagination parameters that were supplied.
    #[must_use]
    pub fn page(self, pagination: Pagination) -> Self {
        self.opt("page", pagination.page)
            .opt("per_page", pagination.per_page)
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// `path?k=v&...`, or `path` unchanged when nothing was supplied.
    pub fn apply(&self, path: &str) -> String {
        if self.pairs.is_empty() {
            return path.to_owned();
        }
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (k, v) in &self.pairs {
            serializer.append_pair(k, v);
        }
        format!("{path}?{}", serializer.finish())
    }
}

/// Page-number pagination as accepted by GitHub list and search endpoints.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl Pagination {
    pub const fn new(page: Option<u32>, per_page: Option<u32>) -> Self {
        Self { page, per_page }
    }
}

/// Percent-encode each segment of a slash-separated path, keeping the `/`
/// separators literal as GitHub expects in content and ref paths.
pub fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            form_urlencoded::byte_serialize(segment.as_bytes())
                .collect::<String>()
                .replace('+', "%20")
        })
        .collect::<Vec<_>>()
        .join("/")
}
