//! Shared types used across Seedline.
//!
//! This module defines the newtypes and request descriptors that flow
//! between the producer, its collaborators and downstream consumers.

use crate::error::SeedlineError;
use serde::{Deserialize, Serialize};
use std::fmt;
use url::{form_urlencoded, Url};

/// An initial endpoint to seed discovery from.
///
/// Targets must be absolute `http` or `https` URLs with a host.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Target {
    url: Url,
    domain: String,
}

impl Target {
    /// Create a new `Target` from a URL string.
    ///
    /// # Errors
    /// Returns error if the string is not an absolute http(s) URL with a host.
    pub fn new(url: impl AsRef<str>) -> crate::Result<Self> {
        let raw = url.as_ref();
        let url = Url::parse(raw)
            .map_err(|e| SeedlineError::Validation(format!("invalid target '{raw}': {e}")))?;
        Self::from_url(url)
    }

    /// Create a new `Target` from an already parsed URL.
    ///
    /// # Errors
    /// Returns error if the URL is not http(s) or has no host.
    pub fn from_url(url: Url) -> crate::Result<Self> {
        if !matches!(url.scheme(), "http" | "https") {
            return Err(SeedlineError::Validation(format!(
                "invalid target '{url}': scheme must be http or https"
            )));
        }

        let domain = url
            .host_str()
            .map(str::to_ascii_lowercase)
            .ok_or_else(|| SeedlineError::Validation(format!("invalid target '{url}': no host")))?;

        Ok(Self { url, domain })
    }

    /// The parsed URL.
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// The URL as a string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }

    /// Lowercased host name of the target.
    #[must_use]
    pub fn domain(&self) -> &str {
        &self.domain
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.url)
    }
}

impl TryFrom<String> for Target {
    type Error = SeedlineError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Target> for String {
    fn from(target: Target) -> Self {
        target.url.into()
    }
}

/// HTTP method of a request descriptor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// GET
    #[default]
    Get,
    /// POST
    Post,
    /// PUT
    Put,
    /// DELETE
    Delete,
    /// HEAD
    Head,
}

impl HttpMethod {
    /// Parse a method as found in an HTML `method` attribute.
    ///
    /// Unknown or empty values fall back to GET, as browsers do.
    #[must_use]
    pub fn from_form_attr(value: &str) -> Self {
        match value.trim().to_ascii_uppercase().as_str() {
            "POST" => Self::Post,
            "PUT" => Self::Put,
            "DELETE" => Self::Delete,
            "HEAD" => Self::Head,
            _ => Self::Get,
        }
    }

    /// Upper-case method name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A re-issuable request descriptor produced from a fetch.
///
/// Carries the method, URL, body fields and headers so that downstream
/// plugins can replay or mutate the request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkItem {
    method: HttpMethod,
    url: Url,
    #[serde(default)]
    fields: Vec<(String, String)>,
    #[serde(default)]
    headers: Vec<(String, String)>,
}

impl WorkItem {
    /// Create a descriptor with no fields or headers.
    #[must_use]
    pub fn new(method: HttpMethod, url: Url) -> Self {
        Self {
            method,
            url,
            fields: Vec::new(),
            headers: Vec::new(),
        }
    }

    /// Shorthand for a GET descriptor.
    #[must_use]
    pub fn get(url: Url) -> Self {
        Self::new(HttpMethod::Get, url)
    }

    /// Add a form/body field.
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    /// Add a request header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Request method.
    #[must_use]
    pub fn method(&self) -> HttpMethod {
        self.method
    }

    /// Request URL.
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Form/body fields in document order.
    #[must_use]
    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }

    /// Request headers.
    #[must_use]
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Lowercased host of the request URL, if it has one.
    #[must_use]
    pub fn domain(&self) -> Option<String> {
        self.url.host_str().map(str::to_ascii_lowercase)
    }

    /// Identity used for deduplication.
    ///
    /// Two descriptors share an identity when method, URL (ignoring the
    /// fragment) and the set of field names/values agree. Headers are not
    /// part of the identity.
    #[must_use]
    pub fn id(&self) -> WorkItemId {
        let mut url = self.url.clone();
        url.set_fragment(None);

        if self.fields.is_empty() {
            return WorkItemId(format!("{} {url}", self.method));
        }

        let mut fields: Vec<&(String, String)> = self.fields.iter().collect();
        fields.sort();

        // Encoded so that `&` and `=` inside names or values cannot merge
        // two different field sets.
        let body = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(fields)
            .finish();

        WorkItemId(format!("{} {url} {body}", self.method))
    }
}

impl fmt::Display for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

/// Deduplication identity of a [`WorkItem`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorkItemId(String);

impl WorkItemId {
    /// Get the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifies one producer run, so consumers sharing a channel can tell
/// whose sentinel they are looking at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProducerId(uuid::Uuid);

impl ProducerId {
    /// Create a new random `ProducerId`.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl fmt::Display for ProducerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).expect("valid test URL")
    }

    #[test]
    fn test_target_valid() {
        let target = Target::new("http://A.Example/path?q=1").expect("valid target");
        assert_eq!(target.domain(), "a.example");
        assert_eq!(target.as_str(), "http://a.example/path?q=1");
    }

    #[test]
    fn test_target_invalid() {
        assert!(Target::new("not a url").is_err());
        assert!(Target::new("ftp://a.example/").is_err());
        assert!(Target::new("mailto:someone@a.example").is_err());

        let err = Target::new("file:///etc/passwd").expect_err("file scheme rejected");
        assert!(err.to_string().contains("scheme must be http or https"));
    }

    #[test]
    fn test_target_serde() {
        let target: Target =
            serde_json::from_str("\"https://a.example/\"").expect("deserialize target");
        assert_eq!(target.domain(), "a.example");
        assert!(serde_json::from_str::<Target>("\"gopher://a.example/\"").is_err());
    }

    #[test]
    fn test_method_from_form_attr() {
        assert_eq!(HttpMethod::from_form_attr("post"), HttpMethod::Post);
        assert_eq!(HttpMethod::from_form_attr(" Get "), HttpMethod::Get);
        assert_eq!(HttpMethod::from_form_attr("dialog"), HttpMethod::Get);
        assert_eq!(HttpMethod::from_form_attr(""), HttpMethod::Get);
    }

    #[test]
    fn test_work_item_id_ignores_fragment_and_headers() {
        let a = WorkItem::get(url("http://a.example/page#top"));
        let b = WorkItem::get(url("http://a.example/page")).with_header("Referer", "x");
        assert_eq!(a.id(), b.id());
    }

    #[test]
    fn test_work_item_id_field_order_insensitive() {
        let a = WorkItem::new(HttpMethod::Post, url("http://a.example/login"))
            .with_field("user", "")
            .with_field("pass", "");
        let b = WorkItem::new(HttpMethod::Post, url("http://a.example/login"))
            .with_field("pass", "")
            .with_field("user", "");
        assert_eq!(a.id(), b.id());

        let get = WorkItem::get(url("http://a.example/login"));
        assert_ne!(a.id(), get.id());
    }

    #[test]
    fn test_work_item_id_escapes_field_separators() {
        let packed = WorkItem::new(HttpMethod::Post, url("http://a.example/f"))
            .with_field("a", "1&b=2");
        let split = WorkItem::new(HttpMethod::Post, url("http://a.example/f"))
            .with_field("a", "1")
            .with_field("b", "2");
        assert_ne!(packed.id(), split.id());

        let eq_in_name = WorkItem::new(HttpMethod::Post, url("http://a.example/f"))
            .with_field("a=1", "");
        let eq_in_value = WorkItem::new(HttpMethod::Post, url("http://a.example/f"))
            .with_field("a", "=1");
        assert_ne!(eq_in_name.id(), eq_in_value.id());
    }

    #[test]
    fn test_work_item_domain() {
        let item = WorkItem::get(url("https://WWW.A.Example:8443/"));
        assert_eq!(item.domain().as_deref(), Some("www.a.example"));
        assert_eq!(item.to_string(), "GET https://www.a.example:8443/");
    }

    #[test]
    fn test_producer_id_unique() {
        assert_ne!(ProducerId::generate(), ProducerId::generate());
    }
}
