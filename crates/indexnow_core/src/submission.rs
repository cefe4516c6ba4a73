use reqwest::Url;
use serde::Serialize;

/// Body of one IndexNow submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionRequest {
    pub host: String,
    pub key: String,
    #[serde(rename = "urlList")]
    pub url_list: Vec<String>,
}

impl SubmissionRequest {
    pub fn for_url(host: &str, key: &str, url: &str) -> Self {
        Self {
            host: host.to_string(),
            key: key.to_string(),
            url_list: vec![url.to_string()],
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Host component of an absolute URL, if it has one.
/// Surrounding whitespace makes the URL unusable as submitted, so it yields no host.
pub fn extract_host(url: &str) -> Option<String> {
    if url.trim() != url {
        return None;
    }
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    if host.is_empty() {
        return None;
    }
    Some(host.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_matches_wire_format() {
        let url = "https://wiki.example.com/wiki/Example_Page";
        let host = extract_host(url).expect("host");
        let payload = SubmissionRequest::for_url(&host, "abc123", url)
            .to_json()
            .expect("json");
        assert_eq!(
            payload,
            r#"{"host":"wiki.example.com","key":"abc123","urlList":["https://wiki.example.com/wiki/Example_Page"]}"#
        );
    }

    #[test]
    fn payload_escapes_special_characters() {
        let payload = SubmissionRequest::for_url("h.example", "k\"ey", "https://h.example/a\\b")
            .to_json()
            .expect("json");
        let value: serde_json::Value = serde_json::from_str(&payload).expect("reparse");
        assert_eq!(value["key"], "k\"ey");
        assert_eq!(value["urlList"][0], "https://h.example/a\\b");
    }

    #[test]
    fn extract_host_handles_ports_and_case() {
        assert_eq!(
            extract_host("HTTPS://Wiki.Example.COM:8443/wiki/X").as_deref(),
            Some("wiki.example.com")
        );
        assert_eq!(
            extract_host("http://127.0.0.1/wiki/X").as_deref(),
            Some("127.0.0.1")
        );
    }

    #[test]
    fn extract_host_rejects_malformed_input() {
        assert!(extract_host("not a url").is_none());
        assert!(extract_host("/wiki/Relative").is_none());
        assert!(extract_host("mailto:someone@example.com").is_none());
        assert!(extract_host("").is_none());
    }

    #[test]
    fn extract_host_rejects_padded_url() {
        assert!(extract_host(" https://wiki.example.com/wiki/X ").is_none());
        assert!(extract_host("https://wiki.example.com/wiki/X\n").is_none());
    }
}
