//! User-Agent string sent with every listing and document request.

/// Project URL for User-Agent identification (RFC 9308).
const PROJECT_UA_URL: &str = "https://github.com/fierce/hansard-ingest";

/// Default User-Agent for listing and document requests.
#[must_use]
pub(crate) fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("hansard-ingest/{version} (parliamentary-archive; +{PROJECT_UA_URL})")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_agent_carries_version_and_project_url() {
        let ua = default_user_agent();
        assert!(ua.contains(PROJECT_UA_URL));
        assert_eq!(
            ua.strip_prefix("hansard-ingest/")
                .and_then(|s| s.split(' ').next()),
            Some(env!("CARGO_PKG_VERSION"))
        );
    }
}
