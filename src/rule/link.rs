use crate::config::Config;
use std::sync::Arc;

/// Maps a rule key to the URL documenting that rule
pub type RuleLinkResolver = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Link to a rule's page on the analysis server
pub fn rule_link(server_base_url: &str, rule_key: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(rule_key.as_bytes()).collect();
    format!(
        "{}/coding_rules#rule_key={}",
        server_base_url.trim_end_matches('/'),
        encoded
    )
}

/// Resolver bound to the configured server
pub fn resolver(config: &Config) -> RuleLinkResolver {
    let base_url = config.server.base_url.clone();
    Arc::new(move |rule_key: &str| rule_link(&base_url, rule_key))
}
