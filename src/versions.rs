//! Mapping from installed browser major versions to driver versions.
//!
//! The table has the form `<family><major>=<driver version>` (`chrome79=79.0.3945.36`). It is
//! read from an online copy or from the one bundled into the binary; whichever is consulted
//! first, a miss or a failed fetch falls back to the other.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::config::{Config, parse_properties};
use crate::http::{HttpClient, parse_url};

const BUNDLED: &str = include_str!("../resources/versions.properties");

#[derive(Debug, Clone)]
pub struct VersionsProperties {
    online_url: String,
    online_first: bool,
    online: Option<HashMap<String, String>>,
    local: Option<HashMap<String, String>>,
}

impl VersionsProperties {
    pub fn new(config: &Config) -> Self {
        Self {
            online_url: config.versions_properties_url.clone(),
            online_first: config.versions_properties_online_first,
            online: None,
            local: None,
        }
    }

    /// Looks up `key`, loading each source at most once.
    pub async fn get(&mut self, http: &HttpClient, key: &str) -> Option<String> {
        let first = self.table(http, self.online_first).await.get(key).cloned();
        if first.is_some() {
            return first;
        }
        debug!(
            "{} not found in {} versions properties, trying {}",
            key,
            source_name(self.online_first),
            source_name(!self.online_first)
        );
        self.table(http, !self.online_first).await.get(key).cloned()
    }

    async fn table(&mut self, http: &HttpClient, online: bool) -> &HashMap<String, String> {
        if online {
            if self.online.is_none() {
                let table = fetch_online(http, &self.online_url).await.unwrap_or_else(|e| {
                    warn!("Could not read versions properties from {}: {}", self.online_url, e);
                    HashMap::new()
                });
                self.online = Some(table);
            }
            self.online.get_or_insert_with(HashMap::new)
        } else {
            self.local.get_or_insert_with(|| parse_properties(BUNDLED))
        }
    }
}

fn source_name(online: bool) -> &'static str {
    if online { "online" } else { "local" }
}

async fn fetch_online(
    http: &HttpClient,
    url: &str,
) -> Result<HashMap<String, String>, crate::error::WebDriverError> {
    let url = parse_url(url)?;
    let body = http.get_text(&url).await?;
    Ok(parse_properties(&body))
}
