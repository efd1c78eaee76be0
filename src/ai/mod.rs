pub mod label_theme;
pub mod prompt;

use std::net::{Ipv4Addr, Ipv6Addr};

use async_openai::Client;
use async_openai::config::{Config, OpenAIConfig};
use serde::de::DeserializeOwned;
use tracing::{error, trace};

use crate::AppResult;

/// Connection settings for an OpenAI-compatible server.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Force https (`true`) or http (`false`); guessed from the host when unset.
    pub secure: Option<bool>,
    pub api_version: String,
    pub api_key: Option<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 1234,
            secure: None,
            api_version: "v1".to_string(),
            api_key: None,
        }
    }
}

/// Hosts that are assumed to be reachable without TLS.
fn is_private_host(host: &str) -> bool {
    host == "localhost"
        || [
            ".local",
            ".internal",
            ".lan",
            ".corp",
            ".home.arpa",
            ".private",
            ".test",
        ]
        .iter()
        .any(|suffix| host.ends_with(suffix))
        || host
            .parse::<Ipv4Addr>()
            .is_ok_and(|ip| ip.is_loopback() || ip.is_private() || ip.is_link_local())
        || host.parse::<Ipv6Addr>().is_ok_and(|ip| {
            ip.is_loopback() || ip.is_unique_local() || ip.is_unicast_link_local()
        })
}

impl ServerSettings {
    pub fn api_base(&self) -> String {
        let secure = self.secure.unwrap_or_else(|| !is_private_host(&self.host));
        let schema = if secure { "https" } else { "http" };
        format!("{schema}://{}:{}/{}", self.host, self.port, self.api_version)
    }
}

/// Build an async-openai client for the configured server.
#[tracing::instrument(name = "Connecting to LLM server", level = "debug", skip(settings))]
pub fn get_client(settings: &ServerSettings) -> Client<Box<dyn Config>> {
    let mut config = OpenAIConfig::default().with_api_base(settings.api_base());
    if let Some(key) = &settings.api_key {
        config = config.with_api_key(key);
    }
    Client::with_config(Box::new(config) as Box<dyn Config>)
}

/// Slice from the first `{` to the last `}`; drops markdown fences and chatter around an object.
fn outermost_object(s: &str) -> Option<&str> {
    let start = s.find('{')?;
    let end = s.rfind('}')?;
    (start < end).then(|| &s[start..=end])
}

/// Parse a model reply: strict JSON first, then the outermost object inside the reply.
pub fn parse_model_json<T: DeserializeOwned>(name: &str, content: &str) -> AppResult<T> {
    trace!("Raw {name} content: {content}");
    if let Ok(parsed) = serde_json::from_str(content) {
        return Ok(parsed);
    }

    let cleaned = outermost_object(content).unwrap_or(content);
    trace!("Cleaned {name} content: {cleaned}");
    let jd = &mut serde_json::Deserializer::from_str(cleaned);
    match serde_path_to_error::deserialize(jd) {
        Ok(parsed) => Ok(parsed),
        Err(e) => {
            error!("Failed to deserialize {name}: {e}");
            error!("Failed to parse JSON at path: {}", e.path());
            Err(e.into_inner().into())
        }
    }
}
