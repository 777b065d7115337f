//! Channel registry records: a channel names a backend network endpoint and
//! the set of providers that backend accepts.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A named delivery channel: a backend host/port plus the providers it
/// accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub name: String,
    pub host: String,
    pub port: u16,
    pub providers: Vec<Provider>,
}

impl Channel {
    /// The backend's dial address, `host:port`.
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Names of every provider this channel accepts.
    #[must_use]
    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name.as_str()).collect()
    }

    /// Whether `provider` is one this channel accepts.
    #[must_use]
    pub fn has_provider(&self, provider: &str) -> bool {
        self.providers.iter().any(|p| p.name == provider)
    }
}

/// A provider scoped to a [`Channel`], with provider-specific parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provider {
    pub name: String,
    #[serde(default)]
    pub params: HashMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Channel {
        Channel {
            name: "sms".into(),
            host: "127.0.0.1".into(),
            port: 9001,
            providers: vec![Provider {
                name: "twilio".into(),
                params: HashMap::new(),
            }],
        }
    }

    #[test]
    fn address_joins_host_and_port() {
        assert_eq!(sample().address(), "127.0.0.1:9001");
    }

    #[test]
    fn has_provider_checks_by_name() {
        let channel = sample();
        assert!(channel.has_provider("twilio"));
        assert!(!channel.has_provider("nexmo"));
    }
}
