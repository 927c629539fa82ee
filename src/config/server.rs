//! Configuration for the REST/WebSocket API server.

use serde::Deserialize;

/// Configuration for the API server.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Whether the HTTP server should be started at all.
    #[serde(default = "default_server_enabled")]
    pub enabled: bool,

    /// Address and port for the HTTP server to listen on.
    #[serde(default = "default_listen_address")]
    pub listen_address: String,
}

/// Provides the default value for enabled.
fn default_server_enabled() -> bool {
    true
}

/// Provides the default value for listen_address.
fn default_listen_address() -> String {
    "0.0.0.0:8080".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { enabled: default_server_enabled(), listen_address: default_listen_address() }
    }
}

#[cfg(test)]
mod tests {
    use config::Config;

    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config = Config::builder()
            .add_source(config::File::from_str("", config::FileFormat::Yaml))
            .build()
            .unwrap()
            .try_deserialize::<ServerConfig>()
            .unwrap();
        assert!(config.enabled);
        assert_eq!(config.listen_address, "0.0.0.0:8080");
    }

    #[test]
    fn custom_listen_address_is_respected() {
        let yaml = r#"
          listen_address: "127.0.0.1:3333"
        "#;
        let config = Config::builder()
            .add_source(config::File::from_str(yaml, config::FileFormat::Yaml))
            .build()
            .unwrap()
            .try_deserialize::<ServerConfig>()
            .unwrap();
        assert_eq!(config.listen_address, "127.0.0.1:3333");
    }
}
