use shared::intake::MAX_FILE_BYTES;
use std::env;
use url::Url;

pub const DEFAULT_PORT: u16 = 8081;
pub const DEFAULT_UPSTREAM: &str = "https://api.detectree2.tech/";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid {name}: {value}")]
    Invalid { name: &'static str, value: String },
    #[error("Invalid UPSTREAM_URL: {0}")]
    Url(#[from] url::ParseError),
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub port: u16,
    pub upstream: Url,
    pub frontend_dir: String,
    pub max_upload_bytes: u64,
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = match lookup("PORT") {
            Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
                name: "PORT",
                value,
            })?,
            None => DEFAULT_PORT,
        };

        let raw_upstream = lookup("UPSTREAM_URL").unwrap_or_else(|| DEFAULT_UPSTREAM.to_string());
        let mut upstream = Url::parse(&raw_upstream)?;
        if !matches!(upstream.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid {
                name: "UPSTREAM_URL",
                value: raw_upstream,
            });
        }
        // Relative joins need the trailing slash to keep the base path.
        if !upstream.path().ends_with('/') {
            let path = format!("{}/", upstream.path());
            upstream.set_path(&path);
        }

        let frontend_dir = lookup("FRONTEND_DIR").unwrap_or_else(|| {
            if let Ok(manifest_dir) = env::var("CARGO_MANIFEST_DIR") {
                format!("{}/../frontend/dist", manifest_dir)
            } else {
                "/usr/src/app/frontend/dist".to_string()
            }
        });

        let max_upload_bytes = match lookup("MAX_UPLOAD_BYTES") {
            Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
                name: "MAX_UPLOAD_BYTES",
                value,
            })?,
            None => MAX_FILE_BYTES,
        };

        Ok(Self {
            port,
            upstream,
            frontend_dir,
            max_upload_bytes,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = GatewayConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.upstream.as_str(), DEFAULT_UPSTREAM);
        assert_eq!(config.max_upload_bytes, MAX_FILE_BYTES);
        assert_eq!(config.bind_address(), "0.0.0.0:8081");
    }

    #[test]
    fn upstream_path_gets_a_trailing_slash() {
        let config =
            GatewayConfig::from_lookup(lookup(&[("UPSTREAM_URL", "http://detector:5000/v1")]))
                .unwrap();
        assert_eq!(
            config.upstream.join("download/png").unwrap().as_str(),
            "http://detector:5000/v1/download/png"
        );
    }

    #[test]
    fn bad_values_are_rejected() {
        assert!(matches!(
            GatewayConfig::from_lookup(lookup(&[("PORT", "eighty")])),
            Err(ConfigError::Invalid { name: "PORT", .. })
        ));
        assert!(matches!(
            GatewayConfig::from_lookup(lookup(&[("UPSTREAM_URL", "ftp://detector")])),
            Err(ConfigError::Invalid { name: "UPSTREAM_URL", .. })
        ));
        assert!(matches!(
            GatewayConfig::from_lookup(lookup(&[("UPSTREAM_URL", "not a url")])),
            Err(ConfigError::Url(_))
        ));
    }
}
