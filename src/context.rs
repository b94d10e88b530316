use crate::backend::memory::MemoryClient;
use crate::backend::rest::RestClient;
use crate::backend::Backend;
use crate::cache;
use crate::cache::SharedCacheKey;
use log::info;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::time::Duration;

/// Everything needed to reach one data source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Context {
    pub name: ContextName,
    pub backend: BackendParams,
    pub cache_ttl_seconds: u64,
}

/// API keys are never saved, only the name of the environment variable that holds one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BackendParams {
    Rest { url: String, api_key_env: String },
    Memory { path: PathBuf },
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ContextName(String);

impl Context {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_seconds)
    }

    /// The API key this context would use, if the environment has one.
    pub fn api_key_from_env(&self) -> Option<String> {
        match &self.backend {
            BackendParams::Rest { api_key_env, .. } => std::env::var(api_key_env).ok(),
            BackendParams::Memory { .. } => None,
        }
    }

    pub fn needs_api_key(&self) -> bool {
        matches!(self.backend, BackendParams::Rest { .. }) && self.api_key_from_env().is_none()
    }

    /// Builds the backend for this context. `api_key` wins over the environment variable.
    pub fn connect(&self, api_key: Option<String>) -> Result<Backend, crate::Error> {
        info!("Connecting to context {}", self.name);

        match &self.backend {
            BackendParams::Rest { url, api_key_env } => {
                let api_key = match api_key {
                    Some(api_key) => api_key,
                    None => std::env::var(api_key_env)?,
                };

                Ok(Backend::Rest(RestClient::new(url, &api_key)?))
            }
            BackendParams::Memory { path } => Ok(Backend::Memory(MemoryClient::load(path)?)),
        }
    }
}

impl ContextName {
    pub fn current() -> Result<ContextName, crate::Error> {
        cache::read(&SharedCacheKey::of::<ContextName>())
    }
}

impl From<String> for ContextName {
    fn from(value: String) -> Self {
        ContextName(value)
    }
}

impl From<&str> for ContextName {
    fn from(value: &str) -> Self {
        ContextName(value.to_string())
    }
}

impl From<ContextName> for String {
    fn from(value: ContextName) -> Self {
        value.0
    }
}

impl Display for ContextName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Display for BackendParams {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendParams::Rest { url, api_key_env } => write!(f, "{url} (key in ${api_key_env})"),
            BackendParams::Memory { path } => write!(f, "{}", path.display()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Client;
    use crate::backend::FilterableQuery;

    #[test]
    fn test_serialized_shape() {
        let context = Context {
            name: "club".into(),
            backend: BackendParams::Rest {
                url: "https://abc.supabase.co".to_string(),
                api_key_env: "SUPABASE_KEY".to_string(),
            },
            cache_ttl_seconds: 300,
        };

        assert_eq!(
            serde_json::json!({
                "name": "club",
                "backend": {
                    "type": "Rest",
                    "url": "https://abc.supabase.co",
                    "api_key_env": "SUPABASE_KEY"
                },
                "cache_ttl_seconds": 300
            }),
            serde_json::to_value(&context).unwrap()
        );
    }

    #[test]
    fn test_connect_memory() {
        let path = std::env::temp_dir().join(format!(
            "fitness-shim-context-{}.json",
            std::process::id()
        ));
        std::fs::write(&path, include_str!("tests/gps_data.json")).unwrap();

        let context = Context {
            name: "offline".into(),
            backend: BackendParams::Memory { path },
            cache_ttl_seconds: 0,
        };
        assert!(!context.needs_api_key());

        let backend = context.connect(None).unwrap();
        let response = backend.table("spelers").select("*").execute().unwrap();

        assert_eq!(4, response.data.len());
    }

    #[test]
    fn test_rest_without_key() {
        let context = Context {
            name: "club".into(),
            backend: BackendParams::Rest {
                url: "https://abc.supabase.co".to_string(),
                api_key_env: "FITNESS_SHIM_TEST_KEY_THAT_IS_NOT_SET".to_string(),
            },
            cache_ttl_seconds: 300,
        };

        assert!(context.needs_api_key());
        assert!(context.connect(None).is_err());
        assert!(context.connect(Some("key".to_string())).is_ok());
    }
}
