use serde::{Deserialize, Serialize};

/// Used when neither the hosting page nor the build sets an API URL.
pub(crate) const DEFAULT_API_URL: &str = "http://localhost:3001";

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct EnvConfig {
    pub api_url: String,
}

impl EnvConfig {
    /// Resolution order: `window.ENV.API_URL`, `window.ENV.api_url`,
    /// build-time `NOTES_API_URL`, then [`DEFAULT_API_URL`].
    pub fn new() -> Self {
        Self::resolve(runtime_api_url(), option_env!("NOTES_API_URL"))
    }

    pub(crate) fn resolve(runtime: Option<String>, build_time: Option<&str>) -> Self {
        let api_url = runtime
            .filter(|s| !s.trim().is_empty())
            .or_else(|| {
                build_time
                    .filter(|s| !s.trim().is_empty())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        Self {
            api_url: normalize_base_url(&api_url),
        }
    }

    /// Plain http to anything but the local machine. Browsers on an https
    /// page will block these requests as mixed content.
    pub fn is_insecure_remote(&self) -> bool {
        let Some(rest) = self.api_url.strip_prefix("http://") else {
            return false;
        };

        let authority = rest.split('/').next().unwrap_or_default();
        let host = if let Some(v6) = authority.strip_prefix('[') {
            v6.split(']').next().unwrap_or_default()
        } else {
            authority.split(':').next().unwrap_or_default()
        };

        !matches!(host, "localhost" | "127.0.0.1" | "::1" | "0.0.0.0")
    }
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn normalize_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

// We support BOTH `window.ENV.API_URL` and `window.ENV.api_url`.
#[cfg(target_arch = "wasm32")]
fn runtime_api_url() -> Option<String> {
    let window = web_sys::window()?;
    let env = window.get("ENV")?;
    if env.is_undefined() || !env.is_object() {
        return None;
    }

    ["API_URL", "api_url"].into_iter().find_map(|key| {
        js_sys::Reflect::get(&env, &key.into())
            .ok()
            .and_then(|v| v.as_string())
    })
}

#[cfg(not(target_arch = "wasm32"))]
fn runtime_api_url() -> Option<String> {
    None
}
