use std::env;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct InferenceConfig {
    pub model: String,
    pub workers: usize,
    /// `None` waits for the engine indefinitely.
    pub timeout: Option<Duration>,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub bind_addr: String,
    pub ollama_base_url: String,
    pub cors_allowed_origins: Vec<String>,
    pub max_upload_bytes: usize,
    pub inference: InferenceConfig,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let timeout_secs: u64 = env_parse("INFERENCE_TIMEOUT_SECS").unwrap_or(300);

        Self {
            bind_addr: env::var("DOCCHAT_BIND").unwrap_or_else(|_| "127.0.0.1:8000".to_string()),
            ollama_base_url: env::var("OLLAMA_BASE_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:11434".to_string()),
            cors_allowed_origins: split_origins(
                &env::var("DOCCHAT_CORS_ORIGINS")
                    .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            ),
            max_upload_bytes: env_parse("MAX_UPLOAD_BYTES").unwrap_or(50 * 1024 * 1024),
            inference: InferenceConfig {
                model: env::var("CHAT_MODEL").unwrap_or_else(|_| "llama2".to_string()),
                workers: env_parse("INFERENCE_WORKERS")
                    .filter(|n: &usize| *n > 0)
                    .unwrap_or_else(default_workers),
                timeout: (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs)),
            },
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8000".to_string(),
            ollama_base_url: "http://127.0.0.1:11434".to_string(),
            cors_allowed_origins: vec!["http://localhost:3000".to_string()],
            max_upload_bytes: 50 * 1024 * 1024,
            inference: InferenceConfig {
                model: "llama2".to_string(),
                workers: default_workers(),
                timeout: Some(Duration::from_secs(300)),
            },
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

// Same sizing rule as a default thread-pool executor: cpus + 4, capped at 32.
fn default_workers() -> usize {
    let cpus = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    (cpus + 4).min(32)
}

fn split_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origins_are_trimmed_and_empty_entries_dropped() {
        let origins = split_origins(" http://localhost:3000, ,http://127.0.0.1:5173 ");
        assert_eq!(
            origins,
            vec!["http://localhost:3000", "http://127.0.0.1:5173"]
        );
    }

    #[test]
    fn default_worker_pool_is_bounded() {
        let workers = default_workers();
        assert!(workers >= 5);
        assert!(workers <= 32);
    }
}
