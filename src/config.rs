use dotenv::dotenv;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::LazyLock;

/// Runtime configuration, read once from the environment with a `CORVUS_`
/// prefix (e.g. `CORVUS_STORAGE_ROOT=/var/corvus`). A `.env` file next to
/// the binary is honored. Every field has a default so the service starts
/// with no configuration at all.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AppConfig {
    /// Base directory every job's subtree is created under.
    pub storage_root: PathBuf,
    /// Port the intake endpoint listens on.
    pub port: u16,
    /// Upload size ceiling in bytes.
    pub max_upload_bytes: u64,
    /// Frame conversions allowed to run at once within a single job.
    pub max_concurrent_conversions: usize,
    /// Pipelines allowed in flight across all jobs; admission rejects with
    /// 503 once saturated.
    pub max_concurrent_jobs: usize,
    /// Callback delivery attempts before giving up on a job's outcome.
    pub max_callback_attempts: u32,
    /// Base delay in seconds between callback attempts; the wait after
    /// attempt n is n times this value.
    pub callback_base_delay_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            storage_root: PathBuf::from("./storage"),
            port: 8888,
            max_upload_bytes: 1024 * 1024 * 1024,
            max_concurrent_conversions: 5,
            max_concurrent_jobs: 64,
            max_callback_attempts: 10,
            callback_base_delay_secs: 10,
        }
    }
}

pub static APP_CONFIG: LazyLock<AppConfig> = LazyLock::new(|| {
    dotenv().ok();
    envy::prefixed("CORVUS_")
        .from_env()
        .expect("Failed to read configuration from environment")
});
