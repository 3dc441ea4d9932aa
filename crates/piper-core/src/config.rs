use crate::error::{PiperError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Upper bound on `engine.timeout_secs` (one day).
pub const MAX_TIMEOUT_SECS: u64 = 86_400;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PiperConfig {
    pub server: ServerConfig,
    pub engine: EngineConfig,
    pub storage: StorageConfig,
    pub upload: UploadConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// How to launch the external compressor.
///
/// The command line is `program args... --input <in> --output <out>
/// --mode compress --algorithm huffman`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    /// Where staged input/output files live while the engine runs.
    pub staging_dir: PathBuf,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub artifact_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub allowed_extensions: Vec<String>,
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 5001,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            program: "cargo".into(),
            args: vec!["run".into(), "--quiet".into(), "--".into()],
            working_dir: None,
            staging_dir: PathBuf::from("uploads"),
            timeout_secs: 30,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            artifact_dir: PathBuf::from("compressed"),
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            allowed_extensions: [
                "txt", "csv", "json", "xml", "html", "css", "js", "py", "rs", "md", "log",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            max_body_bytes: 16 * 1024 * 1024,
        }
    }
}

impl EngineConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl UploadConfig {
    /// Whether `filename` has an extension on the allow-list (case-insensitive).
    pub fn is_allowed(&self, filename: &str) -> bool {
        match filename.rsplit_once('.') {
            Some((_, ext)) => {
                let ext = ext.to_lowercase();
                self.allowed_extensions.iter().any(|a| a.eq_ignore_ascii_case(&ext))
            }
            None => false,
        }
    }
}

impl PiperConfig {
    /// Load a JSON config file. Missing sections fall back to defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| PiperError::Config(format!("read {}: {e}", path.display())))?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Apply `PIPER_*` overrides from the process environment.
    pub fn apply_env(self) -> Result<Self> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    pub fn apply_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(host) = lookup("PIPER_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("PIPER_PORT") {
            self.server.port = parse_var("PIPER_PORT", &port)?;
        }
        if let Some(program) = lookup("PIPER_ENGINE_PROGRAM") {
            self.engine.program = program;
        }
        if let Some(args) = lookup("PIPER_ENGINE_ARGS") {
            self.engine.args = args.split_whitespace().map(String::from).collect();
        }
        if let Some(dir) = lookup("PIPER_ENGINE_WORKDIR") {
            self.engine.working_dir = Some(PathBuf::from(dir));
        }
        if let Some(secs) = lookup("PIPER_ENGINE_TIMEOUT_SECS") {
            self.engine.timeout_secs = parse_var("PIPER_ENGINE_TIMEOUT_SECS", &secs)?;
        }
        if let Some(dir) = lookup("PIPER_STAGING_DIR") {
            self.engine.staging_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("PIPER_ARTIFACT_DIR") {
            self.storage.artifact_dir = PathBuf::from(dir);
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.engine.program.trim().is_empty() {
            return Err(PiperError::Config("engine.program must not be empty".into()));
        }
        if self.engine.timeout_secs == 0 {
            return Err(PiperError::Config("engine.timeout_secs must be positive".into()));
        }
        if self.engine.timeout_secs > MAX_TIMEOUT_SECS {
            return Err(PiperError::Config(format!(
                "engine.timeout_secs must be at most {MAX_TIMEOUT_SECS}"
            )));
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| PiperError::Config(format!("{key}={value:?}: {e}")))
}
