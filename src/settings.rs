use miette::{IntoDiagnostic, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    pub server: Server,
    pub policy: Policy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Server {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Policy {
    /// Policy file (.json or .kdl) or a directory of them. Default: policies
    pub path: PathBuf,
    /// Reject duplicate resources and rules that can never match instead of warning.
    #[serde(default)]
    pub strict: bool,
    /// Expose POST /v1/reload
    #[serde(default = "default_allow_reload")]
    pub allow_reload: bool,
}

fn default_allow_reload() -> bool {
    true
}

impl Default for Server {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            path: PathBuf::from("policies"),
            strict: false,
            allow_reload: default_allow_reload(),
        }
    }
}

impl Settings {
    pub fn load(path: &str) -> Result<Self> {
        let mut builder = config::Config::builder()
            .set_default("server.host", Server::default().host)
            .into_diagnostic()?
            .set_default("server.port", Server::default().port)
            .into_diagnostic()?
            .set_default(
                "policy.path",
                Policy::default().path.to_string_lossy().to_string(),
            )
            .into_diagnostic()?
            .set_default("policy.strict", Policy::default().strict)
            .into_diagnostic()?
            .set_default("policy.allow_reload", Policy::default().allow_reload)
            .into_diagnostic()?;

        // Optional file
        if Path::new(path).exists() {
            builder = builder.add_source(config::File::with_name(path));
        }

        // Environment overrides: POLICY_GATE__SERVER__PORT=9090, etc.
        builder = builder.add_source(
            config::Environment::with_prefix("POLICY_GATE")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let cfg = builder.build().into_diagnostic()?;
        let mut s: Settings = cfg.try_deserialize().into_diagnostic()?;

        if s.policy.path.is_relative() {
            s.policy.path = std::env::current_dir()
                .into_diagnostic()?
                .join(&s.policy.path);
        }

        Ok(s)
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
