use crate::catalog::DocumentRequirement;
use crate::documents::MatchPolicy;
use crate::error::{Result, TrackError};
use crate::paths;
use crate::types::MilestoneKind;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// SlaConfig / AlertConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlaConfig {
    /// Days of slack (late completion, or lead time before the plan date)
    /// classified as `warning` rather than `on_time`/`delayed`.
    #[serde(default = "default_warning_window")]
    pub warning_window_days: i64,
}

fn default_warning_window() -> i64 {
    2
}

impl Default for SlaConfig {
    fn default() -> Self {
        Self {
            warning_window_days: default_warning_window(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertConfig {
    /// Overdue by more than this many days escalates a breach to `critical`.
    #[serde(default = "default_critical_after")]
    pub critical_after_days: i64,
}

fn default_critical_after() -> i64 {
    3
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            critical_after_days: default_critical_after(),
        }
    }
}

// ---------------------------------------------------------------------------
// CatalogConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sla_days: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requirements: Option<Vec<DocumentRequirement>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Milestone kind name → override.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub overrides: HashMap<String, CatalogOverride>,
}

// ---------------------------------------------------------------------------
// DocumentsConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DocumentBackend {
    /// YAML registry under `.movetrack/documents/`.
    Local,
    Http {
        url: String,
        #[serde(default = "default_timeout_ms")]
        timeout_ms: u64,
    },
}

fn default_timeout_ms() -> u64 {
    5_000
}

fn default_document_backend() -> DocumentBackend {
    DocumentBackend::Local
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentsConfig {
    #[serde(default = "default_document_backend")]
    pub backend: DocumentBackend,
    #[serde(default)]
    pub match_policy: MatchPolicy,
}

impl Default for DocumentsConfig {
    fn default() -> Self {
        Self {
            backend: default_document_backend(),
            match_policy: MatchPolicy::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// NotificationConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotificationConfig {
    /// Write notifications to the log only.
    #[default]
    Log,
    Webhook {
        url: String,
        #[serde(default = "default_timeout_ms")]
        timeout_ms: u64,
    },
}

// ---------------------------------------------------------------------------
// ServerConfig / ProjectConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_port() -> u16 {
    3151
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    pub project: ProjectConfig,
    #[serde(default)]
    pub sla: SlaConfig,
    #[serde(default)]
    pub alerts: AlertConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub documents: DocumentsConfig,
    #[serde(default)]
    pub notifications: NotificationConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

fn default_version() -> u32 {
    1
}

impl Config {
    pub fn new(project_name: impl Into<String>) -> Self {
        Self {
            version: 1,
            project: ProjectConfig {
                name: project_name.into(),
                description: None,
            },
            sla: SlaConfig::default(),
            alerts: AlertConfig::default(),
            catalog: CatalogConfig::default(),
            documents: DocumentsConfig::default(),
            notifications: NotificationConfig::default(),
            server: ServerConfig::default(),
        }
    }

    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Err(TrackError::NotInitialized);
        }
        let data = std::fs::read_to_string(&path)?;
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.sla.warning_window_days < 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: format!(
                    "sla.warning_window_days must not be negative (got {})",
                    self.sla.warning_window_days
                ),
            });
        }

        if self.alerts.critical_after_days < 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: format!(
                    "alerts.critical_after_days must not be negative (got {})",
                    self.alerts.critical_after_days
                ),
            });
        }

        for (key, ov) in &self.catalog.overrides {
            if MilestoneKind::from_str(key).is_err() {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!("unknown milestone kind '{key}' in catalog.overrides"),
                });
            }
            if ov.sla_days == Some(0) {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: format!("catalog override for '{key}' sets sla_days to 0"),
                });
            }
            for req in ov.requirements.iter().flatten() {
                if req.document_type.trim().is_empty() {
                    warnings.push(ConfigWarning {
                        level: WarnLevel::Error,
                        message: format!(
                            "catalog override for '{key}' has an empty document_type"
                        ),
                    });
                }
            }
        }

        if let DocumentBackend::Http { url, timeout_ms } = &self.documents.backend {
            if url.trim().is_empty() {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: "documents.backend.url is empty".to_string(),
                });
            }
            if *timeout_ms == 0 {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: "documents.backend.timeout_ms is 0; requests will fail immediately"
                        .to_string(),
                });
            }
        }

        if let NotificationConfig::Webhook { url, .. } = &self.notifications {
            if url.trim().is_empty() {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: "notifications.url is empty".to_string(),
                });
            }
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
