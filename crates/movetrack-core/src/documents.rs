//! Document store access and the mandatory-document gate.
//!
//! The core never owns documents; it only asks the store which documents a
//! move has and checks their type tags against the catalog requirements of a
//! milestone kind. Matching goes through [`MatchPolicy`], an explicit alias
//! table, never substring heuristics.

use crate::catalog::{Catalog, DocumentRequirement};
use crate::config::{DocumentBackend, DocumentsConfig};
use crate::error::{Result, TrackError};
use crate::paths;
use crate::types::MilestoneKind;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ApprovalStatus::Pending => "pending",
            ApprovalStatus::Approved => "approved",
            ApprovalStatus::Rejected => "rejected",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub document_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default)]
    pub status: ApprovalStatus,
}

impl Document {
    pub fn new(name: impl Into<String>, document_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            document_type: document_type.into(),
            location: None,
            status: ApprovalStatus::Pending,
        }
    }

    pub fn approved(mut self) -> Self {
        self.status = ApprovalStatus::Approved;
        self
    }
}

// ---------------------------------------------------------------------------
// DocumentStore
// ---------------------------------------------------------------------------

/// Read-only view of the external document store.
pub trait DocumentStore: Send + Sync {
    /// All documents currently attached to `move_id`. Failures to reach the
    /// store surface as `CollaboratorUnavailable`, never as an empty list.
    fn list_documents(&self, move_id: Uuid) -> Result<Vec<Document>>;
}

/// YAML registry under `.movetrack/documents/<move-id>.yaml`.
pub struct LocalDocumentStore {
    root: PathBuf,
}

impl LocalDocumentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Register a document for a move. Registering the same name and type
    /// twice replaces the earlier entry.
    pub fn add(&self, move_id: Uuid, doc: Document) -> Result<()> {
        let mut docs = self.list_documents(move_id)?;
        docs.retain(|d| !(d.name == doc.name && d.document_type == doc.document_type));
        docs.push(doc);
        let data = serde_yaml::to_string(&docs)?;
        let path = paths::document_registry(&self.root, &move_id.to_string());
        crate::io::atomic_write(&path, data.as_bytes())
    }
}

impl DocumentStore for LocalDocumentStore {
    fn list_documents(&self, move_id: Uuid) -> Result<Vec<Document>> {
        let path = paths::document_registry(&self.root, &move_id.to_string());
        if !path.exists() {
            return Ok(Vec::new());
        }
        let data = std::fs::read_to_string(&path)?;
        let docs: Vec<Document> = serde_yaml::from_str(&data)?;
        Ok(docs)
    }
}

/// Wire shape returned by `GET {base}/moves/{id}/documents`.
#[derive(Debug, Deserialize)]
struct WireDocument {
    #[serde(default)]
    name: Option<String>,
    #[serde(rename = "type")]
    document_type: String,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    approved: Option<bool>,
    #[serde(default)]
    status: Option<ApprovalStatus>,
}

impl From<WireDocument> for Document {
    fn from(w: WireDocument) -> Self {
        let status = w
            .status
            .or(w.approved.map(|a| {
                if a {
                    ApprovalStatus::Approved
                } else {
                    ApprovalStatus::Pending
                }
            }))
            .unwrap_or_default();
        Document {
            name: w.name.unwrap_or_else(|| w.document_type.clone()),
            document_type: w.document_type,
            location: w.location,
            status,
        }
    }
}

/// HTTP client for a remote document store.
pub struct HttpDocumentStore {
    base_url: String,
    timeout: Duration,
}

impl HttpDocumentStore {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        }
    }

    fn unavailable(reason: impl std::fmt::Display) -> TrackError {
        TrackError::CollaboratorUnavailable {
            collaborator: "document store".to_string(),
            reason: reason.to_string(),
        }
    }
}

impl DocumentStore for HttpDocumentStore {
    fn list_documents(&self, move_id: Uuid) -> Result<Vec<Document>> {
        // The blocking client owns its own runtime; build it on the calling
        // thread so it is never created or dropped inside an async context.
        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(Self::unavailable)?;
        let url = format!("{}/moves/{}/documents", self.base_url, move_id);
        let resp = client.get(&url).send().map_err(Self::unavailable)?;
        if !resp.status().is_success() {
            return Err(Self::unavailable(format!(
                "GET {url} returned {}",
                resp.status()
            )));
        }
        let body = resp.text().map_err(Self::unavailable)?;
        let wire: Vec<WireDocument> =
            serde_json::from_str(&body).map_err(|e| TrackError::CollaboratorResponse {
                collaborator: "document store".to_string(),
                reason: format!("GET {url}: {e}"),
            })?;
        Ok(wire.into_iter().map(Document::from).collect())
    }
}

/// Build the document store selected by `documents.backend`.
pub fn store_from_config(root: &Path, cfg: &DocumentsConfig) -> Arc<dyn DocumentStore> {
    match &cfg.backend {
        DocumentBackend::Local => Arc::new(LocalDocumentStore::new(root)),
        DocumentBackend::Http { url, timeout_ms } => Arc::new(HttpDocumentStore::new(
            url.clone(),
            Duration::from_millis(*timeout_ms),
        )),
    }
}

// ---------------------------------------------------------------------------
// MatchPolicy
// ---------------------------------------------------------------------------

/// Versioned rule deciding whether a document satisfies a requirement.
///
/// A document matches when its normalized type tag equals the normalized
/// requirement type or one of the aliases configured for it. Normalization
/// trims, lowercases and collapses inner whitespace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchPolicy {
    #[serde(default = "default_policy_version")]
    pub version: u32,
    #[serde(default)]
    pub require_approved: bool,
    /// Requirement document type → additional accepted type tags.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub aliases: HashMap<String, Vec<String>>,
}

fn default_policy_version() -> u32 {
    1
}

impl Default for MatchPolicy {
    fn default() -> Self {
        Self {
            version: default_policy_version(),
            require_approved: false,
            aliases: HashMap::new(),
        }
    }
}

static WS_RE: OnceLock<Regex> = OnceLock::new();

fn normalize(s: &str) -> String {
    let re = WS_RE.get_or_init(|| Regex::new(r"\s+").unwrap());
    re.replace_all(s.trim(), " ").to_lowercase()
}

impl MatchPolicy {
    pub fn matches(&self, requirement: &DocumentRequirement, doc: &Document) -> bool {
        if self.require_approved && doc.status != ApprovalStatus::Approved {
            return false;
        }
        let tag = normalize(&doc.document_type);
        if tag == normalize(&requirement.document_type) {
            return true;
        }
        self.aliases
            .iter()
            .filter(|(k, _)| normalize(k) == normalize(&requirement.document_type))
            .flat_map(|(_, v)| v.iter())
            .any(|alias| normalize(alias) == tag)
    }
}

// ---------------------------------------------------------------------------
// DocumentGate
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GateReport {
    /// Mandatory document types with no matching document.
    pub missing: BTreeSet<String>,
    /// Requirement types (mandatory or optional) satisfied by some document.
    pub satisfied: BTreeSet<String>,
}

impl GateReport {
    pub fn is_open(&self) -> bool {
        self.missing.is_empty()
    }
}

pub struct DocumentGate<'a> {
    store: &'a dyn DocumentStore,
    catalog: &'a Catalog,
    policy: &'a MatchPolicy,
}

impl<'a> DocumentGate<'a> {
    pub fn new(store: &'a dyn DocumentStore, catalog: &'a Catalog, policy: &'a MatchPolicy) -> Self {
        Self {
            store,
            catalog,
            policy,
        }
    }

    /// Evaluate `kind`'s requirements against an already-fetched document list.
    pub fn evaluate(&self, kind: MilestoneKind, docs: &[Document]) -> GateReport {
        let mut report = GateReport::default();
        for req in self.catalog.requirements_for(kind) {
            if docs.iter().any(|d| self.policy.matches(req, d)) {
                report.satisfied.insert(req.document_type.clone());
            } else if req.mandatory {
                report.missing.insert(req.document_type.clone());
            }
        }
        report
    }

    /// Fetch the move's documents now and evaluate them. Never cached.
    pub fn check(&self, move_id: Uuid, kind: MilestoneKind) -> Result<GateReport> {
        let docs = self.store.list_documents(move_id)?;
        let report = self.evaluate(kind, &docs);
        tracing::debug!(
            %move_id,
            kind = %kind,
            documents = docs.len(),
            missing = report.missing.len(),
            "document gate evaluated"
        );
        Ok(report)
    }

    pub fn missing_mandatory(&self, move_id: Uuid, kind: MilestoneKind) -> Result<BTreeSet<String>> {
        Ok(self.check(move_id, kind)?.missing)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn gate_for<'a>(
        store: &'a dyn DocumentStore,
        catalog: &'a Catalog,
        policy: &'a MatchPolicy,
    ) -> DocumentGate<'a> {
        DocumentGate::new(store, catalog, policy)
    }

    #[test]
    fn normalize_collapses_whitespace_and_case() {
        assert_eq!(normalize("  Packing   List\tFINAL "), "packing list final");
    }

    #[test]
    fn exact_match_ignores_case_only() {
        let policy = MatchPolicy::default();
        let req = DocumentRequirement::mandatory("Packing list final");
        assert!(policy.matches(&req, &Document::new("pl.pdf", "packing list FINAL")));
        // No substring matching: a draft list is not the final list.
        assert!(!policy.matches(&req, &Document::new("pl.pdf", "Packing list")));
        assert!(!policy.matches(&req, &Document::new("pl.pdf", "Packing list final draft")));
    }

    #[test]
    fn aliases_extend_matches() {
        let mut policy = MatchPolicy::default();
        policy.aliases.insert(
            "Packing list final".to_string(),
            vec!["Final inventory".to_string()],
        );
        let req = DocumentRequirement::mandatory("Packing list final");
        assert!(policy.matches(&req, &Document::new("inv.pdf", "final inventory")));
    }

    #[test]
    fn require_approved_filters_pending() {
        let policy = MatchPolicy {
            require_approved: true,
            ..MatchPolicy::default()
        };
        let req = DocumentRequirement::mandatory("Survey report");
        assert!(!policy.matches(&req, &Document::new("s.pdf", "Survey report")));
        assert!(policy.matches(&req, &Document::new("s.pdf", "Survey report").approved()));
    }

    #[test]
    fn local_store_add_and_list() {
        let dir = TempDir::new().unwrap();
        let store = LocalDocumentStore::new(dir.path());
        let id = Uuid::new_v4();
        assert!(store.list_documents(id).unwrap().is_empty());

        store.add(id, Document::new("pl.pdf", "Packing list final")).unwrap();
        store.add(id, Document::new("pl.pdf", "Packing list final").approved()).unwrap();
        let docs = store.list_documents(id).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].status, ApprovalStatus::Approved);
    }

    #[test]
    fn gate_reports_missing_mandatory_only() {
        let dir = TempDir::new().unwrap();
        let store = LocalDocumentStore::new(dir.path());
        let catalog = Catalog::default();
        let policy = MatchPolicy::default();
        let id = Uuid::new_v4();

        let gate = gate_for(&store, &catalog, &policy);
        let report = gate.check(id, MilestoneKind::Packing).unwrap();
        assert_eq!(
            report.missing,
            BTreeSet::from(["Packing list final".to_string()])
        );
        assert!(!report.missing.contains("Inventory photos"));

        store.add(id, Document::new("photos.zip", "Inventory photos")).unwrap();
        store.add(id, Document::new("pl.pdf", "Packing list final")).unwrap();
        let report = gate.check(id, MilestoneKind::Packing).unwrap();
        assert!(report.is_open());
        assert_eq!(report.satisfied.len(), 2);
    }

    #[test]
    fn kinds_without_requirements_are_always_open() {
        let dir = TempDir::new().unwrap();
        let store = LocalDocumentStore::new(dir.path());
        let catalog = Catalog::default();
        let policy = MatchPolicy::default();
        let gate = gate_for(&store, &catalog, &policy);
        assert!(gate
            .missing_mandatory(Uuid::new_v4(), MilestoneKind::Dispatch)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn http_store_parses_documents() {
        let mut server = mockito::Server::new();
        let id = Uuid::new_v4();
        let mock = server
            .mock("GET", format!("/moves/{id}/documents").as_str())
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"[{"type":"Packing list final","approved":true},{"name":"s.pdf","type":"Survey report"}]"#)
            .create();

        let store = HttpDocumentStore::new(server.url(), Duration::from_secs(2));
        let docs = store.list_documents(id).unwrap();
        mock.assert();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].name, "Packing list final");
        assert_eq!(docs[0].status, ApprovalStatus::Approved);
        assert_eq!(docs[1].status, ApprovalStatus::Pending);
    }

    #[test]
    fn http_store_server_error_is_unavailable() {
        let mut server = mockito::Server::new();
        let id = Uuid::new_v4();
        let _mock = server
            .mock("GET", format!("/moves/{id}/documents").as_str())
            .with_status(502)
            .create();

        let store = HttpDocumentStore::new(server.url(), Duration::from_secs(2));
        let err = store.list_documents(id).unwrap_err();
        assert!(matches!(err, TrackError::CollaboratorUnavailable { .. }));
        assert!(err.is_retryable());
    }

    #[test]
    fn http_store_malformed_payload_is_not_retryable() {
        let mut server = mockito::Server::new();
        let id = Uuid::new_v4();
        let _mock = server
            .mock("GET", format!("/moves/{id}/documents").as_str())
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"documents": "later"}"#)
            .create();

        let store = HttpDocumentStore::new(server.url(), Duration::from_secs(2));
        let err = store.list_documents(id).unwrap_err();
        assert!(matches!(err, TrackError::CollaboratorResponse { .. }), "{err}");
        assert!(!err.is_retryable());
        assert_eq!(err.code(), "collaborator_invalid_response");
    }

    #[test]
    fn backend_config_selects_store() {
        let dir = TempDir::new().unwrap();
        let id = Uuid::new_v4();
        LocalDocumentStore::new(dir.path())
            .add(id, Document::new("s.pdf", "Survey report"))
            .unwrap();

        let local = store_from_config(dir.path(), &DocumentsConfig::default());
        assert_eq!(local.list_documents(id).unwrap().len(), 1);

        let remote = DocumentsConfig {
            backend: DocumentBackend::Http {
                url: "http://127.0.0.1:9".into(),
                timeout_ms: 300,
            },
            ..DocumentsConfig::default()
        };
        assert!(matches!(
            store_from_config(dir.path(), &remote).list_documents(id),
            Err(TrackError::CollaboratorUnavailable { .. })
        ));
    }

    #[test]
    fn http_store_unreachable_is_unavailable() {
        // Port 9 (discard) on localhost is not expected to serve HTTP.
        let store = HttpDocumentStore::new("http://127.0.0.1:9", Duration::from_millis(300));
        assert!(matches!(
            store.list_documents(Uuid::new_v4()),
            Err(TrackError::CollaboratorUnavailable { .. })
        ));
    }
}
