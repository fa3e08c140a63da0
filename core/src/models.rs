//! Wire types for the dashboard backend.

use std::collections::BTreeMap;

use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::resource::Identified;

/// `{ "data": ... }` response envelope. Sibling fields (`success`, ...) are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct DataEnvelope<T> {
    pub data: T,
}

/// A list endpoint that may answer with a bare array or a `{data, total}`
/// envelope. These lists are never paged, so `total` is ignored.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ListPayload<T> {
    Bare(Vec<T>),
    Wrapped { data: Vec<T> },
}

/// A body that may or may not be wrapped in `{ "data": ... }`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum MaybeEnveloped<T> {
    Wrapped { data: T },
    Bare(T),
}

impl<T> MaybeEnveloped<T> {
    pub fn into_inner(self) -> T {
        match self {
            MaybeEnveloped::Wrapped { data } | MaybeEnveloped::Bare(data) => data,
        }
    }
}

impl<T> ListPayload<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            ListPayload::Bare(items) => items,
            ListPayload::Wrapped { data } => data,
        }
    }
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

#[derive(Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Clone, Serialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
}

impl std::fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("name", &self.name)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
}

#[derive(Clone, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

impl std::fmt::Debug for AuthResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthResponse")
            .field("token", &"<redacted>")
            .field("user", &self.user)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Projects
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Identified for Project {
    type Id = String;

    fn id(&self) -> &String {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewProject {
    pub name: String,
    pub description: String,
}

/// Partial update; absent fields are left untouched server-side.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProjectUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

// ---------------------------------------------------------------------------
// Static analysis
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub file: String,
    pub line: u32,
    pub column: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vulnerability {
    pub severity: Severity,
    pub title: String,
    pub description: String,
    pub location: Location,
    pub recommendation: String,
}

/// Warning or suggestion attached to a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub location: Option<Location>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisReport {
    #[serde(default)]
    pub vulnerabilities: Vec<Vulnerability>,
    #[serde(default)]
    pub warnings: Vec<Finding>,
    #[serde(default)]
    pub suggestions: Vec<Finding>,
}

impl AnalysisReport {
    /// Vulnerabilities at `severity`.
    pub fn count_by_severity(&self, severity: Severity) -> usize {
        self.vulnerabilities
            .iter()
            .filter(|v| v.severity == severity)
            .count()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub id: String,
    pub project_id: String,
    pub file_path: String,
    pub report: AnalysisReport,
    pub created_at: DateTime<Utc>,
}

impl Identified for AnalysisResult {
    type Id = String;

    fn id(&self) -> &String {
        &self.id
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunAnalysisRequest {
    pub project_id: String,
    pub file_path: String,
}

// ---------------------------------------------------------------------------
// AI operations (camelCase payloads)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeSuggestion {
    pub explanation: String,
    pub confidence: f64,
    pub impact: String,
    pub original_code: String,
    pub suggested_code: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskAssessment {
    pub overall_risk: f64,
    #[serde(default)]
    pub risk_factors: BTreeMap<String, f64>,
    #[serde(default)]
    pub mitigation_suggestions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityPattern {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub examples: Vec<String>,
    #[serde(default)]
    pub implementation_guide: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiAnalysis {
    #[serde(default)]
    pub suggestions: Vec<CodeSuggestion>,
    #[serde(default)]
    pub risk_assessment: RiskAssessment,
    #[serde(default)]
    pub best_practices: Vec<String>,
    #[serde(default)]
    pub security_patterns: Vec<SecurityPattern>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedCode {
    pub code: String,
    pub explanation: String,
    #[serde(default)]
    pub security_features: Vec<String>,
    #[serde(default)]
    pub best_practices: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VulnerabilityAnalysis {
    pub vulnerability_id: String,
    pub severity: String,
    pub description: String,
    pub suggested_fix: String,
    pub confidence: f64,
    #[serde(default)]
    pub affected_code: String,
    #[serde(default)]
    pub fixed_code: String,
}

/// Model configuration map, passed through untouched.
pub type ModelConfigs = serde_json::Map<String, Value>;

#[derive(Debug, Clone, Serialize)]
pub struct CodeRequest {
    pub code: String,
    pub project_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerateRequest {
    pub requirements: String,
    pub project_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct VulnerabilityRequest {
    pub vulnerability_id: String,
    pub project_id: String,
}

// ---------------------------------------------------------------------------
// Roles and permissions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl Identified for Role {
    type Id = i64;

    fn id(&self) -> &i64 {
        &self.id
    }
}

/// Permission as returned by `/roles/:id/permissions`: either the bare token
/// or a permission record whose `name` is the token.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum PermissionRecord {
    Name(String),
    Record { name: String },
}

impl PermissionRecord {
    pub fn into_name(self) -> String {
        match self {
            PermissionRecord::Name(name) | PermissionRecord::Record { name } => name,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AssignRoleRequest {
    pub role_id: i64,
}

// ---------------------------------------------------------------------------
// Audit logs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLog {
    pub id: i64,
    #[serde(default)]
    pub user_id: Option<i64>,
    pub action: String,
    pub entity_type: String,
    #[serde(default)]
    pub entity_id: Option<i64>,
    #[serde(default)]
    pub details: Option<Value>,
    #[serde(default)]
    pub ip_address: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditLogPage {
    pub logs: Vec<AuditLog>,
    pub total: u64,
}

/// Filter and pagination for `/audit-logs`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditLogQuery {
    pub page: u32,
    pub limit: u32,
    pub entity_type: Option<String>,
    pub entity_id: Option<i64>,
    pub user_id: Option<i64>,
}

impl Default for AuditLogQuery {
    fn default() -> Self {
        Self {
            page: 1,
            limit: 10,
            entity_type: None,
            entity_id: None,
            user_id: None,
        }
    }
}

impl AuditLogQuery {
    /// Query pairs; unset filters are `None` and dropped by the gateway.
    ///
    /// The entity filter only applies when both its type and id are set.
    pub fn to_pairs(&self) -> Vec<(&'static str, Option<String>)> {
        let (entity_type, entity_id) = match (&self.entity_type, self.entity_id) {
            (Some(kind), Some(id)) => (Some(kind.clone()), Some(id.to_string())),
            _ => (None, None),
        };
        vec![
            ("page", Some(self.page.to_string())),
            ("limit", Some(self.limit.to_string())),
            ("entity_type", entity_type),
            ("entity_id", entity_id),
            ("user_id", self.user_id.map(|id| id.to_string())),
        ]
    }
}
