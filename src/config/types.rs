//! Raw config types matching the JSON config file.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Policy entry value: a single verb or a list of verbs.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum VerbSpec {
    Single(String),
    Many(Vec<String>),
}

impl VerbSpec {
    pub fn names(&self) -> Vec<&str> {
        match self {
            VerbSpec::Single(s) => vec![s.as_str()],
            VerbSpec::Many(v) => v.iter().map(String::as_str).collect(),
        }
    }
}

/// role → table → verbs
pub type PolicyConfig = BTreeMap<String, BTreeMap<String, VerbSpec>>;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_acquire_timeout_ms")]
    pub acquire_timeout_ms: u64,
    #[serde(default = "default_schema")]
    pub schema: String,
    /// Statements run on every new pooled connection, e.g. `SET statement_timeout = '5s'`.
    #[serde(default)]
    pub session_settings: Vec<String>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        DatabaseConfig {
            url: String::new(),
            max_connections: default_max_connections(),
            acquire_timeout_ms: default_acquire_timeout_ms(),
            schema: default_schema(),
            session_settings: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VersioningConfig {
    #[serde(default = "default_version_column")]
    pub version_column: String,
    /// Creation timestamp column; never carried forward into a new version.
    #[serde(default = "default_created_column")]
    pub created_column: String,
}

impl Default for VersioningConfig {
    fn default() -> Self {
        VersioningConfig {
            version_column: default_version_column(),
            created_column: default_created_column(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PasswordHashingConfig {
    #[serde(default)]
    pub tables: Vec<String>,
    #[serde(default = "default_password_column")]
    pub column: String,
}

impl Default for PasswordHashingConfig {
    fn default() -> Self {
        PasswordHashingConfig {
            tables: Vec::new(),
            column: default_password_column(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ModerationConfig {
    #[serde(default = "default_users_table")]
    pub users_table: String,
    #[serde(default = "default_warnings_column")]
    pub warnings_column: String,
    #[serde(default = "default_warning_threshold")]
    pub threshold: i64,
    #[serde(default = "default_role_column")]
    pub role_column: String,
    #[serde(default = "default_banned_role")]
    pub banned_role: String,
    /// Column in each content table referencing the user who wrote the row.
    #[serde(default = "default_changer_column")]
    pub changer_column: String,
    #[serde(default)]
    pub content_tables: Vec<String>,
}

impl Default for ModerationConfig {
    fn default() -> Self {
        ModerationConfig {
            users_table: default_users_table(),
            warnings_column: default_warnings_column(),
            threshold: default_warning_threshold(),
            role_column: default_role_column(),
            banned_role: default_banned_role(),
            changer_column: default_changer_column(),
            content_tables: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchTargetConfig {
    pub table: String,
    pub columns: Vec<String>,
    #[serde(default)]
    pub versioned: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_base_url_for_vid_tables")]
    pub base_url_for_vid_tables: String,
    /// table → id column, for tables whose key is not `id`.
    #[serde(default)]
    pub id_map: HashMap<String, String>,
    /// Return raw database error text to callers.
    #[serde(default)]
    pub runtime_errors: bool,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default)]
    pub versioning: VersioningConfig,
    #[serde(default)]
    pub password_hashing: PasswordHashingConfig,
    #[serde(default)]
    pub moderation: Option<ModerationConfig>,
    #[serde(default)]
    pub search: Vec<SearchTargetConfig>,
    #[serde(default)]
    pub policy: PolicyConfig,
    /// Separate JSON file holding the policy, relative to the config file. Merged over `policy`.
    #[serde(default)]
    pub policy_file: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        GatewayConfig {
            database: DatabaseConfig::default(),
            base_url: default_base_url(),
            base_url_for_vid_tables: default_base_url_for_vid_tables(),
            id_map: HashMap::new(),
            runtime_errors: false,
            request_timeout_ms: default_request_timeout_ms(),
            versioning: VersioningConfig::default(),
            password_hashing: PasswordHashingConfig::default(),
            moderation: None,
            search: Vec::new(),
            policy: PolicyConfig::new(),
            policy_file: None,
        }
    }
}

fn default_max_connections() -> u32 {
    5
}

fn default_acquire_timeout_ms() -> u64 {
    5_000
}

fn default_schema() -> String {
    "public".into()
}

fn default_base_url() -> String {
    "/rest".into()
}

fn default_base_url_for_vid_tables() -> String {
    "/vid".into()
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_version_column() -> String {
    "versionId".into()
}

fn default_created_column() -> String {
    "timeCreated".into()
}

fn default_password_column() -> String {
    "password".into()
}

fn default_users_table() -> String {
    "users".into()
}

fn default_warnings_column() -> String {
    "warnings".into()
}

fn default_warning_threshold() -> i64 {
    3
}

fn default_role_column() -> String {
    "role".into()
}

fn default_banned_role() -> String {
    "banned".into()
}

fn default_changer_column() -> String {
    "changerId".into()
}
