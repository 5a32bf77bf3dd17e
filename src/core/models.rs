//! Typed request and response records for the CI server REST API
//!
//! Requests are validated when they are built, so an invalid request can
//! only be sent on purpose through the `unchecked` constructors used by
//! negative tests.

use crate::core::state::{BuildLifecycleState, UnknownBuildState};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;
use thiserror::Error;

/// Maximum username length the server's user table accepts
pub const MAX_USERNAME_LEN: usize = 191;

/// Validation failures raised while constructing a request
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    #[error("{field} '{value}' is invalid: {reason}")]
    Invalid {
        field: &'static str,
        value: String,
        reason: &'static str,
    },

    #[error("{field} is {len} characters long, limit is {max}")]
    TooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },
}

fn external_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_]*$").expect("valid id pattern"))
}

fn require_non_empty(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Empty { field });
    }
    Ok(())
}

/// Check a project or build type id the way the server does
pub fn validate_external_id(field: &'static str, value: &str) -> Result<(), ValidationError> {
    require_non_empty(field, value)?;
    if !external_id_pattern().is_match(value) {
        return Err(ValidationError::Invalid {
            field,
            value: value.to_string(),
            reason: "ID should start with a latin letter and contain only latin letters, digits and underscores",
        });
    }
    Ok(())
}

/// Minimal identity used to match an entity in a listing
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityRef {
    /// Opaque identifier (project id, username, build id)
    pub id: String,
    /// Optional disambiguating field, e.g. the project name
    pub secondary: Option<String>,
}

impl EntityRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            secondary: None,
        }
    }

    pub fn with_secondary(mut self, secondary: impl Into<String>) -> Self {
        self.secondary = Some(secondary.into());
        self
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.secondary {
            Some(secondary) => write!(f, "{} ({})", self.id, secondary),
            None => f.write_str(&self.id),
        }
    }
}

// ---------------------------------------------------------------------------
// Projects
// ---------------------------------------------------------------------------

/// Request body for creating a project
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateProjectRequest {
    id: String,
    name: String,
}

impl CreateProjectRequest {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Result<Self, ValidationError> {
        let request = Self::unchecked(id, name);
        validate_external_id("Project ID", &request.id)?;
        require_non_empty("Project name", &request.name)?;
        Ok(request)
    }

    /// Build a request without validation (for negative scenarios)
    pub fn unchecked(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// A project as returned by the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub parent_project_id: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub href: Option<String>,
    #[serde(default)]
    pub web_url: Option<String>,
}

impl Project {
    pub fn entity_ref(&self) -> EntityRef {
        EntityRef::new(&self.id).with_secondary(&self.name)
    }
}

/// `GET /projects` response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectList {
    #[serde(default)]
    pub count: usize,
    #[serde(default)]
    pub project: Vec<Project>,
}

/// Reference to a project inside other payloads
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRef {
    pub id: String,
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

/// Request body for creating a user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateUserRequest {
    username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<String>,
    password: String,
}

impl CreateUserRequest {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Result<Self, ValidationError> {
        let request = Self::unchecked(username, password);
        require_non_empty("Username", &request.username)?;
        let len = request.username.chars().count();
        if len > MAX_USERNAME_LEN {
            return Err(ValidationError::TooLong {
                field: "Username",
                len,
                max: MAX_USERNAME_LEN,
            });
        }
        require_non_empty("Password", &request.password)?;
        Ok(request)
    }

    /// Build a request without validation (for negative scenarios)
    pub fn unchecked(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            name: None,
            email: None,
            password: password.into(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

/// A user as returned by the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub username: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub href: Option<String>,
}

/// `GET /users` response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserList {
    #[serde(default)]
    pub count: usize,
    #[serde(default)]
    pub user: Vec<User>,
}

// ---------------------------------------------------------------------------
// Builds
// ---------------------------------------------------------------------------

/// A build (queued, running or finished)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Build {
    pub id: u64,
    pub build_type_id: String,
    /// Raw lifecycle state as reported by the server
    pub state: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub status_text: Option<String>,
    #[serde(default)]
    pub queued_date: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub finish_date: Option<String>,
}

impl Build {
    /// Parse the raw state into the lifecycle enum
    pub fn lifecycle_state(&self) -> Result<BuildLifecycleState, UnknownBuildState> {
        self.state.parse()
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.lifecycle_state(), Ok(BuildLifecycleState::Finished))
    }
}

/// `GET /builds` and `GET /buildQueue` response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildList {
    #[serde(default)]
    pub count: usize,
    #[serde(default)]
    pub build: Vec<Build>,
}

/// Final status of a build
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildStatus {
    pub status: String,
    #[serde(default)]
    pub status_text: Option<String>,
}

/// Reference to a build configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildTypeRef {
    pub id: String,
}

/// A name/value parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Property {
    pub name: String,
    pub value: String,
}

/// Wrapper the server uses for parameter lists
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Properties {
    #[serde(default)]
    pub property: Vec<Property>,
}

impl Properties {
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            property: pairs
                .into_iter()
                .map(|(name, value)| Property {
                    name: name.into(),
                    value: value.into(),
                })
                .collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.property
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.value.as_str())
    }
}

/// Text comment attached to a build
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub text: String,
}

/// Request body for adding a build to the queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartBuildRequest {
    build_type: BuildTypeRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    properties: Option<Properties>,
    #[serde(skip_serializing_if = "Option::is_none")]
    branch_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    comment: Option<Comment>,
    personal: bool,
}

impl StartBuildRequest {
    pub fn new(build_type_id: impl Into<String>) -> Result<Self, ValidationError> {
        let request = Self::unchecked(build_type_id);
        require_non_empty("Build type ID", &request.build_type.id)?;
        Ok(request)
    }

    /// Build a request without validation (for negative scenarios)
    pub fn unchecked(build_type_id: impl Into<String>) -> Self {
        Self {
            build_type: BuildTypeRef {
                id: build_type_id.into(),
            },
            properties: None,
            branch_name: None,
            comment: None,
            personal: false,
        }
    }

    pub fn with_properties(mut self, properties: Properties) -> Self {
        if !properties.property.is_empty() {
            self.properties = Some(properties);
        }
        self
    }

    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch_name = Some(branch.into());
        self
    }

    pub fn with_comment(mut self, text: impl Into<String>) -> Self {
        self.comment = Some(Comment { text: text.into() });
        self
    }

    pub fn build_type_id(&self) -> &str {
        &self.build_type.id
    }

    pub fn properties(&self) -> Option<&Properties> {
        self.properties.as_ref()
    }
}

/// Request body for cancelling a queued or running build
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildCancelRequest {
    pub comment: String,
    pub readd_into_queue: bool,
}

impl BuildCancelRequest {
    pub fn new(comment: impl Into<String>) -> Self {
        Self {
            comment: comment.into(),
            readd_into_queue: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Build types and steps
// ---------------------------------------------------------------------------

/// Request body for creating a build configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateBuildTypeRequest {
    id: String,
    name: String,
    project: ProjectRef,
}

impl CreateBuildTypeRequest {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        project_id: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let request = Self {
            id: id.into(),
            name: name.into(),
            project: ProjectRef { id: project_id.into() },
        };
        validate_external_id("Build type ID", &request.id)?;
        require_non_empty("Build type name", &request.name)?;
        require_non_empty("Project ID", &request.project.id)?;
        Ok(request)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn project_id(&self) -> &str {
        &self.project.id
    }
}

/// A build configuration as returned by the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildType {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub href: Option<String>,
    #[serde(default)]
    pub web_url: Option<String>,
}

/// `GET /buildTypes` response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildTypeList {
    #[serde(default)]
    pub count: usize,
    #[serde(default)]
    pub build_type: Vec<BuildType>,
}

/// Request body for creating or replacing a build step
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateBuildStepRequest {
    name: String,
    #[serde(rename = "type")]
    step_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    properties: Option<Properties>,
}

impl CreateBuildStepRequest {
    pub fn new(name: impl Into<String>, step_type: impl Into<String>) -> Result<Self, ValidationError> {
        let request = Self::unchecked(name, step_type);
        require_non_empty("Build step type", &request.step_type)?;
        Ok(request)
    }

    /// Build a request without validation (for negative scenarios)
    pub fn unchecked(name: impl Into<String>, step_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            step_type: step_type.into(),
            properties: None,
        }
    }

    /// A command-line step running `script`
    pub fn command_line(name: impl Into<String>, script: impl Into<String>) -> Self {
        let script = script.into();
        Self {
            name: name.into(),
            step_type: "simpleRunner".to_string(),
            properties: Some(Properties::from_pairs([
                ("script.content", script.as_str()),
                ("teamcity.step.mode", "default"),
                ("use.custom.script", "true"),
            ])),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn step_type(&self) -> &str {
        &self.step_type
    }

    pub fn properties(&self) -> Option<&Properties> {
        self.properties.as_ref()
    }
}

/// A build step as returned by the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildStep {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub step_type: String,
    #[serde(default)]
    pub disabled: Option<bool>,
    #[serde(default)]
    pub properties: Option<Properties>,
}

/// `GET /buildTypes/{id}/steps` response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildStepList {
    #[serde(default)]
    pub count: usize,
    #[serde(default)]
    pub step: Vec<BuildStep>,
}

// ---------------------------------------------------------------------------
// Agents
// ---------------------------------------------------------------------------

/// A build agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub connected: bool,
    #[serde(default)]
    pub authorized: bool,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub href: Option<String>,
}

fn default_true() -> bool {
    true
}

/// `GET /agents` response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentList {
    #[serde(default)]
    pub count: usize,
    #[serde(default)]
    pub agent: Vec<Agent>,
}

// ---------------------------------------------------------------------------
// Errors reported by the server
// ---------------------------------------------------------------------------

/// One entry of the server's error payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerErrorEntry {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub additional_message: Option<String>,
}

impl ServerErrorEntry {
    /// Check whether either message contains `phrase`
    pub fn mentions(&self, phrase: &str) -> bool {
        self.message.as_deref().unwrap_or_default().contains(phrase)
            || self
                .additional_message
                .as_deref()
                .unwrap_or_default()
                .contains(phrase)
    }
}

/// Error payload the server sends with 4xx/5xx responses
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerErrorBody {
    #[serde(default)]
    pub errors: Vec<ServerErrorEntry>,
}
