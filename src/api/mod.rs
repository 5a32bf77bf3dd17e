//! CI server REST API seam

pub mod client;
pub mod endpoint;
pub mod error;
pub mod fakes;
pub mod rest_client;

use crate::core::models::{
    Agent, Build, BuildCancelRequest, BuildStatus, BuildStep, BuildType, CreateBuildStepRequest,
    CreateBuildTypeRequest, CreateProjectRequest, CreateUserRequest, Project, StartBuildRequest,
    User,
};
use async_trait::async_trait;
pub use client::ApiClientConfig;
pub use endpoint::Endpoint;
pub use error::{ApiError, ApiResult};
pub use rest_client::RestClient;

/// Operations the harness needs from the CI server
///
/// `RestClient` talks to a real server; `fakes::ScriptedServer` answers
/// from memory for tests.
#[async_trait]
pub trait CiServerApi: Send + Sync {
    /// Full locator (URL) for a REST path, used in failure diagnostics
    fn resource_locator(&self, path: &str) -> String {
        path.to_string()
    }

    // Projects
    async fn list_projects(&self) -> ApiResult<Vec<Project>>;
    async fn create_project(&self, request: &CreateProjectRequest) -> ApiResult<Project>;
    async fn delete_project(&self, project_id: &str) -> ApiResult<()>;

    // Users
    async fn list_users(&self) -> ApiResult<Vec<User>>;
    async fn create_user(&self, request: &CreateUserRequest) -> ApiResult<User>;
    async fn delete_user(&self, user_id: u64) -> ApiResult<()>;

    // Builds
    /// Fetch one build; `fields` limits the payload (`None` = full object)
    async fn get_build(&self, build_id: u64, fields: Option<&str>) -> ApiResult<Build>;
    /// Recent builds of a build type, any state, newest first
    async fn list_builds(&self, build_type_id: &str) -> ApiResult<Vec<Build>>;
    /// Builds currently waiting in the queue
    async fn list_queue(&self) -> ApiResult<Vec<Build>>;
    async fn trigger_build(&self, request: &StartBuildRequest) -> ApiResult<Build>;
    async fn cancel_queued_build(&self, build_id: u64, request: &BuildCancelRequest) -> ApiResult<()>;
    async fn cancel_running_build(&self, build_id: u64, request: &BuildCancelRequest) -> ApiResult<()>;
    async fn delete_build(&self, build_id: u64) -> ApiResult<()>;
    async fn get_build_status(&self, build_id: u64) -> ApiResult<BuildStatus>;

    // Build types
    async fn list_build_types(&self) -> ApiResult<Vec<BuildType>>;
    async fn create_build_type(&self, request: &CreateBuildTypeRequest) -> ApiResult<BuildType>;
    async fn get_build_type(&self, build_type_id: &str) -> ApiResult<BuildType>;
    async fn delete_build_type(&self, build_type_id: &str) -> ApiResult<()>;

    // Build steps
    async fn list_build_steps(&self, build_type_id: &str) -> ApiResult<Vec<BuildStep>>;
    async fn create_build_step(
        &self,
        build_type_id: &str,
        request: &CreateBuildStepRequest,
    ) -> ApiResult<BuildStep>;
    async fn get_build_step(&self, build_type_id: &str, step_id: &str) -> ApiResult<BuildStep>;
    async fn update_build_step(
        &self,
        build_type_id: &str,
        step_id: &str,
        request: &CreateBuildStepRequest,
    ) -> ApiResult<BuildStep>;
    async fn delete_build_step(&self, build_type_id: &str, step_id: &str) -> ApiResult<()>;

    // Agents
    /// List agents, optionally filtered by a server-side locator
    async fn list_agents(&self, locator: Option<&str>) -> ApiResult<Vec<Agent>>;
    async fn get_agent(&self, agent_id: u64) -> ApiResult<Agent>;
    /// Set the `enabled` flag; returns the value the server echoed back
    async fn set_agent_enabled(&self, agent_id: u64, enabled: bool) -> ApiResult<bool>;
    /// Set the `authorized` flag; returns the value the server echoed back
    async fn set_agent_authorized(&self, agent_id: u64, authorized: bool) -> ApiResult<bool>;
}
