//! HTTP client for the CI server REST API

use crate::api::endpoint::{self, Endpoint, BUILD_REQUIRED_FIELDS};
use crate::api::{ApiClientConfig, ApiError, ApiResult, CiServerApi};
use crate::core::models::{
    Agent, AgentList, Build, BuildCancelRequest, BuildList, BuildStatus, BuildStep, BuildStepList,
    BuildType, BuildTypeList, CreateBuildStepRequest, CreateBuildTypeRequest, CreateProjectRequest,
    CreateUserRequest, Project, ProjectList, ServerErrorBody, StartBuildRequest, User, UserList,
};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

const OK: &[u16] = &[200];
const CREATED: &[u16] = &[200, 201];
const DELETED: &[u16] = &[200, 204];

/// REST client backed by `reqwest`
#[derive(Debug, Clone)]
pub struct RestClient {
    config: ApiClientConfig,
    http: reqwest::Client,
}

impl RestClient {
    /// Create a new client
    ///
    /// # Errors
    /// Returns `ApiError::Internal` if the underlying HTTP client cannot be built
    pub fn new(config: ApiClientConfig) -> ApiResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("harness/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ApiError::Internal(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { config, http })
    }

    /// REST base URL this client talks to
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.request_accepting(method, url, "application/json")
    }

    /// Authenticated request with a single `Accept` value
    fn request_accepting(&self, method: Method, url: &str, accept: &str) -> RequestBuilder {
        let builder = self.http.request(method, url).header(ACCEPT, accept);
        match &self.config.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    fn transport_error(&self, url: &str, err: reqwest::Error) -> ApiError {
        if err.is_timeout() {
            ApiError::Timeout(self.config.timeout_secs)
        } else {
            ApiError::Transport {
                url: url.to_string(),
                message: err.to_string(),
            }
        }
    }

    /// Send a request and check the status against `expected`
    async fn execute(
        &self,
        method: &Method,
        url: &str,
        builder: RequestBuilder,
        expected: &[u16],
    ) -> ApiResult<Response> {
        debug!("{} {}", method, url);
        let response = builder
            .send()
            .await
            .map_err(|e| self.transport_error(url, e))?;

        let status = response.status().as_u16();
        if expected.contains(&status) {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let errors = serde_json::from_str::<ServerErrorBody>(&body)
            .map(|b| b.errors)
            .unwrap_or_default();
        warn!("{} {} returned HTTP {}", method, url, status);
        Err(ApiError::Status {
            method: method.to_string(),
            url: url.to_string(),
            status,
            body,
            errors,
        })
    }

    async fn decode<T: DeserializeOwned>(url: &str, response: Response) -> ApiResult<T> {
        let text = response.text().await.map_err(|e| ApiError::Decode {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        serde_json::from_str(&text).map_err(|e| ApiError::Decode {
            url: url.to_string(),
            message: e.to_string(),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> ApiResult<T> {
        let url = self.url(path);
        let builder = self.request(Method::GET, &url).query(query);
        let response = self.execute(&Method::GET, &url, builder, OK).await?;
        Self::decode(&url, response).await
    }

    async fn send_json<B, T>(&self, method: Method, path: &str, body: &B, expected: &[u16]) -> ApiResult<T>
    where
        B: serde::Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let url = self.url(path);
        let builder = self.request(method.clone(), &url).json(body);
        let response = self.execute(&method, &url, builder, expected).await?;
        Self::decode(&url, response).await
    }

    async fn send_ignoring_body<B>(&self, method: Method, path: &str, body: Option<&B>, expected: &[u16]) -> ApiResult<()>
    where
        B: serde::Serialize + ?Sized + Sync,
    {
        let url = self.url(path);
        let mut builder = self.request(method.clone(), &url);
        if let Some(body) = body {
            builder = builder.json(body);
        }
        self.execute(&method, &url, builder, expected).await?;
        Ok(())
    }

    async fn delete(&self, path: &str) -> ApiResult<()> {
        self.send_ignoring_body::<()>(Method::DELETE, path, None, DELETED).await
    }

    /// PUT a plain-text boolean and read the echoed value back
    async fn put_flag(&self, path: &str, value: bool) -> ApiResult<bool> {
        let url = self.url(path);
        let builder = self
            .request_accepting(Method::PUT, &url, "text/plain")
            .header(CONTENT_TYPE, "text/plain")
            .body(value.to_string());
        let response = self.execute(&Method::PUT, &url, builder, OK).await?;
        let text = response.text().await.map_err(|e| ApiError::Decode {
            url: url.clone(),
            message: e.to_string(),
        })?;
        match text.trim().to_ascii_lowercase().as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            other => Err(ApiError::Decode {
                url,
                message: format!("expected 'true' or 'false', got '{}'", other),
            }),
        }
    }
}

#[async_trait]
impl CiServerApi for RestClient {
    fn resource_locator(&self, path: &str) -> String {
        self.url(path)
    }

    async fn list_projects(&self) -> ApiResult<Vec<Project>> {
        let list: ProjectList = self.get_json(Endpoint::Projects.path(), &[]).await?;
        Ok(list.project)
    }

    async fn create_project(&self, request: &CreateProjectRequest) -> ApiResult<Project> {
        self.send_json(Method::POST, Endpoint::Projects.path(), request, CREATED)
            .await
    }

    async fn delete_project(&self, project_id: &str) -> ApiResult<()> {
        self.delete(&Endpoint::Projects.by_id(project_id)).await
    }

    async fn list_users(&self) -> ApiResult<Vec<User>> {
        let list: UserList = self.get_json(Endpoint::Users.path(), &[]).await?;
        Ok(list.user)
    }

    async fn create_user(&self, request: &CreateUserRequest) -> ApiResult<User> {
        self.send_json(Method::POST, Endpoint::Users.path(), request, CREATED)
            .await
    }

    async fn delete_user(&self, user_id: u64) -> ApiResult<()> {
        self.delete(&Endpoint::Users.by_id(user_id)).await
    }

    async fn get_build(&self, build_id: u64, fields: Option<&str>) -> ApiResult<Build> {
        let path = Endpoint::Builds.by_id(build_id);
        match endpoint::merge_required_fields(fields, &BUILD_REQUIRED_FIELDS) {
            Some(fields) => self.get_json(&path, &[("fields", fields.as_str())]).await,
            None => self.get_json(&path, &[]).await,
        }
    }

    async fn list_builds(&self, build_type_id: &str) -> ApiResult<Vec<Build>> {
        let locator = endpoint::builds_of_type_locator(build_type_id);
        let list: BuildList = self
            .get_json(Endpoint::Builds.path(), &[("locator", locator.as_str())])
            .await?;
        Ok(list.build)
    }

    async fn list_queue(&self) -> ApiResult<Vec<Build>> {
        let list: BuildList = self.get_json(Endpoint::BuildQueue.path(), &[]).await?;
        Ok(list.build)
    }

    async fn trigger_build(&self, request: &StartBuildRequest) -> ApiResult<Build> {
        self.send_json(Method::POST, Endpoint::BuildQueue.path(), request, CREATED)
            .await
    }

    async fn cancel_queued_build(&self, build_id: u64, request: &BuildCancelRequest) -> ApiResult<()> {
        self.send_ignoring_body(Method::POST, &Endpoint::BuildQueue.by_id(build_id), Some(request), OK)
            .await
    }

    async fn cancel_running_build(&self, build_id: u64, request: &BuildCancelRequest) -> ApiResult<()> {
        self.send_ignoring_body(Method::POST, &Endpoint::Builds.by_id(build_id), Some(request), OK)
            .await
    }

    async fn delete_build(&self, build_id: u64) -> ApiResult<()> {
        self.delete(&Endpoint::Builds.by_id(build_id)).await
    }

    async fn get_build_status(&self, build_id: u64) -> ApiResult<BuildStatus> {
        self.get_json(&Endpoint::Builds.by_id(build_id), &[("fields", "status,statusText")])
            .await
    }

    async fn list_build_types(&self) -> ApiResult<Vec<BuildType>> {
        let list: BuildTypeList = self.get_json(Endpoint::BuildTypes.path(), &[]).await?;
        Ok(list.build_type)
    }

    async fn create_build_type(&self, request: &CreateBuildTypeRequest) -> ApiResult<BuildType> {
        self.send_json(Method::POST, Endpoint::BuildTypes.path(), request, CREATED)
            .await
    }

    async fn get_build_type(&self, build_type_id: &str) -> ApiResult<BuildType> {
        self.get_json(&Endpoint::BuildTypes.by_id(build_type_id), &[]).await
    }

    async fn delete_build_type(&self, build_type_id: &str) -> ApiResult<()> {
        self.delete(&Endpoint::BuildTypes.by_id(build_type_id)).await
    }

    async fn list_build_steps(&self, build_type_id: &str) -> ApiResult<Vec<BuildStep>> {
        let list: BuildStepList = self
            .get_json(&endpoint::build_steps_path(build_type_id), &[])
            .await?;
        Ok(list.step)
    }

    async fn create_build_step(
        &self,
        build_type_id: &str,
        request: &CreateBuildStepRequest,
    ) -> ApiResult<BuildStep> {
        self.send_json(
            Method::POST,
            &endpoint::build_steps_path(build_type_id),
            request,
            CREATED,
        )
        .await
    }

    async fn get_build_step(&self, build_type_id: &str, step_id: &str) -> ApiResult<BuildStep> {
        self.get_json(&endpoint::build_step_path(build_type_id, step_id), &[])
            .await
    }

    async fn update_build_step(
        &self,
        build_type_id: &str,
        step_id: &str,
        request: &CreateBuildStepRequest,
    ) -> ApiResult<BuildStep> {
        self.send_json(
            Method::PUT,
            &endpoint::build_step_path(build_type_id, step_id),
            request,
            OK,
        )
        .await
    }

    async fn delete_build_step(&self, build_type_id: &str, step_id: &str) -> ApiResult<()> {
        self.delete(&endpoint::build_step_path(build_type_id, step_id))
            .await
    }

    async fn list_agents(&self, locator: Option<&str>) -> ApiResult<Vec<Agent>> {
        let list: AgentList = match locator.filter(|l| !l.is_empty()) {
            Some(locator) => {
                self.get_json(Endpoint::Agents.path(), &[("locator", locator)])
                    .await?
            }
            None => self.get_json(Endpoint::Agents.path(), &[]).await?,
        };
        Ok(list.agent)
    }

    async fn get_agent(&self, agent_id: u64) -> ApiResult<Agent> {
        self.get_json(&Endpoint::Agents.by_id(agent_id), &[]).await
    }

    async fn set_agent_enabled(&self, agent_id: u64, enabled: bool) -> ApiResult<bool> {
        self.put_flag(&endpoint::agent_flag_path(agent_id, "enabled"), enabled)
            .await
    }

    async fn set_agent_authorized(&self, agent_id: u64, authorized: bool) -> ApiResult<bool> {
        self.put_flag(&endpoint::agent_flag_path(agent_id, "authorized"), authorized)
            .await
    }
}
