//! In-memory CI server for tests
//!
//! `ScriptedServer` keeps projects, users, builds, build types and agents in
//! memory and lets a test script what successive listings and build polls
//! return. A scripted sequence advances one entry per call and then keeps
//! repeating its last entry.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::api::{ApiError, ApiResult, CiServerApi};
use crate::core::models::{
    Agent, Build, BuildCancelRequest, BuildStatus, BuildStep, BuildType, CreateBuildStepRequest,
    CreateBuildTypeRequest, CreateProjectRequest, CreateUserRequest, Project, ServerErrorEntry,
    StartBuildRequest, User,
};

/// Advance a script: pop while more than one entry remains, then repeat the last
fn next_scripted<T: Clone>(script: &mut VecDeque<T>) -> Option<T> {
    if script.len() > 1 {
        script.pop_front()
    } else {
        script.front().cloned()
    }
}

fn not_found(method: &str, path: String, message: String) -> ApiError {
    ApiError::Status {
        method: method.to_string(),
        url: path,
        status: 404,
        body: message.clone(),
        errors: vec![ServerErrorEntry {
            message: Some(message),
            additional_message: None,
        }],
    }
}

/// Shorthand for a build record in a given state
pub fn build(id: u64, build_type_id: &str, state: &str) -> Build {
    Build {
        id,
        build_type_id: build_type_id.to_string(),
        state: state.to_string(),
        status: None,
        status_text: None,
        queued_date: None,
        start_date: None,
        finish_date: None,
    }
}

/// Shorthand for a project record
pub fn project(id: &str, name: &str) -> Project {
    Project {
        id: id.to_string(),
        name: name.to_string(),
        parent_project_id: Some("_Root".to_string()),
        description: None,
        href: None,
        web_url: None,
    }
}

/// Shorthand for a user record
pub fn user(id: u64, username: &str) -> User {
    User {
        id,
        username: username.to_string(),
        name: None,
        href: None,
    }
}

#[derive(Debug, Default)]
struct ServerState {
    projects: Vec<Project>,
    project_script: VecDeque<Vec<Project>>,
    users: Vec<User>,
    user_script: VecDeque<Vec<User>>,
    builds: HashMap<u64, Build>,
    build_state_scripts: HashMap<u64, VecDeque<String>>,
    queue_script: VecDeque<Vec<Build>>,
    recent_script: VecDeque<Vec<Build>>,
    build_types: Vec<BuildType>,
    steps: HashMap<String, Vec<BuildStep>>,
    agents: Vec<Agent>,
    failures: HashMap<&'static str, VecDeque<ApiError>>,
    calls: HashMap<&'static str, usize>,
    requested_fields: Vec<Option<String>>,
    triggered: Vec<StartBuildRequest>,
    deleted: Vec<String>,
    next_id: u64,
}

/// Scriptable in-memory implementation of `CiServerApi`
#[derive(Debug)]
pub struct ScriptedServer {
    state: Mutex<ServerState>,
}

impl Default for ScriptedServer {
    fn default() -> Self {
        Self {
            state: Mutex::new(ServerState {
                next_id: 1000,
                ..ServerState::default()
            }),
        }
    }
}

impl ScriptedServer {
    pub fn new() -> Self {
        Self::default()
    }

    // -- seeding ----------------------------------------------------------

    pub fn with_project(self, project: Project) -> Self {
        self.state.lock().unwrap().projects.push(project);
        self
    }

    pub fn with_user(self, user: User) -> Self {
        self.state.lock().unwrap().users.push(user);
        self
    }

    pub fn with_build(self, build: Build) -> Self {
        self.state.lock().unwrap().builds.insert(build.id, build);
        self
    }

    pub fn with_build_type(self, build_type: BuildType) -> Self {
        self.state.lock().unwrap().build_types.push(build_type);
        self
    }

    pub fn with_agent(self, agent: Agent) -> Self {
        self.state.lock().unwrap().agents.push(agent);
        self
    }

    // -- scripting --------------------------------------------------------

    /// Successive `get_build(build_id)` calls report these states in order
    pub fn script_build_states(&self, build_id: u64, build_type_id: &str, states: &[&str]) {
        let mut state = self.state.lock().unwrap();
        state
            .builds
            .entry(build_id)
            .or_insert_with(|| build(build_id, build_type_id, states.first().copied().unwrap_or("queued")));
        state
            .build_state_scripts
            .insert(build_id, states.iter().map(|s| s.to_string()).collect());
    }

    /// Successive `list_projects` calls return these snapshots
    pub fn script_project_listings(&self, listings: Vec<Vec<Project>>) {
        self.state.lock().unwrap().project_script = listings.into();
    }

    /// Successive `list_users` calls return these snapshots
    pub fn script_user_listings(&self, listings: Vec<Vec<User>>) {
        self.state.lock().unwrap().user_script = listings.into();
    }

    /// Successive `list_queue` calls return these snapshots
    pub fn script_queue(&self, snapshots: Vec<Vec<Build>>) {
        self.state.lock().unwrap().queue_script = snapshots.into();
    }

    /// Successive `list_builds` calls return these snapshots (filtered by build type)
    pub fn script_recent_builds(&self, snapshots: Vec<Vec<Build>>) {
        self.state.lock().unwrap().recent_script = snapshots.into();
    }

    /// Make the next call to `operation` fail with `error`
    pub fn fail_next(&self, operation: &'static str, error: ApiError) {
        self.state
            .lock()
            .unwrap()
            .failures
            .entry(operation)
            .or_default()
            .push_back(error);
    }

    // -- inspection -------------------------------------------------------

    /// Number of times `operation` was called
    pub fn calls(&self, operation: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .get(operation)
            .copied()
            .unwrap_or(0)
    }

    /// `fields` argument of every `get_build` call, in order
    pub fn requested_fields(&self) -> Vec<Option<String>> {
        self.state.lock().unwrap().requested_fields.clone()
    }

    /// Every request passed to `trigger_build`
    pub fn triggered(&self) -> Vec<StartBuildRequest> {
        self.state.lock().unwrap().triggered.clone()
    }

    /// Entities deleted so far, as `kind:id`
    pub fn deleted(&self) -> Vec<String> {
        self.state.lock().unwrap().deleted.clone()
    }

    pub fn projects(&self) -> Vec<Project> {
        self.state.lock().unwrap().projects.clone()
    }

    pub fn users(&self) -> Vec<User> {
        self.state.lock().unwrap().users.clone()
    }

    pub fn build_record(&self, build_id: u64) -> Option<Build> {
        self.state.lock().unwrap().builds.get(&build_id).cloned()
    }

    pub fn agent(&self, agent_id: u64) -> Option<Agent> {
        self.state
            .lock()
            .unwrap()
            .agents
            .iter()
            .find(|a| a.id == agent_id)
            .cloned()
    }

    /// Count the call and return an injected failure if one is pending
    fn enter(&self, operation: &'static str) -> ApiResult<std::sync::MutexGuard<'_, ServerState>> {
        let mut state = self.state.lock().unwrap();
        *state.calls.entry(operation).or_insert(0) += 1;
        if let Some(error) = state.failures.get_mut(operation).and_then(VecDeque::pop_front) {
            return Err(error);
        }
        Ok(state)
    }
}

impl ServerState {
    fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

#[async_trait]
impl CiServerApi for ScriptedServer {
    fn resource_locator(&self, path: &str) -> String {
        format!("memory://ci{}", path)
    }

    async fn list_projects(&self) -> ApiResult<Vec<Project>> {
        let mut state = self.enter("list_projects")?;
        match next_scripted(&mut state.project_script) {
            Some(listing) => Ok(listing),
            None => Ok(state.projects.clone()),
        }
    }

    async fn create_project(&self, request: &CreateProjectRequest) -> ApiResult<Project> {
        let mut state = self.enter("create_project")?;
        let created = project(request.id(), request.name());
        state.projects.push(created.clone());
        Ok(created)
    }

    async fn delete_project(&self, project_id: &str) -> ApiResult<()> {
        let mut state = self.enter("delete_project")?;
        let before = state.projects.len();
        state.projects.retain(|p| p.id != project_id);
        if state.projects.len() == before {
            return Err(not_found(
                "DELETE",
                format!("/projects/id:{}", project_id),
                format!("No project found by locator 'id:{}'", project_id),
            ));
        }
        state.deleted.push(format!("project:{}", project_id));
        Ok(())
    }

    async fn list_users(&self) -> ApiResult<Vec<User>> {
        let mut state = self.enter("list_users")?;
        match next_scripted(&mut state.user_script) {
            Some(listing) => Ok(listing),
            None => Ok(state.users.clone()),
        }
    }

    async fn create_user(&self, request: &CreateUserRequest) -> ApiResult<User> {
        let mut state = self.enter("create_user")?;
        let id = state.allocate_id();
        let created = user(id, request.username());
        state.users.push(created.clone());
        Ok(created)
    }

    async fn delete_user(&self, user_id: u64) -> ApiResult<()> {
        let mut state = self.enter("delete_user")?;
        let before = state.users.len();
        state.users.retain(|u| u.id != user_id);
        if state.users.len() == before {
            return Err(not_found(
                "DELETE",
                format!("/users/id:{}", user_id),
                format!("User not found: id:{}", user_id),
            ));
        }
        state.deleted.push(format!("user:{}", user_id));
        Ok(())
    }

    async fn get_build(&self, build_id: u64, fields: Option<&str>) -> ApiResult<Build> {
        let mut state = self.enter("get_build")?;
        state.requested_fields.push(fields.map(str::to_string));
        let scripted = state
            .build_state_scripts
            .get_mut(&build_id)
            .and_then(next_scripted);
        let record = state.builds.get_mut(&build_id).ok_or_else(|| {
            not_found(
                "GET",
                format!("/builds/id:{}", build_id),
                format!("No build found by locator 'id:{}'", build_id),
            )
        })?;
        if let Some(next_state) = scripted {
            record.state = next_state;
        }
        Ok(record.clone())
    }

    async fn list_builds(&self, build_type_id: &str) -> ApiResult<Vec<Build>> {
        let mut state = self.enter("list_builds")?;
        let snapshot = match next_scripted(&mut state.recent_script) {
            Some(snapshot) => snapshot,
            None => {
                let mut all: Vec<Build> = state.builds.values().cloned().collect();
                all.sort_by(|a, b| b.id.cmp(&a.id));
                all
            }
        };
        Ok(snapshot
            .into_iter()
            .filter(|b| b.build_type_id == build_type_id)
            .collect())
    }

    async fn list_queue(&self) -> ApiResult<Vec<Build>> {
        let mut state = self.enter("list_queue")?;
        match next_scripted(&mut state.queue_script) {
            Some(snapshot) => Ok(snapshot),
            None => Ok(state
                .builds
                .values()
                .filter(|b| b.state == "queued")
                .cloned()
                .collect()),
        }
    }

    async fn trigger_build(&self, request: &StartBuildRequest) -> ApiResult<Build> {
        let mut state = self.enter("trigger_build")?;
        state.triggered.push(request.clone());
        let id = state.allocate_id();
        let queued = build(id, request.build_type_id(), "queued");
        state.builds.insert(id, queued.clone());
        Ok(queued)
    }

    async fn cancel_queued_build(&self, build_id: u64, _request: &BuildCancelRequest) -> ApiResult<()> {
        let mut state = self.enter("cancel_queued_build")?;
        match state.builds.get_mut(&build_id) {
            Some(record) => {
                record.state = "finished".to_string();
                record.status = Some("UNKNOWN".to_string());
                record.status_text = Some("Canceled".to_string());
                Ok(())
            }
            None => Err(not_found(
                "POST",
                format!("/buildQueue/id:{}", build_id),
                format!("No queued build with id '{}' found", build_id),
            )),
        }
    }

    async fn cancel_running_build(&self, build_id: u64, request: &BuildCancelRequest) -> ApiResult<()> {
        let mut state = self.enter("cancel_running_build")?;
        match state.builds.get_mut(&build_id) {
            Some(record) => {
                record.state = "finished".to_string();
                record.status = Some("UNKNOWN".to_string());
                record.status_text = Some(request.comment.clone());
                Ok(())
            }
            None => Err(not_found(
                "POST",
                format!("/builds/id:{}", build_id),
                format!("No build found by locator 'id:{}'", build_id),
            )),
        }
    }

    async fn delete_build(&self, build_id: u64) -> ApiResult<()> {
        let mut state = self.enter("delete_build")?;
        if state.builds.remove(&build_id).is_none() {
            return Err(not_found(
                "DELETE",
                format!("/builds/id:{}", build_id),
                format!("No build found by locator 'id:{}'", build_id),
            ));
        }
        state.deleted.push(format!("build:{}", build_id));
        Ok(())
    }

    async fn get_build_status(&self, build_id: u64) -> ApiResult<BuildStatus> {
        let state = self.enter("get_build_status")?;
        let record = state.builds.get(&build_id).ok_or_else(|| {
            not_found(
                "GET",
                format!("/builds/id:{}", build_id),
                format!("No build found by locator 'id:{}'", build_id),
            )
        })?;
        Ok(BuildStatus {
            status: record.status.clone().unwrap_or_else(|| "UNKNOWN".to_string()),
            status_text: record.status_text.clone(),
        })
    }

    async fn list_build_types(&self) -> ApiResult<Vec<BuildType>> {
        let state = self.enter("list_build_types")?;
        Ok(state.build_types.clone())
    }

    async fn create_build_type(&self, request: &CreateBuildTypeRequest) -> ApiResult<BuildType> {
        let mut state = self.enter("create_build_type")?;
        if !state.projects.iter().any(|p| p.id == request.project_id()) {
            return Err(not_found(
                "POST",
                "/buildTypes".to_string(),
                format!("Project cannot be found by external id '{}'", request.project_id()),
            ));
        }
        let created = BuildType {
            id: request.id().to_string(),
            name: request.name().to_string(),
            project_id: Some(request.project_id().to_string()),
            href: None,
            web_url: None,
        };
        state.build_types.push(created.clone());
        Ok(created)
    }

    async fn get_build_type(&self, build_type_id: &str) -> ApiResult<BuildType> {
        let state = self.enter("get_build_type")?;
        state
            .build_types
            .iter()
            .find(|bt| bt.id == build_type_id)
            .cloned()
            .ok_or_else(|| {
                not_found(
                    "GET",
                    format!("/buildTypes/id:{}", build_type_id),
                    format!("No build type or template is found by id '{}'", build_type_id),
                )
            })
    }

    async fn delete_build_type(&self, build_type_id: &str) -> ApiResult<()> {
        let mut state = self.enter("delete_build_type")?;
        let before = state.build_types.len();
        state.build_types.retain(|bt| bt.id != build_type_id);
        if state.build_types.len() == before {
            return Err(not_found(
                "DELETE",
                format!("/buildTypes/id:{}", build_type_id),
                format!("No build type or template is found by id '{}'", build_type_id),
            ));
        }
        state.steps.remove(build_type_id);
        state.deleted.push(format!("buildType:{}", build_type_id));
        Ok(())
    }

    async fn list_build_steps(&self, build_type_id: &str) -> ApiResult<Vec<BuildStep>> {
        let state = self.enter("list_build_steps")?;
        Ok(state.steps.get(build_type_id).cloned().unwrap_or_default())
    }

    async fn create_build_step(
        &self,
        build_type_id: &str,
        request: &CreateBuildStepRequest,
    ) -> ApiResult<BuildStep> {
        let mut state = self.enter("create_build_step")?;
        if !state.build_types.iter().any(|bt| bt.id == build_type_id) {
            return Err(not_found(
                "POST",
                format!("/buildTypes/id:{}/steps", build_type_id),
                format!("No build type or template is found by id '{}'", build_type_id),
            ));
        }
        let steps = state.steps.entry(build_type_id.to_string()).or_default();
        let created = BuildStep {
            id: format!("RUNNER_{}", steps.len() + 1),
            name: request.name().to_string(),
            step_type: request.step_type().to_string(),
            disabled: Some(false),
            properties: request.properties().cloned(),
        };
        steps.push(created.clone());
        Ok(created)
    }

    async fn get_build_step(&self, build_type_id: &str, step_id: &str) -> ApiResult<BuildStep> {
        let state = self.enter("get_build_step")?;
        state
            .steps
            .get(build_type_id)
            .and_then(|steps| steps.iter().find(|s| s.id == step_id))
            .cloned()
            .ok_or_else(|| {
                not_found(
                    "GET",
                    format!("/buildTypes/id:{}/steps/{}", build_type_id, step_id),
                    format!("No step with id '{}' is found", step_id),
                )
            })
    }

    async fn update_build_step(
        &self,
        build_type_id: &str,
        step_id: &str,
        request: &CreateBuildStepRequest,
    ) -> ApiResult<BuildStep> {
        let mut state = self.enter("update_build_step")?;
        let step = state
            .steps
            .get_mut(build_type_id)
            .and_then(|steps| steps.iter_mut().find(|s| s.id == step_id))
            .ok_or_else(|| {
                not_found(
                    "PUT",
                    format!("/buildTypes/id:{}/steps/{}", build_type_id, step_id),
                    format!("No step with id '{}' is found", step_id),
                )
            })?;
        step.name = request.name().to_string();
        step.step_type = request.step_type().to_string();
        step.properties = request.properties().cloned();
        Ok(step.clone())
    }

    async fn delete_build_step(&self, build_type_id: &str, step_id: &str) -> ApiResult<()> {
        let mut state = self.enter("delete_build_step")?;
        let removed = state
            .steps
            .get_mut(build_type_id)
            .map(|steps| {
                let before = steps.len();
                steps.retain(|s| s.id != step_id);
                steps.len() != before
            })
            .unwrap_or(false);
        if !removed {
            return Err(not_found(
                "DELETE",
                format!("/buildTypes/id:{}/steps/{}", build_type_id, step_id),
                format!("No step with id '{}' is found", step_id),
            ));
        }
        Ok(())
    }

    async fn list_agents(&self, locator: Option<&str>) -> ApiResult<Vec<Agent>> {
        let state = self.enter("list_agents")?;
        let agents = state.agents.iter().cloned();
        // Only the `authorized:any` locator is understood; anything else lists authorized agents
        Ok(match locator {
            Some(l) if l.contains("authorized:any") => agents.collect(),
            Some(_) => agents.filter(|a| a.authorized).collect(),
            None => agents.collect(),
        })
    }

    async fn get_agent(&self, agent_id: u64) -> ApiResult<Agent> {
        let state = self.enter("get_agent")?;
        state
            .agents
            .iter()
            .find(|a| a.id == agent_id)
            .cloned()
            .ok_or_else(|| {
                not_found(
                    "GET",
                    format!("/agents/id:{}", agent_id),
                    format!("No agent can be found by id '{}'", agent_id),
                )
            })
    }

    async fn set_agent_enabled(&self, agent_id: u64, enabled: bool) -> ApiResult<bool> {
        let mut state = self.enter("set_agent_enabled")?;
        let agent = state.agents.iter_mut().find(|a| a.id == agent_id).ok_or_else(|| {
            not_found(
                "PUT",
                format!("/agents/id:{}/enabled", agent_id),
                format!("No agent can be found by id '{}'", agent_id),
            )
        })?;
        agent.enabled = enabled;
        Ok(agent.enabled)
    }

    async fn set_agent_authorized(&self, agent_id: u64, authorized: bool) -> ApiResult<bool> {
        let mut state = self.enter("set_agent_authorized")?;
        let agent = state.agents.iter_mut().find(|a| a.id == agent_id).ok_or_else(|| {
            not_found(
                "PUT",
                format!("/agents/id:{}/authorized", agent_id),
                format!("No agent can be found by id '{}'", agent_id),
            )
        })?;
        agent.authorized = authorized;
        Ok(agent.authorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_build_state_script_repeats_last_entry() {
        let server = ScriptedServer::new();
        server.script_build_states(7, "Bt", &["queued", "running", "finished"]);

        let mut seen = Vec::new();
        for _ in 0..5 {
            seen.push(server.get_build(7, None).await.unwrap().state);
        }
        assert_eq!(seen, ["queued", "running", "finished", "finished", "finished"]);
        assert_eq!(server.calls("get_build"), 5);
    }

    #[tokio::test]
    async fn test_injected_failure_is_returned_once() {
        let server = ScriptedServer::new().with_project(project("P1", "One"));
        server.fail_next("list_projects", ApiError::Timeout(1));

        assert!(matches!(server.list_projects().await, Err(ApiError::Timeout(1))));
        assert_eq!(server.list_projects().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_build_is_not_found() {
        let server = ScriptedServer::new();
        let err = server.get_build(99, None).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_recent_builds_filtered_by_type() {
        let server = ScriptedServer::new();
        server.script_recent_builds(vec![vec![
            build(3, "Other", "finished"),
            build(2, "Bt", "finished"),
        ]]);
        let builds = server.list_builds("Bt").await.unwrap();
        assert_eq!(builds.len(), 1);
        assert_eq!(builds[0].id, 2);
    }
}
