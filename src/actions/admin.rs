//! Project, user, build type and build step administration

use crate::actions::{expect_rejection, ActionError, ActionResult};
use crate::api::{ApiError, CiServerApi};
use crate::core::context::{CreatedObject, RunContext};
use crate::core::generate;
use crate::core::models::{
    BuildStep, BuildType, CreateBuildStepRequest, CreateBuildTypeRequest, CreateProjectRequest,
    CreateUserRequest, Project, User,
};
use crate::wait::{wait_project_appears_with, wait_user_appears_with, RetryPolicy};
use tracing::info;

/// Script of the step every generated build type starts with
pub const DEFAULT_STEP_SCRIPT: &str = "echo 'Test build executed successfully'";

/// Administrative operations
pub struct AdminActions<'a, A: ?Sized> {
    api: &'a A,
    appearance: RetryPolicy,
}

impl<'a, A> AdminActions<'a, A>
where
    A: CiServerApi + ?Sized,
{
    pub fn new(api: &'a A) -> Self {
        Self {
            api,
            appearance: RetryPolicy::default(),
        }
    }

    /// Budget for the `*_and_wait` operations
    pub fn with_appearance_policy(mut self, policy: RetryPolicy) -> Self {
        self.appearance = policy;
        self
    }

    // -- projects ---------------------------------------------------------

    pub async fn create_project(
        &self,
        ctx: &mut RunContext,
        request: &CreateProjectRequest,
    ) -> ActionResult<Project> {
        let project = self.api.create_project(request).await?;

        if project.id.trim().is_empty() {
            return Err(ActionError::Unexpected(format!(
                "Project created from '{}' came back with an empty id",
                request.id()
            )));
        }
        ctx.register(CreatedObject::Project(project.id.clone()));
        if project.id != request.id() {
            return Err(ActionError::Unexpected(format!(
                "Project ID mismatch: expected {}, got {}",
                request.id(),
                project.id
            )));
        }

        info!("Project created: {}, ID: {}", project.name, project.id);
        Ok(project)
    }

    /// Create a project and wait until the project listing shows it
    pub async fn create_project_and_wait(
        &self,
        ctx: &mut RunContext,
        request: &CreateProjectRequest,
    ) -> ActionResult<Project> {
        let created = self.create_project(ctx, request).await?;
        Ok(wait_project_appears_with(self.api, &created.id, self.appearance).await?)
    }

    /// Send a project the server must refuse
    pub async fn create_invalid_project(
        &self,
        request: &CreateProjectRequest,
        expected_message: &str,
    ) -> ActionResult<ApiError> {
        expect_rejection(
            "Project creation",
            self.api.create_project(request).await,
            expected_message,
        )
    }

    pub async fn get_all_projects(&self) -> ActionResult<Vec<Project>> {
        let projects = self.api.list_projects().await?;
        if projects.is_empty() {
            return Err(ActionError::Unexpected(
                "projects list should not be empty".to_string(),
            ));
        }
        info!("Retrieved {} projects", projects.len());
        Ok(projects)
    }

    pub async fn delete_project(&self, ctx: &mut RunContext, project_id: &str) -> ActionResult<()> {
        self.api.delete_project(project_id).await?;
        ctx.forget(&CreatedObject::Project(project_id.to_string()));
        info!("Project deleted: ID {}", project_id);
        Ok(())
    }

    // -- users ------------------------------------------------------------

    pub async fn create_user(
        &self,
        ctx: &mut RunContext,
        request: &CreateUserRequest,
    ) -> ActionResult<User> {
        let user = self.api.create_user(request).await?;

        if user.id == 0 {
            return Err(ActionError::Unexpected(format!(
                "User {} was created without a positive id",
                user.username
            )));
        }
        ctx.register(CreatedObject::User(user.id));
        if !user.username.eq_ignore_ascii_case(request.username()) {
            return Err(ActionError::Unexpected(format!(
                "Username mismatch: expected {}, got {}",
                request.username(),
                user.username
            )));
        }

        info!("User created: {}, ID: {}", user.username, user.id);
        Ok(user)
    }

    /// Create a user and wait until the user listing shows it
    pub async fn create_user_and_wait(
        &self,
        ctx: &mut RunContext,
        request: &CreateUserRequest,
    ) -> ActionResult<User> {
        let created = self.create_user(ctx, request).await?;
        Ok(wait_user_appears_with(self.api, &created.username, self.appearance).await?)
    }

    /// Send a user the server must refuse
    pub async fn create_invalid_user(
        &self,
        request: &CreateUserRequest,
        expected_message: &str,
    ) -> ActionResult<ApiError> {
        expect_rejection(
            "User creation",
            self.api.create_user(request).await,
            expected_message,
        )
    }

    pub async fn get_all_users(&self) -> ActionResult<Vec<User>> {
        let users = self.api.list_users().await?;
        if users.is_empty() {
            return Err(ActionError::Unexpected(
                "users list should not be empty".to_string(),
            ));
        }
        info!("Retrieved {} users", users.len());
        Ok(users)
    }

    pub async fn delete_user(&self, ctx: &mut RunContext, user_id: u64) -> ActionResult<()> {
        self.api.delete_user(user_id).await?;
        ctx.forget(&CreatedObject::User(user_id));
        info!("User deleted: ID {}", user_id);
        Ok(())
    }

    // -- build types and steps --------------------------------------------

    /// Create a build type with a single command-line step in `project_id`
    pub async fn create_build_type(
        &self,
        ctx: &mut RunContext,
        project_id: &str,
        name: &str,
    ) -> ActionResult<BuildType> {
        let id = generate::build_type_id(project_id, name);
        let request = CreateBuildTypeRequest::new(id, name, project_id).map_err(ApiError::from)?;
        let build_type = self.api.create_build_type(&request).await?;
        ctx.register(CreatedObject::BuildType(build_type.id.clone()));

        let step = CreateBuildStepRequest::command_line("", DEFAULT_STEP_SCRIPT);
        self.api.create_build_step(&build_type.id, &step).await?;

        info!("Created build type: {}", build_type.id);
        Ok(build_type)
    }

    pub async fn delete_build_type(&self, ctx: &mut RunContext, build_type_id: &str) -> ActionResult<()> {
        self.api.delete_build_type(build_type_id).await?;
        ctx.forget(&CreatedObject::BuildType(build_type_id.to_string()));
        info!("Deleted build type: {}", build_type_id);
        Ok(())
    }

    pub async fn add_build_step(
        &self,
        build_type_id: &str,
        request: &CreateBuildStepRequest,
    ) -> ActionResult<BuildStep> {
        let step = self.api.create_build_step(build_type_id, request).await?;
        check_step(&step, request)?;
        info!("Added step {} to {}", step.id, build_type_id);
        Ok(step)
    }

    pub async fn get_build_steps(&self, build_type_id: &str) -> ActionResult<Vec<BuildStep>> {
        let steps = self.api.list_build_steps(build_type_id).await?;
        info!("Retrieved {} steps of {}", steps.len(), build_type_id);
        Ok(steps)
    }

    pub async fn get_build_step(&self, build_type_id: &str, step_id: &str) -> ActionResult<BuildStep> {
        let step = self.api.get_build_step(build_type_id, step_id).await?;
        if step.id != step_id {
            return Err(ActionError::Unexpected(format!(
                "Step ID mismatch: expected {}, got {}",
                step_id, step.id
            )));
        }
        Ok(step)
    }

    pub async fn update_build_step(
        &self,
        build_type_id: &str,
        step_id: &str,
        request: &CreateBuildStepRequest,
    ) -> ActionResult<BuildStep> {
        let step = self
            .api
            .update_build_step(build_type_id, step_id, request)
            .await?;
        check_step(&step, request)?;
        info!("Updated step {} of {}", step_id, build_type_id);
        Ok(step)
    }

    pub async fn delete_build_step(&self, build_type_id: &str, step_id: &str) -> ActionResult<()> {
        self.api.delete_build_step(build_type_id, step_id).await?;
        info!("Deleted step {} of {}", step_id, build_type_id);
        Ok(())
    }
}

fn check_step(step: &BuildStep, request: &CreateBuildStepRequest) -> ActionResult<()> {
    if step.step_type != request.step_type() {
        return Err(ActionError::Unexpected(format!(
            "Step type mismatch: expected {}, got {}",
            request.step_type(),
            step.step_type
        )));
    }
    if !request.name().is_empty() && step.name != request.name() {
        return Err(ActionError::Unexpected(format!(
            "Step name mismatch: expected {}, got {}",
            request.name(),
            step.name
        )));
    }
    Ok(())
}
