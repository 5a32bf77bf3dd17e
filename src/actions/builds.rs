//! Build triggering, inspection and cancellation

use crate::actions::{expect_rejection, ActionError, ActionResult};
use crate::api::{ApiError, CiServerApi};
use crate::core::context::{CreatedObject, RunContext};
use crate::core::models::{Build, BuildCancelRequest, BuildStatus, Properties, StartBuildRequest};
use crate::core::state::BuildLifecycleState;
use crate::wait::{
    get_latest_build_and_wait, wait_for_build_completion, wait_for_build_state, BuildWaitOptions,
};
use tracing::info;

/// Comment used when a cancellation does not say why
pub const DEFAULT_CANCEL_COMMENT: &str = "Test cancellation";

/// Build operations
pub struct BuildActions<'a, A: ?Sized> {
    api: &'a A,
    options: BuildWaitOptions,
}

impl<'a, A> BuildActions<'a, A>
where
    A: CiServerApi + ?Sized,
{
    pub fn new(api: &'a A) -> Self {
        Self {
            api,
            options: BuildWaitOptions::default(),
        }
    }

    pub fn with_wait_options(mut self, options: BuildWaitOptions) -> Self {
        self.options = options;
        self
    }

    /// Queue a build of `build_type_id`
    ///
    /// The server must answer with a positive id, the same build type and a
    /// `queued` or `running` state.
    pub async fn trigger_build(
        &self,
        ctx: &mut RunContext,
        build_type_id: &str,
        properties: Option<Properties>,
    ) -> ActionResult<Build> {
        let mut request = StartBuildRequest::new(build_type_id).map_err(ApiError::from)?;
        if let Some(properties) = properties {
            request = request.with_properties(properties);
        }
        self.trigger(ctx, &request).await
    }

    /// Queue a build from a prepared request
    pub async fn trigger(&self, ctx: &mut RunContext, request: &StartBuildRequest) -> ActionResult<Build> {
        let build = self.api.trigger_build(request).await?;

        if build.id == 0 {
            return Err(ActionError::Unexpected(
                "Build ID should be positive".to_string(),
            ));
        }
        ctx.register(CreatedObject::Build(build.id));

        if build.build_type_id != request.build_type_id() {
            return Err(ActionError::Unexpected(format!(
                "Build type mismatch for build {}: expected {}, got {}",
                build.id,
                request.build_type_id(),
                build.build_type_id
            )));
        }
        match build.lifecycle_state() {
            Ok(BuildLifecycleState::Queued) | Ok(BuildLifecycleState::Running) => {}
            _ => {
                return Err(ActionError::Unexpected(format!(
                    "Build {} has unexpected initial state '{}'",
                    build.id, build.state
                )));
            }
        }

        info!("Build triggered: ID {}, Type: {}", build.id, build.build_type_id);
        Ok(build)
    }

    /// Send a trigger the server must refuse
    pub async fn trigger_invalid_build(
        &self,
        request: &StartBuildRequest,
        expected_message: &str,
    ) -> ActionResult<ApiError> {
        let err = expect_rejection(
            "Build trigger",
            self.api.trigger_build(request).await,
            expected_message,
        )?;
        require_error_entries(&err)?;
        Ok(err)
    }

    /// Fetch a build; `fields` limits the payload, the record's own fields are always added
    pub async fn get_build(&self, build_id: u64, fields: Option<&str>) -> ActionResult<Build> {
        let build = self.api.get_build(build_id, fields).await?;
        info!("Retrieved build: ID {}, State: {}", build_id, build.state);
        Ok(build)
    }

    pub async fn get_builds_by_build_type(&self, build_type_id: &str) -> ActionResult<Vec<Build>> {
        let builds = self.api.list_builds(build_type_id).await?;
        if let Some(stray) = builds.iter().find(|b| b.build_type_id != build_type_id) {
            return Err(ActionError::Unexpected(format!(
                "Build {} belongs to {}, expected {}",
                stray.id, stray.build_type_id, build_type_id
            )));
        }
        info!("Retrieved {} builds for type {}", builds.len(), build_type_id);
        Ok(builds)
    }

    pub async fn get_build_queue(&self) -> ActionResult<Vec<Build>> {
        let queue = self.api.list_queue().await?;
        info!("Retrieved build queue: {} builds", queue.len());
        Ok(queue)
    }

    pub async fn cancel_queued_build(&self, build_id: u64, comment: &str) -> ActionResult<()> {
        self.api
            .cancel_queued_build(build_id, &BuildCancelRequest::new(comment))
            .await?;
        info!("Cancelled queued build: ID {}", build_id);
        Ok(())
    }

    pub async fn cancel_running_build(&self, build_id: u64, comment: &str) -> ActionResult<()> {
        self.api
            .cancel_running_build(build_id, &BuildCancelRequest::new(comment))
            .await?;
        info!("Cancelled running build: ID {}", build_id);
        Ok(())
    }

    /// Cancel a build the server must refuse to cancel
    pub async fn cancel_invalid_build(
        &self,
        build_id: u64,
        comment: &str,
        expected_message: &str,
    ) -> ActionResult<ApiError> {
        let err = expect_rejection(
            "Build cancellation",
            self.api
                .cancel_queued_build(build_id, &BuildCancelRequest::new(comment))
                .await,
            expected_message,
        )?;
        require_error_entries(&err)?;
        Ok(err)
    }

    pub async fn get_build_status(&self, build_id: u64) -> ActionResult<BuildStatus> {
        let status = self.api.get_build_status(build_id).await?;
        info!("Build {} status: {}", build_id, status.status);
        Ok(status)
    }

    pub async fn delete_build(&self, ctx: &mut RunContext, build_id: u64) -> ActionResult<()> {
        self.api.delete_build(build_id).await?;
        ctx.forget(&CreatedObject::Build(build_id));
        info!("Deleted build: ID {}", build_id);
        Ok(())
    }

    pub async fn wait_for_completion(&self, build_id: u64) -> ActionResult<Build> {
        Ok(wait_for_build_completion(self.api, build_id, &self.options).await?)
    }

    pub async fn wait_for_state(
        &self,
        build_id: u64,
        expected: &[BuildLifecycleState],
    ) -> ActionResult<Build> {
        Ok(wait_for_build_state(self.api, build_id, expected, &self.options).await?)
    }

    pub async fn get_latest_build_and_wait(&self, build_type_id: &str) -> ActionResult<Build> {
        Ok(get_latest_build_and_wait(self.api, build_type_id, &self.options).await?)
    }
}

fn require_error_entries(err: &ApiError) -> ActionResult<()> {
    match err {
        ApiError::Status { errors, body, .. } if errors.is_empty() => Err(ActionError::Unexpected(
            format!("Expected errors in response, got: {}", body),
        )),
        _ => Ok(()),
    }
}
