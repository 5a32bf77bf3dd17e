//! Build agent lookup and toggling

use crate::actions::{ActionError, ActionResult};
use crate::api::CiServerApi;
use crate::core::models::Agent;
use tracing::info;

/// Locator listing agents whether or not they are authorized
pub const ANY_AGENT_LOCATOR: &str = "authorized:any";

/// Agent operations
pub struct AgentActions<'a, A: ?Sized> {
    api: &'a A,
}

impl<'a, A> AgentActions<'a, A>
where
    A: CiServerApi + ?Sized,
{
    pub fn new(api: &'a A) -> Self {
        Self { api }
    }

    /// List agents, optionally narrowed by a server-side locator
    pub async fn get_all_agents(&self, locator: Option<&str>) -> ActionResult<Vec<Agent>> {
        let agents = self.api.list_agents(locator).await?;
        info!("Retrieved {} agents", agents.len());
        Ok(agents)
    }

    pub async fn get_agent(&self, agent_id: u64) -> ActionResult<Agent> {
        Ok(self.api.get_agent(agent_id).await?)
    }

    /// Id of the agent called `name`, authorized or not
    pub async fn find_agent_id(&self, name: &str) -> ActionResult<u64> {
        let agents = self.api.list_agents(Some(ANY_AGENT_LOCATOR)).await?;
        agents
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.id)
            .ok_or_else(|| {
                ActionError::Unexpected(format!("Agent with name '{}' not found in agents list", name))
            })
    }

    pub async fn enable_agent(&self, agent_id: u64) -> ActionResult<()> {
        self.set_enabled(agent_id, true).await?;
        info!("Agent id:{} enabled", agent_id);
        Ok(())
    }

    pub async fn disable_agent(&self, agent_id: u64) -> ActionResult<()> {
        self.set_enabled(agent_id, false).await?;
        info!("Agent id:{} disabled", agent_id);
        Ok(())
    }

    pub async fn authorize_agent(&self, agent_id: u64, authorized: bool) -> ActionResult<()> {
        let echoed = self.api.set_agent_authorized(agent_id, authorized).await?;
        if echoed != authorized {
            return Err(ActionError::Unexpected(format!(
                "Agent id:{} reports authorized={} after setting {}",
                agent_id, echoed, authorized
            )));
        }
        info!("Agent id:{} authorized={}", agent_id, authorized);
        Ok(())
    }

    async fn set_enabled(&self, agent_id: u64, enabled: bool) -> ActionResult<()> {
        let echoed = self.api.set_agent_enabled(agent_id, enabled).await?;
        if echoed != enabled {
            return Err(ActionError::Unexpected(format!(
                "Agent id:{} reports enabled={} after setting {}",
                agent_id, echoed, enabled
            )));
        }
        Ok(())
    }
}
