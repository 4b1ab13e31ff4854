//! The group of agents the advisor runs

use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use crate::agent::{Agent, AgentRole, LlmAgent};
use crate::config::{AdvisorConfig, Credentials};
use crate::openai::LlmClient;
use crate::search::{SearchTool, SerperClient};
use crate::tools::Tool;

/// Job seeker, employer and market analyst agents
#[derive(Clone)]
pub struct Crew {
    pub job_seeker: Arc<dyn Agent>,
    pub employer: Arc<dyn Agent>,
    pub market_analyst: Arc<dyn Agent>,
}

impl Crew {
    pub fn new(
        job_seeker: Arc<dyn Agent>,
        employer: Arc<dyn Agent>,
        market_analyst: Arc<dyn Agent>,
    ) -> Self {
        Self {
            job_seeker,
            employer,
            market_analyst,
        }
    }

    /// Build LLM-backed agents sharing one client and one search tool
    pub fn from_config(config: &AdvisorConfig, credentials: &Credentials) -> Result<Self> {
        let client = LlmClient::new(&config.llm, credentials.openai_api_key.clone())?;

        let search: Option<Arc<dyn Tool>> = if config.search.enabled {
            let serper = SerperClient::new(&config.search, credentials.serper_api_key.clone())?;
            Some(Arc::new(SearchTool::new(serper)))
        } else {
            None
        };

        info!(
            model = client.model(),
            search = search.is_some(),
            "Assembling crew"
        );

        let build = |role: AgentRole| -> Arc<dyn Agent> {
            let mut agent = LlmAgent::new(role, client.clone())
                .with_max_iterations(config.llm.max_iterations);
            if let Some(tool) = &search {
                agent = agent.with_tool(Arc::clone(tool));
            }
            Arc::new(agent)
        };

        Ok(Self::new(
            build(AgentRole::JobSeeker),
            build(AgentRole::Employer),
            build(AgentRole::MarketAnalyst),
        ))
    }

    /// Agent assigned to a role
    pub fn agent(&self, role: AgentRole) -> &Arc<dyn Agent> {
        match role {
            AgentRole::JobSeeker => &self.job_seeker,
            AgentRole::Employer => &self.employer,
            AgentRole::MarketAnalyst => &self.market_analyst,
        }
    }
}
