//! Agents: a persona bound to a language model, optionally with tools
//!
//! An agent executes one [`Task`] per call and keeps no state between calls.
//! Tool calls requested by the model are run and fed back until the model
//! answers in plain text or the iteration budget runs out.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::openai::{ChatMessage, LlmClient, ToolDefinition};
use crate::task::Task;
use crate::tools::Tool;

/// The three career advisor personas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgentRole {
    JobSeeker,
    Employer,
    MarketAnalyst,
}

impl AgentRole {
    pub fn persona(&self) -> Persona {
        match self {
            AgentRole::JobSeeker => Persona::new(
                "Job Seeker",
                "Find suitable jobs and recommend relevant training programs.",
                "You are a proactive job seeker who searches for jobs, requests career advice, \
                 and identifies training opportunities to enhance employability.",
            ),
            AgentRole::Employer => Persona::new(
                "Employer",
                "Identify potential candidates and refine hiring strategies.",
                "You are responsible for posting job openings, searching for suitable candidates, \
                 and providing feedback to improve the hiring process.",
            ),
            AgentRole::MarketAnalyst => Persona::new(
                "Market Intelligence Analyst",
                "Analyze labor market trends to provide insights on skill demands.",
                "You analyze job data and economic trends to forecast which skills are in demand \
                 and provide insights to both job seekers and employers.",
            ),
        }
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.persona().role)
    }
}

/// Role, goal and backstory text that frame every request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Persona {
    pub role: String,
    pub goal: String,
    pub backstory: String,
}

impl Persona {
    pub fn new(
        role: impl Into<String>,
        goal: impl Into<String>,
        backstory: impl Into<String>,
    ) -> Self {
        Self {
            role: role.into(),
            goal: goal.into(),
            backstory: backstory.into(),
        }
    }

    pub fn system_prompt(&self) -> String {
        format!(
            "You are {}. {}\nYour personal goal is: {}",
            self.role, self.backstory, self.goal
        )
    }
}

/// Anything that can carry out a task and return text
#[async_trait]
pub trait Agent: Send + Sync {
    fn role(&self) -> AgentRole;

    async fn execute(&self, task: &Task) -> Result<String>;
}

/// Message history and progress for one task execution
#[derive(Debug, Default)]
struct ExecutionState {
    messages: Vec<ChatMessage>,
    iteration: usize,
    tool_calls: usize,
}

/// Agent backed by the chat completions API
pub struct LlmAgent {
    role: AgentRole,
    persona: Persona,
    client: LlmClient,
    tools: HashMap<String, Arc<dyn Tool>>,
    max_iterations: usize,
}

impl LlmAgent {
    pub fn new(role: AgentRole, client: LlmClient) -> Self {
        Self {
            role,
            persona: role.persona(),
            client,
            tools: HashMap::new(),
            max_iterations: 5,
        }
    }

    pub fn with_tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.insert(tool.name().to_string(), tool);
        self
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn persona(&self) -> &Persona {
        &self.persona
    }

    fn tool_definitions(&self) -> Vec<ToolDefinition> {
        let mut defs: Vec<_> = self.tools.values().map(|t| t.to_definition()).collect();
        defs.sort_by(|a, b| a.function.name.cmp(&b.function.name));
        defs
    }

    async fn run_tool_calls(&self, state: &mut ExecutionState, reply: ChatMessage) {
        let calls = reply.requested_tools().to_vec();
        state.messages.push(reply);

        for call in calls {
            state.tool_calls += 1;
            let output = match self.tools.get(&call.function.name) {
                None => format!("Error: unknown tool '{}'", call.function.name),
                Some(tool) => match call.function.parsed_arguments() {
                    Err(e) => format!("Error: {:#}", e),
                    Ok(args) => match tool.execute(&args).await {
                        Ok(result) => result.to_message(),
                        Err(e) => format!("Error: {:#}", e),
                    },
                },
            };
            debug!(tool = %call.function.name, output_len = output.len(), "Tool executed");
            state.messages.push(ChatMessage::tool(call.id, output));
        }
    }
}

#[async_trait]
impl Agent for LlmAgent {
    fn role(&self) -> AgentRole {
        self.role
    }

    #[instrument(skip(self, task), fields(agent = %self.persona.role))]
    async fn execute(&self, task: &Task) -> Result<String> {
        info!(context_items = task.context.len(), "Executing task");

        let mut state = ExecutionState {
            messages: vec![
                ChatMessage::system(self.persona.system_prompt()),
                ChatMessage::user(task.prompt()),
            ],
            ..Default::default()
        };
        let defs = self.tool_definitions();

        while state.iteration < self.max_iterations {
            state.iteration += 1;
            let reply = self.client.chat(&state.messages, Some(defs.as_slice())).await?;

            if reply.requested_tools().is_empty() {
                return final_answer(&reply);
            }
            self.run_tool_calls(&mut state, reply).await;
        }

        warn!(
            iterations = state.iteration,
            tool_calls = state.tool_calls,
            "Iteration budget exhausted, forcing final answer"
        );
        state.messages.push(ChatMessage::user(
            "Stop using tools now and give your best complete final answer.",
        ));
        let reply = self.client.chat(&state.messages, None).await?;
        final_answer(&reply)
    }
}

fn final_answer(reply: &ChatMessage) -> Result<String> {
    let text = reply.content_str().trim();
    if text.is_empty() {
        anyhow::bail!("Agent returned an empty answer");
    }
    Ok(text.to_string())
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted agents for exercising the interview and dispatch flow offline

    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// A call observed by a [`ScriptedAgent`]
    #[derive(Debug, Clone)]
    pub struct RecordedCall {
        pub role: AgentRole,
        pub prompt: String,
    }

    pub type CallLog = Arc<Mutex<Vec<RecordedCall>>>;

    /// Replies with canned responses in order and logs every prompt
    pub struct ScriptedAgent {
        role: AgentRole,
        replies: Mutex<VecDeque<Result<String, String>>>,
        log: CallLog,
    }

    impl ScriptedAgent {
        pub fn new(role: AgentRole, log: CallLog) -> Self {
            Self {
                role,
                replies: Mutex::new(VecDeque::new()),
                log,
            }
        }

        pub fn reply(self, text: &str) -> Self {
            self.replies.lock().unwrap().push_back(Ok(text.to_string()));
            self
        }

        pub fn fail(self, message: &str) -> Self {
            self.replies
                .lock()
                .unwrap()
                .push_back(Err(message.to_string()));
            self
        }
    }

    #[async_trait]
    impl Agent for ScriptedAgent {
        fn role(&self) -> AgentRole {
            self.role
        }

        async fn execute(&self, task: &Task) -> Result<String> {
            self.log.lock().unwrap().push(RecordedCall {
                role: self.role,
                prompt: task.prompt(),
            });
            match self.replies.lock().unwrap().pop_front() {
                Some(Ok(text)) => Ok(text),
                Some(Err(message)) => Err(anyhow::anyhow!(message)),
                None => Err(anyhow::anyhow!("{} has no scripted reply left", self.role)),
            }
        }
    }
}
