//! advisor-core: Career advisor agents and interview pipeline
//!
//! Provides:
//! - Configuration loading (advisor.toml) and API credentials
//! - Chat completions client and Serper search tool
//! - Agents, tasks and the crew that runs them
//! - Profile store, question sequencer and task dispatcher
//! - Turn-based chat session state machine

pub mod advisor;
pub mod agent;
pub mod config;
pub mod crew;
pub mod dispatcher;
pub mod interview;
pub mod openai;
pub mod profile;
pub mod search;
pub mod session;
pub mod task;
pub mod tools;

pub use advisor::Advisor;
pub use agent::{Agent, AgentRole, LlmAgent, Persona};
pub use config::{AdvisorConfig, Credentials, Region};
pub use crew::Crew;
pub use dispatcher::{CareerReport, Stage, TaskDispatcher};
pub use interview::{AnswerSource, Question, QuestionSequencer};
pub use openai::{ChatMessage, ChatOptions, LlmClient, RetryConfig, Role};
pub use profile::{Profile, ProfileField, QaPair};
pub use session::{Message, Session, SessionStage, Speaker, Submission};
pub use task::Task;
