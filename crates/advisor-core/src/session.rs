//! Turn-based chat session
//!
//! State moves `Initial -> Questioning -> Processing -> Complete`. The front
//! end alternates between [`Session::advance`], which does the agent work the
//! current stage needs, and [`Session::submit`], which takes one line of user
//! input. All session state lives here, nothing is process-global.

use anyhow::Result;
use serde::Serialize;
use tracing::{debug, info};

use crate::advisor::Advisor;
use crate::dispatcher::{CareerReport, Stage};
use crate::interview::Question;
use crate::profile::Profile;

pub const GREETING: &str = "Hello! Please provide a brief description about yourself:";
pub const INTERVIEW_DONE: &str = "Thank you! Starting market analysis...";
pub const ANALYSIS_STARTED: &str = "Starting the career analysis process...";
pub const REPORT_READY: &str = "Final Career Recommendations:";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStage {
    Initial,
    Questioning,
    Processing,
    Complete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    Assistant,
    User,
}

/// One transcript entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub role: Speaker,
    pub content: String,
}

/// Outcome of submitting user input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    Accepted,
    /// Empty input, or nothing is waiting for input. State is unchanged.
    Rejected,
}

#[derive(Debug)]
pub struct Session {
    stage: SessionStage,
    messages: Vec<Message>,
    profile: Profile,
    current_question: Option<Question>,
    report: Option<CareerReport>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            stage: SessionStage::Initial,
            messages: vec![Message {
                role: Speaker::Assistant,
                content: GREETING.to_string(),
            }],
            profile: Profile::default(),
            current_question: None,
            report: None,
        }
    }

    pub fn stage(&self) -> SessionStage {
        self.stage
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.current_question.as_ref()
    }

    pub fn report(&self) -> Option<&CareerReport> {
        self.report.as_ref()
    }

    /// Markdown recommendation, once complete
    pub fn recommendation(&self) -> Option<&str> {
        self.report.as_ref().map(|r| r.recommendation.as_str())
    }

    /// Whether the next step needs a line from the user
    pub fn awaiting_input(&self) -> bool {
        match self.stage {
            SessionStage::Initial => true,
            SessionStage::Questioning => self.current_question.is_some(),
            SessionStage::Processing | SessionStage::Complete => false,
        }
    }

    /// Do the agent work the current stage needs: ask the next question, or run the analysis
    pub async fn advance<F>(&mut self, advisor: &Advisor, on_stage: F) -> Result<()>
    where
        F: FnMut(Stage),
    {
        match self.stage {
            SessionStage::Questioning if self.current_question.is_none() => {
                match advisor.sequencer().next_question(&self.profile).await? {
                    Some(question) => {
                        self.say(question.text.clone());
                        self.current_question = Some(question);
                    }
                    None => self.finish_interview(advisor)?,
                }
            }
            SessionStage::Processing => {
                self.say(ANALYSIS_STARTED);
                let report = advisor
                    .dispatcher()
                    .dispatch_with(&self.profile, on_stage)
                    .await?;
                self.say(REPORT_READY);
                self.report = Some(report);
                self.stage = SessionStage::Complete;
                info!("Session complete");
            }
            _ => {}
        }
        Ok(())
    }

    /// Take one line of user input
    pub fn submit(&mut self, input: &str, advisor: &Advisor) -> Result<Submission> {
        if input.trim().is_empty() || !self.awaiting_input() {
            return Ok(Submission::Rejected);
        }

        match self.stage {
            SessionStage::Initial => {
                self.hear(input);
                self.profile.initial_description = input.to_string();
                self.stage = SessionStage::Questioning;
            }
            SessionStage::Questioning => {
                let Some(question) = self.current_question.take() else {
                    return Ok(Submission::Rejected);
                };
                self.hear(input);
                advisor
                    .sequencer()
                    .record_answer(&mut self.profile, &question, input);

                if advisor.sequencer().is_finished(&self.profile) {
                    self.finish_interview(advisor)?;
                }
            }
            SessionStage::Processing | SessionStage::Complete => {
                return Ok(Submission::Rejected);
            }
        }

        debug!(stage = ?self.stage, "Input accepted");
        Ok(Submission::Accepted)
    }

    fn finish_interview(&mut self, advisor: &Advisor) -> Result<()> {
        self.profile.save(advisor.profile_path())?;
        info!(path = %advisor.profile_path().display(), "Profile saved");
        self.say(INTERVIEW_DONE);
        self.stage = SessionStage::Processing;
        Ok(())
    }

    fn say(&mut self, content: impl Into<String>) {
        self.messages.push(Message {
            role: Speaker::Assistant,
            content: content.into(),
        });
    }

    fn hear(&mut self, content: impl Into<String>) {
        self.messages.push(Message {
            role: Speaker::User,
            content: content.into(),
        });
    }
}
