//! Question sequencer: the profile-gathering interview
//!
//! Each turn picks the first unfilled profile field, has the job seeker agent
//! word a question about it, and routes the answer into that field.

use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::agent::Agent;
use crate::config::Region;
use crate::profile::{Profile, ProfileField};
use crate::task::profile_question_task;

pub const DEFAULT_MAX_QUESTIONS: usize = 5;

/// A question tagged with the field its answer belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub field: ProfileField,
    pub text: String,
}

/// Supplies answers to interview questions
pub trait AnswerSource {
    fn answer(&mut self, question: &Question) -> Result<String>;
}

pub struct QuestionSequencer {
    agent: Arc<dyn Agent>,
    region: Region,
    max_questions: usize,
}

impl QuestionSequencer {
    pub fn new(agent: Arc<dyn Agent>, region: Region) -> Self {
        Self {
            agent,
            region,
            max_questions: DEFAULT_MAX_QUESTIONS,
        }
    }

    pub fn with_max_questions(mut self, max: usize) -> Self {
        self.max_questions = max;
        self
    }

    pub fn max_questions(&self) -> usize {
        self.max_questions
    }

    /// Question budget used up, or nothing left to ask
    pub fn is_finished(&self, profile: &Profile) -> bool {
        profile.conversation.len() >= self.max_questions || profile.is_complete()
    }

    /// Word the next question, or `None` once the interview is over
    pub async fn next_question(&self, profile: &Profile) -> Result<Option<Question>> {
        if self.is_finished(profile) {
            return Ok(None);
        }
        let Some(field) = profile.missing_fields().first().copied() else {
            return Ok(None);
        };

        let task = profile_question_task(profile, field, &self.region);
        let raw = self.agent.execute(&task).await?;
        let text = clean_question(&raw);
        if text.is_empty() {
            anyhow::bail!("Agent returned an empty question for {}", field);
        }

        match ProfileField::detect(&text) {
            Some(detected) if detected == field => {}
            detected => warn!(
                target_field = %field,
                detected = ?detected,
                "Generated question may not be about its target field"
            ),
        }

        debug!(field = %field, "Next question ready");
        Ok(Some(Question { field, text }))
    }

    /// Route an answer into the profile and log the exchange
    pub fn record_answer(&self, profile: &mut Profile, question: &Question, answer: &str) {
        profile.apply_answer(question.field, answer);
        profile.record(question.text.clone(), answer);
        info!(
            field = %question.field,
            answered = profile.conversation.len(),
            max = self.max_questions,
            "Answer recorded"
        );
    }

    /// Run the whole interview against an answer source
    pub async fn run<A: AnswerSource>(&self, profile: &mut Profile, answers: &mut A) -> Result<()> {
        while let Some(question) = self.next_question(profile).await? {
            let answer = answers.answer(&question)?;
            self.record_answer(profile, &question, &answer);
        }
        Ok(())
    }
}

/// Trim model chatter around a question
fn clean_question(raw: &str) -> String {
    let mut text = raw.trim();

    for label in ["Question:", "**Question:**"] {
        if let Some(rest) = text.strip_prefix(label) {
            text = rest.trim();
        }
    }

    for (open, close) in [('"', '"'), ('\'', '\''), ('“', '”')] {
        if text.len() >= 2 && text.starts_with(open) && text.ends_with(close) {
            text = text[open.len_utf8()..text.len() - close.len_utf8()].trim();
        }
    }

    text.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::testing::{CallLog, ScriptedAgent};
    use crate::agent::AgentRole;
    use std::collections::VecDeque;

    struct QueuedAnswers(VecDeque<&'static str>);

    impl AnswerSource for QueuedAnswers {
        fn answer(&mut self, _question: &Question) -> Result<String> {
            self.0
                .pop_front()
                .map(String::from)
                .ok_or_else(|| anyhow::anyhow!("out of answers"))
        }
    }

    fn sequencer(agent: ScriptedAgent) -> QuestionSequencer {
        QuestionSequencer::new(Arc::new(agent), Region::default())
    }

    #[test]
    fn test_clean_question() {
        assert_eq!(clean_question("  \"What is your salary?\" \n"), "What is your salary?");
        assert_eq!(
            clean_question("Question: Which industry do you prefer?"),
            "Which industry do you prefer?"
        );
        assert_eq!(clean_question("“What role?”"), "What role?");
        assert_eq!(clean_question("\""), "\"");
    }

    #[tokio::test]
    async fn test_five_question_interview() {
        let log = CallLog::default();
        let agent = ScriptedAgent::new(AgentRole::JobSeeker, log.clone())
            .reply("What technical skills do you have, and how proficient are you?")
            .reply("How many years of experience do you have?")
            .reply("What is your highest education qualification?")
            .reply("Which job roles interest you most?")
            .reply("Which industry would you like to work in?");
        let seq = sequencer(agent);

        let mut profile = Profile::new("Software developer");
        let mut answers = QueuedAnswers(
            vec![
                "Python (advanced), SQL, Excel",
                "3 years",
                "BSc in IT",
                "Backend Engineer, Data Engineer",
                "Fintech",
                "unused",
            ]
            .into(),
        );

        seq.run(&mut profile, &mut answers).await.unwrap();

        assert_eq!(profile.conversation.len(), 5);
        assert_eq!(log.lock().unwrap().len(), 5);
        assert_eq!(
            profile.technical_skills,
            vec!["Python (advanced)", "SQL", "Excel"]
        );
        assert_eq!(profile.skill_levels.get("Python").map(String::as_str), Some("advanced"));
        assert_eq!(profile.years_of_experience.as_deref(), Some("3 years"));
        assert_eq!(profile.preferred_roles, vec!["Backend Engineer", "Data Engineer"]);
        assert_eq!(profile.industry_preference.as_deref(), Some("Fintech"));
        // budget exhausted before salary was asked
        assert!(profile.salary_expectation.is_none());
        assert_eq!(answers.0.len(), 1);
    }

    #[tokio::test]
    async fn test_one_entry_per_turn() {
        let log = CallLog::default();
        let agent = ScriptedAgent::new(AgentRole::JobSeeker, log)
            .reply("What technical skills do you have?")
            .reply("How much experience do you have?");
        let seq = sequencer(agent).with_max_questions(2);

        let mut profile = Profile::default();
        let q = seq.next_question(&profile).await.unwrap().unwrap();
        assert_eq!(q.field, ProfileField::TechnicalSkills);
        seq.record_answer(&mut profile, &q, "Rust");
        assert_eq!(profile.conversation.len(), 1);

        let q = seq.next_question(&profile).await.unwrap().unwrap();
        assert_eq!(q.field, ProfileField::YearsOfExperience);
        seq.record_answer(&mut profile, &q, "2");
        assert_eq!(profile.conversation.len(), 2);

        assert!(seq.is_finished(&profile));
        assert!(seq.next_question(&profile).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_stops_when_profile_complete() {
        let log = CallLog::default();
        let agent = ScriptedAgent::new(AgentRole::JobSeeker, log.clone());
        let seq = sequencer(agent);

        let mut profile = Profile::default();
        for field in ProfileField::ALL {
            profile.apply_answer(field, "known");
        }

        assert!(seq.next_question(&profile).await.unwrap().is_none());
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_routes_by_tag_not_wording() {
        let log = CallLog::default();
        // wording mentions "role" but the tag says salary
        let agent = ScriptedAgent::new(AgentRole::JobSeeker, log)
            .reply("For that role, what monthly pay would you expect?");
        let seq = sequencer(agent);

        let mut profile = Profile::default();
        for field in &ProfileField::ALL[..5] {
            profile.apply_answer(*field, "known");
        }

        let q = seq.next_question(&profile).await.unwrap().unwrap();
        assert_eq!(q.field, ProfileField::SalaryExpectation);
        seq.record_answer(&mut profile, &q, "200,000 LKR");
        assert_eq!(profile.salary_expectation.as_deref(), Some("200,000 LKR"));
        assert_eq!(profile.preferred_roles, vec!["known"]);
    }

    #[tokio::test]
    async fn test_agent_failure_is_fatal() {
        let log = CallLog::default();
        let agent = ScriptedAgent::new(AgentRole::JobSeeker, log).fail("network down");
        let seq = sequencer(agent);

        let mut profile = Profile::default();
        let mut answers = QueuedAnswers(VecDeque::new());
        let err = seq.run(&mut profile, &mut answers).await.unwrap_err();
        assert!(err.to_string().contains("network down"));
        assert!(profile.conversation.is_empty());
    }

    #[tokio::test]
    async fn test_empty_question_is_error() {
        let log = CallLog::default();
        let agent = ScriptedAgent::new(AgentRole::JobSeeker, log).reply("  \"\"  ");
        let seq = sequencer(agent);
        let err = seq.next_question(&Profile::default()).await.unwrap_err();
        assert!(err.to_string().contains("empty question"));
    }
}
