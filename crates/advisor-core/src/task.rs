//! Task descriptions handed to agents

use crate::agent::AgentRole;
use crate::config::Region;
use crate::profile::{Profile, ProfileField};

const CONTEXT_SEPARATOR: &str = "\n\n----------\n\n";

/// An instruction plus expected-output hint for one agent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub description: String,
    pub expected_output: String,
    pub agent: AgentRole,
    /// Raw outputs of earlier stages
    pub context: Vec<String>,
}

impl Task {
    pub fn new(
        description: impl Into<String>,
        expected_output: impl Into<String>,
        agent: AgentRole,
    ) -> Self {
        Self {
            description: description.into(),
            expected_output: expected_output.into(),
            agent,
            context: Vec::new(),
        }
    }

    pub fn with_context(mut self, output: impl Into<String>) -> Self {
        self.context.push(output.into());
        self
    }

    /// Full user prompt sent to the model
    pub fn prompt(&self) -> String {
        let mut prompt = format!(
            "{}\n\nThis is the expected criteria for your final answer: {}\n\
             You MUST return the actual complete content as the final answer, not a summary.",
            self.description.trim(),
            self.expected_output
        );

        if !self.context.is_empty() {
            prompt.push_str("\n\nThis is the context you're working with:\n");
            prompt.push_str(&self.context.join(CONTEXT_SEPARATOR));
        }

        prompt
    }
}

fn profile_json(profile: &Profile) -> String {
    profile
        .to_json_pretty()
        .unwrap_or_else(|_| format!("{:?}", profile))
}

fn or_unspecified(value: &Option<String>) -> &str {
    value
        .as_deref()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or("Not specified")
}

fn list_or_unspecified(items: &[String]) -> String {
    if items.is_empty() {
        "Not specified".to_string()
    } else {
        items.join(", ")
    }
}

/// Ask the job seeker agent to word the next interview question
pub fn profile_question_task(profile: &Profile, field: ProfileField, region: &Region) -> Task {
    let conversation = profile
        .conversation
        .iter()
        .map(|qa| format!("Q: {}\nA: {}", qa.question, qa.answer))
        .collect::<Vec<_>>()
        .join("\n");

    let description = format!(
        "You are interviewing someone looking for work in the {region} job market.\n\
         Based on the profile so far:\n{profile}\n\n\
         Previous conversation:\n{conversation}\n\n\
         Ask ONE clear question about {topic}.\n\
         Be specific and direct. Do not ask about anything already answered.\n\
         Reply with the question only.",
        region = region.name,
        profile = profile_json(profile),
        conversation = if conversation.is_empty() {
            "(none yet)".to_string()
        } else {
            conversation
        },
        topic = field.topic(&region.currency),
    );

    Task::new(
        description,
        "A single clear question about missing profile information",
        AgentRole::JobSeeker,
    )
}

/// Stage one: find matching job opportunities
pub fn job_search_task(profile: &Profile, region: &Region) -> Task {
    let description = format!(
        "Analyze job opportunities in {region} matching:\n\
         - Skills: {skills}\n\
         - Experience: {experience}\n\
         - Education: {education}\n\
         - Location preferences: Not specified\n\
         - Preferred roles: {roles}\n\
         - Industry preference: {industry}\n\
         About the candidate: {about}\n\
         Consider both local and foreign employment opportunities.\n\
         Focus on economically stable sectors in the current market.",
        region = region.name,
        skills = list_or_unspecified(&profile.technical_skills),
        experience = or_unspecified(&profile.years_of_experience),
        education = or_unspecified(&profile.education),
        roles = list_or_unspecified(&profile.preferred_roles),
        industry = or_unspecified(&profile.industry_preference),
        about = if profile.initial_description.trim().is_empty() {
            "Not specified"
        } else {
            profile.initial_description.trim()
        },
    );

    Task::new(
        description,
        "A detailed list of suitable job opportunities with requirements and prospects",
        AgentRole::JobSeeker,
    )
}

/// Stage two: labor market conditions
pub fn market_analysis_task(profile: &Profile, region: &Region) -> Task {
    let description = format!(
        "Analyze {region} market conditions:\n\
         - Growth sectors during economic recovery\n\
         - Salary ranges in local currency ({currency})\n\
         - Foreign employment opportunities\n\
         - Skills in demand locally and internationally\n\
         Pay particular attention to demand for: {skills}\n\
         Recommend the best path forward considering the current economic situation.",
        region = region.name,
        currency = region.currency,
        skills = list_or_unspecified(&profile.technical_skills),
    );

    Task::new(
        description,
        "Comprehensive market analysis with growth sectors and opportunities",
        AgentRole::MarketAnalyst,
    )
}

/// Stage three: synthesize the recommendation report
pub fn final_recommendation_task(profile: &Profile, region: &Region, market_analysis: &str) -> Task {
    let description = format!(
        "Create a detailed career recommendation for the {region} job market considering:\n\
         1. Candidate profile and skills:\n{profile}\n\
         2. Market analysis findings:\n{market_analysis}\n\
         3. Economic stability of the recommended path\n\
         4. Growth potential in the next 2-3 years\n\n\
         Format the output in markdown with:\n\
         - Recommended career path\n\
         - Required upskilling\n\
         - Salary expectations ({currency})\n\
         - Growth roadmap\n\
         - Alternative options",
        region = region.name,
        profile = profile_json(profile),
        market_analysis = market_analysis,
        currency = region.currency,
    );

    Task::new(
        description,
        "Detailed career recommendation report in markdown format",
        AgentRole::Employer,
    )
}
