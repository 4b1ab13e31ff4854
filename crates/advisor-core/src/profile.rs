//! User profile store
//!
//! The profile is filled one interview answer at a time and persisted as
//! indented JSON once the interview is over.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

/// Default file the profile is written to
pub const DEFAULT_PROFILE_PATH: &str = "user_profile.json";

/// A single interview exchange. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QaPair {
    pub question: String,
    pub answer: String,
}

/// Structured description of the user built from interview answers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub initial_description: String,
    #[serde(default)]
    pub technical_skills: Vec<String>,
    #[serde(default)]
    pub skill_levels: BTreeMap<String, String>,
    #[serde(default)]
    pub years_of_experience: Option<String>,
    #[serde(default)]
    pub education: Option<String>,
    #[serde(default)]
    pub preferred_roles: Vec<String>,
    #[serde(default)]
    pub industry_preference: Option<String>,
    #[serde(default)]
    pub salary_expectation: Option<String>,
    #[serde(default)]
    pub conversation: Vec<QaPair>,
}

/// Profile field an interview question targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileField {
    TechnicalSkills,
    YearsOfExperience,
    Education,
    PreferredRoles,
    IndustryPreference,
    SalaryExpectation,
}

impl ProfileField {
    /// Interview order. Also the keyword precedence used by [`ProfileField::detect`].
    pub const ALL: [ProfileField; 6] = [
        ProfileField::TechnicalSkills,
        ProfileField::YearsOfExperience,
        ProfileField::Education,
        ProfileField::PreferredRoles,
        ProfileField::IndustryPreference,
        ProfileField::SalaryExpectation,
    ];

    /// Keyword looked for in question text
    pub fn keyword(&self) -> &'static str {
        match self {
            ProfileField::TechnicalSkills => "technical skills",
            ProfileField::YearsOfExperience => "experience",
            ProfileField::Education => "education",
            ProfileField::PreferredRoles => "role",
            ProfileField::IndustryPreference => "industry",
            ProfileField::SalaryExpectation => "salary",
        }
    }

    /// What the question should ask about, phrased for a prompt
    pub fn topic(&self, currency: &str) -> String {
        match self {
            ProfileField::TechnicalSkills => {
                "their technical skills and proficiency level in each".to_string()
            }
            ProfileField::YearsOfExperience => "their years of professional experience".to_string(),
            ProfileField::Education => "their education and qualifications".to_string(),
            ProfileField::PreferredRoles => "the job roles they would prefer".to_string(),
            ProfileField::IndustryPreference => "the industry they prefer to work in".to_string(),
            ProfileField::SalaryExpectation => {
                format!("their expected salary range in {}", currency)
            }
        }
    }

    /// Whether answers are split on commas into a list
    pub fn is_list(&self) -> bool {
        matches!(
            self,
            ProfileField::TechnicalSkills | ProfileField::PreferredRoles
        )
    }

    /// Guess the target field from free question text.
    ///
    /// Case-insensitive substring match, first keyword in [`ProfileField::ALL`] order wins.
    pub fn detect(question: &str) -> Option<ProfileField> {
        let lower = question.to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|field| lower.contains(field.keyword()))
    }
}

impl fmt::Display for ProfileField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProfileField::TechnicalSkills => "technical_skills",
            ProfileField::YearsOfExperience => "years_of_experience",
            ProfileField::Education => "education",
            ProfileField::PreferredRoles => "preferred_roles",
            ProfileField::IndustryPreference => "industry_preference",
            ProfileField::SalaryExpectation => "salary_expectation",
        };
        write!(f, "{}", name)
    }
}

impl Profile {
    /// Create an empty profile seeded with the user's own description
    pub fn new(initial_description: impl Into<String>) -> Self {
        Self {
            initial_description: initial_description.into(),
            ..Default::default()
        }
    }

    /// Whether a field holds a non-blank value
    pub fn is_filled(&self, field: ProfileField) -> bool {
        fn present(value: &Option<String>) -> bool {
            value.as_deref().map_or(false, |v| !v.trim().is_empty())
        }

        match field {
            ProfileField::TechnicalSkills => !self.technical_skills.is_empty(),
            ProfileField::YearsOfExperience => present(&self.years_of_experience),
            ProfileField::Education => present(&self.education),
            ProfileField::PreferredRoles => !self.preferred_roles.is_empty(),
            ProfileField::IndustryPreference => present(&self.industry_preference),
            ProfileField::SalaryExpectation => present(&self.salary_expectation),
        }
    }

    /// Interview fields still empty, in interview order
    pub fn missing_fields(&self) -> Vec<ProfileField> {
        ProfileField::ALL
            .iter()
            .copied()
            .filter(|f| !self.is_filled(*f))
            .collect()
    }

    /// All interview fields are filled
    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }

    /// Write an answer into the field it belongs to.
    ///
    /// Scalar fields keep the answer verbatim. List fields are split on commas
    /// and keep each trimmed item as typed; a "Python (advanced)" item also
    /// records a level under "Python".
    pub fn apply_answer(&mut self, field: ProfileField, answer: &str) {
        if field.is_list() {
            let items = split_list(answer);
            match field {
                ProfileField::TechnicalSkills => {
                    for item in &items {
                        if let Some((name, level)) = skill_level(item) {
                            self.skill_levels.insert(name, level);
                        }
                    }
                    self.technical_skills = items;
                }
                _ => self.preferred_roles = items,
            }
            return;
        }

        let value = Some(answer.to_string());
        match field {
            ProfileField::YearsOfExperience => self.years_of_experience = value,
            ProfileField::Education => self.education = value,
            ProfileField::IndustryPreference => self.industry_preference = value,
            _ => self.salary_expectation = value,
        }
    }

    /// Append an exchange to the transcript
    pub fn record(&mut self, question: impl Into<String>, answer: impl Into<String>) {
        self.conversation.push(QaPair {
            question: question.into(),
            answer: answer.into(),
        });
    }

    /// Pretty JSON, as embedded in prompts and written to disk
    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize profile")
    }

    /// Save as indented JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let content = self.to_json_pretty()?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write profile to {}", path.display()))
    }

    /// Load a previously saved profile
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read profile from {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse profile from {}", path.display()))
    }
}

fn split_list(answer: &str) -> Vec<String> {
    answer
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Level annotation of a skill item, e.g. "Python (advanced)"
fn skill_level(item: &str) -> Option<(String, String)> {
    let (name, level) = item.strip_suffix(')')?.rsplit_once('(')?;
    let (name, level) = (name.trim(), level.trim());
    if name.is_empty() || level.is_empty() {
        return None;
    }
    Some((name.to_string(), level.to_string()))
}
