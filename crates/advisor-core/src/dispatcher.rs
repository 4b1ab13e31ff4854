//! Task dispatcher: the three-stage career analysis pipeline
//!
//! Stages run one at a time in a fixed order. Each stage's raw output is
//! passed to the next; any failure aborts the rest.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::{info, instrument};

use crate::config::Region;
use crate::crew::Crew;
use crate::profile::Profile;
use crate::task::{final_recommendation_task, job_search_task, market_analysis_task, Task};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    JobSearch,
    MarketAnalysis,
    FinalRecommendation,
}

impl Stage {
    pub const ALL: [Stage; 3] = [
        Stage::JobSearch,
        Stage::MarketAnalysis,
        Stage::FinalRecommendation,
    ];

    /// Status line shown while the stage runs
    pub fn status(&self) -> &'static str {
        match self {
            Stage::JobSearch => "Job Seeker Agent analyzing profile...",
            Stage::MarketAnalysis => "Market Intelligence Agent analyzing conditions...",
            Stage::FinalRecommendation => "Employer Agent creating final recommendations...",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::JobSearch => "job search",
            Stage::MarketAnalysis => "market analysis",
            Stage::FinalRecommendation => "final recommendation",
        };
        write!(f, "{}", name)
    }
}

/// Outputs of all three stages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CareerReport {
    pub region: String,
    pub job_search: String,
    pub market_analysis: String,
    pub recommendation: String,
    pub generated_at: DateTime<Utc>,
}

impl CareerReport {
    pub fn heading(&self) -> String {
        format!("=== Career Recommendation for {} Job Market ===", self.region)
    }

    /// Markdown document with every stage's findings
    pub fn to_markdown(&self) -> String {
        format!(
            "# Career Recommendation: {region} Job Market\n\n\
             _Generated {date}_\n\n\
             ## Recommendation\n\n{recommendation}\n\n\
             ## Market Analysis\n\n{market}\n\n\
             ## Job Opportunities\n\n{jobs}\n",
            region = self.region,
            date = self.generated_at.format("%Y-%m-%d %H:%M UTC"),
            recommendation = self.recommendation,
            market = self.market_analysis,
            jobs = self.job_search,
        )
    }

    pub fn save_markdown(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        fs::write(path, self.to_markdown())
            .with_context(|| format!("Failed to write report to {}", path.display()))
    }
}

pub struct TaskDispatcher {
    crew: Crew,
    region: Region,
}

impl TaskDispatcher {
    pub fn new(crew: Crew, region: Region) -> Self {
        Self { crew, region }
    }

    pub fn crew(&self) -> &Crew {
        &self.crew
    }

    pub async fn dispatch(&self, profile: &Profile) -> Result<CareerReport> {
        self.dispatch_with(profile, |_| {}).await
    }

    /// Run all stages, calling `on_stage` as each one starts
    #[instrument(skip_all, fields(region = %self.region.name))]
    pub async fn dispatch_with<F>(&self, profile: &Profile, mut on_stage: F) -> Result<CareerReport>
    where
        F: FnMut(Stage),
    {
        on_stage(Stage::JobSearch);
        let job_search = self
            .run_stage(Stage::JobSearch, job_search_task(profile, &self.region))
            .await?;

        on_stage(Stage::MarketAnalysis);
        let market_task = market_analysis_task(profile, &self.region).with_context(job_search.clone());
        let market_analysis = self.run_stage(Stage::MarketAnalysis, market_task).await?;

        on_stage(Stage::FinalRecommendation);
        let final_task = final_recommendation_task(profile, &self.region, &market_analysis)
            .with_context(job_search.clone());
        let recommendation = self
            .run_stage(Stage::FinalRecommendation, final_task)
            .await?;

        Ok(CareerReport {
            region: self.region.name.clone(),
            job_search,
            market_analysis,
            recommendation,
            generated_at: Utc::now(),
        })
    }

    async fn run_stage(&self, stage: Stage, task: Task) -> Result<String> {
        let agent = self.crew.agent(task.agent);
        info!(%stage, agent = %task.agent, "Stage started");
        let output = agent
            .execute(&task)
            .await
            .with_context(|| format!("{} stage failed", stage))?;
        info!(%stage, output_len = output.len(), "Stage finished");
        Ok(output)
    }
}
