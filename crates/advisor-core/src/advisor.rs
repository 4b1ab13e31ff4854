//! Wiring of the sequencer and dispatcher shared by both front ends

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::{AdvisorConfig, Credentials, Region};
use crate::crew::Crew;
use crate::dispatcher::TaskDispatcher;
use crate::interview::QuestionSequencer;

/// Everything a run needs besides the profile itself
pub struct Advisor {
    sequencer: QuestionSequencer,
    dispatcher: TaskDispatcher,
    region: Region,
    profile_path: PathBuf,
}

impl Advisor {
    pub fn new(crew: Crew, region: Region, max_questions: usize, profile_path: PathBuf) -> Self {
        let sequencer = QuestionSequencer::new(Arc::clone(&crew.job_seeker), region.clone())
            .with_max_questions(max_questions);
        let dispatcher = TaskDispatcher::new(crew, region.clone());

        Self {
            sequencer,
            dispatcher,
            region,
            profile_path,
        }
    }

    pub fn from_config(config: &AdvisorConfig, credentials: &Credentials) -> Result<Self> {
        let crew = Crew::from_config(config, credentials)?;
        Ok(Self::new(
            crew,
            config.region(),
            config.interview.max_questions,
            config.output.profile_path.clone(),
        ))
    }

    pub fn sequencer(&self) -> &QuestionSequencer {
        &self.sequencer
    }

    pub fn dispatcher(&self) -> &TaskDispatcher {
        &self.dispatcher
    }

    pub fn region(&self) -> &Region {
        &self.region
    }

    /// Where the finished profile is written
    pub fn profile_path(&self) -> &Path {
        &self.profile_path
    }
}
