//! Queued Recommendation Source
//!
//! Hands out a fixed list of recommendations in order. The CLI loads the
//! list from a JSON file (an array of recommendations, or an object with a
//! `recommendations` array); tests build it in memory.

use std::collections::VecDeque;
use std::path::Path;

use async_trait::async_trait;
use refine_core::{CoreError, CoreResult, Recommendation, RecommendationSource};
use serde::Deserialize;
use tracing::debug;

#[derive(Deserialize)]
#[serde(untagged)]
enum RecommendationFile {
    List(Vec<Recommendation>),
    Wrapped { recommendations: Vec<Recommendation> },
}

#[derive(Debug, Clone, Default)]
pub struct QueueRecommendationSource {
    queue: VecDeque<Recommendation>,
}

impl QueueRecommendationSource {
    pub fn from_vec(recommendations: Vec<Recommendation>) -> Self {
        Self {
            queue: recommendations.into(),
        }
    }

    pub fn from_json(json: &str) -> CoreResult<Self> {
        let parsed: RecommendationFile = serde_json::from_str(json)
            .map_err(|e| CoreError::parse(format!("Invalid recommendations file: {}", e)))?;
        let recommendations = match parsed {
            RecommendationFile::List(list) => list,
            RecommendationFile::Wrapped { recommendations } => recommendations,
        };
        Ok(Self::from_vec(recommendations))
    }

    pub fn from_file(path: &Path) -> CoreResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn remaining(&self) -> usize {
        self.queue.len()
    }
}

#[async_trait]
impl RecommendationSource for QueueRecommendationSource {
    async fn next_recommendation(
        &mut self,
        context_summary: &str,
    ) -> CoreResult<Option<Recommendation>> {
        debug!(
            remaining = self.queue.len(),
            context_len = context_summary.len(),
            "Next queued recommendation"
        );
        Ok(self.queue.pop_front())
    }
}
