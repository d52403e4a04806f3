//! TOML configuration for the grantmap binary.
//!
//! The `[api]` section is required (the scoring backend has no sensible
//! default) while every `[pipeline]` key is an optional override of the
//! built-in tuning.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use grantmap_judge::JudgeConfig;
use grantmap_pipeline::PipelineConfig;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct FileConfig {
    api: JudgeConfig,
    #[serde(default)]
    pipeline: PipelineSection,
}

/// Optional overrides for [`PipelineConfig`].
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PipelineSection {
    batch_size: Option<usize>,
    max_candidates: Option<usize>,
    call_delay_secs: Option<u64>,
    backoff_secs: Option<u64>,
    max_backoffs: Option<u32>,
    progress_path: Option<PathBuf>,
    checkpoint_path: Option<PathBuf>,
    results_path: Option<PathBuf>,
}

impl PipelineSection {
    fn into_pipeline_config(self) -> PipelineConfig {
        let mut config = PipelineConfig::default();
        if let Some(v) = self.batch_size {
            config.batch_size = v;
        }
        if let Some(v) = self.max_candidates {
            config.max_candidates = v;
        }
        if let Some(secs) = self.call_delay_secs {
            config.call_delay = Duration::from_secs(secs);
        }
        if let Some(secs) = self.backoff_secs {
            config.backoff = Duration::from_secs(secs);
        }
        if let Some(v) = self.max_backoffs {
            config.max_backoffs = v;
        }
        if let Some(v) = self.progress_path {
            config.progress_path = v;
        }
        if let Some(v) = self.checkpoint_path {
            config.checkpoint_path = v;
        }
        if let Some(v) = self.results_path {
            config.results_path = v;
        }
        config
    }
}

/// Fully-resolved application configuration.
pub struct AppConfig {
    pub judge: JudgeConfig,
    pub pipeline: PipelineConfig,
}

impl AppConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = fs::read_to_string(path)?;
        let file: FileConfig = toml::from_str(&raw)?;
        Ok(Self {
            judge: file.api,
            pipeline: file.pipeline.into_pipeline_config(),
        })
    }
}
