//! The batch/checkpoint/resume state machine.
//!
//! States: Fresh → Processing(batch) → {BatchComplete → Processing(batch+1)
//! | RateLimited → pause → Processing(batch)} → … → RunComplete, with
//! Resuming in place of Fresh when a progress document exists on disk.

use grantmap_core::{BestMatch, Grant, Publication, select_candidates};
use grantmap_judge::{Judge, JudgeOutcome};
use grantmap_store::{ProgressStore, ResultRow, ResultTable, RunProgress, StoreError};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::PipelineConfig;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Counters reported after every batch, on pause, and at the end of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub total_publications: usize,
    pub processed_count: usize,
    pub mapped_count: usize,
    pub api_calls_made: usize,
    pub api_calls_failed: usize,
}

impl RunSummary {
    fn from_progress(progress: &RunProgress) -> Self {
        Self {
            total_publications: progress.total_publications,
            processed_count: progress.processed_count,
            mapped_count: progress.mapped_count,
            api_calls_made: progress.api_calls_made,
            api_calls_failed: progress.api_calls_failed,
        }
    }

    /// Share of processed publications that were mapped to a grant, in
    /// percent.
    pub fn mapping_rate(&self) -> f64 {
        if self.processed_count == 0 {
            0.0
        } else {
            self.mapped_count as f64 / self.processed_count as f64 * 100.0
        }
    }

    /// Share of external calls that were answered, in percent.
    pub fn api_success_rate(&self) -> f64 {
        let made = self.api_calls_made.max(1);
        (self.api_calls_made - self.api_calls_failed) as f64 / made as f64 * 100.0
    }
}

/// Terminal state of one coordinator invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every publication processed; progress and checkpoint stores removed.
    Complete(RunSummary),
    /// Rate limiting outlasted the retry budget; both stores were left on
    /// disk so a later invocation can resume.
    Paused(RunSummary),
}

/// Outcome of processing one publication.
enum PubOutcome {
    Done { row: ResultRow, mapped: bool },
    /// A judge call hit the rate limit; nothing for this publication was
    /// recorded and it must be retried from scratch.
    RateLimited,
}

/// Drives the end-to-end run: candidate selection, judgment, best-match
/// aggregation, and durable progress, one publication at a time, strictly
/// in input order.
pub struct BatchCoordinator<J> {
    config: PipelineConfig,
    judge: J,
    progress_store: ProgressStore,
    checkpoint: ResultTable,
    results: ResultTable,
}

impl<J: Judge> BatchCoordinator<J> {
    pub fn new(config: PipelineConfig, judge: J) -> Self {
        let progress_store = ProgressStore::new(&config.progress_path);
        let checkpoint = ResultTable::new(&config.checkpoint_path);
        let results = ResultTable::new(&config.results_path);
        Self {
            config,
            judge,
            progress_store,
            checkpoint,
            results,
        }
    }

    /// Run the pipeline over the full inputs, resuming from persisted
    /// progress when present.
    pub async fn run(
        &self,
        grants: &[Grant],
        publications: &[Publication],
    ) -> Result<RunOutcome, PipelineError> {
        let mut progress = match self.progress_store.load()? {
            Some(progress) => {
                info!(
                    processed = progress.processed_count,
                    total = progress.total_publications,
                    batch = progress.batch_number,
                    "resuming previous run"
                );
                if !self.results.exists() {
                    self.results.init()?;
                }
                self.recover_checkpoint()?;
                progress
            }
            None => {
                info!(
                    publications = publications.len(),
                    grants = grants.len(),
                    "starting fresh run"
                );
                self.results.init()?;
                RunProgress::fresh(publications.len())
            }
        };

        // Absolute input index of the next unprocessed publication.
        // Processing order equals input order; resumption depends on it.
        let mut cursor = progress.processed_count;

        while cursor < publications.len() {
            let batch_end = (cursor + self.config.batch_size).min(publications.len());
            info!(
                batch = progress.batch_number,
                from = cursor + 1,
                to = batch_end,
                total = publications.len(),
                "processing batch"
            );

            let mut batch_rows: Vec<ResultRow> = Vec::with_capacity(batch_end - cursor);
            let mut checkpointed = 0usize;
            let mut consecutive_backoffs = 0u32;
            let mut position = cursor;

            while position < batch_end {
                let publication = &publications[position];
                match self
                    .process_publication(publication, grants, &mut progress)
                    .await
                {
                    PubOutcome::Done { row, mapped } => {
                        progress.processed_count += 1;
                        if mapped {
                            progress.mapped_count += 1;
                        }
                        progress.last_processed_index = position as i64;
                        batch_rows.push(row);
                        position += 1;
                        consecutive_backoffs = 0;
                    }
                    PubOutcome::RateLimited => {
                        // Stop the batch at once: persist counters and the
                        // rows completed so far, then back off. The
                        // interrupted publication stays unprocessed and is
                        // re-evaluated after the pause.
                        progress.last_processed_index = position as i64;
                        self.checkpoint.append(&batch_rows[checkpointed..])?;
                        checkpointed = batch_rows.len();
                        self.progress_store.save(&progress)?;
                        warn!(
                            processed = progress.processed_count,
                            total = progress.total_publications,
                            interrupted_at = position,
                            "rate limited; batch paused"
                        );

                        consecutive_backoffs += 1;
                        if consecutive_backoffs > self.config.max_backoffs {
                            let summary = RunSummary::from_progress(&progress);
                            info!(
                                processed = summary.processed_count,
                                total = summary.total_publications,
                                mapped = summary.mapped_count,
                                api_calls = summary.api_calls_made,
                                "retry budget exhausted; run paused with stores intact"
                            );
                            return Ok(RunOutcome::Paused(summary));
                        }
                        info!(
                            backoff_secs = self.config.backoff.as_secs(),
                            attempt = consecutive_backoffs,
                            "backing off before retrying the batch"
                        );
                        tokio::time::sleep(self.config.backoff).await;
                    }
                }
            }

            // BatchComplete: the cumulative results gain the whole batch,
            // so any checkpoint rows for it are now redundant.
            self.results.append(&batch_rows)?;
            self.checkpoint.delete()?;
            progress.batch_number += 1;
            self.progress_store.save(&progress)?;

            let summary = RunSummary::from_progress(&progress);
            info!(
                processed = summary.processed_count,
                total = summary.total_publications,
                mapped = summary.mapped_count,
                mapping_rate = %format_args!("{:.1}%", summary.mapping_rate()),
                api_success_rate = %format_args!("{:.1}%", summary.api_success_rate()),
                "batch complete"
            );

            cursor = batch_end;
        }

        // RunComplete: the stores exist only to support resumption.
        self.progress_store.delete()?;
        self.checkpoint.delete()?;
        let summary = RunSummary::from_progress(&progress);
        info!(
            processed = summary.processed_count,
            mapped = summary.mapped_count,
            api_calls = summary.api_calls_made,
            "run complete"
        );
        Ok(RunOutcome::Complete(summary))
    }

    /// Resolve one publication: select candidates, judge each in ranked
    /// order, and fold the answers down to the best match.
    async fn process_publication(
        &self,
        publication: &Publication,
        grants: &[Grant],
        progress: &mut RunProgress,
    ) -> PubOutcome {
        let candidates = select_candidates(publication, grants, self.config.max_candidates);
        if candidates.is_empty() {
            debug!(title = %publication.title, "no candidates after pre-filtering");
            return PubOutcome::Done {
                row: ResultRow::from_publication(publication, None),
                mapped: false,
            };
        }

        let mut best = BestMatch::new();
        for candidate in &candidates {
            let (judgment, outcome) = self.judge.judge(publication, candidate).await;
            progress.api_calls_made += 1;
            match outcome {
                JudgeOutcome::RateLimited => {
                    progress.api_calls_failed += 1;
                    return PubOutcome::RateLimited;
                }
                JudgeOutcome::Answered => best.offer(judgment),
            }
            if !self.config.call_delay.is_zero() {
                tokio::time::sleep(self.config.call_delay).await;
            }
        }

        let best = best.into_best();
        let mapped = best.is_some();
        PubOutcome::Done {
            row: ResultRow::from_publication(publication, best.as_ref()),
            mapped,
        }
    }

    /// Rows from a batch interrupted by a crash or pause live only in the
    /// checkpoint; fold them into the results table before continuing so
    /// the final cleanup cannot drop them.
    fn recover_checkpoint(&self) -> Result<(), StoreError> {
        let rows = self.checkpoint.read_all()?;
        if rows.is_empty() {
            return Ok(());
        }
        info!(rows = rows.len(), "recovering checkpointed rows from an interrupted batch");
        self.results.append(&rows)?;
        self.checkpoint.delete()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::NaiveDate;
    use grantmap_core::{CandidateGrant, Confidence, Judgment};
    use tempfile::tempdir;

    /// Deterministic judge: confidence per (publication title, grant code),
    /// with an optional set of 1-based call ordinals that answer 429.
    struct ScriptedJudge {
        calls: AtomicUsize,
        rate_limited_calls: Vec<usize>,
        confidences: HashMap<(String, String), Confidence>,
    }

    impl ScriptedJudge {
        fn new(confidences: HashMap<(String, String), Confidence>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                rate_limited_calls: Vec::new(),
                confidences,
            }
        }

        fn rate_limited_on(mut self, calls: &[usize]) -> Self {
            self.rate_limited_calls = calls.to_vec();
            self
        }

        fn calls_made(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Judge for ScriptedJudge {
        async fn judge(
            &self,
            publication: &Publication,
            candidate: &CandidateGrant<'_>,
        ) -> (Judgment, JudgeOutcome) {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if self.rate_limited_calls.contains(&call) {
                let judgment = Judgment {
                    grant_title: candidate.grant.title.clone(),
                    grant_code: candidate.grant.code.clone(),
                    confidence: Confidence::Low,
                    reasoning: "Rate limit exceeded".into(),
                };
                return (judgment, JudgeOutcome::RateLimited);
            }

            let confidence = self
                .confidences
                .get(&(publication.title.clone(), candidate.grant.code.clone()))
                .copied()
                .unwrap_or(Confidence::Medium);
            let judgment = Judgment {
                grant_title: candidate.grant.title.clone(),
                grant_code: candidate.grant.code.clone(),
                confidence,
                reasoning: format!("scripted for {}", candidate.grant.code),
            };
            (judgment, JudgeOutcome::Answered)
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn grant(code: &str, investigator: &str) -> Grant {
        Grant {
            code: code.into(),
            title: format!("Grant {code}"),
            description: None,
            lead_investigator: Some(investigator.into()),
            other_investigators: vec![],
            start_date: date(2018, 1, 1),
            end_date: date(2022, 12, 31),
        }
    }

    fn publication(title: &str, author: &str) -> Publication {
        Publication {
            title: title.into(),
            year: 2020,
            authors: vec![author.into()],
            doi: None,
        }
    }

    /// Two grants sharing one investigator, so every publication by
    /// "Jane Doe" has exactly two candidates (G-1 first by input order).
    fn grants() -> Vec<Grant> {
        vec![grant("G-1", "Jane Doe"), grant("G-2", "Jane Doe")]
    }

    fn publications(n: usize) -> Vec<Publication> {
        (0..n)
            .map(|i| publication(&format!("Paper {i}"), "Jane Doe"))
            .collect()
    }

    fn test_config(dir: &std::path::Path) -> PipelineConfig {
        PipelineConfig {
            batch_size: 2,
            max_candidates: 2,
            call_delay: Duration::ZERO,
            backoff: Duration::ZERO,
            max_backoffs: 3,
            ..PipelineConfig::default()
        }
        .with_store_dir(dir)
    }

    #[tokio::test]
    async fn full_run_completes_and_cleans_up() {
        let dir = tempdir().unwrap();
        let config = test_config(dir.path());
        let mut confidences = HashMap::new();
        confidences.insert(("Paper 0".to_string(), "G-2".to_string()), Confidence::High);
        let coordinator = BatchCoordinator::new(config.clone(), ScriptedJudge::new(confidences));

        let pubs = publications(3);
        let outcome = coordinator.run(&grants(), &pubs).await.unwrap();

        let RunOutcome::Complete(summary) = &outcome else {
            panic!("expected completion, got {outcome:?}");
        };
        assert_eq!(summary.total_publications, 3);
        assert_eq!(summary.processed_count, 3);
        assert_eq!(summary.mapped_count, 3);
        // Two candidates judged per publication.
        assert_eq!(summary.api_calls_made, 6);
        assert_eq!(summary.api_calls_failed, 0);

        // Stores cleaned up on completion; results remain.
        assert!(!config.progress_path.exists());
        assert!(!config.checkpoint_path.exists());
        let rows = ResultTable::new(&config.results_path).read_all().unwrap();
        assert_eq!(rows.len(), 3);
        // Paper 0's best judgment is the High one from G-2.
        assert_eq!(rows[0].grant_code, "G-2");
        assert_eq!(rows[0].confidence, "High");
        // Default Medium everywhere else: first-seen (G-1) wins the tie.
        assert_eq!(rows[1].grant_code, "G-1");
    }

    #[tokio::test]
    async fn publication_without_candidates_is_unmapped() {
        let dir = tempdir().unwrap();
        let config = test_config(dir.path());
        let coordinator = BatchCoordinator::new(config.clone(), ScriptedJudge::new(HashMap::new()));

        let pubs = vec![publication("Unrelated paper", "John Smith")];
        let outcome = coordinator.run(&grants(), &pubs).await.unwrap();

        let RunOutcome::Complete(summary) = outcome else {
            panic!("expected completion");
        };
        assert_eq!(summary.processed_count, 1);
        assert_eq!(summary.mapped_count, 0);
        assert_eq!(summary.api_calls_made, 0);

        let rows = ResultTable::new(&config.results_path).read_all().unwrap();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].associated_grant.is_empty());
        assert!(rows[0].confidence.is_empty());
    }

    #[tokio::test]
    async fn rate_limit_recovers_in_process_with_identical_results() {
        // Reference run without interruptions.
        let reference_dir = tempdir().unwrap();
        let reference_config = test_config(reference_dir.path());
        let coordinator =
            BatchCoordinator::new(reference_config.clone(), ScriptedJudge::new(HashMap::new()));
        let pubs = publications(5);
        coordinator.run(&grants(), &pubs).await.unwrap();
        let expected = ResultTable::new(&reference_config.results_path)
            .read_all()
            .unwrap();

        // Same inputs, but call 3 (publication 1, first candidate) is rate
        // limited once; zero backoff makes the retry immediate.
        let dir = tempdir().unwrap();
        let config = test_config(dir.path());
        let judge = ScriptedJudge::new(HashMap::new()).rate_limited_on(&[3]);
        let coordinator = BatchCoordinator::new(config.clone(), judge);
        let outcome = coordinator.run(&grants(), &pubs).await.unwrap();

        let RunOutcome::Complete(summary) = outcome else {
            panic!("expected completion after in-process retry");
        };
        assert_eq!(summary.processed_count, 5);
        assert_eq!(summary.api_calls_failed, 1);
        // 10 answered calls plus the one rate-limited attempt.
        assert_eq!(summary.api_calls_made, 11);

        let rows = ResultTable::new(&config.results_path).read_all().unwrap();
        assert_eq!(rows, expected);
        assert!(!config.progress_path.exists());
        assert!(!config.checkpoint_path.exists());
    }

    #[tokio::test]
    async fn exhausted_retry_budget_pauses_with_stores_intact() {
        let dir = tempdir().unwrap();
        let mut config = test_config(dir.path());
        config.max_backoffs = 0;
        // Publication 1's first call rate-limits; with a zero retry budget
        // the run pauses immediately.
        let judge = ScriptedJudge::new(HashMap::new()).rate_limited_on(&[3]);
        let coordinator = BatchCoordinator::new(config.clone(), judge);

        let pubs = publications(4);
        let outcome = coordinator.run(&grants(), &pubs).await.unwrap();

        let RunOutcome::Paused(summary) = &outcome else {
            panic!("expected pause, got {outcome:?}");
        };
        // Only publication 0 completed; the rate-limited call must not
        // advance processed_count past it.
        assert_eq!(summary.processed_count, 1);
        assert_eq!(summary.mapped_count, 1);
        assert_eq!(summary.api_calls_failed, 1);

        let progress = ProgressStore::new(&config.progress_path)
            .load()
            .unwrap()
            .expect("progress persisted");
        assert_eq!(progress.processed_count, 1);
        assert_eq!(progress.last_processed_index, 1);
        assert_eq!(progress.batch_number, 1);

        // Completed rows of the interrupted batch are checkpointed; the
        // cumulative results hold only the header so far.
        let checkpoint_rows = ResultTable::new(&config.checkpoint_path).read_all().unwrap();
        assert_eq!(checkpoint_rows.len(), 1);
        assert_eq!(checkpoint_rows[0].title, "Paper 0");
        assert!(ResultTable::new(&config.results_path).read_all().unwrap().is_empty());
    }

    #[tokio::test]
    async fn paused_run_resumes_to_identical_results() {
        // Reference: uninterrupted run over the same inputs.
        let reference_dir = tempdir().unwrap();
        let reference_config = test_config(reference_dir.path());
        let pubs = publications(5);
        BatchCoordinator::new(reference_config.clone(), ScriptedJudge::new(HashMap::new()))
            .run(&grants(), &pubs)
            .await
            .unwrap();
        let expected = ResultTable::new(&reference_config.results_path)
            .read_all()
            .unwrap();

        // First invocation pauses mid-batch on a rate limit.
        let dir = tempdir().unwrap();
        let mut config = test_config(dir.path());
        config.max_backoffs = 0;
        let judge = ScriptedJudge::new(HashMap::new()).rate_limited_on(&[3]);
        let first = BatchCoordinator::new(config.clone(), judge)
            .run(&grants(), &pubs)
            .await
            .unwrap();
        assert!(matches!(first, RunOutcome::Paused(_)));

        // Second invocation resumes from the stores and completes.
        let judge = ScriptedJudge::new(HashMap::new());
        let second = BatchCoordinator::new(config.clone(), judge)
            .run(&grants(), &pubs)
            .await
            .unwrap();
        let RunOutcome::Complete(summary) = &second else {
            panic!("expected completion on resume, got {second:?}");
        };
        assert_eq!(summary.processed_count, 5);
        assert_eq!(summary.total_publications, 5);

        let rows = ResultTable::new(&config.results_path).read_all().unwrap();
        assert_eq!(rows, expected);
        assert!(!config.progress_path.exists());
        assert!(!config.checkpoint_path.exists());
    }

    #[tokio::test]
    async fn interrupted_publication_is_rejudged_from_scratch() {
        let dir = tempdir().unwrap();
        let config = test_config(dir.path());
        // Publication 1: first candidate answers (call 3), second candidate
        // rate-limits (call 4). On retry both candidates are judged again.
        let judge = ScriptedJudge::new(HashMap::new()).rate_limited_on(&[4]);
        let coordinator = BatchCoordinator::new(config.clone(), judge);

        let pubs = publications(2);
        let outcome = coordinator.run(&grants(), &pubs).await.unwrap();

        let RunOutcome::Complete(summary) = outcome else {
            panic!("expected completion");
        };
        // Calls: 2 for publication 0, then 2 attempts for publication 1
        // (answered + rate limited), then 2 more on the retry.
        assert_eq!(summary.api_calls_made, 6);
        assert_eq!(summary.api_calls_failed, 1);
        assert_eq!(summary.processed_count, 2);
    }

    #[tokio::test]
    async fn batch_boundaries_preserve_input_order() {
        let dir = tempdir().unwrap();
        let config = test_config(dir.path());
        let judge = ScriptedJudge::new(HashMap::new());
        let coordinator = BatchCoordinator::new(config.clone(), judge);

        // Five publications across three batches of two.
        let pubs = publications(5);
        coordinator.run(&grants(), &pubs).await.unwrap();

        let titles: Vec<String> = ResultTable::new(&config.results_path)
            .read_all()
            .unwrap()
            .into_iter()
            .map(|r| r.title)
            .collect();
        assert_eq!(titles, vec!["Paper 0", "Paper 1", "Paper 2", "Paper 3", "Paper 4"]);
    }

    #[tokio::test]
    async fn repeated_rate_limits_back_off_then_recover() {
        let dir = tempdir().unwrap();
        let config = test_config(dir.path());
        // Three consecutive rate limits on publication 0's first candidate,
        // inside the default budget of 3 backoffs.
        let judge = ScriptedJudge::new(HashMap::new()).rate_limited_on(&[1, 2, 3]);
        let coordinator = BatchCoordinator::new(config.clone(), judge);

        let pubs = publications(1);
        let outcome = coordinator.run(&grants(), &pubs).await.unwrap();

        let RunOutcome::Complete(summary) = outcome else {
            panic!("expected completion within the retry budget");
        };
        assert_eq!(summary.processed_count, 1);
        assert_eq!(summary.api_calls_failed, 3);
        assert_eq!(summary.api_calls_made, 5);
    }

    #[tokio::test]
    async fn empty_publication_set_completes_immediately() {
        let dir = tempdir().unwrap();
        let config = test_config(dir.path());
        let judge = ScriptedJudge::new(HashMap::new());
        let coordinator = BatchCoordinator::new(config.clone(), judge);

        let outcome = coordinator.run(&grants(), &[]).await.unwrap();
        let RunOutcome::Complete(summary) = outcome else {
            panic!("expected completion");
        };
        assert_eq!(summary.total_publications, 0);
        assert_eq!(summary.processed_count, 0);
        assert_eq!(coordinator.judge.calls_made(), 0);
    }
}
