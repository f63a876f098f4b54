//! Drives one expiration pass over every public image repository.
//!
//! Repositories come from the paginated listing, tags are classified in name
//! order and positive expirations are written back unless running dry. A
//! failed call only costs the unit it belongs to; the run always finishes
//! with a [`Report`] of what was processed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Local};
use futures::stream::{self, StreamExt};

use crate::config::Config;
use crate::models::{Decision, Report};
use crate::registry::{public_repositories, Registry};
use crate::rules::classify;

enum Outcome {
    Done(Vec<Decision>),
    Failed,
    Interrupted,
}

pub struct Reconciler<'a, R: Registry + ?Sized> {
    registry: &'a R,
    config: &'a Config,
    interrupted: Arc<AtomicBool>,
}

impl<'a, R: Registry + ?Sized> Reconciler<'a, R> {
    pub fn new(registry: &'a R, config: &'a Config) -> Self {
        Self {
            registry,
            config,
            interrupted: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Stop before the next repository once `flag` is set
    pub fn with_interrupt(mut self, flag: Arc<AtomicBool>) -> Self {
        self.interrupted = flag;
        self
    }

    pub async fn run(&self) -> Report {
        self.run_at(Local::now()).await
    }

    /// Run with a fixed `now`; every date and written epoch derives from it.
    pub async fn run_at(&self, now: DateTime<Local>) -> Report {
        let mut report = Report::default();
        let mut listed = 0;
        let mut pages = Box::pin(public_repositories(self.registry, self.config.max_pages));

        while let Some(page) = pages.next().await {
            let repositories = match page {
                Ok(repositories) => repositories,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to list repositories, stopping enumeration");
                    break;
                }
            };

            let offset = listed;
            listed += repositories.len();

            // buffered() yields in input order, so output order does not
            // depend on concurrency
            let mut outcomes = stream::iter(repositories.into_iter().enumerate())
                .map(|(i, repository)| self.reconcile_repository(repository, offset + i + 1, now))
                .buffered(self.config.concurrency);

            while let Some(outcome) = outcomes.next().await {
                match outcome {
                    Outcome::Done(decisions) => report.record(decisions, self.config.dry_run),
                    Outcome::Failed => {}
                    Outcome::Interrupted => {
                        tracing::warn!("Interrupted, skipping remaining repositories");
                        return report;
                    }
                }
            }
        }

        report
    }

    async fn reconcile_repository(
        &self,
        repository: String,
        position: usize,
        now: DateTime<Local>,
    ) -> Outcome {
        if self.interrupted.load(Ordering::SeqCst) {
            return Outcome::Interrupted;
        }
        tracing::info!(repository = %repository, position, "Processing repository");

        let tags = match self.registry.list_tags(&repository).await {
            Ok(tags) => tags,
            Err(e) => {
                tracing::error!(repository = %repository, error = %e, "Failed to list tags");
                return Outcome::Failed;
            }
        };

        if tags.is_empty() {
            tracing::debug!(repository = %repository, "No tags");
            return Outcome::Done(vec![Decision::blank(&repository)]);
        }

        let mut decisions = Vec::with_capacity(tags.len());
        for (tag, meta) in &tags {
            let mut decision = classify(&repository, tag, meta, self.config, now);
            if decision.wants_change() && !self.config.dry_run {
                decision.applied = self
                    .apply(&repository, tag, now, decision.expiration_seconds)
                    .await;
            }
            decisions.push(decision);
        }

        Outcome::Done(decisions)
    }

    async fn apply(&self, repository: &str, tag: &str, now: DateTime<Local>, seconds: u64) -> bool {
        let Some(expiration) = i64::try_from(seconds)
            .ok()
            .and_then(|s| now.timestamp().checked_add(s))
        else {
            tracing::error!(repository, tag, seconds, "Expiration out of range");
            return false;
        };

        match self
            .registry
            .set_tag_expiration(repository, tag, expiration)
            .await
        {
            Ok(()) => {
                tracing::debug!(repository, tag, expiration, "Set tag expiration");
                true
            }
            Err(e) => {
                tracing::error!(repository, tag, error = %e, "Failed to set tag expiration");
                false
            }
        }
    }
}
