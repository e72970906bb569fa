use std::{future::Future, panic::AssertUnwindSafe, sync::Arc};

use anyhow::{anyhow, Context};
use chrono::Utc;
use futures::{
    channel::{mpsc, oneshot},
    FutureExt, StreamExt,
};
use murmur_api::{CollectionState, FinishReason, IngestResult};
use murmur_store::prelude::*;
use serde_json::Value;

use crate::storage::{self, Storage, COMMENTS_KEY};

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Transition {
    Begin { subject_url: Option<String> },
    Rollback,
    Stop,
    Finish(FinishReason),
    Recover,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Outcome {
    pub state: CollectionState,

    /// Whether the transition changed anything
    pub applied: bool,
}

enum Job {
    Ingest {
        url: String,
        body: Value,
        reply: oneshot::Sender<IngestResult>,
    },
    Transition {
        transition: Transition,
        reply: oneshot::Sender<anyhow::Result<Outcome>>,
    },
}

/// Single writer of the session storage.
///
/// Jobs run one at a time in arrival order, each one loading, mutating and saving the
/// stored records before the next one starts. A failing job never blocks the queue.
#[derive(Clone)]
pub struct Writer {
    jobs: mpsc::UnboundedSender<Job>,
}

impl Writer {
    pub fn spawn(storage: Arc<dyn Storage>) -> Writer {
        let (jobs, mut receiver) = mpsc::unbounded();
        tokio::spawn(async move {
            while let Some(job) = receiver.next().await {
                if let Err(panic) = AssertUnwindSafe(run(&*storage, job)).catch_unwind().await {
                    tracing::error!(?panic, "writer job panicked, moving on to the next one");
                }
            }
            tracing::debug!("writer queue closed");
        });
        Writer { jobs }
    }

    /// Queues the capture right away, the returned future only waits for its result.
    /// Failures are logged and reported as no progress.
    pub fn ingest(&self, url: String, body: Value) -> impl Future<Output = IngestResult> {
        let (reply, res) = oneshot::channel();
        let queued = self.jobs.unbounded_send(Job::Ingest { url, body, reply }).is_ok();
        if !queued {
            tracing::warn!("writer is gone, dropping capture");
        }
        async move {
            if !queued {
                return IngestResult::zero();
            }
            res.await.unwrap_or_else(|_| {
                tracing::warn!("writer dropped an ingestion job");
                IngestResult::zero()
            })
        }
    }

    pub async fn apply(&self, transition: Transition) -> anyhow::Result<Outcome> {
        let (reply, res) = oneshot::channel();
        self.jobs
            .unbounded_send(Job::Transition { transition, reply })
            .map_err(|_| anyhow!("writer is gone"))?;
        res.await.context("writer dropped a transition job")?
    }
}

async fn run(storage: &dyn Storage, job: Job) {
    match job {
        Job::Ingest { url, body, reply } => {
            let res = match ingest(storage, &url, &body).await {
                Ok(res) => res,
                Err(err) => {
                    tracing::error!(?err, %url, "failed ingesting capture");
                    IngestResult::zero()
                }
            };
            let _ = reply.send(res);
        }
        Job::Transition { transition, reply } => {
            let res = apply(storage, &transition).await;
            if let Err(err) = &res {
                tracing::error!(?err, ?transition, "failed applying transition");
            }
            let _ = reply.send(res);
        }
    }
}

async fn ingest(storage: &dyn Storage, url: &str, body: &Value) -> anyhow::Result<IngestResult> {
    let mut state = storage::load_state(storage).await?;
    let mut comments = storage::load_comments(storage).await?;
    let res = murmur_store::ingest(&mut state, &mut comments, url, body)?;

    if let Err(err) = storage::save_comments(storage, &comments).await {
        tracing::error!(?err, "failed saving comments, marking the session as failed");
        state.fail();
    }
    if let Err(err) = storage::save_state(storage, &state).await {
        tracing::error!(?err, "failed saving state");
    }

    tracing::info!(
        new = res.new_count,
        collected = res.collected_count,
        declared = res.declared_total,
        "ingested capture"
    );
    Ok(res)
}

async fn apply(storage: &dyn Storage, transition: &Transition) -> anyhow::Result<Outcome> {
    let mut state = match transition {
        Transition::Begin { .. } => CollectionState::default(),
        _ => storage::load_state(storage).await?,
    };
    let applied = match transition {
        Transition::Begin { subject_url } => {
            storage
                .remove(COMMENTS_KEY)
                .await
                .context("clearing stored comments")?;
            state = CollectionState::begin_session(subject_url.clone(), Utc::now());
            true
        }
        Transition::Rollback => state.rollback_start(),
        Transition::Stop => {
            state.stop();
            true
        }
        Transition::Finish(_) => state.finish(),
        Transition::Recover => state.recover_after_restart(),
    };
    if applied {
        storage::save_state(storage, &state).await?;
    }
    Ok(Outcome { state, applied })
}
