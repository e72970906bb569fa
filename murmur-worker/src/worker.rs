use std::{sync::Arc, time::Duration};

use anyhow::anyhow;
use futures::StreamExt;
use murmur_api::{
    FinishReason, PageInfo, PageRequest, PageResponse, PageSender, WorkerReceiver, WorkerRequest,
    WorkerResponse,
};

use crate::{
    storage::{self, Storage},
    Error, Outcome, Transition, Writer,
};

#[derive(Clone, Debug)]
pub struct WorkerConfig {
    /// Must leave the page enough time to open its comment panel
    pub begin_loop_timeout: Duration,
}

impl Default for WorkerConfig {
    fn default() -> WorkerConfig {
        WorkerConfig {
            begin_loop_timeout: Duration::from_secs(5),
        }
    }
}

/// The persistence side: owns the session storage and answers [`WorkerRequest`]s
#[derive(Clone)]
pub struct Worker {
    storage: Arc<dyn Storage>,
    writer: Writer,
    page: PageSender,
    config: WorkerConfig,
}

impl Worker {
    /// Starting a worker closes whatever session the previous one left running
    pub async fn boot(storage: Arc<dyn Storage>, page: PageSender, config: WorkerConfig) -> Worker {
        let writer = Writer::spawn(storage.clone());
        match writer.apply(Transition::Recover).await {
            Ok(Outcome {
                state,
                applied: true,
            }) => tracing::warn!(
                session = ?state.session,
                status = ?state.status,
                collected = state.collected_count,
                "previous collection was interrupted"
            ),
            Ok(_) => tracing::debug!("no interrupted collection"),
            Err(err) => tracing::error!(?err, "failed recovering previous collection"),
        }
        Worker {
            storage,
            writer,
            page,
            config,
        }
    }

    /// Requests are handled concurrently, the writer orders whatever they mutate.
    /// Captures reach the writer in the order they were received.
    pub fn serve(self, mut requests: WorkerReceiver) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(env) = requests.next().await {
                let (req, resp) = env.into_parts();
                match req {
                    WorkerRequest::Capture(event) => {
                        let ingested = self.writer.ingest(event.url, event.body);
                        tokio::spawn(async move {
                            resp.send(WorkerResponse::Ingested(ingested.await));
                        });
                    }
                    req => {
                        let this = self.clone();
                        tokio::spawn(async move { resp.send(this.handle(req).await) });
                    }
                }
            }
            tracing::debug!("all worker senders are gone");
        })
    }

    pub async fn handle(&self, req: WorkerRequest) -> WorkerResponse {
        let res = match req {
            WorkerRequest::Capture(event) => Ok(WorkerResponse::Ingested(
                self.writer.ingest(event.url, event.body).await,
            )),
            WorkerRequest::Start => self.start().await,
            WorkerRequest::Stop => self.stop().await,
            WorkerRequest::LoopFinished { reason } => self.loop_finished(reason).await,
            WorkerRequest::GetState => storage::load_state(&*self.storage)
                .await
                .map(WorkerResponse::State)
                .map_err(Error::from),
            WorkerRequest::Export => storage::load_comments(&*self.storage)
                .await
                .map(|c| WorkerResponse::Exported(c.export_ordered()))
                .map_err(Error::from),
        };
        res.unwrap_or_else(|err| WorkerResponse::Failed(err.into_api()))
    }

    async fn start(&self) -> Result<WorkerResponse, Error> {
        let info = self.page_info().await?;
        let outcome = self
            .writer
            .apply(Transition::Begin {
                subject_url: Some(info.url),
            })
            .await?;
        tracing::info!(session = ?outcome.state.session, "collection starting");

        match self.begin_loop().await {
            Ok(auto_opened) => {
                tracing::info!(auto_opened, "collection started");
                Ok(WorkerResponse::Started {
                    state: outcome.state,
                    auto_opened,
                })
            }
            Err(err) => {
                tracing::warn!(?err, "collection failed to start");
                if let Err(err) = self.writer.apply(Transition::Rollback).await {
                    tracing::error!(?err, "failed rolling back collection start");
                }
                Err(err)
            }
        }
    }

    async fn page_info(&self) -> Result<PageInfo, Error> {
        match self.page.call(PageRequest::PageInfo).await {
            Ok(PageResponse::Info(info)) => Ok(info),
            Ok(resp) => Err(anyhow!("unexpected answer to page info: {resp:?}").into()),
            Err(err) => {
                tracing::warn!(?err, "no page answered");
                Err(Error::no_active_page())
            }
        }
    }

    async fn begin_loop(&self) -> Result<bool, Error> {
        let call = self.page.call(PageRequest::BeginLoop);
        match tokio::time::timeout(self.config.begin_loop_timeout, call).await {
            Ok(Ok(PageResponse::Began { auto_opened })) => Ok(auto_opened),
            Ok(Ok(PageResponse::Refused(reason))) => Err(Error::automation(reason)),
            Ok(Ok(resp)) => Err(anyhow!("unexpected answer to begin loop: {resp:?}").into()),
            Ok(Err(reason)) => Err(Error::channel(reason)),
            Err(_) => {
                // the page may still start its loop later on
                self.notify_stop();
                Err(Error::begin_loop_timeout())
            }
        }
    }

    async fn stop(&self) -> Result<WorkerResponse, Error> {
        let outcome = self.writer.apply(Transition::Stop).await?;
        self.notify_stop();
        tracing::info!(
            status = ?outcome.state.status,
            collected = outcome.state.collected_count,
            "collection stopped"
        );
        Ok(WorkerResponse::State(outcome.state))
    }

    async fn loop_finished(&self, reason: FinishReason) -> Result<WorkerResponse, Error> {
        let outcome = self.writer.apply(Transition::Finish(reason)).await?;
        if outcome.applied {
            tracing::info!(
                ?reason,
                collected = outcome.state.collected_count,
                "collection finished"
            );
        } else {
            tracing::debug!(?reason, status = ?outcome.state.status, "loop finished outside a collection");
        }
        Ok(WorkerResponse::State(outcome.state))
    }

    fn notify_stop(&self) {
        if let Err(err) = self.page.notify(PageRequest::StopLoop) {
            tracing::warn!(?err, "failed telling the page to stop its loop");
        }
    }
}
