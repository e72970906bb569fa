use std::sync::Arc;

use futures::{channel::mpsc, StreamExt};
use murmur_api::{
    CaptureEvent, PageInfo, PageReceiver, PageRequest, PageResponse, WorkerRequest,
    WorkerResponse, WorkerSender,
};

use crate::{capture, Dom, Driver, DriverConfig, PageContext};

/// Everything that runs inside the page: capture, forwarding to the worker, and the
/// automation driver answering the worker's requests
pub struct PageAgent {
    ctx: Arc<PageContext>,
    driver: Arc<Driver>,
    worker: WorkerSender,
}

impl PageAgent {
    pub fn new(
        ctx: Arc<PageContext>,
        dom: Arc<dyn Dom>,
        config: DriverConfig,
        worker: WorkerSender,
    ) -> PageAgent {
        let driver = Arc::new(Driver::new(dom, config, worker.clone()));
        PageAgent {
            ctx,
            driver,
            worker,
        }
    }

    pub fn driver(&self) -> &Arc<Driver> {
        &self.driver
    }

    /// Installs capture on the page, then runs until the worker is gone
    pub fn spawn(self, requests: PageReceiver) -> tokio::task::JoinHandle<()> {
        capture::install(&self.ctx);
        let captures = self.ctx.events().subscribe();
        tokio::spawn(async move {
            let forwarding =
                tokio::spawn(forward_captures(captures, self.worker, self.driver.clone()));
            serve(requests, self.driver).await;
            forwarding.abort();
        })
    }
}

async fn forward_captures(
    captures: mpsc::UnboundedReceiver<CaptureEvent>,
    worker: WorkerSender,
    driver: Arc<Driver>,
) {
    captures
        .for_each_concurrent(None, |event| {
            let driver = driver.clone();
            let url = event.url.clone();
            // queued here, in capture order, only the replies are awaited concurrently
            let reply = worker.call(WorkerRequest::Capture(event));
            async move {
                match reply.await {
                    Ok(WorkerResponse::Ingested(res)) => {
                        tracing::debug!(%url, new = res.new_count, "capture forwarded");
                        driver.report_progress(res.collected_count);
                    }
                    Ok(resp) => tracing::warn!(?resp, "unexpected answer to a capture"),
                    Err(err) => tracing::warn!(?err, %url, "failed forwarding capture"),
                }
            }
        })
        .await
}

/// Requests are answered one at a time, so a stop sent during a begin applies after it
async fn serve(mut requests: PageReceiver, driver: Arc<Driver>) {
    while let Some(env) = requests.next().await {
        let (req, resp) = env.into_parts();
        tracing::debug!(?req, "page request");
        let answer = match req {
            PageRequest::BeginLoop => match driver.begin().await {
                Ok(auto_opened) => PageResponse::Began { auto_opened },
                Err(reason) => {
                    tracing::warn!(%reason, "refusing to begin");
                    PageResponse::Refused(reason)
                }
            },
            PageRequest::StopLoop => {
                driver.stop();
                PageResponse::Stopped
            }
            PageRequest::PageInfo => PageResponse::Info(PageInfo {
                url: driver.dom().location(),
                title: driver.dom().title(),
            }),
        };
        resp.send(answer);
    }
    tracing::debug!("worker went away, stopping");
    driver.stop();
}
