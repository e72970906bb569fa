use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use anyhow::{anyhow, Context};
use futures::StreamExt;
use murmur_api::{
    bus, CaptureEvent, FinishReason, PageInfo, PageRequest, PageResponse, PageSender,
    WorkerRequest, WorkerResponse, WorkerSender,
};
use murmur_worker::{storage, DirStorage, Storage, Worker, WorkerConfig};

#[derive(structopt::StructOpt)]
struct Opt {
    /// Directory holding the session records
    #[structopt(long, env = "MURMUR_STORAGE_DIR", parse(from_os_str))]
    storage_dir: PathBuf,

    #[structopt(subcommand)]
    cmd: Command,
}

#[derive(structopt::StructOpt)]
enum Command {
    /// Run a whole session over recorded captures, one JSON capture event per line
    Replay {
        captures: PathBuf,

        /// Address the session is recorded against
        #[structopt(long, default_value = "https://www.tiktok.com/")]
        page_url: String,

        /// How long to wait for the page to confirm, in milliseconds
        #[structopt(long, default_value = "5000")]
        begin_timeout_ms: u64,
    },

    /// Print the session state
    State,

    /// Print every collected comment, threaded
    Export,

    /// Close a session left running by a crashed worker
    Recover,
}

fn print_json(value: &impl serde::Serialize) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value).context("serializing output")?;
    println!("{json}");
    Ok(())
}

async fn call(worker: &WorkerSender, req: WorkerRequest) -> anyhow::Result<WorkerResponse> {
    match worker.call(req).await.context("calling the worker")? {
        WorkerResponse::Failed(err) => Err(anyhow!("worker failed: {err} ({})", err.code())),
        resp => Ok(resp),
    }
}

async fn read_captures(path: &Path) -> anyhow::Result<Vec<CaptureEvent>> {
    let data = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading captures from {path:?}"))?;
    data.lines()
        .enumerate()
        .filter(|(_, l)| !l.trim().is_empty())
        .map(|(i, l)| {
            serde_json::from_str(l).with_context(|| format!("parsing capture on line {}", i + 1))
        })
        .collect()
}

/// Stands in for the page during a replay, agreeing to everything
fn replay_page(url: String) -> PageSender {
    let (page, mut requests) = bus::channel();
    tokio::spawn(async move {
        while let Some(env) = requests.next().await {
            let (req, resp) = env.into_parts();
            tracing::debug!(?req, "page request");
            resp.send(match req {
                PageRequest::PageInfo => PageResponse::Info(PageInfo {
                    url: url.clone(),
                    title: String::from("replay"),
                }),
                PageRequest::BeginLoop => PageResponse::Began { auto_opened: false },
                PageRequest::StopLoop => PageResponse::Stopped,
            });
        }
    });
    page
}

async fn replay(
    storage: Arc<dyn Storage>,
    captures: &Path,
    page_url: String,
    begin_timeout: Duration,
) -> anyhow::Result<()> {
    let captures = read_captures(captures).await?;
    let page = replay_page(page_url);
    let config = WorkerConfig {
        begin_loop_timeout: begin_timeout,
    };
    let (worker, requests) = bus::channel();
    Worker::boot(storage, page, config).await.serve(requests);

    call(&worker, WorkerRequest::Start).await?;
    let total = captures.len();
    // queued in file order, answered concurrently
    let pending = captures
        .into_iter()
        .map(|c| worker.call(WorkerRequest::Capture(c)))
        .collect::<Vec<_>>();
    let results = futures::future::join_all(pending).await;
    let failed = results
        .iter()
        .filter(|r| !matches!(r, Ok(WorkerResponse::Ingested(_))))
        .count();
    if failed > 0 {
        tracing::warn!(failed, total, "some captures were not delivered");
    }

    call(
        &worker,
        WorkerRequest::LoopFinished {
            reason: FinishReason::Exhausted,
        },
    )
    .await?;
    match call(&worker, WorkerRequest::GetState).await? {
        WorkerResponse::State(state) => print_json(&state),
        resp => Err(anyhow!("unexpected answer to get state: {resp:?}")),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let opt = <Opt as structopt::StructOpt>::from_args();

    let storage = DirStorage::open(&opt.storage_dir)
        .await
        .with_context(|| format!("opening storage in {:?}", opt.storage_dir))?;
    let storage: Arc<dyn Storage> = Arc::new(storage);

    match opt.cmd {
        Command::Replay {
            captures,
            page_url,
            begin_timeout_ms,
        } => {
            replay(
                storage,
                &captures,
                page_url,
                Duration::from_millis(begin_timeout_ms),
            )
            .await?
        }
        Command::State => print_json(&storage::load_state(&*storage).await?)?,
        Command::Export => print_json(&storage::load_comments(&*storage).await?.export_ordered())?,
        Command::Recover => {
            let (page, _) = bus::channel();
            let worker = Worker::boot(storage, page, WorkerConfig::default()).await;
            match worker.handle(WorkerRequest::GetState).await {
                WorkerResponse::State(state) => print_json(&state)?,
                resp => return Err(anyhow!("unexpected answer to get state: {resp:?}")),
            }
        }
    }

    Ok(())
}
