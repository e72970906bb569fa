use std::sync::Arc;

use futures::StreamExt;
use murmur_api::{
    bus::{self, Responder},
    AutomationError, PageInfo, PageRequest, PageResponse, PageSender,
};

/// How a [`ScriptedPage`] answers `BeginLoop`
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BeginScript {
    Ack { auto_opened: bool },
    Refuse(AutomationError),

    /// Holds on to the request without ever answering
    Hang,

    /// Drops the request unanswered
    Ignore,
}

/// A page side that answers from a script instead of driving a document
#[derive(Clone, Debug)]
pub struct ScriptedPage {
    pub info: PageInfo,
    pub begin: BeginScript,
}

impl ScriptedPage {
    pub fn new(url: &str, begin: BeginScript) -> ScriptedPage {
        ScriptedPage {
            info: PageInfo {
                url: String::from(url),
                title: String::from("scripted page"),
            },
            begin,
        }
    }

    /// Returns the sender to hand to the worker, and the log of every request received
    pub fn spawn(self) -> (PageSender, Arc<parking_lot::Mutex<Vec<PageRequest>>>) {
        let (sender, mut receiver) = bus::channel();
        let log = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let seen = log.clone();
        tokio::spawn(async move {
            let mut hanging = Vec::<Responder<PageResponse>>::new();
            while let Some(env) = receiver.next().await {
                let (req, resp) = env.into_parts();
                seen.lock().push(req);
                match req {
                    PageRequest::PageInfo => resp.send(PageResponse::Info(self.info.clone())),
                    PageRequest::StopLoop => resp.send(PageResponse::Stopped),
                    PageRequest::BeginLoop => match self.begin {
                        BeginScript::Ack { auto_opened } => {
                            resp.send(PageResponse::Began { auto_opened })
                        }
                        BeginScript::Refuse(reason) => resp.send(PageResponse::Refused(reason)),
                        BeginScript::Hang => hanging.push(resp),
                        BeginScript::Ignore => drop(resp),
                    },
                }
            }
        });
        (sender, log)
    }
}
