//! Typed request/response channel between the page and the worker.
//!
//! Delivery is at-most-once per call and there is no ordering guarantee between
//! different senders. A call fails with [`ChannelError::Closed`] if the receiving side is
//! gone, and with [`ChannelError::NoReply`] if it dropped the request without answering.
//! Nothing is ever retried here.

use std::future::Future;

use futures::channel::{mpsc, oneshot};

use crate::ChannelError;

pub struct Envelope<Req, Resp> {
    request: Req,
    reply: Option<oneshot::Sender<Resp>>,
}

impl<Req, Resp> Envelope<Req, Resp> {
    pub fn request(&self) -> &Req {
        &self.request
    }

    pub fn into_parts(self) -> (Req, Responder<Resp>) {
        (self.request, Responder(self.reply))
    }
}

/// Answers one request. Answering a notification, or a caller that went away, is a no-op.
pub struct Responder<Resp>(Option<oneshot::Sender<Resp>>);

impl<Resp> Responder<Resp> {
    pub fn send(self, resp: Resp) {
        if let Some(reply) = self.0 {
            if reply.send(resp).is_err() {
                tracing::debug!("caller went away before the reply was ready");
            }
        }
    }

    pub fn expects_reply(&self) -> bool {
        self.0.is_some()
    }
}

pub struct Sender<Req, Resp>(mpsc::UnboundedSender<Envelope<Req, Resp>>);

impl<Req, Resp> Clone for Sender<Req, Resp> {
    fn clone(&self) -> Self {
        Sender(self.0.clone())
    }
}

impl<Req, Resp> std::fmt::Debug for Sender<Req, Resp> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sender")
            .field("closed", &self.0.is_closed())
            .finish()
    }
}

impl<Req, Resp> Sender<Req, Resp> {
    /// The request is queued before this returns, so calls made one after the other are
    /// received in that order even when their replies are awaited concurrently.
    pub fn call(&self, request: Req) -> impl Future<Output = Result<Resp, ChannelError>> {
        let (reply, response) = oneshot::channel();
        let sent = self
            .0
            .unbounded_send(Envelope {
                request,
                reply: Some(reply),
            })
            .map_err(|_| ChannelError::Closed);
        async move {
            sent?;
            response.await.map_err(|_| ChannelError::NoReply)
        }
    }

    /// Fire-and-forget delivery
    pub fn notify(&self, request: Req) -> Result<(), ChannelError> {
        self.0
            .unbounded_send(Envelope {
                request,
                reply: None,
            })
            .map_err(|_| ChannelError::Closed)
    }

    pub fn is_closed(&self) -> bool {
        self.0.is_closed()
    }
}

pub type Receiver<Req, Resp> = mpsc::UnboundedReceiver<Envelope<Req, Resp>>;

pub fn channel<Req, Resp>() -> (Sender<Req, Resp>, Receiver<Req, Resp>) {
    let (sender, receiver) = mpsc::unbounded();
    (Sender(sender), receiver)
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;

    use super::*;

    #[tokio::test]
    async fn call_gets_the_reply() {
        let (sender, mut receiver) = channel::<u32, u32>();
        tokio::spawn(async move {
            while let Some(env) = receiver.next().await {
                let (req, resp) = env.into_parts();
                resp.send(req * 2);
            }
        });
        assert_eq!(sender.call(21).await, Ok(42));
    }

    #[tokio::test]
    async fn call_reports_closed_and_dropped_requests() {
        let (sender, receiver) = channel::<u32, u32>();
        drop(receiver);
        assert_eq!(sender.call(1).await, Err(ChannelError::Closed));
        assert_eq!(sender.notify(1), Err(ChannelError::Closed));

        let (sender, mut receiver) = channel::<u32, u32>();
        tokio::spawn(async move {
            // drop every request unanswered
            while let Some(env) = receiver.next().await {
                drop(env);
            }
        });
        assert_eq!(sender.call(1).await, Err(ChannelError::NoReply));
    }

    #[tokio::test]
    async fn calls_are_received_in_call_order() {
        let (sender, mut receiver) = channel::<u32, u32>();
        let pending = (0..16).map(|i| sender.call(i)).collect::<Vec<_>>();
        for i in 0..16 {
            let env = receiver.next().await.expect("receiving call");
            assert_eq!(*env.request(), i);
            let (req, resp) = env.into_parts();
            resp.send(req + 100);
        }
        // replies are awaited in reverse, the requests were already queued
        for (i, reply) in pending.into_iter().enumerate().rev() {
            assert_eq!(reply.await, Ok(i as u32 + 100));
        }
    }

    #[tokio::test]
    async fn notifications_expect_no_reply() {
        let (sender, mut receiver) = channel::<u32, u32>();
        sender.notify(7).expect("notifying");
        let env = receiver.next().await.expect("receiving notification");
        assert_eq!(*env.request(), 7);
        let (_, resp) = env.into_parts();
        assert!(!resp.expects_reply());
        resp.send(0);
    }
}
