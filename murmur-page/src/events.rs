use std::sync::Arc;

use futures::channel::mpsc;
use murmur_api::CaptureEvent;

/// Page-wide broadcast of captured listings
#[derive(Clone, Debug, Default)]
pub struct EventBus(Arc<parking_lot::Mutex<Vec<mpsc::UnboundedSender<CaptureEvent>>>>);

impl EventBus {
    pub fn new() -> EventBus {
        EventBus::default()
    }

    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<CaptureEvent> {
        let (sender, receiver) = mpsc::unbounded();
        self.0.lock().push(sender);
        receiver
    }

    /// Subscribers that went away are forgotten
    pub fn publish(&self, event: CaptureEvent) {
        self.0
            .lock()
            .retain(|s| matches!(s.unbounded_send(event.clone()), Ok(())));
    }

    pub fn subscribers(&self) -> usize {
        self.0.lock().len()
    }
}
