use crate::api::{CollectionState, Status, Time};

/// Lifecycle transitions of a collection session.
///
/// `Idle -> Collecting -> {Complete, Error}`. Leaving `Complete` or `Error` is only
/// possible by starting a new session, which resets every counter.
pub trait SessionExt {
    fn begin_session(subject_url: Option<String>, now: Time) -> Self;

    /// Undoes a start the page never confirmed. Returns whether it applied.
    fn rollback_start(&mut self) -> bool;

    fn stop(&mut self);

    /// The loop ended by itself. Returns whether it applied.
    fn finish(&mut self) -> bool;

    /// A session can never be resumed after a restart: it is closed with whatever was
    /// already collected. Returns whether it applied.
    fn recover_after_restart(&mut self) -> bool;

    fn fail(&mut self);
}

impl SessionExt for CollectionState {
    fn begin_session(subject_url: Option<String>, now: Time) -> CollectionState {
        CollectionState {
            status: Status::Collecting,
            subject_url,
            started_at: Some(now),
            ..CollectionState::default()
        }
    }

    fn rollback_start(&mut self) -> bool {
        if self.status != Status::Collecting {
            return false;
        }
        self.status = Status::Idle;
        true
    }

    fn stop(&mut self) {
        if self.status == Status::Error {
            return;
        }
        self.status = closed_status(self);
    }

    fn finish(&mut self) -> bool {
        if self.status != Status::Collecting {
            return false;
        }
        self.status = Status::Complete;
        true
    }

    fn recover_after_restart(&mut self) -> bool {
        if self.status != Status::Collecting {
            return false;
        }
        self.status = closed_status(self);
        true
    }

    fn fail(&mut self) {
        self.status = Status::Error;
    }
}

fn closed_status(state: &CollectionState) -> Status {
    match state.collected_count {
        0 => Status::Idle,
        _ => Status::Complete,
    }
}
