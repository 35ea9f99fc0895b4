//! The return value of `Client::run`: a session that is simultaneously a
//! one-shot producer of its terminal outcome and an iterable live stream.

use futures::stream::BoxStream;

use remote_agents_core::{CoreResult, SessionId};
use remote_agents_engine::ActivityResult;

use crate::session::{Session, SessionResult};

/// Two independent views over one session (spec.md §9's
/// "promise-that-is-also-an-async-iterable" hint, expressed as two methods
/// on one handle rather than one overloaded object): `result()` resolves
/// once, when the session reaches a terminal state; `stream()` can be
/// iterated concurrently and never ends on its own.
pub struct RunHandle {
    session: Session,
}

impl RunHandle {
    pub(crate) fn new(session: Session) -> Self {
        Self { session }
    }

    #[must_use]
    pub fn session_id(&self) -> &SessionId {
        self.session.id()
    }

    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Blocks until the session reaches a terminal state.
    pub async fn result(&self) -> CoreResult<SessionResult> {
        self.session.result().await
    }

    /// The session's combined replay-then-live feed.
    #[must_use]
    pub fn stream(&self) -> BoxStream<'static, ActivityResult> {
        self.session.stream()
    }
}
