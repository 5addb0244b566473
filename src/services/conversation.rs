//! Conversation store — message history, busy flag, prompt submission.
//!
//! DESIGN
//! ======
//! One store per assistant session. The message list sits behind a
//! `std::sync::Mutex` that is never held across an `.await`; the only
//! suspension point in `submit` is the completion call. Each session owns a
//! `CancellationToken`: `close()` cancels it, pending submissions stop
//! waiting and append nothing.
//!
//! TRADE-OFFS
//! ==========
//! Under [`SubmitPolicy::Overlap`] replies are appended in settlement order,
//! so two overlapping prompts can have their replies swapped. Callers that
//! need strict pairing use [`SubmitPolicy::RejectWhileBusy`].

use std::sync::{Arc, Mutex, MutexGuard};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::completion::{Completion, CompletionClient};
use crate::llm::types::Message;

pub const DEFAULT_MAX_PROMPT_CHARS: usize = 4000;

// =============================================================================
// TYPES
// =============================================================================

/// What happens when a prompt arrives while another is still pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubmitPolicy {
    /// Accept it; both requests run and replies land in settlement order.
    #[default]
    Overlap,
    /// Refuse it with [`RejectReason::Busy`].
    RejectWhileBusy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConversationOptions {
    pub policy: SubmitPolicy,
    /// Longest accepted prompt in `char`s. `0` disables the check.
    pub max_prompt_chars: usize,
}

impl Default for ConversationOptions {
    fn default() -> Self {
        Self { policy: SubmitPolicy::default(), max_prompt_chars: DEFAULT_MAX_PROMPT_CHARS }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RejectReason {
    #[error("another prompt is still pending")]
    Busy,
    #[error("prompt is {chars} characters, limit is {max}")]
    PromptTooLong { chars: usize, max: usize },
    #[error("session is closed")]
    Closed,
}

/// Result of [`ConversationStore::submit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Blank input; nothing changed.
    Ignored,
    /// Refused before anything was appended.
    Rejected(RejectReason),
    /// User and model turns were appended.
    Answered(Completion),
    /// The user turn was appended but the reply was dropped because the
    /// session closed or the history was cleared meanwhile.
    Abandoned,
}

#[derive(Default)]
struct Conversation {
    messages: Vec<Message>,
    in_flight: usize,
    /// Bumped by `clear`; replies from an older epoch are dropped.
    epoch: u64,
}

// =============================================================================
// STORE
// =============================================================================

/// Cheap to clone; clones share the same conversation and session.
#[derive(Clone)]
pub struct ConversationStore {
    inner: Arc<Mutex<Conversation>>,
    completer: Arc<CompletionClient>,
    options: ConversationOptions,
    session: CancellationToken,
    session_id: Uuid,
}

impl ConversationStore {
    #[must_use]
    pub fn new(completer: Arc<CompletionClient>, options: ConversationOptions) -> Self {
        Self::with_session(completer, options, CancellationToken::new())
    }

    /// Store bound to an externally owned session token, e.g. a child of the
    /// application's shutdown token.
    #[must_use]
    pub fn with_session(
        completer: Arc<CompletionClient>,
        options: ConversationOptions,
        session: CancellationToken,
    ) -> Self {
        let session_id = Uuid::new_v4();
        debug!(%session_id, ?options, "conversation: session opened");
        Self { inner: Arc::new(Mutex::new(Conversation::default())), completer, options, session, session_id }
    }

    /// Append `query` as a user turn, ask the completion client, append the
    /// reply as a model turn.
    ///
    /// Blank input is ignored. The stored user text is `query` as given,
    /// untrimmed.
    pub async fn submit(&self, query: &str) -> SubmitOutcome {
        if query.trim().is_empty() {
            return SubmitOutcome::Ignored;
        }

        let in_flight = match self.accept(query) {
            Ok(in_flight) => in_flight,
            Err(reason) => {
                debug!(session_id = %self.session_id, %reason, "conversation: prompt rejected");
                return SubmitOutcome::Rejected(reason);
            }
        };
        info!(session_id = %self.session_id, prompt_len = query.len(), "conversation: prompt submitted");

        let completion = tokio::select! {
            () = self.session.cancelled() => None,
            completion = self.completer.complete(query) => Some(completion),
        };

        let mut conv = self.lock();
        let epoch = in_flight.settle(&mut conv);

        let Some(completion) = completion else {
            info!(session_id = %self.session_id, "conversation: session closed, reply abandoned");
            return SubmitOutcome::Abandoned;
        };
        if conv.epoch != epoch {
            debug!(session_id = %self.session_id, "conversation: history cleared, reply dropped");
            return SubmitOutcome::Abandoned;
        }

        conv.messages.push(Message::model(completion.text()));
        SubmitOutcome::Answered(completion)
    }

    fn accept(&self, query: &str) -> Result<InFlight<'_>, RejectReason> {
        if self.session.is_cancelled() {
            return Err(RejectReason::Closed);
        }
        let max = self.options.max_prompt_chars;
        if max > 0 {
            let chars = query.chars().count();
            if chars > max {
                return Err(RejectReason::PromptTooLong { chars, max });
            }
        }

        let mut conv = self.lock();
        if self.options.policy == SubmitPolicy::RejectWhileBusy && conv.in_flight > 0 {
            return Err(RejectReason::Busy);
        }
        conv.messages.push(Message::user(query));
        conv.in_flight += 1;
        Ok(InFlight { store: self, epoch: conv.epoch, armed: true })
    }

    /// Resolves once the session is closed.
    pub async fn closed(&self) {
        self.session.cancelled().await;
    }

    /// Snapshot of the conversation in order.
    #[must_use]
    pub fn messages(&self) -> Vec<Message> {
        self.lock().messages.clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().messages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().messages.is_empty()
    }

    /// True while any accepted submission has not settled.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.lock().in_flight > 0
    }

    /// Drop all messages. Replies still pending will not be appended.
    pub fn clear(&self) {
        let mut conv = self.lock();
        conv.messages.clear();
        conv.epoch += 1;
        debug!(session_id = %self.session_id, "conversation: history cleared");
    }

    /// End the session. Pending submissions return [`SubmitOutcome::Abandoned`]
    /// and later ones are rejected.
    pub fn close(&self) {
        if !self.session.is_cancelled() {
            info!(session_id = %self.session_id, pending = self.lock().in_flight, "conversation: session closed");
        }
        self.session.cancel();
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.session.is_cancelled()
    }

    #[must_use]
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    #[must_use]
    pub fn options(&self) -> ConversationOptions {
        self.options
    }

    fn lock(&self) -> MutexGuard<'_, Conversation> {
        self.inner.lock().unwrap_or_else(|poisoned| {
            warn!(session_id = %self.session_id, "conversation: lock poisoned, recovering");
            poisoned.into_inner()
        })
    }
}

// =============================================================================
// IN-FLIGHT GUARD
// =============================================================================

/// One accepted submission. Releases its `in_flight` slot when settled, or
/// on drop if the `submit` future is dropped before it settles.
struct InFlight<'a> {
    store: &'a ConversationStore,
    epoch: u64,
    armed: bool,
}

impl InFlight<'_> {
    /// Release the slot under an already held lock; returns the epoch the
    /// submission was accepted in.
    fn settle(mut self, conv: &mut Conversation) -> u64 {
        conv.in_flight = conv.in_flight.saturating_sub(1);
        self.armed = false;
        self.epoch
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.armed {
            let mut conv = self.store.lock();
            conv.in_flight = conv.in_flight.saturating_sub(1);
            debug!(session_id = %self.store.session_id, "conversation: submit dropped before settling");
        }
    }
}

#[cfg(test)]
#[path = "conversation_test.rs"]
mod tests;
