//! Conversation state machine and submission flow
//!
//! A submission is split in two so the caller owns the suspension point:
//! [`ChatSession::begin_submit`] records the user's message and hands back the
//! question to send, [`ChatSession::complete`] records whatever came back.
//! Only one submission can be in flight at a time.

use tracing::{debug, warn};

use crate::draft::{Draft, FileRef};
use crate::query::{QueryError, QueryService};
use crate::state::{ChatMessage, Conversation, MessageId};

/// Shown in place of an answer whenever the service could not provide one
pub const ERROR_REPLY: &str = "Error: Unable to get response from the server.";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SubmitPhase {
    #[default]
    Idle,
    /// Waiting on the answer to the user message identified by `ticket`
    AwaitingResponse { ticket: MessageId },
}

/// A question accepted for sending
#[derive(Debug, Clone)]
pub struct PendingQuery {
    pub ticket: MessageId,
    pub question: String,
}

#[derive(Debug, Default)]
pub struct ChatSession {
    conversation: Conversation,
    draft: Draft,
    phase: SubmitPhase,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the conversation; later updates don't affect it
    pub fn conversation(&self) -> Conversation {
        self.conversation.clone()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        self.conversation.messages()
    }

    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    pub fn phase(&self) -> &SubmitPhase {
        &self.phase
    }

    pub fn is_awaiting_response(&self) -> bool {
        matches!(self.phase, SubmitPhase::AwaitingResponse { .. })
    }

    pub fn set_url(&mut self, url: String) {
        self.draft.set_url(url);
    }

    pub fn set_question(&mut self, question: String) {
        self.draft.set_question(question);
    }

    pub fn select_file(&mut self, file: FileRef) {
        debug!(file = file.as_str(), "file selected");
        self.draft.select_file(file);
    }

    pub fn clear_file(&mut self) {
        self.draft.clear_file();
    }

    /// Accept the drafted question for sending.
    ///
    /// Returns `None` without touching anything when the question is blank or a
    /// previous submission is still waiting for its answer.
    pub fn begin_submit(&mut self) -> Option<PendingQuery> {
        if self.draft.question().trim().is_empty() {
            return None;
        }
        if self.is_awaiting_response() {
            debug!("submission refused, previous query still pending");
            return None;
        }

        let question = self.draft.take_question();
        let message = ChatMessage::user(question.clone());
        let ticket = message.id.clone();

        self.conversation = self.conversation.appended(message);
        self.phase = SubmitPhase::AwaitingResponse {
            ticket: ticket.clone(),
        };

        Some(PendingQuery { ticket, question })
    }

    /// Record the outcome of the query identified by `ticket`.
    ///
    /// Failures become the fixed [`ERROR_REPLY`]. Outcomes for a ticket that
    /// is not pending are dropped and `None` is returned.
    pub fn complete(
        &mut self,
        ticket: &MessageId,
        outcome: Result<String, QueryError>,
    ) -> Option<&ChatMessage> {
        match &self.phase {
            SubmitPhase::AwaitingResponse { ticket: pending } if pending == ticket => {}
            _ => {
                warn!(%ticket, "ignoring answer for a query that is no longer pending");
                return None;
            }
        }

        let reply = match outcome {
            Ok(answer) => ChatMessage::assistant(answer),
            Err(e) => {
                warn!(error = %e, "query failed");
                ChatMessage::assistant(ERROR_REPLY)
            }
        };

        self.conversation = self.conversation.appended(reply);
        self.phase = SubmitPhase::Idle;
        self.conversation.last()
    }

    /// Send the drafted question and wait for the reply in one step
    pub async fn submit(&mut self, service: &dyn QueryService) -> Option<&ChatMessage> {
        let pending = self.begin_submit()?;
        let outcome = service.query(&pending.question).await;
        self.complete(&pending.ticket, outcome)
    }
}
