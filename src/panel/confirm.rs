//! Confirmation capability consulted before destructive operations

use std::future::Future;

use tokio::sync::{mpsc, oneshot};

/// What the user is asked to confirm
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmPrompt {
    DeleteChunk,
    ClearAll,
}

impl ConfirmPrompt {
    pub fn message(self) -> &'static str {
        match self {
            Self::DeleteChunk => "Delete this chunk?",
            Self::ClearAll => "This will delete ALL knowledge for this agent. Continue?",
        }
    }
}

/// Asks the user whether a destructive operation may proceed
pub trait Confirmation: Send + Sync + 'static {
    fn confirm(&self, prompt: ConfirmPrompt) -> impl Future<Output = bool> + Send;
}

/// Accepts every prompt
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysConfirm;

impl Confirmation for AlwaysConfirm {
    async fn confirm(&self, _prompt: ConfirmPrompt) -> bool {
        true
    }
}

/// Declines every prompt
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverConfirm;

impl Confirmation for NeverConfirm {
    async fn confirm(&self, _prompt: ConfirmPrompt) -> bool {
        false
    }
}

/// A pending question for an interactive front end
#[derive(Debug)]
pub struct ConfirmRequest {
    pub prompt: ConfirmPrompt,
    reply: oneshot::Sender<bool>,
}

impl ConfirmRequest {
    pub fn answer(self, accepted: bool) {
        let _ = self.reply.send(accepted);
    }
}

/// Forwards prompts to whoever drains the paired receiver.
///
/// A dropped receiver or request counts as "declined".
#[derive(Debug, Clone)]
pub struct ChannelConfirmation {
    tx: mpsc::Sender<ConfirmRequest>,
}

impl ChannelConfirmation {
    pub fn new(buffer: usize) -> (Self, mpsc::Receiver<ConfirmRequest>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (Self { tx }, rx)
    }
}

impl Confirmation for ChannelConfirmation {
    async fn confirm(&self, prompt: ConfirmPrompt) -> bool {
        let (reply, answer) = oneshot::channel();
        if self.tx.send(ConfirmRequest { prompt, reply }).await.is_err() {
            return false;
        }
        answer.await.unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_confirmation_round_trip() {
        let (confirm, mut rx) = ChannelConfirmation::new(1);

        let ask = tokio::spawn(async move { confirm.confirm(ConfirmPrompt::ClearAll).await });
        let request = rx.recv().await.unwrap();
        assert_eq!(request.prompt, ConfirmPrompt::ClearAll);
        request.answer(true);

        assert!(ask.await.unwrap());
    }

    #[tokio::test]
    async fn test_dropped_request_declines() {
        let (confirm, mut rx) = ChannelConfirmation::new(1);

        let ask = tokio::spawn(async move { confirm.confirm(ConfirmPrompt::DeleteChunk).await });
        drop(rx.recv().await.unwrap());

        assert!(!ask.await.unwrap());
    }

    #[tokio::test]
    async fn test_fixed_answers() {
        assert!(AlwaysConfirm.confirm(ConfirmPrompt::DeleteChunk).await);
        assert!(!NeverConfirm.confirm(ConfirmPrompt::DeleteChunk).await);
    }
}
