// Prompt board - Confirmation answered through the dashboard API
use crate::application::confirmation::{ConfirmError, Confirmation};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, oneshot};

/// The question currently waiting for an answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingPrompt {
    pub id: u64,
    pub message: String,
}

struct Pending {
    prompt: PendingPrompt,
    reply: oneshot::Sender<bool>,
}

/// Holds at most one pending prompt. Prompts left unanswered for longer
/// than the timeout count as dismissed.
pub struct PromptBoard {
    pending: Mutex<Option<Pending>>,
    next_id: AtomicU64,
    timeout: Duration,
}

impl PromptBoard {
    pub fn new(timeout: Duration) -> Self {
        Self {
            pending: Mutex::new(None),
            next_id: AtomicU64::new(1),
            timeout,
        }
    }

    pub async fn pending(&self) -> Option<PendingPrompt> {
        self.pending.lock().await.as_ref().map(|p| p.prompt.clone())
    }

    /// Answer the pending prompt. Returns false when nothing was pending.
    pub async fn answer(&self, accept: bool) -> bool {
        let Some(pending) = self.pending.lock().await.take() else {
            return false;
        };

        tracing::debug!(prompt = pending.prompt.id, accept, "prompt answered");
        // The asker may have timed out in the meantime
        let _ = pending.reply.send(accept);
        true
    }

    pub async fn dismiss(&self) -> bool {
        self.answer(false).await
    }
}

#[async_trait]
impl Confirmation for PromptBoard {
    async fn confirm(&self, prompt: &str) -> Result<bool, ConfirmError> {
        let (tx, rx) = oneshot::channel();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        {
            let mut slot = self.pending.lock().await;
            if slot.is_some() {
                return Err(ConfirmError::Busy);
            }
            *slot = Some(Pending {
                prompt: PendingPrompt {
                    id,
                    message: prompt.to_string(),
                },
                reply: tx,
            });
        }

        let answer = match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(accept)) => accept,
            Ok(Err(_)) => false,
            Err(_) => {
                tracing::info!(prompt = id, "confirmation timed out, treating as dismissed");
                false
            }
        };

        let mut slot = self.pending.lock().await;
        if slot.as_ref().is_some_and(|p| p.prompt.id == id) {
            *slot = None;
        }

        Ok(answer)
    }
}
