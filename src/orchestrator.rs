use crate::api::AnalysisClient;
use crate::conversation::ConversationLog;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    Image,
    Audio,
}

impl QueryKind {
    fn label(self) -> &'static str {
        match self {
            QueryKind::Image => "sketch analysis",
            QueryKind::Audio => "recording analysis",
        }
    }
}

struct Completion {
    kind: QueryKind,
    result: Result<String, String>,
}

/// What `poll` hands back to the UI after applying a completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TutorEvent {
    /// A query succeeded; the raw answer is already in the log. The UI
    /// formats it for display and may read it aloud.
    Answer { text: String },
    /// A query failed; nothing was appended beyond its user turn.
    Failed { kind: QueryKind, message: String },
}

/// Coordinates the lifecycle of analysis queries: optimistic user-turn
/// append, dispatch on a background thread, and assistant-turn append when
/// the completion is drained on the UI thread. Each dispatch clones its own
/// history snapshot, so overlapping queries never share request state;
/// completions apply in completion order, which may differ from submission
/// order. In-flight requests are never cancelled.
pub struct AnalysisOrchestrator {
    log: ConversationLog,
    client: Arc<dyn AnalysisClient>,
    tx: Sender<Completion>,
    rx: Receiver<Completion>,
    pending_image: usize,
    pending_audio: usize,
}

impl AnalysisOrchestrator {
    pub fn new(client: Arc<dyn AnalysisClient>) -> Self {
        let (tx, rx) = channel();
        Self {
            log: ConversationLog::default(),
            client,
            tx,
            rx,
            pending_image: 0,
            pending_audio: 0,
        }
    }

    pub fn log(&self) -> &ConversationLog {
        &self.log
    }

    pub fn is_busy(&self, kind: QueryKind) -> bool {
        match kind {
            QueryKind::Image => self.pending_image > 0,
            QueryKind::Audio => self.pending_audio > 0,
        }
    }

    /// Ask about the current sketch. The user turn is appended before
    /// dispatch; the history sent upstream is the log as it stood before
    /// this prompt.
    pub fn submit_image_query(&mut self, prompt: &str, snapshot_base64: String) {
        let history = self.log.turns().to_vec();
        self.log.push_user(prompt);
        self.pending_image += 1;

        let client = Arc::clone(&self.client);
        let tx = self.tx.clone();
        let prompt = prompt.to_string();
        std::thread::spawn(move || {
            let result = client
                .analyze_image(&snapshot_base64, &prompt, &history)
                .map_err(|e| e.to_string());
            let _ = tx.send(Completion {
                kind: QueryKind::Image,
                result,
            });
        });
    }

    /// Ask about a recorded clip, optionally attaching the current sketch.
    pub fn submit_audio_query(
        &mut self,
        audio_base64: String,
        mime_type: &str,
        prompt: &str,
        snapshot_base64: Option<String>,
    ) {
        let history = self.log.turns().to_vec();
        self.log.push_user(prompt);
        self.pending_audio += 1;

        let client = Arc::clone(&self.client);
        let tx = self.tx.clone();
        let prompt = prompt.to_string();
        let mime_type = mime_type.to_string();
        std::thread::spawn(move || {
            let result = client
                .analyze_audio(
                    &audio_base64,
                    &mime_type,
                    &prompt,
                    snapshot_base64.as_deref(),
                    &history,
                )
                .map_err(|e| e.to_string());
            let _ = tx.send(Completion {
                kind: QueryKind::Audio,
                result,
            });
        });
    }

    /// Clear the log. Does not cancel in-flight requests; a completion that
    /// arrives afterwards appends relative to the log as it is then.
    pub fn reset_conversation(&mut self) {
        self.log.reset();
    }

    /// Drain finished queries, applying their log updates on the caller's
    /// thread. A successful query appends its assistant turn with the raw
    /// answer text; a failed one leaves the log untouched beyond the user
    /// turn appended at submit time.
    pub fn poll(&mut self) -> Vec<TutorEvent> {
        let mut events = Vec::new();
        while let Ok(completion) = self.rx.try_recv() {
            match completion.kind {
                QueryKind::Image => self.pending_image = self.pending_image.saturating_sub(1),
                QueryKind::Audio => self.pending_audio = self.pending_audio.saturating_sub(1),
            }
            match completion.result {
                Ok(text) => {
                    self.log.push_assistant(&text);
                    events.push(TutorEvent::Answer { text });
                }
                Err(detail) => {
                    tracing::error!(kind = completion.kind.label(), %detail, "query failed");
                    events.push(TutorEvent::Failed {
                        kind: completion.kind,
                        message: format!("{} failed: {detail}", completion.kind.label()),
                    });
                }
            }
        }
        events
    }
}
