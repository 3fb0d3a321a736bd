use crate::api::{AnalysisClient, SpeechAudio};
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink};
use std::io::Cursor;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;

/// Tracks which utterance is current. Every `speak` bumps the generation;
/// a synthesis completion is only played if its generation still matches,
/// so a superseded or cancelled request can never start audio late.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct UtteranceSlot {
    generation: u64,
    pending: bool,
}

impl UtteranceSlot {
    fn begin(&mut self) -> u64 {
        self.generation += 1;
        self.pending = true;
        self.generation
    }

    fn invalidate(&mut self) {
        self.generation += 1;
        self.pending = false;
    }

    fn accept(&mut self, generation: u64) -> bool {
        if generation != self.generation {
            return false;
        }
        self.pending = false;
        true
    }
}

/// Reads answers aloud through the text-to-speech endpoint. At most one
/// utterance is ever active: `speak` cancels whatever is playing or pending
/// before starting the next one (mutual exclusion, not queuing).
///
/// When no audio output device can be opened the player stays constructed
/// but inert, matching how other local resource failures degrade rather
/// than crash the app.
pub struct SpeechPlayer {
    output: Option<(OutputStream, OutputStreamHandle)>,
    sink: Option<Sink>,
    client: Arc<dyn AnalysisClient>,
    slot: UtteranceSlot,
    tx: Sender<(u64, Result<SpeechAudio, String>)>,
    rx: Receiver<(u64, Result<SpeechAudio, String>)>,
}

impl SpeechPlayer {
    pub fn new(client: Arc<dyn AnalysisClient>) -> Self {
        let output = match OutputStream::try_default() {
            Ok(pair) => Some(pair),
            Err(e) => {
                tracing::warn!(error = %e, "audio output unavailable; speech disabled");
                None
            }
        };
        let (tx, rx) = channel();
        Self {
            output,
            sink: None,
            client,
            slot: UtteranceSlot::default(),
            tx,
            rx,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.output.is_some()
    }

    pub fn is_speaking(&self) -> bool {
        self.slot.pending || self.sink.as_ref().map(|s| !s.empty()).unwrap_or(false)
    }

    /// Cancel the current utterance, then synthesize and play `text`.
    pub fn speak(&mut self, text: &str) {
        self.stop_sink();
        if self.output.is_none() {
            return;
        }
        let generation = self.slot.begin();
        let client = Arc::clone(&self.client);
        let tx = self.tx.clone();
        let text = text.to_string();
        std::thread::spawn(move || {
            let result = client.synthesize_speech(&text).map_err(|e| e.to_string());
            let _ = tx.send((generation, result));
        });
    }

    /// Stop playback and drop any pending synthesis. Idempotent.
    pub fn cancel(&mut self) {
        self.slot.invalidate();
        self.stop_sink();
    }

    /// Play an already-encoded clip (e.g. a recording preview), superseding
    /// any current utterance.
    pub fn play_clip(&mut self, bytes: Vec<u8>) {
        self.cancel();
        self.start_playback(bytes);
    }

    /// Pick up finished synthesis requests. Stale generations (superseded
    /// by a later `speak` or a `cancel`) are discarded unplayed.
    pub fn poll(&mut self) {
        while let Ok((generation, result)) = self.rx.try_recv() {
            if !self.slot.accept(generation) {
                continue;
            }
            match result {
                Ok(audio) => self.start_playback(audio.bytes),
                Err(detail) => tracing::warn!(%detail, "speech synthesis failed"),
            }
        }
        // Drop the sink once it drains so is_speaking returns to idle.
        if self.sink.as_ref().is_some_and(|s| s.empty()) {
            self.sink = None;
        }
    }

    fn start_playback(&mut self, bytes: Vec<u8>) {
        let Some((_, handle)) = &self.output else {
            return;
        };
        let sink = match Sink::try_new(handle) {
            Ok(sink) => sink,
            Err(e) => {
                tracing::warn!(error = %e, "could not open playback sink");
                return;
            }
        };
        match Decoder::new(Cursor::new(bytes)) {
            Ok(source) => {
                sink.append(source);
                self.sink = Some(sink);
            }
            Err(e) => tracing::warn!(error = %e, "could not decode speech audio"),
        }
    }

    fn stop_sink(&mut self) {
        if let Some(sink) = self.sink.take() {
            sink.stop();
        }
    }
}
