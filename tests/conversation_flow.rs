use sketch_tutor::api::{AnalysisClient, SpeechAudio};
use sketch_tutor::conversation::{Role, Turn};
use sketch_tutor::orchestrator::{AnalysisOrchestrator, QueryKind, TutorEvent};
use std::collections::HashMap;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Answers each question from a script and records the history length seen
/// at dispatch time.
struct ScriptedClient {
    answers: Mutex<HashMap<String, Result<String, String>>>,
    history_lens: Mutex<Vec<usize>>,
}

impl ScriptedClient {
    fn new(answers: &[(&str, Result<&str, &str>)]) -> Arc<Self> {
        Arc::new(Self {
            answers: Mutex::new(
                answers
                    .iter()
                    .map(|(q, a)| {
                        (
                            q.to_string(),
                            (*a).map(str::to_string).map_err(str::to_string),
                        )
                    })
                    .collect(),
            ),
            history_lens: Mutex::new(Vec::new()),
        })
    }

    fn answer(&self, question: &str, history: &[Turn]) -> anyhow::Result<String> {
        self.history_lens.lock().unwrap().push(history.len());
        match self.answers.lock().unwrap().remove(question) {
            Some(Ok(answer)) => Ok(answer),
            Some(Err(message)) => Err(anyhow::anyhow!(message)),
            None => panic!("unscripted question: {question}"),
        }
    }
}

impl AnalysisClient for ScriptedClient {
    fn analyze_image(&self, _image: &str, question: &str, history: &[Turn]) -> anyhow::Result<String> {
        self.answer(question, history)
    }

    fn analyze_audio(
        &self,
        _audio: &str,
        _mime: &str,
        prompt: &str,
        _canvas: Option<&str>,
        history: &[Turn],
    ) -> anyhow::Result<String> {
        self.answer(prompt, history)
    }

    fn synthesize_speech(&self, _text: &str) -> anyhow::Result<SpeechAudio> {
        Ok(SpeechAudio {
            bytes: Vec::new(),
            format: "wav".into(),
        })
    }
}

/// Blocks each question on a per-question gate so tests control completion
/// order exactly.
struct GatedClient {
    gates: Mutex<HashMap<String, Receiver<Result<String, String>>>>,
}

impl GatedClient {
    fn new(questions: &[&str]) -> (Arc<Self>, HashMap<String, Sender<Result<String, String>>>) {
        let mut gates = HashMap::new();
        let mut senders = HashMap::new();
        for q in questions {
            let (tx, rx) = channel();
            gates.insert(q.to_string(), rx);
            senders.insert(q.to_string(), tx);
        }
        (
            Arc::new(Self {
                gates: Mutex::new(gates),
            }),
            senders,
        )
    }
}

impl AnalysisClient for GatedClient {
    fn analyze_image(&self, _image: &str, question: &str, _history: &[Turn]) -> anyhow::Result<String> {
        let gate = self
            .gates
            .lock()
            .unwrap()
            .remove(question)
            .expect("question has a gate");
        match gate.recv().expect("gate sender dropped") {
            Ok(answer) => Ok(answer),
            Err(message) => Err(anyhow::anyhow!(message)),
        }
    }

    fn analyze_audio(
        &self,
        _audio: &str,
        _mime: &str,
        _prompt: &str,
        _canvas: Option<&str>,
        _history: &[Turn],
    ) -> anyhow::Result<String> {
        unreachable!("gated tests only submit image queries")
    }

    fn synthesize_speech(&self, _text: &str) -> anyhow::Result<SpeechAudio> {
        unreachable!("gated tests never synthesize speech")
    }
}

fn wait_for_events(orchestrator: &mut AnalysisOrchestrator, count: usize) -> Vec<TutorEvent> {
    let mut events = Vec::new();
    for _ in 0..400 {
        events.extend(orchestrator.poll());
        if events.len() >= count {
            return events;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    panic!("timed out waiting for {count} completions (got {})", events.len());
}

#[test]
fn a_successful_query_appends_exactly_two_turns() {
    let client = ScriptedClient::new(&[("what is this?", Ok("a circle"))]);
    let mut orchestrator = AnalysisOrchestrator::new(client);

    orchestrator.submit_image_query("what is this?", "cGNn".into());
    assert!(orchestrator.is_busy(QueryKind::Image));
    assert_eq!(orchestrator.log().len(), 1);

    let events = wait_for_events(&mut orchestrator, 1);
    assert_eq!(events, vec![TutorEvent::Answer { text: "a circle".into() }]);
    assert!(!orchestrator.is_busy(QueryKind::Image));

    let turns = orchestrator.log().turns();
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[0].role, Role::User);
    assert_eq!(turns[0].content, "what is this?");
    assert_eq!(turns[1].role, Role::Assistant);
    assert_eq!(turns[1].content, "a circle");
}

#[test]
fn a_failed_query_leaves_only_the_user_turn() {
    let client = ScriptedClient::new(&[("broken", Err("model unavailable"))]);
    let mut orchestrator = AnalysisOrchestrator::new(client);

    orchestrator.submit_image_query("broken", "cGNn".into());
    let events = wait_for_events(&mut orchestrator, 1);

    assert!(matches!(
        &events[0],
        TutorEvent::Failed { kind: QueryKind::Image, message } if message.contains("model unavailable")
    ));
    let turns = orchestrator.log().turns();
    assert_eq!(turns.len(), 1);
    assert_eq!(turns[0].role, Role::User);
}

#[test]
fn audio_queries_follow_the_same_append_policy() {
    let client = ScriptedClient::new(&[("transcribe this", Ok("you said hello"))]);
    let mut orchestrator = AnalysisOrchestrator::new(client);

    orchestrator.submit_audio_query("UklGRg==".into(), "audio/wav", "transcribe this", None);
    assert!(orchestrator.is_busy(QueryKind::Audio));

    wait_for_events(&mut orchestrator, 1);
    assert_eq!(orchestrator.log().len(), 2);
    assert_eq!(orchestrator.log().turns()[1].content, "you said hello");
}

#[test]
fn history_excludes_the_prompt_being_sent_and_resets_cleanly() {
    let client = ScriptedClient::new(&[("first", Ok("one")), ("second", Ok("two"))]);
    let mut orchestrator = AnalysisOrchestrator::new(Arc::clone(&client) as Arc<dyn AnalysisClient>);

    orchestrator.submit_image_query("first", "cGNn".into());
    wait_for_events(&mut orchestrator, 1);

    orchestrator.reset_conversation();
    assert!(orchestrator.log().is_empty());

    orchestrator.submit_image_query("second", "cGNn".into());
    wait_for_events(&mut orchestrator, 1);

    // Both dispatches saw the log before their own user turn: empty at the
    // session start, and empty again right after the reset.
    assert_eq!(*client.history_lens.lock().unwrap(), vec![0, 0]);
    assert_eq!(orchestrator.log().len(), 2);
}

#[test]
fn overlapping_queries_append_in_completion_order() {
    let (client, gates) = GatedClient::new(&["slow", "fast"]);
    let mut orchestrator = AnalysisOrchestrator::new(client);

    orchestrator.submit_image_query("slow", "cGNn".into());
    orchestrator.submit_image_query("fast", "cGNn".into());
    assert_eq!(orchestrator.log().len(), 2);

    // The later submission resolves first.
    gates["fast"].send(Ok("fast answer".into())).unwrap();
    wait_for_events(&mut orchestrator, 1);
    gates["slow"].send(Ok("slow answer".into())).unwrap();
    wait_for_events(&mut orchestrator, 1);

    let contents: Vec<&str> = orchestrator
        .log()
        .turns()
        .iter()
        .map(|t| t.content.as_str())
        .collect();
    assert_eq!(contents, vec!["slow", "fast", "fast answer", "slow answer"]);
}

#[test]
fn a_late_completion_appends_to_the_post_reset_log() {
    let (client, gates) = GatedClient::new(&["pending"]);
    let mut orchestrator = AnalysisOrchestrator::new(client);

    orchestrator.submit_image_query("pending", "cGNn".into());
    orchestrator.reset_conversation();
    assert!(orchestrator.log().is_empty());

    gates["pending"].send(Ok("late answer".into())).unwrap();
    wait_for_events(&mut orchestrator, 1);

    // The reply still lands, relative to the now-empty log.
    let turns = orchestrator.log().turns();
    assert_eq!(turns.len(), 1);
    assert_eq!(turns[0].role, Role::Assistant);
    assert_eq!(turns[0].content, "late answer");
}
