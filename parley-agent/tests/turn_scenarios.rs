use async_trait::async_trait;
use parley_agent::{CompletionSettings, TurnError, TurnProcessor};
use parley_core::session::{Role, SessionStore};
use parley_core::transcript::{TranscriptRecord, TranscriptWriter};
use parley_providers::{LLMProvider, LLMResponse, Message, ProviderError, ProviderResult};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::Barrier;

const INSTRUCTION: &str = "You help people find their next book.";

/// What the stub answers with for one call
enum Scripted {
    Reply(&'static str),
    Null,
    Fail,
}

/// Provider double: scripted answers first, then echoes the last user message
#[derive(Default)]
struct StubProvider {
    script: Mutex<VecDeque<Scripted>>,
    calls: AtomicUsize,
    seen: Mutex<Vec<Vec<Message>>>,
    delay: Option<Duration>,
    barrier: Option<Arc<Barrier>>,
}

impl StubProvider {
    fn scripted(answers: Vec<Scripted>) -> Self {
        Self {
            script: Mutex::new(answers.into()),
            ..Default::default()
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn seen(&self) -> Vec<Vec<Message>> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl LLMProvider for StubProvider {
    async fn chat(
        &self,
        messages: Vec<Message>,
        _model: Option<String>,
        _max_tokens: i32,
        _temperature: f64,
    ) -> ProviderResult<LLMResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(messages.clone());

        if let Some(barrier) = &self.barrier {
            barrier.wait().await;
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(Scripted::Reply(text)) => Ok(LLMResponse::text(text)),
            Some(Scripted::Null) => Ok(LLMResponse {
                content: None,
                ..LLMResponse::text("")
            }),
            Some(Scripted::Fail) => Err(ProviderError::ApiError(
                "HTTP 503 Service Unavailable: overloaded".to_string(),
            )),
            None => {
                let last = messages.last().map(|m| m.content.clone()).unwrap_or_default();
                Ok(LLMResponse::text(format!("echo: {}", last)))
            }
        }
    }
}

fn processor(provider: Arc<StubProvider>, dir: Option<&Path>) -> TurnProcessor {
    let writer = dir.map(|d| TranscriptWriter::new(d).unwrap());
    TurnProcessor::new(
        Arc::new(SessionStore::new(INSTRUCTION)),
        provider,
        writer,
        CompletionSettings::default(),
    )
}

fn transcript_files(dir: &Path, ext: &str) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .unwrap()
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.extension().and_then(|e| e.to_str()) == Some(ext))
        .collect();
    files.sort();
    files
}

fn read_record(path: &Path) -> TranscriptRecord {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

#[tokio::test]
async fn successful_turn_records_reply_and_writes_transcript() {
    let temp_dir = TempDir::new().unwrap();
    let provider = Arc::new(StubProvider::scripted(vec![Scripted::Reply("hi there")]));
    let turns = processor(provider.clone(), Some(temp_dir.path()));

    let reply = turns.handle_turn("s1", "hello").await.unwrap();
    assert_eq!(reply.as_deref(), Some("hi there"));

    let session = turns.store().snapshot("s1").await.unwrap();
    assert_eq!(session.len(), 3);
    assert_eq!(session.messages()[0].role, Role::Instruction);
    assert_eq!(session.conversation()[0].content, "hello");
    assert_eq!(session.conversation()[1].role, Role::Assistant);

    let seen = provider.seen();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0][0], Message::system(INSTRUCTION));
    assert_eq!(seen[0][1], Message::user("hello"));

    let json = transcript_files(temp_dir.path(), "json");
    assert_eq!(json.len(), 1);
    let record = read_record(&json[0]);
    assert_eq!(record.session_id, "s1");
    assert_eq!(record.messages.len(), 2);
    assert!(record.messages.iter().all(|m| m.role != Role::Instruction));

    let text = std::fs::read_to_string(&transcript_files(temp_dir.path(), "txt")[0]).unwrap();
    assert!(text.contains("user: hello\nassistant: hi there\n"));
}

#[tokio::test]
async fn blank_input_is_rejected_before_anything_happens() {
    let temp_dir = TempDir::new().unwrap();
    let provider = Arc::new(StubProvider::default());
    let turns = processor(provider.clone(), Some(temp_dir.path()));

    let err = turns.handle_turn("s1", "   ").await.unwrap_err();
    assert!(matches!(err, TurnError::EmptyInput));
    assert_eq!(provider.calls(), 0);
    assert!(!turns.store().contains("s1"));
    assert!(transcript_files(temp_dir.path(), "json").is_empty());

    turns.store().get_or_create("s2");
    let err = turns.handle_turn("s2", "\n\t").await.unwrap_err();
    assert!(matches!(err, TurnError::EmptyInput));
    assert_eq!(turns.store().snapshot("s2").await.unwrap().len(), 1);
}

#[tokio::test]
async fn user_text_is_trimmed_before_recording() {
    let provider = Arc::new(StubProvider::default());
    let turns = processor(provider, None);

    turns.handle_turn("s1", "  recommend a thriller \n").await.unwrap();
    let session = turns.store().snapshot("s1").await.unwrap();
    assert_eq!(session.conversation()[0].content, "recommend a thriller");
}

#[tokio::test]
async fn provider_failure_keeps_user_message_only() {
    let temp_dir = TempDir::new().unwrap();
    let provider = Arc::new(StubProvider::scripted(vec![Scripted::Fail]));
    let turns = processor(provider.clone(), Some(temp_dir.path()));

    let err = turns.handle_turn("s1", "hello").await.unwrap_err();
    assert!(matches!(
        err,
        TurnError::CompletionFailed(ProviderError::ApiError(_))
    ));

    let session = turns.store().snapshot("s1").await.unwrap();
    assert_eq!(session.len(), 2);
    assert_eq!(session.conversation()[0].role, Role::User);
    assert!(transcript_files(temp_dir.path(), "json").is_empty());
    assert!(transcript_files(temp_dir.path(), "txt").is_empty());
}

#[tokio::test]
async fn empty_reply_is_returned_without_recording() {
    let temp_dir = TempDir::new().unwrap();
    let provider = Arc::new(StubProvider::scripted(vec![
        Scripted::Reply(""),
        Scripted::Null,
    ]));
    let turns = processor(provider, Some(temp_dir.path()));

    let reply = turns.handle_turn("s1", "hello").await.unwrap();
    assert_eq!(reply.as_deref(), Some(""));
    let reply = turns.handle_turn("s1", "anyone there?").await.unwrap();
    assert_eq!(reply, None);

    let session = turns.store().snapshot("s1").await.unwrap();
    assert_eq!(session.len(), 3);
    assert!(session.conversation().iter().all(|m| m.role == Role::User));
    assert!(transcript_files(temp_dir.path(), "json").is_empty());
}

#[tokio::test]
async fn sequential_turns_write_distinct_transcripts() {
    let temp_dir = TempDir::new().unwrap();
    let provider = Arc::new(StubProvider::scripted(vec![
        Scripted::Reply("first answer"),
        Scripted::Reply("second answer"),
    ]));
    let turns = processor(provider.clone(), Some(temp_dir.path()));

    turns.handle_turn("s1", "one").await.unwrap();
    turns.handle_turn("s1", "two").await.unwrap();

    let json = transcript_files(temp_dir.path(), "json");
    assert_eq!(json.len(), 2);
    assert_eq!(transcript_files(temp_dir.path(), "txt").len(), 2);

    let mut sizes: Vec<usize> = json.iter().map(|p| read_record(p).messages.len()).collect();
    sizes.sort();
    assert_eq!(sizes, vec![2, 4]);

    // The second request carries the whole history.
    let seen = provider.seen();
    assert_eq!(seen[1].len(), 4);
    assert_eq!(seen[1][2], Message::assistant("first answer"));
}

#[tokio::test]
async fn disabled_persistence_writes_nothing() {
    let provider = Arc::new(StubProvider::default());
    let turns = processor(provider, None);
    assert!(!turns.persists_transcripts());

    turns.handle_turn("s1", "hello").await.unwrap();
    assert!(turns.persist_session("s1").await.unwrap().is_none());
}

#[tokio::test]
async fn persist_session_forces_a_final_transcript() {
    let temp_dir = TempDir::new().unwrap();
    let provider = Arc::new(StubProvider::default());
    let turns = processor(provider, Some(temp_dir.path()));

    assert!(turns.persist_session("unknown").await.unwrap().is_none());

    let id = turns.new_session();
    let paths = turns.persist_session(&id).await.unwrap().unwrap();
    let record = read_record(&paths.json);
    assert_eq!(record.session_id, id);
    assert!(record.messages.is_empty());
    assert_eq!(
        std::fs::read_to_string(&paths.text).unwrap().lines().count(),
        1
    );
}

#[tokio::test]
async fn persistence_failure_keeps_reply_in_history() {
    let temp_dir = TempDir::new().unwrap();
    let dir = temp_dir.path().join("conversations");
    let provider = Arc::new(StubProvider::scripted(vec![Scripted::Reply("kept")]));
    let turns = processor(provider, Some(&dir));
    std::fs::remove_dir_all(&dir).unwrap();

    let err = turns.handle_turn("s1", "hello").await.unwrap_err();
    assert_eq!(err.reply(), Some("kept"));
    assert!(matches!(err, TurnError::PersistenceFailed { .. }));

    let session = turns.store().snapshot("s1").await.unwrap();
    assert_eq!(session.len(), 3);
    assert_eq!(session.conversation()[1].content, "kept");
}

#[tokio::test]
async fn concurrent_turns_on_one_session_never_interleave() {
    let provider = Arc::new(StubProvider {
        delay: Some(Duration::from_millis(5)),
        ..Default::default()
    });
    let turns = Arc::new(processor(provider.clone(), None));

    let mut tasks = Vec::new();
    for i in 0..8 {
        let turns = turns.clone();
        tasks.push(tokio::spawn(async move {
            turns.handle_turn("shared", &format!("message {}", i)).await
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let session = turns.store().snapshot("shared").await.unwrap();
    let conversation = session.conversation();
    assert_eq!(conversation.len(), 16);
    for pair in conversation.chunks(2) {
        assert_eq!(pair[0].role, Role::User);
        assert_eq!(pair[1].role, Role::Assistant);
        assert_eq!(pair[1].content, format!("echo: {}", pair[0].content));
    }

    let mut lengths: Vec<usize> = provider.seen().iter().map(Vec::len).collect();
    lengths.sort();
    assert_eq!(lengths, vec![2, 4, 6, 8, 10, 12, 14, 16]);
}

#[tokio::test]
async fn distinct_sessions_proceed_concurrently() {
    // Both calls must be in flight at once to get past the barrier.
    let provider = Arc::new(StubProvider {
        barrier: Some(Arc::new(Barrier::new(2))),
        ..Default::default()
    });
    let turns = Arc::new(processor(provider.clone(), None));

    let a = {
        let turns = turns.clone();
        tokio::spawn(async move { turns.handle_turn("alice", "hi").await })
    };
    let b = {
        let turns = turns.clone();
        tokio::spawn(async move { turns.handle_turn("bob", "hello").await })
    };

    let joined = tokio::time::timeout(Duration::from_secs(5), async {
        (a.await.unwrap(), b.await.unwrap())
    })
    .await
    .expect("turns on different sessions blocked each other");

    assert_eq!(joined.0.unwrap().as_deref(), Some("echo: hi"));
    assert_eq!(joined.1.unwrap().as_deref(), Some("echo: hello"));
    assert_eq!(provider.calls(), 2);
}
