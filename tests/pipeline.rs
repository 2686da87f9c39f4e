//! Response pipeline integration tests

use std::sync::Arc;
use std::time::Duration;

use hearth::TriggerEvent;
use hearth::pipeline::STREAM_CHUNK_CHARS;
use hearth::speech::{SpeechGate, SpeechJob};

mod common;
use common::{
    FailingInference, FixedInference, RecordingDevice, SpeechCall, collect_reply, setup_arbiter,
};

#[tokio::test(start_paused = true)]
async fn long_replies_stream_in_fixed_chunks() {
    let reply = "z".repeat(123);
    let fx = setup_arbiter(Arc::new(FixedInference(reply.clone())));

    let rx = fx
        .arbiter
        .dispatch(TriggerEvent::DirectText {
            text: "tell me everything".to_string(),
        })
        .expect("reply");

    let chunks = collect_reply(rx).await;
    assert_eq!(chunks.len(), 3);
    assert!(chunks.iter().all(|c| c.chars().count() <= STREAM_CHUNK_CHARS));
    assert_eq!(chunks[0].chars().count(), STREAM_CHUNK_CHARS);
    assert_eq!(chunks.concat(), reply);
}

#[tokio::test]
async fn reply_is_recorded_in_history_and_status_line() {
    let fx = setup_arbiter(Arc::new(FixedInference("It is blue.".to_string())));

    let rx = fx
        .arbiter
        .dispatch(TriggerEvent::DirectText {
            text: "what color is the sky".to_string(),
        })
        .expect("reply");
    drop(collect_reply(rx).await);

    let recent = fx.history.recent(10).unwrap();
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].user_text, "what color is the sky");
    assert_eq!(recent[0].assistant_text, "It is blue.");

    let snapshot = fx.arbiter.snapshot();
    assert_eq!(snapshot.current_line, "Assistant: It is blue.");
}

#[tokio::test]
async fn inference_failure_becomes_error_text() {
    let fx = setup_arbiter(Arc::new(FailingInference));

    let rx = fx
        .arbiter
        .dispatch(TriggerEvent::DirectText {
            text: "hi".to_string(),
        })
        .expect("reply even on failure");

    let text = collect_reply(rx).await.concat();
    assert!(text.starts_with("Error: "), "got: {text}");
}

#[tokio::test]
async fn reply_is_spoken_when_voice_enabled() {
    let fx = setup_arbiter(Arc::new(FixedInference("Sure thing.".to_string())));

    let rx = fx
        .arbiter
        .dispatch(TriggerEvent::DirectText {
            text: "hi".to_string(),
        })
        .expect("reply");
    drop(collect_reply(rx).await);

    let calls = fx.speech_calls.lock().unwrap();
    assert_eq!(calls[0], SpeechCall::Configure { rate_wpm: 150 });
    assert!(calls.contains(&SpeechCall::Chunk("Sure thing.".to_string())));
    assert_eq!(*calls.last().unwrap(), SpeechCall::Wait);
}

#[tokio::test]
async fn reply_is_silent_when_voice_disabled() {
    let fx = setup_arbiter(Arc::new(FixedInference("Sure thing.".to_string())));

    let mut settings = fx.settings.get().unwrap();
    settings.voice_enabled = false;
    fx.settings.set(&settings).unwrap();

    let rx = fx
        .arbiter
        .dispatch(TriggerEvent::DirectText {
            text: "hi".to_string(),
        })
        .expect("reply");
    let chunks = collect_reply(rx).await;

    assert_eq!(chunks.concat(), "Sure thing.");
    assert!(fx.speech_calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn speech_gate_never_interleaves_replies() {
    let (device, calls) = RecordingDevice::with_delay(Duration::from_millis(5));
    let gate = Arc::new(SpeechGate::new(Box::new(device), 150, 0.9));

    let first = {
        let gate = Arc::clone(&gate);
        tokio::spawn(async move {
            gate.speak(&SpeechJob {
                text: "xxxxxx".to_string(),
                chunk_size: 2,
            })
            .await
        })
    };
    let second = {
        let gate = Arc::clone(&gate);
        tokio::spawn(async move {
            gate.speak(&SpeechJob {
                text: "yyyyyy".to_string(),
                chunk_size: 2,
            })
            .await
        })
    };

    first.await.unwrap().unwrap();
    second.await.unwrap().unwrap();

    let calls = calls.lock().unwrap();
    let chunks: Vec<&str> = calls
        .iter()
        .filter_map(|c| match c {
            SpeechCall::Chunk(text) => Some(text.as_str()),
            _ => None,
        })
        .collect();

    assert_eq!(chunks.len(), 6);
    // Each reply's chunks form one contiguous run
    let joined = chunks.concat();
    assert!(
        joined == "xxxxxxyyyyyy" || joined == "yyyyyyxxxxxx",
        "interleaved: {joined}"
    );
}

#[tokio::test]
async fn dropped_stream_receiver_still_records_and_speaks() {
    let fx = setup_arbiter(Arc::new(FixedInference("Noted.".to_string())));

    let rx = fx
        .arbiter
        .dispatch(TriggerEvent::DirectText {
            text: "remember this".to_string(),
        })
        .expect("reply");
    drop(rx);

    // Give the detached pipeline task time to finish; speech is its last step
    let mut waited = 0;
    loop {
        tokio::time::sleep(Duration::from_millis(20)).await;
        let done = fx
            .speech_calls
            .lock()
            .unwrap()
            .iter()
            .any(|c| matches!(c, SpeechCall::Wait));
        if done || waited > 100 {
            break;
        }
        waited += 1;
    }

    let recent = fx.history.recent(10).unwrap();
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].assistant_text, "Noted.");

    // Speech still happened
    let spoke = fx
        .speech_calls
        .lock()
        .unwrap()
        .iter()
        .any(|c| matches!(c, SpeechCall::Chunk(text) if text == "Noted."));
    assert!(spoke);
}
