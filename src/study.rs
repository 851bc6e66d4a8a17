//! Study session data: one deck, all its cards, and the user's progress on them.

use serde::Serialize;
use serde_json::{json, Value};

use crate::api::ApiClient;
use crate::engine::RequestOptions;
use crate::error::Result;

#[derive(Debug, Clone, Serialize)]
pub struct StudySession {
    pub deck: Value,
    pub flashcards: Vec<Value>,
    pub progress: Vec<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CardProgress {
    pub study_count: u64,
    pub correct_attempts: u64,
    pub incorrect_attempts: u64,
    pub is_learned: bool,
}

/// Accepts `{items: [...]}` or a bare array.
fn card_list(data: Value) -> Vec<Value> {
    match data {
        Value::Array(a) => a,
        Value::Object(mut m) => match m.remove("items") {
            Some(Value::Array(a)) => a,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

pub async fn load_study_session(api: &ApiClient, deck_id: u64) -> Result<StudySession> {
    let opts = RequestOptions::new();
    let deck = api.get_json(&format!("/decks/{}", deck_id), &opts).await?;
    let flashcards = card_list(
        api.get_json(&format!("/flashcards?deck_id={}&all=true", deck_id), &opts)
            .await?,
    );
    let progress = match api
        .get_json(&format!("/progress/deck/{}", deck_id), &opts)
        .await?
    {
        Value::Array(a) => a,
        _ => Vec::new(),
    };
    Ok(StudySession {
        deck,
        flashcards,
        progress,
    })
}

/// Progress entry for `flashcard_id`, zeroed when the card was never studied.
pub fn card_progress(progress: &[Value], flashcard_id: u64) -> CardProgress {
    let Some(entry) = progress
        .iter()
        .find(|p| p.get("flashcard_id").and_then(Value::as_u64) == Some(flashcard_id))
    else {
        return CardProgress::default();
    };
    let count = |k: &str| entry.get(k).and_then(Value::as_u64).unwrap_or(0);
    CardProgress {
        study_count: count("study_count"),
        correct_attempts: count("correct_attempts"),
        incorrect_attempts: count("incorrect_attempts"),
        is_learned: entry.get("is_learned").and_then(Value::as_bool).unwrap_or(false),
    }
}

pub async fn record_answer(
    api: &ApiClient,
    deck_id: u64,
    flashcard_id: u64,
    was_correct: bool,
    minutes_spent: f64,
) -> Result<Value> {
    let body = json!({
        "deck_id": deck_id,
        "flashcard_id": flashcard_id,
        "was_correct": was_correct,
        "time_spent": minutes_spent,
    });
    api.post_json("/progress", &body, &RequestOptions::new()).await
}
