//! Decks and flashcards.

use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::api::ApiClient;
use crate::engine::RequestOptions;
use crate::error::{Error, Result};

const NO_FLASHCARDS_MESSAGE: &str = "No flashcards found.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub per_page: u32,
    pub total_pages: u32,
    pub total_items: u32,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Pagination {
    /// A single empty page.
    pub fn empty(page: u32, per_page: u32) -> Self {
        Pagination {
            page,
            per_page,
            total_pages: 1,
            total_items: 0,
            has_next: false,
            has_prev: false,
        }
    }

    fn from_payload(data: &Value) -> Option<Self> {
        serde_json::from_value(data.get("pagination")?.clone()).ok()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DeckPage {
    pub decks: Vec<Value>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeckWithCards {
    pub deck: Value,
    pub flashcards: Vec<Value>,
    pub pagination: Option<Pagination>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlashcardDraft {
    pub front_text: String,
    pub back_text: String,
}

fn items(data: &Value) -> Option<Vec<Value>> {
    data.get("items").and_then(Value::as_array).cloned()
}

/// One page of decks. Failures are logged and produce an empty page.
pub async fn fetch_decks(api: &ApiClient, page: u32, per_page: u32) -> DeckPage {
    let path = format!("/decks?page={}&per_page={}", page, per_page);
    match api.get_json(&path, &RequestOptions::new()).await {
        Ok(data) => DeckPage {
            decks: items(&data).unwrap_or_default(),
            pagination: Pagination::from_payload(&data)
                .unwrap_or_else(|| Pagination::empty(page, per_page)),
        },
        Err(e) => {
            log::error!("Failed to fetch decks: {}", e);
            DeckPage {
                decks: Vec::new(),
                pagination: Pagination::empty(1, per_page),
            }
        }
    }
}

pub async fn fetch_deck_with_flashcards(
    api: &ApiClient,
    deck_id: u64,
    page: u32,
    per_page: u32,
) -> Result<DeckWithCards> {
    let opts = RequestOptions::new();
    let deck = api.get_json(&format!("/decks/{}", deck_id), &opts).await?;
    let cards = api
        .get_json(
            &format!("/flashcards?deck_id={}&page={}&per_page={}", deck_id, page, per_page),
            &opts,
        )
        .await?;

    if cards.get("message").and_then(Value::as_str) == Some(NO_FLASHCARDS_MESSAGE) {
        return Ok(DeckWithCards {
            deck,
            flashcards: Vec::new(),
            pagination: Some(Pagination::empty(1, per_page)),
        });
    }
    Ok(DeckWithCards {
        flashcards: items(&cards).unwrap_or_default(),
        pagination: Pagination::from_payload(&cards),
        deck,
    })
}

pub async fn add_flashcard(api: &ApiClient, deck_id: u64, card: &FlashcardDraft) -> Result<Value> {
    let body = json!({
        "deck_id": deck_id,
        "front_text": card.front_text,
        "back_text": card.back_text,
    });
    api.post_json("/flashcards", &body, &RequestOptions::new()).await
}

pub async fn update_flashcard(api: &ApiClient, flashcard_id: u64, card: &FlashcardDraft) -> Result<Value> {
    api.put_json(&format!("/flashcards/{}", flashcard_id), card, &RequestOptions::new())
        .await
}

async fn delete_checked(api: &ApiClient, path: &str, what: &str) -> Result<()> {
    let res = api.fetch(path, Method::DELETE, &RequestOptions::new()).await?;
    if !res.is_success() {
        return Err(Error::Http {
            status: res.status.as_u16(),
            message: format!("Failed to delete {}", what),
            body: Value::Null,
        });
    }
    Ok(())
}

pub async fn delete_flashcard(api: &ApiClient, flashcard_id: u64) -> Result<()> {
    delete_checked(api, &format!("/flashcards/{}", flashcard_id), "flashcard").await
}

/// Creates the deck, or updates it when `editing` (the deck must carry an `id`).
pub async fn save_deck(api: &ApiClient, deck: &Value, editing: bool) -> Result<Value> {
    let opts = RequestOptions::new();
    if !editing {
        return api.post_json("/decks", deck, &opts).await;
    }
    let id = deck
        .get("id")
        .and_then(Value::as_u64)
        .ok_or_else(|| Error::Config("deck id is required to update a deck".to_string()))?;
    api.put_json(&format!("/decks/{}", id), deck, &opts).await
}

pub async fn delete_deck(api: &ApiClient, deck_id: u64) -> Result<()> {
    delete_checked(api, &format!("/decks/{}", deck_id), "deck").await
}
