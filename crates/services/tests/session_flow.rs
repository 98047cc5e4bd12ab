use std::sync::Arc;

use srs_core::model::{Card, CardId, Deck, DeckId, DeckSettings, Rating};
use srs_core::time::fixed_now;
use services::{Clock, SessionError, SessionLoopService, SummaryService};
use storage::repository::{
    CardRepository, DeckRepository, InMemoryRepository, ReviewLogRepository,
};

fn loop_service(repo: &InMemoryRepository) -> SessionLoopService {
    SessionLoopService::new(
        Clock::Fixed(fixed_now()),
        Arc::new(repo.clone()),
        Arc::new(repo.clone()),
        Arc::new(repo.clone()),
        Arc::new(repo.clone()),
    )
}

async fn seed_deck(repo: &InMemoryRepository, cards: u64) -> DeckId {
    let now = fixed_now();
    let deck = Deck::new(
        DeckId::new(1),
        "Smoke Deck",
        "",
        now,
        DeckSettings::default(),
    )
    .unwrap();
    repo.upsert_deck(&deck).await.unwrap();

    for id in 1..=cards {
        let card = Card::new(
            CardId::new(id),
            deck.id(),
            format!("Q{id}"),
            format!("A{id}"),
            now,
        )
        .unwrap();
        repo.upsert_card(&card).await.unwrap();
    }
    deck.id()
}

#[tokio::test]
async fn full_session_persists_reviews_and_summary() {
    let repo = InMemoryRepository::new();
    let deck_id = seed_deck(&repo, 3).await;
    let loop_svc = loop_service(&repo);

    let mut session = loop_svc.start_session(deck_id).await.unwrap();
    assert_eq!(session.total_cards(), 3);

    let ratings = [Rating::Good, Rating::Again, Rating::Easy];
    for rating in ratings {
        session.reveal_answer().unwrap();
        loop_svc.answer_current(&mut session, rating).await.unwrap();
    }
    assert!(session.is_complete());
    session.summary_id().expect("summary persisted");

    // Every answer left a log behind.
    for id in 1..=3 {
        let logs = repo.logs_for_card(deck_id, CardId::new(id)).await.unwrap();
        assert_eq!(logs.len(), 1);
    }

    // The cards were rescheduled in storage.
    let card = repo
        .get_card(deck_id, CardId::new(1))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(card.schedule().repetitions, 1);
    assert!(!card.is_new());

    let summaries = SummaryService::new(Clock::Fixed(fixed_now()), Arc::new(repo))
        .list_summaries(deck_id, 10)
        .await
        .unwrap();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].total, 3);
    assert_eq!(summaries[0].counts.again, 1);
    assert_eq!(summaries[0].counts.good, 1);
    assert_eq!(summaries[0].counts.easy, 1);
}

#[tokio::test]
async fn answer_without_reveal_is_rejected_and_nothing_persists() {
    let repo = InMemoryRepository::new();
    let deck_id = seed_deck(&repo, 1).await;
    let loop_svc = loop_service(&repo);

    let mut session = loop_svc.start_session(deck_id).await.unwrap();
    let err = loop_svc
        .answer_current(&mut session, Rating::Good)
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::AnswerNotRevealed));

    let logs = repo.logs_for_card(deck_id, CardId::new(1)).await.unwrap();
    assert!(logs.is_empty());
}

#[tokio::test]
async fn unknown_deck_is_not_found_and_empty_deck_is_empty() {
    let repo = InMemoryRepository::new();
    let loop_svc = loop_service(&repo);

    let err = loop_svc.start_session(DeckId::new(404)).await.unwrap_err();
    assert!(matches!(err, SessionError::NotFound));

    let deck_id = seed_deck(&repo, 0).await;
    let err = loop_svc.start_session(deck_id).await.unwrap_err();
    assert!(matches!(err, SessionError::Empty));
}

#[tokio::test]
async fn session_falls_back_to_whole_deck_when_nothing_is_due() {
    let repo = InMemoryRepository::new();
    let deck_id = seed_deck(&repo, 2).await;
    let loop_svc = loop_service(&repo);

    // Review both cards so nothing is new and nothing is due at the fixed
    // instant (both got pushed into the future).
    let mut warmup = loop_svc.start_session(deck_id).await.unwrap();
    while !warmup.is_complete() {
        warmup.reveal_answer().unwrap();
        loop_svc
            .answer_current(&mut warmup, Rating::Easy)
            .await
            .unwrap();
    }

    let session = loop_svc.start_session(deck_id).await.unwrap();
    assert_eq!(session.total_cards(), 2);
}
