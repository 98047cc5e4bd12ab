use chrono::Duration;
use srs_core::model::{Card, CardId, Deck, DeckId, DeckSettings, Rating};
use srs_core::scheduler::{ScheduleState, Scheduler};
use srs_core::time::fixed_now;
use storage::repository::{
    CardRepository, DeckRepository, ReviewLogRecord, ReviewLogRepository, ReviewPersistence,
    SessionSummaryRepository,
};
use storage::sqlite::SqliteRepository;

fn build_deck(id: u64) -> Deck {
    Deck::new(
        DeckId::new(id),
        "Test",
        "",
        fixed_now(),
        DeckSettings::default(),
    )
    .unwrap()
}

fn build_card(id: u64, deck_id: DeckId) -> Card {
    Card::new(CardId::new(id), deck_id, "Q", "A", fixed_now()).unwrap()
}

#[tokio::test]
async fn sqlite_roundtrip_persists_schedule_state() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_roundtrip?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    let deck = build_deck(1);
    repo.upsert_deck(&deck).await.unwrap();

    let mut card = build_card(1, deck.id());
    let applied = Scheduler::new().apply_review(
        card.id(),
        &ScheduleState::new(),
        Rating::Easy,
        fixed_now(),
    );
    card.apply_review(&applied.outcome, fixed_now());
    repo.upsert_card(&card).await.unwrap();

    let fetched = repo
        .get_card(deck.id(), card.id())
        .await
        .expect("fetch")
        .expect("present");
    assert_eq!(fetched.schedule().interval_days, 4);
    assert_eq!(fetched.schedule().repetitions, 1);
    assert_eq!(fetched.last_review_at(), Some(fixed_now()));
    assert_eq!(fetched.next_review_at(), Some(applied.outcome.next_review));
}

#[tokio::test]
async fn sqlite_supports_due_new_and_logs() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_due_new?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    let deck = build_deck(1);
    repo.upsert_deck(&deck).await.unwrap();
    let now = fixed_now();

    // Two new cards, oldest first.
    repo.upsert_card(&build_card(1, deck.id())).await.unwrap();
    repo.upsert_card(&build_card(2, deck.id())).await.unwrap();

    let new_cards = repo.new_cards(deck.id(), 10).await.unwrap();
    assert_eq!(new_cards.len(), 2);
    assert_eq!(new_cards[0].id(), CardId::new(1));
    assert_eq!(new_cards[1].id(), CardId::new(2));

    // Review card 1 so it becomes due in the past.
    let mut card = new_cards[0].clone();
    let applied = Scheduler::new().apply_review(
        card.id(),
        &ScheduleState::new(),
        Rating::Good,
        now - Duration::days(2),
    );
    card.apply_review(&applied.outcome, now - Duration::days(2));
    let log = ReviewLogRecord::from_applied(deck.id(), &applied);
    let log_id = repo.apply_review(&card, log).await.unwrap();

    let due = repo.due_cards(deck.id(), now, 10).await.unwrap();
    assert_eq!(due.len(), 1);
    assert_eq!(due[0].id(), CardId::new(1));

    // The reviewed card left the new pool.
    let new_cards = repo.new_cards(deck.id(), 10).await.unwrap();
    assert_eq!(new_cards.len(), 1);
    assert_eq!(new_cards[0].id(), CardId::new(2));

    let logs = repo.logs_for_card(deck.id(), card.id()).await.unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].id, Some(log_id));
    assert_eq!(logs[0].rating, Rating::Good);
    assert_eq!(logs[0].next_review_at, applied.outcome.next_review);
}

#[tokio::test]
async fn sqlite_cascades_deletes_and_lists_summaries() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_cascade?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    let deck = build_deck(1);
    repo.upsert_deck(&deck).await.unwrap();
    repo.upsert_card(&build_card(1, deck.id())).await.unwrap();

    let now = fixed_now();
    let logs = vec![srs_core::model::ReviewLog::new(
        CardId::new(1),
        Rating::Good,
        now,
    )];
    let early = srs_core::model::SessionSummary::from_logs(
        deck.id(),
        now - Duration::days(1),
        now - Duration::days(1) + Duration::minutes(3),
        &logs,
    )
    .unwrap();
    let late = srs_core::model::SessionSummary::from_logs(
        deck.id(),
        now,
        now + Duration::minutes(3),
        &logs,
    )
    .unwrap();
    repo.append_summary(&early).await.unwrap();
    repo.append_summary(&late).await.unwrap();

    let summaries = repo.summaries_for_deck(deck.id(), 10).await.unwrap();
    assert_eq!(summaries.len(), 2);
    // Most recently finished first.
    assert_eq!(summaries[0].finished_at(), late.finished_at());

    repo.delete_deck(deck.id()).await.unwrap();
    assert!(repo.get_deck(deck.id()).await.unwrap().is_none());
    assert!(repo.list_cards(deck.id()).await.unwrap().is_empty());
    assert!(repo.summaries_for_deck(deck.id(), 10).await.unwrap().is_empty());
}
