//! Integration tests for `PgSessionRepository`.

use chrono::{DateTime, Duration, TimeZone, Utc};
use sqlx::PgPool;
use storyfill_core::error::DomainError;
use storyfill_core::repository::{
    AddPlayerOutcome, SessionRepository, StoredAnswer, StoredChange, StoredPlayer,
};
use storyfill_store::pg_session_repository::PgSessionRepository;

fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap()
}

// --- create / load ---

#[sqlx::test(migrations = "../../migrations")]
async fn test_create_and_load_empty_session(pool: PgPool) {
    let repo = PgSessionRepository::new(pool);

    let session_id = repo.create_session(-100, fixed_now()).await.unwrap();

    let stored = repo.load_session(-100).await.unwrap().unwrap();
    assert_eq!(stored.session_id, session_id);
    assert_eq!(stored.status, "lobby");
    assert!(stored.players.is_empty());
    assert!(stored.question_plan.is_empty());
    assert_eq!(stored.created_at, fixed_now());
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_create_twice_for_same_chat_fails(pool: PgPool) {
    let repo = PgSessionRepository::new(pool);
    repo.create_session(-100, fixed_now()).await.unwrap();

    let result = repo.create_session(-100, fixed_now()).await;

    assert!(matches!(result, Err(DomainError::SessionExists(-100))));
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_load_missing_chat_returns_none(pool: PgPool) {
    let repo = PgSessionRepository::new(pool);

    let stored = repo.load_session(-404).await.unwrap();

    assert!(stored.is_none());
}

// --- header round-trip ---

#[sqlx::test(migrations = "../../migrations")]
async fn test_save_session_round_trips_header(pool: PgPool) {
    let repo = PgSessionRepository::new(pool);
    repo.create_session(-100, fixed_now()).await.unwrap();
    let mut stored = repo.load_session(-100).await.unwrap().unwrap();
    stored.status = "in_progress".to_owned();
    stored.question_plan = vec!["WHO".to_owned(), "WHOM".to_owned(), "WHY".to_owned(), "HOW_SAID".to_owned()];
    stored.current_question_index = 1;
    stored.current_options = vec!["a".to_owned(), "b".to_owned(), "c".to_owned(), "d".to_owned()];
    stored.render_anchor = Some(77);
    stored.updated_at = fixed_now() + Duration::minutes(3);

    repo.save_session(&stored).await.unwrap();

    let loaded = repo.load_session(-100).await.unwrap().unwrap();
    assert_eq!(loaded, stored);
}

// --- atomic commit ---

#[sqlx::test(migrations = "../../migrations")]
async fn test_commit_session_writes_rows_and_header_together(pool: PgPool) {
    let repo = PgSessionRepository::new(pool);
    repo.create_session(-100, fixed_now()).await.unwrap();
    let mut header = repo.load_session(-100).await.unwrap().unwrap();
    header.status = "countdown".to_owned();
    header.countdown_remaining = 30;
    let player = StoredPlayer {
        player_id: 1,
        display_name: "Aung".to_owned(),
        join_order: 0,
        turn_order: None,
    };

    repo.commit_session(&header, &[StoredChange::AddPlayer(player.clone())])
        .await
        .unwrap();

    let loaded = repo.load_session(-100).await.unwrap().unwrap();
    assert_eq!(loaded.status, "countdown");
    assert_eq!(loaded.countdown_remaining, 30);
    assert_eq!(loaded.players, vec![player]);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_commit_session_rolls_back_rows_when_header_write_fails(pool: PgPool) {
    let repo = PgSessionRepository::new(pool);
    let session_id = repo.create_session(-100, fixed_now()).await.unwrap();
    let before = repo.load_session(-100).await.unwrap().unwrap();
    let mut header = before.clone();
    // Longer than the status column allows, so the header write fails last.
    header.status = "x".repeat(40);
    let changes = [
        StoredChange::RecordAnswer(StoredAnswer {
            question_index: 0,
            question_id: "WHO".to_owned(),
            player_id: 1,
            value: "Taffy".to_owned(),
        }),
        StoredChange::MarkUsed {
            category: "character".to_owned(),
            value: "Taffy".to_owned(),
        },
    ];

    let result = repo.commit_session(&header, &changes).await;

    assert!(matches!(result, Err(DomainError::Infrastructure(_))));
    assert_eq!(repo.load_session(-100).await.unwrap().unwrap(), before);
    assert!(repo.list_used(session_id, "character").await.unwrap().is_empty());
}

// --- players ---

#[sqlx::test(migrations = "../../migrations")]
async fn test_add_player_is_idempotent(pool: PgPool) {
    let repo = PgSessionRepository::new(pool);
    let session_id = repo.create_session(-100, fixed_now()).await.unwrap();
    repo.add_player(session_id, 1, "Aung", 0).await.unwrap();

    let outcome = repo.add_player(session_id, 1, "Aung", 1).await.unwrap();

    assert_eq!(outcome, AddPlayerOutcome::AlreadyExists);
    let stored = repo.load_session(-100).await.unwrap().unwrap();
    assert_eq!(stored.players.len(), 1);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_assign_turn_order_reorders_players(pool: PgPool) {
    let repo = PgSessionRepository::new(pool);
    let session_id = repo.create_session(-100, fixed_now()).await.unwrap();
    for (join_order, player_id) in [(0, 10), (1, 20), (2, 30), (3, 40)] {
        repo.add_player(session_id, player_id, "p", join_order).await.unwrap();
    }

    let players = repo.assign_turn_order(session_id, &[30, 10, 40, 20]).await.unwrap();

    let ids: Vec<i64> = players.iter().map(|p| p.player_id).collect();
    assert_eq!(ids, vec![30, 10, 40, 20]);
    let turns: Vec<Option<i32>> = players.iter().map(|p| p.turn_order).collect();
    assert_eq!(turns, vec![Some(0), Some(1), Some(2), Some(3)]);
}

// --- answers and used pools ---

#[sqlx::test(migrations = "../../migrations")]
async fn test_record_answer_upserts_by_question_index(pool: PgPool) {
    let repo = PgSessionRepository::new(pool);
    let session_id = repo.create_session(-100, fixed_now()).await.unwrap();
    let mut answer = StoredAnswer {
        question_index: 0,
        question_id: "WHO".to_owned(),
        player_id: 1,
        value: "Taffy".to_owned(),
    };
    repo.record_answer(session_id, &answer).await.unwrap();
    answer.value = "Ya Mone".to_owned();

    repo.record_answer(session_id, &answer).await.unwrap();

    let stored = repo.load_session(-100).await.unwrap().unwrap();
    assert_eq!(stored.answers, vec![answer]);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_used_pools_are_kept_per_category(pool: PgPool) {
    let repo = PgSessionRepository::new(pool);
    let session_id = repo.create_session(-100, fixed_now()).await.unwrap();
    repo.mark_used(session_id, "character", "Taffy").await.unwrap();
    repo.mark_used(session_id, "character", "Taffy").await.unwrap();
    repo.mark_used(session_id, "option_WHY", "because").await.unwrap();

    let characters = repo.list_used(session_id, "character").await.unwrap();
    let reasons = repo.list_used(session_id, "option_WHY").await.unwrap();

    assert_eq!(characters.into_iter().collect::<Vec<_>>(), vec!["Taffy".to_owned()]);
    assert_eq!(reasons.len(), 1);
}

// --- deletion and maintenance ---

#[sqlx::test(migrations = "../../migrations")]
async fn test_delete_session_cascades_children(pool: PgPool) {
    let repo = PgSessionRepository::new(pool);
    let session_id = repo.create_session(-100, fixed_now()).await.unwrap();
    repo.add_player(session_id, 1, "Aung", 0).await.unwrap();
    repo.mark_used(session_id, "character", "Taffy").await.unwrap();

    let deleted = repo.delete_session(-100).await.unwrap();

    assert!(deleted);
    assert!(repo.load_session(-100).await.unwrap().is_none());
    assert!(repo.list_used(session_id, "character").await.unwrap().is_empty());
    assert!(!repo.delete_session(-100).await.unwrap());
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_open_lobbies_and_count(pool: PgPool) {
    let repo = PgSessionRepository::new(pool);
    repo.create_session(-2, fixed_now()).await.unwrap();
    repo.create_session(-1, fixed_now()).await.unwrap();
    let mut started = repo.load_session(-1).await.unwrap().unwrap();
    started.status = "in_progress".to_owned();
    repo.save_session(&started).await.unwrap();

    let open = repo.list_open_lobbies().await.unwrap();
    let count = repo.count_active_sessions().await.unwrap();

    assert_eq!(open, vec![-2]);
    assert_eq!(count, 2);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_delete_stale_sessions_returns_removed_chats(pool: PgPool) {
    let repo = PgSessionRepository::new(pool);
    repo.create_session(-1, fixed_now()).await.unwrap();
    repo.create_session(-2, fixed_now() + Duration::hours(30)).await.unwrap();

    let removed = repo
        .delete_stale_sessions(fixed_now() + Duration::hours(24))
        .await
        .unwrap();

    assert_eq!(removed, vec![-1]);
    assert_eq!(repo.count_active_sessions().await.unwrap(), 1);
}
