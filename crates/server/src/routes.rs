use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use uuid::Uuid;

use srs_core::model::{Card, Rating, RatingCounts, ReviewError};
use services::{SessionError, SessionPhase, StudySession};
use storage::repository::StorageError;

use crate::state::AppState;

pub fn app_router(state: AppState) -> Router {
    // The `/study` routes share one param position, so they share one param
    // name: a deck id for `start`, a session id everywhere else.
    Router::new()
        .route("/study/:id/start", post(start_study))
        .route("/study/:id", get(get_session))
        .route("/study/:id/reveal", post(reveal_answer))
        .route("/study/:id/answer", post(submit_answer))
        .route("/decks/:id/summaries", get(list_summaries))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

//
// ─── ERROR MAPPING ─────────────────────────────────────────────────────────────
//

enum ApiError {
    Session(SessionError),
    Rating(ReviewError),
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        Self::Session(err)
    }
}

impl From<ReviewError> for ApiError {
    fn from(err: ReviewError) -> Self {
        Self::Rating(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Rating(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            ApiError::Session(err) => {
                let status = match &err {
                    SessionError::NotFound
                    | SessionError::Storage(StorageError::NotFound) => StatusCode::NOT_FOUND,
                    SessionError::Empty
                    | SessionError::Completed
                    | SessionError::AnswerNotRevealed
                    | SessionError::AlreadyRevealed => StatusCode::CONFLICT,
                    _ => StatusCode::INTERNAL_SERVER_ERROR,
                };
                if status == StatusCode::INTERNAL_SERVER_ERROR {
                    log::warn!("request failed: {err}");
                }
                (status, err.to_string())
            }
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

//
// ─── WIRE SHAPES ───────────────────────────────────────────────────────────────
//

/// Question side only; the answer stays server-side until revealed.
#[derive(Serialize)]
struct CardView {
    id: u64,
    question: String,
}

impl CardView {
    fn from_card(card: &Card) -> Self {
        Self {
            id: card.id().value(),
            question: card.question().to_owned(),
        }
    }
}

#[derive(Serialize)]
struct ProgressView {
    completed: usize,
    total: usize,
}

#[derive(Serialize)]
struct StatsView {
    again: u32,
    hard: u32,
    good: u32,
    easy: u32,
    total: u32,
}

impl StatsView {
    fn from_counts(counts: RatingCounts) -> Self {
        Self {
            again: counts.again,
            hard: counts.hard,
            good: counts.good,
            easy: counts.easy,
            total: counts.total(),
        }
    }
}

#[derive(Serialize)]
struct SessionView {
    session_id: Uuid,
    card: Option<CardView>,
    answer_revealed: bool,
    progress: ProgressView,
    complete: bool,
    stats: StatsView,
}

impl SessionView {
    fn from_session(session_id: Uuid, session: &StudySession) -> Self {
        let progress = session.progress();
        Self {
            session_id,
            card: session.current_card().map(CardView::from_card),
            answer_revealed: session.phase() == SessionPhase::ShowingAnswer,
            progress: ProgressView {
                completed: progress.completed,
                total: progress.total,
            },
            complete: progress.is_complete,
            stats: StatsView::from_counts(session.counts()),
        }
    }
}

//
// ─── HANDLERS ──────────────────────────────────────────────────────────────────
//

async fn start_study(
    State(state): State<AppState>,
    Path(deck_id): Path<u64>,
) -> Result<Json<SessionView>, ApiError> {
    let session = state
        .session_loop
        .start_session(srs_core::model::DeckId::new(deck_id))
        .await?;

    let session_id = Uuid::new_v4();
    let view = SessionView::from_session(session_id, &session);
    state.sessions.lock().await.insert(session_id, session);

    log::info!("started session {session_id} for deck {deck_id}");
    Ok(Json(view))
}

async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SessionView>, ApiError> {
    let sessions = state.sessions.lock().await;
    let session = sessions.get(&session_id).ok_or(SessionError::NotFound)?;
    Ok(Json(SessionView::from_session(session_id, session)))
}

#[derive(Serialize)]
struct RevealResponse {
    answer: String,
}

async fn reveal_answer(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<RevealResponse>, ApiError> {
    let mut sessions = state.sessions.lock().await;
    let session = sessions
        .get_mut(&session_id)
        .ok_or(SessionError::NotFound)?;
    let answer = session.reveal_answer()?.to_owned();
    Ok(Json(RevealResponse { answer }))
}

#[derive(Deserialize)]
struct AnswerRequest {
    rating: u8,
}

async fn submit_answer(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(payload): Json<AnswerRequest>,
) -> Result<Json<SessionView>, ApiError> {
    let rating = Rating::from_u8(payload.rating)?;

    let mut sessions = state.sessions.lock().await;
    let session = sessions
        .get_mut(&session_id)
        .ok_or(SessionError::NotFound)?;

    let result = state.session_loop.answer_current(session, rating).await?;
    let view = SessionView::from_session(session_id, session);
    if result.is_complete {
        // The session is done; its results live on in storage.
        sessions.remove(&session_id);
        log::info!("session {session_id} complete");
    }

    Ok(Json(view))
}

#[derive(Serialize)]
struct SummaryView {
    started_at: chrono::DateTime<chrono::Utc>,
    finished_at: chrono::DateTime<chrono::Utc>,
    total: u32,
    again: u32,
    hard: u32,
    good: u32,
    easy: u32,
}

async fn list_summaries(
    State(state): State<AppState>,
    Path(deck_id): Path<u64>,
) -> Result<Json<Vec<SummaryView>>, ApiError> {
    let items = state
        .summaries
        .list_summaries(srs_core::model::DeckId::new(deck_id), 100)
        .await?;

    Ok(Json(
        items
            .into_iter()
            .map(|item| SummaryView {
                started_at: item.started_at,
                finished_at: item.finished_at,
                total: item.total,
                again: item.counts.again,
                hard: item.counts.hard,
                good: item.counts.good,
                easy: item.counts.easy,
            })
            .collect(),
    ))
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
