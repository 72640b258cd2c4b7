use std::{sync::Arc, time::Instant};

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info, warn};

use crate::error::QuestError;
use crate::modules::daily_quests::{EnrichedQuest, QuestStats};
use crate::modules::wallet::ShopItem;

use super::{
    auth::{cron_authorized, AuthenticatedUser},
    blocking,
    state::AppState,
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyQuestsResponse {
    pub quests: Vec<EnrichedQuest>,
    pub all_completed: bool,
    pub bonus_claimed: bool,
    pub stats: QuestStats,
    pub current_date: NaiveDate,
}

pub async fn daily_quests_handler(
    State(state): State<Arc<AppState>>,
    AuthenticatedUser(user_id): AuthenticatedUser,
) -> Result<Json<DailyQuestsResponse>, QuestError> {
    let quests = state.quests.clone();
    let daily = blocking(move || quests.get_user_daily_quests(&user_id)).await?;

    Ok(Json(DailyQuestsResponse {
        quests: daily.quests.iter().map(EnrichedQuest::from).collect(),
        all_completed: daily.all_completed,
        bonus_claimed: daily.bonus_claimed,
        stats: daily.stats,
        current_date: daily.current_date,
    }))
}

pub async fn claim_bonus_handler(
    State(state): State<Arc<AppState>>,
    AuthenticatedUser(user_id): AuthenticatedUser,
) -> Result<Response, QuestError> {
    let quests = state.quests.clone();
    let claim = blocking(move || quests.claim_all_quests_bonus(&user_id)).await?;

    if !claim.success {
        return Ok((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Bonus already claimed or quests not completed" })),
        )
            .into_response());
    }

    Ok(Json(json!({
        "success": true,
        "bonus": claim.bonus,
        "message": format!("Congratulations! You earned {} bonus Koins!", claim.bonus),
    }))
    .into_response())
}

pub async fn wallet_handler(
    State(state): State<Arc<AppState>>,
    AuthenticatedUser(user_id): AuthenticatedUser,
) -> Result<Response, QuestError> {
    let wallet = state.wallet.clone();
    let balance = blocking(move || wallet.balance(&user_id)).await?;

    Ok(Json(json!({ "balance": balance })).into_response())
}

#[derive(Debug, Deserialize)]
pub struct PurchaseRequest {
    pub item: ShopItem,
    pub price: u32,
}

/// Debit the wallet for a shop item, then report the purchase to the daily quests.
/// Quest bookkeeping never fails the purchase.
pub async fn purchase_handler(
    State(state): State<Arc<AppState>>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Json(request): Json<PurchaseRequest>,
) -> Result<Response, QuestError> {
    let wallet = state.wallet.clone();
    let quests = state.quests.clone();

    let balance = blocking(move || {
        let balance = wallet.spend(&user_id, request.price)?;
        info!("{user_id} bought {:?} for {} Koins", request.item, request.price);

        if let Some(quest_type) = request.item.quest() {
            quests.track_quest(&user_id, quest_type, 1);
        }
        Ok(balance)
    })
    .await?;

    Ok(Json(json!({ "success": true, "balance": balance })).into_response())
}

/// Served on GET and POST. Only counts stale documents; each one renews on its owner's next read.
pub async fn reset_quests_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Response {
    let start = Instant::now();
    info!("Starting daily quest renewal check");

    if let Some(expected) = state.config.cron_secret.as_deref() {
        if !cron_authorized(&headers, expected) {
            let ip = headers
                .get("x-forwarded-for")
                .and_then(|value| value.to_str().ok())
                .unwrap_or("unknown");
            warn!("Unauthorized quest reset attempt from {ip}");

            return (StatusCode::UNAUTHORIZED, Json(json!({ "error": "Unauthorized" })))
                .into_response();
        }
    }

    let quests = state.quests.clone();
    let result = blocking(move || quests.count_expired_quests()).await;
    let duration = format!("{}ms", start.elapsed().as_millis());

    match result {
        Ok(summary) => {
            info!(
                "Quest renewal check done in {duration}: processed={}, renewed={}",
                summary.processed, summary.renewed
            );

            Json(json!({
                "success": true,
                "message": "Quest renewal check completed",
                "processed": summary.processed,
                "renewed": summary.renewed,
                "duration": duration,
                "timestamp": Utc::now().to_rfc3339(),
            }))
            .into_response()
        }
        Err(e) => {
            error!("Quest renewal check failed after {duration}: {e}");

            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "success": false,
                    "error": "Quest renewal check failed",
                    "duration": duration,
                })),
            )
                .into_response()
        }
    }
}

pub async fn healthz_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let database = state.database.clone();

    match blocking(move || database.ping()).await {
        Ok(()) => (StatusCode::OK, "ok"),
        Err(e) => {
            error!("Health check failed: {e}");
            (StatusCode::SERVICE_UNAVAILABLE, "unavailable")
        }
    }
}
