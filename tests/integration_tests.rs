use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        Request, StatusCode,
    },
    Router,
};
use chrono::{Duration, NaiveDate};
use koin_quests::{
    build_router,
    clock::{Clock, FixedClock},
    modules::{
        daily_quests::{catalog::find_definition, DailyQuestDatabase, DailyQuestSet, QuestInstance},
        sessions::SessionDatabase,
        wallet::WalletDatabase,
    },
    AppState, Config, DailyQuestService, Database, QuestType, UserDailyQuests,
};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

struct Harness {
    app: Router,
    database: Database,
    clock: Arc<FixedClock>,
}

fn harness(cron_secret: Option<&str>) -> Harness {
    let database = Database::in_memory().unwrap();
    let clock = Arc::new(FixedClock::on_date(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()));
    let config = Config {
        port: 0,
        database_path: ":memory:".into(),
        cron_secret: cron_secret.map(str::to_string),
    };

    database
        .insert_session("token-u1", "u1", clock.now() + Duration::days(30))
        .unwrap();

    let state = AppState::with_clock(config, database.clone(), clock.clone());
    Harness {
        app: build_router(state),
        database,
        clock,
    }
}

fn seed_quests(harness: &Harness, owner: &str, types: [QuestType; 3]) {
    let quests: Vec<QuestInstance> = types
        .iter()
        .map(|t| {
            let def = find_definition(*t).unwrap();
            QuestInstance::pending(*t, def.target_count, def.reward)
        })
        .collect();
    let daily = UserDailyQuests::new(
        owner,
        harness.clock.today(),
        DailyQuestSet::try_from(quests).unwrap(),
        harness.clock.now(),
    );
    harness.database.save_daily_quests(&daily, 0).unwrap().unwrap();
}

async fn send(app: &Router, method: &str, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
    send_json(app, method, uri, token, None).await
}

async fn send_json(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    json: Option<Value>,
) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        request = request.header(AUTHORIZATION, format!("Bearer {token}"));
    }

    let body = match json {
        Some(json) => {
            request = request.header(CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = app.clone().oneshot(request.body(body).unwrap()).await.unwrap();

    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

#[tokio::test]
async fn test_daily_quests_require_a_session() {
    let h = harness(None);

    let (status, body) = send(&h.app, "GET", "/api/quests/daily", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());

    let (status, _) = send(&h.app, "GET", "/api/quests/daily", Some("forged")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&h.app, "POST", "/api/quests/claim-bonus", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_first_visit_gets_three_enriched_quests() {
    let h = harness(None);

    let (status, body) = send(&h.app, "GET", "/api/quests/daily", Some("token-u1")).await;
    assert_eq!(status, StatusCode::OK);

    let quests = body["quests"].as_array().expect("quests array");
    assert_eq!(quests.len(), 3);
    for quest in quests {
        assert_eq!(quest["currentProgress"], 0);
        assert_eq!(quest["completed"], false);
        assert!(!quest["title"].as_str().unwrap().is_empty());
        assert!(!quest["icon"].as_str().unwrap().is_empty());
    }

    let mut types: Vec<&str> = quests.iter().map(|q| q["questType"].as_str().unwrap()).collect();
    types.sort();
    types.dedup();
    assert_eq!(types.len(), 3);

    assert_eq!(body["allCompleted"], false);
    assert_eq!(body["bonusClaimed"], false);
    assert_eq!(body["currentDate"], "2024-01-01");
    assert_eq!(body["stats"]["currentStreak"], 0);
}

#[tokio::test]
async fn test_completing_the_day_and_claiming_the_bonus() {
    let h = harness(None);
    seed_quests(&h, "u1", [QuestType::FeedMonster, QuestType::ChangeBackground, QuestType::EquipAccessory]);

    let (status, _) = send(&h.app, "POST", "/api/quests/claim-bonus", Some("token-u1")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Primary actions report progress through the best-effort path.
    let quests = DailyQuestService::with_clock(h.database.clone(), h.clock.clone());
    for _ in 0..5 {
        quests.track_quest("u1", QuestType::FeedMonster, 1);
    }
    quests.track_quest("u1", QuestType::ChangeBackground, 1);
    quests.track_quest("u1", QuestType::EquipAccessory, 2);

    let (_, wallet) = send(&h.app, "GET", "/api/wallet", Some("token-u1")).await;
    assert_eq!(wallet["balance"], 20 + 15 + 20);

    let (_, daily) = send(&h.app, "GET", "/api/quests/daily", Some("token-u1")).await;
    assert_eq!(daily["allCompleted"], true);
    assert_eq!(daily["stats"]["totalQuestsCompleted"], 3);

    let (status, body) = send(&h.app, "POST", "/api/quests/claim-bonus", Some("token-u1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["bonus"], 50);

    let (status, _) = send(&h.app, "POST", "/api/quests/claim-bonus", Some("token-u1")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, wallet) = send(&h.app, "GET", "/api/wallet", Some("token-u1")).await;
    assert_eq!(wallet["balance"], 105);
    assert_eq!(h.database.wallet_balance("u1").unwrap(), 105);

    // Next day the streak continues and the bonus is available again.
    h.clock.advance_days(1);
    let (_, next) = send(&h.app, "GET", "/api/quests/daily", Some("token-u1")).await;
    assert_eq!(next["currentDate"], "2024-01-02");
    assert_eq!(next["stats"]["currentStreak"], 1);
    assert_eq!(next["bonusClaimed"], false);
    assert_eq!(next["stats"]["totalKoinsEarned"], 105);
}

#[tokio::test]
async fn test_purchase_debits_wallet_and_tracks_the_quest() {
    let h = harness(None);
    seed_quests(&h, "u1", [QuestType::BuyAccessory, QuestType::EvolveMonster, QuestType::FeedMonster]);
    let purchase = json!({ "item": "accessory", "price": 30 });

    let (status, _) = send_json(&h.app, "POST", "/api/shop/purchase", None, Some(purchase.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) =
        send_json(&h.app, "POST", "/api/shop/purchase", Some("token-u1"), Some(purchase.clone())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("Insufficient funds"));

    // Evolving pays 50 Koins.
    let quests = DailyQuestService::with_clock(h.database.clone(), h.clock.clone());
    quests.track_quest("u1", QuestType::EvolveMonster, 1);

    let (status, body) =
        send_json(&h.app, "POST", "/api/shop/purchase", Some("token-u1"), Some(purchase)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["balance"], 20);

    // The purchase completed buy_accessory, which pays 40 on top.
    let (_, daily) = send(&h.app, "GET", "/api/quests/daily", Some("token-u1")).await;
    let bought = daily["quests"]
        .as_array()
        .unwrap()
        .iter()
        .find(|q| q["questType"] == "buy_accessory")
        .unwrap();
    assert_eq!(bought["completed"], true);

    let (_, wallet) = send(&h.app, "GET", "/api/wallet", Some("token-u1")).await;
    assert_eq!(wallet["balance"], 60);

    // Backgrounds are not tracked on purchase.
    let background = json!({ "item": "background", "price": 60 });
    let (status, body) =
        send_json(&h.app, "POST", "/api/shop/purchase", Some("token-u1"), Some(background)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["balance"], 0);
}

#[tokio::test]
async fn test_purchase_survives_quest_tracking_failure() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("quests.db");
    let database = Database::open(&path).unwrap();
    let clock = Arc::new(FixedClock::on_date(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()));
    database
        .insert_session("token-u1", "u1", clock.now() + Duration::days(1))
        .unwrap();

    let quests = DailyQuestService::with_clock(database.clone(), clock.clone());
    let daily = quests.get_user_daily_quests("u1").unwrap();
    for quest in daily.quests.iter() {
        quests.track_quest("u1", quest.quest_type, quest.target_count);
    }
    let funded = database.wallet_balance("u1").unwrap();
    assert!(funded >= 15);

    let raw = rusqlite::Connection::open(&path).unwrap();
    raw.execute("DROP TABLE daily_quests", []).unwrap();
    drop(raw);

    let config = Config {
        port: 0,
        database_path: path.clone(),
        cron_secret: None,
    };
    let app = build_router(AppState::with_clock(config, database.clone(), clock));

    let purchase = json!({ "item": "accessory", "price": 10 });
    let (status, body) = send_json(&app, "POST", "/api/shop/purchase", Some("token-u1"), Some(purchase)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["balance"], funded - 10);
    assert_eq!(database.wallet_balance("u1").unwrap(), funded - 10);
}

#[tokio::test]
async fn test_cron_reset_counts_without_renewing() {
    let h = harness(Some("s3cret"));
    seed_quests(&h, "u1", [QuestType::FeedMonster, QuestType::BuyAccessory, QuestType::CollectKoins]);
    seed_quests(&h, "u2", [QuestType::EvolveMonster, QuestType::BuyAccessory, QuestType::CollectKoins]);
    h.clock.advance_days(1);

    let (status, body) = send(&h.app, "GET", "/api/cron/reset-quests", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());

    let (status, _) = send(&h.app, "POST", "/api/cron/reset-quests", Some("wrong")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(&h.app, "POST", "/api/cron/reset-quests", Some("s3cret")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["processed"], 2);
    assert_eq!(body["renewed"], 0);

    // Documents are still stale until their owners read them.
    assert_eq!(h.database.count_stale_daily_quests(h.clock.today()).unwrap(), 2);
    send(&h.app, "GET", "/api/quests/daily", Some("token-u1")).await;
    assert_eq!(h.database.count_stale_daily_quests(h.clock.today()).unwrap(), 1);
}

#[tokio::test]
async fn test_cron_reset_is_open_without_secret() {
    let h = harness(None);

    let (status, body) = send(&h.app, "GET", "/api/cron/reset-quests", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["processed"], 0);
}

#[tokio::test]
async fn test_storage_failure_surfaces_as_500() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("quests.db");
    let database = Database::open(&path).unwrap();
    let clock = Arc::new(FixedClock::on_date(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()));
    database
        .insert_session("token-u1", "u1", clock.now() + Duration::days(1))
        .unwrap();

    // Break the quests table behind the service's back.
    let raw = rusqlite::Connection::open(&path).unwrap();
    raw.execute("DROP TABLE daily_quests", []).unwrap();
    drop(raw);

    let config = Config {
        port: 0,
        database_path: path.clone(),
        cron_secret: None,
    };
    let app = build_router(AppState::with_clock(config, database, clock));

    let (status, body) = send(&app, "GET", "/api/quests/daily", Some("token-u1")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Internal server error");

    let (status, body) = send(&app, "GET", "/api/cron/reset-quests", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_healthz() {
    let h = harness(None);
    let response = h
        .app
        .clone()
        .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
