//! PostgreSQL store integration tests
//!
//! Require a migrated database:
//! DATABASE_URL=... cargo test --test integration_event_store -- --ignored

use chrono::Utc;
use rust_decimal_macros::dec;
use uuid::Uuid;

use user_dashboard::domain::{Address, OperationContext, UserEvent, UserProfile};
use user_dashboard::event_store::{
    DocumentStore, EventStore, PgUserStore, SnapshotStore, StoreError,
};
use user_dashboard::handlers::{
    AdjustWalletCommand, AdjustWalletHandler, CreateUserCommand, CreateUserHandler,
};
use user_dashboard::projection::{ProjectionService, UserDashboardStats};
use user_dashboard::AppError;

mod common;

fn profile(email: &str) -> UserProfile {
    UserProfile {
        name: "Ann".to_string(),
        email: email.to_string(),
        address: Address::new("1 Main Street", "12345"),
        ..Default::default()
    }
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_append_and_read_stream() {
    let store = PgUserStore::new(common::setup_test_db().await);
    let stream_id = Uuid::new_v4();
    let context = OperationContext::new().with_correlation_id(Uuid::new_v4());

    let created = UserEvent::UserCreated {
        user_id: stream_id,
        name: "Ann".to_string(),
        email: "ann@x.com".to_string(),
        created_at: Utc::now(),
    };
    assert_eq!(store.append_event(stream_id, &created, Some(0), &context).await.unwrap(), 1);

    let adjusted = UserEvent::UserWalletBalanceAdjusted { amount: dec!(12.5) };
    assert_eq!(store.append_event(stream_id, &adjusted, Some(1), &context).await.unwrap(), 2);

    let events = store.read_stream(stream_id).await.unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[1].event, adjusted);
    assert_eq!(events[0].context, context);

    // Stale expectation loses
    let result = store.append_event(stream_id, &adjusted, Some(1), &context).await;
    assert!(matches!(result, Err(StoreError::ConcurrencyConflict { .. })));

    // Streams only start with UserCreated
    let result = store
        .append_event(Uuid::new_v4(), &adjusted, None, &context)
        .await;
    assert!(matches!(result, Err(StoreError::StreamNotFound(_))));
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_handlers_against_postgres() {
    let store = PgUserStore::new(common::setup_test_db().await);
    let projection = ProjectionService::default();
    let context = OperationContext::new();
    let user_id = Uuid::new_v4();

    CreateUserHandler::new(&store, projection)
        .execute(CreateUserCommand::new(user_id, profile("pg.ann@x.com")), &context)
        .await
        .unwrap();
    AdjustWalletHandler::new(&store, projection)
        .execute(AdjustWalletCommand::new(user_id, "50"), &context)
        .await
        .unwrap();
    AdjustWalletHandler::new(&store, projection)
        .execute(AdjustWalletCommand::new(user_id, "-20"), &context)
        .await
        .unwrap();

    let inline = store.load_snapshot(user_id).await.unwrap().unwrap();
    assert_eq!(inline.current_total_wallet_balance, dec!(30));

    let rebuilt = UserDashboardStats::rebuild(&store.read_stream(user_id).await.unwrap())
        .unwrap()
        .unwrap();
    assert_eq!(inline, rebuilt);

    let document = store.load_document(user_id).await.unwrap().unwrap();
    assert_eq!(document.wallet_balance(), dec!(30));

    // Unique index on lower(email)
    let duplicate = CreateUserHandler::new(&store, projection)
        .execute(CreateUserCommand::new(Uuid::new_v4(), profile("PG.Ann@X.com")), &context)
        .await;
    assert!(matches!(duplicate, Err(AppError::UserAlreadyExists(_))));
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_snapshot_never_moves_backwards() {
    let store = PgUserStore::new(common::setup_test_db().await);
    let id = Uuid::new_v4();
    let events = [
        UserEvent::UserCreated {
            user_id: id,
            name: "Ann".to_string(),
            email: "ann@x.com".to_string(),
            created_at: Utc::now(),
        },
        UserEvent::UserWalletBalanceAdjusted { amount: dec!(3) },
    ];

    let older = UserDashboardStats::replay(&events[..1]).unwrap().unwrap();
    let newer = UserDashboardStats::replay(&events).unwrap().unwrap();

    store.save_snapshot(&newer).await.unwrap();
    store.save_snapshot(&older).await.unwrap();

    assert_eq!(store.load_snapshot(id).await.unwrap(), Some(newer));

    // Rebuilds overwrite regardless of the stored version
    store.replace_snapshot(&older).await.unwrap();
    assert_eq!(store.load_snapshot(id).await.unwrap(), Some(older));
}
