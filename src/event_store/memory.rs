//! In-memory store
//!
//! Process-local implementation of the storage contract. Every operation,
//! including `save_changes`, runs under one write lock, so a unit of work
//! is all-or-nothing and appends to one stream are serialized.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::aggregate::{Aggregate, User, UserField};
use crate::domain::{OperationContext, UserEvent};
use crate::projection::UserDashboardStats;

use super::{
    check_append, DocumentChange, DocumentStore, EventStore, MatchMode, SessionChanges,
    SnapshotStore, StoreError, StoredEvent, UserStore,
};

#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<MemoryState>>,
}

#[derive(Debug, Default)]
struct MemoryState {
    streams: HashMap<Uuid, Vec<StoredEvent>>,
    stream_order: Vec<Uuid>,
    documents: HashMap<Uuid, User>,
    snapshots: HashMap<Uuid, UserDashboardStats>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MemoryState {
    fn stream_version(&self, stream_id: Uuid) -> i64 {
        self.streams
            .get(&stream_id)
            .and_then(|events| events.last())
            .map_or(0, |event| event.version)
    }

    fn push_event(
        &mut self,
        stream_id: Uuid,
        event: &UserEvent,
        context: &OperationContext,
    ) -> i64 {
        let version = self.stream_version(stream_id) + 1;
        let stored = StoredEvent {
            id: Uuid::new_v4(),
            stream_id,
            version,
            event_type: event.event_type().to_string(),
            event: event.clone(),
            context: context.clone(),
            recorded_at: Utc::now(),
        };

        if version == 1 {
            self.stream_order.push(stream_id);
        }
        self.streams.entry(stream_id).or_default().push(stored);
        version
    }

    /// Same rule as the unique index on lower(email) in PostgreSQL
    fn check_unique_email(&self, user: &User) -> Result<(), StoreError> {
        let taken = self
            .documents
            .values()
            .any(|other| other.id() != user.id() && other.has_email(user.email()));

        if taken {
            return Err(StoreError::UniqueViolation("email".to_string()));
        }
        Ok(())
    }

    fn put_snapshot(&mut self, snapshot: &UserDashboardStats) {
        let stale = self
            .snapshots
            .get(&snapshot.id)
            .is_some_and(|existing| existing.version > snapshot.version);

        if !stale {
            self.snapshots.insert(snapshot.id, snapshot.clone());
        }
    }
}

#[async_trait]
impl EventStore for InMemoryStore {
    async fn append_event(
        &self,
        stream_id: Uuid,
        event: &UserEvent,
        expected_version: Option<i64>,
        context: &OperationContext,
    ) -> Result<i64, StoreError> {
        let mut state = self.state.write().await;
        check_append(stream_id, state.stream_version(stream_id), expected_version, event)?;
        Ok(state.push_event(stream_id, event, context))
    }

    async fn read_stream(&self, stream_id: Uuid) -> Result<Vec<StoredEvent>, StoreError> {
        let state = self.state.read().await;
        Ok(state.streams.get(&stream_id).cloned().unwrap_or_default())
    }

    async fn stream_ids(&self) -> Result<Vec<Uuid>, StoreError> {
        Ok(self.state.read().await.stream_order.clone())
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn load_document(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.state.read().await.documents.get(&id).cloned())
    }

    async fn upsert_document(&self, user: &User) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        state.check_unique_email(user)?;
        state.documents.insert(user.id(), user.clone());
        Ok(())
    }

    async fn delete_document(&self, id: Uuid) -> Result<(), StoreError> {
        self.state.write().await.documents.remove(&id);
        Ok(())
    }

    async fn query_documents(
        &self,
        field: UserField,
        value: &str,
        mode: MatchMode,
    ) -> Result<Vec<User>, StoreError> {
        let state = self.state.read().await;
        let needle = value.to_lowercase();

        let mut matches: Vec<User> = state
            .documents
            .values()
            .filter(|user| match mode {
                MatchMode::Exact => user.field_value(field) == value,
                MatchMode::IgnoreCase => user.field_value(field).to_lowercase() == needle,
            })
            .cloned()
            .collect();
        matches.sort_by_key(|user| user.created_at());

        Ok(matches)
    }
}

#[async_trait]
impl SnapshotStore for InMemoryStore {
    async fn load_snapshot(&self, id: Uuid) -> Result<Option<UserDashboardStats>, StoreError> {
        Ok(self.state.read().await.snapshots.get(&id).cloned())
    }

    async fn save_snapshot(&self, snapshot: &UserDashboardStats) -> Result<(), StoreError> {
        self.state.write().await.put_snapshot(snapshot);
        Ok(())
    }

    async fn replace_snapshot(&self, snapshot: &UserDashboardStats) -> Result<(), StoreError> {
        self.state
            .write()
            .await
            .snapshots
            .insert(snapshot.id, snapshot.clone());
        Ok(())
    }
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn save_changes(&self, changes: SessionChanges) -> Result<i64, StoreError> {
        let mut state = self.state.write().await;

        // Validate everything before touching state
        check_append(
            changes.stream_id,
            state.stream_version(changes.stream_id),
            changes.expected_version,
            &changes.event,
        )?;
        if let DocumentChange::Upsert(user) = &changes.document {
            state.check_unique_email(user)?;
        }

        let version = state.push_event(changes.stream_id, &changes.event, &changes.context);

        match changes.document {
            DocumentChange::Upsert(user) => {
                state.documents.insert(user.id(), user);
            }
            DocumentChange::Delete => {
                state.documents.remove(&changes.stream_id);
            }
        }

        if let Some(snapshot) = &changes.snapshot {
            state.put_snapshot(snapshot);
        }

        Ok(version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Address, UserProfile};

    fn new_user(email: &str) -> (User, UserEvent) {
        let profile = UserProfile {
            name: "Ann".to_string(),
            email: email.to_string(),
            address: Address::new("1 Main Street", "12345"),
            ..Default::default()
        };
        User::create(Uuid::new_v4(), profile, Utc::now())
    }

    fn create_changes(user: &User, event: UserEvent) -> SessionChanges {
        SessionChanges {
            stream_id: user.id(),
            expected_version: Some(0),
            event,
            document: DocumentChange::Upsert(user.clone()),
            snapshot: None,
            context: OperationContext::new(),
        }
    }

    #[tokio::test]
    async fn test_append_and_read_stream() {
        let store = InMemoryStore::new();
        let (user, event) = new_user("ann@x.com");
        let context = OperationContext::new();

        let v1 = store
            .append_event(user.id(), &event, Some(0), &context)
            .await
            .unwrap();
        let v2 = store
            .append_event(user.id(), &UserEvent::UserDeleted, None, &context)
            .await
            .unwrap();
        assert_eq!((v1, v2), (1, 2));

        let events = store.read_stream(user.id()).await.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type, "UserCreated");
        assert_eq!(events[1].version, 2);

        // Re-reading starts from scratch again
        assert_eq!(store.read_stream(user.id()).await.unwrap(), events);
        assert_eq!(store.stream_ids().await.unwrap(), vec![user.id()]);
    }

    #[tokio::test]
    async fn test_read_missing_stream_is_empty() {
        let store = InMemoryStore::new();
        assert!(store.read_stream(Uuid::new_v4()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stale_expected_version_conflicts() {
        let store = InMemoryStore::new();
        let (user, event) = new_user("ann@x.com");
        let context = OperationContext::new();
        store
            .append_event(user.id(), &event, Some(0), &context)
            .await
            .unwrap();

        let result = store
            .append_event(user.id(), &UserEvent::UserDeleted, Some(0), &context)
            .await;
        assert!(matches!(result, Err(StoreError::ConcurrencyConflict { .. })));
    }

    #[tokio::test]
    async fn test_save_changes_is_all_or_nothing() {
        let store = InMemoryStore::new();
        let (ann, event) = new_user("ann@x.com");
        store.save_changes(create_changes(&ann, event)).await.unwrap();

        // Same email, different case: rejected, and no event is left behind
        let (dup, event) = new_user("ANN@x.com");
        let result = store.save_changes(create_changes(&dup, event)).await;
        assert!(matches!(result, Err(StoreError::UniqueViolation(_))));
        assert!(store.read_stream(dup.id()).await.unwrap().is_empty());
        assert!(store.load_document(dup.id()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_document_change() {
        let store = InMemoryStore::new();
        let (user, event) = new_user("ann@x.com");
        store.save_changes(create_changes(&user, event)).await.unwrap();

        let version = store
            .save_changes(SessionChanges {
                stream_id: user.id(),
                expected_version: Some(1),
                event: UserEvent::UserDeleted,
                document: DocumentChange::Delete,
                snapshot: None,
                context: OperationContext::new(),
            })
            .await
            .unwrap();

        assert_eq!(version, 2);
        assert!(store.load_document(user.id()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_query_documents_match_modes() {
        let store = InMemoryStore::new();
        let (user, _) = new_user("Ann@X.com");
        store.upsert_document(&user).await.unwrap();

        let exact = store
            .query_documents(UserField::Email, "ann@x.com", MatchMode::Exact)
            .await
            .unwrap();
        assert!(exact.is_empty());

        let loose = store
            .query_documents(UserField::Email, "ann@x.com", MatchMode::IgnoreCase)
            .await
            .unwrap();
        assert_eq!(loose.len(), 1);
        assert_eq!(loose[0].id(), user.id());
    }

    #[tokio::test]
    async fn test_older_snapshot_does_not_overwrite_newer() {
        let store = InMemoryStore::new();
        let (user, event) = new_user("ann@x.com");
        let v1 = UserDashboardStats::fold(None, &event).unwrap();
        let v2 = UserDashboardStats::fold(Some(v1.clone()), &UserEvent::UserDeleted).unwrap();

        store.save_snapshot(&v2).await.unwrap();
        store.save_snapshot(&v1).await.unwrap();

        let stored = store.load_snapshot(user.id()).await.unwrap().unwrap();
        assert_eq!(stored.version, 2);
    }

    #[tokio::test]
    async fn test_replace_snapshot_ignores_stored_version() {
        let store = InMemoryStore::new();
        let (user, event) = new_user("ann@x.com");
        let v1 = UserDashboardStats::fold(None, &event).unwrap();
        let corrupt = UserDashboardStats {
            version: 99,
            ..v1.clone()
        };

        store.save_snapshot(&corrupt).await.unwrap();
        store.replace_snapshot(&v1).await.unwrap();

        assert_eq!(store.load_snapshot(user.id()).await.unwrap(), Some(v1));
    }
}
