//! Persistence contract for users, groups, and membership scores.
//!
//! Handlers talk to a `Store` trait object so the same routing and score
//! logic runs against PostgreSQL in production and against the in-memory
//! store in tests or when the server is started with `--in-memory`.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

pub const ROLE_LEADER: &str = "leader";
pub const ROLE_MEMBER: &str = "member";
pub const STATUS_ACTIVE: &str = "active";

#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
}

/// One row of the membership join table, with the username joined in.
#[derive(Debug, Clone)]
pub struct MemberRecord {
    pub user_id: i64,
    pub username: String,
    pub role: String,
    pub status: String,
    pub best_kills: i64,
}

#[derive(Debug)]
pub enum StoreError {
    /// Unique constraint hit: duplicate username or membership.
    Conflict,
    /// Referenced row does not exist.
    NotFound,
    Database(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Conflict => write!(f, "record already exists"),
            Self::NotFound => write!(f, "no such record"),
            Self::Database(e) => write!(f, "database error: {}", e),
        }
    }
}

impl std::error::Error for StoreError {}

#[async_trait]
pub trait Store: Send + Sync {
    async fn create_user(&self, username: &str, password_hash: &str) -> Result<i64, StoreError>;
    async fn user_by_name(&self, username: &str) -> Result<Option<UserRecord>, StoreError>;
    async fn user_exists(&self, user_id: i64) -> Result<bool, StoreError>;

    /// Creates a group; the creator becomes its leader with a zero score.
    async fn create_group(&self, name: &str, creator_id: i64) -> Result<i64, StoreError>;
    async fn group_name(&self, group_id: i64) -> Result<Option<String>, StoreError>;
    /// Deletes the group and all of its memberships.
    async fn delete_group(&self, group_id: i64) -> Result<(), StoreError>;

    async fn members(&self, group_id: i64) -> Result<Vec<MemberRecord>, StoreError>;
    async fn membership(
        &self,
        group_id: i64,
        user_id: i64,
    ) -> Result<Option<MemberRecord>, StoreError>;
    async fn add_member(&self, group_id: i64, user_id: i64) -> Result<(), StoreError>;
    /// Returns false if there was no membership row to remove.
    async fn remove_member(&self, group_id: i64, user_id: i64) -> Result<bool, StoreError>;

    /// Raises the stored best to `kills`. The write is monotonic: a smaller
    /// value never lowers the stored best.
    async fn set_best_kills(
        &self,
        group_id: i64,
        user_id: i64,
        kills: i64,
    ) -> Result<(), StoreError>;
}

#[derive(Debug, Clone)]
struct MembershipRow {
    role: String,
    status: String,
    best_kills: i64,
}

#[derive(Debug, Default)]
struct Tables {
    next_user_id: i64,
    next_group_id: i64,
    users: HashMap<i64, UserRecord>,
    groups: HashMap<i64, String>,
    memberships: HashMap<(i64, i64), MembershipRow>,
}

/// Hash-map-backed store for tests and the `--in-memory` server mode.
#[derive(Default)]
pub struct InMemoryStore {
    inner: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn create_user(&self, username: &str, password_hash: &str) -> Result<i64, StoreError> {
        let mut tables = self.inner.write().await;
        if tables.users.values().any(|u| u.username == username) {
            return Err(StoreError::Conflict);
        }
        tables.next_user_id += 1;
        let id = tables.next_user_id;
        tables.users.insert(
            id,
            UserRecord {
                id,
                username: username.to_string(),
                password_hash: password_hash.to_string(),
            },
        );
        Ok(id)
    }

    async fn user_by_name(&self, username: &str) -> Result<Option<UserRecord>, StoreError> {
        let tables = self.inner.read().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn user_exists(&self, user_id: i64) -> Result<bool, StoreError> {
        let tables = self.inner.read().await;
        Ok(tables.users.contains_key(&user_id))
    }

    async fn create_group(&self, name: &str, creator_id: i64) -> Result<i64, StoreError> {
        let mut tables = self.inner.write().await;
        if !tables.users.contains_key(&creator_id) {
            return Err(StoreError::NotFound);
        }
        tables.next_group_id += 1;
        let group_id = tables.next_group_id;
        tables.groups.insert(group_id, name.to_string());
        tables.memberships.insert(
            (group_id, creator_id),
            MembershipRow {
                role: ROLE_LEADER.to_string(),
                status: STATUS_ACTIVE.to_string(),
                best_kills: 0,
            },
        );
        Ok(group_id)
    }

    async fn group_name(&self, group_id: i64) -> Result<Option<String>, StoreError> {
        let tables = self.inner.read().await;
        Ok(tables.groups.get(&group_id).cloned())
    }

    async fn delete_group(&self, group_id: i64) -> Result<(), StoreError> {
        let mut tables = self.inner.write().await;
        if tables.groups.remove(&group_id).is_none() {
            return Err(StoreError::NotFound);
        }
        tables.memberships.retain(|(gid, _), _| *gid != group_id);
        Ok(())
    }

    async fn members(&self, group_id: i64) -> Result<Vec<MemberRecord>, StoreError> {
        let tables = self.inner.read().await;
        let mut members: Vec<MemberRecord> = tables
            .memberships
            .iter()
            .filter(|((gid, _), _)| *gid == group_id)
            .filter_map(|((_, uid), row)| {
                tables.users.get(uid).map(|user| MemberRecord {
                    user_id: *uid,
                    username: user.username.clone(),
                    role: row.role.clone(),
                    status: row.status.clone(),
                    best_kills: row.best_kills,
                })
            })
            .collect();
        members.sort_by_key(|m| m.user_id);
        Ok(members)
    }

    async fn membership(
        &self,
        group_id: i64,
        user_id: i64,
    ) -> Result<Option<MemberRecord>, StoreError> {
        let tables = self.inner.read().await;
        Ok(tables.memberships.get(&(group_id, user_id)).map(|row| {
            let username = tables
                .users
                .get(&user_id)
                .map(|u| u.username.clone())
                .unwrap_or_default();
            MemberRecord {
                user_id,
                username,
                role: row.role.clone(),
                status: row.status.clone(),
                best_kills: row.best_kills,
            }
        }))
    }

    async fn add_member(&self, group_id: i64, user_id: i64) -> Result<(), StoreError> {
        let mut tables = self.inner.write().await;
        if !tables.groups.contains_key(&group_id) || !tables.users.contains_key(&user_id) {
            return Err(StoreError::NotFound);
        }
        if tables.memberships.contains_key(&(group_id, user_id)) {
            return Err(StoreError::Conflict);
        }
        tables.memberships.insert(
            (group_id, user_id),
            MembershipRow {
                role: ROLE_MEMBER.to_string(),
                status: STATUS_ACTIVE.to_string(),
                best_kills: 0,
            },
        );
        Ok(())
    }

    async fn remove_member(&self, group_id: i64, user_id: i64) -> Result<bool, StoreError> {
        let mut tables = self.inner.write().await;
        Ok(tables.memberships.remove(&(group_id, user_id)).is_some())
    }

    async fn set_best_kills(
        &self,
        group_id: i64,
        user_id: i64,
        kills: i64,
    ) -> Result<(), StoreError> {
        let mut tables = self.inner.write().await;
        let row = tables
            .memberships
            .get_mut(&(group_id, user_id))
            .ok_or(StoreError::NotFound)?;
        row.best_kills = row.best_kills.max(kills);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_duplicate_username_conflicts() {
        let store = InMemoryStore::new();
        store.create_user("alice", "hash").await.unwrap();
        let err = store.create_user("alice", "other").await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict));
    }

    #[tokio::test]
    async fn test_group_creator_becomes_leader_with_zero_score() {
        let store = InMemoryStore::new();
        let alice = store.create_user("alice", "hash").await.unwrap();
        let group = store.create_group("raiders", alice).await.unwrap();

        let member = store.membership(group, alice).await.unwrap().unwrap();
        assert_eq!(member.role, ROLE_LEADER);
        assert_eq!(member.status, STATUS_ACTIVE);
        assert_eq!(member.best_kills, 0);
    }

    #[tokio::test]
    async fn test_add_member_rejects_unknown_and_duplicate() {
        let store = InMemoryStore::new();
        let alice = store.create_user("alice", "hash").await.unwrap();
        let group = store.create_group("raiders", alice).await.unwrap();

        assert!(matches!(
            store.add_member(group, 999).await.unwrap_err(),
            StoreError::NotFound
        ));
        assert!(matches!(
            store.add_member(999, alice).await.unwrap_err(),
            StoreError::NotFound
        ));
        assert!(matches!(
            store.add_member(group, alice).await.unwrap_err(),
            StoreError::Conflict
        ));
    }

    #[tokio::test]
    async fn test_best_kills_write_is_monotonic() {
        let store = InMemoryStore::new();
        let alice = store.create_user("alice", "hash").await.unwrap();
        let group = store.create_group("raiders", alice).await.unwrap();

        store.set_best_kills(group, alice, 5).await.unwrap();
        store.set_best_kills(group, alice, 3).await.unwrap();
        let member = store.membership(group, alice).await.unwrap().unwrap();
        assert_eq!(member.best_kills, 5);

        store.set_best_kills(group, alice, 8).await.unwrap();
        let member = store.membership(group, alice).await.unwrap().unwrap();
        assert_eq!(member.best_kills, 8);
    }

    #[tokio::test]
    async fn test_delete_group_removes_memberships() {
        let store = InMemoryStore::new();
        let alice = store.create_user("alice", "hash").await.unwrap();
        let bob = store.create_user("bob", "hash").await.unwrap();
        let group = store.create_group("raiders", alice).await.unwrap();
        store.add_member(group, bob).await.unwrap();

        store.delete_group(group).await.unwrap();
        assert!(store.group_name(group).await.unwrap().is_none());
        assert!(store.membership(group, alice).await.unwrap().is_none());
        assert!(store.membership(group, bob).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_members_lists_in_stable_order() {
        let store = InMemoryStore::new();
        let alice = store.create_user("alice", "hash").await.unwrap();
        let bob = store.create_user("bob", "hash").await.unwrap();
        let group = store.create_group("raiders", alice).await.unwrap();
        store.add_member(group, bob).await.unwrap();

        let members = store.members(group).await.unwrap();
        assert_eq!(members.len(), 2);
        assert_eq!(members[0].user_id, alice);
        assert_eq!(members[1].user_id, bob);
        assert_eq!(members[1].role, ROLE_MEMBER);
    }

    #[tokio::test]
    async fn test_remove_member_reports_missing_row() {
        let store = InMemoryStore::new();
        let alice = store.create_user("alice", "hash").await.unwrap();
        let group = store.create_group("raiders", alice).await.unwrap();

        assert!(store.remove_member(group, alice).await.unwrap());
        assert!(!store.remove_member(group, alice).await.unwrap());
    }
}
