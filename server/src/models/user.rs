//! User account model
//!
//! One row per account. The role column discriminates customers, vendors
//! and the admin escape hatch; exactly one profile row (customer or vendor)
//! exists per user, enforced at creation time.

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::schema::users;

/// Account roles. Stored as text in the `role` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Customer,
    Vendor,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Vendor => "vendor",
            Self::Admin => "admin",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "customer" => Some(Self::Customer),
            "vendor" => Some(Self::Vendor),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Identifiable)]
#[diesel(table_name = users)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = users)]
pub struct NewUser {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
}

impl User {
    pub fn create(conn: &mut SqliteConnection, new_user: NewUser) -> Result<User> {
        let user_id = new_user.id.clone();

        diesel::insert_into(users::table)
            .values(&new_user)
            .execute(conn)
            .context("Failed to insert user")?;

        users::table
            .filter(users::id.eq(user_id))
            .first(conn)
            .context("Failed to retrieve created user")
    }

    pub fn find_by_id(conn: &mut SqliteConnection, user_id: &str) -> Result<User> {
        users::table
            .filter(users::id.eq(user_id))
            .first(conn)
            .context(format!("User with ID {} not found", user_id))
    }

    pub fn find_by_username(conn: &mut SqliteConnection, name: &str) -> Result<Option<User>> {
        users::table
            .filter(users::username.eq(name))
            .first(conn)
            .optional()
            .context("Failed to query user by username")
    }

    pub fn username_exists(conn: &mut SqliteConnection, name: &str) -> Result<bool> {
        let count: i64 = users::table
            .filter(users::username.eq(name))
            .count()
            .get_result(conn)
            .context("Failed to count users by username")?;
        Ok(count > 0)
    }

    pub fn role(&self) -> Option<UserRole> {
        UserRole::from_str(&self.role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_conn;
    use uuid::Uuid;

    fn sample_user(username: &str) -> NewUser {
        NewUser {
            id: Uuid::new_v4().to_string(),
            username: username.to_string(),
            email: format!("{username}@example.com"),
            password_hash: "argon2-hash".to_string(),
            role: UserRole::Customer.as_str().to_string(),
        }
    }

    #[test]
    fn test_create_and_find() {
        let mut conn = test_conn();
        let user = User::create(&mut conn, sample_user("alice")).unwrap();
        assert_eq!(user.username, "alice");
        assert_eq!(user.role(), Some(UserRole::Customer));

        let found = User::find_by_username(&mut conn, "alice").unwrap();
        assert_eq!(found.map(|u| u.id), Some(user.id));
    }

    #[test]
    fn test_duplicate_username_rejected() {
        let mut conn = test_conn();
        User::create(&mut conn, sample_user("bob")).unwrap();
        assert!(User::username_exists(&mut conn, "bob").unwrap());
        assert!(User::create(&mut conn, sample_user("bob")).is_err());
    }
}
