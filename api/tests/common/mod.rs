#![allow(dead_code)]

use api::auth::{CurrentUser, UserRole};
use chrono::Utc;
use sea_orm::{ConnectionTrait, Database, DatabaseBackend, DatabaseConnection, Statement};
use uuid::Uuid;

/// In-memory SQLite with the same shape the migrations produce, so the
/// GraphQL and workflow layers can be exercised without a Postgres server.
pub async fn sqlite_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    bootstrap_sqlite(&db).await;
    db
}

async fn bootstrap_sqlite(db: &DatabaseConnection) {
    db.execute(Statement::from_string(
        DatabaseBackend::Sqlite,
        "PRAGMA foreign_keys = ON;",
    ))
    .await
    .unwrap();

    let tables = [
        r#"
        CREATE TABLE user (
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            display_name TEXT NOT NULL,
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
        r#"
        CREATE TABLE user_identity (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            provider TEXT NOT NULL,
            subject TEXT NOT NULL,
            created_at TEXT NOT NULL,
            UNIQUE(provider, subject),
            FOREIGN KEY(user_id) REFERENCES user(id) ON DELETE CASCADE
        );
        "#,
        r#"
        CREATE TABLE user_role (
            user_id TEXT NOT NULL,
            role TEXT NOT NULL,
            PRIMARY KEY(user_id, role),
            FOREIGN KEY(user_id) REFERENCES user(id) ON DELETE CASCADE
        );
        "#,
        r#"
        CREATE TABLE user_secret (
            user_id TEXT PRIMARY KEY,
            password_hash TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY(user_id) REFERENCES user(id) ON DELETE CASCADE
        );
        "#,
        r#"
        CREATE TABLE document (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            description TEXT,
            file_url TEXT NOT NULL,
            submission_key TEXT NOT NULL UNIQUE,
            status TEXT NOT NULL DEFAULT 'PENDING_APPROVAL',
            created_by TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY(created_by) REFERENCES user(id) ON DELETE CASCADE
        );
        "#,
        r#"
        CREATE TABLE approver (
            id TEXT PRIMARY KEY,
            document_id TEXT NOT NULL,
            user_id TEXT NOT NULL,
            position INTEGER NOT NULL,
            status TEXT NOT NULL DEFAULT 'PENDING',
            comments TEXT,
            decided_at TEXT,
            UNIQUE(document_id, user_id),
            FOREIGN KEY(document_id) REFERENCES document(id) ON DELETE CASCADE,
            FOREIGN KEY(user_id) REFERENCES user(id) ON DELETE CASCADE
        );
        "#,
        r#"
        CREATE TABLE external_signer (
            id TEXT PRIMARY KEY,
            document_id TEXT NOT NULL,
            name TEXT NOT NULL,
            designation TEXT NOT NULL,
            position INTEGER NOT NULL,
            status TEXT NOT NULL DEFAULT 'PENDING',
            comments TEXT,
            signed_at TEXT,
            FOREIGN KEY(document_id) REFERENCES document(id) ON DELETE CASCADE
        );
        "#,
        r#"
        CREATE TABLE activity_event (
            id TEXT PRIMARY KEY,
            document_id TEXT NOT NULL,
            actor_id TEXT,
            kind TEXT NOT NULL,
            message TEXT NOT NULL,
            created_at TEXT NOT NULL,
            FOREIGN KEY(document_id) REFERENCES document(id) ON DELETE CASCADE,
            FOREIGN KEY(actor_id) REFERENCES user(id) ON DELETE SET NULL
        );
        "#,
    ];
    for sql in tables {
        db.execute(Statement::from_string(DatabaseBackend::Sqlite, sql))
            .await
            .unwrap();
    }
}

pub async fn insert_user(
    db: &DatabaseConnection,
    email: &str,
    display_name: &str,
    roles: &[&str],
) -> Uuid {
    let id = Uuid::new_v4();
    let now = Utc::now().to_rfc3339();
    db.execute(Statement::from_sql_and_values(
        DatabaseBackend::Sqlite,
        "INSERT INTO user (id, email, display_name, is_active, created_at, updated_at) VALUES (?, ?, ?, 1, ?, ?)",
        vec![
            id.into(),
            email.into(),
            display_name.into(),
            now.clone().into(),
            now.into(),
        ],
    ))
    .await
    .unwrap();
    for role in roles {
        db.execute(Statement::from_sql_and_values(
            DatabaseBackend::Sqlite,
            "INSERT INTO user_role (user_id, role) VALUES (?, ?)",
            vec![id.into(), (*role).into()],
        ))
        .await
        .unwrap();
    }
    id
}

pub fn current(user_id: Uuid, roles: &[UserRole]) -> CurrentUser {
    CurrentUser {
        user_id,
        roles: roles.to_vec(),
    }
}
