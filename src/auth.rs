//! Accounts, sessions and the profile/role lookup.

use crate::access::Caller;
use crate::feed::{record_change, ChangeKind};
use crate::model::{Profile, Role};
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::{Duration, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{info, warn};
use uuid::Uuid;

pub const MIN_PASSWORD_LEN: usize = 6;
pub const SESSION_TTL_DAYS: i64 = 30;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("email already registered: {0}")]
    EmailTaken(String),
    #[error("{0}")]
    Invalid(String),
    #[error("profile not found")]
    ProfileNotFound,
    #[error("sign-up is closed; ask an admin for an account")]
    SignUpClosed,
    #[error("password hashing failed: {0}")]
    Hash(String),
    #[error(transparent)]
    Db(#[from] rusqlite::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub token: String,
    pub profile_id: String,
    pub created_at: String,
}

fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Hash(e.to_string()))
}

fn verify_password(password: &str, stored: &str) -> bool {
    match PasswordHash::new(stored) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            warn!(error = %e, "stored password hash is unreadable");
            false
        }
    }
}

/// Session tokens are random uuids, so a plain digest is enough to keep the
/// bearer value out of the database.
fn token_digest(token: &str) -> String {
    format!("{:x}", Sha256::digest(token.as_bytes()))
}

fn timestamp(at: chrono::DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn session_cutoff() -> String {
    timestamp(Utc::now() - Duration::days(SESSION_TTL_DAYS))
}

fn normalize_email(raw: &str) -> Result<String, AuthError> {
    let email = raw.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(AuthError::Invalid("email is not valid".to_string()));
    }
    Ok(email)
}

fn profile_from_row(r: &rusqlite::Row<'_>) -> rusqlite::Result<Profile> {
    let role: String = r.get(1)?;
    Ok(Profile {
        id: r.get(0)?,
        role: Role::parse(&role).ok_or(rusqlite::Error::InvalidColumnType(
            1,
            role,
            rusqlite::types::Type::Text,
        ))?,
        email: r.get(2)?,
    })
}

pub fn profile_count(conn: &Connection) -> rusqlite::Result<i64> {
    conn.query_row("SELECT COUNT(*) FROM profiles", [], |r| r.get(0))
}

pub fn get_profile(conn: &Connection, profile_id: &str) -> rusqlite::Result<Option<Profile>> {
    conn.query_row(
        "SELECT id, role, email FROM profiles WHERE id = ?",
        [profile_id],
        profile_from_row,
    )
    .optional()
}

pub fn list_profiles(conn: &Connection) -> rusqlite::Result<Vec<Profile>> {
    let mut stmt = conn.prepare("SELECT id, role, email FROM profiles ORDER BY email")?;
    let rows = stmt.query_map([], profile_from_row)?;
    rows.collect()
}

pub fn create_account(
    conn: &Connection,
    email: &str,
    password: &str,
    role: Role,
) -> Result<Profile, AuthError> {
    let email = normalize_email(email)?;
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthError::Invalid(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    let taken: Option<i64> = conn
        .query_row("SELECT 1 FROM profiles WHERE email = ?", [&email], |r| r.get(0))
        .optional()?;
    if taken.is_some() {
        return Err(AuthError::EmailTaken(email));
    }

    let profile = Profile {
        id: Uuid::new_v4().to_string(),
        role,
        email,
    };
    let password_hash = hash_password(password)?;
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "INSERT INTO profiles(id, email, role) VALUES(?, ?, ?)",
        (&profile.id, &profile.email, role.key()),
    )?;
    tx.execute(
        "INSERT INTO credentials(profile_id, password_hash) VALUES(?, ?)",
        (&profile.id, &password_hash),
    )?;
    record_change(&tx, "profiles", ChangeKind::Insert, &profile.id)?;
    tx.commit()?;
    info!(email = %profile.email, role = role.key(), "account created");
    Ok(profile)
}

/// The first account of a fresh workspace becomes its admin; afterwards
/// accounts are created by an admin.
pub fn sign_up_first_admin(conn: &Connection, email: &str, password: &str) -> Result<Profile, AuthError> {
    if profile_count(conn)? > 0 {
        return Err(AuthError::SignUpClosed);
    }
    create_account(conn, email, password, Role::Admin)
}

pub fn sign_in(conn: &Connection, email: &str, password: &str) -> Result<Session, AuthError> {
    let email = normalize_email(email).map_err(|_| AuthError::InvalidCredentials)?;
    let row: Option<(String, String)> = conn
        .query_row(
            "SELECT p.id, c.password_hash
             FROM profiles p
             JOIN credentials c ON c.profile_id = p.id
             WHERE p.email = ?",
            [&email],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .optional()?;
    let Some((profile_id, password_hash)) = row else {
        return Err(AuthError::InvalidCredentials);
    };
    if !verify_password(password, &password_hash) {
        return Err(AuthError::InvalidCredentials);
    }

    prune_sessions(conn)?;
    let session = Session {
        token: Uuid::new_v4().to_string(),
        profile_id,
        created_at: timestamp(Utc::now()),
    };
    conn.execute(
        "INSERT INTO sessions(token_digest, profile_id, created_at) VALUES(?, ?, ?)",
        (token_digest(&session.token), &session.profile_id, &session.created_at),
    )?;
    info!(%email, "signed in");
    Ok(session)
}

/// Looks up a live session. Signed-out and expired tokens resolve to `None`.
pub fn resume(conn: &Connection, token: &str) -> rusqlite::Result<Option<Session>> {
    conn.query_row(
        "SELECT profile_id, created_at FROM sessions
         WHERE token_digest = ? AND created_at >= ?",
        (token_digest(token), session_cutoff()),
        |r| {
            Ok(Session {
                token: token.to_string(),
                profile_id: r.get(0)?,
                created_at: r.get(1)?,
            })
        },
    )
    .optional()
}

pub fn sign_out(conn: &Connection, token: &str) -> rusqlite::Result<()> {
    conn.execute("DELETE FROM sessions WHERE token_digest = ?", [token_digest(token)])?;
    Ok(())
}

/// Drops sessions older than `SESSION_TTL_DAYS`.
pub fn prune_sessions(conn: &Connection) -> rusqlite::Result<usize> {
    conn.execute("DELETE FROM sessions WHERE created_at < ?", [session_cutoff()])
}

pub fn set_role(conn: &Connection, profile_id: &str, role: Role) -> Result<Profile, AuthError> {
    let tx = conn.unchecked_transaction()?;
    let n = tx.execute(
        "UPDATE profiles SET role = ? WHERE id = ?",
        (role.key(), profile_id),
    )?;
    if n == 0 {
        return Err(AuthError::ProfileNotFound);
    }
    record_change(&tx, "profiles", ChangeKind::Update, profile_id)?;
    tx.commit()?;
    let profile = get_profile(conn, profile_id)?.ok_or(AuthError::ProfileNotFound)?;
    info!(email = %profile.email, role = role.key(), "role changed");
    Ok(profile)
}

/// Resolves the gate's view of a session. The role is re-read on every call,
/// so a role change applies on the caller's next request.
pub fn caller_for(conn: &Connection, session: Option<&Session>) -> rusqlite::Result<Caller> {
    let Some(session) = session else {
        return Ok(Caller::Anonymous);
    };
    // A session revoked by sign-out elsewhere no longer counts.
    if resume(conn, &session.token)?.is_none() {
        return Ok(Caller::Anonymous);
    }
    Ok(Caller::SignedIn(
        get_profile(conn, &session.profile_id)?.map(|p| p.role),
    ))
}
