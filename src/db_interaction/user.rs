use std::{error::Error, fmt::Debug};

use anyhow::Context;
use chrono::Utc;
use diesel::{BoolExpressionMethods, Connection, ExpressionMethods, OptionalExtension, QueryDsl, RunQueryDsl, SelectableHelper};
use secrecy::SecretString;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    models::{User, UserProfile},
    password::hash_password,
    schema::{restaurant_accounts, user_profiles, users},
    telemetry::spawn_blocking_with_tracing,
    utils::{error_fmt_chain, DbConnection}
};

pub struct NewUser{
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_superuser: bool
}

// Error associated with inserting user to users table
#[derive(Error)]
pub enum UserInsertError{
    #[error("{0} is already taken")]
    NotUnique(&'static str),
    #[error("Failed to run query")]
    QueryError(#[from] diesel::result::Error),
    #[error("unexpected database / hashing error occured")]
    UnexpectedError(#[from] anyhow::Error)
}

impl Debug for UserInsertError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self)?;
        error_fmt_chain(f, &self.source())
    }
}

// Which users column a unique violation was raised on
pub fn conflicting_user_field(e: &diesel::result::Error) -> Option<&'static str>{
    match e {
        diesel::result::Error::DatabaseError(
            diesel::result::DatabaseErrorKind::UniqueViolation,
            info
        ) => {
            if info.constraint_name().map(|c| c.contains("username")).unwrap_or(false) {
                Some("username")
            } else {
                Some("email")
            }
        },
        _ => None
    }
}

/// Inserts the user and an empty profile. Used by signup and by draft
/// approval, which runs it inside its own transaction.
pub fn insert_user(
    conn: &mut DbConnection,
    new_user: NewUser,
    password_hash: String
) -> Result<User, UserInsertError>{
    let user = User{
        user_id: Uuid::new_v4(),
        username: new_user.username,
        email: new_user.email,
        password: password_hash,
        first_name: new_user.first_name,
        last_name: new_user.last_name,
        is_superuser: new_user.is_superuser,
        created_at: Utc::now()
    };

    diesel::insert_into(users::table)
        .values(&user)
        .execute(conn)
        .map_err(|e| match conflicting_user_field(&e) {
            Some(field) => UserInsertError::NotUnique(field),
            None => UserInsertError::QueryError(e)
        })?;

    diesel::insert_into(user_profiles::table)
        .values((
            user_profiles::user_id.eq(user.user_id),
            user_profiles::updated_at.eq(Utc::now())
        ))
        .execute(conn)?;

    Ok(user)
}

#[tracing::instrument(
    "Inserting user into the database",
    skip(conn, new_user),
    fields(username = %new_user.username)
)]
pub async fn insert_user_into_database(
    mut conn: DbConnection,
    new_user: NewUser,
    password: SecretString
) -> Result<User, UserInsertError> {
    let password_hash = hash_password(password).await?;

    spawn_blocking_with_tracing(move || {
        conn.transaction::<_, UserInsertError, _>(|conn| {
            insert_user(conn, new_user, password_hash)
        })
    })
    .await
    .context("Failed due to threadpool error")?
}

/// Looks a user up by username or email, together with whether they hold a
/// restaurant account.
#[tracing::instrument(
    "Getting user info for login",
    skip(conn)
)]
pub async fn find_user_for_login(
    mut conn: DbConnection,
    login: String
) -> Result<Option<(User, bool)>, anyhow::Error>{
    spawn_blocking_with_tracing(move || -> Result<Option<(User, bool)>, anyhow::Error> {
        let user = users::table
            .filter(users::username.eq(&login).or(users::email.eq(&login)))
            .select(User::as_select())
            .first::<User>(&mut conn)
            .optional()
            .context("Failed to query user")?;

        let Some(user) = user else {
            return Ok(None)
        };

        let has_account = diesel::select(diesel::dsl::exists(
                restaurant_accounts::table.filter(restaurant_accounts::user_id.eq(user.user_id))
            ))
            .get_result::<bool>(&mut conn)
            .context("Failed to check restaurant account")?;

        Ok(Some((user, has_account)))
    })
    .await
    .context("Failed due to threadpool error")?
}

#[tracing::instrument(
    "Get profile data of logged in user",
    skip(conn)
)]
pub async fn get_user_profile_info(
    mut conn: DbConnection,
    user_id: Uuid
) -> Result<Option<(User, UserProfile)>, anyhow::Error>{
    spawn_blocking_with_tracing(move || {
        users::table
            .inner_join(user_profiles::table)
            .filter(users::user_id.eq(user_id))
            .select((User::as_select(), UserProfile::as_select()))
            .first::<(User, UserProfile)>(&mut conn)
            .optional()
            .context("Failed to get user profile from database")
    })
    .await
    .context("Failed due to threadpool error")?
}

#[derive(Debug)]
pub struct ProfileUpdate{
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub bio: Option<String>,
    pub phone: Option<String>,
    pub is_vegetarian: Option<bool>,
    pub is_vegan: Option<bool>
}

// Errors associated with inserting / updating user profile to database
#[derive(thiserror::Error)]
pub enum PostUserProfileInfoError{
    #[error("Failed due to threadpool error")]
    ThreadpoolError(#[from] tokio::task::JoinError),
    #[error("{0} is already taken")]
    NotUnique(&'static str),
    #[error("user {0} doesn't exist")]
    NoSuchUser(Uuid),
    #[error("Failed due to database error")]
    QueryError(#[from] diesel::result::Error)
}

impl Debug for PostUserProfileInfoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self)?;
        error_fmt_chain(f, &self.source())
    }
}

#[tracing::instrument(
    "posting user profile info to db",
    skip_all
)]
pub async fn post_user_profile_info(
    mut conn: DbConnection,
    update: ProfileUpdate,
    user_id: Uuid
) -> Result<(User, UserProfile), PostUserProfileInfoError>{

    spawn_blocking_with_tracing(move || {
        conn.transaction::<_, PostUserProfileInfoError, _>(|conn| {
            let (mut user, mut profile) = users::table
                .inner_join(user_profiles::table)
                .filter(users::user_id.eq(user_id))
                .select((User::as_select(), UserProfile::as_select()))
                .first::<(User, UserProfile)>(conn)
                .optional()?
                .ok_or(PostUserProfileInfoError::NoSuchUser(user_id))?;

            if let Some(first_name) = update.first_name { user.first_name = first_name; }
            if let Some(last_name) = update.last_name { user.last_name = last_name; }
            if let Some(email) = update.email { user.email = email; }
            if let Some(bio) = update.bio { profile.bio = bio; }
            if let Some(phone) = update.phone {
                profile.phone = Some(phone).filter(|p| !p.trim().is_empty());
            }
            if let Some(flag) = update.is_vegetarian { profile.is_vegetarian = flag; }
            if let Some(flag) = update.is_vegan { profile.is_vegan = flag; }
            profile.updated_at = Utc::now();

            diesel::update(users::table.filter(users::user_id.eq(user_id)))
                .set((
                    users::first_name.eq(&user.first_name),
                    users::last_name.eq(&user.last_name),
                    users::email.eq(&user.email)
                ))
                .execute(conn)
                .map_err(|e| match conflicting_user_field(&e) {
                    Some(field) => PostUserProfileInfoError::NotUnique(field),
                    None => PostUserProfileInfoError::QueryError(e)
                })?;

            diesel::update(user_profiles::table.filter(user_profiles::user_id.eq(user_id)))
                .set(&profile)
                .execute(conn)?;

            Ok((user, profile))
        })
    })
    .await?
}
