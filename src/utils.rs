use std::{error::Error, fmt::Debug};

use actix_web::web;
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use diesel::{r2d2::ConnectionManager, PgConnection};
use r2d2::{Pool, PooledConnection};
use rand::{distributions::Uniform, Rng};
use thiserror::Error;

use crate::telemetry::spawn_blocking_with_tracing;

pub type DbPool = Pool<ConnectionManager<PgConnection>>;
pub type DbConnection = PooledConnection<ConnectionManager<PgConnection>>;

pub fn error_fmt_chain(f: &mut std::fmt::Formatter<'_>, source: &Option<impl Error>) -> std::fmt::Result{
    if let Some(error) = source{
        write!(f, "\n\tCaused By:\n\t")?;
        write!(f, "{:?}", &error)?;
        error_fmt_chain(f, &error.source())
    } else {
        Ok(())
    }
}

pub async fn get_pooled_connection(
    pool: &web::Data<DbPool>
) -> Result<DbConnection, PoolGetError>{
    let pool_clone = pool.clone();

    let res = spawn_blocking_with_tracing(move || {
        pool_clone.get()
    })
    .await??;

    Ok(res)
}

#[derive(Error)]
pub enum PoolGetError{
    #[error("Failed due to threadpool error")]
    ThreadpoolError(#[from] tokio::task::JoinError),
    #[error("Failed to get connection from pool")]
    DbPoolError(#[from] r2d2::Error),
}

impl Debug for PoolGetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self)?;
        error_fmt_chain(f, &self.source())
    }
}

pub fn is_unique_violation(e: &diesel::result::Error) -> bool{
    matches!(
        e,
        diesel::result::Error::DatabaseError(
            diesel::result::DatabaseErrorKind::UniqueViolation,
            _
        )
    )
}

const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

// Random code drawn from [A-Z0-9], used for confirmation and order codes
pub fn generate_code(len: usize) -> String{
    let mut rng = rand::thread_rng();
    let dist = Uniform::from(0..CODE_ALPHABET.len());

    (0..len)
        .map(|_| CODE_ALPHABET[rng.sample(dist)] as char)
        .collect()
}

// Wall clock of the restaurants, reservation windows are expressed in it
#[derive(Clone, Copy, Debug)]
pub struct BusinessClock(pub FixedOffset);

impl BusinessClock {
    pub fn now(&self) -> NaiveDateTime{
        Utc::now().with_timezone(&self.0).naive_local()
    }

    pub fn today(&self) -> NaiveDate{
        self.now().date()
    }

    // UTC instants delimiting a local business day, end exclusive
    pub fn day_bounds(&self, date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>){
        let start = (date.and_time(NaiveTime::MIN)
            - Duration::seconds(self.0.local_minus_utc() as i64))
            .and_utc();
        (start, start + Duration::days(1))
    }

    pub fn local(&self, instant: DateTime<Utc>) -> NaiveDateTime{
        instant.with_timezone(&self.0).naive_local()
    }
}
