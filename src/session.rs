//! Database session acquisition and release.
//!
//! A run talks to Postgres through exactly one transaction. [`with_session`]
//! commits it only when the body succeeds; every other exit drops the
//! transaction (rolling back the table reset too) and the client.

use std::{io::Write, time::Duration};

use log::{debug, info};
use postgres::{Client, Config, NoTls, Transaction, types::ToSql};

use crate::error::{DbError, Error, PipelineFailure, Stage};

/// Connection parameters for the destination database.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionParams {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
    pub connect_timeout: Option<Duration>,
}

impl ConnectionParams {
    pub fn config(&self) -> Config {
        let mut config = Config::new();
        config
            .host(&self.host)
            .port(self.port)
            .dbname(&self.database)
            .user(&self.user)
            .password(&self.password)
            .application_name(env!("CARGO_PKG_NAME"));
        if let Some(timeout) = self.connect_timeout {
            config.connect_timeout(timeout);
        }
        config
    }
}

impl std::fmt::Debug for ConnectionParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionParams")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"***")
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

/// The statements a load needs from an open transaction.
pub trait Session {
    fn batch_execute(&mut self, sql: &str) -> Result<(), DbError>;

    fn execute(&mut self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> Result<u64, DbError>;

    /// Streams `payload` to a `COPY ... FROM STDIN` statement and returns the
    /// number of rows the server accepted.
    fn copy_in(&mut self, sql: &str, payload: &[u8]) -> Result<u64, DbError>;
}

impl Session for Transaction<'_> {
    fn batch_execute(&mut self, sql: &str) -> Result<(), DbError> {
        Transaction::batch_execute(self, sql).map_err(DbError::from)
    }

    fn execute(&mut self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> Result<u64, DbError> {
        Transaction::execute(self, sql, params).map_err(DbError::from)
    }

    fn copy_in(&mut self, sql: &str, payload: &[u8]) -> Result<u64, DbError> {
        let mut writer = Transaction::copy_in(self, sql)?;
        writer.write_all(payload)?;
        Ok(writer.finish()?)
    }
}

/// Runs `body` inside one transaction on a fresh connection.
///
/// Failures from `body` are returned unchanged; connection and commit
/// failures are reported under [`Stage::OpenSession`] and [`Stage::Commit`].
pub fn with_session<T, F>(params: &ConnectionParams, body: F) -> Result<T, PipelineFailure>
where
    F: FnOnce(&mut dyn Session) -> Result<T, PipelineFailure>,
{
    debug!("Connecting with {params:?}");
    let mut client = params
        .config()
        .connect(NoTls)
        .map_err(|source| connection_failure(params, source))?;
    info!(
        "Connected to {}:{}/{} as {}",
        params.host, params.port, params.database, params.user
    );

    let outcome = run_in_transaction(params, &mut client, body);
    release(client);
    outcome
}

fn connection_failure(params: &ConnectionParams, source: postgres::Error) -> PipelineFailure {
    PipelineFailure::new(
        Stage::OpenSession,
        Error::Connection {
            host: params.host.clone(),
            port: params.port,
            database: params.database.clone(),
            source,
        },
    )
}

fn run_in_transaction<T, F>(
    params: &ConnectionParams,
    client: &mut Client,
    body: F,
) -> Result<T, PipelineFailure>
where
    F: FnOnce(&mut dyn Session) -> Result<T, PipelineFailure>,
{
    let mut transaction = client
        .transaction()
        .map_err(|source| connection_failure(params, source))?;
    let value = body(&mut transaction)?;
    transaction
        .commit()
        .map_err(|source| PipelineFailure::new(Stage::Commit, Error::Commit(source)))?;
    Ok(value)
}

fn release(client: Client) {
    match client.close() {
        Ok(()) => info!("Connection to PostgreSQL closed"),
        Err(err) => debug!("Connection closed with error: {err}"),
    }
}
