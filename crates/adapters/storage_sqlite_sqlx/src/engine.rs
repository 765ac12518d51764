//! Engine host — a tokio task owning the single `SQLite` connection.
//!
//! Every statement reaches the engine as a [`Request`] over an mpsc channel
//! and is answered on a oneshot. The task handles requests one at a time, in
//! arrival order; that ordering is the only serialization the engine gets.

use std::future::Future;
use std::sync::Arc;

use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{ConnectOptions, Connection as _, SqliteConnection};
use tokio::sync::{Mutex, mpsc, oneshot};

use crate::error::{InitializationError, StorageError};
use crate::value::{QueryResult, Row, Value};

const REQUEST_BUFFER: usize = 32;

type Reply<T> = oneshot::Sender<Result<T, sqlx::Error>>;

enum Request {
    Query {
        sql: String,
        params: Vec<Value>,
        reply: Reply<QueryResult>,
    },
    Begin(Reply<()>),
    Commit(Reply<()>),
    Rollback(Reply<()>),
    Close(oneshot::Sender<()>),
}

/// Spawns the task that hosts the engine connection.
pub struct EngineHost;

impl EngineHost {
    /// Open the connection described by `options` and move it into a new
    /// task on the current runtime.
    ///
    /// # Errors
    ///
    /// Returns [`InitializationError::EngineStart`] when the connection
    /// cannot be opened.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub async fn spawn(options: &SqliteConnectOptions) -> Result<Connection, InitializationError> {
        let conn = options
            .connect()
            .await
            .map_err(InitializationError::EngineStart)?;
        let (requests, inbox) = mpsc::channel(REQUEST_BUFFER);
        tokio::spawn(run(conn, inbox));
        tracing::info!("database engine started");
        Ok(Connection {
            requests,
            transactions: Arc::new(Mutex::new(())),
        })
    }
}

async fn run(mut conn: SqliteConnection, mut inbox: mpsc::Receiver<Request>) {
    let mut closed_by = None;
    while let Some(request) = inbox.recv().await {
        match request {
            Request::Query { sql, params, reply } => {
                tracing::debug!(%sql, params = params.len(), "engine query");
                let _ = reply.send(execute(&mut conn, &sql, params).await);
            }
            Request::Begin(reply) => {
                let _ = reply.send(statement(&mut conn, "BEGIN").await);
            }
            Request::Commit(reply) => {
                let _ = reply.send(statement(&mut conn, "COMMIT").await);
            }
            Request::Rollback(reply) => {
                let _ = reply.send(statement(&mut conn, "ROLLBACK").await);
            }
            Request::Close(reply) => {
                closed_by = Some(reply);
                break;
            }
        }
    }

    inbox.close();
    if let Err(err) = conn.close().await {
        tracing::warn!(error = %err, "failed to close database engine");
    }
    tracing::info!("database engine stopped");
    if let Some(reply) = closed_by {
        let _ = reply.send(());
    }
}

async fn statement(conn: &mut SqliteConnection, sql: &str) -> Result<(), sqlx::Error> {
    tracing::debug!(%sql, "engine statement");
    sqlx::query(sql).execute(&mut *conn).await.map(drop)
}

async fn execute(
    conn: &mut SqliteConnection,
    sql: &str,
    params: Vec<Value>,
) -> Result<QueryResult, sqlx::Error> {
    let mut query = sqlx::query(sql);
    for param in params {
        query = param.bind_to(query);
    }

    if returns_rows(sql) {
        let fetched = query.fetch_all(&mut *conn).await?;
        let rows = fetched
            .iter()
            .map(Row::from_sqlite)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(QueryResult {
            rows,
            rows_affected: 0,
        })
    } else {
        let done = query.execute(&mut *conn).await?;
        Ok(QueryResult {
            rows: Vec::new(),
            rows_affected: done.rows_affected(),
        })
    }
}

fn returns_rows(sql: &str) -> bool {
    let upper = sql.trim_start().to_ascii_uppercase();
    ["SELECT", "WITH", "PRAGMA", "VALUES"]
        .iter()
        .any(|keyword| upper.starts_with(keyword))
        || upper.contains("RETURNING")
}

/// Cloneable handle to a running engine host.
///
/// Clones share one transaction gate, so transactions started through any
/// of them run one after the other.
#[derive(Debug, Clone)]
pub struct Connection {
    requests: mpsc::Sender<Request>,
    transactions: Arc<Mutex<()>>,
}

impl Connection {
    async fn request<T>(
        &self,
        build: impl FnOnce(Reply<T>) -> Request,
    ) -> Result<T, StorageError> {
        let (reply, response) = oneshot::channel();
        self.requests
            .send(build(reply))
            .await
            .map_err(|_| StorageError::EngineClosed)?;
        let result = response.await.map_err(|_| StorageError::EngineClosed)?;
        Ok(result?)
    }

    /// Run one statement with positional `params`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Database`] when the engine rejects the
    /// statement, [`StorageError::EngineClosed`] when the host is gone.
    pub async fn query(&self, sql: &str, params: Vec<Value>) -> Result<QueryResult, StorageError> {
        let sql = sql.to_string();
        self.request(|reply| Request::Query { sql, params, reply })
            .await
    }

    /// # Errors
    ///
    /// See [`query`](Self::query).
    pub async fn begin(&self) -> Result<(), StorageError> {
        self.request(Request::Begin).await
    }

    /// # Errors
    ///
    /// See [`query`](Self::query).
    pub async fn commit(&self) -> Result<(), StorageError> {
        self.request(Request::Commit).await
    }

    /// # Errors
    ///
    /// See [`query`](Self::query).
    pub async fn rollback(&self) -> Result<(), StorageError> {
        self.request(Request::Rollback).await
    }

    /// Run `work` between `BEGIN` and `COMMIT`.
    ///
    /// Any error from `work` or from the commit rolls the transaction back
    /// and is returned unchanged. The unit runs on its own task behind the
    /// transaction gate: dropping the returned future does not abandon it
    /// halfway, it still commits or rolls back before the next transaction
    /// begins.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by `begin`, `work` or `commit`, or
    /// [`StorageError::Interrupted`] if the task did not finish.
    pub async fn transaction<T, F, Fut>(&self, work: F) -> Result<T, StorageError>
    where
        T: Send + 'static,
        F: FnOnce(Connection) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, StorageError>> + Send + 'static,
    {
        let connection = self.clone();
        tokio::spawn(async move {
            let _turn = connection.transactions.lock().await;
            connection.run_transaction(work).await
        })
        .await
        .map_err(|err| StorageError::Interrupted(err.to_string()))?
    }

    async fn run_transaction<T, F, Fut>(&self, work: F) -> Result<T, StorageError>
    where
        F: FnOnce(Connection) -> Fut,
        Fut: Future<Output = Result<T, StorageError>>,
    {
        self.begin().await?;
        match work(self.clone()).await {
            Ok(value) => match self.commit().await {
                Ok(()) => Ok(value),
                Err(err) => {
                    self.abort().await;
                    Err(err)
                }
            },
            Err(err) => {
                self.abort().await;
                Err(err)
            }
        }
    }

    async fn abort(&self) {
        if let Err(err) = self.rollback().await {
            tracing::warn!(error = %err, "rollback failed");
        }
    }

    /// Ask the host to close the engine and wait until it has.
    ///
    /// Closing an already stopped host is a no-op.
    pub async fn close(&self) {
        let (reply, done) = oneshot::channel();
        if self.requests.send(Request::Close(reply)).await.is_ok() {
            let _ = done.await;
        }
    }

    /// Whether the host task has stopped.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.requests.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    async fn memory() -> Connection {
        let options = SqliteConnectOptions::from_str("sqlite::memory:").unwrap();
        let conn = EngineHost::spawn(&options).await.unwrap();
        conn.query("CREATE TABLE t (id INTEGER PRIMARY KEY, label TEXT)", Vec::new())
            .await
            .unwrap();
        conn
    }

    async fn count(conn: &Connection) -> i64 {
        let result = conn
            .query("SELECT COUNT(*) AS n FROM t", Vec::new())
            .await
            .unwrap();
        result.first().unwrap().integer("n").unwrap()
    }

    #[test]
    fn should_detect_row_returning_statements() {
        assert!(returns_rows("  select 1"));
        assert!(returns_rows("WITH x AS (SELECT 1) SELECT * FROM x"));
        assert!(returns_rows("PRAGMA table_info(t)"));
        assert!(returns_rows("INSERT INTO t (label) VALUES ('a') RETURNING id"));
        assert!(!returns_rows("INSERT INTO t (label) VALUES ('a')"));
        assert!(!returns_rows("DELETE FROM t"));
    }

    #[tokio::test]
    async fn should_bind_params_and_fetch_rows() {
        let conn = memory().await;

        let inserted = conn
            .query(
                "INSERT INTO t (label) VALUES (?), (?)",
                vec![Value::from("a"), Value::Null],
            )
            .await
            .unwrap();
        assert_eq!(inserted.rows_affected, 2);

        let result = conn
            .query("SELECT id, label FROM t ORDER BY id", Vec::new())
            .await
            .unwrap();
        assert_eq!(result.rows.len(), 2);
        assert_eq!(result.rows[0].text("label").unwrap(), "a");
        assert_eq!(result.rows[1].get("label"), Some(&Value::Null));
    }

    #[tokio::test]
    async fn should_commit_successful_transaction() {
        let conn = memory().await;

        let id = conn
            .transaction(|tx| async move {
                tx.query("INSERT INTO t (label) VALUES ('a')", Vec::new())
                    .await?;
                let row = tx.query("SELECT last_insert_rowid() AS id", Vec::new()).await?;
                row.first()
                    .ok_or_else(|| StorageError::decode("id", "no row"))?
                    .integer("id")
            })
            .await
            .unwrap();

        assert_eq!(id, 1);
        assert_eq!(count(&conn).await, 1);
    }

    #[tokio::test]
    async fn should_roll_back_when_work_fails() {
        let conn = memory().await;

        let result: Result<(), _> = conn
            .transaction(|tx| async move {
                tx.query("INSERT INTO t (label) VALUES ('a')", Vec::new())
                    .await?;
                tx.query("INSERT INTO missing (x) VALUES (1)", Vec::new())
                    .await?;
                Ok::<(), StorageError>(())
            })
            .await;

        assert!(matches!(result, Err(StorageError::Database(_))));
        assert_eq!(count(&conn).await, 0);
        // the connection is usable again
        conn.transaction(|tx| async move {
            tx.query("INSERT INTO t (label) VALUES ('b')", Vec::new())
                .await
                .map(drop)
        })
        .await
        .unwrap();
        assert_eq!(count(&conn).await, 1);
    }

    #[tokio::test]
    async fn should_finish_transaction_when_caller_stops_waiting() {
        let conn = memory().await;
        let (started, mid_flight) = oneshot::channel();

        let abandoned = {
            let conn = conn.clone();
            tokio::spawn(async move {
                conn.transaction(|tx| async move {
                    tx.query("INSERT INTO t (label) VALUES ('a')", Vec::new())
                        .await?;
                    let _ = started.send(());
                    tokio::task::yield_now().await;
                    tx.query("INSERT INTO t (label) VALUES ('b')", Vec::new())
                        .await
                        .map(drop)
                })
                .await
            })
        };
        mid_flight.await.unwrap();
        abandoned.abort();

        conn.transaction(|tx| async move {
            tx.query("INSERT INTO t (label) VALUES ('c')", Vec::new())
                .await
                .map(drop)
        })
        .await
        .unwrap();

        // the abandoned unit committed before the next one began
        assert_eq!(count(&conn).await, 3);
    }

    #[tokio::test]
    async fn should_refuse_requests_once_closed() {
        let conn = memory().await;
        let other = conn.clone();

        conn.close().await;

        assert!(other.is_closed());
        let err = other.query("SELECT 1", Vec::new()).await.unwrap_err();
        assert!(matches!(err, StorageError::EngineClosed));
        // closing twice is harmless
        other.close().await;
    }
}
