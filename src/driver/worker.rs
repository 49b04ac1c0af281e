//! Async facade over the blocking [`Session`].
//!
//! Every call runs on Tokio's blocking pool. The session sits behind a
//! mutex, so calls on one handle are serialized even when the handle is
//! cloned across tasks.

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::runtime::Handle;
use tokio::task;

use super::bolt::connection::BoltStream;
use super::config::SessionParams;
use super::error::{DriverError, DriverResult};
use super::record::{Columns, Fetched, PullToken, Record, Summary};
use super::session::{Session, SessionState};
use super::tls::Transport;

/// Cloneable async handle to one session.
///
/// Dropping the last handle inside a Tokio runtime closes the session on the
/// blocking pool. Outside a runtime it closes on the dropping thread.
pub struct AsyncSession<S: BoltStream + Send + 'static = Transport> {
    inner: Arc<Mutex<Session<S>>>,
}

impl<S: BoltStream + Send + 'static> Clone for AsyncSession<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl AsyncSession<Transport> {
    /// Connect on a blocking worker.
    pub async fn connect(params: SessionParams) -> DriverResult<Self> {
        let session = task::spawn_blocking(move || Session::connect(params))
            .await
            .map_err(|e| DriverError::internal(format!("connect task failed: {}", e)))??;
        Ok(Self::new(session))
    }
}

impl<S: BoltStream + Send + 'static> AsyncSession<S> {
    /// Wrap a connected session.
    pub fn new(session: Session<S>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(session)),
        }
    }

    async fn call<T, F>(&self, op: F) -> DriverResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Session<S>) -> DriverResult<T> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        task::spawn_blocking(move || {
            let mut session = inner.lock();
            op(&mut *session)
        })
        .await
        .map_err(|e| DriverError::internal(format!("session task failed: {}", e)))?
    }

    /// Current state. Waits for a running operation to finish.
    pub async fn state(&self) -> DriverResult<SessionState> {
        self.call(|s| Ok(s.state())).await
    }

    /// See [`Session::run`].
    pub async fn run(&self, query: impl Into<String>, params: Option<Value>) -> DriverResult<Columns> {
        let query = query.into();
        self.call(move |s| s.run(&query, params.as_ref())).await
    }

    /// See [`Session::pull`].
    pub async fn pull(&self) -> DriverResult<PullToken> {
        self.call(|s| s.pull()).await
    }

    /// See [`Session::fetch`].
    pub async fn fetch(&self) -> DriverResult<Fetched> {
        self.call(|s| s.fetch()).await
    }

    /// See [`Session::fetch_one`].
    pub async fn fetch_one(&self) -> DriverResult<Option<Record>> {
        self.call(|s| s.fetch_one()).await
    }

    /// See [`Session::fetch_all`].
    pub async fn fetch_all(&self) -> DriverResult<Vec<Record>> {
        self.call(|s| s.fetch_all()).await
    }

    /// See [`Session::execute_and_fetch_all`].
    pub async fn execute_and_fetch_all(
        &self,
        query: impl Into<String>,
        params: Option<Value>,
    ) -> DriverResult<Vec<Record>> {
        let query = query.into();
        self.call(move |s| s.execute_and_fetch_all(&query, params.as_ref()))
            .await
    }

    /// See [`Session::discard_all`].
    pub async fn discard_all(&self) -> DriverResult<Summary> {
        self.call(|s| s.discard_all()).await
    }

    /// See [`Session::begin`].
    pub async fn begin(&self) -> DriverResult<()> {
        self.call(|s| s.begin()).await
    }

    /// See [`Session::commit`].
    pub async fn commit(&self) -> DriverResult<()> {
        self.call(|s| s.commit()).await
    }

    /// See [`Session::rollback`].
    pub async fn rollback(&self) -> DriverResult<()> {
        self.call(|s| s.rollback()).await
    }

    /// See [`Session::close`].
    pub async fn close(&self) -> DriverResult<()> {
        self.call(|s| {
            s.close();
            Ok(())
        })
        .await
    }
}

impl<S: BoltStream + Send + 'static> Drop for AsyncSession<S> {
    fn drop(&mut self) {
        if Arc::strong_count(&self.inner) != 1 {
            return;
        }
        // GOODBYE is a blocking write; keep it off the runtime's workers
        if let Ok(handle) = Handle::try_current() {
            let inner = Arc::clone(&self.inner);
            handle.spawn_blocking(move || {
                inner.lock().close();
            });
        }
    }
}

impl<S: BoltStream + Send + 'static> std::fmt::Debug for AsyncSession<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncSession").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bolt::{AuthToken, PackStreamValue, SuccessMessage};
    use crate::driver::mock::ScriptedStream;
    use serde_json::json;

    fn async_session(stream: &ScriptedStream) -> AsyncSession<ScriptedStream> {
        AsyncSession::new(
            Session::from_stream_with_auth(stream.clone(), "test", AuthToken::None).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_async_round_trip() {
        let stream = ScriptedStream::ready()
            .fields(&["x"])
            .record(vec![PackStreamValue::Integer(5)])
            .success(SuccessMessage::new());
        let session = async_session(&stream);

        let rows = session
            .execute_and_fetch_all("RETURN $x AS x", Some(json!({"x": 5})))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("x"), Some(&json!(5)));
        assert_eq!(session.state().await.unwrap(), SessionState::Ready);
    }

    #[tokio::test]
    async fn test_async_errors_propagate() {
        let session = async_session(&ScriptedStream::ready());
        let err = session.pull().await.unwrap_err();
        assert!(err.is_contract_violation());
    }

    #[tokio::test]
    async fn test_clones_share_session() {
        let stream = ScriptedStream::ready().control_ok();
        let session = async_session(&stream);
        let other = session.clone();

        session.begin().await.unwrap();
        assert_eq!(other.state().await.unwrap(), SessionState::InTransaction);

        other.close().await.unwrap();
        assert_eq!(session.state().await.unwrap(), SessionState::Closed);
        assert!(session.run("RETURN 1", None).await.is_err());
    }

    #[tokio::test]
    async fn test_panicking_task_is_internal_error() {
        let session = async_session(&ScriptedStream::ready());
        let err = session
            .call(|_| -> DriverResult<()> { panic!("worker exploded") })
            .await
            .unwrap_err();
        assert!(matches!(err, DriverError::Internal(_)));
    }

    #[tokio::test]
    async fn test_last_drop_closes_on_blocking_pool() {
        let stream = ScriptedStream::ready();
        let session = async_session(&stream);
        let other = session.clone();

        drop(session);
        assert_eq!(stream.sent_names(), vec!["HELLO"]);

        drop(other);
        for _ in 0..200 {
            if stream.sent_names().contains(&"GOODBYE") {
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(5));
        }
        assert_eq!(stream.sent_names(), vec!["HELLO", "GOODBYE"]);
    }
}
