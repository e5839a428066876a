// src/runs.rs
//! Per-session run coordination.
//!
//! Starting a run aborts whatever run the same session still has in flight,
//! so a session's output always belongs to its most recently triggered run.
//! Runs of different sessions never affect each other.

use log::warn;
use std::collections::HashMap;
use std::future::Future;
use tokio::sync::Mutex;
use tokio::task::{AbortHandle, JoinHandle};

struct ActiveRun {
    run_id: String,
    handle: AbortHandle,
}

#[derive(Default)]
pub struct RunSlot {
    sessions: Mutex<HashMap<String, ActiveRun>>,
}

impl RunSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawns `run` for `session`, aborting that session's previous run
    /// first if it hasn't finished.
    pub async fn start<F>(&self, session: &str, run_id: &str, run: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let mut sessions = self.sessions.lock().await;
        sessions.retain(|_, active| !active.handle.is_finished());

        if let Some(previous) = sessions.remove(session) {
            warn!(
                "Run {} superseded by {} in session {}, aborting it",
                previous.run_id, run_id, session
            );
            previous.handle.abort();
        }

        let task = tokio::spawn(run);
        sessions.insert(
            session.to_string(),
            ActiveRun {
                run_id: run_id.to_string(),
                handle: task.abort_handle(),
            },
        );
        task
    }

    /// Forgets `run_id` once it has settled. A newer run in the same session
    /// is left alone.
    pub async fn finish(&self, session: &str, run_id: &str) {
        let mut sessions = self.sessions.lock().await;
        if sessions.get(session).is_some_and(|active| active.run_id == run_id) {
            sessions.remove(session);
        }
    }

    /// Id of the session's most recently started run, if it is still going.
    pub async fn active_run(&self, session: &str) -> Option<String> {
        self.sessions
            .lock()
            .await
            .get(session)
            .filter(|active| !active.handle.is_finished())
            .map(|active| active.run_id.clone())
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    async fn slow(label: &'static str) -> &'static str {
        tokio::time::sleep(Duration::from_millis(50)).await;
        label
    }

    #[tokio::test]
    async fn test_new_run_aborts_previous_in_same_session() {
        let slot = RunSlot::new();

        let first = slot
            .start("alice", "first", async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                "first"
            })
            .await;
        let second = slot.start("alice", "second", async { "second" }).await;

        assert!(first.await.unwrap_err().is_cancelled());
        assert_eq!(second.await.unwrap(), "second");
    }

    #[tokio::test]
    async fn test_sessions_run_concurrently() {
        let slot = RunSlot::new();

        let alice = slot.start("alice", "a1", slow("alice")).await;
        let bob = slot.start("bob", "b1", slow("bob")).await;

        assert_eq!(alice.await.unwrap(), "alice");
        assert_eq!(bob.await.unwrap(), "bob");
    }

    #[tokio::test]
    async fn test_finish_removes_only_matching_run() {
        let slot = RunSlot::new();

        let handle = slot.start("alice", "a1", async { 1 }).await;
        assert_eq!(handle.await.unwrap(), 1);
        assert_eq!(slot.active_run("alice").await, None);

        let newer = slot
            .start("alice", "a2", async {
                tokio::time::sleep(Duration::from_secs(60)).await;
            })
            .await;
        slot.finish("alice", "a1").await;
        assert_eq!(slot.active_run("alice").await.as_deref(), Some("a2"));

        newer.abort();
        slot.finish("alice", "a2").await;
        assert_eq!(slot.session_count().await, 0);
    }

    #[tokio::test]
    async fn test_finished_sessions_are_pruned_on_start() {
        let slot = RunSlot::new();
        let done = slot.start("alice", "a1", async {}).await;
        done.await.unwrap();

        let bob = slot.start("bob", "b1", async {}).await;
        bob.await.unwrap();
        assert_eq!(slot.session_count().await, 1);
    }
}
