//! Remote XP sync.
//!
//! Each correct answer's XP delta is pushed to the score endpoint on its own
//! tokio task. Nothing waits on these tasks and nothing retries them: local
//! XP is already updated, and a failed or cancelled push is logged and lost.
//! Tasks still running when the encounter is torn down are aborted.
//!
//! Pushes run on the tokio runtime that was current when the [`ScoreSync`]
//! was created, or on the caller's runtime. With neither, the delta is
//! logged and dropped.

use async_trait::async_trait;
use log::{debug, warn};
use serde::Serialize;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::task::JoinSet;

use crate::quiz::errors::QuizError;

/// JSON body sent to the score endpoint.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ScoreUpdate<'a> {
    pub session_id: &'a str,
    pub xp: u32,
}

#[async_trait]
pub trait ScoreSink: Send + Sync {
    async fn record_xp(&self, session_id: &str, xp: u32) -> Result<(), QuizError>;
}

/// Sink used when score sync is switched off in config.
pub struct DisabledScoreSink;

#[async_trait]
impl ScoreSink for DisabledScoreSink {
    async fn record_xp(&self, session_id: &str, xp: u32) -> Result<(), QuizError> {
        debug!("score sync disabled; not sending {} XP for {}", xp, session_id);
        Ok(())
    }
}

/// `{endpoint}/sessions/{session_id}/xp` with the session id path-encoded.
pub fn score_url(endpoint: &str, session_id: &str) -> String {
    format!(
        "{}/sessions/{}/xp",
        endpoint.trim_end_matches('/'),
        urlencoding::encode(session_id)
    )
}

#[cfg(feature = "score-sync")]
pub use http::HttpScoreSink;

#[cfg(feature = "score-sync")]
mod http {
    use super::*;
    use std::time::Duration;

    /// POSTs XP deltas to the local score API.
    pub struct HttpScoreSink {
        client: reqwest::Client,
        endpoint: String,
    }

    impl HttpScoreSink {
        pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, QuizError> {
            let client = reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .map_err(|e| QuizError::Http(e.to_string()))?;
            Ok(Self {
                client,
                endpoint: endpoint.to_string(),
            })
        }
    }

    #[async_trait]
    impl ScoreSink for HttpScoreSink {
        async fn record_xp(&self, session_id: &str, xp: u32) -> Result<(), QuizError> {
            let url = score_url(&self.endpoint, session_id);
            debug!("POST {} ({} XP)", url, xp);
            let response = self
                .client
                .post(&url)
                .json(&ScoreUpdate { session_id, xp })
                .send()
                .await
                .map_err(|e| QuizError::Http(e.to_string()))?;
            if !response.status().is_success() {
                return Err(QuizError::ScoreRejected(format!(
                    "{} returned {}",
                    url,
                    response.status()
                )));
            }
            Ok(())
        }
    }
}

/// Fire-and-forget dispatcher bound to one session.
pub struct ScoreSync {
    sink: Arc<dyn ScoreSink>,
    session_id: String,
    runtime: Option<Handle>,
    tasks: JoinSet<()>,
}

impl ScoreSync {
    pub fn new(sink: Arc<dyn ScoreSink>, session_id: &str) -> Self {
        Self {
            sink,
            session_id: session_id.to_string(),
            runtime: Handle::try_current().ok(),
            tasks: JoinSet::new(),
        }
    }

    /// Queue an XP push without waiting for it.
    pub fn submit(&mut self, xp: u32) {
        if xp == 0 {
            return;
        }
        let Some(runtime) = Handle::try_current().ok().or_else(|| self.runtime.clone()) else {
            warn!(
                "no async runtime for score sync; {} XP for session {} dropped",
                xp, self.session_id
            );
            return;
        };
        while self.tasks.try_join_next().is_some() {}

        let sink = Arc::clone(&self.sink);
        let session_id = self.session_id.clone();
        let push = async move {
            match sink.record_xp(&session_id, xp).await {
                Ok(()) => debug!("synced {} XP for session {}", xp, session_id),
                Err(e) => warn!(
                    "score sync failed for session {} ({} XP dropped): {}",
                    session_id, xp, e
                ),
            }
        };
        self.tasks.spawn_on(push, &runtime);
    }

    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    /// Wait for every queued push to finish. Only for callers that choose to
    /// block, such as a clean process exit.
    pub async fn settle(&mut self) {
        while self.tasks.join_next().await.is_some() {}
    }

    /// Abort queued pushes. Their XP never reaches the endpoint.
    pub fn shutdown(&mut self) {
        let pending = self.tasks.len();
        self.tasks.abort_all();
        if pending > 0 {
            debug!(
                "cancelled {} in-flight score update(s) for session {}",
                pending, self.session_id
            );
        }
    }
}

impl Drop for ScoreSync {
    fn drop(&mut self) {
        self.shutdown();
    }
}
