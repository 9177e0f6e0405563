//! Waiting on a generation job.
//!
//! The wait is a small state machine driven by the normalized provider
//! status. Time comes from a [`Clock`], and the deadline is checked on every
//! transition rather than inside the sleep, so tests can run the loop
//! against a fake clock.

use crate::clock::Clock;
use crate::error::{AnchorcastError, AnchorcastResult};
use crate::video::VideoService;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

/// Fixed delay between status polls.
pub const POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Provider status, normalized case-insensitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Succeeded,
    Failed,
    Pending,
}

impl StatusClass {
    pub fn classify(status: &str) -> Self {
        match status.trim().to_lowercase().as_str() {
            "succeeded" | "success" | "completed" => StatusClass::Succeeded,
            "failed" | "error" => StatusClass::Failed,
            _ => StatusClass::Pending,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum JobState {
    Submitted,
    Polling { last: Value },
    Succeeded { url: String },
    Failed { payload: Value },
    TimedOut { last: Value },
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Succeeded { .. } | JobState::Failed { .. } | JobState::TimedOut { .. }
        )
    }

    /// Apply one observed status payload.
    ///
    /// A success without any result URL is a data-integrity failure and is
    /// returned as an error rather than a state.
    pub fn advance(
        self,
        job_id: &str,
        payload: Value,
        elapsed: Duration,
        timeout: Duration,
    ) -> AnchorcastResult<JobState> {
        if self.is_terminal() {
            return Ok(self);
        }

        let status = payload.get("status").and_then(Value::as_str).unwrap_or("");
        match StatusClass::classify(status) {
            StatusClass::Succeeded => match result_url(&payload) {
                Some(url) => Ok(JobState::Succeeded { url }),
                None => Err(AnchorcastError::MalformedResponse {
                    provider: "hedra",
                    message: format!(
                        "generation {job_id} succeeded but no URL found. Status payload: {payload}"
                    ),
                }),
            },
            StatusClass::Failed => Ok(JobState::Failed { payload }),
            StatusClass::Pending if elapsed > timeout => Ok(JobState::TimedOut { last: payload }),
            StatusClass::Pending => Ok(JobState::Polling { last: payload }),
        }
    }
}

/// Result URL of a succeeded job: `asset.url`, then `output.url`, then `url`.
pub fn result_url(payload: &Value) -> Option<String> {
    [
        payload.pointer("/asset/url"),
        payload.pointer("/output/url"),
        payload.get("url"),
    ]
    .into_iter()
    .flatten()
    .filter_map(Value::as_str)
    .find(|s| !s.is_empty())
    .map(str::to_string)
}

/// Poll `job_id` every [`POLL_INTERVAL`] until it reaches a terminal state.
pub fn wait_for_video_url(
    service: &dyn VideoService,
    clock: &dyn Clock,
    job_id: &str,
    timeout: Duration,
) -> AnchorcastResult<String> {
    let started = clock.now();
    let mut state = JobState::Submitted;
    let mut polls = 0u32;

    loop {
        let payload = service.get_generation_status(job_id)?;
        polls += 1;
        let elapsed = clock.now().saturating_sub(started);
        state = state.advance(job_id, payload, elapsed, timeout)?;

        match state {
            JobState::Succeeded { url } => {
                info!("Generation {job_id} finished after {polls} poll(s)");
                return Ok(url);
            }
            JobState::Failed { payload } => {
                return Err(AnchorcastError::GenerationFailed {
                    job_id: job_id.to_string(),
                    payload,
                });
            }
            JobState::TimedOut { last } => {
                return Err(AnchorcastError::Timeout {
                    job_id: job_id.to_string(),
                    last_status: last,
                });
            }
            JobState::Polling { ref last } => {
                let status = last.get("status").cloned().unwrap_or_default();
                debug!("Generation {job_id} still {status} after {elapsed:?}");
                clock.sleep(POLL_INTERVAL);
            }
            JobState::Submitted => clock.sleep(POLL_INTERVAL),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FakeClock;
    use crate::video::{AssetKind, GenerationRequest, ModelInfo};
    use serde_json::json;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::path::Path;

    /// Replays status payloads; the last one repeats forever.
    struct ScriptedStatus {
        payloads: RefCell<VecDeque<Value>>,
        polls: RefCell<u32>,
    }

    impl ScriptedStatus {
        fn new(payloads: Vec<Value>) -> Self {
            Self {
                payloads: RefCell::new(payloads.into()),
                polls: RefCell::new(0),
            }
        }

        fn polls(&self) -> u32 {
            *self.polls.borrow()
        }
    }

    impl VideoService for ScriptedStatus {
        fn list_models(&self) -> AnchorcastResult<Vec<ModelInfo>> {
            unreachable!()
        }
        fn create_asset(&self, _: &str, _: AssetKind) -> AnchorcastResult<String> {
            unreachable!()
        }
        fn upload_asset(&self, _: &str, _: &Path) -> AnchorcastResult<()> {
            unreachable!()
        }
        fn generate_video(&self, _: &GenerationRequest) -> AnchorcastResult<String> {
            unreachable!()
        }
        fn get_generation_status(&self, _: &str) -> AnchorcastResult<Value> {
            *self.polls.borrow_mut() += 1;
            let mut queue = self.payloads.borrow_mut();
            if queue.len() > 1 {
                Ok(queue.pop_front().unwrap())
            } else {
                Ok(queue.front().cloned().unwrap())
            }
        }
        fn download_file(&self, _: &str, _: &Path) -> AnchorcastResult<u64> {
            unreachable!()
        }
    }

    #[test]
    fn test_classify() {
        assert_eq!(StatusClass::classify("SUCCEEDED"), StatusClass::Succeeded);
        assert_eq!(StatusClass::classify("success"), StatusClass::Succeeded);
        assert_eq!(StatusClass::classify("Completed"), StatusClass::Succeeded);
        assert_eq!(StatusClass::classify("failed"), StatusClass::Failed);
        assert_eq!(StatusClass::classify("ERROR"), StatusClass::Failed);
        assert_eq!(StatusClass::classify("queued"), StatusClass::Pending);
        assert_eq!(StatusClass::classify(""), StatusClass::Pending);
    }

    #[test]
    fn test_result_url_precedence() {
        let payload = json!({
            "asset": {"url": "https://a"},
            "output": {"url": "https://o"},
            "url": "https://top"
        });
        assert_eq!(result_url(&payload).as_deref(), Some("https://a"));

        let payload = json!({"output": {"url": "https://o"}, "url": "https://top"});
        assert_eq!(result_url(&payload).as_deref(), Some("https://o"));

        let payload = json!({"asset": {}, "url": "https://top"});
        assert_eq!(result_url(&payload).as_deref(), Some("https://top"));

        assert_eq!(result_url(&json!({"status": "complete"})), None);
    }

    #[test]
    fn test_returns_url_after_three_polls() {
        let service = ScriptedStatus::new(vec![
            json!({"status": "queued"}),
            json!({"status": "processing"}),
            json!({"status": "succeeded", "url": "https://cdn/video.mp4"}),
            json!({"status": "succeeded", "url": "https://cdn/other.mp4"}),
        ]);
        let clock = FakeClock::new();

        let url =
            wait_for_video_url(&service, &clock, "gen-1", Duration::from_secs(900)).unwrap();

        assert_eq!(url, "https://cdn/video.mp4");
        assert_eq!(service.polls(), 3);
        assert_eq!(clock.sleeps(), vec![POLL_INTERVAL, POLL_INTERVAL]);
    }

    #[test]
    fn test_times_out_with_last_payload() {
        let service = ScriptedStatus::new(vec![json!({"status": "processing", "progress": 0.4})]);
        let clock = FakeClock::new();

        let err =
            wait_for_video_url(&service, &clock, "gen-2", Duration::from_secs(12)).unwrap_err();

        match err {
            AnchorcastError::Timeout {
                job_id,
                last_status,
            } => {
                assert_eq!(job_id, "gen-2");
                assert_eq!(last_status["status"], "processing");
            }
            other => panic!("unexpected error: {other}"),
        }
        // Polls at 0s, 5s, 10s and 15s; the fourth exceeds the 12s budget.
        assert_eq!(service.polls(), 4);
    }

    #[test]
    fn test_failed_status_carries_payload() {
        let service = ScriptedStatus::new(vec![
            json!({"status": "processing"}),
            json!({"status": "Failed", "error_message": "face not detected"}),
        ]);
        let clock = FakeClock::new();

        let err =
            wait_for_video_url(&service, &clock, "gen-3", Duration::from_secs(900)).unwrap_err();

        assert!(matches!(err, AnchorcastError::GenerationFailed { .. }));
        assert!(err.to_string().contains("face not detected"));
    }

    #[test]
    fn test_success_without_url_is_malformed() {
        let service = ScriptedStatus::new(vec![json!({"status": "completed"})]);
        let clock = FakeClock::new();

        let err =
            wait_for_video_url(&service, &clock, "gen-4", Duration::from_secs(900)).unwrap_err();

        assert!(matches!(err, AnchorcastError::MalformedResponse { .. }));
        assert_eq!(service.polls(), 1);
    }

    #[test]
    fn test_terminal_state_is_sticky() {
        let state = JobState::Succeeded {
            url: "https://x".into(),
        };
        let next = state
            .clone()
            .advance("j", json!({"status": "failed"}), Duration::ZERO, Duration::ZERO)
            .unwrap();
        assert_eq!(next, state);
    }
}
