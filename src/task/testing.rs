//! Scripted fakes for exercising the observation engine without a server.

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::error::PmxError;

use super::{LogLine, ProgressSink, TaskApi, TaskHandle, TaskStatus};

pub fn test_handle() -> TaskHandle {
    TaskHandle::new(
        "UPID:pve1:0003C4D1:0A7D41F2:65B2E1A0:qmclone:100:root@pam:"
            .parse()
            .expect("well-formed test upid"),
    )
}

struct FakeState {
    pages: VecDeque<Vec<LogLine>>,
    running_refreshes: usize,
    exit_status: String,
    fail_fetch_at: Option<usize>,
    fetch_calls: Vec<(u64, u64)>,
    refresh_calls: usize,
    cancel_calls: usize,
}

/// A `TaskApi` that replays scripted log pages and flips the handle to
/// stopped after a fixed number of refreshes, recording every call.
pub struct FakeApi {
    state: Mutex<FakeState>,
}

impl FakeApi {
    /// `pages` are returned by successive `fetch_log` calls (bootstrap
    /// included); once exhausted, fetches return empty. The handle keeps
    /// reporting running for `running_refreshes` refreshes, then stops
    /// with `exit_status`.
    pub fn new(pages: Vec<Vec<&str>>, running_refreshes: usize, exit_status: &str) -> Self {
        let mut n = 0u64;
        let pages = pages
            .into_iter()
            .map(|page| {
                page.into_iter()
                    .map(|text| {
                        n += 1;
                        LogLine {
                            n,
                            text: text.to_string(),
                        }
                    })
                    .collect()
            })
            .collect();
        FakeApi {
            state: Mutex::new(FakeState {
                pages,
                running_refreshes,
                exit_status: exit_status.to_string(),
                fail_fetch_at: None,
                fetch_calls: Vec::new(),
                refresh_calls: 0,
                cancel_calls: 0,
            }),
        }
    }

    /// Make the n-th `fetch_log` call (1-based) fail.
    pub fn fail_fetch_at(self, call: usize) -> Self {
        self.state.lock().unwrap().fail_fetch_at = Some(call);
        self
    }

    pub fn fetch_count(&self) -> usize {
        self.state.lock().unwrap().fetch_calls.len()
    }

    pub fn fetch_starts(&self) -> Vec<u64> {
        self.state
            .lock()
            .unwrap()
            .fetch_calls
            .iter()
            .map(|(start, _)| *start)
            .collect()
    }

    pub fn refresh_count(&self) -> usize {
        self.state.lock().unwrap().refresh_calls
    }

    pub fn cancel_count(&self) -> usize {
        self.state.lock().unwrap().cancel_calls
    }
}

impl TaskApi for FakeApi {
    async fn refresh(&self, handle: &mut TaskHandle) -> Result<(), PmxError> {
        let mut state = self.state.lock().unwrap();
        state.refresh_calls += 1;
        if state.running_refreshes == 0 {
            handle.status = TaskStatus::Stopped;
            handle.exit_status = Some(state.exit_status.clone());
        } else {
            state.running_refreshes -= 1;
        }
        Ok(())
    }

    async fn fetch_log(
        &self,
        _handle: &TaskHandle,
        start: u64,
        limit: u64,
    ) -> Result<Vec<LogLine>, PmxError> {
        let mut state = self.state.lock().unwrap();
        state.fetch_calls.push((start, limit));
        if state.fail_fetch_at == Some(state.fetch_calls.len()) {
            return Err(PmxError::Api {
                status: 500,
                path: "/nodes/pve1/tasks/test/log".into(),
                message: "connection reset".into(),
            });
        }
        Ok(state.pages.pop_front().unwrap_or_default())
    }

    async fn request_cancel(&self, _handle: &TaskHandle) -> Result<(), PmxError> {
        self.state.lock().unwrap().cancel_calls += 1;
        Ok(())
    }
}

/// A sink that records calls instead of drawing anything.
#[derive(Default)]
pub struct RecordingSink {
    pub updates: Vec<String>,
    pub finishes: usize,
}

impl ProgressSink for RecordingSink {
    fn update(&mut self, line: &str) {
        self.updates.push(line.to_string());
    }

    fn finish(&mut self) {
        self.finishes += 1;
    }
}
