//! Polled stream over a task's append-only log.
//!
//! The server only exposes task output as numbered log lines fetched by
//! offset, so a background loop polls: refresh the handle, page in any
//! new lines, push them over a channel, sleep. The stream closes when
//! the task leaves the running state; that closure is the consumer's
//! sole termination signal.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::sleep;

use crate::error::PmxError;

use super::{LogLine, TaskApi, TaskHandle};

/// Bootstrap gives the remote log this many chances to produce a line.
pub const BOOTSTRAP_ATTEMPTS: u32 = 3;
const BOOTSTRAP_DELAY: Duration = Duration::from_secs(1);

/// Upper bound on lines fetched per poll.
pub const PAGE_SIZE: u64 = 50;

const CHANNEL_DEPTH: usize = 64;

/// Receiving half of an open log stream.
///
/// Lines arrive in server order, without duplicates or gaps. When
/// `next_line` returns `None` the poll loop has finished; call
/// [`LogStream::into_handle`] to learn how.
#[derive(Debug)]
pub struct LogStream {
    rx: mpsc::Receiver<LogLine>,
    poll_task: JoinHandle<Result<TaskHandle, PmxError>>,
}

impl LogStream {
    pub async fn next_line(&mut self) -> Option<LogLine> {
        self.rx.recv().await
    }

    /// Wait for the poll loop and return the final handle state, or the
    /// transport failure that closed the stream early.
    pub async fn into_handle(self) -> Result<TaskHandle, PmxError> {
        drop(self.rx);
        match self.poll_task.await {
            Ok(result) => result,
            Err(e) => Err(PmxError::observation(PmxError::Validation {
                message: format!("log poll task died: {e}"),
            })),
        }
    }

    /// Tear the poll loop down without waiting. Used when the watchdog
    /// fires and the final handle state no longer matters.
    pub fn abort(self) {
        self.poll_task.abort();
    }
}

/// Open a log stream for `handle`, starting at offset 0.
///
/// Fails with `NoLogAvailable` when the remote log is still empty after
/// [`BOOTSTRAP_ATTEMPTS`] fetches — without at least one line there is
/// nothing for downstream change detection to key on.
pub async fn open<A: TaskApi + 'static>(
    api: Arc<A>,
    handle: TaskHandle,
    poll_interval: Duration,
) -> Result<LogStream, PmxError> {
    let mut first = Vec::new();
    for attempt in 1..=BOOTSTRAP_ATTEMPTS {
        first = api
            .fetch_log(&handle, 0, PAGE_SIZE)
            .await
            .map_err(PmxError::observation)?;
        if !first.is_empty() {
            break;
        }
        if attempt < BOOTSTRAP_ATTEMPTS {
            sleep(BOOTSTRAP_DELAY).await;
        }
    }
    if first.is_empty() {
        return Err(PmxError::NoLogAvailable {
            attempts: BOOTSTRAP_ATTEMPTS,
        });
    }

    let (tx, rx) = mpsc::channel(CHANNEL_DEPTH);
    let poll_task = tokio::spawn(poll_loop(api, handle, first, poll_interval, tx));
    Ok(LogStream { rx, poll_task })
}

async fn poll_loop<A: TaskApi>(
    api: Arc<A>,
    mut handle: TaskHandle,
    bootstrap: Vec<LogLine>,
    poll_interval: Duration,
    tx: mpsc::Sender<LogLine>,
) -> Result<TaskHandle, PmxError> {
    // Offset advances by exactly the number of lines emitted, so each
    // fetch resumes where the previous one ended.
    let mut offset = bootstrap.len() as u64;
    if !forward(&tx, bootstrap).await {
        return Ok(handle);
    }

    loop {
        api.refresh(&mut handle).await.map_err(PmxError::observation)?;

        let mut page = api
            .fetch_log(&handle, offset, PAGE_SIZE)
            .await
            .map_err(PmxError::observation)?;
        offset += page.len() as u64;
        let mut page_len = page.len() as u64;
        if !forward(&tx, page).await {
            return Ok(handle);
        }

        if handle.is_running() {
            sleep(poll_interval).await;
            continue;
        }

        // The task stopped; a full page means there may be more behind it.
        while page_len == PAGE_SIZE {
            page = api
                .fetch_log(&handle, offset, PAGE_SIZE)
                .await
                .map_err(PmxError::observation)?;
            offset += page.len() as u64;
            page_len = page.len() as u64;
            if !forward(&tx, page).await {
                return Ok(handle);
            }
        }
        return Ok(handle);
    }
}

/// Returns false when the consumer went away (watchdog teardown).
async fn forward(tx: &mpsc::Sender<LogLine>, lines: Vec<LogLine>) -> bool {
    for line in lines {
        if tx.send(line).await.is_err() {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::testing::{FakeApi, test_handle};

    #[tokio::test(start_paused = true)]
    async fn bootstrap_retries_until_a_line_appears() {
        let api = Arc::new(FakeApi::new(vec![vec![], vec![], vec!["starting"]], 0, "OK"));
        let mut stream = open(Arc::clone(&api), test_handle(), Duration::from_secs(1))
            .await
            .expect("stream opens on third attempt");

        assert_eq!(stream.next_line().await.unwrap().text, "starting");
        while stream.next_line().await.is_some() {}
        let handle = stream.into_handle().await.unwrap();
        assert!(handle.succeeded());
        assert_eq!(api.fetch_starts(), vec![0, 0, 0, 1]);
    }

    #[tokio::test(start_paused = true)]
    async fn bootstrap_exhaustion_fails_without_polling() {
        let api = Arc::new(FakeApi::new(vec![], usize::MAX, "OK"));
        let err = open(Arc::clone(&api), test_handle(), Duration::from_secs(1))
            .await
            .unwrap_err();

        assert!(matches!(err, PmxError::NoLogAvailable { attempts: 3 }));
        assert_eq!(api.fetch_count(), 3);
        assert_eq!(api.refresh_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn lines_arrive_in_order_with_exact_offsets() {
        let api = Arc::new(FakeApi::new(
            vec![
                vec!["one", "two"],
                vec!["three"],
                vec![],
                vec!["four"],
            ],
            3,
            "OK",
        ));
        let mut stream = open(Arc::clone(&api), test_handle(), Duration::from_secs(1))
            .await
            .unwrap();

        let mut seen = Vec::new();
        while let Some(line) = stream.next_line().await {
            seen.push(line.text);
        }
        assert_eq!(seen, vec!["one", "two", "three", "four"]);

        let handle = stream.into_handle().await.unwrap();
        assert!(handle.succeeded());
        // Bootstrap at 0, then each poll resumes exactly past what was emitted.
        assert_eq!(api.fetch_starts(), vec![0, 2, 3, 3, 4]);
    }

    #[tokio::test(start_paused = true)]
    async fn fetch_error_closes_the_stream() {
        let api = Arc::new(
            FakeApi::new(vec![vec!["one"], vec!["two"]], usize::MAX, "OK").fail_fetch_at(3),
        );
        let mut stream = open(Arc::clone(&api), test_handle(), Duration::from_secs(1))
            .await
            .unwrap();

        while stream.next_line().await.is_some() {}
        let err = stream.into_handle().await.unwrap_err();
        assert!(matches!(err, PmxError::Observation { .. }));
        assert_eq!(api.fetch_count(), 3);
    }
}
