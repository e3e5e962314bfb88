//! Scripted in-memory transport for tests
//!
//! Replies are matched against the request body by substring, in the order
//! they were pushed. A reply may be limited to a number of uses, bound to one
//! endpoint, or delayed (the delay runs on the tokio clock, so paused-time
//! tests stay fast). Every call is recorded with start and finish instants.

use crate::{Endpoint, Transport, TransportError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// A scripted answer
#[derive(Debug, Clone)]
pub struct Reply {
    matcher: String,
    endpoint: Option<Endpoint>,
    outcome: Result<Vec<u8>, TransportError>,
    remaining: Option<usize>,
    delay: Duration,
}

impl Reply {
    /// Answer requests containing `matcher` with `body`
    pub fn body(matcher: &str, body: &str) -> Self {
        Self::bytes(matcher, body.as_bytes().to_vec())
    }

    /// Answer requests containing `matcher` with raw bytes
    pub fn bytes(matcher: &str, body: Vec<u8>) -> Self {
        Self {
            matcher: matcher.to_string(),
            endpoint: None,
            outcome: Ok(body),
            remaining: None,
            delay: Duration::ZERO,
        }
    }

    /// Fail requests containing `matcher`
    pub fn error(matcher: &str, error: TransportError) -> Self {
        Self {
            outcome: Err(error),
            ..Self::bytes(matcher, Vec::new())
        }
    }

    pub fn once(self) -> Self {
        self.times(1)
    }

    pub fn times(mut self, uses: usize) -> Self {
        self.remaining = Some(uses);
        self
    }

    /// Only match requests sent to `endpoint`
    pub fn on(mut self, endpoint: Endpoint) -> Self {
        self.endpoint = Some(endpoint);
        self
    }

    /// Hold the call open for `delay` before answering
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn matches(&self, endpoint: &Endpoint, request: &str) -> bool {
        self.remaining != Some(0)
            && self.endpoint.map_or(true, |e| e == *endpoint)
            && request.contains(&self.matcher)
    }
}

/// One recorded invocation
#[derive(Debug, Clone)]
pub struct Call {
    pub endpoint: Endpoint,
    pub request: String,
    pub started: Instant,
    pub finished: Option<Instant>,
}

#[derive(Default)]
struct MockState {
    replies: Vec<Reply>,
    calls: Vec<Call>,
    in_flight: HashMap<Endpoint, usize>,
    peak_in_flight: HashMap<Endpoint, usize>,
}

/// Transport answering from a script instead of the network
///
/// Requests with no matching reply fail as [`TransportError::Unreachable`],
/// which is what an absent player looks like.
#[derive(Default)]
pub struct MockTransport {
    state: Mutex<MockState>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a reply to the script
    pub fn push(&self, reply: Reply) -> &Self {
        self.lock().replies.push(reply);
        self
    }

    /// Drop every scripted reply (recorded calls are kept)
    pub fn clear_replies(&self) {
        self.lock().replies.clear();
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    /// Number of recorded requests containing `needle`
    pub fn count(&self, needle: &str) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.request.contains(needle))
            .count()
    }

    /// Number of recorded requests sent to `endpoint`
    pub fn count_for(&self, endpoint: &Endpoint) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.endpoint == *endpoint)
            .count()
    }

    /// Highest number of simultaneous calls ever observed against `endpoint`
    pub fn peak_in_flight(&self, endpoint: &Endpoint) -> usize {
        self.lock()
            .peak_in_flight
            .get(endpoint)
            .copied()
            .unwrap_or(0)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        // A panicking test thread must not hide the script from the others
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn begin(
        &self,
        endpoint: &Endpoint,
        request: &str,
    ) -> (usize, Duration, Result<Vec<u8>, TransportError>) {
        let mut state = self.lock();

        let scripted = state
            .replies
            .iter_mut()
            .find(|r| r.matches(endpoint, request))
            .map(|reply| {
                if let Some(remaining) = reply.remaining.as_mut() {
                    *remaining -= 1;
                }
                (reply.delay, reply.outcome.clone())
            });
        let (delay, outcome) = scripted.unwrap_or_else(|| {
            (
                Duration::ZERO,
                Err(TransportError::Unreachable(format!(
                    "no scripted reply for {:?}",
                    request
                ))),
            )
        });

        let in_flight = state.in_flight.entry(*endpoint).or_insert(0);
        *in_flight += 1;
        let current = *in_flight;
        let peak = state.peak_in_flight.entry(*endpoint).or_insert(0);
        *peak = (*peak).max(current);

        state.calls.push(Call {
            endpoint: *endpoint,
            request: request.to_string(),
            started: Instant::now(),
            finished: None,
        });
        (state.calls.len() - 1, delay, outcome)
    }

    fn finish(&self, index: usize, endpoint: &Endpoint) {
        let mut state = self.lock();
        if let Some(in_flight) = state.in_flight.get_mut(endpoint) {
            *in_flight = in_flight.saturating_sub(1);
        }
        if let Some(call) = state.calls.get_mut(index) {
            call.finished = Some(Instant::now());
        }
    }
}

/// Marks a recorded call finished when dropped, including when the caller
/// abandons the future mid-delay
struct InFlight<'a> {
    mock: &'a MockTransport,
    index: usize,
    endpoint: Endpoint,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.mock.finish(self.index, &self.endpoint);
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn invoke(
        &self,
        endpoint: &Endpoint,
        request: &str,
        timeout: Duration,
    ) -> Result<Vec<u8>, TransportError> {
        let (index, delay, outcome) = self.begin(endpoint, request);
        let _in_flight = InFlight {
            mock: self,
            index,
            endpoint: *endpoint,
        };

        if delay > timeout {
            tokio::time::sleep(timeout).await;
            return Err(TransportError::Timeout(timeout));
        }
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        outcome
    }
}
