//! Bounded-concurrency invocation of client compatibility requests.
//!
//! The producer reads requests off the input stream and hands each to a
//! worker task once the admission gate grants a permit. Workers make one
//! outbound call through a [`Caller`] and write the result to the shared
//! output sink in completion order. Call failures become per-case error
//! results; only failures of the plumbing itself end the run.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use crosscheck_model::{
    CONFORMANCE_SERVICE_NAME, ClientCompatRequest, ClientCompatResponse, ClientResponseResult,
};
use tokio::io::{AsyncBufRead, AsyncWrite};
use tokio::sync::{Mutex as AsyncMutex, OwnedSemaphorePermit, Semaphore, watch};
use tokio::task::JoinSet;

use crate::codec::{RecordDecoder, RecordEncoder};
use crate::config::InvokerConfig;
use crate::error::{InvocationError, InvokeError};
use crate::structured_log::{LogEntry, LogLevel, Outcome, SharedLog};

/// Performs one outbound RPC for a request.
pub trait Caller: Send + Sync + 'static {
    fn call(
        &self,
        request: &ClientCompatRequest,
        connect_timeout: Duration,
    ) -> impl Future<Output = Result<ClientResponseResult, InvocationError>> + Send;
}

/// Cooperative cancellation shared by the producer and its workers.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for CancelSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelSignal {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once [`CancelSignal::cancel`] has been called.
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives as long as `self`, so this only returns on cancel.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

/// Counters of a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InvokeSummary {
    pub dispatched: usize,
    pub case_errors: usize,
}

type Sink<W> = Arc<AsyncMutex<RecordEncoder<W>>>;
type Sticky = Arc<OnceLock<InvokeError>>;

/// Drives requests from a reader through a [`Caller`] into a writer.
pub struct Invoker {
    config: InvokerConfig,
    log: Option<SharedLog>,
}

impl Invoker {
    pub fn new(config: InvokerConfig) -> Result<Self, InvokeError> {
        config.validate()?;
        Ok(Self { config, log: None })
    }

    #[must_use]
    pub fn with_log(mut self, log: SharedLog) -> Self {
        self.log = Some(log);
        self
    }

    #[must_use]
    pub const fn config(&self) -> &InvokerConfig {
        &self.config
    }

    /// Process every request on `reader`, writing one response per dispatched
    /// request to `writer`.
    ///
    /// Returns the first plumbing failure, if any; all dispatched workers
    /// have finished by the time this returns.
    pub async fn run<R, W, C>(
        &self,
        reader: R,
        writer: W,
        caller: Arc<C>,
        cancel: &CancelSignal,
    ) -> Result<InvokeSummary, InvokeError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
        C: Caller,
    {
        let started = Instant::now();
        let mut decoder = RecordDecoder::new(reader, self.config.codec);
        let sink: Sink<W> = Arc::new(AsyncMutex::new(RecordEncoder::new(
            writer,
            self.config.codec,
        )));
        let failure: Sticky = Arc::new(OnceLock::new());
        let gate = Arc::new(Semaphore::new(self.config.parallelism));
        let case_errors = Arc::new(AtomicUsize::new(0));
        let mut workers = JoinSet::new();
        let mut dispatched = 0;

        self.log_event(LogLevel::Info, "invoke_start", |entry| {
            entry.with_details(serde_json::json!({
                "parallelism": self.config.parallelism,
                "codec": self.config.codec,
            }))
        });

        loop {
            let request: ClientCompatRequest = match decoder.decode_next().await {
                Ok(Some(request)) => request,
                Ok(None) => break,
                Err(err) => {
                    record_failure(&failure, err);
                    break;
                }
            };
            let permit = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    record_failure(&failure, InvokeError::Canceled);
                    break;
                }
                permit = Arc::clone(&gate).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => {
                        record_failure(&failure, InvokeError::GateClosed);
                        break;
                    }
                },
            };
            if failure.get().is_some() {
                break;
            }
            dispatched += 1;
            workers.spawn(run_worker(Worker {
                request,
                caller: Arc::clone(&caller),
                sink: Arc::clone(&sink),
                failure: Arc::clone(&failure),
                cancel: cancel.clone(),
                connect_timeout: self.config.connect_timeout(),
                case_errors: Arc::clone(&case_errors),
                log: self.log.clone(),
                _permit: permit,
            }));
        }

        if let Some(err) = failure.get() {
            let message = err.to_string();
            self.log_event(LogLevel::Warn, "dispatch_stopped", |entry| {
                entry
                    .with_outcome(Outcome::Error)
                    .with_details(serde_json::json!({ "error": message }))
            });
        }

        while let Some(joined) = workers.join_next().await {
            if let Err(err) = joined {
                record_failure(&failure, InvokeError::Worker(err.to_string()));
            }
        }

        let summary = InvokeSummary {
            dispatched,
            case_errors: case_errors.load(Ordering::Relaxed),
        };
        let outcome = failure.get().cloned();
        self.log_event(LogLevel::Info, "invoke_end", |entry| {
            entry
                .with_outcome(if outcome.is_some() { Outcome::Fail } else { Outcome::Pass })
                .with_case_count(summary.dispatched)
                .with_duration_ms(started.elapsed().as_millis() as u64)
                .with_details(serde_json::json!({ "case_errors": summary.case_errors }))
        });
        match outcome {
            Some(err) => Err(err),
            None => Ok(summary),
        }
    }

    fn log_event(&self, level: LogLevel, event: &str, build: impl FnOnce(LogEntry) -> LogEntry) {
        if let Some(log) = &self.log {
            let mut emitter = log.lock();
            let entry = build(emitter.entry(level, event));
            let _ = emitter.emit_entry(entry);
        }
    }
}

/// First writer wins; later failures are dropped.
fn record_failure(failure: &OnceLock<InvokeError>, err: InvokeError) {
    let _ = failure.set(err);
}

struct Worker<C, W> {
    request: ClientCompatRequest,
    caller: Arc<C>,
    sink: Sink<W>,
    failure: Sticky,
    cancel: CancelSignal,
    connect_timeout: Duration,
    case_errors: Arc<AtomicUsize>,
    log: Option<SharedLog>,
    _permit: OwnedSemaphorePermit,
}

async fn run_worker<C, W>(worker: Worker<C, W>)
where
    C: Caller,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let started = Instant::now();
    let request = &worker.request;
    let result = invoke_one(
        request,
        worker.caller.as_ref(),
        &worker.cancel,
        worker.connect_timeout,
    )
    .await;
    let response = match result {
        Ok(result) => ClientCompatResponse::response(&request.test_name, result),
        Err(err) => {
            worker.case_errors.fetch_add(1, Ordering::Relaxed);
            ClientCompatResponse::error(&request.test_name, err.to_string())
        }
    };

    if let Some(log) = &worker.log {
        let mut emitter = log.lock();
        let entry = emitter
            .entry(
                if response.is_error() { LogLevel::Warn } else { LogLevel::Info },
                "case_completed",
            )
            .with_case(&request.test_name)
            .with_protocol(request.protocol.as_str())
            .with_outcome(if response.is_error() { Outcome::Error } else { Outcome::Pass })
            .with_latency_ns(started.elapsed().as_nanos() as u64);
        let _ = emitter.emit_entry(entry);
    }

    let mut encoder = worker.sink.lock().await;
    if let Err(err) = encoder.encode(&response).await {
        record_failure(&worker.failure, err);
    }
}

async fn invoke_one<C: Caller>(
    request: &ClientCompatRequest,
    caller: &C,
    cancel: &CancelSignal,
    connect_timeout: Duration,
) -> Result<ClientResponseResult, InvocationError> {
    if request.service_name() != CONFORMANCE_SERVICE_NAME {
        return Err(InvocationError::UnknownService {
            service: request.service_name().to_string(),
        });
    }
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(InvocationError::Canceled),
        result = caller.call(request, connect_timeout) => result,
    }
}
