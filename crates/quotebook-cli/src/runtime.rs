// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use quotebook_app::{
    FetchOutcome, FetchToken, FilterBucket, Quote, QuoteFormInput, SubmissionToken, SubmitOutcome,
};
use quotebook_client::QuoteStore;
use quotebook_tui::{AppRuntime, InternalEvent};
use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};

/// Runs store requests on worker threads so the event loop keeps drawing
/// while a request is in flight. Workers ignore send failures: once the
/// loop has exited its receiver is gone and late results are dropped.
pub struct StoreRuntime<S> {
    store: S,
}

impl<S> StoreRuntime<S>
where
    S: QuoteStore + Clone + Send + 'static,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    fn start_fetch(
        &self,
        token: FetchToken,
        bucket: FilterBucket,
        tx: Sender<InternalEvent>,
    ) -> Result<JoinHandle<()>> {
        let store = self.store.clone();
        thread::Builder::new()
            .name(format!("fetch-{token}"))
            .spawn(move || {
                let result = store
                    .list_quotes(bucket)
                    .map_err(|error| format!("{error:#}"));
                let _ = tx.send(InternalEvent::Fetch(FetchOutcome {
                    token,
                    bucket,
                    result,
                }));
            })
            .context("spawn fetch worker")
    }

    fn start_submit(
        &self,
        token: SubmissionToken,
        input: QuoteFormInput,
        tx: Sender<InternalEvent>,
    ) -> Result<JoinHandle<()>> {
        let store = self.store.clone();
        thread::Builder::new()
            .name(format!("submit-{token}"))
            .spawn(move || {
                let result = store
                    .create_quote(&input)
                    .map_err(|error| format!("{error:#}"));
                let _ = tx.send(InternalEvent::Submit(SubmitOutcome { token, result }));
            })
            .context("spawn submit worker")
    }
}

impl<S> AppRuntime for StoreRuntime<S>
where
    S: QuoteStore + Clone + Send + 'static,
{
    fn fetch_quotes(&mut self, bucket: FilterBucket) -> Result<Vec<Quote>> {
        self.store.list_quotes(bucket)
    }

    fn submit_quote(&mut self, input: &QuoteFormInput) -> Result<Quote> {
        self.store.create_quote(input)
    }

    fn spawn_fetch(
        &mut self,
        token: FetchToken,
        bucket: FilterBucket,
        tx: Sender<InternalEvent>,
    ) -> Result<()> {
        self.start_fetch(token, bucket, tx).map(drop)
    }

    fn spawn_submit(
        &mut self,
        token: SubmissionToken,
        input: QuoteFormInput,
        tx: Sender<InternalEvent>,
    ) -> Result<()> {
        self.start_submit(token, input, tx).map(drop)
    }
}

#[cfg(test)]
mod tests {
    use super::StoreRuntime;
    use anyhow::{Result, anyhow};
    use quotebook_app::{FetchToken, FilterBucket, Quote, QuoteFormInput, SubmissionToken};
    use quotebook_client::{MemoryStore, QuoteStore};
    use quotebook_testkit::{quote, ts};
    use quotebook_tui::{AppRuntime, InternalEvent};
    use std::sync::{Arc, Barrier, mpsc};
    use std::time::Duration;

    fn store() -> MemoryStore {
        MemoryStore::with_clock(|| ts("2026-03-01T12:00:00")).with_quotes(vec![
            quote("Old", "long ago", "2024-01-01T00:00:00"),
            quote("Bob", "hi", "2026-02-27T09:00:00"),
        ])
    }

    fn recv(rx: &mpsc::Receiver<InternalEvent>) -> Result<InternalEvent> {
        rx.recv_timeout(Duration::from_secs(5))
            .map_err(|error| anyhow!("worker did not report: {error}"))
    }

    #[test]
    fn spawned_fetch_reports_filtered_quotes_with_its_token() -> Result<()> {
        let mut runtime = StoreRuntime::new(store());
        let (tx, rx) = mpsc::channel();
        runtime.spawn_fetch(FetchToken::new(4), FilterBucket::Week, tx)?;

        let InternalEvent::Fetch(outcome) = recv(&rx)? else {
            panic!("expected fetch outcome");
        };
        assert_eq!(outcome.token, FetchToken::new(4));
        assert_eq!(outcome.bucket, FilterBucket::Week);
        let quotes = outcome.result.map_err(|error| anyhow!(error))?;
        assert_eq!(quotes.len(), 1);
        assert_eq!(quotes[0].name, "Bob");
        Ok(())
    }

    #[test]
    fn spawned_submit_stores_the_quote() -> Result<()> {
        let store = store();
        let mut runtime = StoreRuntime::new(store.clone());
        let (tx, rx) = mpsc::channel();
        runtime.spawn_submit(
            SubmissionToken::new(1),
            QuoteFormInput::new("Alice", "hello"),
            tx,
        )?;

        let InternalEvent::Submit(outcome) = recv(&rx)? else {
            panic!("expected submit outcome");
        };
        let created = outcome.result.map_err(|error| anyhow!(error))?;
        assert_eq!(created.name, "Alice");
        assert_eq!(created.time, ts("2026-03-01T12:00:00"));
        assert_eq!(store.len(), 3);
        Ok(())
    }

    #[test]
    fn store_rejection_is_reported_as_error_text() -> Result<()> {
        let mut runtime = StoreRuntime::new(store());
        let (tx, rx) = mpsc::channel();
        runtime.spawn_submit(SubmissionToken::new(2), QuoteFormInput::new("", "x"), tx)?;

        let InternalEvent::Submit(outcome) = recv(&rx)? else {
            panic!("expected submit outcome");
        };
        let error = outcome.result.expect_err("empty name should be rejected");
        assert!(error.contains("required"));
        Ok(())
    }

    /// Holds every store call until the test releases the gate.
    #[derive(Clone)]
    struct GatedStore {
        inner: MemoryStore,
        gate: Arc<Barrier>,
    }

    impl GatedStore {
        fn new(inner: MemoryStore) -> Self {
            Self {
                inner,
                gate: Arc::new(Barrier::new(2)),
            }
        }
    }

    impl QuoteStore for GatedStore {
        fn list_quotes(&self, bucket: FilterBucket) -> Result<Vec<Quote>> {
            self.gate.wait();
            self.inner.list_quotes(bucket)
        }

        fn create_quote(&self, input: &QuoteFormInput) -> Result<Quote> {
            self.gate.wait();
            self.inner.create_quote(input)
        }
    }

    #[test]
    fn fetch_worker_exits_cleanly_after_receiver_is_dropped() -> Result<()> {
        let store = GatedStore::new(store());
        let runtime = StoreRuntime::new(store.clone());
        let (tx, rx) = mpsc::channel();
        let worker = runtime.start_fetch(FetchToken::new(1), FilterBucket::All, tx)?;

        drop(rx);
        store.gate.wait();
        worker
            .join()
            .map_err(|_| anyhow!("fetch worker panicked after teardown"))?;
        Ok(())
    }

    #[test]
    fn submit_worker_exits_cleanly_after_receiver_is_dropped() -> Result<()> {
        let memory = store();
        let store = GatedStore::new(memory.clone());
        let runtime = StoreRuntime::new(store.clone());
        let (tx, rx) = mpsc::channel();
        let worker = runtime.start_submit(
            SubmissionToken::new(1),
            QuoteFormInput::new("Alice", "late"),
            tx,
        )?;

        drop(rx);
        store.gate.wait();
        worker
            .join()
            .map_err(|_| anyhow!("submit worker panicked after teardown"))?;
        assert_eq!(memory.len(), 3);
        Ok(())
    }
}
