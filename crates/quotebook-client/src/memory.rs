// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, bail};
use quotebook_app::{FilterBucket, Quote, QuoteFormInput};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use time::{Duration, OffsetDateTime, PrimitiveDateTime};

use crate::QuoteStore;

type Clock = Arc<dyn Fn() -> PrimitiveDateTime + Send + Sync>;

/// In-process stand-in for the quote store, used by `--demo`. Applies the
/// same bucket windows as the server and answers newest-first.
#[derive(Clone)]
pub struct MemoryStore {
    quotes: Arc<Mutex<Vec<Quote>>>,
    clock: Clock,
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("quotes", &self.lock().len())
            .finish_non_exhaustive()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::with_clock(local_now)
    }
}

impl MemoryStore {
    pub fn with_clock<F>(clock: F) -> Self
    where
        F: Fn() -> PrimitiveDateTime + Send + Sync + 'static,
    {
        Self {
            quotes: Arc::new(Mutex::new(Vec::new())),
            clock: Arc::new(clock),
        }
    }

    /// Stored oldest-first, the way the server appends.
    pub fn with_quotes(self, quotes: Vec<Quote>) -> Self {
        *self.lock() = quotes;
        self
    }

    pub fn seeded_demo() -> Self {
        let store = Self::default();
        let now = (store.clock)();
        let seed = [
            (800, "Rowan", "Measure twice, cut once."),
            (200, "Kai", "Ship it, then make it nice."),
            (20, "Avery", "The best time to start was yesterday."),
            (2, "Jordan", "Naming things is the hard part."),
        ]
        .into_iter()
        .map(|(days_ago, name, message)| Quote {
            name: name.to_owned(),
            message: message.to_owned(),
            time: now - Duration::days(days_ago),
        })
        .collect();
        store.with_quotes(seed)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Quote>> {
        self.quotes.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl QuoteStore for MemoryStore {
    fn list_quotes(&self, bucket: FilterBucket) -> Result<Vec<Quote>> {
        let now = (self.clock)();
        Ok(self
            .lock()
            .iter()
            .rev()
            .filter(|quote| bucket.admits(quote, now))
            .cloned()
            .collect())
    }

    fn create_quote(&self, input: &QuoteFormInput) -> Result<Quote> {
        if input.name.is_empty() || input.message.is_empty() {
            bail!("name and message are both required");
        }
        let now = (self.clock)();
        let quote = Quote {
            name: input.name.clone(),
            message: input.message.clone(),
            time: now.replace_nanosecond(0).unwrap_or(now),
        };
        self.lock().push(quote.clone());
        Ok(quote)
    }
}

fn local_now() -> PrimitiveDateTime {
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    PrimitiveDateTime::new(now.date(), now.time())
}

#[cfg(test)]
mod tests {
    use super::MemoryStore;
    use crate::QuoteStore;
    use anyhow::Result;
    use quotebook_app::{FilterBucket, QuoteFormInput};
    use quotebook_testkit::{quote, ts};

    fn fixed_store() -> MemoryStore {
        MemoryStore::with_clock(|| ts("2026-03-01T12:00:00")).with_quotes(vec![
            quote("Old", "ancient", "2020-01-01T00:00:00"),
            quote("Spring", "last spring", "2025-06-01T00:00:00"),
            quote("Feb", "a few weeks", "2026-02-10T00:00:00"),
            quote("Recent", "this week", "2026-02-27T08:00:00"),
        ])
    }

    fn names(quotes: &[quotebook_app::Quote]) -> Vec<&str> {
        quotes.iter().map(|quote| quote.name.as_str()).collect()
    }

    #[test]
    fn list_is_newest_first_and_bucketed() -> Result<()> {
        let store = fixed_store();
        assert_eq!(
            names(&store.list_quotes(FilterBucket::All)?),
            vec!["Recent", "Feb", "Spring", "Old"]
        );
        assert_eq!(
            names(&store.list_quotes(FilterBucket::Year)?),
            vec!["Recent", "Feb", "Spring"]
        );
        assert_eq!(
            names(&store.list_quotes(FilterBucket::Month)?),
            vec!["Recent", "Feb"]
        );
        assert_eq!(names(&store.list_quotes(FilterBucket::Week)?), vec!["Recent"]);
        Ok(())
    }

    #[test]
    fn create_stamps_clock_time_and_lists_first() -> Result<()> {
        let store = fixed_store();
        let created = store.create_quote(&QuoteFormInput::new("Alice", "hello"))?;
        assert_eq!(created.time, ts("2026-03-01T12:00:00"));
        assert_eq!(store.len(), 5);
        assert_eq!(store.list_quotes(FilterBucket::Week)?[0], created);
        Ok(())
    }

    #[test]
    fn create_requires_both_fields() {
        let store = fixed_store();
        let error = store
            .create_quote(&QuoteFormInput::new("", "hello"))
            .expect_err("empty name should fail");
        assert!(error.to_string().contains("required"));
        assert_eq!(store.len(), 4);
    }

    #[test]
    fn seeded_demo_spans_every_bucket() -> Result<()> {
        let store = MemoryStore::seeded_demo();
        assert_eq!(store.list_quotes(FilterBucket::All)?.len(), 4);
        assert_eq!(store.list_quotes(FilterBucket::Year)?.len(), 3);
        assert_eq!(store.list_quotes(FilterBucket::Month)?.len(), 2);
        assert_eq!(store.list_quotes(FilterBucket::Week)?.len(), 1);
        Ok(())
    }

    #[test]
    fn clones_share_the_same_quotes() -> Result<()> {
        let store = fixed_store();
        let clone = store.clone();
        clone.create_quote(&QuoteFormInput::new("Alice", "hello"))?;
        assert_eq!(store.len(), 5);
        Ok(())
    }

    #[test]
    fn default_clock_stamps_wall_clock_time_within_a_day() -> Result<()> {
        let store = MemoryStore::default();
        let created = store.create_quote(&QuoteFormInput::new("Now", "stamped"))?;
        let utc = time::OffsetDateTime::now_utc();
        let utc = time::PrimitiveDateTime::new(utc.date(), utc.time());
        assert!((created.time - utc).abs() < time::Duration::days(1));
        assert_eq!(created.time.nanosecond(), 0);
        assert_eq!(store.list_quotes(FilterBucket::Week)?.len(), 1);
        Ok(())
    }
}
