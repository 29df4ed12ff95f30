// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::time::{Duration, Instant};

use crate::{
    FetchToken, FilterBucket, FormField, Notification, NotificationKind, NotificationToken,
    Notifier, Quote, QuoteFormInput, SubmissionToken, ValidationError,
};

/// Result of a list request, tagged with the token it was issued under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutcome {
    pub token: FetchToken,
    pub bucket: FilterBucket,
    pub result: Result<Vec<Quote>, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitOutcome {
    pub token: SubmissionToken,
    pub result: Result<Quote, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    /// Re-issue the list request for the active bucket.
    Refresh,
    SelectFilter(FilterBucket),
    EditField { field: FormField, value: String },
    Submit,
    FetchResolved(FetchOutcome),
    SubmitResolved(SubmitOutcome),
    Notify {
        message: String,
        kind: NotificationKind,
    },
    DismissNotification(NotificationToken),
    ClearNotification,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    FilterChanged(FilterBucket),
    FetchRequested {
        token: FetchToken,
        bucket: FilterBucket,
    },
    QuotesReplaced {
        bucket: FilterBucket,
        count: usize,
    },
    FetchDiscarded {
        token: FetchToken,
    },
    FieldEdited(FormField),
    ValidationFailed(ValidationError),
    SubmitRequested {
        token: SubmissionToken,
        input: QuoteFormInput,
    },
    QuotePrepended(Quote),
    FormCleared,
    NotificationShown {
        token: NotificationToken,
        kind: NotificationKind,
    },
    NotificationCleared,
}

/// Composition root for the client: the active bucket, the quote list,
/// the submission form and the notification slot. Every mutation goes
/// through `dispatch`, which reports what changed as events so the
/// caller can start I/O or timers in response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppState {
    filter: FilterBucket,
    quotes: Vec<Quote>,
    form: QuoteFormInput,
    form_error: Option<ValidationError>,
    notifier: Notifier,
    last_fetch: FetchToken,
    fetch_in_flight: bool,
    last_submission: SubmissionToken,
    pending_submissions: usize,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(FilterBucket::All, crate::DEFAULT_NOTIFICATION_DURATION)
    }
}

impl AppState {
    pub fn new(filter: FilterBucket, notification_duration: Duration) -> Self {
        Self {
            filter,
            quotes: Vec::new(),
            form: QuoteFormInput::default(),
            form_error: None,
            notifier: Notifier::new(notification_duration),
            last_fetch: FetchToken::default(),
            fetch_in_flight: false,
            last_submission: SubmissionToken::default(),
            pending_submissions: 0,
        }
    }

    pub fn filter(&self) -> FilterBucket {
        self.filter
    }

    pub fn quotes(&self) -> &[Quote] {
        &self.quotes
    }

    pub fn form(&self) -> &QuoteFormInput {
        &self.form
    }

    pub fn form_error(&self) -> Option<ValidationError> {
        self.form_error
    }

    pub fn notification(&self) -> Option<&Notification> {
        self.notifier.current()
    }

    pub fn notification_duration(&self) -> Duration {
        self.notifier.duration()
    }

    pub fn is_loading(&self) -> bool {
        self.fetch_in_flight
    }

    pub fn pending_submissions(&self) -> usize {
        self.pending_submissions
    }

    pub fn dispatch(&mut self, command: AppCommand) -> Vec<AppEvent> {
        self.dispatch_at(command, Instant::now())
    }

    pub fn dispatch_at(&mut self, command: AppCommand, now: Instant) -> Vec<AppEvent> {
        match command {
            AppCommand::Refresh => vec![self.issue_fetch()],
            AppCommand::SelectFilter(bucket) => self.select_filter(bucket),
            AppCommand::EditField { field, value } => {
                *self.form.field_mut(field) = value;
                if self.form_error.is_some_and(|error| error.field() == field) {
                    self.form_error = None;
                }
                vec![AppEvent::FieldEdited(field)]
            }
            AppCommand::Submit => self.begin_submit(),
            AppCommand::FetchResolved(outcome) => self.apply_fetch(outcome, now),
            AppCommand::SubmitResolved(outcome) => self.apply_submit(outcome, now),
            AppCommand::Notify { message, kind } => vec![self.notify(message, kind, now)],
            AppCommand::DismissNotification(token) => {
                if self.notifier.dismiss(token) {
                    vec![AppEvent::NotificationCleared]
                } else {
                    Vec::new()
                }
            }
            AppCommand::ClearNotification => {
                if self.notifier.clear() {
                    vec![AppEvent::NotificationCleared]
                } else {
                    Vec::new()
                }
            }
        }
    }

    fn select_filter(&mut self, bucket: FilterBucket) -> Vec<AppEvent> {
        if bucket == self.filter {
            tracing::trace!(%bucket, "filter unchanged; no fetch issued");
            return Vec::new();
        }
        self.filter = bucket;
        vec![AppEvent::FilterChanged(bucket), self.issue_fetch()]
    }

    fn issue_fetch(&mut self) -> AppEvent {
        self.last_fetch = self.last_fetch.next();
        self.fetch_in_flight = true;
        tracing::debug!(token = %self.last_fetch, bucket = %self.filter, "fetch issued");
        AppEvent::FetchRequested {
            token: self.last_fetch,
            bucket: self.filter,
        }
    }

    fn apply_fetch(&mut self, outcome: FetchOutcome, now: Instant) -> Vec<AppEvent> {
        if outcome.token != self.last_fetch || !self.fetch_in_flight {
            tracing::debug!(
                token = %outcome.token,
                latest = %self.last_fetch,
                bucket = %outcome.bucket,
                "stale fetch result discarded"
            );
            return vec![AppEvent::FetchDiscarded {
                token: outcome.token,
            }];
        }

        self.fetch_in_flight = false;
        match outcome.result {
            Ok(quotes) => {
                let count = quotes.len();
                self.quotes = quotes;
                tracing::debug!(token = %outcome.token, bucket = %outcome.bucket, count, "quotes replaced");
                vec![AppEvent::QuotesReplaced {
                    bucket: outcome.bucket,
                    count,
                }]
            }
            Err(error) => {
                tracing::warn!(token = %outcome.token, bucket = %outcome.bucket, %error, "fetch failed");
                vec![self.notify(
                    format!("load quotes failed: {error}; press ctrl-r to retry"),
                    NotificationKind::Error,
                    now,
                )]
            }
        }
    }

    fn begin_submit(&mut self) -> Vec<AppEvent> {
        if let Err(error) = self.form.validate() {
            tracing::debug!(%error, "submission blocked by validation");
            self.form_error = Some(error);
            return vec![AppEvent::ValidationFailed(error)];
        }

        self.form_error = None;
        self.last_submission = self.last_submission.next();
        self.pending_submissions += 1;
        tracing::debug!(token = %self.last_submission, "submission sent");
        vec![AppEvent::SubmitRequested {
            token: self.last_submission,
            input: self.form.clone(),
        }]
    }

    fn apply_submit(&mut self, outcome: SubmitOutcome, now: Instant) -> Vec<AppEvent> {
        self.pending_submissions = self.pending_submissions.saturating_sub(1);
        match outcome.result {
            Ok(quote) => {
                tracing::info!(token = %outcome.token, name = %quote.name, "quote submitted");
                let message = format!("quote from {} added", quote.name);
                self.quotes.insert(0, quote.clone());
                self.form.clear();
                self.form_error = None;
                vec![
                    AppEvent::QuotePrepended(quote),
                    AppEvent::FormCleared,
                    self.notify(message, NotificationKind::Success, now),
                ]
            }
            Err(error) => {
                tracing::warn!(token = %outcome.token, %error, "submission failed");
                vec![self.notify(
                    format!("submit failed: {error}"),
                    NotificationKind::Error,
                    now,
                )]
            }
        }
    }

    fn notify(&mut self, message: String, kind: NotificationKind, now: Instant) -> AppEvent {
        let token = self.notifier.show(message, kind, now);
        AppEvent::NotificationShown { token, kind }
    }
}
