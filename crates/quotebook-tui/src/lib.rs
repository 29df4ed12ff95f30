// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use quotebook_app::{
    AppCommand, AppEvent, AppState, FetchOutcome, FetchToken, FilterBucket, FormField,
    NotificationKind, NotificationToken, Quote, QuoteFormInput, SubmissionToken, SubmitOutcome,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Tabs};
use std::collections::VecDeque;
use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

const CURSOR: &str = "█";
const REQUIRED_MARK: &str = "← required";

/// Results of background work, delivered back to the event loop. Once the
/// loop exits the receiver is gone and late sends fail harmlessly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InternalEvent {
    DismissNotification { token: NotificationToken },
    Fetch(FetchOutcome),
    Submit(SubmitOutcome),
}

/// Seam between the UI loop and the quote store. The `spawn_*` defaults run
/// the request inline; real runtimes move it off the loop thread.
pub trait AppRuntime {
    fn fetch_quotes(&mut self, bucket: FilterBucket) -> Result<Vec<Quote>>;
    fn submit_quote(&mut self, input: &QuoteFormInput) -> Result<Quote>;
    fn spawn_fetch(
        &mut self,
        token: FetchToken,
        bucket: FilterBucket,
        tx: Sender<InternalEvent>,
    ) -> Result<()> {
        let result = self
            .fetch_quotes(bucket)
            .map_err(|error| format!("{error:#}"));
        tx.send(InternalEvent::Fetch(FetchOutcome {
            token,
            bucket,
            result,
        }))
        .map_err(|_| anyhow::anyhow!("quote event channel closed"))?;
        Ok(())
    }
    fn spawn_submit(
        &mut self,
        token: SubmissionToken,
        input: QuoteFormInput,
        tx: Sender<InternalEvent>,
    ) -> Result<()> {
        let result = self
            .submit_quote(&input)
            .map_err(|error| format!("{error:#}"));
        tx.send(InternalEvent::Submit(SubmitOutcome { token, result }))
            .map_err(|_| anyhow::anyhow!("quote event channel closed"))?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Focus {
    #[default]
    Name,
    Message,
    Filter,
    List,
}

impl Focus {
    const ORDER: [Self; 4] = [Self::Name, Self::Message, Self::Filter, Self::List];

    const fn field(self) -> Option<FormField> {
        match self {
            Self::Name => Some(FormField::Name),
            Self::Message => Some(FormField::Message),
            Self::Filter | Self::List => None,
        }
    }

    const fn from_field(field: FormField) -> Self {
        match field {
            FormField::Name => Self::Name,
            FormField::Message => Self::Message,
        }
    }

    fn rotate(self, delta: isize) -> Self {
        let order = Self::ORDER;
        let current = order.iter().position(|focus| *focus == self).unwrap_or(0) as isize;
        let next = (current + delta).rem_euclid(order.len() as isize) as usize;
        order[next]
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
struct ViewData {
    focus: Focus,
    selected_quote: usize,
}

pub fn run_app<R: AppRuntime>(state: &mut AppState, runtime: &mut R) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen).context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let mut view_data = ViewData::default();
    let (internal_tx, internal_rx) = mpsc::channel();

    let events = state.dispatch(AppCommand::Refresh);
    apply_events(state, runtime, &mut view_data, &internal_tx, events);

    let mut result = Ok(());
    loop {
        process_internal_events(state, runtime, &mut view_data, &internal_tx, &internal_rx);

        if let Err(error) = terminal.draw(|frame| render(frame, state, &view_data)) {
            result = Err(error).context("draw frame");
            break;
        }

        let has_event = match event::poll(Duration::from_millis(120)).context("poll event") {
            Ok(has_event) => has_event,
            Err(error) => {
                result = Err(error);
                break;
            }
        };
        if has_event {
            match event::read().context("read event") {
                Ok(Event::Key(key)) if key.kind != KeyEventKind::Release => {
                    if handle_key_event(state, runtime, &mut view_data, &internal_tx, key) {
                        break;
                    }
                }
                Ok(_) => {}
                Err(error) => {
                    result = Err(error);
                    break;
                }
            }
        }
    }

    disable_raw_mode().context("disable raw mode")?;
    execute!(io::stdout(), terminal::LeaveAlternateScreen).context("leave alternate screen")?;
    tracing::info!("event loop stopped; in-flight results will be dropped");
    result
}

fn process_internal_events<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    rx: &Receiver<InternalEvent>,
) {
    while let Ok(event) = rx.try_recv() {
        let command = match event {
            InternalEvent::DismissNotification { token } => AppCommand::DismissNotification(token),
            InternalEvent::Fetch(outcome) => AppCommand::FetchResolved(outcome),
            InternalEvent::Submit(outcome) => AppCommand::SubmitResolved(outcome),
        };
        let events = state.dispatch(command);
        apply_events(state, runtime, view_data, tx, events);
    }
}

/// Turns state events into side effects: requests, timers, and focus.
fn apply_events<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    events: Vec<AppEvent>,
) {
    let mut queue = VecDeque::from(events);
    while let Some(event) = queue.pop_front() {
        match event {
            AppEvent::FetchRequested { token, bucket } => {
                if let Err(error) = runtime.spawn_fetch(token, bucket, tx.clone()) {
                    queue.extend(state.dispatch(AppCommand::FetchResolved(FetchOutcome {
                        token,
                        bucket,
                        result: Err(format!("{error:#}")),
                    })));
                }
            }
            AppEvent::SubmitRequested { token, input } => {
                if let Err(error) = runtime.spawn_submit(token, input, tx.clone()) {
                    queue.extend(state.dispatch(AppCommand::SubmitResolved(SubmitOutcome {
                        token,
                        result: Err(format!("{error:#}")),
                    })));
                }
            }
            AppEvent::NotificationShown { token, .. } => {
                schedule_dismiss(tx, token, state.notification_duration());
            }
            AppEvent::QuotesReplaced { .. } => {
                view_data.selected_quote = 0;
            }
            AppEvent::QuotePrepended(_) => {
                view_data.selected_quote = 0;
            }
            AppEvent::FormCleared => {
                if view_data.focus == Focus::Message {
                    view_data.focus = Focus::Name;
                }
            }
            AppEvent::ValidationFailed(error) => {
                view_data.focus = Focus::from_field(error.field());
            }
            AppEvent::FilterChanged(_)
            | AppEvent::FetchDiscarded { .. }
            | AppEvent::FieldEdited(_)
            | AppEvent::NotificationCleared => {}
        }
    }
}

fn schedule_dismiss(internal_tx: &Sender<InternalEvent>, token: NotificationToken, after: Duration) {
    let sender = internal_tx.clone();
    thread::spawn(move || {
        thread::sleep(after);
        let _ = sender.send(InternalEvent::DismissNotification { token });
    });
}

fn dispatch_and_apply<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    command: AppCommand,
) {
    let events = state.dispatch(command);
    apply_events(state, runtime, view_data, tx, events);
}

fn handle_key_event<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Char('c') | KeyCode::Char('q') if ctrl => return true,
        KeyCode::Char('r') if ctrl => {
            dispatch_and_apply(state, runtime, view_data, internal_tx, AppCommand::Refresh);
            return false;
        }
        KeyCode::Esc => {
            dispatch_and_apply(
                state,
                runtime,
                view_data,
                internal_tx,
                AppCommand::ClearNotification,
            );
            return false;
        }
        KeyCode::Tab => {
            view_data.focus = view_data.focus.rotate(1);
            return false;
        }
        KeyCode::BackTab => {
            view_data.focus = view_data.focus.rotate(-1);
            return false;
        }
        _ => {}
    }

    match view_data.focus {
        Focus::Name | Focus::Message => {
            if let Some(field) = view_data.focus.field() {
                handle_field_key(state, runtime, view_data, internal_tx, field, key);
            }
        }
        Focus::Filter => handle_filter_key(state, runtime, view_data, internal_tx, key),
        Focus::List => handle_list_key(state, view_data, key),
    }
    false
}

fn handle_field_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    field: FormField,
    key: KeyEvent,
) {
    let current = state.form().field(field);
    let value = match key.code {
        KeyCode::Enter => {
            dispatch_and_apply(state, runtime, view_data, internal_tx, AppCommand::Submit);
            return;
        }
        KeyCode::Up => {
            view_data.focus = view_data.focus.rotate(-1);
            return;
        }
        KeyCode::Down => {
            view_data.focus = view_data.focus.rotate(1);
            return;
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => String::new(),
        KeyCode::Char(ch) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            let mut value = current.to_owned();
            value.push(ch);
            value
        }
        KeyCode::Backspace => {
            let mut value = current.to_owned();
            if value.pop().is_none() {
                return;
            }
            value
        }
        _ => return,
    };
    dispatch_and_apply(
        state,
        runtime,
        view_data,
        internal_tx,
        AppCommand::EditField { field, value },
    );
}

fn handle_filter_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    let buckets = FilterBucket::ALL;
    let current = buckets
        .iter()
        .position(|bucket| *bucket == state.filter())
        .unwrap_or(0);
    let target = match key.code {
        KeyCode::Left | KeyCode::Char('h') => current.saturating_sub(1),
        KeyCode::Right | KeyCode::Char('l') => (current + 1).min(buckets.len() - 1),
        KeyCode::Char(ch @ '1'..='4') => (ch as usize) - ('1' as usize),
        _ => return,
    };
    dispatch_and_apply(
        state,
        runtime,
        view_data,
        internal_tx,
        AppCommand::SelectFilter(buckets[target]),
    );
}

fn handle_list_key(state: &AppState, view_data: &mut ViewData, key: KeyEvent) {
    let last = state.quotes().len().saturating_sub(1);
    view_data.selected_quote = match key.code {
        KeyCode::Up | KeyCode::Char('k') => view_data.selected_quote.saturating_sub(1),
        KeyCode::Down | KeyCode::Char('j') => (view_data.selected_quote + 1).min(last),
        KeyCode::PageUp => view_data.selected_quote.saturating_sub(10),
        KeyCode::PageDown => (view_data.selected_quote + 10).min(last),
        KeyCode::Home | KeyCode::Char('g') => 0,
        KeyCode::End | KeyCode::Char('G') => last,
        _ => return,
    };
}

fn render(frame: &mut ratatui::Frame<'_>, state: &AppState, view_data: &ViewData) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),
            Constraint::Length(3),
            Constraint::Min(3),
            Constraint::Length(3),
        ])
        .split(frame.area());

    let form_style = if state.form_error().is_some() {
        Style::default().fg(Color::Red)
    } else {
        focus_style(matches!(view_data.focus, Focus::Name | Focus::Message))
    };
    let form = Paragraph::new(form_text(state, view_data)).block(
        Block::default()
            .title("submit a quote")
            .borders(Borders::ALL)
            .border_style(form_style),
    );
    frame.render_widget(form, layout[0]);

    let selected = FilterBucket::ALL
        .iter()
        .position(|bucket| *bucket == state.filter())
        .unwrap_or(0);
    let tabs = Tabs::new(filter_titles())
        .block(
            Block::default()
                .title("filter quotes")
                .borders(Borders::ALL)
                .border_style(focus_style(view_data.focus == Focus::Filter)),
        )
        .style(Style::default().fg(Color::DarkGray))
        .highlight_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .select(selected);
    frame.render_widget(tabs, layout[1]);

    let items = state
        .quotes()
        .iter()
        .map(|quote| {
            let [name, message, time] = quote_item_lines(quote);
            ListItem::new(Text::from(vec![
                Line::from(Span::styled(
                    name,
                    Style::default().add_modifier(Modifier::BOLD),
                )),
                Line::from(message),
                Line::from(Span::styled(
                    time,
                    Style::default().add_modifier(Modifier::ITALIC),
                )),
                Line::default(),
            ]))
        })
        .collect::<Vec<_>>();
    let list = List::new(items)
        .block(
            Block::default()
                .title(list_title(state))
                .borders(Borders::ALL)
                .border_style(focus_style(view_data.focus == Focus::List)),
        )
        .highlight_style(if view_data.focus == Focus::List {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default()
        });
    let mut list_state = ListState::default();
    if !state.quotes().is_empty() {
        list_state.select(Some(view_data.selected_quote.min(state.quotes().len() - 1)));
    }
    frame.render_stateful_widget(list, layout[2], &mut list_state);

    let status_color = match state.notification().map(|notification| notification.kind) {
        Some(NotificationKind::Success) => Color::Green,
        Some(NotificationKind::Error) => Color::Red,
        None => Color::Yellow,
    };
    let status = Paragraph::new(status_text(state))
        .style(Style::default().fg(status_color))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(status, layout[3]);
}

fn focus_style(focused: bool) -> Style {
    if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    }
}

fn form_text(state: &AppState, view_data: &ViewData) -> String {
    FormField::ALL
        .iter()
        .map(|field| {
            let mut line = format!("{:<6} {}", format!("{}:", field.label()), state.form().field(*field));
            if view_data.focus.field() == Some(*field) {
                line.push_str(CURSOR);
            }
            if state.form_error().is_some_and(|error| error.field() == *field) {
                line.push_str("  ");
                line.push_str(REQUIRED_MARK);
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn filter_titles() -> Vec<String> {
    FilterBucket::ALL
        .iter()
        .enumerate()
        .map(|(index, bucket)| format!("{} {}", index + 1, bucket.label()))
        .collect()
}

fn list_title(state: &AppState) -> String {
    if state.is_loading() {
        return format!("previous quotes · {} · loading…", state.filter().label());
    }
    format!(
        "previous quotes · {} · {}",
        state.filter().label(),
        state.quotes().len()
    )
}

fn quote_item_lines(quote: &Quote) -> [String; 3] {
    [
        quote.name.clone(),
        quote.message.clone(),
        quote.formatted_time(),
    ]
}

fn status_text(state: &AppState) -> String {
    let hints = "tab focus | enter submit | 1-4 filter | ctrl+r refresh | esc dismiss | ctrl+q quit";
    let sending = match state.pending_submissions() {
        0 => String::new(),
        count => format!("sending {count}… | "),
    };
    match state.notification() {
        Some(notification) => {
            let mark = match notification.kind {
                NotificationKind::Success => "✓",
                NotificationKind::Error => "✗",
            };
            format!("{sending}{mark} {}", notification.message)
        }
        None => format!("{sending}{hints}"),
    }
}
