use std::collections::BTreeSet;
use std::sync::Arc;

use anyhow::Result;
use chrono::NaiveDate;
use tracing::warn;

use crate::{
    store::event_log::{EventLogHandle, EventStorage},
    tracker::{events::EventEntity, reduce::reduce_sessions},
    utils::clock::{local_day, Clock},
};

use super::output::render::{render_sessions, render_status, saved_notice};

/// Command to process `start`. Opens a new session unless one is already
/// running.
pub async fn process_start(
    storage: &impl EventStorage,
    clock: &dyn Clock,
    goal_hours: f64,
) -> Result<()> {
    let day = local_day(clock);
    let mut events = storage.events_for(day).await?;
    let now = clock.time();

    let state = reduce_sessions(&events, now, true);
    if state.running {
        println!("Timer is already running, `end` it first.");
        return Ok(());
    }

    let event = EventEntity::Start { timestamp: now };
    append_optimistic(storage, day, &event).await;

    events.push(event);
    let state = reduce_sessions(&events, now, true);
    print!("{}", render_status(&state, goal_hours));
    print!("{}", render_sessions(&state.sessions));
    Ok(())
}

/// Command to process `end`. Closes the running session, recording the
/// session's checked tasks (plus any passed on the command line) and an
/// optional note on the `End` entry itself, which makes the entry the
/// authoritative record of the session.
pub async fn process_end(
    storage: &impl EventStorage,
    clock: &dyn Clock,
    goal_hours: f64,
    tasks: Vec<String>,
    note: Option<String>,
) -> Result<()> {
    let day = local_day(clock);
    let mut events = storage.events_for(day).await?;
    let now = clock.time();

    let state = reduce_sessions(&events, now, true);
    if !state.running {
        println!("No session is running.");
        return Ok(());
    }

    let mut checked = pending_checks(&events);
    checked.extend(tasks.into_iter().map(Arc::from));

    let event = EventEntity::End {
        timestamp: now,
        tasks: Some(checked),
        note: note.map(Arc::from),
    };
    append_optimistic(storage, day, &event).await;

    events.push(event);
    let state = reduce_sessions(&events, now, true);
    print!("{}", render_status(&state, goal_hours));
    print!("{}", render_sessions(&state.sessions));
    Ok(())
}

/// Command to process `check`. A task can only be checked while the timer is
/// running, and a task completed earlier today stays completed.
pub async fn process_check(
    storage: &impl EventStorage,
    clock: &dyn Clock,
    task: String,
) -> Result<()> {
    let day = local_day(clock);
    let events = storage.events_for(day).await?;
    let now = clock.time();

    let state = reduce_sessions(&events, now, true);
    if !state.running {
        println!("Tasks can only be checked while the timer is running.");
        return Ok(());
    }

    let task: Arc<str> = Arc::from(task);
    if state.completed_tasks.contains(&task) {
        println!("Task '{task}' is already done today.");
        return Ok(());
    }
    if pending_checks(&events).contains(&task) {
        println!("Task '{task}' is already checked for this session.");
        return Ok(());
    }

    let event = EventEntity::Check {
        timestamp: now,
        task: task.clone(),
    };
    append_optimistic(storage, day, &event).await;

    println!("Checked off '{task}'.");
    Ok(())
}

/// Command to process `status`. A one-shot render of today's state.
pub async fn process_status(
    storage: &impl EventStorage,
    clock: &dyn Clock,
    goal_hours: f64,
) -> Result<()> {
    let day = local_day(clock);
    let events = storage.events_for(day).await?;

    let state = reduce_sessions(&events, clock.time(), true);
    print!("{}", render_status(&state, goal_hours));
    print!("{}", render_sessions(&state.sessions));
    Ok(())
}

/// Tasks checked since the currently open session started. Only called when
/// the reduced state is running, so the last `Start` is the open one.
fn pending_checks(events: &[EventEntity]) -> BTreeSet<Arc<str>> {
    let Some(open) = events
        .iter()
        .rposition(|e| matches!(e, EventEntity::Start { .. }))
    else {
        return BTreeSet::new();
    };
    events[open..]
        .iter()
        .filter_map(|e| match e {
            EventEntity::Check { task, .. } => Some(task.clone()),
            _ => None,
        })
        .collect()
}

/// Appends one event to today's log. A failed save is reported as a warning
/// and the command goes on to render the state the event produced; the next
/// invocation replays the log from disk, so the divergence does not outlive
/// this process.
async fn append_optimistic(storage: &impl EventStorage, day: NaiveDate, event: &EventEntity) {
    match append(storage, day, event).await {
        Ok(()) => println!("{}", saved_notice()),
        Err(e) => {
            warn!("Failed to append {event:?}: {e:?}");
            eprintln!("Warning: could not save the entry: {e:#}");
        }
    }
}

async fn append(storage: &impl EventStorage, day: NaiveDate, event: &EventEntity) -> Result<()> {
    let mut log = storage.create_or_append_log(day).await?;
    log.append(event.clone()).await?;
    log.flush().await?;
    Ok(())
}
