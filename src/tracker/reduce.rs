use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use super::events::EventEntity;

/// A work session derived from the event log. Sessions are reconstructed on
/// every reduction and never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub number: u32,
    pub start: DateTime<Utc>,
    /// `None` while the session is still in progress.
    pub end: Option<DateTime<Utc>>,
    pub duration: Duration,
    pub active: bool,
}

/// The full derived state of a day. Always rebuilt from scratch so the
/// total, the session list and the running flag cannot drift apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyState {
    /// Sum of closed session durations. An active session does not count
    /// until it is ended.
    pub total: Duration,
    pub running: bool,
    pub current_start: Option<DateTime<Utc>>,
    pub completed_tasks: BTreeSet<Arc<str>>,
    /// Today's notes after deduplication.
    pub notes: Vec<Arc<str>>,
    pub sessions: Vec<Session>,
}

/// Folds one day of events into a [DailyState] in a single pass.
///
/// The log is append-only and may be malformed (interrupted saves, clock
/// adjustments), so anomalies are recovered, not rejected:
/// - a `Start` over an open session discards the stale one, newest wins;
/// - an `End` that would produce a negative duration is dropped and the
///   session stays open for a later valid `End`;
/// - an `End` with no open session closes nothing and counts nothing.
///
/// `is_live` tells the reducer that the log represents the present moment.
/// Only then is a trailing open `Start` materialized as an active session
/// with `now - start` elapsed. Historical replays leave it visible through
/// `current_start` alone.
pub fn reduce_sessions(events: &[EventEntity], now: DateTime<Utc>, is_live: bool) -> DailyState {
    let mut open_start: Option<DateTime<Utc>> = None;
    let mut total = Duration::zero();
    let mut sessions = Vec::new();
    let mut number = 1u32;
    let mut completed = BTreeSet::new();
    // Checks recorded since the current session opened.
    let mut pending = BTreeSet::new();
    let mut notes: Vec<Arc<str>> = Vec::new();

    for event in events {
        match event {
            EventEntity::Start { timestamp } => {
                if open_start.is_some() {
                    // Malformed log: a Start follows a Start. The orphaned
                    // session is dropped together with its checks.
                    pending.clear();
                }
                open_start = Some(*timestamp);
            }
            EventEntity::End {
                timestamp,
                tasks,
                note,
            } => {
                // Notes are deduplicated against the whole day, so even an
                // End that closes nothing contributes its note.
                if let Some(note) = note {
                    collect_note(&mut notes, note);
                }

                let Some(start) = open_start else {
                    continue;
                };
                let duration = *timestamp - start;
                if duration < Duration::zero() {
                    // Clock skew. Dropped rather than clamped so a later
                    // valid End can still close the session.
                    continue;
                }

                match tasks {
                    // The task list on the End line is the authoritative
                    // record of the session.
                    Some(tasks) => {
                        completed.extend(tasks.iter().cloned());
                        pending.clear();
                    }
                    // Legacy lines predate the field; the standalone checks
                    // are all we have.
                    None => completed.append(&mut pending),
                }

                sessions.push(Session {
                    number,
                    start,
                    end: Some(*timestamp),
                    duration,
                    active: false,
                });
                number += 1;
                total += duration;
                open_start = None;
            }
            EventEntity::Check { task, .. } => {
                // A check is only meaningful while a session is open.
                if open_start.is_some() {
                    pending.insert(task.clone());
                }
            }
        }
    }

    if is_live {
        if let Some(start) = open_start {
            sessions.push(Session {
                number,
                start,
                end: None,
                duration: now - start,
                active: true,
            });
        }
    }

    DailyState {
        total,
        running: open_start.is_some(),
        current_start: open_start,
        completed_tasks: completed,
        notes,
        sessions,
    }
}

/// Note deduplication. An identical note is suppressed. A note that strictly
/// extends an earlier one supersedes it: the shorter note is removed and only
/// the longer one kept. This mirrors how notes used to be re-saved after
/// every edit of the same text field.
fn collect_note(notes: &mut Vec<Arc<str>>, note: &Arc<str>) {
    if notes.iter().any(|existing| existing == note) {
        return;
    }
    notes.retain(|existing| !note.starts_with(existing.as_ref()));
    notes.push(note.clone());
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::sync::Arc;

    use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};

    use super::{reduce_sessions, DailyState};
    use crate::tracker::events::EventEntity;

    const TEST_START_DATE: NaiveDateTime =
        NaiveDateTime::new(NaiveDate::from_ymd_opt(2018, 7, 4).unwrap(), NaiveTime::MIN);

    fn at(seconds: i64) -> DateTime<Utc> {
        Utc.from_utc_datetime(&TEST_START_DATE) + Duration::seconds(seconds)
    }

    fn start(seconds: i64) -> EventEntity {
        EventEntity::Start {
            timestamp: at(seconds),
        }
    }

    fn end(seconds: i64) -> EventEntity {
        EventEntity::End {
            timestamp: at(seconds),
            tasks: None,
            note: None,
        }
    }

    fn end_with(
        seconds: i64,
        tasks: impl IntoIterator<Item = &'static str>,
        note: Option<&str>,
    ) -> EventEntity {
        EventEntity::End {
            timestamp: at(seconds),
            tasks: Some(tasks.into_iter().map(Arc::from).collect()),
            note: note.map(Arc::from),
        }
    }

    fn check(seconds: i64, task: &str) -> EventEntity {
        EventEntity::Check {
            timestamp: at(seconds),
            task: Arc::from(task),
        }
    }

    fn reduce(events: &[EventEntity]) -> DailyState {
        reduce_sessions(events, at(10_000), true)
    }

    #[test]
    fn empty_log_reduces_to_empty_state() {
        let state = reduce(&[]);
        assert_eq!(state.total, Duration::zero());
        assert!(!state.running);
        assert!(state.sessions.is_empty());
        assert!(state.current_start.is_none());
        assert!(state.completed_tasks.is_empty());
    }

    #[test]
    fn balanced_pairs_sum_into_total() {
        let state = reduce(&[start(0), end(60), start(120), end(300)]);
        assert_eq!(state.sessions.len(), 2);
        assert_eq!(state.total, Duration::seconds(60 + 180));
        assert!(!state.running);
        assert_eq!(
            state.sessions.iter().map(|s| s.number).collect::<Vec<_>>(),
            vec![1, 2]
        );
    }

    #[test]
    fn open_start_becomes_active_session_when_live() {
        let state = reduce_sessions(&[start(0)], at(90), true);
        assert_eq!(state.sessions.len(), 1);
        let session = &state.sessions[0];
        assert!(session.active);
        assert_eq!(session.end, None);
        assert_eq!(session.duration, Duration::seconds(90));
        // The active session is on display only, it never counts.
        assert_eq!(state.total, Duration::zero());
        assert!(state.running);
        assert_eq!(state.current_start, Some(at(0)));
    }

    #[test]
    fn open_start_is_not_materialized_for_historical_logs() {
        let state = reduce_sessions(&[start(0)], at(90), false);
        assert!(state.sessions.is_empty());
        assert!(state.running);
        assert_eq!(state.current_start, Some(at(0)));
    }

    #[test]
    fn negative_duration_end_is_dropped_session_stays_open() {
        // The second End predates its Start.
        let state = reduce(&[start(0), end(60), start(200), end(150)]);
        assert_eq!(state.sessions.iter().filter(|s| !s.active).count(), 1);
        assert!(state.running);
        assert_eq!(state.current_start, Some(at(200)));
        assert_eq!(state.total, Duration::seconds(60));
    }

    #[test]
    fn dropped_end_leaves_session_closable_by_a_later_end() {
        let state = reduce(&[start(100), end(50), end(400)]);
        assert_eq!(state.sessions.len(), 1);
        assert_eq!(state.sessions[0].duration, Duration::seconds(300));
        assert!(!state.running);
    }

    #[test]
    fn consecutive_starts_newest_wins() {
        let state = reduce_sessions(&[start(0), start(60)], at(90), false);
        assert!(state.sessions.is_empty());
        assert_eq!(state.current_start, Some(at(60)));
    }

    #[test]
    fn orphaned_end_contributes_nothing() {
        let state = reduce(&[end(10), start(20), end(50)]);
        assert_eq!(state.sessions.len(), 1);
        assert_eq!(state.total, Duration::seconds(30));
    }

    #[test]
    fn reduction_is_pure() {
        let events = [start(0), check(5, "reading"), end_with(60, ["reading"], Some("note"))];
        assert_eq!(
            reduce_sessions(&events, at(100), true),
            reduce_sessions(&events, at(100), true)
        );
    }

    #[test]
    fn end_task_list_is_authoritative() {
        // "exercise" was checked but the End only recorded "reading".
        let state = reduce(&[
            start(0),
            check(10, "reading"),
            check(20, "exercise"),
            end_with(60, ["reading"], None),
        ]);
        assert_eq!(
            state.completed_tasks,
            BTreeSet::from([Arc::from("reading")])
        );
    }

    #[test]
    fn legacy_end_falls_back_to_standalone_checks() {
        let state = reduce(&[
            start(0),
            check(10, "reading"),
            check(20, "reading"),
            end(60),
        ]);
        assert_eq!(
            state.completed_tasks,
            BTreeSet::from([Arc::from("reading")])
        );
    }

    #[test]
    fn checks_outside_a_session_are_ignored() {
        let state = reduce(&[check(10, "reading"), start(20), end(60)]);
        assert!(state.completed_tasks.is_empty());
    }

    #[test]
    fn checks_of_a_discarded_session_do_not_leak() {
        // The first Start is orphaned by the second one; its check must not
        // surface through the legacy fallback of the eventual End.
        let state = reduce(&[start(0), check(10, "reading"), start(20), end(60)]);
        assert!(state.completed_tasks.is_empty());
    }

    #[test]
    fn tasks_accumulate_across_sessions() {
        let state = reduce(&[
            start(0),
            end_with(60, ["reading"], None),
            start(120),
            end_with(180, ["exercise"], None),
        ]);
        assert_eq!(
            state.completed_tasks,
            BTreeSet::from([Arc::from("reading"), Arc::from("exercise")])
        );
    }

    #[test]
    fn identical_note_is_suppressed() {
        let state = reduce(&[
            start(0),
            end_with(60, [], Some("reviewed the draft")),
            start(120),
            end_with(180, [], Some("reviewed the draft")),
        ]);
        assert_eq!(state.notes, vec![Arc::<str>::from("reviewed the draft")]);
    }

    #[test]
    fn extended_note_supersedes_its_prefix() {
        let state = reduce(&[
            start(0),
            end_with(60, [], Some("reviewed")),
            start(120),
            end_with(180, [], Some("reviewed the draft")),
        ]);
        assert_eq!(state.notes, vec![Arc::<str>::from("reviewed the draft")]);
    }

    #[test]
    fn unrelated_notes_are_kept_in_order() {
        let state = reduce(&[
            start(0),
            end_with(60, [], Some("morning block")),
            start(120),
            end_with(180, [], Some("afternoon block")),
        ]);
        assert_eq!(
            state.notes,
            vec![
                Arc::<str>::from("morning block"),
                Arc::<str>::from("afternoon block")
            ]
        );
    }

    #[test]
    fn note_on_an_orphaned_end_still_counts_for_dedup() {
        let state = reduce(&[
            end_with(10, [], Some("stray")),
            start(20),
            end_with(60, [], Some("stray")),
        ]);
        assert_eq!(state.notes, vec![Arc::<str>::from("stray")]);
    }

    #[test]
    fn active_session_takes_the_next_number() {
        let state = reduce_sessions(&[start(0), end(60), start(120)], at(150), true);
        assert_eq!(state.sessions.len(), 2);
        assert_eq!(state.sessions[1].number, 2);
        assert!(state.sessions[1].active);
    }
}
