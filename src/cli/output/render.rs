use ansi_term::Colour::{Cyan, Green, Red, Yellow};
use ansi_term::Style;
use chrono::{DateTime, Local, Utc};

use crate::{
    tracker::{
        events::EventEntity,
        reduce::{DailyState, Session},
    },
    utils::{
        percentage::{goal_progress, Percentage},
        time::format_hms,
    },
};

const GAUGE_WIDTH: usize = 20;

/// Renders the one-shot state block: running indicator, elapsed times, goal
/// gauge, tasks and notes.
pub fn render_status(state: &DailyState, goal_hours: f64) -> String {
    let mut out = String::new();

    if state.running {
        out.push_str(&Green.bold().paint("Timer Running...").to_string());
    } else {
        out.push_str(&Red.paint("Timer Stopped").to_string());
    }
    out.push('\n');

    match state.sessions.last() {
        Some(session) if session.active => {
            out.push_str(&format!(
                "Current session  {}\n",
                format_hms(session.duration)
            ));
        }
        _ => {
            if let Some(start) = state.current_start {
                // Historical log with an unterminated Start.
                out.push_str(&format!("Open since       {}\n", local_time(start)));
            }
        }
    }

    out.push_str(&format!("Total today      {}\n", format_hms(state.total)));
    out.push_str(&format!(
        "Goal             {}\n",
        gauge(goal_progress(state.total, goal_hours))
    ));

    if !state.completed_tasks.is_empty() {
        out.push_str("Tasks done:");
        for task in &state.completed_tasks {
            out.push_str(&format!(" {}", Green.paint(format!("[x] {task}"))));
        }
        out.push('\n');
    }

    if !state.notes.is_empty() {
        out.push_str("Notes:\n");
        for note in &state.notes {
            out.push_str(&format!("  - {note}\n"));
        }
    }

    out
}

/// Renders the session timeline, most recent first.
pub fn render_sessions(sessions: &[Session]) -> String {
    if sessions.is_empty() {
        return "No sessions yet\n".to_string();
    }

    let mut out = String::new();
    for session in sessions.iter().rev() {
        let end = match session.end {
            Some(end) => local_time(end),
            None => Yellow.paint("In Progress").to_string(),
        };
        let line = format!(
            "Session {}  {}   {} -> {}",
            session.number,
            format_hms(session.duration),
            local_time(session.start),
            end,
        );
        if session.active {
            out.push_str(&Yellow.bold().paint(line).to_string());
        } else {
            out.push_str(&line);
        }
        out.push('\n');
    }
    out
}

/// Renders the raw entries list, most recent first.
pub fn render_entries(events: &[EventEntity]) -> String {
    if events.is_empty() {
        return "No entries yet\n".to_string();
    }

    let mut out = String::new();
    for event in events.iter().rev() {
        let kind = event.kind_name();
        let colored = match event {
            EventEntity::Start { .. } => Green.paint(kind),
            EventEntity::End { .. } => Red.paint(kind),
            EventEntity::Check { .. } => Cyan.paint(kind),
        };
        out.push_str(&format!("{colored}  {}\n", local_time(event.timestamp())));
    }
    out
}

pub fn saved_notice() -> String {
    Style::new().dimmed().paint("(saved)").to_string()
}

fn gauge(progress: Percentage) -> String {
    let filled = (*progress / 100. * GAUGE_WIDTH as f64) as usize;
    let bar = format!(
        "[{}{}]",
        "#".repeat(filled),
        "-".repeat(GAUGE_WIDTH - filled)
    );
    let colour = if progress.is_full() { Green } else { Yellow };
    format!("{} {}", colour.paint(bar), progress)
}

fn local_time(timestamp: DateTime<Utc>) -> String {
    timestamp
        .with_timezone(&Local)
        .format("%I:%M:%S %p")
        .to_string()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::sync::Arc;

    use chrono::{Duration, TimeZone, Utc};

    use crate::tracker::reduce::{DailyState, Session};

    use super::{render_sessions, render_status};

    fn closed_session(number: u32, start_s: i64, end_s: i64) -> Session {
        Session {
            number,
            start: Utc.timestamp_opt(start_s, 0).unwrap(),
            end: Some(Utc.timestamp_opt(end_s, 0).unwrap()),
            duration: Duration::seconds(end_s - start_s),
            active: false,
        }
    }

    fn state(total_s: i64, running: bool) -> DailyState {
        DailyState {
            total: Duration::seconds(total_s),
            running,
            current_start: None,
            completed_tasks: BTreeSet::new(),
            notes: Vec::new(),
            sessions: Vec::new(),
        }
    }

    #[test]
    fn status_shows_running_indicator() {
        assert!(render_status(&state(0, true), 5.).contains("Timer Running..."));
        assert!(render_status(&state(0, false), 5.).contains("Timer Stopped"));
    }

    #[test]
    fn status_shows_total_and_progress() {
        // 2.5 of 5 hours
        let rendered = render_status(&state(9_000, false), 5.);
        assert!(rendered.contains("02:30:00"));
        assert!(rendered.contains("50%"));
        assert!(rendered.contains(&format!("[{}{}]", "#".repeat(10), "-".repeat(10))));
    }

    #[test]
    fn status_lists_tasks_and_notes() {
        let mut state = state(0, false);
        state.completed_tasks = BTreeSet::from([Arc::from("reading")]);
        state.notes = vec![Arc::from("slow morning")];
        let rendered = render_status(&state, 5.);
        assert!(rendered.contains("[x] reading"));
        assert!(rendered.contains("- slow morning"));
    }

    #[test]
    fn sessions_render_most_recent_first() {
        let rendered = render_sessions(&[
            closed_session(1, 0, 60),
            closed_session(2, 120, 300),
        ]);
        let first = rendered.find("Session 2").unwrap();
        let second = rendered.find("Session 1").unwrap();
        assert!(first < second);
    }

    #[test]
    fn active_session_shows_in_progress() {
        let rendered = render_sessions(&[Session {
            number: 1,
            start: Utc.timestamp_opt(0, 0).unwrap(),
            end: None,
            duration: Duration::seconds(83),
            active: true,
        }]);
        assert!(rendered.contains("In Progress"));
        assert!(rendered.contains("00:01:23"));
    }

    #[test]
    fn empty_timeline_has_a_placeholder() {
        assert_eq!(render_sessions(&[]), "No sessions yet\n");
    }
}
