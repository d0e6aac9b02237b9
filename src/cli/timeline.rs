use std::fmt::Display;

use anyhow::Result;
use chrono::Local;
use chrono_english::parse_date_string;
use clap::{CommandFactory, Parser, ValueEnum};
use futures::StreamExt;
use now::DateTimeNow;

use crate::{
    store::event_log::EventStorage,
    tracker::reduce::reduce_sessions,
    utils::{
        clock::{local_day, Clock},
        percentage::goal_progress,
        time::format_hms,
    },
};

use super::{
    output::{
        extract_days,
        render::{render_entries, render_sessions},
    },
    Args,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DateStyle {
    Uk,
    Us,
}

impl From<DateStyle> for chrono_english::Dialect {
    fn from(value: DateStyle) -> Self {
        match value {
            DateStyle::Uk => Self::Uk,
            DateStyle::Us => Self::Us,
        }
    }
}

impl Display for DateStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DateStyle::Uk => write!(f, "uk"),
            DateStyle::Us => write!(f, "us"),
        }
    }
}

#[derive(Debug, Parser)]
pub struct TimelineCommand {
    #[arg(
        long = "start",
        short,
        help = "Start of the range. Examples are \"yesterday\", \"1 week ago\", \"15/03/2025\". Defaults to the beginning of the current week"
    )]
    start_date: Option<String>,
    #[arg(
        long = "end",
        short,
        help = "End of the range. Examples are \"yesterday\", \"15/03/2025\". Defaults to today"
    )]
    end_date: Option<String>,
    #[arg(long, default_value_t = DateStyle::Uk, help = "Style of dates used during parsing. For Uk it's day/month/year. For Us it's month/day/year")]
    date_style: DateStyle,
    #[arg(long = "entries", help = "Print the raw event entries under each day")]
    show_entries: bool,
}

/// Command to process `timeline`. Replays the log of every day in the range
/// and prints the reconstructed sessions. Past days are reduced as
/// historical logs: an unterminated `Start` is reported but never turned
/// into an active session.
pub async fn process_timeline_command(
    TimelineCommand {
        start_date,
        end_date,
        date_style,
        show_entries,
    }: TimelineCommand,
    storage: impl EventStorage,
    clock: &dyn Clock,
    goal_hours: f64,
) -> Result<()> {
    let now_local = clock.time().with_timezone(&Local);
    let dialect: chrono_english::Dialect = date_style.into();

    let start = match start_date.map(|s| parse_date_string(&s, now_local, dialect)) {
        Some(Ok(v)) => v.with_timezone(&Local),
        Some(Err(e)) => {
            return Err(Args::command()
                .error(
                    clap::error::ErrorKind::ValueValidation,
                    format!("Failed to validate start date {e}"),
                )
                .into());
        }
        None => now_local.beginning_of_week(),
    };
    let end = match end_date.map(|s| parse_date_string(&s, now_local, dialect)) {
        Some(Ok(v)) => v.with_timezone(&Local),
        Some(Err(e)) => {
            return Err(Args::command()
                .error(
                    clap::error::ErrorKind::ValueValidation,
                    format!("Failed to validate end date {e}"),
                )
                .into());
        }
        None => now_local,
    };

    let today = local_day(clock);
    let now = clock.time();

    let days = extract_days(storage, start.date_naive(), end.date_naive());
    futures::pin_mut!(days);
    while let Some((day, events)) = days.next().await {
        let events = events?;
        if events.is_empty() {
            continue;
        }

        let state = reduce_sessions(&events, now, day == today);

        println!("{}", day.format("%Y-%m-%d"));
        print!("{}", render_sessions(&state.sessions));
        println!(
            "Total {}  {}",
            format_hms(state.total),
            goal_progress(state.total, goal_hours)
        );
        if show_entries {
            print!("{}", render_entries(&events));
        }
        println!();
    }
    Ok(())
}
