pub mod render;

use std::{future, sync::Arc};

use anyhow::Result;
use chrono::NaiveDate;
use futures::{stream, Stream, StreamExt};

use crate::{store::event_log::EventStorage, tracker::events::EventEntity};

/// Extracts the event logs of every day between `start` and `end`
/// (inclusive), in date order. Days are fetched through a buffered stream so
/// a long range doesn't read strictly one file at a time.
pub fn extract_days(
    storage: impl EventStorage,
    start: NaiveDate,
    end: NaiveDate,
) -> impl Stream<Item = (NaiveDate, Result<Vec<EventEntity>>)> {
    let storage = Arc::new(storage);

    date_range(start, end)
        .map(move |day| {
            let storage = storage.clone();
            async move { (day, storage.events_for(day).await) }
        })
        .buffered(4)
}

/// Returns a stream of dates between start (inclusive) and end (inclusive).
fn date_range(start: NaiveDate, end: NaiveDate) -> impl Stream<Item = NaiveDate> {
    stream::unfold((start, end), |(mut current, end)| {
        future::ready({
            if current <= end {
                let last_current = current;
                current = current.succ_opt().expect("End of time should never happen");
                Some(((last_current), (current, end)))
            } else {
                None
            }
        })
    })
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use futures::StreamExt;

    use super::date_range;

    #[tokio::test]
    async fn date_range_is_inclusive_on_both_ends() {
        let start = NaiveDate::from_ymd_opt(2018, 7, 4).unwrap();
        let end = NaiveDate::from_ymd_opt(2018, 7, 6).unwrap();
        let days = date_range(start, end).collect::<Vec<_>>().await;
        assert_eq!(
            days,
            vec![start, NaiveDate::from_ymd_opt(2018, 7, 5).unwrap(), end]
        );
    }

    #[tokio::test]
    async fn inverted_range_is_empty() {
        let start = NaiveDate::from_ymd_opt(2018, 7, 6).unwrap();
        let end = NaiveDate::from_ymd_opt(2018, 7, 4).unwrap();
        assert_eq!(date_range(start, end).count().await, 0);
    }
}
