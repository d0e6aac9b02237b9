use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDate, Utc};
#[cfg(test)]
use mockall::automock;
use tokio::time::Instant;

/// Represents an entity responsible for providing dates across the application.
/// The timer commands and the watch loop only ever see time through this
/// trait, which allows scripting it in tests.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Clock: Sync + Send + 'static {
    fn time(&self) -> DateTime<Utc>;

    fn instant(&self) -> Instant;

    async fn sleep(&self, duration: Duration);

    async fn sleep_until(&self, instant: tokio::time::Instant);
}

/// Logs are scoped to the local calendar day, not the UTC one.
pub fn local_day(clock: &dyn Clock) -> NaiveDate {
    clock.time().with_timezone(&Local).date_naive()
}

pub struct DefaultClock;

#[async_trait]
impl Clock for DefaultClock {
    fn time(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn instant(&self) -> Instant {
        Instant::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    async fn sleep_until(&self, instant: tokio::time::Instant) {
        tokio::time::sleep_until(instant).await;
    }
}
