use std::{
    future::Future,
    io::ErrorKind,
    ops::Deref,
    path::{Path, PathBuf},
};

use anyhow::Result;
use chrono::NaiveDate;
use fs4::tokio::AsyncFileExt;
use tokio::{
    fs::File,
    io::{AsyncBufReadExt, AsyncSeek, AsyncSeekExt, AsyncWrite, AsyncWriteExt, BufReader},
};
use tracing::{debug, warn};

use crate::{tracker::events::EventEntity, utils::time::date_to_log_name};

/// Interface for abstracting storage of daily event logs. One log per
/// calendar day, identified by its date.
pub trait EventStorage {
    type LogFile: EventLogHandle;

    /// Opens or creates the append handle for a day's log.
    fn create_or_append_log(
        &self,
        date: NaiveDate,
    ) -> impl Future<Output = Result<Self::LogFile>>;

    /// Replays the full event log of a day. A day without a log is an empty
    /// log.
    fn events_for(
        &self,
        date: NaiveDate,
    ) -> impl Future<Output = Result<Vec<EventEntity>>> + Send;
}

impl<T: Deref> EventStorage for T
where
    T::Target: EventStorage,
{
    type LogFile = <T::Target as EventStorage>::LogFile;

    fn create_or_append_log(
        &self,
        date: NaiveDate,
    ) -> impl Future<Output = Result<Self::LogFile>> {
        self.deref().create_or_append_log(date)
    }

    fn events_for(
        &self,
        date: NaiveDate,
    ) -> impl Future<Output = Result<Vec<EventEntity>>> + Send {
        self.deref().events_for(date)
    }
}

pub trait EventLogHandle {
    fn append(&mut self, event: EventEntity) -> impl Future<Output = Result<()>>;
    fn flush(&mut self) -> impl Future<Output = Result<()>>;
}

/// The main realization of [EventStorage]. Logs live as JSON-lines files
/// named after their day under a single directory.
pub struct EventStorageImpl {
    log_dir: PathBuf,
}

impl EventStorageImpl {
    pub fn new(log_dir: PathBuf) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&log_dir)?;

        Ok(Self { log_dir })
    }

    async fn read_all_inner(&self, path: &Path) -> Result<Vec<EventEntity>> {
        async fn extract(path: &Path) -> std::result::Result<Vec<EventEntity>, std::io::Error> {
            debug!("Extracting {path:?}");
            let file = File::open(path).await?;
            file.lock_shared()?;
            let buffer = BufReader::new(file);
            let mut lines = buffer.lines();
            let mut events = vec![];
            while let Ok(Some(v)) = lines.next_line().await {
                match serde_json::from_str::<EventEntity>(&v) {
                    Ok(v) => events.push(v),
                    Err(e) => {
                        // ignore illegal values. Might happen after shutdowns
                        warn!(
                            "During parsing in path {:?} found illegal json string {}:  {e}",
                            path, &v
                        )
                    }
                }
            }

            lines.into_inner().into_inner().unlock_async().await?;

            Ok(events)
        }

        match extract(path).await {
            Ok(s) => Ok(s),
            Err(e) => {
                if e.kind() == ErrorKind::NotFound {
                    Ok(vec![])
                } else {
                    Err(e)?
                }
            }
        }
    }
}

impl EventStorage for EventStorageImpl {
    type LogFile = EventLogFile<File>;

    async fn create_or_append_log(&self, date: NaiveDate) -> Result<Self::LogFile> {
        let file_name = date_to_log_name(date);
        let path = self.log_dir.join(file_name);

        let v = File::options()
            .write(true)
            .create(true)
            .read(true)
            .truncate(false)
            .open(path)
            .await?;

        Ok(EventLogFile::new(v))
    }

    async fn events_for(&self, date: NaiveDate) -> Result<Vec<EventEntity>> {
        let file_name = date_to_log_name(date);
        let path = self.log_dir.join(file_name);
        let data = self.read_all_inner(&path).await?;
        Ok(data)
    }
}

pub struct EventLogFile<F> {
    file: F,
}

impl<F: AsyncSeek + AsyncWrite + fs4::tokio::AsyncFileExt + Unpin> EventLogHandle
    for EventLogFile<F>
{
    async fn append(&mut self, event: EventEntity) -> Result<()> {
        self.append_inner(event).await
    }

    async fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<F: AsyncSeek + AsyncWrite + fs4::tokio::AsyncFileExt + Unpin> EventLogFile<F> {
    fn new(file: F) -> Self {
        Self { file }
    }

    async fn append_inner(&mut self, event: EventEntity) -> Result<()> {
        // Semi-safe acquire-release for a file
        self.file.lock_exclusive()?;
        let result = Self::append_with_file(&mut self.file, event).await;
        self.file.unlock_async().await?;
        result
    }

    async fn append_with_file(file: &mut F, event: EventEntity) -> Result<()> {
        // The log is strictly append-only. Nothing already written is ever
        // touched, so a concurrent reader at worst misses the newest line.
        file.seek(std::io::SeekFrom::End(0)).await?;

        let mut buffer = serde_json::to_vec(&event)?;
        buffer.push(b'\n');

        file.write_all(&buffer).await?;
        file.flush().await?;
        Ok(())
    }
}
