//! Async batched log sink.
//!
//! Producers call [`ObservabilityCore::emit`], which never blocks: the
//! record is pushed onto a bounded channel and a dedicated background
//! task batches (`log.batch_size`, default 100) and flushes
//! (`log.flush_interval_s`, default 0.5s) to the configured sinks. On sink
//! failure, records are dropped and a counter is incremented — never
//! retried indefinitely, so logging can never back-pressure request
//! processing.

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;

use super::record::LogRecord;
use super::redaction::redact_value;

#[async_trait]
pub trait LogSink: Send + Sync {
    async fn write_batch(&self, records: &[LogRecord]) -> anyhow::Result<()>;
}

pub struct ConsoleSink;

#[async_trait]
impl LogSink for ConsoleSink {
    async fn write_batch(&self, records: &[LogRecord]) -> anyhow::Result<()> {
        for record in records {
            println!("{}", serde_json::to_string(record)?);
        }
        Ok(())
    }
}

pub struct RotatingFileSink {
    path: PathBuf,
}

impl RotatingFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl LogSink for RotatingFileSink {
    async fn write_batch(&self, records: &[LogRecord]) -> anyhow::Result<()> {
        let mut file = tokio::fs::OpenOptions::new().create(true).append(true).open(&self.path).await?;
        for record in records {
            let mut line = serde_json::to_string(record)?;
            line.push('\n');
            file.write_all(line.as_bytes()).await?;
        }
        Ok(())
    }
}

/// Process-wide handle producers emit records through.
#[derive(Clone)]
pub struct ObservabilityCore {
    tx: mpsc::Sender<LogRecord>,
    dropped: Arc<AtomicU64>,
}

impl ObservabilityCore {
    /// Spawns the batching worker and returns a handle to it.
    pub fn spawn(sinks: Vec<Arc<dyn LogSink>>, sensitive_fields: Vec<String>, batch_size: usize, flush_interval: Duration) -> Self {
        let (tx, mut rx) = mpsc::channel::<LogRecord>(4096);
        let dropped = Arc::new(AtomicU64::new(0));
        let dropped_worker = dropped.clone();

        tokio::spawn(async move {
            let mut buffer: Vec<LogRecord> = Vec::with_capacity(batch_size);
            let mut ticker = tokio::time::interval(flush_interval);

            loop {
                tokio::select! {
                    maybe_record = rx.recv() => {
                        match maybe_record {
                            Some(mut record) => {
                                let mut as_value = serde_json::to_value(&record.fields).unwrap_or_default();
                                redact_value(&mut as_value, &sensitive_fields);
                                if let serde_json::Value::Object(map) = as_value {
                                    record.fields = map.into_iter().collect();
                                }
                                buffer.push(record);
                                if buffer.len() >= batch_size {
                                    flush(&sinks, &mut buffer, &dropped_worker).await;
                                }
                            }
                            None => {
                                flush(&sinks, &mut buffer, &dropped_worker).await;
                                return;
                            }
                        }
                    }
                    _ = ticker.tick() => {
                        if !buffer.is_empty() {
                            flush(&sinks, &mut buffer, &dropped_worker).await;
                        }
                    }
                }
            }
        });

        Self { tx, dropped }
    }

    /// Never blocks the caller: a full channel drops the record and counts it.
    pub fn emit(&self, record: LogRecord) {
        if self.tx.try_send(record).is_err() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

async fn flush(sinks: &[Arc<dyn LogSink>], buffer: &mut Vec<LogRecord>, dropped: &AtomicU64) {
    for sink in sinks {
        if let Err(err) = sink.write_batch(buffer).await {
            tracing::warn!(%err, "log sink flush failed, dropping batch for this sink");
            dropped.fetch_add(buffer.len() as u64, Ordering::Relaxed);
        }
    }
    buffer.clear();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct CapturingSink(Arc<Mutex<Vec<LogRecord>>>);

    #[async_trait]
    impl LogSink for CapturingSink {
        async fn write_batch(&self, records: &[LogRecord]) -> anyhow::Result<()> {
            self.0.lock().unwrap().extend_from_slice(records);
            Ok(())
        }
    }

    #[tokio::test]
    async fn flushes_on_batch_size() {
        let captured = Arc::new(Mutex::new(Vec::new()));
        let sink: Arc<dyn LogSink> = Arc::new(CapturingSink(captured.clone()));
        let core = ObservabilityCore::spawn(vec![sink], vec![], 2, Duration::from_secs(60));

        core.emit(LogRecord::new("info", "test", "one"));
        core.emit(LogRecord::new("info", "test", "two"));
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(captured.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn flushes_on_timer_below_batch_size() {
        let captured = Arc::new(Mutex::new(Vec::new()));
        let sink: Arc<dyn LogSink> = Arc::new(CapturingSink(captured.clone()));
        let core = ObservabilityCore::spawn(vec![sink], vec![], 100, Duration::from_millis(20));

        core.emit(LogRecord::new("info", "test", "solo"));
        tokio::time::sleep(Duration::from_millis(80)).await;

        assert_eq!(captured.lock().unwrap().len(), 1);
    }
}
