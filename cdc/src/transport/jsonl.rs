use std::path::Path;
use std::pin::Pin;

use cdc_config::shared::RedeliveryConfig;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader, Lines};
use tracing::info;

use crate::cdc_error;
use crate::error::{CdcResult, ErrorKind};
use crate::transport::{Delivery, DeliveryId, DeliveryTracker, EventSource};

type BoxedReader = Pin<Box<dyn AsyncRead + Send>>;

/// Event source reading one wire envelope per line from a file or standard input.
///
/// Delivery ids are the 1-based line numbers of the input. Blank lines are skipped. Nacked
/// lines are held in memory and delivered again once their backoff delay has passed, while
/// further input keeps being read.
pub struct JsonLinesSource {
    lines: Lines<BufReader<BoxedReader>>,
    line_number: DeliveryId,
    exhausted: bool,
    tracker: DeliveryTracker,
}

impl std::fmt::Debug for JsonLinesSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonLinesSource")
            .field("line_number", &self.line_number)
            .field("exhausted", &self.exhausted)
            .finish_non_exhaustive()
    }
}

impl JsonLinesSource {
    /// Opens a source reading from the file at `path`.
    pub async fn open(path: impl AsRef<Path>) -> CdcResult<Self> {
        let path = path.as_ref();
        let file = tokio::fs::File::open(path).await.map_err(|err| {
            cdc_error!(
                ErrorKind::TransportError,
                "Could not open input file",
                path.display(),
                source: err
            )
        })?;

        Ok(Self::from_reader(file))
    }

    /// Creates a source reading from standard input.
    pub fn stdin() -> Self {
        Self::from_reader(tokio::io::stdin())
    }

    pub fn from_reader<R>(reader: R) -> Self
    where
        R: AsyncRead + Send + 'static,
    {
        let reader: BoxedReader = Box::pin(reader);

        Self {
            lines: BufReader::new(reader).lines(),
            line_number: 0,
            exhausted: false,
            tracker: DeliveryTracker::new(),
        }
    }

    /// Sets the backoff of nacked lines.
    pub fn with_redelivery(mut self, redelivery: RedeliveryConfig) -> Self {
        self.tracker = self.tracker.with_redelivery(redelivery);
        self
    }

    pub fn tracker(&self) -> &DeliveryTracker {
        &self.tracker
    }
}

impl EventSource for JsonLinesSource {
    type Acknowledger = DeliveryTracker;

    fn acknowledger(&self) -> Self::Acknowledger {
        self.tracker.clone()
    }

    async fn receive(&mut self) -> CdcResult<Option<Delivery>> {
        loop {
            let notified = self.tracker.notified();
            tokio::pin!(notified);

            if let Some(delivery) = self.tracker.next_redelivery() {
                return Ok(Some(delivery));
            }

            if !self.exhausted {
                // `next_line` is cancel safe, so a settlement or a due redelivery can interrupt a
                // pending read.
                tokio::select! {
                    line = self.lines.next_line() => {
                        let line = line.map_err(|err| {
                            cdc_error!(
                                ErrorKind::TransportError,
                                "Could not read input line",
                                source: err
                            )
                        })?;

                        match line {
                            Some(line) => {
                                self.line_number += 1;
                                if line.trim().is_empty() {
                                    continue;
                                }

                                let delivery = Delivery::new(self.line_number, line.into_bytes());
                                self.tracker.track(&delivery);
                                return Ok(Some(delivery));
                            }
                            None => {
                                info!(lines = self.line_number, "input exhausted");
                                self.exhausted = true;
                                continue;
                            }
                        }
                    }
                    _ = &mut notified => continue,
                    _ = self.tracker.redelivery_ready() => continue,
                }
            }

            if self.tracker.is_settled() {
                return Ok(None);
            }

            tokio::select! {
                _ = notified => {}
                _ = self.tracker.redelivery_ready() => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::Acknowledger;

    #[tokio::test(start_paused = true)]
    async fn reads_non_blank_lines_with_line_numbers() {
        let input = b"{\"a\":1}\n\n{\"b\":2}\n".to_vec();
        let mut source = JsonLinesSource::from_reader(std::io::Cursor::new(input));
        let acknowledger = source.acknowledger();

        let first = source.receive().await.unwrap().unwrap();
        assert_eq!(first.id, 1);
        assert_eq!(first.payload, b"{\"a\":1}".to_vec());

        let second = source.receive().await.unwrap().unwrap();
        assert_eq!(second.id, 3);

        acknowledger.ack(first.id).await.unwrap();
        acknowledger.nack(second.id, "write failed").await.unwrap();

        let again = source.receive().await.unwrap().unwrap();
        assert_eq!((again.id, again.redeliveries), (3, 1));
        acknowledger.ack(again.id).await.unwrap();

        assert!(source.receive().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn opens_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.jsonl");
        tokio::fs::write(&path, "x\n").await.unwrap();

        let mut source = JsonLinesSource::open(&path).await.unwrap();
        let delivery = source.receive().await.unwrap().unwrap();
        assert_eq!(delivery.payload, b"x".to_vec());

        let missing = JsonLinesSource::open(dir.path().join("missing.jsonl"))
            .await
            .unwrap_err();
        assert_eq!(missing.kind(), ErrorKind::TransportError);
    }
}
