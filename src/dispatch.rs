/*
 * The asynchronous dispatch queue.
 *
 * Caller threads push commands onto a bounded mpsc channel; a single worker
 * task consumes them in strict FIFO order and owns the sink table
 * exclusively, so records submitted from one thread can never be reordered
 * and sinks need no internal locking.
 *
 * Commands:
 * - Record: a log record plus the sinks that passed level filtering
 * - AddSink: registers a sink with its formatter, acks the assigned id
 * - Flush: flushes the given sinks once everything queued ahead is written
 * - Shutdown: closes the channel, optionally drains, flushes all sinks
 *
 * Flush and Shutdown carry oneshot acks so the producer side can block
 * until completion.
 */

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use crate::config::OverflowPolicy;
use crate::error::{DiagnosticHandler, Error, Result};
use crate::pattern::Formatter;
use crate::record::LogRecord;
use crate::sinks::Sink;

/// Index of a sink in the worker's table, assigned at registration.
pub type SinkId = usize;

/// A sink paired with the formatter that renders records for it.
pub(crate) struct SinkSlot {
    pub sink: Box<dyn Sink>,
    pub formatter: Formatter,
}

/// A record and the sinks it is destined for. Level filtering happens
/// before enqueue, so the queue never carries a record no sink wants.
pub(crate) struct QueuedRecord {
    pub record: LogRecord,
    pub targets: Vec<SinkId>,
}

pub(crate) enum Command {
    Record(QueuedRecord),
    AddSink {
        slot: SinkSlot,
        ack: oneshot::Sender<SinkId>,
    },
    Flush {
        targets: Vec<SinkId>,
        ack: oneshot::Sender<()>,
    },
    Shutdown {
        drain: bool,
        ack: oneshot::Sender<()>,
    },
}

/// Cloneable producer-side handle to the queue.
#[derive(Clone)]
pub(crate) struct QueueHandle {
    tx: mpsc::Sender<Command>,
    policy: OverflowPolicy,
    dropped: Arc<AtomicU64>,
}

impl QueueHandle {
    pub fn new(tx: mpsc::Sender<Command>, policy: OverflowPolicy) -> Self {
        QueueHandle {
            tx,
            policy,
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Enqueues a record. Under `Block` a full queue makes the calling
    /// thread wait for space; under `DropAndCount` the record is discarded
    /// and counted.
    pub fn enqueue(&self, queued: QueuedRecord) -> Result<()> {
        match self.policy {
            OverflowPolicy::Block => self
                .tx
                .blocking_send(Command::Record(queued))
                .map_err(|_| Error::QueueClosed),
            OverflowPolicy::DropAndCount => match self.tx.try_send(Command::Record(queued)) {
                Ok(()) => Ok(()),
                Err(mpsc::error::TrySendError::Full(_)) => {
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                    Ok(())
                }
                Err(mpsc::error::TrySendError::Closed(_)) => Err(Error::QueueClosed),
            },
        }
    }

    /// Registers a sink with the worker and blocks for its id.
    pub fn add_sink(&self, slot: SinkSlot) -> Result<SinkId> {
        let (ack, response) = oneshot::channel();
        self.tx
            .blocking_send(Command::AddSink { slot, ack })
            .map_err(|_| Error::QueueClosed)?;
        response.blocking_recv().map_err(|_| Error::QueueClosed)
    }

    /// Blocks until every record queued ahead of this call has been written
    /// to the given sinks and the sinks flushed.
    pub fn flush(&self, targets: Vec<SinkId>) -> Result<()> {
        let (ack, response) = oneshot::channel();
        self.tx
            .blocking_send(Command::Flush { targets, ack })
            .map_err(|_| Error::QueueClosed)?;
        response.blocking_recv().map_err(|_| Error::QueueClosed)
    }

    /// Signals shutdown and blocks until the worker has finished. With
    /// `drain` the worker writes out everything still queued first; without
    /// it, queued records are discarded.
    pub fn shutdown(&self, drain: bool) -> Result<()> {
        let (ack, response) = oneshot::channel();
        self.tx
            .blocking_send(Command::Shutdown { drain, ack })
            .map_err(|_| Error::QueueClosed)?;
        response.blocking_recv().map_err(|_| Error::QueueClosed)
    }

    /// Records discarded so far under `DropAndCount`.
    pub fn dropped_records(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Worker loop: the single consumer of the queue and sole owner of the
/// sink table. Runs until a Shutdown command arrives.
pub(crate) async fn process_commands(
    mut rx: mpsc::Receiver<Command>,
    diagnostics: DiagnosticHandler,
) {
    let mut slots: Vec<SinkSlot> = Vec::new();

    while let Some(command) = rx.recv().await {
        match command {
            Command::Record(queued) => {
                dispatch_record(&mut slots, &queued, &diagnostics).await;
            }
            Command::AddSink { slot, ack } => {
                slots.push(slot);
                let _ = ack.send(slots.len() - 1);
            }
            Command::Flush { targets, ack } => {
                flush_targets(&mut slots, &targets, &diagnostics).await;
                let _ = ack.send(());
            }
            Command::Shutdown { drain, ack } => {
                // Stop accepting new commands; what is buffered stays
                // available for draining.
                rx.close();

                if drain {
                    while let Some(command) = rx.recv().await {
                        match command {
                            Command::Record(queued) => {
                                dispatch_record(&mut slots, &queued, &diagnostics).await;
                            }
                            Command::Flush { targets, ack } => {
                                flush_targets(&mut slots, &targets, &diagnostics).await;
                                let _ = ack.send(());
                            }
                            // A registration racing shutdown is dropped;
                            // its caller sees QueueClosed.
                            Command::AddSink { .. } => {}
                            Command::Shutdown { ack, .. } => {
                                let _ = ack.send(());
                            }
                        }
                    }
                }

                let all: Vec<SinkId> = (0..slots.len()).collect();
                flush_targets(&mut slots, &all, &diagnostics).await;
                let _ = ack.send(());
                break;
            }
        }
    }
}

async fn dispatch_record(
    slots: &mut [SinkSlot],
    queued: &QueuedRecord,
    diagnostics: &DiagnosticHandler,
) {
    for &id in &queued.targets {
        if let Some(slot) = slots.get_mut(id) {
            let rendered = slot.formatter.render(&queued.record);
            if let Err(e) = slot.sink.write(&queued.record, &rendered).await {
                (diagnostics.as_ref())(&e);
            }
        }
    }
}

async fn flush_targets(
    slots: &mut [SinkSlot],
    targets: &[SinkId],
    diagnostics: &DiagnosticHandler,
) {
    for &id in targets {
        if let Some(slot) = slots.get_mut(id) {
            if let Err(e) = slot.sink.flush().await {
                (diagnostics.as_ref())(&e);
            }
        }
    }
}
