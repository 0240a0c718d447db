use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::Notify;
use tokio::task::JoinHandle;

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug)]
pub enum Frame {
    Packet(Bytes),
    Close,
}

/// The outbound half of one client connection.
///
/// The broker registries hold clones of this handle; any handler that wants to
/// write to the connection (fan-out, take-over) enqueues frames here while
/// holding the broker lock. A single writer task per connection drains the
/// queue to the socket, so frames reach the wire in enqueue order and the
/// socket never sees interleaved writes.
#[derive(Debug, Clone)]
pub struct Mailbox {
    id: u64,
    tx: UnboundedSender<Frame>,
    kicked: Arc<Notify>,
}

impl Mailbox {
    pub fn new() -> (Self, UnboundedReceiver<Frame>) {
        let (tx, rx) = mpsc::unbounded_channel();

        let mailbox = Self {
            id: NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
            tx,
            kicked: Arc::new(Notify::new()),
        };

        return (mailbox, rx);
    }

    /// Identity of the connection this handle writes to. Registry membership
    /// is keyed on this value.
    pub fn id(&self) -> u64 {
        return self.id;
    }

    /// Enqueues an encoded packet. Fails when the writer task has already shut
    /// down; callers log and move on, the connection is on its way out.
    pub fn send(&self, bytes: Bytes) -> Result<(), ()> {
        return self.tx.send(Frame::Packet(bytes)).map_err(|_| ());
    }

    /// Asks the writer task to flush and shut down the socket, and kicks the
    /// owning read loop off its pending read. Used for graceful DISCONNECT
    /// and for closing a superseded connection during take-over.
    pub fn close(&self) {
        let _ = self.tx.send(Frame::Close);
        self.kicked.notify_one();
    }

    /// Resolves once [close](Self::close) has been called. The owning handler
    /// races this against its packet reads.
    pub async fn closed(&self) {
        self.kicked.notified().await;
    }
}

impl PartialEq for Mailbox {
    fn eq(&self, other: &Self) -> bool {
        return self.id == other.id;
    }
}

impl Eq for Mailbox {}

/// Drains a connection's outbound queue into its write half. Exits on the
/// first Close frame, on write failure, or when every sender is gone, then
/// shuts the socket down.
pub fn spawn_writer<W>(mut write_half: W, mut rx: UnboundedReceiver<Frame>) -> JoinHandle<()>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    return tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            match frame {
                Frame::Packet(buf) => {
                    if let Err(err) = write_half.write_all(&buf).await {
                        log::warn!("Could not write to client connection: {err}");
                        break;
                    }
                }
                Frame::Close => break,
            }
        }

        let _ = write_half.shutdown().await;
    });
}
