// 📷 Scan Bridge
//
// The camera/decoder side lives outside this crate. All it hands over is
// "a scan happened": the payload is checked for non-emptiness and dropped.
// Delivery is a single-subscriber channel holding at most one unconsumed
// signal; further scans while one is pending are coalesced into it.

use chrono::NaiveDateTime;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc::{self, error::TryRecvError, error::TrySendError};
use tracing::{debug, warn};

use crate::temporal::{Clock, SystemClock};

/// A scan occurred. The payload is never forwarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanSignal {
    pub received_at: NaiveDateTime,
}

/// Producer half, handed to whatever decodes QR codes.
#[derive(Debug, Clone)]
pub struct ScanSender {
    tx: mpsc::Sender<ScanSignal>,
}

/// Consumer half, owned by exactly one orchestrator.
#[derive(Debug)]
pub struct ScanReceiver {
    rx: mpsc::Receiver<ScanSignal>,
}

pub fn scan_channel() -> (ScanSender, ScanReceiver) {
    let (tx, rx) = mpsc::channel(1);
    (ScanSender { tx }, ScanReceiver { rx })
}

impl ScanSender {
    /// Deliver one physical scan. Returns false if the payload was empty or
    /// the receiver is gone; a scan coalesced into a pending one counts as
    /// delivered.
    pub fn on_scan(&self, payload: &str) -> bool {
        if payload.is_empty() {
            return false;
        }

        let signal = ScanSignal {
            received_at: SystemClock.now(),
        };
        match self.tx.try_send(signal) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                debug!("scan coalesced into pending signal");
                true
            }
            Err(TrySendError::Closed(_)) => {
                warn!("scan dropped: no subscriber");
                false
            }
        }
    }
}

impl ScanReceiver {
    /// Wait for the next signal; `None` once every sender is dropped.
    pub async fn recv(&mut self) -> Option<ScanSignal> {
        self.rx.recv().await
    }

    /// Take the pending signal, if any, without waiting.
    pub fn try_take(&mut self) -> Option<ScanSignal> {
        match self.rx.try_recv() {
            Ok(signal) => Some(signal),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }
}

/// Forward every non-empty line of `reader` as a scan.
///
/// Suits line-oriented decoders (e.g. a FIFO fed by `zbarcam --raw`).
/// Returns the number of scans delivered once the reader hits EOF.
pub async fn forward_lines<R>(reader: R, sender: ScanSender) -> std::io::Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut delivered = 0;

    while let Some(line) = lines.next_line().await? {
        if sender.on_scan(line.trim()) {
            delivered += 1;
        }
    }

    Ok(delivered)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_payload_is_ignored() {
        let (tx, mut rx) = scan_channel();

        assert!(!tx.on_scan(""));
        assert!(rx.try_take().is_none());
    }

    #[test]
    fn test_at_most_one_pending_signal() {
        let (tx, mut rx) = scan_channel();

        assert!(tx.on_scan("https://party.example/checkin"));
        assert!(tx.on_scan("anything else"));

        assert!(rx.try_take().is_some());
        assert!(rx.try_take().is_none());
    }

    #[test]
    fn test_closed_receiver_reports_undelivered() {
        let (tx, rx) = scan_channel();
        drop(rx);

        assert!(!tx.on_scan("payload"));
    }

    #[tokio::test]
    async fn test_forward_lines_skips_blank_lines() {
        let (tx, mut rx) = scan_channel();
        let input: &[u8] = b"first\n\n   \nsecond\n";

        // Consume concurrently so the single slot never stays full
        let consumer = tokio::spawn(async move {
            let mut seen = 0;
            while rx.recv().await.is_some() {
                seen += 1;
            }
            seen
        });

        let delivered = forward_lines(input, tx).await.unwrap();
        let seen = consumer.await.unwrap();

        assert_eq!(delivered, 2);
        assert!(seen >= 1 && seen <= 2);
    }
}
