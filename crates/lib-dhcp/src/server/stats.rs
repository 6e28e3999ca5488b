use std::fmt::Display;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::types::MessageType;

/// Packet counters, shared read-mostly across workers.
#[derive(Debug, Default)]
pub struct ServerStats {
    received: AtomicU64,
    sent: AtomicU64,
    offers: AtomicU64,
    acks: AtomicU64,
    naks: AtomicU64,
    dropped_malformed: AtomicU64,
    dropped_not_accepted: AtomicU64,
    dropped_no_subnet: AtomicU64,
}

impl ServerStats {
    pub fn count_recv(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn count_send(&self, response_type: Option<MessageType>) {
        self.sent.fetch_add(1, Ordering::Relaxed);
        match response_type {
            Some(MessageType::Offer) => {
                self.offers.fetch_add(1, Ordering::Relaxed);
            }
            Some(MessageType::Ack) => {
                self.acks.fetch_add(1, Ordering::Relaxed);
            }
            Some(MessageType::Nak) => {
                self.naks.fetch_add(1, Ordering::Relaxed);
            }
            _ => {}
        }
    }

    pub fn count_dropped_malformed(&self) {
        self.dropped_malformed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn count_dropped_not_accepted(&self) {
        self.dropped_not_accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn count_dropped_no_subnet(&self) {
        self.dropped_no_subnet.fetch_add(1, Ordering::Relaxed);
    }

    pub fn received(&self) -> u64 {
        self.received.load(Ordering::Relaxed)
    }

    pub fn sent(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }

    pub fn dropped_malformed(&self) -> u64 {
        self.dropped_malformed.load(Ordering::Relaxed)
    }

    pub fn dropped_no_subnet(&self) -> u64 {
        self.dropped_no_subnet.load(Ordering::Relaxed)
    }
}

impl Display for ServerStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "received={} sent={} offers={} acks={} naks={} \
             dropped_malformed={} dropped_not_accepted={} dropped_no_subnet={}",
            self.received.load(Ordering::Relaxed),
            self.sent.load(Ordering::Relaxed),
            self.offers.load(Ordering::Relaxed),
            self.acks.load(Ordering::Relaxed),
            self.naks.load(Ordering::Relaxed),
            self.dropped_malformed.load(Ordering::Relaxed),
            self.dropped_not_accepted.load(Ordering::Relaxed),
            self.dropped_no_subnet.load(Ordering::Relaxed),
        )
    }
}
