//! Persistent state: user records, the append-only session event ledger,
//! and the risk feature sink.

mod sqlite;

pub use sqlite::{EventStore, EventType};
