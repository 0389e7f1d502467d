//! Scenario tests spanning the note store, sync engine, index and coordinator.

mod support;
mod sync_reconcile;
