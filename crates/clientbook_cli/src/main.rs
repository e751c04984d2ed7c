//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `clientbook_core` linkage.
//! - Keep output deterministic for quick local sanity checks.

use clientbook_core::{ClientRepository, ClientStore, StoreConfig};

fn main() {
    println!("clientbook_core version={}", clientbook_core::core_version());

    match ClientStore::open(StoreConfig::in_memory()) {
        Ok(store) => match store.accessor().count() {
            Ok(count) => println!("clientbook_core probe=ok clients={count}"),
            Err(err) => println!("clientbook_core probe=error error={err}"),
        },
        Err(err) => println!("clientbook_core probe=error error={err}"),
    }
}
