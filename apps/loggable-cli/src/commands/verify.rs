// verify.rs — Check the hash chain of a JSONL store.

use std::path::Path;

use loggable_store::{JsonlStore, StoreError};

use super::store::StoreKind;

pub fn execute(store_path: &Path) -> anyhow::Result<()> {
    if StoreKind::for_path(store_path)? != StoreKind::Jsonl {
        println!(
            "{} is not a JSONL store; only JSONL stores carry a hash chain.",
            store_path.display()
        );
        return Ok(());
    }
    if !store_path.exists() {
        println!("No log store found at {}", store_path.display());
        return Ok(());
    }

    match JsonlStore::verify_chain(store_path) {
        Ok(_) => {
            let entries = JsonlStore::read_all(store_path)?;
            println!(
                "Log store verified: {} entries, hash chain intact.",
                entries.len()
            );
            Ok(())
        }
        Err(StoreError::IntegrityViolation {
            line,
            expected,
            actual,
        }) => {
            println!("INTEGRITY VIOLATION at line {}:", line);
            println!("  Expected previous_hash: {}", expected);
            println!("  Actual previous_hash:   {}", actual);
            println!();
            println!("The log store may have been tampered with.");
            anyhow::bail!("log store integrity check failed")
        }
        Err(e) => Err(e.into()),
    }
}
