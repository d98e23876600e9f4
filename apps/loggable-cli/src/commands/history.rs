// history.rs — List the log entries of one object.

use std::path::Path;

use loggable_store::LogEntryRepository;

pub fn execute(store_path: &Path, class: &str, id: &str, json: bool) -> anyhow::Result<()> {
    let store = super::store::open_existing(store_path)?;
    let entries = LogEntryRepository::new(store.as_ref()).log_entries(class, id)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("No log entries for {} {}.", class, id);
        return Ok(());
    }

    println!(
        "{:<8} {:<8} {:<20} {:<16} DATA",
        "VERSION", "ACTION", "LOGGED AT", "USER"
    );
    println!("{}", "-".repeat(80));

    for entry in &entries {
        let data = match &entry.data {
            Some(data) => serde_json::to_string(data)?,
            None => "-".to_string(),
        };
        println!(
            "{:<8} {:<8} {:<20} {:<16} {}",
            entry.version,
            entry.action.as_str(),
            entry.logged_at.format("%Y-%m-%d %H:%M:%S"),
            entry.username.as_deref().unwrap_or("-"),
            data,
        );
    }

    Ok(())
}
