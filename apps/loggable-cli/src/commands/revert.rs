// revert.rs — Print an object's audited fields as of a version.

use std::path::Path;

use loggable_store::LogEntryRepository;

pub fn execute(store_path: &Path, class: &str, id: &str, version: u32) -> anyhow::Result<()> {
    let store = super::store::open_existing(store_path)?;
    let data = LogEntryRepository::new(store.as_ref()).revert_data(class, id, version)?;
    println!("{}", serde_json::to_string_pretty(&data)?);
    Ok(())
}
