use playlog_core::SnapshotStore;
use std::path::Path;

pub fn run(config: Option<&Path>) -> anyhow::Result<()> {
    let (paths, app_config) = super::load(config)?;
    let store = super::open_existing(&paths, &app_config)?;
    let subjects = store.list_subjects()?;

    if subjects.is_empty() {
        println!("No subjects recorded yet");
        return Ok(());
    }
    for subject in subjects {
        println!("{}", subject);
    }
    Ok(())
}
