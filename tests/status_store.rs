use tempfile::tempdir;
use viral_monitor::status::{ControlCommand, FileStatusStore, MemoryStatusStore, MonitorStatus, StatusStore};

#[test]
fn missing_file_reads_as_disabled() {
    let dir = tempdir().unwrap();
    let store = FileStatusStore::new(dir.path().join("monitor.status"));
    assert_eq!(store.get().unwrap(), MonitorStatus::Disabled);
}

#[test]
fn set_creates_parent_dirs_and_persists() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("monitor.status");
    let store = FileStatusStore::new(&path);

    store.set(MonitorStatus::Enabled).unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "enabled");

    let reopened = FileStatusStore::new(&path);
    assert_eq!(reopened.get().unwrap(), MonitorStatus::Enabled);
}

#[test]
fn only_exact_enabled_turns_monitor_on() {
    assert_eq!(MonitorStatus::parse("enabled\n"), MonitorStatus::Enabled);
    assert_eq!(MonitorStatus::parse("ENABLED"), MonitorStatus::Disabled);
    assert_eq!(MonitorStatus::parse("yes"), MonitorStatus::Disabled);
    assert_eq!(MonitorStatus::parse(""), MonitorStatus::Disabled);

    let dir = tempdir().unwrap();
    let path = dir.path().join("monitor.status");
    std::fs::write(&path, "garbage").unwrap();
    assert_eq!(FileStatusStore::new(&path).get().unwrap(), MonitorStatus::Disabled);
}

#[test]
fn toggle_flips_and_persists() {
    let dir = tempdir().unwrap();
    let store = FileStatusStore::new(dir.path().join("monitor.status"));

    assert_eq!(store.toggle().unwrap(), MonitorStatus::Enabled);
    assert_eq!(store.toggle().unwrap(), MonitorStatus::Disabled);
    assert_eq!(store.get().unwrap(), MonitorStatus::Disabled);
}

#[test]
fn control_commands_parse_aliases() {
    assert_eq!(ControlCommand::parse("START"), Some(ControlCommand::Enable));
    assert_eq!(ControlCommand::parse(" on "), Some(ControlCommand::Enable));
    assert_eq!(ControlCommand::parse("stop"), Some(ControlCommand::Disable));
    assert_eq!(ControlCommand::parse("toggle"), Some(ControlCommand::Toggle));
    assert_eq!(ControlCommand::parse("status"), Some(ControlCommand::Status));
    assert_eq!(ControlCommand::parse("restart"), None);
}

#[test]
fn control_commands_drive_the_store() {
    let store = MemoryStatusStore::new(MonitorStatus::Disabled);

    assert_eq!(ControlCommand::Status.apply(&store).unwrap(), MonitorStatus::Disabled);
    assert_eq!(ControlCommand::Enable.apply(&store).unwrap(), MonitorStatus::Enabled);
    assert_eq!(ControlCommand::Enable.apply(&store).unwrap(), MonitorStatus::Enabled);
    assert_eq!(ControlCommand::Toggle.apply(&store).unwrap(), MonitorStatus::Disabled);
    assert_eq!(ControlCommand::Disable.apply(&store).unwrap(), MonitorStatus::Disabled);
    assert_eq!(store.get().unwrap(), MonitorStatus::Disabled);
}
