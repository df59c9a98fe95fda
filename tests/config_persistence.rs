//! Configuration profiles on disk

use rigkey_lib::commands::config::{
    delete_configuration, list_configurations, load_configuration, load_or_default,
    save_configuration,
};
use rigkey_lib::domain::{Configuration, SpeechButton};

fn portable() -> Configuration {
    let mut config = Configuration::default();
    config.name = "Portable 705".to_string();
    config.radio_model = "IC-705".to_string();
    config.serial_port = Some("/dev/ttyACM0".to_string());
    config.allow_unsupported_mode = true;
    config.speech.buttons.push(SpeechButton {
        label: "POTA".to_string(),
        text: "CQ POTA".to_string(),
        rate: 0.9,
        pitch_cents: -200,
    });
    config
}

#[test]
fn saved_profile_loads_back_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let config = portable();

    let path = save_configuration(dir.path(), &config).unwrap();
    assert!(path.ends_with("Portable 705.json"));

    assert_eq!(load_configuration(dir.path(), "Portable 705").unwrap(), config);
    assert_eq!(load_or_default(dir.path(), "Portable 705").unwrap(), config);
}

#[test]
fn saved_default_overrides_builtin() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = Configuration::default();
    config.flrig_port = 12346;
    save_configuration(dir.path(), &config).unwrap();

    assert_eq!(load_or_default(dir.path(), "Default").unwrap().flrig_port, 12346);
}

#[test]
fn list_is_sorted_and_ignores_other_files() {
    let dir = tempfile::tempdir().unwrap();
    save_configuration(dir.path(), &portable()).unwrap();
    save_configuration(dir.path(), &Configuration::default()).unwrap();
    std::fs::write(dir.path().join("notes.txt"), "73").unwrap();

    assert_eq!(
        list_configurations(dir.path()).unwrap(),
        ["Default", "Portable 705"]
    );
}

#[test]
fn delete_removes_profile_but_never_default() {
    let dir = tempfile::tempdir().unwrap();
    save_configuration(dir.path(), &portable()).unwrap();
    save_configuration(dir.path(), &Configuration::default()).unwrap();

    delete_configuration(dir.path(), "Portable 705").unwrap();
    assert!(delete_configuration(dir.path(), "Default").is_err());
    assert!(delete_configuration(dir.path(), "Portable 705").is_err());
    assert_eq!(list_configurations(dir.path()).unwrap(), ["Default"]);
}

#[test]
fn invalid_profile_is_not_saved() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = portable();
    config.speech.buttons[0].rate = 3.0;

    assert!(save_configuration(dir.path(), &config).is_err());
    assert!(list_configurations(dir.path()).unwrap().is_empty());
}

#[test]
fn hand_edited_profile_with_missing_fields_gets_defaults() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("Minimal.json"),
        r#"{ "name": "Minimal", "radio_model": "IC-7610" }"#,
    )
    .unwrap();

    let config = load_configuration(dir.path(), "Minimal").unwrap();
    assert_eq!(config.radio_model, "IC-7610");
    assert_eq!(config.keyer, Default::default());
    assert_eq!(config.flrig_port, 12345);
}

#[test]
fn corrupt_profile_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("Broken.json"), "{ not json").unwrap();
    assert!(load_configuration(dir.path(), "Broken").is_err());
}

#[test]
fn traversal_names_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    assert!(load_configuration(dir.path(), "../etc/passwd").is_err());
    let mut config = portable();
    config.name = "../escape".to_string();
    assert!(save_configuration(dir.path(), &config).is_err());
}
