//! Integration tests: persisted settings and prompt history on disk.

#![allow(clippy::unwrap_used)]

use retouch_session::settings::{PROMPT_HISTORY_FILE, SETTINGS_FILE, WindowGeometry};
use retouch_session::{AppSettings, AspectRatio, FocalLength, Lens, PromptHistory, SettingsError};

#[test]
fn missing_files_load_as_defaults() {
    let dir = tempfile::tempdir().unwrap();
    assert_eq!(
        AppSettings::load(&dir.path().join(SETTINGS_FILE)).unwrap(),
        AppSettings::default()
    );
    assert!(
        PromptHistory::load(&dir.path().join(PROMPT_HISTORY_FILE))
            .unwrap()
            .entries()
            .is_empty()
    );
}

#[test]
fn settings_round_trip_through_nested_dir() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join(SETTINGS_FILE);
    let settings = AppSettings {
        window: Some(WindowGeometry {
            x: -20,
            y: 40,
            width: 1280,
            height: 720,
        }),
        lens: Lens::WideAngle,
        focal_length: FocalLength::Mm24,
        aspect_ratio: AspectRatio::Portrait,
        high_res: true,
    };
    settings.save(&path).unwrap();
    assert_eq!(AppSettings::load(&path).unwrap(), settings);
}

#[test]
fn corrupt_settings_are_an_error_but_load_or_default_recovers() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(SETTINGS_FILE);
    std::fs::write(&path, "{ not json").unwrap();

    assert!(matches!(
        AppSettings::load(&path),
        Err(SettingsError::Json { .. })
    ));
    assert_eq!(AppSettings::load_or_default(&path), AppSettings::default());
}

#[test]
fn prompt_history_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(PROMPT_HISTORY_FILE);

    let mut history = PromptHistory::new();
    for prompt in ["misty harbor", "desert road", "misty harbor", "city at night"] {
        history.record(prompt);
    }
    history.save(&path).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    let stored: Vec<String> = serde_json::from_str(&text).unwrap();
    assert_eq!(stored, ["city at night", "misty harbor", "desert road"]);

    assert_eq!(PromptHistory::load(&path).unwrap(), history);
}

#[test]
fn prompt_history_load_cleans_hand_edited_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(PROMPT_HISTORY_FILE);
    let mut raw: Vec<String> = vec![String::new(), "a".into(), "a".into()];
    raw.extend((0..60).map(|i| format!("p{i}")));
    std::fs::write(&path, serde_json::to_string(&raw).unwrap()).unwrap();

    let history = PromptHistory::load(&path).unwrap();
    assert_eq!(history.entries().len(), PromptHistory::CAPACITY);
    assert_eq!(history.most_recent(), Some("a"));
}
