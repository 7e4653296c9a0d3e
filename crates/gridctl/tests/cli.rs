//! End-to-end tests for the gridctl binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

const TUNE: &str = "X:1\nM:4/4\nL:1/8\nK:C\nz8 |\n";
const DRUMS: &str = "X:1\nM:4/4\nL:1/4\n%%percmap g 42\n%%percmap ^g 46\nK:C perc\ng g g og |\n";

/// A scratch directory holding one tune, with no local config in sight
fn workspace(contents: &str) -> (TempDir, std::path::PathBuf) {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("tune.abc");
    fs::write(&file, contents).unwrap();
    (dir, file)
}

fn gridctl(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("gridctl").unwrap();
    cmd.current_dir(dir.path())
        .env_remove("RUST_LOG")
        .env_remove("ABCGRID_LOG")
        .env_remove("ABCGRID_TICKS_PER_BEAT")
        .env_remove("ABCGRID_NOTE_FILL");
    cmd
}

fn music_offset(doc: &str) -> String {
    doc.rfind("K:").map(|k| doc[k..].find('\n').unwrap() + k + 1).unwrap().to_string()
}

#[test]
fn locate_prints_bar_range() {
    let (dir, file) = workspace(TUNE);
    gridctl(&dir)
        .arg("locate")
        .arg(&file)
        .args(["--cursor", &music_offset(TUNE)])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"start\": 20"))
        .stdout(predicate::str::contains("z8"));
}

#[test]
fn toggle_prints_new_document() {
    let (dir, file) = workspace(TUNE);
    gridctl(&dir)
        .arg("toggle")
        .arg(&file)
        .args(["--cursor", &music_offset(TUNE), "--tick", "0", "--pitch", "A"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Az z2 z2 z2 |"));

    // without --write the file is untouched
    assert_eq!(fs::read_to_string(&file).unwrap(), TUNE);
}

#[test]
fn toggle_write_replaces_file() {
    let (dir, file) = workspace(TUNE);
    gridctl(&dir)
        .arg("toggle")
        .arg(&file)
        .args(["--cursor", &music_offset(TUNE), "--tick", "0", "--pitch", "A", "--write"])
        .assert()
        .success();

    let edited = fs::read_to_string(&file).unwrap();
    assert!(edited.ends_with("K:C\nAz z2 z2 z2 |\n"), "{edited}");
}

#[test]
fn chord_inserts_triad() {
    let (dir, file) = workspace(TUNE);
    gridctl(&dir)
        .arg("chord")
        .arg(&file)
        .args(["--cursor", &music_offset(TUNE), "--tick", "0", "--key", "C", "--degree", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[CEG]"));
}

#[test]
fn chord_rejects_bad_degree() {
    let (dir, file) = workspace(TUNE);
    gridctl(&dir)
        .arg("chord")
        .arg(&file)
        .args(["--tick", "0", "--key", "C", "--degree", "9"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("degree"));
}

#[test]
fn toggle_rejects_bad_pitch() {
    let (dir, file) = workspace(TUNE);
    gridctl(&dir)
        .arg("toggle")
        .arg(&file)
        .args(["--cursor", &music_offset(TUNE), "--tick", "0", "--pitch", "H"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("is not an ABC pitch"));
}

#[test]
fn missing_file_reports_path() {
    let dir = TempDir::new().unwrap();
    gridctl(&dir)
        .args(["tokens", "absent.abc"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("absent.abc"));
}

#[test]
fn grid_shows_instrument_states() {
    let (dir, file) = workspace(DRUMS);
    gridctl(&dir)
        .arg("grid")
        .arg(&file)
        .args(["--cursor", &music_offset(DRUMS), "--instrument", "hihat"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"length\": 96"))
        .stdout(predicate::str::contains("\"base\""))
        .stdout(predicate::str::contains("\"alt\": 0"));
}

#[test]
fn grid_rejects_unknown_instrument() {
    let (dir, file) = workspace(DRUMS);
    gridctl(&dir)
        .arg("grid")
        .arg(&file)
        .args(["--cursor", &music_offset(DRUMS), "--instrument", "cowbell"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cowbell"));
}

#[test]
fn set_state_none_clears_hits() {
    let (dir, file) = workspace(DRUMS);
    gridctl(&dir)
        .arg("set-state")
        .arg(&file)
        .args(["--cursor", &music_offset(DRUMS), "--tick", "0"])
        .args(["--instrument", "hihat", "--state", "none", "--write"])
        .assert()
        .success();

    let edited = fs::read_to_string(&file).unwrap();
    assert!(edited.contains("K:C perc\nz g g og |"), "{edited}");
}

#[test]
fn shift_spells_in_key() {
    let dir = TempDir::new().unwrap();
    gridctl(&dir)
        .args(["shift", "--steps", "3", "--key", "G", "C"])
        .assert()
        .success()
        .stdout("^F\n");
}

#[test]
fn toggle_locks_triplet_beats() {
    let (dir, file) = workspace(TUNE);
    gridctl(&dir)
        .arg("toggle")
        .arg(&file)
        .args(["--cursor", &music_offset(TUNE), "--tick", "8", "--pitch", "A"])
        .args(["--triplet-beats", "0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("(3zAz z2 z2 z2 |"));

    gridctl(&dir)
        .arg("toggle")
        .arg(&file)
        .args(["--cursor", &music_offset(TUNE), "--tick", "0", "--pitch", "A"])
        .args(["--triplet-beats", "0,999"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("triplet beat 999"));
}

#[test]
fn percmap_lists_entries() {
    let (dir, file) = workspace(DRUMS);
    gridctl(&dir)
        .arg("percmap")
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"midi\": 42"))
        .stdout(predicate::str::contains("\"^g\""));
}

#[test]
fn config_uses_explicit_file() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("custom.toml");
    fs::write(&config, "[grid]\nticks_per_beat = 12\n").unwrap();

    gridctl(&dir)
        .arg("config")
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("ticks_per_beat = 12"))
        .stdout(predicate::str::contains("custom.toml"));
}

#[test]
fn env_overrides_config() {
    let dir = TempDir::new().unwrap();
    gridctl(&dir)
        .arg("config")
        .env("ABCGRID_NOTE_FILL", "beat")
        .assert()
        .success()
        .stdout(predicate::str::contains("note_fill = \"beat\""))
        .stdout(predicate::str::contains("ABCGRID_NOTE_FILL"));
}
