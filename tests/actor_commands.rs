mod support;

use std::fs;

use predicates::str::contains;

use support::TestRoot;

#[test]
fn actor_show_uses_env_when_set() -> Result<(), Box<dyn std::error::Error>> {
    let root = TestRoot::init()?;
    root.cmd("env-actor")
        .args(["actor", "show"])
        .assert()
        .success()
        .stdout(contains("env-actor"));
    Ok(())
}

#[test]
fn actor_set_persists_and_show_reads() -> Result<(), Box<dyn std::error::Error>> {
    let root = TestRoot::init()?;
    root.cmd("ignored")
        .env_remove("PLANK_ACTOR")
        .args(["actor", "set", "persisted-actor"])
        .assert()
        .success();

    let contents = fs::read_to_string(root.state_dir().join("actor"))?;
    assert!(contents.contains("persisted-actor"));

    root.cmd("ignored")
        .env_remove("PLANK_ACTOR")
        .args(["actor", "show"])
        .assert()
        .success()
        .stdout(contains("persisted-actor"))
        .stdout(contains("source: file"));
    Ok(())
}

#[test]
fn actor_show_falls_back_to_config_default() -> Result<(), Box<dyn std::error::Error>> {
    let root = TestRoot::init()?;
    root.write_file(".plank.toml", "[actor]\ndefault = \"config-actor\"\n")?;
    root.cmd("ignored")
        .env_remove("PLANK_ACTOR")
        .args(["actor", "show"])
        .assert()
        .success()
        .stdout(contains("not set"))
        .stdout(contains("config-actor"));
    Ok(())
}

#[test]
fn actor_flag_beats_env() -> Result<(), Box<dyn std::error::Error>> {
    let root = TestRoot::init()?;
    root.cmd("env-actor")
        .args(["--actor", "flag-actor", "actor", "show"])
        .assert()
        .success()
        .stdout(contains("flag-actor"))
        .stdout(contains("source: flag"));
    Ok(())
}

#[test]
fn actor_names_with_spaces_are_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let root = TestRoot::init()?;
    root.cmd("ignored")
        .env_remove("PLANK_ACTOR")
        .args(["actor", "set", "two words"])
        .assert()
        .code(2);
    Ok(())
}
