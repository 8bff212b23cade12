//! Integration tests for `LibraryRepository` against the fixture library.

mod common;

use common::{Recorder, TestResult, fixture_path};
use dynplug::{EntryKind, LibraryRepository, LoadConfig, PluginError, SymbolBinding};

#[test]
fn test_load_then_get_returns_same_handle() -> TestResult {
    let mut repo = LibraryRepository::new();
    let loaded = repo.load("fixture", fixture_path()?)?;

    let fetched = repo.get("fixture")?;
    assert_eq!(fetched, loaded);
    assert_eq!(repo.find("fixture"), Some(loaded));
    assert!(repo.contains("fixture"));
    assert_eq!(repo.len(), 1);
    Ok(())
}

#[test]
fn test_duplicate_name_same_path_keeps_first() -> TestResult {
    let path = fixture_path()?;
    let mut repo = LibraryRepository::new();
    let first = repo.load("fixture", &path)?;

    let result = repo.load("fixture", &path);
    assert!(
        matches!(
            &result,
            Err(PluginError::DuplicateName { kind: EntryKind::Library, name }) if name == "fixture"
        ),
        "unexpected result: {result:?}"
    );
    assert_eq!(repo.get("fixture")?, first);
    assert_eq!(repo.len(), 1);
    Ok(())
}

#[test]
fn test_duplicate_name_other_path_is_not_opened() -> TestResult {
    let mut repo = LibraryRepository::new();
    let first = repo.load("fixture", fixture_path()?)?;

    // A path that cannot be opened still reports the name clash, proving the
    // name is checked first.
    let result = repo.load("fixture", "/nonexistent/dynplug/libother.so");
    assert!(result.as_ref().is_err_and(PluginError::is_duplicate));
    assert_eq!(repo.get("fixture")?, first);
    Ok(())
}

#[test]
fn test_same_path_under_two_names() -> TestResult {
    let path = fixture_path()?;
    let mut repo = LibraryRepository::new();
    let a = repo.load("fixture", &path)?;
    let b = repo.load("empty", &path)?;

    assert_ne!(a, b);
    assert_eq!(repo.names().collect::<Vec<_>>(), ["empty", "fixture"]);
    Ok(())
}

#[test]
fn test_find_and_get_agree() -> TestResult {
    let mut repo = LibraryRepository::new();
    repo.load("fixture", fixture_path()?)?;

    for name in ["fixture", "empty", ""] {
        match (repo.find(name), repo.get(name)) {
            (Some(found), Ok(got)) => assert_eq!(found, got),
            (None, Err(e)) => assert!(e.is_not_found()),
            (found, got) => {
                return Err(format!("find/get disagree on {name:?}: {found:?} vs {got:?}").into());
            }
        }
    }
    Ok(())
}

#[test]
fn test_handle_outlives_repository() -> TestResult {
    let mut repo = LibraryRepository::new();
    let handle = repo.load("fixture", fixture_path()?)?;
    assert_eq!(handle.holders(), 2);

    drop(repo);
    assert_eq!(handle.holders(), 1);
    assert!(handle.is_open());
    Ok(())
}

#[test]
fn test_config_applies_to_loaded_libraries() -> TestResult {
    let mut repo = LibraryRepository::new().with_config(LoadConfig::eager());
    let handle = repo.load("fixture", fixture_path()?)?;
    assert_eq!(handle.config().binding, SymbolBinding::Now);
    Ok(())
}

#[test]
fn test_observer_sees_open_and_close() -> TestResult {
    let recorder = Recorder::shared();
    let mut repo = LibraryRepository::new().with_observer(recorder.clone());
    repo.load("fixture", fixture_path()?)?;
    assert_eq!(recorder.count("library opened"), 1);
    assert_eq!(recorder.count("library closed"), 0);

    drop(repo);
    assert_eq!(recorder.count("library closed"), 1);
    Ok(())
}
