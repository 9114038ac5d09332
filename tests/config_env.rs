use lazy_migrate::config::{LoadResult, load_or_init};
use lazy_migrate::{default_config_path, default_log_path};
use serial_test::serial;
use std::fs;
use tempfile::tempdir;

#[test]
#[serial]
fn env_directory_appends_config_xml_and_colocates_log() {
    let td = tempdir().unwrap();
    let base = dunce::canonicalize(td.path()).unwrap();

    unsafe {
        std::env::set_var("LAZY_MIGRATE_CONFIG", &base);
    }

    let cfg_path = default_config_path().expect("default_config_path");
    assert_eq!(cfg_path, base.join("config.xml"));
    let log_path = default_log_path().expect("default_log_path");
    assert_eq!(log_path.parent().unwrap(), base.as_path());

    unsafe {
        std::env::remove_var("LAZY_MIGRATE_CONFIG");
    }
}

#[test]
#[serial]
fn relative_env_path_resolves_against_current_dir() {
    unsafe {
        std::env::set_var("LAZY_MIGRATE_CONFIG", "some/dir/custom.xml");
    }

    let cfg_path = default_config_path().unwrap();
    let expected = std::env::current_dir().unwrap().join("some/dir/custom.xml");
    assert_eq!(cfg_path, expected);

    unsafe {
        std::env::remove_var("LAZY_MIGRATE_CONFIG");
    }
}

#[test]
#[serial]
fn env_pointing_at_missing_file_does_not_create_template() {
    let td = tempdir().unwrap();
    let cfg = td.path().join("absent.xml");
    unsafe {
        std::env::set_var("LAZY_MIGRATE_CONFIG", &cfg);
    }

    let res = load_or_init(None).unwrap();
    assert!(matches!(res, LoadResult::Missing(ref p) if p == &cfg), "got {res:?}");
    assert!(!cfg.exists());

    unsafe {
        std::env::remove_var("LAZY_MIGRATE_CONFIG");
    }
}

#[test]
#[serial]
fn env_file_is_loaded() {
    let td = tempdir().unwrap();
    let cfg = td.path().join("config.xml");
    fs::write(
        &cfg,
        "<config><old_root>/data/a</old_root><new_root>/data/b</new_root></config>",
    )
    .unwrap();
    unsafe {
        std::env::set_var("LAZY_MIGRATE_CONFIG", &cfg);
    }

    match load_or_init(None).unwrap() {
        LoadResult::Loaded(c, p) => {
            assert_eq!(p, cfg);
            assert_eq!(c.old_root, std::path::PathBuf::from("/data/a"));
            assert_eq!(c.new_root, std::path::PathBuf::from("/data/b"));
        }
        other => panic!("unexpected: {other:?}"),
    }

    unsafe {
        std::env::remove_var("LAZY_MIGRATE_CONFIG");
    }
}

#[test]
fn explicit_missing_path_is_an_error() {
    let td = tempdir().unwrap();
    let err = load_or_init(Some(&td.path().join("nope.xml"))).unwrap_err();
    assert!(err.to_string().contains("config file not found"));
}
