//! Module rename tolerance.
//!
//! Files written while a type lived in a legacy module must still load after
//! that module was renamed or merged, as long as the legacy name starts with
//! the current module's short name. Unrelated modules must fail cleanly.

use pretty_assertions::assert_eq;

use persist::{
    persist_record, CaseSensitivity, Error, MemoryFileSystem, PersistConfig, Persister,
    Record, TypeRef, Value, WriteMode,
};

/// Types as they were defined before the merge.
mod legacy {
    use super::persist_record;

    #[derive(Debug, Clone, PartialEq)]
    pub struct Key {
        pub label: String,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub struct Settings {
        pub rows: u32,
        pub keys: Vec<Key>,
    }

    persist_record!(Key in "Foo" { label: String });
    persist_record!(Settings in "Foo" { rows: u32, keys: Vec<Key> });

    /// Same type names, owned by an unrelated module.
    #[derive(Debug, Clone, PartialEq)]
    pub struct Foreign {
        pub rows: u32,
    }

    persist_record!(Foreign as "Settings" in "Bar" { rows: u32 });
}

/// Types after several legacy modules were consolidated.
mod merged {
    use super::persist_record;

    #[derive(Debug, Clone, PartialEq)]
    pub struct Key {
        pub label: String,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub struct Settings {
        pub rows: u32,
        pub keys: Vec<Key>,
    }

    persist_record!(Key in "Foo.Merged" { label: String });
    persist_record!(Settings in "Foo.Merged" { rows: u32, keys: Vec<Key> });
}

fn pair(current: &str, case: CaseSensitivity) -> (Persister<MemoryFileSystem>, Persister<MemoryFileSystem>) {
    let fs = MemoryFileSystem::new();
    let old = Persister::with_filesystem(fs.clone(), PersistConfig::new("Foo"));
    let new = Persister::with_filesystem(
        fs,
        PersistConfig::new(current).with_case_sensitivity(case),
    );
    (old, new)
}

#[test]
fn test_legacy_module_loads_after_merge() {
    let (old, new) = pair("Foo.Merged", CaseSensitivity::Sensitive);
    old.save(
        "settings.bin",
        &legacy::Settings { rows: 4, keys: vec![legacy::Key { label: "A".into() }] },
    )
    .unwrap();

    let loaded: merged::Settings = new.load("settings.bin").unwrap();
    assert_eq!(
        loaded,
        merged::Settings { rows: 4, keys: vec![merged::Key { label: "A".into() }] }
    );
}

#[test]
fn test_loaded_records_carry_current_identity() {
    let (old, new) = pair("Foo.Merged", CaseSensitivity::Sensitive);
    old.save("settings.bin", &legacy::Settings { rows: 1, keys: vec![] }).unwrap();

    new.register::<merged::Settings>().unwrap();
    let value = new.load_value("settings.bin").unwrap();
    assert_eq!(value.as_record().unwrap().type_ref, TypeRef::new("Settings", "Foo.Merged"));

    // Inspection shows what was recorded, not what it resolves to.
    let docs = new.export_json("settings.bin").unwrap();
    assert_eq!(docs[0]["$module"], "Foo");
}

#[test]
fn test_versioned_identity_is_remapped() {
    let fs = MemoryFileSystem::new();
    let writer = Persister::with_filesystem(fs.clone(), PersistConfig::default());
    let record = Record::new(TypeRef::new("Settings", "Foo.Legacy, Version=1.0.0"))
        .with_field("rows", 2u64)
        .with_field("keys", Value::List(vec![]));
    writer.save_value("v1.bin", &record.into(), WriteMode::Truncate).unwrap();

    let reader = Persister::with_filesystem(fs, PersistConfig::new("Foo.Merged"));
    let loaded: merged::Settings = reader.load("v1.bin").unwrap();
    assert_eq!(loaded, merged::Settings { rows: 2, keys: vec![] });
}

#[test]
fn test_unrelated_module_is_resolution_error() {
    let (old, new) = pair("Foo.Merged", CaseSensitivity::Sensitive);
    old.save("foreign.bin", &legacy::Foreign { rows: 9 }).unwrap();

    match new.load::<merged::Settings>("foreign.bin").unwrap_err() {
        Error::TypeResolutionError { type_name, module, attempted_module } => {
            assert_eq!(type_name, "Settings");
            assert_eq!(module, "Bar");
            assert_eq!(attempted_module, "Bar");
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn test_unregistered_type_is_resolution_error() {
    let (old, new) = pair("Foo.Merged", CaseSensitivity::Sensitive);
    old.save("settings.bin", &legacy::Settings { rows: 1, keys: vec![] }).unwrap();

    // Nothing registered on the reading side.
    let err = new.load_value("settings.bin").unwrap_err();
    assert!(matches!(err, Error::TypeResolutionError { .. }), "got {err:?}");
}

#[test]
fn test_prefix_comparison_is_case_sensitive_by_default() {
    let fs = MemoryFileSystem::new();
    let writer = Persister::with_filesystem(fs.clone(), PersistConfig::default());
    let record = Record::new(TypeRef::new("Settings", "foo.legacy"))
        .with_field("rows", 3u64)
        .with_field("keys", Value::List(vec![]));
    writer.save_value("lower.bin", &record.into(), WriteMode::Truncate).unwrap();

    let strict = Persister::with_filesystem(fs.clone(), PersistConfig::new("Foo.Merged"));
    let err = strict.load::<merged::Settings>("lower.bin").unwrap_err();
    assert!(matches!(err, Error::TypeResolutionError { .. }), "got {err:?}");

    let lenient = Persister::with_filesystem(
        fs,
        PersistConfig::new("Foo.Merged").with_case_sensitivity(CaseSensitivity::Insensitive),
    );
    assert_eq!(
        lenient.load::<merged::Settings>("lower.bin").unwrap(),
        merged::Settings { rows: 3, keys: vec![] }
    );
}

// ============================================================================
// Versioned identity vs. declared module
// ============================================================================

mod bci {
    use super::persist_record;

    #[derive(Debug, Clone, PartialEq)]
    pub struct Settings {
        pub scan_time_ms: u32,
    }

    persist_record!(Settings in "Acat.Bci" { scan_time_ms: u32 });

    #[derive(Debug, Clone, PartialEq)]
    pub struct Defaults {
        pub volume: f64,
    }

    persist_record!(Defaults in "persist-rs" { volume: f64 });
}

#[test]
fn test_same_process_roundtrip_with_versioned_identity() {
    let p = Persister::open_memory(PersistConfig::new("Acat.Bci, Version=2.0"));
    let settings = bci::Settings { scan_time_ms: 250 };
    p.save("settings.bin", &settings).unwrap();
    assert_eq!(p.load::<bci::Settings>("settings.bin").unwrap(), settings);

    let desc = p.resolve(&TypeRef::new("Settings", "Acat.Bci")).unwrap();
    assert!(desc.is::<bci::Settings>());
    assert_eq!(desc.type_ref.module, "Acat.Bci");
}

#[test]
fn test_default_identity_roundtrip() {
    let p = Persister::open_memory(PersistConfig::default());
    let defaults = bci::Defaults { volume: 0.5 };
    p.save("defaults.bin", &defaults).unwrap();
    assert_eq!(p.load::<bci::Defaults>("defaults.bin").unwrap(), defaults);
}

#[test]
fn test_legacy_module_found_in_current_family() {
    let fs = MemoryFileSystem::new();
    let writer = Persister::with_filesystem(fs.clone(), PersistConfig::default());
    let record = Record::new(TypeRef::new("Settings", "Acat.Legacy"))
        .with_field("scan_time_ms", 100u64);
    writer.save_value("old.bin", &record.into(), WriteMode::Truncate).unwrap();

    let reader = Persister::with_filesystem(fs, PersistConfig::new("Acat.Bci, Version=2.0"));
    let loaded: bci::Settings = reader.load("old.bin").unwrap();
    assert_eq!(loaded, bci::Settings { scan_time_ms: 100 });
}
