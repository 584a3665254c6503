//! Property tests for path canonicalisation and store round trips

use neuro_casio::core::types::PathKey;
use neuro_casio::fs::{FlatStore, MemoryStore, PathIndex};
use proptest::prelude::*;

fn raw_path() -> impl Strategy<Value = String> {
    let segment = prop_oneof![
        4 => "[a-z0-9_]{1,4}",
        1 => Just(".".to_string()),
        1 => Just("..".to_string()),
        1 => Just(String::new()),
    ];
    prop::collection::vec(segment, 0..8).prop_map(|segs| format!("/{}", segs.join("/")))
}

fn name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,6}"
}

proptest! {
    #[test]
    fn parsed_paths_are_canonical(raw in raw_path()) {
        let key = PathKey::parse(&raw).unwrap();
        let s = key.as_str();

        prop_assert!(s.starts_with('/'));
        prop_assert!(!s.contains("//"));
        prop_assert!(key.is_root() || !s.ends_with('/'));
        prop_assert!(s.split('/').skip(1).all(|seg| seg != "." && seg != ".."));
        prop_assert_eq!(PathKey::parse(s).unwrap(), key);
    }

    #[test]
    fn parent_is_a_prefix(raw in raw_path()) {
        let key = PathKey::parse(&raw).unwrap();
        match key.parent() {
            None => prop_assert!(key.is_root()),
            Some(parent) => {
                prop_assert!(key.is_descendant_of(&parent));
                let expected = parent.join(key.name().unwrap()).unwrap();
                prop_assert_eq!(expected, key);
            }
        }
    }

    #[test]
    fn write_then_read_returns_exact_bytes(
        file in name(),
        bytes in prop::collection::vec(any::<u8>(), 0..512),
    ) {
        let store = MemoryStore::new();
        let index = PathIndex::new(&store);
        let path = PathKey::parse(&format!("/{}", file)).unwrap();

        index.write_file(&path, bytes.clone()).unwrap();
        prop_assert_eq!(index.read_file(&path).unwrap(), bytes);
    }

    #[test]
    fn make_dir_then_exists(dirs in prop::collection::vec(name(), 1..5)) {
        let store = MemoryStore::new();
        let index = PathIndex::new(&store);

        let mut path = PathKey::root();
        for dir in &dirs {
            path = path.join(dir).unwrap();
            index.make_dir(&path).unwrap();
            prop_assert!(index.exists(&path));
            prop_assert!(index.is_directory(&path));
        }
        prop_assert_eq!(store.len(), dirs.len() + 1);
    }

    #[test]
    fn prefix_scan_stays_inside_boundary(
        base in name(),
        suffix in "[a-z0-9]{1,3}",
        child in name(),
    ) {
        let store = MemoryStore::new();
        let index = PathIndex::new(&store);
        let dir = PathKey::parse(&format!("/{}", base)).unwrap();
        let sibling = PathKey::parse(&format!("/{}{}", base, suffix)).unwrap();
        index.make_dir(&dir).unwrap();
        index.make_dir(&sibling).unwrap();
        index.write_file(&sibling.join(&child).unwrap(), Vec::new()).unwrap();

        let leaked = store.scan_prefix(dir.as_str()).count();
        prop_assert_eq!(leaked, 0);
    }
}
