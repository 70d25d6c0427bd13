#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::store::MemoryStore;
    use serde_json::json;
    use std::thread::sleep;

    const ID_A: &str = "aaaaaaaaaaaaaaaaaaaaaaaa";
    const ID_B: &str = "bbbbbbbbbbbbbbbbbbbbbbbb";
    const ID_C: &str = "cccccccccccccccccccccccc";

    fn person(hex: &str, age: i64) -> serde_json::Value {
        json!({"_id": {"$oid": hex}, "age": age})
    }

    fn seeded_engine() -> (ProjectionEngine, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        store.upsert("test", "people", person(ID_A, 25)).unwrap();
        store.upsert("test", "people", person(ID_B, 0)).unwrap();
        store.upsert("test", "people", person(ID_C, 27)).unwrap();
        let engine = ProjectionEngine::new(store.clone() as Arc<dyn DocumentStore>);
        (engine, store)
    }

    #[test]
    fn root_lists_databases_and_dot_entries() {
        let (engine, store) = seeded_engine();
        store.upsert("other", "c", person(ID_A, 1)).unwrap();
        let names = engine.list("/").unwrap();
        assert!(names.contains(&".".to_string()));
        assert!(names.contains(&"..".to_string()));
        assert!(names.contains(&"test".to_string()));
        assert!(names.contains(&"other".to_string()));
    }

    #[test]
    fn database_lists_collections() {
        let (engine, store) = seeded_engine();
        store.create_collection("test", "places").unwrap();
        let names = engine.list("/test").unwrap();
        assert!(names.contains(&"people".to_string()));
        assert!(names.contains(&"places".to_string()));
    }

    #[test]
    fn collection_lists_every_document_by_default() {
        let (engine, _) = seeded_engine();
        let names = engine.list("/test/people").unwrap();
        assert!(names.contains(&format!("{ID_A}.json")));
        assert!(names.contains(&format!("{ID_B}.json")));
        assert!(names.contains(&format!("{ID_C}.json")));
    }

    #[test]
    fn saved_filter_narrows_the_listing() {
        let (engine, _) = seeded_engine();
        engine
            .write("/test/people/query.json", br#"{"age": {"$lte": 25}}"#)
            .unwrap();
        let names = engine.list("/test/people").unwrap();
        assert!(names.contains(&format!("{ID_A}.json")));
        assert!(names.contains(&format!("{ID_B}.json")));
        assert!(!names.contains(&format!("{ID_C}.json")));
        assert!(names.contains(&"query.json".to_string()));
    }

    #[test]
    fn malformed_filter_lists_zero_documents() {
        let (engine, _) = seeded_engine();
        engine.write("/test/people/query.json", b"{broken").unwrap();
        let names = engine.list("/test/people").unwrap();
        assert_eq!(names, vec![".", "..", "query.json"]);
    }

    #[test]
    fn query_text_round_trips_byte_identical() {
        let (engine, _) = seeded_engine();
        let text = br#"{"age": {"$gt": 10}}"#;
        engine.write("/test/people/query.json", text).unwrap();
        let back = engine.read("/test/people/query.json", 0, 1024).unwrap();
        assert_eq!(back, text);
        let attr = engine.stat("/test/people/query.json").unwrap();
        assert_eq!(attr.size, text.len() as u64);
        assert!(!attr.is_dir());
    }

    #[test]
    fn read_slices_by_offset_and_length() {
        let (engine, _) = seeded_engine();
        engine.write("/test/people/query.json", b"0123456789").unwrap();
        assert_eq!(engine.read("/test/people/query.json", 2, 3).unwrap(), b"234");
        assert_eq!(engine.read("/test/people/query.json", 8, 10).unwrap(), b"89");
        assert!(engine.read("/test/people/query.json", 50, 10).unwrap().is_empty());
    }

    #[test]
    fn parameterized_view_filters_by_folder_name() {
        let (engine, _) = seeded_engine();
        engine.mkdir("/test/people/by_age").unwrap();

        // The view folder itself holds an unresolved placeholder: fail-safe empty.
        let names = engine.list("/test/people/by_age").unwrap();
        assert_eq!(names, vec![".", "..", "query.json"]);

        engine.mkdir("/test/people/by_age/25").unwrap();
        let names = engine.list("/test/people/by_age/25").unwrap();
        assert!(names.contains(&format!("{ID_A}.json")));
        assert!(!names.contains(&format!("{ID_B}.json")));
        assert!(!names.contains(&format!("{ID_C}.json")));

        // The view folder appears in its parent's listing and stats as a dir.
        assert!(engine
            .list("/test/people")
            .unwrap()
            .contains(&"by_age".to_string()));
        assert!(engine.stat("/test/people/by_age").unwrap().is_dir());
        assert!(engine.stat("/test/people/by_age/25").unwrap().is_dir());
    }

    #[test]
    fn dotted_database_name_never_lists_documents() {
        let store = Arc::new(MemoryStore::new());
        store.upsert("my.db", "c", person(ID_A, 1)).unwrap();
        let engine = ProjectionEngine::new(store as Arc<dyn DocumentStore>);
        assert_eq!(engine.list("/my.db/c").unwrap(), vec![".", ".."]);
    }

    #[test]
    fn document_read_returns_canonical_json() {
        let (engine, _) = seeded_engine();
        let path = format!("/test/people/{ID_A}.json");
        let data = engine.read(&path, 0, 4096).unwrap();
        let doc = codec::decode(&data).unwrap();
        assert_eq!(doc["age"], json!(25));
        assert_eq!(doc["_id"], json!({"$oid": ID_A}));
        // stat size matches the canonical text length.
        assert_eq!(engine.stat(&path).unwrap().size, data.len() as u64);
    }

    #[test]
    fn write_injects_identifier_from_filename() {
        let (engine, store) = seeded_engine();
        let hex = "dddddddddddddddddddddddd";
        let path = format!("/test/people/{hex}.json");
        engine.write(&path, br#"{"name": "fresh"}"#).unwrap();
        let id = ObjectId::parse_str(hex).unwrap();
        let doc = store.find_one("test", "people", id).unwrap().unwrap();
        assert_eq!(doc["name"], json!("fresh"));
        assert_eq!(doc["_id"], json!({"$oid": hex}));
    }

    #[test]
    fn write_rejects_malformed_document_body() {
        let (engine, store) = seeded_engine();
        let hex = "dddddddddddddddddddddddd";
        let path = format!("/test/people/{hex}.json");
        assert!(matches!(
            engine.write(&path, b"{not json"),
            Err(FsError::InvalidDocument(_))
        ));
        assert!(matches!(
            engine.write(&path, b"[1, 2]"),
            Err(FsError::InvalidDocument(_))
        ));
        let id = ObjectId::parse_str(hex).unwrap();
        assert!(store.find_one("test", "people", id).unwrap().is_none());
    }

    #[test]
    fn new_json_inserts_a_fresh_document() {
        let (engine, store) = seeded_engine();
        engine
            .write("/test/people/new.json", br#"{"foo": "bar"}"#)
            .unwrap();
        let found = store
            .find("test", "people", &json!({"foo": "bar"}))
            .unwrap();
        assert_eq!(found.len(), 1);
        assert!(codec::document_id(&found[0]).is_some());
        // Write-only creation target: never listed, never stat-able.
        assert!(!engine
            .list("/test/people")
            .unwrap()
            .contains(&"new.json".to_string()));
        assert!(matches!(
            engine.stat("/test/people/new.json"),
            Err(FsError::NotFound)
        ));
    }

    #[test]
    fn unlink_removes_the_backing_record() {
        let (engine, store) = seeded_engine();
        let path = format!("/test/people/{ID_A}.json");
        // Populate the cache first so eviction is also covered.
        engine.list("/test/people").unwrap();
        engine.unlink(&path).unwrap();
        assert!(matches!(engine.stat(&path), Err(FsError::NotFound)));
        let id = ObjectId::parse_str(ID_A).unwrap();
        assert!(store.find_one("test", "people", id).unwrap().is_none());
    }

    #[test]
    fn unlink_reports_failures_explicitly() {
        let (engine, _) = seeded_engine();
        assert!(matches!(
            engine.unlink("/test/people/not-an-id.json"),
            Err(FsError::NotFound)
        ));
        assert!(matches!(
            engine.unlink(&format!("/test/people/{}.json", "eeeeeeeeeeeeeeeeeeeeeeee")),
            Err(FsError::NotFound)
        ));
        assert!(matches!(
            engine.unlink("/test/people"),
            Err(FsError::Unsupported)
        ));
        assert!(matches!(engine.unlink("/test"), Err(FsError::Unsupported)));
    }

    #[test]
    fn create_marks_a_pending_document() {
        let (engine, _) = seeded_engine();
        let hex = "dddddddddddddddddddddddd";
        let path = format!("/test/people/{hex}.json");
        let fh = engine.create(&path).unwrap();
        let fh2 = engine.create("/test/people/new.json").unwrap();
        assert!(fh2 > fh, "handles increase monotonically");

        // Not in the store yet, but visible as an empty placeholder.
        let attr = engine.stat(&path).unwrap();
        assert_eq!(attr.size, 0);
        assert!(engine.read(&path, 0, 1024).unwrap().is_empty());
        assert!(engine
            .list("/test/people")
            .unwrap()
            .contains(&format!("{hex}.json")));

        engine.write(&path, br#"{"age": 1}"#).unwrap();
        assert!(engine.stat(&path).unwrap().size > 0);
    }

    #[test]
    fn create_query_file_seeds_match_all() {
        let (engine, _) = seeded_engine();
        engine.create("/test/people/query.json").unwrap();
        assert_eq!(engine.read("/test/people/query.json", 0, 16).unwrap(), b"{}");
        assert_eq!(engine.stat("/test/people/query.json").unwrap().size, 2);
    }

    #[test]
    fn truncate_applies_only_to_query_files() {
        let (engine, store) = seeded_engine();
        engine
            .write("/test/people/query.json", br#"{"age": 25}"#)
            .unwrap();
        engine.truncate("/test/people/query.json", 0).unwrap();
        assert_eq!(engine.stat("/test/people/query.json").unwrap().size, 0);

        // Documents are untouched by truncate.
        let path = format!("/test/people/{ID_A}.json");
        engine.truncate(&path, 0).unwrap();
        let id = ObjectId::parse_str(ID_A).unwrap();
        assert!(store.find_one("test", "people", id).unwrap().is_some());
    }

    #[test]
    fn mkdir_materializes_a_database() {
        let (engine, store) = seeded_engine();
        engine.mkdir("/brand_new").unwrap();
        assert!(engine.list("/").unwrap().contains(&"brand_new".to_string()));
        assert_eq!(store.list_collections("brand_new").unwrap(), vec!["tmp"]);
        assert!(engine.stat("/brand_new").unwrap().is_dir());
    }

    #[test]
    fn mkdir_creates_a_collection() {
        let (engine, _) = seeded_engine();
        engine.mkdir("/test/places").unwrap();
        assert!(engine
            .list("/test")
            .unwrap()
            .contains(&"places".to_string()));
        assert!(engine.stat("/test/places").unwrap().is_dir());
    }

    #[test]
    fn stat_misses_are_not_found() {
        let (engine, _) = seeded_engine();
        assert!(matches!(engine.stat("/absent"), Err(FsError::NotFound)));
        assert!(matches!(engine.stat("/test/absent"), Err(FsError::NotFound)));
        assert!(matches!(
            engine.stat("/test/people/query.json"),
            Err(FsError::NotFound)
        ));
        assert!(matches!(
            engine.stat("/test/people/not-an-id.json"),
            Err(FsError::NotFound)
        ));
        assert!(matches!(
            engine.stat("/test/people/subfolder"),
            Err(FsError::NotFound)
        ));
        assert!(matches!(engine.stat("relative"), Err(FsError::InvalidPath)));
    }

    #[test]
    fn listing_caches_attributes_until_ttl() {
        let store = Arc::new(MemoryStore::new());
        store.upsert("test", "people", person(ID_A, 25)).unwrap();
        let engine = ProjectionEngine::with_cache_ttl(
            store.clone() as Arc<dyn DocumentStore>,
            Duration::from_millis(40),
        );
        let path = format!("/test/people/{ID_A}.json");
        engine.list("/test/people").unwrap();

        // External mutation the cache hides until expiry.
        let id = ObjectId::parse_str(ID_A).unwrap();
        store.remove("test", "people", id).unwrap();
        assert!(engine.stat(&path).is_ok(), "cache entry still live");

        sleep(Duration::from_millis(60));
        assert!(matches!(engine.stat(&path), Err(FsError::NotFound)));
    }

    #[test]
    fn write_to_unwritable_nodes_is_a_silent_noop() {
        let (engine, store) = seeded_engine();
        assert_eq!(engine.write("/test/people/junk.json", b"{}").unwrap(), 0);
        assert_eq!(engine.write("/test", b"{}").unwrap(), 0);
        assert_eq!(store.find("test", "people", &json!({})).unwrap().len(), 3);
    }

    #[test]
    fn statfs_reports_fixed_placeholders() {
        let (engine, _) = seeded_engine();
        let stats = engine.statfs();
        assert_eq!(stats.bsize, 512);
        assert_eq!(stats.namelen, 255);
        assert!(stats.blocks > 0);
    }
}
