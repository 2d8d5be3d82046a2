use profile_store::core::document;
use profile_store::{
    ChangeCause, Profile, ProfileError, ProfileStore, ReloadPolicy, StoreConfig, Validation,
    ValueKind,
};
use serde_json::{Map, Value, json};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn obj(value: Value) -> Map<String, Value> {
    value.as_object().cloned().expect("object literal")
}

fn write_json(path: &Path, value: Value) {
    fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
    fs::write(path, serde_json::to_string(&value).expect("encode")).expect("write fixture");
}

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).expect("read")).expect("parse")
}

/// `global` at `<root>/global`, `local` at `<root>/local` inheriting it.
fn global_local(root: &Path) -> ProfileStore {
    let store = ProfileStore::new(StoreConfig::default());
    store
        .register("global", root.join("global"), None)
        .expect("register global");
    store
        .register("local", root.join("local"), Some("global"))
        .expect("register local");
    store
}

fn user_profiles(root: &Path) -> (ProfileStore, Profile, Profile) {
    write_json(
        &root.join("global/user.json"),
        json!({
            "name": "v...",
            "info": { "timestamp": 1505185942887u64 },
            "page": { "foo": true, "bar": true }
        }),
    );
    write_json(
        &root.join("local/user.json"),
        json!({ "name": "VisualSJ", "page": { "bar": false } }),
    );
    let store = global_local(root);
    let global = store.load("profile://global/user.json").expect("load global");
    let local = store.load("profile://local/user.json").expect("load local");
    (store, global, local)
}

#[test]
fn load_resolves_inherited_values_through_chain() {
    let tmp = tempdir().expect("tempdir");
    let (_store, global, local) = user_profiles(tmp.path());

    assert_eq!(global.get("name"), Some(json!("v...")));
    assert_eq!(local.get("name"), Some(json!("VisualSJ")));
    assert_eq!(global.get("info.timestamp"), Some(json!(1505185942887u64)));
    assert_eq!(local.get("info.timestamp"), Some(json!(1505185942887u64)));
    assert_eq!(local.get("page.bar"), Some(json!(false)));
    assert_eq!(local.get("page.foo"), None, "nested objects are not merged");
    assert_eq!(local.get("a.b.c.d"), None);
}

#[test]
fn identity_is_shared_per_locator() {
    let tmp = tempdir().expect("tempdir");
    let store = global_local(tmp.path());

    let a = store.load("profile://local/prefs.json").expect("load");
    let b = store.load("profile://local/prefs.json").expect("load again");
    assert!(a.same_instance(&b));

    a.set("zoom", 2).expect("set");
    assert_eq!(b.get("zoom"), Some(json!(2)));

    let other = store.load("profile://global/prefs.json").expect("load global");
    assert!(!other.same_instance(&a));
}

#[test]
fn load_creates_missing_file_and_survives_corrupt_file() {
    let tmp = tempdir().expect("tempdir");
    let store = global_local(tmp.path());

    let fresh = store.load("profile://global/fresh.json").expect("load");
    assert!(fresh.data().is_empty());
    assert_eq!(read_json(&tmp.path().join("global/fresh.json")), json!({}));

    let corrupt_path = tmp.path().join("global/corrupt.json");
    fs::write(&corrupt_path, "{ definitely not json").expect("write");
    let corrupt = store.load("profile://global/corrupt.json").expect("load corrupt");
    assert!(corrupt.data().is_empty());
}

#[test]
fn load_rejects_bad_scheme_and_unknown_type() {
    let tmp = tempdir().expect("tempdir");
    let store = global_local(tmp.path());

    assert!(matches!(
        store.load("file://global/user.json"),
        Err(ProfileError::InvalidLocator { .. })
    ));
    assert!(matches!(
        store.load("profile://nowhere/user.json"),
        Err(ProfileError::UnknownType(name)) if name == "nowhere"
    ));
    assert!(store.loaded().is_empty());
}

#[test]
fn type_names_must_be_addressable() {
    let tmp = tempdir().expect("tempdir");
    let store = ProfileStore::new(StoreConfig::default());
    for bad in ["", "a/b", "x:y"] {
        assert!(matches!(
            store.register(bad, tmp.path().join("bad"), None),
            Err(ProfileError::InvalidTypeName { .. })
        ));
    }
    assert!(store.types().is_empty());
}

#[test]
fn reading_through_ancestors_leaves_their_files_alone() {
    let tmp = tempdir().expect("tempdir");
    let store = global_local(tmp.path());
    let global_file = tmp.path().join("global/lazy.json");

    let local = store.load("profile://local/lazy.json").expect("load");
    assert_eq!(local.get("theme"), None);
    assert!(tmp.path().join("local/lazy.json").exists());
    assert!(!global_file.exists());

    let global = store.load("profile://global/lazy.json").expect("load");
    assert!(global_file.exists());
    global.set("theme", "dark").expect("set");
    assert_eq!(local.get("theme"), Some(json!("dark")));
}

#[test]
fn local_value_wins_even_when_falsy() {
    let tmp = tempdir().expect("tempdir");
    write_json(
        &tmp.path().join("global/inherit.json"),
        json!({ "foo": "foo", "bar": "bar" }),
    );
    write_json(&tmp.path().join("local/inherit.json"), json!({ "bar": "" }));
    let store = global_local(tmp.path());

    let local = store.load("profile://local/inherit.json").expect("load");
    assert_eq!(local.get("bar"), Some(json!("")));
    assert_eq!(local.get("foo"), Some(json!("foo")));
}

#[test]
fn stored_null_is_distinct_from_absent() {
    let tmp = tempdir().expect("tempdir");
    let store = global_local(tmp.path());
    let global = store.load("profile://global/nulls.json").expect("load");
    let local = store.load("profile://local/nulls.json").expect("load");

    global.set("cleared", Value::Null).expect("set null");
    assert_eq!(global.get("cleared"), Some(Value::Null));
    assert_eq!(local.get("cleared"), Some(Value::Null));
    assert_eq!(local.get("never"), None);
}

#[test]
fn set_writes_only_the_leaf_type() {
    let tmp = tempdir().expect("tempdir");
    let (_store, global, local) = user_profiles(tmp.path());

    local.set("a.b.c.d", 0).expect("set nested");
    assert_eq!(global.get("a.b.c.d"), None);
    assert_eq!(local.get("a.b.c.d"), Some(json!(0)));

    global.set("e", "").expect("set e");
    assert_eq!(global.get("e"), Some(json!("")));
    assert_eq!(local.get("e"), Some(json!("")));

    local.set("e", "1").expect("override e");
    assert_eq!(global.get("e"), Some(json!("")));
    assert_eq!(local.get("e"), Some(json!("1")));
}

#[test]
fn dotted_set_builds_nested_structure() {
    let tmp = tempdir().expect("tempdir");
    let store = global_local(tmp.path());
    let profile = store.load("profile://local/tree.json").expect("load");

    profile.set("a.b.c", "").expect("set");
    assert_eq!(profile.get("a.b.c"), Some(json!("")));
    assert_eq!(profile.get("a"), Some(json!({ "b": { "c": "" } })));

    profile.set("scalar", 3).expect("set scalar");
    profile.set("scalar.deeper", true).expect("coerce scalar");
    assert_eq!(profile.get("scalar"), Some(json!({ "deeper": true })));
}

#[test]
fn dotted_paths_index_into_arrays() {
    let tmp = tempdir().expect("tempdir");
    let store = global_local(tmp.path());
    let global = store.load("profile://global/lists.json").expect("load");
    let local = store.load("profile://local/lists.json").expect("load");
    global.set("list", json!([1, 2])).expect("set list");

    assert_eq!(global.get("list.0"), Some(json!(1)));
    assert_eq!(local.get("list.1"), Some(json!(2)));
    assert_eq!(global.get("list.5"), None);

    global.set("list.0", 5).expect("set element");
    assert_eq!(global.get("list"), Some(json!([5, 2])));

    global.set("list.2", json!({ "x": 1 })).expect("append");
    global.set("list.2.y", true).expect("set inside element");
    assert_eq!(global.get("list"), Some(json!([5, 2, { "x": 1, "y": true }])));

    assert_eq!(global.delete("list.1"), Some(json!(2)));
    assert_eq!(global.delete("list.9"), None);
    assert_eq!(global.get("list"), Some(json!([5, { "x": 1, "y": true }])));
}

#[test]
fn array_elements_pass_root_schema() {
    let tmp = tempdir().expect("tempdir");
    let store = global_local(tmp.path());
    let local = store.load("profile://local/recent.json").expect("load");
    store
        .register_schema(
            "profile://global/recent.json",
            &obj(json!({ "files": ["a.txt"], "count": 0 })),
        )
        .expect("schema");

    assert_eq!(local.get("files.0"), Some(json!(["a.txt"])));
    local.set("files", json!(["b.txt"])).expect("set list");
    local.set("files.1", "c.txt").expect("append element");
    assert_eq!(local.get("files"), Some(json!(["b.txt", "c.txt"])));
    assert!(local.set("count.0", 1).is_err());
}

#[test]
fn get_returns_independent_copies() {
    let tmp = tempdir().expect("tempdir");
    let store = global_local(tmp.path());
    let profile = store.load("profile://global/copy.json").expect("load");
    profile.set("list", json!([1, 2])).expect("set");

    let mut copy = profile.get("list").expect("present");
    copy.as_array_mut().expect("array").push(json!(3));
    assert_eq!(profile.get("list"), Some(json!([1, 2])));
}

#[test]
fn delete_falls_back_to_ancestor() {
    let tmp = tempdir().expect("tempdir");
    let (_store, global, local) = user_profiles(tmp.path());

    global.set("e", "").expect("set");
    local.set("e", "1").expect("set");

    assert_eq!(local.delete("e"), Some(json!("1")));
    assert_eq!(local.get("e"), Some(json!("")));

    global.delete("e");
    assert_eq!(local.get("e"), None);

    assert_eq!(local.delete("missing.path.leaf"), None);
    assert_eq!(local.delete("name"), Some(json!("VisualSJ")));
    assert_eq!(local.get("name"), Some(json!("v...")));
}

#[test]
fn save_overwrites_file_and_round_trips_into_new_store() {
    let tmp = tempdir().expect("tempdir");
    let (_store, global, local) = user_profiles(tmp.path());

    local.set("info.time", "1234567890").expect("set");
    local.save().expect("save");

    let on_disk = read_json(&tmp.path().join("local/user.json"));
    assert_eq!(on_disk["info"]["time"], json!("1234567890"));
    assert!(on_disk.get("info").and_then(|i| i.get("timestamp")).is_none());

    let global_disk = read_json(&tmp.path().join("global/user.json"));
    assert_eq!(global_disk["name"], json!("v..."));
    drop(global);

    let restarted = global_local(tmp.path());
    let again = restarted.load("profile://local/user.json").expect("reload");
    assert_eq!(Value::Object(again.data()), Value::Object(local.data()));
}

#[test]
fn saved_file_is_pretty_printed_with_two_spaces() {
    let tmp = tempdir().expect("tempdir");
    let store = global_local(tmp.path());
    let profile = store.load("profile://global/pretty.json").expect("load");
    profile.set("a", json!({ "b": 1 })).expect("set");
    profile.save().expect("save");

    let text = fs::read_to_string(tmp.path().join("global/pretty.json")).expect("read");
    assert_eq!(text, "{\n  \"a\": {\n    \"b\": 1\n  }\n}\n");
}

#[test]
fn save_failure_propagates() {
    let tmp = tempdir().expect("tempdir");
    let blocker = tmp.path().join("blocked");
    fs::write(&blocker, "not a directory").expect("write");

    let store = ProfileStore::new(StoreConfig::default());
    store.register("broken", &blocker, None).expect("register");
    let profile = store.load("profile://broken/user.json").expect("load degrades");
    profile.set("x", 1).expect("set");

    let err = profile.save().expect_err("save must fail");
    assert!(matches!(err, ProfileError::Persistence { .. }));
}

#[test]
fn reload_replaces_by_default() {
    let tmp = tempdir().expect("tempdir");
    let (_store, _global, local) = user_profiles(tmp.path());

    local.set("reload.test", true).expect("set");
    assert_eq!(local.get("reload.test"), Some(json!(true)));
    local.reload();
    assert_eq!(local.get("reload.test"), None);
    assert_eq!(local.get("name"), Some(json!("VisualSJ")));
}

#[test]
fn reload_merge_policy_keeps_memory_only_keys() {
    let tmp = tempdir().expect("tempdir");
    let config = StoreConfig {
        reload: ReloadPolicy::Merge,
        ..StoreConfig::default()
    };
    let store = ProfileStore::new(config);
    store
        .register("global", tmp.path().join("global"), None)
        .expect("register");
    write_json(&tmp.path().join("global/m.json"), json!({ "a": 1 }));
    let profile = store.load("profile://global/m.json").expect("load");

    profile.set("a", 5).expect("set");
    profile.set("only_memory", true).expect("set");
    write_json(&tmp.path().join("global/m.json"), json!({ "a": 2, "b": 3 }));
    profile.reload();

    assert_eq!(profile.get("a"), Some(json!(2)));
    assert_eq!(profile.get("b"), Some(json!(3)));
    assert_eq!(profile.get("only_memory"), Some(json!(true)));
}

#[test]
fn reload_of_corrupt_file_is_a_no_op() {
    let tmp = tempdir().expect("tempdir");
    let store = global_local(tmp.path());
    let profile = store.load("profile://global/c.json").expect("load");
    profile.set("keep", 1).expect("set");

    fs::write(tmp.path().join("global/c.json"), "{ broken").expect("write");
    profile.reload();
    assert_eq!(profile.get("keep"), Some(json!(1)));
}

#[test]
fn clear_falls_through_until_reload() {
    let tmp = tempdir().expect("tempdir");
    let (_store, _global, local) = user_profiles(tmp.path());

    assert_eq!(local.get("name"), Some(json!("VisualSJ")));
    local.clear();
    assert_eq!(local.get("name"), Some(json!("v...")));
    assert!(tmp.path().join("local/user.json").exists());
    local.reload();
    assert_eq!(local.get("name"), Some(json!("VisualSJ")));
}

#[test]
fn reset_replaces_all_local_keys() {
    let tmp = tempdir().expect("tempdir");
    let store = global_local(tmp.path());
    let profile = store.load("profile://global/reset.json").expect("load");
    profile.set("name", "Y").expect("set");
    profile.set("age", 5).expect("set");

    profile.reset(obj(json!({ "name": "X" })));
    assert_eq!(profile.get("age"), None);
    assert_eq!(profile.get("name"), Some(json!("X")));
}

#[test]
fn schema_supplies_defaults_and_rejects_bad_writes() {
    let tmp = tempdir().expect("tempdir");
    let store = ProfileStore::new(StoreConfig::default());
    store
        .register("fixtures", tmp.path().join("fixtures"), None)
        .expect("register");
    write_json(
        &tmp.path().join("fixtures/profiles/type.json"),
        json!({ "default": "foo" }),
    );
    let profile = store
        .load("profile://fixtures/profiles/type.json")
        .expect("load");
    store
        .register_schema(
            "profile://fixtures/profiles/type.json",
            &obj(json!({ "default": "bar", "string": "string", "number": 0, "boolean": true })),
        )
        .expect("schema");

    assert_eq!(profile.get("default"), Some(json!("foo")));
    assert_eq!(profile.get("string"), Some(json!("string")));
    assert_eq!(profile.get("number"), Some(json!(0)));
    assert_eq!(profile.get("boolean"), Some(json!(true)));

    let err = profile.set("string", 0).expect_err("type mismatch");
    assert!(matches!(
        err,
        ProfileError::SchemaRejection {
            verdict: Validation::TypeMismatch {
                expected: ValueKind::String,
                found: ValueKind::Number
            },
            ..
        }
    ));
    assert_eq!(profile.get("string"), Some(json!("string")));

    profile.set("string", "foo").expect("valid write");
    assert_eq!(profile.get("string"), Some(json!("foo")));

    let err = profile.set("unknown", "unknown").expect_err("closed schema");
    assert!(matches!(
        err,
        ProfileError::SchemaRejection {
            verdict: Validation::UnknownKey,
            ..
        }
    ));
    assert_eq!(profile.get("unknown"), None);

    profile.delete("string");
    assert_eq!(profile.get("string"), Some(json!("string")));
}

#[test]
fn schema_on_root_governs_the_whole_chain() {
    let tmp = tempdir().expect("tempdir");
    write_json(
        &tmp.path().join("global/inherit.json"),
        json!({ "foo": "foo", "bar": "bar" }),
    );
    write_json(&tmp.path().join("local/inherit.json"), json!({ "bar": "" }));
    let store = global_local(tmp.path());
    let global = store.load("profile://global/inherit.json").expect("load");
    let local = store.load("profile://local/inherit.json").expect("load");

    store
        .register_schema(
            "profile://global/inherit.json",
            &obj(json!({ "foo": "", "bar": "", "boolean": true })),
        )
        .expect("root schema");
    let err = store
        .register_schema("profile://local/inherit.json", &obj(json!({ "foo": 0 })))
        .expect_err("non-root schema");
    assert!(matches!(err, ProfileError::NonRootSchema { .. }));

    assert!(local.set("foo", 2).is_err());
    assert_eq!(global.get("foo"), Some(json!("foo")));
    assert_eq!(local.get("foo"), Some(json!("foo")));

    global.set("foo", "abc").expect("set on root");
    assert_eq!(global.get("foo"), Some(json!("abc")));
    assert_eq!(local.get("foo"), Some(json!("abc")));

    assert_eq!(local.get("boolean"), Some(json!(true)));
}

#[test]
fn schema_default_is_single_level() {
    let tmp = tempdir().expect("tempdir");
    let store = global_local(tmp.path());
    let profile = store.load("profile://global/window.json").expect("load");
    store
        .register_schema(
            "profile://global/window.json",
            &obj(json!({ "size": { "w": 800, "h": 600 } })),
        )
        .expect("schema");

    assert_eq!(profile.get("size"), Some(json!({ "w": 800, "h": 600 })));
    assert_eq!(profile.get("size.w"), Some(json!({ "w": 800, "h": 600 })));
    assert_eq!(profile.get("other.w"), None);
}

#[test]
fn load_with_defaults_layers_after_chain() {
    let tmp = tempdir().expect("tempdir");
    let store = global_local(tmp.path());
    let global = store.load("profile://global/user.json").expect("load");
    global.set("email", "g@example.com").expect("set");

    let local = store
        .load_with_defaults(
            "profile://local/user.json",
            obj(json!({ "name": "Johnny Wu", "email": "default@example.com" })),
        )
        .expect("load");

    assert_eq!(local.get("name"), Some(json!("Johnny Wu")));
    assert_eq!(local.get("email"), Some(json!("g@example.com")));
    assert_eq!(global.get("name"), Some(json!("Johnny Wu")));
}

#[test]
fn forward_parent_reference_is_picked_up_later() {
    let tmp = tempdir().expect("tempdir");
    write_json(&tmp.path().join("global/late.json"), json!({ "theme": "dark" }));

    let store = ProfileStore::new(StoreConfig::default());
    store
        .register("local", tmp.path().join("local"), Some("global"))
        .expect("dangling parent is allowed");
    let local = store.load("profile://local/late.json").expect("load");
    assert_eq!(local.get("theme"), None);

    let events = local.subscribe();
    store
        .register("global", tmp.path().join("global"), None)
        .expect("register parent");
    assert_eq!(local.get("theme"), Some(json!("dark")));
    assert_eq!(events.try_recv().expect("layering event").cause, ChangeCause::Layering);
}

#[test]
fn inherit_links_existing_types() {
    let tmp = tempdir().expect("tempdir");
    let store = ProfileStore::new(StoreConfig::default());
    store.register("global", tmp.path().join("g"), None).expect("register");
    store.register("local", tmp.path().join("l"), None).expect("register");
    store.inherit("local", "global").expect("inherit");

    let global = store.load("profile://global/x.json").expect("load");
    let local = store.load("profile://local/x.json").expect("load");
    global.set("k", "v").expect("set");
    assert_eq!(local.get("k"), Some(json!("v")));

    assert!(matches!(
        store.inherit("global", "local"),
        Err(ProfileError::InheritanceCycle { .. })
    ));
    assert_eq!(store.storage_dir("local"), Some(tmp.path().join("l")));
    assert_eq!(store.storage_dir("missing"), None);
}

#[test]
fn mutations_emit_changed_events() {
    let tmp = tempdir().expect("tempdir");
    let store = global_local(tmp.path());
    let profile = store.load("profile://global/events.json").expect("load");
    let events = profile.subscribe();

    profile.set("a", 1).expect("set");
    profile.delete("a");
    profile.clear();
    profile.reset(obj(json!({ "b": 2 })));
    profile.save().expect("save");
    profile.reload();

    let causes: Vec<ChangeCause> = events.try_iter().map(|e| e.cause).collect();
    assert_eq!(
        causes,
        vec![
            ChangeCause::Set,
            ChangeCause::Delete,
            ChangeCause::Clear,
            ChangeCause::Reset,
            ChangeCause::Save,
            ChangeCause::Reload,
        ]
    );
}

#[test]
fn rejected_writes_do_not_emit() {
    let tmp = tempdir().expect("tempdir");
    let store = global_local(tmp.path());
    let profile = store.load("profile://global/quiet.json").expect("load");
    let events = profile.subscribe();

    assert!(matches!(
        profile.set("bad key", 1),
        Err(ProfileError::IllegalPath(_))
    ));
    assert_eq!(profile.get("bad..key"), None);
    assert!(events.try_recv().is_err());
}

#[test]
fn reset_detaches_existing_profiles() {
    let tmp = tempdir().expect("tempdir");
    let (store, _global, local) = user_profiles(tmp.path());

    store.reset();
    assert!(store.types().is_empty());
    assert!(store.loaded().is_empty());

    assert_eq!(local.get("name"), Some(json!("VisualSJ")));
    assert_eq!(local.get("info.timestamp"), None);
    assert!(matches!(local.save(), Err(ProfileError::UnknownType(_))));
    assert!(matches!(
        store.load("profile://local/user.json"),
        Err(ProfileError::UnknownType(_))
    ));

    let store = global_local(tmp.path());
    let fresh = store.load("profile://local/user.json").expect("load");
    assert!(!fresh.same_instance(&local));
}

#[test]
fn configured_types_and_schemas_are_registered() {
    let tmp = tempdir().expect("tempdir");
    let root = tmp.path().display().to_string().replace('\\', "/");
    let config = StoreConfig::from_toml_str(&format!(
        r#"
        [[types]]
        name = "global"
        dir = "{root}/global"

        [[types]]
        name = "local"
        dir = "{root}/local"
        parent = "global"

        [[schemas]]
        locator = "profile://global/settings.json"
        example = {{ theme = "light", size = 12 }}
        "#
    ))
    .expect("config");
    let store = ProfileStore::new(config);

    let chain: Vec<String> = store.chain("local").into_iter().map(|t| t.name).collect();
    assert_eq!(chain, vec!["local", "global"]);

    let local = store.load("profile://local/settings.json").expect("load");
    assert_eq!(local.get("theme"), Some(json!("light")));
    assert!(local.set("size", "huge").is_err());
}

#[test]
fn document_render_matches_saved_bytes() {
    let data = obj(json!({ "k": [1, 2] }));
    let rendered = document::render(&data, 4).expect("render");
    assert_eq!(
        String::from_utf8(rendered).expect("utf8"),
        "{\n    \"k\": [\n        1,\n        2\n    ]\n}\n"
    );
}
