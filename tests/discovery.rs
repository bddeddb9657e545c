//! Discovery and registration integration tests

use std::collections::HashSet;
use std::path::Path;

use luy_nodes::nodes::{ModuleError, NodeLoader, ScanOptions};
use luy_nodes::{DisplayNameOverrides, NodeShape, discover_and_register};

mod common;
use common::{demo_root, node_module, write_module};

fn no_overrides() -> DisplayNameOverrides {
    DisplayNameOverrides::new()
}

#[test]
fn registers_every_well_formed_node() {
    let dir = tempfile::tempdir().unwrap();
    write_module(dir.path(), "chat.json", &node_module("ChatDeal", "chat"));
    write_module(dir.path(), "image/draw.json", &node_module("ImageDrawNode", "draw"));
    write_module(dir.path(), "image/mask.json", &node_module("ImageMaskNode", "mask"));

    let discovery = discover_and_register(dir.path(), &no_overrides()).unwrap();
    let registry = &discovery.registry;

    let names: HashSet<_> = registry.names().collect();
    assert_eq!(names, HashSet::from(["ChatDeal", "ImageDrawNode", "ImageMaskNode"]));

    let class_keys: Vec<_> = registry.class_mappings().keys().collect();
    let label_keys: Vec<_> = registry.display_name_mappings().keys().collect();
    assert_eq!(class_keys, label_keys);

    assert_eq!(registry.display_name("ChatDeal"), Some("Luy-ChatDeal"));
    assert!(discovery.report.load_errors.is_empty());
}

#[test]
fn rescan_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    write_module(dir.path(), "a.json", &node_module("FooNode", "run"));
    write_module(dir.path(), "b.json", &node_module("BarNode", "run"));

    let loader = NodeLoader::new(ScanOptions::default(), no_overrides());
    let first = loader.scan(dir.path()).unwrap().registry;
    let second = loader.scan(dir.path()).unwrap().registry;

    assert_eq!(first.len(), 2);
    assert!(first.names().eq(second.names()));
    for name in first.names() {
        assert_eq!(first.get(name).unwrap().id(), second.get(name).unwrap().id());
    }
}

#[test]
fn one_broken_file_does_not_stop_the_scan() {
    let dir = tempfile::tempdir().unwrap();
    write_module(dir.path(), "a.json", &node_module("ANode", "run"));
    write_module(dir.path(), "b.json", r#"{"attributes": {"BNode": "#);
    write_module(dir.path(), "c.json", &node_module("CNode", "run"));
    write_module(dir.path(), "d.json", &node_module("DNode", "run"));

    let discovery = discover_and_register(dir.path(), &no_overrides()).unwrap();

    assert_eq!(discovery.registry.len(), 3);
    assert!(!discovery.registry.contains("BNode"));
    assert_eq!(discovery.report.candidates, 4);
    assert_eq!(discovery.report.failed(), 1);

    let failure = &discovery.report.load_errors[0];
    assert!(failure.source.path.ends_with("b.json"));
    assert!(matches!(failure.error, ModuleError::Parse(_)));
}

#[test]
fn later_file_wins_name_collision() {
    let dir = tempfile::tempdir().unwrap();
    write_module(dir.path(), "a.json", &node_module("FooNode", "from_a"));
    write_module(dir.path(), "b.json", &node_module("FooNode", "from_b"));

    let discovery = discover_and_register(dir.path(), &no_overrides()).unwrap();

    let foo = discovery.registry.get("FooNode").unwrap();
    assert_eq!(foo.entry_point().and_then(|v| v.as_str()), Some("from_b"));
    assert_eq!(foo.module_tag(), Some("luy_scan.b"));
    assert_eq!(discovery.registry.len(), 1);

    let collisions = &discovery.report.collisions;
    assert_eq!(collisions.len(), 1);
    assert_eq!(collisions[0].name, "FooNode");
    assert_eq!(collisions[0].displaced_module.as_deref(), Some("luy_scan.a"));
    assert_eq!(collisions[0].module, "luy_scan.b");
}

#[test]
fn shared_class_reexported_is_not_a_collision() {
    let dir = tempfile::tempdir().unwrap();
    write_module(dir.path(), "base.json", &node_module("SharedNode", "run"));
    write_module(
        dir.path(),
        "user.json",
        r#"{"imports": [{"from": ".base", "names": ["SharedNode"]}]}"#,
    );

    let discovery = discover_and_register(dir.path(), &no_overrides()).unwrap();

    assert!(discovery.report.collisions.is_empty());
    assert_eq!(discovery.registry.len(), 1);
    // tagged by the first module that registered it
    let shared = discovery.registry.get("SharedNode").unwrap();
    assert_eq!(shared.module_tag(), Some("luy_scan.base"));
}

#[test]
fn override_replaces_generated_label() {
    let dir = tempfile::tempdir().unwrap();
    write_module(dir.path(), "foo.json", &node_module("FooNode", "run"));

    let overrides: DisplayNameOverrides = [("FooNode", "我的节点")].into_iter().collect();
    let discovery = discover_and_register(dir.path(), &overrides).unwrap();

    assert_eq!(discovery.registry.display_name("FooNode"), Some("我的节点"));
}

#[test]
fn missing_root_is_empty_not_an_error() {
    let discovery =
        discover_and_register(Path::new("/nonexistent/luy/service"), &no_overrides()).unwrap();

    assert!(discovery.registry.class_mappings().is_empty());
    assert!(discovery.registry.display_name_mappings().is_empty());
    assert!(discovery.report.root_missing);
}

#[test]
fn two_markers_are_never_registered() {
    let dir = tempfile::tempdir().unwrap();
    write_module(
        dir.path(),
        "partial.json",
        r#"{"attributes": {
            "NoFunction": {"kind": "class", "attrs": {"INPUT_TYPES": {}, "RETURN_TYPES": []}},
            "NoInputs": {"kind": "class", "attrs": {"RETURN_TYPES": [], "FUNCTION": "run"}},
            "NoOutputs": {"kind": "class", "attrs": {"INPUT_TYPES": {}, "FUNCTION": "run"}}
        }}"#,
    );

    let discovery = discover_and_register(dir.path(), &no_overrides()).unwrap();
    assert!(discovery.registry.is_empty());
    assert_eq!(discovery.report.loaded, 1);
}

#[test]
fn helper_base_with_all_markers_is_registered() {
    // presence-only check: a base class declaring the markers as tooltips
    // is indistinguishable from a real node
    let dir = tempfile::tempdir().unwrap();
    write_module(
        dir.path(),
        "tooltips.json",
        r#"{"attributes": {
            "TooltipBase": {
                "kind": "class",
                "attrs": {"INPUT_TYPES": "inputs", "RETURN_TYPES": "outputs", "FUNCTION": "entry"}
            }
        }}"#,
    );

    let discovery = discover_and_register(dir.path(), &no_overrides()).unwrap();
    assert!(discovery.registry.contains("TooltipBase"));
}

#[test]
fn functions_and_constants_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    write_module(
        dir.path(),
        "mixed.json",
        r#"{"attributes": {
            "INPUT_TYPES": {"kind": "constant", "value": {}},
            "FUNCTION": {"kind": "function"},
            "RealNode": {
                "kind": "class",
                "attrs": {"INPUT_TYPES": {}, "RETURN_TYPES": [], "FUNCTION": "run"}
            }
        }}"#,
    );

    let discovery = discover_and_register(dir.path(), &no_overrides()).unwrap();
    assert_eq!(discovery.registry.names().collect::<Vec<_>>(), vec!["RealNode"]);
}

#[test]
fn same_stem_in_subdirectories_does_not_clash() {
    let dir = tempfile::tempdir().unwrap();
    write_module(dir.path(), "utils.json", &node_module("TopNode", "run"));
    write_module(dir.path(), "image/utils.json", &node_module("ImageNode", "run"));

    let discovery = discover_and_register(dir.path(), &no_overrides()).unwrap();
    let registry = &discovery.registry;

    assert_eq!(registry.get("TopNode").unwrap().module_tag(), Some("luy_scan.utils"));
    assert_eq!(
        registry.get("ImageNode").unwrap().module_tag(),
        Some("luy_scan.image.utils")
    );
}

#[test]
fn demo_pack_registers_expected_nodes() {
    let discovery = discover_and_register(&demo_root(), &DisplayNameOverrides::bundled()).unwrap();
    let registry = &discovery.registry;
    let report = &discovery.report;

    let names: HashSet<_> = registry.names().collect();
    assert_eq!(
        names,
        HashSet::from([
            "Any2Number",
            "Any2String",
            "ForItemByIndex",
            "LLMNode",
            "LuyLoadLatent",
            "LuySaveLatent",
            "ImageCropNode",
            "ImageEditNode",
        ])
    );

    // __init__ is skipped, GGUFChat needs a runtime the pack cannot provide
    assert_eq!(report.candidates, 9);
    assert_eq!(report.loaded, 8);
    assert_eq!(report.failed(), 1);
    assert!(report.load_errors[0].source.path.ends_with("GGUFChat.json"));
    assert!(matches!(
        report.load_errors[0].error,
        ModuleError::UnresolvedImport(ref m) if m == "llama_cpp"
    ));

    assert_eq!(registry.display_name("ForItemByIndex"), Some("Luy-循环取行文本"));
    assert_eq!(registry.display_name("LLMNode"), Some("Luy-LLMNode"));

    let edit = registry.get("ImageEditNode").unwrap();
    assert_eq!(edit.category(), Some("luy/image"));
    assert_eq!(edit.module_tag(), Some("luy_scan.imagetools.ImageEditNode"));

    let save = registry.get("LuySaveLatent").unwrap();
    assert!(save.is_output_node());
    assert_eq!(save.category(), Some("luy/latent"));

    let any = registry.get("Any2String").unwrap();
    assert_eq!(any.category(), Some("luy"));
    assert_eq!(any.module_tag(), Some("luy_scan.Any2Any"));
}

#[test]
fn unmet_requirement_is_a_load_error() {
    let dir = tempfile::tempdir().unwrap();
    write_module(dir.path(), "ok.json", &node_module("OkNode", "run"));
    write_module(
        dir.path(),
        "needs_env.json",
        r#"{
            "requires": {"env": ["LUY_NODES_SURELY_UNSET_VARIABLE"]},
            "attributes": {
                "GatedNode": {
                    "kind": "class",
                    "attrs": {"INPUT_TYPES": {}, "RETURN_TYPES": [], "FUNCTION": "run"}
                }
            }
        }"#,
    );

    let discovery = discover_and_register(dir.path(), &no_overrides()).unwrap();

    assert!(discovery.registry.contains("OkNode"));
    assert!(!discovery.registry.contains("GatedNode"));
    assert_eq!(discovery.report.failed(), 1);

    let failure = &discovery.report.load_errors[0];
    assert!(failure.source.path.ends_with("needs_env.json"));
    assert!(matches!(
        failure.error,
        ModuleError::Unmet(ref reason) if reason.contains("LUY_NODES_SURELY_UNSET_VARIABLE")
    ));
}

#[test]
fn import_cannot_reach_outside_package_root() {
    let outside = tempfile::Builder::new().prefix("outsidepack").tempdir().unwrap();
    let secret = write_module(outside.path(), "secret.json", &node_module("OutsideNode", "run"));

    let pack = tempfile::tempdir().unwrap();
    let target = format!(".{}", secret.with_extension("").display());
    write_module(
        pack.path(),
        "escape.json",
        &format!(r#"{{"imports": [{{"from": "{target}", "names": ["OutsideNode"]}}]}}"#),
    );

    let discovery = discover_and_register(pack.path(), &no_overrides()).unwrap();

    assert!(!discovery.registry.contains("OutsideNode"));
    assert_eq!(discovery.report.failed(), 1);
    // a temp dir with a dot in its path fails earlier, as unresolved
    assert!(matches!(
        discovery.report.load_errors[0].error,
        ModuleError::BeyondPackageRoot(_) | ModuleError::UnresolvedImport(_)
    ));
}
