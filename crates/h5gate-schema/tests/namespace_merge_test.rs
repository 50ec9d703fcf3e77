//! Resolution across namespaces loaded from separate documents

use h5gate_schema::{Error, MemberSource, Quantity, Resolver, SchemaLoader};
use serde_json::json;

fn core() -> serde_json::Value {
    json!({
        "core": {
            "info": {"name": "core", "version": "2.0"},
            "structures": {
                "/": {"description": "root of the file"},
                "<Foo>/": {
                    "description": "a foo",
                    "base": {"data_type": "int"},
                    "attributes": {"kind": {"data_type": "text", "value": "foo"}}
                }
            },
            "locations": {"/": ["<Foo>/*"]}
        }
    })
}

fn ext() -> serde_json::Value {
    json!({
        "ext": {
            "structures": {
                "<Foo>/": {
                    "merge": ["core:<Foo>/"],
                    "description": "an extended foo",
                    "bar": {"data_type": "float"},
                    "attributes": {"kind": {"value": "+ext"}}
                }
            },
            "locations": {"/": ["<Foo>/?"]}
        }
    })
}

#[test]
fn test_extension_merges_core_structure() -> anyhow::Result<()> {
    let registry = SchemaLoader::new().load(&[core()], &[ext()], "core")?;
    let resolved = Resolver::new(&registry).resolve("ext", "<Foo>/")?;

    assert_eq!(resolved.ancestors, vec!["core:<Foo>/"]);
    assert!(resolved.members.contains_key("base"));
    assert!(resolved.members.contains_key("bar"));
    assert_eq!(resolved.members["base"].namespace, "core");
    assert_eq!(resolved.members["bar"].namespace, "ext");
    assert_eq!(resolved.members["bar"].source, MemberSource::Defined);
    assert_eq!(
        resolved.attributes()["kind"].value,
        Some(h5gate_ir::Value::from("foo,ext"))
    );

    let lookup = registry.lookup("ext").expect("ext lookup table");
    let entry = &lookup.locations("<Foo>/").expect("ext foo entry")["/"];
    assert_eq!(entry.quantity, Quantity::Optional);
    Ok(())
}

#[test]
fn test_yaml_and_json_documents_combine() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let core_path = dir.path().join("core.json");
    let ext_path = dir.path().join("ext.yaml");
    std::fs::write(&core_path, core().to_string())?;
    std::fs::write(&ext_path, serde_yaml::to_string(&ext())?)?;

    let registry = SchemaLoader::new().load_files(&[&core_path], &[&ext_path], "core")?;
    assert!(registry.contains("core"));
    assert!(registry.contains("ext"));
    assert_eq!(
        registry.namespace("core").and_then(|ns| ns.info.version.clone()),
        Some("2.0".to_string())
    );
    Ok(())
}

#[test]
fn test_cross_namespace_reference_requires_qualifier() {
    let bad_ext = json!({
        "ext": {
            "structures": {"<Baz>/": {"merge": ["<Foo>/"]}},
            "locations": {}
        }
    });
    let registry = SchemaLoader::new()
        .load(&[core()], &[bad_ext], "core")
        .expect("documents load");
    let err = Resolver::new(&registry)
        .resolve("ext", "<Baz>/")
        .expect_err("unqualified reference resolves in ext");
    assert!(matches!(err, Error::UnknownIdentifier { ref namespace, .. } if namespace == "ext"));
}
