use std::path::PathBuf;

use serde_json::json;
use taskforge_core::{Parameters, Pipeline, TaskGraph, TransformRegistry};
use taskforge_lua::{LogModule, ModuleRegistry, ParamsModule, TracingSink, load_kinds_dir};

fn kinds_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../demos/taskcluster/kinds")
}

fn build_graph(params: Parameters) -> TaskGraph {
    let mut modules = ModuleRegistry::new();
    modules.register(ParamsModule::new(params.clone())).unwrap();
    modules
        .register(LogModule::new(TracingSink::new("demo")))
        .unwrap();

    let definitions = load_kinds_dir(&kinds_dir(), &modules).unwrap();
    let registry = TransformRegistry::with_defaults();

    let mut pipeline = Pipeline::new(params);
    for definition in definitions {
        pipeline
            .add_kind(definition.into_kind(&registry).unwrap())
            .unwrap();
    }
    pipeline.run().unwrap()
}

#[test]
fn demo_kinds_build_in_dependency_order() {
    let graph = build_graph(Parameters::new([
        ("project", json!("mozilla-central")),
        ("release-type", json!("beta")),
    ]));

    assert_eq!(
        graph.labels(),
        vec![
            "build-linux64-shippable",
            "build-win64-shippable",
            "signing-linux64-shippable",
            "signing-win64-shippable",
            "notify-beta-notify",
            "notify-nightly-notify",
        ]
    );
}

#[test]
fn demo_task_defaults_and_keyed_by() {
    let graph = build_graph(Parameters::new([("release-type", json!("release"))]));

    let linux = graph.get("build-linux64-shippable").unwrap();
    assert_eq!(linux.task["payload"]["max-run-time"], json!(3600));
    assert_eq!(linux.task["payload"]["os"], json!("linux"));
    assert_eq!(linux.task["scopes"], json!(["queue:route:index.gecko.v2"]));

    let win = graph.get("build-win64-shippable").unwrap();
    assert_eq!(win.task["payload"]["max-run-time"], json!(7200));
}

#[test]
fn demo_signing_inherits_from_build() {
    let graph = build_graph(Parameters::new([("release-type", json!("release"))]));

    let signing = graph.get("signing-win64-shippable").unwrap();
    assert_eq!(signing.attributes["platform"], json!("win64"));
    assert_eq!(signing.attributes["kind"], json!("signing"));
    assert_eq!(
        signing.task["dependencies"],
        json!(["build-win64-shippable"])
    );

    let treeherder = &signing.task["extra"]["treeherder"];
    assert_eq!(treeherder["groupSymbol"], json!("B"));
    assert_eq!(treeherder["symbol"], json!("S"));
    assert_eq!(
        signing.task["extra"]["treeherder-platform"],
        json!("windows2012-64-shippable/opt")
    );
}

#[test]
fn demo_notify_follows_parameters() {
    let graph = build_graph(Parameters::new([
        ("project", json!("maple")),
        ("release-type", json!("release")),
    ]));

    let notify: Vec<&str> = graph
        .tasks_of_kind("notify")
        .map(|t| t.label.as_str())
        .collect();
    assert_eq!(notify, vec!["notify-beta-notify", "notify-release-notify"]);
}
