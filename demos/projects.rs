//! Sibling boundaries, each seeded with its own project

use scopestore::{create_scoped_store, StoreOptions};
use serde_json::{json, Map, Value};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!("=== Scoped Store Example: Projects ===\n");

    let store = create_scoped_store(Map::new(), StoreOptions::new().update_on_props_change(true));
    let projects = [
        json!({ "id": "project-1", "name": "Alpha" }),
        json!({ "id": "project-2", "name": "Beta" }),
        json!({ "id": "project-3", "name": "Gamma" }),
    ];

    let mut boundaries: Vec<_> = projects
        .iter()
        .map(|project| store.mount(Some(props(project.clone()))))
        .collect();

    println!("1. Each boundary reads its own project");
    for boundary in &boundaries {
        let name = boundary.enter(|| {
            let (name, _) = store
                .use_store(|s| s["project"]["name"].clone())
                .expect("inside boundary");
            name.get()
        });
        println!("   {name}");
    }

    println!("\n2. Renaming the second project through new props");
    boundaries[1].render(props(json!({ "id": "project-2", "name": "Beta (renamed)" })));
    for boundary in &boundaries {
        println!("   {}", boundary.handle().get()["project"]["name"]);
    }

    println!("\n✓ Example complete!");
}

fn props(project: Value) -> Map<String, Value> {
    let mut props = Map::new();
    props.insert("project".to_string(), project);
    props
}
