//! A counter shared by a value reader and an increment button

use scopestore::{create_scoped_store, StoreOptions};
use std::collections::BTreeMap;

type State = BTreeMap<&'static str, i64>;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!("=== Scoped Store Example: Counter ===\n");

    let counter = create_scoped_store(
        State::from([("count", 0), ("clicks", 0)]),
        StoreOptions::default(),
    );
    let boundary = counter.mount(None);

    boundary.enter(|| {
        // Reader: only cares about `count`
        let (value, _) = counter.use_store(|s| s["count"]).expect("inside boundary");
        value.on_change(|| println!("   [CounterValue] re-render requested"));

        // Button: writes without subscribing
        let increment = counter.use_set_store().expect("inside boundary");

        println!("1. Initial render: {}", value.render(|count| format!("count = {count}")));

        println!("\n2. Clicking increment twice");
        for _ in 0..2 {
            increment.set(|s| {
                State::from([("count", s["count"] + 1), ("clicks", s["clicks"] + 1)])
            });
        }
        println!("   {}", value.render(|count| format!("count = {count}")));

        println!("\n3. Writing only `clicks` (no re-render expected)");
        increment.set(|s| State::from([("clicks", s["clicks"] + 1)]));
        println!("   needs render: {}", value.needs_render());
    });

    println!("\n4. Outside the boundary");
    match counter.use_set_store() {
        Ok(_) => println!("   unexpectedly resolved a store"),
        Err(err) => println!("   error: {err} ({})", err.as_label()),
    }

    println!("\n✓ Example complete!");
}
