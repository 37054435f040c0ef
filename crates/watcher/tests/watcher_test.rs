use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use agentbox_controller::mocks::ScriptedTransport;
use agentbox_controller::{Controller, Supervisor};
use agentbox_core::config::SupervisorConfig;
use agentbox_core::registry::StaticRegistry;
use agentbox_core::types::{CapabilityDescriptor, ToolDescriptor, TransportSpec};
use agentbox_watcher::{reload::reload, HotReloadWatcher, ReloadContext};

fn test_config() -> SupervisorConfig {
    SupervisorConfig {
        handshake_timeout_ms: 500,
        call_timeout_ms: 500,
        shutdown_grace_ms: 100,
    }
}

fn stdio_descriptor(id: &str, path: &std::path::Path) -> CapabilityDescriptor {
    CapabilityDescriptor::new(
        id,
        path,
        TransportSpec::Stdio {
            command: "unused".into(),
            args: vec![],
            env: HashMap::new(),
        },
    )
}

async fn connected_supervisor(descriptor: CapabilityDescriptor) -> Arc<Supervisor> {
    let tools = vec![ToolDescriptor::new("ping", "Ping the provider").with_schema(json!({
        "type": "object",
        "properties": {},
    }))];
    let supervisor = Arc::new(Supervisor::from_parts(
        descriptor,
        test_config(),
        Box::new(ScriptedTransport::with_catalog(&tools)),
    ));
    supervisor.connect().await.unwrap();
    supervisor
}

#[tokio::test]
async fn reload_keeps_unchanged_supervisors_and_regenerates_bindings() {
    let dir = tempfile::tempdir().unwrap();
    let caps_dir = dir.path().join("caps");
    std::fs::create_dir_all(&caps_dir).unwrap();

    let descriptor = stdio_descriptor("files", &caps_dir);
    let controller = Arc::new(Controller::new(
        test_config(),
        dir.path().join("status.json"),
    ));
    controller.adopt_child(connected_supervisor(descriptor.clone()).await);

    let registry = Arc::new(StaticRegistry::new(vec![descriptor]));
    let ctx = ReloadContext {
        controller: controller.clone(),
        registry: registry.clone(),
        bindings_root: dir.path().to_path_buf(),
        relay_port: 8702,
    };

    reload(&ctx).await.unwrap();

    // The connected supervisor was left untouched by the resync...
    assert_eq!(
        controller.child("files").unwrap().status().await,
        agentbox_core::types::ChildStatus::Connected
    );

    // ...and its bindings were rewritten wholesale.
    let module_dir = dir.path().join("node_modules").join("files");
    let source = std::fs::read_to_string(module_dir.join("index.ts")).unwrap();
    assert!(source.contains("http://127.0.0.1:8702/call/files"));
    assert!(module_dir.join("index.d.ts").exists());
}

#[tokio::test]
async fn reload_prunes_bindings_of_dropped_capabilities() {
    let dir = tempfile::tempdir().unwrap();
    let caps_dir = dir.path().join("caps");
    std::fs::create_dir_all(&caps_dir).unwrap();

    let keep = stdio_descriptor("keep", &caps_dir);
    let drop_ = stdio_descriptor("drop", &caps_dir);

    let controller = Arc::new(Controller::new(
        test_config(),
        dir.path().join("status.json"),
    ));
    controller.adopt_child(connected_supervisor(keep.clone()).await);
    controller.adopt_child(connected_supervisor(drop_.clone()).await);

    let registry = Arc::new(StaticRegistry::new(vec![keep.clone(), drop_.clone()]));
    let ctx = ReloadContext {
        controller: controller.clone(),
        registry: registry.clone(),
        bindings_root: dir.path().to_path_buf(),
        relay_port: 8702,
    };
    reload(&ctx).await.unwrap();
    assert!(dir.path().join("node_modules/drop").exists());

    // The registry no longer resolves "drop"; the next pass removes both the
    // supervisor and its binding module.
    registry.set(vec![keep]);
    reload(&ctx).await.unwrap();

    assert!(controller.child("drop").is_none());
    assert!(!dir.path().join("node_modules/drop").exists());
    assert!(dir.path().join("node_modules/keep").exists());
}

#[tokio::test]
async fn filesystem_changes_trigger_a_debounced_reload() {
    let dir = tempfile::tempdir().unwrap();
    let caps_dir = dir.path().join("caps");
    std::fs::create_dir_all(&caps_dir).unwrap();

    let controller = Arc::new(Controller::new(
        test_config(),
        dir.path().join("status.json"),
    ));
    let registry = Arc::new(StaticRegistry::new(vec![]));
    let ctx = ReloadContext {
        controller,
        registry: registry.clone(),
        bindings_root: dir.path().to_path_buf(),
        relay_port: 8702,
    };

    let watcher = HotReloadWatcher::start(
        ctx,
        &[caps_dir.clone()],
        Duration::from_millis(50),
    )
    .unwrap();

    let before = registry.resolve_count();

    // A burst of writes should collapse into (at least) one reload pass.
    for i in 0..3 {
        std::fs::write(caps_dir.join(format!("cap-{}.toml", i)), "changed").unwrap();
    }

    let mut reloaded = false;
    for _ in 0..40 {
        tokio::time::sleep(Duration::from_millis(50)).await;
        if registry.resolve_count() > before {
            reloaded = true;
            break;
        }
    }
    watcher.stop();

    assert!(reloaded, "watcher never triggered a reload");
}
