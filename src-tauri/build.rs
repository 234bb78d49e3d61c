const BRIDGE_COMMANDS: &[&str] = &[
    "bridge_notification",
    "bridge_title_changed",
    "bridge_connection_status",
    "bridge_chat_search_result",
];

fn main() {
    println!("cargo:rerun-if-changed=scripts");
    tauri_build::try_build(
        tauri_build::Attributes::new()
            .app_manifest(tauri_build::AppManifest::new().commands(BRIDGE_COMMANDS)),
    )
    .expect("failed to run tauri-build");
}
