//! Full-pipeline properties: generate, export, import, compare, validate.

use synth_core::{GenerationConfig, HookRegistry, GENERATOR_NAME};
use synth_export::{export_workspace, import_workspace, ExportOptions, ImportMode};
use synth_generator::generate_dataset;
use synth_store::{validate_store, Store, ValidateOptions};
use tempfile::TempDir;

fn pipeline_config() -> GenerationConfig {
    GenerationConfig {
        workspace_name: "Pipeline Test".to_string(),
        seed: 99,
        users: 30,
        channels: 4,
        im_channels: 6,
        mpim_channels: 2,
        messages: 300,
        files: 30,
        channel_members_min: 3,
        channel_members_max: 6,
        mpim_members_min: 3,
        mpim_members_max: 4,
        batch_size: 64,
    }
}

fn generate_source(dir: &TempDir) -> (Store, String) {
    let mut store = Store::open(dir.path().join("source.db")).expect("open source");
    let summary = generate_dataset(&mut store, &pipeline_config(), &HookRegistry::new())
        .expect("generate");
    (store, summary.workspace_id)
}

#[test]
fn test_round_trip_preserves_every_row() {
    let dir = TempDir::new().expect("tempdir");
    let (source, workspace_id) = generate_source(&dir);

    let out = dir.path().join("exports");
    export_workspace(&source, &out, &ExportOptions::default()).expect("export");

    let mut target = Store::open(dir.path().join("target.db")).expect("open target");
    let report = import_workspace(&mut target, &out, None, ImportMode::Fresh).expect("import");
    assert_eq!(report.workspace_id, workspace_id);
    assert_eq!(report.skipped, 0);

    assert_eq!(
        source.stats(&workspace_id).expect("source stats"),
        target.stats(&workspace_id).expect("target stats")
    );
    assert_eq!(
        source.list_users(&workspace_id, 100, 0).expect("users"),
        target.list_users(&workspace_id, 100, 0).expect("users")
    );
    assert_eq!(
        source
            .list_channels(&workspace_id, 100, 0, None)
            .expect("channels"),
        target
            .list_channels(&workspace_id, 100, 0, None)
            .expect("channels")
    );
    assert_eq!(
        source
            .list_messages(&workspace_id, 1000, 0)
            .expect("messages"),
        target
            .list_messages(&workspace_id, 1000, 0)
            .expect("messages")
    );
    assert_eq!(
        source.list_files(&workspace_id, 100, 0).expect("files"),
        target.list_files(&workspace_id, 100, 0).expect("files")
    );
    assert_eq!(
        source.export_summary(&workspace_id).expect("source summary").meta,
        target.export_summary(&workspace_id).expect("target summary").meta
    );
}

#[test]
fn test_incremental_state_produces_empty_second_slice() {
    let dir = TempDir::new().expect("tempdir");
    let (source, _) = generate_source(&dir);
    let state_path = dir.path().join("state.json");

    let first = export_workspace(
        &source,
        &dir.path().join("full"),
        &ExportOptions {
            state_path: Some(state_path.clone()),
            ..Default::default()
        },
    )
    .expect("first export");
    assert_eq!(first.messages, 300);
    assert_eq!(first.files, 30);

    // Nothing changed since the watermarks were written.
    let second = export_workspace(
        &source,
        &dir.path().join("incremental"),
        &ExportOptions {
            state_path: Some(state_path),
            ..Default::default()
        },
    )
    .expect("second export");
    assert_eq!(second.messages, 0);
    assert_eq!(second.files, 0);
    assert_eq!(second.messages_after_ts, first.messages_max_ts);
    assert_eq!(second.files_after_ts, first.files_max_ts);
}

#[test]
fn test_append_reimport_changes_nothing() {
    let dir = TempDir::new().expect("tempdir");
    let (source, workspace_id) = generate_source(&dir);

    let out = dir.path().join("exports");
    export_workspace(&source, &out, &ExportOptions::default()).expect("export");

    let mut target = Store::open(dir.path().join("target.db")).expect("open target");
    import_workspace(&mut target, &out, None, ImportMode::Fresh).expect("fresh import");
    let before = target.stats(&workspace_id).expect("stats before");

    let report =
        import_workspace(&mut target, &out, None, ImportMode::Append).expect("append import");
    assert_eq!(report.users, 0);
    assert_eq!(report.messages, 0);
    assert_eq!(target.stats(&workspace_id).expect("stats after"), before);
}

#[test]
fn test_imported_database_passes_validation() {
    let dir = TempDir::new().expect("tempdir");
    let (source, workspace_id) = generate_source(&dir);

    let out = dir.path().join("exports");
    export_workspace(&source, &out, &ExportOptions::default()).expect("export");

    let target_path = dir.path().join("target.db");
    let mut target = Store::open(&target_path).expect("open target");
    import_workspace(&mut target, &out, None, ImportMode::Fresh).expect("import");
    drop(target);

    let report = validate_store(
        &target_path,
        ValidateOptions {
            workspace_id: Some(&workspace_id),
            require_workspace: true,
            tool_version: Some(env!("CARGO_PKG_VERSION")),
        },
    );
    assert!(report.ok, "errors: {:?}", report.errors);
    assert!(report.errors.is_empty());
    assert_eq!(
        report.meta.get("generator"),
        Some(&serde_json::Value::String(GENERATOR_NAME.to_string()))
    );
}
