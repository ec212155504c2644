//! Tests against a real Galaxy server.
//!
//! Skipped unless `GALAXY_API_KEY` is set; `GALAXY_URL` defaults to
//! `http://localhost:8080`. Every object created here gets a unique name and
//! is deleted at the end of its test.

use std::path::Path;
use std::time::Duration;

use galaxy_objects::client::{GalaxyInstance, HistoryTarget, RunOptions};
use galaxy_objects::load_workflow;
use galaxy_objects::wrappers::{DatasetKind, Wrapped};

const FOO_DATA: &str = "foo\nbar\n";

fn instance() -> Option<GalaxyInstance> {
    if std::env::var("GALAXY_API_KEY").is_err() {
        eprintln!("GALAXY_API_KEY not set, skipping");
        return None;
    }
    Some(GalaxyInstance::from_env().unwrap())
}

fn unique_name(prefix: &str) -> String {
    format!("{}_{}", prefix, uuid::Uuid::new_v4().simple())
}

#[tokio::test]
async fn test_library_lifecycle() {
    let Some(gi) = instance() else { return };
    let name = unique_name("test_lib");

    let mut lib = gi
        .libraries()
        .create(&name, Some("D"), Some("S"))
        .await
        .unwrap();
    assert_eq!(lib.name(), Some(name.as_str()));
    assert_eq!(lib.description(), Some("D"));
    assert_eq!(lib.synopsis(), Some("S"));

    let found = gi.libraries().list(Some(&name), false).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id(), lib.id());

    let folder = gi
        .libraries()
        .create_folder(&mut lib, &unique_name("folder"), Some("F"), None)
        .await
        .unwrap();
    assert_eq!(folder.description(), Some("F"));
    assert!(lib.folder_ids().iter().any(|id| Some(id.as_str()) == folder.id()));

    let ds = gi
        .libraries()
        .upload_data(&mut lib, FOO_DATA, Some(&folder))
        .await
        .unwrap();
    assert_eq!(ds.kind(), DatasetKind::Library);
    assert!(lib.dataset_ids().iter().any(|id| Some(id.as_str()) == ds.id()));

    gi.libraries().delete(&mut lib).await.unwrap();
    assert!(!lib.is_mapped());
}

#[tokio::test]
async fn test_history_import_and_download() {
    let Some(gi) = instance() else { return };

    let mut lib = gi
        .libraries()
        .create(&unique_name("test_lib"), None, None)
        .await
        .unwrap();
    let lds = gi
        .libraries()
        .upload_data(&mut lib, FOO_DATA, None)
        .await
        .unwrap();

    let mut hist = gi.histories().create(&unique_name("test_hist")).await.unwrap();
    let mut hda = gi.histories().import_dataset(&mut hist, &lds).await.unwrap();
    gi.datasets()
        .wait(&mut hda, Some(Duration::from_secs(1)), Some(Duration::from_secs(120)))
        .await
        .unwrap();

    let contents = gi.datasets().get_contents(&hda).await.unwrap();
    assert_eq!(contents, FOO_DATA.as_bytes());
    let head = gi.datasets().peek(&hda, 3).await.unwrap();
    assert_eq!(head, b"foo");

    let datasets = gi.histories().get_datasets(&hist).await.unwrap();
    assert!(datasets.iter().any(|d| d.id() == hda.id()));

    gi.histories().delete(&mut hist, true).await.unwrap();
    gi.libraries().delete(&mut lib).await.unwrap();
}

#[tokio::test]
async fn test_workflow_import_and_run() {
    let Some(gi) = instance() else { return };

    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/data/paste_columns.ga");
    let mut wf = gi
        .workflows()
        .import_new(load_workflow(path).unwrap())
        .await
        .unwrap();
    assert_eq!(wf.inputs().len(), 2);
    assert!(wf.info().unwrap().sorted_step_ids().unwrap().len() >= 3);

    let mut lib = gi
        .libraries()
        .create(&unique_name("test_lib"), None, None)
        .await
        .unwrap();
    let a = gi.libraries().upload_data(&mut lib, "1\n2\n", None).await.unwrap();
    let b = gi.libraries().upload_data(&mut lib, "3\n4\n", None).await.unwrap();

    let options = RunOptions {
        wait: true,
        polling_interval: Some(Duration::from_secs(1)),
        break_on_error: true,
        ..RunOptions::default()
    };
    let out_name = unique_name("test_out");
    let (outputs, mut out_hist) = gi
        .workflows()
        .run(&wf, &[&a, &b], HistoryTarget::New(&out_name), options)
        .await
        .unwrap();
    assert_eq!(out_hist.name(), Some(out_name.as_str()));
    assert_eq!(outputs.len(), 1);

    let contents = gi.datasets().get_contents(&outputs[0]).await.unwrap();
    assert_eq!(String::from_utf8_lossy(&contents), "1\t3\n2\t4\n");

    gi.histories().delete(&mut out_hist, true).await.unwrap();
    gi.libraries().delete(&mut lib).await.unwrap();
    gi.workflows().delete(&mut wf).await.unwrap();
}
