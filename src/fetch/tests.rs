//! Unit tests for the fetch orchestrator.

use super::*;
use crate::report::{ReportConfig, DEFAULT_LOG_LINE_PREFIX};
use crate::test_support::{ScriptedRunner, ScriptedStore};
use std::fs;
use tempfile::TempDir;

struct Fixture {
    store: ScriptedStore,
    runner: ScriptedRunner,
    orchestrator: FetchOrchestrator<ScriptedStore, ScriptedRunner>,
    work_dir: Utf8PathBuf,
    _tmp: TempDir,
}

fn fixture() -> Fixture {
    let tmp = TempDir::new().unwrap_or_else(|err| panic!("tempdir: {err}"));
    let work_dir = Utf8PathBuf::from_path_buf(tmp.path().join("work"))
        .unwrap_or_else(|path| panic!("temp path should be utf8: {}", path.display()));
    let store = ScriptedStore::new();
    let runner = ScriptedRunner::new();
    let config = ReportConfig {
        pgbadger_bin: String::from("pgbadger"),
        log_line_prefix: String::from(DEFAULT_LOG_LINE_PREFIX),
        work_dir: work_dir.clone().into_string(),
    };
    let report = ReportRunner::new(config, runner.clone())
        .unwrap_or_else(|err| panic!("report runner fixture: {err}"));
    Fixture {
        orchestrator: FetchOrchestrator::new(store.clone(), report),
        store,
        runner,
        work_dir,
        _tmp: tmp,
    }
}

fn request(cutoff_millis: i64) -> FetchRequest {
    FetchRequest::new("db1", cutoff_millis)
        .unwrap_or_else(|err| panic!("request fixture should be valid: {err}"))
}

fn remote_log(name: &str, last_written_ms: i64) -> RemoteLogFile {
    RemoteLogFile {
        name: name.to_owned(),
        last_written_ms,
        size_bytes: None,
    }
}

#[tokio::test]
async fn list_todays_logs_keeps_entries_at_or_after_cutoff_in_order() {
    let fx = fixture();
    fx.store.push_listing(vec![
        remote_log("error/postgresql.log.2024-01-01-22", 99),
        remote_log("error/postgresql.log.2024-01-02-00", 100),
        remote_log("error/postgresql.log.2024-01-02-09", 250),
    ]);

    let selected = fx
        .orchestrator
        .list_todays_logs(&request(100))
        .await
        .unwrap_or_else(|err| panic!("list: {err}"));

    let names: Vec<&str> = selected.iter().map(|file| file.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "error/postgresql.log.2024-01-02-00",
            "error/postgresql.log.2024-01-02-09",
        ]
    );
    assert_eq!(fx.store.listing_requests(), vec![String::from("db1")]);
}

#[tokio::test]
async fn list_todays_logs_surfaces_listing_failures() {
    let fx = fixture();
    fx.store.push_listing_error("throttled");

    let err = fx
        .orchestrator
        .list_todays_logs(&request(0))
        .await
        .expect_err("expected a listing failure");
    assert!(matches!(err, FetchError::List(_)));
}

#[tokio::test]
async fn download_threads_each_marker_into_the_next_request() {
    let fx = fixture();
    let scratch =
        ScratchDir::prepare(fx.work_dir.clone()).unwrap_or_else(|err| panic!("prepare: {err}"));
    fx.store.push_chunk("AAA", "m1");
    fx.store.push_chunk("BBB", "m2");
    fx.store.push_final_chunk("CCC");

    let path = fx
        .orchestrator
        .download_log_file("db1", "error/postgresql.log.2024-01-02-09", &scratch)
        .await
        .unwrap_or_else(|err| panic!("download: {err}"));

    let requests = fx.store.portion_requests();
    let markers: Vec<Option<&str>> = requests.iter().map(|req| req.marker.as_deref()).collect();
    assert_eq!(markers, vec![None, Some("m1"), Some("m2")]);
    assert!(
        requests
            .iter()
            .all(|req| req.instance_id == "db1"
                && req.log_file_name == "error/postgresql.log.2024-01-02-09")
    );

    assert_eq!(path, fx.work_dir.join("postgresql.log.2024-01-02-09"));
    let contents = fs::read_to_string(&path).unwrap_or_else(|err| panic!("read: {err}"));
    assert_eq!(contents, "AAABBBCCC");
}

#[tokio::test]
async fn download_removes_residue_from_a_prior_run() {
    let fx = fixture();
    let scratch =
        ScratchDir::prepare(fx.work_dir.clone()).unwrap_or_else(|err| panic!("prepare: {err}"));
    let target = fx.work_dir.join("postgresql.log.2024-01-02-09");
    fs::write(&target, "stale contents").unwrap_or_else(|err| panic!("seed residue: {err}"));
    fx.store.push_final_chunk("fresh");

    fx.orchestrator
        .download_log_file("db1", "postgresql.log.2024-01-02-09", &scratch)
        .await
        .unwrap_or_else(|err| panic!("download: {err}"));

    let contents = fs::read_to_string(&target).unwrap_or_else(|err| panic!("read: {err}"));
    assert_eq!(contents, "fresh");
}

#[tokio::test]
async fn download_fails_when_pending_data_has_no_marker() {
    let fx = fixture();
    let scratch =
        ScratchDir::prepare(fx.work_dir.clone()).unwrap_or_else(|err| panic!("prepare: {err}"));
    fx.store.push_portion(crate::store::LogPortion {
        data: String::from("AAA"),
        marker: None,
        additional_data_pending: true,
    });

    let err = fx
        .orchestrator
        .download_log_file("db1", "postgresql.log", &scratch)
        .await
        .expect_err("expected a missing continuation error");
    assert!(matches!(
        err,
        FetchError::MissingContinuation { file } if file == "postgresql.log"
    ));
}

#[tokio::test]
async fn download_surfaces_portion_failures() {
    let fx = fixture();
    let scratch =
        ScratchDir::prepare(fx.work_dir.clone()).unwrap_or_else(|err| panic!("prepare: {err}"));
    fx.store.push_chunk("AAA", "m1");
    fx.store.push_portion_error("connection reset");

    let err = fx
        .orchestrator
        .download_log_file("db1", "postgresql.log", &scratch)
        .await
        .expect_err("expected a download failure");
    assert!(matches!(
        err,
        FetchError::Download { file, .. } if file == "postgresql.log"
    ));
}

#[tokio::test]
async fn execute_keeps_the_run_successful_when_the_report_tool_fails() {
    let fx = fixture();
    fx.store
        .push_listing(vec![remote_log("error/postgresql.log.2024-01-02-09", 200)]);
    fx.store.push_final_chunk("log line\n");
    fx.runner.push_failure(1, "pgbadger: parse error\n");

    let summary = fx
        .orchestrator
        .execute(&request(100))
        .await
        .unwrap_or_else(|err| panic!("execute: {err}"));

    assert_eq!(
        summary.downloaded,
        vec![fx.work_dir.join("postgresql.log.2024-01-02-09")]
    );
    assert_eq!(summary.report, None);
    assert_eq!(fx.runner.invocations().len(), 1);
}

#[tokio::test]
async fn execute_skips_the_report_tool_on_an_empty_day() {
    let fx = fixture();
    fx.store.push_listing(vec![remote_log(
        "error/postgresql.log.2024-01-01-00",
        50,
    )]);

    let summary = fx
        .orchestrator
        .execute(&request(100))
        .await
        .unwrap_or_else(|err| panic!("execute: {err}"));

    assert!(summary.downloaded.is_empty());
    assert_eq!(summary.report, None);
    assert!(fx.runner.invocations().is_empty());
}

#[tokio::test]
async fn execute_rejects_blank_instance_ids() {
    let fx = fixture();
    let invalid = FetchRequest {
        instance_id: String::from("  "),
        cutoff_millis: 0,
    };

    let err = fx
        .orchestrator
        .execute(&invalid)
        .await
        .expect_err("expected a validation failure");
    assert!(matches!(err, FetchError::InvalidRequest(_)));
    assert!(fx.store.listing_requests().is_empty());
}

#[test]
fn local_midnight_is_at_or_before_now() {
    let midnight = local_midnight_millis()
        .unwrap_or_else(|| panic!("local midnight should be representable"));
    let now_ms = Local::now().timestamp_millis();
    assert!(midnight <= now_ms);
    assert!(now_ms - midnight < 24 * 60 * 60 * 1000 + 60 * 60 * 1000);
}
