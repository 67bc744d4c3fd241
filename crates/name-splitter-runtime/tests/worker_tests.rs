use name_splitter::{BatchJobSpec, Config, JobOptions};
use name_splitter_runtime::{SplitUpdate, spawn_worker};
use std::path::Path;

fn write_png(path: &Path, width: u32, height: u32) {
    image::RgbaImage::from_pixel(width, height, image::Rgba([120, 80, 40, 255]))
        .save(path)
        .unwrap();
}

fn config(out_dir: &Path) -> Config {
    let mut cfg = Config::default();
    cfg.grid.rows = 1;
    cfg.grid.cols = 2;
    cfg.output.out_dir = out_dir.to_path_buf();
    cfg
}

#[tokio::test]
async fn test_job_reports_progress_then_completes() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("page.png");
    write_png(&input, 4, 2);
    let out_dir = dir.path().join("out");

    let mut worker = spawn_worker();
    let id = worker
        .run_job(&input, config(&out_dir), JobOptions::default())
        .unwrap();

    let mut progress_count = 0;
    let result = loop {
        let update = worker.recv().await.unwrap();
        assert_eq!(update.id(), id);
        match update {
            SplitUpdate::Progress { .. } => progress_count += 1,
            SplitUpdate::JobComplete { result, .. } => break result,
            other => panic!("unexpected update: {:?}", other),
        }
    };

    assert!(progress_count > 0);
    assert_eq!(result.page_count, 2);
    assert_eq!(result.out_dir, out_dir);
    assert!(out_dir.join("flat/page_001.png").exists());
}

#[tokio::test]
async fn test_failed_job_reports_error() {
    let dir = tempfile::tempdir().unwrap();

    let mut worker = spawn_worker();
    let id = worker
        .run_job(
            dir.path().join("missing.png"),
            config(&dir.path().join("out")),
            JobOptions::default(),
        )
        .unwrap();

    let update = loop {
        let update = worker.recv().await.unwrap();
        if update.is_final() {
            break update;
        }
    };
    match update {
        SplitUpdate::Error { id: error_id, message } => {
            assert_eq!(error_id, id);
            assert!(message.contains("Image not found"));
        }
        other => panic!("unexpected update: {:?}", other),
    }
}

#[tokio::test]
async fn test_cancel_stops_queued_job() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("page.png");
    write_png(&input, 4, 2);
    let out_dir = dir.path().join("out");

    let mut worker = spawn_worker();
    let id = worker
        .run_job(&input, config(&out_dir), JobOptions::default())
        .unwrap();
    worker.cancel().unwrap();

    let update = loop {
        let update = worker.recv().await.unwrap();
        if update.is_final() {
            break update;
        }
    };
    match update {
        SplitUpdate::Cancelled { id: cancelled_id, message } => {
            assert_eq!(cancelled_id, id);
            assert_eq!(message, "Cancelled: Job cancelled");
        }
        other => panic!("unexpected update: {:?}", other),
    }
    assert!(!out_dir.exists());
}

#[tokio::test]
async fn test_cancel_does_not_affect_later_jobs() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("page.png");
    write_png(&input, 4, 2);

    let mut worker = spawn_worker();
    let first = worker
        .run_job(&input, config(&dir.path().join("first")), JobOptions::default())
        .unwrap();
    worker.cancel().unwrap();
    let second = worker
        .run_job(&input, config(&dir.path().join("second")), JobOptions::default())
        .unwrap();

    let mut finals = Vec::new();
    while finals.len() < 2 {
        let update = worker.recv().await.unwrap();
        if update.is_final() {
            finals.push(update);
        }
    }

    assert!(matches!(&finals[0], SplitUpdate::Cancelled { id, .. } if *id == first));
    assert!(matches!(&finals[1], SplitUpdate::JobComplete { id, .. } if *id == second));
}

#[tokio::test]
async fn test_batch_completes_with_report() {
    let dir = tempfile::tempdir().unwrap();
    let good = dir.path().join("good.png");
    write_png(&good, 4, 2);
    let mut jobs = vec![
        BatchJobSpec::new(good.clone(), config(Path::new(""))),
        BatchJobSpec::new(dir.path().join("missing.png"), config(Path::new(""))),
    ];
    jobs[0].out_dir = Some(dir.path().join("good_out"));

    let mut worker = spawn_worker();
    let id = worker.run_batch(jobs).unwrap();

    let mut announced = Vec::new();
    let report = loop {
        match worker.recv().await.unwrap() {
            SplitUpdate::BatchProgress { progress, .. } => {
                if progress.job_progress.is_none() {
                    announced.push(progress.job_name);
                }
            }
            SplitUpdate::BatchComplete { id: done_id, report } => {
                assert_eq!(done_id, id);
                break report;
            }
            other => panic!("unexpected update: {:?}", other),
        }
    };

    assert_eq!(announced, vec!["good.png".to_string(), "missing.png".to_string()]);
    assert_eq!(report.total_jobs, 2);
    assert_eq!(report.successful_jobs, 1);
    assert_eq!(report.failed_jobs, 1);
    assert_eq!(report.entries[0].out_dir, Some(dir.path().join("good_out")));
    assert_eq!(report.entries[0].page_count, 2);
    assert!(report.entries[1].error.is_some());
}
