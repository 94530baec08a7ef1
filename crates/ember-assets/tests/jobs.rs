//! Integration tests for job queues and the per-frame pump.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use ember_assets::*;
use ember_test_utils::*;

const WAIT: Duration = Duration::from_secs(5);

#[test]
fn test_io_jobs_run_in_submission_order() {
    init_logging();
    let (assets, _) = recording_server();
    let log = ExecutionLog::new();

    for name in ["J1", "J2", "J3"] {
        let log = log.clone();
        assert!(assets.submit(AssetJob::io(move || log.push(name))));
    }

    assert!(log.wait_for_len(3, WAIT));
    assert_eq!(log.entries(), vec!["J1", "J2", "J3"]);
}

#[test]
fn test_payload_jobs_run_on_named_workers() {
    let (assets, _) = recording_server();
    let log: ExecutionLog<Option<String>> = ExecutionLog::new();

    for category in [JobCategory::Io, JobCategory::Cpu] {
        let log = log.clone();
        assets.submit(AssetJob::with_payload(category, log, |log: ExecutionLog<Option<String>>| {
            log.push(thread::current().name().map(String::from));
        }));
    }

    assert!(log.wait_for_len(2, WAIT));
    let mut names = log.entries();
    names.sort();
    assert_eq!(
        names,
        vec![
            Some("test-assets-cpu".to_string()),
            Some("test-assets-io".to_string())
        ]
    );
}

#[test]
fn test_gpu_jobs_run_only_in_pump() {
    let (assets, _) = recording_server();
    let log = ExecutionLog::new();

    {
        let log = log.clone();
        assets.submit(AssetJob::gpu(move || log.push(thread::current().id())));
    }
    assert!(!log.wait_for_len(1, Duration::from_millis(50)));
    assert_eq!(assets.pending_jobs(JobCategory::Gpu), 1);

    let stats = assets.update();
    assert_eq!(stats.gpu_jobs, 1);
    assert_eq!(log.entries(), vec![thread::current().id()]);

    // Executed exactly once.
    assert_eq!(assets.update().gpu_jobs, 0);
    assert_eq!(log.len(), 1);
}

#[test]
fn test_blocking_job_is_rerouted_to_pump() {
    let (assets, _) = recording_server();
    let log = ExecutionLog::new();

    {
        let log = log.clone();
        assets.submit(AssetJob::io(move || log.push(thread::current().id())).blocking());
    }
    assert_eq!(assets.pending_jobs(JobCategory::Io), 0);
    assert_eq!(assets.pending_jobs(JobCategory::Gpu), 1);
    assert!(!log.wait_for_len(1, Duration::from_millis(50)));

    assets.update();
    assert_eq!(log.entries(), vec![thread::current().id()]);
}

#[test]
fn test_gpu_jobs_keep_submission_order() {
    let (assets, _) = recording_server();
    let log = ExecutionLog::new();

    for i in 0..5 {
        let log = log.clone();
        let job = if i % 2 == 0 {
            AssetJob::gpu(move || log.push(i))
        } else {
            AssetJob::cpu(move || log.push(i)).blocking()
        };
        assets.submit(job);
    }

    assert_eq!(assets.update().gpu_jobs, 5);
    assert_eq!(log.entries(), vec![0, 1, 2, 3, 4]);
}

#[test]
fn test_gpu_jobs_never_overlap_worker_jobs() {
    let (assets, _) = recording_server();
    let active = Arc::new(AtomicUsize::new(0));
    let worker_runs = ExecutionLog::new();
    let observed = ExecutionLog::new();

    for frame in 0..20 {
        for category in [JobCategory::Io, JobCategory::Cpu] {
            let active = active.clone();
            let worker_runs = worker_runs.clone();
            assets.submit(AssetJob::new(category, move || {
                active.fetch_add(1, Ordering::SeqCst);
                thread::sleep(Duration::from_micros(200));
                active.fetch_sub(1, Ordering::SeqCst);
                worker_runs.push(frame);
            }));
        }

        let active = active.clone();
        let observed = observed.clone();
        assets.submit(AssetJob::gpu(move || {
            observed.push(active.load(Ordering::SeqCst));
        }));
        assets.update();
    }

    assert!(worker_runs.wait_for_len(40, WAIT));
    assert_eq!(observed.len(), 20);
    assert!(observed.entries().iter().all(|&count| count == 0));
}

#[test]
fn test_job_release_is_deferred_to_pump() {
    let (assets, destroyed) = recording_server();
    let assets = Arc::new(assets);
    let texture = assets.allocate(AssetType::Texture);
    let done = ExecutionLog::new();

    {
        let server = assets.clone();
        let texture = texture.clone();
        let done = done.clone();
        assets.submit(AssetJob::io(move || {
            server.releaseref(&texture);
            done.push(());
        }));
    }

    assert!(done.wait_for_len(1, WAIT));
    assert_eq!(texture.refs(), 0);
    assert!(!texture.is_destroyed());
    assert!(destroyed.is_empty());

    assets.update();
    assert!(texture.is_destroyed());
    assert_eq!(destroyed.len(), 1);
}

#[test]
fn test_submit_after_shutdown_is_dropped() {
    let (assets, _) = recording_server();
    assets.shutdown().unwrap();

    let log = ExecutionLog::new();
    for category in JobCategory::ALL {
        let log = log.clone();
        assert!(!assets.is_running(category));
        assert!(!assets.submit(AssetJob::new(category, move || log.push(category))));
    }

    assert_eq!(assets.update().gpu_jobs, 0);
    assert!(!log.wait_for_len(1, Duration::from_millis(50)));
}

#[test]
fn test_queued_jobs_dropped_at_shutdown() {
    let (assets, _) = recording_server();
    let (started_tx, started_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel::<()>();
    let log = ExecutionLog::new();

    assets.submit(AssetJob::io(move || {
        started_tx.send(()).unwrap();
        let _ = release_rx.recv();
    }));
    started_rx.recv_timeout(WAIT).unwrap();

    for i in 0..3 {
        let log = log.clone();
        assets.submit(AssetJob::io(move || log.push(i)));
    }
    {
        let log = log.clone();
        assets.submit(AssetJob::gpu(move || log.push(99)));
    }

    let unblock = thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        let _ = release_tx.send(());
    });
    assets.shutdown().unwrap();
    unblock.join().unwrap();

    assert!(log.is_empty());
    assert_eq!(assets.worker_state(JobCategory::Io), WorkerState::Stopped);
}

#[test]
fn test_shutdown_times_out_on_stuck_worker() {
    let (assets, _) = recording_server_with(
        test_config().with_shutdown_timeout(Duration::from_millis(50)),
    );
    let (started_tx, started_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel::<()>();

    assets.submit(AssetJob::cpu(move || {
        started_tx.send(()).unwrap();
        let _ = release_rx.recv();
    }));
    started_rx.recv_timeout(WAIT).unwrap();

    match assets.shutdown() {
        Err(AssetError::ShutdownTimeout { categories, waited }) => {
            assert_eq!(categories, vec![JobCategory::Cpu]);
            assert_eq!(waited, Duration::from_millis(50));
        }
        other => panic!("expected a shutdown timeout, got {other:?}"),
    }
    assert_eq!(assets.worker_state(JobCategory::Io), WorkerState::Stopped);
    assert_eq!(assets.worker_state(JobCategory::Cpu), WorkerState::Stopping);

    release_tx.send(()).unwrap();
}

#[test]
fn test_panicking_job_stops_only_its_worker() {
    let (assets, _) = recording_server();
    assets.submit(AssetJob::io(|| panic!("decoder crashed")));

    let log = ExecutionLog::new();
    {
        let log = log.clone();
        assets.submit(AssetJob::cpu(move || log.push("cpu")));
    }
    assert!(log.wait_for_len(1, WAIT));

    // Give the Io worker time to unwind and close its queue.
    for _ in 0..100 {
        if assets.worker_state(JobCategory::Io) == WorkerState::Stopped {
            break;
        }
        thread::sleep(Duration::from_millis(10));
    }
    assert_eq!(assets.worker_state(JobCategory::Io), WorkerState::Stopped);
    assert!(!assets.submit(AssetJob::io(|| {})));
    assert!(assets.is_running(JobCategory::Cpu));

    assets.shutdown().unwrap();
}

#[test]
fn test_last_handle_dropped_in_worker_job() {
    let (assets, _) =
        recording_server_with(test_config().with_shutdown_timeout(Duration::from_secs(5)));
    let assets = Arc::new(assets);
    let (go_tx, go_rx) = mpsc::channel::<()>();
    let (done_tx, done_rx) = mpsc::channel();

    {
        let server = assets.clone();
        assets.submit(AssetJob::io(move || {
            let _ = go_rx.recv();
            let started = Instant::now();
            drop(server);
            done_tx.send(started.elapsed()).unwrap();
        }));
    }

    // The Io job now holds the only handle.
    drop(assets);
    go_tx.send(()).unwrap();

    let elapsed = done_rx.recv_timeout(Duration::from_secs(10)).unwrap();
    assert!(elapsed < Duration::from_secs(1), "drop took {elapsed:?}");
}

#[test]
fn test_shutdown_from_worker_job_succeeds() {
    let (assets, _) =
        recording_server_with(test_config().with_shutdown_timeout(Duration::from_secs(5)));
    let assets = Arc::new(assets);
    let (tx, rx) = mpsc::channel();

    {
        let server = assets.clone();
        assets.submit(AssetJob::io(move || {
            let started = Instant::now();
            let result = server.shutdown().map(|leaks| leaks.len());
            tx.send((result, started.elapsed())).unwrap();
        }));
    }

    let (result, elapsed) = rx.recv_timeout(WAIT).unwrap();
    assert_eq!(result.unwrap(), 0);
    assert!(elapsed < Duration::from_secs(1));

    for _ in 0..100 {
        if assets.worker_state(JobCategory::Io) == WorkerState::Stopped {
            break;
        }
        thread::sleep(Duration::from_millis(10));
    }
    assert_eq!(assets.worker_state(JobCategory::Io), WorkerState::Stopped);
    assert_eq!(assets.worker_state(JobCategory::Cpu), WorkerState::Stopped);
}

#[test]
fn test_shutdown_releases_handles_held_by_queued_jobs() {
    let (assets, _) = recording_server();
    let assets = Arc::new(assets);

    for _ in 0..3 {
        let server = assets.clone();
        assets.submit(AssetJob::gpu(move || {
            server.pending_destroy();
        }));
    }
    assert_eq!(Arc::strong_count(&assets), 4);

    assets.shutdown().unwrap();
    assert_eq!(Arc::strong_count(&assets), 1);
}
