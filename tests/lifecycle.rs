//! Lifecycle behavior: registration, state machine, readiness, borrow,
//! batch restart.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{
    CrashWorker, FailingStartWorker, NeverReadyWorker, PanicWorker, RecordingObserver, RelayWorker,
    init_tracing, wait_state,
};
use servisor::{Config, EventKind, LogObserver, RunState, ServiceManager, ServiceSpec, SvcError};

#[tokio::test]
async fn register_leaves_service_stopped_and_rejects_duplicates() {
    let manager: Arc<ServiceManager<String>> = ServiceManager::new(Config::default());

    let first = manager
        .register(ServiceSpec::new("alpha", RelayWorker::new()))
        .await
        .expect("first registration");
    assert_eq!(first.state(), RunState::Stopped);

    let err = manager
        .register(ServiceSpec::new("alpha", RelayWorker::new()))
        .await
        .expect_err("duplicate must be rejected");
    assert!(matches!(err, SvcError::AlreadyRegistered { ref name } if name == "alpha"));

    // the original registration is untouched and still reachable
    let got = manager.get("alpha").await.expect("get");
    assert!(Arc::ptr_eq(&first, &got));
    assert_eq!(manager.list().await, vec!["alpha".to_string()]);
}

#[tokio::test]
async fn get_unknown_name_is_not_found() {
    let manager: Arc<ServiceManager<String>> = ServiceManager::new(Config::default());
    let err = manager.get("ghost").await.expect_err("must not exist");
    assert!(matches!(err, SvcError::NotFound { ref name } if name == "ghost"));
    assert_eq!(err.as_label(), "svc_not_found");
}

#[tokio::test]
async fn start_is_idempotent_and_stop_is_clean() {
    let manager: Arc<ServiceManager<String>> = ServiceManager::new(Config::default());
    let svc = manager
        .register(ServiceSpec::new("alpha", RelayWorker::new()))
        .await
        .expect("register");

    svc.start().await;
    svc.await_ready(Duration::from_secs(2)).await.expect("ready");
    assert_eq!(svc.state(), RunState::Running);

    // no-op while running
    svc.start().await;
    assert_eq!(svc.state(), RunState::Running);

    svc.stop().await;
    assert_eq!(svc.state(), RunState::Stopped);

    // stop on a stopped service is a no-op too
    svc.stop().await;
    assert_eq!(svc.state(), RunState::Stopped);
}

#[tokio::test]
async fn await_ready_can_race_with_start() {
    let manager: Arc<ServiceManager<String>> = ServiceManager::new(Config::default());
    let svc = manager
        .register(ServiceSpec::new("alpha", RelayWorker::new()))
        .await
        .expect("register");

    let waiter = {
        let svc = svc.clone();
        tokio::spawn(async move { svc.await_ready(Duration::from_secs(2)).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    svc.start().await;

    waiter.await.expect("join").expect("ready");
    assert_eq!(svc.state(), RunState::Running);
}

#[tokio::test]
async fn worker_failure_is_crashed_not_stopped() {
    let manager: Arc<ServiceManager<String>> = ServiceManager::new(Config::default());
    let worker = CrashWorker::new();
    let svc = manager
        .register(ServiceSpec::new("pppp", worker.clone()))
        .await
        .expect("register");

    svc.start().await;
    svc.await_ready(Duration::from_secs(2)).await.expect("ready");

    worker.crash();
    wait_state(&svc, RunState::Crashed).await;
    assert_eq!(svc.state(), RunState::Crashed);

    // a crashed service can be started again
    svc.start().await;
    svc.await_ready(Duration::from_secs(2))
        .await
        .expect("recovered");
    assert_eq!(svc.state(), RunState::Running);
}

#[tokio::test]
async fn await_ready_surfaces_a_crash_while_waiting() {
    let manager: Arc<ServiceManager<String>> = ServiceManager::new(Config::default());
    let worker = FailingStartWorker::new();
    let svc = manager
        .register(ServiceSpec::new("flaky", worker.clone()))
        .await
        .expect("register");

    svc.start().await;
    let waiter = {
        let svc = svc.clone();
        tokio::spawn(async move { svc.await_ready(Duration::from_secs(2)).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    worker.fail_now();

    // the waiter fails fast with Crashed, not by running out its timeout
    let err = waiter
        .await
        .expect("join")
        .expect_err("worker died while a waiter was blocked");
    assert!(matches!(err, SvcError::Crashed { ref name } if name == "flaky"));
    wait_state(&svc, RunState::Crashed).await;
}

#[tokio::test]
async fn ensure_running_starts_stopped_services() {
    let manager: Arc<ServiceManager<String>> = ServiceManager::new(Config::default());
    let svc = manager
        .register(ServiceSpec::new("alpha", RelayWorker::new()))
        .await
        .expect("register");

    assert_eq!(svc.state(), RunState::Stopped);
    svc.ensure_running().await.expect("ensure");
    assert_eq!(svc.state(), RunState::Running);

    // already running: plain no-op
    svc.ensure_running().await.expect("still running");
}

#[tokio::test]
async fn ensure_running_times_out_on_stuck_worker() {
    let manager: Arc<ServiceManager<String>> = ServiceManager::new(Config::default());
    let svc = manager
        .register(
            ServiceSpec::new("stuck", Arc::new(NeverReadyWorker))
                .with_ready_timeout(Duration::from_millis(100)),
        )
        .await
        .expect("register");

    let err = svc.ensure_running().await.expect_err("never becomes ready");
    assert!(matches!(err, SvcError::ReadyTimeout { ref name, .. } if name == "stuck"));
    // state stays observable so the caller can decide on a full restart
    assert_eq!(svc.state(), RunState::Starting);

    svc.stop().await;
    assert_eq!(svc.state(), RunState::Stopped);
}

#[tokio::test]
async fn restart_all_reports_exactly_the_failed_services() {
    let manager: Arc<ServiceManager<String>> = ServiceManager::new(Config::default());
    manager
        .register(ServiceSpec::new("good-a", RelayWorker::new()))
        .await
        .expect("register");
    manager
        .register(ServiceSpec::new("good-b", RelayWorker::new()))
        .await
        .expect("register");
    manager
        .register(
            ServiceSpec::new("bad", Arc::new(NeverReadyWorker))
                .with_ready_timeout(Duration::from_millis(100)),
        )
        .await
        .expect("register");

    let err = manager
        .restart_all(true)
        .await
        .expect_err("one service cannot become ready");
    assert_eq!(err.names(), vec!["bad"]);

    // the failure did not abort the others
    for name in ["good-a", "good-b"] {
        let svc = manager.get(name).await.expect("get");
        assert_eq!(svc.state(), RunState::Running, "{name} should be running");
    }
}

#[tokio::test]
async fn restart_all_records_a_panicking_worker_as_failed() {
    let manager: Arc<ServiceManager<String>> = ServiceManager::new(Config::default());
    manager
        .register(ServiceSpec::new("good", RelayWorker::new()))
        .await
        .expect("register");
    manager
        .register(ServiceSpec::new("boom", Arc::new(PanicWorker)))
        .await
        .expect("register");

    let err = manager
        .restart_all(true)
        .await
        .expect_err("panicking worker must be reported");
    assert_eq!(err.names(), vec!["boom"]);

    let good = manager.get("good").await.expect("get");
    assert_eq!(good.state(), RunState::Running);
}

#[tokio::test]
async fn restart_all_without_ready_wait_succeeds() {
    let manager: Arc<ServiceManager<String>> = ServiceManager::new(Config::default());
    manager
        .register(ServiceSpec::new("good", RelayWorker::new()))
        .await
        .expect("register");
    manager
        .register(ServiceSpec::new("bad", Arc::new(NeverReadyWorker)))
        .await
        .expect("register");

    manager
        .restart_all(false)
        .await
        .expect("no readiness check requested");
}

#[tokio::test]
async fn borrow_is_exclusive_per_name_only() {
    let manager: Arc<ServiceManager<String>> = ServiceManager::new(Config::default());
    manager
        .register(ServiceSpec::new("alpha", RelayWorker::new()))
        .await
        .expect("register");
    manager
        .register(ServiceSpec::new("beta", RelayWorker::new()))
        .await
        .expect("register");

    let guard = manager.borrow("alpha").await.expect("first borrow");

    // same name: blocked while the guard is held
    assert!(
        tokio::time::timeout(Duration::from_millis(100), manager.borrow("alpha"))
            .await
            .is_err(),
        "second borrower acquired a held lock"
    );

    // different name: no contention
    let other = manager.borrow("beta").await.expect("independent borrow");
    drop(other);

    // released on drop; the next borrower gets through
    drop(guard);
    tokio::time::timeout(Duration::from_secs(1), manager.borrow("alpha"))
        .await
        .expect("borrow after release")
        .expect("borrow");
}

#[tokio::test]
async fn borrow_exposes_typed_worker_and_running_policy() {
    let manager: Arc<ServiceManager<String>> = ServiceManager::new(Config::default());
    manager
        .register(ServiceSpec::new("alpha", RelayWorker::new()))
        .await
        .expect("register");

    let guard = manager.borrow("alpha").await.expect("borrow");
    assert!(guard.worker::<RelayWorker>().is_some());
    assert!(guard.worker::<CrashWorker>().is_none());

    // stopped service: the opt-in policy check fails
    let err = guard.require_running().expect_err("not running");
    assert!(matches!(
        err,
        SvcError::ServiceStopped {
            state: RunState::Stopped,
            ..
        }
    ));
    drop(guard);

    manager
        .get("alpha")
        .await
        .expect("get")
        .ensure_running()
        .await
        .expect("start");
    let guard = manager.borrow("alpha").await.expect("borrow");
    guard.require_running().expect("running now");

    let err = manager.borrow("ghost").await.expect_err("unregistered");
    assert!(matches!(err, SvcError::NotFound { .. }));
}

#[tokio::test]
async fn attached_observers_see_lifecycle_events_in_order() {
    init_tracing();
    let manager: Arc<ServiceManager<String>> = ServiceManager::new(Config::default());
    manager.attach(Arc::new(LogObserver));
    let recorder = Arc::new(RecordingObserver::default());
    manager.attach(recorder.clone());

    let svc = manager
        .register(ServiceSpec::new("alpha", RelayWorker::new()))
        .await
        .expect("register");
    svc.ensure_running().await.expect("up");
    svc.stop().await;

    // delivery is asynchronous; wait for the final event to land
    tokio::time::timeout(Duration::from_secs(2), async {
        while !recorder.kinds().contains(&EventKind::ServiceStopped) {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("stop event never reached the observer");

    assert_eq!(
        recorder.kinds(),
        vec![
            EventKind::ServiceRegistered,
            EventKind::ServiceStarting,
            EventKind::ServiceReady,
            EventKind::ServiceStopping,
            EventKind::ServiceStopped,
        ]
    );
}

#[tokio::test]
async fn stop_all_stops_every_service() {
    let manager: Arc<ServiceManager<String>> = ServiceManager::new(Config::default());
    let a = manager
        .register(ServiceSpec::new("a", RelayWorker::new()))
        .await
        .expect("register");
    let b = manager
        .register(ServiceSpec::new("b", RelayWorker::new()))
        .await
        .expect("register");

    a.ensure_running().await.expect("a up");
    b.ensure_running().await.expect("b up");

    manager.stop_all().await;
    assert_eq!(a.state(), RunState::Stopped);
    assert_eq!(b.state(), RunState::Stopped);
}
