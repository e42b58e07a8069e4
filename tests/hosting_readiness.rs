//! Exercises `ProcessLauncher`'s readiness probe against a real HTTP server,
//! using a trivial shell command as the supervised "child" (no `dotnet`/
//! `npm` toolchain is assumed to be present in the test environment).

use std::collections::HashMap;
use std::time::Duration;

use fluent_harness_core::hosting::launch_plan::{LaunchPlan, ReadinessProbeKind};
use fluent_harness_core::hosting::launcher::ProcessLauncher;
use tokio_util::sync::CancellationToken;
use url::Url;

fn plan_for(base_url: Url, startup_timeout: Duration) -> LaunchPlan {
    LaunchPlan {
        executable: "sh".to_string(),
        arguments: vec!["-c".to_string(), "sleep 5".to_string()],
        working_directory: None,
        environment: HashMap::new(),
        base_url,
        startup_timeout,
        health_check_endpoints: vec!["/".to_string()],
        readiness_probe_kind: ReadinessProbeKind::Http,
        initial_delay: Duration::from_millis(0),
        poll_interval: Duration::from_millis(20),
        stream_output: false,
        redacted_env_keys: Vec::new(),
        process_name: None,
    }
}

#[tokio::test]
async fn launcher_becomes_ready_once_the_health_endpoint_responds() {
    let server = tiny_http::Server::http("127.0.0.1:0").unwrap();
    let addr = server.server_addr();
    let base_url = Url::parse(&format!("http://{addr}")).unwrap();

    let server_thread = std::thread::spawn(move || {
        if let Ok(request) = server.recv() {
            let _ = request.respond(tiny_http::Response::from_string("ok"));
        }
    });

    let plan = plan_for(base_url, Duration::from_secs(5));
    let launcher = ProcessLauncher::new(plan);
    let (result, handle) = launcher.start(CancellationToken::new()).await.unwrap();
    assert_eq!(result.base_url.port(), Some(addr.port()));

    ProcessLauncher::dispose(handle).await.unwrap();
    server_thread.join().unwrap();
}

#[tokio::test]
async fn launcher_reports_a_readiness_timeout_when_nothing_answers() {
    // Nothing is listening on this port.
    let base_url = Url::parse("http://127.0.0.1:1").unwrap();
    let plan = plan_for(base_url, Duration::from_millis(150));
    let launcher = ProcessLauncher::new(plan);
    let err = launcher.start(CancellationToken::new()).await.unwrap_err();
    assert!(matches!(err, fluent_harness_core::Error::ReadinessTimeout { .. }));
}
