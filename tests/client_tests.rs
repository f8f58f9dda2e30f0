use std::time::Duration;

use portscan_rs::client::{self, ClientArgs, QueryOutcome, SubmitOutcome, DEFAULT_SCHEME};
use portscan_rs::config::ServerConfig;
use portscan_rs::dispatcher::DispatcherConfig;
use portscan_rs::error::ClientError;
use portscan_rs::server;
use portscan_rs::types::State;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

fn submit_args(host: &str) -> ClientArgs {
    ClientArgs {
        host: host.to_string(),
        ips: Some(vec!["35.10.100.103".into(), "35.10.100.104".into()]),
        port: Some("8080".into()),
        scan_id: None,
    }
}

fn query_args(host: &str, id: &str) -> ClientArgs {
    ClientArgs {
        host: host.to_string(),
        scan_id: Some(id.to_string()),
        ..ClientArgs::default()
    }
}

#[test]
fn submit_needs_a_host() {
    let err = submit_args("").prepare_submit().unwrap_err();
    assert_eq!(err.to_string(), "you must provide a pscan server host");
}

#[test]
fn submit_host_must_be_valid() {
    let err = submit_args("bad host").prepare_submit().unwrap_err();
    assert!(matches!(err, ClientError::InvalidHost));
    assert_eq!(err.to_string(), "pscan server host is not valid");
}

#[test]
fn submit_needs_ips() {
    let args = ClientArgs {
        ips: None,
        ..submit_args("127.0.0.1")
    };
    let err = args.prepare_submit().unwrap_err();
    assert_eq!(err.to_string(), "you must provide a list of ips to scan");
}

#[test]
fn submit_needs_a_usable_port() {
    let mut args = submit_args("127.0.0.1");
    args.port = None;
    let err = args.prepare_submit().unwrap_err();
    assert_eq!(err.to_string(), "you must provide a port to scan");

    args.port = Some("oops".into());
    let err = args.prepare_submit().unwrap_err();
    assert_eq!(err.to_string(), "oops is not a valid port to scan");

    args.port = Some("70000".into());
    let err = args.prepare_submit().unwrap_err();
    assert_eq!(err.to_string(), "70000 is not a valid port number");
}

#[test]
fn submit_gets_default_scheme_and_path() {
    let call = submit_args("127.0.0.1:8080").prepare_submit().unwrap();
    assert_eq!(call.endpoint.scheme(), DEFAULT_SCHEME);
    assert_eq!(call.endpoint.as_str(), "http://127.0.0.1:8080/submit");
    assert_eq!(call.request.port, 8080);
}

#[test]
fn https_host_is_kept() {
    let call = submit_args("https://myserver.com").prepare_submit().unwrap();
    assert_eq!(call.endpoint.as_str(), "https://myserver.com/submit");
}

#[test]
fn query_needs_host_and_id() {
    let err = query_args("", "123").prepare_query().unwrap_err();
    assert!(matches!(err, ClientError::MissingHost));

    let err = query_args("127.0.0.1", "").prepare_query().unwrap_err();
    assert_eq!(err.to_string(), "you must provide an scan id to query");

    let err = query_args("127.0.0.1", "-1").prepare_query().unwrap_err();
    assert_eq!(err.to_string(), "not a valid scan id");
}

#[test]
fn query_gets_default_scheme() {
    let call = query_args("127.0.0.1", "123").prepare_query().unwrap();
    assert_eq!(call.endpoint.scheme(), DEFAULT_SCHEME);
    assert_eq!(call.endpoint.path(), "/query");
    assert_eq!(call.request.id, 123);
}

async fn start_server() -> (String, CancellationToken, JoinHandle<anyhow::Result<()>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let host = listener.local_addr().unwrap().to_string();
    let config = ServerConfig {
        listen_port: 0,
        grace_period: Duration::from_secs(2),
        dispatcher: DispatcherConfig {
            probe_timeout: Duration::from_secs(2),
            ..DispatcherConfig::default()
        },
    };
    let shutdown = CancellationToken::new();
    let handle = tokio::spawn(server::serve(listener, config, shutdown.clone()));
    (host, shutdown, handle)
}

#[tokio::test]
async fn end_to_end_submit_then_query() {
    let (host, shutdown, handle) = start_server().await;
    let target = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let open_port = target.local_addr().unwrap().port();

    let http = client::default_client().unwrap();
    let args = ClientArgs {
        host: host.clone(),
        ips: Some(vec!["127.0.0.1".into()]),
        port: Some(open_port.to_string()),
        scan_id: None,
    };
    let call = args.prepare_submit().unwrap();
    let id = match client::submit(&http, &call).await.unwrap() {
        SubmitOutcome::Accepted(id) => id,
        other => panic!("scan refused: {other:?}"),
    };

    let query = query_args(&host, &id.to_string()).prepare_query().unwrap();
    let mut ready = None;
    for _ in 0..200 {
        match client::query(&http, &query).await.unwrap() {
            QueryOutcome::Ready(resp) => {
                ready = Some(resp);
                break;
            }
            QueryOutcome::Pending => tokio::time::sleep(Duration::from_millis(25)).await,
            other => panic!("unexpected outcome {other:?}"),
        }
    }
    let resp = ready.expect("scan finished");
    assert_eq!(resp.port, open_port);
    assert_eq!(resp.status.len(), 1);
    assert_eq!(resp.status[0].state, State::Open);

    let unknown = query_args(&host, &id.wrapping_add(1).to_string())
        .prepare_query()
        .unwrap();
    assert_eq!(
        client::query(&http, &unknown).await.unwrap(),
        QueryOutcome::Unknown
    );

    shutdown.cancel();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("server stopped")
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn server_stops_accepting_after_shutdown() {
    let (host, shutdown, handle) = start_server().await;
    shutdown.cancel();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("server stopped")
        .unwrap()
        .unwrap();

    let http = client::default_client().unwrap();
    let call = ClientArgs {
        host,
        ips: Some(vec!["127.0.0.1".into()]),
        port: Some("9".into()),
        scan_id: None,
    }
    .prepare_submit()
    .unwrap();
    let err = client::submit(&http, &call).await.unwrap_err();
    assert!(matches!(err, ClientError::Transport(_)));
}
