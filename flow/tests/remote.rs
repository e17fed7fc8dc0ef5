#![cfg(feature = "test-utils")]

use flow::concurrency::shutdown::create_shutdown_channel;
use flow::error::ErrorKind;
use flow::item::{Item, ItemStatus, RemoteItem};
use flow::remote::{Proxy, ProxyClient, RemoteId, RemoteOperation};
use flow::test_utils::pipeline::{
    assert_rendered_entries, create_remote_pipeline, test_pipeline_config,
};
use flow::test_utils::stub_server::spawn_stub_server;
use flow::test_utils::twin_server::spawn_twin_server;
use flow::workers::base::Worker;
use std::net::SocketAddr;
use std::time::Duration;
use telemetry::tracing::init_test_tracing;
use tokio::time::timeout;

async fn connect(address: SocketAddr) -> ProxyClient {
    let (shutdown_tx, shutdown_rx) = create_shutdown_channel();
    let (client, proxy) = Proxy::connect(address.to_string(), shutdown_rx)
        .await
        .unwrap();

    tokio::spawn(async move {
        let _shutdown_tx = shutdown_tx;
        proxy.run().await
    });

    client
}

#[tokio::test(flavor = "multi_thread")]
async fn remote_item_reports_status_of_its_twin() {
    init_test_tracing();

    let server = spawn_stub_server(|request| match request {
        "7,donne_statut" => Some("V".to_owned()),
        _ => Some("unexpected".to_owned()),
    })
    .await;
    let item = RemoteItem::new(RemoteId(7), connect(server.address()).await);

    assert_eq!(item.status().await.unwrap(), ItemStatus::Void);
    assert_eq!(server.requests(), vec!["7,donne_statut".to_owned()]);
}

#[tokio::test(flavor = "multi_thread")]
async fn unknown_status_is_a_protocol_error() {
    init_test_tracing();

    let server = spawn_stub_server(|_| Some("maybe".to_owned())).await;
    let item = RemoteItem::new(RemoteId(1), connect(server.address()).await);

    let err = item.status().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RemoteProtocolError);
}

#[tokio::test(flavor = "multi_thread")]
async fn every_operation_is_one_round_trip() {
    init_test_tracing();

    let server = spawn_stub_server(|request| {
        Some(match request.split_once(',').map(|(_, op)| op) {
            Some("vers_string") => "PARIS (1 steps)".to_owned(),
            Some("donne_statut") => "C".to_owned(),
            _ => "OK".to_owned(),
        })
    })
    .await;
    let mut item = RemoteItem::new(RemoteId(3), connect(server.address()).await);

    item.initialize().await.unwrap();
    item.advance().await.unwrap();
    assert_eq!(item.status().await.unwrap(), ItemStatus::Complete);
    assert_eq!(item.render().await.unwrap(), "PARIS (1 steps)");

    assert_eq!(
        server.requests(),
        vec![
            "3,initialise".to_owned(),
            "3,travaille".to_owned(),
            "3,donne_statut".to_owned(),
            "3,vers_string".to_owned(),
        ]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn closed_connection_makes_the_remote_unavailable() {
    init_test_tracing();

    let server = spawn_stub_server(|request| {
        if request.starts_with("1,") {
            Some("V".to_owned())
        } else {
            None
        }
    })
    .await;
    let client = connect(server.address()).await;

    assert_eq!(
        client.call(RemoteId(1), RemoteOperation::Status).await.unwrap(),
        "V"
    );

    let err = client
        .call(RemoteId(2), RemoteOperation::Status)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RemoteUnavailable);

    // The connection is not trusted anymore, even for requests the server would answer.
    let err = client
        .call(RemoteId(1), RemoteOperation::Status)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RemoteUnavailable);
}

#[tokio::test(flavor = "multi_thread")]
async fn unreachable_service_fails_to_connect() {
    init_test_tracing();

    // Bind and release a port so nothing listens on it.
    let address = {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };
    let (_shutdown_tx, shutdown_rx) = create_shutdown_channel();

    let err = Proxy::connect(address.to_string(), shutdown_rx)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RemoteUnavailable);
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_callers_are_served_one_at_a_time() {
    init_test_tracing();

    let server = spawn_twin_server(3).await;
    let client = connect(server.address()).await;

    let callers = (0..16u64)
        .map(|id| {
            let client = client.clone();
            tokio::spawn(async move {
                client.call(RemoteId(id), RemoteOperation::Create).await?;
                client.call(RemoteId(id), RemoteOperation::Status).await
            })
        })
        .collect::<Vec<_>>();

    for caller in callers {
        assert_eq!(caller.await.unwrap().unwrap(), "V");
    }
    assert_eq!(server.created(), 16);
}

#[tokio::test(flavor = "multi_thread")]
async fn pipeline_with_remote_producers_logs_remote_items() {
    init_test_tracing();

    let server = spawn_twin_server(3).await;
    let mut config = test_pipeline_config();
    config.producers = 0;
    config.remote_producers = 2;
    config.max_pending_transforms = 3;

    let pipeline = create_remote_pipeline(config, server.address());
    let log = timeout(
        Duration::from_secs(5),
        pipeline.run_for(Duration::from_millis(300)),
    )
    .await
    .expect("pipeline should stop shortly after its run duration")
    .unwrap();

    assert!(!log.is_empty());
    assert!(server.created() >= log.len());
    assert_rendered_entries(&log, 3);
}

#[tokio::test(flavor = "multi_thread")]
async fn pipeline_start_fails_when_remote_is_unreachable() {
    init_test_tracing();

    let address = {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };
    let mut config = test_pipeline_config();
    config.remote_producers = 1;

    let mut pipeline = create_remote_pipeline(config, address);
    let err = pipeline.start().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::RemoteUnavailable);
    assert!(pipeline.managers().is_empty());
}
