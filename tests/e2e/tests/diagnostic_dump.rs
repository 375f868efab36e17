//! Delivered envelopes show up on an attached diagnostic client

use actors::{Envelope, Payload, TaskSystem};
use config::{DiagnosticsConfig, FatalPolicy};
use pool::PoolAllocator;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpStream;
use trace_collector::DiagnosticListener;
use types::{MessageKind, TaskId};

#[test_log::test(tokio::test)]
async fn client_sees_point_to_point_delivery() {
    let listener = Arc::new(DiagnosticListener::new(&DiagnosticsConfig {
        bind_address: "127.0.0.1".to_string(),
        port: 0,
        ..DiagnosticsConfig::default()
    }));
    let socket = listener.bind().await.unwrap();
    let addr = socket.local_addr().unwrap();
    let server = Arc::clone(&listener);
    tokio::spawn(async move { server.serve(socket, std::future::pending()).await });

    let mut allocator = PoolAllocator::create_pools(1);
    allocator.add_pool(4, 64).unwrap();
    let system = TaskSystem::builder(Arc::new(allocator))
        .fatal_policy(FatalPolicy::Report)
        .tap(listener.tap())
        .build()
        .unwrap();
    system.register_task(TaskId::new(1), "S1AP").unwrap();
    system.register_task(TaskId::new(2), "MME_APP").unwrap();

    let mut client = BufReader::new(TcpStream::connect(addr).await.unwrap());
    let mut greeting = String::new();
    client.read_line(&mut greeting).await.unwrap();
    assert!(greeting.contains("itti-diagnostics"));

    let buffer = system.allocate(64, 7, 1).unwrap();
    system
        .send(Envelope::new(
            MessageKind::new(7),
            TaskId::new(1),
            TaskId::new(2),
            Payload::Pooled(buffer),
        ))
        .unwrap();

    let mut line = String::new();
    client.read_line(&mut line).await.unwrap();
    let record: serde_json::Value = serde_json::from_str(&line).unwrap();
    assert_eq!(record["kind"], 7);
    assert_eq!(record["kind_name"], "kind-7");
    assert_eq!(record["origin"], 1);
    assert_eq!(record["destination"]["task"], 2);
    assert_eq!(record["payload_len"], 64);

    let envelope = system.receive(TaskId::new(2)).unwrap();
    system.release_envelope(envelope).unwrap();
    assert_eq!(system.pool_statistics().outstanding(), 0);
}
