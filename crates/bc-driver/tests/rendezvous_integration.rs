//! Rendezvous integration tests
//!
//! Announces over real loopback connections and checks what lands in the
//! registry.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::timeout;

use bc_core::types::{AgentEndpoint, Generation};
use bc_driver::server::{RendezvousHandle, RendezvousServer};
use bc_driver::{AddressResolver, AgentRegistry};

async fn start() -> (Arc<AgentRegistry>, RendezvousHandle) {
    let registry = Arc::new(AgentRegistry::new());
    let handle = RendezvousServer::spawn(Arc::clone(&registry), "127.0.0.1:0")
        .await
        .expect("Failed to start rendezvous server");
    (registry, handle)
}

/// Send one line over a new connection and close it
async fn announce(handle: &RendezvousHandle, line: &str) {
    let mut stream = TcpStream::connect(handle.local_addr())
        .await
        .expect("Failed to connect to rendezvous server");
    stream.write_all(line.as_bytes()).await.unwrap();
    stream.shutdown().await.unwrap();
}

/// Give connection handlers a moment to run
async fn settle() {
    tokio::time::sleep(Duration::from_millis(100)).await;
}

#[tokio::test]
async fn test_port_announce_creates_fresh_entry() {
    let (registry, handle) = start().await;

    announce(&handle, "PORT:9999:worker-1\n").await;

    let resolver = AddressResolver::new(Arc::clone(&registry));
    let snapshot = timeout(Duration::from_secs(5), async {
        let mut received = registry.subscribe();
        let ok = received.wait_for(|flag| *flag).await.is_ok();
        ok
    })
    .await
    .unwrap();
    assert!(snapshot);
    assert_eq!(
        registry.list(false),
        vec![AgentEndpoint {
            address: "127.0.0.1:9999".to_string(),
            name: "worker-1".to_string(),
            generation: Generation::Fresh,
        }]
    );

    let address = resolver
        .resolve(Some("worker"), false, Duration::from_secs(1))
        .await
        .unwrap();
    assert_eq!(address, "127.0.0.1:9999");
}

#[tokio::test]
async fn test_dialog_leaves_registry_unchanged() {
    let (registry, handle) = start().await;

    announce(&handle, "DIALOG:Security Warning\n").await;
    announce(&handle, "HELLO:there\n").await;
    settle().await;

    assert!(registry.is_empty());
    assert!(!registry.is_signaled());
}

#[tokio::test]
async fn test_concurrent_announces_are_all_recorded() {
    let (registry, handle) = start().await;

    let mut tasks = Vec::new();
    for i in 0..20u16 {
        let address = handle.local_addr();
        tasks.push(tokio::spawn(async move {
            let mut stream = TcpStream::connect(address).await.unwrap();
            let line = format!("PORT:{}:agent-{}\n", 5000 + i, i);
            stream.write_all(line.as_bytes()).await.unwrap();
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    timeout(Duration::from_secs(5), async {
        while registry.len() < 20 {
            settle().await;
        }
    })
    .await
    .expect("Not every announce was recorded");
    assert!(registry.list(true).iter().all(AgentEndpoint::is_fresh));
}

#[tokio::test]
async fn test_resolver_waits_for_late_announce() {
    let (registry, handle) = start().await;
    registry.append("127.0.0.1:1111", "previous-run");
    registry.age_all();

    let resolver = AddressResolver::new(Arc::clone(&registry));
    let waiting =
        tokio::spawn(async move { resolver.resolve(None, false, Duration::from_secs(5)).await });

    settle().await;
    announce(&handle, "PORT:2222:new-run\n").await;

    let address = waiting.await.unwrap().unwrap();
    assert_eq!(address, "127.0.0.1:2222");
    assert_eq!(registry.list(true)[0].name, "previous-run");
}
