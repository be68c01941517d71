//! Subscribe to dialog events and print every notification.
//!
//! By default the example starts a simulated MI on loopback that acknowledges
//! `event_subscribe` and then pushes a few `E_DIALOG_ID` notifications to the
//! registered socket. Point it at a real OpenSIPS MI with `MI_ADDR`:
//!
//! ```text
//! MI_ADDR=10.0.0.2:8080 CALL_EVENTS_LOG_MODE=development cargo run --example dialog_events
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use call_events::{create_backend, logging, EventsConfig, Notification, Subscription};
use mi_client::DatagramMiClient;
use serde_json::{json, Value};
use tokio::net::UdpSocket;

/// Answer `event_subscribe` and push a short dialog lifecycle to each new socket
async fn simulated_mi() -> Result<SocketAddr, Box<dyn std::error::Error>> {
    let socket = UdpSocket::bind("127.0.0.1:0").await?;
    let addr = socket.local_addr()?;

    tokio::spawn(async move {
        let mut buffer = vec![0u8; 65535];
        while let Ok((len, peer)) = socket.recv_from(&mut buffer).await {
            let Ok(request) = serde_json::from_slice::<Value>(&buffer[..len]) else {
                continue;
            };
            let reply = json!({"jsonrpc": "2.0", "result": "OK", "id": request["id"]});
            let _ = socket.send_to(reply.to_string().as_bytes(), peer).await;

            let params = &request["params"];
            if params["expire"] == 0 {
                continue;
            }
            let (Some(event), Some(target)) = (
                params["event"].as_str().map(str::to_string),
                params["socket"]
                    .as_str()
                    .and_then(|s| s.strip_prefix("udp:"))
                    .and_then(|s| s.parse::<SocketAddr>().ok()),
            ) else {
                continue;
            };

            tokio::spawn(async move {
                let Ok(pusher) = UdpSocket::bind("127.0.0.1:0").await else {
                    return;
                };
                for state in [1, 3, 4, 5] {
                    tokio::time::sleep(Duration::from_millis(300)).await;
                    let notification = Notification::new(
                        event.clone(),
                        json!({"id": "3f2a9c81", "state": state, "callid": "a84b4c76e66710"}),
                    );
                    let _ = pusher.send_to(&notification.to_vec(), target).await;
                }
            });
        }
    });

    Ok(addr)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if !logging::is_initialized() {
        logging::init_logging_from_env()?;
    }

    let mi_addr: SocketAddr = match std::env::var("MI_ADDR") {
        Ok(addr) => addr.parse()?,
        Err(_) => {
            let addr = simulated_mi().await?;
            println!("Started simulated MI at {}", addr);
            addr
        }
    };

    let client = DatagramMiClient::connect(mi_addr).await?;
    let backend = create_backend(Arc::new(client), EventsConfig::default())?;

    let subscription = backend
        .subscribe(
            "E_DIALOG_ID",
            Arc::new(|sub: Arc<dyn Subscription>, notification: Notification| {
                println!(
                    "[{}] {} -> {}",
                    sub.identity(),
                    notification.method,
                    notification.params
                );
            }),
        )
        .await?;

    println!(
        "Subscribed to {} on {}; waiting for notifications (Ctrl-C to stop)",
        subscription.event(),
        subscription.identity()
    );

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = tokio::time::sleep(Duration::from_secs(3)), if std::env::var("MI_ADDR").is_err() => {}
    }

    subscription.unsubscribe().await;
    backend.close().await;
    println!("Unsubscribed");
    Ok(())
}
