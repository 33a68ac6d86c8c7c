//! Loopback stand-in for the upstream inventory feed. Point `server_inventory`
//! at it with `WEBSOCKET_HOST=127.0.0.1` and watch the dashboard move.

use clap::Parser;
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{accept_async, tungstenite::protocol::Message};

use project_tests::{init_logging, reading_json};

const STORES: [&str; 3] = ["ALDO Centre Eaton", "ALDO Destiny USA Mall", "ALDO Pheasant Lane Mall"];
const MODELS: [&str; 4] = ["ADERI", "MIRIRA", "CAELAN", "BUTAUD"];

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Port to listen on
    #[clap(short, long, default_value_t = 8080)]
    port: u16,

    /// Milliseconds between readings
    #[clap(short, long, default_value_t = 1000)]
    interval_ms: u64,

    /// Close each connection after this many readings (0 = never)
    #[clap(short, long, default_value_t = 0)]
    close_after: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let args = Args::parse();

    let listener = TcpListener::bind(("127.0.0.1", args.port)).await?;
    println!("Upstream feed on ws://127.0.0.1:{}/", args.port);

    loop {
        let (stream, peer) = listener.accept().await?;
        println!("Client {} connected", peer);
        tokio::spawn(stream_readings(stream, Duration::from_millis(args.interval_ms), args.close_after));
    }
}

async fn stream_readings(stream: TcpStream, interval: Duration, close_after: u64) {
    let mut ws = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            eprintln!("Handshake failed: {}", e);
            return;
        }
    };

    let mut ticker = tokio::time::interval(interval);
    let mut sent: u64 = 0;
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let i = sent as usize;
                let text = reading_json(STORES[i % STORES.len()], MODELS[(i / STORES.len()) % MODELS.len()], ((i * 7) % 40) as u32);
                if ws.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
                sent += 1;
                if close_after > 0 && sent >= close_after {
                    let _ = ws.close(None).await;
                    break;
                }
            }
            incoming = ws.next() => {
                if !matches!(incoming, Some(Ok(_))) {
                    break;
                }
            }
        }
    }
    println!("Client disconnected after {} reading(s)", sent);
}
