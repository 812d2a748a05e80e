//! Chat Relay Client - Entry Point
//!
//! Connects to a relay, asks for a username, then forwards stdin lines
//! to the server and prints whatever the server sends.

use std::env;

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

use chat_relay::{LineCodec, COMMAND_PREFIX, MAX_MESSAGE_LEN};

/// Default server address
const DEFAULT_ADDR: &str = "127.0.0.1:55065";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let addr = env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_ADDR.to_string());

    let stream = TcpStream::connect(&addr).await?;
    debug!("Connected to {}", addr);
    let (read_half, write_half) = stream.into_split();
    let mut server_lines = FramedRead::new(read_half, LineCodec::new());
    let mut sink = FramedWrite::new(write_half, LineCodec::new());

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    stdout.write_all(b"Username: ").await?;
    stdout.flush().await?;
    if let Some(username) = stdin.next_line().await? {
        let username = username.trim();
        if !username.is_empty() {
            sink.send(format!("{}NAME {}", COMMAND_PREFIX, username))
                .await?;
        }
    }

    // Print server lines until the server hangs up
    let printer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(line) = server_lines.next().await {
            match line {
                Ok(line) => {
                    let out = format!("{}\n", line);
                    if stdout.write_all(out.as_bytes()).await.is_err() {
                        break;
                    }
                    let _ = stdout.flush().await;
                }
                Err(e) => {
                    error!("Connection error: {}", e);
                    break;
                }
            }
        }
    });

    let forward = async {
        while let Some(line) = stdin.next_line().await? {
            if line.len() > MAX_MESSAGE_LEN {
                eprintln!(
                    "message too long ({} bytes, max {})",
                    line.len(),
                    MAX_MESSAGE_LEN
                );
                continue;
            }
            if line.trim().is_empty() {
                continue;
            }
            sink.send(line).await?;
        }
        Ok::<_, Box<dyn std::error::Error>>(())
    };

    tokio::select! {
        result = forward => result?,
        _ = printer => {
            eprintln!("connection closed by server");
            // stdin is read on a blocking thread that would hold the runtime open
            std::process::exit(0);
        }
    }

    Ok(())
}
