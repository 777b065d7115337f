//! A minimal channel backend: approves anything with non-empty content and
//! "delivers" by logging it. Useful for exercising a `courier` instance
//! locally without a real SMS/email provider behind it.

use clap::Parser;
use courier_common::logging;
use courier_rpc::{ApproveReply, BackendRequest, BackendResponse, DeliverReply, WireError, read_frame, write_frame};
use tokio::net::{TcpListener, TcpStream};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "courier-backend-demo")]
struct Args {
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    #[arg(long, default_value_t = 5000)]
    port: u16,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();
    let args = Args::parse();

    let addr = format!("{}:{}", args.host, args.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("serving demo backend at {addr}");

    loop {
        let (stream, peer) = listener.accept().await?;
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream).await {
                warn!(%peer, error = %e, "error handling backend connection");
            }
        });
    }
}

async fn handle_connection(mut stream: TcpStream) -> courier_rpc::Result<()> {
    let request: BackendRequest = read_frame(&mut stream).await?;

    let response = match request {
        BackendRequest::Approve { content } => {
            if content.is_empty() {
                BackendResponse::Approve(ApproveReply {
                    valid: false,
                    error: Some(WireError::new(400, "invalid message content")),
                })
            } else {
                BackendResponse::Approve(ApproveReply { valid: true, error: None })
            }
        }
        BackendRequest::Deliver { content } => {
            info!(bytes = content.len(), "message received: {}", String::from_utf8_lossy(&content));
            BackendResponse::Deliver(DeliverReply { error: None })
        }
    };

    write_frame(&mut stream, &response).await
}
