//! Raspberry Pi camera and microphone streamer
//!
//! Run with: cargo run --example pi_streamer [BIND_ADDR] [AUDIO_DEVICE]
//!
//! Examples:
//!   cargo run --example pi_streamer                        # binds to 0.0.0.0:8080
//!   cargo run --example pi_streamer 127.0.0.1:9000         # custom bind address
//!   cargo run --example pi_streamer 0.0.0.0:8080 hw:1,0    # other ALSA device
//!
//! Then open http://<pi-address>:8080/ and press Start.
//!
//! Requires `libcamera-vid` and `arecord` on the PATH. Use `arecord -l` to
//! list capture devices. Set `RUST_LOG=camcast=debug` for per-viewer logs.

use std::net::SocketAddr;

use camcast::{CaptureCommand, CaptureConfig, ServerConfig, StreamServer};
use tracing_subscriber::EnvFilter;

fn parse_bind_addr(arg: Option<String>) -> Result<SocketAddr, Box<dyn std::error::Error>> {
    match arg.as_deref() {
        None => Ok(SocketAddr::from(([0, 0, 0, 0], 8080))),
        Some("localhost") => Ok(SocketAddr::from(([127, 0, 0, 1], 8080))),
        Some(s) => Ok(s.parse()?),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let bind_addr = parse_bind_addr(args.next())?;
    let device = args.next().unwrap_or_else(|| "plughw:3,0".to_string());

    let capture = CaptureConfig::default()
        .video(CaptureCommand::libcamera_mjpeg(640, 480, 15))
        .audio(CaptureCommand::arecord_pcm(&device));
    let config = ServerConfig::with_addr(bind_addr).capture(capture);

    let server = StreamServer::new(config);
    println!("camcast listening on http://{}", server.bind_addr());
    println!("Press Ctrl+C to stop");

    server
        .run_until(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    println!("camcast stopped");
    Ok(())
}
