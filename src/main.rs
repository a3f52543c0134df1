//! # RC Link
//!
//! Demo harness for the command-acquisition layer: wires a pilot-input
//! transport to a receiver and runs a fixed-rate poll loop in place of the
//! real control loop.
//!
//! The input-arrival context is a spawned read task holding the feed
//! handle; the poll loop below stands in for the flight controller's
//! fixed-cadence cycle and owns the failsafe decision.

use anyhow::Result;
use bytes::BytesMut;
use tokio::io::AsyncReadExt;
use tokio::net::TcpListener;
use tokio::time::{interval, Duration};
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info, warn};

mod clock;
mod config;
mod decoder;
mod error;
mod handoff;
mod mapper;
mod protocol;
mod receiver;
mod supervisor;

use clock::{MonotonicClock, StdClock};
use config::{Config, TransportKind};
use receiver::{MessageFeed, Receiver, StreamFeed};

/// Main entry point for the RC Link demo harness
///
/// Loads configuration (path given as the first argument, defaults
/// otherwise), wires the configured transport's read task to a receiver,
/// and polls it at the configured rate until Ctrl+C.
///
/// # Errors
///
/// Returns error if the configuration is invalid, or if the transport
/// cannot be opened (serial device missing, TCP port taken).
#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("RC Link v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = match std::env::args().nth(1) {
        Some(path) => {
            info!("Loading configuration from {}", path);
            Config::load(path)?
        }
        None => {
            let config = Config::default();
            config.validate()?;
            config
        }
    };

    match config.transport.kind {
        TransportKind::Serial => {
            let (receiver, feed) = Receiver::stream(&config.receiver, StdClock::new())?;

            let port = tokio_serial::new(&config.transport.serial_path, config.transport.baud_rate)
                .open_native_async()?;
            info!(
                "Reading pilot input from {} at {} baud",
                config.transport.serial_path, config.transport.baud_rate
            );

            tokio::spawn(read_serial(port, feed));
            run_poll_loop(receiver, &config).await
        }
        TransportKind::Tcp => {
            let (receiver, feed) = Receiver::message(&config.receiver, StdClock::new())?;

            let listener = TcpListener::bind(&config.transport.bind_addr).await?;
            info!(
                "Listening for command client on {}",
                config.transport.bind_addr
            );

            tokio::spawn(serve_commands(listener, feed));
            run_poll_loop(receiver, &config).await
        }
    }
}

/// Serial read task: the input-arrival context for the streaming transport.
async fn read_serial(mut port: tokio_serial::SerialStream, mut feed: StreamFeed) {
    let mut buf = BytesMut::with_capacity(256);

    loop {
        buf.clear();
        match port.read_buf(&mut buf).await {
            Ok(0) => {
                warn!("Serial port closed");
                break;
            }
            Ok(_) => feed.feed_all(&buf),
            Err(e) => {
                warn!("Serial read failed: {}", e);
                break;
            }
        }
    }
}

/// TCP accept/read task: the input-arrival context for the command transport.
///
/// Serves one client at a time; a new connection after a drop is the
/// transport's reconnect signal.
async fn serve_commands(listener: TcpListener, mut feed: MessageFeed) {
    loop {
        let (mut socket, addr) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!("Accept failed: {}", e);
                continue;
            }
        };

        info!("Command client connected from {}", addr);
        feed.client_connected();

        let mut buf = BytesMut::with_capacity(1024);
        loop {
            buf.clear();
            match socket.read_buf(&mut buf).await {
                Ok(0) => {
                    info!("Command client from {} disconnected", addr);
                    break;
                }
                Ok(_) => feed.feed_all(&buf),
                Err(e) => {
                    warn!("Command socket read failed: {}", e);
                    break;
                }
            }
        }

        feed.client_disconnected();
    }
}

/// Fixed-rate poll loop standing in for the flight controller's control loop.
async fn run_poll_loop<C: MonotonicClock>(
    mut receiver: Receiver<C>,
    config: &Config,
) -> Result<()> {
    let period_micros = 1_000_000 / config.control_loop.poll_rate_hz as u64;
    let mut poll_interval = interval(Duration::from_micros(period_micros));

    info!(
        "Polling receiver at {}Hz (failsafe timeout {}ms)",
        config.control_loop.poll_rate_hz, config.receiver.failsafe_timeout_ms
    );
    info!("Press Ctrl+C to exit");

    let mut cycles: u64 = 0;
    let mut frames: u64 = 0;
    let mut was_lost = false;

    loop {
        tokio::select! {
            _ = poll_interval.tick() => {
                if receiver.poll() {
                    frames += 1;
                }

                let lost = receiver.lost_signal();
                if lost && !was_lost {
                    // The consumer owns the failsafe demand set; here we
                    // only demonstrate that the last demands are retained.
                    warn!(
                        "Signal lost; holding last demands T={:.3} R={:.3} P={:.3} Y={:.3}",
                        receiver.demands().throttle(),
                        receiver.demands().roll(),
                        receiver.demands().pitch(),
                        receiver.demands().yaw(),
                    );
                } else if !lost && was_lost {
                    info!("Signal restored");
                }
                was_lost = lost;

                cycles += 1;
                if cycles % config.control_loop.status_interval_cycles == 0 {
                    debug!(
                        "Cycle {}: {} frames consumed, link state {:?}, demands {:?}",
                        cycles, frames, receiver.link_state(), receiver.demands().as_slice(),
                    );
                }
            }

            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                info!("Total cycles: {}, frames consumed: {}", cycles, frames);
                break;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_poll_period() {
        let config = Config::default();
        let period_micros = 1_000_000 / config.control_loop.poll_rate_hz as u64;
        assert_eq!(period_micros, 10_000, "100Hz default is a 10ms period");
    }

    #[tokio::test]
    async fn test_tcp_feed_path_end_to_end() {
        use crate::protocol::checksum::checksum_xor;
        use crate::protocol::{MSG_DIRECTION_IN, MSG_HEADER_DOLLAR, MSG_HEADER_M, MSG_SET_RC_NORMAL};
        use tokio::io::AsyncWriteExt;

        let config = Config::default();
        let (mut receiver, feed) =
            Receiver::message(&config.receiver, StdClock::new()).unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(serve_commands(listener, feed));

        // Encode one SET_RC_NORMAL message by hand.
        let values = [0.5f32, -0.5, 0.25, -0.25, 1.0, 0.0];
        let mut payload = Vec::new();
        for value in &values {
            payload.extend_from_slice(&value.to_le_bytes());
        }
        let mut body = vec![payload.len() as u8, MSG_SET_RC_NORMAL];
        body.extend_from_slice(&payload);
        let mut message = vec![MSG_HEADER_DOLLAR, MSG_HEADER_M, MSG_DIRECTION_IN];
        let crc = checksum_xor(&body);
        message.extend_from_slice(&body);
        message.push(crc);

        let mut client = tokio::net::TcpStream::connect(addr).await.unwrap();
        client.write_all(&message).await.unwrap();
        client.flush().await.unwrap();

        // Give the read task time to push the frame through the handoff.
        let mut produced = false;
        for _ in 0..50 {
            tokio::time::sleep(Duration::from_millis(10)).await;
            if receiver.poll() {
                produced = true;
                break;
            }
        }

        assert!(produced, "no frame made it through the TCP feed path");
        assert_eq!(receiver.demands().as_slice(), &values);
        assert!(!receiver.lost_signal());

        // Abrupt disconnect trips lost_signal on a subsequent poll.
        drop(client);
        let mut lost = false;
        for _ in 0..50 {
            tokio::time::sleep(Duration::from_millis(10)).await;
            receiver.poll();
            if receiver.lost_signal() {
                lost = true;
                break;
            }
        }
        assert!(lost, "disconnect did not trip lost_signal");
        assert_eq!(receiver.demands().as_slice(), &values);
    }
}
