//! TCP Bridge - dua proses, satu tipe data
//!
//! `send` mem-publish `Tick` lokal; outbound bridge menulis setiap tick ke socket.
//! `receive` menjalankan poll loop mio non-blocking dan memberi makan deserializer;
//! inbound bridge mem-publish ulang tick sebagai publikasi lokal.
//!
//! # Usage
//!
//! ```text
//! cargo run --release --example tcp_bridge -- receive --addr 127.0.0.1:9400
//! cargo run --release --example tcp_bridge -- send --addr 127.0.0.1:9400 --count 1000
//! ```

use std::error::Error;
use std::io::{self, Read};
use std::net::{SocketAddr, TcpStream};
use std::rc::Rc;
use std::thread;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use mio::net::TcpListener;
use mio::{Events, Interest, Poll, Token};
use sub0pub::core::Registry;
use sub0pub::protocol::{CorruptionPolicy, DeserializerConfig, StreamDeserializer, StreamSerializer};
use tracing_subscriber::EnvFilter;
use zerocopy::{FromBytes, Immutable, IntoBytes};

const LISTENER: Token = Token(0);
const PEER: Token = Token(1);
const EVENTS_CAPACITY: usize = 64;

#[derive(Parser, Debug)]
#[command(name = "tcp_bridge")]
#[command(about = "Bridge a local broker over TCP", long_about = None)]
struct Args {
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Subcommand, Debug)]
enum Mode {
    /// Publish ticks and forward them to a receiver
    Send {
        #[arg(long, default_value = "127.0.0.1:9400")]
        addr: SocketAddr,
        #[arg(long, default_value_t = 1000)]
        count: u64,
        /// Delay antar tick (0 = secepat mungkin)
        #[arg(long, default_value_t = 0)]
        interval_us: u64,
    },
    /// Accept one sender and republish its ticks locally
    Receive {
        #[arg(long, default_value = "127.0.0.1:9400")]
        addr: SocketAddr,
        /// Lewati data rusak alih-alih berhenti
        #[arg(long)]
        resync: bool,
    },
}

/// Market tick, layout identik di kedua sisi
#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable)]
struct Tick {
    sequence: u64,
    sent_at_us: u64,
    price_micros: i64,
}

const TICK_NAME: &str = "Tick";

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "info,sub0pub=debug".into()),
        )
        .with_target(false)
        .init();

    match Args::parse().mode {
        Mode::Send {
            addr,
            count,
            interval_us,
        } => send(addr, count, Duration::from_micros(interval_us)),
        Mode::Receive { addr, resync } => receive(addr, resync),
    }
}

fn send(addr: SocketAddr, count: u64, interval: Duration) -> Result<(), Box<dyn Error>> {
    let stream = TcpStream::connect(addr)?;
    stream.set_nodelay(true)?;
    tracing::info!(%addr, count, "connected");

    let registry = Registry::new();
    let publisher = registry.publisher_named::<Tick>(TICK_NAME)?;
    let serializer = Rc::new(StreamSerializer::new(&registry, stream));
    let bridge = serializer.forward_subscribe::<Tick>()?;

    let epoch = Instant::now();
    for sequence in 0..count {
        let tick = Tick {
            sequence,
            sent_at_us: epoch.elapsed().as_micros() as u64,
            price_micros: 100_000_000 + (sequence as i64 % 500) * 10,
        };
        publisher.publish(&tick);
        if !interval.is_zero() {
            thread::sleep(interval);
        }
    }
    serializer.flush()?;

    let stats = serializer.stats();
    tracing::info!(
        frames = stats.frames_written,
        bytes = stats.bytes_written,
        failed = stats.failed_writes,
        elapsed_ms = epoch.elapsed().as_millis() as u64,
        "send complete"
    );
    drop(bridge);
    Ok(())
}

/// Socket wrapper yang mencatat end-of-stream
///
/// Deserializer memperlakukan 0 byte sebagai "belum ada data"; EOF diurus di sini.
struct Peer {
    stream: mio::net::TcpStream,
    closed: bool,
}

impl Read for Peer {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.stream.read(buf)?;
        if n == 0 && !buf.is_empty() {
            self.closed = true;
        }
        Ok(n)
    }
}

fn receive(addr: SocketAddr, resync: bool) -> Result<(), Box<dyn Error>> {
    let mut poll = Poll::new()?;
    let mut events = Events::with_capacity(EVENTS_CAPACITY);
    let mut listener = TcpListener::bind(addr)?;
    poll.registry()
        .register(&mut listener, LISTENER, Interest::READABLE)?;
    tracing::info!(%addr, "listening");

    let registry = Registry::new();
    registry.set_identity::<Tick>(None, Some(TICK_NAME))?;

    let epoch = Instant::now();
    let _printer = registry.subscribe_fn::<Tick, _>(move |tick| {
        if tick.sequence % 100 == 0 {
            tracing::info!(
                sequence = tick.sequence,
                price = tick.price_micros,
                sent_at_us = tick.sent_at_us,
                "tick"
            );
        }
    })?;

    let config = DeserializerConfig {
        policy: if resync {
            CorruptionPolicy::Resync
        } else {
            CorruptionPolicy::Fatal
        },
        ..DeserializerConfig::default()
    };
    let mut de = StreamDeserializer::with_config(config);
    de.forward_publish::<Tick>(&registry)?;

    let mut peer: Option<Peer> = None;
    loop {
        poll.poll(&mut events, Some(Duration::from_millis(100)))?;

        for event in events.iter() {
            match event.token() {
                LISTENER => loop {
                    match listener.accept() {
                        Ok((mut stream, from)) => {
                            if peer.is_some() {
                                tracing::warn!(%from, "already bridged, rejecting");
                                continue;
                            }
                            poll.registry()
                                .register(&mut stream, PEER, Interest::READABLE)?;
                            tracing::info!(%from, "peer connected");
                            peer = Some(Peer {
                                stream,
                                closed: false,
                            });
                        }
                        Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => break,
                        Err(e) => return Err(e.into()),
                    }
                },
                PEER => {
                    let Some(source) = peer.as_mut() else {
                        continue;
                    };
                    // Edge-triggered: kuras sampai WouldBlock/EOF
                    while de.feed(&mut *source)? {}

                    if source.closed {
                        let stats = de.stats();
                        tracing::info!(
                            frames = stats.frames_completed,
                            discarded = stats.frames_discarded,
                            bytes = stats.bytes_consumed,
                            elapsed_ms = epoch.elapsed().as_millis() as u64,
                            "peer closed"
                        );
                        return Ok(());
                    }
                }
                _ => {}
            }
        }
    }
}
