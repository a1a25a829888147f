//! UDP receiver for OSC gaze telemetry.
//!
//! Binds a UDP socket on the configured endpoint and runs a blocking receive
//! loop on a dedicated thread. Every datagram is decoded as an OSC packet;
//! messages addressed to the gaze address are parsed into [`RawGazeSample`]s
//! and handed to a sink closure. Everything else is counted and dropped.
//!
//! # Thread Model
//!
//! ```text
//! ┌─────────────────┐ start(sink)  ┌──────────────────────────┐
//! │   Host Thread   │─────────────▶│ osc-receiver             │
//! │ (activate/      │              │  recv_from (blocking)    │
//! │  deactivate)    │ stop()       │  decode → sink(sample)   │
//! │                 │─────────────▶│  exits on wake datagram  │
//! └─────────────────┘  join        └──────────────────────────┘
//! ```
//!
//! # Shutdown
//!
//! No read timeout is ever set on the socket. `stop()` swaps the running flag
//! to false, then sends an empty datagram from the receiver's own socket to
//! its bound port on loopback. The blocked `recv_from` returns, the loop sees
//! the cleared flag and exits, and `stop()` joins the thread before
//! returning. The swap makes a second `stop()` a no-op.
//!
//! If the listener's own socket cannot send the wake datagram, it is sent
//! from a fresh ephemeral socket instead, and repeated every
//! [`WAKE_RETRY_INTERVAL`] until the thread has exited. `stop()` never
//! returns while the thread is still alive.
//!
//! The thread clears the running flag on its way out, including when the
//! sink panics, so `is_running()` never reports a dead listener.
//!
//! # Error Handling
//!
//! - Malformed packets, wrong address, wrong argument shape: counted, logged,
//!   loop continues. The sink is not called.
//! - Socket receive errors: logged, loop continues.
//! - Bind failure: returned from [`OscReceiver::bind`].

use crate::config::ListenerConfig;
use crate::core::types::RawGazeSample;
use crate::error::{Error, Result};
use crate::streaming::messages::parse_gaze_message;
use crate::streaming::osc::decode_packet;
use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Pause between wake attempts when the wake datagram cannot be sent
pub const WAKE_RETRY_INTERVAL: Duration = Duration::from_millis(50);

/// Receiver counters, snapshot of [`OscReceiver::stats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReceiverStats {
    /// Datagrams received (wake-ups excluded)
    pub datagrams: u64,
    /// Gaze samples handed to the sink
    pub samples: u64,
    /// Messages with a different address
    pub ignored: u64,
    /// Undecodable packets or gaze messages with the wrong shape
    pub decode_errors: u64,
}

#[derive(Debug, Default)]
struct Counters {
    datagrams: AtomicU64,
    samples: AtomicU64,
    ignored: AtomicU64,
    decode_errors: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> ReceiverStats {
        ReceiverStats {
            datagrams: self.datagrams.load(Ordering::Relaxed),
            samples: self.samples.load(Ordering::Relaxed),
            ignored: self.ignored.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
        }
    }
}

/// OSC receiver owning the bound socket and its listener thread
pub struct OscReceiver {
    socket: Arc<UdpSocket>,
    local_addr: SocketAddr,
    gaze_address: String,
    max_datagram_size: usize,
    /// True iff the listener thread is running
    running: Arc<AtomicBool>,
    counters: Arc<Counters>,
    handle: Option<JoinHandle<()>>,
}

impl OscReceiver {
    /// Bind the UDP socket. The listener thread is not started yet.
    pub fn bind(config: &ListenerConfig) -> Result<Self> {
        let addr = config.socket_addr()?;
        let socket = UdpSocket::bind(addr)?;
        let local_addr = socket.local_addr()?;

        log::info!("OSC receiver bound to {}", local_addr);

        Ok(Self {
            socket: Arc::new(socket),
            local_addr,
            gaze_address: config.gaze_address.clone(),
            max_datagram_size: config.max_datagram_size,
            running: Arc::new(AtomicBool::new(false)),
            counters: Arc::new(Counters::default()),
            handle: None,
        })
    }

    /// Address the socket is actually bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> ReceiverStats {
        self.counters.snapshot()
    }

    /// Start the listener thread, feeding decoded samples to `sink`
    pub fn start<F>(&mut self, sink: F) -> Result<()>
    where
        F: FnMut(RawGazeSample) + Send + 'static,
    {
        if self.running.swap(true, Ordering::AcqRel) {
            return Err(Error::AlreadyRunning);
        }

        // A previous thread that exited on its own (sink panic) is reaped here
        if let Some(stale) = self.handle.take() {
            if stale.join().is_err() {
                log::warn!("Previous OSC receiver thread on {} had panicked", self.local_addr);
            }
        }

        let socket = Arc::clone(&self.socket);
        let running = Arc::clone(&self.running);
        let counters = Arc::clone(&self.counters);
        let gaze_address = self.gaze_address.clone();
        let buffer_size = self.max_datagram_size;

        let spawned = thread::Builder::new()
            .name("osc-receiver".to_string())
            .spawn(move || {
                receive_loop(&socket, &running, &counters, &gaze_address, buffer_size, sink);
            });

        match spawned {
            Ok(handle) => {
                self.handle = Some(handle);
                log::info!("OSC receiver started on {}", self.local_addr);
                Ok(())
            }
            Err(e) => {
                self.running.store(false, Ordering::Release);
                Err(Error::Other(format!(
                    "Failed to spawn OSC receiver thread: {}",
                    e
                )))
            }
        }
    }

    /// Stop the listener thread and wait for it to exit.
    ///
    /// Returns `Ok(true)` if a thread was joined, `Ok(false)` if there was
    /// none. A thread that panicked is reported as [`Error::ThreadPanic`]
    /// once it has been joined.
    pub fn stop(&mut self) -> Result<bool> {
        let was_running = self.running.swap(false, Ordering::AcqRel);
        let Some(handle) = self.handle.take() else {
            return Ok(false);
        };

        if was_running {
            log::debug!("Stopping OSC receiver on {}", self.local_addr);

            // Unblock recv_from; the loop checks the flag before decoding
            let target = wake_addr(self.local_addr);
            let socket = &self.socket;
            let mut woken = wake_listener(target, |t| socket.send_to(&[], t));
            while let Err(e) = woken {
                if handle.is_finished() {
                    break;
                }
                log::warn!("Cannot wake OSC receiver on {}: {}", target, e);
                thread::sleep(WAKE_RETRY_INTERVAL);
                woken = wake_listener(target, |t| socket.send_to(&[], t));
            }
        }

        handle.join().map_err(|_| Error::ThreadPanic)?;

        let stats = self.stats();
        log::info!(
            "OSC receiver stopped ({} datagrams, {} samples, {} ignored, {} decode errors)",
            stats.datagrams,
            stats.samples,
            stats.ignored,
            stats.decode_errors
        );
        Ok(true)
    }
}

impl Drop for OscReceiver {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            log::error!("Failed to stop OSC receiver: {}", e);
        }
    }
}

/// Loopback-reachable address of a socket bound to `local`
fn wake_addr(local: SocketAddr) -> SocketAddr {
    let ip = match local.ip() {
        IpAddr::V4(ip) if ip.is_unspecified() => IpAddr::V4(Ipv4Addr::LOCALHOST),
        IpAddr::V6(ip) if ip.is_unspecified() => IpAddr::V6(Ipv6Addr::LOCALHOST),
        ip => ip,
    };
    SocketAddr::new(ip, local.port())
}

/// Send an empty datagram to `target` through `send`, falling back to a
/// fresh ephemeral socket when that fails
fn wake_listener<S>(target: SocketAddr, send: S) -> io::Result<()>
where
    S: FnOnce(SocketAddr) -> io::Result<usize>,
{
    match send(target) {
        Ok(_) => Ok(()),
        Err(e) => {
            log::debug!("Wake from listener socket failed ({}), using a fresh socket", e);
            let unspecified = match target {
                SocketAddr::V4(_) => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
                SocketAddr::V6(_) => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
            };
            let socket = UdpSocket::bind(SocketAddr::new(unspecified, 0))?;
            socket.send_to(&[], target)?;
            Ok(())
        }
    }
}

/// Clears the running flag when the listener thread exits, unwinding included
struct ClearOnExit<'a>(&'a AtomicBool);

impl Drop for ClearOnExit<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

fn receive_loop<F>(
    socket: &UdpSocket,
    running: &AtomicBool,
    counters: &Counters,
    gaze_address: &str,
    buffer_size: usize,
    mut sink: F,
) where
    F: FnMut(RawGazeSample),
{
    let _clear = ClearOnExit(running);
    let mut buffer = vec![0u8; buffer_size];

    loop {
        let result = socket.recv_from(&mut buffer);

        if !running.load(Ordering::Acquire) {
            break;
        }

        let (len, src) = match result {
            Ok(received) => received,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                // ICMP port-unreachable surfaces here on some platforms
                log::warn!("OSC recv error: {}", e);
                continue;
            }
        };

        log::trace!("Datagram from {} ({} bytes)", src, len);
        counters.datagrams.fetch_add(1, Ordering::Relaxed);
        process_datagram(&buffer[..len], gaze_address, counters, &mut sink);
    }
}

/// Decode one datagram and dispatch any gaze samples it carries
fn process_datagram<F>(data: &[u8], gaze_address: &str, counters: &Counters, sink: &mut F)
where
    F: FnMut(RawGazeSample),
{
    let packet = match decode_packet(data) {
        Ok(packet) => packet,
        Err(e) => {
            counters.decode_errors.fetch_add(1, Ordering::Relaxed);
            log::debug!("Dropping undecodable OSC packet: {}", e);
            return;
        }
    };

    for msg in packet.messages() {
        if msg.address != gaze_address {
            counters.ignored.fetch_add(1, Ordering::Relaxed);
            log::trace!("Ignoring OSC address {}", msg.address);
            continue;
        }

        match parse_gaze_message(msg) {
            Ok(sample) => {
                counters.samples.fetch_add(1, Ordering::Relaxed);
                sink(sample);
            }
            Err(e) => {
                counters.decode_errors.fetch_add(1, Ordering::Relaxed);
                log::debug!("Dropping malformed gaze message: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GAZE_ADDRESS;
    use crate::streaming::messages::gaze_message;
    use crate::streaming::osc::{OscArg, OscBundle, OscMessage, OscPacket, encode_message, encode_packet};
    use crossbeam_channel::{bounded, unbounded};
    use std::time::Duration;

    fn collect(data: &[u8]) -> (Vec<RawGazeSample>, ReceiverStats) {
        let counters = Counters::default();
        let mut samples = Vec::new();
        process_datagram(data, GAZE_ADDRESS, &counters, &mut |s| samples.push(s));
        (samples, counters.snapshot())
    }

    fn loopback_config() -> ListenerConfig {
        ListenerConfig {
            bind_address: "127.0.0.1:0".to_string(),
            ..ListenerConfig::default()
        }
    }

    #[test]
    fn test_dispatches_gaze_message() {
        let sample = RawGazeSample::new(1.0, 2.0, 3.0, 4.0);
        let (samples, stats) = collect(&encode_message(&gaze_message(GAZE_ADDRESS, &sample)));
        assert_eq!(samples, vec![sample]);
        assert_eq!(stats.samples, 1);
        assert_eq!(stats.decode_errors, 0);
    }

    #[test]
    fn test_ignores_other_address() {
        let msg = gaze_message("/tracking/eye/Other", &RawGazeSample::default());
        let (samples, stats) = collect(&encode_message(&msg));
        assert!(samples.is_empty());
        assert_eq!(stats.ignored, 1);
    }

    #[test]
    fn test_wrong_shape_is_decode_error() {
        let msg = OscMessage::new(
            GAZE_ADDRESS,
            vec![OscArg::Float(0.0), OscArg::Float(0.0), OscArg::Float(0.0)],
        );
        let (samples, stats) = collect(&encode_message(&msg));
        assert!(samples.is_empty());
        assert_eq!(stats.decode_errors, 1);

        let (samples, stats) = collect(b"garbage");
        assert!(samples.is_empty());
        assert_eq!(stats.decode_errors, 1);
    }

    #[test]
    fn test_bundle_dispatch_in_order() {
        let first = RawGazeSample::binocular(1.0, 1.0);
        let second = RawGazeSample::binocular(2.0, 2.0);
        let bundle = OscPacket::Bundle(OscBundle {
            timetag: 1,
            content: vec![
                OscPacket::Message(gaze_message(GAZE_ADDRESS, &first)),
                OscPacket::Message(OscMessage::new("/avatar/parameters/x", vec![])),
                OscPacket::Message(gaze_message(GAZE_ADDRESS, &second)),
            ],
        });

        let (samples, stats) = collect(&encode_packet(&bundle));
        assert_eq!(samples, vec![first, second]);
        assert_eq!(stats.ignored, 1);
    }

    #[test]
    fn test_wake_addr() {
        let any: SocketAddr = "0.0.0.0:9020".parse().unwrap();
        assert_eq!(wake_addr(any), "127.0.0.1:9020".parse().unwrap());

        let any6: SocketAddr = "[::]:9020".parse().unwrap();
        assert_eq!(wake_addr(any6), "[::1]:9020".parse().unwrap());

        let specific: SocketAddr = "192.168.1.5:9020".parse().unwrap();
        assert_eq!(wake_addr(specific), specific);
    }

    #[test]
    fn test_receives_over_udp() {
        let mut receiver = OscReceiver::bind(&loopback_config()).unwrap();
        let (tx, rx) = unbounded();
        receiver.start(move |sample| tx.send(sample).unwrap()).unwrap();
        assert!(receiver.is_running());

        let sender = UdpSocket::bind("127.0.0.1:0").unwrap();
        let sample = RawGazeSample::new(-3.0, 12.5, -2.0, 11.0);
        sender
            .send_to(
                &encode_message(&gaze_message(GAZE_ADDRESS, &sample)),
                receiver.local_addr(),
            )
            .unwrap();

        let received = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(received, sample);

        assert!(receiver.stop().unwrap());
        assert!(!receiver.is_running());
        assert_eq!(receiver.stats().samples, 1);
    }

    #[test]
    fn test_stop_without_traffic_and_twice() {
        let mut receiver = OscReceiver::bind(&loopback_config()).unwrap();
        receiver.start(|_| {}).unwrap();

        let (done_tx, done_rx) = bounded(1);
        let handle = thread::spawn(move || {
            let first = receiver.stop().unwrap();
            let second = receiver.stop().unwrap();
            done_tx.send((first, second)).unwrap();
        });

        let (first, second) = done_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("stop() blocked");
        assert!(first);
        assert!(!second);
        handle.join().unwrap();
    }

    #[test]
    fn test_double_start_rejected() {
        let mut receiver = OscReceiver::bind(&loopback_config()).unwrap();
        receiver.start(|_| {}).unwrap();
        assert!(matches!(receiver.start(|_| {}), Err(Error::AlreadyRunning)));
        receiver.stop().unwrap();

        // Paired stop allows a fresh start
        receiver.start(|_| {}).unwrap();
        assert!(receiver.stop().unwrap());
    }

    #[test]
    fn test_bind_conflict_is_error() {
        let first = OscReceiver::bind(&loopback_config()).unwrap();
        let config = ListenerConfig {
            bind_address: first.local_addr().to_string(),
            ..ListenerConfig::default()
        };
        assert!(matches!(OscReceiver::bind(&config), Err(Error::Io(_))));
    }

    #[test]
    fn test_wake_falls_back_to_fresh_socket() {
        let listener = UdpSocket::bind("127.0.0.1:0").unwrap();
        listener
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        let target = listener.local_addr().unwrap();

        let unreachable = |_: SocketAddr| -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::AddrNotAvailable, "interface gone"))
        };
        wake_listener(target, unreachable).unwrap();

        let mut buf = [0u8; 16];
        let (len, _) = listener.recv_from(&mut buf).expect("no wake datagram");
        assert_eq!(len, 0);
    }

    #[test]
    fn test_fallback_wake_ends_listener_thread() {
        let mut receiver = OscReceiver::bind(&loopback_config()).unwrap();
        receiver.start(|_| {}).unwrap();
        let handle = receiver.handle.take().unwrap();

        receiver.running.store(false, Ordering::Release);
        wake_listener(wake_addr(receiver.local_addr()), |_| {
            Err(io::Error::new(io::ErrorKind::AddrNotAvailable, "interface gone"))
        })
        .unwrap();

        let (done_tx, done_rx) = bounded(1);
        thread::spawn(move || {
            done_tx.send(handle.join().is_ok()).unwrap();
        });
        assert!(done_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("listener thread still blocked"));

        // Nothing left to join
        assert!(!receiver.stop().unwrap());
    }

    #[test]
    fn test_sink_panic_clears_running() {
        let mut receiver = OscReceiver::bind(&loopback_config()).unwrap();
        receiver.start(|_| panic!("sink failure")).unwrap();

        let sender = UdpSocket::bind("127.0.0.1:0").unwrap();
        sender
            .send_to(
                &encode_message(&gaze_message(GAZE_ADDRESS, &RawGazeSample::default())),
                receiver.local_addr(),
            )
            .unwrap();

        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while receiver.is_running() {
            assert!(std::time::Instant::now() < deadline, "flag still set");
            thread::sleep(Duration::from_millis(10));
        }

        assert!(matches!(receiver.stop(), Err(Error::ThreadPanic)));
        assert!(!receiver.stop().unwrap());

        // Receiver can be restarted after the failure
        receiver.start(|_| {}).unwrap();
        assert!(receiver.is_running());
        assert!(receiver.stop().unwrap());
    }
}
