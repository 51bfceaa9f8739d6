use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Context;
use showroom_stream::{
    decode_payload, encode_message, ArProbe, ControlRequest, Heartbeat, Hello, LoadAsset,
    LoadResult, MessageHeader, MessageKind, Notice, ProtocolError, StateUpdate, HEADER_LEN,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StreamError {
    #[error("stream worker disconnected")]
    Disconnected,
    #[error("message encode failed: {0}")]
    Encode(#[from] ProtocolError),
}

enum Command {
    Send(Vec<u8>),
    Shutdown,
}

/// Messages arriving from the connected control/rendering surface.
#[derive(Debug)]
pub enum InboundEvent {
    Connected { addr: String },
    Control(ControlRequest),
    LoadResult(LoadResult),
    ArProbe(ArProbe),
    Disconnected { reason: String },
}

/// Serves one control surface at a time: outbound frames go through a
/// worker thread owning the listener, inbound frames come back on a
/// channel fed by a per-connection reader thread.
pub struct StreamServer {
    sender: Sender<Command>,
    inbound: Receiver<InboundEvent>,
    local_addr: SocketAddr,
    start: Instant,
    seq: AtomicU64,
}

impl StreamServer {
    pub fn bind<A: ToSocketAddrs>(addr: A, build: Option<String>) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(addr).context("binding stream socket")?;
        let local_addr = listener
            .local_addr()
            .context("reading bound stream address")?;
        listener
            .set_nonblocking(true)
            .context("setting stream listener non-blocking")?;
        let (tx, rx) = mpsc::channel();
        let (inbound_tx, inbound_rx) = mpsc::channel();
        let build_info = build.unwrap_or_else(|| "dev".to_string());
        thread::Builder::new()
            .name("showroom_stream".to_string())
            .spawn(move || worker_loop(listener, rx, inbound_tx, build_info))
            .context("spawning stream worker thread")?;
        Ok(Self {
            sender: tx,
            inbound: inbound_rx,
            local_addr,
            start: Instant::now(),
            seq: AtomicU64::new(0),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn host_time_ns(&self) -> u64 {
        self.start.elapsed().as_nanos() as u64
    }

    pub fn send_state_update(&self, mut update: StateUpdate) -> Result<(), StreamError> {
        update.seq = self.seq.fetch_add(1, Ordering::Relaxed);
        if update.host_time_ns == 0 {
            update.host_time_ns = self.host_time_ns();
        }
        self.send_frame(encode_message(MessageKind::StateUpdate, &update)?)
    }

    pub fn send_load_asset(&self, load: &LoadAsset) -> Result<(), StreamError> {
        self.send_frame(encode_message(MessageKind::LoadAsset, load)?)
    }

    pub fn send_notice(&self, notice: &Notice) -> Result<(), StreamError> {
        self.send_frame(encode_message(MessageKind::Notice, notice)?)
    }

    pub fn send_heartbeat(&self) -> Result<(), StreamError> {
        let heartbeat = Heartbeat {
            host_time_ns: self.host_time_ns(),
        };
        self.send_frame(encode_message(MessageKind::Heartbeat, &heartbeat)?)
    }

    fn send_frame(&self, bytes: Vec<u8>) -> Result<(), StreamError> {
        self.sender
            .send(Command::Send(bytes))
            .map_err(|_| StreamError::Disconnected)
    }

    pub fn poll_inbound(&self, timeout: Duration) -> Option<InboundEvent> {
        self.inbound.recv_timeout(timeout).ok()
    }
}

impl Drop for StreamServer {
    fn drop(&mut self) {
        let _ = self.sender.send(Command::Shutdown);
    }
}

fn worker_loop(
    listener: TcpListener,
    rx: Receiver<Command>,
    inbound_tx: Sender<InboundEvent>,
    build_info: String,
) {
    let mut stream: Option<TcpStream> = None;
    loop {
        match rx.recv_timeout(Duration::from_millis(16)) {
            Ok(Command::Send(buffer)) => {
                if let Some(conn) = stream.as_mut() {
                    if let Err(err) = write_all(conn, &buffer) {
                        log::warn!("send failed: {err:?}; waiting for reconnect");
                        stream = None;
                    }
                }
            }
            Ok(Command::Shutdown) => break,
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }

        if stream.is_none() {
            match listener.accept() {
                Ok((mut conn, addr)) => {
                    if let Err(err) = conn.set_nodelay(true) {
                        log::warn!("failed to configure connection from {addr}: {err:?}");
                        continue;
                    }
                    match send_hello(&mut conn, &build_info) {
                        Ok(()) => match conn.try_clone() {
                            Ok(read_half) => {
                                log::info!("control surface connected from {addr}");
                                spawn_reader(read_half, inbound_tx.clone(), addr.to_string());
                                let _ = inbound_tx.send(InboundEvent::Connected {
                                    addr: addr.to_string(),
                                });
                                stream = Some(conn);
                            }
                            Err(err) => {
                                log::warn!("failed to clone connection from {addr}: {err:?}");
                            }
                        },
                        Err(err) => {
                            log::warn!("handshake error with {addr}: {err:?}");
                        }
                    }
                }
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => {}
                Err(err) => {
                    log::warn!("accept error: {err:?}");
                    thread::sleep(Duration::from_millis(200));
                }
            }
        }
    }
}

fn spawn_reader(mut stream: TcpStream, tx: Sender<InboundEvent>, addr: String) {
    let spawned = thread::Builder::new()
        .name("showroom_stream_reader".to_string())
        .spawn(move || loop {
            match read_message(&mut stream) {
                Ok((header, payload)) => {
                    let event = match header.kind {
                        MessageKind::Control => {
                            decode_payload::<ControlRequest>(&payload).map(InboundEvent::Control)
                        }
                        MessageKind::LoadResult => {
                            decode_payload::<LoadResult>(&payload).map(InboundEvent::LoadResult)
                        }
                        MessageKind::ArProbe => {
                            decode_payload::<ArProbe>(&payload).map(InboundEvent::ArProbe)
                        }
                        MessageKind::Heartbeat => continue,
                        other => {
                            log::debug!("ignoring inbound message kind {other:?}");
                            continue;
                        }
                    };
                    match event {
                        Ok(event) => {
                            if tx.send(event).is_err() {
                                break;
                            }
                        }
                        Err(err) => {
                            log::warn!("inbound decode error from {addr}: {err}");
                        }
                    }
                }
                Err(err) => {
                    let _ = tx.send(InboundEvent::Disconnected {
                        reason: err.to_string(),
                    });
                    break;
                }
            }
        });
    if let Err(err) = spawned {
        log::warn!("failed to spawn stream reader: {err:?}");
    }
}

#[derive(Debug, Error)]
enum StreamReadError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

fn read_message(stream: &mut TcpStream) -> Result<(MessageHeader, Vec<u8>), StreamReadError> {
    let mut header_bytes = [0u8; HEADER_LEN];
    stream.read_exact(&mut header_bytes)?;
    let header = MessageHeader::decode(&header_bytes)?;
    let mut payload = vec![0u8; header.length as usize];
    stream.read_exact(&mut payload)?;
    Ok((header, payload))
}

fn send_hello(stream: &mut TcpStream, build_info: &str) -> Result<(), io::Error> {
    let hello = Hello::new("showroom_engine", Some(build_info.to_string()));
    let message = encode_message(MessageKind::Hello, &hello)
        .map_err(|err| io::Error::new(io::ErrorKind::Other, err))?;
    write_all(stream, &message)
}

fn write_all(stream: &mut TcpStream, bytes: &[u8]) -> io::Result<()> {
    let mut offset = 0;
    while offset < bytes.len() {
        match stream.write(&bytes[offset..]) {
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::WriteZero,
                    "remote closed connection",
                ))
            }
            Ok(written) => offset += written,
            Err(ref err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        }
    }
    Ok(())
}
