use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use serde::Serialize;
use showroom_stream::{
    ArProbe, ControlRequest, HEADER_LEN, Heartbeat, Hello, LoadAsset, LoadResult, MessageHeader,
    MessageKind, Notice, ProtocolError, StateUpdate, decode_payload, encode_message,
};
use thiserror::Error;

const RECONNECT_DELAY_MS: u64 = 750;

/// Engine-side traffic delivered to the panel loop.
#[derive(Debug, Clone)]
pub enum LinkEvent {
    Connecting { addr: String, attempt: u32 },
    Connected(Hello),
    Load(LoadAsset),
    State(StateUpdate),
    Notice(Notice),
    Disconnected { reason: String },
}

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("not connected to the engine")]
    NotConnected,
    #[error("message encode failed: {0}")]
    Encode(#[from] ProtocolError),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Reconnecting client for the engine stream. Reads run on a worker
/// thread; writes go straight through the shared connection handle so
/// panel events keep their ordering.
pub struct EngineLink {
    events: Receiver<LinkEvent>,
    writer: Arc<Mutex<Option<TcpStream>>>,
}

impl EngineLink {
    pub fn connect(addr: String) -> Self {
        let (tx, rx) = mpsc::channel();
        let writer: Arc<Mutex<Option<TcpStream>>> = Arc::new(Mutex::new(None));
        let writer_slot = writer.clone();
        thread::Builder::new()
            .name("showroom_link".to_string())
            .spawn(move || link_loop(addr, tx, writer_slot))
            .expect("spawn engine link thread");
        Self { events: rx, writer }
    }

    pub fn poll_event(&self, timeout: Duration) -> Option<LinkEvent> {
        self.events.recv_timeout(timeout).ok()
    }

    pub fn send_control(&self, request: &ControlRequest) -> Result<(), LinkError> {
        self.send(MessageKind::Control, request)
    }

    pub fn send_load_result(&self, result: &LoadResult) -> Result<(), LinkError> {
        self.send(MessageKind::LoadResult, result)
    }

    pub fn send_ar_probe(&self, probe: &ArProbe) -> Result<(), LinkError> {
        self.send(MessageKind::ArProbe, probe)
    }

    fn send<T: Serialize>(&self, kind: MessageKind, payload: &T) -> Result<(), LinkError> {
        let bytes = encode_message(kind, payload)?;
        let mut guard = lock_writer(&self.writer);
        let Some(stream) = guard.as_mut() else {
            return Err(LinkError::NotConnected);
        };
        match write_all(stream, &bytes) {
            Ok(()) => Ok(()),
            Err(err) => {
                *guard = None;
                Err(LinkError::Io(err))
            }
        }
    }
}

fn lock_writer(writer: &Arc<Mutex<Option<TcpStream>>>) -> MutexGuard<'_, Option<TcpStream>> {
    writer.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn link_loop(addr: String, tx: Sender<LinkEvent>, writer: Arc<Mutex<Option<TcpStream>>>) {
    let mut attempt: u32 = 0;
    loop {
        attempt = attempt.wrapping_add(1);
        if tx
            .send(LinkEvent::Connecting {
                addr: addr.clone(),
                attempt,
            })
            .is_err()
        {
            break;
        }

        match TcpStream::connect(&addr) {
            Ok(mut stream) => {
                if let Err(err) = stream.set_nodelay(true) {
                    log::warn!("failed to enable TCP_NODELAY: {err}");
                }
                match stream.try_clone() {
                    Ok(write_half) => {
                        *lock_writer(&writer) = Some(write_half);
                    }
                    Err(err) => {
                        log::warn!("failed to clone engine connection: {err}");
                    }
                }
                let result = session(&mut stream, &tx);
                *lock_writer(&writer) = None;
                if let Err(err) = result {
                    if tx
                        .send(LinkEvent::Disconnected {
                            reason: err.to_string(),
                        })
                        .is_err()
                    {
                        break;
                    }
                }
            }
            Err(err) => {
                if tx
                    .send(LinkEvent::Disconnected {
                        reason: format!("connect error: {err}"),
                    })
                    .is_err()
                {
                    break;
                }
                thread::sleep(Duration::from_millis(RECONNECT_DELAY_MS));
            }
        }
    }
}

fn session(stream: &mut TcpStream, tx: &Sender<LinkEvent>) -> Result<(), LinkReadError> {
    loop {
        let (header, payload) = read_message(stream)?;
        match header.kind {
            MessageKind::Hello => {
                let hello = decode_payload::<Hello>(&payload)?;
                if tx.send(LinkEvent::Connected(hello)).is_err() {
                    break;
                }
            }
            MessageKind::LoadAsset => {
                let load = decode_payload::<LoadAsset>(&payload)?;
                if tx.send(LinkEvent::Load(load)).is_err() {
                    break;
                }
            }
            MessageKind::StateUpdate => {
                let update = decode_payload::<StateUpdate>(&payload)?;
                if tx.send(LinkEvent::State(update)).is_err() {
                    break;
                }
            }
            MessageKind::Notice => {
                let notice = decode_payload::<Notice>(&payload)?;
                if tx.send(LinkEvent::Notice(notice)).is_err() {
                    break;
                }
            }
            MessageKind::Heartbeat => {
                let _ = decode_payload::<Heartbeat>(&payload);
            }
            other => {
                log::debug!("ignored engine message kind {other:?}");
            }
        }
    }
    Ok(())
}

fn read_message(stream: &mut TcpStream) -> Result<(MessageHeader, Vec<u8>), LinkReadError> {
    let mut header_bytes = [0u8; HEADER_LEN];
    stream.read_exact(&mut header_bytes)?;
    let header = MessageHeader::decode(&header_bytes)?;
    let mut payload = vec![0u8; header.length as usize];
    stream.read_exact(&mut payload)?;
    Ok((header, payload))
}

fn write_all(stream: &mut TcpStream, bytes: &[u8]) -> io::Result<()> {
    let mut offset = 0;
    while offset < bytes.len() {
        match stream.write(&bytes[offset..]) {
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::WriteZero,
                    "remote closed connection",
                ));
            }
            Ok(written) => offset += written,
            Err(ref err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        }
    }
    Ok(())
}

#[derive(Debug, Error)]
enum LinkReadError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}
