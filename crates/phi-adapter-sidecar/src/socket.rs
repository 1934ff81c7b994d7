//! Unix domain socket listener.
//!
//! Single-client server bound to a filesystem path. All sockets run
//! non-blocking; readiness comes from `poll(2)` bounded by the caller's
//! timeout, so the owning program drives the transport from its own loop and
//! no background threads exist.
//!
//! One [`UdsServer::poll_once`] call waits for readiness, accepts at most one
//! client (replacing any previous one), drains readable bytes into the
//! receive buffer, and peels complete frames off the front. Everything that
//! happened is appended to the caller's event vector in arrival order.

use std::fs;
use std::io::{self, Read, Write};
use std::os::fd::AsRawFd;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, warn};

use phi_adapter_protocol::{FRAME_HEADER_LEN, FrameHeader};

use crate::error::{TransportError, TransportResult};

#[cfg(target_os = "linux")]
const CLIENT_POLL_EVENTS: libc::c_short = libc::POLLIN | libc::POLLRDHUP;
#[cfg(not(target_os = "linux"))]
const CLIENT_POLL_EVENTS: libc::c_short = libc::POLLIN;

#[cfg(target_os = "linux")]
const CLIENT_HANGUP_EVENTS: libc::c_short = libc::POLLRDHUP | libc::POLLHUP;
#[cfg(not(target_os = "linux"))]
const CLIENT_HANGUP_EVENTS: libc::c_short = libc::POLLHUP;

/// Transport lifecycle notifications, in the order they happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A core connected (none → one transition only).
    Connected,
    /// The connected core went away.
    Disconnected,
    /// One complete inbound frame.
    Frame {
        header: FrameHeader,
        payload: Vec<u8>,
    },
}

/// Single-client Unix domain socket server.
pub struct UdsServer {
    socket_path: PathBuf,
    listener: Option<UnixListener>,
    client: Option<UnixStream>,
    rx_buffer: Vec<u8>,
}

impl UdsServer {
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
            listener: None,
            client: None,
            rx_buffer: Vec::new(),
        }
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    pub fn is_client_connected(&self) -> bool {
        self.client.is_some()
    }

    /// Binds the listening socket, removing any stale file at the path
    /// first. The path length is checked before any socket is created.
    pub fn start(&mut self) -> TransportResult<()> {
        self.stop();

        let path_bytes = self.socket_path.as_os_str().as_bytes();
        if path_bytes.len() >= sun_path_capacity() {
            return Err(TransportError::PathTooLong {
                path: self.socket_path.display().to_string(),
            });
        }

        // best-effort removal of a stale socket file
        let _ = fs::remove_file(&self.socket_path);

        let listener = UnixListener::bind(&self.socket_path)
            .map_err(|source| TransportError::io("bind", source))?;
        listener
            .set_nonblocking(true)
            .map_err(|source| TransportError::io("fcntl", source))?;

        debug!(path = %self.socket_path.display(), "socket listening");
        self.listener = Some(listener);
        self.rx_buffer.clear();
        Ok(())
    }

    /// Closes the client and the listener, and unlinks the socket file.
    pub fn stop(&mut self) {
        self.client = None;
        if self.listener.take().is_some() {
            debug!(path = %self.socket_path.display(), "socket closed");
        }
        let _ = fs::remove_file(&self.socket_path);
        self.rx_buffer.clear();
    }

    /// Runs one poll cycle bounded by `timeout`, appending everything that
    /// happened to `events`. An interrupted wait counts as an empty cycle.
    ///
    /// A frame with bad magic or version is fatal for the connection: the
    /// client is closed, `Disconnected` is appended, and the error is
    /// returned. The listener keeps accepting.
    pub fn poll_once(
        &mut self,
        timeout: Duration,
        events: &mut Vec<TransportEvent>,
    ) -> TransportResult<()> {
        let listener = self.listener.as_ref().ok_or(TransportError::NotStarted)?;

        let mut fds = [
            libc::pollfd {
                fd: listener.as_raw_fd(),
                events: libc::POLLIN,
                revents: 0,
            },
            libc::pollfd {
                fd: -1,
                events: CLIENT_POLL_EVENTS,
                revents: 0,
            },
        ];
        let client_fd = self.client.as_ref().map(|client| client.as_raw_fd());
        let nfds = if let Some(fd) = client_fd {
            fds[1].fd = fd;
            2
        } else {
            1
        };

        let timeout_ms = timeout.as_millis().min(i32::MAX as u128) as libc::c_int;
        let ready = unsafe { libc::poll(fds.as_mut_ptr(), nfds as libc::nfds_t, timeout_ms) };
        if ready < 0 {
            let source = io::Error::last_os_error();
            if source.kind() == io::ErrorKind::Interrupted {
                return Ok(());
            }
            return Err(TransportError::io("poll", source));
        }
        if ready == 0 {
            return Ok(());
        }

        if fds[0].revents & libc::POLLIN != 0 {
            self.accept_client(events)?;
        }

        // Only service the client fd the poll actually watched; an accept
        // above may have replaced it.
        if let Some(fd) = client_fd
            && self.client.as_ref().map(|client| client.as_raw_fd()) == Some(fd)
        {
            let revents = fds[1].revents;
            if revents & CLIENT_HANGUP_EVENTS != 0 {
                self.close_client(events);
            } else if revents & libc::POLLIN != 0 {
                self.read_client(events)?;
            }
        }

        Ok(())
    }

    /// Writes one whole frame: header (with `payload_size` rewritten from
    /// the actual payload) followed by the payload bytes.
    pub fn send(&mut self, header: &FrameHeader, payload: &[u8]) -> TransportResult<()> {
        let client = self.client.as_mut().ok_or(TransportError::NoClient)?;

        let mut wire_header = *header;
        wire_header.payload_size = payload.len() as u32;

        write_all_retrying(client, &wire_header.pack())?;
        if !payload.is_empty() {
            write_all_retrying(client, payload)?;
        }
        Ok(())
    }

    fn accept_client(&mut self, events: &mut Vec<TransportEvent>) -> TransportResult<()> {
        let listener = match self.listener.as_ref() {
            Some(listener) => listener,
            None => return Ok(()),
        };
        let stream = match listener.accept() {
            Ok((stream, _addr)) => stream,
            Err(source) if source.kind() == io::ErrorKind::WouldBlock => return Ok(()),
            Err(source) => return Err(TransportError::io("accept", source)),
        };
        stream
            .set_nonblocking(true)
            .map_err(|source| TransportError::io("fcntl", source))?;

        let had_client = self.client.is_some();
        if had_client {
            warn!("replacing already-connected client");
        }
        // one client at a time; dropping the previous stream closes it
        self.client = Some(stream);
        self.rx_buffer.clear();
        if !had_client {
            debug!("client connected");
            events.push(TransportEvent::Connected);
        }
        Ok(())
    }

    fn read_client(&mut self, events: &mut Vec<TransportEvent>) -> TransportResult<()> {
        let mut chunk = [0u8; 4096];
        loop {
            let client = match self.client.as_mut() {
                Some(client) => client,
                None => return Ok(()),
            };
            match client.read(&mut chunk) {
                Ok(0) => {
                    self.close_client(events);
                    return Ok(());
                }
                Ok(count) => self.rx_buffer.extend_from_slice(&chunk[..count]),
                Err(source) if source.kind() == io::ErrorKind::WouldBlock => break,
                Err(source) if source.kind() == io::ErrorKind::Interrupted => continue,
                Err(source) => {
                    self.close_client(events);
                    return Err(TransportError::io("read", source));
                }
            }
        }

        while self.rx_buffer.len() >= FRAME_HEADER_LEN {
            let mut header_bytes = [0u8; FRAME_HEADER_LEN];
            header_bytes.copy_from_slice(&self.rx_buffer[..FRAME_HEADER_LEN]);
            let header = FrameHeader::unpack(&header_bytes);

            if !header.is_valid() {
                warn!("invalid frame header, closing client");
                self.close_client(events);
                return Err(TransportError::InvalidFrameHeader);
            }

            let frame_len = FRAME_HEADER_LEN + header.payload_size as usize;
            if self.rx_buffer.len() < frame_len {
                break;
            }

            let payload = self.rx_buffer[FRAME_HEADER_LEN..frame_len].to_vec();
            events.push(TransportEvent::Frame { header, payload });
            self.rx_buffer.drain(..frame_len);
        }

        Ok(())
    }

    fn close_client(&mut self, events: &mut Vec<TransportEvent>) {
        if self.client.take().is_some() {
            debug!("client disconnected");
            events.push(TransportEvent::Disconnected);
        }
        self.rx_buffer.clear();
    }
}

impl Drop for UdsServer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Writes the whole buffer, retrying on `EINTR` and spinning on `EAGAIN`.
/// The spin is acceptable on this low-rate control channel with small
/// payloads.
fn write_all_retrying(stream: &mut UnixStream, mut buf: &[u8]) -> TransportResult<()> {
    while !buf.is_empty() {
        match stream.write(buf) {
            Ok(0) => {
                return Err(TransportError::io(
                    "write",
                    io::Error::new(io::ErrorKind::WriteZero, "wrote 0 bytes"),
                ));
            }
            Ok(count) => buf = &buf[count..],
            Err(source) if source.kind() == io::ErrorKind::WouldBlock => continue,
            Err(source) if source.kind() == io::ErrorKind::Interrupted => continue,
            Err(source) => return Err(TransportError::io("write", source)),
        }
    }
    Ok(())
}

fn sun_path_capacity() -> usize {
    let addr: libc::sockaddr_un = unsafe { std::mem::zeroed() };
    addr.sun_path.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use phi_adapter_protocol::{FRAME_MAGIC, MessageType, PROTOCOL_VERSION};
    use tempfile::tempdir;

    fn frame_bytes(kind: MessageType, correlation_id: u64, payload: &[u8]) -> Vec<u8> {
        let mut header = FrameHeader::new(kind, correlation_id);
        header.payload_size = payload.len() as u32;
        let mut bytes = header.pack().to_vec();
        bytes.extend_from_slice(payload);
        bytes
    }

    fn poll_until(
        server: &mut UdsServer,
        events: &mut Vec<TransportEvent>,
        mut done: impl FnMut(&[TransportEvent]) -> bool,
    ) {
        for _ in 0..100 {
            server
                .poll_once(Duration::from_millis(10), events)
                .expect("poll");
            if done(events) {
                return;
            }
        }
        panic!("condition not reached, events: {events:?}");
    }

    #[test]
    fn start_creates_and_stop_removes_socket_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("adapter.sock");

        let mut server = UdsServer::new(&path);
        server.start().unwrap();
        assert!(path.exists());

        server.stop();
        assert!(!path.exists());
    }

    #[test]
    fn start_replaces_stale_socket_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("adapter.sock");
        fs::write(&path, b"stale").unwrap();

        let mut server = UdsServer::new(&path);
        server.start().unwrap();
        assert!(path.exists());
    }

    #[test]
    fn path_too_long_fails_before_bind() {
        let long = format!("/tmp/{}.sock", "x".repeat(200));
        let mut server = UdsServer::new(&long);
        match server.start() {
            Err(TransportError::PathTooLong { path }) => assert!(path.contains("xxx")),
            other => panic!("expected PathTooLong, got {other:?}"),
        }
    }

    #[test]
    fn poll_before_start_fails() {
        let mut server = UdsServer::new("/tmp/unused.sock");
        let mut events = Vec::new();
        assert!(matches!(
            server.poll_once(Duration::from_millis(1), &mut events),
            Err(TransportError::NotStarted)
        ));
    }

    #[test]
    fn send_without_client_fails() {
        let dir = tempdir().unwrap();
        let mut server = UdsServer::new(dir.path().join("adapter.sock"));
        server.start().unwrap();

        let header = FrameHeader::new(MessageType::Event, 0);
        let result = server.send(&header, b"{}");
        assert!(matches!(result, Err(TransportError::NoClient)));
        assert_eq!(result.unwrap_err().to_string(), "no connected client");
    }

    #[test]
    fn accept_emits_connected_once() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("adapter.sock");
        let mut server = UdsServer::new(&path);
        server.start().unwrap();

        let _client = UnixStream::connect(&path).unwrap();
        let mut events = Vec::new();
        poll_until(&mut server, &mut events, |events| {
            events.contains(&TransportEvent::Connected)
        });
        assert_eq!(events, vec![TransportEvent::Connected]);
        assert!(server.is_client_connected());
    }

    #[test]
    fn replacing_client_does_not_emit_second_connected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("adapter.sock");
        let mut server = UdsServer::new(&path);
        server.start().unwrap();

        let _first = UnixStream::connect(&path).unwrap();
        let mut events = Vec::new();
        poll_until(&mut server, &mut events, |events| {
            events.contains(&TransportEvent::Connected)
        });

        let _second = UnixStream::connect(&path).unwrap();
        events.clear();
        for _ in 0..10 {
            server.poll_once(Duration::from_millis(10), &mut events).unwrap();
        }
        assert!(!events.contains(&TransportEvent::Connected));
        assert!(server.is_client_connected());
    }

    #[test]
    fn whole_frame_delivered() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("adapter.sock");
        let mut server = UdsServer::new(&path);
        server.start().unwrap();

        let mut client = UnixStream::connect(&path).unwrap();
        client
            .write_all(&frame_bytes(MessageType::Request, 7, b"{\"a\":1}"))
            .unwrap();

        let mut events = Vec::new();
        poll_until(&mut server, &mut events, |events| {
            events
                .iter()
                .any(|event| matches!(event, TransportEvent::Frame { .. }))
        });

        let frame = events
            .iter()
            .find_map(|event| match event {
                TransportEvent::Frame { header, payload } => Some((header, payload)),
                _ => None,
            })
            .unwrap();
        assert_eq!(frame.0.kind(), Some(MessageType::Request));
        assert_eq!(frame.0.correlation_id, 7);
        assert_eq!(frame.1.as_slice(), b"{\"a\":1}");
    }

    #[test]
    fn frames_reassemble_from_any_split() {
        // One byte per poll cycle still yields exactly one frame callback.
        let payload = br#"{"method":"cmd.channel.invoke","cmdId":42}"#;
        let bytes = frame_bytes(MessageType::Request, 9, payload);

        for split in 1..bytes.len() {
            let dir = tempdir().unwrap();
            let path = dir.path().join("adapter.sock");
            let mut server = UdsServer::new(&path);
            server.start().unwrap();

            let mut client = UnixStream::connect(&path).unwrap();
            let mut events = Vec::new();
            poll_until(&mut server, &mut events, |events| {
                events.contains(&TransportEvent::Connected)
            });

            client.write_all(&bytes[..split]).unwrap();
            for _ in 0..5 {
                server.poll_once(Duration::from_millis(5), &mut events).unwrap();
            }
            let frames_before = events
                .iter()
                .filter(|event| matches!(event, TransportEvent::Frame { .. }))
                .count();
            assert_eq!(frames_before, 0, "premature frame at split {split}");

            client.write_all(&bytes[split..]).unwrap();
            poll_until(&mut server, &mut events, |events| {
                events
                    .iter()
                    .any(|event| matches!(event, TransportEvent::Frame { .. }))
            });

            let frames: Vec<_> = events
                .iter()
                .filter_map(|event| match event {
                    TransportEvent::Frame { header, payload } => Some((header, payload)),
                    _ => None,
                })
                .collect();
            assert_eq!(frames.len(), 1, "split {split}");
            assert_eq!(frames[0].0.correlation_id, 9);
            assert_eq!(frames[0].1.as_slice(), payload);
        }
    }

    #[test]
    fn burst_of_frames_arrives_in_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("adapter.sock");
        let mut server = UdsServer::new(&path);
        server.start().unwrap();

        let mut client = UnixStream::connect(&path).unwrap();
        let mut burst = Vec::new();
        for id in 1..=5u64 {
            burst.extend_from_slice(&frame_bytes(
                MessageType::Request,
                id,
                format!("{{\"seq\":{id}}}").as_bytes(),
            ));
        }
        client.write_all(&burst).unwrap();

        let mut events = Vec::new();
        poll_until(&mut server, &mut events, |events| {
            events
                .iter()
                .filter(|event| matches!(event, TransportEvent::Frame { .. }))
                .count()
                == 5
        });

        let ids: Vec<u64> = events
            .iter()
            .filter_map(|event| match event {
                TransportEvent::Frame { header, .. } => Some(header.correlation_id),
                _ => None,
            })
            .collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn empty_payload_frame_is_delivered() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("adapter.sock");
        let mut server = UdsServer::new(&path);
        server.start().unwrap();

        let mut client = UnixStream::connect(&path).unwrap();
        client
            .write_all(&frame_bytes(MessageType::Heartbeat, 0, b""))
            .unwrap();

        let mut events = Vec::new();
        poll_until(&mut server, &mut events, |events| {
            events
                .iter()
                .any(|event| matches!(event, TransportEvent::Frame { .. }))
        });
        let payload_len = events
            .iter()
            .find_map(|event| match event {
                TransportEvent::Frame { payload, .. } => Some(payload.len()),
                _ => None,
            })
            .unwrap();
        assert_eq!(payload_len, 0);
    }

    #[test]
    fn bad_magic_closes_client_with_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("adapter.sock");
        let mut server = UdsServer::new(&path);
        server.start().unwrap();

        let mut client = UnixStream::connect(&path).unwrap();
        let mut events = Vec::new();
        poll_until(&mut server, &mut events, |events| {
            events.contains(&TransportEvent::Connected)
        });

        let mut bad = frame_bytes(MessageType::Event, 0, b"");
        bad[0..4].copy_from_slice(b"XXXX");
        client.write_all(&bad).unwrap();

        let mut error = None;
        for _ in 0..100 {
            match server.poll_once(Duration::from_millis(10), &mut events) {
                Ok(()) => {}
                Err(err) => {
                    error = Some(err);
                    break;
                }
            }
        }
        let error = error.expect("poll must surface the header error");
        assert_eq!(error.to_string(), "invalid frame header");
        assert!(events.contains(&TransportEvent::Disconnected));
        assert!(!server.is_client_connected());

        // listener stays alive and accepts again
        let _again = UnixStream::connect(&path).unwrap();
        events.clear();
        poll_until(&mut server, &mut events, |events| {
            events.contains(&TransportEvent::Connected)
        });
    }

    #[test]
    fn bad_version_closes_client_with_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("adapter.sock");
        let mut server = UdsServer::new(&path);
        server.start().unwrap();

        let mut client = UnixStream::connect(&path).unwrap();
        let mut bad = frame_bytes(MessageType::Event, 0, b"");
        assert_eq!(bad[0..4], FRAME_MAGIC);
        bad[4..6].copy_from_slice(&(PROTOCOL_VERSION + 1).to_le_bytes());
        client.write_all(&bad).unwrap();

        let mut events = Vec::new();
        let mut saw_error = false;
        for _ in 0..100 {
            match server.poll_once(Duration::from_millis(10), &mut events) {
                Ok(()) => {}
                Err(TransportError::InvalidFrameHeader) => {
                    saw_error = true;
                    break;
                }
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert!(saw_error);
    }

    #[test]
    fn peer_close_emits_disconnected_and_resets_buffer() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("adapter.sock");
        let mut server = UdsServer::new(&path);
        server.start().unwrap();

        let mut client = UnixStream::connect(&path).unwrap();
        let mut events = Vec::new();
        poll_until(&mut server, &mut events, |events| {
            events.contains(&TransportEvent::Connected)
        });

        // leave a partial frame in the receive buffer, then hang up
        let bytes = frame_bytes(MessageType::Request, 3, b"{\"x\":1}");
        client.write_all(&bytes[..FRAME_HEADER_LEN + 2]).unwrap();
        drop(client);

        poll_until(&mut server, &mut events, |events| {
            events.contains(&TransportEvent::Disconnected)
        });
        assert!(!server.is_client_connected());

        // a fresh client starts from a clean buffer
        let mut client = UnixStream::connect(&path).unwrap();
        client
            .write_all(&frame_bytes(MessageType::Request, 4, b"{}"))
            .unwrap();
        events.clear();
        poll_until(&mut server, &mut events, |events| {
            events
                .iter()
                .any(|event| matches!(event, TransportEvent::Frame { .. }))
        });
        let corr = events
            .iter()
            .find_map(|event| match event {
                TransportEvent::Frame { header, .. } => Some(header.correlation_id),
                _ => None,
            })
            .unwrap();
        assert_eq!(corr, 4);
    }

    #[test]
    fn send_writes_header_and_payload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("adapter.sock");
        let mut server = UdsServer::new(&path);
        server.start().unwrap();

        let mut client = UnixStream::connect(&path).unwrap();
        client
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        let mut events = Vec::new();
        poll_until(&mut server, &mut events, |events| {
            events.contains(&TransportEvent::Connected)
        });

        // stale payload_size in the caller's header must be rewritten
        let mut header = FrameHeader::new(MessageType::Event, 11);
        header.payload_size = 9999;
        server.send(&header, b"{\"k\":true}").unwrap();

        let mut header_bytes = [0u8; FRAME_HEADER_LEN];
        client.read_exact(&mut header_bytes).unwrap();
        let received = FrameHeader::unpack(&header_bytes);
        assert!(received.is_valid());
        assert_eq!(received.kind(), Some(MessageType::Event));
        assert_eq!(received.correlation_id, 11);
        assert_eq!(received.payload_size, 10);

        let mut payload = vec![0u8; received.payload_size as usize];
        client.read_exact(&mut payload).unwrap();
        assert_eq!(payload.as_slice(), b"{\"k\":true}");
    }
}
