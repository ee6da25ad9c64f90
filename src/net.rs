//! Listening side of the network transport
//!
//! [`ServerSocket`] is what a log collector binds to receive the stream a
//! [`NetworkAppender`](crate::appenders::NetworkAppender) sends. Accepting can
//! be bounded by a timeout; zero or `None` means wait forever.

use crate::core::{LoggerError, Result};
use parking_lot::Mutex;
use std::io;
use std::net::{Ipv4Addr, SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::thread;
use std::time::{Duration, Instant};

const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(10);

pub struct ServerSocket {
    listener: TcpListener,
    so_timeout: Mutex<Option<Duration>>,
}

impl ServerSocket {
    /// Listen on every local interface. Port 0 picks a free port; see
    /// [`local_addr`](Self::local_addr).
    pub fn bind(port: u16) -> Result<Self> {
        Self::bind_addr((Ipv4Addr::UNSPECIFIED, port))
    }

    pub fn bind_addr(addr: impl ToSocketAddrs) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .map_err(|e| LoggerError::io_operation("bind server socket", "bind failed", e))?;
        Ok(Self {
            listener,
            so_timeout: Mutex::new(None),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept timeout; `None` or zero blocks indefinitely
    pub fn so_timeout(&self) -> Option<Duration> {
        *self.so_timeout.lock()
    }

    pub fn set_so_timeout(&self, timeout: Option<Duration>) {
        *self.so_timeout.lock() = timeout.filter(|t| !t.is_zero());
    }

    /// Wait for the next connection, honoring the accept timeout
    pub fn accept(&self) -> Result<(TcpStream, SocketAddr)> {
        match self.so_timeout() {
            None => {
                self.listener.set_nonblocking(false)?;
                self.listener
                    .accept()
                    .map_err(|e| LoggerError::io_operation("accept connection", "accept failed", e))
            }
            Some(timeout) => self.accept_with_timeout(timeout),
        }
    }

    fn accept_with_timeout(&self, timeout: Duration) -> Result<(TcpStream, SocketAddr)> {
        self.listener.set_nonblocking(true)?;
        let deadline = Instant::now() + timeout;

        loop {
            match self.listener.accept() {
                Ok((stream, peer)) => {
                    // accepted sockets may inherit the listener's mode
                    stream.set_nonblocking(false)?;
                    return Ok((stream, peer));
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    if Instant::now() >= deadline {
                        return Err(LoggerError::io_operation(
                            "accept connection",
                            format!("no connection within {:?}", timeout),
                            io::Error::from(io::ErrorKind::TimedOut),
                        ));
                    }
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
                Err(e) => {
                    return Err(LoggerError::io_operation("accept connection", "accept failed", e))
                }
            }
        }
    }
}
