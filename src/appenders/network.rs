//! Network appender for remote logging
//!
//! Sends one rendered line per event to a remote collector over TCP, for
//! example a [`ServerSocket`](crate::net::ServerSocket) in another process.

use crate::core::{Appender, Layout, LoggingEvent, LoggerError, Result};
use parking_lot::Mutex;
use std::io::Write;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

const IO_TIMEOUT: Duration = Duration::from_secs(5);

/// Network appender that sends events to a remote TCP server
///
/// # Example
///
/// ```no_run
/// use rust_logger_hierarchy::appenders::NetworkAppender;
/// use rust_logger_hierarchy::prelude::*;
/// use std::sync::Arc;
///
/// let appender = NetworkAppender::new("127.0.0.1:4560")
///     .expect("Failed to connect to log server");
///
/// let hierarchy = Hierarchy::new();
/// hierarchy.root_logger().add_appender(Arc::new(appender));
/// hierarchy.logger("app").info("This event is sent to 127.0.0.1:4560");
/// ```
pub struct NetworkAppender {
    name: String,
    address: SocketAddr,
    stream: Mutex<Option<TcpStream>>,
    layout: Layout,
    reconnect_on_error: bool,
    closed: AtomicBool,
}

impl NetworkAppender {
    /// Connect to `addr`
    ///
    /// # Errors
    ///
    /// Returns an error if the address does not resolve or the connection fails
    pub fn new(addr: impl ToSocketAddrs) -> Result<Self> {
        let address = addr
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| LoggerError::config("NetworkAppender", "address resolved to nothing"))?;
        let stream = Self::connect(address)?;

        Ok(Self {
            name: "network".to_string(),
            address,
            stream: Mutex::new(Some(stream)),
            layout: Layout::default(),
            reconnect_on_error: true,
            closed: AtomicBool::new(false),
        })
    }

    fn connect(address: SocketAddr) -> Result<TcpStream> {
        let stream = TcpStream::connect_timeout(&address, IO_TIMEOUT)?;
        stream.set_write_timeout(Some(IO_TIMEOUT))?;
        stream.set_read_timeout(Some(IO_TIMEOUT))?;
        stream.set_nodelay(true)?;
        Ok(stream)
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use]
    pub fn with_layout(mut self, layout: Layout) -> Self {
        self.layout = layout;
        self
    }

    /// Enable or disable a single reconnect attempt when a send fails
    ///
    /// Default: enabled
    #[must_use]
    pub fn with_reconnect(mut self, enable: bool) -> Self {
        self.reconnect_on_error = enable;
        self
    }

    pub fn address(&self) -> SocketAddr {
        self.address
    }

    pub fn is_connected(&self) -> bool {
        self.stream.lock().is_some()
    }
}

impl Appender for NetworkAppender {
    fn append(&self, event: &LoggingEvent) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(LoggerError::appender_closed(&self.name));
        }

        let mut message = self.layout.format(event);
        message.push('\n');

        let mut stream = self.stream.lock();
        let error = match stream.as_mut() {
            Some(s) => match s.write_all(message.as_bytes()) {
                Ok(()) => return Ok(()),
                Err(e) => LoggerError::from(e),
            },
            None => LoggerError::writer("Network stream not connected"),
        };

        // connection lost
        *stream = None;
        if !self.reconnect_on_error {
            return Err(error);
        }

        match Self::connect(self.address) {
            Ok(mut fresh) => {
                fresh.write_all(message.as_bytes())?;
                *stream = Some(fresh);
                Ok(())
            }
            Err(reconnect_err) => Err(LoggerError::writer(format!(
                "Failed to send event and reconnect: {} (reconnect: {})",
                error, reconnect_err
            ))),
        }
    }

    fn flush(&self) -> Result<()> {
        if let Some(ref mut stream) = *self.stream.lock() {
            stream.flush()?;
        }
        Ok(())
    }

    fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::Release);
        if let Some(mut stream) = self.stream.lock().take() {
            stream.flush()?;
            let _ = stream.shutdown(std::net::Shutdown::Both);
        }
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for NetworkAppender {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}
