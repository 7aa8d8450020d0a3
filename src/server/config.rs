//! Server configuration.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::thread;

/// HTTP server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// The address to bind to.
    pub addr: SocketAddr,
    /// The number of worker threads handling connections.
    pub workers: usize,
    /// The size of each socket read.
    pub read_buffer_size: usize,
    /// The largest request line plus header section accepted, in bytes.
    pub max_head_size: usize,
    /// The largest request body accepted, in bytes.
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 8042),
            workers: thread::available_parallelism().map(|n| n.get()).unwrap_or(4),
            read_buffer_size: 8192,
            max_head_size: 64 * 1024,
            max_body_size: 8 * 1024 * 1024,
        }
    }
}

impl ServerConfig {
    pub fn with_address(mut self, ip: IpAddr) -> Self {
        self.addr.set_ip(ip);
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.addr.set_port(port);
        self
    }

    /// Set the worker count. At least one worker always runs.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Capacity of the queue between the accept loop and the workers.
    pub fn queue_capacity(&self) -> usize {
        3 * self.workers.max(1)
    }
}
