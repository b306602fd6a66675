//! Command line and server configuration

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use clap::Parser;

/// Pending connections the kernel queues before `accept`
pub const DEFAULT_BACKLOG: u32 = 10;

/// Bytes read from an admitted client per read call
pub const DEFAULT_READ_CHUNK: usize = 1024;

/// Outbound messages buffered per client before it is considered stuck
pub const DEFAULT_OUTBOUND_QUEUE: usize = 64;

/// Channel buffer size for server commands
pub const DEFAULT_COMMAND_QUEUE: usize = 256;

/// Command line arguments
#[derive(Debug, Parser)]
#[command(name = "chatroom", version, about = "Multi-client TCP chatroom")]
pub struct Args {
    /// TCP port to listen on
    #[arg(value_parser = clap::value_parser!(u16).range(1..))]
    pub port: u16,

    /// Address to bind
    #[arg(long, default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub host: IpAddr,
}

/// Runtime settings for the listener and connections
#[derive(Debug, Clone, Copy)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub backlog: u32,
    pub read_chunk: usize,
    pub outbound_queue: usize,
    pub command_queue: usize,
}

impl ServerConfig {
    /// Default settings bound to `bind_addr`
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            backlog: DEFAULT_BACKLOG,
            read_chunk: DEFAULT_READ_CHUNK,
            outbound_queue: DEFAULT_OUTBOUND_QUEUE,
            command_queue: DEFAULT_COMMAND_QUEUE,
        }
    }
}

impl From<&Args> for ServerConfig {
    fn from(args: &Args) -> Self {
        Self::new(SocketAddr::new(args.host, args.port))
    }
}
