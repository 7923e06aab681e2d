//! Kernel connection files.
//!
//! A kernel writes a JSON connection file describing where its five ZeroMQ
//! channels listen and how messages are signed:
//!
//! ```json
//! {
//!   "transport": "tcp", "ip": "127.0.0.1",
//!   "shell_port": 53794, "iopub_port": 53795, "stdin_port": 53796,
//!   "control_port": 53797, "hb_port": 53798,
//!   "signature_scheme": "hmac-sha256", "key": "a0436f6c-..."
//! }
//! ```

use std::fmt;
use std::net::IpAddr;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::signature::{SignatureScheme, Signer};

/// Errors produced while loading a connection file.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionFileError {
    #[error("failed to read connection file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed connection file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid connection file: {0}")]
    Invalid(String),
}

/// ZeroMQ transport named by the connection file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Tcp,
    Ipc,
}

impl Transport {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Tcp => "tcp",
            Self::Ipc => "ipc",
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The five kernel channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Shell,
    IoPub,
    Stdin,
    Control,
    Heartbeat,
}

/// On-disk layout. Unknown fields (e.g. `kernel_name` extras) are ignored.
#[derive(Debug, Deserialize)]
struct ConnectionFile {
    transport: String,
    ip: String,
    shell_port: u16,
    iopub_port: u16,
    stdin_port: u16,
    control_port: u16,
    hb_port: u16,
    #[serde(default)]
    signature_scheme: String,
    #[serde(default)]
    key: String,
    #[serde(default)]
    kernel_name: Option<String>,
}

/// Parsed, validated kernel connection file.
#[derive(Debug, Clone)]
pub struct ConnectionDescriptor {
    transport: Transport,
    ip: String,
    shell_port: u16,
    iopub_port: u16,
    stdin_port: u16,
    control_port: u16,
    hb_port: u16,
    signature_scheme: String,
    /// `None` when the key is empty: frames are then accepted unsigned.
    signer: Option<Signer>,
    kernel_name: Option<String>,
}

impl ConnectionDescriptor {
    /// Read and validate the connection file at `path`.
    pub fn parse(path: &Path) -> Result<Self, ConnectionFileError> {
        let content =
            std::fs::read_to_string(path).map_err(|source| ConnectionFileError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_json(&content)
    }

    /// Validate an in-memory connection file document.
    pub fn from_json(content: &str) -> Result<Self, ConnectionFileError> {
        let file: ConnectionFile = serde_json::from_str(content)?;

        let transport = match file.transport.as_str() {
            "tcp" => Transport::Tcp,
            "ipc" => Transport::Ipc,
            other => {
                return Err(ConnectionFileError::Invalid(format!(
                    "unsupported transport {other:?}"
                )));
            }
        };

        if file.ip.is_empty() {
            return Err(ConnectionFileError::Invalid("ip is empty".into()));
        }
        if transport == Transport::Tcp {
            file.ip.parse::<IpAddr>().map_err(|_| {
                ConnectionFileError::Invalid(format!("ip {:?} is not an IP address", file.ip))
            })?;
            let ports = [
                ("shell_port", file.shell_port),
                ("iopub_port", file.iopub_port),
                ("stdin_port", file.stdin_port),
                ("control_port", file.control_port),
                ("hb_port", file.hb_port),
            ];
            if let Some((name, _)) = ports.iter().find(|(_, port)| *port == 0) {
                return Err(ConnectionFileError::Invalid(format!("{name} must be non-zero")));
            }
        }

        let signer = if file.key.is_empty() {
            None
        } else {
            let scheme: SignatureScheme = file
                .signature_scheme
                .parse()
                .map_err(|e| ConnectionFileError::Invalid(format!("{e}")))?;
            Some(Signer::new(scheme, file.key.into_bytes()))
        };

        Ok(Self {
            transport,
            ip: file.ip,
            shell_port: file.shell_port,
            iopub_port: file.iopub_port,
            stdin_port: file.stdin_port,
            control_port: file.control_port,
            hb_port: file.hb_port,
            signature_scheme: file.signature_scheme,
            signer,
            kernel_name: file.kernel_name,
        })
    }

    pub const fn transport(&self) -> Transport {
        self.transport
    }

    pub fn ip(&self) -> &str {
        &self.ip
    }

    pub const fn port(&self, channel: Channel) -> u16 {
        match channel {
            Channel::Shell => self.shell_port,
            Channel::IoPub => self.iopub_port,
            Channel::Stdin => self.stdin_port,
            Channel::Control => self.control_port,
            Channel::Heartbeat => self.hb_port,
        }
    }

    /// Scheme name exactly as written in the file (may be empty when unsigned).
    pub fn signature_scheme(&self) -> &str {
        &self.signature_scheme
    }

    /// Signing key bytes; empty means messages are not signed.
    pub fn key(&self) -> &[u8] {
        self.signer.as_ref().map_or(&[][..], Signer::key)
    }

    pub const fn signer(&self) -> Option<&Signer> {
        self.signer.as_ref()
    }

    pub fn kernel_name(&self) -> Option<&str> {
        self.kernel_name.as_deref()
    }

    /// ZeroMQ endpoint for `channel`.
    ///
    /// `tcp://{ip}:{port}` for TCP; IPC endpoints use the `{ip}-{port}` path
    /// convention kernels bind to.
    pub fn address_for(&self, channel: Channel) -> String {
        let port = self.port(channel);
        match self.transport {
            Transport::Tcp => format!("tcp://{}:{port}", self.ip),
            Transport::Ipc => format!("ipc://{}-{port}", self.ip),
        }
    }

    /// Endpoint of the IOPub broadcast channel.
    pub fn iopub_address(&self) -> String {
        self.address_for(Channel::IoPub)
    }
}
