//! NIO transport descriptors.
//!
//! Descriptors use the colon separated syntax of the hypervisor command line:
//!
//! | Kind        | Syntax                                  |
//! |-------------|-----------------------------------------|
//! | `unix`      | `unix:<local_path>:<remote_path>`       |
//! | `vde`       | `vde:<control_path>:<local_path>`       |
//! | `tap`       | `tap:<device>`                          |
//! | `udp`       | `udp:<local_port>:<host>:<remote_port>` |
//! | `tcp_cli`   | `tcp_cli:<host>:<port>`                 |
//! | `tcp_ser`   | `tcp_ser:<port>`                        |
//! | `null`      | `null`                                  |
//! | `linux_eth` | `linux_eth:<device>`                    |
//! | `gen_eth`   | `gen_eth:<device>`                      |

use crate::error::NioError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Transport a NIO was created with.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum NioKind {
    Unix { local: String, remote: String },
    Vde { control: String, local: String },
    Tap { device: String },
    Udp {
        local_port: u16,
        remote_host: String,
        remote_port: u16,
    },
    TcpClient { host: String, port: u16 },
    TcpServer { port: u16 },
    Null,
    LinuxEth { device: String },
    GenEth { device: String },
}

impl NioKind {
    /// Keyword used in descriptors for this kind.
    pub fn keyword(&self) -> &'static str {
        match self {
            NioKind::Unix { .. } => "unix",
            NioKind::Vde { .. } => "vde",
            NioKind::Tap { .. } => "tap",
            NioKind::Udp { .. } => "udp",
            NioKind::TcpClient { .. } => "tcp_cli",
            NioKind::TcpServer { .. } => "tcp_ser",
            NioKind::Null => "null",
            NioKind::LinuxEth { .. } => "linux_eth",
            NioKind::GenEth { .. } => "gen_eth",
        }
    }

    /// Builds a kind from a keyword and its already split arguments.
    pub fn from_parts(keyword: &str, args: &[&str]) -> Result<Self, NioError> {
        let descriptor = || {
            let mut s = keyword.to_string();
            for arg in args {
                s.push(':');
                s.push_str(arg);
            }
            s
        };
        let expect = |count: usize| -> Result<(), NioError> {
            if args.len() == count && args.iter().all(|a| !a.is_empty()) {
                Ok(())
            } else {
                Err(NioError::invalid_descriptor(
                    descriptor(),
                    format!("'{}' takes {} argument(s)", keyword, count),
                ))
            }
        };
        let port = |value: &str| -> Result<u16, NioError> {
            value.parse::<u16>().map_err(|_| {
                NioError::invalid_descriptor(descriptor(), format!("invalid port '{}'", value))
            })
        };

        let kind = match keyword {
            "unix" => {
                expect(2)?;
                NioKind::Unix {
                    local: args[0].to_string(),
                    remote: args[1].to_string(),
                }
            }
            "vde" => {
                expect(2)?;
                NioKind::Vde {
                    control: args[0].to_string(),
                    local: args[1].to_string(),
                }
            }
            "tap" => {
                expect(1)?;
                NioKind::Tap {
                    device: args[0].to_string(),
                }
            }
            "udp" => {
                expect(3)?;
                NioKind::Udp {
                    local_port: port(args[0])?,
                    remote_host: args[1].to_string(),
                    remote_port: port(args[2])?,
                }
            }
            "tcp_cli" => {
                expect(2)?;
                NioKind::TcpClient {
                    host: args[0].to_string(),
                    port: port(args[1])?,
                }
            }
            "tcp_ser" => {
                expect(1)?;
                NioKind::TcpServer {
                    port: port(args[0])?,
                }
            }
            "null" => {
                expect(0)?;
                NioKind::Null
            }
            "linux_eth" => {
                expect(1)?;
                NioKind::LinuxEth {
                    device: args[0].to_string(),
                }
            }
            "gen_eth" => {
                expect(1)?;
                NioKind::GenEth {
                    device: args[0].to_string(),
                }
            }
            other => {
                return Err(NioError::invalid_descriptor(
                    descriptor(),
                    format!("unknown NIO type '{}'", other),
                ))
            }
        };
        Ok(kind)
    }
}

impl fmt::Display for NioKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.keyword())?;
        match self {
            NioKind::Unix { local, remote } => write!(f, ":{}:{}", local, remote),
            NioKind::Vde { control, local } => write!(f, ":{}:{}", control, local),
            NioKind::Tap { device }
            | NioKind::LinuxEth { device }
            | NioKind::GenEth { device } => write!(f, ":{}", device),
            NioKind::Udp {
                local_port,
                remote_host,
                remote_port,
            } => write!(f, ":{}:{}:{}", local_port, remote_host, remote_port),
            NioKind::TcpClient { host, port } => write!(f, ":{}:{}", host, port),
            NioKind::TcpServer { port } => write!(f, ":{}", port),
            NioKind::Null => Ok(()),
        }
    }
}

impl FromStr for NioKind {
    type Err = NioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut tokens = s.trim().split(':');
        let keyword = tokens.next().unwrap_or_default();
        let args: Vec<&str> = tokens.collect();
        Self::from_parts(keyword, &args)
    }
}

impl TryFrom<String> for NioKind {
    type Error = NioError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<NioKind> for String {
    fn from(kind: NioKind) -> String {
        kind.to_string()
    }
}
