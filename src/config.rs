use std::net::IpAddr;

/// Address family selection shared by the client CLI (`-4`/`-6`) and the
/// server's dual-stack bind (spec §6.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum AddrFamily {
    /// Let the resolver pick (`AF_UNSPEC`).
    Any,
    V4,
    V6,
}

impl AddrFamily {
    pub fn matches(self, ip: IpAddr) -> bool {
        match self {
            AddrFamily::Any => true,
            AddrFamily::V4 => ip.is_ipv4(),
            AddrFamily::V6 => ip.is_ipv6(),
        }
    }
}

/// Default in-play re-prompt / pending-idle timeout, in seconds (spec §6.1).
pub const DEFAULT_TIMEOUT_SECS: u64 = 5;
