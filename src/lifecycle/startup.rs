//! Startup announcement.
//!
//! The launching process scans stdout for the `proxy-server-start` token
//! and the URL that follows it, so the line is printed directly rather
//! than going through the (filterable) log subscriber.

use std::io::Write;
use std::net::SocketAddr;

/// Token the launcher looks for.
pub const START_TOKEN: &str = "proxy-server-start";

/// `http://<host>:<port>` using the configured host and the bound port.
pub fn listen_url(host: &str, addr: SocketAddr) -> String {
    let host = if host.contains(':') && !host.starts_with('[') {
        format!("[{}]", host)
    } else {
        host.to_string()
    };
    format!("http://{}:{}", host, addr.port())
}

pub fn start_line(host: &str, addr: SocketAddr) -> String {
    format!("{} {}", START_TOKEN, listen_url(host, addr))
}

/// Print the start line and mirror it to the log.
pub fn announce(host: &str, addr: SocketAddr) {
    let url = listen_url(host, addr);
    let mut stdout = std::io::stdout().lock();
    let _ = writeln!(stdout, "{}", start_line(host, addr));
    let _ = stdout.flush();
    tracing::info!(url = %url, "{}", START_TOKEN);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_line_uses_bound_port() {
        let addr: SocketAddr = "127.0.0.1:41234".parse().unwrap();
        assert_eq!(
            start_line("localhost", addr),
            "proxy-server-start http://localhost:41234"
        );
    }

    #[test]
    fn ipv6_hosts_are_bracketed() {
        let addr: SocketAddr = "[::1]:8080".parse().unwrap();
        assert_eq!(listen_url("::1", addr), "http://[::1]:8080");
    }
}
