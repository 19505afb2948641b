//! Parsers for the handful of /proc files the probes read.

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

/// Longest process name the kernel keeps in `comm`.
pub(crate) const COMM_LEN: usize = 15;

/// Split `/proc/<pid>/stat` into (comm, state).
pub(crate) fn parse_stat(stat: &str) -> Option<(&str, char)> {
    let open = stat.find('(')?;
    let close = stat.rfind(')')?;
    let comm = stat.get(open + 1..close)?;
    let state = stat.get(close + 2..)?.chars().next()?;
    Some((comm, state))
}

/// Whether a NUL-separated environment block exposes a graphical session.
pub(crate) fn has_display(environ: &[u8]) -> bool {
    environ.split(|b| *b == 0).any(|kv| {
        (kv.starts_with(b"DISPLAY=") && kv.len() > b"DISPLAY=".len())
            || (kv.starts_with(b"WAYLAND_DISPLAY=") && kv.len() > b"WAYLAND_DISPLAY=".len())
    })
}

/// Inode from an fd link target such as `socket:[12345]`.
pub(crate) fn socket_inode(link: &str) -> Option<u64> {
    link.strip_prefix("socket:[")?
        .strip_suffix(']')?
        .parse()
        .ok()
}

/// Parse `/proc/net/udp` or `/proc/net/udp6` into (inode, local address) pairs.
pub(crate) fn parse_net_table(table: &str) -> Vec<(u64, SocketAddr)> {
    table
        .lines()
        .skip(1)
        .filter_map(|line| {
            let cols: Vec<&str> = line.split_whitespace().collect();
            let local = parse_hex_addr(cols.get(1)?)?;
            let inode = cols.get(9)?.parse().ok()?;
            Some((inode, local))
        })
        .collect()
}

/// Decode the kernel's `ADDR:PORT` hex form. Address words are in host byte order.
fn parse_hex_addr(field: &str) -> Option<SocketAddr> {
    let (addr, port) = field.split_once(':')?;
    let port = u16::from_str_radix(port, 16).ok()?;
    let ip = match addr.len() {
        8 => {
            let word = u32::from_str_radix(addr, 16).ok()?;
            IpAddr::V4(Ipv4Addr::from(word.to_ne_bytes()))
        }
        32 => {
            let mut bytes = [0u8; 16];
            for (i, chunk) in bytes.chunks_mut(4).enumerate() {
                let word = u32::from_str_radix(addr.get(i * 8..i * 8 + 8)?, 16).ok()?;
                chunk.copy_from_slice(&word.to_ne_bytes());
            }
            IpAddr::V6(Ipv6Addr::from(bytes))
        }
        _ => return None,
    };
    Some(SocketAddr::new(ip, port))
}

/// `VERSION_ID` from an os-release file.
pub(crate) fn os_release_version(contents: &str) -> Option<String> {
    let vars: HashMap<&str, &str> = contents
        .lines()
        .filter_map(|l| l.split_once('='))
        .collect();
    vars.get("VERSION_ID")
        .map(|v| v.trim().trim_matches('"').to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(all(test, target_endian = "little"))]
mod tests {
    use super::*;

    const UDP: &str = "\
   sl  local_address rem_address   st tx_queue rx_queue tr tm->when retrnsmt   uid  timeout inode ref pointer drops
  464: 00000000:14E9 00000000:0000 07 00000000:00000000 00:00000000 00000000  1000        0 41234 2 0000000000000000 0
  892: 0100007F:0035 00000000:0000 07 00000000:00000000 00:00000000 00000000   101        0 18810 2 0000000000000000 0
 1021: 0A00A8C0:C35A 0DE4B434:0D96 01 00000000:00000000 00:00000000 00000000  1000        0 55120 2 0000000000000000 0
";

    const UDP6: &str = "\
  sl  local_address                         remote_address                        st tx_queue rx_queue tr tm->when retrnsmt   uid  timeout inode ref pointer drops
  118: 00000000000000000000000000000000:14E9 00000000000000000000000000000000:0000 07 00000000:00000000 00:00000000 00000000  1000        0 41235 2 0000000000000000 0
  200: 000080FE00000000FF005450B6AD1DFE:0222 00000000000000000000000000000000:0000 07 00000000:00000000 00:00000000 00000000     0        0 9001 2 0000000000000000 0
";

    #[test]
    fn parses_ipv4_rows() {
        let rows = parse_net_table(UDP);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], (41234, "0.0.0.0:5353".parse().unwrap()));
        assert_eq!(rows[1], (18810, "127.0.0.1:53".parse().unwrap()));
        assert_eq!(rows[2], (55120, "192.168.0.10:50010".parse().unwrap()));
    }

    #[test]
    fn parses_ipv6_rows() {
        let rows = parse_net_table(UDP6);
        assert_eq!(rows[0], (41235, "[::]:5353".parse().unwrap()));
        assert_eq!(rows[1].0, 9001);
        assert_eq!(
            rows[1].1.ip(),
            "fe80::5054:ff:fe1d:adb6".parse::<IpAddr>().unwrap()
        );
    }

    #[test]
    fn stat_with_spaces_in_comm() {
        let stat = "4242 (Web Content) S 4200 4200 4200 0 -1 4194560";
        assert_eq!(parse_stat(stat), Some(("Web Content", 'S')));
        assert_eq!(parse_stat("77 (zoom) Z 1"), Some(("zoom", 'Z')));
    }

    #[test]
    fn display_detection() {
        assert!(has_display(b"HOME=/home/u\0DISPLAY=:0\0"));
        assert!(has_display(b"WAYLAND_DISPLAY=wayland-0\0"));
        assert!(!has_display(b"HOME=/home/u\0DISPLAY=\0"));
        assert!(!has_display(b""));
    }

    #[test]
    fn socket_links() {
        assert_eq!(socket_inode("socket:[55120]"), Some(55120));
        assert_eq!(socket_inode("pipe:[55120]"), None);
        assert_eq!(socket_inode("/dev/null"), None);
    }

    #[test]
    fn os_release_parsing() {
        let contents = "NAME=\"Ubuntu\"\nVERSION_ID=\"22.04\"\nID=ubuntu\n";
        assert_eq!(os_release_version(contents).as_deref(), Some("22.04"));
        assert_eq!(os_release_version("ID=arch\n"), None);
    }
}
