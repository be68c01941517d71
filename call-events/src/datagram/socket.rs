//! Delivery socket setup.

use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use tokio::net::UdpSocket;

/// Detect the local IP the host uses to reach `remote`.
///
/// This connects a throwaway UDP socket toward the MI and reads the address
/// the kernel picked for it. No data is sent.
pub(crate) fn local_ip_towards(remote: SocketAddr) -> io::Result<IpAddr> {
    let unspecified: SocketAddr = if remote.is_ipv4() {
        (Ipv4Addr::UNSPECIFIED, 0).into()
    } else {
        (Ipv6Addr::UNSPECIFIED, 0).into()
    };

    let probe = std::net::UdpSocket::bind(unspecified)?;
    probe.connect(remote)?;
    Ok(probe.local_addr()?.ip())
}

/// Bind a fresh delivery socket on an ephemeral port of `ip`.
///
/// Must be called from within a tokio runtime.
pub(crate) fn bind_delivery_socket(ip: IpAddr, buffer_size: usize) -> io::Result<UdpSocket> {
    let socket = std::net::UdpSocket::bind((ip, 0))?;
    set_buffer_sizes(&socket, buffer_size);
    socket.set_nonblocking(true)?;
    UdpSocket::from_std(socket)
}

#[cfg(unix)]
fn set_buffer_sizes(socket: &std::net::UdpSocket, size: usize) {
    use std::os::unix::io::AsRawFd;

    let fd = socket.as_raw_fd();
    let value = libc::c_int::try_from(size).unwrap_or(libc::c_int::MAX);

    for (option, name) in [(libc::SO_RCVBUF, "SO_RCVBUF"), (libc::SO_SNDBUF, "SO_SNDBUF")] {
        // SAFETY: `fd` belongs to `socket`, which outlives the call, and `value`
        // is a live c_int whose size is passed alongside it.
        let rc = unsafe {
            libc::setsockopt(
                fd,
                libc::SOL_SOCKET,
                option,
                &value as *const libc::c_int as *const libc::c_void,
                std::mem::size_of::<libc::c_int>() as libc::socklen_t,
            )
        };
        if rc != 0 {
            tracing::warn!(
                option = name,
                size,
                error = %io::Error::last_os_error(),
                "could not resize event socket buffer"
            );
        }
    }
}

#[cfg(not(unix))]
fn set_buffer_sizes(_socket: &std::net::UdpSocket, size: usize) {
    tracing::debug!(size, "socket buffer sizing not supported on this platform");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_ip_towards_loopback() {
        let ip = local_ip_towards("127.0.0.1:8080".parse().unwrap()).unwrap();
        assert!(ip.is_loopback());
    }

    #[tokio::test]
    async fn test_bind_delivery_socket() {
        let socket = bind_delivery_socket(IpAddr::V4(Ipv4Addr::LOCALHOST), 65535).unwrap();
        let addr = socket.local_addr().unwrap();

        assert!(addr.ip().is_loopback());
        assert_ne!(addr.port(), 0);
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_bind_delivery_socket_sizes_buffers() {
        use std::os::unix::io::AsRawFd;

        let socket = bind_delivery_socket(IpAddr::V4(Ipv4Addr::LOCALHOST), 65535).unwrap();

        let mut value: libc::c_int = 0;
        let mut len = std::mem::size_of::<libc::c_int>() as libc::socklen_t;
        let rc = unsafe {
            libc::getsockopt(
                socket.as_raw_fd(),
                libc::SOL_SOCKET,
                libc::SO_RCVBUF,
                &mut value as *mut libc::c_int as *mut libc::c_void,
                &mut len,
            )
        };

        assert_eq!(rc, 0);
        // Linux doubles the requested size for bookkeeping
        assert!(value >= 65535);
    }
}
