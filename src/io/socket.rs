//! Raw non-blocking socket primitives, thin wrappers over `libc` in the
//! same unsafe-block-plus-`syscall!` texture as the reactor's selector.

use std::io;
use std::mem::size_of_val;
use std::net::SocketAddr;
use std::os::fd::RawFd;

use crate::error::RuntimeError;

pub(crate) fn socket(domain: libc::c_int, ty: libc::c_int) -> io::Result<RawFd> {
    syscall!(socket(domain, ty | libc::SOCK_NONBLOCK | libc::SOCK_CLOEXEC, 0))
}

pub(crate) fn set_reuse_address(fd: RawFd) -> io::Result<()> {
    let value: libc::c_int = 1;
    syscall!(setsockopt(
        fd,
        libc::SOL_SOCKET,
        libc::SO_REUSEADDR,
        &value as *const _ as *const libc::c_void,
        size_of_val(&value) as libc::socklen_t,
    ))
    .map(|_| ())
}

pub(crate) fn bind(fd: RawFd, addr: &SocketAddr) -> io::Result<()> {
    let (ptr, len) = from_socket_addr(addr);
    syscall!(bind(fd, ptr, len)).map(|_| ())
}

pub(crate) fn listen(fd: RawFd, backlog: i32) -> io::Result<()> {
    syscall!(listen(fd, backlog)).map(|_| ())
}

pub(crate) fn domain_for(addr: &SocketAddr) -> libc::c_int {
    match addr {
        SocketAddr::V4(_) => libc::AF_INET,
        SocketAddr::V6(_) => libc::AF_INET6,
    }
}

/// Issues a non-blocking `connect`. `Ok(true)` means the connect
/// completed immediately; `Ok(false)` means it is in progress
/// (`EINPROGRESS`) and the caller must wait for write-readiness.
pub(crate) fn connect(fd: RawFd, addr: &SocketAddr) -> io::Result<bool> {
    let (ptr, len) = from_socket_addr(addr);
    // SAFETY: `ptr`/`len` describe a valid sockaddr for the lifetime of
    // this call.
    let res = unsafe { libc::connect(fd, ptr, len) };
    if res == 0 {
        return Ok(true);
    }
    let err = io::Error::last_os_error();
    if err.raw_os_error() == Some(libc::EINPROGRESS) {
        Ok(false)
    } else {
        Err(err)
    }
}

/// Reads the pending `SO_ERROR` on a socket, e.g. after a non-blocking
/// connect becomes writable. `Ok(())` means the connect succeeded.
pub(crate) fn take_socket_error(fd: RawFd) -> io::Result<()> {
    let mut err: libc::c_int = 0;
    let mut len = size_of_val(&err) as libc::socklen_t;
    syscall!(getsockopt(
        fd,
        libc::SOL_SOCKET,
        libc::SO_ERROR,
        &mut err as *mut _ as *mut libc::c_void,
        &mut len,
    ))?;
    if err == 0 {
        Ok(())
    } else {
        Err(io::Error::from_raw_os_error(err))
    }
}

/// Builds the error to report for a `ResumeReason::IoError` resume.
///
/// By the time a resumed fiber gets here, `errno` has long since been
/// overwritten by whatever other syscalls ran between the `epoll_wait`
/// that observed `EPOLLERR` and now (other fibers' I/O, the reactor's
/// own `epoll_ctl` deregistrations). `take_socket_error` sidesteps that:
/// `SO_ERROR` holds the fault the kernel actually recorded against this
/// descriptor until read, so it is still accurate here.
pub(crate) fn take_error(fd: RawFd) -> RuntimeError {
    match take_socket_error(fd) {
        Ok(()) => RuntimeError::Io(io::Error::from(io::ErrorKind::Other)),
        Err(e) => RuntimeError::Io(e),
    }
}

pub(crate) fn accept4(fd: RawFd) -> io::Result<(RawFd, SocketAddr)> {
    let mut storage: libc::sockaddr_storage = unsafe { std::mem::zeroed() };
    let mut len = size_of_val(&storage) as libc::socklen_t;
    let accepted = syscall!(accept4(
        fd,
        &mut storage as *mut _ as *mut libc::sockaddr,
        &mut len,
        libc::SOCK_NONBLOCK | libc::SOCK_CLOEXEC,
    ))?;
    // SAFETY: the kernel filled `storage` for the accepted peer.
    let addr = unsafe { to_socket_addr(&storage)? };
    Ok((accepted, addr))
}

pub(crate) fn recv(fd: RawFd, buf: &mut [u8]) -> io::Result<usize> {
    syscall!(recv(
        fd,
        buf.as_mut_ptr() as *mut libc::c_void,
        buf.len(),
        0,
    ))
    .map(|n| n as usize)
}

pub(crate) fn send(fd: RawFd, buf: &[u8]) -> io::Result<usize> {
    syscall!(send(
        fd,
        buf.as_ptr() as *const libc::c_void,
        buf.len(),
        libc::MSG_NOSIGNAL,
    ))
    .map(|n| n as usize)
}

pub(crate) fn read(fd: RawFd, buf: &mut [u8]) -> io::Result<usize> {
    syscall!(read(fd, buf.as_mut_ptr() as *mut libc::c_void, buf.len())).map(|n| n as usize)
}

pub(crate) fn write(fd: RawFd, buf: &[u8]) -> io::Result<usize> {
    syscall!(write(fd, buf.as_ptr() as *const libc::c_void, buf.len())).map(|n| n as usize)
}

/// Number of bytes immediately readable, via the `FIONREAD` ioctl. Used
/// by the activity peek to short-circuit a registration.
pub(crate) fn readable_bytes(fd: RawFd) -> io::Result<usize> {
    let mut n: libc::c_int = 0;
    syscall!(ioctl(fd, libc::FIONREAD, &mut n)).map(|_| n.max(0) as usize)
}

fn from_socket_addr(addr: &SocketAddr) -> (*const libc::sockaddr, libc::socklen_t) {
    match addr {
        SocketAddr::V4(ref addr) => (
            addr as *const _ as *const libc::sockaddr,
            size_of_val(addr) as libc::socklen_t,
        ),
        SocketAddr::V6(ref addr) => (
            addr as *const _ as *const libc::sockaddr,
            size_of_val(addr) as libc::socklen_t,
        ),
    }
}

/// `storage` must have been initialized as a `sockaddr_in` or
/// `sockaddr_in6` by the kernel (e.g. via `accept4`/`getpeername`).
///
/// Builds the `std` address field-by-field rather than transmuting the
/// raw `sockaddr_in`/`sockaddr_in6`: `SocketAddrV4`/`SocketAddrV6` are
/// not `repr(C)` and carry no layout guarantee compatible with the
/// kernel's struct, even though they happen to be the same size.
unsafe fn to_socket_addr(storage: &libc::sockaddr_storage) -> io::Result<SocketAddr> {
    match storage.ss_family as libc::c_int {
        libc::AF_INET => {
            let sin = &*(storage as *const _ as *const libc::sockaddr_in);
            let ip = std::net::Ipv4Addr::from(u32::from_be(sin.sin_addr.s_addr));
            let port = u16::from_be(sin.sin_port);
            Ok(SocketAddr::V4(std::net::SocketAddrV4::new(ip, port)))
        }
        libc::AF_INET6 => {
            let sin6 = &*(storage as *const _ as *const libc::sockaddr_in6);
            let ip = std::net::Ipv6Addr::from(sin6.sin6_addr.s6_addr);
            let port = u16::from_be(sin6.sin6_port);
            Ok(SocketAddr::V6(std::net::SocketAddrV6::new(
                ip,
                port,
                u32::from_be(sin6.sin6_flowinfo),
                sin6.sin6_scope_id,
            )))
        }
        _ => Err(io::ErrorKind::InvalidInput.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_error_ignores_stale_errno() {
        let fd = socket(libc::AF_INET, libc::SOCK_STREAM).unwrap();

        // Dirty the process-wide errno with an unrelated failing call, the
        // way other fibers' syscalls and the reactor's own `epoll_ctl`
        // deregistrations would between an `EPOLLERR` dispatch and the
        // resumed fiber actually handling it.
        unsafe { libc::close(-1) };
        assert_eq!(io::Error::last_os_error().raw_os_error(), Some(libc::EBADF));

        // `fd` has no pending socket error, so `take_error` must report
        // that, not the stale `EBADF` left over from `close(-1)`.
        match take_error(fd) {
            RuntimeError::Io(e) => assert_ne!(e.raw_os_error(), Some(libc::EBADF)),
            other => panic!("expected RuntimeError::Io, got {:?}", other),
        }

        unsafe { libc::close(fd) };
    }
}
