//! S2: accept → recv → send → shutdown against a real loopback socket.

use std::io::{Read, Write};
use std::net::{Shutdown, TcpListener, TcpStream};
use std::os::fd::{FromRawFd, IntoRawFd};
use std::thread;
use std::time::Duration;

use fiberio::awaitable::Awaitable;
use fiberio::io::{Accept, Recv, Send};
use fiberio::scheduler;

#[test]
fn accept_read_write_roundtrip() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.set_nonblocking(true).unwrap();
    let addr = listener.local_addr().unwrap();
    let listener_fd = listener.into_raw_fd();

    scheduler::spawn(move || {
        let (conn_fd, _peer) = Accept::new(listener_fd).await_().expect("accept failed");

        let mut buf = [0u8; 5];
        let n = Recv::new(conn_fd, &mut buf).await_().expect("recv failed");
        assert_eq!(n, 5);
        assert_eq!(&buf[..n], b"hello");

        Send::new(conn_fd, &buf[..n]).await_().expect("send failed");

        // SAFETY: `conn_fd` was produced by `accept4` and not used
        // again outside this block; wrapping it reclaims ownership so
        // `shutdown`/`close` happen through `std`'s own Drop impl.
        let conn = unsafe { TcpStream::from_raw_fd(conn_fd) };
        let _ = conn.shutdown(Shutdown::Both);
        // SAFETY: `listener_fd` is not used again after this point.
        drop(unsafe { TcpListener::from_raw_fd(listener_fd) });
    });

    let client = thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        let mut stream = TcpStream::connect(addr).unwrap();
        stream.write_all(b"hello").unwrap();
        let mut reply = [0u8; 5];
        stream.read_exact(&mut reply).unwrap();
        reply
    });

    scheduler::run();

    let reply = client.join().unwrap();
    assert_eq!(&reply, b"hello");
}
