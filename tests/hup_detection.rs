//! S4: a peer that connects and closes without sending surfaces as a
//! hangup, not a timeout, and well before a generous timeout elapses.

use std::net::{TcpListener, TcpStream};
use std::os::fd::{FromRawFd, IntoRawFd};
use std::thread;
use std::time::{Duration, Instant};

use fiberio::awaitable::Awaitable;
use fiberio::error::RuntimeError;
use fiberio::io::Recv;
use fiberio::scheduler;

#[test]
fn recv_raises_hup_before_timeout() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    let acceptor = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        drop(stream); // close immediately without writing
    });

    let client = TcpStream::connect(addr).unwrap();
    client.set_nonblocking(true).unwrap();
    let fd = client.into_raw_fd();

    let start = Instant::now();
    scheduler::spawn(move || {
        let mut buf = [0u8; 16];
        let result = Recv::new(fd, &mut buf)
            .with_timeout(Duration::from_secs(5))
            .await_();
        assert!(matches!(result, Err(RuntimeError::Hup)), "got {:?}", result);
        drop(unsafe { TcpStream::from_raw_fd(fd) });
    });
    scheduler::run();

    assert!(
        start.elapsed() < Duration::from_secs(1),
        "hup should be detected well before the 5s timeout, took {:?}",
        start.elapsed()
    );

    acceptor.join().unwrap();
}
