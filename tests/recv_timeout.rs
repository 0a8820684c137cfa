//! S3: a strict recv timeout raises rather than returning an empty read.

use std::net::{TcpListener, TcpStream};
use std::os::fd::{FromRawFd, IntoRawFd};
use std::thread;
use std::time::{Duration, Instant};

use fiberio::awaitable::Awaitable;
use fiberio::error::RuntimeError;
use fiberio::io::Recv;
use fiberio::scheduler;

#[test]
fn strict_recv_times_out() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    let acceptor = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        // Hold the connection open without sending anything.
        thread::sleep(Duration::from_millis(200));
        drop(stream);
    });

    let client = TcpStream::connect(addr).unwrap();
    client.set_nonblocking(true).unwrap();
    let fd = client.into_raw_fd();

    let start = Instant::now();
    scheduler::spawn(move || {
        let mut buf = [0u8; 16];
        let result = Recv::new(fd, &mut buf)
            .with_timeout(Duration::from_millis(50))
            .strict()
            .await_();
        assert!(matches!(result, Err(RuntimeError::TimedOut)));
        drop(unsafe { TcpStream::from_raw_fd(fd) });
    });
    scheduler::run();

    assert!(start.elapsed() >= Duration::from_millis(50));
    assert!(start.elapsed() < Duration::from_millis(1_000));

    acceptor.join().unwrap();
}
