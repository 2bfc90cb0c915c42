//! Tests for the socket listener.

use std::net::TcpStream;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::{Duration, Instant};

use rstest::rstest;

use super::listener::SocketListener;
use super::test_utils::wait_for_count;
use super::{ConnectionHandler, CountingHandler, ListenerError, ShutdownFlag};

#[rstest]
fn tcp_listener_accepts_connections() {
    let listener = SocketListener::bind("127.0.0.1", 0).expect("bind tcp listener");
    let addr = listener.local_addr();
    let (count, handler) = CountingHandler::new();
    let names = Arc::clone(&handler);
    let handler: Arc<dyn ConnectionHandler> = handler;
    let handle = listener
        .start(handler, ShutdownFlag::default())
        .expect("start listener");

    TcpStream::connect(addr).expect("connect first client");
    TcpStream::connect(addr).expect("connect second client");

    assert!(wait_for_count(&count, 2), "expected two connections");
    assert!(
        names
            .thread_names()
            .iter()
            .all(|name| name.starts_with("buildwire-conn-")),
        "connection threads should be named: {:?}",
        names.thread_names()
    );
    handle.shutdown();
    handle.join().expect("join listener");
}

#[rstest]
fn shutdown_closes_the_port_before_returning() {
    let listener = SocketListener::bind("127.0.0.1", 0).expect("bind tcp listener");
    let addr = listener.local_addr();
    let (_, handler) = CountingHandler::new();
    let handle = listener
        .start(handler, ShutdownFlag::default())
        .expect("start listener");

    handle.shutdown();

    assert!(TcpStream::connect(addr).is_err(), "port should be closed");
    handle.join().expect("join listener");
}

#[rstest]
fn join_waits_for_running_connections() {
    let listener = SocketListener::bind("127.0.0.1", 0).expect("bind tcp listener");
    let addr = listener.local_addr();
    let (count, handler) = CountingHandler::holding(Duration::from_millis(200));
    let handle = listener
        .start(handler, ShutdownFlag::default())
        .expect("start listener");
    let _client = TcpStream::connect(addr).expect("connect client");
    assert!(wait_for_count(&count, 1), "client should be served");

    let started = Instant::now();
    handle.shutdown();
    handle.join().expect("join listener");

    assert!(
        started.elapsed() >= Duration::from_millis(100),
        "join returned while a connection was still running"
    );
}

#[rstest]
fn external_flag_stops_the_loop() {
    let listener = SocketListener::bind("127.0.0.1", 0).expect("bind tcp listener");
    let flag = ShutdownFlag::default();
    let (_, handler) = CountingHandler::new();
    let handle = listener.start(handler, flag.clone()).expect("start listener");

    flag.trigger();
    assert!(handle.flag().is_triggered());
    handle.join().expect("join listener");
}

#[rstest]
fn busy_port_fails_to_bind() {
    let existing = SocketListener::bind("127.0.0.1", 0).expect("bind first listener");
    let error = SocketListener::bind("127.0.0.1", existing.local_addr().port())
        .expect_err("second bind should fail");
    assert!(matches!(error, ListenerError::BindTcp { .. }));
}

#[rstest]
fn connection_limit_defers_extra_clients() {
    let listener = SocketListener::bind("127.0.0.1", 0)
        .expect("bind tcp listener")
        .with_connection_limit(Some(1));
    let addr = listener.local_addr();
    let (count, handler) = CountingHandler::holding(Duration::from_millis(300));
    let handle = listener
        .start(handler, ShutdownFlag::default())
        .expect("start listener");

    let _first = TcpStream::connect(addr).expect("connect first client");
    let _second = TcpStream::connect(addr).expect("connect second client");

    assert!(wait_for_count(&count, 1), "first client should be served");
    thread::sleep(Duration::from_millis(100));
    assert_eq!(count.load(Ordering::SeqCst), 1, "second client must wait");
    assert!(wait_for_count(&count, 2), "second client served after release");

    handle.shutdown();
    handle.join().expect("join listener");
}
