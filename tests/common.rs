#![allow(dead_code)]

use async_std::net::{TcpListener, TcpStream};
use async_std::task;
use std::future::Future;
use std::sync::Once;

/// Bind a scripted server on an ephemeral port and hand the listener to the
/// given closure in a spawned task. Returns the port and the join handle so
/// tests can await server-side assertions.
pub async fn serve<F, R>(f: F) -> (u16, task::JoinHandle<()>)
where
    F: FnOnce(TcpListener) -> R + Send + 'static,
    R: Future<Output = ()> + Send + 'static,
{
    setup_logger();

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let port = listener.local_addr().expect("local_addr").port();

    let handle = task::spawn(async move { f(listener).await });

    (port, handle)
}

/// Like [`serve`] but accepts a single connection and passes the stream.
pub async fn serve_once<F, R>(f: F) -> (u16, task::JoinHandle<()>)
where
    F: FnOnce(TcpStream) -> R + Send + 'static,
    R: Future<Output = ()> + Send + 'static,
{
    serve(move |listener| async move {
        let (tcp, _) = listener.accept().await.expect("accept");
        f(tcp).await;
    })
    .await
}

/// Read one request head off the stream, terminator included.
pub async fn read_request_head(tcp: &mut TcpStream) -> String {
    let (head, _) = h1_oracle::http11::read_head(tcp)
        .await
        .expect("read request head");
    String::from_utf8(head).expect("request head is utf8")
}

pub fn setup_logger() {
    static START: Once = Once::new();
    START.call_once(|| {
        let test_log = std::env::var("TEST_LOG")
            .map(|x| x != "0" && x.to_lowercase() != "false")
            .unwrap_or(false);
        let level = if test_log {
            log::LevelFilter::Trace
        } else {
            log::LevelFilter::Info
        };
        pretty_env_logger::formatted_builder()
            .filter_level(log::LevelFilter::Warn)
            .filter_module("h1_oracle", level)
            .target(env_logger::Target::Stdout)
            .init();
    });
}
