use futures_util::AsyncWriteExt;
use h1_oracle::{Error, Oracle, ProbeConfig, RequestSpec};
use http::StatusCode;

mod common;

#[async_std::test]
async fn probe_runs_on_open_connection() -> Result<(), Error> {
    let (port, server) = common::serve_once(|mut tcp| async move {
        let head = common::read_request_head(&mut tcp).await;
        assert_eq!(head, "GET /a HTTP/1.1\r\n\r\n");

        let res = b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nOK";
        tcp.write_all(res).await.unwrap();

        // Neither side signalled closure, so the probe must follow on the
        // same connection.
        let head = common::read_request_head(&mut tcp).await;
        assert_eq!(head, "GET / HTTP/1.1\r\nConnection: close\r\n\r\n");

        let res = b"HTTP/1.1 400 Bad Request\r\nConnection: close\r\nContent-Length: 0\r\n\r\n";
        tcp.write_all(res).await.unwrap();
    })
    .await;

    let mut oracle = Oracle::new(port);
    let res = oracle.perform(&RequestSpec::new(["GET /a HTTP/1.1"])).await?;

    assert_eq!(res.status, 200);
    assert_eq!(res.body, b"OK");
    assert!(!res.closed);

    server.await;

    Ok(())
}

#[async_std::test]
async fn probe_status_mismatch_is_fatal() {
    let (port, server) = common::serve_once(|mut tcp| async move {
        let _ = common::read_request_head(&mut tcp).await;
        let res = b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nOK";
        tcp.write_all(res).await.unwrap();

        let _ = common::read_request_head(&mut tcp).await;
        let res = b"HTTP/1.1 200 OK\r\nConnection: close\r\nContent-Length: 0\r\n\r\n";
        tcp.write_all(res).await.unwrap();
    })
    .await;

    let mut oracle = Oracle::new(port);
    let err = oracle
        .perform(&RequestSpec::new(["GET /a HTTP/1.1"]))
        .await
        .expect_err("probe must reject an unexpected status");

    match err {
        Error::Invariant(msg) => assert!(msg.contains("probe")),
        e => panic!("expected Invariant, got {:?}", e),
    }

    server.await;
}

#[async_std::test]
async fn probe_skipped_when_either_peer_closed() -> Result<(), Error> {
    let (port, server) = common::serve_once(|mut tcp| async move {
        let _ = common::read_request_head(&mut tcp).await;

        let res = b"HTTP/1.1 200 OK\r\nConnection: close\r\nContent-Length: 2\r\n\r\nOK";
        tcp.write_all(res).await.unwrap();

        // No probe may follow; the next read must see the client go away.
        assert!(h1_oracle::http11::read_head(&mut tcp).await.is_err());
    })
    .await;

    let mut oracle = Oracle::new(port);
    let res = oracle
        .perform(&RequestSpec::new(["GET /a HTTP/1.1", "Connection: close"]))
        .await?;

    assert!(res.closed);

    drop(oracle);
    server.await;

    Ok(())
}

#[async_std::test]
async fn probe_convention_is_configurable() -> Result<(), Error> {
    let (port, server) = common::serve_once(|mut tcp| async move {
        let _ = common::read_request_head(&mut tcp).await;
        let res = b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nOK";
        tcp.write_all(res).await.unwrap();

        let head = common::read_request_head(&mut tcp).await;
        assert_eq!(head, "GET /probe HTTP/1.1\r\nConnection: close\r\n\r\n");

        let res = b"HTTP/1.1 404 Not Found\r\nConnection: close\r\nContent-Length: 0\r\n\r\n";
        tcp.write_all(res).await.unwrap();
    })
    .await;

    let probe = ProbeConfig {
        path: "/probe".into(),
        expect: StatusCode::NOT_FOUND,
    };

    let mut oracle = Oracle::with_probe(port, probe);
    let res = oracle.perform(&RequestSpec::new(["GET /a HTTP/1.1"])).await?;

    assert_eq!(res.status, 200);

    server.await;

    Ok(())
}
