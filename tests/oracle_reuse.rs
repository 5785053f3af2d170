use futures_util::AsyncWriteExt;
use h1_oracle::{Error, Oracle, RequestSpec};

mod common;

#[async_std::test]
async fn two_exchanges_on_one_connection() -> Result<(), Error> {
    let (port, server) = common::serve_once(|mut tcp| async move {
        for _ in 0..2_u8 {
            let head = common::read_request_head(&mut tcp).await;
            assert_eq!(head, "GET /path HTTP/1.1\r\n\r\n");

            let res = b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nOK";
            tcp.write_all(res).await.unwrap();
        }

        // The second exchange validates, so the probe arrives last.
        let head = common::read_request_head(&mut tcp).await;
        assert_eq!(head, "GET / HTTP/1.1\r\nConnection: close\r\n\r\n");

        let res = b"HTTP/1.1 400 Bad Request\r\nConnection: close\r\nContent-Length: 0\r\n\r\n";
        tcp.write_all(res).await.unwrap();
    })
    .await;

    let mut oracle = Oracle::new(port);

    let first = oracle
        .perform(&RequestSpec::new(["GET /path HTTP/1.1"]).no_validate())
        .await?;
    let second = oracle
        .perform(&RequestSpec::new(["GET /path HTTP/1.1"]).reuse())
        .await?;

    assert_eq!(first.status, second.status);
    assert_eq!(first.body, second.body);
    assert_eq!(first.body, b"OK");

    server.await;

    Ok(())
}

#[async_std::test]
async fn fresh_request_replaces_the_session() -> Result<(), Error> {
    let (port, server) = common::serve(|listener| async move {
        for _ in 0..2_u8 {
            let (mut tcp, _) = listener.accept().await.expect("accept");
            let _ = common::read_request_head(&mut tcp).await;

            let res = b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nOK";
            tcp.write_all(res).await.unwrap();
        }
    })
    .await;

    let mut oracle = Oracle::new(port);

    // Default is a fresh connection per request; the server must see two.
    for _ in 0..2_u8 {
        let res = oracle
            .perform(&RequestSpec::new(["GET /path HTTP/1.1"]).no_validate())
            .await?;
        assert_eq!(res.status, 200);
    }

    server.await;

    Ok(())
}
