//! The conformance run: every scenario the server contract is held to.
//!
//! Invoked as `h1-oracle <port>` against an already running server. Fixture
//! bytes come from the `test_static/` tree the server serves from, so body
//! comparisons are byte-exact.

use h1_oracle::check;
use h1_oracle::{Error, Oracle, RequestSpec, RunConfig, RunCtx};
use rand::RngCore;
use std::fs;
use std::process;

/// Root of the fixture tree, shared with the server under test.
const FIXTURE_DIR: &str = "test_static";

/// Where the server's one redirecting path must point.
const REDIRECT_LOCATION: &str = "http://127.0.0.1:2567/redirect";

macro_rules! scenario {
    ($ctx:expr, $oracle:expr, $name:expr, $body:expr) => {{
        let result: Result<(), Error> = $body.await;
        let warnings = $oracle.take_warnings();
        $ctx.record($name, result, warnings);
    }};
}

#[async_std::main]
async fn main() {
    env_logger::init();

    let port: u16 = match std::env::args().nth(1).and_then(|p| p.parse().ok()) {
        Some(p) => p,
        None => {
            eprintln!("usage: h1-oracle <port>");
            process::exit(2);
        }
    };

    let cfg = RunConfig::default();
    let mut ctx = RunCtx::new();
    let mut oracle = Oracle::with_probe(port, cfg.probe.clone());

    let asset_a = load_fixture("a");
    let asset_chars = load_fixture(
        "dir/ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz-0123456789.txt",
    );

    scenario!(ctx, oracle, "simple head request works", async {
        let res = oracle.perform(&RequestSpec::new(["HEAD /a HTTP/1.1"])).await?;
        check!(res.status == 200, "expected 200, got {}", res.status);
        check!(
            res.content_length == asset_a.len() as u64,
            "content-length {} does not match fixture length {}",
            res.content_length,
            asset_a.len()
        );
        Ok(())
    });

    scenario!(ctx, oracle, "simple get request works", async {
        let res = oracle.perform(&RequestSpec::new(["GET /a HTTP/1.1"])).await?;
        check!(res.status == 200, "expected 200, got {}", res.status);
        check!(res.body == asset_a, "body differs from fixture");
        Ok(())
    });

    scenario!(ctx, oracle, "repeated get on a reused connection is identical", async {
        // The first exchange skips the probe so the connection stays open
        // and untouched for the explicit reuse.
        let first = oracle
            .perform(&RequestSpec::new(["GET /a HTTP/1.1"]).no_validate())
            .await?;
        let second = oracle
            .perform(&RequestSpec::new(["GET /a HTTP/1.1"]).reuse())
            .await?;
        check!(
            first.status == second.status,
            "statuses differ across the reused connection: {} then {}",
            first.status,
            second.status
        );
        check!(first.body == second.body, "bodies differ across the reused connection");
        Ok(())
    });

    scenario!(ctx, oracle, "path with all allowed characters returns 200", async {
        let res = oracle
            .perform(&RequestSpec::new([
                "GET /dir/ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz-0123456789.txt HTTP/1.1",
            ]))
            .await?;
        check!(res.status == 200, "expected 200, got {}", res.status);
        check!(res.body == asset_chars, "body differs from fixture");
        Ok(())
    });

    let mut head_error_page_length = 0_u64;

    scenario!(ctx, oracle, "invalid path in head returns 404", async {
        let res = oracle
            .perform(&RequestSpec::new(["HEAD /ThisFileShouldNotExist HTTP/1.1"]))
            .await?;
        check!(res.status == 404, "expected 404, got {}", res.status);
        head_error_page_length = res.content_length;
        Ok(())
    });

    scenario!(
        ctx,
        oracle,
        "invalid path in get returns 404 and same content length",
        async {
            let res = oracle
                .perform(&RequestSpec::new(["GET /ThisFileShouldNotExist HTTP/1.1"]))
                .await?;
            check!(res.status == 404, "expected 404, got {}", res.status);
            check!(
                res.body.len() as u64 == head_error_page_length,
                "error page is {} bytes, HEAD declared {}",
                res.body.len(),
                head_error_page_length
            );
            Ok(())
        }
    );

    scenario!(ctx, oracle, "unsupported http version returns 400", async {
        let res = oracle.perform(&RequestSpec::new(["GET /a HTTP/1.0"])).await?;
        check!(res.status == 400, "expected 400, got {}", res.status);
        check!(res.closed, "connection not reported closed after a 400");
        Ok(())
    });

    scenario!(ctx, oracle, "invalid method returns 405 or 501", async {
        let res = oracle.perform(&RequestSpec::new(["TEST /a HTTP/1.1"])).await?;
        check!(
            res.status == 405 || res.status == 501,
            "expected 405 or 501, got {}",
            res.status
        );
        oracle.warn_if(
            !res.closed,
            "invalid methods probably should close the connection",
        );
        Ok(())
    });

    scenario!(ctx, oracle, "invalid characters in path return 404", async {
        for c in 0_u16..256 {
            let ch = char::from(c as u8);
            if ch.is_ascii_alphanumeric() || ".-/ \r\n".contains(ch) {
                continue;
            }
            for method in &["HEAD", "GET"] {
                let res = oracle
                    .perform(&RequestSpec::new([format!("{} /{} HTTP/1.1", method, ch)]))
                    .await?;
                check!(
                    res.status == 404 || res.status == 400,
                    "{} of path with {:?} expected 404 or 400, got {}",
                    method,
                    ch,
                    res.status
                );
            }
        }
        Ok(())
    });

    scenario!(
        ctx,
        oracle,
        "\\r and \\n characters in path maybe return 404",
        async {
            for (ch, name) in &[('\r', "\\r"), ('\n', "\\n")] {
                let res = oracle
                    .perform(&RequestSpec::new([format!("GET /{} HTTP/1.1", ch)]))
                    .await?;
                if cfg.ctrl_path_fatal {
                    check!(
                        res.status == 404,
                        "GET /{} expected 404, got {}",
                        name,
                        res.status
                    );
                } else {
                    oracle.warn_if(
                        res.status != 404,
                        &format!("Requesting GET /{} should probably result in 404", name),
                    );
                }
            }
            Ok(())
        }
    );

    scenario!(ctx, oracle, "more than one space in the path returns 400", async {
        for line in &["GET  /a HTTP/1.1", "GET /a  HTTP/1.1"] {
            let res = oracle.perform(&RequestSpec::new([*line])).await?;
            check!(res.status == 400, "{:?} expected 400, got {}", line, res.status);
        }
        Ok(())
    });

    scenario!(ctx, oracle, "ignored duplicate headers are allowed", async {
        let res = oracle
            .perform(&RequestSpec::new([
                "GET /a HTTP/1.1",
                "ignored: first",
                "ignored: second",
            ]))
            .await?;
        check!(res.status == 200, "expected 200, got {}", res.status);
        Ok(())
    });

    scenario!(
        ctx,
        oracle,
        "duplicate headers specified in the task content return 400",
        async {
            let res = oracle
                .perform(&RequestSpec::new([
                    "GET /a HTTP/1.1",
                    "connection: close",
                    "connection: close",
                ]))
                .await?;
            check!(res.status == 400, "expected 400, got {}", res.status);
            Ok(())
        }
    );

    scenario!(ctx, oracle, "header without a name returns 400", async {
        let res = oracle
            .perform(&RequestSpec::new(["GET /a HTTP/1.1", ": invalid"]))
            .await?;
        check!(res.status == 400, "expected 400, got {}", res.status);
        Ok(())
    });

    scenario!(ctx, oracle, "header without colon fails", async {
        let res = oracle
            .perform(&RequestSpec::new(["GET /a HTTP/1.1", "invalid"]))
            .await?;
        check!(res.status == 400, "expected 400, got {}", res.status);
        Ok(())
    });

    scenario!(ctx, oracle, "missing slash at start of the path returns 400", async {
        let res = oracle
            .perform(&RequestSpec::new(["GET a HTTP/1.1", "invalid"]))
            .await?;
        check!(res.status == 400, "expected 400, got {}", res.status);
        Ok(())
    });

    scenario!(ctx, oracle, "connection close closes the connection", async {
        for close in &["connection: close", "connection:close", "ConNECtioN: close"] {
            let res = oracle
                .perform(&RequestSpec::new(["GET /a HTTP/1.1", *close]))
                .await?;
            check!(res.status == 200, "{:?}: expected 200, got {}", close, res.status);
            check!(res.closed, "{:?}: connection not reported closed", close);
        }
        Ok(())
    });

    scenario!(
        ctx,
        oracle,
        "space before colon in header either returns 400 or the header is honored",
        async {
            let res = oracle
                .perform(&RequestSpec::new(["GET /a HTTP/1.1", "connection : close"]))
                .await?;
            check!(
                res.status == 200 || res.status == 400,
                "expected 200 or 400, got {}",
                res.status
            );
            Ok(())
        }
    );

    scenario!(ctx, oracle, "'..' path name tests return 200", async {
        for path in &["/dir/../a", "/dir/dir2/../../a"] {
            let res = oracle
                .perform(&RequestSpec::new([format!("GET {} HTTP/1.1", path)]))
                .await?;
            check!(res.status == 200, "{}: expected 200, got {}", path, res.status);
            check!(
                res.body == asset_a,
                "{}: body differs from requesting /a directly",
                path
            );
        }
        Ok(())
    });

    scenario!(ctx, oracle, "'../test-runner.py' returns 404", async {
        let res = oracle
            .perform(&RequestSpec::new(["GET /../test-runner.py HTTP/1.1"]))
            .await?;
        check!(res.status == 404, "expected 404, got {}", res.status);
        Ok(())
    });

    scenario!(ctx, oracle, "'/../a' returns 404", async {
        let res = oracle.perform(&RequestSpec::new(["GET /../a HTTP/1.1"])).await?;
        check!(res.status == 404, "expected 404, got {}", res.status);
        Ok(())
    });

    scenario!(ctx, oracle, "'/a/' returns 404", async {
        let res = oracle.perform(&RequestSpec::new(["GET /a/ HTTP/1.1"])).await?;
        check!(
            res.status == 404 || res.status == 400,
            "expected 404 or 400, got {}",
            res.status
        );
        Ok(())
    });

    scenario!(ctx, oracle, "stray \\r or \\n should do something sane", async {
        for header in &["first: second\rthird: fourth", "first: second\nthird: fourth"] {
            let res = oracle
                .perform(&RequestSpec::new(["GET /a HTTP/1.1", *header]))
                .await?;
            check!(
                (res.status == 200 && res.body == asset_a) || res.status == 400,
                "expected 200 with the fixture body or 400, got {}",
                res.status
            );
        }
        Ok(())
    });

    scenario!(ctx, oracle, "correlated server head request works", async {
        let res = oracle.perform(&RequestSpec::new(["HEAD /redirect HTTP/1.1"])).await?;
        check!(res.status == 302, "expected 302, got {}", res.status);
        check!(
            res.headers.get("location").map(String::as_str) == Some(REDIRECT_LOCATION),
            "location header is {:?}",
            res.headers.get("location")
        );
        Ok(())
    });

    scenario!(ctx, oracle, "correlated server get request works", async {
        let res = oracle.perform(&RequestSpec::new(["GET /redirect HTTP/1.1"])).await?;
        check!(res.status == 302, "expected 302, got {}", res.status);
        check!(
            res.headers.get("location").map(String::as_str) == Some(REDIRECT_LOCATION),
            "location header is {:?}",
            res.headers.get("location")
        );
        Ok(())
    });

    scenario!(
        ctx,
        oracle,
        "server handles long non-existing paths and headers",
        async {
            let long_line = |method: &str| format!("{} /{} HTTP/1.1", method, "a".repeat(8191));
            let cookies =
                vec![format!("cookie: {}", "a".repeat(8192)); 256];

            for method in &["HEAD", "GET"] {
                let res = oracle.perform(&RequestSpec::new([long_line(*method)])).await?;
                check!(
                    res.status == 404,
                    "{} long path expected 404, got {}",
                    method,
                    res.status
                );

                let mut lines = vec![long_line(*method)];
                lines.extend(cookies.iter().cloned());
                let res = oracle.perform(&RequestSpec::new(lines)).await?;
                check!(
                    res.status == 404,
                    "{} long path with long headers expected 404, got {}",
                    method,
                    res.status
                );
            }
            Ok(())
        }
    );

    scenario!(ctx, oracle, "dynamically created 64mb file is properly loaded", async {
        let blob = random_fixture("Random64M.bin", 64 * 1024 * 1024)?;
        let res = oracle.perform(&RequestSpec::new(["GET /Random64M.bin HTTP/1.1"])).await;
        let _ = fs::remove_file(format!("{}/Random64M.bin", FIXTURE_DIR));

        let res = res?;
        check!(res.status == 200, "expected 200, got {}", res.status);
        check!(res.body == blob, "body differs from the 64MiB source file");
        Ok(())
    });

    scenario!(ctx, oracle, "server does not crash if remote closes socket", async {
        let _blob = random_fixture("Random8M.bin", 8 * 1024 * 1024)?;

        // Half an exchange: request sent, then tear the socket down before
        // the server can answer.
        let aborted = async {
            let session = oracle.session();
            session.connect().await?;
            session.send(b"GET /Random8M.bin HTTP/1.1\r\n\r\n").await?;
            session.shutdown()
        }
        .await;

        let res = oracle.perform(&RequestSpec::new(["GET /a HTTP/1.1"])).await;
        let _ = fs::remove_file(format!("{}/Random8M.bin", FIXTURE_DIR));

        aborted?;
        check!(res?.status == 200, "server no longer answers after an aborted exchange");
        Ok(())
    });

    println!();
    println!("{}", ctx.summary());

    process::exit(if ctx.failed() > 0 { 1 } else { 0 });
}

fn load_fixture(name: &str) -> Vec<u8> {
    let path = format!("{}/{}", FIXTURE_DIR, name);
    match fs::read(&path) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("cannot read fixture {}: {}", path, e);
            process::exit(2);
        }
    }
}

fn random_fixture(name: &str, size: usize) -> Result<Vec<u8>, Error> {
    let mut blob = vec![0_u8; size];
    rand::thread_rng().fill_bytes(&mut blob);
    fs::write(format!("{}/{}", FIXTURE_DIR, name), &blob)?;
    Ok(blob)
}
