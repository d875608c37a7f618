//! End-to-end sessions against a fake race server on the loopback interface.

use std::net::SocketAddr;
use std::time::Duration;

use scr_client::prelude::*;
use tokio::net::UdpSocket;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(5);

fn telemetry(rpm: f64) -> String {
    let track = vec!["12.5"; 19].join(" ");
    format!(
        "(angle 0.02)(track {track})(speedX 35.2)(speedY 0.1)(speedZ 0)\
         (trackPos -0.1)(rpm {rpm})(gear 2)(fuel 90)(racePos 1)"
    )
}

async fn recv_text(socket: &UdpSocket) -> (String, SocketAddr) {
    let mut buf = [0u8; 1024];
    let (len, from) = timeout(WAIT, socket.recv_from(&mut buf))
        .await
        .expect("client went quiet")
        .unwrap();
    (String::from_utf8_lossy(&buf[..len]).into_owned(), from)
}

/// Accept an init, answer it, then serve `ticks` telemetry messages and
/// collect the replies. Returns the replies and the client address.
async fn serve_episode(server: &UdpSocket, ticks: usize) -> (Vec<String>, SocketAddr) {
    let (init, client) = recv_text(server).await;
    assert!(init.starts_with("SCR(init -90 -75 "), "unexpected init: {init}");
    server.send_to(b"***identified***", client).await.unwrap();

    let mut replies = Vec::new();
    for tick in 0..ticks {
        let message = telemetry(4000.0 + tick as f64 * 100.0);
        server.send_to(message.as_bytes(), client).await.unwrap();
        let (reply, from) = recv_text(server).await;
        assert_eq!(from, client);
        replies.push(reply);
    }
    (replies, client)
}

fn config(port: u16) -> SessionConfig {
    SessionConfig::builder()
        .host("127.0.0.1")
        .port(port)
        .identify_timeout(Duration::from_millis(500))
        .drive_timeout(Duration::from_millis(50))
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_drive_until_shutdown() {
    let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let port = server.local_addr().unwrap().port();

    let fake = tokio::spawn(async move {
        let (replies, client) = serve_episode(&server, 3).await;
        server.send_to(b"***shutdown***", client).await.unwrap();
        replies
    });

    let mut session = Session::<UdpTransport>::connect(config(port)).await.unwrap();
    let mut policy = HeuristicPolicy::default();
    let reason = timeout(WAIT, session.run(&mut policy, None))
        .await
        .unwrap()
        .unwrap();
    let replies = fake.await.unwrap();

    assert_eq!(reason, TerminationReason::ServerShutdown);
    assert_eq!(session.steps(), 3);
    assert_eq!(session.stats().commands_sent, 3);
    assert_eq!(replies.len(), 3);
    for reply in &replies {
        assert!(reply.starts_with("(steer "), "unexpected reply: {reply}");
        assert!(reply.contains("(gear 2)"), "unexpected reply: {reply}");
    }
    assert!(replies[0].contains("(accel 0.100)"));
    assert!(replies[2].contains("(accel 0.300)"));
}

#[tokio::test]
async fn test_restart_runs_second_episode() {
    let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let port = server.local_addr().unwrap().port();

    let fake = tokio::spawn(async move {
        let (first, client) = serve_episode(&server, 2).await;
        server.send_to(b"***restart***", client).await.unwrap();
        let (second, client) = serve_episode(&server, 2).await;
        server.send_to(b"***shutdown***", client).await.unwrap();
        (first, second)
    });

    let mut runner = EpisodeRunner::new(config(port), HeuristicPolicy::default).max_episodes(5);
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("telemetry.csv");
    let mut sink = CsvTelemetrySink::create(&log)
        .unwrap()
        .with_min_interval(Duration::ZERO);

    let summary = timeout(WAIT, runner.run(Some(&mut sink)))
        .await
        .unwrap()
        .unwrap();
    let (first, second) = fake.await.unwrap();
    drop(sink);

    assert_eq!(summary.episodes, 2);
    assert_eq!(summary.total_steps, 4);
    assert_eq!(summary.last_reason, Some(TerminationReason::ServerShutdown));
    // fresh policy per episode: the throttle ramp starts over
    assert_eq!(first[0], second[0]);

    let rows = std::fs::read_to_string(&log).unwrap();
    assert_eq!(rows.lines().count(), 1 + 4);
}

#[tokio::test]
async fn test_silent_server_exhausts_retries() {
    let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let port = server.local_addr().unwrap().port();
    let config = SessionConfig::builder()
        .host("127.0.0.1")
        .port(port)
        .identify_timeout(Duration::from_millis(20))
        .max_identify_retries(2)
        .build()
        .unwrap();

    let mut session = Session::<UdpTransport>::connect(config).await.unwrap();
    let mut policy = HeuristicPolicy::default();
    let err = timeout(WAIT, session.run(&mut policy, None))
        .await
        .unwrap()
        .unwrap_err();

    assert!(matches!(err, SessionError::ConnectionFailed { attempts: 3 }));
    assert_eq!(
        session.phase(),
        SessionPhase::Terminated(TerminationReason::ConnectionFailed)
    );

    let mut inits = 0;
    let mut buf = [0u8; 1024];
    while let Ok(Ok((len, _))) = timeout(Duration::from_millis(50), server.recv_from(&mut buf)).await {
        assert!(buf[..len].starts_with(b"SCR(init "));
        inits += 1;
    }
    assert_eq!(inits, 3);
}
