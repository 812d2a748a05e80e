use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::time::timeout;

use chat_relay::{start_listener, RunningServer, ServerConfig, MAX_LINE_LEN};

const WAIT: Duration = Duration::from_secs(5);

struct TestClient {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

impl TestClient {
    async fn connect(server: &RunningServer) -> Self {
        let stream = TcpStream::connect(server.local_addr()).await.unwrap();
        let (read_half, writer) = stream.into_split();
        Self {
            lines: BufReader::new(read_half).lines(),
            writer,
        }
    }

    async fn send(&mut self, line: &str) {
        self.writer
            .write_all(format!("{}\r\n", line).as_bytes())
            .await
            .unwrap();
    }

    /// Next line from the server, `None` on EOF
    async fn recv(&mut self) -> Option<String> {
        timeout(WAIT, self.lines.next_line())
            .await
            .expect("timed out waiting for server")
            .unwrap_or(None)
    }

    async fn expect(&mut self, expected: &str) {
        assert_eq!(self.recv().await.as_deref(), Some(expected));
    }

    /// Round-trip a PING; proves nothing else was queued before it
    async fn expect_nothing_pending(&mut self) {
        self.send("\\PING").await;
        self.expect("PONG").await;
    }
}

fn start(max_clients: usize) -> RunningServer {
    start_with(ServerConfig {
        max_clients,
        ..local_config()
    })
}

fn local_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        ..ServerConfig::default()
    }
}

fn start_with(config: ServerConfig) -> RunningServer {
    start_listener(config).unwrap()
}

/// Connect `count` clients in order, consuming all join announcements
async fn connect_all(server: &RunningServer, count: usize) -> Vec<TestClient> {
    let mut clients: Vec<TestClient> = Vec::new();
    for n in 1..=count {
        let mut client = TestClient::connect(server).await;
        let joined = format!("{} joined", n);
        client.expect(&joined).await;
        for other in clients.iter_mut() {
            other.expect(&joined).await;
        }
        clients.push(client);
    }
    clients
}

#[tokio::test]
async fn chat_reaches_others_but_not_sender() {
    let server = start(4);
    let mut clients = connect_all(&server, 3).await;

    clients[0].send("hello   world").await;
    clients[1].expect("1: hello   world").await;
    clients[2].expect("1: hello   world").await;
    clients[0].expect_nothing_pending().await;

    server.abort();
}

#[tokio::test]
async fn rename_changes_chat_prefix() {
    let server = start(4);
    let mut clients = connect_all(&server, 2).await;

    clients[0].send("\\NAME alice").await;
    clients[0].expect("1 is now known as alice").await;
    clients[1].expect("1 is now known as alice").await;

    clients[0].send("hi bob").await;
    clients[1].expect("alice: hi bob").await;

    clients[0].send("\\NAME bob").await;
    clients[0].send("\\NAME carol").await;
    clients[0].expect("alice is now known as bob").await;
    clients[0].expect("bob is now known as carol").await;

    clients[0].send("\\ACTIVE").await;
    clients[0].expect("active clients: 2").await;
    clients[0].expect("#1 carol").await;
    clients[0].expect("#2 2").await;

    server.abort();
}

#[tokio::test]
async fn private_message_only_reaches_target() {
    let server = start(4);
    let mut clients = connect_all(&server, 3).await;

    clients[0].send("\\PRIVATE 2 just   between us").await;
    clients[1].expect("[PM][1] just between us").await;
    clients[2].expect_nothing_pending().await;
    clients[0].expect_nothing_pending().await;

    clients[0].send("\\PRIVATE 77 hello?").await;
    clients[0].expect("no client with id 77").await;
    clients[1].expect_nothing_pending().await;
    clients[2].expect_nothing_pending().await;

    clients[0].send("\\PRIVATE").await;
    clients[0].expect("reference required").await;
    clients[0].send("\\PRIVATE 2").await;
    clients[0].expect("message required").await;

    server.abort();
}

#[tokio::test]
async fn active_with_only_self() {
    let server = start(4);
    let mut clients = connect_all(&server, 1).await;

    clients[0].send("\\ACTIVE").await;
    clients[0].expect("active clients: 1").await;
    clients[0].expect("#1 1").await;

    server.abort();
}

#[tokio::test]
async fn quit_removes_client_from_active() {
    let server = start(4);
    let mut clients = connect_all(&server, 2).await;
    let mut second = clients.pop().unwrap();
    let mut first = clients.pop().unwrap();

    second.send("\\QUIT").await;
    assert_eq!(second.recv().await, None);

    first.expect("2 left").await;
    first.send("\\ACTIVE").await;
    first.expect("active clients: 1").await;
    first.expect("#1 1").await;

    server.abort();
}

#[tokio::test]
async fn disconnect_removes_client() {
    let server = start(4);
    let mut clients = connect_all(&server, 2).await;
    let second = clients.pop().unwrap();
    let mut first = clients.pop().unwrap();

    drop(second);
    first.expect("2 left").await;
    assert_eq!(server.registry().len().await, 1);

    server.abort();
}

#[tokio::test]
async fn connection_beyond_capacity_is_closed() {
    let server = start(1);
    let mut clients = connect_all(&server, 1).await;

    let mut extra = TestClient::connect(&server).await;
    extra.expect("server is full").await;
    assert_eq!(extra.recv().await, None);

    clients[0].expect_nothing_pending().await;
    assert_eq!(server.registry().len().await, 1);

    // the freed slot goes to a newcomer with a fresh id
    clients[0].send("\\QUIT").await;
    assert_eq!(clients[0].recv().await, None);

    let mut late = TestClient::connect(&server).await;
    late.expect("3 joined").await;

    server.abort();
}

#[tokio::test]
async fn protocol_errors_keep_session_alive() {
    let server = start(2);
    let mut clients = connect_all(&server, 1).await;

    clients[0].send("").await;
    clients[0].send("\\NAME").await;
    clients[0].expect("name cannot be empty").await;
    clients[0].send("\\TELEPORT home").await;
    clients[0].expect("unknown command: TELEPORT").await;
    clients[0].send("\\help").await;
    clients[0].expect("commands:").await;

    server.abort();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_connects_never_exceed_capacity() {
    let server = start(5);

    let mut tasks = Vec::new();
    for _ in 0..20 {
        let addr = server.local_addr();
        tasks.push(tokio::spawn(async move {
            let stream = TcpStream::connect(addr).await.unwrap();
            let mut lines = BufReader::new(stream).lines();
            let first = timeout(WAIT, lines.next_line()).await.unwrap().unwrap();
            (first, lines)
        }));
    }

    let mut admitted = 0;
    let mut rejected = 0;
    let mut keep = Vec::new();
    for task in tasks {
        let (first, lines) = task.await.unwrap();
        match first.as_deref() {
            Some("server is full") => rejected += 1,
            Some(line) if line.ends_with(" joined") => admitted += 1,
            other => panic!("unexpected first line {:?}", other),
        }
        keep.push(lines);
    }

    assert_eq!(admitted, 5);
    assert_eq!(rejected, 15);
    assert_eq!(server.registry().len().await, 5);

    let snapshot = server.registry().enumerate().await;
    let mut ids: Vec<_> = snapshot.iter().map(|c| c.id).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 5);

    server.abort();
}

#[tokio::test]
async fn overlong_line_disconnects_sender() {
    let server = start(4);
    let mut clients = connect_all(&server, 2).await;
    let mut flooder = clients.pop().unwrap();
    let mut first = clients.pop().unwrap();

    flooder.send(&"z".repeat(MAX_LINE_LEN + 100)).await;

    first.expect("2 left").await;
    assert_eq!(flooder.recv().await, None);
    assert_eq!(server.registry().len().await, 1);
    assert!(server
        .registry()
        .enumerate()
        .await
        .iter()
        .all(|c| c.id.0 == 1));

    server.abort();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn simultaneous_broadcasts_arrive_whole() {
    const PER_SENDER: usize = 200;
    let server = start_with(ServerConfig {
        outbound_buffer: 4 * PER_SENDER,
        ..local_config()
    });
    let mut clients = connect_all(&server, 3).await;
    let mut listener = clients.pop().unwrap();

    let payload = "p".repeat(300);
    let mut senders = Vec::new();
    for (n, mut client) in clients.into_iter().enumerate() {
        let payload = payload.clone();
        senders.push(tokio::spawn(async move {
            let tag = (b'a' + n as u8) as char;
            for i in 0..PER_SENDER {
                client.send(&format!("{}{}-{}", tag, i, payload)).await;
            }
            client
        }));
    }

    let mut next_expected = [0usize; 2];
    for _ in 0..2 * PER_SENDER {
        let line = listener.recv().await.expect("stream ended early");
        let (name, body) = line.split_once(": ").expect("missing name prefix");
        let sender: usize = name.parse().expect("name is a client id");
        let tag = (b'a' + (sender - 1) as u8) as char;

        let expected = format!("{}{}-{}", tag, next_expected[sender - 1], payload);
        assert_eq!(body, expected);
        next_expected[sender - 1] += 1;
    }
    assert_eq!(next_expected, [PER_SENDER, PER_SENDER]);

    // keep the senders connected until every line has been checked
    for sender in senders {
        sender.await.unwrap();
    }
    server.abort();
}
