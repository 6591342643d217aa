use std::time::Duration;

use client::{ClientConfig, Session, SessionEvent};
use futures::{SinkExt, StreamExt};
use shared::{Coordinate, Endpoint, QueryError, SubmitOutcome};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::{WebSocketStream, accept_async, tungstenite::Message};

const WAIT: Duration = Duration::from_secs(5);

struct Harness {
    listener: TcpListener,
    commands: mpsc::Sender<String>,
    updates: mpsc::UnboundedReceiver<SessionEvent>,
}

async fn start() -> Harness {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let config = ClientConfig::new(Endpoint::new("127.0.0.1", port))
        .with_reconnect_delay(Duration::from_millis(50));

    let (commands, command_rx) = mpsc::channel(16);
    let (update_tx, updates) = mpsc::unbounded_channel();
    tokio::spawn(Session::new(config, update_tx).run(command_rx));

    Harness {
        listener,
        commands,
        updates,
    }
}

impl Harness {
    /// Accepts the next connection. Returns the socket and the outcome of
    /// the resubmission the session makes as soon as it is connected.
    async fn accept(&mut self) -> (WebSocketStream<TcpStream>, SubmitOutcome) {
        let (stream, _) = timeout(WAIT, self.listener.accept())
            .await
            .expect("client connects")
            .unwrap();
        let socket = accept_async(stream).await.unwrap();
        self.wait_for(|event| *event == SessionEvent::Connected).await;
        match self.next_event().await {
            SessionEvent::Submitted(outcome) => (socket, outcome),
            other => panic!("expected a resubmission, got {other:?}"),
        }
    }

    async fn command(&self, line: &str) {
        self.commands.send(line.to_string()).await.unwrap();
    }

    async fn next_event(&mut self) -> SessionEvent {
        timeout(WAIT, self.updates.recv())
            .await
            .expect("session event in time")
            .expect("session still running")
    }

    async fn wait_for(&mut self, matches: impl Fn(&SessionEvent) -> bool) -> SessionEvent {
        loop {
            let event = self.next_event().await;
            if matches(&event) {
                return event;
            }
        }
    }

    async fn submitted(&mut self, line: &str) -> SubmitOutcome {
        self.command(line).await;
        match self
            .wait_for(|event| matches!(event, SessionEvent::Submitted(_)))
            .await
        {
            SessionEvent::Submitted(outcome) => outcome,
            _ => unreachable!(),
        }
    }
}

async fn next_query(socket: &mut WebSocketStream<TcpStream>) -> String {
    loop {
        match timeout(WAIT, socket.next()).await.expect("query in time") {
            Some(Ok(Message::Text(text))) => return text,
            Some(Ok(_)) => continue,
            other => panic!("connection ended: {other:?}"),
        }
    }
}

async fn reply(socket: &mut WebSocketStream<TcpStream>, text: &str) {
    socket.send(Message::Text(text.to_string())).await.unwrap();
}

#[tokio::test]
async fn sends_query_and_renders_route() {
    let mut harness = start().await;
    let (mut socket, resubmitted) = harness.accept().await;
    assert_eq!(
        resubmitted,
        SubmitOutcome::Rejected(QueryError::TooFewPoints(0))
    );

    assert_eq!(
        harness.submitted("set 0 38.004697 23.800735").await,
        SubmitOutcome::Rejected(QueryError::TooFewPoints(1))
    );
    assert_eq!(
        harness.submitted("set 1 38.01 23.81").await,
        SubmitOutcome::Sent
    );
    assert_eq!(next_query(&mut socket).await, "38.004697 23.800735 38.01 23.81 ");

    reply(&mut socket, "38.004697 23.800735 38.005 23.805 38.01 23.81").await;
    let route = harness
        .wait_for(|event| matches!(event, SessionEvent::Route(_)))
        .await;
    assert_eq!(
        route,
        SessionEvent::Route(vec![
            Coordinate::new(38.004697, 23.800735),
            Coordinate::new(38.005, 23.805),
            Coordinate::new(38.01, 23.81),
        ])
    );

    assert_eq!(
        harness.submitted("set 1 38.01 23.81").await,
        SubmitOutcome::Unchanged
    );
}

#[tokio::test]
async fn coalesces_edits_made_while_a_query_is_pending() {
    let mut harness = start().await;
    let (mut socket, _) = harness.accept().await;

    harness.submitted("click 1 1").await;
    assert_eq!(harness.submitted("click 2 2").await, SubmitOutcome::Sent);
    assert_eq!(next_query(&mut socket).await, "1 1 2 2 ");

    assert_eq!(harness.submitted("set 1 3 3").await, SubmitOutcome::Queued);
    assert_eq!(harness.submitted("set 1 4 4").await, SubmitOutcome::Queued);

    reply(&mut socket, "1 1 2 2").await;
    assert_eq!(next_query(&mut socket).await, "1 1 4 4 ");

    reply(&mut socket, "1 1 4 4").await;
    let route = harness
        .wait_for(|event| *event == SessionEvent::Route(vec![
            Coordinate::new(1.0, 1.0),
            Coordinate::new(4.0, 4.0),
        ]))
        .await;
    assert!(matches!(route, SessionEvent::Route(_)));
}

#[tokio::test]
async fn server_error_does_not_replace_route() {
    let mut harness = start().await;
    let (mut socket, _) = harness.accept().await;

    harness.submitted("click 1 1").await;
    harness.submitted("click 2 2").await;
    next_query(&mut socket).await;
    reply(&mut socket, "Error: bad input").await;

    let event = harness
        .wait_for(|event| {
            matches!(event, SessionEvent::ServerError(_) | SessionEvent::Route(_))
        })
        .await;
    assert_eq!(event, SessionEvent::ServerError("Error: bad input".into()));

    // The error acknowledged the query, so a new edit goes out at once.
    assert_eq!(harness.submitted("set 1 3 3").await, SubmitOutcome::Sent);
    assert_eq!(next_query(&mut socket).await, "1 1 3 3 ");
}

#[tokio::test]
async fn reconnects_and_resends_current_waypoints() {
    let mut harness = start().await;
    let (mut socket, _) = harness.accept().await;

    harness.submitted("click 1 1").await;
    harness.submitted("click 2 2").await;
    next_query(&mut socket).await;
    assert_eq!(harness.submitted("set 1 3 3").await, SubmitOutcome::Queued);

    drop(socket);
    harness
        .wait_for(|event| *event == SessionEvent::Disconnected)
        .await;

    let (mut socket, resubmitted) = harness.accept().await;
    assert_eq!(resubmitted, SubmitOutcome::Sent);
    assert_eq!(next_query(&mut socket).await, "1 1 3 3 ");
}

#[tokio::test]
async fn bad_commands_are_reported_and_ignored() {
    let mut harness = start().await;
    let (_socket, _) = harness.accept().await;

    harness.command("teleport 1 2").await;
    let event = harness
        .wait_for(|event| matches!(event, SessionEvent::CommandFailed(_)))
        .await;
    assert_eq!(
        event,
        SessionEvent::CommandFailed("unknown command `teleport`".into())
    );

    harness.command("show").await;
    let event = harness
        .wait_for(|event| matches!(event, SessionEvent::Slots(_)))
        .await;
    assert_eq!(event, SessionEvent::Slots("0 origin -\n1 destination -".into()));
}
