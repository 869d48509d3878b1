//! Integration tests for the SMTP client.
//!
//! Dialogs run through the async driver against scripted mock streams, so
//! the exact bytes and their order are checked without a real server.

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_test::io::Builder;

use postwire_smtp::{
    ClientConfig, Command, DeliveryStatus, Engine, Envelope, Event, MessageOutcome, Session,
    SessionConfig, Stage, open, spawn,
};

/// Collects events until the channel closes or `End` arrives.
async fn collect(events: &mut UnboundedReceiver<Event>) -> Vec<Event> {
    let mut seen = Vec::new();
    while let Some(event) =
        tokio::time::timeout(Duration::from_secs(5), events.recv()).await.unwrap()
    {
        let end = event.is_end();
        seen.push(event);
        if end {
            break;
        }
    }
    seen
}

fn messages(events: &[Event]) -> Vec<&MessageOutcome> {
    events.iter().filter_map(Event::as_message).collect()
}

#[tokio::test]
async fn test_banner_only() {
    let mock = Builder::new()
        .read(b"220 Welcome\r\n")
        .write(b"EHLO localhost\r\n")
        .read(b"250 ok\r\n")
        .write(b"QUIT\r\n")
        .read(b"221 bye\r\n")
        .build();

    let (session, mut events) = spawn(Session::new(SessionConfig::default()), mock);
    session.finish().unwrap();

    let events = collect(&mut events).await;
    assert!(matches!(events.first(), Some(Event::Connect)));
    assert!(matches!(
        &events[1],
        Event::Reply { command: Command::Banner, reply } if reply.message() == "Welcome"
    ));
    assert!(events.last().unwrap().is_end());
    assert!(messages(&events).is_empty());
}

#[tokio::test]
async fn test_session_without_pipelining() {
    let mock = Builder::new()
        .read(b"220 Welcome\r\n")
        .write(b"EHLO localhost\r\n")
        .read(b"250-Extensions\r\n250-and\r\n250 stuff\r\n")
        .write(b"MAIL FROM:<sender@example.com>\r\n")
        .read(b"250 ok\r\n")
        .write(b"RCPT TO:<rcpt@example.com>\r\n")
        .read(b"250 ok\r\n")
        .write(b"DATA\r\n")
        .read(b"354 go ahead\r\n")
        .write(b"body\r\n\r\n.\r\n")
        .read(b"250 queued\r\n")
        .write(b"QUIT\r\n")
        .read(b"221 bye\r\n")
        .build();

    let (session, mut events) = spawn(Session::new(SessionConfig::default()), mock);
    session
        .write_head(Envelope::new("sender@example.com", ["rcpt@example.com"]))
        .unwrap();
    session.end("body\r\n\r\n").unwrap();
    session.finish().unwrap();

    let events = collect(&mut events).await;
    let ehlo = events
        .iter()
        .find_map(|e| match e {
            Event::Reply { reply, command } if command.is("EHLO") => Some(reply),
            _ => None,
        })
        .unwrap();
    assert_eq!(ehlo.message(), "Extensions\r\nand\r\nstuff");

    let outcomes = messages(&events);
    assert_eq!(outcomes.len(), 1);
    assert!(outcomes[0].is_accepted());
    assert!(events.last().unwrap().is_end());
}

#[tokio::test]
async fn test_session_with_pipelining() {
    let mock = Builder::new()
        .read(b"220 hi\r\n")
        .write(b"EHLO client.example.com\r\n")
        .read(b"250-hi\r\n250-PIPELINING\r\n250 8BITMIME\r\n")
        .write(b"MAIL FROM:<a@x>\r\nRCPT TO:<b@x>\r\nRCPT TO:<c@x>\r\nDATA\r\n")
        .read(b"250 ok\r\n250 ok\r\n550 no such user\r\n354 go\r\n")
        .write(b"..hidden\r\nline\r\n.\r\nQUIT\r\n")
        .read(b"250 queued\r\n221 bye\r\n")
        .build();

    let (session, mut events) = spawn(Session::new(SessionConfig::new("client.example.com")), mock);
    session.write_head(Envelope::new("a@x", ["b@x", "c@x"])).unwrap();
    session.write(".hid").unwrap();
    session.write("den\nli").unwrap();
    session.end("ne\n").unwrap();
    session.finish().unwrap();

    let events = collect(&mut events).await;
    let outcomes = messages(&events);
    assert_eq!(outcomes.len(), 1);
    assert!(outcomes[0].is_accepted());
    assert_eq!(outcomes[0].accepted().collect::<Vec<_>>(), vec!["b@x"]);
    assert_eq!(outcomes[0].rejected().next().unwrap().address, "c@x");
}

#[tokio::test]
async fn test_helo_fallback_rejected_twice() {
    let mock = Builder::new()
        .read(b"220 hi\r\n")
        .write(b"EHLO localhost\r\n")
        .read(b"500 unknown command\r\n")
        .write(b"HELO localhost\r\n")
        .read(b"501 go away\r\n")
        .write(b"QUIT\r\n")
        .read(b"221 bye\r\n")
        .build();

    let (session, mut events) = spawn(Session::new(SessionConfig::default()), mock);
    session.write_head(Envelope::new("a@x", ["b@x"])).unwrap();

    let events = collect(&mut events).await;
    assert!(events.iter().any(|e| matches!(e, Event::Error(err) if err.is_permanent())));
    let outcomes = messages(&events);
    assert_eq!(outcomes.len(), 1);
    assert!(matches!(
        outcomes[0].status,
        DeliveryStatus::Rejected { stage: Stage::Greeting, .. }
    ));
    assert!(events.last().unwrap().is_end());
}

#[tokio::test]
async fn test_envelope_without_recipients() {
    let mock = Builder::new()
        .read(b"220 hi\r\n")
        .write(b"EHLO localhost\r\n")
        .read(b"250 hi\r\n")
        .write(b"QUIT\r\n")
        .read(b"221 bye\r\n")
        .build();

    let (session, mut events) = spawn(Session::new(SessionConfig::default()), mock);
    session.write_head(Envelope::new("a@x", Vec::<String>::new())).unwrap();
    session.end("nobody reads this").unwrap();
    session.finish().unwrap();

    let events = collect(&mut events).await;
    let outcomes = messages(&events);
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].status, DeliveryStatus::NoValidRecipients);
    assert!(events.last().unwrap().is_end());
}

#[tokio::test]
async fn test_no_valid_recipients_sends_empty_body() {
    let mock = Builder::new()
        .read(b"220 hi\r\n")
        .write(b"EHLO localhost\r\n")
        .read(b"250-hi\r\n250 PIPELINING\r\n")
        .write(b"MAIL FROM:<a@x>\r\nRCPT TO:<b@x>\r\nDATA\r\n")
        .read(b"250 ok\r\n550 no\r\n354 go\r\n")
        .write(b".\r\n")
        .read(b"554 no valid recipients\r\n")
        .write(b"QUIT\r\n")
        .read(b"221 bye\r\n")
        .build();

    let (session, mut events) = spawn(Session::new(SessionConfig::default()), mock);
    session.write_head(Envelope::new("a@x", ["b@x"])).unwrap();
    session.write("never").unwrap();
    session.end("sent").unwrap();
    session.finish().unwrap();

    let events = collect(&mut events).await;
    let outcomes = messages(&events);
    assert_eq!(outcomes[0].status, DeliveryStatus::NoValidRecipients);
}

#[tokio::test]
async fn test_connection_lost_mid_message() {
    let mock = Builder::new()
        .read(b"220 hi\r\n")
        .write(b"EHLO localhost\r\n")
        .read(b"250 hi\r\n")
        .write(b"MAIL FROM:<a@x>\r\n")
        .build();

    let (session, mut events) = spawn(Session::new(SessionConfig::default()), mock);
    session.write_head(Envelope::new("a@x", ["b@x"])).unwrap();

    let events = collect(&mut events).await;
    let outcomes = messages(&events);
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].status, DeliveryStatus::ConnectionLost);
    assert!(events.last().unwrap().is_end());
}

#[tokio::test]
async fn test_raw_engine() {
    let mock = Builder::new()
        .read(b"220 hi\r\n")
        .write(b"EHLO x\r\n")
        .read(b"250 ok\r\n")
        .write(b"QUIT\r\n")
        .read(b"221 bye\r\n")
        .build();

    let (engine, mut events) = spawn(Engine::new(), mock);
    engine.send_command(Command::ehlo("x")).unwrap();
    engine.send_command(Command::Quit).unwrap();

    let events = collect(&mut events).await;
    let replied: Vec<&str> = events
        .iter()
        .filter_map(|e| match e {
            Event::Reply { command, .. } => Some(command.name()),
            _ => None,
        })
        .collect();
    assert_eq!(replied, vec!["[BANNER]", "EHLO", "QUIT"]);
    assert!(events.last().unwrap().is_end());
}

#[tokio::test]
async fn test_destroy_is_silent_and_idempotent() {
    let (client, server) = tokio::io::duplex(1024);
    let (session, mut events) = spawn(Session::new(SessionConfig::default()), client);
    assert!(matches!(events.recv().await, Some(Event::Connect)));

    session.destroy();
    session.destroy();
    assert!(events.recv().await.is_none());

    let mut server = BufReader::new(server);
    let mut line = String::new();
    assert_eq!(server.read_line(&mut line).await.unwrap(), 0);
    assert!(session.write_head(Envelope::new("a@x", ["b@x"])).is_err());
}

#[tokio::test]
async fn test_open_over_tcp() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let server = tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        let (read, mut write) = socket.into_split();
        let mut lines = BufReader::new(read).lines();
        write.write_all(b"220 test server\r\n").await.unwrap();

        let mut received = Vec::new();
        while let Some(line) = lines.next_line().await.unwrap() {
            received.push(line.clone());
            let reply: &[u8] = match line.as_str() {
                l if l.starts_with("EHLO") => b"250-test server\r\n250 PIPELINING\r\n",
                "DATA" => b"250 ok\r\n250 ok\r\n354 go\r\n",
                "." => b"250 queued\r\n",
                "QUIT" => {
                    write.write_all(b"221 bye\r\n").await.unwrap();
                    break;
                }
                _ => continue,
            };
            write.write_all(reply).await.unwrap();
        }
        received
    });

    let config = ClientConfig::builder("127.0.0.1")
        .port(port)
        .identifier("tester")
        .build();
    let (session, mut events) = open(&config).await.unwrap();
    session.write_head(Envelope::new("a@x", ["b@x"])).unwrap();
    session.end("Subject: hi\r\n\r\nhello\r\n").unwrap();
    session.finish().unwrap();

    let events = collect(&mut events).await;
    assert!(messages(&events)[0].is_accepted());
    assert!(events.last().unwrap().is_end());

    let received = server.await.unwrap();
    assert_eq!(
        received,
        vec![
            "EHLO tester",
            "MAIL FROM:<a@x>",
            "RCPT TO:<b@x>",
            "DATA",
            "Subject: hi",
            "",
            "hello",
            ".",
            "QUIT",
        ]
    );
}
