//! Property tests for the incremental parsers and the body framer.
//!
//! Where the input is split must never change what comes out.

use proptest::prelude::*;

use postwire_smtp::parser::{CommandParser, ReplyParser};
use postwire_smtp::session::MessageFramer;
use postwire_smtp::{Command, build_from_commands};

const REPLIES: &[u8] = b"220 mx.example.com ESMTP\r\n\
250-mx.example.com\r\n250-PIPELINING\r\n250 SIZE 10240000\r\n\
250 2.1.0 ok\r\n550 5.1.1 no such user\r\n354 go ahead\r\n\
250 queued as 12345\r\n221 bye\r\n";

fn feed_chunks<T>(data: &[u8], cuts: &[usize], mut feed: impl FnMut(&[u8]) -> Vec<T>) -> Vec<T> {
    let mut cuts: Vec<usize> = cuts.iter().map(|c| c % (data.len() + 1)).collect();
    cuts.sort_unstable();
    let mut out = Vec::new();
    let mut start = 0;
    for cut in cuts.into_iter().chain(std::iter::once(data.len())) {
        out.extend(feed(&data[start..cut]));
        start = cut;
    }
    out
}

fn stuff(content: &str) -> String {
    let mut stuffed = content.replace("\r\n.", "\r\n..");
    if stuffed.starts_with('.') {
        stuffed.insert(0, '.');
    }
    stuffed
}

fn address() -> impl Strategy<Value = String> {
    "[a-z]{1,8}@[a-z]{1,8}\\.(com|org)"
}

/// A dot-stuffed body made of CRLF lines, with or without a final CRLF.
fn body() -> impl Strategy<Value = String> {
    (prop::collection::vec("[a-z. ]{0,10}", 0..6), any::<bool>()).prop_map(|(lines, trailing)| {
        let mut body = stuff(&lines.join("\r\n"));
        if trailing && !lines.is_empty() {
            body.push_str("\r\n");
        }
        body
    })
}

/// One or two commands a client could send in sequence.
fn step() -> impl Strategy<Value = Vec<Command>> {
    let identifier = "[a-z]{1,12}(\\.[a-z]{2,6}){0,2}";
    prop_oneof![
        identifier.prop_map(|id| vec![Command::ehlo(id)]),
        identifier.prop_map(|id| vec![Command::helo(id)]),
        Just(vec![Command::StartTls]),
        (address(), prop::option::of(1u64..100_000_000)).prop_map(|(from, size)| vec![match size {
            Some(size) => Command::mail_with_size(from, size),
            None => Command::mail(from),
        }]),
        address().prop_map(|to| vec![Command::rcpt(to)]),
        body().prop_map(|body| vec![Command::Data, Command::send_data(body)]),
        Just(vec![Command::Rset]),
        ("X[A-Z]{3}", prop::option::of("[a-z]{1,5}( [a-z]{1,5}){0,2}"))
            .prop_map(|(name, arg)| vec![Command::generic(name, arg.as_deref())]),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 1024,
        ..ProptestConfig::default()
    })]

    #[test]
    fn replies_survive_any_split(cuts in prop::collection::vec(any::<usize>(), 0..12)) {
        let mut whole = ReplyParser::new();
        let expected = whole.feed(REPLIES);
        prop_assert_eq!(expected.len(), 7);

        let mut parser = ReplyParser::new();
        let replies = feed_chunks(REPLIES, &cuts, |chunk| parser.feed(chunk));
        prop_assert_eq!(replies, expected);
        prop_assert!(parser.remainder().is_empty());
        prop_assert!(!parser.in_reply());
    }

    #[test]
    fn commands_survive_any_split(
        lines in prop::collection::vec("[x.]{0,10}", 0..8),
        cuts in prop::collection::vec(any::<usize>(), 0..12),
    ) {
        let wire = format!(
            "EHLO client\r\nMAIL FROM:<a@x>\r\nRCPT TO:<b@x>\r\nDATA\r\n{}.\r\nQUIT\r\n",
            stuff(&lines.iter().map(|l| format!("{l}\r\n")).collect::<String>())
        );
        let mut whole = CommandParser::new();
        let expected = whole.feed(wire.as_bytes());
        prop_assert_eq!(expected.len(), 6);
        prop_assert!(matches!(expected[4], Command::SendData { .. }), "expected SendData at index 4");
        prop_assert_eq!(&expected[5], &Command::Quit);

        let mut parser = CommandParser::new();
        let commands = feed_chunks(wire.as_bytes(), &cuts, |chunk| parser.feed(chunk));
        prop_assert_eq!(commands, expected);
        prop_assert!(parser.remainder().is_empty());
    }

    #[test]
    fn framing_ignores_fragment_boundaries(
        body in "[a.\r\n]{0,120}",
        cuts in prop::collection::vec(any::<usize>(), 0..8),
    ) {
        let mut whole = MessageFramer::new();
        whole.push(body.as_bytes());
        let expected = whole.finish();

        let mut framer = MessageFramer::new();
        feed_chunks(body.as_bytes(), &cuts, |chunk| {
            framer.push(chunk);
            Vec::<()>::new()
        });
        prop_assert_eq!(framer.finish(), expected.clone());

        let text = String::from_utf8(expected.to_vec()).unwrap();
        for line in text.split("\r\n") {
            prop_assert!(!line.starts_with('.') || line.starts_with(".."), "unstuffed line {:?}", line);
            prop_assert!(!line.contains('\n'));
        }
    }

    #[test]
    fn serialized_dialog_parses_back(steps in prop::collection::vec(step(), 0..12)) {
        let mut sent = vec![Command::Banner];
        sent.extend(steps.into_iter().flatten());
        sent.push(Command::Quit);

        let wire = build_from_commands(&sent);
        let mut parser = CommandParser::new();
        prop_assert_eq!(parser.feed(&wire), sent[1..].to_vec());
        prop_assert!(parser.remainder().is_empty());
        prop_assert!(!parser.in_data());
    }
}
