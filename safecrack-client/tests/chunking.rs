//! Chunk boundaries must never change what the caller observes.

use bytes::Bytes;
use futures::{StreamExt, stream};
use proptest::prelude::*;
use safecrack_client::{
    Completion, CrackError, Progress, StreamEvent, StreamOptions, drive, event_stream,
};
use tokio_util::sync::CancellationToken;

const BODY: &str = concat!(
    r#"{"type":"progress","attempts":10,"current_attempt":"1000000000","correct_digits":1,"total_digits":10}"#,
    "\r\n",
    "\n",
    r#"{"type":"progress","attempts":20,"current_attempt":"12é0000000","correct_digits":2,"total_digits":10}"#,
    "\n",
    "garbage ✓\n",
    r#"{"type":"complete","attempts":55,"time_taken":12.34}"#,
    "\n",
);

fn split_at_offsets(body: &[u8], offsets: &[usize]) -> Vec<Bytes> {
    let mut cuts: Vec<usize> = offsets.iter().map(|o| o % (body.len() + 1)).collect();
    cuts.sort_unstable();
    cuts.dedup();

    let mut parts = Vec::with_capacity(cuts.len() + 1);
    let mut start = 0;
    for cut in cuts {
        parts.push(Bytes::copy_from_slice(&body[start..cut]));
        start = cut;
    }
    parts.push(Bytes::copy_from_slice(&body[start..]));
    parts
}

fn body_stream(
    parts: Vec<Bytes>,
) -> impl futures::Stream<Item = Result<Bytes, std::io::Error>> + Send + 'static {
    stream::iter(parts.into_iter().map(Ok))
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("runtime")
}

async fn collect(parts: Vec<Bytes>) -> (Vec<Progress>, Result<Completion, CrackError>) {
    let mut seen = Vec::new();
    let result = drive(
        body_stream(parts),
        |p: Progress| seen.push(p),
        StreamOptions::default(),
        &CancellationToken::new(),
    )
    .await;
    (seen, result)
}

fn assert_expected(seen: &[Progress], result: Result<Completion, CrackError>) {
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0].attempts, 10);
    assert_eq!(seen[1].attempts, 20);
    assert_eq!(seen[1].current_attempt, "12é0000000");
    let completion = result.expect("completion");
    assert_eq!(completion.attempts, 55);
    assert_eq!(completion.time_taken, 12.34);
}

#[test]
fn every_two_way_split_yields_same_events() {
    let rt = runtime();
    let body = BODY.as_bytes();
    for cut in 0..=body.len() {
        let parts = vec![
            Bytes::copy_from_slice(&body[..cut]),
            Bytes::copy_from_slice(&body[cut..]),
        ];
        let (seen, result) = rt.block_on(collect(parts));
        assert_expected(&seen, result);
    }
}

#[test]
fn byte_at_a_time_yields_same_events() {
    let rt = runtime();
    let parts = BODY.bytes().map(|b| Bytes::copy_from_slice(&[b])).collect();
    let (seen, result) = rt.block_on(collect(parts));
    assert_expected(&seen, result);
}

proptest! {
    #[test]
    fn arbitrary_splits_yield_same_events(offsets in proptest::collection::vec(any::<usize>(), 0..24)) {
        let rt = runtime();
        let parts = split_at_offsets(BODY.as_bytes(), &offsets);
        let (seen, result) = rt.block_on(collect(parts));
        assert_expected(&seen, result);
    }

    #[test]
    fn event_stream_matches_drive(offsets in proptest::collection::vec(any::<usize>(), 0..24)) {
        let rt = runtime();
        let parts = split_at_offsets(BODY.as_bytes(), &offsets);
        let events: Vec<_> = rt.block_on(
            event_stream(body_stream(parts), StreamOptions::default()).receiver.collect(),
        );

        let attempts: Vec<u64> = events
            .iter()
            .map(|e| match e {
                Ok(StreamEvent::Progress(p)) => p.attempts,
                Ok(StreamEvent::Complete(c)) => c.attempts,
                Err(err) => panic!("unexpected error: {err}"),
            })
            .collect();
        prop_assert_eq!(attempts, vec![10, 20, 55]);
    }
}
