use futures::{stream, StreamExt};
use std::time::Duration;

use crate::types::StreamPart;
use crate::BoxStream;

/// Emit `chunks` in order as a live-looking stream: wait `initial_delay`
/// before the first part and `chunk_delay` before each later one.
pub fn simulate_stream(
    chunks: Vec<StreamPart>,
    initial_delay: Duration,
    chunk_delay: Duration,
) -> BoxStream<'static, StreamPart> {
    let parts = stream::unfold((chunks.into_iter(), true), move |(mut rest, first)| async move {
        let part = rest.next()?;
        let delay = if first { initial_delay } else { chunk_delay };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        Some((Ok(part), (rest, false)))
    });
    Box::pin(parts.fuse())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    fn chunks() -> Vec<StreamPart> {
        vec![
            StreamPart::TextStart { id: "0".into() },
            StreamPart::text_delta("0", "a"),
            StreamPart::TextEnd { id: "0".into() },
        ]
    }

    #[tokio::test(start_paused = true)]
    async fn replays_in_order_with_pacing() {
        let start = Instant::now();
        let out: Vec<_> = simulate_stream(chunks(), Duration::ZERO, Duration::from_millis(10))
            .map(|r| r.unwrap())
            .collect()
            .await;
        let elapsed = start.elapsed();

        assert_eq!(out, chunks());
        assert!(elapsed >= Duration::from_millis(20));
        assert!(elapsed < Duration::from_millis(30));
    }

    #[tokio::test(start_paused = true)]
    async fn first_part_waits_for_initial_delay() {
        let start = Instant::now();
        let mut s = simulate_stream(chunks(), Duration::from_millis(50), Duration::ZERO);
        s.next().await.unwrap().unwrap();
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn empty_capture_ends_immediately() {
        let mut s = simulate_stream(Vec::new(), Duration::ZERO, Duration::from_millis(10));
        assert!(s.next().await.is_none());
        assert!(s.next().await.is_none());
    }
}
