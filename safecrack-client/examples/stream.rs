//! Stream a crack against a running solver and print each progress report.
//!
//! Needs `SAFECRACK_API_KEY` (and optionally `SAFECRACK_BASE_URL`). Run with:
//!   cargo run --example stream -p safecrack-client -- 0806666612 [max-updates]

use safecrack_client::{CrackError, Progress, SafeCracker};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let target = args.next().unwrap_or_else(|| "1234567890".to_string());
    let max_updates: Option<usize> = args.next().map(|s| s.parse()).transpose()?;

    let client = SafeCracker::from_env()?;
    let status = client.status().await?;
    println!("solver: {} ({})", status.status, status.message);

    // Give up after `max_updates` progress reports, if given.
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    let mut updates = 0usize;

    let result = client
        .stream_crack_with_cancel(
            &target,
            |p: Progress| {
                updates += 1;
                println!(
                    "[{:>6}] {}  {}/{} digits",
                    p.attempts, p.current_attempt, p.correct_digits, p.total_digits
                );
                if max_updates.is_some_and(|max| updates >= max) {
                    trigger.cancel();
                }
            },
            &cancel,
        )
        .await;

    match result {
        Ok(done) => println!("cracked in {} attempts ({})", done.attempts, done.time_taken),
        Err(CrackError::Cancelled) => println!("stopped after {updates} updates"),
        Err(e) => return Err(e.into()),
    }

    Ok(())
}
