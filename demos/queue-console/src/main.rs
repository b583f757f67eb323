//! Console front end for a matchlink session.
//!
//! ```text
//! cargo run -p queue-console -- localhost:3000
//! MATCHLINK_ADDR=localhost:3000 cargo run -p queue-console
//! ```
//!
//! Connects, joins the queue under a random name, votes for a map once the
//! first roster arrives and prints every notification until a match is
//! found or reconnection gives up.

use std::process::ExitCode;

use matchlink::prelude::*;
use rand::Rng;
use tokio::sync::mpsc;

const DEFAULT_RATING: i32 = 1000;

#[tokio::main]
async fn main() -> ExitCode {
    matchlink::init_tracing();

    let Some(addr) = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("MATCHLINK_ADDR").ok())
    else {
        eprintln!("usage: queue-console <host:port>  (or set MATCHLINK_ADDR)");
        return ExitCode::FAILURE;
    };

    match run(addr).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "session ended with error");
            ExitCode::FAILURE
        }
    }
}

async fn run(addr: String) -> Result<(), MatchlinkError> {
    let (tx, mut notifications) = mpsc::unbounded_channel();
    let client = MatchmakingClient::start(ClientConfig::new(addr), tx);

    client.connect().await?;

    let username = format!("player-{:04}", rand::rng().random_range(0..10_000));
    client.request_join_queue(&username, DEFAULT_RATING).await?;
    println!("queued as {username}");

    let mut voted = false;
    while let Some(notification) = notifications.recv().await {
        match notification {
            Notification::StateChanged(state) => println!("state: {state}"),
            Notification::QueueSnapshot(queue) => {
                println!("queue ({} players):", queue.len());
                for player in &queue {
                    println!("  {:<20} {}", player.username, player.rating);
                }
                if !voted && !queue.is_empty() {
                    let map = MapName::ALL[rand::rng().random_range(0..MapName::ALL.len())];
                    match client.request_vote_map(map.as_str()).await {
                        Ok(()) => println!("voted for {map}"),
                        Err(e) => println!("vote refused: {e}"),
                    }
                    voted = true;
                }
            }
            Notification::VoteTally(tally) => {
                let line: Vec<String> =
                    tally.iter().map(|(map, votes)| format!("{map}={votes}")).collect();
                println!("votes: {}", line.join(" "));
            }
            Notification::MatchFound(info) => {
                println!("match found: {}", describe_match(&info));
                break;
            }
            Notification::ReconnectExhausted { attempts } => {
                println!("server unreachable after {attempts} attempts, giving up");
                break;
            }
        }
    }

    client.shutdown().await
}

fn describe_match(info: &MatchInfo) -> String {
    info.fields()
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join(" ")
}
