//! Ask one question against a running backend and print the streamed answer.
//!
//! Reads `GRAPHLENS_BASE_URL`, `GRAPHLENS_TOKEN` and `GRAPHLENS_LOCALE`.
//!
//! Run with:
//!
//! ```sh
//! RUST_LOG=graphlens=debug cargo run --example chat -p graphlens -- 3 "what is a graph"
//! ```

use std::io::Write;

use graphlens::prelude::*;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut args = std::env::args().skip(1);
    let lib_id: u64 = args.next().ok_or("usage: chat <lib-id> <question>")?.parse()?;
    let question = args.collect::<Vec<_>>().join(" ");

    let client = KnowledgeClient::from_env();
    let mut session = QuerySession::new(client);
    let handle = session
        .submit_query(&question, &SearchConfig::library(LibId::new(lib_id)))
        .await?;

    let mut printed = 0;
    while session.is_streaming() {
        session.step().await?;
        if let Some(entry) = session.messages().last() {
            if entry.role == MessageRole::Assistant && entry.content.len() > printed {
                print!("{}", &entry.content[printed..]);
                std::io::stdout().flush()?;
                printed = entry.content.len();
            }
        }
        for event in session.drain_events() {
            if let SessionEvent::GraphUpdated(stats) = event {
                tracing::debug!(inserted = stats.inserted, updated = stats.updated, "graph updated");
            }
        }
    }
    if let Some(job) = session.job(handle) {
        println!("\n[{handle}: {}]", job.state);
        if let Some(error) = &job.error {
            eprintln!("[error] {error}");
        }
    }

    let snapshot = session.snapshot();
    println!(
        "{} nodes, {} relationships in view",
        snapshot.nodes().len(),
        snapshot.relationships().len()
    );
    Ok(())
}
