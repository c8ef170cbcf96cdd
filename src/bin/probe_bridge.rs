use futures_util::StreamExt;
use std::time::Instant;
use tokio_tungstenite::connect_async;

use flipbot_rs::feeds::bridge::decode;

const DEFAULT_URL: &str = "ws://127.0.0.1:8765";
const DEFAULT_COUNT: usize = 100;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    let url = args.next().unwrap_or_else(|| DEFAULT_URL.to_string());
    let count = match args.next() {
        Some(n) => n.parse()?,
        None => DEFAULT_COUNT,
    };

    println!("Connecting to {}...", url);
    let (ws, _) = connect_async(url.as_str()).await?;
    let (_, mut read) = ws.split();

    println!("Connected. Measuring decode time for {} events...\n", count);

    let mut times: Vec<u128> = Vec::with_capacity(count);
    let mut skipped = 0;

    while let Some(msg) = read.next().await {
        let tungstenite::Message::Text(text) = msg? else {
            continue;
        };

        let start = Instant::now();
        let decoded = decode(&text);
        let elapsed = start.elapsed().as_nanos();

        match decoded {
            Ok(event) => {
                times.push(elapsed);
                let n = times.len();
                if n <= 5 || n % 20 == 0 {
                    println!("#{}: {} {}ns ({}μs)", n, event.kind(), elapsed, elapsed / 1000);
                }
                if event.is_terminal() || n >= count {
                    break;
                }
            }
            Err(e) => {
                skipped += 1;
                println!("skipped frame: {}", e);
            }
        }
    }

    if times.is_empty() {
        println!("No events decoded");
        return Ok(());
    }

    times.sort_unstable();
    let n = times.len();
    let sum: u128 = times.iter().sum();
    let avg = sum / n as u128;
    let min = times[0];
    let max = times[n - 1];
    let median = times[n / 2];
    let p99 = times[(n * 99 / 100).min(n - 1)];

    println!("\n=== BRIDGE DECODE LATENCY ({} events, {} skipped) ===", n, skipped);
    println!("Min:    {}ns ({}μs)", min, min / 1000);
    println!("Max:    {}ns ({}μs)", max, max / 1000);
    println!("Avg:    {}ns ({}μs)", avg, avg / 1000);
    println!("Median: {}ns ({}μs)", median, median / 1000);
    println!("P99:    {}ns ({}μs)", p99, p99 / 1000);
    Ok(())
}
