//! Console output for transfer progress and per-item results.

use avfetch_core::model::JobOutcome;
use avfetch_core::transfer::TransferProgress;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

const PRINT_INTERVAL: Duration = Duration::from_millis(500);

pub fn format_progress(p: &TransferProgress) -> String {
    let done_mib = p.bytes_downloaded as f64 / 1_048_576.0;
    let rate_mib = p.speed_bytes_per_sec / 1_048_576.0;
    match (p.total, p.percent) {
        (Some(total), Some(pct)) => format!(
            "  {}: {:.1} / {:.1} MiB ({:.1}%)  {:.2} MiB/s",
            p.label,
            done_mib,
            total as f64 / 1_048_576.0,
            pct,
            rate_mib
        ),
        _ => format!("  {}: {:.1} MiB  {:.2} MiB/s", p.label, done_mib, rate_mib),
    }
}

/// Prints progress lines, at most one per stream every `PRINT_INTERVAL`,
/// plus the final line of every stream.
pub async fn print_progress(mut rx: tokio::sync::mpsc::Receiver<TransferProgress>) {
    let mut last_print: HashMap<Arc<str>, Instant> = HashMap::new();
    while let Some(p) = rx.recv().await {
        let now = Instant::now();
        let finished = p.total.is_some_and(|t| p.bytes_downloaded >= t);
        let due = last_print
            .get(&p.label)
            .map_or(true, |t| now.duration_since(*t) >= PRINT_INTERVAL);
        if due || finished {
            println!("{}", format_progress(&p));
            last_print.insert(Arc::clone(&p.label), now);
        }
    }
}

pub fn format_outcome(o: &JobOutcome) -> String {
    let prefix = match o.item.ordinal {
        Some(n) => format!("{:02} {}", n, o.item.title),
        None => o.item.title.clone(),
    };
    match (&o.output_path, &o.failure_reason) {
        (Some(path), _) if o.succeeded => format!("done    {} -> {}", prefix, path.display()),
        (_, Some(reason)) => format!("FAILED  {}: {}", prefix, reason),
        _ => format!("FAILED  {}", prefix),
    }
}

/// Prints each item's result as soon as the pool reports it.
pub async fn print_outcomes(mut rx: tokio::sync::mpsc::UnboundedReceiver<JobOutcome>) {
    while let Some(o) = rx.recv().await {
        if o.succeeded {
            println!("{}", format_outcome(&o));
        } else {
            eprintln!("{}", format_outcome(&o));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use avfetch_core::model::JobItem;
    use std::path::PathBuf;

    #[test]
    fn progress_line_with_total() {
        let p = TransferProgress {
            label: Arc::from("Clip [video]"),
            bytes_downloaded: 1_048_576,
            total: Some(2_097_152),
            percent: Some(50.0),
            speed_bytes_per_sec: 524_288.0,
        };
        assert_eq!(
            format_progress(&p),
            "  Clip [video]: 1.0 / 2.0 MiB (50.0%)  0.50 MiB/s"
        );
    }

    #[test]
    fn outcome_lines() {
        let item = JobItem::new("a", "Song", "u").with_ordinal(3);
        let ok = JobOutcome::done(item.clone(), PathBuf::from("/o/03 - Song.mp4"));
        assert_eq!(format_outcome(&ok), "done    03 Song -> /o/03 - Song.mp4");
        let bad = JobOutcome::failed(item, "no suitable audio stream");
        assert_eq!(format_outcome(&bad), "FAILED  03 Song: no suitable audio stream");
    }
}
