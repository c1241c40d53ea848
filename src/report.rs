//! Deterministic rendering of dispatch results.
//!
//! Two shapes: the completion report for a run that dispatched, and the
//! abort report for a run that never started. Rendering is a pure function
//! of the stats, so identical stats always produce byte-identical text.
//! Empty success and failure lists render an explicit "none" so scrapers
//! have a stable anchor.

use std::fmt::Write;

use crate::dispatcher::DispatchStats;

/// Render the report for a completed dispatch run.
#[must_use]
pub fn completion(stats: &DispatchStats) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "📊 Delivery statistics:");
    let _ = writeln!(out, "Total: {}", stats.total);
    let _ = writeln!(out, "Succeeded: {}", stats.succeeded.len());
    let _ = writeln!(out, "Failed: {}", stats.failed.len());
    let _ = writeln!(out, "Elapsed: {:.2}s", stats.elapsed_secs());
    out.push('\n');

    push_invalid_section(&mut out, &stats.invalid);

    if stats.succeeded.is_empty() {
        let _ = writeln!(out, "✅ Delivered: none");
    } else {
        let _ = writeln!(out, "✅ Delivered:");
        for recipient in &stats.succeeded {
            let _ = writeln!(out, "{recipient}");
        }
    }
    out.push('\n');

    if stats.failed.is_empty() {
        let _ = writeln!(out, "❌ Failed: none");
    } else {
        let _ = writeln!(out, "❌ Failed:");
        for (index, outcome) in stats.failed.iter().enumerate() {
            if index > 0 {
                out.push('\n');
            }
            let _ = writeln!(out, "{}", outcome.recipient);
            let _ = writeln!(
                out,
                "Error: {}",
                outcome.error.as_deref().unwrap_or("send failed")
            );
        }
    }

    out
}

/// Render the report for a run that aborted before any send was attempted.
#[must_use]
pub fn abort(reason: &str, stats: &DispatchStats) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "❌ Dispatch aborted: {reason}");
    out.push('\n');

    push_invalid_section(&mut out, &stats.invalid);

    let _ = writeln!(out, "📊 Processed:");
    let _ = writeln!(out, "Total: {}", stats.total);
    let _ = writeln!(out, "Succeeded: {}", stats.succeeded.len());
    let _ = write!(out, "Failed: {}", stats.failed.len());

    out
}

fn push_invalid_section(out: &mut String, invalid: &[String]) {
    if invalid.is_empty() {
        return;
    }

    let _ = writeln!(out, "⚠️ Invalid addresses:");
    for address in invalid {
        let _ = writeln!(out, "{address}");
    }
    out.push('\n');
}
