//! Session summary printing.

use super::SessionReport;

/// Print detailed summary
pub fn print_summary(report: &SessionReport) {
    let stats = &report.run.stats;

    println!("\n╔══════════════════════════════════════════════════════════════╗");
    println!("║                      Playback Summary                        ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("📊 Overview");
    println!("   ├─ Outcome: {}", report.run.outcome);
    println!("   ├─ Steps: {}", stats.steps);
    println!("   ├─ Ingested: {}", stats.ingested);
    println!("   ├─ Skipped: {}", stats.skipped);
    println!("   ├─ Engine resets: {}", stats.resets);
    match (stats.first_frame_id, stats.last_frame_id) {
        (Some(first), Some(last)) => println!("   └─ Frames: {first} → {last}"),
        _ => println!("   └─ Frames: none"),
    }

    println!("\n⏱  Timing");
    println!(
        "   ├─ Recorded: {:.2}s ({:.1} fps)",
        report.throughput.recorded_seconds,
        report.throughput.recorded_fps()
    );
    println!(
        "   ├─ Per frame: {:.2}ms single core, {:.2}ms multi core",
        report.throughput.ms_per_frame_single(),
        report.throughput.ms_per_frame_multi()
    );
    println!(
        "   ├─ Realtime factor: {:.3}x",
        report.throughput.realtime_factor_multi()
    );
    println!("   └─ Stereo match (ms): {}", stats.stereo_match_ms.summary());

    if !report.sinks.is_empty() {
        println!("\n📤 Sinks ({})", report.sinks.len());
        for (i, name) in report.sinks.iter().enumerate() {
            let prefix = if i + 1 == report.sinks.len() { "└─" } else { "├─" };
            println!("   {prefix} {name}");
        }
    }

    if let Some(viewer) = &report.viewer {
        println!("\n🖥  Viewer");
        println!("   ├─ Poses shown: {}", viewer.poses);
        println!("   ├─ Resets: {}", viewer.resets);
        println!("   └─ Path length: {:.3}", viewer.path_length);
    }

    println!();
}
