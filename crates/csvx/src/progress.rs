//! 📊 progress.rs: "Are we there yet?" Every pipeline, every time, forever.
//!
//! Drives an indicatif bar off the parser's byte position. When the total size
//! is unknown (stdin, pipes) the bar degrades to a spinner that still shows
//! rows and throughput. ⚠️ Watching it will not make it go faster.

use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};

/// 🔢 "1000000" → "1,000,000". You're welcome, eyes.
pub(crate) fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    for (i, c) in s.chars().enumerate() {
        if i > 0 && (s.len() - i) % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result
}

/// ⏱️ MM:SS, or HH:MM:SS if you should have gone home already.
pub(crate) fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{:02}:{:02}", minutes, seconds)
    }
}

/// 📊 Tracks bytes and rows read by the producer and renders them.
pub(crate) struct ProgressMetrics {
    source_name: String,
    total_rows: u64,
    progress_bar: ProgressBar,
    start_time: Instant,
}

impl std::fmt::Debug for ProgressMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // 🎭 ProgressBar is a diva and doesn't derive Debug
        f.debug_struct("ProgressMetrics")
            .field("source_name", &self.source_name)
            .field("total_rows", &self.total_rows)
            .finish()
    }
}

impl ProgressMetrics {
    /// 🚀 `total_size` of 0 means "no idea", which gets a spinner instead of a bar.
    pub(crate) fn new(source_name: String, total_size: u64) -> Self {
        let progress_bar = if total_size > 0 {
            let bar = ProgressBar::new(total_size);
            bar.set_style(
                ProgressStyle::default_bar()
                    .template("{msg}\n[{bar:40.cyan/blue}] {bytes}/{total_bytes}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("=>-"),
            );
            bar
        } else {
            ProgressBar::new_spinner()
        };

        Self {
            source_name,
            total_rows: 0,
            progress_bar,
            start_time: Instant::now(),
        }
    }

    /// 🔄 Called by the producer after each enqueued batch.
    pub(crate) fn update(&mut self, byte_position: u64, total_rows: u64) {
        self.total_rows = total_rows;
        self.progress_bar.set_position(byte_position);
        self.progress_bar.set_message(self.render());
    }

    /// ✅ Ring the bell. We made it (or hit EOF, same energy).
    pub(crate) fn finish(&self) {
        self.progress_bar.finish_with_message(self.render());
    }

    fn render(&self) -> String {
        let elapsed = self.start_time.elapsed();
        let secs = elapsed.as_secs_f64();
        let rows_per_sec = if secs > 0.0 {
            (self.total_rows as f64 / secs) as u64
        } else {
            0
        };
        format!(
            "source: {} | {} rows | {} rows/s | {} elapsed",
            self.source_name,
            format_number(self.total_rows),
            format_number(rows_per_sec),
            format_duration(elapsed)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn the_one_where_big_numbers_get_commas() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(12_001), "12,001");
        assert_eq!(format_number(1_000_000), "1,000,000");
    }

    #[test]
    fn the_one_where_durations_grow_an_hour_column_when_needed() {
        assert_eq!(format_duration(Duration::from_secs(65)), "01:05");
        assert_eq!(format_duration(Duration::from_secs(3_725)), "01:02:05");
    }

    #[test]
    fn the_one_where_the_message_mentions_the_source_and_rows() {
        let mut metrics = ProgressMetrics::new("devices.csv".into(), 0);
        metrics.update(120, 5000);
        let rendered = metrics.render();
        assert!(rendered.contains("devices.csv"));
        assert!(rendered.contains("5,000 rows"));
        metrics.finish();
    }
}
