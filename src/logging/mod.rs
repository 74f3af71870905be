//! Timestamped, leveled log output
//!
//! This module provides the [`Logger`] used by every component. Each message is a
//! single line of the form `[2024-01-31 12:00:00][INFO] message` on stdout.
//! DEBUG lines are suppressed in quiet mode; ERROR lines are always written.

use chrono::Local;
use std::time::{Duration, Instant};

/// Logger responsible for all user-visible output
#[derive(Debug, Clone)]
pub struct Logger {
    pub verbose: bool,
    pub start_time: Option<Instant>,
}

impl Logger {
    pub fn new(verbose: bool) -> Self {
        Self {
            verbose,
            start_time: Some(Instant::now()),
        }
    }

    pub fn new_quiet() -> Self {
        Self::new(false)
    }

    pub fn debug(&self, message: &str) {
        if self.verbose {
            println!("{}", Self::format_line("DEBUG", message));
        }
    }

    /// Information message
    pub fn info(&self, message: &str) {
        println!("{}", Self::format_line("INFO", message));
    }

    /// Error message
    pub fn error(&self, message: &str) {
        println!("{}", Self::format_line("ERROR", message));
    }

    /// Key-value summary, one INFO line per entry
    pub fn summary_kv(&self, title: &str, items: &[(&str, String)]) {
        self.info(title);
        for (key, value) in items {
            self.info(&format!("  {}: {}", key, value));
        }
    }

    /// Time elapsed since the logger was created
    pub fn elapsed(&self) -> String {
        match self.start_time {
            Some(start_time) => self.format_duration(start_time.elapsed()),
            None => "unknown".to_string(),
        }
    }

    /// Format duration in human-readable format
    pub fn format_duration(&self, duration: Duration) -> String {
        let secs = duration.as_secs();
        if secs < 60 {
            format!("{:.1}s", duration.as_secs_f64())
        } else if secs < 3600 {
            format!("{}m{:02}s", secs / 60, secs % 60)
        } else {
            format!("{}h{:02}m{:02}s", secs / 3600, (secs % 3600) / 60, secs % 60)
        }
    }

    fn format_line(level: &str, message: &str) -> String {
        format!(
            "[{}][{}] {}",
            Local::now().format("%Y-%m-%d %H:%M:%S"),
            level,
            message
        )
    }
}
