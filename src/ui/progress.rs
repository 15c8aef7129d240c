use crate::wipe::{Eta, SessionSnapshot};
use colored::Colorize;
use std::io::{self, Write};

pub(crate) const CAT_FRAMES: [&str; 6] = [
    "ฅ(^･ω･^=)  ",
    "ฅ(=^･ω･^ ) ",
    "ฅ(^･ᴥ･^=)  ",
    "ฅ(=^ᴥ^= )  ",
    "ฅ(^･ω･^=)  ",
    "ฅ(=^･ω･^ ) ",
];

pub(crate) const PAW_FRAMES: [&str; 4] = ["·", "˚", "•", "˚"];

/// Two-line live progress display (walking cat above a bar) redrawn in place
pub struct ProgressBar {
    width: usize,
    cat_pos: usize,
    cat_frame: usize,
    paw_frame: usize,
    first_render: bool,
}

impl ProgressBar {
    /// width = number of bar character slots (not including the brackets)
    pub fn new(width: usize) -> Self {
        Self {
            width,
            cat_pos: 0,
            cat_frame: 0,
            paw_frame: 0,
            first_render: true,
        }
    }

    /// Number of filled slots for `percent`; NaN counts as zero
    pub(crate) fn filled_slots(&self, percent: f64) -> usize {
        let pct = if percent.is_nan() {
            0.0
        } else {
            percent.clamp(0.0, 100.0)
        };
        ((pct / 100.0) * self.width as f64).round() as usize
    }

    fn advance(&mut self) {
        self.cat_pos = (self.cat_pos + 1) % self.width.max(1);
        self.cat_frame = (self.cat_frame + 1) % CAT_FRAMES.len();
        self.paw_frame = (self.paw_frame + 1) % PAW_FRAMES.len();
    }

    fn cat_line(&self) -> String {
        let mut line = vec![' '; self.width + 2];
        let cat: Vec<char> = CAT_FRAMES[self.cat_frame].chars().collect();
        let pos = self
            .cat_pos
            .min((self.width + 2).saturating_sub(cat.len()));
        for (i, c) in cat.iter().enumerate() {
            if let Some(slot) = line.get_mut(pos + i) {
                *slot = *c;
            }
        }
        line.into_iter().collect()
    }

    /// Status text right of the bar: percent, throughput and ETA when known
    pub(crate) fn info_text(&self, snapshot: &SessionSnapshot) -> String {
        let percent = match snapshot.percent {
            Some(p) => format!("{:.1}%", p),
            None => format!("{} written", human_bytes(snapshot.bytes_copied as f64)),
        };

        match snapshot.throughput_mbps {
            Some(mbps) => {
                let eta = match snapshot.eta {
                    Eta::Remaining { seconds } => format_duration(seconds),
                    Eta::Calculating => "calculating".to_string(),
                };
                format!(
                    "{}  {} @ {}/s  ETA {}",
                    percent.bold(),
                    human_bytes(snapshot.bytes_copied as f64).cyan(),
                    human_bytes(mbps * 1024.0 * 1024.0).cyan(),
                    eta
                )
            }
            None => format!(
                "{}  {}",
                percent.bold(),
                format!("{}...{}", snapshot.state, PAW_FRAMES[self.paw_frame]).cyan()
            ),
        }
    }

    /// Render one frame for `snapshot` and return the two lines
    pub fn frame(&mut self, snapshot: &SessionSnapshot) -> (String, String) {
        self.advance();
        let filled = self.filled_slots(snapshot.percent.unwrap_or(0.0));
        let empty = self.width.saturating_sub(filled);

        let bar = format!(
            "{}{}",
            "█".repeat(filled).green().bold(),
            "░".repeat(empty).bright_black()
        );
        (self.cat_line(), format!("[{}] {}", bar, self.info_text(snapshot)))
    }

    /// Draw a frame on stdout, replacing the previous one
    pub fn render(&mut self, snapshot: &SessionSnapshot) {
        let (cat_line, bar_line) = self.frame(snapshot);
        let mut out = io::stdout().lock();
        if self.first_render {
            self.first_render = false;
        } else {
            // up two lines, clear
            let _ = write!(out, "\x1b[2A\x1b[2K\r");
        }
        let _ = writeln!(out, "{}", cat_line);
        let _ = writeln!(out, "\x1b[2K\r{}", bar_line);
        let _ = out.flush();
    }
}

/// Convert a byte count (or bytes/sec) to a readable string
pub fn human_bytes(bytes: f64) -> String {
    let units = ["B", "KB", "MB", "GB", "TB"];
    if bytes <= 0.0 {
        return "0B".to_string();
    }
    let mut val = bytes;
    let mut i = 0usize;
    while val >= 1024.0 && i + 1 < units.len() {
        val /= 1024.0;
        i += 1;
    }
    format!("{:.2}{}", val, units[i])
}

/// Format seconds to H:MM:SS or M:SS
pub fn format_duration(secs: u64) -> String {
    let h = secs / 3600;
    let m = (secs % 3600) / 60;
    let s = secs % 60;
    if h > 0 {
        format!("{}:{:02}:{:02}", h, m, s)
    } else {
        format!("{}:{:02}", m, s)
    }
}
