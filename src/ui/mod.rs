// Terminal presentation: live progress bar and the text analysis report

pub mod progress;
pub mod report;


pub use progress::{format_duration, human_bytes, ProgressBar};
pub use report::{
    render_device, render_device_colored, render_device_summary, render_report, summary_counts,
};
