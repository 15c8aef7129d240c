// Drive discovery and classification
//
// Organized structure:
// - detection.rs: block-device inventory (lsblk), size query, smartctl field extraction
// - classifier.rs: evidence-gathering classification cascade
// - commands.rs: classification -> displayed commands and executable wipe plan

pub mod classifier;
pub mod commands;
pub mod detection;



pub use classifier::{Classifier, IdentityReading};
pub use commands::{is_executable, wipe_commands, wipe_plan, WipePlan, WipeStep};
pub use detection::DeviceEnumerator;
