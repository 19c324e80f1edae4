pub mod diagnostics;
pub use diagnostics::{CheckReport, CheckStep, Diagnostics};

pub mod sweeper;
pub use sweeper::ExpirySweeper;
