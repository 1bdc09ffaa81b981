pub mod completions;
pub mod counter;
pub mod deploy;
pub mod encode;
pub mod get;
pub mod upgrade;
