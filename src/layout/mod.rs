pub mod constraints;
pub mod engine;
pub mod optimizer;
pub mod overlap;
pub mod pass;
pub mod priority;
pub mod rules;
pub mod sizing;
pub mod stacker;

#[cfg(test)]
mod tests;

pub use constraints::*;
pub use engine::*;
pub use optimizer::*;
pub use overlap::*;
pub use pass::*;
pub use priority::*;
pub use rules::*;
pub use sizing::*;
pub use stacker::*;
