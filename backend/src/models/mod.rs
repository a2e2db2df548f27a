pub mod analysis;
pub mod github;
pub mod story;

pub use analysis::*;
pub use github::*;
pub use story::*;
