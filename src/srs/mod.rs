pub mod practice;
pub mod scheduler;
pub mod sm2;

pub use practice::{select_practice_items, PracticeSelection, PracticeSource};
pub use scheduler::Scheduler;
pub use sm2::{calculate_sm2, Sm2Result};
