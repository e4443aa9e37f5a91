pub mod review;
pub mod schedule;
pub mod vocabulary;

pub use review::{Quality, ReviewEvent};
pub use schedule::{MemoryStage, ScheduleState};
pub use vocabulary::{Difficulty, LearningMode, VocabularyItem};
