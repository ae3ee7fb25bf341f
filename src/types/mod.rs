pub mod logs;
pub mod trainer;

pub use logs::{ContactEvent, EmailLogEntry, RollingLog};
pub use trainer::{
    ExperienceLevel, NewTrainer, Trainer, TrainerCard, TrainerProfile, TrainerStatus,
};
