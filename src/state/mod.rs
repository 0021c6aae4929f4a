//! 运行时状态模块

pub mod app_state;

pub use app_state::{ActivityCounter, AppState, Collaborators};
