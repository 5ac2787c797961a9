pub mod config;
pub mod meditate;
pub mod pomodoro;
pub mod score;
pub mod screen;
pub mod watch;
pub mod water;
