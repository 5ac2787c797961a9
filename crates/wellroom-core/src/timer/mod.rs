mod countdown;
mod meditation;
mod pomodoro;

pub use countdown::{Countdown, CountdownState};
pub use meditation::{MeditationLog, MeditationTimer};
pub use pomodoro::{PomodoroCycle, PomodoroMode, PomodoroSettings, PomodoroState};
