pub mod app;
pub mod completer;
pub mod profiles;
pub mod render;
pub mod theme;
pub mod vpn;

pub use app::{run, AppState, Command, InputMode, Msg, View};
pub use profiles::{Profile, ProfileStore};
pub use theme::Theme;
pub use vpn::{Session, SessionStats, SessionStatus};
