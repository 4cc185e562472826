//! 终端展示：配置项选择、进度条、结果输出

pub mod progress;
pub mod report;
pub mod select;
pub mod session;

pub use progress::spawn_renderer;
pub use report::{print_report, report_line};
pub use select::{ProfileSelector, TerminalSelector};
pub use session::{run_once, run_session};
