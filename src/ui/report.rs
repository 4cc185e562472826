use crate::models::SyncReport;
use console::{Style, Term};
use std::io::Write as _;

/// 一行结果，例如 `[push] Uploaded 3 files`
pub fn report_line(report: &SyncReport) -> String {
    format!("[{}] {}", report.direction, report.message())
}

/// 成功用绿色，失败用红色
pub fn print_report(report: &SyncReport) {
    let style = if report.is_success() {
        Style::new().green().bold()
    } else {
        Style::new().red().bold()
    };
    let mut term = Term::stdout();
    let _ = writeln!(term, "{}", style.apply_to(report_line(report)));
}
