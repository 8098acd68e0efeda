use crate::domain::model::{ItemState, ItemStatus};
use crate::utils::error::InstallError;
use console::Style;

pub const ISSUES_URL: &str = "https://github.com/intrahouseio/ih-v5/issues";
pub const SUPPORT_EMAIL: &str = "support@ih-systems.com";

/// 標題與狀態之間以點號補齊到此寬度
pub const ROW_WIDTH: usize = 48;

pub fn state_label(state: &ItemState) -> &'static str {
    match state {
        ItemState::Ok => "ok",
        ItemState::Skipped => "skipped",
        ItemState::Failed(_) => "error",
    }
}

/// 錯誤訊息只顯示第一行
pub fn legend(state: &ItemState) -> Option<&str> {
    match state {
        ItemState::Failed(message) => message.lines().next().filter(|line| !line.is_empty()),
        _ => None,
    }
}

/// `title ........ ok`，不含顏色
pub fn format_row(title: &str, label: &str) -> String {
    let dots = ROW_WIDTH.saturating_sub(title.chars().count() + 2).max(3);
    format!("{} {} {}", title, ".".repeat(dots), label)
}

pub fn print_title(text: &str) {
    println!();
    println!("{}", Style::new().bold().cyan().apply_to(text));
}

pub fn print_row(status: &ItemStatus) {
    let label = state_label(&status.state);
    let style = match status.state {
        ItemState::Ok => Style::new().green(),
        ItemState::Skipped => Style::new().yellow(),
        ItemState::Failed(_) => Style::new().red(),
    };
    let row = format_row(&status.name, label);
    let padded = &row[..row.len() - label.len()];

    println!("{}{}", padded, style.apply_to(label));
    if let Some(line) = legend(&status.state) {
        println!("    {}", Style::new().dim().apply_to(line));
    }
}

pub fn print_field(label: &str, value: &str) {
    println!("  {} {}", Style::new().bold().apply_to(format!("{}:", label)), value);
}

pub fn print_abort_banner(error: &InstallError) {
    let red = Style::new().red().bold();
    eprintln!();
    eprintln!("{}", red.apply_to("Installation aborted"));
    eprintln!("  {}", error.user_friendly_message());
    eprintln!("  {}", Style::new().dim().apply_to(error.recovery_suggestion()));
    eprintln!();
    eprintln!("  Report the problem: {}", ISSUES_URL);
    eprintln!("  Support: {}", SUPPORT_EMAIL);
}
