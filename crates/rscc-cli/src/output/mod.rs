//! Output formatting utilities for the CLI
//!
//! Tables for the address book, status rendering and colored status
//! messages.

use tabled::{settings::Style, Table, Tabled};

use rscc_core::config::Supporter;
use rscc_core::{SessionStatus, Severity};
use rscc_session::ConnectionEstablishmentState;

/// Format the address book as an ASCII table
///
/// Returns "No supporters configured" for an empty list.
pub fn format_supporters(supporters: &[Supporter]) -> String {
    if supporters.is_empty() {
        return "No supporters configured".to_string();
    }

    #[derive(Tabled)]
    struct SupporterRow {
        #[tabled(rename = "DESCRIPTION")]
        description: String,
        #[tabled(rename = "ADDRESS")]
        address: String,
        #[tabled(rename = "PORT")]
        port: String,
        #[tabled(rename = "ENCRYPTED")]
        encrypted: String,
        #[tabled(rename = "CHARGEABLE")]
        chargeable: String,
    }

    let rows: Vec<SupporterRow> = supporters
        .iter()
        .map(|s| SupporterRow {
            description: s.description.clone(),
            address: s.address.clone(),
            port: if s.port.trim().is_empty() {
                "default".to_string()
            } else {
                s.port.clone()
            },
            encrypted: yes_no(s.encrypted),
            chargeable: yes_no(s.chargeable),
        })
        .collect();

    Table::new(rows).with(Style::rounded()).to_string()
}

fn yes_no(value: bool) -> String {
    let text = if value { "yes" } else { "no" };
    text.to_string()
}

/// Summary of a session state snapshot
pub fn format_state(state: &ConnectionEstablishmentState) -> String {
    let mut output = String::new();

    output.push_str(&format!("Phase: {}\n", state.phase()));
    if let Some(role) = state.role {
        output.push_str(&format!("Role: {}\n", role));
    }
    if !state.key.is_empty() {
        output.push_str(&format!("Key: {}\n", rscc_core::key::format(&state.key)));
    }
    output.push_str(&format!(
        "Transport: {}\n",
        match state.relay {
            Some(decision) => decision.to_string(),
            None => "key server".to_string(),
        }
    ));
    output.push_str(&format!("Status: {}\n", state.status.text));

    output
}

/// Print a status with the color of its severity
pub fn print_status(status: &SessionStatus) {
    match status.severity {
        Severity::Idle | Severity::Initializing => print_info(&status.text),
        Severity::Success => print_success(&status.text),
        Severity::Fail => print_error(&status.text),
    }
}

/// Print a success message in green with a checkmark prefix
pub fn print_success(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stdout = std::io::stdout();
    let _ = crossterm::execute!(
        stdout,
        SetForegroundColor(Color::Green),
        Print("✓ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

/// Print an error message in red with an X prefix
///
/// Outputs to stderr.
pub fn print_error(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stderr = std::io::stderr();
    let _ = crossterm::execute!(
        stderr,
        SetForegroundColor(Color::Red),
        Print("✗ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

/// Print a warning message in yellow
///
/// Outputs to stderr.
pub fn print_warning(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stderr = std::io::stderr();
    let _ = crossterm::execute!(
        stderr,
        SetForegroundColor(Color::Yellow),
        Print("⚠ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

/// Print an informational message in cyan
pub fn print_info(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stdout = std::io::stdout();
    let _ = crossterm::execute!(
        stdout,
        SetForegroundColor(Color::Cyan),
        Print("ℹ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}
