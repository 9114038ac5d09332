//! User-facing messages.
//!
//! stdout is reserved for command results (`read` streams raw bytes there), so
//! every status message goes to stderr. Colors are enabled only on a TTY.

use owo_colors::OwoColorize;

fn is_tty() -> bool {
    atty::is(atty::Stream::Stderr)
}

fn status(label: &str, paint: fn(&str) -> String, msg: &str) {
    if is_tty() {
        eprintln!("{} {}", paint(label), msg);
    } else {
        eprintln!("{label} {msg}");
    }
}

pub fn print_info(msg: &str) {
    status("info:", |s| s.cyan().bold().to_string(), msg);
}

pub fn print_warn(msg: &str) {
    status("warn:", |s| s.yellow().bold().to_string(), msg);
}

pub fn print_error(msg: &str) {
    status("error:", |s| s.red().bold().to_string(), msg);
}

pub fn print_success(msg: &str) {
    status("ok:", |s| s.green().bold().to_string(), msg);
}

/// Print a plain result line to stdout (no prefix); scripts consume these.
pub fn print_user(msg: &str) {
    println!("{msg}");
}
