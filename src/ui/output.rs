//! Terminal output for the CLI. Everything except errors goes quiet under
//! `CODESCHOOL_QUIET=1`.

use crate::output::is_quiet;
use crate::ui::{Icons, stderr_palette, stdout_palette};
use owo_colors::OwoColorize;

pub fn header(text: &str) {
    if is_quiet() {
        return;
    }
    println!("{} {}", Icons::ROCKET, text.style(stdout_palette().banner));
}

pub fn status(icon: &str, label: &str, value: &str) {
    if is_quiet() {
        return;
    }
    println!("{} {}: {}", icon, label.style(stdout_palette().label), value);
}

pub fn success(label: &str) {
    if is_quiet() {
        return;
    }
    println!("{} {}", Icons::CHECK, label.style(stdout_palette().ok));
}

pub fn error(label: &str) {
    eprintln!("{} {}", Icons::CROSS, label.style(stderr_palette().failure));
}

pub fn warn(label: &str) {
    if is_quiet() {
        return;
    }
    eprintln!("{} {}", Icons::WARN, label.style(stderr_palette().caution));
}

pub fn section(title: &str) {
    if is_quiet() {
        return;
    }
    println!();
    println!("━{}━", title.style(stdout_palette().banner));
}

/// Print a table built by [`crate::ui::table`].
pub fn table(rendered: &str) {
    if is_quiet() || rendered.is_empty() {
        return;
    }
    println!("{}", rendered);
}

/// The chat reply itself is the command's output, so it prints even when quiet.
pub fn chat_reply(reply: &str) {
    if is_quiet() {
        println!("{}", reply);
    } else {
        println!("{} {}", Icons::ROBOT, reply.style(stdout_palette().reply));
    }
}

pub fn timing(elapsed: std::time::Duration) {
    if is_quiet() {
        return;
    }
    println!(
        "{} {}",
        Icons::CLOCK.style(stdout_palette().label),
        indicatif::HumanDuration(elapsed)
    );
}
