use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use serde_json::json;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use chamberlain_core::ChamberlainError;

static JSON_MODE: AtomicBool = AtomicBool::new(false);

pub fn init(json: bool) {
    JSON_MODE.store(json, Ordering::Relaxed);
}

pub fn is_json() -> bool {
    JSON_MODE.load(Ordering::Relaxed)
}

pub fn print<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let s = if is_json() {
        serde_json::to_string(value)?
    } else {
        serde_json::to_string_pretty(value)?
    };
    println!("{s}");
    Ok(())
}

/// Human-only status line; suppressed in JSON mode.
pub fn note(msg: &str) {
    if !is_json() {
        let _ = writeln!(io::stderr(), "{msg}");
    }
}

/// Report a failed command. Library errors carry their stable code.
pub fn print_error(err: &anyhow::Error) {
    let code = err
        .downcast_ref::<ChamberlainError>()
        .map_or("CLI_ERROR", ChamberlainError::code);

    if is_json() {
        let body = json!({"error": {"code": code, "message": format!("{err:#}")}});
        println!("{body}");
        return;
    }

    let mut stderr = StandardStream::stderr(ColorChoice::Auto);
    let _ = stderr.set_color(ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true));
    let _ = write!(stderr, "error[{code}]");
    let _ = stderr.reset();
    let _ = writeln!(stderr, ": {err:#}");
}
