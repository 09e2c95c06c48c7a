/// Styled terminal output, shared by all modules.
///
/// Status lines go to stderr; stdout is reserved for the report itself so
/// machine-readable output stays free of progress chatter.
pub fn gen_prefix(prefix: &str) -> String {
    // Alignment is based on the visible width, not the escaped string length
    let pad = 10usize.saturating_sub(console::measure_text_width(prefix));
    format!("{}{} ", " ".repeat(pad), prefix)
}

#[macro_export]
macro_rules! msg {
    ($($arg:tt)+) => {{
        eprint!("{}", $crate::cli::gen_prefix(""));
        eprintln!($($arg)+);
    }};
}

#[macro_export]
macro_rules! info {
    ($($arg:tt)+) => {{
        eprint!("{}", $crate::cli::gen_prefix(&console::style("INFO").blue().bold().to_string()));
        eprintln!($($arg)+);
    }};
}

#[macro_export]
macro_rules! warn {
    ($($arg:tt)+) => {{
        eprint!("{}", $crate::cli::gen_prefix(&console::style("WARN").yellow().bold().to_string()));
        eprintln!($($arg)+);
    }};
}

#[macro_export]
macro_rules! error {
    ($($arg:tt)+) => {{
        eprint!("{}", $crate::cli::gen_prefix(&console::style("ERROR").red().bold().to_string()));
        eprintln!($($arg)+);
    }};
}

#[macro_export]
macro_rules! due_to {
    ($($arg:tt)+) => {{
        eprint!("{}", $crate::cli::gen_prefix(&console::style("DUE TO").yellow().bold().to_string()));
        eprintln!($($arg)+);
    }};
}

#[macro_export]
macro_rules! success {
    ($($arg:tt)+) => {{
        eprint!("{}", $crate::cli::gen_prefix(&console::style("DONE").green().bold().to_string()));
        eprintln!($($arg)+);
    }};
}
