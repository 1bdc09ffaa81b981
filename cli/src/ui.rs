use colored::Colorize;
use simple_counter::Transaction;

pub fn status(message: impl AsRef<str>) {
    eprintln!("{} {}", "==>".blue().bold(), message.as_ref());
}

pub fn success(message: impl AsRef<str>) {
    eprintln!("{} {}", "ok".green().bold(), message.as_ref());
}

pub fn warn(message: impl AsRef<str>) {
    eprintln!("{} {}", "warn".yellow().bold(), message.as_ref());
}

pub fn error(message: impl AsRef<str>) {
    eprintln!("{} {}", "error".red().bold(), message.as_ref());
}

pub fn format_transaction(tx: &Transaction) -> String {
    let from = tx
        .from
        .map_or_else(|| "external".to_string(), |from| from.to_string());
    let op = tx.op.map_or_else(|| "-".to_string(), |op| format!("0x{op:08x}"));
    let outcome = match (tx.success, tx.exit_code) {
        (true, _) => "ok".to_string(),
        (false, Some(code)) => format!("failed ({code})"),
        (false, None) => "skipped".to_string(),
    };
    format!("{from} -> {} op {op} value {} {outcome}", tx.to, tx.value)
}
