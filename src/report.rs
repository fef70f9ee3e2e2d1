//! Terminal rendering of reachability hits.

use colored::*;

use crate::analysis::Hit;

/// Print one hit: the alert banner, the call path that reaches the
/// vulnerable package, and the advisory details.
pub fn write_hit(hit: &Hit) {
    println!(
        "{}: vulnerability found in dependency {}",
        "ALERT".red().bold(),
        hit.package.yellow()
    );

    println!("Stack trace:");
    for (i, frame) in hit.frames.iter().enumerate() {
        let prefix = if i == 0 { "in function " } else { "which calls " };
        let package = match &frame.package {
            Some(name) => format!(" (package {})", name.bright_blue().bold()),
            None => String::new(),
        };
        println!(
            "    {}{} in {}:{}{}",
            prefix,
            frame.function.yellow(),
            frame.file.display(),
            frame.line,
            package
        );
    }

    println!();
    println!("Vulnerability details:");
    println!("{}: {}", "ID".green().bold(), hit.vuln_id);
    println!("{}: {}", "Description".green().bold(), hit.summary);
    println!();
}

/// Print the all-clear line for a run with no hits.
pub fn write_all_clear() {
    println!(
        "{}: no vulnerable dependency is reachable from the given entry points",
        "OK".green().bold()
    );
}
