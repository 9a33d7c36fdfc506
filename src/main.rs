use std::env;

use anyhow::Result;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use pagedb::engine::DatabaseManager;
use pagedb::executor::{ResultSet, TupleSet};

fn main() -> Result<()> {
    let data_dir = env::args().nth(1).unwrap_or_else(|| "data".to_string());
    let mut manager = DatabaseManager::new(data_dir);
    let mut rl = DefaultEditor::new()?;

    println!("===== pagedb =====");

    // Lines accumulate until a terminating semicolon; a bare EXIT works
    // without one.
    let mut pending = String::new();
    while manager.is_running() {
        let prompt = if pending.is_empty() {
            "pagedb> ".to_string()
        } else {
            "      > ".to_string()
        };

        match rl.readline(&prompt) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() && pending.is_empty() {
                    continue;
                }
                if pending.is_empty()
                    && (line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit"))
                {
                    let _ = rl.add_history_entry(line);
                    manager.execute("EXIT");
                    break;
                }

                if !pending.is_empty() {
                    pending.push(' ');
                }
                pending.push_str(line);

                if pending.ends_with(';') {
                    let statement = pending.trim_end_matches(';').trim().to_string();
                    pending.clear();
                    if statement.is_empty() {
                        continue;
                    }
                    let _ = rl.add_history_entry(&statement);
                    let result = manager.execute(&statement);
                    print_result(&result);
                }
            }
            Err(ReadlineError::Interrupted) => {
                pending.clear();
                println!();
            }
            Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("readline error: {e}");
                break;
            }
        }
    }

    manager.close();
    Ok(())
}

fn print_result(result: &ResultSet) {
    if !result.success {
        println!("Failed to execute query: {}", result.message);
        return;
    }
    if let Some(data) = &result.data {
        print_table(data);
    }
    if !result.message.is_empty() {
        println!("{}", result.message);
    }
}

/// Aligned text table: header, separator, one line per row.
fn print_table(set: &TupleSet) {
    let headers: Vec<&str> = set.schema.columns.iter().map(|c| c.name.as_str()).collect();
    let rows: Vec<Vec<String>> = set
        .rows
        .iter()
        .map(|row| row.iter().map(|v| v.to_string()).collect())
        .collect();

    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            if cell.len() > widths[i] {
                widths[i] = cell.len();
            }
        }
    }

    let line = |cells: Vec<String>| {
        let padded: Vec<String> = cells
            .iter()
            .zip(&widths)
            .map(|(cell, &width)| format!("{cell:<width$}"))
            .collect();
        println!("{}", padded.join(" | "));
    };

    line(headers.iter().map(|h| h.to_string()).collect());
    println!(
        "{}",
        widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("-+-")
    );
    for row in rows {
        line(row);
    }
}
