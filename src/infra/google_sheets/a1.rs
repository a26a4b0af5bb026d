// A1 notation helpers: `Schedule!D2:G2` and friends.

/// 1-based column number to letters: 1 -> A, 26 -> Z, 27 -> AA.
pub fn column_letter(mut column: u32) -> String {
    let mut letters = Vec::new();
    while column > 0 {
        let rem = (column - 1) % 26;
        letters.push((b'A' + rem as u8) as char);
        column = (column - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// A single cell, e.g. `B7`. Row and column are 1-based.
pub fn cell(row: u32, column: u32) -> String {
    format!("{}{}", column_letter(column), row)
}

/// `'Sheet Name'!A1:C3`. Sheet names are always quoted.
pub fn range(sheet: &str, from: &str, to: &str) -> String {
    if from == to {
        format!("{}!{}", quote_sheet(sheet), from)
    } else {
        format!("{}!{}:{}", quote_sheet(sheet), from, to)
    }
}

/// Whole-sheet range covering the given columns, e.g. `'Rooms'!A:D`.
pub fn columns(sheet: &str, first: u32, last: u32) -> String {
    format!(
        "{}!{}:{}",
        quote_sheet(sheet),
        column_letter(first),
        column_letter(last)
    )
}

fn quote_sheet(sheet: &str) -> String {
    format!("'{}'", sheet.replace('\'', "''"))
}
