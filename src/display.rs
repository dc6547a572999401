use std::fmt::{self, Display, Write as _};
use std::fs::File;
use std::io;
use std::iter::once;
use std::path::Path;
use csv::WriterBuilder;

use crate::error::Result;
use crate::stats::{Filter, PivotSet, PivotTable, SlotCell, ALL_TEAMS};

pub const TIMES_TITLE: &str = "Match Start Times";
pub const PITCHES_TITLE: &str = "Allocated Pitches";
pub const START_FREQUENCY_TITLE: &str = "Start Time Frequency";
pub const PITCH_USAGE_TITLE: &str = "Pitch Usage Frequency";

const ROW_HEADER: &str = "Team Name";

/// Preferred slots are marked with a trailing '*' in text output
impl Display for SlotCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.preferred {
            write!(f, "{}*", self.value)
        } else {
            write!(f, "{}", self.value)
        }
    }
}

fn text_rows<C: Display>(table: &PivotTable<C>) -> Vec<Vec<String>> {
    let header: Vec<String> = once(ROW_HEADER.to_string())
        .chain(table.column_labels.iter().cloned())
        .collect();

    let body = table.row_labels.iter().zip(&table.cells).map(|(label, cells)| {
        once(label.clone())
            .chain(cells.iter().map(|c| c.to_string()))
            .collect::<Vec<String>>()
    });

    once(header).chain(body).collect()
}

/// Renders one table as aligned plain text
pub fn render_text_table<C: Display>(title: &str, table: &PivotTable<C>) -> String {
    let rows = text_rows(table);
    let widths: Vec<usize> = (0..rows[0].len())
        .map(|i| rows.iter().map(|r| r[i].chars().count()).max().unwrap_or(0))
        .collect();

    let mut out = String::new();
    let _ = writeln!(out, "\n=== {} ===", title);
    for row in &rows {
        let line: Vec<String> = row
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
            .collect();
        let _ = writeln!(out, "{}", line.join("  ").trim_end());
    }
    out
}

/// Prints all four tables
pub fn print_pivot_set(set: &PivotSet) {
    print!("{}", render_text_table(TIMES_TITLE, &set.times));
    print!("{}", render_text_table(PITCHES_TITLE, &set.pitches));
    print!("{}", render_text_table(START_FREQUENCY_TITLE, &set.start_frequency));
    print!("{}", render_text_table(PITCH_USAGE_TITLE, &set.pitch_usage));
    println!("\n(* = preferred time)");
}

/// Writes one table as CSV: a "Team Name" header followed by one line per team
pub fn write_table_csv<C: Display, W: io::Write>(table: &PivotTable<C>, writer: W) -> Result<()> {
    let mut wtr = WriterBuilder::new().has_headers(false).from_writer(writer);
    for row in text_rows(table) {
        wtr.write_record(&row)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_table_csv_file<C: Display>(table: &PivotTable<C>, path: &Path) -> Result<()> {
    let file = File::create(path)?;
    write_table_csv(table, file)
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn html_table<C>(
    out: &mut String,
    id: &str,
    title: &str,
    table: &PivotTable<C>,
    cell: impl Fn(&C) -> String,
) {
    let _ = writeln!(out, "<h2>{}</h2>", escape_html(title));
    let _ = write!(out, "<table id=\"{}\"><thead><tr><th>{}</th>", id, ROW_HEADER);
    for column in &table.column_labels {
        let _ = write!(out, "<th>{}</th>", escape_html(column));
    }
    out.push_str("</tr></thead><tbody>\n");

    for (label, cells) in table.row_labels.iter().zip(&table.cells) {
        let _ = write!(out, "<tr><td>{}</td>", escape_html(label));
        for value in cells {
            out.push_str(&cell(value));
        }
        out.push_str("</tr>\n");
    }
    out.push_str("</tbody></table>\n");
}

fn slot_td(cell: &SlotCell) -> String {
    if cell.preferred {
        format!(
            "<td class=\"preferred-time\" title=\"Preferred Time\">{}</td>",
            escape_html(&cell.value)
        )
    } else {
        format!("<td>{}</td>", escape_html(&cell.value))
    }
}

fn count_td(count: &u32) -> String {
    format!("<td>{}</td>", count)
}

/// Renders the statistics page: team selector plus the four tables
pub fn render_html(set: &PivotSet, filter: &Filter, teams: &[String]) -> String {
    let mut out = String::new();
    out.push_str("<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>Allocation Statistics</title>\n");
    out.push_str("<style>td.preferred-time { background: #d4edda; }</style></head><body>\n");
    out.push_str("<h1>Allocation Statistics</h1>\n");

    out.push_str("<form method=\"get\" action=\"/stats\"><select id=\"team-select\" name=\"team\" onchange=\"this.form.submit()\">");
    let all_selected = if *filter == Filter::All { " selected" } else { "" };
    let _ = write!(out, "<option value=\"{}\"{}>All Teams</option>", ALL_TEAMS, all_selected);
    for team in teams {
        let selected = if filter.as_str() == team.as_str() { " selected" } else { "" };
        let _ = write!(
            out,
            "<option value=\"{0}\"{1}>{0}</option>",
            escape_html(team),
            selected
        );
    }
    out.push_str("</select></form>\n");

    html_table(&mut out, "times-table", TIMES_TITLE, &set.times, slot_td);
    html_table(&mut out, "pitches-table", PITCHES_TITLE, &set.pitches, slot_td);
    html_table(
        &mut out,
        "start-time-frequency-table",
        START_FREQUENCY_TITLE,
        &set.start_frequency,
        count_td,
    );
    html_table(
        &mut out,
        "pitch-usage-frequency-table",
        PITCH_USAGE_TITLE,
        &set.pitch_usage,
        count_td,
    );

    out.push_str("</body></html>\n");
    out
}
