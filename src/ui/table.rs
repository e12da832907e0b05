use comfy_table::{presets::NOTHING, Attribute, Cell, ContentArrangement, Table};

/// Borderless, non-wrapping table for terminal reports.
pub fn styled_table() -> Table {
    let mut table = Table::new();
    table.load_preset(NOTHING);
    table.set_content_arrangement(ContentArrangement::Disabled);
    table
}

/// Apply padding to all columns (call after setting headers)
pub fn apply_column_padding(table: &mut Table, padding: (u16, u16)) {
    for i in 0..table.column_count() {
        if let Some(col) = table.column_mut(i) {
            col.set_padding(padding);
        }
    }
}

pub fn header(text: &str) -> Cell {
    Cell::new(text)
        .add_attribute(Attribute::Bold)
        .add_attribute(Attribute::Dim)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_rows_without_borders() {
        let mut table = styled_table();
        table.set_header(vec![header("Workflow"), header("%")]);
        table.add_row(vec!["Spectra", "50"]);
        let rendered = table.to_string();
        assert!(rendered.contains("Spectra"));
        assert!(!rendered.contains('|'));
    }
}
