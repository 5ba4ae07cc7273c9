// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::model::{Field, PersonRow};
use crate::overrides::{OverrideStore, with_override};
use crate::selection::SelectionState;

/// Rows an export covers: the selection when there is one, otherwise every
/// loaded row. Displayed statuses include overrides.
pub fn export_rows<S: OverrideStore + ?Sized>(
    loaded: &[PersonRow],
    selection: &SelectionState,
    overrides: &S,
) -> Vec<PersonRow> {
    loaded
        .iter()
        .filter(|row| selection.is_empty() || selection.is_selected(row.id))
        .map(|row| with_override(overrides, row))
        .collect()
}

/// CSV with an `id` column followed by every entry of `columns`, the `ID`
/// column included when visible. The header is bare; every value is quoted.
pub fn rows_to_csv(rows: &[PersonRow], columns: &[Field]) -> String {
    let mut header = vec!["id"];
    header.extend(columns.iter().map(|field| field.label()));
    let mut out = header.join(",");
    out.push('\n');

    for row in rows {
        let mut cells = vec![quote(&row.id.to_string())];
        cells.extend(columns.iter().map(|field| quote(&row.cell(*field))));
        out.push_str(&cells.join(","));
        out.push('\n');
    }
    out
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::{export_rows, rows_to_csv};
    use crate::test_support::person;
    use crate::{
        Field, OverrideStore, PersonId, PersonRow, PersonStatus, SelectionInput, SelectionState,
        StatusOverrides,
    };

    #[test]
    fn csv_quotes_values_and_formats_dates() {
        let mut subject = person(4);
        subject.full_name = "Ann \"Nan\" Lee".to_owned();
        let row = PersonRow::project(&subject, &Field::BASE);

        let csv = rows_to_csv(&[row], &[Field::Id, Field::FullName, Field::BirthDate]);
        assert_eq!(
            csv,
            "id,ID,Full name,Born\n\"4\",\"4\",\"Ann \"\"Nan\"\" Lee\",\"14.03.1985\"\n"
        );
    }

    #[test]
    fn default_columns_follow_id_in_header() {
        let csv = rows_to_csv(&[], &Field::default_visible());
        assert_eq!(csv, "id,ID,Full name,Born,Gender,City,Email,Status\n");
    }

    #[test]
    fn missing_values_export_empty() {
        let mut subject = person(2);
        subject.email = None;
        let row = PersonRow::project(&subject, &Field::BASE);
        let csv = rows_to_csv(&[row], &[Field::Email]);
        assert_eq!(csv, "id,Email\n\"2\",\"\"\n");
    }

    #[test]
    fn export_prefers_selection_and_applies_overrides() {
        let rows: Vec<_> = (1..=3)
            .map(|id| PersonRow::project(&person(id), &Field::BASE))
            .collect();
        let ids: Vec<_> = rows.iter().map(|row| row.id).collect();
        let mut overrides = StatusOverrides::default();
        overrides.set_status(PersonId::new(3), PersonStatus::Archived);

        let mut selection = SelectionState::default();
        assert_eq!(export_rows(&rows, &selection, &overrides).len(), 3);

        selection.apply(SelectionInput::Point(PersonId::new(3)), &ids);
        let picked = export_rows(&rows, &selection, &overrides);
        assert_eq!(picked.len(), 1);
        assert_eq!(picked[0].status, Some(PersonStatus::Archived));
    }
}
