use super::*;
use crate::test_support::{employees, FakeApi, TOKEN};
use shared::error::ApiError;

fn names(roster: &EmployeeRoster) -> Vec<String> {
    roster.visible().map(|employee| employee.name.clone()).collect()
}

fn loaded(rows: &[(i64, &str)]) -> EmployeeRoster {
    let mut roster = EmployeeRoster::new();
    roster.replace(employees(rows));
    roster
}

#[test]
fn filter_matches_case_insensitive_substring() {
    let mut roster = loaded(&[(1, "Ana"), (2, "Bruno")]);

    roster.filter("an");

    let visible: Vec<_> = roster.visible().map(|e| (e.id.0, e.name.as_str())).collect();
    assert_eq!(visible, vec![(1, "Ana")]);
}

#[test]
fn filter_preserves_cache_order_and_empty_filter_shows_all() {
    let rows = [
        (1, "Mariana"),
        (2, "Bruno"),
        (3, "JULIANA"),
        (4, "Ana Paula"),
        (5, "Carlos"),
    ];
    let mut roster = loaded(&rows);

    for needle in ["ana", "A", "xyz", "", "  ", "ULI"] {
        roster.filter(needle);
        let lowered = needle.to_lowercase();
        let expected: Vec<String> = rows
            .iter()
            .filter(|(_, name)| name.to_lowercase().contains(&lowered))
            .map(|(_, name)| name.to_string())
            .collect();
        assert_eq!(names(&roster), expected, "filter {needle:?}");
    }

    roster.filter("");
    assert_eq!(names(&roster).len(), rows.len());
}

#[test]
fn selecting_another_employee_deselects_the_previous_one() {
    let mut roster = loaded(&[(1, "Ana"), (2, "Bruno")]);

    assert_eq!(roster.select(EmployeeId(1)), Selection::Selected(EmployeeId(1)));
    assert_eq!(roster.select(EmployeeId(2)), Selection::Selected(EmployeeId(2)));

    assert!(roster.is_selected(EmployeeId(2)));
    assert!(!roster.is_selected(EmployeeId(1)));
    assert_eq!(roster.selected().map(|e| e.name.as_str()), Some("Bruno"));
}

#[test]
fn stale_or_empty_selection_is_a_benign_no_op() {
    let mut empty = EmployeeRoster::new();
    assert_eq!(empty.select(EmployeeId(1)), Selection::NoSelection);
    assert!(empty.selected().is_none());

    let mut roster = loaded(&[(1, "Ana"), (2, "Bruno")]);
    roster.select(EmployeeId(1));
    assert_eq!(roster.select(EmployeeId(42)), Selection::NoSelection);
    assert!(roster.is_selected(EmployeeId(1)));
}

#[test]
fn hidden_employees_cannot_be_selected_and_filtering_drops_hidden_selection() {
    let mut roster = loaded(&[(1, "Ana"), (2, "Bruno")]);
    roster.filter("bru");
    assert_eq!(roster.select(EmployeeId(1)), Selection::NoSelection);

    roster.select(EmployeeId(2));
    roster.filter("b");
    assert!(roster.is_selected(EmployeeId(2)));

    roster.filter("ana");
    assert!(roster.selected().is_none());
}

#[tokio::test]
async fn load_replaces_cache_and_clears_selection() {
    let api = FakeApi::new(employees(&[(1, "Ana"), (2, "Bruno")]));
    let mut roster = EmployeeRoster::new();

    assert_eq!(roster.load(&api, TOKEN).await.expect("load"), 2);
    roster.select(EmployeeId(1));

    api.set_employees(Ok(employees(&[(1, "Ana"), (3, "Carla")])));
    roster.load(&api, TOKEN).await.expect("reload");

    assert_eq!(names(&roster), vec!["Ana", "Carla"]);
    assert!(roster.selected().is_none());
    assert_eq!(api.list_tokens(), vec![TOKEN, TOKEN]);
}

#[tokio::test]
async fn failed_load_keeps_previous_cache_and_selection() {
    let api = FakeApi::new(employees(&[(1, "Ana"), (2, "Bruno")]));
    let mut roster = EmployeeRoster::new();
    roster.load(&api, TOKEN).await.expect("load");
    roster.filter("bru");
    roster.select(EmployeeId(2));

    api.set_employees(Err(FetchError::Status(ApiError::new(500, "boom"))));
    let err = roster.load(&api, TOKEN).await.expect_err("server error");

    assert!(matches!(err, FetchError::Status(_)));
    assert_eq!(roster.len(), 2);
    assert_eq!(roster.filter_text(), "bru");
    assert!(roster.is_selected(EmployeeId(2)));
}

#[test]
fn snapshot_reflects_visible_rows_and_selection() {
    let mut roster = loaded(&[(1, "Ana"), (2, "Bruno"), (3, "Bianca")]);
    roster.filter("b");
    roster.select(EmployeeId(3));

    let view = roster.snapshot();
    assert_eq!(view.total, 3);
    assert_eq!(view.filter, "b");
    assert_eq!(view.selected, Some(EmployeeId(3)));
    assert_eq!(
        view.rows.iter().map(|e| e.id.0).collect::<Vec<_>>(),
        vec![2, 3]
    );
}
