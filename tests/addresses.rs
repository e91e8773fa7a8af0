//! Address evaluation tests - lines, characters, regex searches, operators

mod common;

use common::{assert_edit, store_with, try_edit};
use structedit::edit::{eval_address, EditError};
use structedit::store::Sel;

fn eval(text: &str, addr: &str, dot: Sel) -> Result<Sel, EditError> {
    let store = store_with(text);
    eval_address(addr, &store, dot)
}

// ========================================================================
// Characters and lines
// ========================================================================

#[test]
fn test_left_right() {
    assert_edit("blah <>bloh", "-#1", "blah<> bloh");
    assert_edit("<>blah bloh", "-#1", "<>blah bloh");
    assert_edit("blah <>bloh", "+#1", "blah b<>loh");
    assert_edit("blah bloh<>", "+#1", "blah bloh<>");
}

#[test]
fn test_up() {
    assert_edit("uno\n<>due\ntre", "-1", "<uno\n>due\ntre");
    assert_edit("<>uno\ndue\ntre", "-1", "<>uno\ndue\ntre");
    assert_edit("uno\nd<u>e\ntre", "-1", "<uno\n>due\ntre");
    assert_edit("u<>no\ndue\ntre", "-1", "<>uno\ndue\ntre");
    assert_edit("uno\n\ntr<>e", "-1", "uno\n<\n>tre");
    assert_edit("\ndu<>e\ntre", "-1", "<\n>due\ntre");
    assert_edit("\n<>due\ntre", "-1", "<\n>due\ntre");
    assert_edit("<>\ndue\ntre", "-1", "<>\ndue\ntre");
}

#[test]
fn test_end_of_line() {
    const END: &str = "+0-#?1";
    assert_edit("pr<>ova\nprova\n", END, "prova<>\nprova\n");
    assert_edit("p<>rova", END, "prova<>");
    assert_edit("pr<>ova\n", END, "prova<>\n");
    assert_edit("prova\n<>\n", END, "prova\n<>\n");
    assert_edit("prova\n\n<>", END, "prova\n\n<>");
}

#[test]
fn test_absolute_addresses() {
    let text = "uno\ndue\ntre";
    let dot = Sel::new(5, 6);
    assert_eq!(eval(text, "0", dot).unwrap(), Sel::point(0));
    assert_eq!(eval(text, "2", dot).unwrap(), Sel::new(4, 8));
    assert_eq!(eval(text, "$", dot).unwrap(), Sel::point(11));
    assert_eq!(eval(text, "#3", dot).unwrap(), Sel::point(3));
    assert_eq!(eval(text, ".", dot).unwrap(), dot);
    assert_eq!(eval(text, "#99", dot).unwrap(), Sel::point(11));
}

#[test]
fn test_comma_covers_whole_store() {
    for (text, dot) in [("", Sel::point(0)), ("abc", Sel::new(1, 2)), ("a\nb\n", Sel::point(4))] {
        let size = text.chars().count();
        assert_eq!(eval(text, ",", dot).unwrap(), Sel::new(0, size));
    }
}

#[test]
fn test_line_ranges() {
    let text = "uno\ndue\ntre";
    assert_eq!(eval(text, "1,2", Sel::point(0)).unwrap(), Sel::new(0, 8));
    assert_eq!(eval(text, "2,", Sel::point(0)).unwrap(), Sel::new(4, 11));
    assert_eq!(eval(text, ",2", Sel::point(0)).unwrap(), Sel::new(0, 8));
}

#[test]
fn test_out_of_order_is_an_error() {
    let err = eval("uno\ndue\ntre", "3,1", Sel::point(0)).unwrap_err();
    assert!(matches!(err, EditError::Address(_)), "{:?}", err);
}

// ========================================================================
// Regex searches
// ========================================================================

#[test]
fn test_regexp_addresses() {
    assert_edit("re blah <>blah re blah", "/re/", "re blah blah <re> blah");
    assert_edit("re blah blah re bla<>h", "?re?", "re blah blah <re> blah");
    assert_edit("a re blah blah <re> blah", "?re?", "a <re> blah blah re blah");
    assert_edit("re blah <>blah re blah", "?re?", "<re> blah blah re blah");
    assert_edit("re blah blah re <>blah re", "/re/", "re blah blah re blah <re>");
}

#[test]
fn test_backward_search() {
    assert_edit("uno\ndue\nt<>re", "-/due/", "uno\n<due>\ntre");
}

#[test]
fn test_search_wraps_around() {
    assert_edit("due uno <>tre", "/due/", "<due> uno tre");
    assert_edit("tre<> uno due", "?due?", "tre uno <due>");
}

#[test]
fn test_search_without_match() {
    let err = try_edit("abc<>", "/x/").unwrap_err();
    assert_eq!(err, EditError::NoMatch("x".to_string()));

    // '@' searches leave dot alone instead of failing
    assert_edit("ab<c>", "/@x/", "ab<c>");
}

#[test]
fn test_absolute_search_starts_at_top() {
    let store = store_with("one two one two");
    let found = eval_address("0/two/", &store, Sel::point(12)).unwrap();
    assert_eq!(found, Sel::new(4, 7));
}

#[test]
fn test_bad_regex_in_address() {
    let err = try_edit("abc<>", "/(ab/").unwrap_err();
    assert!(matches!(err, EditError::Regex(_)), "{:?}", err);
}

// ========================================================================
// Operators
// ========================================================================

#[test]
fn test_semicolon() {
    assert_edit("re blah <blah> re blah", "-#0;+#1", "re blah <b>lah re blah");
}

#[test]
fn test_semicolon_chains_from_left_result() {
    assert_edit("<>a (b c) d", "/\\(/;/\\)/", "a <(b c)> d");
}

#[test]
fn test_comma_evaluates_both_sides_from_dot() {
    assert_edit("x <>a y a z", "/a/,/y/", "x <a y> a z");
}

#[test]
fn test_non_absolute_dot_rejected() {
    let err = try_edit("ab<>c", "+.").unwrap_err();
    assert!(matches!(err, EditError::Address(_) | EditError::Parse(_)), "{:?}", err);
}

// ========================================================================
// Scenarios
// ========================================================================

#[test]
fn test_step_left_scenario() {
    let store = store_with("blah bloh");
    assert_eq!(eval_address("-#1", &store, Sel::point(5)).unwrap(), Sel::point(4));
}

#[test]
fn test_previous_line_scenario() {
    let store = store_with("uno\ndue\ntre");
    assert_eq!(eval_address("-1", &store, Sel::point(4)).unwrap(), Sel::new(0, 4));
}
