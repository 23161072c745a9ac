
use std::path::Path;

use example_document::ExampleDocument;
use pretty_assertions::assert_eq;
use reconcile_sync::{Side, transform, transform_both};

fn get_all_documents() -> Vec<ExampleDocument> {
    ExampleDocument::load_all(Path::new("tests/examples"))
}

#[test]
fn test_edits_apply_to_base() {
    for doc in &get_all_documents() {
        assert!(doc.left().apply(doc.base()).is_ok(), "{}", doc.name());
        assert!(doc.right().apply(doc.base()).is_ok(), "{}", doc.name());
    }
}

#[test]
fn test_convergence() {
    for doc in &get_all_documents() {
        let (left, right) = transform_both(doc.left(), doc.right()).unwrap();

        let after_left = doc.left().apply(doc.base()).unwrap();
        let after_right = doc.right().apply(doc.base()).unwrap();

        doc.assert_eq(&right.apply(&after_left).unwrap());
        doc.assert_eq(&left.apply(&after_right).unwrap());
    }
}

#[test]
fn test_transform_agrees_with_transform_both() {
    for doc in &get_all_documents() {
        let (left, right) = transform_both(doc.left(), doc.right()).unwrap();

        assert_eq!(
            transform(doc.left(), doc.right(), Side::Left).unwrap(),
            left,
            "{}",
            doc.name()
        );
        assert_eq!(
            transform(doc.right(), doc.left(), Side::Right).unwrap(),
            right,
            "{}",
            doc.name()
        );
    }
}

#[test]
fn test_compose_law() {
    for doc in &get_all_documents() {
        let (_, right) = transform_both(doc.left(), doc.right()).unwrap();
        let composed = doc.left().compose(&right);

        doc.assert_eq(&composed.apply(doc.base()).unwrap());
    }
}

#[test]
fn test_invert_law() {
    for doc in &get_all_documents() {
        for op in [doc.left(), doc.right()] {
            let edited = op.apply(doc.base()).unwrap();
            assert_eq!(
                op.invert().apply(&edited).unwrap(),
                doc.base(),
                "{}",
                doc.name()
            );
        }
    }
}
