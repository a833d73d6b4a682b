//! End-to-end scenarios driving Generator, Comparator, and Printer together against
//! hermetic temp-directory trees, mirroring the numbered scenarios in the design doc.

use fcheck::comparator::Comparator;
use fcheck::generator::Generator;
use fcheck::printer::Printer;
use fcheck::store::RecordReader;

fn generate(root: &std::path::Path, db: &std::path::Path) {
    let mut gen = Generator::new(db.to_path_buf(), 2);
    gen.start().unwrap();
    gen.start_walking(&root.to_string_lossy(), &[], false).unwrap();
    gen.stop().unwrap();
}

#[test]
fn generate_then_compare_reports_no_changes() {
    let tree = tempfile::tempdir().unwrap();
    std::fs::write(tree.path().join("a"), b"alpha").unwrap();
    std::fs::write(tree.path().join("b"), b"beta").unwrap();
    let db_dir = tempfile::tempdir().unwrap();
    let db = db_dir.path().join("fcheck.db");
    generate(tree.path(), &db);

    let mut cmp = Comparator::new(db, 2);
    cmp.start().unwrap();
    cmp.start_walking(&tree.path().to_string_lossy(), &[], false)
        .unwrap();
    cmp.stop().unwrap();

    let report = cmp.report();
    assert_eq!(report.new_files.len(), 0);
    assert_eq!(report.changed_files.len(), 0);
    assert_eq!(report.removed_files.len(), 0);
}

#[test]
fn compare_against_nonexistent_root_reports_nothing_and_no_error() {
    let tree = tempfile::tempdir().unwrap();
    std::fs::write(tree.path().join("a"), b"alpha").unwrap();
    let db_dir = tempfile::tempdir().unwrap();
    let db = db_dir.path().join("fcheck.db");
    generate(tree.path(), &db);

    let mut cmp = Comparator::new(db, 2);
    cmp.start().unwrap();
    let bogus = tree.path().join("does-not-exist-at-all");
    cmp.start_walking(&bogus.to_string_lossy(), &[], false)
        .unwrap();
    cmp.stop().unwrap();

    let report = cmp.report();
    assert_eq!(report.new_files.len(), 0);
    assert_eq!(report.changed_files.len(), 0);
    assert_eq!(report.removed_files.len(), 0);
}

#[test]
fn comparing_against_a_different_tree_reports_all_new() {
    let tree_a = tempfile::tempdir().unwrap();
    std::fs::write(tree_a.path().join("a"), b"alpha").unwrap();
    let db_dir = tempfile::tempdir().unwrap();
    let db = db_dir.path().join("fcheck.db");
    generate(tree_a.path(), &db);

    let tree_b = tempfile::tempdir().unwrap();
    std::fs::write(tree_b.path().join("x"), b"xray").unwrap();
    std::fs::write(tree_b.path().join("y"), b"yankee").unwrap();

    let mut cmp = Comparator::new(db, 2);
    cmp.start().unwrap();
    cmp.start_walking(&tree_b.path().to_string_lossy(), &[], false)
        .unwrap();
    cmp.stop().unwrap();

    let report = cmp.report();
    assert!(report.new_files.len() >= 2);
    assert_eq!(report.changed_files.len(), 0);
}

#[test]
fn printer_honours_exclusion_list() {
    let tree = tempfile::tempdir().unwrap();
    std::fs::write(tree.path().join("a"), b"alpha").unwrap();
    std::fs::write(tree.path().join("b"), b"beta").unwrap();
    let db_dir = tempfile::tempdir().unwrap();
    let db = db_dir.path().join("fcheck.db");
    generate(tree.path(), &db);

    let excluded = tree.path().join("b").to_string_lossy().into_owned();
    let reader = RecordReader::open(&db).unwrap();
    let mut seen = Vec::new();
    reader
        .map_prefix(&tree.path().to_string_lossy(), |r| seen.push(r.path.clone()))
        .unwrap();
    assert!(seen.contains(&excluded));

    let mut printer = Printer::new(db);
    printer.start().unwrap();
    printer
        .start_walking(&tree.path().to_string_lossy(), &[excluded])
        .unwrap();
    printer.stop().unwrap();
}

#[test]
fn full_lifecycle_detects_every_kind_of_drift() {
    let tree = tempfile::tempdir().unwrap();
    std::fs::write(tree.path().join("keep"), b"stays the same").unwrap();
    std::fs::write(tree.path().join("edit"), b"before").unwrap();
    std::fs::write(tree.path().join("gone"), b"will vanish").unwrap();
    let db_dir = tempfile::tempdir().unwrap();
    let db = db_dir.path().join("fcheck.db");
    generate(tree.path(), &db);

    std::thread::sleep(std::time::Duration::from_millis(10));
    std::fs::write(tree.path().join("edit"), b"after").unwrap();
    std::fs::remove_file(tree.path().join("gone")).unwrap();
    std::fs::write(tree.path().join("fresh"), b"brand new").unwrap();

    let mut cmp = Comparator::new(db, 2);
    cmp.start().unwrap();
    cmp.start_walking(&tree.path().to_string_lossy(), &[], false)
        .unwrap();
    cmp.stop().unwrap();

    let report = cmp.report();
    let edit_path = tree.path().join("edit").to_string_lossy().into_owned();
    let gone_path = tree.path().join("gone").to_string_lossy().into_owned();
    let fresh_path = tree.path().join("fresh").to_string_lossy().into_owned();

    assert!(report.changed_files.contains(&edit_path));
    assert!(report.removed_files.contains(&gone_path));
    assert!(report.new_files.contains(&fresh_path));
    let keep_path = tree.path().join("keep").to_string_lossy().into_owned();
    assert!(!report.changed_files.contains(&keep_path));
}
