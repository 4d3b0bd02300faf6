use std::collections::BTreeSet;

use tessera_kernel::{DataFile, SnapshotId, Table, TableConfig, TableError};

fn file(name: &str) -> DataFile {
    DataFile::builder(format!("/path/to/data-{name}.parquet"))
        .with_partition_value(name)
        .with_size_bytes(10)
        .with_record_count(1)
        .build()
}

fn table() -> Table {
    Table::new(TableConfig::default().with_min_merge_count(2)).unwrap()
}

fn id(id: u64) -> SnapshotId {
    SnapshotId::new(id)
}

fn between(table: &Table, from: u64, to: u64) -> Result<BTreeSet<DataFile>, TableError> {
    table.new_scan().appends_between(id(from), id(to)).plan_files()
}

fn after(table: &Table, from: u64) -> BTreeSet<DataFile> {
    table.new_scan().appends_after(id(from)).plan_files().unwrap()
}

fn files(names: &[&str]) -> BTreeSet<DataFile> {
    names.iter().map(|name| file(name)).collect()
}

fn append(table: &Table, name: &str) -> SnapshotId {
    table.new_append().append_file(file(name)).commit().unwrap().id()
}

#[test]
fn appends_rewrites_deletes_and_overwrite() {
    let table = table();
    for name in ["a", "b", "c", "d", "e"] {
        append(&table, name);
    }
    assert_eq!(between(&table, 1, 5).unwrap(), files(&["b", "c", "d", "e"]));
    assert_eq!(between(&table, 2, 5).unwrap(), files(&["c", "d", "e"]));

    let rewrite = table
        .new_rewrite()
        .rewrite_files(
            vec![file("a"), file("b"), file("c")],
            vec![file("f"), file("g")],
        )
        .commit()
        .unwrap();
    assert_eq!(rewrite.id(), id(6));
    assert_eq!(between(&table, 1, 6).unwrap(), files(&["b", "c", "d", "e"]));
    assert_eq!(between(&table, 4, 6).unwrap(), files(&["e"]));
    assert!(between(&table, 5, 6).unwrap().is_empty());

    let delete = table.new_delete().delete_file(&file("d")).commit().unwrap();
    assert_eq!(delete.id(), id(7));
    assert!(between(&table, 5, 7).unwrap().is_empty());
    assert!(between(&table, 6, 7).unwrap().is_empty());

    assert_eq!(append(&table, "i"), id(8));
    assert_eq!(
        between(&table, 1, 8).unwrap(),
        files(&["b", "c", "d", "e", "i"])
    );
    assert_eq!(between(&table, 6, 8).unwrap(), files(&["i"]));
    assert_eq!(between(&table, 7, 8).unwrap(), files(&["i"]));

    let overwrite = table
        .new_overwrite()
        .add_file(file("h"))
        .delete_file(&file("e"))
        .commit()
        .unwrap();
    assert_eq!(overwrite.id(), id(9));

    let err = between(&table, 8, 9).unwrap_err();
    assert_eq!(
        err.to_string(),
        "found overwrite operation in snapshot 9, cannot support incremental data in snapshots (8, 9]"
    );
    assert!(matches!(
        between(&table, 1, 9),
        Err(TableError::UnsupportedIncrementalOperation { .. })
    ));

    let live: Vec<_> = table
        .new_scan()
        .plan_files()
        .unwrap()
        .into_iter()
        .map(|f| f.path().to_string())
        .collect();
    assert_eq!(
        live,
        vec![
            "/path/to/data-f.parquet",
            "/path/to/data-g.parquet",
            "/path/to/data-h.parquet",
            "/path/to/data-i.parquet",
        ]
    );
}

#[test]
fn same_history_committed_through_transactions() {
    let table = table();

    let mut txn = table.new_transaction().unwrap();
    for name in ["a", "b", "c", "d", "e"] {
        txn.new_append().append_file(file(name)).commit().unwrap();
    }
    assert_eq!(txn.commit_transaction().unwrap().len(), 5);
    assert_eq!(between(&table, 1, 5).unwrap(), files(&["b", "c", "d", "e"]));
    assert_eq!(between(&table, 2, 5).unwrap(), files(&["c", "d", "e"]));

    let mut txn = table.new_transaction().unwrap();
    txn.new_rewrite()
        .rewrite_files(
            vec![file("a"), file("b"), file("c")],
            vec![file("f"), file("g")],
        )
        .commit()
        .unwrap();
    txn.new_delete().delete_file(&file("d")).commit().unwrap();
    txn.new_append().append_file(file("i")).commit().unwrap();
    let published = txn.commit_transaction().unwrap();
    assert_eq!(
        published.iter().map(|s| s.id()).collect::<Vec<_>>(),
        vec![id(6), id(7), id(8)]
    );

    assert_eq!(between(&table, 1, 6).unwrap(), files(&["b", "c", "d", "e"]));
    assert!(between(&table, 5, 7).unwrap().is_empty());
    assert_eq!(
        between(&table, 1, 8).unwrap(),
        files(&["b", "c", "d", "e", "i"])
    );
    assert_eq!(between(&table, 7, 8).unwrap(), files(&["i"]));

    let mut txn = table.new_transaction().unwrap();
    txn.new_overwrite()
        .add_file(file("h"))
        .delete_file(&file("e"))
        .commit()
        .unwrap();
    txn.commit_transaction().unwrap();

    assert!(matches!(
        between(&table, 8, 9),
        Err(TableError::UnsupportedIncrementalOperation { snapshot_id, .. }) if snapshot_id == id(9)
    ));
}

#[test]
fn rollback_abandons_branches() {
    let table = table();
    for name in ["a", "b", "c"] {
        append(&table, name);
    }

    table.rollback_to(id(2)).unwrap();
    assert_eq!(between(&table, 1, 2).unwrap(), files(&["b"]));
    assert_eq!(after(&table, 1), files(&["b"]));

    let mut txn = table.new_transaction().unwrap();
    for name in ["d", "e", "f"] {
        txn.new_append().append_file(file(name)).commit().unwrap();
    }
    let published = txn.commit_transaction().unwrap();
    assert_eq!(published[0].id(), id(4));
    assert_eq!(published[0].parent_id(), Some(id(2)));

    table.rollback_to(id(5)).unwrap();
    assert_eq!(between(&table, 1, 5).unwrap(), files(&["b", "d", "e"]));
    assert_eq!(after(&table, 1), files(&["b", "d", "e"]));
    assert_eq!(after(&table, 2), files(&["d", "e"]));

    // The abandoned snapshot is still addressable but not an ancestor.
    assert_eq!(
        between(&table, 3, 5).unwrap_err(),
        TableError::UnreachableAncestor {
            from: id(3),
            to: id(5),
        }
    );
    assert_eq!(between(&table, 2, 3).unwrap(), files(&["c"]));
    assert_eq!(between(&table, 1, 6).unwrap(), files(&["b", "d", "e", "f"]));
}

#[test]
fn zero_length_and_unknown_ranges() {
    let table = table();
    append(&table, "a");
    append(&table, "b");

    assert!(matches!(
        between(&table, 1, 1),
        Err(TableError::InvalidRange(_))
    ));
    assert_eq!(
        between(&table, 1, 42).unwrap_err(),
        TableError::SnapshotNotFound(id(42))
    );
    assert_eq!(
        between(&table, 42, 2).unwrap_err(),
        TableError::SnapshotNotFound(id(42))
    );
}

#[test]
fn tasks_record_the_appending_snapshot() {
    let table = table();
    append(&table, "a");
    append(&table, "b");
    table
        .new_append()
        .append_files(vec![file("c"), file("d")])
        .commit()
        .unwrap();

    let scan = table.new_scan().appends_between(id(1), id(3));
    let tasks: Vec<_> = scan
        .plan_tasks()
        .unwrap()
        .into_iter()
        .map(|task| (task.snapshot_id.get(), task.file.path().to_string()))
        .collect();
    assert_eq!(
        tasks,
        vec![
            (2, "/path/to/data-b.parquet".to_string()),
            (3, "/path/to/data-c.parquet".to_string()),
            (3, "/path/to/data-d.parquet".to_string()),
        ]
    );

    let chain: Vec<_> = scan.snapshots().unwrap().iter().map(|s| s.id()).collect();
    assert_eq!(chain, vec![id(3), id(2)]);
}

#[test]
fn merge_threshold_never_changes_results() {
    let merging = table();
    let unmerged = Table::new(TableConfig::default()).unwrap();

    for table in [&merging, &unmerged] {
        for name in ["a", "b", "c", "d"] {
            append(table, name);
        }
        table.new_delete().delete_file(&file("b")).commit().unwrap();
        append(table, "e");
    }

    let current = merging.current_snapshot().unwrap().unwrap();
    assert!(current.manifests().len() < 3);
    let current = unmerged.current_snapshot().unwrap().unwrap();
    assert!(current.manifests().len() >= 4);

    for (from, to) in [(1, 4), (1, 6), (4, 6), (5, 6)] {
        assert_eq!(
            between(&merging, from, to).unwrap(),
            between(&unmerged, from, to).unwrap()
        );
    }
    assert_eq!(
        merging.new_scan().plan_files().unwrap(),
        unmerged.new_scan().plan_files().unwrap()
    );
}
