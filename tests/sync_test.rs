use ironlog_lib::{merge_by_id, HasId, Program};

fn program(id: &str, name: &str) -> Program {
    let mut p = Program::new(name, vec![]);
    p.id = id.to_string();
    p
}

#[test]
fn test_merge_local_wins_on_id_collision() {
    // Local has A(1) and B(2); remote has a *different* A(1) and a new
    // C(3). The local A must win; remote only contributes C.
    let local = vec![program("1", "A-local"), program("2", "B")];
    let remote = vec![program("1", "A-remote"), program("3", "C")];

    let merged = merge_by_id(&local, remote);

    assert_eq!(merged.len(), 3);
    assert_eq!(merged[0].id, "1");
    assert_eq!(merged[0].name, "A-local");
    assert_eq!(merged[1].id, "2");
    assert_eq!(merged[2].id, "3");
    assert_eq!(merged[2].name, "C");
}

#[test]
fn test_merge_with_empty_remote_is_identity() {
    let local = vec![program("1", "A"), program("2", "B")];
    let merged = merge_by_id(&local, vec![]);
    assert_eq!(merged, local);
}

#[test]
fn test_merge_with_empty_local_pulls_everything() {
    let remote = vec![program("1", "A"), program("2", "B")];
    let merged = merge_by_id(&[] as &[Program], remote.clone());
    assert_eq!(merged, remote);
}

#[test]
fn test_merge_preserves_local_order_and_appends_remote() {
    let local = vec![program("2", "B"), program("1", "A")];
    let remote = vec![program("1", "A"), program("4", "D"), program("3", "C")];

    let merged = merge_by_id(&local, remote);

    let ids: Vec<&str> = merged.iter().map(HasId::entity_id).collect();
    assert_eq!(ids, vec!["2", "1", "4", "3"]);
}
