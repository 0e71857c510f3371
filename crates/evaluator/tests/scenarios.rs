//! End-to-end scenarios covering the evaluator's contract surface:
//! expansion, target declaration, install mapping, file security, genex
//! preservation, and policy scoping.

mod common;

use cmeval_events::{DiagSeverity, EventData, InstallRuleKind, TargetKind, TargetPropOp};
use common::{run, Sandbox};

#[test]
fn set_and_expand_through_foreach() {
    let sandbox = Sandbox::new();
    let mut eval = sandbox.evaluator();
    run(
        &mut eval,
        "set(A \"b;c\")\nforeach(x IN LISTS A)\nset(${x}_seen 1)\nendforeach()\n",
    );
    assert_eq!(eval.var_get("b_seen"), "1");
    assert_eq!(eval.var_get("c_seen"), "1");
}

#[test]
fn target_declaration_event_order() {
    let sandbox = Sandbox::new();
    let mut eval = sandbox.evaluator();
    run(&mut eval, "project(p)\nadd_executable(app main.c extra.c)\n");

    let events = eval.events().as_slice();
    assert_eq!(events.len(), 4);
    assert!(matches!(
        &events[0].data,
        EventData::ProjectDeclare { name, .. } if name == "p"
    ));
    assert!(matches!(
        &events[1].data,
        EventData::TargetDeclare { name, kind: TargetKind::Executable } if name == "app"
    ));
    assert!(matches!(
        &events[2].data,
        EventData::TargetAddSource { target, path } if target == "app" && path == "main.c"
    ));
    assert!(matches!(
        &events[3].data,
        EventData::TargetAddSource { target, path } if target == "app" && path == "extra.c"
    ));
    assert_eq!(eval.known_target_names(), ["app"]);
}

#[test]
fn install_type_maps_to_gnu_destination() {
    let sandbox = Sandbox::new();
    let mut eval = sandbox.evaluator();
    run(&mut eval, "install(FILES a.h b.h TYPE INCLUDE)\n");

    let rules: Vec<_> = eval
        .events()
        .iter()
        .filter_map(|e| match &e.data {
            EventData::InstallAddRule {
                kind,
                item,
                destination,
            } => Some((*kind, item.clone(), destination.clone())),
            _ => None,
        })
        .collect();
    assert_eq!(
        rules,
        vec![
            (InstallRuleKind::File, "a.h".to_string(), "include".to_string()),
            (InstallRuleKind::File, "b.h".to_string(), "include".to_string()),
        ]
    );
}

#[cfg(unix)]
#[test]
fn file_read_outside_roots_is_rejected() {
    let sandbox = Sandbox::new();
    let mut eval = sandbox.evaluator();
    run(&mut eval, "file(READ /etc/passwd OUT)\n");

    assert!(!eval.var_defined("OUT"));
    let security_errors: Vec<_> = eval
        .events()
        .diagnostics()
        .filter(|(_, d)| {
            d.severity == DiagSeverity::Error
                && d.command == "file"
                && d.cause.contains("Security Violation")
        })
        .collect();
    assert_eq!(security_errors.len(), 1);
}

#[test]
fn genex_values_are_preserved_byte_for_byte() {
    let sandbox = Sandbox::new();
    let mut eval = sandbox.evaluator();
    run(
        &mut eval,
        "add_executable(t main.c)\nset_target_properties(t PROPERTIES MY_PROP $<$<CONFIG:Debug>:A;B>)\n",
    );
    assert_eq!(
        common::count_target_prop_events(
            &eval,
            "t",
            "MY_PROP",
            "$<$<CONFIG:Debug>:A;B>",
            TargetPropOp::Set
        ),
        1
    );
}

#[test]
fn policy_set_does_not_survive_pop() {
    let sandbox = Sandbox::new();
    let mut eval = sandbox.evaluator();
    run(
        &mut eval,
        "cmake_policy(PUSH)\ncmake_policy(SET CMP0077 NEW)\ncmake_policy(POP)\ncmake_policy(GET CMP0077 X)\n",
    );
    // No cmake_minimum_required ran, so the gate falls back to the
    // pre-switch default.
    assert_eq!(eval.var_get("X"), "OLD");
}
