//! Dispatcher-level behavior: command routing, policy bookkeeping,
//! find_package resolution, property operations, user commands.

mod common;

use cmeval_events::{DiagSeverity, EventData, TargetPropOp};
use common::{
    count_error_diags_for_command, count_tag, count_target_prop_events,
    count_warning_diags_for_command, run, Sandbox,
};

#[test]
fn directory_and_target_commands_emit_events() {
    let sandbox = Sandbox::new();
    let mut eval = sandbox.evaluator();
    let script = "\
add_definitions(-DLEGACY=1 -fPIC)
add_compile_options(-Wall)
add_executable(app main.c)
target_include_directories(app PRIVATE include)
target_compile_definitions(app PRIVATE APPDEF=1)
target_compile_options(app PRIVATE -Wextra)
";
    run(&mut eval, script);

    assert!(count_tag(&eval, "target_include_directories") > 0);
    assert!(count_tag(&eval, "target_compile_definitions") > 0);
    assert!(count_tag(&eval, "target_compile_options") > 0);

    let has_global = |needle: &str| {
        eval.events().iter().any(|e| match &e.data {
            EventData::GlobalCompileOptions { item }
            | EventData::GlobalCompileDefinitions { item } => item == needle,
            _ => false,
        })
    };
    assert!(has_global("LEGACY=1"));
    assert!(has_global("-fPIC"));
    assert!(has_global("-Wall"));

    // Directory-level state is replayed onto the target declared later.
    let replayed = eval.events().iter().any(|e| match &e.data {
        EventData::TargetCompileDefinitions { target, item, .. } => {
            target == "app" && item == "LEGACY=1"
        }
        _ => false,
    });
    assert!(replayed);
}

#[test]
fn cmake_minimum_required_sets_version_variables() {
    let sandbox = Sandbox::new();
    let mut eval = sandbox.evaluator();
    run(&mut eval, "cmake_minimum_required(VERSION 3.16...3.27)\n");
    assert_eq!(eval.var_get("CMAKE_MINIMUM_REQUIRED_VERSION"), "3.16");
    assert_eq!(eval.var_get("CMAKE_POLICY_VERSION"), "3.27");
    // The sweep gates policies by introduction version.
    assert_eq!(eval.policy_get_effective("CMP0077"), "NEW");
    assert_eq!(eval.policy_get_effective("CMP0124"), "NEW");
}

#[test]
fn cmake_policy_set_get_roundtrip() {
    let sandbox = Sandbox::new();
    let mut eval = sandbox.evaluator();
    run(
        &mut eval,
        "cmake_policy(SET CMP0077 NEW)\ncmake_policy(GET CMP0077 OUT_VAR)\n",
    );
    assert_eq!(eval.var_get("OUT_VAR"), "NEW");
    assert_eq!(eval.report().error_count, 0);
}

#[test]
fn cmake_policy_pop_without_push_is_fatal() {
    let sandbox = Sandbox::new();
    let mut eval = sandbox.evaluator();
    run(&mut eval, "cmake_policy(POP)\nset(AFTER 1)\n");
    assert!(count_error_diags_for_command(&eval, "cmake_policy") >= 1);
    // Evaluation stops; the following statement never runs.
    assert!(!eval.var_defined("AFTER"));
}

#[test]
fn unknown_command_warns_and_continues() {
    let sandbox = Sandbox::new();
    let mut eval = sandbox.evaluator();
    run(&mut eval, "frobnicate_the_build(x)\nset(AFTER 1)\n");
    assert!(eval
        .events()
        .has_diag_cause_containing(DiagSeverity::Warning, "Unknown command"));
    assert_eq!(eval.var_get("AFTER"), "1");
}

#[test]
fn function_scope_is_isolated() {
    let sandbox = Sandbox::new();
    let mut eval = sandbox.evaluator();
    let script = "\
function(set_inner)
set(HIDDEN 1)
set(VISIBLE 1 PARENT_SCOPE)
endfunction()
set_inner()
";
    run(&mut eval, script);
    assert!(!eval.var_defined("HIDDEN"));
    assert_eq!(eval.var_get("VISIBLE"), "1");
}

#[test]
fn function_binds_argc_argv_argn() {
    let sandbox = Sandbox::new();
    let mut eval = sandbox.evaluator();
    let script = "\
function(record first)
set(GOT_ARGC ${ARGC} PARENT_SCOPE)
set(GOT_ARGV \"${ARGV}\" PARENT_SCOPE)
set(GOT_ARGN \"${ARGN}\" PARENT_SCOPE)
set(GOT_FIRST ${first} PARENT_SCOPE)
set(GOT_ARGV1 ${ARGV1} PARENT_SCOPE)
endfunction()
record(a b c)
";
    run(&mut eval, script);
    assert_eq!(eval.var_get("GOT_ARGC"), "3");
    assert_eq!(eval.var_get("GOT_ARGV"), "a;b;c");
    assert_eq!(eval.var_get("GOT_ARGN"), "b;c");
    assert_eq!(eval.var_get("GOT_FIRST"), "a");
    assert_eq!(eval.var_get("GOT_ARGV1"), "b");
}

#[test]
fn macro_leaks_into_caller_scope() {
    let sandbox = Sandbox::new();
    let mut eval = sandbox.evaluator();
    let script = "\
macro(mark name)
set(${name}_marked 1)
endmacro()
mark(lib)
";
    run(&mut eval, script);
    assert_eq!(eval.var_get("lib_marked"), "1");
}

#[test]
fn block_propagate_copies_only_written_vars() {
    let sandbox = Sandbox::new();
    let mut eval = sandbox.evaluator();
    let script = "\
set(OUTER before)
block(PROPAGATE WRITTEN UNTOUCHED)
set(WRITTEN yes)
set(LOCAL 1)
endblock()
";
    run(&mut eval, script);
    assert_eq!(eval.var_get("WRITTEN"), "yes");
    assert!(!eval.var_defined("UNTOUCHED"));
    assert!(!eval.var_defined("LOCAL"));
    assert_eq!(eval.var_get("OUTER"), "before");
}

#[test]
fn endblock_without_block_is_policy_conflict() {
    let sandbox = Sandbox::new();
    let mut eval = sandbox.evaluator();
    run(&mut eval, "endblock()\n");
    assert!(count_error_diags_for_command(&eval, "endblock") == 1);
    assert_eq!(eval.report().policy_conflict_count, 1);
}

#[test]
fn target_redeclaration_is_one_input_error() {
    let sandbox = Sandbox::new();
    let mut eval = sandbox.evaluator();
    run(&mut eval, "add_executable(app main.c)\nadd_executable(app other.c)\n");
    assert_eq!(count_tag(&eval, "target_declare"), 1);
    assert_eq!(count_error_diags_for_command(&eval, "add_executable"), 1);
    assert_eq!(eval.report().input_error_count, 1);
}

#[test]
fn alias_targets_validate_referent() {
    let sandbox = Sandbox::new();
    let mut eval = sandbox.evaluator();
    let script = "\
add_library(core STATIC core.c)
add_library(ns::core ALIAS core)
add_library(ns::again ALIAS ns::core)
";
    run(&mut eval, script);
    assert!(eval.target_known("ns::core"));
    assert!(eval.target_is_alias("ns::core"));
    // Alias-of-alias is rejected.
    assert!(!eval.target_known("ns::again"));
    assert_eq!(count_error_diags_for_command(&eval, "add_library"), 1);
}

#[test]
fn build_shared_libs_selects_default_library_kind() {
    let sandbox = Sandbox::new();
    let mut eval = sandbox.evaluator();
    run(
        &mut eval,
        "add_library(a a.c)\nset(BUILD_SHARED_LIBS ON)\nadd_library(b b.c)\n",
    );
    let kinds: Vec<_> = eval
        .events()
        .iter()
        .filter_map(|e| match &e.data {
            EventData::TargetDeclare { name, kind } => Some((name.clone(), *kind)),
            _ => None,
        })
        .collect();
    assert_eq!(kinds[0].1, cmeval_events::TargetKind::StaticLibrary);
    assert_eq!(kinds[1].1, cmeval_events::TargetKind::SharedLibrary);
}

#[test]
fn set_property_target_ops_map_to_event_ops() {
    let sandbox = Sandbox::new();
    let mut eval = sandbox.evaluator();
    let script = "\
add_executable(t main.c)
set_property(TARGET t APPEND PROPERTY COMPILE_OPTIONS $<$<CONFIG:Debug>:-g>)
set_property(TARGET t APPEND_STRING PROPERTY SUFFIX $<$<CONFIG:Debug>:_d>)
";
    run(&mut eval, script);
    assert_eq!(
        count_target_prop_events(
            &eval,
            "t",
            "COMPILE_OPTIONS",
            "$<$<CONFIG:Debug>:-g>",
            TargetPropOp::AppendList
        ),
        1
    );
    assert_eq!(
        count_target_prop_events(
            &eval,
            "t",
            "SUFFIX",
            "$<$<CONFIG:Debug>:_d>",
            TargetPropOp::AppendString
        ),
        1
    );
}

#[test]
fn set_property_non_target_scope_warns() {
    let sandbox = Sandbox::new();
    let mut eval = sandbox.evaluator();
    run(&mut eval, "set_property(GLOBAL PROPERTY USE_FOLDERS ON)\n");
    assert_eq!(count_warning_diags_for_command(&eval, "set_property"), 1);
}

#[test]
fn find_package_module_mode() {
    let sandbox = Sandbox::new();
    sandbox.write_source_file(
        "cmake/FindDemoPkg.cmake",
        "set(DemoPkg_FOUND 1)\nset(DemoPkg_VERSION 9.1)\n",
    );
    let mut eval = sandbox.evaluator();
    run(
        &mut eval,
        "set(CMAKE_MODULE_PATH cmake)\nfind_package(DemoPkg MODULE REQUIRED)\n",
    );
    assert_eq!(eval.var_get("DemoPkg_FOUND"), "1");
    assert_eq!(eval.var_get("DemoPkg_VERSION"), "9.1");
    assert_eq!(count_tag(&eval, "find_package"), 1);
    assert_eq!(eval.report().error_count, 0);
}

#[test]
fn find_package_preserves_script_set_found() {
    let sandbox = Sandbox::new();
    sandbox.write_source_file("cmake/FindDemoPkg2.cmake", "set(DemoPkg2_FOUND 0)\n");
    let mut eval = sandbox.evaluator();
    run(
        &mut eval,
        "set(CMAKE_MODULE_PATH cmake)\nfind_package(DemoPkg2 MODULE QUIET)\n",
    );
    assert_eq!(eval.var_get("DemoPkg2_FOUND"), "0");
}

#[test]
fn find_package_config_components_and_version() {
    let sandbox = Sandbox::new();
    sandbox.write_source_file(
        "pkg/DemoCfgConfig.cmake",
        "if(\"${DemoCfg_FIND_COMPONENTS}\" STREQUAL \"Core;Net\")\n  set(DemoCfg_FOUND 1)\nelse()\n  set(DemoCfg_FOUND 0)\nendif()\nset(DemoCfg_VERSION 1.2.0)\n",
    );

    let mut eval = sandbox.evaluator();
    run(
        &mut eval,
        "set(CMAKE_PREFIX_PATH pkg)\nfind_package(DemoCfg 1.0 CONFIG COMPONENTS Core Net QUIET)\n",
    );
    assert_eq!(eval.var_get("DemoCfg_FOUND"), "1");

    let mut eval = sandbox.evaluator();
    run(
        &mut eval,
        "set(CMAKE_PREFIX_PATH pkg)\nfind_package(DemoCfg 2.0 EXACT CONFIG QUIET)\n",
    );
    assert_eq!(eval.var_get("DemoCfg_FOUND"), "0");
}

#[test]
fn find_package_config_version_file_can_reject() {
    let sandbox = Sandbox::new();
    sandbox.write_source_file(
        "pkg/DemoVerConfig.cmake",
        "set(DemoVer_FOUND 1)\nset(DemoVer_VERSION 9.9.9)\n",
    );
    sandbox.write_source_file(
        "pkg/DemoVerConfigVersion.cmake",
        "set(PACKAGE_VERSION 9.9.9)\nset(PACKAGE_VERSION_COMPATIBLE FALSE)\nset(PACKAGE_VERSION_EXACT FALSE)\n",
    );
    let mut eval = sandbox.evaluator();
    run(
        &mut eval,
        "set(CMAKE_PREFIX_PATH pkg)\nfind_package(DemoVer 1.0 CONFIG QUIET)\n",
    );
    assert_eq!(eval.var_get("DemoVer_FOUND"), "0");
}

#[test]
fn find_package_required_missing_is_fatal() {
    let sandbox = Sandbox::new();
    let mut eval = sandbox.evaluator();
    run(&mut eval, "find_package(NoSuchPkg REQUIRED)\nset(AFTER 1)\n");
    assert!(count_error_diags_for_command(&eval, "find_package") >= 1);
    assert!(!eval.var_defined("AFTER"));
    let outcome = eval.finish();
    assert_eq!(
        outcome.report.overall_status,
        cmeval_events::OverallStatus::Fatal
    );
}

#[test]
fn genex_cycle_guard_reports_error() {
    let sandbox = Sandbox::new();
    let mut eval = sandbox.evaluator();
    let script = "\
add_executable(t main.c)
set_target_properties(t PROPERTIES P1 $<TARGET_PROPERTY:t,P2> P2 $<TARGET_PROPERTY:t,P1>)
set(L $<TARGET_PROPERTY:t,P1>)
if(x IN_LIST L)
endif()
";
    run(&mut eval, script);
    assert!(eval
        .events()
        .has_diag_cause_containing(DiagSeverity::Error, "cycle guard"));
}

#[test]
fn message_fatal_error_stops_evaluation() {
    let sandbox = Sandbox::new();
    let mut eval = sandbox.evaluator();
    run(&mut eval, "message(FATAL_ERROR \"boom\")\nset(AFTER 1)\n");
    assert!(!eval.var_defined("AFTER"));
    let outcome = eval.finish();
    assert_eq!(
        outcome.report.overall_status,
        cmeval_events::OverallStatus::Fatal
    );
}

#[test]
fn message_deprecation_gates_on_variables() {
    let sandbox = Sandbox::new();
    let mut eval = sandbox.evaluator();
    run(&mut eval, "message(DEPRECATION \"old api\")\n");
    assert_eq!(eval.report().warning_count, 1);

    let mut eval = sandbox.evaluator();
    run(
        &mut eval,
        "set(CMAKE_WARN_DEPRECATED OFF)\nmessage(DEPRECATION \"old api\")\n",
    );
    assert_eq!(eval.report().warning_count, 0);

    let mut eval = sandbox.evaluator();
    run(
        &mut eval,
        "set(CMAKE_ERROR_DEPRECATED ON)\nmessage(DEPRECATION \"old api\")\n",
    );
    assert_eq!(eval.report().error_count, 1);

    // A -NOTFOUND value is false, so the error gate stays closed.
    let mut eval = sandbox.evaluator();
    run(
        &mut eval,
        "set(CMAKE_ERROR_DEPRECATED dep-NOTFOUND)\nmessage(DEPRECATION \"old api\")\n",
    );
    assert_eq!(eval.report().error_count, 0);
    assert_eq!(eval.report().warning_count, 1);
}

#[test]
fn message_check_stack_pairs_start_and_result() {
    let sandbox = Sandbox::new();
    let mut eval = sandbox.evaluator();
    run(
        &mut eval,
        "message(CHECK_START \"Looking for things\")\nmessage(CHECK_PASS \"found\")\nmessage(CHECK_FAIL \"oops\")\n",
    );
    // The second pop has no matching start.
    assert_eq!(count_error_diags_for_command(&eval, "message"), 1);
}

#[test]
fn user_command_shadows_builtin() {
    let sandbox = Sandbox::new();
    let mut eval = sandbox.evaluator();
    let script = "\
function(install)
set(SHADOWED 1 PARENT_SCOPE)
endfunction()
install(FILES a DESTINATION b)
";
    run(&mut eval, script);
    assert_eq!(eval.var_get("SHADOWED"), "1");
    assert_eq!(count_tag(&eval, "install_add_rule"), 0);
}
