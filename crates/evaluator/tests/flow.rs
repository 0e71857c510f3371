//! Loop, scope, and nested-file flow semantics.

mod common;

use common::{count_error_diags_for_command, run, Sandbox};

#[test]
fn foreach_range_forms() {
    let sandbox = Sandbox::new();
    let mut eval = sandbox.evaluator();
    let script = "\
set(SUM 0)
foreach(i RANGE 3)
math(EXPR SUM \"${SUM} + ${i}\")
endforeach()
foreach(j RANGE 2 6 2)
math(EXPR SUM \"${SUM} + ${j}\")
endforeach()
";
    run(&mut eval, script);
    // 0+1+2+3 plus 2+4+6.
    assert_eq!(eval.var_get("SUM"), "18");
}

#[test]
fn foreach_in_items_and_lists_mix() {
    let sandbox = Sandbox::new();
    let mut eval = sandbox.evaluator();
    let script = "\
set(L one;two)
set(OUT \"\")
foreach(x IN LISTS L ITEMS three)
set(OUT \"${OUT}${x},\")
endforeach()
";
    run(&mut eval, script);
    assert_eq!(eval.var_get("OUT"), "one,two,three,");
}

#[test]
fn foreach_zip_lists_binds_indexed_vars() {
    let sandbox = Sandbox::new();
    let mut eval = sandbox.evaluator();
    let script = "\
set(NAMES a;b)
set(VALUES 1;2;3)
set(OUT \"\")
foreach(pair IN ZIP_LISTS NAMES VALUES)
set(OUT \"${OUT}${pair_0}=${pair_1};\")
endforeach()
";
    run(&mut eval, script);
    assert_eq!(eval.var_get("OUT"), "a=1;b=2;=3;");
}

#[test]
fn break_and_continue_inside_loops() {
    let sandbox = Sandbox::new();
    let mut eval = sandbox.evaluator();
    let script = "\
set(OUT \"\")
foreach(i RANGE 1 10)
if(${i} EQUAL 3)
continue()
endif()
if(${i} GREATER 5)
break()
endif()
set(OUT \"${OUT}${i}\")
endforeach()
";
    run(&mut eval, script);
    assert_eq!(eval.var_get("OUT"), "1245");
}

#[test]
fn break_outside_loop_is_input_error() {
    let sandbox = Sandbox::new();
    let mut eval = sandbox.evaluator();
    run(&mut eval, "break()\n");
    assert_eq!(count_error_diags_for_command(&eval, "break"), 1);
}

#[test]
fn while_countdown_terminates() {
    let sandbox = Sandbox::new();
    let mut eval = sandbox.evaluator();
    let script = "\
set(N 5)
set(TICKS \"\")
while(${N} GREATER 0)
set(TICKS \"${TICKS}x\")
math(EXPR N \"${N} - 1\")
endwhile()
";
    run(&mut eval, script);
    assert_eq!(eval.var_get("TICKS"), "xxxxx");
    assert_eq!(eval.var_get("N"), "0");
}

#[test]
fn return_skips_rest_of_file() {
    let sandbox = Sandbox::new();
    let mut eval = sandbox.evaluator();
    run(&mut eval, "set(BEFORE 1)\nreturn()\nset(AFTER 1)\n");
    assert_eq!(eval.var_get("BEFORE"), "1");
    assert!(!eval.var_defined("AFTER"));
}

#[test]
fn return_in_macro_propagates_to_caller_file() {
    let sandbox = Sandbox::new();
    let mut eval = sandbox.evaluator();
    let script = "\
macro(bail)
return()
endmacro()
function(safe)
bail()
endfunction()
safe()
set(AFTER_FN 1)
bail()
set(AFTER_MACRO 1)
";
    run(&mut eval, script);
    // return() inside the macro unwinds the calling function, not the
    // file; called at file level it ends the file.
    assert_eq!(eval.var_get("AFTER_FN"), "1");
    assert!(!eval.var_defined("AFTER_MACRO"));
}

#[test]
fn include_shares_scope_and_subdirectory_pushes() {
    let sandbox = Sandbox::new();
    sandbox.write_source_file("helper.cmake", "set(FROM_INCLUDE 1)\n");
    sandbox.write_source_file(
        "sub/CMakeLists.txt",
        "set(FROM_SUBDIR 1)\nset(SHARED up PARENT_SCOPE)\nset(SUB_SRC \"${CMAKE_CURRENT_SOURCE_DIR}\")\n",
    );
    let mut eval = sandbox.evaluator();
    let script = "\
include(helper.cmake)
add_subdirectory(sub)
set(MAIN_SRC \"${CMAKE_CURRENT_SOURCE_DIR}\")
";
    run(&mut eval, script);

    // include() writes straight into our scope.
    assert_eq!(eval.var_get("FROM_INCLUDE"), "1");
    // add_subdirectory() scope ended; only PARENT_SCOPE writes survive.
    assert!(!eval.var_defined("FROM_SUBDIR"));
    assert_eq!(eval.var_get("SHARED"), "up");
    // Current dirs were swapped for the nested run and restored after.
    assert!(eval.var_get("MAIN_SRC").ends_with("/src"));
}

#[test]
fn include_missing_file_errors_unless_optional() {
    let sandbox = Sandbox::new();
    let mut eval = sandbox.evaluator();
    run(
        &mut eval,
        "include(missing.cmake OPTIONAL RESULT_VARIABLE R1)\ninclude(missing.cmake RESULT_VARIABLE R2)\n",
    );
    assert_eq!(eval.var_get("R1"), "NOTFOUND");
    assert_eq!(eval.var_get("R2"), "NOTFOUND");
    assert_eq!(count_error_diags_for_command(&eval, "include"), 1);
}

#[test]
fn include_guard_stops_second_evaluation() {
    let sandbox = Sandbox::new();
    sandbox.write_source_file(
        "guarded.cmake",
        "include_guard()\nmath(EXPR TIMES \"${TIMES} + 1\")\nset(TIMES ${TIMES})\n",
    );
    let mut eval = sandbox.evaluator();
    run(
        &mut eval,
        "set(TIMES 0)\ninclude(guarded.cmake)\ninclude(guarded.cmake)\n",
    );
    assert_eq!(eval.var_get("TIMES"), "1");
}

#[test]
fn nested_function_scopes_unwind() {
    let sandbox = Sandbox::new();
    let mut eval = sandbox.evaluator();
    let script = "\
function(outer)
function(inner)
set(DEPTH inner PARENT_SCOPE)
endfunction()
inner()
set(SEEN_IN_OUTER ${DEPTH} PARENT_SCOPE)
endfunction()
outer()
";
    run(&mut eval, script);
    assert_eq!(eval.var_get("SEEN_IN_OUTER"), "inner");
    assert!(!eval.var_defined("DEPTH"));
}
