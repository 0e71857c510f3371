//! Block-structure parser
//!
//! Pairs `if`/`foreach`/`while`/`function`/`macro` openers with their
//! `end*` counterparts and nests bodies. Everything else, including
//! `block`/`endblock`, passes through as a plain command node.

use std::iter::Peekable;
use std::vec::IntoIter;

use cmeval_errors::ParseError;

use crate::ast::{
    Arg, CommandNode, ForEachNode, IfBranch, IfNode, Node, ScriptFile, UserCommandDefNode,
    WhileNode,
};
use crate::lexer::{lex, RawCommand};

type Commands = Peekable<IntoIter<RawCommand>>;

/// Parse a whole script into structured nodes.
pub fn parse_script(source: &str, path: &str) -> Result<ScriptFile, ParseError> {
    let raw = lex(source, path)?;
    let mut cmds = raw.into_iter().peekable();
    let nodes = parse_sequence(&mut cmds, path, &[])?;
    // parse_sequence with no terminators consumes everything, so a
    // leftover command here is a stray end keyword.
    if let Some(stray) = cmds.next() {
        return Err(ParseError::UnmatchedBlockEnd {
            start: opener_for_end(&stray.name).unwrap_or("block").to_string(),
            end: stray.name,
            file: path.to_string(),
            line: stray.line,
        });
    }
    Ok(ScriptFile {
        path: path.to_string(),
        nodes,
    })
}

fn opener_for_end(end: &str) -> Option<&'static str> {
    match end.to_ascii_lowercase().as_str() {
        "endif" | "elseif" | "else" => Some("if"),
        "endforeach" => Some("foreach"),
        "endwhile" => Some("while"),
        "endfunction" => Some("function"),
        "endmacro" => Some("macro"),
        _ => None,
    }
}

fn is_terminator(name: &str, terminators: &[&str]) -> bool {
    terminators.iter().any(|t| name.eq_ignore_ascii_case(t))
}

/// Parse nodes until one of `terminators` is seen (left unconsumed) or
/// input ends. With no terminators this consumes the full sequence but
/// stops at stray end keywords so the caller can report them.
fn parse_sequence(
    cmds: &mut Commands,
    path: &str,
    terminators: &[&str],
) -> Result<Vec<Node>, ParseError> {
    let mut nodes = Vec::new();
    while let Some(next) = cmds.peek() {
        let name = next.name.to_ascii_lowercase();
        if is_terminator(&name, terminators) {
            break;
        }
        if terminators.is_empty() && opener_for_end(&name).is_some() {
            // Stray end keyword at this nesting level; caller reports it.
            break;
        }
        let cmd = cmds.next().expect("peeked command");
        nodes.push(parse_one(cmd, cmds, path)?);
    }
    Ok(nodes)
}

fn expect_end(
    cmds: &mut Commands,
    path: &str,
    opener: &RawCommand,
    end: &str,
) -> Result<RawCommand, ParseError> {
    match cmds.next() {
        Some(cmd) if cmd.name.eq_ignore_ascii_case(end) => Ok(cmd),
        _ => Err(ParseError::UnclosedBlock {
            start: opener.name.to_ascii_lowercase(),
            end: end.to_string(),
            file: path.to_string(),
            line: opener.line,
        }),
    }
}

fn parse_one(cmd: RawCommand, cmds: &mut Commands, path: &str) -> Result<Node, ParseError> {
    match cmd.name.to_ascii_lowercase().as_str() {
        "if" => parse_if(cmd, cmds, path),
        "foreach" => {
            let body = parse_sequence(cmds, path, &["endforeach"])?;
            expect_end(cmds, path, &cmd, "endforeach")?;
            Ok(Node::ForEach(ForEachNode {
                args: cmd.args,
                body,
                line: cmd.line,
            }))
        }
        "while" => {
            let body = parse_sequence(cmds, path, &["endwhile"])?;
            expect_end(cmds, path, &cmd, "endwhile")?;
            Ok(Node::While(WhileNode {
                condition: cmd.args,
                body,
                line: cmd.line,
            }))
        }
        "function" => {
            let body = parse_sequence(cmds, path, &["endfunction"])?;
            expect_end(cmds, path, &cmd, "endfunction")?;
            Ok(Node::FunctionDef(UserCommandDefNode {
                args: cmd.args,
                body,
                line: cmd.line,
            }))
        }
        "macro" => {
            let body = parse_sequence(cmds, path, &["endmacro"])?;
            expect_end(cmds, path, &cmd, "endmacro")?;
            Ok(Node::MacroDef(UserCommandDefNode {
                args: cmd.args,
                body,
                line: cmd.line,
            }))
        }
        _ => Ok(Node::Command(CommandNode {
            name: cmd.name,
            args: cmd.args,
            line: cmd.line,
        })),
    }
}

fn parse_if(opener: RawCommand, cmds: &mut Commands, path: &str) -> Result<Node, ParseError> {
    let line = opener.line;
    let mut branches = Vec::new();
    let mut else_body = Vec::new();

    let mut condition: Vec<Arg> = opener.args.clone();
    let mut branch_line = opener.line;
    let mut seen_else = false;

    loop {
        let body = parse_sequence(cmds, path, &["elseif", "else", "endif"])?;
        let Some(end) = cmds.next() else {
            return Err(ParseError::UnclosedBlock {
                start: "if".to_string(),
                end: "endif".to_string(),
                file: path.to_string(),
                line,
            });
        };

        if seen_else {
            else_body = body;
            // Only endif may follow the else body.
            if end.name.eq_ignore_ascii_case("endif") {
                break;
            }
            return Err(ParseError::UnmatchedBlockEnd {
                start: "if".to_string(),
                end: end.name.to_ascii_lowercase(),
                file: path.to_string(),
                line: end.line,
            });
        }

        branches.push(IfBranch {
            condition: std::mem::take(&mut condition),
            line: branch_line,
            body,
        });

        match end.name.to_ascii_lowercase().as_str() {
            "endif" => break,
            "elseif" => {
                condition = end.args;
                branch_line = end.line;
            }
            "else" => {
                seen_else = true;
            }
            _ => unreachable!("terminator set"),
        }
    }

    Ok(Node::If(IfNode {
        branches,
        else_body,
        line,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_commands() {
        let script = parse_script("project(p)\nadd_executable(app main.c)\n", "CMakeLists.txt")
            .unwrap();
        assert_eq!(script.nodes.len(), 2);
        assert!(matches!(&script.nodes[0], Node::Command(c) if c.name == "project"));
    }

    #[test]
    fn if_elseif_else() {
        let src = "if(A)\nset(X 1)\nelseif(B)\nset(X 2)\nelse()\nset(X 3)\nendif()\n";
        let script = parse_script(src, "t.cmake").unwrap();
        let Node::If(n) = &script.nodes[0] else {
            panic!("expected if node")
        };
        assert_eq!(n.branches.len(), 2);
        assert_eq!(n.branches[0].condition[0].text, "A");
        assert_eq!(n.branches[1].condition[0].text, "B");
        assert_eq!(n.else_body.len(), 1);
    }

    #[test]
    fn nested_loops() {
        let src = "foreach(i a b)\nforeach(j c d)\nset(X ${i}${j})\nendforeach()\nendforeach()\n";
        let script = parse_script(src, "t.cmake").unwrap();
        let Node::ForEach(outer) = &script.nodes[0] else {
            panic!("expected foreach")
        };
        assert_eq!(outer.body.len(), 1);
        assert!(matches!(&outer.body[0], Node::ForEach(_)));
    }

    #[test]
    fn function_body_kept_structured() {
        let src = "function(f x)\nif(${x})\nset(Y 1 PARENT_SCOPE)\nendif()\nendfunction()\n";
        let script = parse_script(src, "t.cmake").unwrap();
        let Node::FunctionDef(def) = &script.nodes[0] else {
            panic!("expected function def")
        };
        assert_eq!(def.args[0].text, "f");
        assert_eq!(def.args[1].text, "x");
        assert!(matches!(&def.body[0], Node::If(_)));
    }

    #[test]
    fn block_stays_plain_command() {
        let src = "block(PROPAGATE X)\nset(X 1)\nendblock()\n";
        let script = parse_script(src, "t.cmake").unwrap();
        assert_eq!(script.nodes.len(), 3);
        assert!(matches!(&script.nodes[0], Node::Command(c) if c.name == "block"));
        assert!(matches!(&script.nodes[2], Node::Command(c) if c.name == "endblock"));
    }

    #[test]
    fn unclosed_if_errors() {
        assert!(matches!(
            parse_script("if(A)\nset(X 1)\n", "t.cmake"),
            Err(ParseError::UnclosedBlock { .. })
        ));
    }

    #[test]
    fn stray_endif_errors() {
        assert!(matches!(
            parse_script("endif()\n", "t.cmake"),
            Err(ParseError::UnmatchedBlockEnd { .. })
        ));
    }

    #[test]
    fn else_then_elseif_errors() {
        let src = "if(A)\nelse()\nelseif(B)\nendif()\n";
        assert!(matches!(
            parse_script(src, "t.cmake"),
            Err(ParseError::UnmatchedBlockEnd { .. })
        ));
    }
}
