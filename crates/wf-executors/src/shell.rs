// SPDX-License-Identifier: MIT

//! Renders a [`wf_core::Program`] tree down to a single `sh -c` script, so
//! both the `local` executor and its condition evaluator can hand one
//! process to the OS and poll/wait on one pid, regardless of whether the
//! program was a bare shell string, an argv exec, or a sequence of steps.

use wf_core::Program;

/// Single-quote a token for inclusion in a POSIX shell command line.
fn quote(token: &str) -> String {
    format!("'{}'", token.replace('\'', r"'\''"))
}

pub(crate) fn render(program: &Program) -> String {
    match program {
        Program::Shell(script) => script.clone(),
        Program::Exec(argv) => argv.iter().map(|a| quote(a)).collect::<Vec<_>>().join(" "),
        Program::Sequence(steps) => {
            steps.iter().map(render).collect::<Vec<_>>().join(" && \\\n")
        }
    }
}

pub(crate) fn command_for(program: &Program) -> tokio::process::Command {
    let mut cmd = tokio::process::Command::new("sh");
    cmd.arg("-c").arg(format!("set -e\n{}", render(program)));
    cmd
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_shell_verbatim() {
        assert_eq!(render(&Program::Shell("echo hi".to_string())), "echo hi");
    }

    #[test]
    fn renders_exec_with_quoting() {
        let program = Program::Exec(vec!["echo".to_string(), "it's fine".to_string()]);
        assert_eq!(render(&program), r"'echo' 'it'\''s fine'");
    }

    #[test]
    fn renders_sequence_as_conjunction() {
        let program = Program::Sequence(vec![
            Program::Shell("echo a".to_string()),
            Program::Shell("echo b".to_string()),
        ]);
        assert_eq!(render(&program), "echo a && \\\necho b");
    }
}
