//! Unit tests for editor resolution and launching.

use std::path::Path;
use std::time::Duration;

use mockall::mock;
use mockall::predicate::function;
use rstest::rstest;

use super::*;
use crate::runtime::CommandOutput;

mock! {
    Runner {}
    impl CommandRunner for Runner {
        fn run(&self, invocation: &Invocation, timeout: Duration) -> Result<CommandOutput, RuntimeError>;
        fn attach(&self, invocation: &Invocation) -> Result<i32, RuntimeError>;
    }
}

#[rstest]
#[case::configured(Some("nano"), Some("code --wait"), Some("vim"), "nano")]
#[case::visual(None, Some("code --wait"), Some("vim"), "code --wait")]
#[case::editor(None, None, Some("vim"), "vim")]
#[case::blank_values_skipped(Some(" "), Some(""), Some("emacs"), "emacs")]
#[case::fallback(None, None, None, DEFAULT_EDITOR)]
fn editor_command_precedence(
    #[case] configured: Option<&str>,
    #[case] visual: Option<&str>,
    #[case] editor: Option<&str>,
    #[case] expected: &str,
) {
    let env = |key: &str| match key {
        "VISUAL" => visual.map(str::to_owned),
        "EDITOR" => editor.map(str::to_owned),
        _ => None,
    };
    assert_eq!(resolve_editor_command(configured, env), expected);
}

#[test]
fn editor_arguments_precede_the_file() {
    let mut runner = MockRunner::new();
    runner
        .expect_attach()
        .with(function(|invocation: &Invocation| {
            invocation.program() == "code"
                && invocation.arguments() == ["--wait", "/defs/alpha.toml"]
                && invocation.operation() == "edit"
        }))
        .times(1)
        .returning(|_| Ok(0));
    let editor = CommandEditor::with_runner("code --wait", runner);
    editor
        .edit(Path::new("/defs/alpha.toml"))
        .expect("editor succeeds");
}

#[test]
fn non_zero_exit_is_an_error() {
    let mut runner = MockRunner::new();
    runner.expect_attach().returning(|_| Ok(2));
    let error = CommandEditor::with_runner("vi", runner)
        .edit(Path::new("/defs/alpha.toml"))
        .expect_err("editor failed");
    assert!(matches!(error, EditorError::Exited { status: 2, ref program } if program == "vi"));
}

#[test]
fn missing_editor_is_a_launch_error() {
    let mut runner = MockRunner::new();
    runner.expect_attach().returning(|_| {
        Err(RuntimeError::Unavailable {
            message: String::from("'ghost-editor' was not found"),
            transient: false,
        })
    });
    let error = CommandEditor::with_runner("ghost-editor", runner)
        .edit(Path::new("/defs/alpha.toml"))
        .expect_err("editor missing");
    assert!(matches!(error, EditorError::Launch { .. }));
}

#[test]
fn blank_command_is_unconfigured() {
    let runner = MockRunner::new();
    let error = CommandEditor::with_runner("   ", runner)
        .edit(Path::new("/defs/alpha.toml"))
        .expect_err("nothing to run");
    assert!(matches!(error, EditorError::Unconfigured));
}
