//! Line-edited REPL driving the embedding API one top-level expression
//! at a time. Multi-line forms (an open `(` with no matching
//! `)` yet) prompt for continuation rather than reporting a parse error.

use ferro_core::{ErrorCode, ObjType, Value};
use ferro_rt::Vm;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use crate::error::ReplResult;

const PROMPT: &str = "ferro> ";
const CONTINUATION_PROMPT: &str = "...  > ";

fn history_path() -> Option<std::path::PathBuf> {
    dirs::data_local_dir().map(|d| d.join("ferro").join("history"))
}

fn error_code(v: Value) -> Option<ErrorCode> {
    if v.obj_type() == Some(ObjType::Error) {
        Some(v.obj().as_error().code)
    } else {
        None
    }
}

/// Run the interactive read-eval-print loop until EOF (Ctrl-D) or `Ctrl-C`
/// at an empty prompt.
pub fn run(vm: &mut Vm) -> ReplResult<()> {
    let mut editor = DefaultEditor::new()?;
    let hist_path = history_path();
    if let Some(path) = &hist_path {
        let _ = editor.load_history(path);
    }

    let mut buffer = String::new();

    loop {
        let prompt = if buffer.is_empty() { PROMPT } else { CONTINUATION_PROMPT };
        let line = match editor.readline(prompt) {
            Ok(l) => l,
            Err(ReadlineError::Interrupted) if buffer.is_empty() => continue,
            Err(ReadlineError::Interrupted) => {
                buffer.clear();
                continue;
            }
            Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };
        let _ = editor.add_history_entry(line.as_str());

        if !buffer.is_empty() {
            buffer.push('\n');
        }
        buffer.push_str(&line);

        if buffer.trim().is_empty() {
            buffer.clear();
            continue;
        }

        if !consume_buffer(vm, &mut buffer) {
            // Incomplete form: keep `buffer` and prompt for continuation.
            continue;
        }
    }

    if let Some(path) = &hist_path {
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let _ = editor.save_history(path);
    }
    Ok(())
}

/// Parse and evaluate every complete top-level form currently in `buffer`.
/// Returns `true` once the buffer has been fully consumed (clearing it),
/// or `false` if the trailing form is incomplete and more input is needed.
fn consume_buffer(vm: &mut Vm, buffer: &mut String) -> bool {
    let bytes = buffer.as_bytes().to_vec();
    let mut cursor = 0usize;

    loop {
        if bytes[cursor..].iter().all(|b| b.is_ascii_whitespace()) {
            buffer.clear();
            return true;
        }

        let next = vm.parse(&bytes, cursor);
        let parsed = vm.peekstack(-1).expect("parse always pushes a value");

        if let Some(code) = error_code(parsed) {
            if code == ErrorCode::ParseUnexpectedEndOfFile && next >= bytes.len() {
                // Unclosed list/string at end of input: wait for more.
                vm.pop(1);
                return false;
            }
            eprintln!("parse error: {}", parsed.obj().as_error().message);
            vm.pop(1);
            buffer.clear();
            return true;
        }

        if let Err(e) = vm.eval(-1) {
            eprintln!("error: {e}");
            vm.pop(1);
            cursor = next;
            continue;
        }
        // In-language Error values print like any other value -- errors
        // are values, not exceptions -- so no special-casing here.
        let _ = vm.print(-1, "\n");
        vm.pop(1);
        cursor = next;
    }
}
