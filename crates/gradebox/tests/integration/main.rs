//! Integration tests for gradebox
//!
//! These tests drive the real engine end-to-end against a stub toolchain
//! built from /bin/sh, so they run anywhere with a POSIX shell. The stub
//! "compiler" copies the source into the output directory as the artifact
//! (failing on sources that contain the SYNTAX_ERROR marker), and the stub
//! "runner" emits the staged test units' content as event records.
//!
//! Tests that require a real JDK are feature-gated:
//!    cargo test -p gradebox --features jdk-tests -- --include-ignored

#![cfg(unix)]

use std::path::Path;

use gradebox::Config;

mod evaluation;
mod isolation;
#[cfg(feature = "jdk-tests")]
mod jdk;

/// Stub compiler: `$1` = source, `$2` = output directory.
///
/// Mimics the javac contract the engine relies on: diagnostics on stderr
/// with a non-zero exit on failure, an artifact named after the source stem
/// in the output directory on success.
pub(crate) const COMPILE_SH: &str = r#"
src="$1"; out="$2"
if grep -q SYNTAX_ERROR "$src"; then
  echo "$(basename "$src"):3: error: ';' expected" >&2
  exit 1
fi
base=$(basename "$src")
cp "$src" "$out/${base%.*}.class"
"#;

/// Stub runner: `$1` = events file, remaining args = test class names.
///
/// Each staged test "class" is its own event record stream; the runner
/// appends them to the events file in argument order.
pub(crate) const RUNNER_SH: &str = r#"
ev="$1"; shift
for t in "$@"; do
  cat "tests-classes/$t.class" >> "$ev"
done
"#;

/// Build a config around stub compile/runner scripts, sandboxed under `root`.
pub(crate) fn sh_config(root: &Path, compile_script: &str, runner_script: &str) -> Config {
    let toml = format!(
        r#"
sandbox_root = {root:?}
worker_slots = 2
allowed_extensions = ["java"]

[default_limits]
timeout_millis = 5000
compile_timeout_millis = 5000

[toolchain]
artifact_extension = "class"
path = "/usr/bin:/bin"

[toolchain.compile]
command = ["/bin/sh", "-c", {compile_script:?}, "compile", "{{source}}", "{{out_dir}}"]

[toolchain.test]
command = ["/bin/sh", "-c", {runner_script:?}, "runner", "{{events}}", "{{tests}}"]
"#
    );
    Config::parse_toml(&toml).expect("stub config should be valid")
}

/// Default stub config
pub(crate) fn stub_config(root: &Path) -> Config {
    sh_config(root, COMPILE_SH, RUNNER_SH)
}

/// Event records for `count` passing tests of `class`
pub(crate) fn passing_events(class: &str, count: usize) -> String {
    let mut events = String::new();
    for i in 0..count {
        events.push_str(&format!("test:{class}#case{i}\nstatus:passed\ntime_ms:1\n\n"));
    }
    events
}
