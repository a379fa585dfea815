use std::path::{Path, PathBuf};
use std::process::Command;

const MAX_LINES: usize = 750;

const CHECKED_EXTENSIONS: &[&str] = &["rs", "md", "toml"];

const EXCLUDED_DIRS: &[&str] = &["target", ".git", "examples"];

const EXCLUDED_FILES: &[&str] = &["Cargo.lock", "SPEC_FULL.md", "spec.md"];

fn main() {
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/heads/main");
    println!("cargo:rerun-if-changed=.git/packed-refs");

    let sha = git_output(&["rev-parse", "HEAD"]).unwrap_or_else(|| "unknown".to_string());
    println!("cargo:rustc-env=CLAUDE_MONITOR_GIT_SHA={}", sha);

    let manifest_dir = std::env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR must be set");
    let root = PathBuf::from(&manifest_dir);
    let files = collect_files_to_check(&root);
    for file in &files {
        println!("cargo:rerun-if-changed={}", file.display());
    }

    let sources: Vec<SourceFile> = files
        .iter()
        .filter(|p| {
            p.extension().and_then(|e| e.to_str()) == Some("rs")
                && p.file_name().and_then(|n| n.to_str()) != Some("build.rs")
        })
        .filter_map(|p| SourceFile::read(&root, p))
        .collect();

    enforce_line_limits(&root, &files);
    enforce_no_dead_code_allows(&sources);
    enforce_no_test_skips(&sources);
    enforce_serial_for_env_mutations(&sources);
}

fn git_output(args: &[&str]) -> Option<String> {
    Command::new("git")
        .args(args)
        .output()
        .ok()
        .filter(|output| output.status.success())
        .and_then(|output| String::from_utf8(output.stdout).ok())
        .map(|s| s.trim().to_string())
}

struct SourceFile {
    rel_path: PathBuf,
    content: String,
}

impl SourceFile {
    fn read(root: &Path, path: &Path) -> Option<Self> {
        let content = std::fs::read_to_string(path).ok()?;
        Some(Self {
            rel_path: path.strip_prefix(root).unwrap_or(path).to_path_buf(),
            content,
        })
    }
}

/// A test function body located by scanning for `#[test]` / `#[tokio::test]`.
struct TestFn<'a> {
    name: String,
    line: usize,
    attributes: Vec<&'a str>,
    body: Vec<&'a str>,
}

fn test_functions(content: &str) -> Vec<TestFn<'_>> {
    let lines: Vec<&str> = content.lines().collect();
    let mut found = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let trimmed = lines[i].trim();
        if trimmed != "#[test]" && !trimmed.starts_with("#[tokio::test") {
            i += 1;
            continue;
        }

        let attr_start = i;
        let Some(fn_idx) = (i + 1..lines.len().min(i + 5)).find(|&j| lines[j].contains("fn "))
        else {
            i += 1;
            continue;
        };

        let name = lines[fn_idx]
            .split("fn ")
            .nth(1)
            .and_then(|rest| rest.split('(').next())
            .unwrap_or("")
            .trim()
            .to_string();

        let mut depth = 0i32;
        let mut end = fn_idx;
        let mut opened = false;
        for (j, line) in lines.iter().enumerate().skip(fn_idx) {
            for c in line.chars() {
                match c {
                    '{' => {
                        depth += 1;
                        opened = true;
                    }
                    '}' => depth -= 1,
                    _ => {}
                }
            }
            end = j;
            if opened && depth <= 0 {
                break;
            }
        }

        found.push(TestFn {
            name,
            line: attr_start + 1,
            attributes: lines[attr_start..fn_idx].iter().map(|l| l.trim()).collect(),
            body: lines[fn_idx..=end].to_vec(),
        });
        i = end + 1;
    }

    found
}

fn report_violations(title: &str, violations: &[(PathBuf, usize, String)], advice: &[&str]) {
    if violations.is_empty() {
        return;
    }

    eprintln!("\n========================================");
    eprintln!("{}", title);
    eprintln!("========================================");
    eprintln!();
    for (path, line, message) in violations {
        eprintln!("  {}:{}", path.display(), line);
        eprintln!("    {}", message);
        eprintln!();
    }
    eprintln!("========================================");
    for line in advice {
        eprintln!("{}", line);
    }
    eprintln!("========================================\n");
    panic!("Build failed: {} ({} occurrence(s))", title, violations.len());
}

fn enforce_line_limits(root: &Path, files: &[PathBuf]) {
    let mut violations = Vec::new();
    for file in files {
        let rel_path = file.strip_prefix(root).unwrap_or(file).to_path_buf();
        match std::fs::read_to_string(file) {
            Ok(content) => {
                let count = content.lines().filter(|l| !l.trim().is_empty()).count();
                if count > MAX_LINES {
                    violations.push((
                        rel_path,
                        count,
                        format!("{} non-empty lines (max {})", count, MAX_LINES),
                    ));
                }
            }
            Err(e) => println!(
                "cargo:warning=Could not read file {}: {}",
                rel_path.display(),
                e
            ),
        }
    }

    report_violations(
        "FILE LINE LIMIT EXCEEDED",
        &violations,
        &["Please split these files into smaller modules."],
    );
}

fn enforce_no_dead_code_allows(sources: &[SourceFile]) {
    let mut violations = Vec::new();
    for source in sources {
        for (idx, line) in source.content.lines().enumerate() {
            let trimmed = line.trim();
            if (trimmed.starts_with("#[allow(") || trimmed.starts_with("#![allow("))
                && trimmed.contains("dead_code")
            {
                violations.push((source.rel_path.clone(), idx + 1, trimmed.to_string()));
            }
        }
    }

    report_violations(
        "#[allow(dead_code)] IS NOT ALLOWED",
        &violations,
        &[
            "Delete unused code instead of silencing the warning.",
            "Test-only helpers belong behind #[cfg(test)].",
        ],
    );
}

/// Tests that return early without doing work hide failures.
fn enforce_no_test_skips(sources: &[SourceFile]) {
    let skip_patterns = [
        "Skipping test",
        "skipping test",
        "Test skipped",
        "test skipped",
    ];

    let mut violations = Vec::new();
    for source in sources {
        for test in test_functions(&source.content) {
            let skipped = test.body.iter().any(|line| {
                skip_patterns.iter().any(|p| line.contains(p))
                    || (line.trim() == "return;" && line.starts_with("        "))
            });
            if skipped {
                violations.push((
                    source.rel_path.clone(),
                    test.line,
                    format!("test `{}` silently skips", test.name),
                ));
            }
        }
    }

    report_violations(
        "SILENT TEST SKIPS ARE NOT ALLOWED",
        &violations,
        &["Tests must FAIL if they cannot run, not silently pass."],
    );
}

/// Environment variables are process-global; tests touching them must not run in parallel.
fn enforce_serial_for_env_mutations(sources: &[SourceFile]) {
    let mut violations = Vec::new();
    for source in sources {
        for test in test_functions(&source.content) {
            let has_serial = test
                .attributes
                .iter()
                .any(|a| *a == "#[serial]" || *a == "#[serial_test::serial]");
            let mutates_env = test.body.iter().any(|line| {
                let trimmed = line.trim();
                !trimmed.starts_with("//")
                    && (trimmed.contains("env::set_var") || trimmed.contains("env::remove_var"))
            });
            if mutates_env && !has_serial {
                violations.push((
                    source.rel_path.clone(),
                    test.line,
                    format!("test `{}` mutates env without #[serial]", test.name),
                ));
            }
        }
    }

    report_violations(
        "ENV MUTATIONS REQUIRE #[serial]",
        &violations,
        &["Add #[serial] from the serial_test crate to the test."],
    );
}

fn collect_files_to_check(root: &Path) -> Vec<PathBuf> {
    if let Some(stdout) = Command::new("git")
        .args(["ls-files"])
        .current_dir(root)
        .output()
        .ok()
        .filter(|output| output.status.success())
        .and_then(|output| String::from_utf8(output.stdout).ok())
    {
        let files: Vec<PathBuf> = stdout
            .lines()
            .map(|line| root.join(line))
            .filter(|path| should_check_file(path, root))
            .collect();
        if !files.is_empty() {
            return files;
        }
    }

    let mut files = Vec::new();
    walk_directory(root, root, &mut files);
    files
}

fn walk_directory(dir: &Path, root: &Path, files: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            let excluded = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|name| EXCLUDED_DIRS.contains(&name));
            if !excluded {
                walk_directory(&path, root, files);
            }
        } else if should_check_file(&path, root) {
            files.push(path);
        }
    }
}

fn should_check_file(path: &Path, root: &Path) -> bool {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return false;
    };
    if !CHECKED_EXTENSIONS.contains(&ext) {
        return false;
    }

    let Ok(rel_path) = path.strip_prefix(root) else {
        return true;
    };
    let rel_str = rel_path.to_string_lossy();
    if EXCLUDED_FILES.iter().any(|excluded| rel_str == *excluded) {
        return false;
    }

    !rel_path.components().any(|component| {
        component
            .as_os_str()
            .to_str()
            .is_some_and(|name| EXCLUDED_DIRS.contains(&name))
    })
}
