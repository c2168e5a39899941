//! Loads the declarative contract document: `test_suites -> categories -> tests ->
//! steps`, with a transparent `!include` directive and cycle detection.
//!
//! The YAML crate used (`serde-saphyr`) has no custom-tag-constructor hook of its
//! own, so `!include` is handled as a two-pass process: the `!include <path>` tag is
//! rewritten, textually, into an inline `{__include__: <path>}` mapping before
//! parsing, then resolved by walking the parsed value tree.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;

use crate::error::{HarnessError, Result};

#[derive(Debug, Clone, Deserialize)]
pub struct Step {
    pub action: String,
    #[serde(default)]
    pub params: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Test {
    pub name: String,
    #[serde(default)]
    pub sdk_types: Option<Vec<String>>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Category {
    #[serde(default)]
    pub tests: Vec<Test>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Suite {
    #[serde(default)]
    pub categories: HashMap<String, Category>,
}

/// A reusable step template, referenced by name from a test's steps.
#[derive(Debug, Clone, Deserialize)]
pub struct ActionAlias {
    pub action: String,
    #[serde(default)]
    pub params: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawDocument {
    #[serde(default)]
    test_suites: HashMap<String, Suite>,
    #[serde(default)]
    adapter_actions: HashMap<String, ActionAlias>,
    #[serde(default)]
    test_actions: HashMap<String, ActionAlias>,
}

/// The fully resolved contract document.
pub struct Contract {
    test_suites: HashMap<String, Suite>,
    action_catalogue: HashMap<String, ActionAlias>,
}

impl Contract {
    /// Loads and fully resolves a contract document, following `!include`
    /// directives relative to each including file's directory.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::BadContract`] if the document cannot be read,
    /// contains a cyclic include, or does not match the expected shape.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut stack = HashSet::new();
        let value = load_value(path, &mut stack)?;
        let raw: RawDocument = serde_json::from_value(value)
            .map_err(|err| HarnessError::bad_contract(format!("malformed contract document: {err}")))?;

        let mut action_catalogue = raw.adapter_actions;
        action_catalogue.extend(raw.test_actions);

        Ok(Self {
            test_suites: raw.test_suites,
            action_catalogue,
        })
    }

    #[must_use]
    pub fn test_suites(&self) -> &HashMap<String, Suite> {
        &self.test_suites
    }

    #[must_use]
    pub fn action_catalogue(&self) -> &HashMap<String, ActionAlias> {
        &self.action_catalogue
    }

    /// Resolves a step against the action catalogue: if `step.action` names a
    /// catalogue alias rather than a core registered action, substitute the
    /// alias's action and merge its default params underneath the step's own.
    #[must_use]
    pub fn resolve_step(&self, step: &Step) -> (String, Value) {
        let own_params = step.params.clone().unwrap_or_else(|| Value::Object(serde_json::Map::new()));

        let Some(alias) = self.action_catalogue.get(&step.action) else {
            return (step.action.clone(), own_params);
        };

        let mut merged = alias.params.clone().unwrap_or_else(|| Value::Object(serde_json::Map::new()));
        if let (Value::Object(base), Value::Object(overrides)) = (&mut merged, &own_params) {
            for (key, value) in overrides {
                base.insert(key.clone(), value.clone());
            }
        }
        (alias.action.clone(), merged)
    }
}

fn load_value(path: &Path, stack: &mut HashSet<PathBuf>) -> Result<Value> {
    let canonical = path
        .canonicalize()
        .map_err(|err| HarnessError::bad_contract(format!("cannot read contract file {}: {err}", path.display())))?;

    if !stack.insert(canonical.clone()) {
        return Err(HarnessError::bad_contract(format!(
            "cyclic !include detected at {}",
            path.display()
        )));
    }

    let raw_text = std::fs::read_to_string(path)
        .map_err(|err| HarnessError::bad_contract(format!("cannot read contract file {}: {err}", path.display())))?;
    let rewritten = rewrite_include_tags(&raw_text);

    let value: Value = serde_saphyr::from_str(&rewritten)
        .map_err(|err| HarnessError::bad_contract(format!("invalid YAML in {}: {err}", path.display())))?;

    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    let resolved = resolve_includes(value, base_dir, stack)?;

    stack.remove(&canonical);
    Ok(resolved)
}

/// Rewrites `!include <path>` into an inline `{__include__: <path>}` mapping so a
/// tag-unaware YAML parser can still produce a value we can post-process.
fn rewrite_include_tags(text: &str) -> String {
    text.lines()
        .map(rewrite_include_line)
        .collect::<Vec<_>>()
        .join("\n")
}

fn rewrite_include_line(line: &str) -> String {
    let Some(tag_pos) = line.find("!include") else {
        return line.to_string();
    };
    let (prefix, rest) = line.split_at(tag_pos);
    let path_part = rest["!include".len()..].trim();
    let path_literal = path_part.trim_matches(|c| c == '"' || c == '\'');
    format!("{prefix}{{__include__: \"{path_literal}\"}}")
}

fn resolve_includes(value: Value, base_dir: &Path, stack: &mut HashSet<PathBuf>) -> Result<Value> {
    match value {
        Value::Object(map) => {
            if map.len() == 1
                && let Some(Value::String(included_path)) = map.get("__include__")
            {
                let full_path = base_dir.join(included_path);
                return load_value(&full_path, stack);
            }
            let mut resolved = serde_json::Map::with_capacity(map.len());
            for (key, child) in map {
                resolved.insert(key, resolve_includes(child, base_dir, stack)?);
            }
            Ok(Value::Object(resolved))
        }
        Value::Array(items) => {
            let mut resolved = Vec::with_capacity(items.len());
            for item in items {
                resolved.push(resolve_includes(item, base_dir, stack)?);
            }
            Ok(Value::Array(resolved))
        }
        other => Ok(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    fn write_temp(dir: &tempfile::TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn loads_a_flat_suite() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_temp(
            &dir,
            "contract.yaml",
            r#"
test_suites:
  basic:
    categories:
      capture:
        tests:
          - name: single_capture
            steps:
              - action: init
              - action: capture
                params:
                  distinct_id: u1
                  event: login
"#,
        );

        let contract = Contract::load(&path).unwrap();
        let suite = contract.test_suites().get("basic").unwrap();
        let category = suite.categories.get("capture").unwrap();
        assert_eq!(category.tests.len(), 1);
        assert_eq!(category.tests[0].steps.len(), 2);
    }

    #[test]
    fn resolves_include_directive() {
        let dir = tempfile::tempdir().unwrap();
        write_temp(
            &dir,
            "shared.yaml",
            r#"
categories:
  capture:
    tests:
      - name: from_include
        steps:
          - action: init
"#,
        );
        let root = write_temp(
            &dir,
            "contract.yaml",
            r#"
test_suites:
  basic: !include shared.yaml
"#,
        );

        let contract = Contract::load(&root).unwrap();
        let suite = contract.test_suites().get("basic").unwrap();
        assert_eq!(suite.categories["capture"].tests[0].name, "from_include");
    }

    #[test]
    fn detects_include_cycles() {
        let dir = tempfile::tempdir().unwrap();
        let a_path = dir.path().join("a.yaml");
        let b_path = dir.path().join("b.yaml");
        std::fs::write(&a_path, "test_suites:\n  x: !include b.yaml\n").unwrap();
        std::fs::write(&b_path, "test_suites:\n  x: !include a.yaml\n").unwrap();

        let result = Contract::load(&a_path);
        assert!(result.is_err());
    }

    #[test]
    fn test_actions_shadow_adapter_actions_with_same_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_temp(
            &dir,
            "contract.yaml",
            r#"
adapter_actions:
  do_init:
    action: init
    params:
      flush_at: 5
test_actions:
  do_init:
    action: init
    params:
      flush_at: 1
test_suites: {}
"#,
        );

        let contract = Contract::load(&path).unwrap();
        let alias = contract.action_catalogue().get("do_init").unwrap();
        assert_eq!(alias.params.as_ref().unwrap()["flush_at"], 1);
    }
}
