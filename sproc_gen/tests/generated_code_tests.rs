/* Generated Code Tests
 *
 * These tests write the generator's output into a temporary Cargo project
 * that depends on sproc_runtime, then build it and run a scenario suite
 * against the generated DAO implementations with an in-memory data source.
 */

use sproc_gen::cmds::codegen::write_generation;
use sproc_gen::{Diagnostics, Generation, GeneratorOptions, RustCodeGenerator};
use sproc_types::{DescriptorFile, GeneratorConfig};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

const ENTITY_MODULE: &str = r#"#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: i64,
    pub name: String,
}

impl User {
    pub fn new(id: i64, name: String) -> Self {
        Self { id, name }
    }

    pub fn id_only(id: i64) -> Self {
        Self { id, name: String::new() }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Permission {
    pub user_id: i64,
    pub name: String,
}

impl Permission {
    pub fn new(user_id: i64, name: String) -> Self {
        Self { user_id, name }
    }
}
"#;

const LEGACY_MODULE: &str = r#"use crate::entity::User;
use sproc_runtime::{Row, RowMapper, SprocResult};

#[derive(Debug, Clone, Copy, Default)]
pub struct LegacyUserMapper;

impl RowMapper for LegacyUserMapper {
    type Output = User;

    fn map_row(&self, row: &Row, _row_num: usize) -> SprocResult<User> {
        Ok(User::new(row.get(0)?, format!("legacy:{}", row.get::<String>(1)?)))
    }
}
"#;

const SCENARIOS: &str = r#"use std::sync::{Arc, Mutex};

use generated_user_dao::entity::User;
use generated_user_dao::plain::UserDao as _;
use generated_user_dao::timed::UserDao as _;
use generated_user_dao::{plain, timed};
use sproc_runtime::{CallTimer, Connection, DataSource, Row, SprocError, SprocResult, SqlParameter, SqlValue};

/* Replays the same canned tables for every call and records what was bound */
struct Canned {
    tables: Vec<Vec<Row>>,
    calls: Mutex<Vec<(String, Vec<SqlValue>)>>,
}

struct CannedConnection(Arc<Canned>);

impl Connection for CannedConnection {
    fn call(&self, procedure: &str, _parameters: &[SqlParameter], args: &[SqlValue]) -> SprocResult<Vec<Vec<Row>>> {
        self.0.calls.lock().unwrap().push((procedure.to_string(), args.to_vec()));
        Ok(self.0.tables.clone())
    }
}

struct CannedSource(Arc<Canned>);

impl DataSource for CannedSource {
    fn connection(&self) -> SprocResult<Box<dyn Connection>> {
        Ok(Box::new(CannedConnection(self.0.clone())))
    }
}

fn source(tables: Vec<Vec<Row>>) -> (Arc<Canned>, Arc<dyn DataSource>) {
    let canned = Arc::new(Canned { tables, calls: Mutex::new(Vec::new()) });
    let data_source: Arc<dyn DataSource> = Arc::new(CannedSource(canned.clone()));
    (canned, data_source)
}

fn dao(tables: Vec<Vec<Row>>) -> (Arc<Canned>, plain::UserDaoImpl) {
    let (canned, data_source) = source(tables);
    (canned, plain::UserDaoImpl::new(data_source))
}

fn row(id: i64, name: &str) -> Row {
    Row::new(vec![SqlValue::Int(id), SqlValue::Text(name.to_string())])
}

#[test]
fn scalar_without_rows_is_not_found() {
    let (_, dao) = dao(vec![vec![]]);
    let err = dao.get_user(1).unwrap_err();
    assert_eq!(
        err,
        SprocError::ObjectNotFound { procedure: "sp_get_user".into(), table: "result-table-0".into() }
    );
}

#[test]
fn scalar_with_one_row_returns_it() {
    let (canned, dao) = dao(vec![vec![row(1, "ann")]]);
    assert_eq!(dao.get_user(1).unwrap(), User::new(1, "ann".into()));
    assert_eq!(canned.calls.lock().unwrap()[0], ("sp_get_user".to_string(), vec![SqlValue::Int(1)]));
}

#[test]
fn scalar_with_two_rows_is_too_many() {
    let (_, dao) = dao(vec![vec![row(1, "ann"), row(2, "bob")]]);
    assert!(matches!(dao.get_user(1), Err(SprocError::TooManyResults { count: 2, .. })));
}

#[test]
fn nullable_scalar_without_rows_is_none() {
    let (_, dao) = dao(vec![vec![]]);
    assert_eq!(dao.find_user(1).unwrap(), None);
}

#[test]
fn optional_without_rows_is_none() {
    let (_, dao) = dao(vec![vec![]]);
    assert_eq!(dao.maybe_user(1).unwrap(), None);

    let (_, dao) = crate::dao(vec![vec![row(1, "ann"), row(2, "bob")]]);
    assert!(matches!(dao.maybe_user(1), Err(SprocError::TooManyResults { count: 2, .. })));
}

#[test]
fn aggregate_reads_each_table_by_position() {
    let (canned, dao) = dao(vec![vec![], vec![row(7, "read"), row(7, "write")]]);
    let result = dao.get_user_permissions(7).unwrap();
    assert!(result.user.is_none());
    assert_eq!(result.permissions.len(), 2);
    assert_eq!(result.permissions[1].name, "write");
    assert_eq!(canned.calls.lock().unwrap()[0].0, "sp_get_user_permissions");
}

#[test]
fn lists_take_any_length() {
    let (_, dao) = dao(vec![vec![]]);
    assert!(dao.list_users().unwrap().is_empty());

    let (_, dao) = crate::dao(vec![vec![row(1, "ann"), row(2, "bob"), row(3, "cy")]]);
    assert_eq!(dao.list_users().unwrap().len(), 3);
}

#[test]
fn selector_and_mapper_override_decode_differently() {
    let (_, dao) = dao(vec![vec![row(5, "eve")]]);
    assert_eq!(dao.get_user_id_only(5).unwrap(), User::id_only(5));
    assert_eq!(dao.get_legacy_user(5).unwrap().name, "legacy:eve");
}

#[test]
fn array_arguments_are_bound_as_arrays() {
    let (canned, dao) = dao(vec![vec![row(1, "ann")]]);
    dao.get_users_by_ids(vec![1, 2]).unwrap();
    let calls = canned.calls.lock().unwrap();
    assert_eq!(
        calls[0].1,
        vec![SqlValue::Array {
            element_type: "bigint".into(),
            elements: vec![SqlValue::Int(1), SqlValue::Int(2)],
        }]
    );
}

#[test]
fn void_method_discards_results() {
    let (canned, dao) = dao(vec![vec![row(1, "ann")]]);
    dao.save_user("ann").unwrap();
    assert_eq!(canned.calls.lock().unwrap()[0].1, vec![SqlValue::Text("ann".into())]);
}

#[test]
fn interceptor_pairs_before_and_after() {
    let (_, data_source) = source(vec![vec![row(1, "ann")]]);
    let dao = timed::UserDaoImpl::new(data_source);
    let pending = CallTimer::registry().pending();
    assert_eq!(dao.get_user(1).unwrap(), User::new(1, "ann".into()));
    assert_eq!(CallTimer::registry().pending(), pending);
}

struct Unreachable;

impl DataSource for Unreachable {
    fn connection(&self) -> SprocResult<Box<dyn Connection>> {
        Err(SprocError::Connection("database is down".into()))
    }
}

#[test]
fn interceptor_sees_failed_calls_end() {
    let dao = timed::UserDaoImpl::new(Arc::new(Unreachable));
    let pending = CallTimer::registry().pending();
    assert!(dao.get_user(1).is_err());
    assert!(dao.save_user("ann").is_err());
    assert_eq!(CallTimer::registry().pending(), pending);
}
"#;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
}

fn load_fixture(name: &str) -> DescriptorFile {
    let yaml_content = fs::read_to_string(fixture(name)).expect("Failed to read fixture");
    serde_yml::from_str(&yaml_content).expect("Failed to parse fixture")
}

fn generate_clean(batch: &DescriptorFile, options: GeneratorOptions) -> Generation {
    let mut diagnostics = Diagnostics::new();
    let generation = RustCodeGenerator::new(options).generate(batch, &mut diagnostics);
    assert!(diagnostics.is_empty(), "unexpected diagnostics: {:?}", diagnostics);
    generation
}

/* Helper to lay out a Cargo project around generated modules and run its tests */
fn run_generated_crate(test_name: &str, modules: &[(&str, &Generation)], tests: &str) -> Result<(), String> {
    let temp_dir = std::env::temp_dir().join("sproc_gen_tests");
    let project_dir = temp_dir.join(test_name);
    let _ = fs::remove_dir_all(&project_dir);
    let src_dir = project_dir.join("src");
    let tests_dir = project_dir.join("tests");
    fs::create_dir_all(&src_dir).map_err(|e| format!("Failed to create src dir: {}", e))?;
    fs::create_dir_all(&tests_dir).map_err(|e| format!("Failed to create tests dir: {}", e))?;

    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    let runtime_dir = manifest_dir
        .join("../sproc_runtime")
        .canonicalize()
        .map_err(|e| format!("Failed to locate sproc_runtime: {}", e))?;

    /* Write Cargo.toml */
    let cargo_toml = format!(
        r#"[package]
name = "{}"
version = "0.1.0"
edition = "2021"

[dependencies]
sproc_runtime = {{ path = {:?} }}
tracing = "0.1"

[workspace]
"#,
        test_name,
        runtime_dir.display().to_string()
    );
    fs::write(project_dir.join("Cargo.toml"), cargo_toml)
        .map_err(|e| format!("Failed to write Cargo.toml: {}", e))?;

    /* Reuse the workspace lock so no new versions need resolving */
    let workspace_lock = manifest_dir.join("../Cargo.lock");
    if workspace_lock.exists() {
        fs::copy(&workspace_lock, project_dir.join("Cargo.lock"))
            .map_err(|e| format!("Failed to copy Cargo.lock: {}", e))?;
    }

    /* Write lib.rs plus the host modules the descriptors refer to */
    let mut lib_content = String::from("#![allow(dead_code, unused, non_camel_case_types, non_snake_case)]\n\n");
    lib_content.push_str("pub mod entity;\npub mod legacy;\n");
    for (module, generation) in modules {
        lib_content.push_str(&format!("pub mod {};\n", module));
        write_generation(generation, &src_dir.join(module)).map_err(|e| format!("{:#}", e))?;
    }
    fs::write(src_dir.join("lib.rs"), lib_content).map_err(|e| format!("Failed to write lib.rs: {}", e))?;
    fs::write(src_dir.join("entity.rs"), ENTITY_MODULE).map_err(|e| format!("Failed to write entity.rs: {}", e))?;
    fs::write(src_dir.join("legacy.rs"), LEGACY_MODULE).map_err(|e| format!("Failed to write legacy.rs: {}", e))?;
    fs::write(tests_dir.join("scenarios.rs"), tests).map_err(|e| format!("Failed to write scenarios.rs: {}", e))?;

    /* Build and run the scenario suite */
    let output = Command::new("cargo")
        .arg("test")
        .arg("--manifest-path")
        .arg(project_dir.join("Cargo.toml"))
        .env("CARGO_TARGET_DIR", temp_dir.join("target"))
        .output()
        .map_err(|e| format!("Failed to run cargo: {}", e))?;

    if !output.status.success() {
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(format!("Generated crate failed:\n{}\n{}", stdout, stderr));
    }

    /* Clean up */
    let _ = fs::remove_dir_all(&project_dir);

    Ok(())
}

#[test]
fn test_generated_user_dao_builds_and_runs() {
    let batch = load_fixture("user_dao.yaml");

    let plain = generate_clean(&batch, GeneratorOptions::default());

    let config = GeneratorConfig {
        interceptor: Some("sproc_runtime::CallTimer".to_string()),
        ..Default::default()
    };
    let timed = generate_clean(&batch, GeneratorOptions::from_config(&config).unwrap());

    if let Err(e) = run_generated_crate("generated_user_dao", &[("plain", &plain), ("timed", &timed)], SCENARIOS) {
        panic!("{}", e);
    }
}
