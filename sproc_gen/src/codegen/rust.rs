use std::collections::HashSet;

use indexmap::{IndexMap, IndexSet};
use serde_derive::Serialize;
use sproc_types::{DEFAULT_RUNTIME_CRATE, DescriptorFile, GeneratorConfig, MethodDef};
use thiserror::Error;

use crate::annotation::MirroredAttribute;
use crate::codegen::rust_gen::helpers::file_prelude;
use crate::codegen::rust_gen::{DaoEmitter, EmitContext, MapperSpec, emit_aggregate, emit_mapper, emit_wrapper};
use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::identity::{MapperRef, WrapperIdentity, WrapperRegistry, WrapperRequest};
use crate::model::{AggregateDescriptor, DaoDescriptor, EntityDescriptor, MethodDescriptor};
use crate::naming::{imported_names, is_valid_ident, is_valid_path};
use crate::shape::{Shape, classify};
use crate::synth::{AggregateLayout, SynthesisError, UnpackPlan, plan_aggregate};

/* Runtime items `wrappers.rs` imports by name */
const WRAPPER_RUNTIME_IMPORTS: &[&str] =
  &["CallResult", "DataSource", "SprocResult", "SqlParameter", "SqlType", "StoredProcedure", "ToSql"];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
  #[error("interceptor '{0}' is not a valid type path")]
  InvalidInterceptor(String),

  #[error("runtime crate '{0}' is not a valid crate name")]
  InvalidRuntimeCrate(String),
}

/* Validated generator settings. Built once from the merged config. */
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorOptions {
  interceptor: Option<String>,
  runtime_crate: String,
  emit_aggregates: bool,
  emit_mappers: bool,
}

impl GeneratorOptions {
  pub fn from_config(config: &GeneratorConfig) -> Result<Self, ConfigError> {
    if let Some(interceptor) = &config.interceptor {
      if !is_valid_path(interceptor) {
        return Err(ConfigError::InvalidInterceptor(interceptor.clone()));
      }
    }
    if !is_valid_ident(&config.runtime_crate) {
      return Err(ConfigError::InvalidRuntimeCrate(config.runtime_crate.clone()));
    }
    Ok(Self {
      interceptor: config.interceptor.clone(),
      runtime_crate: config.runtime_crate.clone(),
      emit_aggregates: config.emit_aggregates,
      emit_mappers: config.emit_mappers,
    })
  }

  pub fn interceptor(&self) -> Option<&str> {
    self.interceptor.as_deref()
  }

  pub fn runtime_crate(&self) -> &str {
    &self.runtime_crate
  }

  pub fn emit_aggregates(&self) -> bool {
    self.emit_aggregates
  }

  pub fn emit_mappers(&self) -> bool {
    self.emit_mappers
  }
}

impl Default for GeneratorOptions {
  fn default() -> Self {
    Self {
      interceptor: None,
      runtime_crate: DEFAULT_RUNTIME_CRATE.to_string(),
      emit_aggregates: true,
      emit_mappers: true,
    }
  }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
  pub name: String,
  pub contents: String,
}

/* What was decided for one synthesized method */
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct MethodReport {
  pub dao: String,
  pub method: String,
  pub procedure: String,
  pub shape: Shape,
  pub identity: String,
  pub wrapper: String,
  pub field: String,
  /* False when the DAO already had a field for this identity */
  pub new_field: bool,
  pub plan: UnpackPlan,
}

#[derive(Serialize, Debug, Clone, Default)]
pub struct Generation {
  pub files: Vec<GeneratedFile>,
  pub wrappers: Vec<WrapperRequest>,
  pub methods: Vec<MethodReport>,
}

impl Generation {
  pub fn file(&self, name: &str) -> Option<&GeneratedFile> {
    self.files.iter().find(|file| file.name == name)
  }
}

/* Everything the DAO pass needs from the declarations around it */
struct Declarations {
  known_aggregates: IndexSet<String>,
  layouts: IndexMap<String, AggregateLayout>,
  mappers: Vec<MapperSpec>,
}

pub struct RustCodeGenerator {
  options: GeneratorOptions,
}

impl RustCodeGenerator {
  pub fn new(options: GeneratorOptions) -> Self {
    Self { options }
  }

  pub fn options(&self) -> &GeneratorOptions {
    &self.options
  }

  /* Synthesize a whole batch. Failing descriptors are reported to `sink` and
   * skipped; everything else is generated. Output depends only on the batch
   * and the options. */
  pub fn generate(&self, batch: &DescriptorFile, sink: &mut dyn DiagnosticSink) -> Generation {
    let declarations = self.collect_declarations(batch, sink);

    let mut registry = WrapperRegistry::new();
    self.reserve_type_names(batch, &declarations, &mut registry);
    let mut daos = Vec::with_capacity(batch.daos.len());
    let mut methods = Vec::new();
    let mut seen_daos = HashSet::new();

    for dao in &batch.daos {
      let subject = format!("dao {}", dao.name);
      if !seen_daos.insert(dao.name.as_str()) {
        sink.report(Diagnostic::error(subject, "DAO is declared more than once, the first declaration is kept"));
        continue;
      }
      let descriptor = match DaoDescriptor::from_def(dao) {
        Ok(descriptor) => descriptor,
        Err(err) => {
          sink.report(Diagnostic::error(subject, err));
          continue;
        }
      };

      let mut emitter = DaoEmitter::new(&descriptor.name, descriptor.comment.as_deref());
      let mut seen_methods = HashSet::new();
      for def in &dao.methods {
        let subject = format!("{}::{}", dao.name, def.name);
        if !seen_methods.insert(def.name.as_str()) {
          sink.report(Diagnostic::error(subject, "method is declared more than once"));
          continue;
        }
        match self.synthesize(&dao.name, def, &declarations, &mut registry, &mut emitter) {
          Ok(report) => methods.push(report),
          Err(err) => {
            tracing::warn!(subject = %subject, "skipping method: {err}");
            sink.report(Diagnostic::error(subject, err));
          }
        }
      }
      tracing::debug!(
        dao = %dao.name,
        methods = emitter.method_count(),
        fields = emitter.field_count(),
        "synthesized DAO"
      );
      daos.push(emitter);
    }

    self.check_default_mappers(&registry, &declarations.mappers, sink);

    let wrappers = registry.into_requests();
    let files = self.emit_files(batch, &declarations, &wrappers, &daos);
    Generation { files, wrappers, methods }
  }

  fn collect_declarations(&self, batch: &DescriptorFile, sink: &mut dyn DiagnosticSink) -> Declarations {
    /* Every declared name counts as an aggregate for classification, even
     * one that fails validation, so its users fail instead of turning scalar */
    let mut known_aggregates = IndexSet::new();
    let mut descriptors = Vec::new();
    for def in &batch.aggregates {
      let subject = format!("aggregate {}", def.name);
      if !known_aggregates.insert(def.name.clone()) {
        sink.report(Diagnostic::error(subject, "aggregate is declared more than once, the first declaration is kept"));
        continue;
      }
      match AggregateDescriptor::from_def(def) {
        Ok(descriptor) => descriptors.push(descriptor),
        Err(err) => sink.report(Diagnostic::error(subject, err)),
      }
    }

    let mut layouts = IndexMap::new();
    for descriptor in descriptors {
      match plan_aggregate(&descriptor, &known_aggregates) {
        Ok(fields) => {
          layouts.insert(descriptor.name.clone(), AggregateLayout { descriptor, fields });
        }
        Err(err) => sink.report(Diagnostic::error(format!("aggregate {}", descriptor.name), err)),
      }
    }

    let mut mappers: Vec<MapperSpec> = Vec::new();
    if self.options.emit_mappers {
      for def in &batch.entities {
        let entity = match EntityDescriptor::from_def(def) {
          Ok(entity) => entity,
          Err(err) => {
            sink.report(Diagnostic::error(format!("entity {}", def.name), err));
            continue;
          }
        };
        for ctor in &entity.constructors {
          let spec = MapperSpec::for_constructor(&entity, ctor);
          if mappers.iter().any(|m| m.name == spec.name) {
            sink.report(Diagnostic::error(
              format!("entity {}", entity.path),
              format!("mapper '{}' is already generated for another entity", spec.name),
            ));
            continue;
          }
          mappers.push(spec);
        }
      }
    }

    Declarations { known_aggregates, layouts, mappers }
  }

  /* Names that share a scope with the wrappers in the generated files. A
   * wrapper deriving one of them is a collision. */
  fn reserve_type_names(&self, batch: &DescriptorFile, declarations: &Declarations, registry: &mut WrapperRegistry) {
    for name in WRAPPER_RUNTIME_IMPORTS.iter().chain(&["Arc"]) {
      registry.reserve(name, format!("the runtime import {}", name));
    }
    for path in &batch.uses {
      for name in imported_names(path) {
        registry.reserve(name, format!("the import {}", path));
      }
    }
    for name in &declarations.known_aggregates {
      registry.reserve(name, format!("aggregate {}", name));
    }
    for mapper in &declarations.mappers {
      registry.reserve(&mapper.name, format!("mapper {}", mapper.name));
    }
    for dao in &batch.daos {
      registry.reserve(&dao.name, format!("DAO {}", dao.name));
      registry.reserve(&format!("{}Impl", dao.name), format!("DAO implementation {}Impl", dao.name));
    }
  }

  /* One method, all or nothing: the DAO and the registry only change once
   * every fallible step has passed */
  fn synthesize(
    &self,
    dao: &str,
    def: &MethodDef,
    declarations: &Declarations,
    registry: &mut WrapperRegistry,
    emitter: &mut DaoEmitter,
  ) -> Result<MethodReport, SynthesisError> {
    let method = MethodDescriptor::from_def(dao, def)?;
    let shape = classify(method.return_type(), &declarations.known_aggregates)?;
    let plan = UnpackPlan::build(&method, &shape, &declarations.layouts)?;
    let attributes = method
      .attributes()
      .iter()
      .map(MirroredAttribute::mirror)
      .collect::<Result<Vec<_>, _>>()?;
    let request = WrapperRequest::build(&method, &plan)?;
    let identity = request.identity.clone();
    registry.register(request)?;

    let (binding, new_field) = emitter.bind(&identity);
    tracing::debug!(
      method = %method.subject(),
      shape = %shape.describe(),
      wrapper = %binding.type_name,
      new_field,
      "synthesized method"
    );

    let ctx = EmitContext {
      runtime: self.options.runtime_crate(),
      interceptor: self.options.interceptor(),
    };
    emitter.push_method(&method, &plan, &attributes, &binding, &ctx);

    Ok(MethodReport {
      dao: dao.to_string(),
      method: method.name().to_string(),
      procedure: method.procedure().to_string(),
      shape,
      identity: identity.key(),
      wrapper: binding.type_name,
      field: binding.field_name,
      new_field,
      plan,
    })
  }

  fn check_default_mappers(&self, registry: &WrapperRegistry, mappers: &[MapperSpec], sink: &mut dyn DiagnosticSink) {
    if !self.options.emit_mappers {
      return;
    }
    let generated: HashSet<&str> = mappers.iter().map(|m| m.name.as_str()).collect();
    let mut reported = HashSet::new();
    for request in registry.requests() {
      for decoder in &request.decoders {
        if let MapperRef::Default { .. } = &decoder.mapper {
          let name = decoder.mapper.type_name();
          if !generated.contains(name.as_str()) && reported.insert(name.clone()) {
            sink.report(Diagnostic::warning(
              format!("wrapper {}", request.type_name),
              format!("mapper '{}' is not generated by any entity constructor and must be provided", name),
            ));
          }
        }
      }
    }
  }

  fn emit_files(
    &self,
    batch: &DescriptorFile,
    declarations: &Declarations,
    wrappers: &[WrapperRequest],
    daos: &[DaoEmitter],
  ) -> Vec<GeneratedFile> {
    let runtime = self.options.runtime_crate();
    let mut files = Vec::new();
    let mut modules = Vec::new();

    if self.options.emit_aggregates {
      let mut output = file_prelude(&[], &batch.uses);
      let blocks: Vec<String> = declarations.layouts.values().map(emit_aggregate).collect();
      output.push_str(&blocks.join("\n"));
      files.push(GeneratedFile { name: "aggregates.rs".to_string(), contents: output });
      modules.push("aggregates");
    }

    if self.options.emit_mappers {
      let imports = vec![format!("{}::{{Row, RowMapper, SprocResult}}", runtime)];
      let mut output = file_prelude(&imports, &batch.uses);
      let blocks: Vec<String> = declarations.mappers.iter().map(emit_mapper).collect();
      output.push_str(&blocks.join("\n"));
      files.push(GeneratedFile { name: "mappers.rs".to_string(), contents: output });
      modules.push("mappers");
    }

    let mut imports = vec![
      "std::sync::Arc".to_string(),
      format!("{}::{{{}}}", runtime, WRAPPER_RUNTIME_IMPORTS.join(", ")),
    ];
    if self.options.emit_mappers {
      imports.push("super::mappers::*".to_string());
    }
    let mut output = file_prelude(&imports, &batch.uses);
    let blocks: Vec<String> = wrappers.iter().map(emit_wrapper).collect();
    output.push_str(&blocks.join("\n"));
    files.push(GeneratedFile { name: "wrappers.rs".to_string(), contents: output });
    modules.push("wrappers");

    let mut imports = vec!["std::sync::Arc".to_string(), format!("{}::DataSource", runtime)];
    if self.options.emit_aggregates {
      imports.push("super::aggregates::*".to_string());
    }
    imports.push("super::wrappers::*".to_string());
    let mut output = file_prelude(&imports, &batch.uses);
    let blocks: Vec<String> = daos.iter().map(DaoEmitter::emit).collect();
    output.push_str(&blocks.join("\n"));
    files.push(GeneratedFile { name: "daos.rs".to_string(), contents: output });
    modules.push("daos");

    modules.sort_unstable();
    let mut output = String::from(crate::codegen::rust_gen::helpers::GENERATED_HEADER);
    output.push('\n');
    for module in &modules {
      output.push_str(&format!("pub mod {};\n", module));
    }
    output.push_str("\npub use daos::*;\n");
    files.push(GeneratedFile { name: "mod.rs".to_string(), contents: output });

    files
  }
}
