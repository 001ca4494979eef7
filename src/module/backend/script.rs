//! Script modules backed by the rhai interpreter
//!
//! A script module is the namespace left behind by running a script: its
//! top-level variables and its script functions are the module's
//! attributes. `import` statements inside a script resolve against the
//! module search path, and functions keep seeing those imports after the
//! load. A script imported by another script follows rhai's own module
//! rules: only its functions and `export`ed variables are visible.

use rhai::module_resolvers::{FileModuleResolver, ModuleResolversCollection};
use rhai::{
    Array, Dynamic, Engine, FnAccess, FnPtr, ImmutableString, Map, Module, Scope, FLOAT, INT,
};
use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

use crate::module::backend::ModuleBackend;
use crate::module::traits::{ModuleError, ModuleObject, Value};

/// Extension of script module files
pub const SCRIPT_EXTENSION: &str = "rhai";

/// Variable defined after a script's own statements; reaching it exports
/// every top-level variable into the module namespace
const EXPORT_MARKER: &str = "modhost_exports_end";

/// Name the module's own namespace is registered under for calls
const NAMESPACE_ALIAS: &str = "this_module";

/// Backend evaluating rhai scripts
///
/// Every evaluation starts from a clone of the backend's context scope, so
/// values placed in the context are visible to every module while each
/// module still gets its own namespace.
#[derive(Clone, Default)]
pub struct ScriptBackend {
    context: Scope<'static>,
}

impl ScriptBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Share `context` with every module this backend evaluates
    pub fn with_context(context: Scope<'static>) -> Self {
        Self { context }
    }

    /// Expose a constant to every module this backend evaluates
    pub fn with_constant(mut self, name: &str, value: Value) -> Result<Self, ModuleError> {
        let value = to_dynamic(&value)?;
        self.context.push_constant_dynamic(name.to_string(), value);
        Ok(self)
    }

    fn engine(&self, search_path: &[PathBuf]) -> Engine {
        let mut engine = Engine::new();
        let mut resolvers = ModuleResolversCollection::new();
        for dir in search_path {
            resolvers.push(FileModuleResolver::new_with_path_and_extension(
                dir.clone(),
                SCRIPT_EXTENSION,
            ));
        }
        engine.set_module_resolver(resolvers);

        // Only aliased variables survive into a module namespace
        #[allow(deprecated)]
        engine.on_def_var(|is_runtime, info, mut context| {
            if is_runtime && info.is_global_level() && info.name() == EXPORT_MARKER {
                let names: BTreeSet<String> = context
                    .scope()
                    .iter()
                    .map(|(name, _, _)| name.to_string())
                    .collect();
                for name in names {
                    context.scope_mut().set_alias(name, "");
                }
            }
            Ok(true)
        });
        engine
    }

    fn run(
        &self,
        name: &str,
        source: &str,
        search_path: &[PathBuf],
    ) -> Result<ScriptModule, ModuleError> {
        let failed =
            |e: &dyn fmt::Display| ModuleError::BackendEvaluation(format!("{}: {}", name, e));

        let mut engine = self.engine(search_path);
        let ast = engine.compile(source).map_err(|e| failed(&e))?;
        let marker = engine
            .compile(format!("let {} = ();", EXPORT_MARKER))
            .map_err(|e| failed(&e))?;

        let namespace =
            Module::eval_ast_as_new(self.context.clone(), &ast.merge(&marker), &engine)
                .map(Arc::new)
                .map_err(|e| failed(&e))?;

        let functions = ast
            .iter_functions()
            .filter(|f| f.access == FnAccess::Public)
            .map(|f| f.name.to_string())
            .collect();
        engine.register_static_module(NAMESPACE_ALIAS, namespace.clone());

        debug!("Evaluated script module {}", name);
        Ok(ScriptModule {
            name: name.to_string(),
            engine,
            namespace,
            functions,
        })
    }
}

impl ModuleBackend for ScriptBackend {
    fn kind(&self) -> &'static str {
        "script"
    }

    fn import(
        &self,
        name: &str,
        search_path: &[PathBuf],
    ) -> Result<Box<dyn ModuleObject>, ModuleError> {
        if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
            return Err(ModuleError::ModuleNotFound(format!(
                "invalid script module name: {}",
                name
            )));
        }

        let file_name = format!("{}.{}", name, SCRIPT_EXTENSION);
        for dir in search_path {
            let candidate = dir.join(&file_name);
            if !candidate.is_file() {
                continue;
            }
            debug!("Resolved script module {} to {:?}", name, candidate);
            let source =
                fs::read_to_string(&candidate).map_err(|e| ModuleError::io(&candidate, e))?;
            return Ok(Box::new(self.run(name, &source, search_path)?));
        }

        Err(ModuleError::ModuleNotFound(format!(
            "{} (searched {} director{})",
            name,
            search_path.len(),
            if search_path.len() == 1 { "y" } else { "ies" }
        )))
    }

    fn evaluate(
        &self,
        name: &str,
        source: &str,
        search_path: &[PathBuf],
    ) -> Result<Box<dyn ModuleObject>, ModuleError> {
        Ok(Box::new(self.run(name, source, search_path)?))
    }

    fn source_extension(&self) -> Option<&str> {
        Some(SCRIPT_EXTENSION)
    }
}

/// Namespace produced by running a script
///
/// The top level runs once, at load time. Calls dispatch into the frozen
/// namespace, whose functions carry the imports and constants of the run
/// that defined them.
pub struct ScriptModule {
    name: String,
    engine: Engine,
    namespace: Arc<Module>,
    functions: BTreeSet<String>,
}

impl ModuleObject for ScriptModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn attribute(&self, name: &str) -> Result<Option<Value>, ModuleError> {
        match self.namespace.get_var(name) {
            Some(value) => from_dynamic(value).map(Some),
            None if self.functions.contains(name) => Ok(Some(Value::Function(name.to_string()))),
            None => Ok(None),
        }
    }

    fn call(&self, name: &str, args: Vec<Value>) -> Result<Value, ModuleError> {
        if !self.functions.contains(name) {
            return Err(ModuleError::AttributeNotFound {
                module: self.name.clone(),
                attribute: name.to_string(),
            });
        }

        let mut scope = Scope::new();
        let mut params = Vec::with_capacity(args.len());
        for (i, arg) in args.iter().enumerate() {
            let param = format!("arg{}", i);
            scope.push_dynamic(param.clone(), to_dynamic(arg)?);
            params.push(param);
        }

        let expr = format!("{}::{}({})", NAMESPACE_ALIAS, name, params.join(", "));
        let result = self
            .engine
            .eval_with_scope::<Dynamic>(&mut scope, &expr)
            .map_err(|e| ModuleError::BackendEvaluation(format!("{}::{}: {}", self.name, name, e)))?;
        from_dynamic(result)
    }

    fn attribute_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .namespace
            .iter_var()
            .map(|(name, _)| name.to_string())
            .collect();
        names.extend(self.functions.iter().cloned());
        names.sort();
        names.dedup();
        names
    }
}

fn from_dynamic(value: Dynamic) -> Result<Value, ModuleError> {
    let value = value.flatten();
    if value.is_unit() {
        return Ok(Value::Null);
    }
    if let Some(b) = value.clone().try_cast::<bool>() {
        return Ok(Value::Bool(b));
    }
    if let Some(i) = value.clone().try_cast::<INT>() {
        return Ok(Value::Int(i.into()));
    }
    if let Some(x) = value.clone().try_cast::<FLOAT>() {
        return Ok(Value::Float(x.into()));
    }
    if let Some(s) = value.clone().try_cast::<ImmutableString>() {
        return Ok(Value::String(s.to_string()));
    }
    if let Some(c) = value.clone().try_cast::<char>() {
        return Ok(Value::String(c.to_string()));
    }
    if let Some(items) = value.clone().try_cast::<Array>() {
        return items
            .into_iter()
            .map(from_dynamic)
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array);
    }
    if let Some(map) = value.clone().try_cast::<Map>() {
        let mut object = std::collections::BTreeMap::new();
        for (key, item) in map {
            object.insert(key.to_string(), from_dynamic(item)?);
        }
        return Ok(Value::Object(object));
    }
    if let Some(f) = value.clone().try_cast::<FnPtr>() {
        return Ok(Value::Function(f.fn_name().to_string()));
    }

    Err(ModuleError::BackendEvaluation(format!(
        "unsupported script value of type {}",
        value.type_name()
    )))
}

fn to_dynamic(value: &Value) -> Result<Dynamic, ModuleError> {
    Ok(match value {
        Value::Undefined | Value::Null => Dynamic::UNIT,
        Value::Bool(b) => Dynamic::from(*b),
        Value::Int(i) => Dynamic::from(*i),
        Value::Float(x) => Dynamic::from(*x),
        Value::String(s) | Value::Class(s) => Dynamic::from(s.clone()),
        Value::Array(items) | Value::Tuple(items) => {
            Dynamic::from_array(items.iter().map(to_dynamic).collect::<Result<Array, _>>()?)
        }
        Value::Object(object) => {
            let mut map = Map::new();
            for (key, item) in object {
                map.insert(key.as_str().into(), to_dynamic(item)?);
            }
            Dynamic::from_map(map)
        }
        Value::Function(name) => {
            let f = FnPtr::new(name.as_str())
                .map_err(|e| ModuleError::BackendEvaluation(e.to_string()))?;
            Dynamic::from(f)
        }
    })
}
