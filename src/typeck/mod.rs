pub mod check;
pub mod defs;
pub mod env;
pub mod ir;
pub mod register;
pub mod registry;
pub mod types;

use std::collections::HashMap;

use crate::diagnostics::DiagnosticManager;
use crate::modules::ModuleManager;
use crate::parser::ast::Stmt;
use crate::span::{Span, Spanned};
use defs::TypeDefs;
use env::SymbolTable;
use registry::Registry;
use types::{Ty, TypeCtx, TypeError};

const STAGE_REGISTER: u32 = 0;
const STAGE_IMPORT: u32 = 1;
const STAGE_GLOBAL: u32 = 2;
const STAGE_FUNCTION: u32 = 3;
const STAGE_STATEMENT: u32 = 4;

/// Run the five-stage type check over the module graph, producing typed IR
/// per module. Type errors become diagnostics; each stage stops at its
/// first failing node per the short-circuit discipline.
pub fn type_check(
    manager: &mut ModuleManager,
    diagnostics: &mut DiagnosticManager,
) -> HashMap<u32, ir::Program> {
    Checker::new(manager, diagnostics).run()
}

/// The remainder of an `import *` or `import { a, b }`. Exported types are
/// bound at the import stage; names that only exist once the exporter's
/// function stage has run (function signatures) are bound at the start of
/// the importer's statement stage.
struct PendingImport {
    target: u32,
    all: bool,
    /// Named imports still unresolved at the import stage.
    names: Vec<Spanned<String>>,
    /// Names an `import *` already bound at the import stage.
    bound: Vec<String>,
    span: Span,
}

pub struct Checker<'a> {
    manager: &'a mut ModuleManager,
    diagnostics: &'a mut DiagnosticManager,
    pub(crate) defs: TypeDefs,
    pub(crate) registry: Registry,
    /// Exported symbols per module id, filled in as stages complete.
    pub(crate) exports: HashMap<u32, HashMap<String, Ty>>,
    pending_imports: HashMap<u32, Vec<PendingImport>>,
    pub(crate) current_module: u32,
    pub(crate) current_return: Option<Ty>,
    pub(crate) function_depth: u32,
    programs: HashMap<u32, ir::Program>,
}

impl<'a> Checker<'a> {
    pub fn new(manager: &'a mut ModuleManager, diagnostics: &'a mut DiagnosticManager) -> Self {
        let mut defs = TypeDefs::new();
        let registry = Registry::new(&mut defs);
        let mut checker = Self {
            manager,
            diagnostics,
            defs,
            registry,
            exports: HashMap::new(),
            pending_imports: HashMap::new(),
            current_module: 0,
            current_return: None,
            function_depth: 0,
            programs: HashMap::new(),
        };
        checker.seed_symbols();
        checker
    }

    /// Primitive type names and the `error` interface are bound in every
    /// module's global scope before any user code is looked at.
    fn seed_symbols(&mut self) {
        let error_interface = self.registry.error_interface.clone();
        let ids: Vec<u32> = self.manager.module_ids().collect();
        for id in ids {
            let symbols = &mut self.manager.module_mut(id).symbols;
            symbols.insert("i32", Ty::type_of(Ty::int()), true);
            symbols.insert("f32", Ty::type_of(Ty::float()), true);
            symbols.insert("bool", Ty::type_of(Ty::bool()), true);
            symbols.insert("string", Ty::type_of(Ty::string()), true);
            symbols.insert("void", Ty::type_of(Ty::void()), true);
            symbols.insert("error", Ty::type_of(error_interface.clone()), true);
        }
    }

    pub fn run(mut self) -> HashMap<u32, ir::Program> {
        let entry = self.manager.entry;
        self.walk_stage(entry, STAGE_REGISTER, Self::register_statement);
        self.walk_stage(entry, STAGE_IMPORT, Self::import_statement);
        self.walk_stage(entry, STAGE_GLOBAL, Self::global_statement);
        self.walk_stage(entry, STAGE_FUNCTION, Self::function_statement);
        self.statement_stage(entry);
        self.programs
    }

    /// One stage over the module graph: imports first (topological order),
    /// memoized by the per-module stage counter. The counter is bumped
    /// before recursing so import cycles terminate.
    fn walk_stage(
        &mut self,
        module_id: u32,
        stage: u32,
        f: fn(&mut Self, &Spanned<Stmt>) -> Result<(), TypeError>,
    ) {
        if self.manager.module(module_id).stage > stage {
            return;
        }
        self.manager.module_mut(module_id).stage += 1;

        let imports = self.manager.module(module_id).imports.clone();
        for import in imports {
            self.walk_stage(import, stage, f);
        }

        let saved = self.current_module;
        self.current_module = module_id;
        let files = std::mem::take(&mut self.manager.module_mut(module_id).files);
        'files: for file in &files {
            for stmt in &file.statements {
                if let Err(err) = f(self, stmt) {
                    self.diagnostics.report_type_error(err.message, err.span);
                    break 'files;
                }
            }
        }
        self.manager.module_mut(module_id).files = files;
        self.current_module = saved;
    }

    /// Stage 5: bind deferred imports, then check statement bodies into IR.
    fn statement_stage(&mut self, module_id: u32) {
        if self.manager.module(module_id).stage > STAGE_STATEMENT {
            return;
        }
        self.manager.module_mut(module_id).stage += 1;

        let imports = self.manager.module(module_id).imports.clone();
        for import in imports {
            self.statement_stage(import);
        }

        let saved = self.current_module;
        self.current_module = module_id;

        self.finalize_imports(module_id);

        let files = std::mem::take(&mut self.manager.module_mut(module_id).files);
        let mut program = ir::Program::default();
        'files: for file in &files {
            for stmt in &file.statements {
                match self.check_statement(stmt) {
                    Ok(Some(statement)) => program.statements.push(statement),
                    Ok(None) => {}
                    Err(err) => {
                        self.diagnostics.report_type_error(err.message, err.span);
                        break 'files;
                    }
                }
            }
        }
        self.manager.module_mut(module_id).files = files;
        self.programs.insert(module_id, program);
        self.current_module = saved;
    }

    /// Bind the remainder of `import *` and named imports now that the
    /// exporter has registered its function signatures too.
    fn finalize_imports(&mut self, module_id: u32) {
        let pendings = self.pending_imports.remove(&module_id).unwrap_or_default();
        for pending in pendings {
            let target_name = self.module_name(pending.target);
            if pending.all {
                for (name, ty) in self.exports_of(pending.target) {
                    if pending.bound.contains(&name) {
                        continue;
                    }
                    if self
                        .manager
                        .module_mut(module_id)
                        .symbols
                        .register(&name, ty, true)
                        .is_err()
                    {
                        self.diagnostics.report_type_error(
                            format!("Cannot redeclare {name:?}, it is already defined"),
                            pending.span,
                        );
                    }
                }
            } else {
                for name in &pending.names {
                    match self.export_of(pending.target, &name.node) {
                        Some(ty) => {
                            if self
                                .manager
                                .module_mut(module_id)
                                .symbols
                                .register(&name.node, ty, true)
                                .is_err()
                            {
                                self.diagnostics.report_type_error(
                                    format!(
                                        "Cannot redeclare {:?}, it is already defined",
                                        name.node
                                    ),
                                    name.span,
                                );
                            }
                        }
                        None => self.diagnostics.report_type_error(
                            format!(
                                "Module {target_name:?} has no exported member {:?}",
                                name.node
                            ),
                            name.span,
                        ),
                    }
                }
            }
        }
    }

    // Shared helpers for the stage implementations.

    pub(crate) fn ctx(&self) -> TypeCtx<'_> {
        TypeCtx { defs: &self.defs, registry: &self.registry, exports: &self.exports }
    }

    pub(crate) fn symbols_mut(&mut self) -> &mut SymbolTable {
        &mut self.manager.module_mut(self.current_module).symbols
    }

    pub(crate) fn resolve_symbol(&self, name: &str) -> Option<Ty> {
        self.manager.module(self.current_module).symbols.resolve(name).cloned()
    }

    pub(crate) fn is_constant_symbol(&self, name: &str) -> bool {
        self.manager.module(self.current_module).symbols.is_constant(name)
    }

    pub(crate) fn add_export(&mut self, name: &str, ty: Ty) {
        self.exports
            .entry(self.current_module)
            .or_default()
            .insert(name.to_string(), ty);
    }

    pub(crate) fn resolved_import(&self, path: &str) -> Option<u32> {
        self.manager
            .module(self.current_module)
            .resolved_imports
            .get(path)
            .copied()
    }

    pub(crate) fn module_name(&self, id: u32) -> String {
        self.manager.module(id).name.clone()
    }

    fn push_pending_import(&mut self, pending: PendingImport) {
        self.pending_imports
            .entry(self.current_module)
            .or_default()
            .push(pending);
    }

    pub(crate) fn defer_import(
        &mut self,
        target: u32,
        all: bool,
        names: Vec<Spanned<String>>,
        bound: Vec<String>,
        span: Span,
    ) {
        self.push_pending_import(PendingImport { target, all, names, bound, span });
    }

    pub(crate) fn export_of(&self, module: u32, name: &str) -> Option<Ty> {
        self.exports.get(&module).and_then(|exports| exports.get(name)).cloned()
    }

    pub(crate) fn exports_of(&self, module: u32) -> Vec<(String, Ty)> {
        let mut exported: Vec<(String, Ty)> = self
            .exports
            .get(&module)
            .map(|e| e.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default();
        exported.sort_by(|(a, _), (b, _)| a.cmp(b));
        exported
    }
}
