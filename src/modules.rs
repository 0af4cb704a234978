use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::diagnostics::{CompileError, DiagnosticManager};
use crate::lexer;
use crate::parser::{self, ast};
use crate::typeck::env::SymbolTable;

/// One compilation unit: a set of parsed files sharing a symbol table.
/// Module ids start at 1; id 0 is reserved for built-ins and bypasses
/// visibility checks.
#[derive(Debug)]
pub struct Module {
    pub id: u32,
    pub name: String,
    pub files: Vec<ast::Program>,
    pub symbols: SymbolTable,
    pub imports: Vec<u32>,
    /// Import path string -> module id, resolved at load time.
    pub resolved_imports: HashMap<String, u32>,
    /// Monotonic type-check stage counter; a module at stage >= N skips
    /// stage N.
    pub stage: u32,
}

impl Module {
    fn new(id: u32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            files: Vec::new(),
            symbols: SymbolTable::new(),
            imports: Vec::new(),
            resolved_imports: HashMap::new(),
            stage: 0,
        }
    }
}

#[derive(Debug)]
pub struct ModuleManager {
    modules: Vec<Module>,
    by_path: HashMap<PathBuf, u32>,
    pub entry: u32,
}

impl ModuleManager {
    pub fn new() -> Self {
        Self { modules: Vec::new(), by_path: HashMap::new(), entry: 1 }
    }

    pub fn module(&self, id: u32) -> &Module {
        &self.modules[(id - 1) as usize]
    }

    pub fn module_mut(&mut self, id: u32) -> &mut Module {
        &mut self.modules[(id - 1) as usize]
    }

    pub fn module_ids(&self) -> impl Iterator<Item = u32> {
        1..=self.modules.len() as u32
    }

    fn add_module(&mut self, name: impl Into<String>) -> u32 {
        let id = self.modules.len() as u32 + 1;
        self.modules.push(Module::new(id, name));
        id
    }

    /// Build a single-module manager from in-memory source. Used by tests
    /// and the single-file pipeline.
    pub fn from_source(name: &str, source: &str, diagnostics: &mut DiagnosticManager) -> Self {
        let mut manager = Self::new();
        manager.add_source(name, source, diagnostics);
        manager
    }

    /// Parse and append an in-memory module. Import statements are linked
    /// against modules already added under the imported name, so add
    /// dependencies first.
    pub fn add_source(&mut self, name: &str, source: &str, diagnostics: &mut DiagnosticManager) -> u32 {
        let file_id = diagnostics.add_file(format!("{name}.lb"), source);
        let tokens = lexer::lex(source, file_id, diagnostics);
        let program = parser::parse(&tokens, diagnostics);

        let id = self.add_module(name);
        let imports = collect_import_names(&program);
        self.module_mut(id).files.push(program);

        for import_name in imports {
            if let Some(target) = self.find_by_name(&import_name) {
                let module = self.module_mut(id);
                module.imports.push(target);
                module.resolved_imports.insert(import_name, target);
            }
        }

        id
    }

    fn find_by_name(&self, name: &str) -> Option<u32> {
        self.modules.iter().find(|m| m.name == name).map(|m| m.id)
    }

    /// Load the entry file and, transitively, every module it imports.
    /// `import "lib"` resolves to a sibling `lib.lb` file or a `lib/`
    /// directory of `.lb` files. Cycles are handled by registering each
    /// path before its imports are followed.
    pub fn load(entry: &Path, diagnostics: &mut DiagnosticManager) -> Result<Self, CompileError> {
        let mut manager = Self::new();
        let entry_id = manager.load_path(entry, diagnostics)?;
        manager.entry = entry_id;
        Ok(manager)
    }

    fn load_path(&mut self, path: &Path, diagnostics: &mut DiagnosticManager) -> Result<u32, CompileError> {
        let canonical = path.canonicalize().map_err(|e| CompileError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        if let Some(&id) = self.by_path.get(&canonical) {
            return Ok(id);
        }

        let name = canonical
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("main")
            .to_string();
        let id = self.add_module(&name);
        self.by_path.insert(canonical.clone(), id);

        let mut import_names = Vec::new();
        if canonical.is_dir() {
            let mut files: Vec<PathBuf> = std::fs::read_dir(&canonical)
                .map_err(|e| CompileError::Io { path: canonical.clone(), message: e.to_string() })?
                .filter_map(|entry| entry.ok())
                .map(|entry| entry.path())
                .filter(|p| p.extension().is_some_and(|ext| ext == "lb"))
                .collect();
            files.sort();
            for file in files {
                import_names.extend(self.load_file_into(id, &file, diagnostics)?);
            }
        } else {
            import_names.extend(self.load_file_into(id, &canonical, diagnostics)?);
        }

        let base_dir = canonical
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        for import_name in import_names {
            if self.module(id).resolved_imports.contains_key(&import_name) {
                continue;
            }

            let file_candidate = base_dir.join(format!("{import_name}.lb"));
            let dir_candidate = base_dir.join(&import_name);

            let target = if file_candidate.is_file() {
                self.load_path(&file_candidate, diagnostics)?
            } else if dir_candidate.is_dir() {
                self.load_path(&dir_candidate, diagnostics)?
            } else {
                return Err(CompileError::ModuleNotFound {
                    name: import_name,
                    span: crate::span::Span::dummy(),
                });
            };

            let module = self.module_mut(id);
            module.imports.push(target);
            module.resolved_imports.insert(import_name, target);
        }

        Ok(id)
    }

    fn load_file_into(
        &mut self,
        id: u32,
        path: &Path,
        diagnostics: &mut DiagnosticManager,
    ) -> Result<Vec<String>, CompileError> {
        let source = std::fs::read_to_string(path).map_err(|e| CompileError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let file_id = diagnostics.add_file(path.display().to_string(), &source);
        let tokens = lexer::lex(&source, file_id, diagnostics);
        let program = parser::parse(&tokens, diagnostics);
        let imports = collect_import_names(&program);
        self.module_mut(id).files.push(program);
        Ok(imports)
    }
}

fn collect_import_names(program: &ast::Program) -> Vec<String> {
    program
        .statements
        .iter()
        .filter_map(|stmt| match &stmt.node {
            ast::Stmt::Import(import) => Some(import.module.node.clone()),
            _ => None,
        })
        .collect()
}
