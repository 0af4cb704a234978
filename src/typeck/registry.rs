use std::collections::HashMap;

use super::defs::TypeDefs;
use super::types::{FunctionTy, Ty, TyKind};

/// The injected registries: built-in functions, user methods and associated
/// members, and the operator result tables. Built-ins and operators are
/// installed once at construction; methods and statics are added by the
/// checker's function stage.
#[derive(Debug)]
pub struct Registry {
    pub builtins: HashMap<String, FunctionTy>,
    /// Method overloads by name; dispatch picks the first whose receiver
    /// accepts the value.
    pub methods: HashMap<String, Vec<FunctionTy>>,
    /// Associated members declared as `fn Owner.name`, keyed by
    /// (owner type name, member name).
    pub statics: HashMap<(String, String), FunctionTy>,
    /// (operator, left, right) -> result, keyed by concrete type names.
    binary_ops: HashMap<(String, String, String), Ty>,
    /// (operator, operand) -> result.
    unary_ops: HashMap<(String, String), Ty>,
    /// The built-in `error` interface `T!` accepts in place of its payload.
    pub error_interface: Ty,
}

impl Registry {
    pub fn new(defs: &mut TypeDefs) -> Self {
        let error_id = defs.alloc_interface("error", 0);
        defs.interfaces[error_id].members.push((
            "error".to_string(),
            Ty::function(FunctionTy {
                name: "error".to_string(),
                params: Vec::new(),
                return_type: Ty::string(),
                method_of: None,
                exported: true,
                module: 0,
            }),
        ));
        let error_interface = Ty::new(TyKind::Interface { id: error_id, name: "error".to_string() });

        let mut registry = Self {
            builtins: HashMap::new(),
            methods: HashMap::new(),
            statics: HashMap::new(),
            binary_ops: HashMap::new(),
            unary_ops: HashMap::new(),
            error_interface,
        };
        registry.install_builtins();
        registry.install_operators();
        registry
    }

    fn install_builtins(&mut self) {
        self.builtin("print", vec![Ty::any()], Ty::void());
        self.builtin("printil", vec![Ty::any()], Ty::void());
        self.builtin("prompt", vec![Ty::string()], Ty::string());
        self.builtin("toString", vec![Ty::any()], Ty::string());
        self.builtin("parseInt", vec![Ty::string()], Ty::int());
        self.builtin("parseFloat", vec![Ty::string()], Ty::float());
    }

    fn builtin(&mut self, name: &str, params: Vec<Ty>, return_type: Ty) {
        self.builtins.insert(
            name.to_string(),
            FunctionTy {
                name: name.to_string(),
                params,
                return_type,
                method_of: None,
                exported: true,
                module: 0,
            },
        );
    }

    fn install_operators(&mut self) {
        let numerics = [Ty::int(), Ty::float()];

        for ty in &numerics {
            for op in ["+", "-", "*", "/", "%", "**"] {
                self.binary(op, ty, ty, ty.clone());
            }
            for op in ["<", "<=", ">", ">="] {
                self.binary(op, ty, ty, Ty::bool());
            }
            for op in ["-", "+", "++", "--"] {
                self.unary(op, ty, ty.clone());
            }
        }

        self.binary("+", &Ty::string(), &Ty::string(), Ty::string());

        for ty in [Ty::int(), Ty::float(), Ty::bool(), Ty::string()] {
            self.binary("==", &ty, &ty, Ty::bool());
            self.binary("!=", &ty, &ty, Ty::bool());
        }

        self.binary("||", &Ty::bool(), &Ty::bool(), Ty::bool());
        self.binary("&&", &Ty::bool(), &Ty::bool(), Ty::bool());
        self.unary("!", &Ty::bool(), Ty::bool());
    }

    fn binary(&mut self, op: &str, left: &Ty, right: &Ty, result: Ty) {
        self.binary_ops
            .insert((op.to_string(), left.to_string(), right.to_string()), result);
    }

    fn unary(&mut self, op: &str, operand: &Ty, result: Ty) {
        self.unary_ops.insert((op.to_string(), operand.to_string()), result);
    }

    pub fn binary_result(&self, op: &str, left: &Ty, right: &Ty) -> Option<Ty> {
        self.binary_ops
            .get(&(op.to_string(), left.to_string(), right.to_string()))
            .cloned()
    }

    pub fn unary_result(&self, op: &str, operand: &Ty) -> Option<Ty> {
        self.unary_ops.get(&(op.to_string(), operand.to_string())).cloned()
    }

    pub fn register_method(&mut self, function: FunctionTy) {
        self.methods.entry(function.name.clone()).or_default().push(function);
    }

    pub fn register_static(&mut self, owner: String, function: FunctionTy) {
        self.statics.insert((owner, function.name.clone()), function);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operator_table_covers_primitives() {
        let mut defs = TypeDefs::new();
        let registry = Registry::new(&mut defs);

        assert_eq!(registry.binary_result("+", &Ty::int(), &Ty::int()), Some(Ty::int()));
        assert_eq!(registry.binary_result("+", &Ty::string(), &Ty::string()), Some(Ty::string()));
        assert_eq!(registry.binary_result("<", &Ty::float(), &Ty::float()), Some(Ty::bool()));
        assert_eq!(registry.binary_result("==", &Ty::bool(), &Ty::bool()), Some(Ty::bool()));
        assert_eq!(registry.binary_result("+", &Ty::int(), &Ty::string()), None);
        assert_eq!(registry.binary_result("&&", &Ty::int(), &Ty::int()), None);

        assert_eq!(registry.unary_result("!", &Ty::bool()), Some(Ty::bool()));
        assert_eq!(registry.unary_result("-", &Ty::int()), Some(Ty::int()));
        assert_eq!(registry.unary_result("-", &Ty::bool()), None);
    }

    #[test]
    fn builtins_are_registered() {
        let mut defs = TypeDefs::new();
        let registry = Registry::new(&mut defs);
        assert!(registry.builtins.contains_key("print"));
        assert!(registry.builtins.contains_key("parseInt"));
        assert_eq!(registry.builtins["prompt"].return_type, Ty::string());
    }
}
