use super::types::Ty;

/// Index into one of the [`TypeDefs`] tables.
///
/// Nominal types reference their shapes through these indices rather than
/// owning them, which keeps the type graph acyclic at the ownership layer
/// and lets structs reference themselves through pointers and options.
pub type DefId = usize;

#[derive(Debug, Clone)]
pub struct StructMember {
    pub name: String,
    pub ty: Ty,
    pub exported: bool,
}

#[derive(Debug, Clone)]
pub struct StructDef {
    pub name: String,
    pub members: Vec<StructMember>,
    pub module: u32,
}

#[derive(Debug, Clone)]
pub struct TupleStructDef {
    pub name: String,
    pub members: Vec<Ty>,
    pub module: u32,
}

#[derive(Debug, Clone)]
pub struct UnitStructDef {
    pub name: String,
    pub module: u32,
}

#[derive(Debug, Clone)]
pub struct InterfaceDef {
    pub name: String,
    pub members: Vec<(String, Ty)>,
    pub module: u32,
}

#[derive(Debug, Clone)]
pub struct EnumVariantDef {
    pub name: String,
    /// The value type a use of this variant produces: a unit struct for
    /// bare variants, a tuple struct for tuple payloads, a struct for
    /// struct payloads.
    pub ty: Ty,
    pub exported: bool,
}

#[derive(Debug, Clone)]
pub struct EnumDef {
    pub name: String,
    pub is_union: bool,
    pub variants: Vec<EnumVariantDef>,
    pub module: u32,
}

#[derive(Debug, Clone)]
pub struct ExplicitDef {
    pub name: String,
    pub underlying: Ty,
    pub module: u32,
}

/// Arena of nominal type shapes. Register-stage passes allocate placeholder
/// entries so forward references resolve; the global stage fills them in.
#[derive(Debug, Default)]
pub struct TypeDefs {
    pub structs: Vec<StructDef>,
    pub tuple_structs: Vec<TupleStructDef>,
    pub unit_structs: Vec<UnitStructDef>,
    pub interfaces: Vec<InterfaceDef>,
    pub enums: Vec<EnumDef>,
    pub explicits: Vec<ExplicitDef>,
}

impl TypeDefs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc_struct(&mut self, name: impl Into<String>, module: u32) -> DefId {
        self.structs.push(StructDef { name: name.into(), members: Vec::new(), module });
        self.structs.len() - 1
    }

    pub fn alloc_tuple_struct(&mut self, name: impl Into<String>, module: u32) -> DefId {
        self.tuple_structs.push(TupleStructDef { name: name.into(), members: Vec::new(), module });
        self.tuple_structs.len() - 1
    }

    pub fn alloc_unit_struct(&mut self, name: impl Into<String>, module: u32) -> DefId {
        self.unit_structs.push(UnitStructDef { name: name.into(), module });
        self.unit_structs.len() - 1
    }

    pub fn alloc_interface(&mut self, name: impl Into<String>, module: u32) -> DefId {
        self.interfaces.push(InterfaceDef { name: name.into(), members: Vec::new(), module });
        self.interfaces.len() - 1
    }

    pub fn alloc_enum(&mut self, name: impl Into<String>, is_union: bool, module: u32) -> DefId {
        self.enums.push(EnumDef { name: name.into(), is_union, variants: Vec::new(), module });
        self.enums.len() - 1
    }

    pub fn alloc_explicit(&mut self, name: impl Into<String>, underlying: Ty, module: u32) -> DefId {
        self.explicits.push(ExplicitDef { name: name.into(), underlying, module });
        self.explicits.len() - 1
    }
}
