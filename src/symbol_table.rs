//! Two-level symbol table: class scope (static, field) lives for the whole
//! class, subroutine scope (argument, local) is rebuilt per subroutine.

use fnv::FnvHashMap;

use crate::vm_writer::Segment;

/// Storage kind of a declared name; decides which VM segment it occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Static,
    Field,
    Arg,
    Var,
}

impl Kind {
    pub fn segment(self) -> Segment {
        match self {
            Kind::Static => Segment::Static,
            Kind::Field => Segment::This,
            Kind::Arg => Segment::Argument,
            Kind::Var => Segment::Local,
        }
    }
}

#[derive(Debug, Clone)]
struct Entry {
    type_name: String,
    kind: Kind,
    index: u16,
}

#[derive(Default)]
pub struct SymbolTable {
    class_name: String,
    class_scope: FnvHashMap<String, Entry>,
    subroutine_scope: FnvHashMap<String, Entry>,
    static_count: u16,
    field_count: u16,
    arg_count: u16,
    var_count: u16,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_class(&mut self, name: &str) {
        self.class_name = name.to_string();
    }

    /// Discards the previous subroutine's scope entirely; class scope and
    /// its counters are untouched.
    pub fn begin_subroutine(&mut self) {
        self.subroutine_scope.clear();
        self.arg_count = 0;
        self.var_count = 0;
    }

    /// Defines a name and returns its per-kind running index. Redefining a
    /// name in the same scope replaces the old entry (latest wins); the
    /// kind counter still advances.
    pub fn define(&mut self, name: &str, type_name: &str, kind: Kind) -> u16 {
        let counter = match kind {
            Kind::Static => &mut self.static_count,
            Kind::Field => &mut self.field_count,
            Kind::Arg => &mut self.arg_count,
            Kind::Var => &mut self.var_count,
        };
        let index = *counter;
        *counter += 1;

        let entry = Entry {
            type_name: type_name.to_string(),
            kind,
            index,
        };
        let scope = match kind {
            Kind::Static | Kind::Field => &mut self.class_scope,
            Kind::Arg | Kind::Var => &mut self.subroutine_scope,
        };
        scope.insert(name.to_string(), entry);
        index
    }

    pub fn count(&self, kind: Kind) -> u16 {
        match kind {
            Kind::Static => self.static_count,
            Kind::Field => self.field_count,
            Kind::Arg => self.arg_count,
            Kind::Var => self.var_count,
        }
    }

    fn lookup(&self, name: &str) -> Option<&Entry> {
        self.subroutine_scope
            .get(name)
            .or_else(|| self.class_scope.get(name))
    }

    pub fn kind_of(&self, name: &str) -> Option<Kind> {
        self.lookup(name).map(|entry| entry.kind)
    }

    pub fn type_of(&self, name: &str) -> Option<&str> {
        self.lookup(name).map(|entry| entry.type_name.as_str())
    }

    pub fn index_of(&self, name: &str) -> Option<u16> {
        self.lookup(name).map(|entry| entry.index)
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }
}
