// Xkbsym Syntax Tree
// Parsed statements and expressions of a symbols description unit

use strum_macros::{Display, EnumString};

/// Policy for combining a new definition with an existing one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum MergeMode {
    #[default]
    Default,
    Augment,
    Override,
    Replace,
}

impl MergeMode {
    /// Resolve `Default` against an inherited mode
    pub fn or(self, inherited: MergeMode) -> MergeMode {
        if self == MergeMode::Default {
            inherited
        } else {
            self
        }
    }
}

/// Expression nodes
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Ident(String),
    String(String),
    Integer(i64),
    Boolean(bool),
    /// Key name without brackets
    KeyName(String),
    /// One entry per level, each a list of keysym names
    KeysymList(Vec<Vec<String>>),
    /// One action per level
    ActionList(Vec<Expr>),
    Action {
        name: String,
        args: Vec<Expr>,
    },
    Assign {
        lhs: Box<Expr>,
        value: Box<Expr>,
    },
    FieldRef {
        element: String,
        field: String,
    },
    ArrayRef {
        element: Option<String>,
        field: String,
        index: Box<Expr>,
    },
    Negate(Box<Expr>),
    UnaryPlus(Box<Expr>),
    Not(Box<Expr>),
    Invert(Box<Expr>),
    Add(Box<Expr>, Box<Expr>),
    Subtract(Box<Expr>, Box<Expr>),
}

impl Expr {
    /// Short name of the node kind, used in diagnostics
    pub fn op_name(&self) -> &'static str {
        match self {
            Expr::Ident(_) => "identifier",
            Expr::String(_) => "string",
            Expr::Integer(_) => "integer",
            Expr::Boolean(_) => "boolean",
            Expr::KeyName(_) => "key name",
            Expr::KeysymList(_) => "keysym list",
            Expr::ActionList(_) => "action list",
            Expr::Action { .. } => "action declaration",
            Expr::Assign { .. } => "assignment",
            Expr::FieldRef { .. } => "field reference",
            Expr::ArrayRef { .. } => "array reference",
            Expr::Negate(_) => "negation",
            Expr::UnaryPlus(_) => "unary plus",
            Expr::Not(_) => "logical not",
            Expr::Invert(_) => "bitwise inversion",
            Expr::Add(_, _) => "addition",
            Expr::Subtract(_, _) => "subtraction",
        }
    }

    pub fn ident(name: &str) -> Expr {
        Expr::Ident(name.to_string())
    }

    /// An integer literal node
    pub fn int(value: i64) -> Expr {
        Expr::Integer(value)
    }

    /// A keysym list with one keysym per level
    pub fn keysyms(levels: &[&str]) -> Expr {
        Expr::KeysymList(levels.iter().map(|s| vec![s.to_string()]).collect())
    }
}

/// An assignment `name = value`, or a bare `value` inside a key body
#[derive(Debug, Clone, PartialEq)]
pub struct VarDef {
    pub merge: MergeMode,
    pub name: Option<Expr>,
    pub value: Option<Expr>,
}

impl VarDef {
    pub fn new(name: Option<Expr>, value: Option<Expr>) -> Self {
        Self {
            merge: MergeMode::Default,
            name,
            value,
        }
    }
}

/// `key <NAME> { ... };`
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolsDef {
    pub merge: MergeMode,
    pub key_name: String,
    pub body: Vec<VarDef>,
}

/// `modifier_map Mod { <KEY>, keysym, ... };`
#[derive(Debug, Clone, PartialEq)]
pub struct ModMapDef {
    pub merge: MergeMode,
    pub modifier: String,
    pub keys: Vec<Expr>,
}

/// `virtual_modifiers Name = value;`
#[derive(Debug, Clone, PartialEq)]
pub struct VModDef {
    pub merge: MergeMode,
    pub name: String,
    pub value: Option<Expr>,
}

/// One target of an include statement: `file(map):group`
#[derive(Debug, Clone, PartialEq)]
pub struct IncludeLink {
    pub file: String,
    pub map: Option<String>,
    /// Explicit group suffix, unparsed
    pub modifier: Option<String>,
    pub merge: MergeMode,
}

/// `include "a+b(c):2|d";`
#[derive(Debug, Clone, PartialEq)]
pub struct IncludeStmt {
    pub merge: MergeMode,
    pub stmt: String,
    pub links: Vec<IncludeLink>,
}

/// Statements of a symbols unit
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Include(IncludeStmt),
    Symbols(SymbolsDef),
    Var(VarDef),
    VMod(VModDef),
    ModMap(ModMapDef),
}

impl Statement {
    pub fn merge(&self) -> MergeMode {
        match self {
            Statement::Include(s) => s.merge,
            Statement::Symbols(s) => s.merge,
            Statement::Var(s) => s.merge,
            Statement::VMod(s) => s.merge,
            Statement::ModMap(s) => s.merge,
        }
    }
}

/// A parsed description unit
#[derive(Debug, Clone, PartialEq, Default)]
pub struct XkbFile {
    pub id: u32,
    pub name: Option<String>,
    pub statements: Vec<Statement>,
}
