//! Typed member-access expressions and their flattened chain form.
//!
//! A [`MemberExpr`] is a small expression tree describing what a query
//! references on an entity: `x.Name`, `x.Name.substring(0, 3)`,
//! `DateTime::now().year`, or an object projection `new { x.Id, x.Name }`.
//! [`ExpressionProcessor`] turns it into [`SqlMember`] chains: a root column
//! plus the ordered child operations applied to it, with every method argument
//! resolved to its value at processing time.
//!
//! ```ignore
//! let expr = MemberExpr::param()
//!     .prop("Name", MemberType::String)
//!     .call("substring", [0.into(), 3.into()])
//!     .call("to_uppercase", []);
//! let member = ExpressionProcessor::new(&config, ExpressionConfig::default()).single(&expr)?;
//! assert_eq!(member.column, "Name");
//! assert_eq!(member.children.len(), 2);
//! ```

mod processor;


pub use processor::{ExpressionConfig, ExpressionProcessor};

use crate::config::QueryConfig;
use crate::expression::SqlExpression;
use crate::value::Value;
use std::fmt;
use std::sync::Arc;

/// Value type of a member; the declaring type of the next member in a chain.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MemberType {
    String,
    DateTime,
    Date,
    Time,
    Number,
    Bool,
    /// A mapped object (nested or foreign entity) that has no column of its own.
    Entity(String),
}

impl MemberType {
    pub fn entity(name: impl Into<String>) -> Self {
        MemberType::Entity(name.into())
    }

    pub fn is_entity(&self) -> bool {
        matches!(self, MemberType::Entity(_))
    }

    /// Date-like types share the date callers.
    pub fn is_date(&self) -> bool {
        matches!(self, MemberType::DateTime | MemberType::Date)
    }
}

impl fmt::Display for MemberType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemberType::String => f.write_str("String"),
            MemberType::DateTime => f.write_str("DateTime"),
            MemberType::Date => f.write_str("Date"),
            MemberType::Time => f.write_str("Time"),
            MemberType::Number => f.write_str("Number"),
            MemberType::Bool => f.write_str("Bool"),
            MemberType::Entity(name) => f.write_str(name),
        }
    }
}

/// A closure read when the expression is processed.
pub type Capture = Arc<dyn Fn() -> Value + Send + Sync>;

/// A method argument as written in the expression.
#[derive(Clone)]
pub enum ArgExpr {
    Constant(Value),
    /// A captured variable or field, read once at processing time.
    Captured(Capture),
    /// Another member of the same entity (`x.Name.replace(x.Other, "")`).
    Member(MemberExpr),
    Expression(SqlExpression),
}

impl ArgExpr {
    pub fn captured(f: impl Fn() -> Value + Send + Sync + 'static) -> Self {
        ArgExpr::Captured(Arc::new(f))
    }
}

impl fmt::Debug for ArgExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgExpr::Constant(v) => f.debug_tuple("Constant").field(v).finish(),
            ArgExpr::Captured(_) => f.write_str("Captured(..)"),
            ArgExpr::Member(m) => f.debug_tuple("Member").field(m).finish(),
            ArgExpr::Expression(e) => f.debug_tuple("Expression").field(e).finish(),
        }
    }
}

impl<T: Into<Value>> From<T> for ArgExpr {
    fn from(value: T) -> Self {
        ArgExpr::Constant(value.into())
    }
}

impl From<MemberExpr> for ArgExpr {
    fn from(expr: MemberExpr) -> Self {
        ArgExpr::Member(expr)
    }
}

impl From<SqlExpression> for ArgExpr {
    fn from(expr: SqlExpression) -> Self {
        ArgExpr::Expression(expr)
    }
}

/// Member-access expression tree rooted at the entity parameter.
#[derive(Debug, Clone)]
pub enum MemberExpr {
    /// The entity parameter (`x`).
    Param,
    /// A static member such as `DateTime::now()`.
    Static {
        declaring_type: MemberType,
        name: String,
        returns: MemberType,
    },
    Property {
        target: Box<MemberExpr>,
        name: String,
        returns: MemberType,
    },
    Method {
        target: Box<MemberExpr>,
        name: String,
        args: Vec<ArgExpr>,
        returns: MemberType,
    },
    /// Object projection: `new { Alias = x.Member, ... }`.
    New(Vec<(String, MemberExpr)>),
}

impl MemberExpr {
    pub fn param() -> Self {
        MemberExpr::Param
    }

    pub fn static_member(
        declaring_type: MemberType,
        name: impl Into<String>,
        returns: MemberType,
    ) -> Self {
        MemberExpr::Static {
            declaring_type,
            name: name.into(),
            returns,
        }
    }

    /// Projection of several members. Each field is `(alias, expression)`.
    pub fn new_object(fields: impl IntoIterator<Item = (String, MemberExpr)>) -> Self {
        MemberExpr::New(fields.into_iter().collect())
    }

    /// Property access returning `returns`.
    pub fn prop(self, name: impl Into<String>, returns: MemberType) -> Self {
        MemberExpr::Property {
            target: Box::new(self),
            name: name.into(),
            returns,
        }
    }

    /// Method call returning the same type as its target.
    pub fn call(self, name: impl Into<String>, args: impl IntoIterator<Item = ArgExpr>) -> Self {
        let returns = self.value_type().unwrap_or(MemberType::String);
        self.call_as(name, args, returns)
    }

    /// Method call with an explicit return type.
    pub fn call_as(
        self,
        name: impl Into<String>,
        args: impl IntoIterator<Item = ArgExpr>,
        returns: MemberType,
    ) -> Self {
        MemberExpr::Method {
            target: Box::new(self),
            name: name.into(),
            args: args.into_iter().collect(),
            returns,
        }
    }

    /// Type this expression evaluates to. `None` for the parameter and projections.
    pub fn value_type(&self) -> Option<MemberType> {
        match self {
            MemberExpr::Param | MemberExpr::New(_) => None,
            MemberExpr::Static { returns, .. }
            | MemberExpr::Property { returns, .. }
            | MemberExpr::Method { returns, .. } => Some(returns.clone()),
        }
    }

    /// Name of the outermost member, used as the default projection alias.
    pub fn member_name(&self) -> Option<&str> {
        match self {
            MemberExpr::Static { name, .. }
            | MemberExpr::Property { name, .. }
            | MemberExpr::Method { name, .. } => Some(name),
            _ => None,
        }
    }
}

/// Whether a chain node reads a property or calls a method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    Property,
    Method,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SqlPropertyInfo {
    pub declaring_type: MemberType,
    pub name: String,
    pub value_type: MemberType,
}

/// A resolved method argument.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlArg {
    Value(Value),
    Member(SqlMember),
    Expression(SqlExpression),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SqlMethodInfo {
    pub declaring_type: MemberType,
    pub name: String,
    pub args: Vec<SqlArg>,
    pub value_type: MemberType,
}

/// One node of a member chain.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlMemberInfo {
    Property(SqlPropertyInfo),
    Method(SqlMethodInfo),
}

impl SqlMemberInfo {
    pub fn name(&self) -> &str {
        match self {
            SqlMemberInfo::Property(p) => &p.name,
            SqlMemberInfo::Method(m) => &m.name,
        }
    }

    pub fn declaring_type(&self) -> &MemberType {
        match self {
            SqlMemberInfo::Property(p) => &p.declaring_type,
            SqlMemberInfo::Method(m) => &m.declaring_type,
        }
    }

    pub fn value_type(&self) -> &MemberType {
        match self {
            SqlMemberInfo::Property(p) => &p.value_type,
            SqlMemberInfo::Method(m) => &m.value_type,
        }
    }

    pub fn kind(&self) -> MemberKind {
        match self {
            SqlMemberInfo::Property(_) => MemberKind::Property,
            SqlMemberInfo::Method(_) => MemberKind::Method,
        }
    }

    pub fn args(&self) -> &[SqlArg] {
        match self {
            SqlMemberInfo::Property(_) => &[],
            SqlMemberInfo::Method(m) => &m.args,
        }
    }

    pub fn is_method(&self, declaring: &MemberType, name: &str) -> bool {
        self.kind() == MemberKind::Method && self.declaring_type() == declaring && self.name() == name
    }

    pub fn is_property(&self, declaring: &MemberType, name: &str) -> bool {
        self.kind() == MemberKind::Property
            && self.declaring_type() == declaring
            && self.name() == name
    }
}

/// A root member plus the ordered operations applied to it.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlMember {
    pub root: SqlPropertyInfo,
    /// Column the root maps to (empty for static roots).
    pub column: String,
    pub is_static: bool,
    /// Child nodes in source order, left to right.
    pub children: Vec<SqlMemberInfo>,
    /// Output name when projected.
    pub alias: Option<String>,
    /// Member names of the enclosing objects, joined, for promoted roots.
    pub prefix: String,
}

impl SqlMember {
    /// A plain column member without children.
    pub fn column(name: impl Into<String>, value_type: MemberType) -> Self {
        let name = name.into();
        Self {
            root: SqlPropertyInfo {
                declaring_type: MemberType::entity("Param"),
                name: name.clone(),
                value_type,
            },
            column: name,
            is_static: false,
            children: Vec::new(),
            alias: None,
            prefix: String::new(),
        }
    }

    /// When the root is an object with no column, treat the first child property as the root.
    ///
    /// The promoted column is the object's member name followed by the child's,
    /// with the nomenclature applied: `x.Address.StreetName` reads `AddressStreetName`
    /// (`address_street_name` in snake case), the column a nested mapping with
    /// the member name as prefix uses.
    pub fn promote_first_child(&self, config: &QueryConfig) -> Option<SqlMember> {
        if !self.root.value_type.is_entity() {
            return None;
        }
        let (first, rest) = self.children.split_first()?;
        let SqlMemberInfo::Property(prop) = first else {
            return None;
        };
        let prefix = format!("{}{}", self.prefix, self.root.name);
        Some(SqlMember {
            root: prop.clone(),
            column: config.apply_nomenclature(&format!("{prefix}{}", prop.name)),
            is_static: false,
            children: rest.to_vec(),
            alias: self.alias.clone(),
            prefix,
        })
    }
}
