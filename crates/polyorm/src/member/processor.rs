use super::{
    ArgExpr, MemberExpr, MemberType, SqlArg, SqlMember, SqlMemberInfo, SqlMethodInfo,
    SqlPropertyInfo,
};
use crate::config::QueryConfig;
use crate::error::{OrmError, OrmResult};
use std::ops::BitOr;

/// Flags controlling which expression shapes the processor accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpressionConfig(u8);

impl ExpressionConfig {
    /// Root members only.
    pub const NONE: Self = Self(0);
    /// Object projections (`new { ... }`).
    pub const NEW: Self = Self(1);
    /// Chains longer than the root member.
    pub const SUB_MEMBERS: Self = Self(1 << 1);
    /// Method calls inside chains.
    pub const METHODS: Self = Self(1 << 2);
    pub const ALL: Self = Self(0b111);

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl Default for ExpressionConfig {
    fn default() -> Self {
        Self::SUB_MEMBERS | Self::METHODS
    }
}

impl BitOr for ExpressionConfig {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Turns [`MemberExpr`] trees into [`SqlMember`] chains.
pub struct ExpressionProcessor<'a> {
    config: &'a QueryConfig,
    flags: ExpressionConfig,
}

impl<'a> ExpressionProcessor<'a> {
    pub fn new(config: &'a QueryConfig, flags: ExpressionConfig) -> Self {
        Self { config, flags }
    }

    /// Process an expression. Projections yield one member per field.
    pub fn process(&self, expr: &MemberExpr) -> OrmResult<Vec<SqlMember>> {
        match expr {
            MemberExpr::New(fields) => {
                if !self.flags.contains(ExpressionConfig::NEW) {
                    return Err(OrmError::validation(
                        "object projections are disabled for this expression",
                    ));
                }
                if fields.is_empty() {
                    return Err(OrmError::validation("object projection has no members"));
                }
                fields
                    .iter()
                    .map(|(alias, field)| {
                        let mut member = self.chain(field)?;
                        if member.root.name != *alias || !member.children.is_empty() {
                            member.alias = Some(alias.clone());
                        }
                        Ok(member)
                    })
                    .collect()
            }
            other => Ok(vec![self.chain(other)?]),
        }
    }

    /// Process an expression that must yield exactly one member.
    pub fn single(&self, expr: &MemberExpr) -> OrmResult<SqlMember> {
        if matches!(expr, MemberExpr::New(_)) {
            return Err(OrmError::validation("expected a single member, found a projection"));
        }
        self.chain(expr)
    }

    fn chain(&self, expr: &MemberExpr) -> OrmResult<SqlMember> {
        // Walk from the outermost node down to the root, then reverse.
        let mut nodes = Vec::new();
        let mut current = expr;
        loop {
            match current {
                MemberExpr::Property { target, .. } | MemberExpr::Method { target, .. } => {
                    nodes.push(current);
                    current = &**target;
                }
                MemberExpr::Static { .. } => {
                    nodes.push(current);
                    break;
                }
                MemberExpr::Param => break,
                MemberExpr::New(_) => {
                    return Err(OrmError::validation(
                        "object projections cannot be nested inside a member chain",
                    ));
                }
            }
        }
        nodes.reverse();

        let Some((root, rest)) = nodes.split_first() else {
            return Err(OrmError::validation(
                "expression must access a member of the parameter",
            ));
        };

        let (root, is_static) = match root {
            MemberExpr::Static {
                declaring_type,
                name,
                returns,
            } => (
                SqlPropertyInfo {
                    declaring_type: declaring_type.clone(),
                    name: name.clone(),
                    value_type: returns.clone(),
                },
                true,
            ),
            MemberExpr::Property { name, returns, .. } => (
                SqlPropertyInfo {
                    declaring_type: MemberType::entity("Param"),
                    name: name.clone(),
                    value_type: returns.clone(),
                },
                false,
            ),
            MemberExpr::Method { name, .. } => {
                return Err(OrmError::validation(format!(
                    "method `{name}` cannot be called on the parameter itself"
                )));
            }
            _ => {
                return Err(OrmError::validation(
                    "expression must access a member of the parameter",
                ));
            }
        };

        if !rest.is_empty() && !self.flags.contains(ExpressionConfig::SUB_MEMBERS) {
            return Err(OrmError::not_supported(
                format!("member chain on `{}`", root.name),
                self.config.dialect.name(),
            ));
        }

        let mut declaring = root.value_type.clone();
        let mut children = Vec::with_capacity(rest.len());
        for node in rest {
            let child = match node {
                MemberExpr::Property { name, returns, .. } => {
                    SqlMemberInfo::Property(SqlPropertyInfo {
                        declaring_type: declaring.clone(),
                        name: name.clone(),
                        value_type: returns.clone(),
                    })
                }
                MemberExpr::Method {
                    name,
                    args,
                    returns,
                    ..
                } => {
                    if !self.flags.contains(ExpressionConfig::METHODS) {
                        return Err(OrmError::not_supported(
                            format!("method call `{name}`"),
                            self.config.dialect.name(),
                        ));
                    }
                    SqlMemberInfo::Method(SqlMethodInfo {
                        declaring_type: declaring.clone(),
                        name: name.clone(),
                        args: args
                            .iter()
                            .map(|a| self.arg(a))
                            .collect::<OrmResult<Vec<_>>>()?,
                        value_type: returns.clone(),
                    })
                }
                _ => {
                    return Err(OrmError::validation(
                        "static members can only start a member chain",
                    ));
                }
            };
            declaring = child.value_type().clone();
            children.push(child);
        }

        let column = if is_static {
            String::new()
        } else {
            self.config.apply_nomenclature(&root.name)
        };

        Ok(SqlMember {
            root,
            column,
            is_static,
            children,
            alias: None,
            prefix: String::new(),
        })
    }

    fn arg(&self, arg: &ArgExpr) -> OrmResult<SqlArg> {
        Ok(match arg {
            ArgExpr::Constant(v) => SqlArg::Value(v.clone()),
            ArgExpr::Captured(read) => SqlArg::Value((read.as_ref())()),
            ArgExpr::Member(expr) => SqlArg::Member(self.single(expr)?),
            ArgExpr::Expression(e) => SqlArg::Expression(e.clone()),
        })
    }
}
