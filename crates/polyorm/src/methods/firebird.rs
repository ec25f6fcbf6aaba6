use super::{
    arg, is_date, is_string, member_is, one_based, placeholders, unmapped, unsupported, SqlCaller,
    DATE_METHODS, DATE_PROPERTIES, STRING_METHODS, STRING_PROPERTIES,
};
use crate::dialect::Dialect;
use crate::error::OrmResult;
use crate::expression::{SqlExpression, SqlParam};
use crate::member::{MemberKind, SqlMemberInfo};
use crate::query::QueryInfoView;

pub struct FirebirdStringMethods;

impl SqlCaller for FirebirdStringMethods {
    fn can_work(&self, member: &SqlMemberInfo) -> bool {
        member_is(member, is_string, MemberKind::Method, STRING_METHODS)
            || member_is(member, is_string, MemberKind::Property, STRING_PROPERTIES)
    }

    fn get_sql_expression(
        &self,
        _info: &dyn QueryInfoView,
        current: SqlExpression,
        member: &SqlMemberInfo,
        args: Vec<SqlParam>,
    ) -> OrmResult<SqlExpression> {
        let col = SqlParam::Expression(current);
        let trim = |side: &str, args: Vec<SqlParam>, col: SqlParam| match args.into_iter().next() {
            None => SqlExpression::new(format!("TRIM({side} FROM ?)"), vec![col]),
            Some(chars) => SqlExpression::new(format!("TRIM({side} ? FROM ?)"), vec![chars, col]),
        };
        Ok(match member.name() {
            "to_uppercase" => SqlExpression::new("UPPER(?)", vec![col]),
            "to_lowercase" => SqlExpression::new("LOWER(?)", vec![col]),
            "trim" if args.is_empty() => SqlExpression::new("TRIM(?)", vec![col]),
            "trim" => trim("BOTH", args, col),
            "trim_start" => trim("LEADING", args, col),
            "trim_end" => trim("TRAILING", args, col),
            "substring" => {
                let start = one_based(arg(&args, 0, member)?);
                match args.get(1).cloned() {
                    Some(len) => {
                        SqlExpression::new("SUBSTRING(? FROM ? FOR ?)", vec![col, start, len])
                    }
                    None => SqlExpression::new("SUBSTRING(? FROM ?)", vec![col, start]),
                }
            }
            "replace" => SqlExpression::new(
                "REPLACE(?,?,?)",
                vec![col, arg(&args, 0, member)?, arg(&args, 1, member)?],
            ),
            "concat" => {
                let mut params = vec![col];
                params.extend(args);
                SqlExpression::new(format!("({})", placeholders(params.len(), " || ")), params)
            }
            "len" => SqlExpression::new("CHAR_LENGTH(?)", vec![col]),
            _ => return Err(unmapped(member)),
        })
    }
}

pub struct FirebirdDateProperties;

impl SqlCaller for FirebirdDateProperties {
    fn can_work(&self, member: &SqlMemberInfo) -> bool {
        member_is(member, is_date, MemberKind::Property, DATE_PROPERTIES)
    }

    fn get_sql_expression(
        &self,
        _info: &dyn QueryInfoView,
        current: SqlExpression,
        member: &SqlMemberInfo,
        _args: Vec<SqlParam>,
    ) -> OrmResult<SqlExpression> {
        let extract = |part: &str| current.clone().wrap(&format!("EXTRACT({part} FROM "), ")");
        Ok(match member.name() {
            "now" => SqlExpression::raw("CURRENT_TIMESTAMP"),
            "utc_now" => return Err(unsupported(member, Dialect::Firebird)),
            "today" => SqlExpression::raw("CURRENT_DATE"),
            "year" => extract("YEAR"),
            "month" => extract("MONTH"),
            "day" => extract("DAY"),
            "hour" => extract("HOUR"),
            "minute" => extract("MINUTE"),
            "second" => extract("SECOND"),
            // YEARDAY counts from 0.
            "day_of_year" => current.wrap("(EXTRACT(YEARDAY FROM ", ") + 1)"),
            "day_of_week" => extract("WEEKDAY"),
            "date" => current.wrap("CAST(", " AS DATE)"),
            "time_of_day" => current.wrap("CAST(", " AS TIME)"),
            _ => return Err(unmapped(member)),
        })
    }
}

pub struct FirebirdDateMethods;

impl SqlCaller for FirebirdDateMethods {
    fn can_work(&self, member: &SqlMemberInfo) -> bool {
        member_is(member, is_date, MemberKind::Method, DATE_METHODS)
    }

    fn get_sql_expression(
        &self,
        _info: &dyn QueryInfoView,
        current: SqlExpression,
        member: &SqlMemberInfo,
        args: Vec<SqlParam>,
    ) -> OrmResult<SqlExpression> {
        let col = SqlParam::Expression(current);
        let add = |unit: &str| -> OrmResult<SqlExpression> {
            Ok(SqlExpression::new(
                format!("DATEADD(? {unit} TO ?)"),
                vec![arg(&args, 0, member)?, col.clone()],
            ))
        };
        match member.name() {
            "to_string" | "format" if args.is_empty() => {
                Ok(SqlExpression::new("CAST(? AS VARCHAR(24))", vec![col.clone()]))
            }
            "to_string" | "format" => Err(unsupported(member, Dialect::Firebird)),
            "add_days" => add("DAY"),
            "add_months" => add("MONTH"),
            "add_years" => add("YEAR"),
            "add_hours" => add("HOUR"),
            "add_minutes" => add("MINUTE"),
            "add_seconds" => add("SECOND"),
            _ => Err(unmapped(member)),
        }
    }
}
