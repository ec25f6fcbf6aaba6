use super::{
    arg, is_date, is_string, member_is, one_based, placeholders, unmapped, unsupported,
    SqlCaller, DATE_METHODS, DATE_PROPERTIES, STRING_METHODS, STRING_PROPERTIES,
};
use crate::dialect::Dialect;
use crate::error::OrmResult;
use crate::expression::{SqlExpression, SqlParam};
use crate::member::{MemberKind, SqlMemberInfo};
use crate::query::QueryInfoView;

pub struct SqlServerStringMethods;

impl SqlCaller for SqlServerStringMethods {
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
        Ok(match member.name() {
            "to_uppercase" => SqlExpression::new("UPPER(?)", vec![col]),
            "to_lowercase" => SqlExpression::new("LOWER(?)", vec![col]),
            "trim" => match args.into_iter().next() {
                None => SqlExpression::new("TRIM(?)", vec![col]),
                Some(chars) => SqlExpression::new("TRIM(? FROM ?)", vec![chars, col]),
            },
            "trim_start" if args.is_empty() => SqlExpression::new("LTRIM(?)", vec![col]),
            "trim_end" if args.is_empty() => SqlExpression::new("RTRIM(?)", vec![col]),
            "trim_start" | "trim_end" => return Err(unsupported(member, Dialect::SqlServer)),
            "substring" => {
                let start = one_based(arg(&args, 0, member)?);
                match args.get(1).cloned() {
                    Some(len) => SqlExpression::new("SUBSTRING(?,?,?)", vec![col, start, len]),
                    None => SqlExpression::new("SUBSTRING(?,?,LEN(?))", vec![col.clone(), start, col]),
                }
            }
            "replace" => SqlExpression::new(
                "REPLACE(?,?,?)",
                vec![col, arg(&args, 0, member)?, arg(&args, 1, member)?],
            ),
            "concat" => {
                if args.is_empty() {
                    return Ok(SqlExpression::new("?", vec![col]));
                }
                let mut params = vec![col];
                params.extend(args);
                SqlExpression::new(format!("CONCAT({})", placeholders(params.len(), ",")), params)
            }
            "len" => SqlExpression::new("LEN(?)", vec![col]),
            _ => return Err(unmapped(member)),
        })
    }
}

pub struct SqlServerDateProperties;

impl SqlCaller for SqlServerDateProperties {
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
        let part = |name: &str| current.clone().wrap(&format!("DATEPART({name}, "), ")");
        Ok(match member.name() {
            "now" => SqlExpression::raw("GETDATE()"),
            "utc_now" => SqlExpression::raw("GETUTCDATE()"),
            "today" => SqlExpression::raw("CAST(GETDATE() AS DATE)"),
            "year" => part("YEAR"),
            "month" => part("MONTH"),
            "day" => part("DAY"),
            "hour" => part("HOUR"),
            "minute" => part("MINUTE"),
            "second" => part("SECOND"),
            "day_of_year" => part("DAYOFYEAR"),
            "day_of_week" => current.wrap("(DATEPART(WEEKDAY, ", ") - 1)"),
            "date" => current.wrap("CAST(", " AS DATE)"),
            "time_of_day" => current.wrap("CAST(", " AS TIME)"),
            _ => return Err(unmapped(member)),
        })
    }
}

pub struct SqlServerDateMethods;

impl SqlCaller for SqlServerDateMethods {
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
                format!("DATEADD({unit}, ?, ?)"),
                vec![arg(&args, 0, member)?, col.clone()],
            ))
        };
        match member.name() {
            // FORMAT takes the .NET-style pattern as is.
            "to_string" | "format" => Ok(match args.first().cloned() {
                Some(fmt) => SqlExpression::new("FORMAT(?, ?)", vec![col.clone(), fmt]),
                None => SqlExpression::new("CONVERT(VARCHAR(23), ?, 121)", vec![col.clone()]),
            }),
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
