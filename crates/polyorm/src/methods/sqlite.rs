use super::date_format::{self, SQLITE_TOKENS};
use super::{
    arg, is_date, is_string, member_is, one_based, placeholders, text_arg, unmapped, SqlCaller,
    DATE_METHODS, DATE_PROPERTIES, STRING_METHODS, STRING_PROPERTIES,
};
use crate::error::OrmResult;
use crate::expression::{SqlExpression, SqlParam};
use crate::member::{MemberKind, SqlMemberInfo};
use crate::query::QueryInfoView;
use crate::value::Value;

pub struct SqliteStringMethods;

impl SqlCaller for SqliteStringMethods {
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
        let trim = |func: &str, args: Vec<SqlParam>, col: SqlParam| match args.into_iter().next() {
            None => SqlExpression::new(format!("{func}(?)"), vec![col]),
            Some(chars) => SqlExpression::new(format!("{func}(?, ?)"), vec![col, chars]),
        };
        Ok(match member.name() {
            "to_uppercase" => SqlExpression::new("UPPER(?)", vec![col]),
            "to_lowercase" => SqlExpression::new("LOWER(?)", vec![col]),
            "trim" => trim("TRIM", args, col),
            "trim_start" => trim("LTRIM", args, col),
            "trim_end" => trim("RTRIM", args, col),
            "substring" => {
                let start = one_based(arg(&args, 0, member)?);
                match args.get(1).cloned() {
                    Some(len) => SqlExpression::new("SUBSTR(?,?,?)", vec![col, start, len]),
                    None => SqlExpression::new("SUBSTR(?,?)", vec![col, start]),
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
            "len" => SqlExpression::new("LENGTH(?)", vec![col]),
            _ => return Err(unmapped(member)),
        })
    }
}

pub struct SqliteDateProperties;

impl SqlCaller for SqliteDateProperties {
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
        let part = |token: &str| {
            current
                .clone()
                .wrap(&format!("CAST(STRFTIME('{token}', "), ") AS INTEGER)")
        };
        Ok(match member.name() {
            "now" => SqlExpression::raw("DATETIME('now', 'localtime')"),
            "utc_now" => SqlExpression::raw("DATETIME('now')"),
            "today" => SqlExpression::raw("DATE('now', 'localtime')"),
            "year" => part("%Y"),
            "month" => part("%m"),
            "day" => part("%d"),
            "hour" => part("%H"),
            "minute" => part("%M"),
            "second" => part("%S"),
            "day_of_year" => part("%j"),
            "day_of_week" => part("%w"),
            "date" => current.wrap("DATE(", ")"),
            "time_of_day" => current.wrap("TIME(", ")"),
            _ => return Err(unmapped(member)),
        })
    }
}

pub struct SqliteDateMethods;

impl SqlCaller for SqliteDateMethods {
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
                format!("DATETIME(?, ? || ' {unit}')"),
                vec![col.clone(), arg(&args, 0, member)?],
            ))
        };
        match member.name() {
            "to_string" | "format" if args.is_empty() => Ok(SqlExpression::new(
                "STRFTIME('%Y-%m-%d %H:%M:%S', ?)",
                vec![col.clone()],
            )),
            "to_string" | "format" => {
                let format = date_format::translate(&text_arg(&args, 0, member)?, SQLITE_TOKENS);
                Ok(SqlExpression::new(
                    "STRFTIME(?, ?)",
                    vec![SqlParam::Value(Value::Text(format)), col.clone()],
                ))
            }
            "add_days" => add("days"),
            "add_months" => add("months"),
            "add_years" => add("years"),
            "add_hours" => add("hours"),
            "add_minutes" => add("minutes"),
            "add_seconds" => add("seconds"),
            _ => Err(unmapped(member)),
        }
    }
}
