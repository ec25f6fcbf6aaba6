use super::date_format::{self, MYSQL_TOKENS};
use super::{
    arg, is_date, is_string, member_is, one_based, placeholders, text_arg, unmapped, SqlCaller,
    DATE_METHODS, DATE_PROPERTIES, STRING_METHODS, STRING_PROPERTIES,
};
use crate::error::OrmResult;
use crate::expression::{SqlExpression, SqlParam};
use crate::member::{MemberKind, SqlMemberInfo};
use crate::query::QueryInfoView;
use crate::value::Value;

pub struct MysqlStringMethods;

impl SqlCaller for MysqlStringMethods {
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
        let trim = |plain: &str, side: &str, args: Vec<SqlParam>, col: SqlParam| match args
            .into_iter()
            .next()
        {
            None => SqlExpression::new(format!("{plain}(?)"), vec![col]),
            Some(chars) => SqlExpression::new(format!("TRIM({side} ? FROM ?)"), vec![chars, col]),
        };
        Ok(match member.name() {
            "to_uppercase" => SqlExpression::new("UPPER(?)", vec![col]),
            "to_lowercase" => SqlExpression::new("LOWER(?)", vec![col]),
            "trim" => trim("TRIM", "BOTH", args, col),
            "trim_start" => trim("LTRIM", "LEADING", args, col),
            "trim_end" => trim("RTRIM", "TRAILING", args, col),
            "substring" => {
                let start = one_based(arg(&args, 0, member)?);
                match args.get(1).cloned() {
                    Some(len) => SqlExpression::new("SUBSTRING(?,?,?)", vec![col, start, len]),
                    None => SqlExpression::new("SUBSTRING(?,?)", vec![col, start]),
                }
            }
            "replace" => SqlExpression::new(
                "REPLACE(?,?,?)",
                vec![col, arg(&args, 0, member)?, arg(&args, 1, member)?],
            ),
            "concat" => {
                let mut params = vec![col];
                params.extend(args);
                SqlExpression::new(format!("CONCAT({})", placeholders(params.len(), ",")), params)
            }
            "len" => SqlExpression::new("CHAR_LENGTH(?)", vec![col]),
            _ => return Err(unmapped(member)),
        })
    }
}

pub struct MysqlDateProperties;

impl SqlCaller for MysqlDateProperties {
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
        let func = |name: &str| current.clone().wrap(&format!("{name}("), ")");
        Ok(match member.name() {
            "now" => SqlExpression::raw("NOW()"),
            "utc_now" => SqlExpression::raw("UTC_TIMESTAMP()"),
            "today" => SqlExpression::raw("CURDATE()"),
            "year" => func("YEAR"),
            "month" => func("MONTH"),
            "day" => func("DAY"),
            "hour" => func("HOUR"),
            "minute" => func("MINUTE"),
            "second" => func("SECOND"),
            "day_of_year" => func("DAYOFYEAR"),
            "day_of_week" => current.wrap("(DAYOFWEEK(", ") - 1)"),
            "date" => func("DATE"),
            "time_of_day" => func("TIME"),
            _ => return Err(unmapped(member)),
        })
    }
}

pub struct MysqlDateMethods;

impl SqlCaller for MysqlDateMethods {
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
                format!("DATE_ADD(?, INTERVAL ? {unit})"),
                vec![col.clone(), arg(&args, 0, member)?],
            ))
        };
        match member.name() {
            "to_string" | "format" if args.is_empty() => {
                Ok(SqlExpression::new("CAST(? AS CHAR)", vec![col.clone()]))
            }
            "to_string" | "format" => {
                let format = date_format::translate(&text_arg(&args, 0, member)?, MYSQL_TOKENS);
                Ok(SqlExpression::new(
                    "DATE_FORMAT(?, ?)",
                    vec![col.clone(), SqlParam::Value(Value::Text(format))],
                ))
            }
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
