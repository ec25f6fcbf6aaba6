use super::TableInfo;
use crate::error::{OrmError, OrmResult};
use crate::row::Row;
use std::sync::Arc;

#[derive(Debug, Clone)]
enum Plan {
    Constructor(usize),
    Default,
}

/// Creates entity instances from result rows.
///
/// The first call to [`prepare`](Self::prepare) picks how instances are made
/// for a result shape: the constructor with the most parameters that are all
/// present among the columns, otherwise the default instance.
#[derive(Debug)]
pub struct ObjectActivator<T> {
    info: Arc<TableInfo<T>>,
    plan: Option<Plan>,
}

impl<T: Send + Sync + 'static> ObjectActivator<T> {
    pub fn new(info: Arc<TableInfo<T>>) -> Self {
        Self { info, plan: None }
    }

    pub fn prepare(&mut self, columns: &[String]) -> OrmResult<()> {
        let has = |name: &String| columns.iter().any(|c| c.eq_ignore_ascii_case(name));
        let constructor = self
            .info
            .constructors()
            .iter()
            .enumerate()
            .filter(|(_, ctor)| ctor.params().iter().all(|p| has(p)))
            .max_by_key(|(i, ctor)| (ctor.params().len(), std::cmp::Reverse(*i)))
            .map(|(i, _)| i);

        let plan = match constructor {
            Some(i) => Plan::Constructor(i),
            None if self.info.has_default() => Plan::Default,
            None => {
                return Err(OrmError::NoSuitableConstructor {
                    type_name: self.info.type_name().to_string(),
                    columns: columns.join(", "),
                });
            }
        };
        self.plan = Some(plan);
        Ok(())
    }

    /// Columns already consumed by the chosen constructor.
    pub fn consumed(&self) -> &[String] {
        match &self.plan {
            Some(Plan::Constructor(i)) => self
                .info
                .constructors()
                .get(*i)
                .map(|c| c.params())
                .unwrap_or_default(),
            _ => &[],
        }
    }

    pub fn create(&mut self, row: &Row) -> OrmResult<T> {
        if self.plan.is_none() {
            let names: Vec<String> = row.names().map(str::to_string).collect();
            self.prepare(&names)?;
        }
        match &self.plan {
            Some(Plan::Constructor(i)) => match self.info.constructors().get(*i) {
                Some(ctor) => ctor.call(row),
                None => Err(OrmError::Other("constructor index out of range".into())),
            },
            _ => self.info.make_default().ok_or_else(|| OrmError::NoSuitableConstructor {
                type_name: self.info.type_name().to_string(),
                columns: row.names().collect::<Vec<_>>().join(", "),
            }),
        }
    }
}
